use crate::model::drag::{DragController, EditKey, InputCapture, PointerId, PointerTarget};
use crate::model::{DragKind, Item, ItemStore, LaneSet, TimelineViewport, ZoomDirection};
use crate::ui::theme;
use chrono::NaiveDate;
use egui::{Color32, Id, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};
use tracing::debug;

const HEADER_HEIGHT: f32 = theme::HEADER_HEIGHT;
const HANDLE_WIDTH: f32 = theme::HANDLE_WIDTH;

/// egui reports a single merged pointer.
const PRIMARY_POINTER: PointerId = PointerId(0);

/// Tracks whether the chart should follow the pointer outside the bars.
#[derive(Debug, Default)]
pub struct PointerCapture {
    listening: bool,
    selection_suppressed: bool,
}

impl PointerCapture {
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_suppressing_selection(&self) -> bool {
        self.selection_suppressed
    }
}

impl InputCapture for PointerCapture {
    fn attach(&mut self) {
        debug!("pointer listeners attached");
        self.listening = true;
    }

    fn detach(&mut self) {
        debug!("pointer listeners detached");
        self.listening = false;
    }

    fn suppress_selection(&mut self, suppressed: bool) {
        self.selection_suppressed = suppressed;
    }
}

/// Horizontal pan of the chart. Owned by the host as a user preference.
#[derive(Debug, Clone, Default)]
pub struct ScrollState {
    pub offset: f32,
    pub visible_width: f32,
    pending: Option<f32>,
}

impl ScrollState {
    /// Scroll to `offset` on the next frame.
    pub fn scroll_to(&mut self, offset: f32) {
        self.pending = Some(offset.max(0.0));
    }
}

/// What changed while the chart was shown.
#[derive(Debug, Clone, Default)]
pub struct TimelineInteraction {
    pub dragged: Option<Item>,
    pub renamed: Option<Item>,
}

impl TimelineInteraction {
    pub fn changed(&self) -> bool {
        self.dragged.is_some() || self.renamed.is_some()
    }
}

/// The bar part under the pointer this frame.
struct BarHit {
    item: Item,
    target: PointerTarget,
}

/// Render the lanes, axis and today marker, and route pointer input into
/// the drag controller.
#[allow(clippy::too_many_arguments)]
pub fn show_timeline<S: ItemStore>(
    lanes: &LaneSet,
    store: &mut S,
    viewport: &mut TimelineViewport,
    controller: &mut DragController<PointerCapture>,
    scroll: &mut ScrollState,
    today: NaiveDate,
    min_label_pixels: f32,
    lane_height: f32,
    ui: &mut Ui,
) -> TimelineInteraction {
    let mut interaction = TimelineInteraction::default();
    let area_rect = ui.max_rect();
    scroll.visible_width = area_rect.width();

    // Ctrl/Cmd + wheel arrives as a zoom factor
    let zoom = ui.input(|i| i.zoom_delta());
    let hover = ui.input(|i| i.pointer.hover_pos());
    if let (Some(direction), Some(pos)) = (ZoomDirection::from_scroll(zoom - 1.0), hover) {
        if area_rect.contains(pos) {
            let offset = viewport.zoom_in_place(pos.x - area_rect.left(), scroll.offset, direction);
            scroll.scroll_to(offset);
        }
    }

    let chart_width = viewport.total_width().max(area_rect.width());
    let chart_height = HEADER_HEIGHT + lanes.len() as f32 * lane_height + 40.0;

    let mut area = egui::ScrollArea::both().auto_shrink([false, false]);
    if let Some(offset) = scroll.pending.take() {
        area = area.horizontal_scroll_offset(offset);
    }

    let output = area.show(ui, |ui| {
        let (response, painter) = ui.allocate_painter(
            Vec2::new(chart_width, chart_height.max(area_rect.height())),
            Sense::hover(),
        );
        let origin = response.rect.min;
        let pinned_left = ui.clip_rect().left();

        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
        draw_axis(&painter, origin, viewport, min_label_pixels, chart_width, chart_height);

        let mut hit: Option<BarHit> = None;
        let mut double_clicked: Option<Item> = None;

        for (lane_index, lane) in lanes.lanes().iter().enumerate() {
            let lane_top = origin.y + HEADER_HEIGHT + lane_index as f32 * lane_height;
            painter.line_segment(
                [
                    Pos2::new(origin.x, lane_top + lane_height),
                    Pos2::new(origin.x + chart_width, lane_top + lane_height),
                ],
                Stroke::new(0.5, theme::BORDER_SUBTLE),
            );

            for item in lane {
                let bar_rect = Rect::from_min_size(
                    Pos2::new(origin.x + viewport.x_for_date(item.start), lane_top + theme::BAR_TOP),
                    Vec2::new(viewport.width_for_span(item.start, item.end), theme::BAR_HEIGHT),
                );
                let is_dragged = controller.session().map(|s| s.item_id) == Some(item.id);
                let is_editing = controller.editing_item() == Some(item.id);
                draw_bar(&painter, bar_rect, item, lane_index, is_dragged, is_editing);

                let body = ui
                    .interact(bar_rect, Id::new(("bar", item.id)), Sense::click_and_drag())
                    .on_hover_text(format!("{}\n{} – {}", item.name, item.start, item.end));
                let start_handle = ui.interact(
                    Rect::from_min_size(bar_rect.min, Vec2::new(HANDLE_WIDTH, bar_rect.height())),
                    Id::new(("bar-start", item.id)),
                    Sense::drag(),
                );
                let end_handle = ui.interact(
                    Rect::from_min_size(
                        Pos2::new(bar_rect.right() - HANDLE_WIDTH, bar_rect.top()),
                        Vec2::new(HANDLE_WIDTH, bar_rect.height()),
                    ),
                    Id::new(("bar-end", item.id)),
                    Sense::drag(),
                );

                if start_handle.hovered() || end_handle.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::ResizeHorizontal);
                    draw_handles(&painter, bar_rect);
                } else if body.hovered() {
                    ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
                }

                let target = if start_handle.contains_pointer() {
                    Some(PointerTarget::StartHandle)
                } else if end_handle.contains_pointer() {
                    Some(PointerTarget::EndHandle)
                } else if body.contains_pointer() {
                    Some(PointerTarget::Body)
                } else {
                    None
                };
                if let Some(target) = target {
                    hit = Some(BarHit {
                        item: item.clone(),
                        target,
                    });
                }
                if body.double_clicked() {
                    double_clicked = Some(item.clone());
                }

                if is_editing {
                    let renamed = match show_rename_field(ui, controller, bar_rect) {
                        Some(FieldExit::Key(key)) => controller.key(key, store),
                        Some(FieldExit::Blur) => controller.blur(store),
                        None => None,
                    };
                    if renamed.is_some() {
                        interaction.renamed = renamed;
                    }
                }
            }
        }

        draw_gutter(&painter, origin, pinned_left, viewport, lanes.len(), lane_height, chart_height);

        if let Some(x) = viewport.today_x(today) {
            draw_today_line(&painter, Pos2::new(origin.x + x, origin.y), chart_height);
        }

        interaction.dragged = route_pointer(ui, controller, viewport, store, hit);

        if let Some(item) = double_clicked {
            if controller.double_click(&item) {
                ui.ctx().request_repaint();
            }
        }
    });

    scroll.offset = output.state.offset.x;
    interaction
}

/// Feed this frame's press, travel and release to the controller.
fn route_pointer<S: ItemStore>(
    ui: &Ui,
    controller: &mut DragController<PointerCapture>,
    viewport: &TimelineViewport,
    store: &mut S,
    hit: Option<BarHit>,
) -> Option<Item> {
    let (pos, pressed, released, focused) = ui.input(|i| {
        (
            i.pointer.interact_pos(),
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.focused,
        )
    });

    if pressed {
        if let (Some(hit), Some(pos)) = (hit, pos) {
            controller.pointer_down(PRIMARY_POINTER, hit.target, &hit.item, pos.x);
        }
    }

    if !controller.capture().is_listening() {
        return None;
    }

    let mut dragged = None;
    if let Some(pos) = pos {
        dragged = controller.pointer_move(PRIMARY_POINTER, pos.x, viewport, store);
    }
    if controller.capture().is_suppressing_selection() {
        let icon = match controller.active_kind() {
            Some(DragKind::Move) => egui::CursorIcon::Grabbing,
            _ => egui::CursorIcon::ResizeHorizontal,
        };
        ui.ctx().set_cursor_icon(icon);
    }

    if released {
        controller.pointer_up(PRIMARY_POINTER);
    } else if !focused {
        controller.cancel();
    }
    dragged
}

/// How the rename field was left.
enum FieldExit {
    Key(EditKey),
    Blur,
}

/// Inline text field over the bar being renamed.
fn show_rename_field(
    ui: &mut Ui,
    controller: &mut DragController<PointerCapture>,
    bar_rect: Rect,
) -> Option<FieldExit> {
    let field_rect = bar_rect.shrink2(Vec2::new(HANDLE_WIDTH, 4.0));
    let draft = controller.draft_mut()?;
    let response = ui.put(
        field_rect,
        egui::TextEdit::singleline(draft)
            .id(Id::new("rename-field"))
            .font(theme::font_bar())
            .text_color(theme::TEXT_ON_BAR)
            .frame(false),
    );

    if response.lost_focus() {
        let exit = ui.input(|i| {
            if i.key_pressed(egui::Key::Escape) {
                FieldExit::Key(EditKey::Escape)
            } else if i.key_pressed(egui::Key::Enter) {
                FieldExit::Key(EditKey::Enter)
            } else {
                FieldExit::Blur
            }
        });
        return Some(exit);
    }
    if !response.has_focus() {
        response.request_focus();
    }
    None
}

fn draw_axis(
    painter: &egui::Painter,
    origin: Pos2,
    viewport: &TimelineViewport,
    min_label_pixels: f32,
    width: f32,
    height: f32,
) {
    painter.rect_filled(
        Rect::from_min_size(origin, Vec2::new(width, HEADER_HEIGHT)),
        0.0,
        theme::BG_HEADER,
    );
    painter.line_segment(
        [
            Pos2::new(origin.x, origin.y + HEADER_HEIGHT),
            Pos2::new(origin.x + width, origin.y + HEADER_HEIGHT),
        ],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    for tick in viewport.ticks(min_label_pixels) {
        let x = origin.x + tick.x;
        painter.line_segment(
            [
                Pos2::new(x, origin.y + HEADER_HEIGHT),
                Pos2::new(x, origin.y + height),
            ],
            Stroke::new(0.5, theme::GRID_LINE),
        );
        painter.text(
            Pos2::new(x + 4.0, origin.y + 14.0),
            egui::Align2::LEFT_CENTER,
            tick.label(),
            theme::font_header(),
            theme::TEXT_PRIMARY,
        );
        painter.text(
            Pos2::new(x + 4.0, origin.y + 31.0),
            egui::Align2::LEFT_CENTER,
            tick.date.format("%a").to_string(),
            theme::font_sub(),
            theme::TEXT_DIM,
        );
    }
}

fn draw_gutter(
    painter: &egui::Painter,
    origin: Pos2,
    left: f32,
    viewport: &TimelineViewport,
    lane_count: usize,
    lane_height: f32,
    height: f32,
) {
    let gutter = Rect::from_min_size(
        Pos2::new(left, origin.y),
        Vec2::new(viewport.gutter_width, height),
    );
    painter.rect_filled(gutter, 0.0, theme::BG_GUTTER);
    painter.line_segment(
        [gutter.right_top(), gutter.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    for lane in 0..lane_count {
        let y = origin.y + HEADER_HEIGHT + lane as f32 * lane_height + lane_height / 2.0;
        painter.text(
            Pos2::new(left + 12.0, y),
            egui::Align2::LEFT_CENTER,
            format!("Lane {}", lane + 1),
            theme::font_bar(),
            theme::TEXT_SECONDARY,
        );
    }
}

fn draw_today_line(painter: &egui::Painter, top: Pos2, height: f32) {
    painter.line_segment(
        [
            Pos2::new(top.x, top.y + HEADER_HEIGHT),
            Pos2::new(top.x, top.y + height),
        ],
        Stroke::new(1.5, theme::TODAY_LINE),
    );

    let badge_w = 42.0;
    let badge_rect = Rect::from_min_size(
        Pos2::new(top.x - badge_w / 2.0, top.y + HEADER_HEIGHT - 1.0),
        Vec2::new(badge_w, 14.0),
    );
    painter.rect_filled(badge_rect, Rounding::same(3.0), theme::TODAY_LINE);
    painter.text(
        badge_rect.center(),
        egui::Align2::CENTER_CENTER,
        "Today",
        theme::font_small(),
        Color32::WHITE,
    );
}

fn draw_bar(
    painter: &egui::Painter,
    bar_rect: Rect,
    item: &Item,
    lane: usize,
    is_dragged: bool,
    is_editing: bool,
) {
    let rounding = Rounding::same(theme::BAR_ROUNDING);

    // Soft shadow
    painter.rect_filled(
        bar_rect.translate(Vec2::new(1.0, 2.0)),
        rounding,
        Color32::from_black_alpha(35),
    );
    painter.rect_filled(bar_rect, rounding, theme::lane_color(lane));

    if is_dragged || is_editing {
        painter.rect_stroke(
            bar_rect.expand(1.5),
            Rounding::same(theme::BAR_ROUNDING + 1.5),
            Stroke::new(2.0, theme::BORDER_ACCENT),
        );
    }

    // Name on bar, clipped to bar bounds
    if !is_editing && bar_rect.width() > 30.0 {
        let galley = painter.layout_no_wrap(item.name.clone(), theme::font_bar(), theme::TEXT_ON_BAR);
        let text_y = bar_rect.top() + (bar_rect.height() - galley.size().y) / 2.0;
        painter.with_clip_rect(bar_rect).galley(
            Pos2::new(bar_rect.left() + HANDLE_WIDTH, text_y),
            galley,
            Color32::TRANSPARENT,
        );
    }
}

fn draw_handles(painter: &egui::Painter, bar_rect: Rect) {
    let handle_h = bar_rect.height() * 0.55;
    let handle_y = bar_rect.center().y - handle_h / 2.0;
    for x in [bar_rect.left() + 1.5, bar_rect.right() - 5.5] {
        painter.rect_filled(
            Rect::from_min_size(Pos2::new(x, handle_y), Vec2::new(4.0, handle_h)),
            Rounding::same(2.0),
            theme::HANDLE_COLOR,
        );
    }
}
