use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::drag::DragController;
use crate::model::viewport::data_bounds;
use crate::model::{
    Item, ItemId, ItemRecord, ItemStore, LaneLayout, LaneSet, TimelineConfig, TimelineViewport,
    ZoomDirection,
};
use crate::ui;
use crate::ui::timeline_view::{PointerCapture, ScrollState};

/// Items bundled with the desktop build.
const SAMPLE_ITEMS: &str = include_str!("../assets/timeline_items.json");

/// Ordered replace-by-id item store owned by the host.
#[derive(Debug, Clone, Default)]
pub struct ItemCollection {
    items: Vec<Item>,
    revision: u64,
}

impl ItemCollection {
    pub fn new(items: Vec<Item>) -> Self {
        Self { items, revision: 0 }
    }

    /// Convert wire records one at a time. Malformed or repeated records are
    /// logged and skipped; returns the collection and the skipped count.
    pub fn from_records(records: Vec<ItemRecord>) -> (Self, usize) {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(records.len());
        let mut skipped = 0usize;

        for record in records {
            if !seen.insert(record.id) {
                warn!(item = %record.id, "skipping item with duplicate id");
                skipped += 1;
                continue;
            }
            match Item::try_from(record) {
                Ok(item) => items.push(item),
                Err(err) => {
                    warn!(error = %err, "skipping malformed item");
                    skipped += 1;
                }
            }
        }

        (Self::new(items), skipped)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bumped on every accepted replacement.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl ItemStore for ItemCollection {
    fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|it| it.id == id)
    }

    fn replace_item(&mut self, item: Item) -> bool {
        let replaced = self.items.replace_item(item);
        if replaced {
            self.revision += 1;
        }
        replaced
    }
}

/// Parse a JSON array of item records.
pub fn load_records(json: &str) -> Result<Vec<ItemRecord>> {
    Ok(serde_json::from_str(json)?)
}

/// Main application state.
pub struct TimelineApp {
    pub config: TimelineConfig,
    pub items: ItemCollection,
    pub viewport: TimelineViewport,
    pub scroll: ScrollState,
    pub status_message: String,
    explicit_bounds: Option<(NaiveDate, NaiveDate)>,
    controller: DragController<PointerCapture>,
    lanes: LaneSet,
    lanes_revision: Option<u64>,
}

impl TimelineApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        ui::theme::apply_theme(&cc.egui_ctx);
        Self::from_json(SAMPLE_ITEMS, TimelineConfig::default(), None)
    }

    /// Build from a JSON item list. Unreadable input yields an empty
    /// timeline with the cause in the status bar.
    pub fn from_json(
        json: &str,
        config: TimelineConfig,
        explicit_bounds: Option<(NaiveDate, NaiveDate)>,
    ) -> Self {
        match load_records(json) {
            Ok(records) => Self::with_records(records, config, explicit_bounds),
            Err(err) => {
                warn!(error = %err, "could not read timeline items");
                let mut app = Self::with_records(Vec::new(), config, explicit_bounds);
                app.status_message = format!("Could not read items: {err}");
                app
            }
        }
    }

    pub fn with_records(
        records: Vec<ItemRecord>,
        config: TimelineConfig,
        explicit_bounds: Option<(NaiveDate, NaiveDate)>,
    ) -> Self {
        let (items, skipped) = ItemCollection::from_records(records);
        info!(items = items.len(), skipped, "timeline items loaded");

        let today = chrono::Local::now().date_naive();
        let viewport = TimelineViewport::from_items(items.items(), explicit_bounds, today, &config);
        let status_message = if skipped > 0 {
            format!("Loaded {} items ({} skipped)", items.len(), skipped)
        } else {
            format!("Loaded {} items", items.len())
        };

        let mut app = Self {
            controller: DragController::with_capture(config.move_threshold_px, PointerCapture::default()),
            config,
            items,
            viewport,
            scroll: ScrollState::default(),
            status_message,
            explicit_bounds,
            lanes: LaneSet::default(),
            lanes_revision: None,
        };
        app.refresh_layout();
        app
    }

    pub fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// Recompute lanes (and data-driven bounds) when the store changed.
    pub fn refresh_layout(&mut self) {
        let revision = self.items.revision();
        if self.lanes_revision == Some(revision) {
            return;
        }
        self.lanes = LaneLayout::compute(self.items.items(), self.config.lanes);
        if self.explicit_bounds.is_none() {
            if let Some((min, max)) = data_bounds(self.items.items()) {
                self.viewport.set_bounds(min, max);
            }
        }
        self.lanes_revision = Some(revision);
    }

    /// Zoom one step around the centre of the visible track.
    pub fn zoom_step(&mut self, direction: ZoomDirection) {
        let anchor = (self.scroll.visible_width / 2.0).max(self.viewport.gutter_width);
        let offset = self.viewport.zoom_in_place(anchor, self.scroll.offset, direction);
        self.scroll.scroll_to(offset);
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.set_pixels_per_day(self.config.default_pixels_per_day);
        let offset = self.viewport.clamp_scroll(self.scroll.offset, self.scroll.visible_width);
        self.scroll.scroll_to(offset);
    }

    pub fn scroll_to_today(&mut self) {
        let today = chrono::Local::now().date_naive();
        match self.viewport.today_x(today) {
            Some(x) => {
                let offset = self
                    .viewport
                    .clamp_scroll(x - self.scroll.visible_width / 2.0, self.scroll.visible_width);
                self.scroll.scroll_to(offset);
            }
            None => self.status_message = "Today is outside the timeline".to_string(),
        }
    }
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.refresh_layout();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "Items: {} · Lanes: {} · Zoom: {:.0}%",
                                self.items.len(),
                                self.lanes.len(),
                                self.viewport.pixels_per_day / self.config.default_pixels_per_day * 100.0
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let today = chrono::Local::now().date_naive();
        let interaction = egui::CentralPanel::default()
            .frame(chart_frame)
            .show(ctx, |ui| {
                ui::timeline_view::show_timeline(
                    &self.lanes,
                    &mut self.items,
                    &mut self.viewport,
                    &mut self.controller,
                    &mut self.scroll,
                    today,
                    self.config.min_label_pixels,
                    self.config.lane_height,
                    ui,
                )
            })
            .inner;

        if let Some(item) = &interaction.dragged {
            self.status_message = format!("Updated '{}' ({} → {})", item.name, item.start, item.end);
        }
        if let Some(item) = &interaction.renamed {
            self.status_message = format!("Renamed to '{}'", item.name);
        }
        if interaction.changed() {
            self.refresh_layout();
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::date::parse_ymd;

    fn record(id: u128, start: &str, end: &str) -> ItemRecord {
        ItemRecord {
            id: ItemId::from_u128(id),
            name: format!("item {id}"),
            start: start.into(),
            end: end.into(),
        }
    }

    #[test]
    fn bundled_items_load_cleanly() {
        let records = load_records(SAMPLE_ITEMS).unwrap();
        let (items, skipped) = ItemCollection::from_records(records);
        assert_eq!(skipped, 0);
        assert!(!items.is_empty());
    }

    #[test]
    fn collection_skips_bad_records() {
        let records = vec![
            record(1, "2024-01-01", "2024-01-03"),
            record(2, "2024-01-xx", "2024-01-03"),
            record(1, "2024-02-01", "2024-02-03"),
        ];
        let (items, skipped) = ItemCollection::from_records(records);
        assert_eq!(items.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn replacements_bump_revision() {
        let (mut items, _) = ItemCollection::from_records(vec![record(1, "2024-01-01", "2024-01-03")]);
        let mut changed = items.items()[0].clone();
        changed.name = "renamed".into();
        assert!(items.replace_item(changed.clone()));
        assert_eq!(items.revision(), 1);

        changed.id = ItemId::from_u128(99);
        assert!(!items.replace_item(changed));
        assert_eq!(items.revision(), 1);
    }

    #[test]
    fn layout_follows_store_changes() {
        let records = vec![
            record(1, "2024-01-01", "2024-01-03"),
            record(2, "2024-01-02", "2024-01-04"),
        ];
        let mut app = TimelineApp::with_records(records, TimelineConfig::default(), None);
        assert_eq!(app.lanes().len(), 2);
        assert_eq!(app.viewport.max_date, parse_ymd("2024-01-04").unwrap());

        let mut moved = app.items.items()[1].clone();
        moved.start = parse_ymd("2024-01-10").unwrap();
        moved.end = parse_ymd("2024-01-12").unwrap();
        app.items.replace_item(moved);
        app.refresh_layout();

        assert_eq!(app.lanes().len(), 1);
        assert_eq!(app.viewport.max_date, parse_ymd("2024-01-12").unwrap());
    }

    #[test]
    fn explicit_bounds_are_kept() {
        let bounds = (parse_ymd("2023-12-01").unwrap(), parse_ymd("2024-03-01").unwrap());
        let app = TimelineApp::with_records(
            vec![record(1, "2024-01-01", "2024-01-03")],
            TimelineConfig::default(),
            Some(bounds),
        );
        assert_eq!((app.viewport.min_date, app.viewport.max_date), bounds);
    }

    #[test]
    fn unreadable_json_gives_empty_timeline() {
        let app = TimelineApp::from_json("[{", TimelineConfig::default(), None);
        assert!(app.items.is_empty());
        assert!(app.lanes().is_empty());
        assert!(app.status_message.starts_with("Could not read items"));
    }

    #[test]
    fn toolbar_zoom_is_clamped() {
        let mut app = TimelineApp::with_records(
            vec![record(1, "2024-01-01", "2024-01-03")],
            TimelineConfig::default(),
            None,
        );
        for _ in 0..100 {
            app.zoom_step(ZoomDirection::In);
        }
        assert_eq!(app.viewport.pixels_per_day, 400.0);
        app.reset_zoom();
        assert_eq!(app.viewport.pixels_per_day, 70.0);
    }
}
