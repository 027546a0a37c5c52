use crate::app::TimelineApp;
use crate::model::ZoomDirection;
use crate::ui::theme;
use egui::{menu, RichText, Ui};

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut TimelineApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  View  ").font(theme::font_header()), |ui| {
            if ui.button("  Zoom In        Ctrl+Scroll ↑").clicked() {
                app.zoom_step(ZoomDirection::In);
                ui.close_menu();
            }
            if ui.button("  Zoom Out      Ctrl+Scroll ↓").clicked() {
                app.zoom_step(ZoomDirection::Out);
                ui.close_menu();
            }
            if ui.button("  Reset Zoom").clicked() {
                app.reset_zoom();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Go to Today").clicked() {
                app.scroll_to_today();
                ui.close_menu();
            }
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(
                RichText::new("Drag bars to move · Drag edges to resize · Double-click to rename")
                    .size(11.0)
                    .weak(),
            );
        });
    });
}
