use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::state::ViewerState;

// ---------------------------------------------------------------------------
// Left side panel – search, labels, neighbours
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut ViewerState) {
    ui.heading("Search");
    ui.separator();

    ui.add(egui::TextEdit::singleline(&mut state.search).hint_text("token…"));

    let matches = state.matches();
    if !state.search.trim().is_empty() {
        ui.label(format!("{} match(es)", matches.len()));
    }

    let mut clicked = None;
    ScrollArea::vertical()
        .id_salt("search_results")
        .max_height(200.0)
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            for i in matches {
                let token = &state.figure.points[i].token;
                if ui
                    .selectable_label(state.selected == Some(i), token)
                    .clicked()
                {
                    clicked = Some(i);
                }
            }
        });
    if clicked.is_some() {
        state.selected = clicked;
    }

    ui.separator();
    ui.checkbox(&mut state.show_labels, "Show labels");
    ui.add(egui::Slider::new(&mut state.neighbor_count, 1..=50).text("neighbours"));
    ui.separator();

    let Some(selected) = state.selected else {
        ui.label("Click a point or search to select a token.");
        return;
    };
    ui.strong(format!("Nearest to '{}'", state.figure.points[selected].token));

    let neighbors = state.neighbors();
    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(100.0))
        .column(Column::remainder())
        .header(18.0, |mut header| {
            header.col(|ui| {
                ui.strong("Token");
            });
            header.col(|ui| {
                ui.strong("Distance");
            });
        })
        .body(|mut body| {
            for (token, distance) in &neighbors {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(token);
                    });
                    row.col(|ui| {
                        ui.label(format!("{distance:.4}"));
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut ViewerState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Export SVG…").clicked() {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.label(format!(
            "{} tokens, {} labels",
            state.figure.len(),
            state.figure.labels.len()
        ));
        if state.figure.layout.is_degraded() {
            ui.label(
                RichText::new(format!(
                    "{} overlapping labels",
                    state.figure.layout.overlapping_pairs
                ))
                .color(Color32::YELLOW),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(msg);
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn export_dialog(state: &mut ViewerState) {
    let file = rfd::FileDialog::new()
        .set_title("Export figure")
        .add_filter("SVG", &["svg"])
        .set_file_name("figure.svg")
        .save_file();

    if let Some(path) = file {
        match state.export_svg(&path) {
            Ok(()) => log::info!("Exported figure to {}", path.display()),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
