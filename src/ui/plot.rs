use std::collections::BTreeMap;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{Plot, PlotPoint, PlotPoints, Points, Text};

use crate::color::Color;
use crate::state::ViewerState;

/// Click distance, as a fraction of the visible plot width, that still
/// selects a point.
const PICK_TOLERANCE: f64 = 0.02;

fn color32(c: Color) -> Color32 {
    Color32::from_rgb(c.red, c.green, c.blue)
}

// ---------------------------------------------------------------------------
// Embedding scatter plot (central panel)
// ---------------------------------------------------------------------------

/// Render the scatter plot in the central panel.
pub fn embedding_plot(ui: &mut Ui, state: &mut ViewerState) {
    let figure = &state.figure;
    if figure.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No tokens to show");
        });
        return;
    }

    // One series per colour so the legend lists groups once.
    let mut series: BTreeMap<(u8, u8, u8), (String, Vec<[f64; 2]>)> = BTreeMap::new();
    for (i, p) in figure.points.iter().enumerate() {
        let Some(pos) = figure.plane_position(i) else {
            continue;
        };
        series
            .entry((p.color.red, p.color.green, p.color.blue))
            .or_insert_with(|| (p.group.clone().unwrap_or_default(), Vec::new()))
            .1
            .push(pos);
    }

    let labels: Vec<([f64; 2], String, bool)> = if state.show_labels {
        figure
            .labels
            .iter()
            .map(|l| (figure.frame.to_plane(l.center()), l.text.clone(), l.bold))
            .collect()
    } else {
        Vec::new()
    };
    let selected = state.selected.and_then(|i| figure.plane_position(i));
    let text_color = color32(figure.theme.text);
    let radius = figure.point_radius as f32;

    let response = Plot::new("embedding_plot")
        .legend(egui_plot::Legend::default())
        .show_grid(figure.grid)
        .show_axes(false)
        .data_aspect(1.0)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for ((r, g, b), (name, positions)) in series {
                let points = Points::new(PlotPoints::from(positions))
                    .color(Color32::from_rgba_unmultiplied(r, g, b, 160))
                    .radius(radius)
                    .filled(true);
                let points = if name.is_empty() { points } else { points.name(name) };
                plot_ui.points(points);
            }

            if let Some(pos) = selected {
                plot_ui.points(
                    Points::new(PlotPoints::from(vec![pos]))
                        .color(text_color)
                        .radius(radius * 2.0)
                        .filled(false),
                );
            }

            for (pos, text, bold) in labels {
                let text = RichText::new(text).color(text_color);
                let text = if bold { text.strong() } else { text };
                plot_ui.text(Text::new(PlotPoint::new(pos[0], pos[1]), text));
            }

            let clicked = plot_ui.response().clicked();
            let width = plot_ui.plot_bounds().width();
            plot_ui
                .pointer_coordinate()
                .filter(|_| clicked)
                .map(|p| ([p.x, p.y], width * PICK_TOLERANCE))
        });

    if let Some((pos, tolerance)) = response.inner {
        state.select_near(pos, tolerance);
    }
}
