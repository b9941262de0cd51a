use eframe::egui;

use crate::render::Figure;
use crate::state::ViewerState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct WordvizApp {
    pub state: ViewerState,
}

impl WordvizApp {
    pub fn new(figure: Figure) -> Self {
        Self {
            state: ViewerState::new(figure),
        }
    }
}

impl eframe::App for WordvizApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: search and neighbours ----
        egui::SidePanel::left("search_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::embedding_plot(ui, &mut self.state);
        });
    }
}

/// Open a desktop window showing `figure`; blocks until it is closed.
pub fn show(figure: Figure) -> eframe::Result {
    let title = figure
        .title
        .clone()
        .unwrap_or_else(|| "wordviz".to_string());
    // Follow the figure theme: dark background → dark visuals.
    let bg = figure.theme.background;
    let dark = u16::from(bg.red) + u16::from(bg.green) + u16::from(bg.blue) < 3 * 128;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        &title,
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(if dark {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            Ok(Box::new(WordvizApp::new(figure)))
        }),
    )
}
