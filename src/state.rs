use std::path::Path;

use anyhow::Context;

use crate::render::Figure;

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct ViewerState {
    pub figure: Figure,

    /// Token search box contents.
    pub search: String,

    /// Index into `figure.points` of the selected token.
    pub selected: Option<usize>,

    pub show_labels: bool,

    /// Rows in the nearest-points table.
    pub neighbor_count: usize,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl ViewerState {
    pub fn new(figure: Figure) -> Self {
        Self {
            figure,
            search: String::new(),
            selected: None,
            show_labels: true,
            neighbor_count: 10,
            status_message: None,
        }
    }

    /// Points whose token contains the search text (case-insensitive), in
    /// token order. Empty search matches nothing.
    pub fn matches(&self) -> Vec<usize> {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<usize> = self
            .figure
            .points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.token.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
        hits.sort_by(|&a, &b| self.figure.points[a].token.cmp(&self.figure.points[b].token));
        hits
    }

    /// Select a token by exact name.
    pub fn select_token(&mut self, token: &str) -> bool {
        self.selected = self.figure.points.iter().position(|p| p.token == token);
        self.selected.is_some()
    }

    /// Select the point closest to a plane position, if any lies within
    /// `tolerance` plane units.
    pub fn select_near(&mut self, plane: [f64; 2], tolerance: f64) {
        let closest = (0..self.figure.len())
            .filter_map(|i| {
                let p = self.figure.plane_position(i)?;
                let d = ((p[0] - plane[0]).powi(2) + (p[1] - plane[1]).powi(2)).sqrt();
                Some((i, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        self.selected = closest.filter(|(_, d)| *d <= tolerance).map(|(i, _)| i);
    }

    /// Nearest points to the selection as `(token, distance)`.
    pub fn neighbors(&self) -> Vec<(String, f64)> {
        let Some(selected) = self.selected else {
            return Vec::new();
        };
        self.figure
            .nearest(selected, self.neighbor_count)
            .into_iter()
            .map(|(i, d)| (self.figure.points[i].token.clone(), d))
            .collect()
    }

    pub fn export_svg(&mut self, path: &Path) -> anyhow::Result<()> {
        let svg = self.figure.to_svg().context("Failed to draw SVG")?;
        std::fs::write(path, svg)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.status_message = Some(format!("Exported {}", path.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::projection::{ProjectionMethod, ProjectionResult};
    use crate::render::{render, PlotSpec};

    fn state() -> ViewerState {
        let projection = ProjectionResult::new(
            vec!["king".into(), "queen".into(), "kingdom".into(), "apple".into()],
            array![[0.0, 0.0], [0.1, 0.0], [0.5, 0.5], [4.0, 4.0]],
            ProjectionMethod::Pca,
        )
        .unwrap();
        ViewerState::new(render(&projection, &PlotSpec::default()).unwrap())
    }

    #[test]
    fn search_is_case_insensitive_and_sorted() {
        let mut s = state();
        assert!(s.matches().is_empty());
        s.search = "KING".into();
        let tokens: Vec<&str> = s
            .matches()
            .into_iter()
            .map(|i| s.figure.points[i].token.as_str())
            .collect();
        assert_eq!(tokens, ["king", "kingdom"]);
    }

    #[test]
    fn neighbours_of_selection() {
        let mut s = state();
        assert!(s.neighbors().is_empty());
        assert!(s.select_token("king"));
        let nb = s.neighbors();
        assert_eq!(nb.len(), 3);
        assert_eq!(nb[0].0, "queen");
        assert!((nb[0].1 - 0.1).abs() < 1e-9);
        assert_eq!(nb[2].0, "apple");
        assert!(!s.select_token("ghost"));
    }

    #[test]
    fn click_selects_within_tolerance() {
        let mut s = state();
        s.select_near([3.9, 4.1], 0.5);
        assert_eq!(s.selected.map(|i| s.figure.points[i].token.as_str()), Some("apple"));
        s.select_near([2.0, 2.0], 0.1);
        assert_eq!(s.selected, None);
    }

    #[test]
    fn export_writes_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("view.svg");
        let mut s = state();
        s.export_svg(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<svg"));
        assert!(s.status_message.is_some());
    }
}
