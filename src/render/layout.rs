use log::{debug, warn};

use super::figure::{Label, LayoutReport, Rect};

const MAX_ITERATIONS: usize = 300;
/// Minimum gap kept between label boxes while repelling.
const PADDING: f64 = 2.0;

/// Approximate text box size; glyphs average ~0.6 em wide.
pub fn text_extent(text: &str, font_size: f64, bold: bool) -> (f64, f64) {
    let em = if bold { 0.66 } else { 0.6 };
    (
        text.chars().count() as f64 * font_size * em,
        font_size * 1.2,
    )
}

#[derive(Debug, Clone, Copy)]
struct LabelBox {
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
}

impl LabelBox {
    fn overlap(&self, other: &LabelBox, pad: f64) -> Option<(f64, f64)> {
        let ox = (self.w + other.w) / 2.0 + pad - (self.cx - other.cx).abs();
        let oy = (self.h + other.h) / 2.0 + pad - (self.cy - other.cy).abs();
        (ox > 0.0 && oy > 0.0).then_some((ox, oy))
    }

    /// Closest point of the box to `p`.
    fn clamp(&self, p: [f64; 2]) -> [f64; 2] {
        [
            p[0].clamp(self.cx - self.w / 2.0, self.cx + self.w / 2.0),
            p[1].clamp(self.cy - self.h / 2.0, self.cy + self.h / 2.0),
        ]
    }

    fn keep_inside(&mut self, bounds: &Rect) {
        let half_w = (self.w / 2.0).min(bounds.width() / 2.0);
        let half_h = (self.h / 2.0).min(bounds.height() / 2.0);
        self.cx = self.cx.clamp(bounds.left + half_w, bounds.right - half_w);
        self.cy = self.cy.clamp(bounds.top + half_h, bounds.bottom - half_h);
    }
}

/// Place every label just above its point, then, when `avoid_overlap`,
/// repel overlapping labels from each other and from points until no
/// intersections remain or the pass limit is reached.
///
/// Labels that still overlap afterwards are logged and counted in the
/// report; they are never dropped.
pub fn place_labels(
    labels: &mut [Label],
    points: &[[f64; 2]],
    point_radius: f64,
    font_size: f64,
    bounds: Rect,
    avoid_overlap: bool,
) -> LayoutReport {
    let mut boxes: Vec<LabelBox> = labels
        .iter()
        .map(|label| {
            let (w, h) = text_extent(&label.text, font_size, label.bold);
            let mut b = LabelBox {
                cx: label.anchor[0],
                cy: label.anchor[1] - point_radius - h / 2.0 - 1.0,
                w,
                h,
            };
            b.keep_inside(&bounds);
            b
        })
        .collect();

    let mut iterations = 0;
    if avoid_overlap {
        while iterations < MAX_ITERATIONS {
            iterations += 1;
            let moved = repel_labels(&mut boxes) | repel_points(&mut boxes, points, point_radius);
            for b in &mut boxes {
                b.keep_inside(&bounds);
            }
            if !moved {
                break;
            }
        }
    }

    for (label, b) in labels.iter_mut().zip(&boxes) {
        label.offset = [b.cx - label.anchor[0], b.cy - label.anchor[1]];
    }

    let report = LayoutReport {
        labels: labels.len(),
        iterations,
        overlapping_pairs: count_overlaps(&boxes),
    };
    if avoid_overlap && report.is_degraded() {
        warn!(
            "Label layout left {} overlapping pair(s) after {} passes",
            report.overlapping_pairs, report.iterations
        );
    } else {
        debug!("Placed {} labels in {} passes", report.labels, report.iterations);
    }
    report
}

fn repel_labels(boxes: &mut [LabelBox]) -> bool {
    let mut moved = false;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let Some((ox, oy)) = boxes[i].overlap(&boxes[j], PADDING) else {
                continue;
            };
            moved = true;
            // Move both halfway apart along the axis of least overlap.
            if ox < oy {
                let dir = if boxes[i].cx <= boxes[j].cx { -1.0 } else { 1.0 };
                boxes[i].cx += dir * ox / 2.0;
                boxes[j].cx -= dir * ox / 2.0;
            } else {
                let dir = if boxes[i].cy <= boxes[j].cy { -1.0 } else { 1.0 };
                boxes[i].cy += dir * oy / 2.0;
                boxes[j].cy -= dir * oy / 2.0;
            }
        }
    }
    moved
}

fn repel_points(boxes: &mut [LabelBox], points: &[[f64; 2]], radius: f64) -> bool {
    let mut moved = false;
    for b in boxes.iter_mut() {
        for &p in points {
            let closest = b.clamp(p);
            let (dx, dy) = (closest[0] - p[0], closest[1] - p[1]);
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= radius {
                continue;
            }
            moved = true;
            let push = radius - dist + 1.0;
            if dist > 0.0 {
                b.cx += dx / dist * push;
                b.cy += dy / dist * push;
            } else {
                // Point inside the box: shift vertically past it.
                let dir = if b.cy <= p[1] { -1.0 } else { 1.0 };
                b.cy = p[1] + dir * (b.h / 2.0 + radius + 1.0);
            }
        }
    }
    moved
}

fn count_overlaps(boxes: &[LabelBox]) -> usize {
    let mut count = 0;
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if boxes[i].overlap(&boxes[j], 0.0).is_some() {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect {
            left: 0.0,
            top: 0.0,
            right: 400.0,
            bottom: 300.0,
        }
    }

    fn label(point: usize, text: &str, anchor: [f64; 2]) -> Label {
        Label {
            point,
            text: text.to_string(),
            anchor,
            offset: [0.0, 0.0],
            bold: false,
        }
    }

    #[test]
    fn single_label_sits_above_its_point() {
        let mut labels = vec![label(0, "king", [200.0, 150.0])];
        let report = place_labels(&mut labels, &[[200.0, 150.0]], 4.0, 11.0, bounds(), true);
        assert_eq!(report.overlapping_pairs, 0);
        assert!(labels[0].offset[1] < 0.0);
        assert_eq!(labels[0].offset[0], 0.0);
    }

    #[test]
    fn crowded_labels_are_separated() {
        let anchors = [[200.0, 150.0], [202.0, 151.0], [198.0, 149.0], [201.0, 150.0]];
        let mut labels: Vec<Label> = anchors
            .iter()
            .enumerate()
            .map(|(i, &a)| label(i, &format!("word{i}"), a))
            .collect();

        let mut untouched = labels.clone();
        let before = place_labels(&mut untouched, &anchors, 4.0, 11.0, bounds(), false);
        assert_eq!(before.iterations, 0);
        assert!(before.overlapping_pairs > 0);

        let after = place_labels(&mut labels, &anchors, 4.0, 11.0, bounds(), true);
        assert!(after.iterations > 0);
        assert_eq!(after.overlapping_pairs, 0);
    }

    #[test]
    fn impossible_layout_is_reported_not_fatal() {
        let tiny = Rect {
            left: 0.0,
            top: 0.0,
            right: 20.0,
            bottom: 12.0,
        };
        let mut labels = vec![label(0, "alpha", [10.0, 6.0]), label(1, "beta", [10.0, 6.0])];
        let report = place_labels(&mut labels, &[[10.0, 6.0]; 2], 2.0, 10.0, tiny, true);
        assert_eq!(report.labels, 2);
        assert!(report.is_degraded());
    }

    #[test]
    fn labels_stay_inside_bounds() {
        let mut labels = vec![label(0, "edge", [399.0, 1.0])];
        place_labels(&mut labels, &[[399.0, 1.0]], 4.0, 11.0, bounds(), true);
        let c = labels[0].center();
        assert!(bounds().contains(c));
    }
}
