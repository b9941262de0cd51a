use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;

use super::figure::{Figure, Rect};
use crate::color::to_rgb;
use crate::error::RenderError;

const GRID_LINES: usize = 8;
const POINT_OPACITY: f64 = 0.5;

pub(crate) fn draw_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Draw(err.to_string())
}

pub(crate) fn px(p: [f64; 2]) -> (i32, i32) {
    (p[0].round() as i32, p[1].round() as i32)
}

pub(crate) fn font(size: f64, bold: bool) -> FontDesc<'static> {
    let style = if bold { FontStyle::Bold } else { FontStyle::Normal };
    FontDesc::new(FontFamily::SansSerif, size, style)
}

/// Render a figure to a standalone SVG document.
pub fn to_svg(figure: &Figure) -> Result<String, RenderError> {
    let mut out = String::new();
    {
        let root = SVGBackend::with_string(&mut out, (figure.width, figure.height))
            .into_drawing_area();
        draw(figure, &root)?;
        root.present().map_err(draw_error)?;
    }
    Ok(out)
}

fn draw<DB: DrawingBackend>(
    figure: &Figure,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), RenderError> {
    let theme = &figure.theme;
    let text = to_rgb(theme.text);
    root.fill(&to_rgb(theme.background)).map_err(draw_error)?;

    if let Some(density) = &figure.density {
        let (lo, hi) = density.range();
        let (rows, cols) = density.values.dim();
        let area = density.area;
        let cw = area.width() / cols as f64;
        let ch = area.height() / rows as f64;
        for ((row, col), &v) in density.values.indexed_iter() {
            let t = if hi > lo { (v - lo) / (hi - lo) } else { 0.0 };
            let top_left = [area.left + col as f64 * cw, area.top + row as f64 * ch];
            let bottom_right = [top_left[0] + cw, top_left[1] + ch];
            root.draw(&Rectangle::new(
                [px(top_left), px(bottom_right)],
                to_rgb(theme.scale.sample(t)).mix(0.8).filled(),
            ))
            .map_err(draw_error)?;
        }
    }

    if figure.grid {
        draw_grid(figure, root)?;
    }

    if let Some(title) = &figure.title {
        let style = font(figure.font_size * 1.3, true)
            .color(&text)
            .pos(Pos::new(HPos::Center, VPos::Center));
        let at = [figure.width as f64 / 2.0, figure.font_size * 2.0];
        root.draw(&Text::new(title.as_str(), px(at), style))
            .map_err(draw_error)?;
    }

    // Leader lines for labels pushed away from their points.
    let leader_threshold = figure.point_radius + figure.font_size * 1.5;
    for label in &figure.labels {
        let [dx, dy] = label.offset;
        if (dx * dx + dy * dy).sqrt() > leader_threshold {
            root.draw(&PathElement::new(
                vec![px(label.anchor), px(label.center())],
                text.mix(0.6).stroke_width(1),
            ))
            .map_err(draw_error)?;
        }
    }

    for p in &figure.points {
        let radius = if p.highlighted {
            figure.point_radius * 1.4
        } else {
            figure.point_radius
        };
        root.draw(&Circle::new(
            px(p.position),
            radius.round().max(1.0) as u32,
            to_rgb(p.color).mix(POINT_OPACITY).filled(),
        ))
        .map_err(draw_error)?;
    }

    let center_size = (figure.point_radius * 1.6).round().max(2.0) as u32;
    for c in &figure.centers {
        root.draw(&Cross::new(px(*c), center_size, text.stroke_width(2)))
            .map_err(draw_error)?;
    }

    for label in &figure.labels {
        let style = font(figure.font_size, label.bold)
            .color(&text)
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(label.text.as_str(), px(label.center()), style))
            .map_err(draw_error)?;
    }

    if !figure.legend.is_empty() {
        draw_legend(figure, root)?;
    }
    Ok(())
}

/// Light mesh over the plot area, in plane coordinates.
fn draw_grid<DB: DrawingBackend>(
    figure: &Figure,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), RenderError> {
    let Rect { left, top, .. } = figure.frame.area;
    let plot = root.clone().shrink(
        (left.round() as i32, top.round() as i32),
        (
            figure.frame.area.width().round() as u32,
            figure.frame.area.height().round() as u32,
        ),
    );
    let mut chart = ChartBuilder::on(&plot)
        .build_cartesian_2d(figure.frame.x_range(), figure.frame.y_range())
        .map_err(draw_error)?;
    chart
        .configure_mesh()
        .x_labels(GRID_LINES)
        .y_labels(GRID_LINES)
        .max_light_lines(0)
        .bold_line_style(to_rgb(figure.theme.grid).mix(0.6).stroke_width(1))
        .draw()
        .map_err(draw_error)?;
    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    figure: &Figure,
    root: &DrawingArea<DB, Shift>,
) -> Result<(), RenderError> {
    let theme = &figure.theme;
    let row = figure.font_size * 1.6;
    let longest = figure
        .legend
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0);
    let width = longest as f64 * figure.font_size * 0.6 + row * 1.5;
    let height = row * figure.legend.len() as f64 + row * 0.5;
    let left = figure.frame.area.right - width;
    let top = figure.frame.area.top;
    let corners = [px([left, top]), px([left + width, top + height])];

    root.draw(&Rectangle::new(corners, to_rgb(theme.background).filled()))
        .map_err(draw_error)?;
    root.draw(&Rectangle::new(corners, to_rgb(theme.grid).stroke_width(1)))
        .map_err(draw_error)?;

    let text = to_rgb(theme.text);
    let marker = (figure.font_size * 0.4).round().max(1.0) as u32;
    for (i, entry) in figure.legend.iter().enumerate() {
        let cy = top + row * (i as f64 + 0.75);
        root.draw(&Circle::new(
            px([left + row * 0.6, cy]),
            marker,
            to_rgb(entry.color).filled(),
        ))
        .map_err(draw_error)?;
        let style = font(figure.font_size, false)
            .color(&text)
            .pos(Pos::new(HPos::Left, VPos::Center));
        root.draw(&Text::new(entry.name.as_str(), px([left + row * 1.1, cy]), style))
            .map_err(draw_error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{ProjectionMethod, ProjectionResult};
    use crate::render::{render, Coloring, PlotSpec};

    fn figure(spec: &PlotSpec) -> Figure {
        let projection = ProjectionResult::new(
            vec!["a<b".into(), "c".into(), "d".into()],
            ndarray::array![[0.0, 0.0], [1.0, 0.5], [2.0, 2.0]],
            ProjectionMethod::Pca,
        )
        .unwrap();
        render(&projection, spec).unwrap()
    }

    #[test]
    fn draws_a_circle_per_point_and_escapes_labels() {
        let svg = to_svg(&figure(&PlotSpec::default())).unwrap();
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("a&lt;b"));
        assert!(!svg.contains("a<b"));
    }

    #[test]
    fn legend_and_centers_for_clusters() {
        let spec = PlotSpec {
            coloring: Coloring::Clusters {
                k: 2,
                show_centers: true,
            },
            ..PlotSpec::default()
        };
        let svg = to_svg(&figure(&spec)).unwrap();
        assert!(svg.contains("Cluster 1") && svg.contains("Cluster 2"));
        // Three points plus one legend marker per cluster.
        assert_eq!(svg.matches("<circle").count(), 5);
    }

    #[test]
    fn density_underlay_adds_cells() {
        let plain = to_svg(&figure(&PlotSpec::default())).unwrap();
        let spec = PlotSpec {
            density: true,
            ..PlotSpec::default()
        };
        let shaded = to_svg(&figure(&spec)).unwrap();
        assert!(shaded.matches("<rect").count() > plain.matches("<rect").count() + 1000);
    }
}
