use serde::Serialize;

use super::figure::Figure;
use super::svg::to_svg;
use crate::color::hex;
use crate::error::RenderError;

/// Hover target for one drawn point, in SVG pixel coordinates.
#[derive(Serialize)]
struct HoverPoint<'a> {
    token: &'a str,
    group: Option<&'a str>,
    x: f64,
    y: f64,
}

const SCRIPT: &str = r#"
const svg = document.querySelector("svg");
const tip = document.getElementById("tooltip");
svg.addEventListener("mousemove", (e) => {
  const box = svg.getBoundingClientRect();
  const x = (e.clientX - box.left) * svg.viewBox.baseVal.width / box.width;
  const y = (e.clientY - box.top) * svg.viewBox.baseVal.height / box.height;
  let best = null, bestDist = HOVER_RADIUS * HOVER_RADIUS;
  for (const p of POINTS) {
    const d = (p.x - x) ** 2 + (p.y - y) ** 2;
    if (d <= bestDist) { best = p; bestDist = d; }
  }
  if (best === null) { tip.style.display = "none"; return; }
  tip.textContent = best.group ? `${best.token} (${best.group})` : best.token;
  tip.style.left = e.pageX + 12 + "px";
  tip.style.top = e.pageY + 12 + "px";
  tip.style.display = "block";
});
svg.addEventListener("mouseleave", () => { tip.style.display = "none"; });
"#;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Self-contained HTML page around the SVG figure, with a tooltip naming
/// the token under the cursor.
pub fn to_html(figure: &Figure) -> Result<String, RenderError> {
    let theme = &figure.theme;
    let title = figure.title.as_deref().unwrap_or("Word embeddings");
    let points: Vec<HoverPoint<'_>> = figure
        .points
        .iter()
        .map(|p| HoverPoint {
            token: &p.token,
            group: p.group.as_deref(),
            x: p.position[0],
            y: p.position[1],
        })
        .collect();
    let points = serde_json::to_string(&points)
        .map_err(|e| RenderError::Draw(format!("serializing hover data: {e}")))?
        .replace("</", "<\\/");

    Ok(format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
         <style>\n\
         body {{ margin: 0; background: {bg}; color: {fg}; }}\n\
         #tooltip {{ position: absolute; display: none; pointer-events: none; padding: 2px 6px; \
         font: 12px sans-serif; background: {bg}; color: {fg}; border: 1px solid {grid}; }}\n\
         </style>\n</head>\n<body>\n{svg}\n<div id=\"tooltip\"></div>\n\
         <script>\nconst POINTS = {points};\nconst HOVER_RADIUS = {radius};\n{SCRIPT}</script>\n\
         </body>\n</html>\n",
        title = escape(title),
        bg = hex(theme.background),
        fg = hex(theme.text),
        grid = hex(theme.grid),
        svg = to_svg(figure)?,
        radius = figure.point_radius + 3.0,
    ))
}
