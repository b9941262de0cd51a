use std::collections::BTreeMap;
use std::str::FromStr;

use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};
use plotters::style::RGBColor;
use serde::Deserialize;

/// 8-bit sRGB colour used throughout figures.
pub type Color = Srgb<u8>;

/// `#rrggbb` form of a colour.
pub fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

/// Drawing colour for plotters backends.
pub fn to_rgb(color: Color) -> RGBColor {
    RGBColor(color.red, color.green, color.blue)
}

const fn rgb(hex: u32) -> Color {
    Srgb::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.55, 0.6);
            let rgb: Srgb = hsl.into_color();
            rgb.into_format()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Continuous colour scales (density, heatmaps)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScale {
    Viridis,
    Plasma,
}

const VIRIDIS: [u32; 6] = [0x440154, 0x414487, 0x2a788e, 0x22a884, 0x7ad151, 0xfde725];
const PLASMA: [u32; 6] = [0x0d0887, 0x6a00a8, 0xb12a90, 0xe16462, 0xfca636, 0xf0f921];

impl ColorScale {
    /// Colour at `t ∈ [0, 1]`, interpolated in linear RGB between stops.
    pub fn sample(self, t: f64) -> Color {
        let stops = match self {
            Self::Viridis => &VIRIDIS,
            Self::Plasma => &PLASMA,
        };
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let pos = t * (stops.len() - 1) as f64;
        let i = (pos.floor() as usize).min(stops.len() - 2);
        let frac = (pos - i as f64) as f32;

        let a: LinSrgb = rgb(stops[i]).into_format::<f32>().into_linear();
        let b: LinSrgb = rgb(stops[i + 1]).into_format::<f32>().into_linear();
        let mixed: Srgb = Srgb::from_linear(a.mix(b, frac));
        mixed.into_format()
    }
}

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Light1,
    Dark1,
}

impl FromStr for ThemeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light1" | "light" => Ok(Self::Light1),
            "dark1" | "dark" => Ok(Self::Dark1),
            other => Err(format!("unknown theme '{other}' (light1|dark1)")),
        }
    }
}

/// Colours for one figure style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub points: Color,
    /// Highlighted tokens (e.g. the query word of a similarity plot).
    pub target: Color,
    pub grid: Color,
    pub text: Color,
    pub scale: ColorScale,
}

impl Theme {
    pub fn get(name: ThemeName) -> Self {
        match name {
            ThemeName::Light1 => Self {
                background: rgb(0xf5f5fa),
                points: rgb(0x66c2a5),
                target: rgb(0xe78ac3),
                grid: rgb(0xcccccc),
                text: rgb(0x1a1a1a),
                scale: ColorScale::Viridis,
            },
            ThemeName::Dark1 => Self {
                background: rgb(0x1a1a1a),
                points: rgb(0xfc8d62),
                target: rgb(0xa6d854),
                grid: rgb(0x444444),
                text: rgb(0xf0f0f0),
                scale: ColorScale::Plasma,
            },
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::get(ThemeName::default())
    }
}

// ---------------------------------------------------------------------------
// Color mapping: group name → colour
// ---------------------------------------------------------------------------

/// Maps group names (cluster labels, user-defined categories) to distinct
/// colours.
#[derive(Debug, Clone)]
pub struct GroupColorMap {
    mapping: BTreeMap<String, Color>,
    default_color: Color,
}

impl GroupColorMap {
    /// Build a colour map from the set of group names.
    pub fn new<'a>(groups: impl IntoIterator<Item = &'a str>, default_color: Color) -> Self {
        let names: std::collections::BTreeSet<&str> = groups.into_iter().collect();
        let palette = generate_palette(names.len());
        let mapping = names
            .into_iter()
            .zip(palette)
            .map(|(name, c)| (name.to_string(), c))
            .collect();

        GroupColorMap {
            mapping,
            default_color,
        }
    }

    /// Look up the colour for a group.
    pub fn color_for(&self, group: &str) -> Color {
        self.mapping
            .get(group)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Return the legend entries (group → colour).
    pub fn legend_entries(&self) -> Vec<(String, Color)> {
        self.mapping
            .iter()
            .map(|(name, c)| (name.clone(), *c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let p = generate_palette(5);
        assert_eq!(p.len(), 5);
        for i in 0..p.len() {
            for j in (i + 1)..p.len() {
                assert_ne!(p[i], p[j]);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(hex(rgb(0x66c2a5)), "#66c2a5");
        assert_eq!(hex(Theme::get(ThemeName::Dark1).background), "#1a1a1a");
    }

    #[test]
    fn scale_endpoints_match_stops() {
        assert_eq!(ColorScale::Viridis.sample(0.0), rgb(VIRIDIS[0]));
        assert_eq!(ColorScale::Viridis.sample(1.0), rgb(VIRIDIS[5]));
        assert_eq!(ColorScale::Plasma.sample(f64::NAN), rgb(PLASMA[0]));
    }

    #[test]
    fn group_map_is_stable_and_has_fallback() {
        let map = GroupColorMap::new(["fruit", "animal", "fruit"], rgb(0x808080));
        assert_eq!(map.legend_entries().len(), 2);
        assert_eq!(map.legend_entries()[0].0, "animal");
        assert_eq!(map.color_for("unknown"), rgb(0x808080));
        assert_ne!(map.color_for("fruit"), map.color_for("animal"));
    }
}
