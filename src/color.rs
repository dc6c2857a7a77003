use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Translucent fill for highlight bands.
pub const HIGHLIGHT_FILL: Color32 = Color32::from_rgba_premultiplied(60, 60, 20, 60);

// ---------------------------------------------------------------------------
// Series colours: column name → Color32
// ---------------------------------------------------------------------------

/// Stable colours for the numeric columns of a table, so a series keeps its
/// colour while the selection changes.
#[derive(Debug, Clone, Default)]
pub struct SeriesColors {
    mapping: BTreeMap<String, Color32>,
}

impl SeriesColors {
    pub fn new(columns: &[String]) -> Self {
        let mapping = columns
            .iter()
            .cloned()
            .zip(generate_palette(columns.len()))
            .collect();
        SeriesColors { mapping }
    }

    pub fn color_for(&self, column: &str) -> Color32 {
        self.mapping
            .get(column)
            .copied()
            .unwrap_or(Color32::LIGHT_BLUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_distinct_colour_per_column() {
        let cols = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let colors = SeriesColors::new(&cols);
        assert_ne!(colors.color_for("a"), colors.color_for("b"));
        assert_ne!(colors.color_for("b"), colors.color_for("c"));
        assert_eq!(colors.color_for("zzz"), Color32::LIGHT_BLUE);
        assert!(generate_palette(0).is_empty());
    }
}
