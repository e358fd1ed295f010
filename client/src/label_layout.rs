use isoline_shared::IsolineFeature;

use crate::geom::label_anchor;
use crate::viewport::Viewport;

/// Rough advance width of a sans-serif glyph relative to the font size.
const GLYPH_WIDTH_RATIO: f64 = 0.6;

/// One label to draw, in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub feature_index: usize,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacedLabel {
    /// Box centered on the anchor.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let hw = self.width / 2.0;
        let hh = self.height / 2.0;
        (self.x - hw, self.y - hh, self.x + hw, self.y + hh)
    }

    pub fn contains(&self, sx: f64, sy: f64, tolerance: f64) -> bool {
        let (x0, y0, x1, y1) = self.bounds();
        sx >= x0 - tolerance && sx <= x1 + tolerance && sy >= y0 - tolerance && sy <= y1 + tolerance
    }

    fn overlaps(&self, other: &PlacedLabel) -> bool {
        let (ax0, ay0, ax1, ay1) = self.bounds();
        let (bx0, by0, bx1, by1) = other.bounds();
        ax0 < bx1 && bx0 < ax1 && ay0 < by1 && by0 < ay1
    }
}

pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * GLYPH_WIDTH_RATIO
}

/// Lay out one label per named feature in feature order. With `declutter`,
/// a label that overlaps an already placed one is dropped. `measure` returns
/// the text width in CSS pixels.
pub fn layout_labels(
    features: &[IsolineFeature],
    vp: &Viewport,
    font_size: f64,
    declutter: bool,
    measure: impl Fn(&str) -> f64,
) -> Vec<PlacedLabel> {
    let mut placed: Vec<PlacedLabel> = Vec::new();
    for (feature_index, feature) in features.iter().enumerate() {
        let (Some(name), Some(geometry)) = (feature.name.as_deref(), feature.geometry.as_ref())
        else {
            continue;
        };
        let Some([wx, wy]) = label_anchor(geometry) else {
            continue;
        };
        let (x, y) = vp.world_to_screen(wx, wy);
        let label = PlacedLabel {
            feature_index,
            text: name.to_owned(),
            x,
            y,
            width: measure(name),
            height: font_size,
        };
        if label.x + label.width < 0.0
            || label.x - label.width > vp.width
            || label.y + label.height < 0.0
            || label.y - label.height > vp.height
        {
            continue;
        }
        if declutter && placed.iter().any(|p| p.overlaps(&label)) {
            continue;
        }
        placed.push(label);
    }
    placed
}
