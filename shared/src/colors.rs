use serde::{Deserialize, Serialize};

/// An sRGB color with 8-bit channels and a floating alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// `#rrggbb`, or `#rrggbbaa` when the color is not fully opaque.
    pub fn to_hex(&self) -> String {
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            let alpha = (self.a.clamp(0.0, 1.0) * 255.0).round() as u8;
            format!("#{:02x}{:02x}{:02x}{alpha:02x}", self.r, self.g, self.b)
        }
    }

    /// CSS `rgba(...)` string for canvas fill/stroke styles.
    pub fn to_css(&self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }

    /// Normalized `[r, g, b, a]` for GPU buffers.
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32,
        ]
    }
}

pub const BLUE: Rgba = Rgba::rgb(0, 0, 255);
pub const GREEN: Rgba = Rgba::rgb(0, 128, 0);
pub const YELLOW: Rgba = Rgba::rgb(255, 255, 0);
pub const RED: Rgba = Rgba::rgb(255, 0, 0);
pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
pub const GRAY: Rgba = Rgba::rgb(128, 128, 128);
pub const PURPLE: Rgba = Rgba::rgb(128, 0, 128);
pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0.0);

/// Continuous color scale over evenly spaced stops, interpolated linearly in RGB.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    stops: Vec<Rgba>,
    min: f64,
    max: f64,
}

impl ColorScale {
    pub fn new(stops: &[Rgba], domain: (f64, f64)) -> Self {
        Self {
            stops: stops.to_vec(),
            min: domain.0,
            max: domain.1,
        }
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Normalized position of `value` on the scale, clamped to `0.0..=1.0`.
    /// A degenerate domain places every value at the end of the scale.
    pub fn position(&self, value: f64) -> f64 {
        if self.max == self.min {
            return 1.0;
        }
        let t = (value - self.min) / (self.max - self.min);
        if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) }
    }

    pub fn color_at(&self, value: f64) -> Rgba {
        match self.stops.as_slice() {
            [] => TRANSPARENT,
            [only] => *only,
            stops => {
                let t = self.position(value);
                let segments = (stops.len() - 1) as f64;
                let scaled = t * segments;
                let idx = (scaled.floor() as usize).min(stops.len() - 2);
                let local = scaled - idx as f64;
                mix(stops[idx], stops[idx + 1], local)
            }
        }
    }
}

/// Linear RGBA interpolation; channels are rounded to the nearest integer.
pub fn mix(from: Rgba, to: Rgba, t: f64) -> Rgba {
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    Rgba {
        r: lerp(from.r, to.r),
        g: lerp(from.g, to.g),
        b: lerp(from.b, to.b),
        a: from.a + (to.a - from.a) * t,
    }
}
