/// Minimum on-screen width of the scale bar in CSS pixels.
pub const MIN_WIDTH_PX: f64 = 64.0;

const LEADING_DIGITS: [f64; 3] = [1.0, 2.0, 5.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleUnits {
    Metric,
}

/// Rendered scale bar: its pixel width and caption.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBar {
    pub width_px: f64,
    pub label: String,
}

/// Pick the smallest 1-2-5 length whose bar is at least `min_width` pixels.
/// `point_resolution` is ground meters per CSS pixel.
pub fn scale_bar(point_resolution: f64, min_width: f64, units: ScaleUnits) -> Option<ScaleBar> {
    if !point_resolution.is_finite() || point_resolution <= 0.0 {
        return None;
    }
    let ScaleUnits::Metric = units;

    let nominal = min_width * point_resolution;
    let mut exponent = nominal.log10().floor() as i32;
    loop {
        for digit in LEADING_DIGITS {
            let meters = digit * 10f64.powi(exponent);
            if meters >= nominal {
                return Some(ScaleBar {
                    width_px: meters / point_resolution,
                    label: metric_label(meters),
                });
            }
        }
        exponent += 1;
    }
}

fn metric_label(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{} km", trim(meters / 1000.0))
    } else if meters >= 1.0 {
        format!("{} m", trim(meters))
    } else {
        format!("{} mm", trim(meters * 1000.0))
    }
}

fn trim(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
