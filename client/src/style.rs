use isoline_shared::colors::{BLACK, GRAY, PURPLE, TRANSPARENT, WHITE};
use isoline_shared::{GeometryKind, IsolineFeature, Rgba};

pub const POINT_RADIUS: f64 = 5.0;
pub const POINT_STROKE_WIDTH: f64 = 1.0;
pub const SHAPE_STROKE_WIDTH: f64 = 0.1;

/// Style resolved for one feature, shared by every drawing path.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureStyle {
    Circle {
        radius: f64,
        fill: Rgba,
        stroke: Rgba,
        stroke_width: f64,
    },
    Shape {
        stroke: Rgba,
        stroke_width: f64,
        fill: Rgba,
    },
}

/// CPU style function: evaluated per feature at draw time.
pub type StyleFn = fn(&IsolineFeature) -> Option<FeatureStyle>;

/// Standard path: filled circle for points, stroked/filled shape otherwise.
/// Features without a color draw nothing.
pub fn standard_feature_style(feature: &IsolineFeature) -> Option<FeatureStyle> {
    let color = feature.color?;
    let kind = feature.geometry_kind()?;
    if matches!(kind, GeometryKind::Point | GeometryKind::MultiPoint) {
        return Some(FeatureStyle::Circle {
            radius: POINT_RADIUS,
            fill: color,
            stroke: WHITE,
            stroke_width: POINT_STROKE_WIDTH,
        });
    }
    Some(FeatureStyle::Shape {
        stroke: BLACK,
        stroke_width: SHAPE_STROKE_WIDTH,
        fill: color,
    })
}

/// Color operand of a declarative style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColorExpr {
    Literal(Rgba),
    /// `['get', 'color']`
    FeatureColor,
}

impl ColorExpr {
    pub fn evaluate(&self, feature_color: Rgba) -> Rgba {
        match self {
            ColorExpr::Literal(c) => *c,
            ColorExpr::FeatureColor => feature_color,
        }
    }
}

/// `['case', ['==', ['geometry-type'], 'Point'], point, other]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ByGeometry<T> {
    pub point: T,
    pub other: T,
}

impl<T: Copy> ByGeometry<T> {
    pub fn select(&self, is_point: bool) -> T {
        if is_point { self.point } else { self.other }
    }
}

/// Declarative style consumed by the GPU path. Literals go to a uniform and the
/// per-geometry cases are selected in the shader.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceleratedStyle {
    pub stroke_color: Rgba,
    pub stroke_width: f64,
    pub fill_color: ColorExpr,
    pub circle_radius: ByGeometry<f64>,
    pub circle_fill_color: ByGeometry<ColorExpr>,
    pub circle_stroke_color: ByGeometry<ColorExpr>,
    pub circle_stroke_width: ByGeometry<f64>,
}

impl Default for AcceleratedStyle {
    fn default() -> Self {
        Self {
            stroke_color: BLACK,
            stroke_width: SHAPE_STROKE_WIDTH,
            fill_color: ColorExpr::FeatureColor,
            circle_radius: ByGeometry {
                point: POINT_RADIUS,
                other: 0.0,
            },
            circle_fill_color: ByGeometry {
                point: ColorExpr::FeatureColor,
                other: ColorExpr::Literal(TRANSPARENT),
            },
            circle_stroke_color: ByGeometry {
                point: ColorExpr::Literal(WHITE),
                other: ColorExpr::Literal(TRANSPARENT),
            },
            circle_stroke_width: ByGeometry {
                point: POINT_STROKE_WIDTH,
                other: 0.0,
            },
        }
    }
}

impl AcceleratedStyle {
    /// Evaluate the expression on the CPU, used when no GPU is available.
    /// Features without a color are skipped, matching the standard path.
    pub fn evaluate(&self, feature: &IsolineFeature) -> Option<FeatureStyle> {
        let color = feature.color?;
        let kind = feature.geometry_kind()?;
        let is_point = matches!(kind, GeometryKind::Point | GeometryKind::MultiPoint);
        if is_point {
            return Some(FeatureStyle::Circle {
                radius: self.circle_radius.select(true),
                fill: self.circle_fill_color.select(true).evaluate(color),
                stroke: self.circle_stroke_color.select(true).evaluate(color),
                stroke_width: self.circle_stroke_width.select(true),
            });
        }
        Some(FeatureStyle::Shape {
            stroke: self.stroke_color,
            stroke_width: self.stroke_width,
            fill: self.fill_color.evaluate(color),
        })
    }
}

/// Text symbolizer of the label layer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font: &'static str,
    pub font_size: f64,
    pub fill: Rgba,
    pub stroke: Rgba,
    pub stroke_width: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font: "9px sans-serif",
            font_size: 9.0,
            fill: WHITE,
            stroke: GRAY,
            stroke_width: 1.0,
        }
    }
}

/// Outline drawn over the hovered feature.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightStyle {
    pub color: Rgba,
    pub stroke_width: f64,
    pub point_radius: f64,
}

impl Default for HighlightStyle {
    fn default() -> Self {
        Self {
            color: PURPLE,
            stroke_width: 2.0,
            point_radius: POINT_RADIUS + 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoline_shared::{Geometry, assign_colors_and_names};

    fn colored(geometries: Vec<Geometry>) -> Vec<IsolineFeature> {
        let mut features: Vec<_> = geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| IsolineFeature::new(g, Some(i as f64)))
            .collect();
        assign_colors_and_names(&mut features);
        features
    }

    #[test]
    fn standard_style_draws_points_as_circles() {
        let features = colored(vec![Geometry::Point([0.0, 0.0])]);
        let style = standard_feature_style(&features[0]).expect("styled");
        let FeatureStyle::Circle {
            radius,
            fill,
            stroke,
            stroke_width,
        } = style
        else {
            panic!("expected circle, got {style:?}");
        };
        assert_eq!(radius, 5.0);
        assert_eq!(Some(fill), features[0].color);
        assert_eq!(stroke, WHITE);
        assert_eq!(stroke_width, 1.0);
    }

    #[test]
    fn standard_style_skips_features_without_color() {
        let feature = IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(1.0));
        assert_eq!(standard_feature_style(&feature), None);
        assert_eq!(AcceleratedStyle::default().evaluate(&feature), None);
    }

    #[test]
    fn accelerated_and_standard_paths_agree() {
        let features = colored(vec![
            Geometry::Point([0.0, 0.0]),
            Geometry::MultiPoint(vec![[1.0, 1.0]]),
            Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]),
            Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]),
            Geometry::MultiPolygon(vec![]),
        ]);
        let accelerated = AcceleratedStyle::default();
        for feature in &features {
            assert_eq!(
                accelerated.evaluate(feature),
                standard_feature_style(feature),
                "{:?}",
                feature.geometry_kind()
            );
        }
    }

    #[test]
    fn case_expressions_make_non_point_circles_invisible() {
        let style = AcceleratedStyle::default();
        assert_eq!(style.circle_radius.select(false), 0.0);
        assert_eq!(
            style.circle_fill_color.select(false).evaluate(WHITE),
            TRANSPARENT
        );
        assert_eq!(style.circle_fill_color.select(true).evaluate(PURPLE), PURPLE);
    }
}
