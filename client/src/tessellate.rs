//! CPU-side geometry preparation for the accelerated feature layer.

use earcutr::earcut;

use isoline_shared::{Coord, Geometry, GeometryKind, IsolineFeature, Ring};

use crate::style::{AcceleratedStyle, ColorExpr};

/// Position relative to the mesh origin plus a straight RGBA color.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// One circle marker: center relative to the origin, the feature color and a
/// geometry flag (1.0 for point geometries) that drives the style cases.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointInstance {
    pub center: [f32; 2],
    pub is_point: f32,
    pub _pad: f32,
    pub color: [f32; 4],
}

/// Circle style cases laid out for a uniform buffer. For each case the
/// `use_feature_color` lane picks the feature color (1.0) or the literal.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointStyleUniform {
    /// point radius, other radius, point stroke width, other stroke width
    pub sizes: [f32; 4],
    pub fill_point: [f32; 4],
    pub fill_other: [f32; 4],
    pub stroke_point: [f32; 4],
    pub stroke_other: [f32; 4],
    /// fill point, fill other, stroke point, stroke other
    pub use_feature_color: [f32; 4],
}

impl PointStyleUniform {
    pub fn from_style(style: &AcceleratedStyle) -> Self {
        let literal = |expr: ColorExpr| match expr {
            ColorExpr::Literal(c) => (c.to_f32_array(), 0.0),
            ColorExpr::FeatureColor => ([0.0; 4], 1.0),
        };
        let (fill_point, fp) = literal(style.circle_fill_color.point);
        let (fill_other, fo) = literal(style.circle_fill_color.other);
        let (stroke_point, sp) = literal(style.circle_stroke_color.point);
        let (stroke_other, so) = literal(style.circle_stroke_color.other);
        Self {
            sizes: [
                style.circle_radius.point as f32,
                style.circle_radius.other as f32,
                style.circle_stroke_width.point as f32,
                style.circle_stroke_width.other as f32,
            ],
            fill_point,
            fill_other,
            stroke_point,
            stroke_other,
            use_feature_color: [fp, fo, sp, so],
        }
    }
}

/// Buffers for one accelerated feature layer.
#[derive(Debug, Default)]
pub struct FeatureMesh {
    /// World position subtracted from every vertex to keep f32 precision.
    pub origin: Coord,
    pub fill_vertices: Vec<ColorVertex>,
    pub fill_indices: Vec<u32>,
    /// Pairs of vertices for a line list.
    pub stroke_vertices: Vec<ColorVertex>,
    pub points: Vec<PointInstance>,
}

impl FeatureMesh {
    pub fn is_empty(&self) -> bool {
        self.fill_indices.is_empty() && self.stroke_vertices.is_empty() && self.points.is_empty()
    }
}

/// Triangulate fills, expand strokes and collect point instances in draw order.
pub fn build_feature_mesh(features: &[IsolineFeature], style: &AcceleratedStyle) -> FeatureMesh {
    let mut mesh = FeatureMesh {
        origin: mesh_origin(features),
        ..FeatureMesh::default()
    };
    let stroke_alpha = style.stroke_width.clamp(0.0, 1.0);
    let stroke = style.stroke_color.with_alpha(style.stroke_color.a * stroke_alpha);

    for feature in features {
        // Uncolored features draw nothing on either path
        let (Some(color), Some(geometry)) = (feature.color, feature.geometry.as_ref()) else {
            continue;
        };
        let fill = style.fill_color.evaluate(color).to_f32_array();
        let stroke = stroke.to_f32_array();
        let is_point = matches!(feature.geometry_kind(), Some(GeometryKind::Point | GeometryKind::MultiPoint));
        mesh.push_geometry(geometry, fill, stroke, color.to_f32_array(), is_point);
    }
    mesh
}

impl FeatureMesh {
    fn rel(&self, c: Coord) -> [f32; 2] {
        [(c[0] - self.origin[0]) as f32, (c[1] - self.origin[1]) as f32]
    }

    fn push_geometry(&mut self, geometry: &Geometry, fill: [f32; 4], stroke: [f32; 4], color: [f32; 4], is_point: bool) {
        match geometry {
            Geometry::Point(c) => self.push_point(*c, color, is_point),
            Geometry::MultiPoint(cs) => {
                for c in cs {
                    self.push_point(*c, color, is_point);
                }
            }
            Geometry::LineString(path) => self.push_path(path, stroke, false),
            Geometry::MultiLineString(lines) => {
                for line in lines {
                    self.push_path(line, stroke, false);
                }
            }
            Geometry::Polygon(rings) => self.push_polygon(rings, fill, stroke),
            Geometry::MultiPolygon(polys) => {
                for rings in polys {
                    self.push_polygon(rings, fill, stroke);
                }
            }
            Geometry::Collection(members) => {
                for member in members {
                    self.push_geometry(member, fill, stroke, color, is_point);
                }
            }
        }
    }

    fn push_point(&mut self, c: Coord, color: [f32; 4], is_point: bool) {
        let center = self.rel(c);
        self.points.push(PointInstance {
            center,
            is_point: if is_point { 1.0 } else { 0.0 },
            _pad: 0.0,
            color,
        });
    }

    fn push_path(&mut self, path: &[Coord], color: [f32; 4], close: bool) {
        if color[3] <= 0.0 || path.len() < 2 {
            return;
        }
        for w in path.windows(2) {
            self.push_segment(w[0], w[1], color);
        }
        if close
            && let (Some(first), Some(last)) = (path.first(), path.last())
            && first != last
        {
            self.push_segment(*last, *first, color);
        }
    }

    fn push_segment(&mut self, a: Coord, b: Coord, color: [f32; 4]) {
        let (a, b) = (self.rel(a), self.rel(b));
        self.stroke_vertices.push(ColorVertex { position: a, color });
        self.stroke_vertices.push(ColorVertex { position: b, color });
    }

    fn push_polygon(&mut self, rings: &[Ring], fill: [f32; 4], stroke: [f32; 4]) {
        if fill[3] > 0.0 {
            self.push_fill(rings, fill);
        }
        for ring in rings {
            self.push_path(ring, stroke, true);
        }
    }

    fn push_fill(&mut self, rings: &[Ring], fill: [f32; 4]) {
        let mut coords: Vec<f64> = Vec::new();
        let mut hole_indices: Vec<usize> = Vec::new();
        let mut ring_points: Vec<Coord> = Vec::new();

        for (ring_i, ring) in rings.iter().enumerate() {
            let open = drop_closing_duplicate(ring);
            if open.len() < 3 {
                if ring_i == 0 {
                    return;
                }
                continue;
            }
            if ring_i > 0 {
                hole_indices.push(ring_points.len());
            }
            for c in open {
                let [x, y] = self.rel(*c);
                coords.push(x as f64);
                coords.push(y as f64);
                ring_points.push(*c);
            }
        }

        let Ok(indices) = earcut(&coords, &hole_indices, 2) else {
            return;
        };
        let base = self.fill_vertices.len() as u32;
        for c in &ring_points {
            let position = self.rel(*c);
            self.fill_vertices.push(ColorVertex {
                position,
                color: fill,
            });
        }
        self.fill_indices
            .extend(indices.into_iter().map(|i| base + i as u32));
    }
}

fn drop_closing_duplicate(ring: &[Coord]) -> &[Coord] {
    match ring {
        [first, .., last] if first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Center of the bounds of all feature geometry.
fn mesh_origin(features: &[IsolineFeature]) -> Coord {
    let bounds = features
        .iter()
        .filter_map(|f| f.geometry.as_ref().and_then(Geometry::bounds))
        .reduce(|(ax0, ay0, ax1, ay1), (bx0, by0, bx1, by1)| {
            (ax0.min(bx0), ay0.min(by0), ax1.max(bx1), ay1.max(by1))
        });
    match bounds {
        Some((x0, y0, x1, y1)) => [(x0 + x1) / 2.0, (y0 + y1) / 2.0],
        None => [0.0, 0.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoline_shared::assign_colors_and_names;

    fn colored(geometries: Vec<Geometry>) -> Vec<IsolineFeature> {
        let mut features: Vec<_> = geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| IsolineFeature::new(g, Some(i as f64)))
            .collect();
        assign_colors_and_names(&mut features);
        features
    }

    fn square(x0: f64, y0: f64, side: f64) -> Ring {
        vec![
            [x0, y0],
            [x0 + side, y0],
            [x0 + side, y0 + side],
            [x0, y0 + side],
            [x0, y0],
        ]
    }

    #[test]
    fn square_becomes_two_triangles_and_four_edges() {
        let features = colored(vec![Geometry::Polygon(vec![square(0.0, 0.0, 10.0)])]);
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert_eq!(mesh.fill_vertices.len(), 4);
        assert_eq!(mesh.fill_indices.len(), 6);
        assert_eq!(mesh.stroke_vertices.len(), 8);
        assert!(mesh.points.is_empty());
        assert_eq!(mesh.origin, [5.0, 5.0]);
    }

    #[test]
    fn hole_adds_triangles_around_it() {
        let features = colored(vec![Geometry::Polygon(vec![
            square(0.0, 0.0, 10.0),
            square(3.0, 3.0, 4.0),
        ])]);
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert_eq!(mesh.fill_vertices.len(), 8);
        assert_eq!(mesh.fill_indices.len(), 8 * 3);
    }

    #[test]
    fn stroke_alpha_scales_with_width() {
        let features = colored(vec![Geometry::LineString(vec![[0.0, 0.0], [1.0, 0.0]])]);
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert_eq!(mesh.stroke_vertices.len(), 2);
        let alpha = mesh.stroke_vertices[0].color[3];
        assert!((alpha - 0.1).abs() < 1e-6, "{alpha}");
    }

    #[test]
    fn points_become_instances_with_point_flag() {
        let features = colored(vec![
            Geometry::Point([1.0, 1.0]),
            Geometry::MultiPoint(vec![[2.0, 2.0], [3.0, 3.0]]),
        ]);
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert_eq!(mesh.points.len(), 3);
        assert!(mesh.points.iter().all(|p| p.is_point == 1.0));
        assert_eq!(mesh.points[0].color, features[0].color.expect("color").to_f32_array());
    }

    #[test]
    fn uncolored_features_are_skipped() {
        let features = vec![IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(1.0))];
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert!(mesh.is_empty());
    }

    #[test]
    fn point_style_uniform_encodes_cases() {
        let uniform = PointStyleUniform::from_style(&AcceleratedStyle::default());
        assert_eq!(uniform.sizes, [5.0, 0.0, 1.0, 0.0]);
        assert_eq!(uniform.use_feature_color, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(uniform.stroke_point, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(uniform.fill_other[3], 0.0);
    }

    #[test]
    fn vertices_are_relative_to_origin() {
        let far = 1.9e7;
        let features = colored(vec![Geometry::Point([far, far]), Geometry::Point([far + 2.0, far])]);
        let mesh = build_feature_mesh(&features, &AcceleratedStyle::default());
        assert_eq!(mesh.points[0].center, [-1.0, 0.0]);
        assert_eq!(mesh.points[1].center, [1.0, 0.0]);
    }
}
