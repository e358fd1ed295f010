use isoline_shared::{Coord, Geometry, IsolineFeature, Ring};

use crate::geom::{path_distance_sq, polygon_contains, ring_distance_sq};
use crate::label_layout::PlacedLabel;
use crate::layers::{FeatureLayerConfig, Layer, LayerKind, LayerRole, LayerRegistry};
use crate::style::FeatureStyle;
use crate::viewport::Viewport;

/// A feature found under the pointer and the layer that drew it.
#[derive(Debug, Clone, Copy)]
pub struct Hit<'a> {
    pub role: LayerRole,
    pub index: usize,
    pub feature: &'a IsolineFeature,
}

/// First eligible feature at `pixel`, topmost layer first and last drawn
/// feature first. The highlight layer never takes part. The label layer is
/// tested against `labels`, the boxes of the last label draw.
pub fn feature_at<'a>(
    layers: &'a LayerRegistry,
    labels: &[PlacedLabel],
    vp: &Viewport,
    pixel: (f64, f64),
    tolerance_px: f64,
) -> Option<Hit<'a>> {
    layers
        .top_to_bottom()
        .filter(|layer| layer.role != LayerRole::Highlight)
        .find_map(|layer| hit_layer(layer, labels, vp, pixel, tolerance_px))
}

fn hit_layer<'a>(
    layer: &'a Layer,
    labels: &[PlacedLabel],
    vp: &Viewport,
    pixel: (f64, f64),
    tolerance_px: f64,
) -> Option<Hit<'a>> {
    let hit = move |index: usize| Hit {
        role: layer.role,
        index,
        feature: &layer.features[index],
    };
    match &layer.kind {
        LayerKind::Features(config) => {
            let (wx, wy) = vp.screen_to_world(pixel.0, pixel.1);
            let res = vp.resolution();
            layer
                .features
                .iter()
                .enumerate()
                .rev()
                .find(|(_, feature)| {
                    let Some(geometry) = feature.geometry.as_ref() else {
                        return false;
                    };
                    let Some(style) = resolve_style(config, feature) else {
                        return false;
                    };
                    geometry_hit(geometry, &style, [wx, wy], res, tolerance_px)
                })
                .map(|(index, _)| hit(index))
        }
        LayerKind::Labels { .. } => labels
            .iter()
            .rev()
            .filter(|label| {
                layer
                    .features
                    .get(label.feature_index)
                    .is_some_and(|f| f.color.is_some())
            })
            .find(|label| label.contains(pixel.0, pixel.1, tolerance_px))
            .map(|label| hit(label.feature_index)),
        LayerKind::Highlight(_) => None,
    }
}

fn resolve_style(config: &FeatureLayerConfig, feature: &IsolineFeature) -> Option<FeatureStyle> {
    match config {
        FeatureLayerConfig::Accelerated(style) => style.evaluate(feature),
        FeatureLayerConfig::Standard(style_fn) => style_fn(feature),
    }
}

/// `p` in world units; pixel sizes are scaled by `res` meters per pixel.
fn geometry_hit(geometry: &Geometry, style: &FeatureStyle, p: Coord, res: f64, tolerance_px: f64) -> bool {
    let tolerance = tolerance_px * res;
    let within = |dist_sq: f64, reach: f64| dist_sq <= reach * reach;
    match geometry {
        Geometry::Point(c) => point_reach(style, res, tolerance)
            .is_some_and(|reach| within(path_distance_sq(p, &[*c]), reach)),
        Geometry::MultiPoint(cs) => point_reach(style, res, tolerance)
            .is_some_and(|reach| cs.iter().any(|c| within(path_distance_sq(p, &[*c]), reach))),
        Geometry::LineString(path) => within(path_distance_sq(p, path), tolerance),
        Geometry::MultiLineString(lines) => lines.iter().any(|l| within(path_distance_sq(p, l), tolerance)),
        Geometry::Polygon(rings) => polygon_hit(rings, p, tolerance),
        Geometry::MultiPolygon(polys) => polys.iter().any(|rings| polygon_hit(rings, p, tolerance)),
        Geometry::Collection(members) => members
            .iter()
            .any(|m| geometry_hit(m, style, p, res, tolerance_px)),
    }
}

/// `None` when the style draws no marker for points.
fn point_reach(style: &FeatureStyle, res: f64, tolerance: f64) -> Option<f64> {
    match style {
        FeatureStyle::Circle { radius, stroke_width, .. } => {
            Some((radius + stroke_width / 2.0) * res + tolerance)
        }
        FeatureStyle::Shape { .. } => None,
    }
}

fn polygon_hit(rings: &[Ring], p: Coord, tolerance: f64) -> bool {
    polygon_contains(rings, p) || rings.iter().any(|r| ring_distance_sq(p, r) <= tolerance * tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_layout::{estimate_text_width, layout_labels};
    use crate::layers::{upsert_feature_layer, upsert_highlight_layer, upsert_label_layer};
    use crate::map::IsolineMap;
    use isoline_shared::assign_colors_and_names;
    use std::sync::Arc;

    /// Map at zoom 20 (about 0.15 m per pixel) with an 800x600 view.
    fn map_with(geometries: Vec<Geometry>, accelerated: bool) -> IsolineMap {
        let mut map = IsolineMap::bootstrap();
        map.viewport.zoom = 20.0;
        map.viewport.set_size(800.0, 600.0);
        let mut features: Vec<_> = geometries
            .into_iter()
            .enumerate()
            .map(|(i, g)| IsolineFeature::new(g, Some(i as f64)))
            .collect();
        assign_colors_and_names(&mut features);
        upsert_feature_layer(&mut map, Arc::from(features), accelerated);
        upsert_highlight_layer(&mut map);
        map
    }

    fn pixel_of(map: &IsolineMap, wx: f64, wy: f64) -> (f64, f64) {
        map.viewport.world_to_screen(wx, wy)
    }

    #[test]
    fn point_is_hit_within_radius_plus_tolerance() {
        for accelerated in [true, false] {
            let map = map_with(vec![Geometry::Point([0.0, 0.0])], accelerated);
            let (sx, sy) = pixel_of(&map, 0.0, 0.0);
            assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx + 10.0, sy), 5.0).is_some());
            assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx + 12.0, sy), 5.0).is_none());
        }
    }

    #[test]
    fn empty_space_is_a_miss() {
        let map = map_with(vec![Geometry::Point([0.0, 0.0])], true);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (10.0, 10.0), 5.0).is_none());
    }

    #[test]
    fn last_drawn_feature_wins() {
        let map = map_with(
            vec![Geometry::Point([0.0, 0.0]), Geometry::Point([0.0, 0.0])],
            false,
        );
        let pixel = pixel_of(&map, 0.0, 0.0);
        let hit = feature_at(&map.layers, &map.placed_labels, &map.viewport, pixel, 5.0).expect("hit");
        assert_eq!(hit.index, 1);
        assert_eq!(hit.role, LayerRole::Features);
    }

    #[test]
    fn polygon_interior_and_edge_tolerance() {
        let ring = vec![[0.0, 0.0], [30.0, 0.0], [30.0, 30.0], [0.0, 30.0], [0.0, 0.0]];
        let map = map_with(vec![Geometry::Polygon(vec![ring])], true);
        let inside = pixel_of(&map, 15.0, 15.0);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, inside, 5.0).is_some());
        let (ex, ey) = pixel_of(&map, 30.0, 15.0);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (ex + 4.0, ey), 5.0).is_some());
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (ex + 8.0, ey), 5.0).is_none());
    }

    #[test]
    fn line_is_hit_near_segment_only() {
        let map = map_with(vec![Geometry::LineString(vec![[-30.0, 0.0], [30.0, 0.0]])], false);
        let (sx, sy) = pixel_of(&map, 10.0, 0.0);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx, sy + 4.0), 5.0).is_some());
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx, sy + 7.0), 5.0).is_none());
    }

    #[test]
    fn features_without_color_are_not_eligible() {
        let mut map = IsolineMap::bootstrap();
        map.viewport.set_size(800.0, 600.0);
        let uncolored = vec![IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(1.0))];
        upsert_feature_layer(&mut map, Arc::from(uncolored), true);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (400.0, 300.0), 5.0).is_none());
    }

    #[test]
    fn highlight_layer_is_skipped() {
        let mut map = map_with(vec![], true);
        let mut features = vec![IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(1.0))];
        assign_colors_and_names(&mut features);
        map.layers.set_features(LayerRole::Highlight, Arc::from(features));
        let pixel = pixel_of(&map, 0.0, 0.0);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, pixel, 5.0).is_none());
    }

    #[test]
    fn points_inside_a_collection_are_not_hit() {
        // Collections take the shape style, which draws no point markers
        for accelerated in [true, false] {
            let map = map_with(
                vec![Geometry::Collection(vec![Geometry::Point([0.0, 0.0])])],
                accelerated,
            );
            let (sx, sy) = pixel_of(&map, 0.0, 0.0);
            assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx + 3.0, sy), 5.0).is_none());
            assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, (sx, sy), 5.0).is_none());
        }
    }

    #[test]
    fn collection_polygon_member_is_still_hit() {
        let ring = vec![[0.0, 0.0], [30.0, 0.0], [30.0, 30.0], [0.0, 30.0], [0.0, 0.0]];
        let map = map_with(
            vec![Geometry::Collection(vec![
                Geometry::Point([-100.0, -100.0]),
                Geometry::Polygon(vec![ring]),
            ])],
            false,
        );
        let inside = pixel_of(&map, 15.0, 15.0);
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, inside, 5.0).is_some());
    }

    fn with_labels(map: &mut IsolineMap, declutter: bool) {
        let features = map
            .layers
            .get(LayerRole::Features)
            .map(|l| l.features.clone())
            .expect("features");
        upsert_label_layer(map, features, true, declutter);
    }

    #[test]
    fn labels_sit_above_features() {
        let mut map = map_with(vec![Geometry::Point([0.0, 0.0])], true);
        with_labels(&mut map, false);
        let features = map.layers.get(LayerRole::Labels).map(|l| l.features.clone()).expect("labels");
        map.placed_labels = layout_labels(&features, &map.viewport, 9.0, false, |t| estimate_text_width(t, 9.0));
        let pixel = pixel_of(&map, 0.0, 0.0);
        let hit = feature_at(&map.layers, &map.placed_labels, &map.viewport, pixel, 5.0).expect("hit");
        assert_eq!(hit.role, LayerRole::Labels);
    }

    #[test]
    fn only_drawn_label_boxes_are_hit() {
        // Two short lines whose labels sit 20 m (about 134 px) apart
        let mut map = map_with(
            vec![
                Geometry::LineString(vec![[-1.0, 0.0], [1.0, 0.0]]),
                Geometry::LineString(vec![[19.0, 0.0], [21.0, 0.0]]),
            ],
            false,
        );
        with_labels(&mut map, true);
        let features = map.layers.get(LayerRole::Labels).map(|l| l.features.clone()).expect("labels");

        // Estimated widths keep both labels apart
        let estimated = layout_labels(&features, &map.viewport, 9.0, true, |t| estimate_text_width(t, 9.0));
        assert_eq!(estimated.len(), 2);

        // Wider measured text makes declutter drop the second label on draw
        map.placed_labels = layout_labels(&features, &map.viewport, 9.0, true, |_| 200.0);
        assert_eq!(map.placed_labels.len(), 1);

        // Inside the dropped label's box but clear of its line
        let (sx, sy) = pixel_of(&map, 20.0, 0.0);
        let below = (sx, sy + 3.0);
        assert!(estimated[1].contains(below.0, below.1, 2.0));
        assert!(feature_at(&map.layers, &map.placed_labels, &map.viewport, below, 2.0).is_none());

        // The kept label answers across its measured width
        let (fx, fy) = pixel_of(&map, 0.0, 0.0);
        let hit = feature_at(&map.layers, &map.placed_labels, &map.viewport, (fx - 90.0, fy), 2.0)
            .expect("hit");
        assert_eq!((hit.role, hit.index), (LayerRole::Labels, 0));
    }

    #[test]
    fn rebuilt_label_layer_forgets_old_boxes() {
        let mut map = map_with(vec![Geometry::Point([0.0, 0.0])], true);
        with_labels(&mut map, false);
        let features = map.layers.get(LayerRole::Labels).map(|l| l.features.clone()).expect("labels");
        map.placed_labels = layout_labels(&features, &map.viewport, 9.0, false, |t| estimate_text_width(t, 9.0));
        with_labels(&mut map, false);
        assert!(map.placed_labels.is_empty());
    }
}
