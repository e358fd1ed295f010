use std::fmt;

use geojson::GeoJson;
use serde::{Deserialize, Serialize};

use crate::colors::{ColorScale, Rgba};
use crate::config::{EMPTY_DOMAIN, ISOLINE_COLOR_STOPS, LABEL_PREFIX};

pub type Coord = [f64; 2];
pub type Ring = Vec<Coord>;

/// Geometry in view coordinates (Web-Mercator meters).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    MultiPoint(Vec<Coord>),
    LineString(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
    Collection(Vec<Geometry>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::MultiPoint => "MultiPoint",
            GeometryKind::LineString => "LineString",
            GeometryKind::MultiLineString => "MultiLineString",
            GeometryKind::Polygon => "Polygon",
            GeometryKind::MultiPolygon => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }

    pub fn is_point(self) -> bool {
        self == GeometryKind::Point
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::MultiPoint(_) => GeometryKind::MultiPoint,
            Geometry::LineString(_) => GeometryKind::LineString,
            Geometry::MultiLineString(_) => GeometryKind::MultiLineString,
            Geometry::Polygon(_) => GeometryKind::Polygon,
            Geometry::MultiPolygon(_) => GeometryKind::MultiPolygon,
            Geometry::Collection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)`, or `None` for empty geometry.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut acc: Option<(f64, f64, f64, f64)> = None;
        self.for_each_coord(&mut |[x, y]| {
            acc = Some(match acc {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        });
        acc
    }

    pub fn for_each_coord(&self, f: &mut impl FnMut(Coord)) {
        match self {
            Geometry::Point(c) => f(*c),
            Geometry::MultiPoint(cs) | Geometry::LineString(cs) => cs.iter().copied().for_each(f),
            Geometry::MultiLineString(lines) => lines.iter().flatten().copied().for_each(f),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().for_each(f),
            Geometry::MultiPolygon(polys) => polys.iter().flatten().flatten().copied().for_each(f),
            Geometry::Collection(members) => {
                for member in members {
                    member.for_each_coord(f);
                }
            }
        }
    }

    fn from_geojson(value: &geojson::Value) -> Result<Self, String> {
        Ok(match value {
            geojson::Value::Point(p) => Geometry::Point(coord(p)?),
            geojson::Value::MultiPoint(ps) => Geometry::MultiPoint(coords(ps)?),
            geojson::Value::LineString(ps) => Geometry::LineString(coords(ps)?),
            geojson::Value::MultiLineString(lines) => Geometry::MultiLineString(
                lines.iter().map(|l| coords(l)).collect::<Result<_, _>>()?,
            ),
            geojson::Value::Polygon(rings) => Geometry::Polygon(
                rings.iter().map(|r| coords(r)).collect::<Result<_, _>>()?,
            ),
            geojson::Value::MultiPolygon(polys) => Geometry::MultiPolygon(
                polys
                    .iter()
                    .map(|rings| rings.iter().map(|r| coords(r)).collect::<Result<_, _>>())
                    .collect::<Result<_, _>>()?,
            ),
            geojson::Value::GeometryCollection(members) => Geometry::Collection(
                members
                    .iter()
                    .map(|g| Geometry::from_geojson(&g.value))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

fn coord(position: &[f64]) -> Result<Coord, String> {
    match position {
        [x, y, ..] => Ok([*x, *y]),
        _ => Err(format!("position needs two ordinates, got {}", position.len())),
    }
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>, String> {
    positions.iter().map(|p| coord(p)).collect()
}

/// One feature of the isoline collection plus its derived color and label.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolineFeature {
    pub geometry: Option<Geometry>,
    pub value: Option<f64>,
    pub color: Option<Rgba>,
    pub name: Option<String>,
}

impl IsolineFeature {
    pub fn new(geometry: Geometry, value: Option<f64>) -> Self {
        Self {
            geometry: Some(geometry),
            value,
            color: None,
            name: None,
        }
    }

    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        self.geometry.as_ref().map(Geometry::kind)
    }

    /// Value used for coloring; absent values count as zero.
    pub fn value_or_zero(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollectionData {
    pub description: Option<String>,
    pub features: Vec<IsolineFeature>,
}

/// Parse a GeoJSON `FeatureCollection` document.
pub fn parse_feature_collection(text: &str) -> Result<FeatureCollectionData, String> {
    let geojson: GeoJson = text.parse().map_err(|e| format!("parse error: {e}"))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err("parse error: expected a FeatureCollection".into());
    };

    let description = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("properties"))
        .and_then(|props| props.get("description"))
        .and_then(|d| d.as_str())
        .map(str::to_owned);

    let mut features = Vec::with_capacity(collection.features.len());
    for (idx, feature) in collection.features.iter().enumerate() {
        let geometry = feature
            .geometry
            .as_ref()
            .map(|g| Geometry::from_geojson(&g.value))
            .transpose()
            .map_err(|e| format!("parse error: feature {idx}: {e}"))?;
        let value = feature
            .properties
            .as_ref()
            .and_then(|props| props.get("value"))
            .and_then(|v| v.as_f64());
        features.push(IsolineFeature {
            geometry,
            value,
            color: None,
            name: None,
        });
    }

    Ok(FeatureCollectionData {
        description,
        features,
    })
}

/// Value domain of the features; `(0, 1)` when there are none.
pub fn isoline_domain(features: &[IsolineFeature]) -> (f64, f64) {
    if features.is_empty() {
        return EMPTY_DOMAIN;
    }
    features
        .iter()
        .map(IsolineFeature::value_or_zero)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

pub fn isoline_color_scale(features: &[IsolineFeature]) -> ColorScale {
    ColorScale::new(&ISOLINE_COLOR_STOPS, isoline_domain(features))
}

pub fn label_for(color: &Rgba) -> String {
    format!("{LABEL_PREFIX}{}", color.to_hex())
}

/// Derive `color` and `name` for every feature from its value.
pub fn assign_colors_and_names(features: &mut [IsolineFeature]) {
    let scale = isoline_color_scale(features);
    for feature in features.iter_mut() {
        let color = scale.color_at(feature.value_or_zero());
        feature.name = Some(label_for(&color));
        feature.color = Some(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors::{BLUE, RED};

    fn point(value: Option<f64>) -> IsolineFeature {
        IsolineFeature::new(Geometry::Point([0.0, 0.0]), value)
    }

    #[test]
    fn domain_of_empty_set_defaults_to_unit() {
        assert_eq!(isoline_domain(&[]), (0.0, 1.0));
    }

    #[test]
    fn domain_is_min_and_max_value() {
        let features = vec![point(Some(3.0)), point(Some(-2.5)), point(Some(7.0))];
        assert_eq!(isoline_domain(&features), (-2.5, 7.0));
    }

    #[test]
    fn missing_value_counts_as_zero() {
        let features = vec![point(Some(3.0)), point(None), point(Some(7.0))];
        assert_eq!(isoline_domain(&features), (0.0, 7.0));
    }

    #[test]
    fn endpoints_get_first_and_last_stop() {
        let mut features = vec![point(Some(0.0)), point(Some(10.0))];
        assert_eq!(isoline_domain(&features), (0.0, 10.0));
        assign_colors_and_names(&mut features);
        assert_eq!(features[0].color, Some(BLUE));
        assert_eq!(features[1].color, Some(RED));
    }

    #[test]
    fn every_name_contains_the_hex_of_its_color() {
        let mut features: Vec<_> = (0..20).map(|i| point(Some(i as f64 * 1.7))).collect();
        features.push(point(None));
        assign_colors_and_names(&mut features);
        for feature in &features {
            let color = feature.color.expect("color assigned");
            assert!((0.0..=1.0).contains(&color.a));
            let name = feature.name.as_deref().expect("name assigned");
            assert!(name.starts_with(LABEL_PREFIX));
            assert!(name.contains(&color.to_hex()));
        }
    }

    #[test]
    fn single_feature_uses_degenerate_domain() {
        let mut features = vec![point(Some(42.0))];
        assign_colors_and_names(&mut features);
        assert_eq!(features[0].color, Some(RED));
    }

    #[test]
    fn reassignment_follows_value_changes() {
        let mut features = vec![point(Some(0.0)), point(Some(10.0))];
        assign_colors_and_names(&mut features);
        features[0].value = Some(20.0);
        assign_colors_and_names(&mut features);
        assert_eq!(isoline_domain(&features), (10.0, 20.0));
        assert_eq!(features[0].color, Some(RED));
        assert_eq!(features[1].color, Some(BLUE));
    }

    #[test]
    fn parses_feature_collection_with_description() {
        let text = r#"{
            "type": "FeatureCollection",
            "properties": {"description": "test isolines"},
            "features": [
                {"type": "Feature", "properties": {"value": 1.5},
                 "geometry": {"type": "Point", "coordinates": [10.0, 20.0]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Polygon", "coordinates": [[[0,0],[4,0],[4,4],[0,0]]]}},
                {"type": "Feature", "properties": {"value": 3},
                 "geometry": {"type": "MultiLineString", "coordinates": [[[0,0],[1,1]],[[2,2],[3,3,9]]]}}
            ]
        }"#;
        let data = parse_feature_collection(text).expect("valid collection");
        assert_eq!(data.description.as_deref(), Some("test isolines"));
        assert_eq!(data.features.len(), 3);
        assert_eq!(data.features[0].value, Some(1.5));
        assert_eq!(data.features[0].geometry, Some(Geometry::Point([10.0, 20.0])));
        assert_eq!(data.features[1].value, None);
        assert_eq!(data.features[1].geometry_kind(), Some(GeometryKind::Polygon));
        assert_eq!(data.features[2].value, Some(3.0));
        assert_eq!(
            data.features[2].geometry,
            Some(Geometry::MultiLineString(vec![
                vec![[0.0, 0.0], [1.0, 1.0]],
                vec![[2.0, 2.0], [3.0, 3.0]],
            ]))
        );
    }

    #[test]
    fn rejects_non_collection_documents() {
        let err = parse_feature_collection(
            r#"{"type": "Point", "coordinates": [0, 0]}"#,
        )
        .unwrap_err();
        assert!(err.contains("FeatureCollection"), "{err}");
        assert!(parse_feature_collection("not json").is_err());
    }

    #[test]
    fn geometry_bounds_cover_all_members() {
        let geometry = Geometry::Collection(vec![
            Geometry::Point([-5.0, 2.0]),
            Geometry::LineString(vec![[0.0, -1.0], [3.0, 8.0]]),
        ]);
        assert_eq!(geometry.bounds(), Some((-5.0, -1.0, 3.0, 8.0)));
        assert_eq!(Geometry::MultiPoint(vec![]).bounds(), None);
    }
}
