use serde::{Deserialize, Serialize};

use crate::colors::Rgba;
use crate::feature::{GeometryKind, IsolineFeature};

/// Attributes of the feature currently under the pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoverInfo {
    pub value: Option<f64>,
    pub name: Option<String>,
    pub color: Option<Rgba>,
    pub geometry: Option<GeometryKind>,
}

impl HoverInfo {
    pub fn from_feature(feature: &IsolineFeature) -> Self {
        Self {
            value: feature.value,
            name: feature.name.clone(),
            color: feature.color,
            geometry: feature.geometry_kind(),
        }
    }
}

pub const PLACEHOLDER: &str = "-";

/// Display strings for the four info panel fields; dashes when nothing is hovered.
pub fn info_fields(info: Option<&HoverInfo>) -> [String; 4] {
    let value = info
        .and_then(|i| i.value)
        .map(|v| v.to_string())
        .unwrap_or_else(|| PLACEHOLDER.into());
    let name = info
        .and_then(|i| i.name.clone())
        .unwrap_or_else(|| PLACEHOLDER.into());
    let color = info
        .and_then(|i| i.color)
        .map(|c| c.to_css())
        .unwrap_or_else(|| PLACEHOLDER.into());
    let geometry = info
        .and_then(|i| i.geometry)
        .map(|g| g.as_str().to_owned())
        .unwrap_or_else(|| PLACEHOLDER.into());
    [value, name, color, geometry]
}
