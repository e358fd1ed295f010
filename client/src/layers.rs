use std::collections::BTreeMap;
use std::sync::Arc;

use isoline_shared::IsolineFeature;
use isoline_shared::config::{FEATURES_Z_INDEX, HIGHLIGHT_Z_INDEX, LABELS_Z_INDEX};

use crate::map::IsolineMap;
use crate::style::{AcceleratedStyle, HighlightStyle, StyleFn, TextStyle, standard_feature_style};

/// Identity of a layer on the map. Declaration order is the z-order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerRole {
    Features,
    Labels,
    Highlight,
}

impl LayerRole {
    pub const ALL: [LayerRole; 3] = [LayerRole::Features, LayerRole::Labels, LayerRole::Highlight];

    pub fn z_index(self) -> i32 {
        match self {
            LayerRole::Features => FEATURES_Z_INDEX,
            LayerRole::Labels => LABELS_Z_INDEX,
            LayerRole::Highlight => HIGHLIGHT_Z_INDEX,
        }
    }
}

/// Rendering path of the primary feature layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureLayerConfig {
    /// Declarative style evaluated on the GPU.
    Accelerated(AcceleratedStyle),
    /// Per-feature style function evaluated on the CPU.
    Standard(StyleFn),
}

impl FeatureLayerConfig {
    pub fn for_flag(accelerated: bool) -> Self {
        if accelerated {
            FeatureLayerConfig::Accelerated(AcceleratedStyle::default())
        } else {
            FeatureLayerConfig::Standard(standard_feature_style)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Features(FeatureLayerConfig),
    Labels { style: TextStyle, declutter: bool },
    Highlight(HighlightStyle),
}

/// A role-tagged render surface bound to a feature source.
#[derive(Debug, Clone)]
pub struct Layer {
    pub role: LayerRole,
    pub kind: LayerKind,
    pub features: Arc<[IsolineFeature]>,
    /// Bumped on every insert; renderers cache uploads per generation.
    pub generation: u64,
}

impl Layer {
    fn new(role: LayerRole, kind: LayerKind, features: Arc<[IsolineFeature]>) -> Self {
        Self {
            role,
            kind,
            features,
            generation: 0,
        }
    }
}

/// At most one layer per role; iteration runs bottom to top.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<LayerRole, Layer>,
    next_generation: u64,
}

impl LayerRegistry {
    /// Insert a layer, returning the one it replaced.
    pub fn insert(&mut self, mut layer: Layer) -> Option<Layer> {
        self.next_generation += 1;
        layer.generation = self.next_generation;
        self.layers.insert(layer.role, layer)
    }

    pub fn remove(&mut self, role: LayerRole) -> Option<Layer> {
        self.layers.remove(&role)
    }

    pub fn get(&self, role: LayerRole) -> Option<&Layer> {
        self.layers.get(&role)
    }

    pub fn contains(&self, role: LayerRole) -> bool {
        self.layers.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn bottom_to_top(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    pub fn top_to_bottom(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values().rev()
    }

    /// Replace the features of an existing layer in place.
    pub fn set_features(&mut self, role: LayerRole, features: Arc<[IsolineFeature]>) -> bool {
        let Some(layer) = self.layers.get_mut(&role) else {
            return false;
        };
        self.next_generation += 1;
        layer.features = features;
        layer.generation = self.next_generation;
        true
    }
}

pub fn build_feature_layer(features: Arc<[IsolineFeature]>, config: FeatureLayerConfig) -> Layer {
    Layer::new(LayerRole::Features, LayerKind::Features(config), features)
}

pub fn upsert_feature_layer(map: &mut IsolineMap, features: Arc<[IsolineFeature]>, accelerated: bool) {
    map.layers.remove(LayerRole::Features);
    let layer = build_feature_layer(features, FeatureLayerConfig::for_flag(accelerated));
    map.layers.insert(layer);
}

pub fn upsert_label_layer(
    map: &mut IsolineMap,
    features: Arc<[IsolineFeature]>,
    visible: bool,
    declutter: bool,
) {
    map.layers.remove(LayerRole::Labels);
    map.placed_labels.clear();
    if !visible {
        return;
    }
    map.layers.insert(Layer::new(
        LayerRole::Labels,
        LayerKind::Labels {
            style: TextStyle::default(),
            declutter,
        },
        features,
    ));
}

/// Ensure exactly one (initially empty) highlight layer exists.
pub fn upsert_highlight_layer(map: &mut IsolineMap) {
    if map.layers.contains(LayerRole::Highlight) {
        return;
    }
    map.layers.insert(Layer::new(
        LayerRole::Highlight,
        LayerKind::Highlight(HighlightStyle::default()),
        Arc::from(Vec::new()),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoline_shared::{Geometry, assign_colors_and_names};

    fn sample_features() -> Arc<[IsolineFeature]> {
        let mut features = vec![
            IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(0.0)),
            IsolineFeature::new(Geometry::Point([10.0, 10.0]), Some(10.0)),
        ];
        assign_colors_and_names(&mut features);
        Arc::from(features)
    }

    #[test]
    fn roles_are_ordered_by_z_index() {
        assert!(LayerRole::Features.z_index() < LayerRole::Labels.z_index());
        assert!(LayerRole::Labels.z_index() < LayerRole::Highlight.z_index());
        let mut sorted = LayerRole::ALL;
        sorted.sort_by_key(|role| role.z_index());
        assert_eq!(sorted, LayerRole::ALL);
    }

    #[test]
    fn feature_upsert_is_idempotent() {
        let mut map = IsolineMap::bootstrap();
        let features = sample_features();
        upsert_feature_layer(&mut map, features.clone(), true);
        upsert_feature_layer(&mut map, features.clone(), true);
        let count = map
            .layers
            .bottom_to_top()
            .filter(|l| l.role == LayerRole::Features)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn feature_upsert_switches_rendering_path() {
        let mut map = IsolineMap::bootstrap();
        upsert_feature_layer(&mut map, sample_features(), true);
        let accelerated = map.layers.get(LayerRole::Features).map(|l| l.kind.clone());
        assert!(matches!(
            accelerated,
            Some(LayerKind::Features(FeatureLayerConfig::Accelerated(_)))
        ));

        upsert_feature_layer(&mut map, sample_features(), false);
        let standard = map.layers.get(LayerRole::Features).map(|l| l.kind.clone());
        assert!(matches!(
            standard,
            Some(LayerKind::Features(FeatureLayerConfig::Standard(_)))
        ));
    }

    #[test]
    fn hidden_labels_remove_the_layer() {
        let mut map = IsolineMap::bootstrap();
        upsert_label_layer(&mut map, sample_features(), true, false);
        assert!(map.layers.contains(LayerRole::Labels));
        upsert_label_layer(&mut map, sample_features(), false, false);
        assert!(!map.layers.contains(LayerRole::Labels));
    }

    #[test]
    fn label_toggle_reproduces_identical_layer() {
        let mut map = IsolineMap::bootstrap();
        let features = sample_features();
        upsert_label_layer(&mut map, features.clone(), true, true);
        let before = map.layers.get(LayerRole::Labels).cloned().expect("labels");
        upsert_label_layer(&mut map, features.clone(), false, true);
        upsert_label_layer(&mut map, features.clone(), true, true);
        let after = map.layers.get(LayerRole::Labels).cloned().expect("labels");
        assert_eq!(before.kind, after.kind);
        assert_eq!(before.features, after.features);
    }

    #[test]
    fn highlight_upsert_keeps_existing_layer() {
        let mut map = IsolineMap::bootstrap();
        upsert_highlight_layer(&mut map);
        map.layers.set_features(LayerRole::Highlight, sample_features());
        upsert_highlight_layer(&mut map);
        let highlight = map.layers.get(LayerRole::Highlight).expect("highlight");
        assert_eq!(highlight.features.len(), 2);
        assert_eq!(
            map.layers
                .bottom_to_top()
                .filter(|l| l.role == LayerRole::Highlight)
                .count(),
            1
        );
    }

    #[test]
    fn registry_iterates_top_to_bottom() {
        let mut map = IsolineMap::bootstrap();
        upsert_feature_layer(&mut map, sample_features(), false);
        upsert_label_layer(&mut map, sample_features(), true, false);
        upsert_highlight_layer(&mut map);
        let roles: Vec<_> = map.layers.top_to_bottom().map(|l| l.role).collect();
        assert_eq!(
            roles,
            vec![LayerRole::Highlight, LayerRole::Labels, LayerRole::Features]
        );
    }

    #[test]
    fn generation_changes_on_every_insert() {
        let mut registry = LayerRegistry::default();
        let features = sample_features();
        registry.insert(build_feature_layer(features.clone(), FeatureLayerConfig::for_flag(true)));
        let first = registry.get(LayerRole::Features).map(|l| l.generation);
        let replaced = registry.insert(build_feature_layer(features, FeatureLayerConfig::for_flag(true)));
        assert!(replaced.is_some());
        let second = registry.get(LayerRole::Features).map(|l| l.generation);
        assert_ne!(first, second);
    }
}
