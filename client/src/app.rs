use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use gloo_storage::Storage;
use leptos::prelude::*;

use isoline_shared::hover::info_fields;
use isoline_shared::{HoverInfo, IsolineFeature, assign_colors_and_names};

use crate::canvas::MapCanvas;
use crate::data::load_isolines;
use crate::layers::{upsert_feature_layer, upsert_highlight_layer, upsert_label_layer};
use crate::map::{IsolineMap, MapHandle, ensure_map};

const SETTINGS_KEY: &str = "isoline_settings";

/// Bumped after every mutation of the map; the canvas repaints on change.
#[derive(Clone, Copy)]
pub(crate) struct MapRevision(pub RwSignal<u64>);

impl MapRevision {
    pub fn bump(self) {
        self.0.update(|r| *r = r.wrapping_add(1));
    }
}

/// Attributes of the feature under the pointer, `None` when nothing is hovered.
#[derive(Clone, Copy)]
pub(crate) struct LastHover(pub RwSignal<Option<HoverInfo>>);

#[derive(Clone, Copy)]
pub(crate) struct Accelerated(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ShowLabels(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct Declutter(pub RwSignal<bool>);

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    accelerated: bool,
    labels: bool,
    declutter: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accelerated: true,
            labels: false,
            declutter: false,
        }
    }
}

/// Recolor `features` and rebuild the feature, label and highlight layers.
fn rebuild_layers(
    map: &mut IsolineMap,
    features: &[IsolineFeature],
    accelerated: bool,
    labels: bool,
    declutter: bool,
) {
    let mut features = features.to_vec();
    assign_colors_and_names(&mut features);
    let features: Arc<[IsolineFeature]> = Arc::from(features);
    upsert_feature_layer(map, features.clone(), accelerated);
    upsert_label_layer(map, features, labels, declutter);
    upsert_highlight_layer(map);
}

/// Rebuild layers once the data has loaded. Until then (or when the fetch
/// failed) the map keeps only its base layer. Returns whether the map changed.
fn apply_loaded_features(
    map: &mut IsolineMap,
    features: Option<&[IsolineFeature]>,
    accelerated: bool,
    labels: bool,
    declutter: bool,
) -> bool {
    let Some(features) = features else {
        return false;
    };
    rebuild_layers(map, features, accelerated, labels, declutter);
    true
}

/// Root application component. Owns the map and the user toggles.
#[component]
pub fn App() -> impl IntoView {
    let map: MapHandle = Rc::new(RefCell::new(None));
    if ensure_map(&mut map.borrow_mut()) {
        web_sys::console::log_1(&"map created".into());
    }

    let revision = MapRevision(RwSignal::new(0));
    let last_hover: RwSignal<Option<HoverInfo>> = RwSignal::new(None);
    let features: RwSignal<Option<Vec<IsolineFeature>>> = RwSignal::new(None);

    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let accelerated: RwSignal<bool> = RwSignal::new(saved.accelerated);
    let labels: RwSignal<bool> = RwSignal::new(saved.labels);
    let declutter: RwSignal<bool> = RwSignal::new(saved.declutter);

    provide_context(revision);
    provide_context(LastHover(last_hover));
    provide_context(Accelerated(accelerated));
    provide_context(ShowLabels(labels));
    provide_context(Declutter(declutter));

    // Persist settings to localStorage on any change
    Effect::new(move || {
        let settings = Settings {
            accelerated: accelerated.get(),
            labels: labels.get(),
            declutter: declutter.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    load_isolines(features);

    // Data or toggle change: rebuild layers from scratch
    Effect::new({
        let map = map.clone();
        move || {
            let accelerated = accelerated.get();
            let labels = labels.get();
            let declutter = declutter.get();
            let changed = features.with(|features| {
                let mut slot = map.borrow_mut();
                let Some(map) = slot.as_mut() else {
                    return false;
                };
                apply_loaded_features(map, features.as_deref(), accelerated, labels, declutter)
            });
            if changed {
                revision.bump();
            }
        }
    });

    view! {
        <div class="isoline-app" style="width: 100%; height: 100%; position: relative;">
            <div class="isoline-map" style="width: 100%; height: 100%; position: relative; overflow: hidden;">
                <MapCanvas map=map />
            </div>
            <SettingsPanel />
            <InfoPanel />
        </div>
    }
}

#[component]
fn Toggle(label: &'static str, value: RwSignal<bool>) -> impl IntoView {
    view! {
        <label style="display: flex; align-items: center; gap: 6px; cursor: pointer;">
            <input
                type="checkbox"
                prop:checked=move || value.get()
                on:change=move |e| value.set(event_target_checked(&e))
            />
            {label}
        </label>
    }
}

/// The three rendering toggles.
#[component]
fn SettingsPanel() -> impl IntoView {
    let Accelerated(accelerated) = expect_context();
    let ShowLabels(labels) = expect_context();
    let Declutter(declutter) = expect_context();

    view! {
        <div
            class="isoline-settings"
            style="position: absolute; top: 8px; right: 8px; z-index: 50; background: rgba(255,255,255,0.9); border-radius: 4px; padding: 8px 10px; font: 12px sans-serif; display: flex; flex-direction: column; gap: 4px;"
        >
            <Toggle label="WebGL" value=accelerated />
            <Toggle label="Labels" value=labels />
            <Toggle label="Declutter" value=declutter />
        </div>
    }
}

/// Value, name, color and geometry type of the hovered feature.
#[component]
fn InfoPanel() -> impl IntoView {
    let LastHover(last_hover) = expect_context();
    let fields = Memo::new(move |_| last_hover.with(|info| info_fields(info.as_ref())));
    let row = move |title: &'static str, index: usize| {
        view! {
            <div style="display: flex; justify-content: space-between; gap: 12px;">
                <span style="color: #666;">{title}</span>
                <span style="font-family: monospace;">{move || fields.with(|f| f[index].clone())}</span>
            </div>
        }
    };

    view! {
        <div
            class="isoline-info"
            style="position: absolute; bottom: 8px; right: 8px; z-index: 50; background: rgba(255,255,255,0.9); border-radius: 4px; padding: 8px 10px; font: 12px sans-serif; min-width: 180px;"
        >
            {row("Value", 0)}
            {row("Name", 1)}
            {row("Color", 2)}
            {row("Geometry", 3)}
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isoline_shared::Geometry;
    use crate::layers::{FeatureLayerConfig, LayerKind, LayerRole};

    fn features() -> Vec<IsolineFeature> {
        vec![
            IsolineFeature::new(Geometry::Point([0.0, 0.0]), Some(0.0)),
            IsolineFeature::new(
                Geometry::LineString(vec![[0.0, 0.0], [1.0, 1.0]]),
                Some(10.0),
            ),
        ]
    }

    #[test]
    fn settings_default_and_partial_json() {
        let defaults = Settings::default();
        assert!(defaults.accelerated);
        assert!(!defaults.labels);
        assert!(!defaults.declutter);

        let partial: Settings = serde_json::from_str(r#"{"labels":true}"#).expect("settings");
        assert_eq!(
            partial,
            Settings {
                accelerated: true,
                labels: true,
                declutter: false,
            }
        );
    }

    #[test]
    fn rebuild_colors_features_and_creates_layers() {
        let mut map = IsolineMap::bootstrap();
        rebuild_layers(&mut map, &features(), true, false, false);
        let layer = map.layers.get(LayerRole::Features).expect("features layer");
        assert!(layer.features.iter().all(|f| f.color.is_some() && f.name.is_some()));
        assert!(!map.layers.contains(LayerRole::Labels));
        assert!(map.layers.contains(LayerRole::Highlight));
        assert_eq!(map.layers.len(), 2);
    }

    #[test]
    fn failed_load_adds_no_feature_layer() {
        let mut map = IsolineMap::bootstrap();
        assert!(!apply_loaded_features(&mut map, None, true, true, true));
        assert!(!map.layers.contains(LayerRole::Features));
        assert!(map.layers.is_empty());
        assert_eq!(info_fields(None), ["-", "-", "-", "-"].map(String::from));
    }

    #[test]
    fn loaded_features_build_the_layers() {
        let mut map = IsolineMap::bootstrap();
        let features = features();
        assert!(apply_loaded_features(&mut map, Some(&features), true, false, false));
        assert!(map.layers.contains(LayerRole::Features));
    }

    #[test]
    fn rebuild_switches_style_and_labels() {
        let mut map = IsolineMap::bootstrap();
        rebuild_layers(&mut map, &features(), true, false, false);
        rebuild_layers(&mut map, &features(), false, true, true);
        let layer = map.layers.get(LayerRole::Features).expect("features layer");
        assert!(matches!(
            layer.kind,
            LayerKind::Features(FeatureLayerConfig::Standard(_))
        ));
        let labels = map.layers.get(LayerRole::Labels).expect("labels layer");
        assert!(matches!(labels.kind, LayerKind::Labels { declutter: true, .. }));
        assert_eq!(map.layers.len(), 3);
    }
}
