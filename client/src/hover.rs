use std::sync::Arc;

use isoline_shared::HoverInfo;
use isoline_shared::config::HIT_TOLERANCE_PX;

use crate::hit_test::feature_at;
use crate::layers::LayerRole;
use crate::map::{Cursor, IsolineMap};

/// Pointer-move event as seen by the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerMove {
    /// CSS pixels relative to the map element.
    pub pixel: (f64, f64),
    /// A drag (pan) is in progress.
    pub dragging: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverOutcome {
    /// Dragging; nothing changed.
    Ignored,
    Hit(HoverInfo),
    Miss,
}

impl HoverOutcome {
    /// Value to publish to the info panel, `None` when nothing is to be published.
    pub fn published(self) -> Option<Option<HoverInfo>> {
        match self {
            HoverOutcome::Ignored => None,
            HoverOutcome::Hit(info) => Some(Some(info)),
            HoverOutcome::Miss => Some(None),
        }
    }
}

/// Hit-test the pointer and refresh the highlight overlay and cursor.
pub fn handle_pointer_move(map: &mut IsolineMap, event: PointerMove) -> HoverOutcome {
    if event.dragging {
        return HoverOutcome::Ignored;
    }

    let found = feature_at(
        &map.layers,
        &map.placed_labels,
        &map.viewport,
        event.pixel,
        HIT_TOLERANCE_PX,
    )
        .map(|hit| hit.feature.clone());

    match found {
        Some(feature) => {
            let info = HoverInfo::from_feature(&feature);
            let unchanged = map
                .layers
                .get(LayerRole::Highlight)
                .is_some_and(|layer| layer.features.len() == 1 && layer.features[0] == feature);
            if !unchanged {
                map.layers
                    .set_features(LayerRole::Highlight, Arc::from(vec![feature]));
            }
            map.cursor = Cursor::Pointer;
            HoverOutcome::Hit(info)
        }
        None => {
            clear_hover(map);
            HoverOutcome::Miss
        }
    }
}

/// Empty the highlight layer and reset the cursor. Returns whether the
/// highlight held anything.
pub fn clear_hover(map: &mut IsolineMap) -> bool {
    let had_highlight = map
        .layers
        .get(LayerRole::Highlight)
        .is_some_and(|layer| !layer.features.is_empty());
    if had_highlight {
        map.layers.set_features(LayerRole::Highlight, Arc::from(Vec::new()));
    }
    map.cursor = Cursor::Default;
    had_highlight
}
