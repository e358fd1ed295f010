use std::cell::RefCell;
use std::rc::Rc;

use isoline_shared::config::{ZOOM_IN_TIP, ZOOM_OUT_TIP};

use crate::label_layout::PlacedLabel;
use crate::layers::LayerRegistry;
use crate::scale_line::ScaleUnits;
use crate::tiles::TileSource;
use crate::viewport::Viewport;

/// Zoom in/out buttons.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomControl {
    pub zoom_in_tip: &'static str,
    pub zoom_out_tip: &'static str,
    pub delta: f64,
}

/// Scale bar in the lower-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleLineControl {
    pub units: ScaleUnits,
    pub min_width: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Zoom(ZoomControl),
    ScaleLine(ScaleLineControl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Default,
    Pointer,
    Grabbing,
}

impl Cursor {
    pub fn css(self) -> &'static str {
        match self {
            Cursor::Default => "",
            Cursor::Pointer => "pointer",
            Cursor::Grabbing => "grabbing",
        }
    }
}

/// The map: base tiles, view, controls and the role-keyed layer registry.
#[derive(Debug)]
pub struct IsolineMap {
    pub base: TileSource,
    pub viewport: Viewport,
    pub controls: Vec<Control>,
    pub layers: LayerRegistry,
    pub cursor: Cursor,
    /// Label boxes from the last label draw, in screen space.
    pub placed_labels: Vec<PlacedLabel>,
}

impl IsolineMap {
    /// Build the base map. Callers own the single instance; see [`ensure_map`].
    pub fn bootstrap() -> Self {
        Self {
            base: TileSource::osm(),
            viewport: Viewport::default(),
            controls: vec![
                Control::Zoom(ZoomControl {
                    zoom_in_tip: ZOOM_IN_TIP,
                    zoom_out_tip: ZOOM_OUT_TIP,
                    delta: 1.0,
                }),
                Control::ScaleLine(ScaleLineControl {
                    units: ScaleUnits::Metric,
                    min_width: crate::scale_line::MIN_WIDTH_PX,
                }),
            ],
            layers: LayerRegistry::default(),
            cursor: Cursor::Default,
            placed_labels: Vec::new(),
        }
    }

    pub fn zoom_control(&self) -> Option<&ZoomControl> {
        self.controls.iter().find_map(|c| match c {
            Control::Zoom(z) => Some(z),
            _ => None,
        })
    }

    pub fn scale_line_control(&self) -> Option<&ScaleLineControl> {
        self.controls.iter().find_map(|c| match c {
            Control::ScaleLine(s) => Some(s),
            _ => None,
        })
    }
}

/// Shared slot for the single map instance.
pub type MapHandle = Rc<RefCell<Option<IsolineMap>>>;

/// Bootstrap into `slot` unless a map already lives there. Returns whether a
/// new map was created.
pub fn ensure_map(slot: &mut Option<IsolineMap>) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(IsolineMap::bootstrap());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_has_one_zoom_and_one_scale_line() {
        let map = IsolineMap::bootstrap();
        assert_eq!(map.controls.len(), 2);
        let zoom = map.zoom_control().expect("zoom control");
        assert_eq!(zoom.zoom_in_tip, "Приблизить");
        assert_eq!(zoom.zoom_out_tip, "Отдалить");
        let scale = map.scale_line_control().expect("scale line");
        assert_eq!(scale.units, ScaleUnits::Metric);
        assert!(map.layers.is_empty());
    }

    #[test]
    fn bootstrap_view_starts_at_origin() {
        let map = IsolineMap::bootstrap();
        assert_eq!(map.viewport.center, (0.0, 0.0));
        assert_eq!(map.viewport.zoom, 2.0);
        assert_eq!(map.cursor, Cursor::Default);
    }

    #[test]
    fn cursor_css_values() {
        assert_eq!(Cursor::Default.css(), "");
        assert_eq!(Cursor::Pointer.css(), "pointer");
        assert_eq!(Cursor::Grabbing.css(), "grabbing");
    }

    #[test]
    fn ensure_map_runs_once() {
        let mut slot = None;
        assert!(ensure_map(&mut slot));
        if let Some(map) = slot.as_mut() {
            map.viewport.zoom = 5.0;
        }
        assert!(!ensure_map(&mut slot));
        let map = slot.expect("map");
        assert_eq!(map.viewport.zoom, 5.0);
        assert_eq!(map.controls.len(), 2);
    }
}
