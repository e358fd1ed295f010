#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

use crate::viewport::{MERCATOR_EXTENT, Viewport};

const OSM_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_MAX_ZOOM: u8 = 19;
const CACHE_CAPACITY: usize = 256;
const ONLOAD_HANDLE_KEY: &str = "__isolineTileOnload";
const ONERROR_HANDLE_KEY: &str = "__isolineTileOnerror";

/// XYZ raster tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct TileSource {
    pub url_template: &'static str,
    pub max_zoom: u8,
}

impl TileSource {
    pub fn osm() -> Self {
        Self {
            url_template: OSM_URL_TEMPLATE,
            max_zoom: OSM_MAX_ZOOM,
        }
    }

    pub fn url(&self, tile: TileCoord) -> String {
        self.url_template
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }

    /// Tiles covering the view at the nearest integer zoom, row-major.
    pub fn visible_tiles(&self, vp: &Viewport) -> Vec<TileCoord> {
        if vp.width <= 0.0 || vp.height <= 0.0 {
            return Vec::new();
        }
        let z = vp.zoom.round().clamp(0.0, self.max_zoom as f64) as u8;
        let n = 1u32 << z;
        let size = tile_span(z);
        let (min_x, min_y, max_x, max_y) = vp.extent();

        let last = (n - 1) as f64;
        let col = |wx: f64| ((wx + MERCATOR_EXTENT) / size).floor().clamp(0.0, last) as u32;
        let row = |wy: f64| ((MERCATOR_EXTENT - wy) / size).floor().clamp(0.0, last) as u32;

        // Entirely off the tile grid
        if max_x < -MERCATOR_EXTENT
            || min_x > MERCATOR_EXTENT
            || max_y < -MERCATOR_EXTENT
            || min_y > MERCATOR_EXTENT
        {
            return Vec::new();
        }

        let (x0, x1) = (col(min_x), col(max_x));
        let (y0, y1) = (row(max_y), row(min_y));
        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                tiles.push(TileCoord { z, x, y });
            }
        }
        tiles
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    /// World bounds `(min_x, min_y, max_x, max_y)` in Web-Mercator meters.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let size = tile_span(self.z);
        let min_x = -MERCATOR_EXTENT + self.x as f64 * size;
        let max_y = MERCATOR_EXTENT - self.y as f64 * size;
        (min_x, max_y - size, min_x + size, max_y)
    }
}

fn tile_span(z: u8) -> f64 {
    2.0 * MERCATOR_EXTENT / (1u32 << z) as f64
}

enum TileEntry {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

struct CacheSlot {
    entry: TileEntry,
    last_used: u64,
}

/// Bounded image cache; least recently requested tiles are evicted first.
pub struct TileCache {
    source: TileSource,
    slots: Rc<RefCell<HashMap<TileCoord, CacheSlot>>>,
    tick: u64,
    on_ready: Rc<dyn Fn()>,
}

impl TileCache {
    /// `on_ready` runs whenever a tile finishes loading.
    pub fn new(source: TileSource, on_ready: Rc<dyn Fn()>) -> Self {
        Self {
            source,
            slots: Rc::new(RefCell::new(HashMap::new())),
            tick: 0,
            on_ready,
        }
    }

    /// Return the loaded images for `tiles`, starting loads for missing ones.
    pub fn request(&mut self, tiles: &[TileCoord]) -> Vec<(TileCoord, HtmlImageElement)> {
        self.tick += 1;
        let mut ready = Vec::with_capacity(tiles.len());
        let mut missing = Vec::new();
        {
            let mut slots = self.slots.borrow_mut();
            for &tile in tiles {
                match slots.get_mut(&tile) {
                    Some(slot) => {
                        slot.last_used = self.tick;
                        if let TileEntry::Ready(img) = &slot.entry {
                            ready.push((tile, img.clone()));
                        }
                    }
                    None => {
                        slots.insert(
                            tile,
                            CacheSlot {
                                entry: TileEntry::Loading,
                                last_used: self.tick,
                            },
                        );
                        missing.push(tile);
                    }
                }
            }
            evict(&mut slots, CACHE_CAPACITY, self.tick);
        }
        for tile in missing {
            self.load(tile);
        }
        ready
    }

    fn load(&self, tile: TileCoord) {
        let Ok(img) = HtmlImageElement::new() else {
            self.finish(tile, TileEntry::Failed);
            return;
        };
        img.set_cross_origin(Some("anonymous"));

        let slots_load = self.slots.clone();
        let on_ready = self.on_ready.clone();
        let img_for_load = img.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_load);
            if let Some(slot) = slots_load.borrow_mut().get_mut(&tile) {
                slot.entry = TileEntry::Ready(img_for_load.clone());
            }
            on_ready();
        });

        let slots_error = self.slots.clone();
        let img_for_error = img.clone();
        let onerror = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&img_for_error);
            if let Some(slot) = slots_error.borrow_mut().get_mut(&tile) {
                slot.entry = TileEntry::Failed;
            }
        });

        let onload_js = onload.into_js_value();
        let onerror_js = onerror.into_js_value();
        img.set_onload(Some(onload_js.unchecked_ref()));
        img.set_onerror(Some(onerror_js.unchecked_ref()));
        // Keep the closures alive for as long as the image is
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
        let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
        img.set_src(&self.source.url(tile));
    }

    fn finish(&self, tile: TileCoord, entry: TileEntry) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(&tile) {
            slot.entry = entry;
        }
    }
}

fn evict(slots: &mut HashMap<TileCoord, CacheSlot>, capacity: usize, current: u64) {
    if slots.len() <= capacity {
        return;
    }
    let mut by_age: Vec<_> = slots
        .iter()
        .filter(|(_, slot)| slot.last_used < current && !matches!(slot.entry, TileEntry::Loading))
        .map(|(tile, slot)| (slot.last_used, *tile))
        .collect();
    by_age.sort_unstable_by_key(|(used, _)| *used);
    let excess = slots.len() - capacity;
    for (_, tile) in by_age.into_iter().take(excess) {
        slots.remove(&tile);
    }
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(zoom: f64, width: f64, height: f64) -> Viewport {
        let mut vp = Viewport::default();
        vp.zoom = zoom;
        vp.set_size(width, height);
        vp
    }

    #[test]
    fn osm_url_is_filled_in() {
        let url = TileSource::osm().url(TileCoord { z: 3, x: 4, y: 5 });
        assert_eq!(url, "https://tile.openstreetmap.org/3/4/5.png");
    }

    #[test]
    fn whole_world_at_zoom_zero() {
        let tiles = TileSource::osm().visible_tiles(&viewport(0.0, 1024.0, 1024.0));
        assert_eq!(tiles, vec![TileCoord { z: 0, x: 0, y: 0 }]);
    }

    #[test]
    fn initial_view_is_clamped_to_grid() {
        // Zoom 2 on a wide screen covers more than the 4x4 grid
        let tiles = TileSource::osm().visible_tiles(&viewport(2.0, 2000.0, 1500.0));
        assert_eq!(tiles.len(), 16);
        assert!(tiles.iter().all(|t| t.z == 2 && t.x < 4 && t.y < 4));
    }

    #[test]
    fn fractional_zoom_rounds_and_clamps() {
        let source = TileSource::osm();
        let tiles = source.visible_tiles(&viewport(2.6, 256.0, 256.0));
        assert!(tiles.iter().all(|t| t.z == 3));
        let tiles = source.visible_tiles(&viewport(24.0, 256.0, 256.0));
        assert!(tiles.iter().all(|t| t.z == 19));
        assert!(!tiles.is_empty());
    }

    #[test]
    fn unsized_view_has_no_tiles() {
        assert!(TileSource::osm().visible_tiles(&viewport(3.0, 0.0, 0.0)).is_empty());
    }

    #[test]
    fn tile_bounds_partition_the_world() {
        let (min_x, min_y, max_x, max_y) = TileCoord { z: 1, x: 0, y: 0 }.bounds();
        assert_eq!(min_x, -MERCATOR_EXTENT);
        assert_eq!(max_y, MERCATOR_EXTENT);
        assert!((max_x).abs() < 1e-6);
        assert!((min_y).abs() < 1e-6);
    }
}
