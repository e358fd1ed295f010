use isoline_shared::config::{INITIAL_CENTER, INITIAL_ZOOM};

/// Half the side of the Web-Mercator square, in meters.
pub const MERCATOR_EXTENT: f64 = 20_037_508.342_789_244;
/// Resolution (meters per pixel) at zoom 0 for 256 px tiles.
pub const ZOOM0_RESOLUTION: f64 = 2.0 * MERCATOR_EXTENT / 256.0;
const EARTH_RADIUS: f64 = 6_378_137.0;

const MIN_ZOOM: f64 = 0.0;
const MAX_ZOOM: f64 = 28.0;
const WHEEL_ZOOM_SENSITIVITY: f64 = 0.002;

/// View over Web-Mercator map coordinates: a center, a fractional zoom and the
/// CSS pixel size of the map element. Map y grows north, screen y grows down.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: (f64, f64),
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl Viewport {
    /// Meters per CSS pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        ZOOM0_RESOLUTION / 2f64.powf(self.zoom)
    }

    /// Ground resolution at the view center, corrected for Mercator stretch.
    pub fn point_resolution(&self) -> f64 {
        self.resolution() / (self.center.1 / EARTH_RADIUS).cosh()
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn world_to_screen(&self, wx: f64, wy: f64) -> (f64, f64) {
        let res = self.resolution();
        (
            (wx - self.center.0) / res + self.width / 2.0,
            (self.center.1 - wy) / res + self.height / 2.0,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        let res = self.resolution();
        (
            self.center.0 + (sx - self.width / 2.0) * res,
            self.center.1 - (sy - self.height / 2.0) * res,
        )
    }

    /// Visible map extent `(min_x, min_y, max_x, max_y)`.
    pub fn extent(&self) -> (f64, f64, f64, f64) {
        let (x0, y1) = self.screen_to_world(0.0, 0.0);
        let (x1, y0) = self.screen_to_world(self.width, self.height);
        (x0, y0, x1, y1)
    }

    /// Pan by a screen-space delta; the map follows the pointer.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let res = self.resolution();
        self.center.0 -= dx * res;
        self.center.1 += dy * res;
    }

    /// Change zoom about the view center (zoom control buttons).
    pub fn zoom_by(&mut self, delta: f64) {
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom toward a focus point in screen coordinates (wheel).
    pub fn zoom_at(&mut self, wheel_delta: f64, screen_x: f64, screen_y: f64) {
        let anchor = self.screen_to_world(screen_x, screen_y);
        self.zoom_by(-wheel_delta * WHEEL_ZOOM_SENSITIVITY);
        // Keep the world point under the cursor fixed
        let (ax, ay) = self.screen_to_world(screen_x, screen_y);
        self.center.0 += anchor.0 - ax;
        self.center.1 += anchor.1 - ay;
    }
}
