use crate::colors::{BLUE, GREEN, RED, Rgba, YELLOW};

/// Path of the isoline feature collection served next to the client bundle.
pub const DATA_PATH: &str = "/isolineData/isoline.json";
pub const DATA_FILE_NAME: &str = "isoline.json";

/// Stops of the value color scale, lowest value first.
pub const ISOLINE_COLOR_STOPS: [Rgba; 4] = [BLUE, GREEN, YELLOW, RED];
pub const EMPTY_DOMAIN: (f64, f64) = (0.0, 1.0);
pub const LABEL_PREFIX: &str = "isoline ";

// z-index bands, bottom to top
pub const TILE_Z_INDEX: i32 = 0;
pub const FEATURES_Z_INDEX: i32 = 10;
pub const LABELS_Z_INDEX: i32 = 20;
pub const HIGHLIGHT_Z_INDEX: i32 = 30;

pub const HIT_TOLERANCE_PX: f64 = 5.0;

pub const INITIAL_CENTER: (f64, f64) = (0.0, 0.0);
pub const INITIAL_ZOOM: f64 = 2.0;

pub const ZOOM_IN_TIP: &str = "Приблизить";
pub const ZOOM_OUT_TIP: &str = "Отдалить";
