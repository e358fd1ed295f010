pub mod colors;
pub mod config;
pub mod feature;
pub mod hover;

pub use colors::{ColorScale, Rgba};
pub use feature::*;
pub use hover::HoverInfo;
