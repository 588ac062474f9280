// Label rendering: text fitting, fonts, raster conversion and label stock.
// Rendering is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod builtin;
pub mod engine;
pub mod fonts;
pub mod raster;
pub mod stock;

pub use engine::{layout_and_render, LabelError, LabelResult};
pub use fonts::{FontLoader, FsFontLoader};
pub use raster::{to_mono_raster, MonoRaster, RasterOptions};
pub use stock::{default_label_settings, LabelSettings};
