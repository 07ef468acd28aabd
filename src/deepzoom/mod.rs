//! Deep Zoom engine.
//!
//! Turns any [`SlideSource`](crate::slide::SlideSource) into a Deep Zoom
//! pyramid that viewers such as OpenSeadragon can display.
//!
//! ```text
//!  Deep Zoom level            slide level
//!  ───────────────            ───────────
//!  9  300x250  (2x1 tiles) ──► 0  300x250
//!  8  150x125              ──► 0  (scaled 2x)
//!  ...
//!  0  1x1                  ──► 0  (scaled 256x)
//! ```
//!
//! Deep Zoom levels are numbered from the 1x1 level upward, the opposite of
//! slide levels. Each Deep Zoom level reads from the smallest slide level
//! that still has enough resolution and scales the rest itself.
//!
//! # Usage
//!
//! ```no_run
//! use wsi_deepzoom::deepzoom::DeepZoomGenerator;
//! use wsi_deepzoom::slide::ImageSlide;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let slide = ImageSlide::open("boxes.png")?;
//! let dz = DeepZoomGenerator::new(slide, 254, 1, false)?;
//!
//! let xml = dz.get_dzi("jpeg");
//! let tile = dz.get_tile(dz.level_count() - 1, (0, 0))?;
//! # let _ = (xml, tile);
//! # Ok(())
//! # }
//! ```

mod color;
mod dzi;
mod generator;

pub use color::{apply_color_mode, ColorMode, ProfileTransform, RenderingIntent};
pub use dzi::{parse_tile_path, DziDescriptor, TileFormat, TilePath, DEEPZOOM_NAMESPACE};
pub use generator::{
    full_tile_size, DeepZoomGenerator, LevelSummary, PyramidSummary, RegionRequest, Tile, TileInfo,
    DEFAULT_OVERLAP, DEFAULT_TILE_SIZE,
};
