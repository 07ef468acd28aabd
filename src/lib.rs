//! # WSI Deep Zoom
//!
//! Deep Zoom tiling for whole-slide images.
//!
//! This library computes the Deep Zoom pyramid of a slide (the level and
//! tile layout that OpenSeadragon and other Deep Zoom viewers expect),
//! resolves every tile to a region of the slide, and renders tiles from any
//! source that implements [`SlideSource`].
//!
//! ## Features
//!
//! - **Exact geometry**: level sizes, tile grids, overlaps and bounds
//!   handling match the reference Deep Zoom tiler byte for byte
//! - **Native level selection**: each Deep Zoom level reads from the best
//!   slide level and only scales the remainder
//! - **Bounds limiting**: optionally render only the slide's non-empty area
//! - **Color profiles**: ignore, embed or transform ICC profiles per tile
//! - **Slide cache**: keep opened slides and their engines in an LRU
//!
//! ## Architecture
//!
//! - [`slide`] - Slide sources, properties and the slide cache
//! - [`deepzoom`] - Deep Zoom engine, DZI descriptors and color modes
//! - [`info`] - Serializable slide reports
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_deepzoom::{DeepZoomGenerator, ImageSlide};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let slide = ImageSlide::open("boxes.png")?;
//! let dz = DeepZoomGenerator::new(slide, 254, 1, false)?;
//!
//! println!("{}", dz.get_dzi("jpeg"));
//! for (level, address) in dz.tile_addresses() {
//!     let tile = dz.get_tile(level, address)?;
//!     println!("{level}/{}_{}: {:?}", address.0, address.1, tile.dimensions());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod deepzoom;
pub mod error;
pub mod info;
pub mod slide;

// Re-export commonly used types
pub use config::{Cli, Command, CoordsConfig, DeepZoomOptions, DziConfig, InfoConfig};
pub use deepzoom::{
    apply_color_mode, parse_tile_path, ColorMode, DeepZoomGenerator, DziDescriptor,
    ProfileTransform, RegionRequest, RenderingIntent, Tile, TileFormat, TileInfo, TilePath,
};
pub use error::{DeepZoomError, DziError, SlideError};
pub use info::{LevelInfo, SlideInfo};
pub use slide::{
    CachedSlide, ImageFileOpener, ImageSlide, Properties, PyramidSlide, Region, SlideCache,
    SlideOpener, SlideSource,
};
