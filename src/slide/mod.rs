//! Slide abstraction layer.
//!
//! This module provides a unified read interface over whole-slide images
//! regardless of how their pixels are stored.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           DeepZoomGenerator             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              SlideCache                 │
//! │  (keeps opened slides + engines, LRU)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           SlideSource Trait             │
//! │  (levels, regions, properties, ICC)     │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │   ImageSlide    │    │    PyramidSlide     │
//! │  (one level)    │    │ (multi-level handle)│
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! Region locations are always in level-0 pixels; region sizes are in
//! pixels of the level being read.

mod cache;
mod image;
pub(crate) mod pixels;
mod pyramid;
mod source;

pub use cache::{CachedSlide, ImageFileOpener, SlideCache, SlideOpener};
pub use image::{ImageSlide, MAX_REGION_PIXELS};
pub use pixels::{composite_on_background, downscale_to_fit, fit_within};
pub use pyramid::PyramidSlide;
pub use source::{
    best_level_for_downsample, parse_hex_color, Bounds, Properties, Region, SlideSource,
    DEFAULT_BACKGROUND, PROPERTY_NAME_BACKGROUND_COLOR, PROPERTY_NAME_BOUNDS_HEIGHT,
    PROPERTY_NAME_BOUNDS_WIDTH, PROPERTY_NAME_BOUNDS_X, PROPERTY_NAME_BOUNDS_Y,
    PROPERTY_NAME_COMMENT, PROPERTY_NAME_MPP_X, PROPERTY_NAME_MPP_Y, PROPERTY_NAME_OBJECTIVE_POWER,
    PROPERTY_NAME_QUICKHASH1, PROPERTY_NAME_VENDOR,
};
