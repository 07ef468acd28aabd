//! Configuration for wsi-deepzoom.
//!
//! This module provides:
//! - [`DeepZoomOptions`], the tiling parameters shared by every engine
//! - Command-line arguments via clap, with `DZ_` environment variables
//! - Sensible defaults for all optional settings
//!
//! # Environment Variables
//!
//! - `DZ_TILE_SIZE` - Tile edge without overlap (default: 254)
//! - `DZ_OVERLAP` - Overlap on interior tile edges (default: 1)
//! - `DZ_LIMIT_BOUNDS` - Only render the slide's non-empty area (default: false)
//! - `DZ_FORMAT` - Tile format written in `.dzi` files (default: jpeg)
//! - `DZ_COLOR_MODE` - ICC profile handling (default: absolute-colorimetric)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::deepzoom::{full_tile_size, ColorMode, TileFormat, DEFAULT_OVERLAP, DEFAULT_TILE_SIZE};

// =============================================================================
// Default Values
// =============================================================================

/// Default thumbnail bounding box for `info`.
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

// =============================================================================
// Deep Zoom Options
// =============================================================================

/// Tiling parameters for [`DeepZoomGenerator`](crate::deepzoom::DeepZoomGenerator).
#[derive(Args, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeepZoomOptions {
    /// Tile width and height, excluding overlap.
    #[arg(short = 's', long, default_value_t = DEFAULT_TILE_SIZE, env = "DZ_TILE_SIZE")]
    pub tile_size: u32,

    /// Pixels of overlap added on each interior tile edge.
    #[arg(short = 'e', long, default_value_t = DEFAULT_OVERLAP, env = "DZ_OVERLAP")]
    pub overlap: u32,

    /// Only render the non-empty slide region declared by its bounds.
    #[arg(short = 'B', long, default_value_t = false, env = "DZ_LIMIT_BOUNDS")]
    pub limit_bounds: bool,
}

impl Default for DeepZoomOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            overlap: DEFAULT_OVERLAP,
            limit_bounds: false,
        }
    }
}

impl DeepZoomOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.overlap > self.tile_size {
            return Err(format!(
                "overlap ({}) must not exceed tile_size ({})",
                self.overlap, self.tile_size
            ));
        }
        if self.full_tile_size().is_none() {
            return Err(format!(
                "tile_size ({}) plus twice the overlap ({}) is too large",
                self.tile_size, self.overlap
            ));
        }
        Ok(())
    }

    /// Edge of an interior tile including overlap on both sides.
    pub fn full_tile_size(&self) -> Option<u32> {
        full_tile_size(self.tile_size, self.overlap)
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// wsi-deepzoom - Deep Zoom tiling for whole-slide images.
///
/// Computes Deep Zoom pyramids, `.dzi` descriptors and tile coordinates for
/// slide images.
#[derive(Parser, Debug, Clone)]
#[command(name = "wsi-deepzoom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the slide's levels and the resulting Deep Zoom pyramid.
    Info(InfoConfig),

    /// Print the `.dzi` descriptor for a slide.
    Dzi(DziConfig),

    /// Print the region read for one tile.
    Coords(CoordsConfig),
}

/// Arguments for `info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Slide image file.
    pub slide: PathBuf,

    #[command(flatten)]
    pub options: DeepZoomOptions,

    /// ICC profile handling reported for the slide.
    #[arg(long, default_value_t = ColorMode::default(), env = "DZ_COLOR_MODE")]
    pub color_mode: ColorMode,

    /// Write a thumbnail to this path.
    #[arg(long)]
    pub thumbnail: Option<PathBuf>,

    /// Bounding box of the thumbnail.
    #[arg(long, default_value_t = DEFAULT_THUMBNAIL_SIZE)]
    pub thumbnail_size: u32,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.options.validate()?;
        if self.thumbnail_size == 0 {
            return Err("thumbnail_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Arguments for `dzi`.
#[derive(Args, Debug, Clone)]
pub struct DziConfig {
    /// Slide image file.
    pub slide: PathBuf,

    #[command(flatten)]
    pub options: DeepZoomOptions,

    /// Tile format named in the descriptor.
    #[arg(short, long, default_value_t = TileFormat::Jpeg, env = "DZ_FORMAT")]
    pub format: TileFormat,
}

impl DziConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.options.validate()
    }
}

/// Arguments for `coords`.
#[derive(Args, Debug, Clone)]
pub struct CoordsConfig {
    /// Slide image file.
    pub slide: PathBuf,

    /// Tile path relative to the `_files` directory, e.g. `9/1_0.jpeg`.
    pub tile: String,

    #[command(flatten)]
    pub options: DeepZoomOptions,

    /// Also read the tile and report its final size.
    #[arg(long, default_value_t = false)]
    pub render: bool,
}

impl CoordsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.options.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
