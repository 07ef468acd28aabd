//! Deep Zoom pyramid over a [`SlideSource`].
//!
//! # Coordinate spaces
//!
//! - `t`: tile column/row within a Deep Zoom level
//! - `z`: pixel within a Deep Zoom level
//! - `l`: pixel within a slide level
//! - `l0`: pixel within slide level 0
//!
//! Deep Zoom level 0 is 1x1 and the last level is the (bounds-adjusted)
//! size of slide level 0; every level is the previous one halved with
//! ceiling rounding. Each Deep Zoom level reads from the slide level
//! returned by `best_level_for_downsample` and scales the remaining
//! `l_z_downsample` itself.
//!
//! Origins round down and sizes round up so that the region read always
//! covers the requested tile.

use std::fmt;
use std::sync::Arc;

use image::{Rgb, RgbImage};
use serde::Serialize;
use tracing::debug;

use crate::error::{DeepZoomError, SlideError};
use crate::slide::pixels::{composite_on_background, downscale_to_fit};
use crate::slide::{Region, SlideSource};

use super::dzi::DziDescriptor;

/// Default tile edge; with the default overlap tiles are 256 pixels.
pub const DEFAULT_TILE_SIZE: u32 = 254;

/// Default overlap between adjacent tiles.
pub const DEFAULT_OVERLAP: u32 = 1;

// =============================================================================
// Tile Types
// =============================================================================

/// Arguments for [`SlideSource::read_region`] that cover one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegionRequest {
    /// Top-left pixel in the level-0 reference frame
    pub location: (i64, i64),

    /// Slide level to read from
    pub level: usize,

    /// Region size in pixels of `level`
    pub size: (u32, u32),
}

/// Everything needed to materialize one Deep Zoom tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileInfo {
    /// Top-left pixel in the level-0 reference frame
    pub location: (i64, i64),

    /// Slide level to read from
    pub level: usize,

    /// Region size in pixels of `level`
    pub size: (u32, u32),

    /// Final tile size in Deep Zoom pixels
    pub output_size: (u32, u32),
}

impl TileInfo {
    pub fn region(&self) -> RegionRequest {
        RegionRequest {
            location: self.location,
            level: self.level,
            size: self.size,
        }
    }
}

/// A materialized Deep Zoom tile.
#[derive(Debug, Clone)]
pub struct Tile {
    pub image: RgbImage,

    /// ICC profile of the source, copied unmodified
    pub icc_profile: Option<Arc<[u8]>>,
}

impl Tile {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Serializable description of one Deep Zoom level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSummary {
    pub level: usize,
    pub width: u32,
    pub height: u32,
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub slide_level: usize,
    pub downsample: f64,
}

/// Serializable description of a whole Deep Zoom pyramid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PyramidSummary {
    pub tile_size: u32,
    pub overlap: u32,
    pub limit_bounds: bool,
    pub level_count: usize,
    pub tile_count: u64,
    pub width: u32,
    pub height: u32,
    pub levels: Vec<LevelSummary>,
}

/// One axis of a resolved tile.
struct AxisSpan {
    l0_location: i64,
    l_size: u32,
    z_size: u32,
}

// =============================================================================
// DeepZoomGenerator
// =============================================================================

/// Generates Deep Zoom tiles and metadata for one slide source.
///
/// All geometry is computed once in [`DeepZoomGenerator::new`]; afterwards
/// the generator is immutable and can be shared between threads as long as
/// the source can.
///
/// The generator owns `S`, which may itself be a reference or an `Arc`, so
/// callers decide whether the source is borrowed or shared.
pub struct DeepZoomGenerator<S> {
    source: S,
    tile_size: u32,
    overlap: u32,
    limit_bounds: bool,

    /// Origin of the active area in level-0 pixels
    l0_offset: (i64, i64),

    /// Active-area dimensions of every slide level
    l_dimensions: Vec<(u32, u32)>,

    /// Pixel dimensions of every Deep Zoom level, 1x1 first
    z_dimensions: Vec<(u32, u32)>,

    /// Tile grid of every Deep Zoom level
    t_dimensions: Vec<(u32, u32)>,

    /// Slide level read for every Deep Zoom level
    slide_from_dz_level: Vec<usize>,

    /// Slide level downsamples relative to level 0
    l0_l_downsamples: Vec<f64>,

    /// Remaining downsample between each Deep Zoom level and its slide level
    l_z_downsamples: Vec<f64>,

    background: Rgb<u8>,
}

impl<S: SlideSource> DeepZoomGenerator<S> {
    /// Build the Deep Zoom geometry for `source`.
    ///
    /// * `tile_size` - width and height of a tile without overlap; tiles
    ///   display best when `tile_size + 2 * overlap` is a power of two
    /// * `overlap` - extra pixels added on each interior tile edge
    /// * `limit_bounds` - only render the slide's declared non-empty area
    ///
    /// Fails with [`SlideError::InvalidArgument`] when `tile_size + 2 *
    /// overlap` does not fit in `u32`; otherwise only errors raised by the
    /// source are returned. Malformed bounds or
    /// background metadata falls back to the defaults.
    pub fn new(
        source: S,
        tile_size: u32,
        overlap: u32,
        limit_bounds: bool,
    ) -> Result<Self, SlideError> {
        let tile_size = tile_size.max(1);
        if full_tile_size(tile_size, overlap).is_none() {
            return Err(SlideError::InvalidArgument(format!(
                "tile size {tile_size} with overlap {overlap} overflows a tile edge"
            )));
        }
        let slide_dimensions = source.level_dimensions()?;
        let l0_l_downsamples = source.level_downsamples()?;
        let properties = source.properties()?;
        let &(l0_width, l0_height) = slide_dimensions
            .first()
            .ok_or_else(|| SlideError::InvalidArgument("slide has no levels".to_string()))?;

        // Slide level dimensions and level-0 offset of the active area
        let (l0_offset, l_dimensions) = if limit_bounds {
            let bounds = properties.bounds();
            let offset = (bounds.x.unwrap_or(0), bounds.y.unwrap_or(0));
            let scale = (
                size_scale(bounds.width, l0_width),
                size_scale(bounds.height, l0_height),
            );
            let dimensions = slide_dimensions
                .iter()
                .map(|&(w, h)| {
                    (
                        (f64::from(w) * scale.0).ceil() as u32,
                        (f64::from(h) * scale.1).ceil() as u32,
                    )
                })
                .collect::<Vec<_>>();
            (offset, dimensions)
        } else {
            ((0, 0), slide_dimensions)
        };

        // Deep Zoom levels, halving with ceiling rounding down to 1x1
        let mut z_size = l_dimensions[0];
        let mut z_dimensions = vec![z_size];
        while z_size.0 > 1 || z_size.1 > 1 {
            z_size = (z_size.0.div_ceil(2).max(1), z_size.1.div_ceil(2).max(1));
            z_dimensions.push(z_size);
        }
        z_dimensions.reverse();

        let t_dimensions = z_dimensions
            .iter()
            .map(|&(w, h)| (w.div_ceil(tile_size), h.div_ceil(tile_size)))
            .collect::<Vec<_>>();

        let dz_levels = z_dimensions.len();
        let l0_z_downsamples = (0..dz_levels)
            .map(|dz_level| 2f64.powi((dz_levels - dz_level - 1) as i32))
            .collect::<Vec<_>>();

        let slide_from_dz_level = l0_z_downsamples
            .iter()
            .map(|&d| source.best_level_for_downsample(d))
            .collect::<Result<Vec<_>, _>>()?;

        let l_z_downsamples = slide_from_dz_level
            .iter()
            .zip(&l0_z_downsamples)
            .map(|(&slide_level, &d)| {
                l0_l_downsamples
                    .get(slide_level)
                    .map(|&level_downsample| d / level_downsample)
                    .ok_or_else(|| {
                        SlideError::InvalidArgument(format!(
                            "best level {slide_level} has no downsample"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let background = properties.background_color();

        debug!(
            tile_size,
            overlap,
            limit_bounds,
            levels = dz_levels,
            width = l_dimensions[0].0,
            height = l_dimensions[0].1,
            "built deep zoom pyramid"
        );

        Ok(Self {
            source,
            tile_size,
            overlap,
            limit_bounds,
            l0_offset,
            l_dimensions,
            z_dimensions,
            t_dimensions,
            slide_from_dz_level,
            l0_l_downsamples,
            l_z_downsamples,
            background,
        })
    }

    /// Build with the default tile size and overlap, without bounds.
    pub fn with_defaults(source: S) -> Result<Self, SlideError> {
        Self::new(source, DEFAULT_TILE_SIZE, DEFAULT_OVERLAP, false)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn overlap(&self) -> u32 {
        self.overlap
    }

    pub fn limit_bounds(&self) -> bool {
        self.limit_bounds
    }

    /// Background the tiles are composited on.
    pub fn background_color(&self) -> Rgb<u8> {
        self.background
    }

    /// Number of Deep Zoom levels.
    pub fn level_count(&self) -> usize {
        self.z_dimensions.len()
    }

    /// `(tiles_x, tiles_y)` for each Deep Zoom level.
    pub fn level_tiles(&self) -> &[(u32, u32)] {
        &self.t_dimensions
    }

    /// `(width, height)` in pixels for each Deep Zoom level.
    pub fn level_dimensions(&self) -> &[(u32, u32)] {
        &self.z_dimensions
    }

    /// Total number of tiles over all levels.
    pub fn tile_count(&self) -> u64 {
        self.t_dimensions
            .iter()
            .map(|&(cols, rows)| u64::from(cols) * u64::from(rows))
            .sum()
    }

    /// Every `(level, (col, row))` in level, row, column order.
    pub fn tile_addresses(&self) -> impl Iterator<Item = (usize, (u32, u32))> + '_ {
        self.t_dimensions
            .iter()
            .enumerate()
            .flat_map(|(level, &(cols, rows))| {
                (0..rows).flat_map(move |row| (0..cols).map(move |col| (level, (col, row))))
            })
    }

    /// Validate a signed level and address, as received from a caller.
    pub fn checked_address(
        &self,
        level: i64,
        col: i64,
        row: i64,
    ) -> Result<(usize, (u32, u32)), DeepZoomError> {
        let level_count = self.level_count();
        let dz_level = usize::try_from(level)
            .ok()
            .filter(|&l| l < level_count)
            .ok_or(DeepZoomError::InvalidLevel { level, level_count })?;

        let (cols, rows) = self.t_dimensions[dz_level];
        let invalid = || DeepZoomError::InvalidAddress {
            level: dz_level,
            col,
            row,
            cols,
            rows,
        };
        let col = u32::try_from(col).ok().filter(|&c| c < cols).ok_or_else(invalid)?;
        let row = u32::try_from(row).ok().filter(|&r| r < rows).ok_or_else(invalid)?;
        Ok((dz_level, (col, row)))
    }

    /// Region to read and final size for a tile.
    pub fn get_tile_info(
        &self,
        level: usize,
        address: (u32, u32),
    ) -> Result<TileInfo, DeepZoomError> {
        let (dz_level, (col, row)) =
            self.checked_address(level as i64, i64::from(address.0), i64::from(address.1))?;

        let slide_level = self.slide_from_dz_level[dz_level];
        let l0_l = self.l0_l_downsamples[slide_level];
        let l_z = self.l_z_downsamples[dz_level];
        let (cols, rows) = self.t_dimensions[dz_level];
        let (z_width, z_height) = self.z_dimensions[dz_level];
        let (l_width, l_height) = self.l_dimensions[slide_level];

        let x = self.resolve_axis(col, cols, z_width, l_width, self.l0_offset.0, l0_l, l_z);
        let y = self.resolve_axis(row, rows, z_height, l_height, self.l0_offset.1, l0_l, l_z);

        Ok(TileInfo {
            location: (x.l0_location, y.l0_location),
            level: slide_level,
            size: (x.l_size, y.l_size),
            output_size: (x.z_size, y.z_size),
        })
    }

    /// Resolve one axis of a tile: overlap, output size, origin and read size.
    #[allow(clippy::too_many_arguments)]
    fn resolve_axis(
        &self,
        t: u32,
        t_limit: u32,
        z_limit: u32,
        l_limit: u32,
        l0_offset: i64,
        l0_l_downsample: f64,
        l_z_downsample: f64,
    ) -> AxisSpan {
        // Overlap only on interior edges
        let overlap_before = if t != 0 { self.overlap } else { 0 };
        let overlap_after = if t != t_limit - 1 { self.overlap } else { 0 };

        // Last tile is clipped to the remaining pixels
        let z_location = self.tile_size * t;
        let z_size = self.tile_size.min(z_limit - z_location) + overlap_before + overlap_after;

        // Overlap pixels are read from outside the tile, not padded
        let l_location =
            l_z_downsample * (f64::from(z_location) - f64::from(overlap_before));
        let l0_location = (l0_l_downsample * l_location + l0_offset as f64).floor() as i64;

        let l_size = (l_z_downsample * f64::from(z_size))
            .ceil()
            .min(f64::from(l_limit) - l_location.ceil())
            .max(0.0) as u32;

        AxisSpan {
            l0_location,
            l_size,
            z_size,
        }
    }

    /// `read_region` arguments for a tile.
    ///
    /// Most callers want [`DeepZoomGenerator::get_tile`] instead.
    pub fn get_tile_coordinates(
        &self,
        level: usize,
        address: (u32, u32),
    ) -> Result<RegionRequest, DeepZoomError> {
        Ok(self.get_tile_info(level, address)?.region())
    }

    /// Final `(width, height)` of a tile.
    pub fn get_tile_dimensions(
        &self,
        level: usize,
        address: (u32, u32),
    ) -> Result<(u32, u32), DeepZoomError> {
        Ok(self.get_tile_info(level, address)?.output_size)
    }

    /// Read, flatten and scale one tile.
    ///
    /// Source errors are returned unchanged as [`DeepZoomError::Slide`].
    pub fn get_tile(&self, level: usize, address: (u32, u32)) -> Result<Tile, DeepZoomError> {
        let info = self.get_tile_info(level, address)?;
        let Region { image, icc_profile } =
            self.source.read_region(info.location, info.level, info.size)?;

        let flattened = composite_on_background(&image, self.background);
        let image = if flattened.dimensions() != info.output_size {
            downscale_to_fit(flattened, info.output_size)
        } else {
            flattened
        };

        Ok(Tile { image, icc_profile })
    }

    /// DZI descriptor for this pyramid.
    pub fn dzi_descriptor(&self, format: &str) -> DziDescriptor {
        let (width, height) = self.l_dimensions[0];
        DziDescriptor {
            tile_size: self.tile_size,
            overlap: self.overlap,
            format: format.to_string(),
            width,
            height,
        }
    }

    /// XML for the `.dzi` file.
    ///
    /// * `format` - tile image format, usually `jpeg` or `png`
    pub fn get_dzi(&self, format: &str) -> String {
        self.dzi_descriptor(format).to_xml()
    }

    /// Serializable overview of every level.
    pub fn summary(&self) -> PyramidSummary {
        let levels = self
            .z_dimensions
            .iter()
            .zip(&self.t_dimensions)
            .enumerate()
            .map(|(level, (&(width, height), &(tiles_x, tiles_y)))| {
                let slide_level = self.slide_from_dz_level[level];
                LevelSummary {
                    level,
                    width,
                    height,
                    tiles_x,
                    tiles_y,
                    slide_level,
                    downsample: self.l_z_downsamples[level] * self.l0_l_downsamples[slide_level],
                }
            })
            .collect();

        let (width, height) = self.l_dimensions[0];
        PyramidSummary {
            tile_size: self.tile_size,
            overlap: self.overlap,
            limit_bounds: self.limit_bounds,
            level_count: self.level_count(),
            tile_count: self.tile_count(),
            width,
            height,
            levels,
        }
    }
}

/// Edge of an interior tile, `tile_size + 2 * overlap`, if it fits in `u32`.
pub fn full_tile_size(tile_size: u32, overlap: u32) -> Option<u32> {
    overlap.checked_mul(2)?.checked_add(tile_size)
}

/// Scale of the bounds size relative to level 0; 1.0 without usable bounds.
fn size_scale(bounds_size: Option<i64>, l0_size: u32) -> f64 {
    match bounds_size {
        Some(size) if size > 0 && l0_size > 0 => size as f64 / f64::from(l0_size),
        _ => 1.0,
    }
}

impl<S: fmt::Debug> fmt::Debug for DeepZoomGenerator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepZoomGenerator")
            .field("source", &self.source)
            .field("tile_size", &self.tile_size)
            .field("overlap", &self.overlap)
            .field("limit_bounds", &self.limit_bounds)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
