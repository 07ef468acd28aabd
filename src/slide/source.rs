//! The `SlideSource` capability set.
//!
//! Every image the Deep Zoom engine can tile implements [`SlideSource`]:
//! per-level dimensions and downsamples, best-level selection, region
//! reads in the level-0 reference frame, and string properties.
//!
//! Two implementations ship with the crate:
//! - [`crate::slide::PyramidSlide`] for multi-level slides
//! - [`crate::slide::ImageSlide`] for single-level images (plain rasters and
//!   associated images)

use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Rgb, RgbImage, RgbaImage};
use tracing::warn;

use crate::error::SlideError;

use super::pixels::{composite_on_background, downscale_to_fit};

// =============================================================================
// Property Names
// =============================================================================

pub const PROPERTY_NAME_COMMENT: &str = "openslide.comment";
pub const PROPERTY_NAME_VENDOR: &str = "openslide.vendor";
pub const PROPERTY_NAME_QUICKHASH1: &str = "openslide.quickhash-1";
pub const PROPERTY_NAME_BACKGROUND_COLOR: &str = "openslide.background-color";
pub const PROPERTY_NAME_OBJECTIVE_POWER: &str = "openslide.objective-power";
pub const PROPERTY_NAME_MPP_X: &str = "openslide.mpp-x";
pub const PROPERTY_NAME_MPP_Y: &str = "openslide.mpp-y";
pub const PROPERTY_NAME_BOUNDS_X: &str = "openslide.bounds-x";
pub const PROPERTY_NAME_BOUNDS_Y: &str = "openslide.bounds-y";
pub const PROPERTY_NAME_BOUNDS_WIDTH: &str = "openslide.bounds-width";
pub const PROPERTY_NAME_BOUNDS_HEIGHT: &str = "openslide.bounds-height";

/// Background used when a slide does not declare one.
pub const DEFAULT_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

// =============================================================================
// Properties
// =============================================================================

/// Declared sub-rectangle of the scan area, in level-0 pixels.
///
/// Each field is `None` when the property is missing or not an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// String-keyed slide metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Integer property, or `None` when absent or malformed.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        let raw = self.get(name)?;
        match raw.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(property = name, value = raw, "ignoring non-integer property");
                None
            }
        }
    }

    /// Float property, or `None` when absent or malformed.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        let raw = self.get(name)?;
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warn!(property = name, value = raw, "ignoring non-numeric property");
                None
            }
        }
    }

    /// The `openslide.bounds-*` rectangle.
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.get_i64(PROPERTY_NAME_BOUNDS_X),
            y: self.get_i64(PROPERTY_NAME_BOUNDS_Y),
            width: self.get_i64(PROPERTY_NAME_BOUNDS_WIDTH),
            height: self.get_i64(PROPERTY_NAME_BOUNDS_HEIGHT),
        }
    }

    /// Declared background color, white when absent or malformed.
    pub fn background_color(&self) -> Rgb<u8> {
        match self.get(PROPERTY_NAME_BACKGROUND_COLOR) {
            None => DEFAULT_BACKGROUND,
            Some(hex) => parse_hex_color(hex).unwrap_or_else(|| {
                warn!(value = hex, "ignoring malformed background color");
                DEFAULT_BACKGROUND
            }),
        }
    }

    /// Mean microns per pixel over both axes.
    pub fn mpp(&self) -> Option<f64> {
        let x = self.get_f64(PROPERTY_NAME_MPP_X)?;
        let y = self.get_f64(PROPERTY_NAME_MPP_Y)?;
        Some((x + y) / 2.0)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Parse an `rrggbb` hex color, with or without a leading `#`.
pub fn parse_hex_color(hex: &str) -> Option<Rgb<u8>> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(Rgb([(value >> 16) as u8, (value >> 8) as u8, value as u8]))
}

// =============================================================================
// Region
// =============================================================================

/// Pixels returned by [`SlideSource::read_region`].
///
/// The image is straight (not premultiplied) RGBA. Areas outside the
/// scanned region are fully transparent.
#[derive(Debug, Clone)]
pub struct Region {
    pub image: RgbaImage,

    /// Embedded ICC profile of the source, if any
    pub icc_profile: Option<Arc<[u8]>>,
}

impl Region {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

// =============================================================================
// SlideSource Trait
// =============================================================================

/// Index of the best level for displaying `downsample`.
///
/// That is the highest-resolution level whose downsample does not exceed
/// the target; level 0 when the target is below every level.
pub fn best_level_for_downsample(downsamples: &[f64], downsample: f64) -> usize {
    if downsamples.is_empty() || downsample < downsamples[0] {
        return 0;
    }
    for (level, &level_downsample) in downsamples.iter().enumerate().skip(1) {
        if downsample < level_downsample {
            return level - 1;
        }
    }
    downsamples.len() - 1
}

/// Format-agnostic read interface over an opened slide.
///
/// Level 0 is the highest resolution. Region origins are always expressed
/// in the level-0 reference frame while region sizes are in pixels of the
/// requested level.
///
/// Metadata accessors are fallible because some sources (closed or
/// latched handles) refuse every call once they are unusable.
pub trait SlideSource: Send + Sync {
    /// `(width, height)` of every level.
    fn level_dimensions(&self) -> Result<Vec<(u32, u32)>, SlideError>;

    /// Downsample factor of every level relative to level 0.
    fn level_downsamples(&self) -> Result<Vec<f64>, SlideError>;

    /// Read a region as straight RGBA.
    ///
    /// * `location` - top-left pixel in the level-0 reference frame
    /// * `level` - level to read pixels from
    /// * `size` - region size in pixels of `level`
    fn read_region(
        &self,
        location: (i64, i64),
        level: usize,
        size: (u32, u32),
    ) -> Result<Region, SlideError>;

    /// Slide metadata.
    fn properties(&self) -> Result<Properties, SlideError>;

    fn level_count(&self) -> Result<usize, SlideError> {
        Ok(self.level_dimensions()?.len())
    }

    /// Dimensions of level 0.
    fn dimensions(&self) -> Result<(u32, u32), SlideError> {
        self.level_dimensions()?
            .first()
            .copied()
            .ok_or_else(|| SlideError::InvalidArgument("slide has no levels".to_string()))
    }

    fn best_level_for_downsample(&self, downsample: f64) -> Result<usize, SlideError> {
        Ok(best_level_for_downsample(
            &self.level_downsamples()?,
            downsample,
        ))
    }

    /// Names of associated images (label, macro, ...).
    fn associated_image_names(&self) -> Result<Vec<String>, SlideError> {
        Ok(Vec::new())
    }

    fn read_associated_image(&self, name: &str) -> Result<RgbaImage, SlideError> {
        Err(SlideError::AssociatedImageNotFound(name.to_string()))
    }

    /// ICC profile embedded in the slide, if any.
    fn icc_profile(&self) -> Result<Option<Arc<[u8]>>, SlideError> {
        Ok(None)
    }

    /// Thumbnail that fits within `max_size`, composited on the background.
    fn get_thumbnail(&self, max_size: (u32, u32)) -> Result<RgbImage, SlideError> {
        let (width, height) = self.dimensions()?;
        let downsample = (f64::from(width) / f64::from(max_size.0.max(1)))
            .max(f64::from(height) / f64::from(max_size.1.max(1)));
        let level = self.best_level_for_downsample(downsample)?;
        let level_size = self
            .level_dimensions()?
            .get(level)
            .copied()
            .ok_or_else(|| SlideError::InvalidArgument(format!("no level {level}")))?;

        let region = self.read_region((0, 0), level, level_size)?;
        let background = self.properties()?.background_color();
        let thumb = composite_on_background(&region.image, background);
        Ok(downscale_to_fit(thumb, max_size))
    }
}

macro_rules! forward_slide_source {
    ($($ptr:ty),*) => {$(
        impl<T: SlideSource + ?Sized> SlideSource for $ptr {
            fn level_dimensions(&self) -> Result<Vec<(u32, u32)>, SlideError> {
                (**self).level_dimensions()
            }
            fn level_downsamples(&self) -> Result<Vec<f64>, SlideError> {
                (**self).level_downsamples()
            }
            fn read_region(
                &self,
                location: (i64, i64),
                level: usize,
                size: (u32, u32),
            ) -> Result<Region, SlideError> {
                (**self).read_region(location, level, size)
            }
            fn properties(&self) -> Result<Properties, SlideError> {
                (**self).properties()
            }
            fn level_count(&self) -> Result<usize, SlideError> {
                (**self).level_count()
            }
            fn dimensions(&self) -> Result<(u32, u32), SlideError> {
                (**self).dimensions()
            }
            fn best_level_for_downsample(&self, downsample: f64) -> Result<usize, SlideError> {
                (**self).best_level_for_downsample(downsample)
            }
            fn associated_image_names(&self) -> Result<Vec<String>, SlideError> {
                (**self).associated_image_names()
            }
            fn read_associated_image(&self, name: &str) -> Result<RgbaImage, SlideError> {
                (**self).read_associated_image(name)
            }
            fn icc_profile(&self) -> Result<Option<Arc<[u8]>>, SlideError> {
                (**self).icc_profile()
            }
            fn get_thumbnail(&self, max_size: (u32, u32)) -> Result<RgbImage, SlideError> {
                (**self).get_thumbnail(max_size)
            }
        }
    )*};
}

forward_slide_source!(&T, Arc<T>, Box<T>);

// =============================================================================
// Tests
// =============================================================================
