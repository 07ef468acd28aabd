//! Multi-level slide handle.
//!
//! `PyramidSlide` behaves like a handle to a natively decoded slide:
//!
//! - level pixels are held in native premultiplied ARGB words and converted
//!   to straight RGBA on every read
//! - the handle can be closed explicitly; the pixel store is released at
//!   that point (or on drop) and every later call fails with
//!   [`SlideError::Closed`]
//! - errors latch: once a read fails, every later call except `close`
//!   fails with [`SlideError::Latched`] carrying the first error message

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::SlideError;

use super::image::check_region_size;
use super::pixels::{argb_to_rgba, rgba_to_argb};
use super::source::{Properties, Region, SlideSource};

// =============================================================================
// Native Storage
// =============================================================================

/// One raster in native premultiplied ARGB layout.
struct NativeRaster {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl NativeRaster {
    fn from_rgba(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            pixels: image.pixels().map(|p| rgba_to_argb(*p)).collect(),
        }
    }

    fn to_rgba(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for (dst, &src) in out.pixels_mut().zip(self.pixels.iter()) {
            *dst = argb_to_rgba(src);
        }
        out
    }

    fn pixel(&self, x: i64, y: i64) -> Option<u32> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.pixels.get(index).copied()
    }
}

struct PyramidData {
    levels: Vec<NativeRaster>,
    downsamples: Vec<f64>,
    properties: Properties,
    associated: BTreeMap<String, NativeRaster>,
    icc_profile: Option<Arc<[u8]>>,
}

enum HandleState {
    Open(Arc<PyramidData>),
    Latched(String),
    Closed,
}

// =============================================================================
// PyramidSlide
// =============================================================================

/// A multi-level slide with explicit lifetime and latching errors.
pub struct PyramidSlide {
    state: RwLock<HandleState>,
}

impl PyramidSlide {
    /// Create a slide from explicit levels, highest resolution first.
    ///
    /// Each level's downsample is the mean of its per-axis size ratios to
    /// level 0.
    pub fn from_levels(levels: Vec<RgbaImage>, properties: Properties) -> Result<Self, SlideError> {
        let Some(base) = levels.first() else {
            return Err(SlideError::InvalidArgument(
                "a slide needs at least one level".to_string(),
            ));
        };
        let (l0_w, l0_h) = base.dimensions();
        if l0_w == 0 || l0_h == 0 {
            return Err(SlideError::InvalidArgument(format!(
                "level 0 has empty dimensions {l0_w}x{l0_h}"
            )));
        }

        let mut downsamples = Vec::with_capacity(levels.len());
        for (index, level) in levels.iter().enumerate() {
            let (w, h) = level.dimensions();
            if w == 0 || h == 0 {
                return Err(SlideError::InvalidArgument(format!(
                    "level {index} has empty dimensions {w}x{h}"
                )));
            }
            let downsample =
                (f64::from(l0_w) / f64::from(w) + f64::from(l0_h) / f64::from(h)) / 2.0;
            if let Some(&previous) = downsamples.last() {
                if downsample < previous {
                    return Err(SlideError::InvalidArgument(format!(
                        "level {index} is larger than level {}",
                        index - 1
                    )));
                }
            }
            downsamples.push(downsample);
        }

        debug!(
            levels = levels.len(),
            width = l0_w,
            height = l0_h,
            "created pyramid slide"
        );

        let data = PyramidData {
            levels: levels.iter().map(NativeRaster::from_rgba).collect(),
            downsamples,
            properties,
            associated: BTreeMap::new(),
            icc_profile: None,
        };
        Ok(Self {
            state: RwLock::new(HandleState::Open(Arc::new(data))),
        })
    }

    /// Create a slide by repeatedly halving `base` (floor rounding) until
    /// `level_count` levels exist or a 1-pixel axis is reached.
    pub fn build(
        base: RgbaImage,
        level_count: usize,
        properties: Properties,
    ) -> Result<Self, SlideError> {
        let mut levels = vec![base];
        while levels.len() < level_count {
            let Some(previous) = levels.last() else { break };
            let (w, h) = previous.dimensions();
            if w < 2 || h < 2 {
                break;
            }
            let next = imageops::resize(previous, w / 2, h / 2, FilterType::Triangle);
            levels.push(next);
        }
        Self::from_levels(levels, properties)
    }

    /// Attach an associated image (label, macro, thumbnail, ...).
    ///
    /// Only meaningful before the handle is shared; it fails on a closed or
    /// latched handle.
    pub fn with_associated_image(
        self,
        name: impl Into<String>,
        image: &RgbaImage,
    ) -> Result<Self, SlideError> {
        let name = name.into();
        self.modify(|data| {
            data.associated.insert(name, NativeRaster::from_rgba(image));
        })?;
        Ok(self)
    }

    /// Attach the slide's ICC profile.
    pub fn with_icc_profile(self, profile: impl Into<Arc<[u8]>>) -> Result<Self, SlideError> {
        let profile = profile.into();
        self.modify(|data| data.icc_profile = Some(profile))?;
        Ok(self)
    }

    /// Release the pixel store.
    ///
    /// Later calls fail with [`SlideError::Closed`]; closing twice is an
    /// error too.
    pub fn close(&self) -> Result<(), SlideError> {
        let mut state = self.write_state();
        if matches!(*state, HandleState::Closed) {
            return Err(SlideError::Closed);
        }
        *state = HandleState::Closed;
        debug!("closed pyramid slide");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.read_state(), HandleState::Closed)
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, HandleState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, HandleState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The pixel store, or the error that makes the handle unusable.
    fn data(&self) -> Result<Arc<PyramidData>, SlideError> {
        match &*self.read_state() {
            HandleState::Open(data) => Ok(Arc::clone(data)),
            HandleState::Latched(message) => Err(SlideError::Latched(message.clone())),
            HandleState::Closed => Err(SlideError::Closed),
        }
    }

    /// Put the handle into the error state and hand the error back.
    fn latch(&self, err: SlideError) -> SlideError {
        let mut state = self.write_state();
        if let HandleState::Open(_) = *state {
            warn!(error = %err, "slide handle entered error state");
            *state = HandleState::Latched(err.to_string());
        }
        err
    }

    fn modify(&self, f: impl FnOnce(&mut PyramidData)) -> Result<(), SlideError> {
        let mut state = self.write_state();
        match &mut *state {
            HandleState::Open(data) => match Arc::get_mut(data) {
                Some(data) => {
                    f(data);
                    Ok(())
                }
                None => Err(SlideError::InvalidArgument(
                    "slide is already shared".to_string(),
                )),
            },
            HandleState::Latched(message) => Err(SlideError::Latched(message.clone())),
            HandleState::Closed => Err(SlideError::Closed),
        }
    }
}

impl fmt::Debug for PyramidSlide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.read_state() {
            HandleState::Open(data) => f
                .debug_struct("PyramidSlide")
                .field(
                    "levels",
                    &data
                        .levels
                        .iter()
                        .map(|l| (l.width, l.height))
                        .collect::<Vec<_>>(),
                )
                .field("associated", &data.associated.keys().collect::<Vec<_>>())
                .finish(),
            HandleState::Latched(message) => f
                .debug_struct("PyramidSlide")
                .field("error", message)
                .finish(),
            HandleState::Closed => f.write_str("PyramidSlide(closed)"),
        }
    }
}

impl SlideSource for PyramidSlide {
    fn level_dimensions(&self) -> Result<Vec<(u32, u32)>, SlideError> {
        let data = self.data()?;
        Ok(data.levels.iter().map(|l| (l.width, l.height)).collect())
    }

    fn level_downsamples(&self) -> Result<Vec<f64>, SlideError> {
        Ok(self.data()?.downsamples.clone())
    }

    /// Regions at a level the slide does not have come back fully
    /// transparent rather than failing.
    fn read_region(
        &self,
        location: (i64, i64),
        level: usize,
        size: (u32, u32),
    ) -> Result<Region, SlideError> {
        let data = self.data()?;
        check_region_size(size).map_err(|e| self.latch(e))?;

        let mut out = RgbaImage::new(size.0, size.1);
        if let (Some(raster), Some(&downsample)) =
            (data.levels.get(level), data.downsamples.get(level))
        {
            let origin_x = (location.0 as f64 / downsample).floor() as i64;
            let origin_y = (location.1 as f64 / downsample).floor() as i64;
            for (dx, dy, dst) in out.enumerate_pixels_mut() {
                if let Some(src) = raster.pixel(origin_x + i64::from(dx), origin_y + i64::from(dy))
                {
                    *dst = argb_to_rgba(src);
                }
            }
        }

        Ok(Region {
            image: out,
            icc_profile: data.icc_profile.clone(),
        })
    }

    fn properties(&self) -> Result<Properties, SlideError> {
        Ok(self.data()?.properties.clone())
    }

    fn associated_image_names(&self) -> Result<Vec<String>, SlideError> {
        Ok(self.data()?.associated.keys().cloned().collect())
    }

    fn read_associated_image(&self, name: &str) -> Result<RgbaImage, SlideError> {
        let data = self.data()?;
        data.associated
            .get(name)
            .map(NativeRaster::to_rgba)
            .ok_or_else(|| SlideError::AssociatedImageNotFound(name.to_string()))
    }

    fn icc_profile(&self) -> Result<Option<Arc<[u8]>>, SlideError> {
        Ok(self.data()?.icc_profile.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
