//! Single-level slide backed by an ordinary raster image.
//!
//! Used for plain image files and for a slide's associated images (label,
//! macro, thumbnail), so that each of them can get its own Deep Zoom
//! pyramid.

use std::path::Path;
use std::sync::Arc;

use image::{imageops, DynamicImage, ImageDecoder, ImageReader, RgbaImage};

use crate::error::SlideError;

use super::source::{Properties, Region, SlideSource};

/// Largest region, in pixels, that a single read may allocate.
pub const MAX_REGION_PIXELS: u64 = 1 << 29;

pub(crate) fn check_region_size(size: (u32, u32)) -> Result<(), SlideError> {
    let pixels = u64::from(size.0) * u64::from(size.1);
    if pixels > MAX_REGION_PIXELS {
        return Err(SlideError::InvalidArgument(format!(
            "region {}x{} exceeds {} pixels",
            size.0, size.1, MAX_REGION_PIXELS
        )));
    }
    Ok(())
}

/// A single-level image exposed through [`SlideSource`].
///
/// It has one level with downsample 1.0 and no properties. Regions that
/// extend past the image edges are transparent there.
#[derive(Debug, Clone)]
pub struct ImageSlide {
    image: Arc<RgbaImage>,
    icc_profile: Option<Arc<[u8]>>,
}

impl ImageSlide {
    pub fn new(image: RgbaImage) -> Self {
        Self {
            image: Arc::new(image),
            icc_profile: None,
        }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.to_rgba8())
    }

    /// Attach an ICC profile that will be carried on every region.
    pub fn with_icc_profile(mut self, profile: impl Into<Arc<[u8]>>) -> Self {
        self.icc_profile = Some(profile.into());
        self
    }

    /// Decode a raster file, keeping its embedded ICC profile.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SlideError> {
        let path = path.as_ref();
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let mut decoder = reader.into_decoder()?;
        let icc_profile = decoder.icc_profile()?.map(Arc::from);
        let image = DynamicImage::from_decoder(decoder)?;

        tracing::debug!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            has_icc_profile = icc_profile.is_some(),
            "opened image slide"
        );

        Ok(Self {
            image: Arc::new(image.to_rgba8()),
            icc_profile,
        })
    }
}

impl SlideSource for ImageSlide {
    fn level_dimensions(&self) -> Result<Vec<(u32, u32)>, SlideError> {
        Ok(vec![self.image.dimensions()])
    }

    fn level_downsamples(&self) -> Result<Vec<f64>, SlideError> {
        Ok(vec![1.0])
    }

    fn read_region(
        &self,
        location: (i64, i64),
        level: usize,
        size: (u32, u32),
    ) -> Result<Region, SlideError> {
        if level != 0 {
            return Err(SlideError::InvalidArgument(format!("invalid level {level}")));
        }
        check_region_size(size)?;

        let mut tile = RgbaImage::new(size.0, size.1);
        let (width, height) = self.image.dimensions();

        // Intersection of the request with the image, in image pixels
        let x0 = location.0.max(0);
        let y0 = location.1.max(0);
        let x1 = (location.0 + i64::from(size.0)).min(i64::from(width));
        let y1 = (location.1 + i64::from(size.1)).min(i64::from(height));

        if x1 > x0 && y1 > y0 {
            let valid = imageops::crop_imm(
                self.image.as_ref(),
                x0 as u32,
                y0 as u32,
                (x1 - x0) as u32,
                (y1 - y0) as u32,
            )
            .to_image();
            imageops::replace(&mut tile, &valid, x0 - location.0, y0 - location.1);
        }

        Ok(Region {
            image: tile,
            icc_profile: self.icc_profile.clone(),
        })
    }

    fn properties(&self) -> Result<Properties, SlideError> {
        Ok(Properties::new())
    }

    fn icc_profile(&self) -> Result<Option<Arc<[u8]>>, SlideError> {
        Ok(self.icc_profile.clone())
    }
}
