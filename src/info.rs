//! Serializable slide reports.
//!
//! These types describe a slide and the Deep Zoom pyramid derived from it
//! in a form that can be printed as text or JSON.

use std::fmt;

use serde::Serialize;

use crate::deepzoom::{ColorMode, DeepZoomGenerator, PyramidSummary};
use crate::error::SlideError;
use crate::slide::SlideSource;

/// One native slide level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelInfo {
    pub level: usize,
    pub width: u32,
    pub height: u32,
    pub downsample: f64,
}

/// Slide metadata plus its Deep Zoom pyramid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub levels: Vec<LevelInfo>,

    /// Mean microns per pixel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpp: Option<f64>,

    pub property_count: usize,
    pub associated_images: Vec<String>,
    pub has_icc_profile: bool,
    pub color_mode: ColorMode,
    pub deepzoom: PyramidSummary,
}

impl SlideInfo {
    /// Collect a report for the slide behind `generator`.
    pub fn collect<S: SlideSource>(
        name: impl Into<String>,
        generator: &DeepZoomGenerator<S>,
        color_mode: ColorMode,
    ) -> Result<Self, SlideError> {
        let source = generator.source();
        let properties = source.properties()?;
        let (width, height) = source.dimensions()?;

        let levels = source
            .level_dimensions()?
            .into_iter()
            .zip(source.level_downsamples()?)
            .enumerate()
            .map(|(level, ((width, height), downsample))| LevelInfo {
                level,
                width,
                height,
                downsample,
            })
            .collect();

        Ok(Self {
            name: name.into(),
            width,
            height,
            levels,
            mpp: properties.mpp(),
            property_count: properties.len(),
            associated_images: source.associated_image_names()?,
            has_icc_profile: source.icc_profile()?.is_some(),
            color_mode,
            deepzoom: generator.summary(),
        })
    }
}

impl fmt::Display for SlideInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Slide: {}", self.name)?;
        writeln!(f, "  Dimensions: {}x{}", self.width, self.height)?;
        if let Some(mpp) = self.mpp {
            writeln!(f, "  MPP: {mpp:.4}")?;
        }
        writeln!(f, "  Properties: {}", self.property_count)?;
        if !self.associated_images.is_empty() {
            writeln!(f, "  Associated images: {}", self.associated_images.join(", "))?;
        }
        writeln!(
            f,
            "  ICC profile: {} (color mode: {})",
            if self.has_icc_profile { "yes" } else { "no" },
            self.color_mode
        )?;

        writeln!(f, "Slide levels:")?;
        for level in &self.levels {
            writeln!(
                f,
                "  {:>2}: {}x{} (downsample {:.3})",
                level.level, level.width, level.height, level.downsample
            )?;
        }

        let dz = &self.deepzoom;
        writeln!(
            f,
            "Deep Zoom: {} levels, {} tiles (tile size {}, overlap {}{})",
            dz.level_count,
            dz.tile_count,
            dz.tile_size,
            dz.overlap,
            if dz.limit_bounds { ", bounds limited" } else { "" }
        )?;
        for level in &dz.levels {
            writeln!(
                f,
                "  {:>2}: {}x{} in {}x{} tiles <- slide level {}",
                level.level,
                level.width,
                level.height,
                level.tiles_x,
                level.tiles_y,
                level.slide_level
            )?;
        }
        Ok(())
    }
}
