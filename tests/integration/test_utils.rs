//! Test utilities for integration tests.
//!
//! Helpers for building test slides in memory and on disk.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use wsi_deepzoom::slide::{Properties, PyramidSlide};

/// Colors of the four quadrants of [`quadrants`].
pub const TOP_LEFT: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const TOP_RIGHT: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const BOTTOM_LEFT: Rgba<u8> = Rgba([0, 0, 255, 255]);
pub const BOTTOM_RIGHT: Rgba<u8> = Rgba([255, 255, 0, 255]);

/// An image split into four solid quadrants.
pub fn quadrants(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        match (x < width / 2, y < height / 2) {
            (true, true) => TOP_LEFT,
            (false, true) => TOP_RIGHT,
            (true, false) => BOTTOM_LEFT,
            (false, false) => BOTTOM_RIGHT,
        }
    })
}

/// The classic 300x250 test image.
pub fn boxes() -> RgbaImage {
    quadrants(300, 250)
}

/// A multi-level slide built from [`quadrants`].
pub fn pyramid(width: u32, height: u32, levels: usize, properties: Properties) -> PyramidSlide {
    PyramidSlide::build(quadrants(width, height), levels, properties)
        .expect("failed to build test pyramid")
}

/// Write `image` as a PNG in `dir` and return its path.
pub fn write_png(dir: &Path, name: &str, image: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("failed to write test image");
    path
}
