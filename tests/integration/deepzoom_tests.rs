//! Deep Zoom engine integration tests.
//!
//! Tests verify:
//! - Pyramid geometry for the 300x250 reference image read from disk
//! - Tile pixels come from the right place in the slide
//! - Multi-level slides read from the best native level
//! - Bounds limiting crops and offsets the pyramid
//! - Errors from the slide pass through unchanged

use image::Rgb;

use wsi_deepzoom::slide::{
    ImageSlide, Properties, SlideSource, PROPERTY_NAME_BOUNDS_HEIGHT, PROPERTY_NAME_BOUNDS_WIDTH,
    PROPERTY_NAME_BOUNDS_X, PROPERTY_NAME_BOUNDS_Y,
};
use wsi_deepzoom::{DeepZoomError, DeepZoomGenerator, RegionRequest, SlideError};

use super::test_utils::{
    boxes, pyramid, quadrants, write_png, BOTTOM_RIGHT, TOP_LEFT, TOP_RIGHT,
};

fn rgb(pixel: image::Rgba<u8>) -> Rgb<u8> {
    Rgb([pixel[0], pixel[1], pixel[2]])
}

fn assert_close(actual: &Rgb<u8>, expected: Rgb<u8>) {
    for c in 0..3 {
        let diff = (i16::from(actual[c]) - i16::from(expected[c])).abs();
        assert!(diff <= 2, "{actual:?} != {expected:?}");
    }
}

// =============================================================================
// Reference Image
// =============================================================================

#[test]
fn test_boxes_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "boxes.png", &boxes());
    let dz = DeepZoomGenerator::new(ImageSlide::open(&path).unwrap(), 254, 1, false).unwrap();

    assert_eq!(dz.level_count(), 10);
    assert_eq!(dz.tile_count(), 11);
    assert_eq!(dz.level_tiles()[9], (2, 1));
    assert_eq!(dz.level_dimensions()[9], (300, 250));
    assert_eq!(dz.level_dimensions()[0], (1, 1));

    let tile = dz.get_tile(9, (1, 0)).unwrap();
    assert_eq!(tile.dimensions(), (47, 250));
    assert_eq!(
        dz.get_tile_coordinates(9, (1, 0)).unwrap(),
        RegionRequest {
            location: (253, 0),
            level: 0,
            size: (47, 250),
        }
    );
}

#[test]
fn test_tile_pixels_match_source() {
    let dz = DeepZoomGenerator::new(ImageSlide::new(boxes()), 254, 1, false).unwrap();

    let first = dz.get_tile(9, (0, 0)).unwrap();
    assert_eq!(first.dimensions(), (255, 250));
    assert_eq!(first.image.get_pixel(10, 10), &rgb(TOP_LEFT));
    assert_eq!(first.image.get_pixel(200, 200), &rgb(BOTTOM_RIGHT));

    // Second tile starts one overlap pixel left of x=254
    let second = dz.get_tile(9, (1, 0)).unwrap();
    assert_eq!(second.image.get_pixel(0, 0), &rgb(TOP_RIGHT));
}

#[test]
fn test_downscaled_level() {
    let dz = DeepZoomGenerator::new(ImageSlide::new(boxes()), 254, 1, false).unwrap();

    let info = dz.get_tile_info(8, (0, 0)).unwrap();
    assert_eq!(info.level, 0);
    assert_eq!(info.size, (300, 250));
    assert_eq!(info.output_size, (150, 125));

    let tile = dz.get_tile(8, (0, 0)).unwrap();
    assert_eq!(tile.dimensions(), (150, 125));
    assert_close(tile.image.get_pixel(10, 10), rgb(TOP_LEFT));
    assert_close(tile.image.get_pixel(140, 115), rgb(BOTTOM_RIGHT));
}

#[test]
fn test_rendered_sizes_match_geometry() {
    let dz = DeepZoomGenerator::new(ImageSlide::new(quadrants(512, 512)), 64, 1, false).unwrap();
    assert_eq!(dz.level_count(), 10);

    for (level, address) in dz.tile_addresses() {
        let expected = dz.get_tile_dimensions(level, address).unwrap();
        let tile = dz.get_tile(level, address).unwrap();
        assert_eq!(tile.dimensions(), expected, "level {level} tile {address:?}");
    }
}

// =============================================================================
// Multi-level Slides
// =============================================================================

#[test]
fn test_reads_native_levels() {
    let slide = pyramid(1024, 768, 3, Properties::new());
    assert_eq!(slide.level_downsamples().unwrap(), vec![1.0, 2.0, 4.0]);

    let dz = DeepZoomGenerator::new(&slide, 254, 1, false).unwrap();
    let top = dz.level_count() - 1;
    assert_eq!(dz.level_dimensions()[top], (1024, 768));

    for (offset, expected_level) in [(0, 0), (1, 1), (2, 2), (3, 2)] {
        let info = dz.get_tile_info(top - offset, (0, 0)).unwrap();
        assert_eq!(info.level, expected_level, "deep zoom level {}", top - offset);
    }

    // Half resolution is served 1:1 from level 1
    let info = dz.get_tile_info(top - 1, (1, 1)).unwrap();
    assert_eq!(info.location, (506, 506));
    assert_eq!(info.size, info.output_size);

    let tile = dz.get_tile(top - 1, (0, 0)).unwrap();
    assert_eq!(tile.dimensions(), (255, 255));
    assert_close(tile.image.get_pixel(20, 20), rgb(TOP_LEFT));
}

#[test]
fn test_limit_bounds() {
    let props: Properties = [
        (PROPERTY_NAME_BOUNDS_X, "600"),
        (PROPERTY_NAME_BOUNDS_Y, "500"),
        (PROPERTY_NAME_BOUNDS_WIDTH, "300"),
        (PROPERTY_NAME_BOUNDS_HEIGHT, "200"),
    ]
    .into_iter()
    .collect();
    let slide = pyramid(1000, 800, 2, props);

    let unbounded = DeepZoomGenerator::new(&slide, 254, 1, false).unwrap();
    assert_eq!(unbounded.level_dimensions().last(), Some(&(1000, 800)));

    let dz = DeepZoomGenerator::new(&slide, 254, 1, true).unwrap();
    let top = dz.level_count() - 1;
    assert_eq!(dz.level_dimensions()[top], (300, 200));
    assert_eq!(dz.level_tiles()[top], (2, 1));
    assert_eq!(dz.get_tile_coordinates(top, (0, 0)).unwrap().location, (600, 500));

    // The whole bounded area lies in the bottom-right quadrant
    let tile = dz.get_tile(top, (0, 0)).unwrap();
    assert_eq!(tile.dimensions(), (255, 200));
    assert!(tile.image.pixels().all(|p| *p == rgb(BOTTOM_RIGHT)));
    assert!(dz.get_dzi("jpeg").contains(r#"Width="300" Height="200""#));
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_closed_slide_errors_pass_through() {
    let slide = pyramid(300, 250, 1, Properties::new());
    let dz = DeepZoomGenerator::new(&slide, 254, 1, false).unwrap();

    slide.close().unwrap();

    // Geometry is precomputed and still answers
    assert_eq!(dz.get_tile_dimensions(9, (1, 0)).unwrap(), (47, 250));

    let err = dz.get_tile(9, (1, 0)).unwrap_err();
    assert!(!err.is_invalid_argument());
    assert!(matches!(err, DeepZoomError::Slide(SlideError::Closed)));
}

#[test]
fn test_invalid_requests_are_rejected_before_reading() {
    let slide = pyramid(300, 250, 1, Properties::new());
    let dz = DeepZoomGenerator::new(&slide, 254, 1, false).unwrap();
    slide.close().unwrap();

    // Bad addresses report themselves, not the closed handle
    assert!(dz.get_tile(10, (0, 0)).unwrap_err().is_invalid_argument());
    assert!(dz.get_tile(9, (2, 0)).unwrap_err().is_invalid_argument());
    assert!(dz.checked_address(-1, 0, 0).unwrap_err().is_invalid_argument());
}
