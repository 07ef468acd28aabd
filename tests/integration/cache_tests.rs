//! Slide cache integration tests.
//!
//! Tests verify:
//! - Slides are opened from disk once and shared
//! - LRU eviction and invalidation
//! - Open failures are reported and not cached
//! - Cached slides render tiles with the cache's options and color mode

use std::sync::Arc;

use image::Rgba;

use wsi_deepzoom::{
    ColorMode, DeepZoomOptions, ImageFileOpener, SlideCache, SlideError,
};

use super::test_utils::{boxes, quadrants, write_png};

fn options(tile_size: u32, overlap: u32) -> DeepZoomOptions {
    DeepZoomOptions {
        tile_size,
        overlap,
        limit_bounds: false,
    }
}

#[test]
fn test_open_from_disk_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "boxes.png", &boxes());

    let cache = SlideCache::new(4, DeepZoomOptions::default(), ColorMode::default());
    let first = cache.get(&path).unwrap();
    let second = cache.get(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(first.path(), path.as_path());
    assert_eq!(first.mpp(), None);
    assert_eq!(first.generator().level_count(), 10);
}

#[test]
fn test_root_directory_and_eviction() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png", "c.png"] {
        write_png(dir.path(), name, &quadrants(64, 48));
    }

    let cache = SlideCache::with_opener(
        ImageFileOpener::with_root(dir.path()),
        2,
        options(254, 1),
        ColorMode::Ignore,
    );
    let a = cache.get("a.png").unwrap();
    cache.get("b.png").unwrap();
    cache.get("c.png").unwrap();

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains("a.png"));
    assert!(cache.contains("b.png"));
    assert!(cache.contains("c.png"));

    // A reopened slide is a new entry; the evicted one still works
    let reopened = cache.get("a.png").unwrap();
    assert!(!Arc::ptr_eq(&a, &reopened));
    assert!(a.get_tile(0, (0, 0), None).is_ok());

    cache.invalidate("b.png");
    assert!(!cache.contains("b.png"));
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_open_failures() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("notes.png");
    std::fs::write(&bogus, b"not an image").unwrap();

    let cache = SlideCache::new(2, DeepZoomOptions::default(), ColorMode::default());
    assert!(matches!(
        cache.get(dir.path().join("missing.png")),
        Err(SlideError::Io(_))
    ));
    assert!(matches!(cache.get(&bogus), Err(SlideError::Decode(_))));
    assert!(cache.is_empty());
}

#[test]
fn test_cached_tiles_use_cache_options() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "boxes.png", &boxes());

    let cache = SlideCache::new(1, options(126, 2), ColorMode::Embed);
    let slide = cache.get(&path).unwrap();
    let dz = slide.generator();
    assert_eq!(dz.tile_size(), 126);
    assert_eq!(dz.overlap(), 2);

    let top = dz.level_count() - 1;
    assert_eq!(dz.level_tiles()[top], (3, 2));

    // Interior column: 126 + 2 * 2
    let tile = slide.get_tile(top, (1, 0), None).unwrap();
    assert_eq!(tile.dimensions(), (130, 128));
    assert!(tile.icc_profile.is_none());
    assert_eq!(slide.color_mode(), ColorMode::Embed);
}

#[test]
fn test_transparent_png_on_white() {
    let dir = tempfile::tempdir().unwrap();
    let mut image = quadrants(32, 32);
    image.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
    let path = write_png(dir.path(), "alpha.png", &image);

    let cache = SlideCache::new(1, DeepZoomOptions::default(), ColorMode::Ignore);
    let slide = cache.get(&path).unwrap();
    let top = slide.generator().level_count() - 1;
    let tile = slide.get_tile(top, (0, 0), None).unwrap();
    assert_eq!(tile.image.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(tile.image.get_pixel(1, 1).0, [255, 0, 0]);
}
