//! Slide cache for keeping opened slides and their Deep Zoom engines.
//!
//! Opening a slide and computing its pyramid is far more expensive than
//! rendering a tile, so a tile server keeps recently used slides open:
//!
//! - LRU eviction with an explicit capacity
//! - Opening happens outside the lock, so a slow open never blocks hits
//! - Every entry is built with the same [`DeepZoomOptions`] and [`ColorMode`]
//!
//! # Example
//!
//! ```no_run
//! use wsi_deepzoom::config::DeepZoomOptions;
//! use wsi_deepzoom::deepzoom::ColorMode;
//! use wsi_deepzoom::slide::SlideCache;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = SlideCache::new(10, DeepZoomOptions::default(), ColorMode::default());
//! let slide = cache.get("slides/boxes.png")?;
//! let tile = slide.get_tile(slide.generator().level_count() - 1, (0, 0), None)?;
//! # let _ = tile;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::debug;

use crate::config::DeepZoomOptions;
use crate::deepzoom::{apply_color_mode, ColorMode, DeepZoomGenerator, ProfileTransform, Tile};
use crate::error::{DeepZoomError, SlideError};

use super::image::ImageSlide;
use super::source::SlideSource;

// =============================================================================
// SlideOpener Trait
// =============================================================================

/// Opens slides by path for a [`SlideCache`].
///
/// This lets the cache work with any kind of slide source without knowing
/// how it is decoded.
pub trait SlideOpener: Send + Sync {
    type Slide: SlideSource + 'static;

    fn open(&self, path: &Path) -> Result<Self::Slide, SlideError>;
}

/// Opens plain raster files as [`ImageSlide`]s, optionally below a root
/// directory.
#[derive(Debug, Clone, Default)]
pub struct ImageFileOpener {
    root: Option<PathBuf>,
}

impl ImageFileOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }
}

impl SlideOpener for ImageFileOpener {
    type Slide = ImageSlide;

    fn open(&self, path: &Path) -> Result<ImageSlide, SlideError> {
        match &self.root {
            Some(root) => ImageSlide::open(root.join(path)),
            None => ImageSlide::open(path),
        }
    }
}

// =============================================================================
// CachedSlide
// =============================================================================

/// A slide that has been opened and cached together with its engine.
pub struct CachedSlide<S> {
    path: PathBuf,
    generator: DeepZoomGenerator<S>,

    /// Mean microns per pixel, when the slide declares it
    mpp: Option<f64>,

    color_mode: ColorMode,
}

impl<S: SlideSource> CachedSlide<S> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn generator(&self) -> &DeepZoomGenerator<S> {
        &self.generator
    }

    pub fn mpp(&self) -> Option<f64> {
        self.mpp
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Render a tile and apply this slide's color mode.
    pub fn get_tile(
        &self,
        level: usize,
        address: (u32, u32),
        transform: Option<&dyn ProfileTransform>,
    ) -> Result<Tile, DeepZoomError> {
        let tile = self.generator.get_tile(level, address)?;
        apply_color_mode(tile, self.color_mode, transform)
    }

    /// Build an engine for one of the slide's associated images.
    ///
    /// The associated image inherits the slide's ICC profile and the
    /// cache's tiling options.
    pub fn associated_generator(
        &self,
        name: &str,
    ) -> Result<DeepZoomGenerator<ImageSlide>, SlideError> {
        let source = self.generator.source();
        let mut image = ImageSlide::new(source.read_associated_image(name)?);
        if let Some(profile) = source.icc_profile()? {
            image = image.with_icc_profile(profile);
        }
        DeepZoomGenerator::new(
            image,
            self.generator.tile_size(),
            self.generator.overlap(),
            false,
        )
    }
}

impl<S> fmt::Debug for CachedSlide<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSlide")
            .field("path", &self.path)
            .field("mpp", &self.mpp)
            .field("color_mode", &self.color_mode)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SlideCache
// =============================================================================

/// LRU cache of opened slides.
pub struct SlideCache<O: SlideOpener = ImageFileOpener> {
    opener: O,
    options: DeepZoomOptions,
    color_mode: ColorMode,
    cache: Mutex<LruCache<PathBuf, Arc<CachedSlide<O::Slide>>>>,
}

impl SlideCache<ImageFileOpener> {
    /// Create a cache that opens raster files from the filesystem.
    ///
    /// A capacity of 0 is treated as 1; configuration validation rejects it
    /// before it gets here.
    pub fn new(capacity: usize, options: DeepZoomOptions, color_mode: ColorMode) -> Self {
        Self::with_opener(ImageFileOpener::new(), capacity, options, color_mode)
    }
}

impl<O: SlideOpener> SlideCache<O> {
    pub fn with_opener(
        opener: O,
        capacity: usize,
        options: DeepZoomOptions,
        color_mode: ColorMode,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            opener,
            options,
            color_mode,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn options(&self) -> DeepZoomOptions {
        self.options
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Get a slide, opening it if not already cached.
    ///
    /// Concurrent misses for the same path may each open the slide; the
    /// first one inserted wins and the others are dropped.
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<CachedSlide<O::Slide>>, SlideError> {
        let path = path.as_ref();

        // Fast path: check cache
        if let Some(slide) = self.lock().get(path) {
            return Ok(Arc::clone(slide));
        }

        let opened = Arc::new(self.open(path)?);

        let mut cache = self.lock();
        if let Some(existing) = cache.get(path) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = cache.push(path.to_path_buf(), Arc::clone(&opened)) {
            debug!(path = %evicted.display(), "evicted slide from cache");
        }
        Ok(opened)
    }

    fn open(&self, path: &Path) -> Result<CachedSlide<O::Slide>, SlideError> {
        let slide = self.opener.open(path)?;
        let mpp = slide.properties()?.mpp();
        let generator = DeepZoomGenerator::new(
            slide,
            self.options.tile_size,
            self.options.overlap,
            self.options.limit_bounds,
        )?;

        debug!(
            path = %path.display(),
            levels = generator.level_count(),
            mpp,
            "opened slide"
        );

        Ok(CachedSlide {
            path: path.to_path_buf(),
            generator,
            mpp,
            color_mode: self.color_mode,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<PathBuf, Arc<CachedSlide<O::Slide>>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a slide from the cache.
    ///
    /// Callers holding the slide keep using it until they drop it.
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        self.lock().pop(path.as_ref());
    }

    /// Clear all cached slides.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of cached slides.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().contains(path.as_ref())
    }
}

// =============================================================================
// Tests
// =============================================================================
