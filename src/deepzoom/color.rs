//! ICC profile handling for rendered tiles.
//!
//! Slides can carry an ICC profile. Depending on the viewer a tile server
//! either drops it, embeds it in every tile, or converts tiles to sRGB with
//! one of the four ICC rendering intents. The conversion itself is done by
//! a [`ProfileTransform`] implementation supplied by the caller.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbImage;
use serde::Serialize;

use crate::error::DeepZoomError;

use super::generator::Tile;

/// ICC rendering intent for profile conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderingIntent {
    Perceptual,
    RelativeColorimetric,
    Saturation,
    AbsoluteColorimetric,
}

impl RenderingIntent {
    pub fn name(self) -> &'static str {
        match self {
            RenderingIntent::Perceptual => "perceptual",
            RenderingIntent::RelativeColorimetric => "relative-colorimetric",
            RenderingIntent::Saturation => "saturation",
            RenderingIntent::AbsoluteColorimetric => "absolute-colorimetric",
        }
    }
}

/// What to do with a slide's ICC profile when producing tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Serve raw pixels without a profile
    Ignore,

    /// Serve raw pixels with the source profile attached
    Embed,

    /// Convert pixels to the output profile with the given intent
    Transform(RenderingIntent),
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Transform(RenderingIntent::AbsoluteColorimetric)
    }
}

impl ColorMode {
    /// Every accepted spelling, for help text.
    pub const NAMES: [&'static str; 6] = [
        "ignore",
        "embed",
        "perceptual",
        "relative-colorimetric",
        "saturation",
        "absolute-colorimetric",
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColorMode::Ignore => "ignore",
            ColorMode::Embed => "embed",
            ColorMode::Transform(intent) => intent.name(),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(ColorMode::Ignore),
            "embed" => Ok(ColorMode::Embed),
            "perceptual" => Ok(ColorMode::Transform(RenderingIntent::Perceptual)),
            "relative-colorimetric" => {
                Ok(ColorMode::Transform(RenderingIntent::RelativeColorimetric))
            }
            "saturation" => Ok(ColorMode::Transform(RenderingIntent::Saturation)),
            "absolute-colorimetric" => {
                Ok(ColorMode::Transform(RenderingIntent::AbsoluteColorimetric))
            }
            other => Err(format!(
                "unknown color mode '{other}' (expected one of: {})",
                ColorMode::NAMES.join(", ")
            )),
        }
    }
}

impl Serialize for ColorMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Converts pixels from a source ICC profile to a fixed output profile.
pub trait ProfileTransform: Send + Sync {
    /// Convert `image` in place from `source_profile` with `intent`.
    fn transform(
        &self,
        image: &mut RgbImage,
        source_profile: &[u8],
        intent: RenderingIntent,
    ) -> Result<(), String>;

    /// Profile describing the converted pixels.
    fn output_profile(&self) -> Arc<[u8]>;
}

/// Apply `mode` to a rendered tile.
///
/// Tiles without a source profile are returned untouched in every mode.
/// In transform mode without a transformer the source profile is kept, so
/// the tile is still rendered correctly by profile-aware viewers.
pub fn apply_color_mode(
    tile: Tile,
    mode: ColorMode,
    transform: Option<&dyn ProfileTransform>,
) -> Result<Tile, DeepZoomError> {
    let Some(profile) = tile.icc_profile.clone() else {
        return Ok(tile);
    };

    match (mode, transform) {
        (ColorMode::Ignore, _) => Ok(Tile {
            icc_profile: None,
            ..tile
        }),
        (ColorMode::Embed, _) | (ColorMode::Transform(_), None) => Ok(tile),
        (ColorMode::Transform(intent), Some(transform)) => {
            let mut image = tile.image;
            transform
                .transform(&mut image, &profile, intent)
                .map_err(DeepZoomError::ColorTransform)?;
            Ok(Tile {
                image,
                icc_profile: Some(transform.output_profile()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::Mutex;

    /// Inverts pixels and records the intent it was called with.
    struct Invert {
        seen: Mutex<Vec<RenderingIntent>>,
    }

    impl ProfileTransform for Invert {
        fn transform(
            &self,
            image: &mut RgbImage,
            source_profile: &[u8],
            intent: RenderingIntent,
        ) -> Result<(), String> {
            if source_profile.is_empty() {
                return Err("empty profile".to_string());
            }
            self.seen.lock().unwrap().push(intent);
            for pixel in image.pixels_mut() {
                pixel.0 = pixel.0.map(|c| 255 - c);
            }
            Ok(())
        }

        fn output_profile(&self) -> Arc<[u8]> {
            Arc::from(&b"srgb"[..])
        }
    }

    fn invert() -> Invert {
        Invert {
            seen: Mutex::new(Vec::new()),
        }
    }

    fn tile(profile: Option<&[u8]>) -> Tile {
        Tile {
            image: RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])),
            icc_profile: profile.map(Arc::from),
        }
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("ignore".parse::<ColorMode>().unwrap(), ColorMode::Ignore);
        assert_eq!("embed".parse::<ColorMode>().unwrap(), ColorMode::Embed);
        for name in ColorMode::NAMES {
            assert_eq!(name.parse::<ColorMode>().unwrap().to_string(), name);
        }
        assert!("vivid".parse::<ColorMode>().is_err());
        assert_eq!(
            ColorMode::default(),
            ColorMode::Transform(RenderingIntent::AbsoluteColorimetric)
        );
    }

    #[test]
    fn test_no_profile_is_untouched() {
        let t = invert();
        for name in ColorMode::NAMES {
            let mode: ColorMode = name.parse().unwrap();
            let out = apply_color_mode(tile(None), mode, Some(&t)).unwrap();
            assert!(out.icc_profile.is_none());
            assert_eq!(out.image.get_pixel(0, 0), &Rgb([10, 20, 30]));
        }
        assert!(t.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_ignore_drops_profile() {
        let out = apply_color_mode(tile(Some(b"icc")), ColorMode::Ignore, None).unwrap();
        assert!(out.icc_profile.is_none());
        assert_eq!(out.image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_embed_keeps_profile() {
        let t = invert();
        let out = apply_color_mode(tile(Some(b"icc")), ColorMode::Embed, Some(&t)).unwrap();
        assert_eq!(out.icc_profile.as_deref(), Some(&b"icc"[..]));
        assert_eq!(out.image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_transform_converts_and_retags() {
        let t = invert();
        let mode = ColorMode::Transform(RenderingIntent::Perceptual);
        let out = apply_color_mode(tile(Some(b"icc")), mode, Some(&t)).unwrap();
        assert_eq!(out.icc_profile.as_deref(), Some(&b"srgb"[..]));
        assert_eq!(out.image.get_pixel(0, 0), &Rgb([245, 235, 225]));
        assert_eq!(*t.seen.lock().unwrap(), vec![RenderingIntent::Perceptual]);
    }

    #[test]
    fn test_transform_without_transformer_embeds() {
        let out = apply_color_mode(tile(Some(b"icc")), ColorMode::default(), None).unwrap();
        assert_eq!(out.icc_profile.as_deref(), Some(&b"icc"[..]));
    }

    #[test]
    fn test_transform_failure() {
        let t = invert();
        let err = apply_color_mode(tile(Some(b"")), ColorMode::default(), Some(&t)).unwrap_err();
        assert!(matches!(err, DeepZoomError::ColorTransform(_)));
        assert!(!err.is_invalid_argument());
    }
}
