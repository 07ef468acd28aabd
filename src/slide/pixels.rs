//! Pixel helpers shared by slide sources and the Deep Zoom engine.
//!
//! - conversion from native premultiplied ARGB words to straight RGBA
//! - alpha compositing onto an opaque background
//! - aspect-preserving "fit within" sizing and the Lanczos downscale built on it

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

/// Convert one native-endian premultiplied ARGB word to straight RGBA.
///
/// Fully transparent and fully opaque pixels are copied as-is; partially
/// transparent ones are un-premultiplied with truncating division.
pub fn argb_to_rgba(pixel: u32) -> Rgba<u8> {
    let a = (pixel >> 24) as u8;
    let mut r = (pixel >> 16) as u8;
    let mut g = (pixel >> 8) as u8;
    let mut b = pixel as u8;
    if a != 0 && a != 255 {
        let a = u32::from(a);
        r = (u32::from(r) * 255 / a).min(255) as u8;
        g = (u32::from(g) * 255 / a).min(255) as u8;
        b = (u32::from(b) * 255 / a).min(255) as u8;
    }
    Rgba([r, g, b, a])
}

/// Convert one straight RGBA pixel to a premultiplied ARGB word.
pub fn rgba_to_argb(pixel: Rgba<u8>) -> u32 {
    let [r, g, b, a] = pixel.0;
    let premultiply = |c: u8| (u32::from(c) * u32::from(a) + 127) / 255;
    (u32::from(a) << 24) | (premultiply(r) << 16) | (premultiply(g) << 8) | premultiply(b)
}

/// Composite an RGBA image onto an opaque background color.
///
/// Each channel is `src * a + bg * (255 - a)`, rounded, over 255.
pub fn composite_on_background(src: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let (width, height) = src.dimensions();
    let mut out = RgbImage::from_pixel(width, height, background);
    for (x, y, pixel) in src.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let blended = match a {
            255 => Rgb([r, g, b]),
            0 => background,
            a => {
                let a = u32::from(a);
                let mix = |fg: u8, bg: u8| {
                    ((u32::from(fg) * a + u32::from(bg) * (255 - a) + 127) / 255) as u8
                };
                Rgb([
                    mix(r, background[0]),
                    mix(g, background[1]),
                    mix(b, background[2]),
                ])
            }
        };
        out.put_pixel(x, y, blended);
    }
    out
}

/// Largest size with the aspect ratio of `size` that fits within `bounds`.
///
/// Never grows an image: when `size` already fits in both axes it is
/// returned unchanged. Each axis is at least one pixel. Of the floor and
/// ceiling candidates for the constrained axis, the one whose aspect ratio
/// is closest to the source aspect ratio wins.
pub fn fit_within(size: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (width, height) = size;
    let (max_w, max_h) = bounds;
    if max_w >= width && max_h >= height {
        return size;
    }
    if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
        return (max_w.min(width).max(1), max_h.min(height).max(1));
    }

    let aspect = f64::from(width) / f64::from(height);
    let (bx, by) = (f64::from(max_w), f64::from(max_h));

    let closest = |value: f64, error: &dyn Fn(f64) -> f64| -> u32 {
        let floor = value.floor();
        let ceil = value.ceil();
        let pick = if error(ceil) < error(floor) { ceil } else { floor };
        (pick as u32).max(1)
    };

    if bx / by >= aspect {
        let w = closest(by * aspect, &|n| (aspect - n / by).abs());
        (w, max_h)
    } else {
        let h = closest(bx / aspect, &|n| {
            if n == 0.0 {
                0.0
            } else {
                (aspect - bx / n).abs()
            }
        });
        (max_w, h)
    }
}

/// Shrink an image to fit within `bounds` with a Lanczos filter.
///
/// Images that already fit are returned unchanged.
pub fn downscale_to_fit(image: RgbImage, bounds: (u32, u32)) -> RgbImage {
    let target = fit_within(image.dimensions(), bounds);
    if target == image.dimensions() {
        return image;
    }
    imageops::resize(&image, target.0, target.1, FilterType::Lanczos3)
}
