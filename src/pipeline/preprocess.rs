//! Scan-quality preprocessing: enhancement, size capping, vertical splitting.
//!
//! Scanned statements arrive in wildly varying quality — phone photos of
//! printouts, faxed copies, washed-out thermal paper. The vision model's
//! extraction accuracy tracks scan legibility closely, so every page goes
//! through a deterministic enhancement pass before submission:
//!
//! 1. convert to RGB;
//! 2. measure luminance mean and standard deviation;
//! 3. boost contrast when the scan is dark or washed-out (mean < 200 or
//!    std-dev < 60), with a factor that grows as both statistics fall,
//!    capped at 2.2×;
//! 4. boost brightness when mean < 180, proportionally to the shortfall;
//! 5. apply a gentle unsharp mask unconditionally — gentler than naive
//!    sharpening, which produces halo artifacts that break OCR;
//! 6. cap the longer dimension at the configured maximum (never upsize).
//!
//! Finally, a page may be split into N overlapping vertical bands. Adjacent
//! bands share 10 % of one band's height so a transaction row falling on a
//! boundary is fully visible in at least one band. The duplicate rows this
//! creates are removed later by the normalizer's dedupe pass.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;

/// Enhancement trigger: scans with mean luminance below this are "dark".
const MEAN_FLOOR: f64 = 200.0;
/// Enhancement trigger: scans with luminance std-dev below this are "washed-out".
const STD_FLOOR: f64 = 60.0;
/// Maximum contrast boost factor.
const CONTRAST_CAP: f64 = 2.2;
/// Brightness boost applies below this mean luminance.
const BRIGHTEN_FLOOR: f64 = 180.0;
/// Brightness boost at mean luminance 0 (scales linearly up to the floor).
const BRIGHTEN_MAX: f64 = 60.0;
/// Unsharp-mask parameters, fixed.
const UNSHARP_SIGMA: f32 = 2.0;
const UNSHARP_THRESHOLD: i32 = 3;
/// Fraction of one band's height shared between adjacent bands.
const BAND_OVERLAP: f64 = 0.10;

/// Mean and standard deviation of the 8-bit luminance channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LuminanceStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Compute luminance statistics over the grayscale view of an image.
pub fn luminance_stats(img: &DynamicImage) -> LuminanceStats {
    let luma = img.to_luma8();
    let n = luma.as_raw().len() as f64;
    if n == 0.0 {
        return LuminanceStats {
            mean: 0.0,
            std_dev: 0.0,
        };
    }
    let sum: f64 = luma.as_raw().iter().map(|&v| v as f64).sum();
    let mean = sum / n;
    let var: f64 = luma
        .as_raw()
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    LuminanceStats {
        mean,
        std_dev: var.sqrt(),
    }
}

/// Decide the enhancement to apply for the given statistics.
///
/// Returns `(contrast_factor, brightness_delta)`. A factor of 1.0 and a
/// delta of 0 mean the pass is a no-op for that dimension.
pub fn enhancement_for(stats: LuminanceStats) -> (f64, i32) {
    let contrast = if stats.mean < MEAN_FLOOR || stats.std_dev < STD_FLOOR {
        let darkness = (MEAN_FLOOR - stats.mean).max(0.0) / MEAN_FLOOR;
        let flatness = (STD_FLOOR - stats.std_dev).max(0.0) / STD_FLOOR;
        (1.0 + darkness + flatness).min(CONTRAST_CAP)
    } else {
        1.0
    };

    let brightness = if stats.mean < BRIGHTEN_FLOOR {
        ((BRIGHTEN_FLOOR - stats.mean) / BRIGHTEN_FLOOR * BRIGHTEN_MAX).round() as i32
    } else {
        0
    };

    (contrast, brightness)
}

/// Apply contrast scaling about the midpoint plus a brightness offset,
/// per channel, in one pass.
fn enhance_pixels(img: &RgbImage, factor: f64, delta: i32) -> RgbImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        for c in pixel.0.iter_mut() {
            let v = (*c as f64 - 128.0) * factor + 128.0 + delta as f64;
            *c = v.clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Preprocess one rasterised page and return its submission fragments.
///
/// With `split_factor == 1` the result is a single enhanced image;
/// otherwise it is `split_factor` overlapping vertical bands.
pub fn preprocess_page(
    page: &DynamicImage,
    split_factor: u32,
    max_px: u32,
) -> Vec<DynamicImage> {
    let rgb = page.to_rgb8();
    let stats = luminance_stats(page);
    let (factor, delta) = enhancement_for(stats);

    let enhanced = if factor != 1.0 || delta != 0 {
        debug!(
            "Enhancing scan: mean={:.1} std={:.1} → contrast {:.2}×, brightness +{}",
            stats.mean, stats.std_dev, factor, delta
        );
        enhance_pixels(&rgb, factor, delta)
    } else {
        rgb
    };

    let sharpened = DynamicImage::ImageRgb8(enhanced).unsharpen(UNSHARP_SIGMA, UNSHARP_THRESHOLD);
    let capped = cap_size(sharpened, max_px);

    if split_factor > 1 {
        split_bands(&capped, split_factor)
    } else {
        vec![capped]
    }
}

/// Downscale proportionally so the longer dimension is at most `max_px`.
/// Images already within bounds pass through untouched — never upsize.
fn cap_size(img: DynamicImage, max_px: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    let longer = w.max(h);
    if longer <= max_px {
        return img;
    }
    let scale = max_px as f64 / longer as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    debug!("Downscaling {}x{} → {}x{}", w, h, nw, nh);
    img.resize(nw, nh, FilterType::Lanczos3)
}

/// Row bounds of band `i` of `n` for an image of height `h`.
///
/// Band i covers `[max(0, i·h/n − 0.1·h/n), min(h, (i+1)·h/n + 0.1·h/n))`,
/// so adjacent bands overlap by 10 % of one band's height on each shared
/// edge.
pub fn band_bounds(h: u32, n: u32, i: u32) -> (u32, u32) {
    let band = h as f64 / n as f64;
    let overlap = band * BAND_OVERLAP;
    let top = ((i as f64) * band - overlap).max(0.0);
    let bottom = (((i + 1) as f64) * band + overlap).min(h as f64);
    (top.floor() as u32, bottom.ceil().min(h as f64) as u32)
}

/// Split an image into `n` overlapping vertical bands, top to bottom.
pub fn split_bands(img: &DynamicImage, n: u32) -> Vec<DynamicImage> {
    let (w, h) = img.dimensions();
    (0..n)
        .map(|i| {
            let (top, bottom) = band_bounds(h, n, i);
            img.crop_imm(0, top, w, bottom - top)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// Build a grayscale-valued RGB image from a row of luminance values,
    /// repeated down the height.
    fn image_of(values: &[u8], height: u32) -> DynamicImage {
        let w = values.len() as u32;
        let img = RgbImage::from_fn(w, height, |x, _| {
            let v = values[x as usize];
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn stats_of_two_level_image() {
        // Half 110, half 190: mean 150, std 40.
        let img = image_of(&[110, 190], 4);
        let stats = luminance_stats(&img);
        assert!((stats.mean - 150.0).abs() < 0.5, "mean {}", stats.mean);
        assert!((stats.std_dev - 40.0).abs() < 0.5, "std {}", stats.std_dev);
    }

    #[test]
    fn dark_flat_scan_gets_both_boosts() {
        let (factor, delta) = enhancement_for(LuminanceStats {
            mean: 150.0,
            std_dev: 40.0,
        });
        assert!(factor > 1.0, "contrast factor {}", factor);
        assert!(factor <= CONTRAST_CAP);
        assert!(delta > 0, "brightness delta {}", delta);
    }

    #[test]
    fn bright_contrasty_scan_is_untouched() {
        let (factor, delta) = enhancement_for(LuminanceStats {
            mean: 220.0,
            std_dev: 80.0,
        });
        assert_eq!(factor, 1.0);
        assert_eq!(delta, 0);
    }

    #[test]
    fn contrast_factor_is_capped() {
        let (factor, _) = enhancement_for(LuminanceStats {
            mean: 10.0,
            std_dev: 5.0,
        });
        assert_eq!(factor, CONTRAST_CAP);
    }

    #[test]
    fn enhancement_spreads_levels() {
        let img = image_of(&[110, 190], 4).to_rgb8();
        let out = enhance_pixels(&img, 1.5, 10);
        // (110-128)*1.5+128+10 = 111, (190-128)*1.5+128+10 = 231
        assert_eq!(out.get_pixel(0, 0), &Rgb([111, 111, 111]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([231, 231, 231]));
    }

    #[test]
    fn enhancement_clamps_to_byte_range() {
        let img = image_of(&[5, 250], 1).to_rgb8();
        let out = enhance_pixels(&img, 2.2, 60);
        assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([255, 255, 255]));
    }

    #[test]
    fn cap_never_upsizes() {
        let img = image_of(&[128; 100], 50);
        let out = cap_size(img.clone(), 2048);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn cap_downscales_proportionally() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            4096,
            2048,
            Luma([128]),
        ));
        let out = cap_size(img, 2048);
        assert_eq!(out.dimensions().0, 2048);
        assert_eq!(out.dimensions().1, 1024);
    }

    #[test]
    fn band_bounds_overlap_by_ten_percent() {
        // h = 3000, n = 3 → band height 1000, overlap 100.
        assert_eq!(band_bounds(3000, 3, 0), (0, 1100));
        assert_eq!(band_bounds(3000, 3, 1), (900, 2100));
        assert_eq!(band_bounds(3000, 3, 2), (1900, 3000));
    }

    #[test]
    fn split_produces_n_bands_of_full_width() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(
            200,
            3000,
            Luma([200]),
        ));
        let bands = split_bands(&img, 3);
        assert_eq!(bands.len(), 3);
        for band in &bands {
            assert_eq!(band.dimensions().0, 200);
        }
        assert_eq!(bands[0].dimensions().1, 1100);
        assert_eq!(bands[1].dimensions().1, 1200);
        assert_eq!(bands[2].dimensions().1, 1100);
    }

    #[test]
    fn no_split_returns_single_fragment() {
        let img = image_of(&[220; 16], 16);
        let fragments = preprocess_page(&img, 1, 2048);
        assert_eq!(fragments.len(), 1);
    }

    #[test]
    fn split_factor_three_returns_three_fragments() {
        let img = image_of(&[220; 16], 300);
        let fragments = preprocess_page(&img, 3, 2048);
        assert_eq!(fragments.len(), 3);
    }
}
