//! Mask preprocessing: decode, threshold, optional upscale and blur.
//!
//! Tracing a mask at a higher resolution and smoothing it before the
//! final threshold rounds off pixel staircases. The upscale factor that
//! was actually applied per axis is handed to the pipeline as its working
//! scale, so output coordinates land back in native pixels.

use image::GrayImage;
use image::imageops::FilterType;
use maskring_pipeline::{Dimensions, Mask};

use crate::error::CliError;

/// Default foreground cut: pixels brighter than this are foreground.
pub const DEFAULT_THRESHOLD: u8 = 127;

/// Default upscale factor applied before tracing.
pub const DEFAULT_UPSCALE: f64 = 2.0;

/// Default Gaussian sigma for smoothing the upscaled mask: the sigma
/// OpenCV derives for a 3x3 Gaussian kernel.
pub const DEFAULT_BLUR_SIGMA: f32 = 0.8;

/// Largest accepted upscale factor.
pub const MAX_UPSCALE: f64 = 16.0;

/// Largest working raster, in pixels, a single mask may be resized to.
pub const MAX_WORKING_PIXELS: u64 = 1 << 28;

/// Preprocessing parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrepareOptions {
    /// Foreground cut applied before and after smoothing.
    pub threshold: u8,
    /// Resolution multiplier; 1.0 disables resizing.
    pub upscale: f64,
    /// Gaussian sigma; 0.0 disables smoothing.
    pub blur_sigma: f32,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            upscale: DEFAULT_UPSCALE,
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }
}

impl PrepareOptions {
    /// Reject values that cannot produce a usable mask.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidOption`] if `upscale` is not a finite
    /// number in `1.0..=MAX_UPSCALE` or `blur_sigma` is negative or not
    /// finite.
    pub fn validate(&self) -> Result<(), CliError> {
        if !self.upscale.is_finite() || !(1.0..=MAX_UPSCALE).contains(&self.upscale) {
            return Err(CliError::InvalidOption(format!(
                "upscale must be between 1 and {MAX_UPSCALE}, got {}",
                self.upscale
            )));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma < 0.0 {
            return Err(CliError::InvalidOption(format!(
                "blur sigma must be finite and non-negative, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }
}

/// A mask ready for tracing, plus what is needed to map its coordinates
/// back to the source image.
#[derive(Debug, Clone)]
pub struct PreparedMask {
    /// Binary mask at working resolution.
    pub mask: Mask,
    /// Size of the source image.
    pub native: Dimensions,
    /// Working width divided by native width.
    pub scale_x: f64,
    /// Working height divided by native height.
    pub scale_y: f64,
}

/// Decode image bytes (PNG, JPEG, BMP, WebP) to 8-bit grayscale.
///
/// # Errors
///
/// Returns [`CliError::ImageDecode`] if the bytes are not a supported
/// image.
pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, CliError> {
    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Threshold, upscale, smooth and re-threshold a grayscale mask image.
///
/// # Errors
///
/// Returns [`CliError::InvalidOption`] if the upscaled raster would
/// exceed [`MAX_WORKING_PIXELS`].
pub fn prepare(gray: &GrayImage, options: &PrepareOptions) -> Result<PreparedMask, CliError> {
    let native = Dimensions {
        width: gray.width(),
        height: gray.height(),
    };
    let (width, height) = working_size(native, options.upscale);
    if u64::from(width) * u64::from(height) > MAX_WORKING_PIXELS {
        return Err(CliError::InvalidOption(format!(
            "upscaled mask would be {width}x{height} pixels, more than {MAX_WORKING_PIXELS}"
        )));
    }

    let binary = Mask::from_gray(gray, options.threshold);
    let resized = if (width, height) == (native.width, native.height) {
        binary.as_gray().clone()
    } else {
        image::imageops::resize(binary.as_gray(), width, height, FilterType::CatmullRom)
    };

    let smoothed = if options.blur_sigma > 0.0 {
        imageproc::filter::gaussian_blur_f32(&resized, options.blur_sigma)
    } else {
        resized
    };

    let mask = Mask::from_gray(&smoothed, options.threshold);
    tracing::trace!(
        native_width = native.width,
        native_height = native.height,
        width,
        height,
        "mask prepared"
    );

    Ok(PreparedMask {
        mask,
        native,
        scale_x: axis_scale(width, native.width),
        scale_y: axis_scale(height, native.height),
    })
}

/// Working resolution for `upscale`, at least one pixel per non-empty
/// axis.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn working_size(native: Dimensions, upscale: f64) -> (u32, u32) {
    let scale = |n: u32| {
        if n == 0 {
            0
        } else {
            (f64::from(n) * upscale).round().clamp(1.0, f64::from(u32::MAX)) as u32
        }
    };
    (scale(native.width), scale(native.height))
}

/// Ratio of working to native size; 1.0 for an empty axis.
fn axis_scale(working: u32, native: u32) -> f64 {
    if native == 0 {
        1.0
    } else {
        f64::from(working) / f64::from(native)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Luma;

    fn gray_square(size: u32, lo: u32, hi: u32, value: u8) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                Luma([value])
            } else {
                Luma([0])
            }
        })
    }

    fn encode_png(img: &GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::L8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn default_options_are_valid() {
        assert!(PrepareOptions::default().validate().is_ok());
    }

    #[test]
    fn downscale_is_rejected() {
        let options = PrepareOptions {
            upscale: 0.5,
            ..PrepareOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(CliError::InvalidOption(_))
        ));
    }

    #[test]
    fn negative_sigma_is_rejected() {
        let options = PrepareOptions {
            blur_sigma: -1.0,
            ..PrepareOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn decode_round_trips_png() {
        let img = gray_square(8, 2, 6, 200);
        let decoded = decode_gray(&encode_png(&img)).unwrap();
        assert_eq!(decoded, img);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = decode_gray(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(CliError::ImageDecode(_))));
    }

    #[test]
    fn no_upscale_no_blur_is_plain_threshold() {
        let img = gray_square(10, 3, 7, 128);
        let options = PrepareOptions {
            upscale: 1.0,
            blur_sigma: 0.0,
            ..PrepareOptions::default()
        };
        let prepared = prepare(&img, &options).unwrap();
        assert_eq!(prepared.mask, Mask::from_gray(&img, 127));
        assert!((prepared.scale_x - 1.0).abs() < f64::EPSILON);
        assert!((prepared.scale_y - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pixels_at_threshold_are_background() {
        let img = gray_square(10, 3, 7, 127);
        let options = PrepareOptions {
            upscale: 1.0,
            blur_sigma: 0.0,
            ..PrepareOptions::default()
        };
        assert!(prepare(&img, &options).unwrap().mask.is_blank());
    }

    #[test]
    fn upscale_doubles_working_resolution() {
        let img = gray_square(20, 5, 15, 255);
        let prepared = prepare(&img, &PrepareOptions::default()).unwrap();
        assert_eq!(prepared.mask.width(), 40);
        assert_eq!(prepared.mask.height(), 40);
        assert_eq!(
            prepared.native,
            Dimensions {
                width: 20,
                height: 20
            }
        );
        assert!((prepared.scale_x - 2.0).abs() < f64::EPSILON);
        // Interior of the square survives smoothing; far corners stay empty.
        assert!(prepared.mask.is_foreground(20, 20));
        assert!(!prepared.mask.is_foreground(1, 1));
    }

    #[test]
    fn scale_reflects_rounded_size() {
        let img = GrayImage::new(3, 5);
        let options = PrepareOptions {
            upscale: 1.5,
            blur_sigma: 0.0,
            ..PrepareOptions::default()
        };
        let prepared = prepare(&img, &options).unwrap();
        // 4.5 rounds to 5 and 7.5 to 8.
        assert_eq!(prepared.mask.width(), 5);
        assert_eq!(prepared.mask.height(), 8);
        assert!((prepared.scale_x - 5.0 / 3.0).abs() < 1e-12);
        assert!((prepared.scale_y - 8.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn huge_upscale_is_rejected() {
        let options = PrepareOptions {
            upscale: 1e9,
            ..PrepareOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(CliError::InvalidOption(_))
        ));
    }

    #[test]
    fn oversized_working_raster_is_rejected() {
        // Within the factor cap but past the pixel budget.
        let img = GrayImage::new(2048, 2048);
        let options = PrepareOptions {
            upscale: MAX_UPSCALE,
            blur_sigma: 0.0,
            ..PrepareOptions::default()
        };
        assert!(options.validate().is_ok());
        assert!(matches!(
            prepare(&img, &options),
            Err(CliError::InvalidOption(_))
        ));
    }
}
