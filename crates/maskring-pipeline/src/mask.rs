//! Binary mask input.
//!
//! A [`Mask`] is the only raster the pipeline consumes: a grid of
//! foreground/background pixels for one instance. It is stored as a
//! `GrayImage` holding only 0 (background) and 255 (foreground), which is
//! the form `imageproc`'s border follower expects.

use image::{GrayImage, Luma};

use crate::types::Dimensions;

/// Pixel value used for foreground.
pub const FOREGROUND: u8 = 255;

/// Pixel value used for background.
pub const BACKGROUND: u8 = 0;

/// An immutable binary raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    pixels: GrayImage,
}

impl Mask {
    /// An all-background mask.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
        }
    }

    /// Build a mask by evaluating `is_foreground` at every pixel.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut is_foreground: impl FnMut(u32, u32) -> bool) -> Self {
        let pixels = GrayImage::from_fn(width, height, |x, y| {
            if is_foreground(x, y) {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        });
        Self { pixels }
    }

    /// Threshold a grayscale image: pixels strictly brighter than
    /// `threshold` become foreground.
    #[must_use]
    pub fn from_gray(image: &GrayImage, threshold: u8) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y).0[0] > threshold
        })
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Width and height in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// Whether the pixel at `(x, y)` is foreground. Out-of-bounds
    /// coordinates are background.
    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.pixels
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] == FOREGROUND)
    }

    /// Number of foreground pixels.
    #[must_use]
    pub fn foreground_count(&self) -> u64 {
        self.pixels
            .pixels()
            .map(|p| u64::from(p.0[0] == FOREGROUND))
            .sum()
    }

    /// Returns `true` if the mask has no foreground pixels.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p.0[0] != FOREGROUND)
    }

    /// The underlying 0/255 raster.
    #[must_use]
    pub const fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }
}
