//! Crop-region geometry for reader-uploaded images.
//!
//! Regions are kept in the image's natural pixel space. The UI shows a scaled
//! copy of the image, so pointer coordinates are converted with
//! [`Cropper::select_from_display`]. All arithmetic is integer and every
//! operation leaves the region fully inside the image.

use serde::{Deserialize, Serialize};

/// Smallest crop edge, in natural pixels.
pub const MIN_CROP_EDGE: u32 = 16;

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A locked width:height ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// 1:1, used for avatars.
    pub const SQUARE: Self = Self {
        width: 1,
        height: 1,
    };
    /// 16:9, used for article lead images.
    pub const WIDE: Self = Self {
        width: 16,
        height: 9,
    };

    /// Create a ratio.
    ///
    /// # Errors
    ///
    /// [`CropError::InvalidAspect`] if either side is zero.
    pub const fn new(width: u32, height: u32) -> Result<Self, CropError> {
        if width == 0 || height == 0 {
            return Err(CropError::InvalidAspect);
        }
        Ok(Self { width, height })
    }

    /// Height matching `width` under this ratio, rounded down.
    const fn height_for(self, width: u32) -> u32 {
        mul_div(width, self.height, self.width)
    }

    /// Width matching `height` under this ratio, rounded down.
    const fn width_for(self, height: u32) -> u32 {
        mul_div(height, self.width, self.height)
    }
}

/// A rectangle inside the image, in natural pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl CropRegion {
    /// Right edge (exclusive).
    #[must_use]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[must_use]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Errors from crop setup.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropError {
    /// The image has a zero dimension.
    #[error("image has no pixels")]
    EmptyImage,
    /// The image is smaller than the minimum crop.
    #[error("image must be at least {min}x{min} pixels")]
    ImageTooSmall {
        /// Minimum edge length.
        min: u32,
    },
    /// An aspect ratio side is zero.
    #[error("aspect ratio sides must be positive")]
    InvalidAspect,
    /// The display size used for conversion has a zero dimension.
    #[error("display size has no pixels")]
    EmptyDisplay,
}

/// Crop state for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cropper {
    image: Size,
    aspect: Option<AspectRatio>,
    region: CropRegion,
}

impl Cropper {
    /// Start cropping `image`, optionally locked to `aspect`.
    ///
    /// The initial region is the largest centered rectangle with the
    /// requested ratio (the whole image when unlocked). Like every region,
    /// it is never smaller than [`MIN_CROP_EDGE`] on either side, even when
    /// an extreme ratio cannot be met inside the image.
    ///
    /// # Errors
    ///
    /// [`CropError::EmptyImage`] or [`CropError::ImageTooSmall`].
    pub fn new(image: Size, aspect: Option<AspectRatio>) -> Result<Self, CropError> {
        if image.width == 0 || image.height == 0 {
            return Err(CropError::EmptyImage);
        }
        if image.width < MIN_CROP_EDGE || image.height < MIN_CROP_EDGE {
            return Err(CropError::ImageTooSmall { min: MIN_CROP_EDGE });
        }

        let mut cropper = Self {
            image,
            aspect,
            region: CropRegion {
                x: 0,
                y: 0,
                width: image.width,
                height: image.height,
            },
        };
        let (width, height) = cropper.fit(image.width, image.height);
        cropper.region = CropRegion {
            x: (image.width - width) / 2,
            y: (image.height - height) / 2,
            width,
            height,
        };
        Ok(cropper)
    }

    /// Image size.
    #[must_use]
    pub const fn image(&self) -> Size {
        self.image
    }

    /// Current region.
    #[must_use]
    pub const fn region(&self) -> CropRegion {
        self.region
    }

    /// Move the region by `(dx, dy)`, stopping at the image edges.
    pub fn translate(&mut self, dx: i64, dy: i64) {
        let max_x = self.image.width - self.region.width;
        let max_y = self.image.height - self.region.height;
        self.region.x = shift(self.region.x, dx, max_x);
        self.region.y = shift(self.region.y, dy, max_y);
    }

    /// Resize the region, keeping its top-left corner where possible.
    ///
    /// With a locked ratio only `width` is honored and the height follows.
    /// The size is clamped to the image and to [`MIN_CROP_EDGE`]; if the
    /// region would overflow the right or bottom edge it is pushed back in.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = self.fit(width, height);
        self.region.width = width;
        self.region.height = height;
        self.region.x = self.region.x.min(self.image.width - width);
        self.region.y = self.region.y.min(self.image.height - height);
    }

    /// Replace the region with one drawn on a scaled copy of the image.
    ///
    /// `display` is the on-screen size of the image and `drawn` the
    /// rectangle in display pixels.
    ///
    /// # Errors
    ///
    /// [`CropError::EmptyDisplay`] if `display` has a zero dimension.
    pub fn select_from_display(&mut self, drawn: CropRegion, display: Size) -> Result<(), CropError> {
        if display.width == 0 || display.height == 0 {
            return Err(CropError::EmptyDisplay);
        }

        let x = mul_div(drawn.x, self.image.width, display.width).min(self.image.width);
        let y = mul_div(drawn.y, self.image.height, display.height).min(self.image.height);
        let width = mul_div(drawn.width, self.image.width, display.width);
        let height = mul_div(drawn.height, self.image.height, display.height);

        let (width, height) = self.fit(width, height);
        self.region = CropRegion {
            x: x.min(self.image.width - width),
            y: y.min(self.image.height - height),
            width,
            height,
        };
        Ok(())
    }

    fn fit(&self, width: u32, height: u32) -> (u32, u32) {
        let min = MIN_CROP_EDGE;
        match self.aspect {
            None => (
                width.clamp(min, self.image.width),
                height.clamp(min, self.image.height),
            ),
            Some(ratio) => {
                // Largest width whose derived height still fits.
                let max_width = self.image.width.min(ratio.width_for(self.image.height));
                let mut width = width.clamp(min.min(max_width), max_width);
                let mut height = ratio.height_for(width);
                if height < min {
                    height = min.min(self.image.height);
                    width = ratio.width_for(height).min(self.image.width);
                }
                // Extreme ratios give up on the ratio before the minimum.
                (
                    width.clamp(min, self.image.width),
                    height.clamp(min, self.image.height),
                )
            }
        }
    }
}

/// `value * num / den` without intermediate overflow, saturating at `u32::MAX`.
#[allow(clippy::cast_lossless, clippy::cast_possible_truncation)] // bounded by the check below
const fn mul_div(value: u32, num: u32, den: u32) -> u32 {
    let wide = value as u64 * num as u64 / den as u64;
    if wide > u32::MAX as u64 {
        u32::MAX
    } else {
        wide as u32
    }
}

fn shift(pos: u32, delta: i64, max: u32) -> u32 {
    let moved = (i64::from(pos) + delta).clamp(0, i64::from(max));
    u32::try_from(moved).unwrap_or(max)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn inside(c: &Cropper) -> bool {
        let r = c.region();
        r.right() <= c.image().width && r.bottom() <= c.image().height
    }

    #[test]
    fn test_rejects_degenerate_images() {
        assert_eq!(
            Cropper::new(Size::new(0, 10), None),
            Err(CropError::EmptyImage)
        );
        assert_eq!(
            Cropper::new(Size::new(8, 100), None),
            Err(CropError::ImageTooSmall { min: MIN_CROP_EDGE })
        );
        assert_eq!(AspectRatio::new(0, 1), Err(CropError::InvalidAspect));
    }

    #[test]
    fn test_unlocked_starts_with_whole_image() {
        let c = Cropper::new(Size::new(800, 600), None).unwrap();
        assert_eq!(
            c.region(),
            CropRegion {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn test_square_on_landscape_is_centered() {
        let c = Cropper::new(Size::new(800, 600), Some(AspectRatio::SQUARE)).unwrap();
        assert_eq!(
            c.region(),
            CropRegion {
                x: 100,
                y: 0,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn test_wide_on_portrait() {
        let c = Cropper::new(Size::new(900, 1600), Some(AspectRatio::WIDE)).unwrap();
        let r = c.region();
        assert_eq!((r.width, r.height), (900, 506));
        assert_eq!(r.y, (1600 - 506) / 2);
    }

    #[test]
    fn test_extreme_ratio_starts_at_minimum_edge() {
        for ratio in [AspectRatio::new(100, 1).unwrap(), AspectRatio::new(1, 100).unwrap()] {
            let c = Cropper::new(Size::new(16, 16), Some(ratio)).unwrap();
            let r = c.region();
            assert!(r.width >= MIN_CROP_EDGE && r.height >= MIN_CROP_EDGE, "{r:?}");
            assert!(inside(&c));
        }

        let c = Cropper::new(Size::new(400, 20), Some(AspectRatio::new(1, 100).unwrap())).unwrap();
        let r = c.region();
        assert_eq!((r.width, r.height), (MIN_CROP_EDGE, MIN_CROP_EDGE));
        assert_eq!((r.x, r.y), ((400 - MIN_CROP_EDGE) / 2, 2));
        assert!(inside(&c));
    }

    #[test]
    fn test_translate_clamps() {
        let mut c = Cropper::new(Size::new(800, 600), Some(AspectRatio::SQUARE)).unwrap();
        c.translate(-10_000, 50);
        assert_eq!((c.region().x, c.region().y), (0, 0));
        c.translate(10_000, 0);
        assert_eq!(c.region().x, 200);
        assert!(inside(&c));
    }

    #[test]
    fn test_resize_keeps_aspect_and_bounds() {
        let mut c = Cropper::new(Size::new(800, 600), Some(AspectRatio::SQUARE)).unwrap();
        c.translate(10_000, 0);
        c.resize(300, 10);
        assert_eq!((c.region().width, c.region().height), (300, 300));
        assert_eq!(c.region().x, 200);

        c.resize(5_000, 0);
        assert_eq!((c.region().width, c.region().height), (600, 600));
        assert!(inside(&c));
    }

    #[test]
    fn test_resize_unlocked_respects_minimum() {
        let mut c = Cropper::new(Size::new(400, 300), None).unwrap();
        c.resize(1, 1);
        assert_eq!((c.region().width, c.region().height), (MIN_CROP_EDGE, MIN_CROP_EDGE));
    }

    #[test]
    fn test_select_from_display_scales_to_natural() {
        let mut c = Cropper::new(Size::new(1600, 1200), None).unwrap();
        c.select_from_display(
            CropRegion {
                x: 100,
                y: 50,
                width: 200,
                height: 100,
            },
            Size::new(400, 300),
        )
        .unwrap();
        assert_eq!(
            c.region(),
            CropRegion {
                x: 400,
                y: 200,
                width: 800,
                height: 400
            }
        );
    }

    #[test]
    fn test_select_from_display_overflow_is_pulled_in() {
        let mut c = Cropper::new(Size::new(1000, 1000), Some(AspectRatio::SQUARE)).unwrap();
        c.select_from_display(
            CropRegion {
                x: 90,
                y: 90,
                width: 50,
                height: 50,
            },
            Size::new(100, 100),
        )
        .unwrap();
        assert!(inside(&c));
        assert_eq!(c.region().width, 500);
        assert_eq!(c.region().x, 500);
    }

    #[test]
    fn test_select_from_empty_display() {
        let mut c = Cropper::new(Size::new(100, 100), None).unwrap();
        assert_eq!(
            c.select_from_display(c.region(), Size::new(0, 10)),
            Err(CropError::EmptyDisplay)
        );
    }
}
