use std::fmt;

use image::{GenericImageView, GrayImage, RgbaImage};

/// Width and height of a frame plane in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of<I: GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One camera capture: a grayscale plane and an RGBA plane of the same size,
/// taken at the same moment.
///
/// The pairing is validated on construction, so holders of a `CameraFrame`
/// never need to re-check that the two planes agree.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    gray: GrayImage,
    color: RgbaImage,
    pub seq: u64,
    pub captured_at_ms: i64,
}

impl CameraFrame {
    pub fn new(
        gray: GrayImage,
        color: RgbaImage,
        seq: u64,
        captured_at_ms: i64,
    ) -> Result<Self, FrameError> {
        let gray_dims = Dimensions::of(&gray);
        let color_dims = Dimensions::of(&color);
        if gray_dims != color_dims {
            return Err(FrameError::PlaneMismatch {
                gray: gray_dims,
                color: color_dims,
            });
        }
        Ok(Self {
            gray,
            color,
            seq,
            captured_at_ms,
        })
    }

    /// Build a frame from its color plane, deriving the gray plane by luma
    /// conversion.
    pub fn from_color(color: RgbaImage, seq: u64, captured_at_ms: i64) -> Self {
        let gray = image::imageops::grayscale(&color);
        Self {
            gray,
            color,
            seq,
            captured_at_ms,
        }
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn color(&self) -> &RgbaImage {
        &self.color
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.gray)
    }

    pub fn into_parts(self) -> (GrayImage, RgbaImage) {
        (self.gray, self.color)
    }
}

/// What the display surface should show for one processed frame.
#[derive(Debug, Clone)]
pub enum DisplayImage {
    /// Bootstrap output: the raw grayscale plane, no annotation.
    Gray(GrayImage),
    /// The color plane, annotated when motion was found.
    Color(RgbaImage),
}

impl DisplayImage {
    pub fn dimensions(&self) -> Dimensions {
        match self {
            DisplayImage::Gray(img) => Dimensions::of(img),
            DisplayImage::Color(img) => Dimensions::of(img),
        }
    }

    pub fn as_color(&self) -> Option<&RgbaImage> {
        match self {
            DisplayImage::Color(img) => Some(img),
            DisplayImage::Gray(_) => None,
        }
    }

    pub fn as_gray(&self) -> Option<&GrayImage> {
        match self {
            DisplayImage::Gray(img) => Some(img),
            DisplayImage::Color(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub seq: u64,
    pub captured_at_ms: i64,
    pub image: DisplayImage,
    /// Number of changed regions outlined on this frame.
    pub regions: usize,
}

impl DisplayFrame {
    /// Show a frame's color plane as-is. Used when a frame could not be
    /// processed.
    pub fn unannotated(frame: CameraFrame) -> Self {
        let seq = frame.seq;
        let captured_at_ms = frame.captured_at_ms;
        let (_, color) = frame.into_parts();
        Self {
            seq,
            captured_at_ms,
            image: DisplayImage::Color(color),
            regions: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("gray plane is {gray} but color plane is {color}")]
    PlaneMismatch { gray: Dimensions, color: Dimensions },
}
