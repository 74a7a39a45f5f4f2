use image::{GrayImage, Rgba};
use motion_highlight_common::config::HighlightConfig;
use motion_highlight_common::frame::{CameraFrame, Dimensions, DisplayFrame, DisplayImage};
use tracing::{debug, info, warn};

use crate::error::{ProcessError, RejectedFrame};
use crate::stages::annotate::{draw_bounding_boxes, draw_contours};
use crate::stages::contours::ContourSet;
use crate::stages::diff::{absolute_difference, binarize};

enum HighlightState {
    /// No camera view is open. Frames are refused.
    Stopped,
    /// View started, nothing to diff against yet. Holds the zeroed buffer
    /// sized by `on_start`.
    Uninitialized { previous_gray: GrayImage },
    /// Every later frame is diffed against `previous_gray`.
    Running { previous_gray: GrayImage },
}

/// Observable lifecycle position of a [`MotionHighlighter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Uninitialized,
    Running,
}

/// Highlights regions that changed since the previous camera frame.
///
/// Frames must arrive one at a time in capture order. The previous gray
/// plane is the only state kept between calls and is owned exclusively by
/// the highlighter.
pub struct MotionHighlighter {
    state: HighlightState,
    config: HighlightConfig,
}

impl MotionHighlighter {
    pub fn new(config: HighlightConfig) -> Self {
        Self {
            state: HighlightState::Stopped,
            config,
        }
    }

    /// Camera view opened: drop any retained frame and wait for a fresh
    /// first frame of `width` x `height`.
    pub fn on_start(&mut self, width: u32, height: u32) {
        info!(width, height, "camera view started, waiting for first frame");
        self.state = HighlightState::Uninitialized {
            previous_gray: GrayImage::new(width, height),
        };
    }

    /// Camera view closed: release the retained frame.
    pub fn on_stop(&mut self) {
        info!("camera view stopped, releasing retained frame");
        self.state = HighlightState::Stopped;
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            HighlightState::Stopped => Phase::Stopped,
            HighlightState::Uninitialized { .. } => Phase::Uninitialized,
            HighlightState::Running { .. } => Phase::Running,
        }
    }

    /// The gray plane the next frame will be compared against.
    pub fn previous_gray(&self) -> Option<&GrayImage> {
        match &self.state {
            HighlightState::Running { previous_gray } => Some(previous_gray),
            _ => None,
        }
    }

    /// Process one frame and return what should be displayed.
    ///
    /// The first frame after `on_start` is shown as plain grayscale and only
    /// becomes the reference. Every later frame comes back as its color plane
    /// with changed regions outlined and boxed.
    ///
    /// A refused frame is returned untouched inside the error and leaves the
    /// retained state as it was.
    pub fn process_frame(&mut self, frame: CameraFrame) -> Result<DisplayFrame, RejectedFrame> {
        let state = std::mem::replace(&mut self.state, HighlightState::Stopped);
        let (next, result) = match state {
            HighlightState::Stopped => {
                warn!(seq = frame.seq, "frame arrived while camera view is stopped");
                (
                    HighlightState::Stopped,
                    Err(RejectedFrame {
                        error: ProcessError::UninitializedAccess,
                        frame,
                    }),
                )
            }
            HighlightState::Uninitialized { mut previous_gray } => {
                match bootstrap(&mut previous_gray, frame) {
                    Ok(shown) => (HighlightState::Running { previous_gray }, Ok(shown)),
                    Err(rejected) => (HighlightState::Uninitialized { previous_gray }, Err(rejected)),
                }
            }
            HighlightState::Running { mut previous_gray } => {
                let result = self.highlight(&mut previous_gray, frame);
                (HighlightState::Running { previous_gray }, result)
            }
        };
        self.state = next;
        result
    }

    fn highlight(
        &self,
        previous_gray: &mut GrayImage,
        frame: CameraFrame,
    ) -> Result<DisplayFrame, RejectedFrame> {
        let diff = match absolute_difference(frame.gray(), previous_gray) {
            Ok(diff) => diff,
            Err(error) => return Err(RejectedFrame { error, frame }),
        };
        let mask = binarize(&diff, self.config.threshold);
        let contours = ContourSet::extract(&mask);

        let seq = frame.seq;
        let captured_at_ms = frame.captured_at_ms;
        let (gray, mut color) = frame.into_parts();

        if !contours.is_empty() {
            draw_contours(
                &mut color,
                &contours,
                Rgba(self.config.contour_color),
                self.config.contour_thickness,
            );
            draw_bounding_boxes(
                &mut color,
                &contours,
                Rgba(self.config.box_color),
                self.config.box_thickness,
            );
        }

        debug!(
            seq,
            contours = contours.len(),
            regions = contours.outer_count(),
            "frame highlighted"
        );

        previous_gray.copy_from_slice(gray.as_raw());

        Ok(DisplayFrame {
            seq,
            captured_at_ms,
            image: DisplayImage::Color(color),
            regions: contours.len(),
        })
    }
}

/// Take the first frame as the reference and show it as-is in grayscale.
fn bootstrap(previous_gray: &mut GrayImage, frame: CameraFrame) -> Result<DisplayFrame, RejectedFrame> {
    let expected = Dimensions::of(previous_gray);
    let actual = frame.dimensions();
    if expected != actual {
        return Err(RejectedFrame {
            error: ProcessError::DimensionMismatch { expected, actual },
            frame,
        });
    }

    let seq = frame.seq;
    let captured_at_ms = frame.captured_at_ms;
    let (gray, _) = frame.into_parts();
    previous_gray.copy_from_slice(gray.as_raw());

    info!(seq, dims = %actual, "first frame retained as reference");

    Ok(DisplayFrame {
        seq,
        captured_at_ms,
        image: DisplayImage::Gray(gray),
        regions: 0,
    })
}
