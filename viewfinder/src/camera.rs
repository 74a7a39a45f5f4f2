use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use motion_highlight_common::frame::{CameraFrame, Dimensions};

/// Anything that can hand the viewfinder camera frames, one capture at a
/// time.
pub trait FrameSource: Send + 'static {
    /// Size of the frames this source delivers once the view is enabled.
    fn resolution(&self) -> Dimensions;

    /// Capture the next frame. `None` means the source is exhausted.
    fn capture(&mut self, seq: u64, captured_at_ms: i64) -> Option<CameraFrame>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

const BLOCK_COLOR: Rgba<u8> = Rgba([240, 240, 240, 255]);

/// Stand-in camera: a dim vertical gradient with a bright square sliding
/// left to right, wrapping around.
pub struct SyntheticCamera {
    dims: Dimensions,
    speed: u32,
    block: u32,
}

impl SyntheticCamera {
    pub fn new(dims: Dimensions, speed: u32) -> Self {
        Self {
            dims,
            speed,
            block: (dims.height / 4).max(1),
        }
    }

    fn render(&self, seq: u64) -> RgbaImage {
        let Dimensions { width, height } = self.dims;
        let mut color = RgbaImage::from_fn(width, height, |_, y| {
            let v = (32 + y * 96 / height) as u8;
            Rgba([v, v, v.saturating_add(16), 255])
        });

        let travel = u64::from(width + self.block);
        let x = (seq * u64::from(self.speed) % travel) as i32 - self.block as i32;
        let y = (height.saturating_sub(self.block) / 2) as i32;
        draw_filled_rect_mut(
            &mut color,
            Rect::at(x, y).of_size(self.block, self.block),
            BLOCK_COLOR,
        );
        color
    }
}

impl FrameSource for SyntheticCamera {
    fn resolution(&self) -> Dimensions {
        self.dims
    }

    fn capture(&mut self, seq: u64, captured_at_ms: i64) -> Option<CameraFrame> {
        Some(CameraFrame::from_color(self.render(seq), seq, captured_at_ms))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
