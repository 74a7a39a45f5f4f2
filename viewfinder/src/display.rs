use motion_highlight_common::frame::{DisplayFrame, DisplayImage};
use tracing::{debug, info};

/// Where processed frames end up. Called from the processing thread only.
pub trait FrameSink: Send + 'static {
    fn show(&mut self, frame: DisplayFrame);
}

/// Headless display: reports what would be put on screen.
#[derive(Debug, Default)]
pub struct TracingDisplay {
    shown: u64,
    with_motion: u64,
}

impl FrameSink for TracingDisplay {
    fn show(&mut self, frame: DisplayFrame) {
        self.shown += 1;
        if frame.regions > 0 {
            self.with_motion += 1;
        }

        let kind = match &frame.image {
            DisplayImage::Gray(_) => "gray",
            DisplayImage::Color(_) => "color",
        };
        debug!(
            seq = frame.seq,
            captured_at_ms = frame.captured_at_ms,
            kind,
            dims = %frame.image.dimensions(),
            regions = frame.regions,
            "frame displayed"
        );

        if self.shown % 100 == 0 {
            info!(
                shown = self.shown,
                with_motion = self.with_motion,
                "display progress"
            );
        }
    }
}
