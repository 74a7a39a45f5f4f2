use motion_highlight_common::frame::{CameraFrame, Dimensions};

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("frame is {actual} but the processor expects {expected}")]
    DimensionMismatch {
        expected: Dimensions,
        actual: Dimensions,
    },
    #[error("frame delivered before the camera view was started")]
    UninitializedAccess,
}

/// A frame the processor refused, handed back untouched so the caller can
/// still show it.
#[derive(Debug, thiserror::Error)]
#[error("frame {} rejected: {error}", .frame.seq)]
pub struct RejectedFrame {
    #[source]
    pub error: ProcessError,
    pub frame: CameraFrame,
}
