pub mod error;
pub mod highlighter;
pub mod stages;

pub use error::{ProcessError, RejectedFrame};
pub use highlighter::{MotionHighlighter, Phase};
