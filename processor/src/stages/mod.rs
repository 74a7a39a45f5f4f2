//! Per-frame pipeline: difference, binarize, trace, draw.

pub mod annotate;
pub mod contours;
pub mod diff;
