use image::{GrayImage, Luma};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::map::map_colors2;
use motion_highlight_common::frame::Dimensions;

use crate::error::ProcessError;

/// Pixelwise `|current - previous|`.
pub fn absolute_difference(
    current: &GrayImage,
    previous: &GrayImage,
) -> Result<GrayImage, ProcessError> {
    let expected = Dimensions::of(previous);
    let actual = Dimensions::of(current);
    if expected != actual {
        return Err(ProcessError::DimensionMismatch { expected, actual });
    }
    Ok(map_colors2(current, previous, |c: Luma<u8>, p: Luma<u8>| {
        Luma([c[0].abs_diff(p[0])])
    }))
}

/// Binarize a difference image: `> cutoff` becomes 255, everything else 0.
pub fn binarize(diff: &GrayImage, cutoff: u8) -> GrayImage {
    threshold(diff, cutoff, ThresholdType::Binary)
}
