//! Imaging data types

use std::ops::Range;

use ndarray::Array4;

use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::segmentation::ImageShape;

/// Half of the field of view, split along the row axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Rows `rows / 2..`
    Top,
    /// Rows `..rows / 2`
    Bottom,
}

impl Region {
    pub fn rows(region: Option<Region>, num_rows: usize) -> Range<usize> {
        let half = num_rows / 2;
        match region {
            None => 0..num_rows,
            Some(Region::Top) => half..num_rows,
            Some(Region::Bottom) => 0..half,
        }
    }
}

/// Read access to a volumetric imaging series with one `u16` channel.
pub trait ImagingExtractor {
    /// Shape of one frame of [`ImagingExtractor::video`].
    fn image_size(&self) -> ImageShape;

    fn num_frames(&self) -> usize;

    fn sampling_frequency(&self) -> f64;

    fn num_channels(&self) -> usize {
        1
    }

    /// Sample type of [`ImagingExtractor::video`].
    fn dtype(&self) -> &'static str {
        "uint16"
    }

    /// Frames `frames` as `[frame, d0, d1, d2]`, with `(d0, d1, d2) == image_size()`.
    fn video(&self, frames: Range<usize>) -> Result<Array4<u16>>;
}
