//! Segmentation module
//!
//! Reads the curated ROI segmentation exported from MATLAB: sparse voxel masks,
//! raw baseline fluorescence and detrended traces.

mod types;
mod layout;
mod decoder;
mod extractor;

#[cfg(test)]
mod tests;

pub use types::{ImageShape, PixelMask, RoiCentroid, TraceKind, VoxelMaskEntry};
pub use layout::{LayoutConfig, PixelMaskFieldMap, SessionLayout};
pub use decoder::SparseRoiMaskDecoder;
pub use extractor::SegmentationExtractor;
