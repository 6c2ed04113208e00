//! Segmentation data types

use serde::Serialize;

/// One voxel of an ROI, in the field order of the NWB `voxel_mask` column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoxelMaskEntry {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    /// Always 1; the source tables carry binary membership only
    pub weight: f32,
}

impl VoxelMaskEntry {
    pub fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z, weight: 1.0 }
    }

    pub fn coordinates(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

/// All voxels of one ROI, in storage order.
pub type PixelMask = Vec<VoxelMaskEntry>;

/// Per-axis median of an ROI's voxel coordinates; `NaN` on every axis for an empty ROI.
pub type RoiCentroid = [f64; 3];

/// Image volume shape as (rows, columns, planes).
pub type ImageShape = (usize, usize, usize);

/// Which fluorescence trace dataset to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// Raw baseline fluorescence
    Raw,
    /// Detrended dF/F series
    Dff,
}
