//! Sparse ROI mask decoder.
//!
//! The segmentation files store each coordinate axis as a `[max_pixels_per_roi, num_rois]`
//! table. Column `r` lists the voxels of ROI `r` from row 0 onwards and is padded with a
//! sentinel (`0`, or `NaN` in floating-point tables) after the last voxel. MATLAB indices
//! are 1-based, so a zero coordinate never belongs to a real voxel.

use tracing::{debug, instrument, warn};

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::segmentation::layout::{LayoutConfig, SessionLayout};
use crate::nwb_pipeline::segmentation::types::{ImageShape, PixelMask, RoiCentroid, VoxelMaskEntry};
use crate::nwb_pipeline::storage::DatasetReader;

/// Shape MATLAB gives a half-precision array when it is saved to a v7.3 file.
const HALF_PRECISION_SHAPE: [usize; 2] = [1, 6];

pub struct SparseRoiMaskDecoder<R: DatasetReader> {
    reader: Option<R>,
    layout: SessionLayout,
    config: LayoutConfig,
    max_pixels_per_roi: usize,
    num_rois: usize,
}

impl<R: DatasetReader> SparseRoiMaskDecoder<R> {
    /// Takes ownership of an opened segmentation file.
    ///
    /// Fails with [`ConversionError::CorruptedFormat`] when the baseline traces were
    /// exported in half precision; the reader is released before returning the error.
    pub fn open(mut reader: R) -> Result<Self> {
        match Self::inspect(&reader) {
            Ok((layout, max_pixels_per_roi, num_rois)) => {
                debug!(?layout, num_rois, max_pixels_per_roi, "Opened ROI coordinate tables");
                Ok(Self {
                    reader: Some(reader),
                    layout,
                    config: layout.config(),
                    max_pixels_per_roi,
                    num_rois,
                })
            }
            Err(e) => {
                if let Err(close_err) = reader.close() {
                    warn!("Failed to release segmentation file: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn inspect(reader: &R) -> Result<(SessionLayout, usize, usize)> {
        let layout = SessionLayout::detect(reader);
        let config = layout.config();

        let baseline_shape = reader.shape(config.baseline_key)?;
        if baseline_shape == HALF_PRECISION_SHAPE {
            return Err(ConversionError::CorruptedFormat(format!(
                "dataset `{}`",
                config.baseline_key
            )));
        }

        let [x_key, y_key, z_key] = config.field_map.axes();
        let table_shape = reader.shape_2d(x_key)?;
        for key in [y_key, z_key] {
            let shape = reader.shape_2d(key)?;
            if shape != table_shape {
                return Err(ConversionError::InvalidShape {
                    name: key.to_string(),
                    found: vec![shape.0, shape.1],
                    reason: format!("coordinate tables must all match `{}` {:?}", x_key, table_shape),
                });
            }
        }

        Ok((layout, table_shape.0, table_shape.1))
    }

    pub(crate) fn reader(&self) -> Result<&R> {
        self.reader.as_ref().ok_or(ConversionError::ReaderClosed)
    }

    pub fn layout(&self) -> SessionLayout {
        self.layout
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn image_shape(&self) -> ImageShape {
        self.config.image_shape
    }

    pub fn num_rois(&self) -> usize {
        self.num_rois
    }

    pub fn max_pixels_per_roi(&self) -> usize {
        self.max_pixels_per_roi
    }

    /// `None` or an empty selection means every ROI, in ascending order.
    pub(crate) fn resolve_roi_ids(&self, roi_ids: Option<&[usize]>) -> Result<Vec<usize>> {
        match roi_ids {
            Some(ids) if !ids.is_empty() => {
                if let Some(&roi_id) = ids.iter().find(|&&id| id >= self.num_rois) {
                    return Err(ConversionError::InvalidRoiIdentifier {
                        roi_id,
                        num_rois: self.num_rois,
                    });
                }
                Ok(ids.to_vec())
            }
            _ => Ok((0..self.num_rois).collect()),
        }
    }

    /// Decodes the voxel masks of `roi_ids`, one per id and in the order given.
    #[instrument(skip(self, roi_ids), fields(requested = roi_ids.map_or(0, <[usize]>::len)))]
    pub fn decode_pixel_masks(&self, roi_ids: Option<&[usize]>) -> Result<Vec<PixelMask>> {
        let reader = self.reader()?;
        let roi_ids = self.resolve_roi_ids(roi_ids)?;
        let [x_key, y_key, z_key] = self.config.field_map.axes();

        let mut masks = Vec::with_capacity(roi_ids.len());
        for roi_id in roi_ids {
            let x = reader.read_column(x_key, roi_id, 0..self.max_pixels_per_roi)?;
            let num_pixels = valid_pixel_count(x.iter().copied());
            if num_pixels == 0 {
                masks.push(PixelMask::new());
                continue;
            }

            let y = reader.read_column(y_key, roi_id, 0..num_pixels)?;
            let z = reader.read_column(z_key, roi_id, 0..num_pixels)?;

            let mut mask = PixelMask::with_capacity(num_pixels);
            for row in 0..num_pixels {
                mask.push(VoxelMaskEntry::new(
                    to_voxel_index(roi_id, x[row])?,
                    to_voxel_index(roi_id, y[row])?,
                    to_voxel_index(roi_id, z[row])?,
                ));
            }
            masks.push(mask);
        }
        Ok(masks)
    }

    /// Per-axis median of each ROI's voxels. Empty ROIs yield `[NaN; 3]`.
    pub fn roi_centroid(&self, roi_ids: Option<&[usize]>) -> Result<Vec<RoiCentroid>> {
        let masks = self.decode_pixel_masks(roi_ids)?;
        Ok(masks.iter().map(|mask| centroid(mask)).collect())
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Releases the coordinate tables. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match self.reader.take() {
            Some(mut reader) => reader.close(),
            None => Ok(()),
        }
    }
}

impl<R: DatasetReader> Drop for SparseRoiMaskDecoder<R> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release segmentation file: {}", e);
        }
    }
}

/// Number of leading entries before the first sentinel.
pub(crate) fn valid_pixel_count(column: impl IntoIterator<Item = f64>) -> usize {
    let mut count = 0;
    for value in column {
        if value == 0.0 || value.is_nan() {
            break;
        }
        count += 1;
    }
    count
}

fn to_voxel_index(roi_id: usize, value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(ConversionError::InvalidCoordinate { roi_id, value })
    }
}

pub(crate) fn centroid(mask: &[VoxelMaskEntry]) -> RoiCentroid {
    let mut centroid = [f64::NAN; 3];
    for (axis, slot) in centroid.iter_mut().enumerate() {
        let mut values: Vec<f64> = mask
            .iter()
            .map(|voxel| f64::from(voxel.coordinates()[axis]))
            .collect();
        *slot = median(&mut values);
    }
    centroid
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
