use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{Array4, Axis};
use tracing::debug;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::imaging::types::{ImagingExtractor, Region};
use crate::nwb_pipeline::segmentation::ImageShape;
use crate::nwb_pipeline::storage::{DatasetReader, DatasetSource};

const VOLUME_DATASET: &str = "default";

/// One microscope volume per file, stored as `default` with shape `(stacks, rows, cols)`.
///
/// Frames come out as `(cols, rows, stacks)`. The file is opened only while reading,
/// since a session has one file per frame.
pub struct VolumeImagingExtractor<S: DatasetSource> {
    source: S,
    path: PathBuf,
    sampling_frequency: f64,
    region: Option<Region>,
    num_stacks: usize,
    num_rows: usize,
    num_cols: usize,
}

impl<S: DatasetSource> VolumeImagingExtractor<S> {
    pub fn new(
        source: S,
        path: impl Into<PathBuf>,
        sampling_frequency: f64,
        region: Option<Region>,
    ) -> Result<Self> {
        let path = path.into();
        let mut reader = source.open(&path)?;
        let shape = reader.shape(VOLUME_DATASET);
        reader.close()?;

        let shape = shape?;
        let (num_stacks, num_rows, num_cols) = match shape.as_slice() {
            [stacks, rows, cols] => (*stacks, *rows, *cols),
            _ => {
                return Err(ConversionError::InvalidShape {
                    name: format!("{}:{}", path.display(), VOLUME_DATASET),
                    found: shape,
                    reason: "expected (stacks, rows, cols)".to_string(),
                });
            }
        };
        Self::with_shape(
            source,
            path,
            sampling_frequency,
            region,
            (num_stacks, num_rows, num_cols),
        )
    }

    /// Skips opening the file when every frame file is known to share one shape.
    pub fn with_shape(
        source: S,
        path: impl Into<PathBuf>,
        sampling_frequency: f64,
        region: Option<Region>,
        shape: (usize, usize, usize),
    ) -> Result<Self> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(ConversionError::InvalidSamplingFrequency(sampling_frequency));
        }
        let (num_stacks, num_rows, num_cols) = shape;
        Ok(Self {
            source,
            path: path.into(),
            sampling_frequency,
            region,
            num_stacks,
            num_rows,
            num_cols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn region(&self) -> Option<Region> {
        self.region
    }

    fn rows(&self) -> Range<usize> {
        Region::rows(self.region, self.num_rows)
    }
}

impl<S: DatasetSource> ImagingExtractor for VolumeImagingExtractor<S> {
    fn image_size(&self) -> ImageShape {
        (self.num_cols, self.rows().len(), self.num_stacks)
    }

    fn num_frames(&self) -> usize {
        1
    }

    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn video(&self, frames: Range<usize>) -> Result<Array4<u16>> {
        if frames.start > frames.end || frames.end > 1 {
            return Err(ConversionError::InvalidFrameRange {
                start: frames.start,
                end: frames.end,
                num_frames: 1,
            });
        }
        let (d0, d1, d2) = self.image_size();
        if frames.is_empty() {
            return Ok(Array4::zeros((0, d0, d1, d2)));
        }

        debug!(path = %self.path.display(), rows = ?self.rows(), "Reading volume");
        let mut reader = self.source.open(&self.path)?;
        let volume = reader.read_volume(VOLUME_DATASET, self.rows());
        reader.close()?;

        let frame = volume?
            .permuted_axes([2, 1, 0])
            .as_standard_layout()
            .into_owned();
        Ok(frame.insert_axis(Axis(0)))
    }
}
