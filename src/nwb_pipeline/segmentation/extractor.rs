use std::ops::Range;

use ndarray::{Array2, Axis};
use tracing::{debug, info, warn};

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::segmentation::decoder::{SparseRoiMaskDecoder, centroid};
use crate::nwb_pipeline::segmentation::layout::{LayoutConfig, SessionLayout};
use crate::nwb_pipeline::segmentation::types::{ImageShape, PixelMask, RoiCentroid, TraceKind};
use crate::nwb_pipeline::storage::DatasetReader;

/// Segmentation of one session: ROI voxel masks plus raw and detrended traces.
///
/// Trace datasets are shaped `[num_frames, num_rois]`. A frame window narrows every
/// frame-indexed accessor, which is how stub conversions read only the first frames.
pub struct SegmentationExtractor<R: DatasetReader> {
    decoder: SparseRoiMaskDecoder<R>,
    sampling_frequency: f64,
    num_frames: usize,
    frame_window: Range<usize>,
    times: Option<Vec<f64>>,
}

impl<R: DatasetReader> SegmentationExtractor<R> {
    pub fn new(reader: R, sampling_frequency: f64) -> Result<Self> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(ConversionError::InvalidSamplingFrequency(sampling_frequency));
        }

        let mut decoder = SparseRoiMaskDecoder::open(reader)?;
        let num_frames = match Self::check_traces(&decoder) {
            Ok(num_frames) => num_frames,
            Err(e) => {
                if let Err(close_err) = decoder.close() {
                    warn!("Failed to release segmentation file: {}", close_err);
                }
                return Err(e);
            }
        };

        info!(
            layout = ?decoder.layout(),
            num_rois = decoder.num_rois(),
            num_frames,
            "Opened segmentation"
        );

        Ok(Self {
            decoder,
            sampling_frequency,
            num_frames,
            frame_window: 0..num_frames,
            times: None,
        })
    }

    fn check_traces(decoder: &SparseRoiMaskDecoder<R>) -> Result<usize> {
        let reader = decoder.reader()?;
        let config = decoder.config();
        let (num_frames, num_rois) = reader.shape_2d(config.baseline_key)?;
        let dff_shape = reader.shape_2d(config.timeseries_key)?;

        if num_rois != decoder.num_rois() || dff_shape != (num_frames, num_rois) {
            return Err(ConversionError::InvalidShape {
                name: config.timeseries_key.to_string(),
                found: vec![dff_shape.0, dff_shape.1],
                reason: format!(
                    "traces must be [frames, {}] and match `{}` [{}, {}]",
                    decoder.num_rois(),
                    config.baseline_key,
                    num_frames,
                    num_rois
                ),
            });
        }
        Ok(num_frames)
    }

    pub fn decoder(&self) -> &SparseRoiMaskDecoder<R> {
        &self.decoder
    }

    pub fn layout(&self) -> SessionLayout {
        self.decoder.layout()
    }

    pub fn config(&self) -> &LayoutConfig {
        self.decoder.config()
    }

    pub fn image_size(&self) -> ImageShape {
        self.decoder.image_shape()
    }

    pub fn num_rois(&self) -> usize {
        self.decoder.num_rois()
    }

    pub fn roi_ids(&self) -> Vec<usize> {
        (0..self.num_rois()).collect()
    }

    /// Every ROI in these files passed curation.
    pub fn accepted_list(&self) -> Vec<usize> {
        self.roi_ids()
    }

    pub fn rejected_list(&self) -> Vec<usize> {
        Vec::new()
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    /// Frames visible through the current frame window.
    pub fn num_frames(&self) -> usize {
        self.frame_window.len()
    }

    pub fn roi_pixel_masks(&self, roi_ids: Option<&[usize]>) -> Result<Vec<PixelMask>> {
        self.decoder.decode_pixel_masks(roi_ids)
    }

    pub fn roi_locations(&self, roi_ids: Option<&[usize]>) -> Result<Vec<RoiCentroid>> {
        self.decoder.roi_centroid(roi_ids)
    }

    /// Centroids of masks that are already decoded, without touching the file.
    pub fn mask_centroids(masks: &[PixelMask]) -> Vec<RoiCentroid> {
        masks.iter().map(|mask| centroid(mask)).collect()
    }

    /// Restricts the extractor to frames `start..end` of the current window.
    pub fn frame_slice(mut self, start: usize, end: usize) -> Result<Self> {
        let num_frames = self.num_frames();
        if start > end || end > num_frames {
            return Err(ConversionError::InvalidFrameRange {
                start,
                end,
                num_frames,
            });
        }
        let offset = self.frame_window.start;
        self.frame_window = offset + start..offset + end;
        debug!(window = ?self.frame_window, "Sliced segmentation frames");
        Ok(self)
    }

    /// Reads traces for `frames` (relative to the window) as `[frames, rois]`.
    pub fn traces(
        &self,
        kind: TraceKind,
        frames: Range<usize>,
        roi_ids: Option<&[usize]>,
    ) -> Result<Array2<f64>> {
        let frames = self.absolute_frames(frames)?;
        let reader = self.decoder.reader()?;
        let key = self.config().trace_key(kind);

        match roi_ids {
            Some(ids) if !ids.is_empty() => {
                let ids = self.decoder.resolve_roi_ids(Some(ids))?;
                let mut traces = Array2::zeros((frames.len(), ids.len()));
                for (column, roi_id) in ids.into_iter().enumerate() {
                    let trace = reader.read_column(key, roi_id, frames.clone())?;
                    traces.index_axis_mut(Axis(1), column).assign(&trace);
                }
                Ok(traces)
            }
            _ => reader.read_2d(key, frames, 0..self.num_rois()),
        }
    }

    /// Overrides the frame timestamps; must cover every frame of the file.
    pub fn set_times(&mut self, times: Vec<f64>) -> Result<()> {
        if times.len() != self.num_frames {
            return Err(ConversionError::InvalidShape {
                name: "times".to_string(),
                found: vec![times.len()],
                reason: format!("expected one timestamp per frame ({})", self.num_frames),
            });
        }
        self.times = Some(times);
        Ok(())
    }

    pub fn has_time_vector(&self) -> bool {
        self.times.is_some()
    }

    /// Timestamps of `frames` (relative to the window), in seconds.
    pub fn frame_to_time(&self, frames: Range<usize>) -> Result<Vec<f64>> {
        let frames = self.absolute_frames(frames)?;
        Ok(match &self.times {
            Some(times) => times[frames].to_vec(),
            None => frames
                .map(|frame| frame as f64 / self.sampling_frequency)
                .collect(),
        })
    }

    fn absolute_frames(&self, frames: Range<usize>) -> Result<Range<usize>> {
        let num_frames = self.num_frames();
        if frames.start > frames.end || frames.end > num_frames {
            return Err(ConversionError::InvalidFrameRange {
                start: frames.start,
                end: frames.end,
                num_frames,
            });
        }
        let offset = self.frame_window.start;
        Ok(offset + frames.start..offset + frames.end)
    }

    pub fn close(&mut self) -> Result<()> {
        self.decoder.close()
    }
}
