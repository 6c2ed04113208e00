use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{Array4, Axis, concatenate};
use tracing::info;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::imaging::types::ImagingExtractor;
use crate::nwb_pipeline::segmentation::ImageShape;

/// Chains per-file extractors into one series, in the order given.
pub struct MultiImagingExtractor {
    extractors: Vec<Box<dyn ImagingExtractor>>,
    image_size: ImageShape,
    sampling_frequency: f64,
    num_frames: usize,
}

impl MultiImagingExtractor {
    pub fn new(extractors: Vec<Box<dyn ImagingExtractor>>) -> Result<Self> {
        let first = extractors.first().ok_or_else(|| {
            ConversionError::InputReadError("no imaging files to combine".to_string())
        })?;
        let image_size = first.image_size();
        let sampling_frequency = first.sampling_frequency();

        for (index, extractor) in extractors.iter().enumerate() {
            if extractor.image_size() != image_size {
                let (d0, d1, d2) = extractor.image_size();
                return Err(ConversionError::InvalidShape {
                    name: format!("imaging segment {}", index),
                    found: vec![d0, d1, d2],
                    reason: format!("every segment must share image size {:?}", image_size),
                });
            }
            if extractor.sampling_frequency() != sampling_frequency {
                return Err(ConversionError::InvalidSamplingFrequency(
                    extractor.sampling_frequency(),
                ));
            }
        }

        let num_frames = extractors.iter().map(|e| e.num_frames()).sum();
        info!(segments = extractors.len(), num_frames, "Combined imaging segments");
        Ok(Self {
            extractors,
            image_size,
            sampling_frequency,
            num_frames,
        })
    }

    pub fn num_segments(&self) -> usize {
        self.extractors.len()
    }
}

impl ImagingExtractor for MultiImagingExtractor {
    fn image_size(&self) -> ImageShape {
        self.image_size
    }

    fn num_frames(&self) -> usize {
        self.num_frames
    }

    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn video(&self, frames: Range<usize>) -> Result<Array4<u16>> {
        if frames.start > frames.end || frames.end > self.num_frames {
            return Err(ConversionError::InvalidFrameRange {
                start: frames.start,
                end: frames.end,
                num_frames: self.num_frames,
            });
        }

        let mut parts = Vec::new();
        let mut segment_start = 0;
        for extractor in &self.extractors {
            let segment_end = segment_start + extractor.num_frames();
            let start = frames.start.max(segment_start);
            let end = frames.end.min(segment_end);
            if start < end {
                parts.push(extractor.video(start - segment_start..end - segment_start)?);
            }
            segment_start = segment_end;
        }

        if parts.is_empty() {
            let (d0, d1, d2) = self.image_size;
            return Ok(Array4::zeros((0, d0, d1, d2)));
        }
        let views: Vec<_> = parts.iter().map(|part| part.view()).collect();
        concatenate(Axis(0), &views).map_err(|e| ConversionError::InvalidShape {
            name: "imaging video".to_string(),
            found: vec![frames.len()],
            reason: e.to_string(),
        })
    }
}

/// Lists the `.h5` files of a folder in natural order (`2` before `10`).
pub fn discover_volume_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(folder).map_err(|e| {
        ConversionError::InputReadError(format!("{}: {}", folder.display(), e))
    })? {
        let path = entry?.path();
        if path.is_file() && has_h5_suffix(&path) {
            files.push(path);
        }
    }
    natural_sort(&mut files);
    Ok(files)
}

/// Any `.h5` suffix counts, so `frame_0.h5.bak` style names are picked up too.
fn has_h5_suffix(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.split('.').skip(1).any(|suffix| suffix == "h5"))
}

/// Orders paths with digit runs compared by value, so `frame_2` sorts before `frame_10`.
pub fn natural_sort(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
}
