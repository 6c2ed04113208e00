//! Downsampled ("projection") volumes stored as multi-page TIFF stacks.
//!
//! Each page is one plane of a single volume, so the extractor exposes one frame of
//! shape `(rows, cols, planes)`.

use std::fs::File;
use std::io::BufReader;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{Array3, Array4, Axis, s};
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::imaging::types::{ImagingExtractor, Region};
use crate::nwb_pipeline::segmentation::ImageShape;

pub struct ProjectionImagingExtractor {
    path: PathBuf,
    sampling_frequency: f64,
    region: Option<Region>,
    num_planes: usize,
    num_rows: usize,
    num_cols: usize,
}

impl ProjectionImagingExtractor {
    pub fn new(path: impl Into<PathBuf>, sampling_frequency: f64, region: Option<Region>) -> Result<Self> {
        let path = path.into();
        let mut decoder = open_decoder(&path)?;
        let (width, height) = decoder.dimensions().map_err(decode_error)?;

        let mut num_planes = 1;
        while decoder.more_images() {
            decoder.next_image().map_err(decode_error)?;
            if decoder.dimensions().map_err(decode_error)? != (width, height) {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "{}: page {} differs in size from the first page",
                    path.display(),
                    num_planes
                )));
            }
            num_planes += 1;
        }
        debug!(path = %path.display(), num_planes, width, height, "Opened TIFF stack");

        Self::with_shape(
            path,
            sampling_frequency,
            region,
            (num_planes, height as usize, width as usize),
        )
    }

    /// Skips scanning the stack when its `(planes, rows, cols)` shape is already known.
    pub fn with_shape(
        path: impl Into<PathBuf>,
        sampling_frequency: f64,
        region: Option<Region>,
        shape: (usize, usize, usize),
    ) -> Result<Self> {
        if !(sampling_frequency.is_finite() && sampling_frequency > 0.0) {
            return Err(ConversionError::InvalidSamplingFrequency(sampling_frequency));
        }
        let (num_planes, num_rows, num_cols) = shape;
        Ok(Self {
            path: path.into(),
            sampling_frequency,
            region,
            num_planes,
            num_rows,
            num_cols,
        })
    }

    pub fn num_planes(&self) -> usize {
        self.num_planes
    }

    /// Reads pages by index as `(pages, rows, cols)`; contiguous runs share one pass.
    pub fn planes(&self, indices: &[usize]) -> Result<Array3<u16>> {
        if let Some(&index) = indices.iter().find(|&&index| index >= self.num_planes) {
            return Err(ConversionError::InvalidFrameRange {
                start: index,
                end: index + 1,
                num_frames: self.num_planes,
            });
        }
        let contiguous = indices.windows(2).all(|pair| pair[1] == pair[0] + 1);
        match indices {
            [] => Ok(Array3::zeros((0, self.num_rows, self.num_cols))),
            [first, ..] if contiguous => self.read_plane_range(*first..*first + indices.len()),
            _ => {
                let mut planes = Array3::zeros((indices.len(), self.num_rows, self.num_cols));
                for (slot, &index) in indices.iter().enumerate() {
                    let plane = self.read_plane_range(index..index + 1)?;
                    planes
                        .index_axis_mut(Axis(0), slot)
                        .assign(&plane.index_axis(Axis(0), 0));
                }
                Ok(planes)
            }
        }
    }

    fn read_plane_range(&self, range: Range<usize>) -> Result<Array3<u16>> {
        let mut decoder = open_decoder(&self.path)?;
        for _ in 0..range.start {
            decoder.next_image().map_err(decode_error)?;
        }

        let plane_len = self.num_rows * self.num_cols;
        let mut data = Vec::with_capacity(range.len() * plane_len);
        for (offset, index) in range.clone().enumerate() {
            if offset > 0 {
                decoder.next_image().map_err(decode_error)?;
            }
            let page = match decoder.read_image().map_err(decode_error)? {
                DecodingResult::U16(values) => values,
                DecodingResult::U8(values) => values.into_iter().map(u16::from).collect(),
                _ => {
                    return Err(ConversionError::UnsupportedFormat(format!(
                        "{}: page {} is not 8- or 16-bit unsigned",
                        self.path.display(),
                        index
                    )));
                }
            };
            if page.len() != plane_len {
                return Err(ConversionError::UnsupportedFormat(format!(
                    "{}: page {} has {} samples, expected a single {}x{} channel",
                    self.path.display(),
                    index,
                    page.len(),
                    self.num_rows,
                    self.num_cols
                )));
            }
            data.extend_from_slice(&page);
        }

        Array3::from_shape_vec((range.len(), self.num_rows, self.num_cols), data).map_err(|e| {
            ConversionError::DecodeError(format!("{}: {}", self.path.display(), e))
        })
    }
}

impl ImagingExtractor for ProjectionImagingExtractor {
    fn image_size(&self) -> ImageShape {
        (
            Region::rows(self.region, self.num_rows).len(),
            self.num_cols,
            self.num_planes,
        )
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

        let all: Vec<usize> = (0..self.num_planes).collect();
        let stack = self.planes(&all)?;
        let rows = Region::rows(self.region, self.num_rows);
        let frame = stack
            .slice(s![.., rows, ..])
            .permuted_axes([1, 2, 0])
            .as_standard_layout()
            .into_owned();
        Ok(frame.insert_axis(Axis(0)))
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)
        .map_err(|e| ConversionError::InputReadError(format!("{}: {}", path.display(), e)))?;
    Decoder::new(BufReader::new(file)).map_err(decode_error)
}

fn decode_error(e: tiff::TiffError) -> ConversionError {
    ConversionError::DecodeError(e.to_string())
}
