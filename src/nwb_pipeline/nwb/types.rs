//! NWB-shaped object model.
//!
//! Mirrors the subset of the NWB schema this dataset populates: ophys segmentation
//! and response series, raw imaging, behavioral time series, interval tables and
//! annotated events.

use ndarray::{Array2, Array4};
use serde::Serialize;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::segmentation::{PixelMask, RoiCentroid};

/// Dataset filter requested for large arrays when they reach the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    None,
    /// gzip with a level in 0..=9
    Gzip(u8),
}

impl Default for Compression {
    fn default() -> Self {
        Compression::Gzip(4)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaneSegmentationRow {
    pub id: usize,
    pub voxel_mask: PixelMask,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centroid: Option<RoiCentroid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaneSegmentation {
    pub name: String,
    pub description: String,
    pub imaging_plane: String,
    pub reference_images: Option<String>,
    pub rois: Vec<PlaneSegmentationRow>,
}

impl PlaneSegmentation {
    pub fn roi_ids(&self) -> Vec<usize> {
        self.rois.iter().map(|row| row.id).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageSegmentation {
    pub name: String,
    pub plane_segmentations: Vec<PlaneSegmentation>,
}

/// Reference to rows of a plane segmentation.
#[derive(Debug, Clone, Serialize)]
pub struct RoiTableRegion {
    pub plane_segmentation: String,
    pub region: Vec<usize>,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoiResponseSeries {
    pub name: String,
    pub description: String,
    /// `[frames, rois]`
    pub data: Array2<f64>,
    pub rois: RoiTableRegion,
    pub unit: String,
    pub timestamps: Vec<f64>,
    pub compression: Compression,
}

/// Container for response series (`Fluorescence` or `DfOverF`).
#[derive(Debug, Clone, Serialize)]
pub struct ResponseContainer {
    pub name: String,
    pub roi_response_series: Vec<RoiResponseSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Timing {
    Rate { starting_time: f64, rate: f64 },
    Timestamps(Vec<f64>),
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeSeries {
    pub name: String,
    pub description: String,
    pub data: Array2<f64>,
    pub unit: String,
    pub timing: Timing,
    pub compression: Compression,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwoPhotonSeries {
    pub name: String,
    pub imaging_plane: String,
    /// `[frames, d0, d1, d2]`
    pub data: Array4<u16>,
    pub timing: Timing,
    pub compression: Compression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ColumnData {
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntervalColumn {
    pub name: String,
    pub description: String,
    pub data: ColumnData,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeIntervals {
    pub name: String,
    pub description: String,
    pub start_time: Vec<f64>,
    pub stop_time: Vec<f64>,
    pub columns: Vec<IntervalColumn>,
}

impl TimeIntervals {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            start_time: Vec::new(),
            stop_time: Vec::new(),
            columns: Vec::new(),
        }
    }

    /// Builds the table from parallel start/stop vectors.
    pub fn from_bounds(
        name: impl Into<String>,
        description: impl Into<String>,
        start_time: Vec<f64>,
        stop_time: Vec<f64>,
    ) -> Result<Self> {
        let mut intervals = Self::new(name, description);
        if start_time.len() != stop_time.len() {
            return Err(ConversionError::InvalidShape {
                name: format!("{}.stop_time", intervals.name),
                found: vec![stop_time.len()],
                reason: format!("expected {} stop times to match start times", start_time.len()),
            });
        }
        intervals.start_time = start_time;
        intervals.stop_time = stop_time;
        Ok(intervals)
    }

    pub fn len(&self) -> usize {
        self.start_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start_time.is_empty()
    }

    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        data: ColumnData,
    ) -> Result<()> {
        let name = name.into();
        if data.len() != self.len() {
            return Err(ConversionError::InvalidShape {
                name: format!("{}.{}", self.name, name),
                found: vec![data.len()],
                reason: format!("expected one value per interval ({})", self.len()),
            });
        }
        self.columns.push(IntervalColumn {
            name,
            description: description.into(),
            data,
        });
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|column| column.name == name)
            .map(|column| &column.data)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventType {
    pub label: String,
    pub description: String,
    pub event_times: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedEvents {
    pub name: String,
    pub description: String,
    pub event_types: Vec<EventType>,
}

/// Objects stored inside a processing module.
#[derive(Debug, Clone, Serialize)]
pub enum NwbDataInterface {
    ImageSegmentation(ImageSegmentation),
    Fluorescence(ResponseContainer),
    DfOverF(ResponseContainer),
    TimeSeries(TimeSeries),
    TimeIntervals(TimeIntervals),
    AnnotatedEvents(AnnotatedEvents),
}

impl NwbDataInterface {
    pub fn name(&self) -> &str {
        match self {
            NwbDataInterface::ImageSegmentation(object) => &object.name,
            NwbDataInterface::Fluorescence(object) => &object.name,
            NwbDataInterface::DfOverF(object) => &object.name,
            NwbDataInterface::TimeSeries(object) => &object.name,
            NwbDataInterface::TimeIntervals(object) => &object.name,
            NwbDataInterface::AnnotatedEvents(object) => &object.name,
        }
    }
}

/// Objects stored under `/acquisition`.
#[derive(Debug, Clone, Serialize)]
pub enum AcquisitionObject {
    TimeSeries(TimeSeries),
    TwoPhotonSeries(TwoPhotonSeries),
}

impl AcquisitionObject {
    pub fn name(&self) -> &str {
        match self {
            AcquisitionObject::TimeSeries(series) => &series.name,
            AcquisitionObject::TwoPhotonSeries(series) => &series.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingModule {
    pub name: String,
    pub description: String,
    pub data_interfaces: Vec<NwbDataInterface>,
}

impl ProcessingModule {
    pub fn get(&self, name: &str) -> Option<&NwbDataInterface> {
        self.data_interfaces.iter().find(|object| object.name() == name)
    }
}
