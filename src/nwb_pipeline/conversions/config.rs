//! Conversion configuration types

use crate::nwb_pipeline::nwb::Compression;

/// Options shared by the conversion pipelines.
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Convert only the first `stub_frames` frames
    pub stub_test: bool,
    pub stub_frames: usize,
    /// Store the median voxel of each ROI next to its mask
    pub include_roi_centroids: bool,
    /// Filter applied to traces and imaging data
    pub compression: Compression,
    /// Unit written on ROI response series
    pub trace_unit: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            stub_test: false,
            stub_frames: 100,
            include_roi_centroids: false,
            compression: Compression::default(),
            trace_unit: "a.u.".to_string(),
        }
    }
}

impl ConversionConfig {
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder::default()
    }

    /// Number of frames to convert out of `num_frames`.
    pub fn frame_limit(&self, num_frames: usize) -> usize {
        if self.stub_test {
            num_frames.min(self.stub_frames)
        } else {
            num_frames
        }
    }
}

/// Builder for ConversionConfig
#[derive(Default)]
pub struct ConversionConfigBuilder {
    stub_test: Option<bool>,
    stub_frames: Option<usize>,
    include_roi_centroids: Option<bool>,
    compression: Option<Compression>,
    trace_unit: Option<String>,
}

impl ConversionConfigBuilder {
    pub fn stub_test(mut self, enable: bool) -> Self {
        self.stub_test = Some(enable);
        self
    }

    pub fn stub_frames(mut self, frames: usize) -> Self {
        self.stub_frames = Some(frames);
        self
    }

    pub fn include_roi_centroids(mut self, enable: bool) -> Self {
        self.include_roi_centroids = Some(enable);
        self
    }

    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = Some(compression);
        self
    }

    pub fn trace_unit(mut self, unit: impl Into<String>) -> Self {
        self.trace_unit = Some(unit.into());
        self
    }

    pub fn build(self) -> ConversionConfig {
        let default = ConversionConfig::default();
        ConversionConfig {
            stub_test: self.stub_test.unwrap_or(default.stub_test),
            stub_frames: self.stub_frames.unwrap_or(default.stub_frames),
            include_roi_centroids: self
                .include_roi_centroids
                .unwrap_or(default.include_roi_centroids),
            compression: self.compression.unwrap_or(default.compression),
            trace_unit: self.trace_unit.unwrap_or(default.trace_unit),
        }
    }
}

/// Names given to the NWB objects of one imaged cell population.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneMetadata {
    pub plane_segmentation_name: String,
    pub plane_segmentation_description: String,
    pub imaging_plane: String,
    pub raw_series_name: String,
    pub dff_series_name: String,
    pub imaging_series_name: String,
}

impl PlaneMetadata {
    /// Names suffixed with `label`, e.g. `PlaneSegmentationNeuron`.
    pub fn labelled(label: &str, population: &str) -> Self {
        Self {
            plane_segmentation_name: format!("PlaneSegmentation{label}"),
            plane_segmentation_description: format!("Segmented {population} ROIs."),
            imaging_plane: format!("ImagingPlane{label}"),
            raw_series_name: format!("RoiResponseSeries{label}"),
            dff_series_name: format!("DffSeries{label}"),
            imaging_series_name: format!("TwoPhotonSeries{label}"),
        }
    }

    pub fn neuron() -> Self {
        Self::labelled("Neuron", "neuron")
    }

    pub fn glia() -> Self {
        Self::labelled("Glia", "glial cell")
    }
}
