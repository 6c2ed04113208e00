use tracing::{info, info_span, instrument};

use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::common::timing::{PipelineTimings, Timer};
use crate::nwb_pipeline::conversions::config::{ConversionConfig, PlaneMetadata};
use crate::nwb_pipeline::conversions::converter::DataInterface;
use crate::nwb_pipeline::nwb::{
    ImageSegmentation, NwbDataInterface, NwbWriter, PlaneSegmentation, PlaneSegmentationRow,
    ResponseContainer, RoiResponseSeries, RoiTableRegion,
};
use crate::nwb_pipeline::segmentation::{SegmentationExtractor, TraceKind};
use crate::nwb_pipeline::storage::DatasetReader;

pub const OPHYS_MODULE: &str = "ophys";
pub const OPHYS_MODULE_DESCRIPTION: &str = "Processed optical physiology data.";

/// One segmented population and the names its objects get.
pub struct PlaneSource<R: DatasetReader> {
    pub extractor: SegmentationExtractor<R>,
    pub metadata: PlaneMetadata,
}

/// Converts one or more segmentations into the `ophys` processing module.
///
/// Single-color sessions have one plane; dual-color sessions a neuron and a glia plane.
pub struct SegmentationToNwbPipeline<R: DatasetReader> {
    planes: Vec<PlaneSource<R>>,
    config: ConversionConfig,
}

struct PlaneObjects {
    plane_segmentation: PlaneSegmentation,
    raw: RoiResponseSeries,
    dff: RoiResponseSeries,
}

impl<R: DatasetReader> SegmentationToNwbPipeline<R> {
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            planes: Vec::new(),
            config,
        }
    }

    pub fn with_plane(mut self, extractor: SegmentationExtractor<R>, metadata: PlaneMetadata) -> Self {
        self.add_plane(extractor, metadata);
        self
    }

    pub fn add_plane(&mut self, extractor: SegmentationExtractor<R>, metadata: PlaneMetadata) {
        self.planes.push(PlaneSource {
            extractor,
            metadata,
        });
    }

    pub fn planes(&self) -> &[PlaneSource<R>] {
        &self.planes
    }

    pub fn planes_mut(&mut self) -> &mut [PlaneSource<R>] {
        &mut self.planes
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ConversionConfig) {
        self.config = config;
    }

    #[instrument(skip_all, fields(planes = self.planes.len()))]
    pub fn convert(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let timings = self.convert_with_timings(writer)?;
        timings.log_summary();
        Ok(())
    }

    pub fn convert_with_timings(&self, writer: &mut dyn NwbWriter) -> Result<PipelineTimings> {
        let mut timings = PipelineTimings::new();
        info!(
            planes = self.planes.len(),
            stub_test = self.config.stub_test,
            "Starting segmentation to NWB conversion"
        );

        let mut objects = Vec::with_capacity(self.planes.len());
        for plane in &self.planes {
            let _span = info_span!("plane", name = %plane.metadata.plane_segmentation_name).entered();
            objects.push(self.convert_plane(plane, &mut timings)?);
        }

        let timer = Timer::start("write_nwb");
        {
            let _span = info_span!("write_nwb").entered();
            self.write(objects, writer)?;
        }
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        info!(
            millis = timings.total_duration().as_secs_f64() * 1000.0,
            "Segmentation conversion complete"
        );
        Ok(timings)
    }

    fn convert_plane(&self, plane: &PlaneSource<R>, timings: &mut PipelineTimings) -> Result<PlaneObjects> {
        let extractor = &plane.extractor;
        let metadata = &plane.metadata;
        let frames = 0..self.config.frame_limit(extractor.num_frames());

        let timer = Timer::start("plane_segmentation");
        let plane_segmentation = {
            let _span = info_span!("plane_segmentation", num_rois = extractor.num_rois()).entered();
            let masks = extractor.roi_pixel_masks(None)?;
            let mut centroids = self
                .config
                .include_roi_centroids
                .then(|| SegmentationExtractor::<R>::mask_centroids(&masks).into_iter());
            let rois = masks
                .into_iter()
                .enumerate()
                .map(|(id, voxel_mask)| PlaneSegmentationRow {
                    id,
                    voxel_mask,
                    centroid: centroids.as_mut().and_then(Iterator::next),
                })
                .collect();
            PlaneSegmentation {
                name: metadata.plane_segmentation_name.clone(),
                description: metadata.plane_segmentation_description.clone(),
                imaging_plane: metadata.imaging_plane.clone(),
                reference_images: None,
                rois,
            }
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        let timestamps = extractor.frame_to_time(frames.clone())?;
        let region = RoiTableRegion {
            plane_segmentation: metadata.plane_segmentation_name.clone(),
            region: plane_segmentation.roi_ids(),
            description: format!("All ROIs of {}.", metadata.plane_segmentation_name),
        };

        let timer = Timer::start("raw_traces");
        let raw = {
            let _span = info_span!("raw_traces", frames = frames.len()).entered();
            RoiResponseSeries {
                name: metadata.raw_series_name.clone(),
                description: "Raw baseline fluorescence of each ROI.".to_string(),
                data: extractor.traces(TraceKind::Raw, frames.clone(), None)?,
                rois: region.clone(),
                unit: self.config.trace_unit.clone(),
                timestamps: timestamps.clone(),
                compression: self.config.compression,
            }
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        let timer = Timer::start("dff_traces");
        let dff = {
            let _span = info_span!("dff_traces", frames = frames.len()).entered();
            RoiResponseSeries {
                name: metadata.dff_series_name.clone(),
                description: "Detrended change in fluorescence over baseline of each ROI.".to_string(),
                data: extractor.traces(TraceKind::Dff, frames, None)?,
                rois: region,
                unit: self.config.trace_unit.clone(),
                timestamps,
                compression: self.config.compression,
            }
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        Ok(PlaneObjects {
            plane_segmentation,
            raw,
            dff,
        })
    }

    fn write(&self, objects: Vec<PlaneObjects>, writer: &mut dyn NwbWriter) -> Result<()> {
        let mut segmentation = ImageSegmentation {
            name: "ImageSegmentation".to_string(),
            plane_segmentations: Vec::with_capacity(objects.len()),
        };
        let mut fluorescence = ResponseContainer {
            name: "Fluorescence".to_string(),
            roi_response_series: Vec::with_capacity(objects.len()),
        };
        let mut df_over_f = ResponseContainer {
            name: "DfOverF".to_string(),
            roi_response_series: Vec::with_capacity(objects.len()),
        };

        for plane in objects {
            segmentation.plane_segmentations.push(plane.plane_segmentation);
            fluorescence.roi_response_series.push(plane.raw);
            df_over_f.roi_response_series.push(plane.dff);
        }

        for object in [
            NwbDataInterface::ImageSegmentation(segmentation),
            NwbDataInterface::Fluorescence(fluorescence),
            NwbDataInterface::DfOverF(df_over_f),
        ] {
            writer.add_to_processing_module(OPHYS_MODULE, OPHYS_MODULE_DESCRIPTION, object)?;
        }
        Ok(())
    }
}

impl<R: DatasetReader> DataInterface for SegmentationToNwbPipeline<R> {
    fn name(&self) -> &str {
        "Segmentation"
    }

    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        self.convert(writer)
    }
}
