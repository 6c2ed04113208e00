use tracing::{info, info_span, instrument};

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::common::timing::{PipelineTimings, Timer};
use crate::nwb_pipeline::conversions::config::{ConversionConfig, PlaneMetadata};
use crate::nwb_pipeline::conversions::converter::DataInterface;
use crate::nwb_pipeline::imaging::ImagingExtractor;
use crate::nwb_pipeline::nwb::{AcquisitionObject, NwbWriter, Timing, TwoPhotonSeries};

/// Writes raw volumes as a `TwoPhotonSeries` in acquisition.
pub struct ImagingToNwbPipeline {
    extractor: Box<dyn ImagingExtractor>,
    metadata: PlaneMetadata,
    config: ConversionConfig,
    timestamps: Option<Vec<f64>>,
}

impl ImagingToNwbPipeline {
    pub fn new(
        extractor: Box<dyn ImagingExtractor>,
        metadata: PlaneMetadata,
        config: ConversionConfig,
    ) -> Self {
        Self {
            extractor,
            metadata,
            config,
            timestamps: None,
        }
    }

    /// Uses synchronised frame times instead of a constant rate.
    ///
    /// Extra trailing timestamps are dropped; fewer than the number of frames is an error.
    pub fn set_times(&mut self, mut timestamps: Vec<f64>) -> Result<()> {
        let num_frames = self.extractor.num_frames();
        if timestamps.len() < num_frames {
            return Err(ConversionError::InvalidShape {
                name: "timestamps".to_string(),
                found: vec![timestamps.len()],
                reason: format!("expected at least one timestamp per frame ({num_frames})"),
            });
        }
        timestamps.truncate(num_frames);
        self.timestamps = Some(timestamps);
        Ok(())
    }

    pub fn extractor(&self) -> &dyn ImagingExtractor {
        self.extractor.as_ref()
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    #[instrument(skip_all, fields(series = %self.metadata.imaging_series_name))]
    pub fn convert(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let timings = self.convert_with_timings(writer)?;
        timings.log_summary();
        Ok(())
    }

    pub fn convert_with_timings(&self, writer: &mut dyn NwbWriter) -> Result<PipelineTimings> {
        let mut timings = PipelineTimings::new();
        let frames = 0..self.config.frame_limit(self.extractor.num_frames());
        info!(
            frames = frames.len(),
            image_size = ?self.extractor.image_size(),
            "Starting imaging to NWB conversion"
        );

        let timer = Timer::start("read_video");
        let data = {
            let _span = info_span!("read_video", frames = frames.len()).entered();
            self.extractor.video(frames.clone())?
        };
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        let timing = match &self.timestamps {
            Some(times) => Timing::Timestamps(times[frames].to_vec()),
            None => Timing::Rate {
                starting_time: 0.0,
                rate: self.extractor.sampling_frequency(),
            },
        };

        let timer = Timer::start("write_nwb");
        {
            let _span = info_span!("write_nwb").entered();
            writer.add_acquisition(AcquisitionObject::TwoPhotonSeries(TwoPhotonSeries {
                name: self.metadata.imaging_series_name.clone(),
                imaging_plane: self.metadata.imaging_plane.clone(),
                data,
                timing,
                compression: self.config.compression,
            }))?;
        }
        let (name, duration) = timer.stop();
        timings.add_step(name, duration);

        Ok(timings)
    }
}

impl DataInterface for ImagingToNwbPipeline {
    fn name(&self) -> &str {
        &self.metadata.imaging_series_name
    }

    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        self.convert(writer)
    }
}
