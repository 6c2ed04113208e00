use ndarray::Array2;
use tracing::{info, instrument};

use crate::nwb_pipeline::behavior::{
    BEHAVIOR_MODULE, BEHAVIOR_MODULE_DESCRIPTION, check_sampling_frequency, read_vector,
};
use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::conversions::DataInterface;
use crate::nwb_pipeline::nwb::{
    AcquisitionObject, Compression, NwbDataInterface, NwbWriter, TimeSeries, Timing,
};
use crate::nwb_pipeline::storage::DatasetReader;

/// Sample scale of the nerve-root recordings is not known.
const SIGNAL_UNIT: &str = "a.u.";

/// One acquisition series built from one or more `rawdata/<key>` channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub series_name: String,
    pub description: String,
    pub keys: Vec<String>,
}

impl SignalSpec {
    pub fn new(series_name: impl Into<String>, description: impl Into<String>, keys: &[&str]) -> Self {
        Self {
            series_name: series_name.into(),
            description: description.into(),
            keys: keys.iter().map(|key| key.to_string()).collect(),
        }
    }

    /// Both ventral nerve root channels as one series.
    pub fn swim_signals() -> Self {
        Self::new(
            "SwimSignals",
            "Raw electrical signals recorded from the two ventral nerve roots.",
            &["ch1", "ch2"],
        )
    }
}

/// Raw behavior channels, written to acquisition with time zero at the first sample.
pub struct RawBehaviorInterface<R: DatasetReader> {
    reader: R,
    specs: Vec<SignalSpec>,
    sampling_frequency: f64,
    compression: Compression,
}

impl<R: DatasetReader> RawBehaviorInterface<R> {
    pub fn new(reader: R, specs: Vec<SignalSpec>, sampling_frequency: f64) -> Result<Self> {
        check_sampling_frequency(sampling_frequency)?;
        Ok(Self {
            reader,
            specs,
            sampling_frequency,
            compression: Compression::default(),
        })
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Series data is `[keys, samples]`; all keys must have the same length.
    pub fn series(&self, spec: &SignalSpec) -> Result<TimeSeries> {
        let mut channels = Vec::with_capacity(spec.keys.len());
        for key in &spec.keys {
            channels.push(read_vector(&self.reader, &format!("rawdata/{key}"))?);
        }

        let num_samples = channels.first().map_or(0, Vec::len);
        if let Some((key, channel)) = spec
            .keys
            .iter()
            .zip(&channels)
            .find(|(_, channel)| channel.len() != num_samples)
        {
            return Err(ConversionError::InvalidShape {
                name: format!("rawdata/{key}"),
                found: vec![channel.len()],
                reason: format!("expected {num_samples} samples like the other channels of `{}`", spec.series_name),
            });
        }

        let data = Array2::from_shape_vec((channels.len(), num_samples), channels.concat())
            .map_err(|e| ConversionError::DecodeError(e.to_string()))?;

        Ok(TimeSeries {
            name: spec.series_name.clone(),
            description: spec.description.clone(),
            data,
            unit: SIGNAL_UNIT.to_string(),
            timing: Timing::Rate {
                starting_time: 0.0,
                rate: self.sampling_frequency,
            },
            compression: self.compression,
        })
    }
}

impl<R: DatasetReader> DataInterface for RawBehaviorInterface<R> {
    fn name(&self) -> &str {
        "RawBehavior"
    }

    #[instrument(skip_all)]
    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        for spec in &self.specs {
            let series = self.series(spec)?;
            info!(name = %series.name, shape = ?series.data.shape(), "Adding raw behavior series");
            writer.add_acquisition(AcquisitionObject::TimeSeries(series))?;
        }
        Ok(())
    }
}

/// Filtered swim channels `data/fltCh1` and `data/fltCh2` as a `[samples, 2]` series.
pub struct ProcessedBehaviorInterface<R: DatasetReader> {
    reader: R,
    sampling_frequency: f64,
    compression: Compression,
}

impl<R: DatasetReader> ProcessedBehaviorInterface<R> {
    pub fn new(reader: R, sampling_frequency: f64) -> Result<Self> {
        check_sampling_frequency(sampling_frequency)?;
        Ok(Self {
            reader,
            sampling_frequency,
            compression: Compression::default(),
        })
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn filtered_signals(&self) -> Result<TimeSeries> {
        let first = read_vector(&self.reader, "data/fltCh1")?;
        let second = read_vector(&self.reader, "data/fltCh2")?;
        if first.len() != second.len() {
            return Err(ConversionError::InvalidShape {
                name: "data/fltCh2".to_string(),
                found: vec![second.len()],
                reason: format!("expected {} samples to match `data/fltCh1`", first.len()),
            });
        }

        let data = Array2::from_shape_fn((first.len(), 2), |(sample, channel)| {
            if channel == 0 { first[sample] } else { second[sample] }
        });

        Ok(TimeSeries {
            name: "FilteredSwimSignals".to_string(),
            description: "A filtered version of the raw SwimSignals in acquisition.".to_string(),
            data,
            unit: SIGNAL_UNIT.to_string(),
            timing: Timing::Rate {
                starting_time: 0.0,
                rate: self.sampling_frequency,
            },
            compression: self.compression,
        })
    }
}

impl<R: DatasetReader> DataInterface for ProcessedBehaviorInterface<R> {
    fn name(&self) -> &str {
        "ProcessedBehavior"
    }

    #[instrument(skip_all)]
    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let series = self.filtered_signals()?;
        info!(num_samples = series.data.nrows(), "Adding filtered swim signals");
        writer.add_to_processing_module(
            BEHAVIOR_MODULE,
            BEHAVIOR_MODULE_DESCRIPTION,
            NwbDataInterface::TimeSeries(series),
        )
    }
}
