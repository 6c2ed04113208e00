use tracing::{info, instrument};

use crate::nwb_pipeline::behavior::check_sampling_frequency;
use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::conversions::DataInterface;
use crate::nwb_pipeline::nwb::{ColumnData, NwbWriter, TimeIntervals};
use crate::nwb_pipeline::storage::DatasetReader;

const TRIAL_INFO_KEY: &str = "trial_info";

/// Label for a numeric trial type code.
///
/// Only codes 1 and 3 have a known meaning; the mapping is unconfirmed.
pub fn trial_type_label(code: f64) -> &'static str {
    if code == 1.0 {
        "closed-loop"
    } else if code == 3.0 {
        "open-loop"
    } else {
        "other"
    }
}

/// Trial table from a `trial_info` matrix `[n_trials, k]`.
///
/// Column 0 holds start indices, column 1 stop indices and the last column the type code.
pub struct TrialsInterface<R: DatasetReader> {
    reader: R,
    sampling_frequency: f64,
}

impl<R: DatasetReader> TrialsInterface<R> {
    pub fn new(reader: R, sampling_frequency: f64) -> Result<Self> {
        check_sampling_frequency(sampling_frequency)?;
        Ok(Self {
            reader,
            sampling_frequency,
        })
    }

    pub fn trials(&self) -> Result<TimeIntervals> {
        let (num_trials, num_columns) = self.reader.shape_2d(TRIAL_INFO_KEY)?;
        if num_columns < 2 {
            return Err(ConversionError::InvalidShape {
                name: TRIAL_INFO_KEY.to_string(),
                found: vec![num_trials, num_columns],
                reason: "expected at least start and stop columns".to_string(),
            });
        }

        let table = self.reader.read_2d(TRIAL_INFO_KEY, 0..num_trials, 0..num_columns)?;
        let fs = self.sampling_frequency;
        let starts = table.column(0).iter().map(|v| v / fs).collect();
        let stops = table.column(1).iter().map(|v| v / fs).collect();
        let labels = table
            .column(num_columns - 1)
            .iter()
            .map(|&code| trial_type_label(code).to_string())
            .collect();

        let mut trials = TimeIntervals::from_bounds("trials", "Experimental trials.", starts, stops)?;
        trials.add_column(
            "trial_type",
            "Closed-loop, open-loop, or other.",
            ColumnData::Text(labels),
        )?;
        Ok(trials)
    }
}

impl<R: DatasetReader> DataInterface for TrialsInterface<R> {
    fn name(&self) -> &str {
        "Trials"
    }

    #[instrument(skip_all)]
    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let trials = self.trials()?;
        info!(num_trials = trials.len(), "Adding trials");
        writer.set_trials(trials)
    }
}
