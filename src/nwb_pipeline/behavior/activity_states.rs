use std::path::PathBuf;

use tracing::{debug, info, instrument};

use crate::nwb_pipeline::behavior::{
    BEHAVIOR_MODULE, BEHAVIOR_MODULE_DESCRIPTION, check_sampling_frequency, to_seconds,
};
use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::conversions::DataInterface;
use crate::nwb_pipeline::nwb::{ColumnData, NwbDataInterface, NwbWriter, TimeIntervals};
use crate::nwb_pipeline::storage::{DatasetReader, DatasetSource};

const CHANNELS: [&str; 2] = ["ch1", "ch2"];
const STATES: [&str; 3] = ["active", "passive", "transient"];

/// Classified activity states, one optional MAT file per channel and state
/// (`ch1activeState.mat`, `ch2transientState.mat`, ...).
pub struct ActivityStatesInterface<S: DatasetSource> {
    source: S,
    folder: PathBuf,
    sampling_frequency: f64,
}

impl<S: DatasetSource> ActivityStatesInterface<S> {
    pub fn new(source: S, folder: impl Into<PathBuf>, sampling_frequency: f64) -> Result<Self> {
        check_sampling_frequency(sampling_frequency)?;
        Ok(Self {
            source,
            folder: folder.into(),
            sampling_frequency,
        })
    }

    /// All states found in the folder as one table sorted by start time.
    pub fn activity_states(&self) -> Result<TimeIntervals> {
        let mut rows: Vec<(f64, f64, &str)> = Vec::new();

        for channel in CHANNELS {
            for state in STATES {
                let group = format!("{state}State");
                let path = self.folder.join(format!("{channel}{group}.mat"));
                if !self.source.exists(&path) {
                    debug!(path = %path.display(), "No state file");
                    continue;
                }

                let mut reader = self.source.open(&path)?;
                let bounds = Self::read_bounds(&reader, &group);
                reader.close()?;
                let (starts, stops) = bounds?;

                debug!(channel, state, count = starts.len(), "Read activity states");
                rows.extend(
                    to_seconds(&starts, self.sampling_frequency)
                        .into_iter()
                        .zip(to_seconds(&stops, self.sampling_frequency))
                        .map(|(start, stop)| (start, stop, state)),
                );
            }
        }

        rows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut intervals = TimeIntervals::from_bounds(
            "ActivityStates",
            "Classified periods of activity (passive, active, or transient).",
            rows.iter().map(|row| row.0).collect(),
            rows.iter().map(|row| row.1).collect(),
        )?;
        intervals.add_column(
            "state_type",
            "The type of classified state.",
            ColumnData::Text(rows.iter().map(|row| row.2.to_string()).collect()),
        )?;
        Ok(intervals)
    }

    fn read_bounds(reader: &S::Reader, group: &str) -> Result<(Vec<f64>, Vec<f64>)> {
        let start_key = format!("{group}/start");
        let end_key = format!("{group}/end");
        let starts = reader.read_flat(&start_key)?;
        let stops = reader.read_flat(&end_key)?;
        if starts.len() != stops.len() {
            return Err(ConversionError::InvalidShape {
                name: end_key,
                found: vec![stops.len()],
                reason: format!("expected {} entries to match `{}`", starts.len(), start_key),
            });
        }
        Ok((starts, stops))
    }
}

impl<S: DatasetSource> DataInterface for ActivityStatesInterface<S> {
    fn name(&self) -> &str {
        "ActivityStates"
    }

    #[instrument(skip_all, fields(folder = %self.folder.display()))]
    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let states = self.activity_states()?;
        info!(num_states = states.len(), "Adding activity states");
        writer.add_to_processing_module(
            BEHAVIOR_MODULE,
            BEHAVIOR_MODULE_DESCRIPTION,
            NwbDataInterface::TimeIntervals(states),
        )
    }
}
