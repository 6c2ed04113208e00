//! Behavior module
//!
//! Behavioral recordings that accompany the imaging: swim bouts and bursts, trial
//! structure, classified activity states, raw and filtered nerve-root signals and
//! the frame-synchronisation channel.

mod swim_intervals;
mod trials;
mod activity_states;
mod signals;
mod sync;

#[cfg(test)]
mod tests;

pub use swim_intervals::SwimIntervalsInterface;
pub use trials::{TrialsInterface, trial_type_label};
pub use activity_states::ActivityStatesInterface;
pub use signals::{ProcessedBehaviorInterface, RawBehaviorInterface, SignalSpec};
pub use sync::{frame_onset_timestamps, read_frame_onsets};

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::storage::DatasetReader;

pub const BEHAVIOR_MODULE: &str = "behavior";
pub const BEHAVIOR_MODULE_DESCRIPTION: &str = "Processed behavioral data.";

/// Reads a MATLAB vector, stored either 1-D or as a `(1, n)` row.
pub(crate) fn read_vector<R: DatasetReader>(reader: &R, name: &str) -> Result<Vec<f64>> {
    let shape = reader.shape(name)?;
    match shape.as_slice() {
        [_] => reader.read_flat(name),
        [rows, cols] if *rows >= 1 => {
            Ok(reader.read_2d(name, 0..1, 0..*cols)?.iter().copied().collect())
        }
        _ => Err(ConversionError::InvalidShape {
            name: name.to_string(),
            found: shape,
            reason: "expected a vector or a row matrix".to_string(),
        }),
    }
}

pub(crate) fn check_sampling_frequency(rate: f64) -> Result<()> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(ConversionError::InvalidSamplingFrequency(rate))
    }
}

pub(crate) fn to_seconds(indices: &[f64], rate: f64) -> Vec<f64> {
    indices.iter().map(|index| index / rate).collect()
}
