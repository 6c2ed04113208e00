use tracing::debug;

use crate::nwb_pipeline::behavior::{check_sampling_frequency, read_vector};
use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::storage::DatasetReader;

const FRAME_TRACKER_KEY: &str = "data/frame";

/// Imaging frame onsets in seconds of the behavior clock.
///
/// An onset is a sample `i` with `tracker[i + 1] != tracker[i]`. The last change
/// closes the final frame and is not an onset.
pub fn frame_onset_timestamps(frame_tracker: &[f64], rate: f64) -> Result<Vec<f64>> {
    check_sampling_frequency(rate)?;

    let mut onsets: Vec<f64> = frame_tracker
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] != pair[1])
        .map(|(index, _)| index as f64 / rate)
        .collect();
    onsets.pop();

    debug!(samples = frame_tracker.len(), frames = onsets.len(), "Computed frame onsets");
    Ok(onsets)
}

/// Reads the frame tracker channel of a behavior file and computes frame onsets.
pub fn read_frame_onsets<R: DatasetReader>(reader: &R, rate: f64) -> Result<Vec<f64>> {
    let tracker = read_vector(reader, FRAME_TRACKER_KEY)?;
    frame_onset_timestamps(&tracker, rate)
}
