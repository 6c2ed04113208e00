use tracing::{info, instrument};

use crate::nwb_pipeline::behavior::{
    BEHAVIOR_MODULE, BEHAVIOR_MODULE_DESCRIPTION, check_sampling_frequency, read_vector, to_seconds,
};
use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::conversions::DataInterface;
use crate::nwb_pipeline::nwb::{
    AnnotatedEvents, ColumnData, EventType, NwbDataInterface, NwbWriter, TimeIntervals,
};
use crate::nwb_pipeline::storage::DatasetReader;

const SWIM_START_KEY: &str = "data/swimStartIndT";
const SWIM_END_KEY: &str = "data/swimEndIndT";
const SWIM_POWER_KEY: &str = "data/swimPower__";
const SWIM_WIDTH_KEY: &str = "data/swimWidth";
const BURST_KEY: &str = "data/burstBothIndT";

/// Swim bouts and burst events detected on the behavior channel.
///
/// Event positions are stored as sample indices of the behavior recording and are
/// converted to seconds with its sampling frequency.
pub struct SwimIntervalsInterface<R: DatasetReader> {
    reader: R,
    sampling_frequency: f64,
}

impl<R: DatasetReader> SwimIntervalsInterface<R> {
    pub fn new(reader: R, sampling_frequency: f64) -> Result<Self> {
        check_sampling_frequency(sampling_frequency)?;
        Ok(Self {
            reader,
            sampling_frequency,
        })
    }

    pub fn swim_intervals(&self) -> Result<TimeIntervals> {
        let starts = read_vector(&self.reader, SWIM_START_KEY)?;
        let stops = read_vector(&self.reader, SWIM_END_KEY)?;

        let mut intervals = TimeIntervals::from_bounds(
            "SwimIntervals",
            "Intervals of time when subject is estimated to be swimming.",
            to_seconds(&starts, self.sampling_frequency),
            to_seconds(&stops, self.sampling_frequency),
        )?;
        intervals.add_column(
            "power",
            "Estimated power of the swim event.",
            ColumnData::Float(read_vector(&self.reader, SWIM_POWER_KEY)?),
        )?;
        intervals.add_column(
            "width",
            "Estimated width spanned by the swim event.",
            ColumnData::Float(read_vector(&self.reader, SWIM_WIDTH_KEY)?),
        )?;
        Ok(intervals)
    }

    pub fn burst_events(&self) -> Result<AnnotatedEvents> {
        let bursts = read_vector(&self.reader, BURST_KEY)?;
        Ok(AnnotatedEvents {
            name: "BurstEvents".to_string(),
            description: "Events of classified bursting activity.".to_string(),
            event_types: vec![EventType {
                label: "bursts".to_string(),
                description: "Burst events.".to_string(),
                event_times: to_seconds(&bursts, self.sampling_frequency),
            }],
        })
    }
}

impl<R: DatasetReader> DataInterface for SwimIntervalsInterface<R> {
    fn name(&self) -> &str {
        "SwimIntervals"
    }

    #[instrument(skip_all)]
    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()> {
        let intervals = self.swim_intervals()?;
        let bursts = self.burst_events()?;
        info!(
            num_swims = intervals.len(),
            num_bursts = bursts.event_types[0].event_times.len(),
            "Adding swim intervals"
        );

        writer.add_to_processing_module(
            BEHAVIOR_MODULE,
            BEHAVIOR_MODULE_DESCRIPTION,
            NwbDataInterface::TimeIntervals(intervals),
        )?;
        writer.add_to_processing_module(
            BEHAVIOR_MODULE,
            BEHAVIOR_MODULE_DESCRIPTION,
            NwbDataInterface::AnnotatedEvents(bursts),
        )
    }
}
