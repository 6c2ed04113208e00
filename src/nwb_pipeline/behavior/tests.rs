#[cfg(test)]
mod tests {
    use ndarray::array;

    use crate::nwb_pipeline::behavior::{
        ActivityStatesInterface, BEHAVIOR_MODULE, ProcessedBehaviorInterface, RawBehaviorInterface,
        SignalSpec, SwimIntervalsInterface, TrialsInterface, frame_onset_timestamps,
        read_frame_onsets, trial_type_label,
    };
    use crate::nwb_pipeline::common::error::ConversionError;
    use crate::nwb_pipeline::conversions::DataInterface;
    use crate::nwb_pipeline::nwb::{
        AcquisitionObject, ColumnData, NwbDataInterface, NwbFile, NwbWriter, Timing,
    };
    use crate::nwb_pipeline::storage::{MemorySource, MemoryStore};

    fn swim_store() -> MemoryStore {
        MemoryStore::new()
            .with_row("data/swimStartIndT", &[100.0, 600.0])
            .with_row("data/swimEndIndT", &[200.0, 900.0])
            .with_row("data/swimPower__", &[1.5, 2.5])
            .with_row("data/swimWidth", &[3.0, 4.0])
            .with_row("data/burstBothIndT", &[50.0, 150.0, 250.0])
    }

    #[test]
    fn test_swim_intervals_in_seconds() {
        let interface = SwimIntervalsInterface::new(swim_store(), 100.0).unwrap();
        let intervals = interface.swim_intervals().unwrap();

        assert_eq!(intervals.name, "SwimIntervals");
        assert_eq!(intervals.start_time, vec![1.0, 6.0]);
        assert_eq!(intervals.stop_time, vec![2.0, 9.0]);
        assert_eq!(intervals.column("power"), Some(&ColumnData::Float(vec![1.5, 2.5])));
        assert_eq!(intervals.column("width"), Some(&ColumnData::Float(vec![3.0, 4.0])));

        let bursts = interface.burst_events().unwrap();
        assert_eq!(bursts.event_types.len(), 1);
        assert_eq!(bursts.event_types[0].label, "bursts");
        assert_eq!(bursts.event_types[0].event_times, vec![0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_swim_intervals_mismatched_columns() {
        let store = swim_store().with_row("data/swimWidth", &[3.0]);
        let interface = SwimIntervalsInterface::new(store, 100.0).unwrap();
        assert!(matches!(
            interface.swim_intervals(),
            Err(ConversionError::InvalidShape { .. })
        ));

        let store = swim_store().with_row("data/swimEndIndT", &[200.0]);
        let interface = SwimIntervalsInterface::new(store, 100.0).unwrap();
        assert!(matches!(
            interface.swim_intervals(),
            Err(ConversionError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_swim_intervals_written_to_behavior_module() {
        let interface = SwimIntervalsInterface::new(swim_store(), 100.0).unwrap();
        let mut nwb = NwbFile::new("test");
        interface.run_conversion(&mut nwb).unwrap();

        let module = nwb.processing_module(BEHAVIOR_MODULE).unwrap();
        assert!(matches!(module.get("SwimIntervals"), Some(NwbDataInterface::TimeIntervals(_))));
        assert!(matches!(module.get("BurstEvents"), Some(NwbDataInterface::AnnotatedEvents(_))));

        // a second run collides on names
        assert!(matches!(
            interface.run_conversion(&mut nwb),
            Err(ConversionError::WriteError(_))
        ));
    }

    #[test]
    fn test_rejects_bad_sampling_frequency() {
        assert!(matches!(
            SwimIntervalsInterface::new(swim_store(), 0.0),
            Err(ConversionError::InvalidSamplingFrequency(_))
        ));
        assert!(TrialsInterface::new(MemoryStore::new(), f64::NAN).is_err());
    }

    #[test]
    fn test_trials_labels() {
        let store = MemoryStore::new().with_matrix(
            "trial_info",
            array![
                [0.0, 500.0, 7.0, 1.0],
                [500.0, 1000.0, 7.0, 3.0],
                [1000.0, 1500.0, 7.0, 2.0]
            ],
        );
        let interface = TrialsInterface::new(store, 500.0).unwrap();
        let trials = interface.trials().unwrap();

        assert_eq!(trials.start_time, vec![0.0, 1.0, 2.0]);
        assert_eq!(trials.stop_time, vec![1.0, 2.0, 3.0]);
        assert_eq!(
            trials.column("trial_type"),
            Some(&ColumnData::Text(vec![
                "closed-loop".to_string(),
                "open-loop".to_string(),
                "other".to_string()
            ]))
        );

        let mut nwb = NwbFile::new("test");
        interface.run_conversion(&mut nwb).unwrap();
        assert_eq!(nwb.trials.as_ref().map(|t| t.len()), Some(3));
        assert!(nwb.set_trials(trials).is_err());
    }

    #[test]
    fn test_trial_type_label() {
        assert_eq!(trial_type_label(1.0), "closed-loop");
        assert_eq!(trial_type_label(3.0), "open-loop");
        assert_eq!(trial_type_label(0.0), "other");
        assert_eq!(trial_type_label(1.5), "other");
    }

    #[test]
    fn test_trials_need_two_columns() {
        let store = MemoryStore::new().with_matrix("trial_info", array![[1.0], [2.0]]);
        let interface = TrialsInterface::new(store, 1.0).unwrap();
        assert!(matches!(interface.trials(), Err(ConversionError::InvalidShape { .. })));
    }

    #[test]
    fn test_activity_states_sorted_by_start() {
        let source = MemorySource::new()
            .with_file(
                "states/ch1activeState.mat",
                MemoryStore::new()
                    .with_row("activeState/start", &[30.0, 10.0])
                    .with_row("activeState/end", &[40.0, 20.0]),
            )
            .with_file(
                "states/ch2passiveState.mat",
                MemoryStore::new()
                    .with_row("passiveState/start", &[0.0, 25.0])
                    .with_row("passiveState/end", &[5.0, 28.0]),
            );

        let interface = ActivityStatesInterface::new(source, "states", 10.0).unwrap();
        let states = interface.activity_states().unwrap();

        assert_eq!(states.start_time, vec![0.0, 1.0, 2.5, 3.0]);
        assert_eq!(states.stop_time, vec![0.5, 2.0, 2.8, 4.0]);
        assert_eq!(
            states.column("state_type"),
            Some(&ColumnData::Text(
                ["passive", "active", "passive", "active"].map(String::from).to_vec()
            ))
        );
    }

    #[test]
    fn test_activity_states_empty_folder() {
        let interface = ActivityStatesInterface::new(MemorySource::new(), "nothing", 10.0).unwrap();
        let states = interface.activity_states().unwrap();
        assert!(states.is_empty());
        assert_eq!(states.columns.len(), 1);
    }

    #[test]
    fn test_activity_states_mismatched_bounds() {
        let source = MemorySource::new().with_file(
            "s/ch1transientState.mat",
            MemoryStore::new()
                .with_row("transientState/start", &[1.0, 2.0])
                .with_row("transientState/end", &[3.0]),
        );
        let interface = ActivityStatesInterface::new(source, "s", 1.0).unwrap();
        assert!(matches!(
            interface.activity_states(),
            Err(ConversionError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_raw_behavior_stacks_keys() {
        let store = MemoryStore::new()
            .with_row("rawdata/ch1", &[1.0, 2.0, 3.0])
            .with_row("rawdata/ch2", &[4.0, 5.0, 6.0])
            .with_row("rawdata/stimParam1", &[7.0, 8.0, 9.0]);
        let specs = vec![
            SignalSpec::swim_signals(),
            SignalSpec::new("Stimulus", "Stimulus parameter.", &["stimParam1"]),
        ];
        let interface = RawBehaviorInterface::new(store, specs, 6000.0).unwrap();

        let mut nwb = NwbFile::new("test");
        interface.run_conversion(&mut nwb).unwrap();

        let Some(AcquisitionObject::TimeSeries(swim)) = nwb.acquisition("SwimSignals") else {
            panic!("missing SwimSignals");
        };
        assert_eq!(swim.data, array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(swim.unit, "a.u.");
        assert_eq!(
            swim.timing,
            Timing::Rate {
                starting_time: 0.0,
                rate: 6000.0
            }
        );

        let Some(AcquisitionObject::TimeSeries(stimulus)) = nwb.acquisition("Stimulus") else {
            panic!("missing Stimulus");
        };
        assert_eq!(stimulus.data.shape(), &[1, 3]);
    }

    #[test]
    fn test_raw_behavior_length_mismatch() {
        let store = MemoryStore::new()
            .with_row("rawdata/ch1", &[1.0, 2.0, 3.0])
            .with_row("rawdata/ch2", &[4.0, 5.0]);
        let interface = RawBehaviorInterface::new(store, Vec::new(), 6000.0).unwrap();
        assert!(matches!(
            interface.series(&SignalSpec::swim_signals()),
            Err(ConversionError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_processed_behavior_columns() {
        let store = MemoryStore::new()
            .with_row("data/fltCh1", &[0.1, 0.2, 0.3])
            .with_row("data/fltCh2", &[1.1, 1.2, 1.3]);
        let interface = ProcessedBehaviorInterface::new(store, 6000.0).unwrap();
        let series = interface.filtered_signals().unwrap();
        assert_eq!(series.data, array![[0.1, 1.1], [0.2, 1.2], [0.3, 1.3]]);

        let mut nwb = NwbFile::new("test");
        interface.run_conversion(&mut nwb).unwrap();
        let module = nwb.processing_module(BEHAVIOR_MODULE).unwrap();
        assert!(module.get("FilteredSwimSignals").is_some());
    }

    #[test]
    fn test_frame_onsets() {
        let tracker = [0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let onsets = frame_onset_timestamps(&tracker, 2.0).unwrap();
        assert_eq!(onsets, vec![0.5, 2.0]);

        assert!(frame_onset_timestamps(&[], 2.0).unwrap().is_empty());
        assert!(frame_onset_timestamps(&[1.0, 1.0], 2.0).unwrap().is_empty());
        assert!(frame_onset_timestamps(&tracker, -1.0).is_err());

        let store = MemoryStore::new().with_row("data/frame", &tracker);
        assert_eq!(read_frame_onsets(&store, 2.0).unwrap(), onsets);
    }
}
