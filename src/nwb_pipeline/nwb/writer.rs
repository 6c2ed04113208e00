use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::nwb::types::{AcquisitionObject, NwbDataInterface, TimeIntervals};

/// Destination for converted NWB objects.
pub trait NwbWriter {
    fn add_acquisition(&mut self, object: AcquisitionObject) -> Result<()>;

    /// Adds `object` to the processing module `module`, creating the module with
    /// `description` if it does not exist yet.
    fn add_to_processing_module(
        &mut self,
        module: &str,
        description: &str,
        object: NwbDataInterface,
    ) -> Result<()>;

    fn set_trials(&mut self, trials: TimeIntervals) -> Result<()>;
}
