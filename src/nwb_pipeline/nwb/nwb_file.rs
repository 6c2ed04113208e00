use serde::Serialize;
use tracing::debug;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::nwb::types::{
    AcquisitionObject, NwbDataInterface, ProcessingModule, TimeIntervals,
};
use crate::nwb_pipeline::nwb::writer::NwbWriter;

/// In-memory NWB file; collects everything the interfaces produce.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NwbFile {
    pub session_description: String,
    pub acquisition: Vec<AcquisitionObject>,
    pub processing: Vec<ProcessingModule>,
    pub trials: Option<TimeIntervals>,
}

impl NwbFile {
    pub fn new(session_description: impl Into<String>) -> Self {
        Self {
            session_description: session_description.into(),
            ..Self::default()
        }
    }

    pub fn acquisition(&self, name: &str) -> Option<&AcquisitionObject> {
        self.acquisition.iter().find(|object| object.name() == name)
    }

    pub fn processing_module(&self, name: &str) -> Option<&ProcessingModule> {
        self.processing.iter().find(|module| module.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConversionError::WriteError(e.to_string()))
    }
}

impl NwbWriter for NwbFile {
    fn add_acquisition(&mut self, object: AcquisitionObject) -> Result<()> {
        if self.acquisition(object.name()).is_some() {
            return Err(ConversionError::WriteError(format!(
                "acquisition `{}` already exists",
                object.name()
            )));
        }
        debug!(name = object.name(), "Adding acquisition");
        self.acquisition.push(object);
        Ok(())
    }

    fn add_to_processing_module(
        &mut self,
        module: &str,
        description: &str,
        object: NwbDataInterface,
    ) -> Result<()> {
        let index = match self.processing.iter().position(|m| m.name == module) {
            Some(index) => index,
            None => {
                self.processing.push(ProcessingModule {
                    name: module.to_string(),
                    description: description.to_string(),
                    data_interfaces: Vec::new(),
                });
                self.processing.len() - 1
            }
        };

        let target = &mut self.processing[index];
        if target.get(object.name()).is_some() {
            return Err(ConversionError::WriteError(format!(
                "`{}` already exists in processing module `{}`",
                object.name(),
                module
            )));
        }
        debug!(module, name = object.name(), "Adding to processing module");
        target.data_interfaces.push(object);
        Ok(())
    }

    fn set_trials(&mut self, trials: TimeIntervals) -> Result<()> {
        if self.trials.is_some() {
            return Err(ConversionError::WriteError("trials table already set".to_string()));
        }
        debug!(num_trials = trials.len(), "Setting trials");
        self.trials = Some(trials);
        Ok(())
    }
}
