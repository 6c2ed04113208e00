use tracing::{info, info_span};

use crate::nwb_pipeline::common::error::Result;
use crate::nwb_pipeline::common::timing::{PipelineTimings, Timer};
use crate::nwb_pipeline::nwb::NwbWriter;

/// One source of NWB objects (a segmentation, a behavior file, ...).
pub trait DataInterface {
    fn name(&self) -> &str;

    fn run_conversion(&self, writer: &mut dyn NwbWriter) -> Result<()>;
}

/// Runs data interfaces in insertion order against a single writer.
#[derive(Default)]
pub struct Converter {
    interfaces: Vec<Box<dyn DataInterface>>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(mut self, interface: impl DataInterface + 'static) -> Self {
        self.add_interface(interface);
        self
    }

    pub fn add_interface(&mut self, interface: impl DataInterface + 'static) {
        self.interfaces.push(Box::new(interface));
    }

    pub fn interface_names(&self) -> Vec<&str> {
        self.interfaces.iter().map(|interface| interface.name()).collect()
    }

    /// Stops at the first failing interface; objects already written stay written.
    pub fn run(&self, writer: &mut dyn NwbWriter) -> Result<PipelineTimings> {
        let mut timings = PipelineTimings::new();
        info!(interfaces = self.interfaces.len(), "Starting conversion");

        for interface in &self.interfaces {
            let _span = info_span!("interface", name = interface.name()).entered();
            let timer = Timer::start(interface.name());
            interface.run_conversion(writer)?;
            let (name, duration) = timer.stop();
            timings.add_step(name, duration);
        }

        info!(
            millis = timings.total_duration().as_secs_f64() * 1000.0,
            "Conversion complete"
        );
        Ok(timings)
    }
}
