pub mod logger;
pub mod nwb_pipeline;
