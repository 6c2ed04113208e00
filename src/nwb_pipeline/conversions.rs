//! Pipeline conversions module
//!
//! Orchestration of the conversion into the NWB model: configuration, the
//! segmentation and imaging pipelines, and the converter that runs every data
//! interface against one writer.

mod config;
mod converter;
mod segmentation_to_nwb;
mod imaging_to_nwb;


pub use config::{ConversionConfig, ConversionConfigBuilder, PlaneMetadata};
pub use converter::{Converter, DataInterface};
pub use segmentation_to_nwb::{
    OPHYS_MODULE, OPHYS_MODULE_DESCRIPTION, PlaneSource, SegmentationToNwbPipeline,
};
pub use imaging_to_nwb::ImagingToNwbPipeline;
