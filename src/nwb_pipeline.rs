//! NWB conversion pipeline module
//!
//! Readers for the Ahrens lab light-sheet sessions (segmentation, imaging and
//! behavior files), the NWB object model they are converted into, and the
//! pipelines that orchestrate the conversion.

pub mod common;
pub mod storage;
pub mod segmentation;
pub mod imaging;
pub mod behavior;
pub mod nwb;
pub mod conversions;

pub use common::{ConversionError, PipelineTimings, Result};

pub use storage::{DatasetReader, DatasetSource, MemorySource, MemoryStore};
#[cfg(feature = "hdf5")]
pub use storage::{Hdf5Source, Hdf5Store};

pub use segmentation::{
    PixelMask,
    SegmentationExtractor,
    SessionLayout,
    SparseRoiMaskDecoder,
    TraceKind,
    VoxelMaskEntry,
};

pub use imaging::{
    ImagingExtractor,
    MultiImagingExtractor,
    ProjectionImagingExtractor,
    Region,
    VolumeImagingExtractor,
};

pub use nwb::{NwbFile, NwbWriter};

pub use conversions::{
    ConversionConfig,
    ConversionConfigBuilder,
    Converter,
    DataInterface,
    ImagingToNwbPipeline,
    PlaneMetadata,
    SegmentationToNwbPipeline,
};
