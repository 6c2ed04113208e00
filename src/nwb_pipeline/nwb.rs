//! NWB module
//!
//! The NWB object model produced by the conversion, the writer seam, and an
//! in-memory file implementing it.

pub mod types;
mod writer;
mod nwb_file;

pub use types::{
    AcquisitionObject, AnnotatedEvents, ColumnData, Compression, EventType, ImageSegmentation,
    IntervalColumn, NwbDataInterface, PlaneSegmentation, PlaneSegmentationRow, ProcessingModule,
    ResponseContainer, RoiResponseSeries, RoiTableRegion, TimeIntervals, TimeSeries, Timing,
    TwoPhotonSeries,
};
pub use writer::NwbWriter;
pub use nwb_file::NwbFile;
