//! Imaging module
//!
//! Readers for the raw light-sheet volumes (one HDF5 file per volume) and the
//! downsampled TIFF projections.

mod types;
mod volume_extractor;
mod projection_extractor;
mod multi_extractor;


pub use types::{ImagingExtractor, Region};
pub use volume_extractor::VolumeImagingExtractor;
pub use projection_extractor::ProjectionImagingExtractor;
pub use multi_extractor::{MultiImagingExtractor, discover_volume_files, natural_sort};
