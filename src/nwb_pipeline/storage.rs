//! Dataset storage module
//!
//! Format-agnostic access to the named arrays inside source files, with an
//! in-memory backend and an HDF5 backend behind the `hdf5` feature.

mod reader;
mod memory_store;
#[cfg(feature = "hdf5")]
mod hdf5_store;

pub use reader::{DatasetReader, DatasetSource};
pub use memory_store::{MemorySource, MemoryStore};
#[cfg(feature = "hdf5")]
pub use hdf5_store::{Hdf5Source, Hdf5Store};
