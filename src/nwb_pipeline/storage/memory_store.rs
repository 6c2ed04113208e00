//! In-memory dataset backend.
//!
//! Holds already-materialised arrays under HDF5-style names. Used for tests and
//! for callers that assemble tables themselves before handing them to an extractor.

use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, Array3, Axis, s};
use tracing::debug;

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::storage::reader::{DatasetReader, DatasetSource, check_range};

#[derive(Debug, Clone)]
enum StoredDataset {
    Matrix(Array2<f64>),
    Volume(Array3<u16>),
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    datasets: HashMap<String, StoredDataset>,
    closed: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_matrix(mut self, name: impl Into<String>, data: Array2<f64>) -> Self {
        self.insert_matrix(name, data);
        self
    }

    pub fn with_volume(mut self, name: impl Into<String>, data: Array3<u16>) -> Self {
        self.insert_volume(name, data);
        self
    }

    /// Stores a 1-D series as a `(1, n)` row, the way MATLAB exports vectors.
    pub fn with_row(self, name: impl Into<String>, data: &[f64]) -> Self {
        let row = Array1::from(data.to_vec()).insert_axis(Axis(0));
        self.with_matrix(name, row)
    }

    pub fn insert_matrix(&mut self, name: impl Into<String>, data: Array2<f64>) {
        self.datasets.insert(name.into(), StoredDataset::Matrix(data));
    }

    pub fn insert_volume(&mut self, name: impl Into<String>, data: Array3<u16>) {
        self.datasets.insert(name.into(), StoredDataset::Volume(data));
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn get(&self, name: &str) -> Result<&StoredDataset> {
        if self.closed {
            return Err(ConversionError::ReaderClosed);
        }
        self.datasets
            .get(name)
            .ok_or_else(|| ConversionError::MissingDataset(name.to_string()))
    }

    fn matrix(&self, name: &str) -> Result<&Array2<f64>> {
        match self.get(name)? {
            StoredDataset::Matrix(data) => Ok(data),
            StoredDataset::Volume(data) => Err(ConversionError::InvalidShape {
                name: name.to_string(),
                found: data.shape().to_vec(),
                reason: "expected a 2-D dataset".to_string(),
            }),
        }
    }
}

impl DatasetReader for MemoryStore {
    fn contains(&self, name: &str) -> bool {
        !self.closed && self.datasets.contains_key(name)
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        Ok(match self.get(name)? {
            StoredDataset::Matrix(data) => data.shape().to_vec(),
            StoredDataset::Volume(data) => data.shape().to_vec(),
        })
    }

    fn read_2d(&self, name: &str, rows: Range<usize>, cols: Range<usize>) -> Result<Array2<f64>> {
        let data = self.matrix(name)?;
        check_range(name, &rows, data.nrows())?;
        check_range(name, &cols, data.ncols())?;
        Ok(data.slice(s![rows, cols]).to_owned())
    }

    fn read_flat(&self, name: &str) -> Result<Vec<f64>> {
        Ok(match self.get(name)? {
            StoredDataset::Matrix(data) => data.iter().copied().collect(),
            StoredDataset::Volume(data) => data.iter().map(|&v| f64::from(v)).collect(),
        })
    }

    fn read_volume(&self, name: &str, rows: Range<usize>) -> Result<Array3<u16>> {
        match self.get(name)? {
            StoredDataset::Volume(data) => {
                check_range(name, &rows, data.shape()[1])?;
                Ok(data.slice(s![.., rows, ..]).to_owned())
            }
            StoredDataset::Matrix(data) => Err(ConversionError::InvalidShape {
                name: name.to_string(),
                found: data.shape().to_vec(),
                reason: "expected a 3-D volume".to_string(),
            }),
        }
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            debug!(datasets = self.datasets.len(), "Closing in-memory store");
            self.closed = true;
        }
        Ok(())
    }
}

/// A set of in-memory "files" keyed by path; `open` hands out a fresh copy.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, MemoryStore>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, store: MemoryStore) -> Self {
        self.files.insert(path.into(), store);
        self
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }
}

impl DatasetSource for MemorySource {
    type Reader = MemoryStore;

    fn open(&self, path: &Path) -> Result<MemoryStore> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| ConversionError::InputReadError(format!("{}: no such file", path.display())))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
