use std::ops::Range;
use std::path::Path;

use ndarray::{Array1, Array2, Array3};

use crate::nwb_pipeline::common::error::{ConversionError, Result};

/// Read-only access to the named numeric datasets of one source file.
///
/// Numeric data is surfaced as `f64` regardless of the stored type, so integer
/// coordinate tables and floating-point tables go through the same code path.
/// Imaging volumes are the exception and keep their native `u16` samples.
pub trait DatasetReader {
    /// Whether a dataset exists at `name` (`/`-separated for nested groups).
    fn contains(&self, name: &str) -> bool;

    fn shape(&self, name: &str) -> Result<Vec<usize>>;

    /// Reads the `rows × cols` block of a 2-D dataset.
    fn read_2d(&self, name: &str, rows: Range<usize>, cols: Range<usize>) -> Result<Array2<f64>>;

    /// Reads a whole dataset of any rank, flattened in row-major order.
    fn read_flat(&self, name: &str) -> Result<Vec<f64>>;

    /// Reads a `(stacks, rows, cols)` volume, restricted to `rows` on the second axis.
    fn read_volume(&self, name: &str, rows: Range<usize>) -> Result<Array3<u16>>;

    /// Releases the underlying handle. Calling it again is a no-op.
    fn close(&mut self) -> Result<()>;

    fn read_column(&self, name: &str, column: usize, rows: Range<usize>) -> Result<Array1<f64>> {
        let block = self.read_2d(name, rows, column..column + 1)?;
        Ok(block.column(0).to_owned())
    }

    fn shape_2d(&self, name: &str) -> Result<(usize, usize)> {
        let shape = self.shape(name)?;
        match shape.as_slice() {
            [rows, cols] => Ok((*rows, *cols)),
            _ => Err(ConversionError::InvalidShape {
                name: name.to_string(),
                found: shape,
                reason: "expected a 2-D dataset".to_string(),
            }),
        }
    }
}

/// Opens dataset readers for files on demand.
///
/// Readers that touch many files (one volume per frame, one MAT file per activity
/// state) hold a source instead of open handles.
pub trait DatasetSource {
    type Reader: DatasetReader;

    fn open(&self, path: &Path) -> Result<Self::Reader>;

    fn exists(&self, path: &Path) -> bool;
}

pub(crate) fn check_range(name: &str, range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(ConversionError::InvalidShape {
            name: name.to_string(),
            found: vec![len],
            reason: format!("selection {}..{} is out of bounds", range.start, range.end),
        });
    }
    Ok(())
}
