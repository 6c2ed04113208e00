//! HDF5 dataset backend.
//!
//! MATLAB v7.3 `.mat` files are HDF5 containers, so segmentation tables, behavior
//! files and per-frame imaging volumes all go through this reader.

use std::ops::Range;
use std::path::{Path, PathBuf};

use hdf5::File as H5File;
use ndarray::{Array2, Array3, Ix3, s};
use tracing::{debug, warn};

use crate::nwb_pipeline::common::error::{ConversionError, Result};
use crate::nwb_pipeline::storage::reader::{DatasetReader, DatasetSource, check_range};

pub struct Hdf5Store {
    path: PathBuf,
    file: Option<H5File>,
}

impl Hdf5Store {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Opening HDF5 file");
        let file = H5File::open(path).map_err(|e| {
            ConversionError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> Result<&H5File> {
        self.file.as_ref().ok_or(ConversionError::ReaderClosed)
    }

    fn dataset(&self, name: &str) -> Result<hdf5::Dataset> {
        let file = self.file()?;
        if !file.link_exists(name) {
            return Err(ConversionError::MissingDataset(format!(
                "{}:{}",
                self.path.display(),
                name
            )));
        }
        Ok(file.dataset(name)?)
    }
}

impl DatasetReader for Hdf5Store {
    fn contains(&self, name: &str) -> bool {
        self.file
            .as_ref()
            .is_some_and(|file| file.link_exists(name))
    }

    fn shape(&self, name: &str) -> Result<Vec<usize>> {
        Ok(self.dataset(name)?.shape())
    }

    fn read_2d(&self, name: &str, rows: Range<usize>, cols: Range<usize>) -> Result<Array2<f64>> {
        let dataset = self.dataset(name)?;
        let shape = dataset.shape();
        if shape.len() != 2 {
            return Err(ConversionError::InvalidShape {
                name: name.to_string(),
                found: shape,
                reason: "expected a 2-D dataset".to_string(),
            });
        }
        check_range(name, &rows, shape[0])?;
        check_range(name, &cols, shape[1])?;
        if rows.is_empty() || cols.is_empty() {
            return Ok(Array2::zeros((rows.len(), cols.len())));
        }
        Ok(dataset.read_slice_2d::<f64, _>(s![rows, cols])?)
    }

    fn read_flat(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.dataset(name)?.read_raw::<f64>()?)
    }

    fn read_volume(&self, name: &str, rows: Range<usize>) -> Result<Array3<u16>> {
        let dataset = self.dataset(name)?;
        let shape = dataset.shape();
        if shape.len() != 3 {
            return Err(ConversionError::InvalidShape {
                name: name.to_string(),
                found: shape,
                reason: "expected a 3-D volume".to_string(),
            });
        }
        check_range(name, &rows, shape[1])?;
        if rows.is_empty() {
            return Ok(Array3::zeros((shape[0], 0, shape[2])));
        }
        Ok(dataset.read_slice::<u16, _, Ix3>(s![.., rows, ..])?)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            debug!(path = %self.path.display(), "Closing HDF5 file");
            file.close()?;
        }
        Ok(())
    }
}

impl Drop for Hdf5Store {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release HDF5 file {}: {}", self.path.display(), e);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Source;

impl DatasetSource for Hdf5Source {
    type Reader = Hdf5Store;

    fn open(&self, path: &Path) -> Result<Hdf5Store> {
        Hdf5Store::open(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nwb_pipeline::segmentation::{
        SegmentationExtractor, SessionLayout, SparseRoiMaskDecoder, TraceKind, VoxelMaskEntry,
    };
    use ndarray::array;
    use tempfile::NamedTempFile;

    fn write_table(path: &Path) {
        let file = H5File::create(path).unwrap();
        let x = array![[3u16, 9], [4, 0], [0, 0]];
        file.new_dataset::<u16>()
            .shape((3, 2))
            .create("x")
            .unwrap()
            .write(&x)
            .unwrap();
        let volume = Array3::<u16>::from_shape_fn((2, 4, 3), |(z, r, c)| (z * 100 + r * 10 + c) as u16);
        file.new_dataset::<u16>()
            .shape((2, 4, 3))
            .create("default")
            .unwrap()
            .write(&volume)
            .unwrap();
    }

    #[test]
    fn test_reads_integer_table_as_f64() {
        let tmp = NamedTempFile::new().unwrap();
        write_table(tmp.path());

        let store = Hdf5Store::open(tmp.path()).unwrap();
        assert!(store.contains("x"));
        assert!(!store.contains("Cell_X"));
        assert_eq!(store.shape("x").unwrap(), vec![3, 2]);

        let column = store.read_column("x", 0, 0..3).unwrap();
        assert_eq!(column.to_vec(), vec![3.0, 4.0, 0.0]);
    }

    #[test]
    fn test_reads_volume_rows() {
        let tmp = NamedTempFile::new().unwrap();
        write_table(tmp.path());

        let store = Hdf5Store::open(tmp.path()).unwrap();
        let half = store.read_volume("default", 2..4).unwrap();
        assert_eq!(half.shape(), &[2, 2, 3]);
        assert_eq!(half[[1, 0, 2]], 122);
    }

    #[test]
    fn test_close_is_idempotent() {
        let tmp = NamedTempFile::new().unwrap();
        write_table(tmp.path());

        let mut store = Hdf5Store::open(tmp.path()).unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.contains("x"));
        assert!(matches!(store.shape("x"), Err(ConversionError::ReaderClosed)));
    }

    /// Single-color file with two ROIs of two and one voxels.
    fn write_single_color(path: &Path, baseline: Array2<f64>) {
        let file = H5File::create(path).unwrap();
        let tables = [
            ("Cell_X", array![[3u16, 9], [4, 0], [0, 0]]),
            ("Cell_Y", array![[5u16, 7], [6, 0], [0, 0]]),
            ("Cell_Z", array![[1u16, 2], [2, 0], [0, 0]]),
        ];
        for (name, table) in &tables {
            file.new_dataset::<u16>()
                .shape((3, 2))
                .create(*name)
                .unwrap()
                .write(table)
                .unwrap();
        }
        let timesers = baseline.mapv(|v| v / 10.0);
        for (name, data) in [("Cell_baseline", &baseline), ("Cell_timesers", &timesers)] {
            file.new_dataset::<f64>()
                .shape(data.dim())
                .create(name)
                .unwrap()
                .write(data)
                .unwrap();
        }
    }

    #[test]
    fn test_half_precision_baseline_is_corrupted_format() {
        let tmp = NamedTempFile::new().unwrap();
        write_single_color(tmp.path(), Array2::zeros((1, 6)));

        let store = Hdf5Store::open(tmp.path()).unwrap();
        assert!(matches!(
            SparseRoiMaskDecoder::open(store),
            Err(ConversionError::CorruptedFormat(_))
        ));
    }

    #[test]
    fn test_decodes_segmentation_file() {
        let tmp = NamedTempFile::new().unwrap();
        let baseline = Array2::from_shape_fn((4, 2), |(frame, roi)| (frame * 10 + roi) as f64);
        write_single_color(tmp.path(), baseline);

        let extractor = SegmentationExtractor::new(Hdf5Store::open(tmp.path()).unwrap(), 1.56).unwrap();
        assert_eq!(extractor.layout(), SessionLayout::SingleColor);
        assert_eq!(extractor.num_rois(), 2);
        assert_eq!(extractor.num_frames(), 4);

        let masks = extractor.roi_pixel_masks(None).unwrap();
        assert_eq!(masks[0], vec![VoxelMaskEntry::new(3, 5, 1), VoxelMaskEntry::new(4, 6, 2)]);
        assert_eq!(masks[1], vec![VoxelMaskEntry::new(9, 7, 2)]);

        let raw = extractor.traces(TraceKind::Raw, 0..4, Some(&[1])).unwrap();
        assert_eq!(raw.column(0).to_vec(), vec![1.0, 11.0, 21.0, 31.0]);
        drop(extractor);

        let store = Hdf5Store::open(tmp.path()).unwrap();
        assert_eq!(store.shape("Cell_X").unwrap(), vec![3, 2]);
    }
}
