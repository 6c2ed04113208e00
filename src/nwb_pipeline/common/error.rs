use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write NWB object: {0}")]
    WriteError(String),

    #[error("Dataset not found: {0}")]
    MissingDataset(String),

    #[error("Unexpected shape for dataset {name}: {found:?} ({reason})")]
    InvalidShape {
        name: String,
        found: Vec<usize>,
        reason: String,
    },

    #[error(
        "Fluorescence series in {0} are saved in MATLAB half precision and cannot be read; \
         recast the MATLAB datatype and save a new file"
    )]
    CorruptedFormat(String),

    #[error("ROI id {roi_id} is out of range for {num_rois} ROIs")]
    InvalidRoiIdentifier { roi_id: usize, num_rois: usize },

    #[error("ROI {roi_id} has a coordinate that is not a voxel index: {value}")]
    InvalidCoordinate { roi_id: usize, value: f64 },

    #[error("Invalid frame range {start}..{end} for {num_frames} frames")]
    InvalidFrameRange {
        start: usize,
        end: usize,
        num_frames: usize,
    },

    #[error("Sampling frequency must be positive and finite, got {0}")]
    InvalidSamplingFrequency(f64),

    #[error("Failed to decode TIFF stack: {0}")]
    DecodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Dataset reader has already been closed")]
    ReaderClosed,

    #[cfg(feature = "hdf5")]
    #[error("HDF5 error: {0}")]
    Hdf5Error(#[from] hdf5::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConversionError>;
