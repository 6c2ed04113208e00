use tracing::debug;

use crate::nwb_pipeline::segmentation::types::{ImageShape, TraceKind};
use crate::nwb_pipeline::storage::DatasetReader;

/// The two on-disk layouts of the segmentation files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLayout {
    /// Dual-color sessions: `baseline`, `timeseries`, `x`/`y`/`z`
    DualColor,
    /// Older single-color sessions: `Cell_baseline`, `Cell_timesers`, `Cell_X`/`Cell_Y`/`Cell_Z`
    SingleColor,
}

/// Dataset names of the three coordinate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelMaskFieldMap {
    pub x: &'static str,
    pub y: &'static str,
    pub z: &'static str,
}

impl PixelMaskFieldMap {
    pub fn axes(&self) -> [&'static str; 3] {
        [self.x, self.y, self.z]
    }
}

/// Everything that differs between the layouts, resolved once at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutConfig {
    pub baseline_key: &'static str,
    pub timeseries_key: &'static str,
    pub field_map: PixelMaskFieldMap,
    pub image_shape: ImageShape,
}

impl LayoutConfig {
    pub fn trace_key(&self, kind: TraceKind) -> &'static str {
        match kind {
            TraceKind::Raw => self.baseline_key,
            TraceKind::Dff => self.timeseries_key,
        }
    }
}

impl SessionLayout {
    pub fn detect<R: DatasetReader>(reader: &R) -> Self {
        let layout = if reader.contains("baseline") {
            SessionLayout::DualColor
        } else {
            SessionLayout::SingleColor
        };
        debug!(?layout, "Detected segmentation layout");
        layout
    }

    pub fn config(self) -> LayoutConfig {
        match self {
            SessionLayout::DualColor => LayoutConfig {
                baseline_key: "baseline",
                timeseries_key: "timeseries",
                field_map: PixelMaskFieldMap {
                    x: "x",
                    y: "y",
                    z: "z",
                },
                image_shape: (2048, 2048, 29),
            },
            SessionLayout::SingleColor => LayoutConfig {
                baseline_key: "Cell_baseline",
                // sic: the dataset name in the exported files
                timeseries_key: "Cell_timesers",
                field_map: PixelMaskFieldMap {
                    x: "Cell_X",
                    y: "Cell_Y",
                    z: "Cell_Z",
                },
                image_shape: (888, 2048, 29),
            },
        }
    }
}
