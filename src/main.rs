use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

use ahrens_nwb_rs::logger;
use ahrens_nwb_rs::nwb_pipeline::behavior::read_frame_onsets;
use ahrens_nwb_rs::nwb_pipeline::{
    ConversionConfig, Hdf5Store, NwbFile, PlaneMetadata, SegmentationExtractor,
    SegmentationToNwbPipeline,
};

/// Converts Ahrens lab light-sheet sessions into the NWB object model.
#[derive(Parser)]
#[command(name = "ahrens-nwb", version, about)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print layout, ROI and frame counts of a segmentation file
    Inspect {
        file: PathBuf,
        #[arg(long, default_value_t = 1.56)]
        sampling_frequency: f64,
    },
    /// Convert one or two segmentation files and write the NWB model as JSON
    ConvertSegmentation {
        /// Neuron (or single-color) segmentation file
        #[arg(long)]
        neuron: PathBuf,
        /// Glia segmentation file of a dual-color session
        #[arg(long)]
        glia: Option<PathBuf>,
        /// Imaging volume rate in Hz
        #[arg(long, default_value_t = 1.56)]
        sampling_frequency: f64,
        /// Only convert the first N frames
        #[arg(long)]
        stub_frames: Option<usize>,
        /// Store ROI centroids next to the voxel masks
        #[arg(long)]
        centroids: bool,
        /// Processed behavior file whose frame channel gives frame timestamps
        #[arg(long)]
        behavior_file: Option<PathBuf>,
        /// Behavior sampling rate in Hz
        #[arg(long, default_value_t = 2431.6)]
        behavior_rate: f64,
        /// Output path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    match cli.command {
        Command::Inspect {
            file,
            sampling_frequency,
        } => inspect(&file, sampling_frequency),
        Command::ConvertSegmentation {
            neuron,
            glia,
            sampling_frequency,
            stub_frames,
            centroids,
            behavior_file,
            behavior_rate,
            output,
        } => {
            let mut builder = ConversionConfig::builder().include_roi_centroids(centroids);
            if let Some(frames) = stub_frames {
                builder = builder.stub_test(true).stub_frames(frames);
            }

            let timestamps = match behavior_file {
                Some(path) => Some(frame_onsets(&path, behavior_rate)?),
                None => None,
            };

            let mut planes = vec![(neuron, PlaneMetadata::neuron())];
            if let Some(glia) = glia {
                planes.push((glia, PlaneMetadata::glia()));
            }

            let mut pipeline = SegmentationToNwbPipeline::new(builder.build());
            for (path, metadata) in planes {
                let mut extractor = open_segmentation(&path, sampling_frequency)?;
                if let Some(times) = &timestamps {
                    apply_times(&mut extractor, times)?;
                }
                pipeline.add_plane(extractor, metadata);
            }

            let mut nwb = NwbFile::new("Light-sheet imaging of neurons and glia in larval zebrafish.");
            let timings = pipeline.convert_with_timings(&mut nwb)?;
            timings.log_summary();

            let json = nwb.to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(output = %path.display(), "Wrote NWB model");
                }
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn open_segmentation(path: &Path, sampling_frequency: f64) -> Result<SegmentationExtractor<Hdf5Store>> {
    let store = Hdf5Store::open(path).with_context(|| format!("opening {}", path.display()))?;
    SegmentationExtractor::new(store, sampling_frequency)
        .with_context(|| format!("reading segmentation {}", path.display()))
}

fn frame_onsets(path: &Path, rate: f64) -> Result<Vec<f64>> {
    let store = Hdf5Store::open(path).with_context(|| format!("opening {}", path.display()))?;
    let onsets = read_frame_onsets(&store, rate)?;
    info!(frames = onsets.len(), "Read frame onsets");
    Ok(onsets)
}

fn apply_times(extractor: &mut SegmentationExtractor<Hdf5Store>, times: &[f64]) -> Result<()> {
    let num_frames = extractor.num_frames();
    if times.len() > num_frames {
        warn!(
            timestamps = times.len(),
            num_frames,
            "More frame onsets than frames, dropping the extra ones"
        );
    }
    let times = times.iter().take(num_frames).copied().collect();
    extractor.set_times(times)?;
    Ok(())
}

fn inspect(path: &Path, sampling_frequency: f64) -> Result<()> {
    let mut extractor = open_segmentation(path, sampling_frequency)?;
    let decoder = extractor.decoder();
    let summary = json!({
        "file": path.display().to_string(),
        "layout": format!("{:?}", extractor.layout()),
        "num_rois": extractor.num_rois(),
        "max_pixels_per_roi": decoder.max_pixels_per_roi(),
        "num_frames": extractor.num_frames(),
        "image_size": extractor.image_size(),
        "sampling_frequency": extractor.sampling_frequency(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    extractor.close()?;
    Ok(())
}
