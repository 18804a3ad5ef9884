// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{HEATMAP_SIGMA, PAF_WIDTH};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    pose-targets index --annotations person_keypoints_train2017.json --data-path data --split train
    pose-targets build --annotations person_keypoints_val2017.json --image-id 785
    pose-targets build --annotations person_keypoints_val2017.json --image-id 785 --sigma 5 --output previews/
    pose-targets --verbose false index --annotations val.json --data-path data --split val"#)]
pub struct Cli {
    /// Show verbose output
    #[arg(long, global = true, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,

    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the images of a split that have eligible person annotations
    Index(IndexArgs),
    /// Build heatmaps, part affinity fields and the ignore mask for one image
    Build(BuildArgs),
}

/// Arguments for the index command.
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// COCO keypoint annotation file
    #[arg(short, long)]
    pub annotations: PathBuf,

    /// Directory holding the cached id lists
    #[arg(short, long)]
    pub data_path: PathBuf,

    /// Split name used as the cache key
    #[arg(short, long, default_value = "train")]
    pub split: String,
}

/// Arguments for the build command.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// COCO keypoint annotation file
    #[arg(short, long)]
    pub annotations: PathBuf,

    /// Image to build targets for
    #[arg(short, long)]
    pub image_id: u64,

    /// Directory for preview images [default: runs/targets/build*]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Gaussian spread of the heatmaps
    #[arg(long, default_value_t = HEATMAP_SIGMA)]
    pub sigma: f32,

    /// Half-width of the limb band in the part affinity fields
    #[arg(long, default_value_t = PAF_WIDTH)]
    pub paf_width: f32,
}
