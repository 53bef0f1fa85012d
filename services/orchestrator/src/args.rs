use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "classifier-demo")]
#[command(about = "Custom labels image classification demo: train, run and clean up", long_about = None)]
pub struct Args {
    /// Run state file shared between the phases
    #[arg(long, global = true, env = "DEMO_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Fail instead of doing nothing when the run state is missing
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the bucket, upload the dataset, create the project and train
    Train {
        /// Wait for a previously submitted training instead of starting a new one
        #[arg(long)]
        resume: bool,
    },
    /// Start the trained version, classify the sample image, stop it
    Run,
    /// Delete the project and the bucket
    Cleanup,
    /// Train, then clean up
    Demo,
    /// Convert a TSV image catalogue into train/test/val manifests
    TsvManifests {
        /// Catalogue file (image_key, long, midi, mini)
        #[arg(long)]
        input: PathBuf,
        /// Bucket the images are uploaded to
        #[arg(long)]
        bucket: String,
        /// Key prefix for the images inside the bucket
        #[arg(long, default_value = "dresses")]
        prefix: String,
        /// Label attribute written to the manifests
        #[arg(long, default_value = "dress-length")]
        label_field: String,
        /// Directory receiving train.manifest, test.manifest and val.manifest
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}
