use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use aws_config::BehaviorVersion;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use groundtruth::tsv::{convert_catalogue, SplitWriters, TsvLayout};
use groundtruth::{creation_date, ManifestWriter};
use orchestrator::args::{Args, Command};
use orchestrator::config::AppConfig;
use orchestrator::lifecycle::ProjectLifecycle;
use orchestrator::phases::{Orchestrator, RunSettings};
use orchestrator::rekognition::RekognitionProjectClient;
use orchestrator::s3_store::S3ObjectStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // offline, no credentials needed
    if let Command::TsvManifests { input, bucket, prefix, label_field, out_dir } = &args.command {
        return write_tsv_manifests(input, bucket, prefix, label_field, out_dir);
    }

    let mut cfg = AppConfig::from_env()?;
    if let Some(path) = args.state_file {
        cfg.state_file = path;
    }
    cfg.strict_state |= args.strict;

    let aws = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let region = cfg.region.clone().or_else(|| aws.region().map(|r| r.as_ref().to_string()));
    info!(region = region.as_deref().unwrap_or("default"), "aws config loaded");

    let store = S3ObjectStore::new(aws_sdk_s3::Client::new(&aws), region);
    let lifecycle = ProjectLifecycle::new(
        RekognitionProjectClient::new(aws_sdk_rekognition::Client::new(&aws)),
        cfg.backoff(),
    )
    .with_min_inference_units(cfg.min_inference_units);
    let orch = Orchestrator::new(store, lifecycle, settings(&cfg));

    match args.command {
        Command::Train { resume: false } => {
            let state = orch.train(&mut rand::thread_rng()).await.context("train phase failed")?;
            info!(
                bucket = state.bucket_name.as_deref().unwrap_or_default(),
                model_version_arn = state.model_version_arn.as_deref().unwrap_or_default(),
                "train phase done"
            );
        }
        Command::Train { resume: true } => {
            orch.resume_training().await.context("resuming training failed")?;
        }
        Command::Run => {
            if let Some(labels) = orch.run().await.context("run phase failed")? {
                if labels.is_empty() {
                    warn!("no label above the confidence threshold");
                }
            }
        }
        Command::Cleanup => {
            orch.cleanup().await.context("cleanup phase failed")?;
        }
        Command::Demo => {
            orch.demo(&mut rand::thread_rng()).await.context("demo failed")?;
        }
        Command::TsvManifests { .. } => unreachable!("handled before aws setup"),
    }

    info!("done");
    Ok(())
}

fn settings(cfg: &AppConfig) -> RunSettings {
    RunSettings {
        project_name: cfg.project_name.clone(),
        resource_root: cfg.resource_root.clone(),
        state_file: cfg.state_file.clone(),
        layout: cfg.dataset_layout(),
        sample_image: cfg.sample_image.clone(),
        min_confidence: cfg.min_confidence,
        strict_state: cfg.strict_state,
        ..RunSettings::default()
    }
}

fn write_tsv_manifests(input: &Path, bucket: &str, prefix: &str, label_field: &str, out_dir: &Path) -> Result<()> {
    let date = creation_date(chrono::Utc::now());
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let open = |name: &str| ManifestWriter::create(&out_dir.join(name), bucket, label_field, &date);
    let mut train = open("train.manifest")?;
    let mut test = open("test.manifest")?;
    let mut val = open("val.manifest")?;

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open catalogue {}", input.display()))?,
    );
    let layout = TsvLayout {
        key_prefix: prefix.to_string(),
        ..TsvLayout::default()
    };
    let counts = convert_catalogue(
        reader,
        &layout,
        SplitWriters { train: &mut train, test: &mut test, val: &mut val },
    )?;

    train.finish()?;
    test.finish()?;
    val.finish()?;

    info!(out_dir = %out_dir.display(), records = counts.total(), skipped = counts.skipped, "manifests written");
    Ok(())
}
