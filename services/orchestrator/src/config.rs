use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::bucket::DatasetLayout;
use crate::waiter::Backoff;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub project_name: String,
    pub resource_root: PathBuf,
    pub state_file: PathBuf,
    pub label_field: String,
    pub sample_image: String,
    pub min_confidence: f32,
    pub min_inference_units: i32,
    pub poll_initial: Duration,
    pub poll_max: Duration,
    pub strict_state: bool,
    pub region: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let project_name = var_or("DEMO_PROJECT_NAME", "shoe-classification");
        let resource_root = PathBuf::from(var_or("DEMO_RESOURCE_ROOT", "resources"));
        let state_file = PathBuf::from(var_or("DEMO_STATE_FILE", "local.properties"));
        let label_field = var_or("DEMO_LABEL_FIELD", "shoe-type");
        let sample_image = var_or("DEMO_SAMPLE_IMAGE", "shoes/test/canvasshoes/26.jpg");

        let min_confidence: f32 = parse("DEMO_MIN_CONFIDENCE", "90")?;
        let min_inference_units: i32 = parse("DEMO_MIN_INFERENCE_UNITS", "1")?;
        let poll_initial = Duration::from_secs(parse("DEMO_POLL_INITIAL_SECS", "30")?);
        let poll_max = Duration::from_secs(parse("DEMO_POLL_MAX_SECS", "300")?);

        let strict_state = std::env::var("DEMO_STRICT_STATE")
            .ok()
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
            .unwrap_or(false);

        let region = std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty());

        if project_name.is_empty() || project_name.len() > 40 {
            bail!("DEMO_PROJECT_NAME must be 1..=40 characters (bucket names are limited to 63)");
        }
        if !(0.0..=100.0).contains(&min_confidence) {
            bail!("DEMO_MIN_CONFIDENCE must be between 0 and 100");
        }
        if min_inference_units < 1 {
            bail!("DEMO_MIN_INFERENCE_UNITS must be at least 1");
        }
        if poll_max < poll_initial {
            bail!("DEMO_POLL_MAX_SECS must not be lower than DEMO_POLL_INITIAL_SECS");
        }

        Ok(Self {
            project_name,
            resource_root,
            state_file,
            label_field,
            sample_image,
            min_confidence,
            min_inference_units,
            poll_initial,
            poll_max,
            strict_state,
            region,
        })
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.poll_initial, self.poll_max)
    }

    pub fn dataset_layout(&self) -> DatasetLayout {
        DatasetLayout {
            label_field: self.label_field.clone(),
            ..DatasetLayout::default()
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(key, default)
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for env var: {key}"))
}
