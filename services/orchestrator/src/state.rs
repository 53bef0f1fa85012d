//! Run state persisted between the training phase and the later phases.
//!
//! Stored as flat `key=value` lines. Lines starting with `#` or `!` are
//! comments. Unknown keys are ignored on load.

use std::path::Path;

use crate::error::{DemoError, Result};

pub const KEY_PROJECT_ARN: &str = "project-arn";
pub const KEY_PROJECT_VERSION_ARN: &str = "project-version-arn";
pub const KEY_PROJECT_VERSION: &str = "project-version";
pub const KEY_BUCKET_NAME: &str = "bucket-name";
pub const KEY_MODEL_VERSION_ARN: &str = "model-version-arn";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    pub project_arn: Option<String>,
    /// ARN returned when the training job was submitted.
    pub project_version_arn: Option<String>,
    /// Version label, e.g. `shoe-classification.2026-10-19T08.25.00`.
    pub project_version: Option<String>,
    pub bucket_name: Option<String>,
    /// Only set once training completed.
    pub model_version_arn: Option<String>,
}

impl RunState {
    /// `Ok(None)` when there is no state file yet.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())?;
        Ok(())
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut st = RunState::default();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(DemoError::InvalidState(format!("line {}: expected key=value", i + 1)));
            };
            let value = value.trim();
            let slot = match key.trim() {
                KEY_PROJECT_ARN => &mut st.project_arn,
                KEY_PROJECT_VERSION_ARN => &mut st.project_version_arn,
                KEY_PROJECT_VERSION => &mut st.project_version,
                KEY_BUCKET_NAME => &mut st.bucket_name,
                KEY_MODEL_VERSION_ARN => &mut st.model_version_arn,
                _ => continue,
            };
            *slot = (!value.is_empty()).then(|| value.to_string());
        }
        Ok(st)
    }

    pub fn render(&self) -> String {
        let mut out = format!("#Run state written {}\n", chrono::Utc::now().to_rfc3339());
        let fields = [
            (KEY_PROJECT_ARN, &self.project_arn),
            (KEY_PROJECT_VERSION_ARN, &self.project_version_arn),
            (KEY_PROJECT_VERSION, &self.project_version),
            (KEY_BUCKET_NAME, &self.bucket_name),
            (KEY_MODEL_VERSION_ARN, &self.model_version_arn),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                out.push_str(key);
                out.push('=');
                out.push_str(v);
                out.push('\n');
            }
        }
        out
    }

    pub fn require(value: &Option<String>, key: &'static str) -> Result<String> {
        value.clone().ok_or(DemoError::MissingState(key))
    }
}
