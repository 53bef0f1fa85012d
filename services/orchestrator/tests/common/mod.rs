#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orchestrator::bucket::DatasetLayout;
use orchestrator::error::{DemoError, Result};
use orchestrator::lifecycle::ProjectLifecycle;
use orchestrator::project::{
    DetectedLabel, ProjectClient, StorageLocation, TrainingRequest, VersionDescription, VersionStatus,
};
use orchestrator::waiter::Backoff;

pub const PROJECT_ARN: &str = "arn:aws:rekognition:eu-west-1:123456789012:project/shoe-classification/1";
pub const VERSION_ARN: &str =
    "arn:aws:rekognition:eu-west-1:123456789012:project/shoe-classification/version/shoe-classification.2026-10-19T08.25.00/2";

pub fn no_wait() -> Backoff {
    Backoff::new(Duration::ZERO, Duration::ZERO)
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    scripted: VecDeque<VersionStatus>,
    settled: Option<VersionStatus>,
    failure_message: Option<String>,
    training: Vec<TrainingRequest>,
    labels: Vec<DetectedLabel>,
    unknown_version: bool,
}

/// Scripted training service. `describe_version` pops scripted statuses
/// first and then reports whatever the last start/train/stop call settled on.
#[derive(Clone, Default)]
pub struct FakeProjectClient {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeProjectClient {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.inner.lock().unwrap().labels = vec![DetectedLabel { name: "canvasshoes".into(), confidence: 97.25 }];
        fake
    }

    pub fn script(self, statuses: &[VersionStatus]) -> Self {
        self.inner.lock().unwrap().scripted.extend(statuses.iter().cloned());
        self
    }

    pub fn failing_with(self, message: &str) -> Self {
        self.inner.lock().unwrap().failure_message = Some(message.to_string());
        self
    }

    pub fn without_versions(self) -> Self {
        self.inner.lock().unwrap().unknown_version = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls other than status polling.
    pub fn actions(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c != "describe").collect()
    }

    pub fn training_requests(&self) -> Vec<TrainingRequest> {
        self.inner.lock().unwrap().training.clone()
    }

    fn record(&self, call: &str) {
        self.inner.lock().unwrap().calls.push(call.to_string());
    }

    fn settle(&self, status: VersionStatus) {
        self.inner.lock().unwrap().settled = Some(status);
    }
}

#[async_trait]
impl ProjectClient for FakeProjectClient {
    async fn create_project(&self, _name: &str) -> Result<String> {
        self.record("create_project");
        Ok(PROJECT_ARN.to_string())
    }

    async fn create_project_version(&self, req: &TrainingRequest) -> Result<String> {
        self.record("create_project_version");
        self.inner.lock().unwrap().training.push(req.clone());
        self.settle(VersionStatus::TrainingCompleted);
        Ok(VERSION_ARN.to_string())
    }

    async fn describe_version(&self, _project_arn: &str, _version_name: &str) -> Result<Option<VersionDescription>> {
        self.record("describe");
        let mut st = self.inner.lock().unwrap();
        if st.unknown_version {
            return Ok(None);
        }
        let status = match st.scripted.pop_front() {
            Some(s) => s,
            None => st.settled.clone().unwrap_or(VersionStatus::TrainingCompleted),
        };
        let status_message = match status {
            VersionStatus::TrainingFailed | VersionStatus::Failed => st.failure_message.clone(),
            _ => None,
        };
        Ok(Some(VersionDescription { status, status_message }))
    }

    async fn start_project_version(&self, _version_arn: &str, _min_inference_units: i32) -> Result<VersionStatus> {
        self.record("start");
        self.settle(VersionStatus::Running);
        Ok(VersionStatus::Starting)
    }

    async fn stop_project_version(&self, _version_arn: &str) -> Result<VersionStatus> {
        self.record("stop");
        self.settle(VersionStatus::Stopped);
        Ok(VersionStatus::Stopping)
    }

    async fn detect_custom_labels(
        &self,
        _version_arn: &str,
        image: &StorageLocation,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>> {
        self.record("detect");
        if image.key.is_empty() {
            return Err(DemoError::Remote("Requested image should either contain bytes or s3 object.".into()));
        }
        let labels = self.inner.lock().unwrap().labels.clone();
        Ok(labels.into_iter().filter(|l| l.confidence >= min_confidence).collect())
    }

    async fn delete_project(&self, _project_arn: &str) -> Result<String> {
        self.record("delete_project");
        Ok("DELETING".to_string())
    }
}

pub fn lifecycle(client: FakeProjectClient) -> ProjectLifecycle<FakeProjectClient> {
    ProjectLifecycle::new(client, no_wait())
}

/// Writes one small fake JPEG per image the layout references.
pub fn write_images(root: &Path, layout: &DatasetLayout) {
    for (split, range) in [("train", layout.train_range.clone()), ("test", layout.test_range.clone())] {
        for category in &layout.categories {
            let dir = root.join(&layout.image_dir).join(split).join(category);
            std::fs::create_dir_all(&dir).unwrap();
            for i in range.clone() {
                std::fs::write(dir.join(format!("{i}.jpg")), format!("jpeg {split} {category} {i}")).unwrap();
            }
        }
    }
}

/// Reads a manifest back as `(source-ref, class-name)` pairs.
pub fn manifest_entries(path: &Path, label_field: &str) -> Vec<(String, String)> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            let meta = format!("{label_field}-metadata");
            (
                v["source-ref"].as_str().unwrap().to_string(),
                v[meta.as_str()]["class-name"].as_str().unwrap().to_string(),
            )
        })
        .collect()
}
