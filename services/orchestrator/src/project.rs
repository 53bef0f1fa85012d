//! Training service seam: projects, versions and inference.

use async_trait::async_trait;

use crate::error::Result;

/// Status of one project version as reported by the training service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionStatus {
    TrainingInProgress,
    TrainingCompleted,
    TrainingFailed,
    Starting,
    Running,
    Failed,
    Stopping,
    Stopped,
    Deleting,
    Other(String),
}

impl VersionStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "TRAINING_IN_PROGRESS" => Self::TrainingInProgress,
            "TRAINING_COMPLETED" => Self::TrainingCompleted,
            "TRAINING_FAILED" => Self::TrainingFailed,
            "STARTING" => Self::Starting,
            "RUNNING" => Self::Running,
            "FAILED" => Self::Failed,
            "STOPPING" => Self::Stopping,
            "STOPPED" => Self::Stopped,
            "DELETING" => Self::Deleting,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::TrainingInProgress => "TRAINING_IN_PROGRESS",
            Self::TrainingCompleted => "TRAINING_COMPLETED",
            Self::TrainingFailed => "TRAINING_FAILED",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Deleting => "DELETING",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionDescription {
    pub status: VersionStatus,
    pub status_message: Option<String>,
}

/// An object in the storage service, addressed the way the training API expects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    pub fn new(bucket: &str, key: &str) -> Self {
        Self { bucket: bucket.to_string(), key: key.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingRequest {
    pub project_arn: String,
    pub version_name: String,
    pub output_bucket: String,
    pub output_prefix: String,
    pub training_manifest: StorageLocation,
    pub testing_manifest: StorageLocation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectedLabel {
    pub name: String,
    pub confidence: f32,
}

#[async_trait]
pub trait ProjectClient: Send + Sync {
    async fn create_project(&self, name: &str) -> Result<String>;
    /// Submits training and returns the new version ARN without waiting.
    async fn create_project_version(&self, req: &TrainingRequest) -> Result<String>;
    /// `None` when the service knows no such version.
    async fn describe_version(&self, project_arn: &str, version_name: &str) -> Result<Option<VersionDescription>>;
    async fn start_project_version(&self, version_arn: &str, min_inference_units: i32) -> Result<VersionStatus>;
    async fn stop_project_version(&self, version_arn: &str) -> Result<VersionStatus>;
    async fn detect_custom_labels(
        &self,
        version_arn: &str,
        image: &StorageLocation,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>>;
    /// Returns the project status reported by the delete call.
    async fn delete_project(&self, project_arn: &str) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_round_trips_known_values() {
        for s in ["TRAINING_COMPLETED", "RUNNING", "STOPPED", "TRAINING_FAILED"] {
            assert_eq!(VersionStatus::parse(s).as_str(), s);
        }
        assert_eq!(VersionStatus::parse("COPYING_IN_PROGRESS"), VersionStatus::Other("COPYING_IN_PROGRESS".into()));
    }
}
