//! Blocking project operations on top of a `ProjectClient`.

use tracing::{info, instrument};

use crate::error::{DemoError, Result};
use crate::project::{DetectedLabel, ProjectClient, StorageLocation, TrainingRequest, VersionStatus};
use crate::waiter::{block_until, Backoff, Poll};

pub const DEFAULT_MIN_CONFIDENCE: f32 = 90.0;

pub struct ProjectLifecycle<P: ProjectClient> {
    client: P,
    backoff: Backoff,
    min_inference_units: i32,
}

impl<P: ProjectClient> ProjectLifecycle<P> {
    pub fn new(client: P, backoff: Backoff) -> Self {
        Self { client, backoff, min_inference_units: 1 }
    }

    pub fn with_min_inference_units(mut self, units: i32) -> Self {
        self.min_inference_units = units;
        self
    }

    #[instrument(skip(self))]
    pub async fn create_project(&self, name: &str) -> Result<String> {
        let arn = self.client.create_project(name).await?;
        info!(project_arn = %arn, "project created");
        Ok(arn)
    }

    /// Submits training without waiting for it.
    #[instrument(skip(self, req), fields(version = %req.version_name))]
    pub async fn begin_training(&self, req: &TrainingRequest) -> Result<String> {
        let version_arn = self.client.create_project_version(req).await?;
        info!(version_arn = %version_arn, "training submitted");
        Ok(version_arn)
    }

    /// Blocks until training completed. A failed training is an error
    /// carrying the service's status message.
    #[instrument(skip(self))]
    pub async fn await_training(&self, project_arn: &str, version_name: &str) -> Result<()> {
        info!("waiting for training, this usually takes about an hour");
        self.wait_for(project_arn, version_name, &VersionStatus::TrainingCompleted, &VersionStatus::TrainingFailed)
            .await
    }

    /// Submits training and blocks until it reached a terminal status.
    pub async fn submit_training(&self, req: &TrainingRequest) -> Result<String> {
        let version_arn = self.begin_training(req).await?;
        self.await_training(&req.project_arn, &req.version_name).await?;
        Ok(version_arn)
    }

    /// Starts a trained version and blocks until it is running.
    #[instrument(skip(self))]
    pub async fn start_version(&self, version_arn: &str, project_arn: &str, version_name: &str) -> Result<()> {
        let status = self
            .client
            .start_project_version(version_arn, self.min_inference_units)
            .await?;
        info!(%status, "start requested");
        info!("status STARTING may stay unchanged for up to 10 minutes");
        self.wait_for(project_arn, version_name, &VersionStatus::Running, &VersionStatus::Failed)
            .await
    }

    /// Returns once the stop request is acknowledged.
    #[instrument(skip(self))]
    pub async fn stop_version(&self, version_arn: &str) -> Result<VersionStatus> {
        let status = self.client.stop_project_version(version_arn).await?;
        info!(%status, "stop requested");
        Ok(status)
    }

    #[instrument(skip(self))]
    pub async fn classify(
        &self,
        version_arn: &str,
        bucket: &str,
        image_key: &str,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>> {
        let labels = self
            .client
            .detect_custom_labels(version_arn, &StorageLocation::new(bucket, image_key), min_confidence)
            .await?;
        for l in &labels {
            info!(label = %l.name, confidence = l.confidence, "label detected");
        }
        Ok(labels)
    }

    #[instrument(skip(self))]
    pub async fn delete_project(&self, project_arn: &str) -> Result<()> {
        let status = self.client.delete_project(project_arn).await?;
        info!(%status, "project delete requested");
        Ok(())
    }

    async fn wait_for(
        &self,
        project_arn: &str,
        version_name: &str,
        success: &VersionStatus,
        failure: &VersionStatus,
    ) -> Result<()> {
        block_until(self.backoff, move || async move {
            let Some(desc) = self.client.describe_version(project_arn, version_name).await? else {
                return Err(DemoError::Remote(format!(
                    "project version '{version_name}' not found"
                )));
            };
            info!(status = %desc.status, "version status");
            if &desc.status == success {
                Ok(Poll::Ready(()))
            } else if &desc.status == failure {
                Err(DemoError::Remote(
                    desc.status_message
                        .unwrap_or_else(|| format!("project version reached {}", desc.status)),
                ))
            } else {
                Ok(Poll::Pending)
            }
        })
        .await
    }
}
