use async_trait::async_trait;
use aws_sdk_rekognition::types::{
    Asset, GroundTruthManifest, Image, OutputConfig, S3Object, TestingData, TrainingData,
};
use aws_sdk_rekognition::Client;

use crate::error::{DemoError, Result};
use crate::project::{
    DetectedLabel, ProjectClient, StorageLocation, TrainingRequest, VersionDescription, VersionStatus,
};

/// `ProjectClient` backed by Rekognition Custom Labels.
#[derive(Clone)]
pub struct RekognitionProjectClient {
    client: Client,
}

impl RekognitionProjectClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn s3_object(loc: &StorageLocation) -> S3Object {
    S3Object::builder().bucket(&loc.bucket).name(&loc.key).build()
}

fn manifest_asset(loc: &StorageLocation) -> Asset {
    Asset::builder()
        .ground_truth_manifest(GroundTruthManifest::builder().s3_object(s3_object(loc)).build())
        .build()
}

fn missing(field: &str) -> DemoError {
    DemoError::Remote(format!("response did not contain {field}"))
}

#[async_trait]
impl ProjectClient for RekognitionProjectClient {
    async fn create_project(&self, name: &str) -> Result<String> {
        let resp = self.client.create_project().project_name(name).send().await?;
        resp.project_arn().map(str::to_string).ok_or_else(|| missing("ProjectArn"))
    }

    async fn create_project_version(&self, req: &TrainingRequest) -> Result<String> {
        let resp = self
            .client
            .create_project_version()
            .project_arn(&req.project_arn)
            .version_name(&req.version_name)
            .output_config(
                OutputConfig::builder()
                    .s3_bucket(&req.output_bucket)
                    .s3_key_prefix(&req.output_prefix)
                    .build(),
            )
            .training_data(TrainingData::builder().assets(manifest_asset(&req.training_manifest)).build())
            .testing_data(TestingData::builder().assets(manifest_asset(&req.testing_manifest)).build())
            .send()
            .await?;
        resp.project_version_arn()
            .map(str::to_string)
            .ok_or_else(|| missing("ProjectVersionArn"))
    }

    async fn describe_version(&self, project_arn: &str, version_name: &str) -> Result<Option<VersionDescription>> {
        let resp = self
            .client
            .describe_project_versions()
            .project_arn(project_arn)
            .version_names(version_name)
            .send()
            .await?;
        Ok(resp.project_version_descriptions().first().map(|d| VersionDescription {
            status: d
                .status()
                .map(|s| VersionStatus::parse(s.as_str()))
                .unwrap_or_else(|| VersionStatus::Other("UNKNOWN".to_string())),
            status_message: d.status_message().map(str::to_string),
        }))
    }

    async fn start_project_version(&self, version_arn: &str, min_inference_units: i32) -> Result<VersionStatus> {
        let resp = self
            .client
            .start_project_version()
            .project_version_arn(version_arn)
            .min_inference_units(min_inference_units)
            .send()
            .await?;
        Ok(resp
            .status()
            .map(|s| VersionStatus::parse(s.as_str()))
            .unwrap_or(VersionStatus::Starting))
    }

    async fn stop_project_version(&self, version_arn: &str) -> Result<VersionStatus> {
        let resp = self
            .client
            .stop_project_version()
            .project_version_arn(version_arn)
            .send()
            .await?;
        Ok(resp
            .status()
            .map(|s| VersionStatus::parse(s.as_str()))
            .unwrap_or(VersionStatus::Stopping))
    }

    async fn detect_custom_labels(
        &self,
        version_arn: &str,
        image: &StorageLocation,
        min_confidence: f32,
    ) -> Result<Vec<DetectedLabel>> {
        let resp = self
            .client
            .detect_custom_labels()
            .project_version_arn(version_arn)
            .image(Image::builder().s3_object(s3_object(image)).build())
            .min_confidence(min_confidence)
            .send()
            .await?;
        Ok(resp
            .custom_labels()
            .iter()
            .map(|l| DetectedLabel {
                name: l.name().unwrap_or_default().to_string(),
                confidence: l.confidence().unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_project(&self, project_arn: &str) -> Result<String> {
        let resp = self.client.delete_project().project_arn(project_arn).send().await?;
        Ok(resp.status().map(|s| s.as_str().to_string()).unwrap_or_default())
    }
}
