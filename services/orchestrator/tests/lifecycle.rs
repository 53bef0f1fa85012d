mod common;

use common::{lifecycle, FakeProjectClient, PROJECT_ARN, VERSION_ARN};
use orchestrator::error::DemoError;
use orchestrator::project::{StorageLocation, TrainingRequest, VersionStatus};

const BUCKET: &str = "shoe-classification-ab12cd34ef";

fn request() -> TrainingRequest {
    TrainingRequest {
        project_arn: PROJECT_ARN.into(),
        version_name: "shoe-classification.2026-10-19T08.25.00".into(),
        output_bucket: BUCKET.into(),
        output_prefix: "output".into(),
        training_manifest: StorageLocation::new(BUCKET, "shoes/train/train.manifest"),
        testing_manifest: StorageLocation::new(BUCKET, "shoes/test/test.manifest"),
    }
}

#[tokio::test]
async fn test_submit_training_waits_for_completion() {
    let client = FakeProjectClient::new()
        .script(&[VersionStatus::TrainingInProgress, VersionStatus::TrainingCompleted]);
    let lc = lifecycle(client.clone());

    let arn = lc.submit_training(&request()).await.unwrap();

    assert_eq!(arn, VERSION_ARN);
    assert_eq!(client.calls(), vec!["create_project_version", "describe", "describe"]);
    assert_eq!(client.training_requests(), vec![request()]);
}

#[tokio::test]
async fn test_submit_training_reports_failure_message() {
    let client = FakeProjectClient::new()
        .script(&[VersionStatus::TrainingInProgress, VersionStatus::TrainingFailed])
        .failing_with("The manifest file contains too many invalid data objects.");
    let lc = lifecycle(client.clone());

    let err = lc.submit_training(&request()).await.unwrap_err();

    match err {
        DemoError::Remote(m) => assert_eq!(m, "The manifest file contains too many invalid data objects."),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(client.calls().len(), 3);
}

#[tokio::test]
async fn test_submit_training_failure_without_message_names_status() {
    let client = FakeProjectClient::new().script(&[VersionStatus::TrainingFailed]);
    let lc = lifecycle(client);

    let err = lc.submit_training(&request()).await.unwrap_err();
    assert_eq!(err.to_string(), "project version reached TRAINING_FAILED");
}
