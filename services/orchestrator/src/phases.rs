//! Run orchestrator: the train, run and cleanup phases, glued together by
//! the persisted `RunState`.
//!
//! Every later phase re-reads the state file. When the file or a required
//! key is missing the phase logs an error and does nothing, unless strict
//! mode turns that into `DemoError::NoState` / `DemoError::MissingState`.

use std::path::PathBuf;

use groundtruth::creation_date;
use rand::Rng;
use tracing::{error, info, instrument};

use crate::bucket::{DatasetLayout, RemoteBucket, TeardownReport};
use crate::error::{DemoError, Result};
use crate::lifecycle::{ProjectLifecycle, DEFAULT_MIN_CONFIDENCE};
use crate::naming;
use crate::object_store::ObjectStore;
use crate::project::{DetectedLabel, ProjectClient, TrainingRequest};
use crate::state::{
    RunState, KEY_BUCKET_NAME, KEY_MODEL_VERSION_ARN, KEY_PROJECT_ARN, KEY_PROJECT_VERSION,
    KEY_PROJECT_VERSION_ARN,
};

#[derive(Clone, Debug)]
pub struct RunSettings {
    pub project_name: String,
    pub resource_root: PathBuf,
    pub state_file: PathBuf,
    pub layout: DatasetLayout,
    pub sample_image: String,
    pub min_confidence: f32,
    pub output_prefix: String,
    pub strict_state: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            project_name: "shoe-classification".to_string(),
            resource_root: PathBuf::from("resources"),
            state_file: PathBuf::from("local.properties"),
            layout: DatasetLayout::default(),
            sample_image: "shoes/test/canvasshoes/26.jpg".to_string(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            output_prefix: "output".to_string(),
            strict_state: false,
        }
    }
}

pub struct Orchestrator<S: ObjectStore, P: ProjectClient> {
    store: S,
    lifecycle: ProjectLifecycle<P>,
    settings: RunSettings,
}

impl<S: ObjectStore, P: ProjectClient> Orchestrator<S, P> {
    pub fn new(store: S, lifecycle: ProjectLifecycle<P>, settings: RunSettings) -> Self {
        Self { store, lifecycle, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Phase A: bucket, dataset, project, training.
    ///
    /// State is saved right after submission so a restarted process can
    /// re-attach with `resume_training`, and again once training completed.
    #[instrument(skip_all, fields(phase = "train"))]
    pub async fn train<R: Rng>(&self, rng: &mut R) -> Result<RunState> {
        let s = &self.settings;
        let bucket = RemoteBucket::with_random_name(&self.store, &s.project_name, rng, &s.resource_root);
        let bucket_name = bucket.ensure().await?;

        let now = chrono::Utc::now();
        let report = bucket.sync_dataset(&s.layout, &creation_date(now)).await?;
        info!(images = report.images_uploaded, "dataset synchronized");

        let project_arn = self.lifecycle.create_project(&s.project_name).await?;
        let version_name = naming::version_label(&s.project_name, now);

        let req = TrainingRequest {
            project_arn: project_arn.clone(),
            version_name: version_name.clone(),
            output_bucket: bucket_name.clone(),
            output_prefix: s.output_prefix.clone(),
            training_manifest: report.train_manifest,
            testing_manifest: report.test_manifest,
        };
        let version_arn = self.lifecycle.begin_training(&req).await?;

        let mut state = RunState {
            project_arn: Some(project_arn),
            project_version_arn: Some(version_arn.clone()),
            project_version: Some(version_name.clone()),
            bucket_name: Some(bucket_name),
            model_version_arn: None,
        };
        state.save(&s.state_file)?;
        info!(state_file = %s.state_file.display(), "run state saved");

        self.lifecycle.await_training(&req.project_arn, &version_name).await?;
        state.model_version_arn = Some(version_arn);
        state.save(&s.state_file)?;
        info!("training completed");
        Ok(state)
    }

    /// Re-attaches to a submitted training job and waits for it to finish.
    #[instrument(skip_all, fields(phase = "train-resume"))]
    pub async fn resume_training(&self) -> Result<Option<RunState>> {
        let Some(mut state) = self.load_state()? else { return Ok(None) };
        let Some(project_arn) = self.required(&state.project_arn, KEY_PROJECT_ARN)? else { return Ok(None) };
        let Some(version_name) = self.required(&state.project_version, KEY_PROJECT_VERSION)? else { return Ok(None) };
        let Some(version_arn) = self.required(&state.project_version_arn, KEY_PROJECT_VERSION_ARN)? else {
            return Ok(None);
        };

        if state.model_version_arn.is_some() {
            info!("training already completed");
            return Ok(Some(state));
        }

        self.lifecycle.await_training(&project_arn, &version_name).await?;
        state.model_version_arn = Some(version_arn);
        state.save(&self.settings.state_file)?;
        info!("training completed");
        Ok(Some(state))
    }

    /// Phase B: start the trained version, classify the sample image, stop it.
    ///
    /// Every required key is checked before the first remote call.
    #[instrument(skip_all, fields(phase = "run"))]
    pub async fn run(&self) -> Result<Option<Vec<DetectedLabel>>> {
        let Some(state) = self.load_state()? else { return Ok(None) };
        let Some(model_arn) = self.required(&state.model_version_arn, KEY_MODEL_VERSION_ARN)? else {
            return Ok(None);
        };
        let Some(project_arn) = self.required(&state.project_arn, KEY_PROJECT_ARN)? else { return Ok(None) };
        let Some(version_name) = self.required(&state.project_version, KEY_PROJECT_VERSION)? else { return Ok(None) };
        let Some(bucket_name) = self.required(&state.bucket_name, KEY_BUCKET_NAME)? else { return Ok(None) };

        self.lifecycle.start_version(&model_arn, &project_arn, &version_name).await?;
        let labels = self
            .lifecycle
            .classify(&model_arn, &bucket_name, &self.settings.sample_image, self.settings.min_confidence)
            .await?;
        self.lifecycle.stop_version(&model_arn).await?;
        Ok(Some(labels))
    }

    /// Phase C: delete the project, then empty and delete the bucket.
    #[instrument(skip_all, fields(phase = "cleanup"))]
    pub async fn cleanup(&self) -> Result<Option<TeardownReport>> {
        let Some(state) = self.load_state()? else { return Ok(None) };
        let Some(project_arn) = self.required(&state.project_arn, KEY_PROJECT_ARN)? else { return Ok(None) };
        let Some(bucket_name) = self.required(&state.bucket_name, KEY_BUCKET_NAME)? else { return Ok(None) };

        info!(project_arn = %project_arn, "removing project");
        self.lifecycle.delete_project(&project_arn).await?;

        info!(bucket = %bucket_name, "removing bucket");
        let bucket = RemoteBucket::attach(&self.store, &bucket_name, &self.settings.resource_root);
        let report = bucket.teardown().await?;
        Ok(Some(report))
    }

    /// Train and clean up again in one go.
    pub async fn demo<R: Rng>(&self, rng: &mut R) -> Result<Option<TeardownReport>> {
        self.train(rng).await?;
        self.cleanup().await
    }

    fn load_state(&self) -> Result<Option<RunState>> {
        let path = &self.settings.state_file;
        match RunState::load(path)? {
            Some(state) => Ok(Some(state)),
            None if self.settings.strict_state => Err(DemoError::NoState(path.display().to_string())),
            None => {
                error!(state_file = %path.display(), "unable to load run state, nothing to do");
                Ok(None)
            }
        }
    }

    fn required(&self, value: &Option<String>, key: &'static str) -> Result<Option<String>> {
        match RunState::require(value, key) {
            Ok(v) => Ok(Some(v)),
            Err(e) if self.settings.strict_state => Err(e),
            Err(_) => {
                error!(key, "run state is incomplete, nothing to do");
                Ok(None)
            }
        }
    }
}
