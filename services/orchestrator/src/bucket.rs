//! Dataset synchronizer: owns one remote bucket, fills it with the labeled
//! images plus their manifests, and removes it again.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use groundtruth::{validate_manifest_and_hash, ManifestSummary, ManifestWriter, Split};
use rand::Rng;
use tracing::{error, info, instrument, warn};

use crate::error::{DemoError, Result};
use crate::naming;
use crate::object_store::{ObjectMeta, ObjectStore};
use crate::project::StorageLocation;

pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

const POLICY_TEMPLATE: &str = include_str!("../policy/bucket_policy.json");

/// Access policy letting the training service read the dataset and write its output.
pub fn bucket_policy(bucket: &str) -> String {
    POLICY_TEMPLATE.replace("${bucket}", bucket)
}

/// Where the labeled images live and which manifests describe them.
#[derive(Clone, Debug)]
pub struct DatasetLayout {
    pub image_dir: String,
    pub categories: Vec<String>,
    pub train_range: RangeInclusive<u32>,
    pub test_range: RangeInclusive<u32>,
    pub train_manifest: String,
    pub test_manifest: String,
    pub label_field: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            image_dir: "shoes".to_string(),
            categories: vec!["canvasshoes".to_string(), "chunkysneakers".to_string()],
            train_range: 1..=25,
            test_range: 26..=49,
            train_manifest: "shoes/train/train.manifest".to_string(),
            test_manifest: "shoes/test/test.manifest".to_string(),
            label_field: "shoe-type".to_string(),
        }
    }
}

impl DatasetLayout {
    /// `shoes/<split>/<category>/<index>.jpg`
    pub fn image_key(&self, split: Split, category: &str, index: u32) -> String {
        format!("{}/{split}/{category}/{index}.jpg", self.image_dir.trim_end_matches('/'))
    }
}

#[derive(Clone, Debug)]
pub struct SyncReport {
    pub images_uploaded: u64,
    pub train: ManifestSummary,
    pub test: ManifestSummary,
    pub train_manifest: StorageLocation,
    pub test_manifest: StorageLocation,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub existed: bool,
    pub objects_deleted: u64,
    pub versions_deleted: u64,
}

pub struct RemoteBucket<'a, S: ObjectStore> {
    store: &'a S,
    name: String,
    resource_root: PathBuf,
}

impl<'a, S: ObjectStore> RemoteBucket<'a, S> {
    /// New bucket handle named `<prefix>-<random suffix>`.
    pub fn with_random_name<R: Rng>(store: &'a S, prefix: &str, rng: &mut R, resource_root: &Path) -> Self {
        let name = naming::bucket_name(prefix, rng);
        info!(bucket = %name, "bucket name chosen");
        Self::attach(store, &name, resource_root)
    }

    /// Handle for a bucket whose name is already known.
    pub fn attach(store: &'a S, name: &str, resource_root: &Path) -> Self {
        Self {
            store,
            name: name.to_string(),
            resource_root: resource_root.to_path_buf(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates the bucket and applies the access policy. An existing bucket is left untouched.
    #[instrument(skip(self), fields(bucket = %self.name))]
    pub async fn ensure(&self) -> Result<String> {
        if self.store.bucket_exists(&self.name).await.map_err(log_remote)? {
            warn!("bucket already exists");
            return Ok(self.name.clone());
        }
        self.store.create_bucket(&self.name).await.map_err(log_remote)?;
        self.store
            .put_bucket_policy(&self.name, &bucket_policy(&self.name))
            .await
            .map_err(log_remote)?;
        info!("bucket created");
        Ok(self.name.clone())
    }

    /// Uploads `local_path` (relative to the resource root) as `remote_key`.
    ///
    /// Every object, manifests included, is tagged as image data.
    pub async fn upload_object(&self, local_path: &str, remote_key: &str) -> Result<()> {
        let path = self.resource_root.join(local_path);
        let body = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DemoError::NotFound(local_path.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let meta = ObjectMeta {
            content_type: IMAGE_CONTENT_TYPE.to_string(),
            title: remote_key.to_string(),
        };
        self.store
            .put_object(&self.name, remote_key, body, &meta)
            .await
            .map_err(log_remote)?;
        info!(key = %remote_key, "uploaded");
        Ok(())
    }

    /// Uploads every image of `layout`, writes both manifests while doing so,
    /// and uploads the manifests last.
    ///
    /// A failure aborts immediately; objects uploaded so far stay in the bucket.
    #[instrument(skip(self, layout, creation_date), fields(bucket = %self.name))]
    pub async fn sync_dataset(&self, layout: &DatasetLayout, creation_date: &str) -> Result<SyncReport> {
        let train_path = self.manifest_path(&layout.train_manifest)?;
        let test_path = self.manifest_path(&layout.test_manifest)?;

        let mut train = ManifestWriter::create(&train_path, &self.name, &layout.label_field, creation_date)?;
        let mut test = ManifestWriter::create(&test_path, &self.name, &layout.label_field, creation_date)?;
        let mut images_uploaded = 0;

        for (split, range, writer) in [
            (Split::Train, layout.train_range.clone(), &mut train),
            (Split::Test, layout.test_range.clone(), &mut test),
        ] {
            for index in range {
                for category in &layout.categories {
                    let key = layout.image_key(split, category, index);
                    self.upload_object(&key, &key).await?;
                    writer.append(&key, category)?;
                    images_uploaded += 1;
                }
            }
        }

        let (_, train_summary) = train.finish()?;
        let (_, test_summary) = test.finish()?;
        info!(
            train = train_summary.records,
            test = test_summary.records,
            "manifests written"
        );

        for (key, path) in [(&layout.test_manifest, &test_path), (&layout.train_manifest, &train_path)] {
            check_manifest(path, &layout.label_field).await?;
            self.upload_object(key, key).await?;
        }

        Ok(SyncReport {
            images_uploaded,
            train: train_summary,
            test: test_summary,
            train_manifest: StorageLocation::new(&self.name, &layout.train_manifest),
            test_manifest: StorageLocation::new(&self.name, &layout.test_manifest),
        })
    }

    /// Deletes all objects, then all object versions, then the bucket itself.
    /// A bucket that does not exist is not an error.
    #[instrument(skip(self), fields(bucket = %self.name))]
    pub async fn teardown(&self) -> Result<TeardownReport> {
        let mut report = TeardownReport::default();
        if !self.store.bucket_exists(&self.name).await.map_err(log_remote)? {
            warn!("bucket does not exist");
            return Ok(report);
        }
        report.existed = true;

        let mut cursor = None;
        loop {
            let page = self.store.list_objects(&self.name, cursor).await.map_err(log_remote)?;
            for key in &page.items {
                self.store.delete_object(&self.name, key).await.map_err(log_remote)?;
                report.objects_deleted += 1;
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        // versioned buckets keep old versions and delete markers around
        let mut cursor = None;
        loop {
            let page = self
                .store
                .list_object_versions(&self.name, cursor)
                .await
                .map_err(log_remote)?;
            for v in &page.items {
                self.store
                    .delete_object_version(&self.name, &v.key, &v.version_id)
                    .await
                    .map_err(log_remote)?;
                report.versions_deleted += 1;
            }
            match page.next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.store.delete_bucket(&self.name).await.map_err(log_remote)?;
        info!(
            objects = report.objects_deleted,
            versions = report.versions_deleted,
            "bucket deleted"
        );
        Ok(report)
    }

    fn manifest_path(&self, rel: &str) -> Result<PathBuf> {
        let path = self.resource_root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

fn log_remote(e: DemoError) -> DemoError {
    error!("{e}");
    e
}

async fn check_manifest(path: &Path, label_field: &str) -> Result<()> {
    let p = path.to_path_buf();
    let field = label_field.to_string();
    let stats = tokio::task::spawn_blocking(move || validate_manifest_and_hash(&p, &field))
        .await
        .map_err(|e| DemoError::Io(std::io::Error::other(e)))?
        .map_err(|errors| DemoError::InvalidManifest {
            path: path.display().to_string(),
            errors,
        })?;
    info!(
        manifest = %path.display(),
        records = stats.records,
        blake3 = %stats.hash_hex(),
        classes = ?stats.per_class,
        "manifest validated"
    );
    Ok(())
}
