//! Object storage seam consumed by the dataset synchronizer.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::{DemoError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_type: String,
    /// Stored as the `title` user metadata attribute.
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VersionCursor {
    pub key_marker: Option<String>,
    pub version_id_marker: Option<String>,
}

/// One page of a listing. `next` is `Some` exactly when the listing was truncated.
#[derive(Clone, Debug)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;
    async fn create_bucket(&self, bucket: &str) -> Result<()>;
    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()>;
    async fn list_objects(&self, bucket: &str, cursor: Option<String>) -> Result<Page<String, String>>;
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
    /// Lists versions and delete markers alike.
    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<VersionCursor>,
    ) -> Result<Page<ObjectVersion, VersionCursor>>;
    async fn delete_object_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<()>;
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub meta: ObjectMeta,
    pub version_id: String,
}

#[derive(Default)]
struct MemBucket {
    policy: Option<String>,
    objects: BTreeMap<String, StoredObject>,
    versions: Vec<ObjectVersion>,
    next_version: u64,
}

impl MemBucket {
    fn new_version(&mut self, key: &str, prefix: char) -> String {
        self.next_version += 1;
        let version_id = format!("{prefix}{:08}", self.next_version);
        self.versions.push(ObjectVersion { key: key.to_string(), version_id: version_id.clone() });
        version_id
    }
}

/// Versioned in-memory bucket store (for tests and dry runs).
///
/// Deleting an object leaves a delete marker behind, and a bucket can only be
/// removed once no objects and no versions remain.
#[derive(Clone)]
pub struct InMemoryObjectStore {
    buckets: Arc<Mutex<BTreeMap<String, MemBucket>>>,
    put_log: Arc<Mutex<Vec<String>>>,
    page_size: usize,
    fail_put_key: Option<String>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self {
            buckets: Arc::new(Mutex::new(BTreeMap::new())),
            put_log: Arc::new(Mutex::new(Vec::new())),
            page_size: 1000,
            fail_put_key: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Makes every `put_object` for `key` fail with a remote error.
    pub fn failing_put(mut self, key: &str) -> Self {
        self.fail_put_key = Some(key.to_string());
        self
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MemBucket>> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn has_bucket(&self, bucket: &str) -> bool {
        self.lock().contains_key(bucket)
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock().get(bucket).and_then(|b| b.objects.get(key).cloned())
    }

    pub fn version_count(&self, bucket: &str) -> usize {
        self.lock().get(bucket).map(|b| b.versions.len()).unwrap_or(0)
    }

    /// Keys of every successful `put_object`, in call order.
    pub fn put_log(&self) -> Vec<String> {
        self.put_log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn policy(&self, bucket: &str) -> Option<String> {
        self.lock().get(bucket).and_then(|b| b.policy.clone())
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn no_such_bucket() -> DemoError {
    DemoError::Remote("The specified bucket does not exist".to_string())
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        Ok(self.has_bucket(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.lock();
        if buckets.contains_key(bucket) {
            return Err(DemoError::Remote(
                "Your previous request to create the named bucket succeeded and you already own it.".to_string(),
            ));
        }
        buckets.insert(bucket.to_string(), MemBucket::default());
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        serde_json::from_str::<serde_json::Value>(policy)
            .map_err(|e| DemoError::Remote(format!("Policies must be valid JSON: {e}")))?;
        let mut buckets = self.lock();
        let b = buckets.get_mut(bucket).ok_or_else(no_such_bucket)?;
        b.policy = Some(policy.to_string());
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()> {
        if self.fail_put_key.as_deref() == Some(key) {
            return Err(DemoError::Remote("We encountered an internal error. Please try again.".to_string()));
        }
        let mut buckets = self.lock();
        let b = buckets.get_mut(bucket).ok_or_else(no_such_bucket)?;
        let version_id = b.new_version(key, 'v');
        b.objects.insert(key.to_string(), StoredObject { body, meta: meta.clone(), version_id });
        drop(buckets);
        self.put_log.lock().unwrap_or_else(|e| e.into_inner()).push(key.to_string());
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, cursor: Option<String>) -> Result<Page<String, String>> {
        let buckets = self.lock();
        let b = buckets.get(bucket).ok_or_else(no_such_bucket)?;
        let mut rest = b
            .objects
            .keys()
            .filter(|k| cursor.as_ref().map_or(true, |c| k.as_str() > c.as_str()))
            .cloned();
        let items: Vec<String> = rest.by_ref().take(self.page_size).collect();
        let next = match rest.next() {
            Some(_) => items.last().cloned(),
            None => None,
        };
        Ok(Page { items, next })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let mut buckets = self.lock();
        let b = buckets.get_mut(bucket).ok_or_else(no_such_bucket)?;
        if b.objects.remove(key).is_some() {
            b.new_version(key, 'm');
        }
        Ok(())
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<VersionCursor>,
    ) -> Result<Page<ObjectVersion, VersionCursor>> {
        let buckets = self.lock();
        let b = buckets.get(bucket).ok_or_else(no_such_bucket)?;

        let mut all = b.versions.clone();
        all.sort_by(|x, y| (&x.key, &x.version_id).cmp(&(&y.key, &y.version_id)));

        let after = cursor.and_then(|c| Some((c.key_marker?, c.version_id_marker.unwrap_or_default())));
        let mut rest = all
            .into_iter()
            .filter(|v| after.as_ref().map_or(true, |(k, id)| (&v.key, &v.version_id) > (k, id)));
        let items: Vec<ObjectVersion> = rest.by_ref().take(self.page_size).collect();
        let next = match rest.next() {
            Some(_) => items.last().map(|v| VersionCursor {
                key_marker: Some(v.key.clone()),
                version_id_marker: Some(v.version_id.clone()),
            }),
            None => None,
        };
        Ok(Page { items, next })
    }

    async fn delete_object_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<()> {
        let mut buckets = self.lock();
        let b = buckets.get_mut(bucket).ok_or_else(no_such_bucket)?;
        b.versions.retain(|v| !(v.key == key && v.version_id == version_id));
        if b.objects.get(key).is_some_and(|o| o.version_id == version_id) {
            b.objects.remove(key);
        }
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut buckets = self.lock();
        let b = buckets.get(bucket).ok_or_else(no_such_bucket)?;
        if !b.objects.is_empty() || !b.versions.is_empty() {
            return Err(DemoError::Remote("The bucket you tried to delete is not empty".to_string()));
        }
        buckets.remove(bucket);
        Ok(())
    }
}
