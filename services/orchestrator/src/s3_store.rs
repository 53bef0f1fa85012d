use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;

use crate::error::Result;
use crate::object_store::{ObjectMeta, ObjectStore, ObjectVersion, Page, VersionCursor};

/// `ObjectStore` backed by Amazon S3.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    region: Option<String>,
}

impl S3ObjectStore {
    pub fn new(client: Client, region: Option<String>) -> Self {
        Self { client, region }
    }
}

/// Reads bucket existence off a failed `HeadBucket` status.
/// 403 means the bucket exists but belongs to someone else.
fn existence_from_status(status: Option<u16>) -> Option<bool> {
    match status {
        Some(404) => Some(false),
        Some(403) => Some(true),
        _ => None,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(false);
                }
                match existence_from_status(err.raw_response().map(|r| r.status().as_u16())) {
                    Some(exists) => Ok(exists),
                    None => Err(err.into()),
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let mut req = self.client.create_bucket().bucket(bucket);
        // us-east-1 rejects an explicit location constraint
        if let Some(region) = self.region.as_deref().filter(|r| *r != "us-east-1") {
            req = req.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }
        req.send().await?;
        Ok(())
    }

    async fn put_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()> {
        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy)
            .send()
            .await?;
        Ok(())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>, meta: &ObjectMeta) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(&meta.content_type)
            .metadata("title", &meta.title)
            .send()
            .await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, cursor: Option<String>) -> Result<Page<String, String>> {
        let resp = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(cursor)
            .send()
            .await?;

        let items = resp
            .contents()
            .iter()
            .filter_map(|o| o.key().map(str::to_string))
            .collect();
        let next = if resp.is_truncated().unwrap_or(false) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(Page { items, next })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client.delete_object().bucket(bucket).key(key).send().await?;
        Ok(())
    }

    async fn list_object_versions(
        &self,
        bucket: &str,
        cursor: Option<VersionCursor>,
    ) -> Result<Page<ObjectVersion, VersionCursor>> {
        let cursor = cursor.unwrap_or_default();
        let resp = self
            .client
            .list_object_versions()
            .bucket(bucket)
            .set_key_marker(cursor.key_marker)
            .set_version_id_marker(cursor.version_id_marker)
            .send()
            .await?;

        let versions = resp
            .versions()
            .iter()
            .filter_map(|v| Some((v.key()?, v.version_id()?)));
        let markers = resp
            .delete_markers()
            .iter()
            .filter_map(|m| Some((m.key()?, m.version_id()?)));
        let items = versions
            .chain(markers)
            .map(|(key, version_id)| ObjectVersion {
                key: key.to_string(),
                version_id: version_id.to_string(),
            })
            .collect();

        let next = if resp.is_truncated().unwrap_or(false) {
            Some(VersionCursor {
                key_marker: resp.next_key_marker().map(str::to_string),
                version_id_marker: resp.next_version_id_marker().map(str::to_string),
            })
        } else {
            None
        };
        Ok(Page { items, next })
    }

    async fn delete_object_version(&self, bucket: &str, key: &str, version_id: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .version_id(version_id)
            .send()
            .await?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.client.delete_bucket().bucket(bucket).send().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_bucket_status_mapping() {
        assert_eq!(existence_from_status(Some(404)), Some(false));
        assert_eq!(existence_from_status(Some(403)), Some(true));
        assert_eq!(existence_from_status(Some(500)), None);
        assert_eq!(existence_from_status(None), None);
    }
}
