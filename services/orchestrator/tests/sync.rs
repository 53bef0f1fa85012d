mod common;

use common::{manifest_entries, write_images};
use orchestrator::bucket::{DatasetLayout, RemoteBucket, IMAGE_CONTENT_TYPE};
use orchestrator::error::DemoError;
use orchestrator::object_store::{InMemoryObjectStore, ObjectMeta, ObjectStore};

const BUCKET: &str = "shoe-classification-qwertyuiop";
const DATE: &str = "2026-10-19T08:25:00.000Z";

#[tokio::test]
async fn test_sync_uploads_images_and_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);

    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    let report = bucket.sync_dataset(&layout, DATE).await.unwrap();

    assert_eq!(report.images_uploaded, 98);
    assert_eq!(report.train.records, 50);
    assert_eq!(report.test.records, 48);
    assert_eq!(report.train.per_class["canvasshoes"], 25);
    assert_eq!(report.test.per_class["chunkysneakers"], 24);
    assert_eq!(report.train_manifest.key, "shoes/train/train.manifest");
    assert_eq!(report.test_manifest.bucket, BUCKET);

    let keys = store.object_keys(BUCKET);
    assert_eq!(keys.len(), 100);

    let image = store.object(BUCKET, "shoes/train/canvasshoes/1.jpg").unwrap();
    assert_eq!(image.body, b"jpeg train canvasshoes 1");
    assert_eq!(image.meta.content_type, IMAGE_CONTENT_TYPE);
    assert_eq!(image.meta.title, "shoes/train/canvasshoes/1.jpg");

    let manifest = store.object(BUCKET, "shoes/test/test.manifest").unwrap();
    assert_eq!(manifest.meta.content_type, IMAGE_CONTENT_TYPE);
    assert_eq!(manifest.meta.title, "shoes/test/test.manifest");
}

#[tokio::test]
async fn test_manifests_cover_their_split_only() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);

    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    bucket.sync_dataset(&layout, DATE).await.unwrap();

    let train = manifest_entries(&dir.path().join("shoes/train/train.manifest"), "shoe-type");
    let test = manifest_entries(&dir.path().join("shoes/test/test.manifest"), "shoe-type");

    assert_eq!(train[0], (format!("s3://{BUCKET}/shoes/train/canvasshoes/1.jpg"), "canvasshoes".to_string()));
    assert_eq!(train[1], (format!("s3://{BUCKET}/shoes/train/chunkysneakers/1.jpg"), "chunkysneakers".to_string()));
    assert!(train.iter().all(|(r, _)| r.contains("/shoes/train/")));
    assert!(test.iter().all(|(r, _)| r.contains("/shoes/test/")));
    assert!(!test.iter().any(|(r, _)| r.ends_with("/25.jpg")));
    assert!(!train.iter().any(|(r, _)| r.ends_with("/26.jpg")));

    // every source-ref points at an uploaded object
    for (source_ref, class) in train.iter().chain(&test) {
        let key = source_ref.strip_prefix(&format!("s3://{BUCKET}/")).unwrap();
        assert!(store.object(BUCKET, key).is_some(), "{key} missing");
        assert!(key.contains(&format!("/{class}/")));
    }
}

#[tokio::test]
async fn test_manifests_are_uploaded_last() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);

    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    bucket.sync_dataset(&layout, DATE).await.unwrap();

    let log = store.put_log();
    assert_eq!(log.len(), 100);
    assert_eq!(log[98], "shoes/test/test.manifest");
    assert_eq!(log[99], "shoes/train/train.manifest");
    assert!(log[..98].iter().all(|k| k.ends_with(".jpg")));
}

#[tokio::test]
async fn test_ensure_existing_bucket_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());

    assert_eq!(bucket.ensure().await.unwrap(), BUCKET);
    let policy = store.policy(BUCKET).unwrap();
    assert!(policy.contains("rekognition.amazonaws.com"));

    let meta = ObjectMeta { content_type: "text/plain".into(), title: "keep".into() };
    store.put_object(BUCKET, "keep", b"x".to_vec(), &meta).await.unwrap();

    assert_eq!(bucket.ensure().await.unwrap(), BUCKET);
    assert_eq!(store.object_keys(BUCKET), vec!["keep".to_string()]);
    assert_eq!(store.policy(BUCKET).unwrap(), policy);
}

#[tokio::test]
async fn test_missing_image_aborts_with_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);
    std::fs::remove_file(dir.path().join("shoes/train/chunkysneakers/3.jpg")).unwrap();

    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    let err = bucket.sync_dataset(&layout, DATE).await.unwrap_err();

    match err {
        DemoError::NotFound(p) => assert_eq!(p, "shoes/train/chunkysneakers/3.jpg"),
        other => panic!("unexpected error: {other}"),
    }
    // uploads before the failure stay, no manifest went up
    assert_eq!(store.put_log().len(), 5);
    assert!(store.object(BUCKET, "shoes/train/train.manifest").is_none());
}

#[tokio::test]
async fn test_remote_failure_keeps_message_and_partial_bucket() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);

    let store = InMemoryObjectStore::new().failing_put("shoes/test/canvasshoes/26.jpg");
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    let err = bucket.sync_dataset(&layout, DATE).await.unwrap_err();

    assert_eq!(err.to_string(), "We encountered an internal error. Please try again.");
    assert_eq!(store.object_keys(BUCKET).len(), 50);
}

#[tokio::test]
async fn test_upload_object_of_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();

    let err = bucket.upload_object("nope.jpg", "nope.jpg").await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to read local file nope.jpg");
}

#[tokio::test]
async fn test_teardown_pages_through_everything() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DatasetLayout::default();
    write_images(dir.path(), &layout);

    let store = InMemoryObjectStore::new().with_page_size(7);
    let bucket = RemoteBucket::attach(&store, BUCKET, dir.path());
    bucket.ensure().await.unwrap();
    bucket.sync_dataset(&layout, DATE).await.unwrap();

    let report = bucket.teardown().await.unwrap();
    assert!(report.existed);
    assert_eq!(report.objects_deleted, 100);
    // one version per upload plus one delete marker per object
    assert_eq!(report.versions_deleted, 200);
    assert!(!store.has_bucket(BUCKET));

    let again = bucket.teardown().await.unwrap();
    assert!(!again.existed);
    assert_eq!(again.objects_deleted, 0);
}

#[tokio::test]
async fn test_teardown_of_unknown_bucket_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryObjectStore::new();
    let bucket = RemoteBucket::attach(&store, "never-created", dir.path());
    assert_eq!(bucket.teardown().await.unwrap(), Default::default());
}

#[tokio::test]
async fn test_random_bucket_name_uses_prefix() {
    use rand::SeedableRng;

    let dir = tempfile::tempdir().unwrap();
    let store = InMemoryObjectStore::new();
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let bucket = RemoteBucket::with_random_name(&store, "shoe-classification", &mut rng, dir.path());

    let suffix = bucket.name().strip_prefix("shoe-classification-").unwrap();
    assert_eq!(suffix.len(), 10);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));
}
