//! End-to-end scenarios against the in-memory object store.

use bytes::Bytes;
use libaws::error::ServiceErrorKind;
use libaws::mocks::{InMemoryS3, TestFixtures};
use libaws::request::s3::{validate_bucket, validate_key};
use libaws::types::*;
use libaws::{S3Connection, S3ConnectionImpl};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use test_case::test_case;
use tokio::io::AsyncWriteExt;

fn connect() -> (S3ConnectionImpl, Arc<InMemoryS3>) {
    let store = Arc::new(InMemoryS3::new());
    let connection = S3ConnectionImpl::builder()
        .config(TestFixtures::in_memory_config())
        .transport(store.clone())
        .build()
        .unwrap();
    (connection, store)
}

async fn seed(s3: &S3ConnectionImpl, bucket: &str, keys: &[&str]) {
    s3.buckets().create(bucket).await.unwrap();
    for key in keys {
        s3.objects()
            .put(&PutObjectRequest::new(bucket, *key), Bytes::from(key.to_string()))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_object_lifecycle() {
    let (s3, _) = connect();
    s3.buckets().create("photos").await.unwrap();

    let listing = s3.buckets().list_all().await.unwrap();
    assert_eq!(listing.buckets.len(), 1);
    assert_eq!(listing.buckets[0].name, "photos");

    let request = PutObjectRequest::new("photos", "2024/cat.jpg")
        .with_content_type("image/jpeg")
        .with_metadata("camera", "x100");
    let put = s3.objects().put(&request, &b"meow"[..]).await.unwrap();
    let e_tag = put.e_tag.unwrap();

    let head = s3.objects().head("photos", "2024/cat.jpg").await.unwrap();
    assert_eq!(head.content_length, Some(4));
    assert_eq!(head.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(head.metadata.get("camera").map(String::as_str), Some("x100"));
    assert_eq!(head.e_tag.as_deref(), Some(e_tag.as_str()));

    let get = s3.objects().get("photos", "2024/cat.jpg").await.unwrap();
    assert_eq!(&get.body.collect().await.unwrap()[..], b"meow");

    let unchanged = s3
        .objects()
        .get_if_changed("photos", "2024/cat.jpg", &e_tag)
        .await
        .unwrap();
    assert!(!unchanged.is_modified());

    let changed = s3
        .objects()
        .get_if_changed("photos", "2024/cat.jpg", "\"other\"")
        .await
        .unwrap();
    let body = changed.into_modified().unwrap().body.collect().await.unwrap();
    assert_eq!(&body[..], b"meow");

    s3.objects().delete("photos", "2024/cat.jpg").await.unwrap();
    let err = s3.objects().get("photos", "2024/cat.jpg").await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::ObjectNotFound));
    assert!(err.request_id().is_some());

    s3.buckets().delete("photos").await.unwrap();
    assert!(s3.buckets().list_all().await.unwrap().buckets.is_empty());
}

#[tokio::test]
async fn test_overwrite_changes_etag() {
    let (s3, _) = connect();
    seed(&s3, "docs", &[]).await;

    let request = PutObjectRequest::new("docs", "note");
    let first = s3.objects().put(&request, "v1").await.unwrap().e_tag.unwrap();
    let second = s3.objects().put(&request, "v2").await.unwrap().e_tag.unwrap();
    assert_ne!(first, second);

    let output = s3
        .objects()
        .get_if_changed("docs", "note", &first)
        .await
        .unwrap();
    assert!(output.is_modified());
}

#[tokio::test]
async fn test_delete_non_empty_bucket() {
    let (s3, _) = connect();
    seed(&s3, "full", &["k"]).await;

    let err = s3.buckets().delete("full").await.unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::NotEmpty));
}

#[tokio::test]
async fn test_missing_bucket_and_key() {
    let (s3, _) = connect();
    let err = s3
        .objects()
        .list_bucket("nowhere", "", "", 0)
        .await
        .unwrap_err();
    assert_eq!(err.service_kind(), Some(ServiceErrorKind::BucketNotFound));

    seed(&s3, "here", &[]).await;
    let err = s3.objects().head("here", "ghost").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.service_code(), None);
}

#[tokio::test]
async fn test_delimiter_rolls_up_keys() {
    let (s3, _) = connect();
    seed(&s3, "tree", &["a/1", "a/2", "b", "c/x/y", "c/z"]).await;

    let listing = s3
        .objects()
        .list_bucket_with_delimiter("tree", "", "", "/", 0)
        .await
        .unwrap();
    assert_eq!(listing.keys().collect::<Vec<_>>(), vec!["b"]);
    assert_eq!(listing.common_prefixes, vec!["a/".to_string(), "c/".to_string()]);

    let nested = s3
        .objects()
        .list_bucket_with_delimiter("tree", "c/", "", "/", 0)
        .await
        .unwrap();
    assert_eq!(nested.keys().collect::<Vec<_>>(), vec!["c/z"]);
    assert_eq!(nested.common_prefixes, vec!["c/x/".to_string()]);
}

#[tokio::test]
async fn test_marker_excludes_earlier_keys() {
    let (s3, _) = connect();
    seed(&s3, "abc", &["a", "b", "c"]).await;

    let listing = s3.objects().list_bucket("abc", "", "a", 0).await.unwrap();
    assert_eq!(listing.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    assert!(!listing.is_truncated);
}

#[tokio::test]
async fn test_pagination_collects_every_key_in_order() {
    let (s3, store) = connect();
    let keys: Vec<String> = (0..25).map(|i| format!("key-{i:02}")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    seed(&s3, "many", &refs).await;

    let before = store.request_count();
    let all = s3
        .objects()
        .list_pages(ListBucketRequest::new("many").with_max_keys(7))
        .collect_all()
        .await
        .unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), refs);
    assert_eq!(store.request_count() - before, 4);
}

#[tokio::test]
async fn test_stream_file_round_trip() {
    let (s3, _) = connect();
    seed(&s3, "files", &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.bin");
    let data: Vec<u8> = (0..150_000u32).map(|i| (i * 7 % 256) as u8).collect();
    tokio::fs::write(&source_path, &data).await.unwrap();

    let mut source = tokio::fs::File::open(&source_path).await.unwrap();
    s3.objects()
        .put_stream(
            &PutObjectRequest::new("files", "blob"),
            &mut source,
            ObjectSize::MeasureBySeeking,
        )
        .await
        .unwrap();

    let target_path = dir.path().join("target.bin");
    let mut target = tokio::fs::File::create(&target_path).await.unwrap();
    let output = s3.objects().get("files", "blob").await.unwrap();
    assert_eq!(output.content_length, Some(data.len() as u64));
    let written = output.body.write_to(&mut target).await.unwrap();
    target.flush().await.unwrap();

    assert_eq!(written, data.len() as u64);
    assert_eq!(tokio::fs::read(&target_path).await.unwrap(), data);
}

#[tokio::test]
async fn test_parent_segment_cannot_escape_the_key() {
    let (s3, store) = connect();
    seed(&s3, "test-bucket", &["secret.txt"]).await;

    let before = store.request_count();
    let err = s3
        .objects()
        .put(&PutObjectRequest::new("test-bucket", "dir/../secret.txt"), "overwritten")
        .await
        .unwrap_err();
    assert!(err.is_construction_fault());
    assert_eq!(err.operation(), Some(libaws::Operation::Put));
    assert_eq!(store.request_count(), before);

    let kept = s3.objects().get("test-bucket", "secret.txt").await.unwrap();
    assert_eq!(&kept.body.collect().await.unwrap()[..], b"secret.txt");
}

#[tokio::test]
async fn test_responses_carry_host_id_and_date() {
    let (s3, _) = connect();
    let created = s3.buckets().create("stamped").await.unwrap();
    assert!(created.host_id.is_some());
    assert!(created.date.is_some());

    let err = s3.objects().head("stamped", "ghost").await.unwrap_err();
    match err {
        libaws::AwsError::Service(e) => assert!(e.host_id.is_some()),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test_case("photos", true ; "plain name")]
#[test_case("Legacy_Name.With.Dots", true ; "legacy name")]
#[test_case("", false ; "empty")]
#[test_case("a/b", false ; "slash")]
#[test_case("tab\there", false ; "control character")]
fn test_bucket_name_validation(bucket: &str, valid: bool) {
    assert_eq!(validate_bucket(bucket).is_ok(), valid);
}

#[test_case("k", true ; "single character")]
#[test_case(" spaced key ", true ; "surrounding spaces")]
#[test_case("", false ; "empty")]
#[test_case("a.b/.c", true ; "dots inside segments")]
#[test_case("dir/../secret.txt", false ; "parent segment")]
#[test_case("./a", false ; "current segment")]
fn test_key_validation(key: &str, valid: bool) {
    assert_eq!(validate_key(key).is_ok(), valid);
}

fn rolled_up(keys: &BTreeSet<String>) -> BTreeSet<String> {
    keys.iter()
        .map(|key| match key.find('/') {
            Some(at) => key[..=at].to_string(),
            None => key.clone(),
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_cursor_returns_every_key_once(
        keys in proptest::collection::btree_set(
            "[ab/+&. ]{1,5}".prop_filter("dot segment", |k| {
                !k.split('/').any(|s| s == "." || s == "..")
            }),
            0..16,
        ),
        page_size in 1u32..6,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (s3, _) = connect();
            let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
            seed(&s3, "prop", &refs).await;

            let flat = s3
                .objects()
                .list_pages(ListBucketRequest::new("prop").with_max_keys(page_size))
                .collect_all()
                .await
                .unwrap();
            let listed: Vec<&str> = flat.keys().collect();
            assert_eq!(listed, refs);

            let rolled = s3
                .objects()
                .list_pages(
                    ListBucketRequest::new("prop")
                        .with_delimiter("/")
                        .with_max_keys(page_size),
                )
                .collect_all()
                .await
                .unwrap();
            let mut items: Vec<String> = rolled.keys().map(str::to_string).collect();
            items.extend(rolled.common_prefixes.iter().cloned());
            let unique: BTreeSet<String> = items.iter().cloned().collect();
            assert_eq!(items.len(), unique.len());
            assert_eq!(unique, rolled_up(&keys));
        });
    }
}
