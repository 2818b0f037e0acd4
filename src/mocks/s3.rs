//! In-memory object store that speaks the S3 REST wire protocol.
//!
//! Requests must use path-style addressing (`/bucket/key`), which is what any
//! configuration with a custom endpoint produces. The store implements just
//! enough of the service to exercise the client end to end: bucket
//! create/list/delete, object put/get/head/delete, conditional get and
//! marker-based listing with an optional delimiter.

use super::transport::drain;
use crate::error::NetworkError;
use crate::transport::{BodyStream, HttpRequest, HttpResponse, HttpTransport};
use crate::xml::S3_NAMESPACE;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use parking_lot::Mutex;
use percent_encoding::percent_decode_str;
use quick_xml::escape::escape;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

/// Endpoint to configure clients with.
pub const IN_MEMORY_ENDPOINT: &str = "http://localhost:9000";

const DEFAULT_MAX_KEYS: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    e_tag: String,
    content_type: Option<String>,
    metadata: Vec<(String, String)>,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Store {
    buckets: BTreeMap<String, (DateTime<Utc>, BTreeMap<String, StoredObject>)>,
}

/// Stateful S3 stand-in.
#[derive(Debug, Default)]
pub struct InMemoryS3 {
    store: Mutex<Store>,
    requests: AtomicU64,
}

impl InMemoryS3 {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests served.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    /// Keys currently stored in `bucket`, in order.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.store
            .lock()
            .buckets
            .get(bucket)
            .map(|(_, objects)| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let n = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = format!("MEM{n:08}");

        let url = match Url::parse(&request.url) {
            Ok(url) => url,
            Err(_) => return error(400, "InvalidURI", "Malformed URL", &request_id),
        };
        let path = percent_decode_str(url.path()).decode_utf8_lossy().into_owned();
        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let trimmed = path.strip_prefix('/').unwrap_or(&path);
        let (bucket, key) = match trimmed.split_once('/') {
            Some((bucket, key)) => (bucket, Some(key)),
            None => (trimmed, None),
        };

        let response = match (request.method.as_str(), bucket, key) {
            ("GET", "", None) => self.list_buckets(),
            ("PUT", bucket, None) => self.create_bucket(bucket),
            ("DELETE", bucket, None) => self.delete_bucket(bucket),
            ("GET", bucket, None) => self.list_objects(bucket, &query),
            ("PUT", bucket, Some(key)) => self.put_object(bucket, key, request),
            ("GET", bucket, Some(key)) => self.get_object(bucket, key, request, true),
            ("HEAD", bucket, Some(key)) => self.get_object(bucket, key, request, false),
            ("DELETE", bucket, Some(key)) => self.delete_object(bucket, key),
            _ => error(405, "MethodNotAllowed", "Method not allowed", &request_id),
        };
        response
            .with_header("x-amz-id-2", format!("mem-host-{n}"))
            .with_header("date", Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string())
            .with_header("x-amz-request-id", request_id)
    }

    fn list_buckets(&self) -> HttpResponse {
        let store = self.store.lock();
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListAllMyBucketsResult xmlns=\"{S3_NAMESPACE}\">\
             <Owner><ID>mem-owner</ID><DisplayName>mem</DisplayName></Owner><Buckets>"
        );
        for (name, (created, _)) in &store.buckets {
            let _ = write!(
                xml,
                "<Bucket><Name>{}</Name><CreationDate>{}</CreationDate></Bucket>",
                escape(name.as_str()),
                created.to_rfc3339()
            );
        }
        xml.push_str("</Buckets></ListAllMyBucketsResult>");
        xml_response(xml)
    }

    fn create_bucket(&self, bucket: &str) -> HttpResponse {
        let mut store = self.store.lock();
        if store.buckets.contains_key(bucket) {
            return error(409, "BucketAlreadyOwnedByYou", "Bucket exists", bucket);
        }
        store
            .buckets
            .insert(bucket.to_string(), (Utc::now(), BTreeMap::new()));
        HttpResponse::new(200).with_header("location", format!("/{bucket}"))
    }

    fn delete_bucket(&self, bucket: &str) -> HttpResponse {
        let mut store = self.store.lock();
        let empty = store.buckets.get(bucket).map(|(_, objects)| objects.is_empty());
        match empty {
            None => no_such_bucket(bucket),
            Some(false) => error(409, "BucketNotEmpty", "The bucket is not empty", bucket),
            Some(true) => {
                store.buckets.remove(bucket);
                HttpResponse::new(204)
            }
        }
    }

    fn list_objects(&self, bucket: &str, query: &HashMap<String, String>) -> HttpResponse {
        let store = self.store.lock();
        let Some((_, objects)) = store.buckets.get(bucket) else {
            return no_such_bucket(bucket);
        };

        let prefix = query.get("prefix").map(String::as_str).unwrap_or("");
        let marker = query.get("marker").map(String::as_str).unwrap_or("");
        let delimiter = query.get("delimiter").map(String::as_str).unwrap_or("");
        let max_keys = query
            .get("max-keys")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_KEYS);

        let mut contents: Vec<(&String, &StoredObject)> = Vec::new();
        let mut prefixes: Vec<String> = Vec::new();
        let mut last_item: Option<String> = None;
        let mut truncated = false;

        for (key, object) in objects.range::<str, _>((
            std::ops::Bound::Excluded(marker),
            std::ops::Bound::Unbounded,
        )) {
            if !key.starts_with(prefix) {
                continue;
            }
            let rolled = if delimiter.is_empty() {
                None
            } else {
                key[prefix.len()..]
                    .find(delimiter)
                    .map(|at| key[..prefix.len() + at + delimiter.len()].to_string())
            };
            let item = match &rolled {
                Some(common) if common.as_str() <= marker => continue,
                Some(common) if prefixes.last() == Some(common) => continue,
                Some(common) => common.clone(),
                None => key.clone(),
            };

            if contents.len() + prefixes.len() == max_keys {
                truncated = true;
                break;
            }
            match rolled {
                Some(common) => prefixes.push(common),
                None => contents.push((key, object)),
            }
            last_item = Some(item);
        }

        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"{S3_NAMESPACE}\">\
             <Name>{}</Name><Prefix>{}</Prefix><Marker>{}</Marker><MaxKeys>{}</MaxKeys>",
            escape(bucket),
            escape(prefix),
            escape(marker),
            max_keys
        );
        if !delimiter.is_empty() {
            let _ = write!(xml, "<Delimiter>{}</Delimiter>", escape(delimiter));
            if truncated {
                if let Some(next) = &last_item {
                    let _ = write!(xml, "<NextMarker>{}</NextMarker>", escape(next.as_str()));
                }
            }
        }
        let _ = write!(xml, "<IsTruncated>{truncated}</IsTruncated>");
        for (key, object) in contents {
            let _ = write!(
                xml,
                "<Contents><Key>{}</Key><LastModified>{}</LastModified><ETag>{}</ETag>\
                 <Size>{}</Size><StorageClass>STANDARD</StorageClass></Contents>",
                escape(key.as_str()),
                object.last_modified.to_rfc3339(),
                escape(object.e_tag.as_str()),
                object.data.len()
            );
        }
        for common in prefixes {
            let _ = write!(
                xml,
                "<CommonPrefixes><Prefix>{}</Prefix></CommonPrefixes>",
                escape(common.as_str())
            );
        }
        xml.push_str("</ListBucketResult>");
        xml_response(xml)
    }

    fn put_object(&self, bucket: &str, key: &str, request: &HttpRequest) -> HttpResponse {
        let mut store = self.store.lock();
        let Some((_, objects)) = store.buckets.get_mut(bucket) else {
            return no_such_bucket(bucket);
        };

        let data = request.body.clone().unwrap_or_default();
        let e_tag = format!("\"{}\"", hex::encode(Md5::digest(&data)));
        let metadata = request
            .headers
            .iter()
            .filter(|(name, _)| name.starts_with("x-amz-meta-"))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                e_tag: e_tag.clone(),
                content_type: request.get_header("content-type").map(str::to_string),
                metadata,
                last_modified: Utc::now(),
            },
        );
        HttpResponse::new(200).with_header("etag", e_tag)
    }

    fn get_object(
        &self,
        bucket: &str,
        key: &str,
        request: &HttpRequest,
        with_body: bool,
    ) -> HttpResponse {
        let store = self.store.lock();
        let Some((_, objects)) = store.buckets.get(bucket) else {
            return not_found_head(no_such_bucket(bucket), with_body);
        };
        let Some(object) = objects.get(key) else {
            let resource = format!("{bucket}/{key}");
            return not_found_head(
                error(404, "NoSuchKey", "The specified key does not exist.", &resource),
                with_body,
            );
        };

        if request.get_header("if-none-match") == Some(object.e_tag.as_str()) {
            return HttpResponse::new(304).with_header("etag", object.e_tag.clone());
        }

        let mut response = HttpResponse::new(200)
            .with_header("etag", object.e_tag.clone())
            .with_header("content-length", object.data.len().to_string())
            .with_header("last-modified", object.last_modified.to_rfc2822());
        if let Some(content_type) = &object.content_type {
            response = response.with_header("content-type", content_type.clone());
        }
        for (name, value) in &object.metadata {
            response = response.with_header(name, value.clone());
        }
        if with_body {
            response = response.with_body(object.data.clone());
        }
        response
    }

    fn delete_object(&self, bucket: &str, key: &str) -> HttpResponse {
        let mut store = self.store.lock();
        match store.buckets.get_mut(bucket) {
            None => no_such_bucket(bucket),
            Some((_, objects)) => {
                objects.remove(key);
                HttpResponse::new(204)
            }
        }
    }
}

fn xml_response(xml: String) -> HttpResponse {
    HttpResponse::new(200)
        .with_header("content-type", "application/xml")
        .with_body(xml.into_bytes())
}

fn error(status: u16, code: &str, message: &str, resource: &str) -> HttpResponse {
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Error><Code>{code}</Code><Message>{}</Message><Resource>{}</Resource></Error>",
        escape(message),
        escape(resource)
    );
    HttpResponse::new(status)
        .with_header("content-type", "application/xml")
        .with_body(xml.into_bytes())
}

fn no_such_bucket(bucket: &str) -> HttpResponse {
    error(404, "NoSuchBucket", "The specified bucket does not exist", bucket)
}

/// HEAD responses carry no body, so the service code is lost.
fn not_found_head(response: HttpResponse, with_body: bool) -> HttpResponse {
    if with_body {
        response
    } else {
        HttpResponse::new(response.status)
    }
}

#[async_trait]
impl HttpTransport for InMemoryS3 {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        Ok(self.handle(&request))
    }

    async fn send_streaming(
        &self,
        mut request: HttpRequest,
        body: BodyStream,
    ) -> Result<HttpResponse, NetworkError> {
        request.body = Some(drain(body).await?);
        Ok(self.handle(&request))
    }
}
