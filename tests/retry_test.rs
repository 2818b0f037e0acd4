//! Retry and timeout behavior of the request executor.

use async_trait::async_trait;
use libaws::error::{AwsError, NetworkError};
use libaws::mocks::{MockResponse, MockSigner, MockTransport, TestFixtures};
use libaws::services::{BucketsService, ObjectsService};
use libaws::signing::{AwsSigner, SignedRequest};
use libaws::transport::{
    BodyStream, ConnectionPool, HttpRequest, HttpResponse, HttpTransport, PoolConfig,
    RequestExecutor,
};
use libaws::types::{ObjectSize, PutObjectRequest};
use libaws::{AwsConfig, OperationRequest};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn executor(config: &AwsConfig, transport: Arc<dyn HttpTransport>, signer: Arc<MockSigner>) -> Arc<RequestExecutor> {
    Arc::new(RequestExecutor::from_config(config, transport, signer))
}

fn objects(transport: Arc<dyn HttpTransport>, signer: Arc<MockSigner>) -> ObjectsService {
    let config = TestFixtures::config();
    ObjectsService::new(Arc::new(config.clone()), executor(&config, transport, signer))
}

fn unavailable() -> MockResponse {
    MockResponse::error(503, TestFixtures::error_xml("SlowDown", "Please reduce your request rate."))
}

#[tokio::test]
async fn test_transient_service_fault_is_retried() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        unavailable(),
        MockResponse::ok().with_header("content-length", "0"),
    ]));
    let signer = Arc::new(MockSigner::new());
    let service = objects(transport.clone(), signer.clone());

    service.head("test-bucket", "k").await.unwrap();
    assert_eq!(transport.request_count(), 2);
    // Each attempt carries a fresh signature.
    assert_eq!(signer.sign_count(), 2);
    let requests = transport.requests();
    assert_ne!(
        requests[0].get_header("authorization"),
        requests[1].get_header("authorization")
    );
}

#[tokio::test]
async fn test_connection_reset_is_retried() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_error(NetworkError::ConnectionReset {
        message: "connection reset by peer".into(),
    });
    transport.queue_response(MockResponse::no_content());
    let service = objects(transport.clone(), Arc::new(MockSigner::new()));

    service.delete("test-bucket", "k").await.unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let service = objects(transport.clone(), Arc::new(MockSigner::new()));

    let err = service.get("test-bucket", "k").await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.service_code(), Some("SlowDown"));
    // One attempt plus the configured three retries.
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_permanent_fault_is_not_retried() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::error(
        403,
        TestFixtures::error_xml("AccessDenied", "Access Denied"),
    )));
    let service = objects(transport.clone(), Arc::new(MockSigner::new()));

    let err = service.get("test-bucket", "k").await.unwrap_err();
    assert!(!err.is_retryable());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_non_idempotent_operation_is_not_retried() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let config = TestFixtures::config();
    let service = BucketsService::new(
        Arc::new(config.clone()),
        executor(&config, transport.clone(), Arc::new(MockSigner::new())),
    );

    assert!(service.delete("test-bucket").await.is_err());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_streamed_put_is_not_retried() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let service = objects(transport.clone(), Arc::new(MockSigner::new()));

    let mut reader = Cursor::new(b"payload".to_vec());
    let request = PutObjectRequest::new("test-bucket", "k");
    let err = service
        .put_stream(&request, &mut reader, ObjectSize::MeasureBySeeking)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_signing_failure_stops_before_io() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let service = objects(transport.clone(), Arc::new(MockSigner::failing("no key")));

    let err = service.get("test-bucket", "k").await.unwrap_err();
    assert!(matches!(err, AwsError::Signing(_)));
    assert_eq!(transport.request_count(), 0);
}

/// Transport that never answers within the test timeout.
struct StalledTransport;

#[async_trait]
impl HttpTransport for StalledTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(HttpResponse::new(200))
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        _body: BodyStream,
    ) -> Result<HttpResponse, NetworkError> {
        self.send(request).await
    }
}

#[tokio::test]
async fn test_operation_timeout_is_a_transport_fault() {
    let mut config = TestFixtures::config();
    config.operation_timeout = Duration::from_millis(50);
    let service = ObjectsService::new(
        Arc::new(config.clone()),
        executor(&config, Arc::new(StalledTransport), Arc::new(MockSigner::new())),
    );

    let err = service.get("test-bucket", "k").await.unwrap_err();
    match err {
        AwsError::Transport(fault) => {
            assert!(matches!(fault.source, NetworkError::Timeout { .. }));
            assert_eq!(fault.resource, "test-bucket/k");
        }
        other => panic!("expected a transport fault, got {other:?}"),
    }
}

/// Transport whose exchanges are limited by its own pool.
struct PooledTransport {
    inner: MockTransport,
    pool: Arc<ConnectionPool>,
}

#[async_trait]
impl HttpTransport for PooledTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        self.inner.send(request).await
    }

    async fn send_streaming(
        &self,
        request: HttpRequest,
        body: BodyStream,
    ) -> Result<HttpResponse, NetworkError> {
        self.inner.send_streaming(request, body).await
    }

    fn pool(&self) -> Option<&Arc<ConnectionPool>> {
        Some(&self.pool)
    }
}

/// Signer that notes how many pool slots were free when it ran.
struct SlotRecordingSigner {
    inner: MockSigner,
    pool: Arc<ConnectionPool>,
    free_at_sign: Mutex<Vec<usize>>,
}

#[async_trait]
impl AwsSigner for SlotRecordingSigner {
    async fn sign(&self, request: &OperationRequest) -> Result<SignedRequest, AwsError> {
        self.free_at_sign.lock().unwrap().push(self.pool.available());
        self.inner.sign(request).await
    }
}

#[tokio::test]
async fn test_pool_slot_is_held_before_signing() {
    let pool = Arc::new(ConnectionPool::new(PoolConfig {
        max_connections: 1,
        ..PoolConfig::default()
    }));
    let transport = Arc::new(PooledTransport {
        inner: MockTransport::with_default(MockResponse::ok_with_body("payload")),
        pool: pool.clone(),
    });
    let signer = Arc::new(SlotRecordingSigner {
        inner: MockSigner::new(),
        pool: pool.clone(),
        free_at_sign: Mutex::new(Vec::new()),
    });
    let config = TestFixtures::config();
    let service = ObjectsService::new(
        Arc::new(config.clone()),
        Arc::new(RequestExecutor::from_config(&config, transport, signer.clone())),
    );

    let output = service.get("test-bucket", "k").await.unwrap();
    // The streamed body still owns the slot.
    assert_eq!(pool.available(), 0);
    assert_eq!(&output.body.collect().await.unwrap()[..], b"payload");
    assert_eq!(pool.available(), 1);

    let mut reader = Cursor::new(b"payload".to_vec());
    service
        .put_stream(
            &PutObjectRequest::new("test-bucket", "k"),
            &mut reader,
            ObjectSize::Known(7),
        )
        .await
        .unwrap();
    assert_eq!(pool.available(), 1);

    assert_eq!(*signer.free_at_sign.lock().unwrap(), vec![0, 0]);
    assert_eq!(pool.stats().checkouts, 2);
}

#[tokio::test]
async fn test_closed_pool_fails_before_signing() {
    let pool = Arc::new(ConnectionPool::new(PoolConfig::default()));
    pool.close();
    let transport = Arc::new(PooledTransport {
        inner: MockTransport::with_default(MockResponse::ok()),
        pool: pool.clone(),
    });
    let signer = Arc::new(MockSigner::new());
    let service = objects(transport, signer.clone());

    let err = service.head("test-bucket", "k").await.unwrap_err();
    assert!(matches!(
        err,
        AwsError::Transport(ref fault) if matches!(fault.source, NetworkError::PoolClosed)
    ));
    assert_eq!(signer.sign_count(), 0);
}
