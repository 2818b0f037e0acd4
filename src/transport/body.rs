//! Streaming request and response bodies.

use super::pool::PoolPermit;
use crate::error::{AwsError, NetworkError, TransferError};
use crate::request::Operation;
use bytes::{Bytes, BytesMut};
use futures::channel::mpsc;
use futures::{SinkExt, Stream, StreamExt};
use std::fmt;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Request body stream handed to a transport.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + Sync>>;

/// Chunk size used when reading a caller's stream.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the reader and the HTTP client.
const CHANNEL_CAPACITY: usize = 4;

/// A response body that is read incrementally.
///
/// When the body came from a pooled connection the pool permit travels with
/// the stream and is released once the stream ends or is dropped.
pub struct ByteStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, NetworkError>> + Send>>,
    permit: Option<PoolPermit>,
    origin: Option<(Operation, String)>,
}

impl ByteStream {
    /// Wrap an arbitrary chunk stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, NetworkError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
            permit: None,
            origin: None,
        }
    }

    /// An empty body.
    pub fn empty() -> Self {
        Self::new(futures::stream::empty())
    }

    /// A body backed by bytes already in memory.
    pub fn from_static(bytes: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(bytes))
    }

    pub(crate) fn with_permit(mut self, permit: PoolPermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Name the operation and resource this body belongs to, for faults
    /// raised by [`ByteStream::write_to`].
    pub(crate) fn with_origin(mut self, operation: Operation, resource: impl Into<String>) -> Self {
        self.origin = Some((operation, resource.into()));
        self
    }

    /// Read the whole body into memory.
    pub async fn collect(mut self) -> Result<Bytes, NetworkError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    /// Copy the body into `writer` chunk by chunk and flush it.
    ///
    /// Returns the number of bytes written.
    pub async fn write_to<W>(mut self, writer: &mut W) -> Result<u64, AwsError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let (operation, resource) = self
            .origin
            .take()
            .unwrap_or_else(|| (Operation::Get, String::new()));
        self.copy_into(writer)
            .await
            .map_err(|e| e.during(operation, resource).into())
    }

    async fn copy_into<W>(&mut self, writer: &mut W) -> Result<u64, TransferError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut written: u64 = 0;
        while let Some(chunk) = self.next().await {
            let chunk = chunk.map_err(|source| TransferError::Interrupted { source })?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|e| write_error(written, e))?;
            written += chunk.len() as u64;
        }
        writer.flush().await.map_err(|e| write_error(written, e))?;
        Ok(written)
    }
}

fn write_error(bytes_written: u64, e: io::Error) -> TransferError {
    TransferError::Write {
        bytes_written,
        message: e.to_string(),
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, NetworkError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let poll = this.inner.as_mut().poll_next(cx);
        if let Poll::Ready(None) = poll {
            this.permit = None;
        }
        poll
    }
}

impl From<Bytes> for ByteStream {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self::empty();
        }
        Self::new(futures::stream::once(async move { Ok(bytes) }))
    }
}

impl From<Vec<u8>> for ByteStream {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("pooled", &self.permit.is_some())
            .finish_non_exhaustive()
    }
}

/// Sending half of a request body channel.
pub(crate) type BodySender = mpsc::Sender<Result<Bytes, io::Error>>;

/// Create a bounded channel whose receiving half is a request body.
pub(crate) fn body_channel() -> (BodySender, BodyStream) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    (tx, Box::pin(rx))
}

/// Read exactly `length` bytes from `reader` into `sender`.
///
/// If the receiving side goes away (the HTTP exchange failed) the pump stops
/// quietly and the send error is reported by the caller instead.
pub(crate) async fn pump<R>(
    reader: &mut R,
    length: u64,
    mut sender: BodySender,
) -> Result<(), TransferError>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut remaining = length;
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let mut buf = BytesMut::zeroed(want);
        let n = match reader.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                let message = e.to_string();
                let _ = sender
                    .send(Err(io::Error::new(e.kind(), message.clone())))
                    .await;
                return Err(TransferError::StreamRead { message });
            }
        };
        if n == 0 {
            let received = length - remaining;
            let _ = sender
                .send(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "source stream ended early",
                )))
                .await;
            return Err(TransferError::IncompleteBody {
                expected: length,
                received,
            });
        }
        buf.truncate(n);
        remaining -= n as u64;
        if sender.send(Ok(buf.freeze())).await.is_err() {
            return Ok(());
        }
    }
    sender.close_channel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_collect_concatenates_chunks() {
        let stream = ByteStream::new(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ]));
        assert_eq!(stream.collect().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_collect_propagates_stream_error() {
        let stream = ByteStream::new(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"hel")),
            Err(NetworkError::BodyStream {
                message: "reset".into(),
            }),
        ]));
        assert!(matches!(
            stream.collect().await,
            Err(NetworkError::BodyStream { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_to_counts_bytes() {
        let mut sink = Vec::new();
        let written = ByteStream::from(Bytes::from_static(b"hello world"))
            .write_to(&mut sink)
            .await
            .unwrap();
        assert_eq!(written, 11);
        assert_eq!(sink, b"hello world");
    }

    #[tokio::test]
    async fn test_interrupted_write_names_its_origin() {
        let stream = ByteStream::new(futures::stream::iter(vec![
            Ok(Bytes::from_static(b"par")),
            Err(NetworkError::BodyStream {
                message: "reset".into(),
            }),
        ]))
        .with_origin(Operation::Get, "b/k");

        let mut sink = Vec::new();
        let err = stream.write_to(&mut sink).await.unwrap_err();
        assert!(matches!(
            err,
            AwsError::Transfer(ref fault) if matches!(fault.source, TransferError::Interrupted { .. })
        ));
        assert_eq!(err.operation(), Some(Operation::Get));
        assert_eq!(err.resource(), Some("b/k"));
        assert_eq!(sink, b"par");
    }

    #[tokio::test]
    async fn test_pump_reads_exact_length() {
        let (tx, rx) = body_channel();
        let mut reader = Cursor::new(b"hello world".to_vec());

        let (pumped, chunks) = tokio::join!(
            pump(&mut reader, 5, tx),
            rx.collect::<Vec<_>>()
        );
        pumped.unwrap();
        let body: Vec<u8> = chunks
            .into_iter()
            .flat_map(|c| c.unwrap().to_vec())
            .collect();
        assert_eq!(body, b"hello");
        assert_eq!(reader.position(), 5);
    }

    #[tokio::test]
    async fn test_pump_short_stream_is_incomplete_body() {
        let (tx, rx) = body_channel();
        let mut reader = Cursor::new(b"abc".to_vec());

        let (pumped, chunks) = tokio::join!(pump(&mut reader, 10, tx), rx.collect::<Vec<_>>());
        assert!(matches!(
            pumped,
            Err(TransferError::IncompleteBody {
                expected: 10,
                received: 3
            })
        ));
        assert!(chunks.last().unwrap().is_err());
    }

    #[tokio::test]
    async fn test_pump_stops_when_receiver_dropped() {
        let (tx, rx) = body_channel();
        drop(rx);
        let mut reader = Cursor::new(vec![0u8; 4 * CHUNK_SIZE]);
        assert!(pump(&mut reader, (4 * CHUNK_SIZE) as u64, tx).await.is_ok());
    }
}
