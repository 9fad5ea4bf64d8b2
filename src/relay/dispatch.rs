//! Consumer dispatch.
//!
//! A consumer makes exactly one claim attempt. If the cancellation future
//! fires first it walks away with nothing; otherwise it owns the stream's
//! read end until it drops it.

use std::future::Future;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::relay::error::{Cancelled, RelayError, RelayResult};
use crate::relay::handle::ReadEnd;
use crate::relay::queue::AdmissionQueue;
use crate::relay::tracker::TransferId;

const COPY_BUFFER_BYTES: usize = 32 * 1024;

/// Hands admitted streams to consumers.
#[derive(Debug, Clone)]
pub struct ConsumerDispatch {
    queue: Arc<AdmissionQueue>,
}

impl ConsumerDispatch {
    pub fn new(queue: Arc<AdmissionQueue>) -> Self {
        Self { queue }
    }

    /// Wait for the next admitted stream unless `cancel` fires first.
    pub async fn claim<F>(&self, cancel: F) -> Result<ClaimedStream, Cancelled>
    where
        F: Future<Output = ()>,
    {
        let entry = self.queue.dequeue_or_cancel(cancel).await?;
        let waited = entry.waited();
        let (id, reader) = entry.into_parts();
        tracing::info!(
            transfer_id = %id,
            waited_ms = waited.as_millis() as u64,
            "Stream claimed by consumer"
        );
        Ok(ClaimedStream { id, reader })
    }
}

/// A compressed stream owned by one consumer.
#[derive(Debug)]
pub struct ClaimedStream {
    id: TransferId,
    reader: ReadEnd,
}

impl ClaimedStream {
    pub fn id(&self) -> TransferId {
        self.id
    }

    /// Copy the compressed stream into `sink` until the producer finalizes.
    ///
    /// Returns the number of bytes delivered. The read end is closed when
    /// this returns, successfully or not.
    pub async fn copy_to<W>(self, sink: &mut W) -> RelayResult<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let id = self.id;
        let result = copy_out(self.reader, sink).await;
        match &result {
            Ok(bytes) => tracing::debug!(transfer_id = %id, bytes, "Stream delivered"),
            Err(e) => tracing::warn!(transfer_id = %id, error = %e, "Delivery aborted"),
        }
        result
    }

    /// Turn the stream into chunks suitable for a streaming response body.
    pub fn into_stream(self) -> ReaderStream<ReadEnd> {
        ReaderStream::new(self.reader)
    }
}

async fn copy_out<R, W>(mut reader: R, sink: &mut W) -> RelayResult<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await.map_err(RelayError::source_io)?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await.map_err(RelayError::sink_io)?;
        total += n as u64;
    }
    sink.flush().await.map_err(RelayError::sink_io)?;
    Ok(total)
}
