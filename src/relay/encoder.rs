//! Incremental zstd encoder.
//!
//! Encoders write compressed bytes into their sink as input arrives and keep
//! track of how many compressed bytes they produced. [`Encoder::finalize`]
//! writes the frame epilogue and shuts the sink down, which is what a reader
//! on the other side observes as end-of-stream.
//!
//! The encoder never spawns worker threads: the sink is a single ordered
//! conduit, so frames must be emitted by exactly one writer.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use async_compression::tokio::write::ZstdEncoder;
use async_compression::Level;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::relay::error::{RelayError, RelayResult};

/// Codec parameters shared by every transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    level: i32,
}

impl Codec {
    /// A zstd codec at the given compression level.
    pub fn zstd(level: i32) -> Self {
        Self { level }
    }

    /// Build an encoder that writes compressed output into `sink`.
    pub fn encoder<W>(&self, sink: W) -> RelayResult<Encoder<W>>
    where
        W: AsyncWrite + Unpin,
    {
        let supported = zstd::compression_level_range();
        if !supported.contains(&self.level) {
            return Err(RelayError::EncoderInit(format!(
                "zstd level {} outside {}..={}",
                self.level,
                supported.start(),
                supported.end()
            )));
        }

        let writer = CountingWriter::new(sink);
        Ok(Encoder {
            inner: ZstdEncoder::with_quality(writer, Level::Precise(self.level)),
        })
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::zstd(3)
    }
}

/// Streaming encoder over a sink.
pub struct Encoder<W> {
    inner: ZstdEncoder<CountingWriter<W>>,
}

impl<W> Encoder<W>
where
    W: AsyncWrite + Unpin,
{
    /// Append raw bytes to the compressed stream.
    pub async fn write_all(&mut self, input: &[u8]) -> io::Result<()> {
        self.inner.write_all(input).await
    }

    /// Flush buffered output, terminate the frame and close the sink.
    pub async fn finalize(&mut self) -> io::Result<()> {
        self.inner.shutdown().await
    }

    /// Number of compressed bytes handed to the sink so far.
    pub fn bytes_out(&self) -> u64 {
        self.inner.get_ref().bytes()
    }
}

/// Writer adapter that counts bytes accepted by the inner writer.
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W> CountingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, bytes: 0 }
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> AsyncWrite for CountingWriter<W>
where
    W: AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let written = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.bytes = this.bytes.saturating_add(written as u64);
        Poll::Ready(Ok(written))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finalize_produces_decodable_frame() {
        let mut encoder = Codec::default().encoder(Vec::new()).unwrap();
        encoder.write_all(b"payload").await.unwrap();
        encoder.finalize().await.unwrap();

        let produced = encoder.bytes_out();
        let compressed = encoder.inner.into_inner().into_inner();
        assert_eq!(produced as usize, compressed.len());
        assert_eq!(zstd::stream::decode_all(&compressed[..]).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn empty_input_still_yields_a_frame() {
        let mut encoder = Codec::default().encoder(Vec::new()).unwrap();
        encoder.finalize().await.unwrap();

        let compressed = encoder.inner.into_inner().into_inner();
        assert!(!compressed.is_empty());
        assert!(zstd::stream::decode_all(&compressed[..]).unwrap().is_empty());
    }

    #[test]
    fn unsupported_level_fails_construction() {
        let err = Codec::zstd(500).encoder(Vec::new()).err().unwrap();
        assert!(matches!(err, RelayError::EncoderInit(_)));
    }
}
