//! Stream handles: one-way in-memory pipes between an encoder and a consumer.
//!
//! A handle is a bounded `tokio::io::duplex` pair with each side narrowed to
//! a single direction. Writes block once `buffer_bytes` are in flight, which
//! is how a slow consumer throttles its producer. Dropping or shutting down
//! the write end shows up as end-of-stream on the read end; dropping the read
//! end makes further writes fail with `BrokenPipe`.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};

/// Create a new stream handle and return its two ends.
pub fn stream_handle(buffer_bytes: usize) -> (ReadEnd, WriteEnd) {
    let (read, write) = tokio::io::duplex(buffer_bytes);
    (ReadEnd { inner: read }, WriteEnd { inner: write })
}

/// Consumer side of a stream handle.
#[derive(Debug)]
pub struct ReadEnd {
    inner: DuplexStream,
}

/// Producer side of a stream handle.
#[derive(Debug)]
pub struct WriteEnd {
    inner: DuplexStream,
}

impl AsyncRead for ReadEnd {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for WriteEnd {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
