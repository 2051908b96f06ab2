//! Transport over an already-open async byte stream.
//!
//! Works with anything implementing tokio's `AsyncRead + AsyncWrite`: a
//! serial stream opened by the caller, a TCP connection to a serial server,
//! or an in-memory duplex pipe.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Size of the scratch buffer used when draining stale input.
const DRAIN_CHUNK: usize = 64;

/// Transport wrapping an async byte stream.
pub struct StreamTransport<S> {
    stream: Option<S>,
    open: bool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wraps a stream. The transport still has to be opened.
    #[must_use]
    pub const fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            open: false,
        }
    }

    /// Returns the stream, unless the transport was closed.
    #[must_use]
    pub fn into_inner(self) -> Option<S> {
        self.stream
    }

    fn stream_mut(&mut self) -> Result<&mut S> {
        if !self.open {
            return Err(Error::TransportClosed);
        }
        self.stream.as_mut().ok_or(Error::TransportClosed)
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn open(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.stream.is_none() {
                return Err(Error::TransportClosed);
            }
            self.open = true;
            tracing::debug!("stream transport opened");
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.open = false;
            if let Some(mut stream) = self.stream.take() {
                tracing::debug!("closing stream transport");
                stream.shutdown().await?;
            }
            Ok(())
        })
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            stream.write_all(&data).await?;
            stream.flush().await?;
            Ok(())
        })
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            let mut buf = BytesMut::zeroed(len);
            match tokio::time::timeout(timeout, stream.read_exact(&mut buf)).await {
                Ok(Ok(_)) => Ok(buf.freeze()),
                Ok(Err(e)) => Err(Error::Io(e)),
                Err(_) => Err(Error::timeout(timeout)),
            }
        })
    }

    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let stream = self.stream_mut()?;
            let mut buf = [0u8; DRAIN_CHUNK];
            let mut total = 0usize;

            // Only bytes that are ready right now are dropped.
            while let Some(read) = stream.read(&mut buf).now_or_never() {
                match read {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => return Err(Error::Io(e)),
                }
            }

            if total > 0 {
                tracing::debug!("discarded {} stale bytes", total);
            }
            Ok(total)
        })
    }

    fn is_open(&self) -> bool {
        self.open && self.stream.is_some()
    }
}
