//! Transport layer for PS 2000 B communication.
//!
//! This module provides the abstraction over the byte stream a device is
//! attached to. Opening the physical port is left to the caller; the
//! [`StreamTransport`] adapter wraps any stream that is already open.

#[cfg(test)]
pub(crate) mod mock;
pub mod stream;

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;

/// Trait for transport implementations.
///
/// The protocol is half-duplex: every write is followed by reads of the
/// answer. Implementations do not need to be safe for concurrent use.
pub trait Transport: Send {
    /// Opens the transport.
    fn open(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Closes the transport.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Writes a complete frame.
    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>>;

    /// Reads exactly `len` bytes, failing with `Error::Timeout` if they do not
    /// arrive within `timeout`.
    fn read_exact(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>>;

    /// Drops input that is already buffered and returns how many bytes were
    /// discarded.
    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>>;

    /// Returns true if open.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> BoxFuture<'_, Result<()>> {
        (**self).open()
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        (**self).close()
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        (**self).write(data)
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>> {
        (**self).read_exact(len, timeout)
    }

    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>> {
        (**self).discard_input()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

pub use stream::StreamTransport;
