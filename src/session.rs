//! Request/answer session with a single power supply.
//!
//! A [`Session`] owns the transport and the device's nominal values. Every
//! operation is one exchange: encode, write, read the answer with a timeout,
//! validate it against the request, then decode the value.
//!
//! The session is `Disconnected` until a transport is bound with
//! [`Session::connect`]. It then stays `CalibrationPending` until the first
//! voltage or current operation fetches the nominal values, after which it is
//! `Ready`. A transport failure, a desynchronized answer, repeated framing
//! errors or a failed calibration drop the session back to `Disconnected`.

use std::fmt;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::sync::Mutex;

use crate::error::{DecodeError, Error, Result};
use crate::protocol::{
    ANSWER_HEADER_LEN, Attribute, CHECKSUM_LEN, MAX_PAYLOAD_LEN, ObjectDescriptor, Telegram,
    TelegramKind, decode_value, describe, encode_request, encode_value,
};
use crate::transport::Transport;
use crate::types::{Calibration, DeviceStatus, Value};

/// Default device node.
pub const DEFAULT_NODE: u8 = 0;

/// Default time to wait for each part of an answer.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(200);

/// Default number of silent retries after a framing error.
pub const DEFAULT_FRAMING_RETRIES: u32 = 1;

/// Configuration for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Device node address.
    pub node: u8,
    /// Read timeout for answers.
    pub response_timeout: Duration,
    /// Retries of the same request after a framing error.
    pub framing_retries: u32,
}

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            node: DEFAULT_NODE,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            framing_retries: DEFAULT_FRAMING_RETRIES,
        }
    }

    /// Sets the node address.
    #[must_use]
    pub const fn node(mut self, node: u8) -> Self {
        self.node = node;
        self
    }

    /// Sets the response timeout.
    #[must_use]
    pub const fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Sets the number of framing retries.
    #[must_use]
    pub const fn framing_retries(mut self, retries: u32) -> Self {
        self.framing_retries = retries;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport bound.
    Disconnected,
    /// Transport bound, nominal values not yet known.
    CalibrationPending,
    /// Transport bound and nominal values known.
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::CalibrationPending => "calibration pending",
            Self::Ready => "ready",
        })
    }
}

/// A decoded answer to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Decoded object value.
    pub value: Value,
    /// Status byte of the answer.
    pub status: DeviceStatus,
}

/// Marker for an exchange that started I/O and has not completed.
///
/// Left behind when the caller's future is dropped mid-exchange.
#[derive(Debug, Clone, Copy)]
struct PendingExchange {
    object: u8,
    kind: TelegramKind,
    attempt: u32,
}

struct Inner<T> {
    transport: Option<T>,
    calibration: Option<Calibration>,
    pending: Option<PendingExchange>,
}

/// Outcome of a failed exchange attempt.
enum ExchangeError {
    /// The answer failed validation; the request may be repeated.
    Framing(DecodeError),
    /// Anything else.
    Failed(Error),
}

impl From<Error> for ExchangeError {
    fn from(err: Error) -> Self {
        Self::Failed(err)
    }
}

/// Session with a single power supply.
pub struct Session<T> {
    config: SessionConfig,
    inner: Mutex<Inner<T>>,
}

impl<T: Transport> Session<T> {
    /// Creates a disconnected session.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                transport: None,
                calibration: None,
                pending: None,
            }),
        }
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Binds a transport, opening it if needed.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyConnected` if a transport is bound, or the transport's
    /// error if it cannot be opened.
    pub async fn connect(&self, mut transport: T) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::recover_cancelled(&mut inner).await;
        if inner.transport.is_some() {
            return Err(Error::AlreadyConnected);
        }

        if !transport.is_open() {
            transport.open().await?;
        }
        tracing::info!("session connected (node {})", self.config.node);

        inner.transport = Some(transport);
        inner.calibration = None;
        inner.pending = None;
        Ok(())
    }

    /// Closes and releases the transport.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no transport is bound, or the transport's
    /// error if closing fails. The session is disconnected either way.
    pub async fn disconnect(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.calibration = None;
        inner.pending = None;
        let mut transport = inner.transport.take().ok_or(Error::NotConnected)?;
        tracing::info!("session disconnected");
        transport.close().await
    }

    /// Returns the current state.
    pub async fn state(&self) -> SessionState {
        let inner = self.inner.lock().await;
        match (&inner.transport, inner.calibration, inner.pending) {
            (None, _, _) | (Some(_), _, Some(_)) => SessionState::Disconnected,
            (Some(_), None, None) => SessionState::CalibrationPending,
            (Some(_), Some(_), None) => SessionState::Ready,
        }
    }

    /// Returns the cached nominal values.
    pub async fn calibration(&self) -> Option<Calibration> {
        let inner = self.inner.lock().await;
        if inner.pending.is_some() {
            return None;
        }
        inner.calibration
    }

    /// Forgets the nominal values; the next scaled operation fetches them
    /// again.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if no transport is bound.
    pub async fn invalidate_calibration(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        Self::ensure_connected(&mut inner).await?;
        inner.calibration = None;
        tracing::debug!("calibration invalidated");
        Ok(())
    }

    /// Queries an attribute and returns the value with the answer's status.
    pub async fn query(&self, attribute: Attribute) -> Result<Reply> {
        let descriptor = attribute.descriptor();
        if !descriptor.access.readable() {
            return Err(Error::AccessDenied {
                attribute: descriptor.name,
                access: descriptor.access,
            });
        }

        let mut inner = self.inner.lock().await;
        Self::ensure_connected(&mut inner).await?;
        let calibration = if descriptor.is_scaled() {
            Some(self.ensure_calibrated(&mut inner).await?)
        } else {
            inner.calibration
        };

        let (telegram, status) = self
            .transact(&mut inner, descriptor, TelegramKind::Query, Bytes::new())
            .await?;
        let value = decode_value(descriptor, telegram.payload(), calibration.as_ref())?;
        Ok(Reply { value, status })
    }

    /// Sends a value and returns the answer's status.
    pub async fn send(&self, attribute: Attribute, value: Value) -> Result<DeviceStatus> {
        let descriptor = attribute.descriptor();
        if !descriptor.access.writable() {
            return Err(Error::AccessDenied {
                attribute: descriptor.name,
                access: descriptor.access,
            });
        }

        let mut inner = self.inner.lock().await;
        Self::ensure_connected(&mut inner).await?;
        let calibration = if descriptor.is_scaled() {
            Some(self.ensure_calibrated(&mut inner).await?)
        } else {
            inner.calibration
        };
        let payload = encode_value(descriptor, &value, calibration.as_ref())?;

        let (telegram, status) = self
            .transact(&mut inner, descriptor, TelegramKind::Send, payload)
            .await?;
        let echoed = telegram.payload().len();
        if echoed != 0 && echoed != descriptor.width {
            return Err(Error::UnexpectedPayload {
                object: descriptor.number,
                expected: descriptor.width,
                got: echoed,
            });
        }
        Ok(status)
    }

    /// Reads an attribute.
    pub async fn read(&self, attribute: Attribute) -> Result<Value> {
        self.query(attribute).await.map(|reply| reply.value)
    }

    /// Writes an attribute.
    pub async fn write(&self, attribute: Attribute, value: impl Into<Value>) -> Result<()> {
        self.send(attribute, value.into()).await.map(drop)
    }

    /// Reads an attribute by name.
    pub async fn read_attribute(&self, name: &str) -> Result<Value> {
        let attribute = describe(name)?.attribute;
        self.read(attribute).await
    }

    /// Writes an attribute by name.
    pub async fn write_attribute(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let attribute = describe(name)?.attribute;
        self.write(attribute, value).await
    }

    /// Returns the status reported with the device state.
    pub async fn get_status(&self) -> Result<DeviceStatus> {
        self.query(Attribute::DeviceState)
            .await
            .map(|reply| reply.status)
    }

    // ==================== Internals ====================

    /// Tears the session down if a previous exchange was cancelled.
    ///
    /// Returns true if it did.
    async fn recover_cancelled(inner: &mut Inner<T>) -> bool {
        let Some(pending) = inner.pending.take() else {
            return false;
        };
        tracing::warn!(
            "exchange for object 0x{:02x} ({:?}, attempt {}) was cancelled, dropping connection",
            pending.object,
            pending.kind,
            pending.attempt
        );
        Self::teardown(inner).await;
        true
    }

    async fn ensure_connected(inner: &mut Inner<T>) -> Result<()> {
        if Self::recover_cancelled(inner).await || inner.transport.is_none() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    async fn teardown(inner: &mut Inner<T>) {
        inner.calibration = None;
        inner.pending = None;
        if let Some(mut transport) = inner.transport.take() {
            tracing::info!("session disconnected");
            if let Err(e) = transport.close().await {
                tracing::warn!("failed to close transport: {}", e);
            }
        }
    }

    async fn ensure_calibrated(&self, inner: &mut Inner<T>) -> Result<Calibration> {
        if let Some(calibration) = inner.calibration {
            return Ok(calibration);
        }

        match self.fetch_calibration(inner).await {
            Ok(calibration) => {
                tracing::info!(
                    "calibrated: {} V, {} A",
                    calibration.nominal_voltage,
                    calibration.nominal_current
                );
                inner.calibration = Some(calibration);
                Ok(calibration)
            }
            Err(e) => {
                tracing::warn!("calibration failed: {}", e);
                Self::teardown(inner).await;
                Err(Error::CalibrationFailed(Box::new(e)))
            }
        }
    }

    async fn fetch_calibration(&self, inner: &mut Inner<T>) -> Result<Calibration> {
        let nominal_voltage = self.fetch_nominal(inner, Attribute::NominalVoltage).await?;
        let nominal_current = self.fetch_nominal(inner, Attribute::NominalCurrent).await?;
        Ok(Calibration {
            nominal_voltage,
            nominal_current,
        })
    }

    async fn fetch_nominal(&self, inner: &mut Inner<T>, attribute: Attribute) -> Result<f64> {
        let descriptor = attribute.descriptor();
        let (telegram, _) = self
            .transact(inner, descriptor, TelegramKind::Query, Bytes::new())
            .await?;
        let value = decode_value(descriptor, telegram.payload(), None)?
            .as_physical()
            .unwrap_or(f64::NAN);
        if value.is_finite() && value > 0.0 {
            Ok(value)
        } else {
            Err(Error::InvalidNominal {
                attribute: descriptor.name,
                value,
            })
        }
    }

    /// Runs one request to completion, including framing retries, and
    /// validates the answer against it.
    async fn transact(
        &self,
        inner: &mut Inner<T>,
        descriptor: &'static ObjectDescriptor,
        kind: TelegramKind,
        payload: Bytes,
    ) -> Result<(Telegram, DeviceStatus)> {
        let node = self.config.node;
        let request = encode_request(node, kind, descriptor, &payload)?;
        let attempts = self.config.framing_retries.saturating_add(1);

        tracing::debug!("{:?} {} ({} bytes)", kind, descriptor.name, payload.len());

        let mut attempt = 0;
        let telegram = loop {
            attempt += 1;
            match self.exchange(inner, descriptor.number, kind, attempt, &request).await {
                Ok(telegram) => break telegram,
                Err(ExchangeError::Framing(e)) if attempt < attempts => {
                    tracing::warn!(
                        "framing error on {} (attempt {}/{}): {}, retrying",
                        descriptor.name,
                        attempt,
                        attempts,
                        e
                    );
                }
                Err(ExchangeError::Framing(e)) => {
                    tracing::warn!("framing error on {}: {}, giving up", descriptor.name, e);
                    Self::teardown(inner).await;
                    return Err(Error::ProtocolCorrupt {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(ExchangeError::Failed(e)) => {
                    Self::teardown(inner).await;
                    return Err(e);
                }
            }
        };

        if telegram.node() != node || telegram.object() != descriptor.number {
            tracing::warn!(
                "answer for node {} object 0x{:02x} does not match request for node {} object 0x{:02x}",
                telegram.node(),
                telegram.object(),
                node,
                descriptor.number
            );
            Self::teardown(inner).await;
            return Err(Error::Desynchronized {
                expected_node: node,
                expected_object: descriptor.number,
                node: telegram.node(),
                object: telegram.object(),
            });
        }

        let status = DeviceStatus::from_byte(telegram.status().unwrap_or_default());
        if status.error.is_error() {
            tracing::debug!("device rejected {}: {}", descriptor.name, status.error);
            return Err(Error::Device {
                object: descriptor.number,
                error: status.error,
            });
        }

        Ok((telegram, status))
    }

    /// Writes the request once and reads one answer frame.
    async fn exchange(
        &self,
        inner: &mut Inner<T>,
        object: u8,
        kind: TelegramKind,
        attempt: u32,
        request: &Bytes,
    ) -> std::result::Result<Telegram, ExchangeError> {
        let timeout = self.config.response_timeout;
        let Inner {
            transport, pending, ..
        } = inner;
        let transport = transport.as_mut().ok_or(Error::NotConnected)?;

        *pending = Some(PendingExchange {
            object,
            kind,
            attempt,
        });

        let stale = transport.discard_input().await?;
        if stale > 0 {
            tracing::debug!("dropped {} stale bytes before request", stale);
        }

        tracing::trace!("tx: {}", hex::encode(request));
        transport.write(request.clone()).await?;

        let header = transport.read_exact(ANSWER_HEADER_LEN, timeout).await?;
        let declared = header[ANSWER_HEADER_LEN - 1] as usize;
        if declared > MAX_PAYLOAD_LEN {
            *pending = None;
            tracing::trace!("rx: {}", hex::encode(&header));
            return Err(ExchangeError::Framing(DecodeError::Oversized {
                declared,
                max: MAX_PAYLOAD_LEN,
            }));
        }
        // Once a header arrived, a short body is a framing error, not a dead line.
        let body = match transport.read_exact(declared + CHECKSUM_LEN, timeout).await {
            Ok(body) => body,
            Err(Error::Timeout { .. }) => {
                *pending = None;
                tracing::trace!("rx (short): {}", hex::encode(&header));
                return Err(ExchangeError::Framing(DecodeError::Truncated {
                    expected: ANSWER_HEADER_LEN + declared + CHECKSUM_LEN,
                    got: ANSWER_HEADER_LEN,
                }));
            }
            Err(e) => return Err(e.into()),
        };
        *pending = None;

        let mut frame = BytesMut::with_capacity(header.len() + body.len());
        frame.extend_from_slice(&header);
        frame.extend_from_slice(&body);
        tracing::trace!("rx: {}", hex::encode(&frame));

        let telegram = Telegram::decode(&frame).map_err(ExchangeError::Framing)?;
        if telegram.kind() != TelegramKind::Answer {
            return Err(ExchangeError::Framing(DecodeError::NotAnAnswer(
                telegram.kind().into(),
            )));
        }
        Ok(telegram)
    }
}
