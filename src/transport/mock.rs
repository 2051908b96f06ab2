//! Scripted transport and simulated device for tests.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::protocol::{Attribute, Telegram, TelegramKind, describe_number};
use crate::transport::Transport;
use crate::types::{DeviceError, DeviceStatus, OperatingState};

/// What the mock does after a frame is written.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    /// Queue these bytes as the answer.
    Frame(Vec<u8>),
    /// Never answer.
    Stall,
    /// Fail the next read with an I/O error.
    Fail(io::ErrorKind),
}

impl Scripted {
    /// A well-formed answer from node 0 with a clean status byte.
    pub(crate) fn answer(object: u8, payload: &[u8]) -> Self {
        Self::Frame(Telegram::answer(0, 0x00, object, payload).encode().to_vec())
    }

    /// A well-formed answer with its last byte flipped.
    pub(crate) fn corrupted(object: u8, payload: &[u8]) -> Self {
        let mut frame = Telegram::answer(0, 0x00, object, payload).encode().to_vec();
        if let Some(last) = frame.last_mut() {
            *last ^= 0x01;
        }
        Self::Frame(frame)
    }
}

#[derive(Default)]
struct MockState {
    open: bool,
    opened: usize,
    closed: usize,
    script: VecDeque<Scripted>,
    device: Option<SimulatedDevice>,
    input: VecDeque<u8>,
    failure: Option<io::ErrorKind>,
    written: Vec<Vec<u8>>,
    served: usize,
}

/// In-memory transport. Clones share state so a test can inspect a
/// transport after handing it to a session.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A mock that answers every request from a simulated device.
    pub(crate) fn with_device(device: SimulatedDevice) -> Self {
        let mock = Self::new();
        mock.state.lock().unwrap().device = Some(device);
        mock
    }

    /// Queues a scripted reply. Scripted replies take precedence over the
    /// simulated device.
    pub(crate) fn push(&self, reply: Scripted) {
        self.state.lock().unwrap().script.push_back(reply);
    }

    /// Puts bytes on the line without a request.
    pub(crate) fn push_input(&self, bytes: &[u8]) {
        self.state.lock().unwrap().input.extend(bytes);
    }

    /// Frames written so far.
    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    /// Number of answer frames put on the line.
    pub(crate) fn served(&self) -> usize {
        self.state.lock().unwrap().served
    }

    pub(crate) fn opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub(crate) fn closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// Runs `f` against the simulated device.
    pub(crate) fn with_simulated<R>(&self, f: impl FnOnce(&mut SimulatedDevice) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(state.device.as_mut().expect("mock has no simulated device"))
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.open = true;
            state.opened += 1;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.open = false;
            state.closed += 1;
            Ok(())
        })
    }

    fn write(&mut self, data: Bytes) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                return Err(Error::TransportClosed);
            }
            state.written.push(data.to_vec());

            let reply = match state.script.pop_front() {
                Some(reply) => Some(reply),
                None => state
                    .device
                    .as_mut()
                    .map(|device| Scripted::Frame(device.handle(&data))),
            };
            match reply {
                Some(Scripted::Frame(frame)) => {
                    state.input.extend(frame);
                    state.served += 1;
                }
                Some(Scripted::Fail(kind)) => state.failure = Some(kind),
                Some(Scripted::Stall) | None => {}
            }
            Ok(())
        })
    }

    fn read_exact(&mut self, len: usize, timeout: Duration) -> BoxFuture<'_, Result<Bytes>> {
        Box::pin(async move {
            let ready = {
                let mut state = self.state.lock().unwrap();
                if !state.open {
                    return Err(Error::TransportClosed);
                }
                if let Some(kind) = state.failure.take() {
                    return Err(Error::Io(io::Error::new(kind, "scripted failure")));
                }
                if state.input.len() >= len {
                    Some(state.input.drain(..len).collect::<Vec<u8>>())
                } else {
                    None
                }
            };
            match ready {
                Some(bytes) => Ok(Bytes::from(bytes)),
                None => {
                    tokio::time::sleep(timeout).await;
                    Err(Error::timeout(timeout))
                }
            }
        })
    }

    fn discard_input(&mut self) -> BoxFuture<'_, Result<usize>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let count = state.input.len();
            state.input.clear();
            Ok(count)
        })
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

/// A power supply that answers requests according to the object table.
#[derive(Debug, Clone)]
pub(crate) struct SimulatedDevice {
    pub(crate) remote_control: bool,
    pub(crate) output_enabled: bool,
    pub(crate) nominal_voltage: f32,
    pub(crate) nominal_current: f32,
    pub(crate) nominal_power: f32,
    pub(crate) set_voltage: u16,
    pub(crate) set_current: u16,
    pub(crate) ovp_threshold: u16,
    pub(crate) ocp_threshold: u16,
    /// Load current as a fraction of the nominal current.
    pub(crate) load_current: u16,
    pub(crate) protection: u32,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            remote_control: false,
            output_enabled: false,
            nominal_voltage: 20.0,
            nominal_current: 5.0,
            nominal_power: 100.0,
            set_voltage: 0,
            set_current: 0,
            ovp_threshold: 0xffff,
            ocp_threshold: 0xffff,
            load_current: 0x8000,
            protection: 0,
        }
    }
}

fn text(value: &str) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.resize(16, 0);
    bytes
}

impl SimulatedDevice {
    pub(crate) const DEVICE_TYPE: &'static str = "PS 2042-06B";
    pub(crate) const SERIAL_NUMBER: &'static str = "1034440002";
    pub(crate) const ARTICLE_NUMBER: &'static str = "39200112";
    pub(crate) const MANUFACTURER: &'static str = "EA Elektro";
    pub(crate) const SOFTWARE_VERSION: &'static str = "V2.01 09.08.06";

    fn status(&self, error: DeviceError) -> u8 {
        DeviceStatus {
            remote_control: self.remote_control,
            output_enabled: self.output_enabled,
            error,
        }
        .to_byte()
    }

    fn state_bits(&self) -> u32 {
        let mut bits = self.protection;
        if self.remote_control {
            bits |= OperatingState::REMOTE;
        }
        if self.output_enabled {
            bits |= OperatingState::OUTPUT;
        }
        bits
    }

    fn read(&self, attribute: Attribute) -> Vec<u8> {
        let measured = |raw: u16| if self.output_enabled { raw } else { 0 };
        match attribute {
            Attribute::DeviceType => text(Self::DEVICE_TYPE),
            Attribute::RemoteControl => vec![u8::from(self.remote_control)],
            Attribute::OutputEnabled => vec![u8::from(self.output_enabled)],
            Attribute::NominalVoltage => self.nominal_voltage.to_be_bytes().to_vec(),
            Attribute::NominalCurrent => self.nominal_current.to_be_bytes().to_vec(),
            Attribute::NominalPower => self.nominal_power.to_be_bytes().to_vec(),
            Attribute::SerialNumber => text(Self::SERIAL_NUMBER),
            Attribute::ArticleNumber => text(Self::ARTICLE_NUMBER),
            Attribute::Manufacturer => text(Self::MANUFACTURER),
            Attribute::SoftwareVersion => text(Self::SOFTWARE_VERSION),
            Attribute::DeviceClass => vec![0x00, 0x10],
            Attribute::MeasuredVoltage => measured(self.set_voltage).to_be_bytes().to_vec(),
            Attribute::MeasuredCurrent => measured(self.load_current).to_be_bytes().to_vec(),
            Attribute::SetVoltage => self.set_voltage.to_be_bytes().to_vec(),
            Attribute::SetCurrent => self.set_current.to_be_bytes().to_vec(),
            Attribute::OvpThreshold => self.ovp_threshold.to_be_bytes().to_vec(),
            Attribute::OcpThreshold => self.ocp_threshold.to_be_bytes().to_vec(),
            Attribute::DeviceState => (self.state_bits() as u16).to_be_bytes().to_vec(),
            Attribute::ClearProtection => Vec::new(),
        }
    }

    fn write(&mut self, attribute: Attribute, payload: &[u8]) -> DeviceError {
        let word = || u16::from_be_bytes([payload[0], payload[1]]);
        if attribute != Attribute::RemoteControl && !self.remote_control {
            return DeviceError::RemoteControlRequired;
        }
        match attribute {
            Attribute::RemoteControl => self.remote_control = payload[0] != 0,
            Attribute::OutputEnabled => self.output_enabled = payload[0] != 0,
            Attribute::SetVoltage => self.set_voltage = word(),
            Attribute::SetCurrent => self.set_current = word(),
            Attribute::OvpThreshold => self.ovp_threshold = word(),
            Attribute::OcpThreshold => self.ocp_threshold = word(),
            Attribute::ClearProtection => self.protection = 0,
            _ => return DeviceError::NoWriteAccess,
        }
        DeviceError::None
    }

    /// Answers one request frame.
    pub(crate) fn handle(&mut self, request: &[u8]) -> Vec<u8> {
        let Ok(telegram) = Telegram::decode(request) else {
            let object = request.get(3).copied().unwrap_or(0);
            let status = self.status(DeviceError::ChecksumError);
            return Telegram::answer(0, status, object, &[]).encode().to_vec();
        };
        let node = telegram.node();
        let object = telegram.object();
        let Some(descriptor) = describe_number(object) else {
            let status = self.status(DeviceError::UnknownObject);
            return Telegram::answer(node, status, object, &[]).encode().to_vec();
        };

        let (error, payload) = match telegram.kind() {
            TelegramKind::Query if descriptor.access.readable() => {
                (DeviceError::None, self.read(descriptor.attribute))
            }
            TelegramKind::Query => (DeviceError::UnknownObject, Vec::new()),
            TelegramKind::Send if telegram.payload().len() != descriptor.width => {
                (DeviceError::WrongDataLength, Vec::new())
            }
            TelegramKind::Send => (self.write(descriptor.attribute, telegram.payload()), Vec::new()),
            TelegramKind::Answer => (DeviceError::UnknownObject, Vec::new()),
        };

        let status = self.status(error);
        Telegram::answer(node, status, object, &payload)
            .encode()
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_request;

    #[test]
    fn test_simulated_device_requires_remote_control() {
        let mut device = SimulatedDevice::default();
        let request = encode_request(
            0,
            TelegramKind::Send,
            Attribute::SetVoltage.descriptor(),
            &[0x41, 0x47],
        )
        .unwrap();

        let answer = Telegram::decode(&device.handle(&request)).unwrap();
        let status = DeviceStatus::from_byte(answer.status().unwrap());
        assert_eq!(status.error, DeviceError::RemoteControlRequired);

        device.remote_control = true;
        let answer = Telegram::decode(&device.handle(&request)).unwrap();
        let status = DeviceStatus::from_byte(answer.status().unwrap());
        assert_eq!(status.error, DeviceError::None);
        assert!(status.remote_control);
        assert_eq!(device.set_voltage, 0x4147);
    }

    #[tokio::test]
    async fn test_mock_serves_script_before_device() {
        let mut mock = MockTransport::with_device(SimulatedDevice::default());
        mock.push(Scripted::Stall);
        mock.open().await.unwrap();

        let request = encode_request(
            0,
            TelegramKind::Query,
            Attribute::RemoteControl.descriptor(),
            &[],
        )
        .unwrap();
        mock.write(request.clone()).await.unwrap();
        assert_eq!(mock.served(), 0);

        mock.write(request).await.unwrap();
        assert_eq!(mock.served(), 1);
        let frame = mock.read_exact(8, Duration::from_millis(10)).await.unwrap();
        assert_eq!(Telegram::decode(&frame).unwrap().payload()[0], 0);
    }
}
