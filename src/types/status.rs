//! Status types decoded from device answers.

use std::fmt;

/// Error code carried in the upper nibble of every answer's status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceError {
    /// The request was accepted.
    #[default]
    None,
    /// The device computed a different checksum for the request.
    ChecksumError,
    /// The object number is not defined on this device.
    UnknownObject,
    /// The payload length does not match the object.
    WrongDataLength,
    /// The object cannot be written.
    NoWriteAccess,
    /// The device is busy and dropped the request.
    DeviceBusy,
    /// The front panel is locked.
    DeviceLocked,
    /// The value is above the device's upper limit.
    UpperLimitExceeded,
    /// The value is below the device's lower limit.
    LowerLimitExceeded,
    /// Set values are only accepted in remote control mode.
    RemoteControlRequired,
    /// A code this library does not know.
    Reserved(u8),
}

impl DeviceError {
    /// Parses an error code (0..=15).
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x0 => Self::None,
            0x1 => Self::ChecksumError,
            0x2 => Self::UnknownObject,
            0x3 => Self::WrongDataLength,
            0x4 => Self::NoWriteAccess,
            0x5 => Self::DeviceBusy,
            0x6 => Self::DeviceLocked,
            0x7 => Self::UpperLimitExceeded,
            0x8 => Self::LowerLimitExceeded,
            0x9 => Self::RemoteControlRequired,
            other => Self::Reserved(other),
        }
    }

    /// Returns the numeric error code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0x0,
            Self::ChecksumError => 0x1,
            Self::UnknownObject => 0x2,
            Self::WrongDataLength => 0x3,
            Self::NoWriteAccess => 0x4,
            Self::DeviceBusy => 0x5,
            Self::DeviceLocked => 0x6,
            Self::UpperLimitExceeded => 0x7,
            Self::LowerLimitExceeded => 0x8,
            Self::RemoteControlRequired => 0x9,
            Self::Reserved(code) => code,
        }
    }

    /// True if the device reported a problem.
    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("no error"),
            Self::ChecksumError => f.write_str("checksum error"),
            Self::UnknownObject => f.write_str("unknown object"),
            Self::WrongDataLength => f.write_str("wrong data length"),
            Self::NoWriteAccess => f.write_str("no write access"),
            Self::DeviceBusy => f.write_str("device busy"),
            Self::DeviceLocked => f.write_str("device locked"),
            Self::UpperLimitExceeded => f.write_str("upper limit exceeded"),
            Self::LowerLimitExceeded => f.write_str("lower limit exceeded"),
            Self::RemoteControlRequired => f.write_str("remote control required"),
            Self::Reserved(code) => write!(f, "reserved error code 0x{code:x}"),
        }
    }
}

/// Status embedded in every answer.
///
/// Layout: bit 0 remote control, bit 1 output, bits 4-7 error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeviceStatus {
    /// Remote control mode is active.
    pub remote_control: bool,
    /// The power output is switched on.
    pub output_enabled: bool,
    /// Outcome of the request.
    pub error: DeviceError,
}

impl DeviceStatus {
    const REMOTE: u8 = 1 << 0;
    const OUTPUT: u8 = 1 << 1;

    /// Parses a status byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            remote_control: byte & Self::REMOTE != 0,
            output_enabled: byte & Self::OUTPUT != 0,
            error: DeviceError::from_code(byte >> 4),
        }
    }

    /// Encodes the status byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        let mut byte = (self.error.code() & 0x0f) << 4;
        if self.remote_control {
            byte |= Self::REMOTE;
        }
        if self.output_enabled {
            byte |= Self::OUTPUT;
        }
        byte
    }
}

/// Output regulation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegulationMode {
    /// Constant voltage.
    #[default]
    ConstantVoltage,
    /// Constant current.
    ConstantCurrent,
}

/// Decoded `device-state` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperatingState {
    /// Remote control mode is active.
    pub remote_control: bool,
    /// The power output is switched on.
    pub output_enabled: bool,
    /// Current regulation mode.
    pub regulation: RegulationMode,
    /// Over-voltage protection tripped.
    pub over_voltage: bool,
    /// Over-current protection tripped.
    pub over_current: bool,
    /// Over-power protection tripped.
    pub over_power: bool,
    /// Over-temperature protection tripped.
    pub over_temperature: bool,
}

impl OperatingState {
    /// Remote control bit.
    pub const REMOTE: u32 = 1 << 0;
    /// Output bit.
    pub const OUTPUT: u32 = 1 << 1;
    /// Constant current regulation bit.
    pub const CONSTANT_CURRENT: u32 = 1 << 2;
    /// OVP bit.
    pub const OVP: u32 = 1 << 3;
    /// OCP bit.
    pub const OCP: u32 = 1 << 4;
    /// OPP bit.
    pub const OPP: u32 = 1 << 5;
    /// OTP bit.
    pub const OTP: u32 = 1 << 6;

    /// Parses the state flags.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            remote_control: bits & Self::REMOTE != 0,
            output_enabled: bits & Self::OUTPUT != 0,
            regulation: if bits & Self::CONSTANT_CURRENT != 0 {
                RegulationMode::ConstantCurrent
            } else {
                RegulationMode::ConstantVoltage
            },
            over_voltage: bits & Self::OVP != 0,
            over_current: bits & Self::OCP != 0,
            over_power: bits & Self::OPP != 0,
            over_temperature: bits & Self::OTP != 0,
        }
    }

    /// True if any protection has tripped.
    #[must_use]
    pub const fn protection_tripped(&self) -> bool {
        self.over_voltage || self.over_current || self.over_power || self.over_temperature
    }
}
