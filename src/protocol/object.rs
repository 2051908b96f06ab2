//! Object registry for the PS 2000 B protocol.
//!
//! Every device attribute is addressed by an object number. The table below
//! is the single source of truth for payload widths, access direction and how
//! payload bytes are interpreted.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use Access::{Read, ReadWrite, Write};
use Encoding::{Ascii, Bitfield, Flag, Float, RawInteger, UnsignedScaled};
use Quantity::{Current, Voltage};

/// Physical quantity a scaled object refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Volts, scaled against the nominal voltage.
    Voltage,
    /// Amps, scaled against the nominal current.
    Current,
}

/// How the payload bytes of an object are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Unsigned fraction of the nominal value.
    UnsignedScaled(Quantity),
    /// Signed fraction of the nominal value.
    SignedScaled(Quantity),
    /// Big-endian unsigned integer.
    RawInteger,
    /// Big-endian bit flags.
    Bitfield,
    /// Zero-padded ASCII text.
    Ascii,
    /// Big-endian IEEE-754 single precision float.
    Float,
    /// Single byte boolean.
    Flag,
}

impl Encoding {
    /// Returns the quantity for scaled encodings.
    #[must_use]
    pub const fn quantity(self) -> Option<Quantity> {
        match self {
            Self::UnsignedScaled(q) | Self::SignedScaled(q) => Some(q),
            _ => None,
        }
    }
}

/// Access direction of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Query only.
    Read,
    /// Send only.
    Write,
    /// Query and send.
    ReadWrite,
}

impl Access {
    /// True if the object can be queried.
    #[must_use]
    pub const fn readable(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// True if the object can be sent.
    #[must_use]
    pub const fn writable(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read-only",
            Self::Write => "write-only",
            Self::ReadWrite => "read-write",
        })
    }
}

/// Logical device attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Attribute {
    /// __R__ - Device type string.
    DeviceType = 0x00,
    /// __R/W__ - Remote control mode. Set values are only accepted in remote mode.
    RemoteControl = 0x01,
    /// __R/W__ - Power output switch.
    OutputEnabled = 0x02,
    /// __R__ - Nominal voltage in volts.
    NominalVoltage = 0x03,
    /// __R__ - Nominal current in amps.
    NominalCurrent = 0x04,
    /// __R__ - Nominal power in watts.
    NominalPower = 0x05,
    /// __R__ - Serial number string.
    SerialNumber = 0x06,
    /// __R__ - Article number string.
    ArticleNumber = 0x07,
    /// __R__ - Manufacturer string.
    Manufacturer = 0x08,
    /// __R__ - Firmware version string.
    SoftwareVersion = 0x09,
    /// __R__ - Device class identifier.
    DeviceClass = 0x0a,
    /// __R__ - Actual output voltage.
    MeasuredVoltage = 0x0b,
    /// __R__ - Actual output current.
    MeasuredCurrent = 0x0c,
    /// __R/W__ - Output voltage setpoint.
    SetVoltage = 0x0d,
    /// __R/W__ - Output current limit.
    SetCurrent = 0x0e,
    /// __R/W__ - Over-voltage protection threshold.
    OvpThreshold = 0x0f,
    /// __R/W__ - Over-current protection threshold.
    OcpThreshold = 0x10,
    /// __R__ - Device state flags.
    ///
    /// See [`OperatingState`](crate::types::OperatingState).
    DeviceState = 0x11,
    /// __W__ - Acknowledge and clear tripped protections.
    ClearProtection = 0x12,
}

/// Static description of one device object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDescriptor {
    /// Attribute this object represents.
    pub attribute: Attribute,
    /// Attribute name used by the string API.
    pub name: &'static str,
    /// Object number on the wire.
    pub number: u8,
    /// Access direction.
    pub access: Access,
    /// Payload width in bytes.
    pub width: usize,
    /// Payload interpretation.
    pub encoding: Encoding,
}

impl ObjectDescriptor {
    const fn new(
        attribute: Attribute,
        name: &'static str,
        access: Access,
        width: usize,
        encoding: Encoding,
    ) -> Self {
        Self {
            attribute,
            name,
            number: attribute as u8,
            access,
            width,
            encoding,
        }
    }

    /// True if values of this object need calibration.
    #[must_use]
    pub const fn is_scaled(&self) -> bool {
        self.encoding.quantity().is_some()
    }
}

/// Width of identity strings.
pub const TEXT_WIDTH: usize = 16;

/// The object table, ordered by object number.
#[rustfmt::skip]
pub static OBJECTS: [ObjectDescriptor; 19] = [
    ObjectDescriptor::new(Attribute::DeviceType, "device-type", Read, TEXT_WIDTH, Ascii),
    ObjectDescriptor::new(Attribute::RemoteControl, "remote-control", ReadWrite, 1, Flag),
    ObjectDescriptor::new(Attribute::OutputEnabled, "output-enabled", ReadWrite, 1, Flag),
    ObjectDescriptor::new(Attribute::NominalVoltage, "nominal-voltage", Read, 4, Float),
    ObjectDescriptor::new(Attribute::NominalCurrent, "nominal-current", Read, 4, Float),
    ObjectDescriptor::new(Attribute::NominalPower, "nominal-power", Read, 4, Float),
    ObjectDescriptor::new(Attribute::SerialNumber, "serial-number", Read, TEXT_WIDTH, Ascii),
    ObjectDescriptor::new(Attribute::ArticleNumber, "article-number", Read, TEXT_WIDTH, Ascii),
    ObjectDescriptor::new(Attribute::Manufacturer, "manufacturer", Read, TEXT_WIDTH, Ascii),
    ObjectDescriptor::new(Attribute::SoftwareVersion, "software-version", Read, TEXT_WIDTH, Ascii),
    ObjectDescriptor::new(Attribute::DeviceClass, "device-class", Read, 2, RawInteger),
    ObjectDescriptor::new(Attribute::MeasuredVoltage, "measured-voltage", Read, 2, UnsignedScaled(Voltage)),
    ObjectDescriptor::new(Attribute::MeasuredCurrent, "measured-current", Read, 2, UnsignedScaled(Current)),
    ObjectDescriptor::new(Attribute::SetVoltage, "set-voltage", ReadWrite, 2, UnsignedScaled(Voltage)),
    ObjectDescriptor::new(Attribute::SetCurrent, "set-current", ReadWrite, 2, UnsignedScaled(Current)),
    ObjectDescriptor::new(Attribute::OvpThreshold, "ovp-threshold", ReadWrite, 2, UnsignedScaled(Voltage)),
    ObjectDescriptor::new(Attribute::OcpThreshold, "ocp-threshold", ReadWrite, 2, UnsignedScaled(Current)),
    ObjectDescriptor::new(Attribute::DeviceState, "device-state", Read, 2, Bitfield),
    ObjectDescriptor::new(Attribute::ClearProtection, "clear-protection", Write, 1, Flag),
];

impl Attribute {
    /// Returns the static descriptor of this attribute.
    #[must_use]
    pub fn descriptor(self) -> &'static ObjectDescriptor {
        // Table index equals the object number.
        &OBJECTS[self as usize]
    }

    /// Attribute name used by the string API.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

impl From<Attribute> for u8 {
    fn from(attribute: Attribute) -> Self {
        attribute as Self
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        describe(s).map(|descriptor| descriptor.attribute)
    }
}

/// Looks up an object by attribute name.
pub fn describe(name: &str) -> Result<&'static ObjectDescriptor> {
    OBJECTS
        .iter()
        .find(|descriptor| descriptor.name == name)
        .ok_or_else(|| Error::UnknownAttribute(name.to_owned()))
}

/// Looks up an object by its number.
#[must_use]
pub fn describe_number(number: u8) -> Option<&'static ObjectDescriptor> {
    OBJECTS.get(number as usize)
}
