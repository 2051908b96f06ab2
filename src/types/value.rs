//! Typed attribute values.

use std::fmt;

/// Value of a device attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean flag.
    Flag(bool),
    /// Physical quantity in volts, amps or watts.
    Physical(f64),
    /// Unsigned integer.
    Integer(u32),
    /// Bit flags.
    Bits(u32),
    /// Text.
    Text(String),
}

impl Value {
    /// Returns the flag, if this is one.
    #[must_use]
    pub const fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Returns the physical value, if this is one.
    #[must_use]
    pub const fn as_physical(&self) -> Option<f64> {
        match self {
            Self::Physical(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the integer, if this is one.
    #[must_use]
    pub const fn as_integer(&self) -> Option<u32> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the bit flags, if this is a bitfield.
    #[must_use]
    pub const fn as_bits(&self) -> Option<u32> {
        match self {
            Self::Bits(bits) => Some(*bits),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Flag(_) => "flag",
            Self::Physical(_) => "physical",
            Self::Integer(_) => "integer",
            Self::Bits(_) => "bits",
            Self::Text(_) => "text",
        }
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Physical(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(flag) => write!(f, "{}", if *flag { "on" } else { "off" }),
            Self::Physical(value) => write!(f, "{value:.3}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Bits(bits) => write!(f, "0x{bits:04x}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
