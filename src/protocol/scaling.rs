//! Fixed-point scaling between physical values and wire integers.
//!
//! Voltages and currents travel as fractions of the device's nominal
//! capacity: `0` is zero and the largest integer of the payload width is the
//! nominal value. Signed objects use the symmetric signed range instead.

use crate::error::{Error, Result};

/// Largest unsigned wire value for a payload of `width` bytes.
#[must_use]
pub const fn max_unsigned(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}

/// Largest positive signed wire value for a payload of `width` bytes.
#[must_use]
pub const fn max_signed(width: usize) -> i64 {
    if width >= 8 {
        i64::MAX
    } else {
        (1i64 << (8 * width - 1)) - 1
    }
}

/// Smallest physical step representable for `nominal` at `width` bytes.
#[must_use]
pub fn resolution(nominal: f64, width: usize) -> f64 {
    nominal / max_unsigned(width) as f64
}

fn check_nominal(nominal: f64) -> Result<()> {
    if nominal.is_finite() && nominal > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidNominal {
            attribute: "nominal",
            value: nominal,
        })
    }
}

/// Converts a physical value in `0..=nominal` to an unsigned wire integer.
///
/// Values outside the range are rejected, never clamped.
pub fn to_wire(value: f64, nominal: f64, width: usize) -> Result<u64> {
    check_nominal(nominal)?;
    if !value.is_finite() || value < 0.0 || value > nominal {
        return Err(Error::OutOfRange {
            value,
            min: 0.0,
            max: nominal,
        });
    }
    let max = max_unsigned(width) as f64;
    Ok((value / nominal * max).round() as u64)
}

/// Converts an unsigned wire integer back to a physical value.
#[must_use]
pub fn from_wire(wire: u64, nominal: f64, width: usize) -> f64 {
    wire as f64 * nominal / max_unsigned(width) as f64
}

/// Converts a physical value in `-nominal..=nominal` to a signed wire integer.
pub fn to_wire_signed(value: f64, nominal: f64, width: usize) -> Result<i64> {
    check_nominal(nominal)?;
    if !value.is_finite() || value.abs() > nominal {
        return Err(Error::OutOfRange {
            value,
            min: -nominal,
            max: nominal,
        });
    }
    let max = max_signed(width) as f64;
    Ok((value / nominal * max).round() as i64)
}

/// Converts a signed wire integer back to a physical value.
#[must_use]
pub fn from_wire_signed(wire: i64, nominal: f64, width: usize) -> f64 {
    wire as f64 * nominal / max_signed(width) as f64
}
