//! Conversion between typed values and object payloads.
//!
//! Multi-byte integers are big-endian. Text is ASCII padded with NUL bytes to
//! the object width. Scaled objects need the device's nominal values.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::object::{Encoding, ObjectDescriptor};
use crate::protocol::scaling;
use crate::types::{Calibration, Value};

/// Parses a NUL-terminated or fixed-length string.
fn parse_string(data: &[u8]) -> String {
    let len = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..len]).trim_end().to_owned()
}

fn nominal_for(descriptor: &ObjectDescriptor, calibration: Option<&Calibration>) -> Result<f64> {
    let quantity = descriptor.encoding.quantity().ok_or_else(|| Error::InvalidValue {
        attribute: descriptor.name,
        reason: "object is not scaled".into(),
    })?;
    calibration
        .map(|calibration| calibration.nominal(quantity))
        .ok_or_else(|| Error::InvalidValue {
            attribute: descriptor.name,
            reason: "nominal values not known".into(),
        })
}

fn wrong_kind(descriptor: &ObjectDescriptor, expected: &str, value: &Value) -> Error {
    Error::InvalidValue {
        attribute: descriptor.name,
        reason: format!("expected {expected}, got {}", value.kind()),
    }
}

/// Decodes the payload of an answer into a typed value.
///
/// The payload must have exactly the object's width.
///
/// # Errors
///
/// Returns `UnexpectedPayload` on a width mismatch, or `InvalidValue` if a
/// scaled object is decoded without calibration.
pub fn decode_value(
    descriptor: &ObjectDescriptor,
    payload: &[u8],
    calibration: Option<&Calibration>,
) -> Result<Value> {
    if payload.len() != descriptor.width {
        return Err(Error::UnexpectedPayload {
            object: descriptor.number,
            expected: descriptor.width,
            got: payload.len(),
        });
    }

    let mut cursor = payload;
    let value = match descriptor.encoding {
        Encoding::Flag => Value::Flag(cursor.get_u8() != 0),
        Encoding::Float => Value::Physical(f64::from(cursor.get_f32())),
        Encoding::RawInteger => Value::Integer(cursor.get_uint(descriptor.width) as u32),
        Encoding::Bitfield => Value::Bits(cursor.get_uint(descriptor.width) as u32),
        Encoding::Ascii => Value::Text(parse_string(payload)),
        Encoding::UnsignedScaled(_) => {
            let nominal = nominal_for(descriptor, calibration)?;
            let wire = cursor.get_uint(descriptor.width);
            Value::Physical(scaling::from_wire(wire, nominal, descriptor.width))
        }
        Encoding::SignedScaled(_) => {
            let nominal = nominal_for(descriptor, calibration)?;
            let wire = cursor.get_int(descriptor.width);
            Value::Physical(scaling::from_wire_signed(wire, nominal, descriptor.width))
        }
    };
    Ok(value)
}

/// Encodes a typed value into a payload of the object's width.
///
/// # Errors
///
/// Returns `InvalidValue` if the value has the wrong type or does not fit,
/// `OutOfRange` if a scaled value lies outside the nominal range.
pub fn encode_value(
    descriptor: &ObjectDescriptor,
    value: &Value,
    calibration: Option<&Calibration>,
) -> Result<Bytes> {
    let width = descriptor.width;
    let mut buf = BytesMut::with_capacity(width);

    match descriptor.encoding {
        Encoding::Flag => {
            let flag = value
                .as_flag()
                .ok_or_else(|| wrong_kind(descriptor, "flag", value))?;
            buf.put_u8(u8::from(flag));
        }
        Encoding::Float => {
            let physical = value
                .as_physical()
                .ok_or_else(|| wrong_kind(descriptor, "physical", value))?;
            if !physical.is_finite() || physical.abs() > f64::from(f32::MAX) {
                return Err(Error::InvalidValue {
                    attribute: descriptor.name,
                    reason: format!("{physical} is not representable"),
                });
            }
            buf.put_f32(physical as f32);
        }
        Encoding::RawInteger | Encoding::Bitfield => {
            let raw = match value {
                Value::Integer(raw) | Value::Bits(raw) => *raw,
                other => return Err(wrong_kind(descriptor, "integer", other)),
            };
            if u64::from(raw) > scaling::max_unsigned(width) {
                return Err(Error::InvalidValue {
                    attribute: descriptor.name,
                    reason: format!("{raw} does not fit in {width} bytes"),
                });
            }
            buf.put_uint(u64::from(raw), width);
        }
        Encoding::Ascii => {
            let text = value
                .as_text()
                .ok_or_else(|| wrong_kind(descriptor, "text", value))?;
            if !text.is_ascii() || text.len() > width {
                return Err(Error::InvalidValue {
                    attribute: descriptor.name,
                    reason: format!("expected at most {width} ASCII characters"),
                });
            }
            buf.put_slice(text.as_bytes());
            buf.put_bytes(0, width - text.len());
        }
        Encoding::UnsignedScaled(_) => {
            let physical = value
                .as_physical()
                .ok_or_else(|| wrong_kind(descriptor, "physical", value))?;
            let nominal = nominal_for(descriptor, calibration)?;
            buf.put_uint(scaling::to_wire(physical, nominal, width)?, width);
        }
        Encoding::SignedScaled(_) => {
            let physical = value
                .as_physical()
                .ok_or_else(|| wrong_kind(descriptor, "physical", value))?;
            let nominal = nominal_for(descriptor, calibration)?;
            buf.put_int(scaling::to_wire_signed(physical, nominal, width)?, width);
        }
    }

    Ok(buf.freeze())
}
