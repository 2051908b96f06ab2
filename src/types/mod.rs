//! Data types exchanged with the power supply.
//!
//! This module contains:
//! - Typed attribute values
//! - Status decoded from answers
//! - Device identity and calibration

pub mod device;
pub mod status;
pub mod value;

pub use device::{Calibration, DeviceInformation};
pub use status::{DeviceError, DeviceStatus, OperatingState, RegulationMode};
pub use value::Value;
