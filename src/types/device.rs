//! Device information types.

use std::fmt;

use crate::protocol::Quantity;

/// Nominal values used as the scaling reference for voltages and currents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Nominal voltage in volts.
    pub nominal_voltage: f64,
    /// Nominal current in amps.
    pub nominal_current: f64,
}

impl Calibration {
    /// Returns the nominal value for a quantity.
    #[must_use]
    pub const fn nominal(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Voltage => self.nominal_voltage,
            Quantity::Current => self.nominal_current,
        }
    }
}

/// Static identity and rating of a device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInformation {
    /// Device type, e.g. `PS 2042-06B`.
    pub device_type: String,
    /// Serial number.
    pub serial_number: String,
    /// Nominal voltage in volts.
    pub nominal_voltage: f64,
    /// Nominal current in amps.
    pub nominal_current: f64,
    /// Nominal power in watts.
    pub nominal_power: f64,
    /// Article number.
    pub article_number: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Firmware version.
    pub software_version: String,
}

impl fmt::Display for DeviceInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}], SW: {}, Art-Nr: {}, [{:.2} V, {:.2} A, {:.2} W]",
            self.manufacturer,
            self.device_type,
            self.serial_number,
            self.software_version,
            self.article_number,
            self.nominal_voltage,
            self.nominal_current,
            self.nominal_power
        )
    }
}
