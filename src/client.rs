//! Main [`PowerSupply`] client implementation.
//!
//! This module provides the high-level [`PowerSupply`] client: named, typed
//! accessors on top of a [`Session`].

use crate::error::{Error, Result};
use crate::protocol::Attribute;
use crate::session::{Session, SessionConfig, SessionState};
use crate::transport::Transport;
use crate::types::{DeviceInformation, DeviceStatus, OperatingState, Value};

fn unexpected(attribute: Attribute, value: &Value) -> Error {
    Error::InvalidValue {
        attribute: attribute.name(),
        reason: format!("device returned a {} value", value.kind()),
    }
}

/// Client for a PS 2000 B power supply.
pub struct PowerSupply<T> {
    session: Session<T>,
}

impl<T: Transport> Default for PowerSupply<T> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl<T: Transport> PowerSupply<T> {
    /// Creates a new client (not yet connected).
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            session: Session::new(config),
        }
    }

    /// Binds a transport.
    pub async fn connect(&self, transport: T) -> Result<()> {
        self.session.connect(transport).await
    }

    /// Binds a transport and reads the device information block.
    ///
    /// The session stays connected if reading the information fails for a
    /// reason that does not disconnect it.
    pub async fn open(&self, transport: T) -> Result<DeviceInformation> {
        self.session.connect(transport).await?;
        let info = self.device_information().await?;
        tracing::info!("connected to {}", info);
        Ok(info)
    }

    /// Disconnects from the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.session.disconnect().await
    }

    /// Returns the session state.
    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    /// Returns the underlying session for direct attribute access.
    #[must_use]
    pub const fn session(&self) -> &Session<T> {
        &self.session
    }

    async fn text(&self, attribute: Attribute) -> Result<String> {
        match self.session.read(attribute).await? {
            Value::Text(text) => Ok(text),
            other => Err(unexpected(attribute, &other)),
        }
    }

    async fn physical(&self, attribute: Attribute) -> Result<f64> {
        let value = self.session.read(attribute).await?;
        value
            .as_physical()
            .ok_or_else(|| unexpected(attribute, &value))
    }

    async fn flag(&self, attribute: Attribute) -> Result<bool> {
        let value = self.session.read(attribute).await?;
        value.as_flag().ok_or_else(|| unexpected(attribute, &value))
    }

    // ==================== Identity ====================

    /// Gets the device type.
    pub async fn device_type(&self) -> Result<String> {
        self.text(Attribute::DeviceType).await
    }

    /// Gets the serial number.
    pub async fn serial_number(&self) -> Result<String> {
        self.text(Attribute::SerialNumber).await
    }

    /// Gets the article number.
    pub async fn article_number(&self) -> Result<String> {
        self.text(Attribute::ArticleNumber).await
    }

    /// Gets the manufacturer.
    pub async fn manufacturer(&self) -> Result<String> {
        self.text(Attribute::Manufacturer).await
    }

    /// Gets the firmware version.
    pub async fn software_version(&self) -> Result<String> {
        self.text(Attribute::SoftwareVersion).await
    }

    /// Gets the nominal voltage in volts.
    pub async fn nominal_voltage(&self) -> Result<f64> {
        self.physical(Attribute::NominalVoltage).await
    }

    /// Gets the nominal current in amps.
    pub async fn nominal_current(&self) -> Result<f64> {
        self.physical(Attribute::NominalCurrent).await
    }

    /// Gets the nominal power in watts.
    pub async fn nominal_power(&self) -> Result<f64> {
        self.physical(Attribute::NominalPower).await
    }

    /// Reads the complete identity block.
    pub async fn device_information(&self) -> Result<DeviceInformation> {
        Ok(DeviceInformation {
            device_type: self.device_type().await?,
            serial_number: self.serial_number().await?,
            nominal_voltage: self.nominal_voltage().await?,
            nominal_current: self.nominal_current().await?,
            nominal_power: self.nominal_power().await?,
            article_number: self.article_number().await?,
            manufacturer: self.manufacturer().await?,
            software_version: self.software_version().await?,
        })
    }

    // ==================== Measurements ====================

    /// Gets the actual output voltage in volts.
    pub async fn measured_voltage(&self) -> Result<f64> {
        self.physical(Attribute::MeasuredVoltage).await
    }

    /// Gets the actual output current in amps.
    pub async fn measured_current(&self) -> Result<f64> {
        self.physical(Attribute::MeasuredCurrent).await
    }

    /// Gets the actual output power in watts.
    pub async fn measured_power(&self) -> Result<f64> {
        let voltage = self.measured_voltage().await?;
        let current = self.measured_current().await?;
        Ok(voltage * current)
    }

    // ==================== Control ====================

    /// Returns true if remote control mode is active.
    pub async fn remote_control_enabled(&self) -> Result<bool> {
        self.flag(Attribute::RemoteControl).await
    }

    /// Enables or disables remote control mode.
    ///
    /// Set values are only accepted by the device in remote control mode.
    pub async fn set_remote_control(&self, enabled: bool) -> Result<()> {
        self.session.write(Attribute::RemoteControl, enabled).await
    }

    /// Returns true if the output is switched on.
    pub async fn output_enabled(&self) -> Result<bool> {
        self.flag(Attribute::OutputEnabled).await
    }

    /// Switches the output on or off.
    pub async fn set_output(&self, enabled: bool) -> Result<()> {
        self.session.write(Attribute::OutputEnabled, enabled).await
    }

    /// Gets the voltage setpoint in volts.
    pub async fn voltage_setpoint(&self) -> Result<f64> {
        self.physical(Attribute::SetVoltage).await
    }

    /// Sets the output voltage in volts.
    ///
    /// Remote control mode is not switched on here. Without it the device
    /// refuses the write with [`DeviceError::RemoteControlRequired`]; use
    /// [`Self::set_voltage_with_remote`] to enable it first.
    ///
    /// [`DeviceError::RemoteControlRequired`]: crate::types::DeviceError::RemoteControlRequired
    pub async fn set_voltage(&self, volts: f64) -> Result<()> {
        self.session.write(Attribute::SetVoltage, volts).await
    }

    /// Enables remote control mode, then sets the output voltage in volts.
    pub async fn set_voltage_with_remote(&self, volts: f64) -> Result<()> {
        self.set_remote_control(true).await?;
        self.set_voltage(volts).await
    }

    /// Gets the current limit in amps.
    pub async fn current_setpoint(&self) -> Result<f64> {
        self.physical(Attribute::SetCurrent).await
    }

    /// Sets the current limit in amps.
    ///
    /// Like [`Self::set_voltage`], this requires remote control mode to be
    /// active already.
    pub async fn set_current(&self, amps: f64) -> Result<()> {
        self.session.write(Attribute::SetCurrent, amps).await
    }

    /// Enables remote control mode, then sets the current limit in amps.
    pub async fn set_current_with_remote(&self, amps: f64) -> Result<()> {
        self.set_remote_control(true).await?;
        self.set_current(amps).await
    }

    /// Gets the over-voltage protection threshold in volts.
    pub async fn ovp_threshold(&self) -> Result<f64> {
        self.physical(Attribute::OvpThreshold).await
    }

    /// Sets the over-voltage protection threshold in volts.
    pub async fn set_ovp_threshold(&self, volts: f64) -> Result<()> {
        self.session.write(Attribute::OvpThreshold, volts).await
    }

    /// Gets the over-current protection threshold in amps.
    pub async fn ocp_threshold(&self) -> Result<f64> {
        self.physical(Attribute::OcpThreshold).await
    }

    /// Sets the over-current protection threshold in amps.
    pub async fn set_ocp_threshold(&self, amps: f64) -> Result<()> {
        self.session.write(Attribute::OcpThreshold, amps).await
    }

    /// Acknowledges tripped protections.
    pub async fn clear_protection(&self) -> Result<()> {
        self.session.write(Attribute::ClearProtection, true).await
    }

    // ==================== Status ====================

    /// Gets the status reported by the device.
    pub async fn status(&self) -> Result<DeviceStatus> {
        self.session.get_status().await
    }

    /// Gets the decoded device state.
    pub async fn operating_state(&self) -> Result<OperatingState> {
        let value = self.session.read(Attribute::DeviceState).await?;
        value
            .as_bits()
            .map(OperatingState::from_bits)
            .ok_or_else(|| unexpected(Attribute::DeviceState, &value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, SimulatedDevice};
    use crate::types::{DeviceError, RegulationMode};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    async fn opened(device: SimulatedDevice) -> (PowerSupply<MockTransport>, MockTransport) {
        let mock = MockTransport::with_device(device);
        let psu = PowerSupply::default();
        psu.connect(mock.clone()).await.unwrap();
        (psu, mock)
    }

    #[tokio::test]
    async fn test_open_reads_identity() {
        let mock = MockTransport::with_device(SimulatedDevice::default());
        let psu = PowerSupply::default();

        let info = psu.open(mock.clone()).await.unwrap();
        assert_eq!(info.device_type, SimulatedDevice::DEVICE_TYPE);
        assert_eq!(info.serial_number, SimulatedDevice::SERIAL_NUMBER);
        assert_eq!(info.article_number, SimulatedDevice::ARTICLE_NUMBER);
        assert_eq!(info.manufacturer, SimulatedDevice::MANUFACTURER);
        assert_eq!(info.software_version, SimulatedDevice::SOFTWARE_VERSION);
        assert!(approx(info.nominal_voltage, 20.0));
        assert!(approx(info.nominal_current, 5.0));
        assert!(approx(info.nominal_power, 100.0));
        assert_eq!(mock.written().len(), 8);
        assert_eq!(psu.state().await, SessionState::CalibrationPending);

        let text = info.to_string();
        assert!(text.contains("PS 2042-06B"));
        assert!(text.contains("20.00 V"));
    }

    #[tokio::test]
    async fn test_setpoints() {
        let (psu, mock) = opened(SimulatedDevice::default()).await;

        psu.set_remote_control(true).await.unwrap();
        assert!(psu.remote_control_enabled().await.unwrap());

        psu.set_voltage(12.0).await.unwrap();
        psu.set_current(1.5).await.unwrap();
        assert!(approx(psu.voltage_setpoint().await.unwrap(), 12.0));
        assert!(approx(psu.current_setpoint().await.unwrap(), 1.5));
        assert_eq!(mock.with_simulated(|device| device.set_voltage), 39321);

        psu.set_ovp_threshold(15.0).await.unwrap();
        psu.set_ocp_threshold(2.0).await.unwrap();
        assert!(approx(psu.ovp_threshold().await.unwrap(), 15.0));
        assert!(approx(psu.ocp_threshold().await.unwrap(), 2.0));
        assert_eq!(psu.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_setpoint_requires_remote_control() {
        let (psu, _mock) = opened(SimulatedDevice::default()).await;

        let err = psu.set_voltage(3.3).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Device {
                error: DeviceError::RemoteControlRequired,
                ..
            }
        ));
        assert!(!psu.remote_control_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn test_setpoint_with_remote() {
        let (psu, mock) = opened(SimulatedDevice::default()).await;

        psu.set_voltage_with_remote(5.0).await.unwrap();
        assert!(psu.remote_control_enabled().await.unwrap());
        psu.set_current_with_remote(2.5).await.unwrap();

        assert!(approx(psu.voltage_setpoint().await.unwrap(), 5.0));
        assert!(approx(psu.current_setpoint().await.unwrap(), 2.5));
        assert_eq!(mock.with_simulated(|device| device.set_voltage), 16384);
        assert_eq!(psu.state().await, SessionState::Ready);
    }

    #[tokio::test]
    async fn test_measurements() {
        let (psu, _mock) = opened(SimulatedDevice::default()).await;
        psu.set_remote_control(true).await.unwrap();
        psu.set_voltage(10.0).await.unwrap();

        assert!(approx(psu.measured_voltage().await.unwrap(), 0.0));

        psu.set_output(true).await.unwrap();
        assert!(psu.output_enabled().await.unwrap());
        let voltage = psu.measured_voltage().await.unwrap();
        let current = psu.measured_current().await.unwrap();
        assert!(approx(voltage, 10.0));
        assert!(approx(current, 2.5));
        assert!(approx(psu.measured_power().await.unwrap(), voltage * current));
    }

    #[tokio::test]
    async fn test_operating_state_and_clear_protection() {
        let device = SimulatedDevice {
            remote_control: true,
            output_enabled: true,
            protection: OperatingState::OVP | OperatingState::CONSTANT_CURRENT,
            ..SimulatedDevice::default()
        };
        let (psu, mock) = opened(device).await;

        let state = psu.operating_state().await.unwrap();
        assert!(state.remote_control);
        assert!(state.output_enabled);
        assert!(state.over_voltage);
        assert_eq!(state.regulation, RegulationMode::ConstantCurrent);
        assert!(state.protection_tripped());

        psu.clear_protection().await.unwrap();
        assert_eq!(mock.with_simulated(|device| device.protection), 0);
        assert!(!psu.operating_state().await.unwrap().protection_tripped());

        let status = psu.status().await.unwrap();
        assert!(status.remote_control);
        assert!(status.output_enabled);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let (psu, mock) = opened(SimulatedDevice::default()).await;
        psu.disconnect().await.unwrap();
        assert_eq!(psu.state().await, SessionState::Disconnected);
        assert_eq!(mock.closed(), 1);
        assert!(matches!(
            psu.serial_number().await,
            Err(Error::NotConnected)
        ));
    }
}
