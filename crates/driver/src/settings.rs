use serde::Deserialize;

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct Settings {
    /// USB vendor id of the master controller.
    pub vendor_id: u16,
    /// USB product id of the master controller.
    pub product_id: u16,
    /// ALSA sequencer client name for the control-surface input port.
    pub client_name: String,
    /// Name of the virtual MIDI input port the surface connects to.
    pub port_name_in: String,
    /// Speed-control loop period in milliseconds.
    pub tick_period_ms: u64,
    /// Hard PWM ceiling for the traction channel (1..=127).
    pub speed_limit: u8,
    /// How long the points actuator is held energized per throw. Too short
    /// a pulse fails to physically move the mechanism.
    pub point_pulse_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Hori "Densha de GO!! One Handle Controller" for Switch.
            vendor_id: 0x0f0d,
            product_id: 0x00c1,
            client_name: "Mascon Cab Console".to_string(),
            port_name_in: "Mascon Control Surface In".to_string(),
            tick_period_ms: 50,
            speed_limit: 85,
            point_pulse_ms: 50,
        }
    }
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.client_name.is_empty() {
            return Err("Client name must not be empty".to_string());
        }

        if self.port_name_in.is_empty() {
            return Err("Input port name must not be empty".to_string());
        }

        if self.tick_period_ms == 0 {
            return Err("tick_period_ms must be at least 1".to_string());
        }

        if self.speed_limit == 0 || self.speed_limit > 127 {
            return Err(format!(
                "speed_limit must be 1 to 127 (found {})",
                self.speed_limit
            ));
        }

        if self.point_pulse_ms == 0 {
            return Err("point_pulse_ms must be at least 1".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_speed_limit_is_rejected() {
        let mut settings = Settings::default();
        settings.speed_limit = 0;
        assert!(settings.validate().is_err());
        settings.speed_limit = 200;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_periods_are_rejected() {
        let mut settings = Settings::default();
        settings.tick_period_ms = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.point_pulse_ms = 0;
        assert!(settings.validate().is_err());
    }
}
