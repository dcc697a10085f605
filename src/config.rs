/// config holds all settings for both roles, read from an optional TOML file
use serde::Deserialize;
use std::time::Duration;

use crate::controller::DecisionRule;
use crate::errors::MausError;
use crate::models::{self, DeviceState, Thresholds};

const MQTT_HOST: &str = "test.mosquitto.org";
const MQTT_PORT: u16 = 1883;
const MQTT_KEEP_ALIVE: u64 = 60;

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub device: DeviceSettings,
    pub controller: ControllerSettings,
}

impl Settings {
    pub fn from_file(path: &std::path::Path) -> Result<Self, MausError> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub client_id: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            host: MQTT_HOST.to_string(),
            port: MQTT_PORT,
            client_id: None,
            keep_alive_secs: MQTT_KEEP_ALIVE,
        }
    }
}

impl MqttSettings {
    /// Configured client id, or one derived from role and hostname
    pub fn client_id(&self, role: &str) -> String {
        if let Some(client_id) = &self.client_id {
            return client_id.clone();
        }
        let host = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        format!("pumpmaus-{}-{}", role, host)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub name: String,
    pub update_period_secs: u64,
    pub critical_low: u8,
    pub critical_high: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            name: "device".to_string(),
            update_period_secs: DeviceState::default().update_period.as_secs(),
            critical_low: thresholds.low,
            critical_high: thresholds.high,
        }
    }
}

impl DeviceSettings {
    pub fn initial_state(&self) -> Result<DeviceState, MausError> {
        let thresholds = Thresholds::new(self.critical_low, self.critical_high)?;
        let period = models::update_period(self.update_period_secs)?;
        Ok(DeviceState::new(thresholds, period))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    pub on_below: f64,
    pub off_above: f64,
    pub mode_switch_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        let rule = DecisionRule::default();
        Self {
            on_below: rule.on_below,
            off_above: rule.off_above,
            mode_switch_secs: 20,
        }
    }
}

impl ControllerSettings {
    pub fn rule(&self) -> DecisionRule {
        DecisionRule {
            on_below: self.on_below,
            off_above: self.off_above,
        }
    }

    pub fn mode_switch_period(&self) -> Result<Duration, MausError> {
        if self.mode_switch_secs == 0 {
            return Err(MausError::InvalidPeriod(
                "mode switch period must be positive".to_string(),
            ));
        }
        Ok(Duration::from_secs(self.mode_switch_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.mqtt.host, "test.mosquitto.org");
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.device.name, "device");
        assert_eq!(settings.device.initial_state().unwrap(), DeviceState::default());
        assert_eq!(settings.controller.rule(), DecisionRule::default());
        assert_eq!(
            settings.controller.mode_switch_period().unwrap(),
            Duration::from_secs(20)
        );
    }

    #[test]
    fn test_from_file_partial() {
        let tmp_dir =
            tempdir::TempDir::new("pumpmaus").expect("Could not create a temporary folder");
        let path = tmp_dir.path().join("pumpmaus.toml");
        let mut tmp_file = std::fs::File::create(&path).expect("Could not open a new temp file");
        write!(
            tmp_file,
            "[mqtt]\nhost = \"localhost\"\nclient_id = \"bench\"\n\n[device]\ncritical_low = 80\ncritical_high = 50\n"
        )
        .expect("Could not write contents to temp file");

        let settings = Settings::from_file(&path).expect("Expect config to load");
        assert_eq!(settings.mqtt.host, "localhost");
        assert_eq!(settings.mqtt.port, 1883);
        assert_eq!(settings.mqtt.client_id("device"), "bench");
        assert_eq!(settings.controller, ControllerSettings::default());

        let state = settings.device.initial_state().unwrap();
        assert_eq!(state.thresholds, Thresholds { low: 80, high: 81 });
    }

    #[test]
    fn test_from_file_invalid() {
        let tmp_dir =
            tempdir::TempDir::new("pumpmaus").expect("Could not create a temporary folder");
        let path = tmp_dir.path().join("pumpmaus.toml");
        std::fs::write(&path, "[device]\nupdate_period_secs = \"fast\"\n")
            .expect("Could not write contents to temp file");
        assert!(matches!(
            Settings::from_file(&path),
            Err(MausError::Config(_))
        ));
        assert!(matches!(
            Settings::from_file(&tmp_dir.path().join("missing.toml")),
            Err(MausError::Io(_))
        ));
    }

    #[test]
    fn test_derived_client_id() {
        let settings = MqttSettings::default();
        assert!(settings.client_id("controller").starts_with("pumpmaus-controller-"));
    }

    #[test]
    fn test_invalid_device_settings() {
        let settings = DeviceSettings {
            update_period_secs: 0,
            ..DeviceSettings::default()
        };
        assert!(matches!(
            settings.initial_state(),
            Err(MausError::InvalidPeriod(_))
        ));
    }
}
