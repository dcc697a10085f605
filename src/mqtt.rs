pub mod publish;
pub mod subscribe;

use crate::config::MqttSettings;
use crate::errors::MausError;

const TOPIC_PATTERN: &str = r"^iot/(?P<name>[^/]+)/(?P<kind>sensor|pump|response|mode)$";
const REQUEST_CAPACITY: usize = 100;

/// The four edges between device and controller
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// latest sensor value, device -> controller
    Sensor,
    /// local pump toggles, informational
    Pump,
    /// pump directive, controller -> device
    Response,
    /// mode announcement, any peer -> all
    Mode,
}

impl Topic {
    fn kind(&self) -> &'static str {
        match self {
            Topic::Sensor => "sensor",
            Topic::Pump => "pump",
            Topic::Response => "response",
            Topic::Mode => "mode",
        }
    }
}

/// A single scalar payload on one of the topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: Topic,
    pub payload: String,
}

impl Message {
    pub fn new(topic: Topic, payload: impl Into<String>) -> Self {
        Self {
            topic,
            payload: payload.into(),
        }
    }
}

/// Maps topics to broker paths for a single named device
#[derive(Debug, Clone)]
pub struct TopicMap {
    name: String,
    pattern: regex::Regex,
}

impl TopicMap {
    pub fn new(device_name: &str) -> Result<Self, MausError> {
        let name = slug::slugify(device_name);
        if name.is_empty() {
            return Err(MausError::new(format!(
                "device name {:?} yields an empty topic namespace",
                device_name
            )));
        }
        Ok(Self {
            name,
            pattern: regex::Regex::new(TOPIC_PATTERN)?,
        })
    }

    pub fn path(&self, topic: Topic) -> String {
        format!("iot/{}/{}", self.name, topic.kind())
    }

    /// Determine a topic from a broker path, only within this device's namespace
    pub fn topic_from_path(&self, path: &str) -> Option<Topic> {
        let captures = self.pattern.captures(path)?;
        if captures.name("name")?.as_str() != self.name {
            return None;
        }
        match captures.name("kind")?.as_str() {
            "sensor" => Some(Topic::Sensor),
            "pump" => Some(Topic::Pump),
            "response" => Some(Topic::Response),
            "mode" => Some(Topic::Mode),
            _ => None,
        }
    }
}

/// Set up the client handle and its event loop; nothing goes out until the loop is polled
pub fn connect(
    settings: &MqttSettings,
    client_id: &str,
) -> Result<(rumqttc::AsyncClient, rumqttc::EventLoop), MausError> {
    // rumqttc panics on these instead of returning an error
    if client_id.is_empty() || client_id.starts_with(' ') {
        return Err(MausError::new(format!(
            "invalid MQTT client id {:?}",
            client_id
        )));
    }
    let mut options = rumqttc::MqttOptions::new(client_id, &settings.host, settings.port);
    options.set_keep_alive(std::time::Duration::from_secs(settings.keep_alive_secs));
    options.set_clean_session(true);
    log::debug!(
        "MQTT client {} for {}:{}",
        client_id,
        settings.host,
        settings.port
    );
    Ok(rumqttc::AsyncClient::new(options, REQUEST_CAPACITY))
}
