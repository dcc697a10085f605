/// base error type for everything that can go wrong in pumpmaus
#[derive(Debug, thiserror::Error)]
pub enum MausError {
    #[error("MausError: {0}")]
    Message(String),

    #[error("MausError: invalid threshold input: {0}")]
    InvalidThreshold(String),

    #[error("MausError: invalid update period: {0}")]
    InvalidPeriod(String),

    #[error("MausError: unknown command {0:?}")]
    UnknownCommand(String),

    #[error(transparent)]
    Mqtt(#[from] rumqttc::ClientError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] toml::de::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}

impl MausError {
    pub fn new(message: String) -> Self {
        Self::Message(message)
    }
}
