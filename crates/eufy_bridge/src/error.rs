use crate::config::ConfigError;
use crate::hap::CharacteristicKind;

pub type Result<T> = std::result::Result<T, Error>;

/// A device round-trip, named the way it shows up in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Operation {
    #[strum(serialize = "connecting to accessory")]
    Connect,
    #[strum(serialize = "identifying accessory")]
    Identify,
    #[strum(serialize = "toggling power state")]
    SetPower,
    #[strum(serialize = "loading power state")]
    GetPower,
    #[strum(serialize = "setting brightness")]
    SetBrightness,
    #[strum(serialize = "getting brightness")]
    GetBrightness,
    #[strum(serialize = "setting temperature")]
    SetTemperature,
    #[strum(serialize = "getting temperature")]
    GetTemperature,
    #[strum(serialize = "setting color hue")]
    SetHue,
    #[strum(serialize = "getting color hue")]
    GetHue,
    #[strum(serialize = "setting color saturation")]
    SetSaturation,
    #[strum(serialize = "getting color saturation")]
    GetSaturation,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown accessory context: {context}")]
    InvalidContext {
        context: serde_json::Value,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown error setting up accessory of type \"{0}\"")]
    UnsupportedDeviceType(String),

    #[error("Error {operation} on device: {device} - {source}")]
    Device {
        device: String,
        operation: Operation,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid value for {characteristic}: {value}")]
    InvalidValue {
        characteristic: CharacteristicKind,
        value: serde_json::Value,
    },

    #[error("Failed to load devices for account: {0}")]
    Discovery(#[source] anyhow::Error),
}

impl Error {
    /// Whether this error came back from the device itself.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::Device { .. })
    }
}
