use serde::Deserialize;
use serde::Serialize;

/// Device types known to the bridge.
///
/// Parsed from the raw type tag reported by the device API; tags that do not
/// parse have no host representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceType {
    LightBulb,
    PowerPlug,
    Switch,
}

/// A device as returned by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub name: String,
    pub code: String,
    pub model: String,
    pub device_type: String,
    pub ip_address: String,
}

/// Composite color as the device stores it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    /// Degrees, 0-360
    pub hue: f64,
    /// Percent, 0-100
    pub saturation: f64,
    /// Percent, 0-100
    pub lightness: f64,
}

impl Hsl {
    pub fn new(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self {
            hue,
            saturation,
            lightness,
        }
    }
}
