//! Decides how a device is presented to the host.

use crate::device::Device;
use crate::device::DeviceType;
use crate::error::Error;
use crate::error::Result;
use crate::hap::Category;
use crate::hap::CharacteristicKind;
use crate::hap::ServiceKind;

/// Optional capabilities a device declares. Fixed for the device's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub brightness: bool,
    pub temperature: bool,
    pub colors: bool,
}

impl Capabilities {
    pub fn of(device: &dyn Device) -> Self {
        Self {
            brightness: device.supports_brightness(),
            temperature: device.supports_temperature(),
            colors: device.supports_colors(),
        }
    }

    /// Characteristics to wire, in wiring order. `On` is always present.
    pub fn characteristics(&self) -> Vec<CharacteristicKind> {
        let mut kinds = vec![CharacteristicKind::On];
        if self.brightness {
            kinds.push(CharacteristicKind::Brightness);
        }
        if self.temperature {
            kinds.push(CharacteristicKind::ColorTemperature);
        }
        if self.colors {
            kinds.push(CharacteristicKind::Hue);
            kinds.push(CharacteristicKind::Saturation);
        }
        kinds
    }
}

/// The service shape chosen for a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exposure {
    pub service: ServiceKind,
    pub category: Category,
    pub characteristics: Vec<CharacteristicKind>,
}

/// Service and category for a device type.
pub fn service_for(device_type: DeviceType, show_plugs_as_switches: bool) -> (ServiceKind, Category) {
    match device_type {
        DeviceType::LightBulb => (ServiceKind::Lightbulb, Category::Lightbulb),
        DeviceType::PowerPlug if show_plugs_as_switches => (ServiceKind::Switch, Category::Switch),
        DeviceType::PowerPlug => (ServiceKind::Outlet, Category::Outlet),
        DeviceType::Switch => (ServiceKind::Switch, Category::ProgrammableSwitch),
    }
}

/// Map a raw device type tag and capabilities onto an [`Exposure`].
///
/// Unknown tags yield [`Error::UnsupportedDeviceType`].
pub fn expose(
    device_type: &str,
    show_plugs_as_switches: bool,
    capabilities: Capabilities,
) -> Result<Exposure> {
    let parsed: DeviceType = device_type
        .parse()
        .map_err(|_| Error::UnsupportedDeviceType(device_type.to_string()))?;
    let (service, category) = service_for(parsed, show_plugs_as_switches);

    Ok(Exposure {
        service,
        category,
        characteristics: capabilities.characteristics(),
    })
}
