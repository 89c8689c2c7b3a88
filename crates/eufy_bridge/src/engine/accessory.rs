use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;

use super::capability;
use super::capability::Capabilities;
use super::capability::Exposure;
use super::handlers::BrightnessHandler;
use super::handlers::ColorComponent;
use super::handlers::ColorHandler;
use super::handlers::IdentifyAction;
use super::handlers::PowerHandler;
use super::handlers::TemperatureHandler;
use crate::device::Device;
use crate::error::Error;
use crate::error::Operation;
use crate::error::Result;
use crate::hap::Accessory;
use crate::hap::CharacteristicHandler;
use crate::hap::CharacteristicKind;
use crate::hap::ServiceKind;

pub const MANUFACTURER: &str = "eufy";
pub const SERIAL_NUMBER: &str = "n/a";

/// Wire an accessory to a device.
///
/// Stamps the information service, installs the identify handler, picks the
/// service shape and attaches GET/SET handlers for every exposed
/// characteristic. Connecting is left to the caller so that it can start
/// after the accessory is tracked.
///
/// Returns [`Error::UnsupportedDeviceType`] if the device type has no host
/// representation; the accessory should then be removed.
pub fn setup(
    accessory: &Accessory,
    device: &Arc<dyn Device>,
    show_plugs_as_switches: bool,
) -> Result<Exposure> {
    accessory
        .get_or_add_service(ServiceKind::AccessoryInformation)
        .set_characteristic(CharacteristicKind::Manufacturer, MANUFACTURER)
        .set_characteristic(CharacteristicKind::Model, device.model())
        .set_characteristic(CharacteristicKind::SerialNumber, SERIAL_NUMBER);

    accessory.set_identify_handler(Arc::new(IdentifyAction {
        device: device.clone(),
    }));

    let exposure = capability::expose(
        device.device_type(),
        show_plugs_as_switches,
        Capabilities::of(device.as_ref()),
    )
    .inspect_err(|e| error!("{}", e))?;

    accessory.set_category(exposure.category);

    let service = accessory.get_or_add_service(exposure.service);
    service.set_characteristic(CharacteristicKind::Name, device.name());

    let color_lock = Arc::new(Mutex::new(()));
    for &kind in &exposure.characteristics {
        let handler: Arc<dyn CharacteristicHandler> = match kind {
            CharacteristicKind::On => Arc::new(PowerHandler {
                device: device.clone(),
            }),
            CharacteristicKind::Brightness => Arc::new(BrightnessHandler {
                device: device.clone(),
            }),
            CharacteristicKind::ColorTemperature => Arc::new(TemperatureHandler {
                device: device.clone(),
            }),
            CharacteristicKind::Hue => Arc::new(ColorHandler {
                device: device.clone(),
                component: ColorComponent::Hue,
                color_lock: color_lock.clone(),
            }),
            CharacteristicKind::Saturation => Arc::new(ColorHandler {
                device: device.clone(),
                component: ColorComponent::Saturation,
                color_lock: color_lock.clone(),
            }),
            other => {
                debug!("No handler for characteristic {}", other);
                continue;
            }
        };
        service.get_or_add_characteristic(kind).set_handler(handler);
    }

    debug!(
        "Wired {} ({}) as {} with {:?}",
        device.name(),
        device.code(),
        exposure.service,
        exposure.characteristics
    );

    Ok(exposure)
}

/// Connect to a device, logging a failure.
pub async fn connect(device: &dyn Device) -> Result<()> {
    device.connect().await.map_err(|source| {
        let err = Error::Device {
            device: device.name().to_string(),
            operation: Operation::Connect,
            source,
        };
        error!("{}", err);
        err
    })
}
