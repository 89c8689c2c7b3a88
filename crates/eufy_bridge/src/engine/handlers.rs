//! Host GET/SET handlers backed by device round-trips.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::device::Device;
use crate::device::Hsl;
use crate::error::Error;
use crate::error::Operation;
use crate::error::Result;
use crate::hap::CharacteristicHandler;
use crate::hap::CharacteristicKind;
use crate::hap::IdentifyHandler;
use crate::units;

/// Time the hardware gets to visibly change state during identify.
pub const IDENTIFY_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Log a failed device round-trip and wrap it for the host.
fn failed(device: &dyn Device, operation: Operation, source: anyhow::Error) -> Error {
    let err = Error::Device {
        device: device.name().to_string(),
        operation,
        source,
    };
    error!("{}", err);
    err
}

fn invalid(characteristic: CharacteristicKind, value: &Value) -> Error {
    let err = Error::InvalidValue {
        characteristic,
        value: value.clone(),
    };
    warn!("{}", err);
    err
}

fn as_number(characteristic: CharacteristicKind, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(characteristic, value))
}

/// Hosts send `On` either as a boolean or as 0/1.
fn as_bool(characteristic: CharacteristicKind, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => n
            .as_f64()
            .map(|n| n != 0.0)
            .ok_or_else(|| invalid(characteristic, value)),
        _ => Err(invalid(characteristic, value)),
    }
}

async fn refresh(device: &dyn Device, operation: Operation) -> Result<()> {
    device
        .load_current_state()
        .await
        .map_err(|e| failed(device, operation, e))
}

/// `On` for every service type.
pub(super) struct PowerHandler {
    pub device: Arc<dyn Device>,
}

#[async_trait]
impl CharacteristicHandler for PowerHandler {
    async fn get(&self) -> Result<Value> {
        refresh(self.device.as_ref(), Operation::GetPower).await?;
        Ok(json!(self.device.is_power_on()))
    }

    async fn set(&self, value: Value) -> Result<()> {
        let on = as_bool(CharacteristicKind::On, &value)?;
        self.device
            .set_power_on(on)
            .await
            .map_err(|e| failed(self.device.as_ref(), Operation::SetPower, e))?;
        debug!("Set power on {} to {}", self.device.name(), on);
        Ok(())
    }
}

pub(super) struct BrightnessHandler {
    pub device: Arc<dyn Device>,
}

#[async_trait]
impl CharacteristicHandler for BrightnessHandler {
    async fn get(&self) -> Result<Value> {
        refresh(self.device.as_ref(), Operation::GetBrightness).await?;
        Ok(json!(self.device.brightness()))
    }

    async fn set(&self, value: Value) -> Result<()> {
        let brightness = as_number(CharacteristicKind::Brightness, &value)?;
        self.device
            .set_brightness(brightness)
            .await
            .map_err(|e| failed(self.device.as_ref(), Operation::SetBrightness, e))
    }
}

/// Color temperature: the host speaks mireds, the device a percentage.
pub(super) struct TemperatureHandler {
    pub device: Arc<dyn Device>,
}

#[async_trait]
impl CharacteristicHandler for TemperatureHandler {
    async fn get(&self) -> Result<Value> {
        refresh(self.device.as_ref(), Operation::GetTemperature).await?;
        Ok(json!(units::device_to_mired(self.device.temperature())))
    }

    async fn set(&self, value: Value) -> Result<()> {
        let mired = as_number(CharacteristicKind::ColorTemperature, &value)?;
        self.device
            .set_temperature(units::mired_to_device(mired))
            .await
            .map_err(|e| failed(self.device.as_ref(), Operation::SetTemperature, e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ColorComponent {
    Hue,
    Saturation,
}

impl ColorComponent {
    fn kind(self) -> CharacteristicKind {
        match self {
            ColorComponent::Hue => CharacteristicKind::Hue,
            ColorComponent::Saturation => CharacteristicKind::Saturation,
        }
    }

    fn get_operation(self) -> Operation {
        match self {
            ColorComponent::Hue => Operation::GetHue,
            ColorComponent::Saturation => Operation::GetSaturation,
        }
    }

    fn set_operation(self) -> Operation {
        match self {
            ColorComponent::Hue => Operation::SetHue,
            ColorComponent::Saturation => Operation::SetSaturation,
        }
    }

    fn read(self, hsl: Hsl) -> f64 {
        match self {
            ColorComponent::Hue => hsl.hue,
            ColorComponent::Saturation => hsl.saturation,
        }
    }

    fn replace(self, hsl: Hsl, value: f64) -> Hsl {
        match self {
            ColorComponent::Hue => Hsl { hue: value, ..hsl },
            ColorComponent::Saturation => Hsl {
                saturation: value,
                ..hsl
            },
        }
    }
}

/// Hue or saturation.
///
/// The device only accepts the full HSL triple, so a write re-reads the
/// current color and replaces one component. `color_lock` is shared by both
/// components of a device so concurrent writes cannot interleave their
/// read-modify-write cycles.
pub(super) struct ColorHandler {
    pub device: Arc<dyn Device>,
    pub component: ColorComponent,
    pub color_lock: Arc<Mutex<()>>,
}

#[async_trait]
impl CharacteristicHandler for ColorHandler {
    async fn get(&self) -> Result<Value> {
        refresh(self.device.as_ref(), self.component.get_operation()).await?;
        Ok(json!(self.component.read(self.device.hsl())))
    }

    async fn set(&self, value: Value) -> Result<()> {
        let component_value = as_number(self.component.kind(), &value)?;
        let operation = self.component.set_operation();

        let _guard = self.color_lock.lock().await;
        refresh(self.device.as_ref(), operation).await?;
        let hsl = self.component.replace(self.device.hsl(), component_value);
        self.device
            .set_hsl(hsl)
            .await
            .map_err(|e| failed(self.device.as_ref(), operation, e))
    }
}

/// Flip power, wait, flip back.
pub(super) struct IdentifyAction {
    pub device: Arc<dyn Device>,
}

#[async_trait]
impl IdentifyHandler for IdentifyAction {
    async fn identify(&self) -> Result<()> {
        let device = self.device.as_ref();
        let toggled = device
            .set_power_on(!device.is_power_on())
            .await
            .map_err(|e| failed(device, Operation::Identify, e))?;

        tokio::time::sleep(IDENTIFY_SETTLE_DELAY).await;

        device
            .set_power_on(!toggled)
            .await
            .map_err(|e| failed(device, Operation::Identify, e))?;
        Ok(())
    }
}
