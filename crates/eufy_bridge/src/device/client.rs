use std::sync::Arc;

use async_trait::async_trait;

use super::descriptor::DeviceDescriptor;
use super::descriptor::Hsl;

/// Remote device-control API.
///
/// This trait allows for mocking the device API for testing purposes
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// List the devices registered to an account.
    async fn load_devices(&self, email: &str, password: &str)
        -> anyhow::Result<Vec<DeviceDescriptor>>;

    /// Build a handle for one device. Does not touch the network; the device
    /// type and capabilities are derived from the model.
    fn create_device(&self, model: &str, code: &str, ip_address: &str, name: &str)
        -> Arc<dyn Device>;
}

/// Handle to one physical device.
///
/// State getters return the value cached by the last successful
/// `load_current_state` or command; they never go to the network.
#[async_trait]
pub trait Device: Send + Sync {
    fn name(&self) -> &str;

    fn code(&self) -> &str;

    fn model(&self) -> &str;

    /// Raw device type tag, see [`super::DeviceType`].
    fn device_type(&self) -> &str;

    fn ip_address(&self) -> &str;

    fn supports_brightness(&self) -> bool;

    fn supports_temperature(&self) -> bool;

    fn supports_colors(&self) -> bool;

    async fn connect(&self) -> anyhow::Result<()>;

    /// Pull the current state from the device into the cache.
    async fn load_current_state(&self) -> anyhow::Result<()>;

    fn is_power_on(&self) -> bool;

    /// Returns the power state the device reports after the command.
    async fn set_power_on(&self, on: bool) -> anyhow::Result<bool>;

    fn brightness(&self) -> f64;

    async fn set_brightness(&self, brightness: f64) -> anyhow::Result<()>;

    /// Color temperature as a percentage.
    fn temperature(&self) -> f64;

    async fn set_temperature(&self, temperature: f64) -> anyhow::Result<()>;

    fn hsl(&self) -> Hsl;

    async fn set_hsl(&self, hsl: Hsl) -> anyhow::Result<()>;
}

#[cfg(test)]
pub use mock::MockDevice;
#[cfg(test)]
pub use mock::MockDeviceApi;
#[cfg(test)]
pub use mock::MockState;
