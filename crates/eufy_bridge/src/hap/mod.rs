//! Host-side accessory model.
//!
//! Accessories, services and characteristics as the home-automation host
//! exposes them, plus the [`Host`] persistence boundary.

mod accessory;
mod host;
mod types;

pub use accessory::Accessory;
pub use accessory::Characteristic;
pub use accessory::CharacteristicHandler;
pub use accessory::IdentifyHandler;
pub use accessory::Service;
pub use host::Host;
#[cfg(test)]
pub use host::MockHost;
pub use host::PLATFORM_NAME;
pub use host::PLUGIN_NAME;
pub use types::Category;
pub use types::CharacteristicKind;
pub use types::ServiceKind;
