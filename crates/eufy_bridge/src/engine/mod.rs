mod accessory;
pub mod capability;
mod handlers;
mod registry;

pub use accessory::connect;
pub use accessory::setup;
pub use accessory::MANUFACTURER;
pub use accessory::SERIAL_NUMBER;
pub use capability::Capabilities;
pub use capability::Exposure;
pub use handlers::IDENTIFY_SETTLE_DELAY;
pub use registry::AccessoryContext;
pub use registry::Entry;
pub use registry::Registry;
