//! Boundary to the remote device-control API.

mod client;
mod descriptor;

pub use client::Device;
pub use client::DeviceApi;
#[cfg(test)]
pub use client::MockDevice;
#[cfg(test)]
pub use client::MockDeviceApi;
#[cfg(test)]
pub use client::MockState;
pub use descriptor::DeviceDescriptor;
pub use descriptor::DeviceType;
pub use descriptor::Hsl;
