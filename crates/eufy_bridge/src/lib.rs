pub mod config;
pub mod device;
pub mod engine;
mod error;
pub mod hap;
pub mod logging;
mod platform;
pub mod units;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use config::PlatformConfig;
pub use engine::Registry;
pub use error::Error;
pub use error::Operation;
pub use error::Result;
pub use platform::Platform;
