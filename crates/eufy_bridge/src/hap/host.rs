use std::sync::Arc;

use uuid::Uuid;

use super::accessory::Accessory;

/// Plugin identifier accessories are registered under.
pub const PLUGIN_NAME: &str = "homebridge-eufy";

/// Platform identifier accessories are registered under.
pub const PLATFORM_NAME: &str = "eufy";

/// Accessory persistence owned by the home-automation host.
///
/// This trait allows for mocking the host for testing purposes
pub trait Host: Send + Sync {
    /// Persist accessories and expose them to clients.
    fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]);

    /// Drop accessories from persistence.
    fn unregister_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]);

    /// Deterministic UUID for an arbitrary string.
    fn generate_uuid(&self, input: &str) -> String {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, input.as_bytes()).to_string()
    }

    fn create_accessory(&self, display_name: &str, uuid: &str) -> Arc<Accessory> {
        Arc::new(Accessory::new(display_name, uuid))
    }
}

/// Mock host for testing
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockHost {
    pub registered: std::sync::Mutex<Vec<Arc<Accessory>>>,
    pub unregistered: std::sync::Mutex<Vec<Arc<Accessory>>>,
}

#[cfg(test)]
impl Host for MockHost {
    fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]) {
        assert_eq!(plugin, PLUGIN_NAME);
        assert_eq!(platform, PLATFORM_NAME);
        self.registered
            .lock()
            .unwrap()
            .extend(accessories.iter().cloned());
    }

    fn unregister_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]) {
        assert_eq!(plugin, PLUGIN_NAME);
        assert_eq!(platform, PLATFORM_NAME);
        self.unregistered
            .lock()
            .unwrap()
            .extend(accessories.iter().cloned());
    }
}

#[cfg(test)]
impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_count(&self) -> usize {
        self.registered.lock().unwrap().len()
    }

    pub fn unregistered_count(&self) -> usize {
        self.unregistered.lock().unwrap().len()
    }
}
