use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::accessory;
use crate::device::Device;
use crate::device::DeviceApi;
use crate::error::Error;
use crate::error::Result;
use crate::hap::Accessory;
use crate::hap::Host;
use crate::hap::PLATFORM_NAME;
use crate::hap::PLUGIN_NAME;

/// What an accessory persists about its device across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessoryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub model: String,
    pub code: String,
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
}

impl AccessoryContext {
    pub fn of(device: &dyn Device) -> Self {
        Self {
            name: Some(device.name().to_string()),
            model: device.model().to_string(),
            code: device.code().to_string(),
            ip_address: device.ip_address().to_string(),
        }
    }

    /// Parse a persisted context; every field except `name` must be a string.
    pub fn from_value(context: &Value) -> Result<Self> {
        serde_json::from_value(context.clone()).map_err(|source| Error::InvalidContext {
            context: context.clone(),
            source,
        })
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "model": self.model,
            "code": self.code,
            "ipAddress": self.ip_address,
        });
        if let Some(name) = &self.name {
            value["name"] = json!(name);
        }
        value
    }
}

/// A tracked accessory and the live handle for its device.
#[derive(Clone)]
pub struct Entry {
    pub accessory: Arc<Accessory>,
    pub device: Arc<dyn Device>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks which device backs which host accessory.
///
/// Keyed by device code; at most one entry exists per code. All map updates
/// happen inside a single critical section with no await in between, so a
/// duplicate check and its insert cannot be separated by another task. The
/// host is never called while that section is held.
///
/// Connects start in the background on the current tokio runtime. Outside a
/// runtime they are queued until [`Registry::start_pending_connections`].
pub struct Registry {
    host: Arc<dyn Host>,
    api: Arc<dyn DeviceApi>,
    show_plugs_as_switches: bool,
    entries: Mutex<HashMap<String, Entry>>,
    connections: Mutex<JoinSet<()>>,
    pending: Mutex<Vec<Entry>>,
}

impl Registry {
    pub fn new(host: Arc<dyn Host>, api: Arc<dyn DeviceApi>, show_plugs_as_switches: bool) -> Self {
        Self {
            host,
            api,
            show_plugs_as_switches,
            entries: Mutex::new(HashMap::new()),
            connections: Mutex::new(JoinSet::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Reattach an accessory restored from the host's cache.
    ///
    /// A context that is missing `model`, `code` or `ipAddress` (or has them
    /// with the wrong type) is logged and the accessory skipped. A second
    /// cached accessory for an already tracked code is unregistered.
    pub fn configure_from_cache(self: &Arc<Self>, accessory: Arc<Accessory>) -> Result<()> {
        info!("Loading accessory from cache: {}", accessory.display_name());

        let context = AccessoryContext::from_value(&accessory.context())
            .inspect_err(|e| error!("{}", e))?;

        let device = self.api.create_device(
            &context.model,
            &context.code,
            &context.ip_address,
            accessory.display_name(),
        );

        if !self.try_insert(&accessory, &device) {
            warn!(
                "Removing duplicate cached accessory {}, code {} already registered",
                accessory.display_name(),
                context.code
            );
            self.host
                .unregister_accessories(PLUGIN_NAME, PLATFORM_NAME, &[accessory]);
            return Ok(());
        }

        if let Err(e) = accessory::setup(&accessory, &device, self.show_plugs_as_switches) {
            self.remove(&accessory);
            return Err(e);
        }

        self.spawn_connect(accessory, device);
        Ok(())
    }

    /// Add a freshly discovered device.
    ///
    /// Returns `Ok(false)` if an accessory for the device code already exists.
    pub fn discover_and_add(self: &Arc<Self>, device: Arc<dyn Device>) -> Result<bool> {
        info!("Add Accessory: {} - {}", device.name(), device.code());

        if self.contains(device.code()) {
            info!("Skipping accessory, already registered");
            return Ok(false);
        }

        let uuid = self.host.generate_uuid(device.code());
        let accessory = self.host.create_accessory(device.name(), &uuid);
        accessory.set_context(AccessoryContext::of(device.as_ref()).to_value());

        if !self.try_insert(&accessory, &device) {
            info!("Skipping accessory, already registered");
            return Ok(false);
        }

        if let Err(e) = accessory::setup(&accessory, &device, self.show_plugs_as_switches) {
            // Never handed to the host, so there is nothing to unregister.
            lock(&self.entries).remove(device.code());
            return Err(e);
        }

        self.host
            .register_accessories(PLUGIN_NAME, PLATFORM_NAME, &[accessory.clone()]);
        self.spawn_connect(accessory, device);
        Ok(true)
    }

    /// Unregister an accessory from the host and stop tracking it.
    ///
    /// Returns false, without touching the host, if it was not tracked.
    pub fn remove(&self, accessory: &Arc<Accessory>) -> bool {
        let removed = {
            let mut entries = lock(&self.entries);
            let code = entries
                .iter()
                .find(|(_, entry)| Arc::ptr_eq(&entry.accessory, accessory))
                .map(|(code, _)| code.clone());
            code.and_then(|code| entries.remove(&code))
        };

        match removed {
            Some(entry) => {
                info!("Removing accessory: {}", entry.accessory.display_name());
                self.host
                    .unregister_accessories(PLUGIN_NAME, PLATFORM_NAME, &[entry.accessory]);
                true
            }
            None => {
                debug!("Accessory {} is not registered", accessory.display_name());
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }

    pub fn contains(&self, code: &str) -> bool {
        lock(&self.entries).contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<Entry> {
        lock(&self.entries).get(code).cloned()
    }

    /// Start the connects queued while no tokio runtime was running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_pending_connections(self: &Arc<Self>) {
        let pending = std::mem::take(&mut *lock(&self.pending));
        if !pending.is_empty() {
            debug!("Starting {} queued connection(s)", pending.len());
        }
        for entry in pending {
            self.spawn_connect(entry.accessory, entry.device);
        }
    }

    /// Wait for every connection attempt started so far, starting queued ones
    /// first.
    pub async fn wait_for_connections(self: &Arc<Self>) {
        self.start_pending_connections();
        let mut pending = std::mem::take(&mut *lock(&self.connections));
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!("Connection task failed: {}", e);
            }
        }
    }

    fn try_insert(&self, accessory: &Arc<Accessory>, device: &Arc<dyn Device>) -> bool {
        let mut entries = lock(&self.entries);
        if entries.contains_key(device.code()) {
            return false;
        }
        entries.insert(
            device.code().to_string(),
            Entry {
                accessory: accessory.clone(),
                device: device.clone(),
            },
        );
        true
    }

    /// Connect in the background; an unreachable device loses its accessory
    /// and is picked up again by the next discovery.
    fn spawn_connect(self: &Arc<Self>, accessory: Arc<Accessory>, device: Arc<dyn Device>) {
        let Ok(handle) = Handle::try_current() else {
            debug!("No runtime yet, queueing connect to {}", device.code());
            lock(&self.pending).push(Entry { accessory, device });
            return;
        };

        let registry = Arc::clone(self);
        let mut connections = lock(&self.connections);
        while let Some(result) = connections.try_join_next() {
            if let Err(e) = result {
                warn!("Connection task failed: {}", e);
            }
        }
        connections.spawn_on(
            async move {
                if accessory::connect(device.as_ref()).await.is_err() {
                    registry.remove(&accessory);
                }
            },
            &handle,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::MockDeviceApi;
    use crate::hap::Category;
    use crate::hap::MockHost;
    use crate::hap::ServiceKind;

    struct Fixture {
        host: Arc<MockHost>,
        api: Arc<MockDeviceApi>,
        registry: Arc<Registry>,
    }

    fn fixture_with(api: MockDeviceApi, show_plugs_as_switches: bool) -> Fixture {
        let host = Arc::new(MockHost::new());
        let api = Arc::new(api);
        let registry = Arc::new(Registry::new(
            host.clone(),
            api.clone(),
            show_plugs_as_switches,
        ));
        Fixture {
            host,
            api,
            registry,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockDeviceApi::default(), false)
    }

    fn cached(name: &str, context: Value) -> Arc<Accessory> {
        let accessory = Arc::new(Accessory::new(name, format!("uuid-{}", name)));
        accessory.set_context(context);
        accessory
    }

    impl Fixture {
        fn device(&self, model: &str, code: &str, device_type: &str) -> Arc<dyn Device> {
            self.api.set_device_type(code, device_type);
            self.api
                .create_device(model, code, "10.0.0.7", &format!("Device {}", code))
        }
    }

    #[tokio::test]
    async fn test_discovering_twice_adds_once() {
        let f = fixture();

        assert!(f.registry.discover_and_add(f.device("T1011", "D1", "LIGHT_BULB")).unwrap());
        assert!(!f.registry.discover_and_add(f.device("T1011", "D1", "LIGHT_BULB")).unwrap());
        f.registry.wait_for_connections().await;

        assert_eq!(f.registry.len(), 1);
        assert_eq!(f.host.registered_count(), 1);
    }

    #[tokio::test]
    async fn test_discovered_accessory_context_and_uuid() {
        let f = fixture();
        f.registry
            .discover_and_add(f.device("T1201", "P1", "POWER_PLUG"))
            .unwrap();

        let entry = f.registry.get("P1").unwrap();
        assert_eq!(entry.accessory.uuid(), f.host.generate_uuid("P1"));
        assert_eq!(entry.accessory.category(), Category::Outlet);

        let context = AccessoryContext::from_value(&entry.accessory.context()).unwrap();
        assert_eq!(
            context,
            AccessoryContext {
                name: Some("Device P1".to_string()),
                model: "T1201".to_string(),
                code: "P1".to_string(),
                ip_address: "10.0.0.7".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_restore_valid_cached_accessory() {
        let f = fixture();
        let accessory = cached(
            "Lamp",
            json!({"model": "T1", "code": "C1", "ipAddress": "10.0.0.5"}),
        );

        f.registry.configure_from_cache(accessory.clone()).unwrap();

        assert!(f.registry.contains("C1"));
        assert!(accessory.service(ServiceKind::Lightbulb).is_some());
        let device = f.api.created("C1").unwrap();
        assert_eq!(device.descriptor.name, "Lamp");
        assert_eq!(device.descriptor.ip_address, "10.0.0.5");
        assert_eq!(device.descriptor.model, "T1");
        // Already persisted by the host, so not registered again.
        assert_eq!(f.host.registered_count(), 0);
    }

    #[tokio::test]
    async fn test_restore_with_numeric_code_is_skipped() {
        let f = fixture();
        let accessory = cached(
            "Lamp",
            json!({"model": "T1011", "code": 42, "ipAddress": "10.0.0.5"}),
        );

        let err = f.registry.configure_from_cache(accessory).unwrap_err();
        assert!(matches!(err, Error::InvalidContext { .. }));
        assert!(f.registry.is_empty());
        assert!(f.api.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_missing_address_is_skipped() {
        let f = fixture();
        let accessory = cached("Lamp", json!({"model": "T1011", "code": "C1"}));

        assert!(f.registry.configure_from_cache(accessory).is_err());
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_connect_failure_removes_accessory() {
        let mut api = MockDeviceApi::default();
        api.unreachable.insert("D1".to_string());
        let f = fixture_with(api, false);

        f.registry.discover_and_add(f.device("T1011", "D1", "LIGHT_BULB")).unwrap();
        assert!(f.registry.contains("D1"));

        f.registry.wait_for_connections().await;

        assert!(!f.registry.contains("D1"));
        assert_eq!(f.host.unregistered_count(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_removes_cached_accessory() {
        let mut api = MockDeviceApi::default();
        api.unreachable.insert("C1".to_string());
        let f = fixture_with(api, false);
        let accessory = cached(
            "Lamp",
            json!({"model": "T1011", "code": "C1", "ipAddress": "10.0.0.5"}),
        );

        f.registry.configure_from_cache(accessory.clone()).unwrap();
        assert!(f.registry.contains("C1"));
        f.registry.wait_for_connections().await;

        assert!(f.registry.is_empty());
        let unregistered = f.host.unregistered.lock().unwrap();
        assert!(Arc::ptr_eq(&unregistered[0], &accessory));
    }

    #[tokio::test]
    async fn test_unsupported_cached_accessory_is_removed() {
        let f = fixture();
        f.api.set_device_type("V1", "ROBOT_VACUUM");
        let accessory = cached(
            "Vacuum",
            json!({"model": "RoboVac", "code": "V1", "ipAddress": "10.0.0.9"}),
        );

        let err = f.registry.configure_from_cache(accessory).unwrap_err();
        assert!(matches!(err, Error::UnsupportedDeviceType(_)));
        assert!(f.registry.is_empty());
        assert_eq!(f.host.unregistered_count(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_discovered_device_is_not_registered() {
        let f = fixture();

        assert!(f.registry.discover_and_add(f.device("RoboVac", "V1", "ROBOT_VACUUM")).is_err());
        assert!(f.registry.is_empty());
        assert_eq!(f.host.registered_count(), 0);
        assert_eq!(f.host.unregistered_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let f = fixture();
        f.registry.discover_and_add(f.device("T1401", "S1", "SWITCH")).unwrap();
        f.registry.wait_for_connections().await;
        let accessory = f.registry.get("S1").unwrap().accessory;

        assert!(f.registry.remove(&accessory));
        assert!(!f.registry.remove(&accessory));
        assert_eq!(f.host.unregistered_count(), 1);
        assert!(f.registry.is_empty());
    }

    #[tokio::test]
    async fn test_discovery_skips_cached_device() {
        let f = fixture();
        let accessory = cached(
            "Lamp",
            json!({"model": "T1011", "code": "C1", "ipAddress": "10.0.0.5"}),
        );
        f.registry.configure_from_cache(accessory.clone()).unwrap();

        assert!(!f.registry.discover_and_add(f.device("T1011", "C1", "LIGHT_BULB")).unwrap());
        f.registry.wait_for_connections().await;

        assert_eq!(f.registry.len(), 1);
        assert!(Arc::ptr_eq(&f.registry.get("C1").unwrap().accessory, &accessory));
        assert_eq!(f.host.registered_count(), 0);
    }

    #[tokio::test]
    async fn test_plugs_as_switches() {
        let f = fixture_with(MockDeviceApi::default(), true);
        f.registry.discover_and_add(f.device("T1201", "P1", "POWER_PLUG")).unwrap();

        let accessory = f.registry.get("P1").unwrap().accessory;
        assert_eq!(accessory.category(), Category::Switch);
        assert!(accessory.service(ServiceKind::Switch).is_some());
        assert!(accessory.service(ServiceKind::Outlet).is_none());
    }

    #[tokio::test]
    async fn test_duplicate_cached_accessory_is_unregistered() {
        let f = fixture();
        let context = json!({"model": "T1011", "code": "C1", "ipAddress": "10.0.0.5"});
        let first = cached("Lamp", context.clone());
        let second = cached("Lamp copy", context);

        f.registry.configure_from_cache(first.clone()).unwrap();
        f.registry.configure_from_cache(second.clone()).unwrap();
        f.registry.wait_for_connections().await;

        assert_eq!(f.registry.len(), 1);
        assert!(Arc::ptr_eq(&f.registry.get("C1").unwrap().accessory, &first));
        let unregistered = f.host.unregistered.lock().unwrap();
        assert_eq!(unregistered.len(), 1);
        assert!(Arc::ptr_eq(&unregistered[0], &second));
    }

    #[tokio::test]
    async fn test_finished_connections_are_reaped() {
        let f = fixture();
        for i in 0..5 {
            let code = format!("D{}", i);
            f.registry
                .discover_and_add(f.device("T1011", &code, "LIGHT_BULB"))
                .unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        f.registry
            .discover_and_add(f.device("T1011", "D5", "LIGHT_BULB"))
            .unwrap();

        assert_eq!(lock(&f.registry.connections).len(), 1);
        f.registry.wait_for_connections().await;
        assert_eq!(f.registry.len(), 6);
    }

    /// Host that reads back from the registry while creating accessories.
    struct ReentrantHost {
        inner: MockHost,
        registry: std::sync::OnceLock<std::sync::Weak<Registry>>,
        seen: Mutex<Vec<usize>>,
    }

    impl ReentrantHost {
        fn observe(&self) {
            if let Some(registry) = self.registry.get().and_then(|r| r.upgrade()) {
                self.seen.lock().unwrap().push(registry.len());
            }
        }
    }

    impl Host for ReentrantHost {
        fn register_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]) {
            self.observe();
            self.inner.register_accessories(plugin, platform, accessories);
        }

        fn unregister_accessories(&self, plugin: &str, platform: &str, accessories: &[Arc<Accessory>]) {
            self.inner.unregister_accessories(plugin, platform, accessories);
        }

        fn generate_uuid(&self, input: &str) -> String {
            self.observe();
            self.inner.generate_uuid(input)
        }

        fn create_accessory(&self, display_name: &str, uuid: &str) -> Arc<Accessory> {
            self.observe();
            self.inner.create_accessory(display_name, uuid)
        }
    }

    #[tokio::test]
    async fn test_host_may_call_back_into_registry() {
        let host = Arc::new(ReentrantHost {
            inner: MockHost::new(),
            registry: std::sync::OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        });
        let api = Arc::new(MockDeviceApi::default());
        let registry = Arc::new(Registry::new(host.clone(), api.clone(), false));
        host.registry.set(Arc::downgrade(&registry)).unwrap();

        let device = api.create_device("T1011", "D1", "10.0.0.7", "Lamp");
        assert!(registry.discover_and_add(device).unwrap());
        registry.wait_for_connections().await;

        assert_eq!(*host.seen.lock().unwrap(), vec![0, 0, 1]);
        assert_eq!(host.inner.registered_count(), 1);
    }
}
