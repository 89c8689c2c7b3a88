use std::sync::Arc;

use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::Config;
use crate::config::PlatformConfig;
use crate::device::DeviceApi;
use crate::engine::Registry;
use crate::error::Error;
use crate::error::Result;
use crate::hap::Accessory;
use crate::hap::Host;

/// Entry point the host drives.
///
/// The host hands back each cached accessory through
/// [`Platform::configure_accessory`], then signals readiness through
/// [`Platform::did_finish_launching`], after which new devices are discovered
/// and registered.
pub struct Platform {
    config: PlatformConfig,
    api: Arc<dyn DeviceApi>,
    registry: Arc<Registry>,
}

impl Platform {
    pub fn new(config: PlatformConfig, host: Arc<dyn Host>, api: Arc<dyn DeviceApi>) -> Self {
        debug!("Eufy initializing");
        let registry = Arc::new(Registry::new(
            host,
            api.clone(),
            config.show_plugs_as_switches,
        ));
        Self {
            config,
            api,
            registry,
        }
    }

    /// Build a platform from a loaded configuration file.
    ///
    /// Fails if the account credentials are missing.
    pub fn from_config(config: &Config, host: Arc<dyn Host>, api: Arc<dyn DeviceApi>) -> Result<Self> {
        let platform_config = config
            .platform_config()
            .inspect_err(|e| error!("{}", e))?;
        Ok(Self::new(platform_config, host, api))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Host callback for each accessory restored from its cache.
    ///
    /// Failures are logged by the registry and leave the platform running.
    /// May run before any tokio runtime exists; the device connect is then
    /// deferred to [`Platform::did_finish_launching`].
    pub fn configure_accessory(&self, accessory: Arc<Accessory>) {
        if let Err(e) = self.registry.configure_from_cache(accessory) {
            debug!("Cached accessory not restored: {}", e);
        }
    }

    /// Host "ready" signal: discover the account's devices and add new ones.
    ///
    /// Returns the number of accessories added.
    pub async fn did_finish_launching(&self) -> Result<usize> {
        self.registry.start_pending_connections();

        let descriptors = self
            .api
            .load_devices(&self.config.email, &self.config.password)
            .await
            .map_err(Error::Discovery)
            .inspect_err(|e| error!("{}", e))?;

        info!("Discovered {} device(s)", descriptors.len());

        let mut added = 0;
        for descriptor in &descriptors {
            let device = self.api.create_device(
                &descriptor.model,
                &descriptor.code,
                &descriptor.ip_address,
                &descriptor.name,
            );
            match self.registry.discover_and_add(device) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => debug!("Device {} not added: {}", descriptor.code, e),
            }
        }

        info!("Added {} new accessory(s)", added);
        Ok(added)
    }
}
