use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;
use serde_json::Value;

use super::types::Category;
use super::types::CharacteristicKind;
use super::types::ServiceKind;
use crate::error::Result;

/// Serves host GET and SET events for one characteristic.
#[async_trait]
pub trait CharacteristicHandler: Send + Sync {
    async fn get(&self) -> Result<Value>;

    async fn set(&self, value: Value) -> Result<()>;
}

/// Runs when the host asks an accessory to identify itself.
#[async_trait]
pub trait IdentifyHandler: Send + Sync {
    async fn identify(&self) -> Result<()>;
}

/// Bookkeeping behind these mutexes is never left half-updated, so a poisoned
/// lock is still safe to use.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A single readable/writable property of a service.
pub struct Characteristic {
    kind: CharacteristicKind,
    value: Mutex<Value>,
    handler: Mutex<Option<Arc<dyn CharacteristicHandler>>>,
}

impl Characteristic {
    pub fn new(kind: CharacteristicKind) -> Self {
        Self {
            kind,
            value: Mutex::new(Value::Null),
            handler: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> CharacteristicKind {
        self.kind
    }

    /// Last value stored or served.
    pub fn value(&self) -> Value {
        lock(&self.value).clone()
    }

    pub fn update_value(&self, value: Value) {
        *lock(&self.value) = value;
    }

    /// Install the GET/SET handler, replacing any previous one.
    pub fn set_handler(&self, handler: Arc<dyn CharacteristicHandler>) {
        *lock(&self.handler) = Some(handler);
    }

    pub fn has_handler(&self) -> bool {
        lock(&self.handler).is_some()
    }

    fn handler(&self) -> Option<Arc<dyn CharacteristicHandler>> {
        lock(&self.handler).clone()
    }

    /// Host GET. Without a handler the stored value is returned.
    pub async fn get(&self) -> Result<Value> {
        match self.handler() {
            Some(handler) => {
                let value = handler.get().await?;
                self.update_value(value.clone());
                Ok(value)
            }
            None => Ok(self.value()),
        }
    }

    /// Host SET. Without a handler the value is only stored.
    pub async fn set(&self, value: Value) -> Result<()> {
        if let Some(handler) = self.handler() {
            handler.set(value.clone()).await?;
        }
        self.update_value(value);
        Ok(())
    }
}

impl std::fmt::Debug for Characteristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Characteristic")
            .field("kind", &self.kind)
            .field("value", &self.value())
            .field("handler", &self.has_handler())
            .finish()
    }
}

/// A bundle of characteristics with one functional role.
#[derive(Debug)]
pub struct Service {
    kind: ServiceKind,
    characteristics: Mutex<Vec<Arc<Characteristic>>>,
}

impl Service {
    pub fn new(kind: ServiceKind) -> Self {
        Self {
            kind,
            characteristics: Mutex::new(Vec::new()),
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn characteristic(&self, kind: CharacteristicKind) -> Option<Arc<Characteristic>> {
        lock(&self.characteristics)
            .iter()
            .find(|c| c.kind() == kind)
            .cloned()
    }

    pub fn add_characteristic(&self, kind: CharacteristicKind) -> Arc<Characteristic> {
        let characteristic = Arc::new(Characteristic::new(kind));
        lock(&self.characteristics).push(characteristic.clone());
        characteristic
    }

    pub fn get_or_add_characteristic(&self, kind: CharacteristicKind) -> Arc<Characteristic> {
        let mut characteristics = lock(&self.characteristics);
        if let Some(existing) = characteristics.iter().find(|c| c.kind() == kind) {
            return existing.clone();
        }
        let characteristic = Arc::new(Characteristic::new(kind));
        characteristics.push(characteristic.clone());
        characteristic
    }

    /// Store a static value, adding the characteristic if needed.
    pub fn set_characteristic(&self, kind: CharacteristicKind, value: impl Into<Value>) -> &Self {
        self.get_or_add_characteristic(kind).update_value(value.into());
        self
    }

    pub fn characteristic_kinds(&self) -> Vec<CharacteristicKind> {
        lock(&self.characteristics).iter().map(|c| c.kind()).collect()
    }
}

struct AccessoryState {
    category: Category,
    context: Value,
    services: Vec<Arc<Service>>,
    identify: Option<Arc<dyn IdentifyHandler>>,
}

/// An accessory as the host sees it.
///
/// Shared between the host and the bridge; all mutation goes through short
/// critical sections so handles can be cloned freely.
pub struct Accessory {
    uuid: String,
    display_name: String,
    state: Mutex<AccessoryState>,
}

impl Accessory {
    /// Create an accessory carrying only the information service.
    pub fn new(display_name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            display_name: display_name.into(),
            state: Mutex::new(AccessoryState {
                category: Category::default(),
                context: Value::Object(Default::default()),
                services: vec![Arc::new(Service::new(ServiceKind::AccessoryInformation))],
                identify: None,
            }),
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn category(&self) -> Category {
        lock(&self.state).category
    }

    pub fn set_category(&self, category: Category) {
        lock(&self.state).category = category;
    }

    /// Persisted context blob.
    pub fn context(&self) -> Value {
        lock(&self.state).context.clone()
    }

    pub fn set_context(&self, context: Value) {
        lock(&self.state).context = context;
    }

    pub fn service(&self, kind: ServiceKind) -> Option<Arc<Service>> {
        lock(&self.state)
            .services
            .iter()
            .find(|s| s.kind() == kind)
            .cloned()
    }

    pub fn add_service(&self, kind: ServiceKind) -> Arc<Service> {
        let service = Arc::new(Service::new(kind));
        lock(&self.state).services.push(service.clone());
        service
    }

    pub fn get_or_add_service(&self, kind: ServiceKind) -> Arc<Service> {
        let mut state = lock(&self.state);
        if let Some(existing) = state.services.iter().find(|s| s.kind() == kind) {
            return existing.clone();
        }
        let service = Arc::new(Service::new(kind));
        state.services.push(service.clone());
        service
    }

    pub fn service_kinds(&self) -> Vec<ServiceKind> {
        lock(&self.state).services.iter().map(|s| s.kind()).collect()
    }

    pub fn set_identify_handler(&self, handler: Arc<dyn IdentifyHandler>) {
        lock(&self.state).identify = Some(handler);
    }

    /// Host identify event. Resolves once the handler finishes.
    pub async fn identify(&self) -> Result<()> {
        let handler = lock(&self.state).identify.clone();
        match handler {
            Some(handler) => handler.identify().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Accessory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessory")
            .field("uuid", &self.uuid)
            .field("display_name", &self.display_name)
            .field("category", &self.category())
            .field("services", &self.service_kinds())
            .finish_non_exhaustive()
    }
}
