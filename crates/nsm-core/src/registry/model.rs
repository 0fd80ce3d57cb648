//! Registry entity types (`spec.md` §3): `NetworkService` and
//! `NetworkServiceEndpoint`, keyed by `Name` and carrying an absolute
//! `ExpirationTime`.

use std::time::SystemTime;

use url::Url;

/// Common shape the refresh controller and registry store operate on
/// without caring which concrete entity type they're handling — replaces
/// the Go SDK's separately code-generated `NetworkService`/
/// `NetworkServiceEndpoint` client/server pairs with one generic surface.
pub trait RegistryEntry: Clone + Send + Sync + 'static {
    fn name(&self) -> &str;
    fn expiration(&self) -> SystemTime;
    fn set_expiration(&mut self, at: SystemTime);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkService {
    pub name: String,
    pub expiration: SystemTime,
}

impl RegistryEntry for NetworkService {
    fn name(&self) -> &str {
        &self.name
    }
    fn expiration(&self) -> SystemTime {
        self.expiration
    }
    fn set_expiration(&mut self, at: SystemTime) {
        self.expiration = at;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NetworkServiceEndpoint {
    pub name: String,
    pub url: Option<Url>,
    pub network_service_names: Vec<String>,
    pub network_service_manager_name: String,
    pub expiration: SystemTime,
}

impl RegistryEntry for NetworkServiceEndpoint {
    fn name(&self) -> &str {
        &self.name
    }
    fn expiration(&self) -> SystemTime {
        self.expiration
    }
    fn set_expiration(&mut self, at: SystemTime) {
        self.expiration = at;
    }
}

/// Epoch zero, used by `Unregister` to synthesize a deletion event
/// watchers can distinguish from an ordinary update (`spec.md` §4.E).
pub fn epoch_zero() -> SystemTime {
    SystemTime::UNIX_EPOCH
}
