//! Hidden-service model shared between host and orchestrator.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::key::CryptoKey;

/// One `service port -> local target` mapping of a hidden service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Port exposed on the onion side.
    pub service_port: u16,
    /// Host the traffic is relayed to.
    pub target_address: String,
    /// Port the traffic is relayed to.
    pub target_port: u16,
}

/// Publication state of a hidden service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Not (yet) acknowledged by Tor.
    Offline,
    /// Tor acknowledged the publication.
    Online,
}

#[derive(Debug)]
struct ServiceInner {
    key: Option<CryptoKey>,
    service_id: String,
    data_dir: Option<PathBuf>,
    targets: Vec<Target>,
    status: ServiceStatus,
}

/// A hidden service registered with the control client.
///
/// Handles are cheap to clone and share state, so host and orchestrator can
/// both hold one. Create it either with a loaded key (republishing) or
/// without one, in which case Tor generates a key on publication and hands
/// it back.
#[derive(Debug, Clone)]
pub struct HiddenService {
    inner: Arc<Mutex<ServiceInner>>,
}

impl HiddenService {
    fn with_inner(inner: ServiceInner) -> Self {
        HiddenService {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// A service that asks Tor to create a fresh key on publication.
    pub fn create_new() -> Self {
        Self::with_inner(ServiceInner {
            key: None,
            service_id: String::new(),
            data_dir: None,
            targets: Vec::new(),
            status: ServiceStatus::Offline,
        })
    }

    /// A service republished from previously saved key material.
    pub fn from_key(key: CryptoKey) -> Self {
        Self::with_inner(ServiceInner {
            key: Some(key),
            service_id: String::new(),
            data_dir: None,
            targets: Vec::new(),
            status: ServiceStatus::Offline,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ServiceInner> {
        self.inner.lock().expect("hidden service lock poisoned")
    }

    /// Set the on-disk service directory (v2 legacy, file-based keys).
    pub fn set_data_dir(&self, dir: impl Into<PathBuf>) {
        self.lock().data_dir = Some(dir.into());
    }

    /// Add a port mapping.
    pub fn add_target(&self, target: Target) {
        self.lock().targets.push(target);
    }

    /// Convenience for [`add_target`](Self::add_target).
    pub fn add_port(&self, service_port: u16, target_address: impl Into<String>, target_port: u16) {
        self.add_target(Target {
            service_port,
            target_address: target_address.into(),
            target_port,
        });
    }

    /// Set the service id, e.g. when the host read the `hostname` file of a
    /// legacy file-based service.
    pub fn set_service_id(&self, service_id: impl Into<String>) {
        let mut id = service_id.into();
        if let Some(stripped) = id.strip_suffix(".onion") {
            id = stripped.to_string();
        }
        self.lock().service_id = id;
    }

    /// The service id, once known.
    pub fn service_id(&self) -> Option<String> {
        let inner = self.lock();
        if inner.service_id.is_empty() {
            None
        } else {
            Some(inner.service_id.clone())
        }
    }

    /// The `.onion` hostname, once the service id is known.
    pub fn hostname(&self) -> Option<String> {
        self.service_id().map(|id| format!("{id}.onion"))
    }

    /// The private key, when loaded or received from Tor.
    pub fn key(&self) -> Option<CryptoKey> {
        self.lock().key.clone()
    }

    /// The on-disk service directory, when configured.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.lock().data_dir.clone()
    }

    /// All configured port mappings.
    pub fn targets(&self) -> Vec<Target> {
        self.lock().targets.clone()
    }

    /// Current publication state.
    pub fn status(&self) -> ServiceStatus {
        self.lock().status
    }

    /// Whether Tor has acknowledged the publication.
    pub fn is_online(&self) -> bool {
        self.status() == ServiceStatus::Online
    }

    pub(crate) fn set_key(&self, key: CryptoKey) {
        self.lock().key = Some(key);
    }

    pub(crate) fn mark_online(&self) {
        self.lock().status = ServiceStatus::Online;
    }

    pub(crate) fn mark_offline(&self) {
        self.lock().status = ServiceStatus::Offline;
    }

    pub(crate) fn ptr_eq(&self, other: &HiddenService) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyType;

    #[test]
    fn new_service_starts_offline_without_identity() {
        let service = HiddenService::create_new();
        assert_eq!(service.status(), ServiceStatus::Offline);
        assert_eq!(service.service_id(), None);
        assert_eq!(service.hostname(), None);
        assert!(service.key().is_none());
    }

    #[test]
    fn clones_share_state() {
        let service = HiddenService::create_new();
        let other = service.clone();

        other.add_port(80, "127.0.0.1", 8080);
        other.set_service_id("abcdefghijklmnop");

        assert_eq!(service.targets().len(), 1);
        assert_eq!(service.hostname().as_deref(), Some("abcdefghijklmnop.onion"));
        assert!(service.ptr_eq(&other));
    }

    #[test]
    fn onion_suffix_is_stripped_from_ids() {
        let service = HiddenService::create_new();
        service.set_service_id("abcdefghijklmnop.onion");
        assert_eq!(service.service_id().as_deref(), Some("abcdefghijklmnop"));
    }

    #[test]
    fn key_loaded_service_keeps_it() {
        let key = CryptoKey::new(KeyType::Ed25519V3, "AAAA").unwrap();
        let service = HiddenService::from_key(key.clone());
        assert_eq!(service.key(), Some(key));
    }

    #[test]
    fn online_transition() {
        let service = HiddenService::create_new();
        service.set_service_id("abcdefghijklmnop");
        service.mark_online();
        assert!(service.is_online());
        service.mark_offline();
        assert!(!service.is_online());
    }
}
