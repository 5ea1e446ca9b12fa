//! API key persistence
//!
//! Keys live in the OS keyring (Keychain on macOS, Secret Service on Linux,
//! Windows Credential Manager on Windows) or, for throwaway sessions, in
//! process memory. [`Credentials`] loads both logical keys once at startup
//! and writes through to the backing store on every change.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use crate::config::{CredentialBackend, CredentialsConfig};
use crate::error::{MotiError, Result};

/// The two logical keys the application stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Key for the text-generation service
    Generation,
    /// Key for the tool-router service
    ToolRouter,
}

impl CredentialKind {
    /// Keyring account name for this key
    pub fn account(&self) -> &'static str {
        match self {
            Self::Generation => "generation_api_key",
            Self::ToolRouter => "tool_router_api_key",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generation => write!(f, "generation"),
            Self::ToolRouter => write!(f, "tool-router"),
        }
    }
}

impl From<crate::cli::ServiceArg> for CredentialKind {
    fn from(service: crate::cli::ServiceArg) -> Self {
        match service {
            crate::cli::ServiceArg::Generation => Self::Generation,
            crate::cli::ServiceArg::ToolRouter => Self::ToolRouter,
        }
    }
}

/// A process-durable string store keyed by [`CredentialKind`]
pub trait CredentialStore: Send + Sync {
    /// Reads a key; `Ok(None)` when nothing is stored
    fn get(&self, kind: CredentialKind) -> Result<Option<String>>;

    /// Stores a key, replacing any previous value
    fn set(&self, kind: CredentialKind, value: &str) -> Result<()>;

    /// Removes a key; a no-op when nothing is stored
    fn clear(&self, kind: CredentialKind) -> Result<()>;
}

/// Stateless accessor for the OS native keyring
///
/// # Examples
///
/// ```no_run
/// use moti::credentials::{CredentialKind, CredentialStore, KeyringStore};
///
/// let store = KeyringStore::new("moti");
/// store.set(CredentialKind::Generation, "sk-test").unwrap();
/// assert_eq!(store.get(CredentialKind::Generation).unwrap().as_deref(), Some("sk-test"));
/// ```
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates an accessor for the given keyring service name
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, kind: CredentialKind) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, kind.account())
            .map_err(|e| MotiError::Keyring(e).into())
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, kind: CredentialKind) -> Result<Option<String>> {
        match self.entry(kind)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(MotiError::Keyring(e).into()),
        }
    }

    fn set(&self, kind: CredentialKind, value: &str) -> Result<()> {
        self.entry(kind)?
            .set_password(value)
            .map_err(MotiError::Keyring)?;
        Ok(())
    }

    fn clear(&self, kind: CredentialKind) -> Result<()> {
        match self.entry(kind)?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(MotiError::Keyring(e).into()),
        }
    }
}

/// In-memory store; keys do not survive the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<CredentialKind, String>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with one key
    pub fn with_key(kind: CredentialKind, value: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.lock() {
            values.insert(kind, value.into());
        }
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<CredentialKind, String>>> {
        self.values
            .lock()
            .map_err(|_| MotiError::CredentialStore("memory store lock poisoned".to_string()).into())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, kind: CredentialKind) -> Result<Option<String>> {
        Ok(self.lock()?.get(&kind).cloned())
    }

    fn set(&self, kind: CredentialKind, value: &str) -> Result<()> {
        self.lock()?.insert(kind, value.to_string());
        Ok(())
    }

    fn clear(&self, kind: CredentialKind) -> Result<()> {
        self.lock()?.remove(&kind);
        Ok(())
    }
}

/// Builds the store selected by configuration
pub fn create_store(config: &CredentialsConfig) -> Arc<dyn CredentialStore> {
    match config.backend {
        CredentialBackend::Keyring => Arc::new(KeyringStore::new(&config.keyring_service)),
        CredentialBackend::Memory => Arc::new(MemoryStore::new()),
    }
}

/// Cached view of both keys, backed by a [`CredentialStore`]
///
/// Blank keys are treated as absent. The cache is the source of truth for
/// the session; store writes that fail are logged and do not roll back the
/// cached value.
pub struct Credentials {
    store: Arc<dyn CredentialStore>,
    generation: RwLock<Option<String>>,
    tool_router: RwLock<Option<String>>,
}

impl Credentials {
    /// Reads both keys from the store
    ///
    /// A store read failure is logged and treated as "no key" so the coach
    /// still starts and can ask for one.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use moti::credentials::{CredentialKind, Credentials, MemoryStore};
    ///
    /// let store = Arc::new(MemoryStore::with_key(CredentialKind::Generation, "sk-test"));
    /// let credentials = Credentials::load(store);
    /// assert_eq!(credentials.get(CredentialKind::Generation).as_deref(), Some("sk-test"));
    /// assert!(credentials.get(CredentialKind::ToolRouter).is_none());
    /// ```
    pub fn load(store: Arc<dyn CredentialStore>) -> Self {
        let read = |kind: CredentialKind| match store.get(kind) {
            Ok(value) => normalize(value),
            Err(e) => {
                tracing::warn!("Failed to read {} key from credential store: {}", kind, e);
                None
            }
        };
        let generation = read(CredentialKind::Generation);
        let tool_router = read(CredentialKind::ToolRouter);

        tracing::debug!(
            "Loaded credentials: generation={}, tool_router={}",
            generation.is_some(),
            tool_router.is_some()
        );

        Self {
            store,
            generation: RwLock::new(generation),
            tool_router: RwLock::new(tool_router),
        }
    }

    fn slot(&self, kind: CredentialKind) -> &RwLock<Option<String>> {
        match kind {
            CredentialKind::Generation => &self.generation,
            CredentialKind::ToolRouter => &self.tool_router,
        }
    }

    /// Current key, if one is configured
    pub fn get(&self, kind: CredentialKind) -> Option<String> {
        self.slot(kind)
            .read()
            .map(|value| value.clone())
            .unwrap_or_default()
    }

    /// Whether a key is configured
    pub fn has(&self, kind: CredentialKind) -> bool {
        self.get(kind).is_some()
    }

    /// Replaces a key and persists it
    ///
    /// # Errors
    ///
    /// Returns [`MotiError::Config`] for a blank key, or the store error if
    /// persisting fails (the key is still active for this session)
    pub fn set(&self, kind: CredentialKind, value: &str) -> Result<()> {
        let value = normalize(Some(value.to_string())).ok_or_else(|| {
            MotiError::Config(format!("{} API key cannot be empty", kind))
        })?;

        if let Ok(mut slot) = self.slot(kind).write() {
            *slot = Some(value.clone());
        }
        tracing::info!("Stored {} API key", kind);
        self.store.set(kind, &value)
    }

    /// Forgets a key and removes it from the store
    ///
    /// # Errors
    ///
    /// Returns the store error if removal fails (the key is still forgotten
    /// for this session)
    pub fn clear(&self, kind: CredentialKind) -> Result<()> {
        if let Ok(mut slot) = self.slot(kind).write() {
            *slot = None;
        }
        tracing::info!("Cleared {} API key", kind);
        self.store.clear(kind)
    }

    /// Forgets a key only if it is still `rejected`
    ///
    /// A key replaced since `rejected` was read is left alone, in the cache
    /// and in the store. Returns whether the key was cleared.
    ///
    /// # Errors
    ///
    /// Returns the store error if removal fails (the key is still forgotten
    /// for this session)
    pub fn clear_if(&self, kind: CredentialKind, rejected: &str) -> Result<bool> {
        {
            let Ok(mut slot) = self.slot(kind).write() else {
                return Ok(false);
            };
            if slot.as_deref() != Some(rejected) {
                tracing::debug!("{} API key was replaced; keeping the new one", kind);
                return Ok(false);
            }
            *slot = None;
        }
        tracing::info!("Cleared {} API key", kind);
        self.store.clear(kind)?;
        Ok(true)
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
