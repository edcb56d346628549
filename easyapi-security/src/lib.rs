//! Header-credential authentication and per-algorithm access control.
//!
//! A caller identifies itself with an id/key pair carried in the
//! `easyapi-id` and `easyapi-key` headers. Credentials map an id to a secret
//! key and an access set of algorithm ids, where the entry `"*"` grants
//! everything. The file-backed store re-reads its file before every check,
//! so key rotations take effect immediately.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default length of generated access ids.
pub const DEFAULT_ID_LEN: usize = 12;

#[derive(Debug)]
pub enum AuthError {
    Io(String),
    Parse(String),
    NotFound(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Io(msg) => write!(f, "credential store I/O error: {msg}"),
            AuthError::Parse(msg) => write!(f, "credential store parse error: {msg}"),
            AuthError::NotFound(id) => write!(f, "credential '{id}' not found"),
        }
    }
}

impl std::error::Error for AuthError {}

/// One caller's credential: secret key plus the set of algorithm ids it may
/// use (`"*"` grants all).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub key: String,
    #[serde(default)]
    pub access: Vec<String>,
}

impl Credential {
    pub fn allows(&self, entry: &str) -> bool {
        self.access.iter().any(|a| a == "*" || a == entry)
    }

    pub fn allows_all(&self) -> bool {
        self.access.iter().any(|a| a == "*")
    }
}

enum Backend {
    Memory(RwLock<HashMap<String, Credential>>),
    File(PathBuf),
}

pub struct Authenticator {
    backend: Backend,
}

impl Authenticator {
    /// Store credentials in process memory (seeded from configuration).
    pub fn in_memory(credentials: HashMap<String, Credential>) -> Self {
        Authenticator {
            backend: Backend::Memory(RwLock::new(credentials)),
        }
    }

    /// Back the store with a JSON file of `id -> {key, access}` records.
    /// The file is parsed once up front to fail fast on malformed stores,
    /// then re-read before each subsequent lookup.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        load_file(&path)?;
        Ok(Authenticator {
            backend: Backend::File(path),
        })
    }

    fn credentials(&self) -> HashMap<String, Credential> {
        match &self.backend {
            Backend::Memory(store) => store.read().unwrap().clone(),
            Backend::File(path) => match load_file(path) {
                Ok(credentials) => credentials,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "credential store unreadable");
                    HashMap::new()
                }
            },
        }
    }

    pub fn len(&self) -> usize {
        self.credentials().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check an id/key pair.
    pub fn authenticate(&self, id: &str, key: &str) -> bool {
        self.credentials()
            .get(id)
            .is_some_and(|credential| credential.key == key)
    }

    /// Whether `id` may invoke `entry`.
    pub fn allows(&self, id: &str, entry: &str) -> bool {
        self.credentials()
            .get(id)
            .is_some_and(|credential| credential.allows(entry))
    }

    /// Restrict `entries` to those the caller may see.
    pub fn access_filter(&self, id: &str, entries: Vec<String>) -> Vec<String> {
        match self.credentials().get(id) {
            None => Vec::new(),
            Some(credential) if credential.allows_all() => entries,
            Some(credential) => entries
                .into_iter()
                .filter(|entry| credential.allows(entry))
                .collect(),
        }
    }

    /// Create a credential: a random alphanumeric id of `id_len` characters
    /// and a UUIDv4 key. File-backed stores persist immediately.
    pub fn create(&self, id_len: usize, access: Vec<String>) -> Result<(String, String), AuthError> {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(id_len)
            .map(char::from)
            .collect();
        let key = Uuid::new_v4().to_string();
        let credential = Credential {
            key: key.clone(),
            access,
        };
        match &self.backend {
            Backend::Memory(store) => {
                store.write().unwrap().insert(id.clone(), credential);
            }
            Backend::File(path) => {
                let mut credentials = load_file(path)?;
                credentials.insert(id.clone(), credential);
                save_file(path, &credentials)?;
            }
        }
        Ok((id, key))
    }

    /// Delete a credential. File-backed stores persist immediately.
    pub fn remove(&self, id: &str) -> Result<(), AuthError> {
        match &self.backend {
            Backend::Memory(store) => store
                .write()
                .unwrap()
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| AuthError::NotFound(id.to_string())),
            Backend::File(path) => {
                let mut credentials = load_file(path)?;
                credentials
                    .remove(id)
                    .ok_or_else(|| AuthError::NotFound(id.to_string()))?;
                save_file(path, &credentials)
            }
        }
    }
}

fn load_file(path: &Path) -> Result<HashMap<String, Credential>, AuthError> {
    let text = std::fs::read_to_string(path).map_err(|e| AuthError::Io(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| AuthError::Parse(e.to_string()))
}

fn save_file(path: &Path, credentials: &HashMap<String, Credential>) -> Result<(), AuthError> {
    let text = serde_json::to_string_pretty(credentials).map_err(|e| AuthError::Parse(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| AuthError::Io(e.to_string()))
}
