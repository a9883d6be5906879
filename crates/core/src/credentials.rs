//! Session credential held in memory and mirrored to a durable slot.

use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Name of the durable slot holding the session token.
pub const SESSION_TOKEN_KEY: &str = "sessionToken";

/// Durable key-value slot for the opaque session token.
pub trait CredentialStorage: Send + Sync {
    /// Read the stored token, if any.
    fn load(&self) -> io::Result<Option<String>>;
    /// Replace the stored token.
    fn store(&self, token: &str) -> io::Result<()>;
    /// Remove the stored token. Clearing an empty slot is not an error.
    fn clear(&self) -> io::Result<()>;
}

impl<S: CredentialStorage + ?Sized> CredentialStorage for Arc<S> {
    fn load(&self) -> io::Result<Option<String>> {
        (**self).load()
    }

    fn store(&self, token: &str) -> io::Result<()> {
        (**self).store(token)
    }

    fn clear(&self) -> io::Result<()> {
        (**self).clear()
    }
}

/// Token stored as plain text in a single file named [`SESSION_TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct FileCredentialStorage {
    path: PathBuf,
}

impl FileCredentialStorage {
    /// Slot inside `dir`; the directory is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_TOKEN_KEY),
        }
    }

    /// Location of the token file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStorage for FileCredentialStorage {
    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn store(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Volatile slot, used when nothing should outlive the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryCredentialStorage {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated slot, as if a previous process had logged in.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn store(&self, token: &str) -> io::Result<()> {
        *self.slot.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.slot.lock() = None;
        Ok(())
    }
}

/// Owner of the current session credential.
///
/// The durable slot is read exactly once, in [`CredentialStore::restore`].
/// Token contents are never validated locally.
pub struct CredentialStore {
    token: RwLock<Option<String>>,
    storage: Box<dyn CredentialStorage>,
}

impl CredentialStore {
    /// Restore the credential saved by a previous process, if any.
    pub fn restore(storage: impl CredentialStorage + 'static) -> Self {
        let token = match storage.load() {
            Ok(token) => token,
            Err(err) => {
                warn!("Failed to read stored session token: {err}");
                None
            }
        };
        if token.is_some() {
            info!("Restored session token from storage");
        }

        Self {
            token: RwLock::new(token),
            storage: Box::new(storage),
        }
    }

    /// Store with no durable backing.
    pub fn in_memory() -> Self {
        Self::restore(MemoryCredentialStorage::new())
    }

    /// Current credential, if any.
    pub fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Whether a credential is held.
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Replace the credential in durable storage, then in memory.
    ///
    /// If the durable write fails the in-memory credential is left unchanged.
    pub fn set(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        let mut current = self.token.write();
        self.storage.store(&token).map_err(Error::Credential)?;
        *current = Some(token);
        Ok(())
    }

    /// Forget the credential in memory and in durable storage.
    pub fn clear(&self) -> Result<()> {
        *self.token.write() = None;
        self.storage.clear().map_err(Error::Credential)
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
