//! Session persistence.
//!
//! A [`Session`] is the access/refresh token pair. It is persisted through a
//! [`TokenStore`] so it survives restarts, and cached in a [`SessionStore`] so the
//! token can be read before every request without touching the disk.

use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: Some(access.into()),
            refresh_token: Some(refresh.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Durable key-value storage for the session.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Session, ClientError>;
    fn save(&self, session: &Session) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Keeps the session in memory only. Used by tests and one-off scripts.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Session>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            inner: Mutex::new(session),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Session, ClientError> {
        Ok(self.inner.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = Session::default();
        Ok(())
    }
}

/// Stores the session as a small JSON document:
///
/// ```json
/// { "access_token": "...", "refresh_token": "..." }
/// ```
///
/// A missing file means "not logged in". Clearing deletes the file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, action: &str, err: impl std::fmt::Display) -> ClientError {
        ClientError::Storage(format!("failed to {action} {}: {err}", self.path.display()))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Session, ClientError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => return Err(self.storage_err("read", e)),
        };
        serde_json::from_str(&raw).map_err(|e| self.storage_err("parse", e))
    }

    fn save(&self, session: &Session) -> Result<(), ClientError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.storage_err("create directory for", e))?;
        }
        let raw = serde_json::to_string_pretty(session).map_err(|e| self.storage_err("encode", e))?;

        // Write-then-rename so a crash never leaves a truncated session behind.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).map_err(|e| self.storage_err("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.storage_err("replace", e))
    }

    fn clear(&self) -> Result<(), ClientError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.storage_err("remove", e)),
        }
    }
}

/// Write-through cache over a [`TokenStore`].
///
/// Reads never hit the backing store. Writers are login, logout and the refresh
/// path; each write goes to the backing store first and only then becomes visible.
pub struct SessionStore {
    backend: Box<dyn TokenStore>,
    current: RwLock<Session>,
}

impl SessionStore {
    /// Loads the persisted session once.
    pub fn open(backend: Box<dyn TokenStore>) -> Result<Self, ClientError> {
        let current = backend.load()?;
        Ok(Self {
            backend,
            current: RwLock::new(current),
        })
    }

    pub fn snapshot(&self) -> Session {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .refresh_token
            .clone()
    }

    pub fn replace(&self, session: Session) -> Result<(), ClientError> {
        self.backend.save(&session)?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
        Ok(())
    }

    /// Stores a refreshed access token; a rotated refresh token replaces the old one.
    pub fn store_refreshed(&self, access: String, refresh: Option<String>) -> Result<(), ClientError> {
        let mut next = self.snapshot();
        next.access_token = Some(access);
        if let Some(refresh) = refresh {
            next.refresh_token = Some(refresh);
        }
        self.replace(next)
    }

    /// Drops both tokens. The in-memory copy is cleared even if the backing store
    /// cannot be, so a failed delete never leaves the client authenticated.
    pub fn clear(&self) -> Result<(), ClientError> {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Session::default();
        self.backend.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_empty());

        store.save(&Session::new("a1", "r1")).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"access_token\": \"a1\""));
        assert_eq!(store.load().unwrap(), Session::new("a1", "r1"));

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileTokenStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
    }

    #[test]
    fn refreshed_token_keeps_refresh_unless_rotated() {
        let store =
            SessionStore::open(Box::new(MemoryTokenStore::with_session(Session::new("a1", "r1"))))
                .unwrap();

        store.store_refreshed("a2".into(), None).unwrap();
        assert_eq!(store.snapshot(), Session::new("a2", "r1"));

        store.store_refreshed("a3".into(), Some("r2".into())).unwrap();
        assert_eq!(store.snapshot(), Session::new("a3", "r2"));

        store.clear().unwrap();
        assert!(store.snapshot().is_empty());
    }
}
