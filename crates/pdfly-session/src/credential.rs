//! Credential persistence
//!
//! The bearer token lives in exactly one place per client. Browsers keep it in
//! a cookie; native callers use [`FileCredentialStore`], which stores the same
//! value with the same lifetime. Only [`crate::SessionManager`] writes to a
//! store.

use crate::config::ClientConfig;
use crate::error::SessionError;
use chrono::{DateTime, Duration, Utc};
use pdfly_types::{TOKEN_COOKIE, TOKEN_LIFETIME_SECS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

pub trait CredentialStore: Send + Sync {
    /// Current credential, `None` when absent or expired
    fn get(&self) -> Result<Option<String>, SessionError>;
    fn set(&self, token: &str) -> Result<(), SessionError>;
    /// Removing an absent credential is not an error
    fn remove(&self) -> Result<(), SessionError>;
}

/// Attributes of the credential cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub name: String,
    pub path: String,
    pub secure: bool,
    pub max_age_secs: u64,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            name: TOKEN_COOKIE.to_string(),
            path: "/".to_string(),
            secure: false,
            max_age_secs: TOKEN_LIFETIME_SECS,
        }
    }
}

impl CookieAttributes {
    pub fn for_config(config: &ClientConfig) -> Self {
        Self {
            secure: config.production,
            ..Self::default()
        }
    }

    /// `Set-Cookie` value storing `token`
    pub fn set_cookie(&self, token: &str) -> String {
        self.render(token, self.max_age_secs)
    }

    /// `Set-Cookie` value that deletes the credential
    pub fn expire_cookie(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; SameSite=Strict; Max-Age={}",
            self.name, value, self.path, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn lifetime(&self) -> Duration {
        Duration::seconds(self.max_age_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    value: String,
    expires_at: DateTime<Utc>,
}

impl StoredCredential {
    fn new(value: &str, attributes: &CookieAttributes) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + attributes.lifetime(),
        }
    }

    fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// In-process cookie jar
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    attributes: CookieAttributes,
    slot: Mutex<Option<StoredCredential>>,
    last_header: Mutex<Option<String>>,
}

impl MemoryCookieJar {
    pub fn new(attributes: CookieAttributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// The `Set-Cookie` value produced by the most recent write
    pub fn last_set_cookie(&self) -> Option<String> {
        self.last_header
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn record(&self, header: String) {
        *self.last_header.lock().unwrap_or_else(|e| e.into_inner()) = Some(header);
    }
}

impl CredentialStore for MemoryCookieJar {
    fn get(&self) -> Result<Option<String>, SessionError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        Ok(slot
            .as_ref()
            .filter(|c| c.is_live())
            .map(|c| c.value.clone()))
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(StoredCredential::new(token, &self.attributes));
        self.record(self.attributes.set_cookie(token));
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.record(self.attributes.expire_cookie());
        Ok(())
    }
}

/// Credential kept in a JSON file, readable only by the owner on unix
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    attributes: CookieAttributes,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>, attributes: CookieAttributes) -> Self {
        Self {
            path: path.into(),
            attributes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<StoredCredential>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>, SessionError> {
        match self.read()? {
            Some(stored) if stored.is_live() => Ok(Some(stored.value)),
            Some(_) => {
                debug!(path = %self.path.display(), "stored credential past max-age");
                self.remove()?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, token: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredCredential::new(token, &self.attributes);
        std::fs::write(&self.path, serde_json::to_vec(&stored)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cookie_attributes() {
        let attrs = CookieAttributes::default();
        assert_eq!(
            attrs.set_cookie("abc"),
            "token=abc; Path=/; SameSite=Strict; Max-Age=2592000"
        );
        assert_eq!(
            attrs.expire_cookie(),
            "token=; Path=/; SameSite=Strict; Max-Age=0"
        );
    }

    #[test]
    fn test_production_cookie_is_secure() {
        let config = ClientConfig {
            production: true,
            ..ClientConfig::default()
        };
        assert!(CookieAttributes::for_config(&config)
            .set_cookie("abc")
            .ends_with("; Secure"));
    }

    #[test]
    fn test_memory_jar_roundtrip() {
        let jar = MemoryCookieJar::new(CookieAttributes::default());
        assert_eq!(jar.get().unwrap(), None);
        jar.set("abc").unwrap();
        assert_eq!(jar.get().unwrap().as_deref(), Some("abc"));
        jar.remove().unwrap();
        assert_eq!(jar.get().unwrap(), None);
        assert!(jar.last_set_cookie().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_zero_max_age_is_never_live() {
        let jar = MemoryCookieJar::new(CookieAttributes {
            max_age_secs: 0,
            ..CookieAttributes::default()
        });
        jar.set("abc").unwrap();
        assert_eq!(jar.get().unwrap(), None);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(
            dir.path().join("nested").join("token.json"),
            CookieAttributes::default(),
        );
        assert_eq!(store.get().unwrap(), None);
        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("abc"));
        store.remove().unwrap();
        store.remove().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store =
            FileCredentialStore::new(dir.path().join("token.json"), CookieAttributes::default());
        store.set("abc").unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_discards_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(
            dir.path().join("token.json"),
            CookieAttributes {
                max_age_secs: 0,
                ..CookieAttributes::default()
            },
        );
        store.set("abc").unwrap();
        assert_eq!(store.get().unwrap(), None);
        assert!(!store.path().exists());
    }
}
