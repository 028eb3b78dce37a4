//! Application constants and client configuration.
//!
//! Base URLs are resolved exactly once, when a `ClientConfig` is built:
//! explicit override, then the override persisted in local storage,
//! then the built-in default. Nothing downstream reads ambient globals.

use std::path::PathBuf;

use crate::storage::{LocalStorage, StorageError};

/// Application-level constants
pub const APP_NAME: &str = "CareQueue";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default staff API base.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Default admin (hospital onboarding) API base.
pub const DEFAULT_ADMIN_API_BASE_URL: &str = "http://localhost:8000/api/admin";

/// Environment variables the binary treats as explicit overrides.
pub const API_BASE_URL_ENV: &str = "CAREQUEUE_API_BASE_URL";
pub const ADMIN_API_BASE_URL_ENV: &str = "CAREQUEUE_ADMIN_API_BASE_URL";

// ═══════════════════════════════════════════════════════════
// Local storage keys
// ═══════════════════════════════════════════════════════════

pub mod keys {
    /// Serialized current-serving patient.
    pub const CURRENT_PATIENT: &str = "current_serving_patient";
    /// Staff session bearer token.
    pub const ACCESS_TOKEN: &str = "access_token";
    /// Admin session bearer token (hospital onboarding).
    pub const ADMIN_ACCESS_TOKEN: &str = "admin_access_token";
    /// Cached `/users/profile/` blob.
    pub const USER: &str = "user";
    /// Persisted staff API base override.
    pub const API_BASE_URL: &str = "api_base_url";
    /// Persisted admin API base override.
    pub const ADMIN_API_BASE_URL: &str = "admin_api_base_url";
}

/// Get the application data directory (~/CareQueue/).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Path of the local storage database.
pub fn storage_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("local_storage.db"))
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,carequeue_lib=debug,hyper=warn,reqwest=warn"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ═══════════════════════════════════════════════════════════
// ClientConfig
// ═══════════════════════════════════════════════════════════

/// Explicit overrides supplied by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub admin_api_base_url: Option<String>,
}

impl ConfigOverrides {
    /// Read overrides from the process environment.
    pub fn from_env() -> Self {
        Self {
            api_base_url: std::env::var(API_BASE_URL_ENV).ok(),
            admin_api_base_url: std::env::var(ADMIN_API_BASE_URL_ENV).ok(),
        }
    }
}

/// Resolved endpoints for one client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub admin_api_base_url: String,
}

impl ClientConfig {
    /// Resolve with precedence: explicit override > persisted override > default.
    pub fn resolve(
        overrides: &ConfigOverrides,
        storage: &dyn LocalStorage,
    ) -> Result<Self, ConfigError> {
        let api_base_url = resolve_base_url(
            overrides.api_base_url.as_deref(),
            storage.get(keys::API_BASE_URL)?.as_deref(),
            DEFAULT_API_BASE_URL,
        )?;
        let admin_api_base_url = resolve_base_url(
            overrides.admin_api_base_url.as_deref(),
            storage.get(keys::ADMIN_API_BASE_URL)?.as_deref(),
            DEFAULT_ADMIN_API_BASE_URL,
        )?;

        tracing::debug!(%api_base_url, %admin_api_base_url, "Client configuration resolved");
        Ok(Self {
            api_base_url,
            admin_api_base_url,
        })
    }

    /// Config pointing both APIs at one server root (tests, local runs).
    pub fn for_server(root: &str) -> Self {
        let root = root.trim_end_matches('/');
        Self {
            api_base_url: format!("{root}/api"),
            admin_api_base_url: format!("{root}/api/admin"),
        }
    }

    /// WebSocket base derived from the staff API base.
    ///
    /// `http` becomes `ws`, `https` becomes `wss`, and a trailing `/api`
    /// path segment is dropped (channels are mounted at the server root).
    pub fn ws_base_url(&self) -> Result<String, ConfigError> {
        let base = self.api_base_url.trim_end_matches('/');
        let swapped = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(ConfigError::InvalidBaseUrl(self.api_base_url.clone()));
        };
        Ok(swapped
            .strip_suffix("/api")
            .map(str::to_string)
            .unwrap_or(swapped))
    }
}

fn resolve_base_url(
    explicit: Option<&str>,
    persisted: Option<&str>,
    default: &str,
) -> Result<String, ConfigError> {
    let chosen = [explicit, persisted]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(default);

    if !(chosen.starts_with("http://") || chosen.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(chosen.to_string()));
    }
    Ok(chosen.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("CareQueue"));
    }

    #[test]
    fn defaults_when_nothing_set() {
        let storage = MemoryStorage::new();
        let config = ClientConfig::resolve(&ConfigOverrides::default(), &storage).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.admin_api_base_url, DEFAULT_ADMIN_API_BASE_URL);
    }

    #[test]
    fn persisted_override_beats_default() {
        let storage = MemoryStorage::new();
        storage
            .set(keys::ADMIN_API_BASE_URL, "https://admin.example.org/api/admin/")
            .unwrap();
        let config = ClientConfig::resolve(&ConfigOverrides::default(), &storage).unwrap();
        assert_eq!(config.admin_api_base_url, "https://admin.example.org/api/admin");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn explicit_override_beats_persisted() {
        let storage = MemoryStorage::new();
        storage.set(keys::API_BASE_URL, "http://persisted:8000/api").unwrap();
        let overrides = ConfigOverrides {
            api_base_url: Some("http://explicit:9000/api".into()),
            admin_api_base_url: None,
        };
        let config = ClientConfig::resolve(&overrides, &storage).unwrap();
        assert_eq!(config.api_base_url, "http://explicit:9000/api");
    }

    #[test]
    fn blank_override_falls_through() {
        let storage = MemoryStorage::new();
        storage.set(keys::API_BASE_URL, "http://persisted:8000/api").unwrap();
        let overrides = ConfigOverrides {
            api_base_url: Some("   ".into()),
            admin_api_base_url: None,
        };
        let config = ClientConfig::resolve(&overrides, &storage).unwrap();
        assert_eq!(config.api_base_url, "http://persisted:8000/api");
    }

    #[test]
    fn rejects_non_http_base() {
        let storage = MemoryStorage::new();
        let overrides = ConfigOverrides {
            api_base_url: Some("ftp://nope".into()),
            admin_api_base_url: None,
        };
        assert!(matches!(
            ClientConfig::resolve(&overrides, &storage),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn ws_base_swaps_scheme_and_drops_api() {
        let config = ClientConfig::for_server("http://127.0.0.1:8000");
        assert_eq!(config.ws_base_url().unwrap(), "ws://127.0.0.1:8000");

        let secure = ClientConfig {
            api_base_url: "https://hospital.example.org/api".into(),
            admin_api_base_url: DEFAULT_ADMIN_API_BASE_URL.into(),
        };
        assert_eq!(secure.ws_base_url().unwrap(), "wss://hospital.example.org");
    }

    #[test]
    fn app_name_is_carequeue() {
        assert_eq!(APP_NAME, "CareQueue");
    }
}
