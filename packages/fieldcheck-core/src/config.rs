//! Record store configuration.
//!
//! Everything the adapter selector needs to pick a backend, loadable from
//! environment variables.
//!
//! | Variable                     | Meaning                                   |
//! |------------------------------|-------------------------------------------|
//! | `FIELDCHECK_BACKEND`         | `auto` (default), `remote`, `embedded`, `browser` |
//! | `FIELDCHECK_DATABASE`        | SQLite file for the embedded backend      |
//! | `FIELDCHECK_KV_FILE`         | JSON file backing browser-style storage   |
//! | `FIELDCHECK_REMOTE_URL`      | Base URL of the remote REST service       |
//! | `FIELDCHECK_REMOTE_KEY`      | Public API key of the remote service      |
//! | `FIELDCHECK_ACCESS_TOKEN`    | Signed-in user's bearer token (optional)  |
//! | `FIELDCHECK_NATIVE_BOOLEANS` | `1`/`true` when remote tri-states are `boolean` columns |

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Which backend the selector should use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Remote when configured, else embedded, else browser storage
    #[default]
    Auto,
    /// Always the remote service (unconfigured if settings are missing)
    Remote,
    /// Always the on-device SQLite database
    Embedded,
    /// Always key-value browser storage
    Browser,
}

impl FromStr for BackendPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "auto" => Ok(Self::Auto),
            "remote" => Ok(Self::Remote),
            "embedded" | "sqlite" => Ok(Self::Embedded),
            "browser" | "kv" => Ok(Self::Browser),
            other => Err(Error::NotConfigured(format!("unknown backend '{other}'"))),
        }
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Remote => "remote",
            Self::Embedded => "embedded",
            Self::Browser => "browser",
        })
    }
}

/// Connection settings for the remote REST service
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Base URL, `http(s)://` only
    pub url: Option<String>,
    /// Public API key sent as `apikey`
    pub api_key: Option<String>,
    /// Bearer token of the signed-in user; the API key is used when absent
    pub access_token: Option<String>,
    /// Remote tri-state columns are `boolean` rather than `smallint`
    pub native_booleans: bool,
}

impl RemoteConfig {
    /// Build from explicit values, normalizing the URL
    pub fn new(url: impl AsRef<str>, api_key: impl Into<String>) -> Self {
        Self {
            url: normalize_url(url.as_ref()),
            api_key: Some(api_key.into()).filter(|k: &String| !k.trim().is_empty()),
            access_token: None,
            native_booleans: false,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            url: env::var("FIELDCHECK_REMOTE_URL")
                .ok()
                .and_then(|u| normalize_url(&u)),
            api_key: non_blank(env::var("FIELDCHECK_REMOTE_KEY").ok()),
            access_token: non_blank(env::var("FIELDCHECK_ACCESS_TOKEN").ok()),
            native_booleans: env::var("FIELDCHECK_NATIVE_BOOLEANS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }

    /// Both a usable URL and an API key are present
    pub fn is_ready(&self) -> bool {
        self.url.is_some() && self.api_key.is_some()
    }

    /// Token for the `Authorization` header
    pub fn bearer(&self) -> Option<&str> {
        self.access_token.as_deref().or(self.api_key.as_deref())
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("native_booleans", &self.native_booleans)
            .finish()
    }
}

/// Full record store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Backend preference
    pub backend: BackendPreference,
    /// SQLite file for the embedded backend
    pub database_path: Option<PathBuf>,
    /// JSON file backing browser-style storage on native targets
    pub kv_path: Option<PathBuf>,
    /// Remote service settings
    pub remote: RemoteConfig,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let backend = match env::var("FIELDCHECK_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => BackendPreference::Auto,
        };
        Ok(Self {
            backend,
            database_path: non_blank(env::var("FIELDCHECK_DATABASE").ok()).map(PathBuf::from),
            kv_path: non_blank(env::var("FIELDCHECK_KV_FILE").ok()).map(PathBuf::from),
            remote: RemoteConfig::from_env(),
        })
    }

    /// Embedded SQLite at `path`
    pub fn embedded(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendPreference::Embedded,
            database_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Browser-style storage, in memory or backed by `kv_path`
    pub fn browser(kv_path: Option<PathBuf>) -> Self {
        Self {
            backend: BackendPreference::Browser,
            kv_path,
            ..Default::default()
        }
    }

    /// Remote service only
    pub fn remote(remote: RemoteConfig) -> Self {
        Self {
            backend: BackendPreference::Remote,
            remote,
            ..Default::default()
        }
    }
}

/// Trim a base URL and drop trailing slashes; anything not `http(s)` is absent
pub fn normalize_url(raw: &str) -> Option<String> {
    let url = raw.trim().trim_end_matches('/');
    let lower = url.to_ascii_lowercase();
    let has_host = ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len());
    has_host.then(|| url.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url(" https://abc.example.co/ "),
            Some("https://abc.example.co".into())
        );
        assert_eq!(normalize_url("http://localhost:54321"), Some("http://localhost:54321".into()));
        assert_eq!(normalize_url("abc.example.co"), None);
        assert_eq!(normalize_url("ftp://abc"), None);
        assert_eq!(normalize_url("https://"), None);
        assert_eq!(normalize_url(""), None);
    }

    #[test]
    fn test_remote_ready_requires_url_and_key() {
        assert!(RemoteConfig::new("https://x.example", "anon").is_ready());
        assert!(!RemoteConfig::new("x.example", "anon").is_ready());
        assert!(!RemoteConfig::new("https://x.example", "  ").is_ready());
        assert!(!RemoteConfig::default().is_ready());
    }

    #[test]
    fn test_bearer_prefers_access_token() {
        let mut cfg = RemoteConfig::new("https://x.example", "anon");
        assert_eq!(cfg.bearer(), Some("anon"));
        cfg.access_token = Some("jwt".into());
        assert_eq!(cfg.bearer(), Some("jwt"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut cfg = RemoteConfig::new("https://x.example", "anon-key");
        cfg.access_token = Some("secret-jwt".into());
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("anon-key"));
        assert!(!dbg.contains("secret-jwt"));
    }

    #[test]
    fn test_backend_preference_parse() {
        assert_eq!("".parse::<BackendPreference>().unwrap(), BackendPreference::Auto);
        assert_eq!("Remote".parse::<BackendPreference>().unwrap(), BackendPreference::Remote);
        assert_eq!("sqlite".parse::<BackendPreference>().unwrap(), BackendPreference::Embedded);
        assert!("cloud".parse::<BackendPreference>().is_err());
        assert_eq!(BackendPreference::Browser.to_string(), "browser");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag(""));
    }
}
