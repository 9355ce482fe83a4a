//! # Storage Module
//!
//! Backend adapters for checklist records and user profiles.
//!
//! ## Storage Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         STORAGE SYSTEM                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                     ┌────────────────────────┐                          │
//! │                     │  dyn RecordAdapter     │  chosen once at startup  │
//! │                     └───────────┬────────────┘                          │
//! │           ┌─────────────────────┼──────────────────────┐                │
//! │           ▼                     ▼                      ▼                │
//! │  ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────────┐   │
//! │  │ EmbeddedAdapter │  │ BrowserAdapter   │  │ RemoteAdapter        │   │
//! │  │ ─────────────── │  │ ──────────────── │  │ ──────────────────── │   │
//! │  │ SQLite file     │  │ KeyValueStore:   │  │ RestTransport:       │   │
//! │  │ (native only)   │  │ localStorage,    │  │ PostgREST over HTTP  │   │
//! │  │                 │  │ JSON file, memory│  │                      │   │
//! │  └─────────────────┘  └──────────────────┘  └──────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adapter Contract
//!
//! Adapters move backend-native [`Row`]s; the field codec owns every column
//! name and value encoding. What adapters do own:
//!
//! - **Ownership.** Every query and mutation is filtered by owner. A row owned
//!   by someone else is indistinguishable from a missing one: reads return
//!   `None`, writes and deletes do nothing.
//! - **Ids.** The adapter issues ids and parses them back. An id the backend
//!   cannot address is treated as not found.
//! - **Photo preservation.** `update` writes the core columns in full and the
//!   photo columns only when present in [`EncodedChecklist::photos`].
//!
//! ## Backend Selection
//!
//! ```text
//! BackendPreference::Auto
//!   remote configured (http(s) URL + key) ──▶ RemoteAdapter
//!   native + database path                ──▶ EmbeddedAdapter
//!   wasm32                                ──▶ BrowserAdapter(localStorage)
//!   native + kv path                      ──▶ BrowserAdapter(JSON file)
//!   otherwise                             ──▶ BrowserAdapter(memory)
//!
//! BackendPreference::Embedded
//!   database path                         ──▶ EmbeddedAdapter
//!   no path                               ──▶ Error::NotConfigured
//! ```

mod browser;
mod kv;
mod remote;
mod rest;

// Platform-specific embedded backend
#[cfg(not(target_arch = "wasm32"))]
mod database;
#[cfg(not(target_arch = "wasm32"))]
mod embedded;
#[cfg(not(target_arch = "wasm32"))]
mod schema;

pub use browser::BrowserAdapter;
#[cfg(target_arch = "wasm32")]
pub use kv::LocalStorage;
pub use kv::{FileStorage, KeyValueStore, MemoryStorage};
pub use remote::RemoteAdapter;
pub use rest::{HttpTransport, RestQuery, RestTransport};

#[cfg(not(target_arch = "wasm32"))]
pub use database::Database;
#[cfg(not(target_arch = "wasm32"))]
pub use embedded::EmbeddedAdapter;

#[cfg(test)]
pub(crate) use rest::fake;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::codec::{Dialect, EncodedChecklist, Row};
use crate::config::{BackendPreference, StoreConfig};
use crate::error::{Error, Result};
use crate::model::{OwnerId, RecordId};

/// `Send + Sync` on native targets, nothing on wasm32
#[cfg(not(target_arch = "wasm32"))]
pub trait MaybeSendSync: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> MaybeSendSync for T {}

/// `Send + Sync` on native targets, nothing on wasm32
#[cfg(target_arch = "wasm32")]
pub trait MaybeSendSync {}
#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> MaybeSendSync for T {}

/// The substrate behind an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// On-device SQLite
    Embedded,
    /// Browser key-value storage
    Browser,
    /// Remote relational service
    Remote,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Embedded => "embedded",
            BackendKind::Browser => "browser",
            BackendKind::Remote => "remote",
        })
    }
}

/// Record-store contract implemented once per backend
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait RecordAdapter: MaybeSendSync {
    /// Which backend this is
    fn kind(&self) -> BackendKind;

    /// Naming and encoding rules for this backend's rows
    fn dialect(&self) -> Dialect;

    /// Summary rows (`id`, customer name, timestamps), newest first
    async fn list(&self, owner: &OwnerId) -> Result<Vec<Row>>;

    /// Full row, or `None` when absent or not owned
    async fn get(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>>;

    /// Row holding at least the photo columns
    async fn get_photos(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>> {
        self.get(id, owner).await
    }

    /// Insert a new row owned by `owner`
    async fn create(&self, row: EncodedChecklist, owner: &OwnerId) -> Result<RecordId>;

    /// Overwrite the core columns and the supplied photo columns
    async fn update(&self, id: &RecordId, row: EncodedChecklist, owner: &OwnerId) -> Result<()>;

    /// Set a subset of columns
    async fn patch(&self, id: &RecordId, columns: Row, owner: &OwnerId) -> Result<()>;

    /// Remove a row
    async fn delete(&self, id: &RecordId, owner: &OwnerId) -> Result<()>;

    /// Profile row of `owner`
    async fn get_profile(&self, owner: &OwnerId) -> Result<Option<Row>>;

    /// Create or replace the profile of `owner`
    async fn upsert_profile(&self, owner: &OwnerId, profile: Row) -> Result<()>;

    /// Owner whose profile carries `national_id` (digits only)
    async fn find_owner_by_national_id(&self, national_id: &str) -> Result<Option<OwnerId>>;

    /// Owner id generated and persisted for this device, if the backend keeps one
    async fn local_owner_id(&self) -> Result<Option<OwnerId>>;
}

/// Merge the two halves of an encoded checklist into one row
pub(crate) fn merged(row: EncodedChecklist) -> Row {
    let EncodedChecklist { mut core, photos } = row;
    core.extend(photos);
    core
}

/// Build the adapter `config` asks for
pub async fn select_adapter(config: &StoreConfig) -> Result<Arc<dyn RecordAdapter>> {
    let adapter: Arc<dyn RecordAdapter> = match config.backend {
        BackendPreference::Remote => Arc::new(RemoteAdapter::from_config(&config.remote)?),
        BackendPreference::Auto if config.remote.is_ready() => {
            Arc::new(RemoteAdapter::from_config(&config.remote)?)
        }
        BackendPreference::Embedded => open_embedded(config).await?,
        #[cfg(not(target_arch = "wasm32"))]
        BackendPreference::Auto if config.database_path.is_some() => open_embedded(config).await?,
        BackendPreference::Auto | BackendPreference::Browser => open_browser(config)?,
    };

    tracing::info!(
        backend = %adapter.kind(),
        preference = %config.backend,
        "Record store backend selected"
    );
    Ok(adapter)
}

#[cfg(not(target_arch = "wasm32"))]
async fn open_embedded(config: &StoreConfig) -> Result<Arc<dyn RecordAdapter>> {
    let Some(path) = config.database_path.as_deref() else {
        return Err(Error::NotConfigured(
            "embedded backend needs a database path".into(),
        ));
    };
    let db = Database::open(Some(path)).await?;
    Ok(Arc::new(EmbeddedAdapter::new(db)))
}

#[cfg(target_arch = "wasm32")]
async fn open_embedded(_config: &StoreConfig) -> Result<Arc<dyn RecordAdapter>> {
    Err(Error::NotConfigured(
        "the embedded backend is not available on this platform".into(),
    ))
}

#[cfg(not(target_arch = "wasm32"))]
fn open_browser(config: &StoreConfig) -> Result<Arc<dyn RecordAdapter>> {
    Ok(match &config.kv_path {
        Some(path) => Arc::new(BrowserAdapter::new(FileStorage::new(path))),
        None => Arc::new(BrowserAdapter::new(MemoryStorage::new())),
    })
}

#[cfg(target_arch = "wasm32")]
fn open_browser(_config: &StoreConfig) -> Result<Arc<dyn RecordAdapter>> {
    if !LocalStorage::is_available() {
        return Err(Error::NotConfigured("localStorage is not available".into()));
    }
    Ok(Arc::new(BrowserAdapter::new(LocalStorage)))
}
