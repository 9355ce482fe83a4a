//! # Record Store
//!
//! The one entry point callers use. Validates the owner, stamps timestamps,
//! runs the field codec and hands rows to whichever adapter was selected.
//!
//! ## Call Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          RECORD STORE CALL                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  caller ── (record, "owner") ──▶ RecordStore                            │
//! │                                     │                                   │
//! │                                     ├─ OwnerId::parse  (blank → error)  │
//! │                                     ├─ time::now       (timestamps)     │
//! │                                     ├─ codec::encode   (dialect rules)  │
//! │                                     ▼                                   │
//! │                               dyn RecordAdapter                         │
//! │                                     │                                   │
//! │                                     ▼                                   │
//! │                               backend rows ──▶ codec::decode ──▶ caller │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! An app calls [`RecordStore::initialize`] once at startup; the backend is
//! chosen then and never changes for the life of the process. Code that
//! needs an isolated store (tests, tools) uses [`RecordStore::open`] or
//! [`RecordStore::with_adapter`] instead.

use std::sync::Arc;

use crate::codec::{self, Stamp};
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::{
    only_digits, ChecklistRecord, ChecklistSummary, OwnerId, Photo, PhotoField, Photos, RecordId,
    StoredChecklist, UserProfile,
};
use crate::photo;
use crate::storage::{self, BackendKind, RecordAdapter};
use crate::time;

#[cfg(not(target_arch = "wasm32"))]
static INSTANCE: once_cell::sync::OnceCell<RecordStore> = once_cell::sync::OnceCell::new();

#[cfg(target_arch = "wasm32")]
thread_local! {
    static INSTANCE: once_cell::unsync::OnceCell<RecordStore> = once_cell::unsync::OnceCell::new();
}

/// Backend-independent checklist and profile store
#[derive(Clone)]
pub struct RecordStore {
    adapter: Arc<dyn RecordAdapter>,
}

impl RecordStore {
    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Select the backend from `config` and install the process-wide store
    ///
    /// Fails with [`Error::AlreadyInitialized`] on a second call.
    pub async fn initialize(config: StoreConfig) -> Result<RecordStore> {
        if Self::instance().is_ok() {
            return Err(Error::AlreadyInitialized);
        }
        let store = Self::open(&config).await?;

        #[cfg(not(target_arch = "wasm32"))]
        INSTANCE
            .set(store.clone())
            .map_err(|_| Error::AlreadyInitialized)?;
        #[cfg(target_arch = "wasm32")]
        INSTANCE.with(|cell| cell.set(store.clone()).map_err(|_| Error::AlreadyInitialized))?;

        tracing::info!(backend = %store.backend(), "Record store initialized");
        Ok(store)
    }

    /// The process-wide store
    pub fn instance() -> Result<RecordStore> {
        #[cfg(not(target_arch = "wasm32"))]
        let store = INSTANCE.get().cloned();
        #[cfg(target_arch = "wasm32")]
        let store = INSTANCE.with(|cell| cell.get().cloned());

        store.ok_or(Error::NotInitialized)
    }

    /// A store of its own, not installed globally
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        Ok(Self::with_adapter(storage::select_adapter(config).await?))
    }

    /// Wrap an adapter directly
    pub fn with_adapter(adapter: Arc<dyn RecordAdapter>) -> Self {
        Self { adapter }
    }

    /// Which backend serves this store
    pub fn backend(&self) -> BackendKind {
        self.adapter.kind()
    }

    // ========================================================================
    // CHECKLISTS
    // ========================================================================

    /// The owner's checklists, newest first
    pub async fn list(&self, owner: &str) -> Result<Vec<ChecklistSummary>> {
        let owner = OwnerId::parse(owner)?;
        let rows = self.adapter.list(&owner).await?;
        Ok(rows
            .iter()
            .filter_map(|row| match codec::decode_summary(row) {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(backend = %self.backend(), error = %e, "Skipping undecodable row");
                    None
                }
            })
            .collect())
    }

    /// One checklist, or `None` when absent or owned by someone else
    pub async fn get(&self, id: &RecordId, owner: &str) -> Result<Option<StoredChecklist>> {
        let owner = OwnerId::parse(owner)?;
        match self.adapter.get(id, &owner).await? {
            Some(row) => codec::decode_checklist(&row).map(Some),
            None => Ok(None),
        }
    }

    /// Only the photo slots of a checklist
    pub async fn get_photos(&self, id: &RecordId, owner: &str) -> Result<Option<Photos>> {
        let owner = OwnerId::parse(owner)?;
        Ok(self
            .adapter
            .get_photos(id, &owner)
            .await?
            .map(|row| codec::decode_photos(&row)))
    }

    /// File a new checklist and return its id
    pub async fn create(&self, record: &ChecklistRecord, owner: &str) -> Result<RecordId> {
        let owner = OwnerId::parse(owner)?;
        let encoded = codec::encode_checklist(record, &self.adapter.dialect(), Stamp::Create(time::now()));
        let id = self.adapter.create(encoded, &owner).await?;
        tracing::debug!(backend = %self.backend(), id = %id, owner = %owner, "create");
        Ok(id)
    }

    /// Overwrite a checklist's text and yes/no fields
    ///
    /// Photos are written only for slots that carry a durable payload in
    /// `record`; every other stored photo is left as it was. Use
    /// [`RecordStore::clear_photo`] to remove one.
    pub async fn update(&self, id: &RecordId, record: &ChecklistRecord, owner: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let encoded = codec::encode_checklist(record, &self.adapter.dialect(), Stamp::Update(time::now()));
        self.adapter.update(id, encoded, &owner).await?;
        tracing::debug!(backend = %self.backend(), id = %id, owner = %owner, "update");
        Ok(())
    }

    /// Delete a checklist
    pub async fn delete(&self, id: &RecordId, owner: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        self.adapter.delete(id, &owner).await?;
        tracing::debug!(backend = %self.backend(), id = %id, owner = %owner, "delete");
        Ok(())
    }

    /// Store a freshly captured photo in one slot
    ///
    /// The raw capture goes through [`photo::produce_durable`] first.
    pub async fn attach_photo(
        &self,
        id: &RecordId,
        field: PhotoField,
        device_uri: &str,
        raw_b64: &str,
        owner: &str,
    ) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let dialect = self.adapter.dialect();

        let mut photos = Photos::default();
        *photos.get_mut(field) = Photo::captured(device_uri, photo::produce_durable(device_uri, raw_b64));
        let mut columns = codec::encode_photos(&photos, &dialect);
        columns.extend(codec::encode_touch(&dialect, time::now()));

        self.adapter.patch(id, columns, &owner).await?;
        tracing::debug!(backend = %self.backend(), id = %id, field = field.as_str(), "attach_photo");
        Ok(())
    }

    /// Remove one photo (both device reference and durable payload)
    pub async fn clear_photo(&self, id: &RecordId, field: PhotoField, owner: &str) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let columns = codec::encode_photo_clear(field, &self.adapter.dialect(), time::now());
        self.adapter.patch(id, columns, &owner).await?;
        tracing::debug!(backend = %self.backend(), id = %id, field = field.as_str(), "clear_photo");
        Ok(())
    }

    // ========================================================================
    // PROFILES
    // ========================================================================

    /// The owner's profile
    pub async fn get_profile(&self, owner: &str) -> Result<Option<UserProfile>> {
        let owner = OwnerId::parse(owner)?;
        Ok(self
            .adapter
            .get_profile(&owner)
            .await?
            .map(|row| codec::decode_profile(&row)))
    }

    /// Create or replace the owner's profile (normalized before writing)
    pub async fn upsert_profile(&self, owner: &str, profile: &UserProfile) -> Result<()> {
        let owner = OwnerId::parse(owner)?;
        let row = codec::encode_profile(&profile.normalized());
        self.adapter.upsert_profile(&owner, row).await
    }

    /// Owner whose profile carries this national id (any punctuation)
    pub async fn find_owner_by_national_id(&self, national_id: &str) -> Result<Option<OwnerId>> {
        let digits = only_digits(national_id);
        if digits.is_empty() {
            return Ok(None);
        }
        self.adapter.find_owner_by_national_id(&digits).await
    }

    /// Owner id generated for this device, when the backend keeps one
    pub async fn local_owner_id(&self) -> Result<Option<OwnerId>> {
        self.adapter.local_owner_id().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TriState;
    use crate::storage::fake::MemoryTransport;
    use crate::storage::{BrowserAdapter, Database, EmbeddedAdapter, MemoryStorage, RemoteAdapter};

    async fn stores() -> Vec<RecordStore> {
        let db = Database::open(None).await.unwrap();
        vec![
            RecordStore::with_adapter(Arc::new(EmbeddedAdapter::new(db))),
            RecordStore::with_adapter(Arc::new(BrowserAdapter::new(MemoryStorage::new()))),
            RecordStore::with_adapter(Arc::new(RemoteAdapter::with_transport(
                Arc::new(MemoryTransport::new()),
                false,
            ))),
        ]
    }

    fn ana() -> ChecklistRecord {
        ChecklistRecord {
            customer_name: "Ana Silva".into(),
            street_address: "Rua das Flores, 12".into(),
            fiber_color: "azul".into(),
            client_port: "4".into(),
            has_splitter: TriState::Yes,
            browsing_test_passed: TriState::Unknown,
            customer_satisfied: TriState::No,
            ..Default::default()
        }
    }

    fn durable(tag: &str) -> String {
        format!("data:image/jpeg;base64,{}", tag)
    }

    #[tokio::test]
    async fn test_round_trip_keeps_every_field() {
        for store in stores().await {
            let id = store.create(&ana(), "u1").await.unwrap();
            let stored = store.get(&id, "u1").await.unwrap().unwrap();

            assert_eq!(stored.record, ana(), "{}", store.backend());
            assert_eq!(stored.record.browsing_test_passed, TriState::Unknown);
            assert_eq!(stored.owner_id.as_ref().map(OwnerId::as_str), Some("u1"));
            assert_eq!(stored.created_at, stored.updated_at);
        }
    }

    #[tokio::test]
    async fn test_unknown_and_false_stay_distinct() {
        for store in stores().await {
            let mut record = ana();
            record.has_splitter = TriState::No;
            record.customer_satisfied = TriState::Unknown;
            let id = store.create(&record, "u1").await.unwrap();

            let back = store.get(&id, "u1").await.unwrap().unwrap().record;
            assert_eq!(back.has_splitter, TriState::No, "{}", store.backend());
            assert_eq!(back.customer_satisfied, TriState::Unknown);
        }
    }

    #[tokio::test]
    async fn test_ownership_isolation() {
        for store in stores().await {
            let id = store.create(&ana(), "u1").await.unwrap();

            assert!(store.get(&id, "u2").await.unwrap().is_none(), "{}", store.backend());
            assert!(store.get_photos(&id, "u2").await.unwrap().is_none());

            let mut hijack = ana();
            hijack.customer_name = "Mallory".into();
            store.update(&id, &hijack, "u2").await.unwrap();
            store.delete(&id, "u2").await.unwrap();

            let kept = store.get(&id, "u1").await.unwrap().unwrap();
            assert_eq!(kept.record.customer_name, "Ana Silva");
            assert!(store.list("u2").await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_owner_is_rejected() {
        for store in stores().await {
            assert!(matches!(store.list("").await, Err(Error::InvalidOwner)));
            assert!(matches!(store.create(&ana(), "  ").await, Err(Error::InvalidOwner)));
            assert!(matches!(
                store.get(&RecordId::from(1), "").await,
                Err(Error::InvalidOwner)
            ));
        }
    }

    #[tokio::test]
    async fn test_update_overwrites_to_unknown_and_empty() {
        for store in stores().await {
            let id = store.create(&ana(), "u1").await.unwrap();

            let mut cleared = ana();
            cleared.has_splitter = TriState::Unknown;
            cleared.customer_satisfied = TriState::Unknown;
            cleared.fiber_color = String::new();
            cleared.client_port = String::new();
            store.update(&id, &cleared, "u1").await.unwrap();

            let back = store.get(&id, "u1").await.unwrap().unwrap().record;
            assert_eq!(back.has_splitter, TriState::Unknown, "{}", store.backend());
            assert_eq!(back.customer_satisfied, TriState::Unknown, "{}", store.backend());
            assert_eq!(back.fiber_color, "", "{}", store.backend());
            assert_eq!(back.client_port, "");
            assert_eq!(back.customer_name, "Ana Silva");
        }
    }

    #[tokio::test]
    async fn test_update_missing_record_is_a_no_op() {
        for store in stores().await {
            store.update(&RecordId::from(4242), &ana(), "u1").await.unwrap();
            store.update(&RecordId::from("not-an-id"), &ana(), "u1").await.unwrap();
            assert!(store.list("u1").await.unwrap().is_empty(), "{}", store.backend());
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_owner_scoped() {
        for store in stores().await {
            let first = store.create(&ana(), "u1").await.unwrap();
            let mut other = ana();
            other.customer_name = "Bia".into();
            store.create(&other, "u2").await.unwrap();
            let second = store.create(&other, "u1").await.unwrap();

            let list = store.list("u1").await.unwrap();
            let ids: Vec<&RecordId> = list.iter().map(|s| &s.id).collect();
            assert_eq!(ids, vec![&second, &first], "{}", store.backend());
            assert_eq!(list[0].title, "Bia");
            assert_eq!(list[1].title, "Ana Silva");
        }
    }

    #[tokio::test]
    async fn test_partial_photo_update_changes_only_that_photo() {
        for store in stores().await {
            let mut record = ana();
            record.photos.cto = Photo::captured("file:///cto.jpg", durable("CTO"));
            record.photos.installation = Photo::captured("file:///inst.jpg", durable("INST"));
            let id = store.create(&record, "u1").await.unwrap();

            // scalar-only update: no durable payloads supplied
            let mut scalars = ana();
            scalars.wifi_ssid = "AnaNet".into();
            store.update(&id, &scalars, "u1").await.unwrap();

            // one-photo update
            let mut one_photo = scalars.clone();
            one_photo.photos.mac_label = Photo::captured("file:///mac.jpg", durable("MAC"));
            store.update(&id, &one_photo, "u1").await.unwrap();

            let photos = store.get_photos(&id, "u1").await.unwrap().unwrap();
            let backend = store.backend();
            assert_eq!(photos.cto.durable(), Some(durable("CTO").as_str()), "{}", backend);
            assert_eq!(photos.installation.durable(), Some(durable("INST").as_str()));
            assert_eq!(photos.mac_label.durable(), Some(durable("MAC").as_str()));
            assert_eq!(photos.house_front.durable(), None);

            let stored = store.get(&id, "u1").await.unwrap().unwrap();
            assert_eq!(stored.record.wifi_ssid, "AnaNet");
            assert!(stored.updated_at >= stored.created_at);
        }
    }

    #[tokio::test]
    async fn test_clear_photo_drops_both_slots() {
        for store in stores().await {
            let mut record = ana();
            record.photos.house_front = Photo::captured("file:///front.jpg", durable("FRONT"));
            let id = store.create(&record, "u1").await.unwrap();

            store.clear_photo(&id, PhotoField::HouseFront, "u1").await.unwrap();
            let photos = store.get_photos(&id, "u1").await.unwrap().unwrap();
            assert!(photos.house_front.is_empty(), "{}", store.backend());
        }
    }

    #[tokio::test]
    async fn test_attach_photo_stores_durable_payload() {
        for store in stores().await {
            let id = store.create(&ana(), "u1").await.unwrap();
            store
                .attach_photo(&id, PhotoField::Cto, "/sdcard/cto.jpg", "aGVsbG8=", "u1")
                .await
                .unwrap();

            let stored = store.get(&id, "u1").await.unwrap().unwrap();
            assert_eq!(
                stored.record.photos.cto.durable(),
                Some("data:image/jpeg;base64,aGVsbG8="),
                "{}",
                store.backend()
            );
            assert_eq!(
                photo::resolve_for_display(&stored.record, PhotoField::Cto).await.as_deref(),
                Some("data:image/jpeg;base64,aGVsbG8=")
            );
        }
    }

    #[tokio::test]
    async fn test_record_without_photos_resolves_nothing() {
        for store in stores().await {
            let id = store.create(&ana(), "u1").await.unwrap();
            let stored = store.get(&id, "u1").await.unwrap().unwrap();
            for field in PhotoField::ALL {
                assert_eq!(photo::resolve_for_display(&stored.record, field).await, None);
            }
        }
    }

    #[tokio::test]
    async fn test_profiles_are_normalized_and_searchable() {
        for store in stores().await {
            let profile = UserProfile {
                first_name: " Ana ".into(),
                last_name: "Silva".into(),
                phone: "11987654321".into(),
                national_id: Some("123.456.789-01".into()),
            };
            store.upsert_profile("u1", &profile).await.unwrap();

            let stored = store.get_profile("u1").await.unwrap().unwrap();
            assert_eq!(stored.first_name, "Ana", "{}", store.backend());
            assert_eq!(stored.phone, "(11) 98765-4321");
            assert_eq!(stored.national_id.as_deref(), Some("12345678901"));

            let found = store.find_owner_by_national_id("123.456.789-01").await.unwrap();
            assert_eq!(found.as_ref().map(OwnerId::as_str), Some("u1"));
            assert_eq!(store.find_owner_by_national_id("--").await.unwrap(), None);
            assert!(store.get_profile("u2").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_local_owner_id_per_backend() {
        for store in stores().await {
            let local = store.local_owner_id().await.unwrap();
            match store.backend() {
                BackendKind::Remote => assert_eq!(local, None),
                _ => {
                    let local = local.unwrap();
                    assert_eq!(store.local_owner_id().await.unwrap(), Some(local));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_global_instance_initializes_once() {
        let store = RecordStore::initialize(StoreConfig::browser(None)).await.unwrap();
        assert_eq!(store.backend(), BackendKind::Browser);
        assert!(matches!(
            RecordStore::initialize(StoreConfig::browser(None)).await,
            Err(Error::AlreadyInitialized)
        ));
        assert_eq!(RecordStore::instance().unwrap().backend(), BackendKind::Browser);
    }
}
