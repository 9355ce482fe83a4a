//! # Browser Adapter
//!
//! Checklists kept under a handful of `localStorage` keys.
//!
//! ```text
//! "checklists" → [ {id: 1, userId: "user-…", nome: "…", …}, … ]
//! "userId"     → "user-…"
//! "profiles"   → { "<owner>": {first_name, last_name, phone, cpf}, … }
//! ```
//!
//! Ids are integers, one more than the largest id in the array. Each call
//! reads and rewrites the whole array; a value that no longer parses is
//! logged and treated as empty rather than failing every later call.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Reverse;

use super::{merged, BackendKind, KeyValueStore, RecordAdapter};
use crate::codec::{self, Dialect, EncodedChecklist, Row};
use crate::error::Result;
use crate::model::{OwnerId, RecordId};

const CHECKLISTS_KEY: &str = "checklists";
const OWNER_KEY: &str = "userId";
const PROFILES_KEY: &str = "profiles";

/// Record adapter over any [`KeyValueStore`]
pub struct BrowserAdapter<S> {
    storage: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> BrowserAdapter<S> {
    /// Store records in `storage`
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    fn owner_column(&self) -> &'static str {
        Dialect::browser().owner_column
    }

    fn load_checklists(&self) -> Result<Vec<Row>> {
        let Some(raw) = self.storage.get_item(CHECKLISTS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => Ok(values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect()),
            Err(e) => {
                tracing::warn!(key = CHECKLISTS_KEY, error = %e, "Stored checklists are corrupted, starting fresh");
                Ok(Vec::new())
            }
        }
    }

    fn save_checklists(&self, rows: Vec<Row>) -> Result<()> {
        let values: Vec<Value> = rows.into_iter().map(Value::Object).collect();
        self.storage
            .set_item(CHECKLISTS_KEY, &serde_json::to_string(&values)?)
    }

    fn load_profiles(&self) -> Result<Row> {
        let Some(raw) = self.storage.get_item(PROFILES_KEY)? else {
            return Ok(Row::new());
        };
        match serde_json::from_str::<Row>(&raw) {
            Ok(profiles) => Ok(profiles),
            Err(e) => {
                tracing::warn!(key = PROFILES_KEY, error = %e, "Stored profiles are corrupted, starting fresh");
                Ok(Row::new())
            }
        }
    }

    fn is_owned(&self, row: &Row, id: &RecordId, owner: &OwnerId) -> bool {
        codec::decode_id(row).as_ref() == Some(id)
            && row.get(self.owner_column()).and_then(Value::as_str) == Some(owner.as_str())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<S: KeyValueStore> RecordAdapter for BrowserAdapter<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Browser
    }

    fn dialect(&self) -> Dialect {
        Dialect::browser()
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Row>> {
        let summary_columns = codec::summary_columns(&self.dialect());
        let mut rows: Vec<Row> = self
            .load_checklists()?
            .into_iter()
            .filter(|r| r.get(self.owner_column()).and_then(Value::as_str) == Some(owner.as_str()))
            .map(|r| {
                r.into_iter()
                    .filter(|(k, _)| summary_columns.contains(k))
                    .collect::<Row>()
            })
            .collect();

        rows.sort_by_key(|r| {
            let created = codec::decode_timestamp(r.get(codec::CREATED_AT_COLUMN));
            let id = r.get(codec::ID_COLUMN).and_then(Value::as_i64).unwrap_or_default();
            Reverse((created, id))
        });
        Ok(rows)
    }

    async fn get(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>> {
        Ok(self
            .load_checklists()?
            .into_iter()
            .find(|r| self.is_owned(r, id, owner)))
    }

    async fn create(&self, row: EncodedChecklist, owner: &OwnerId) -> Result<RecordId> {
        let _guard = self.write_lock.lock();
        let mut rows = self.load_checklists()?;
        let next = rows
            .iter()
            .filter_map(|r| r.get(codec::ID_COLUMN).and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;

        let mut stored = merged(row);
        stored.insert(codec::ID_COLUMN.into(), Value::from(next));
        stored.insert(self.owner_column().into(), Value::String(owner.to_string()));
        rows.push(stored);
        self.save_checklists(rows)?;

        tracing::debug!(backend = "browser", id = next, owner = %owner, "Checklist created");
        Ok(RecordId::from(next))
    }

    async fn update(&self, id: &RecordId, row: EncodedChecklist, owner: &OwnerId) -> Result<()> {
        self.patch(id, merged(row), owner).await
    }

    async fn patch(&self, id: &RecordId, columns: Row, owner: &OwnerId) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut rows = self.load_checklists()?;
        let Some(target) = rows.iter_mut().find(|r| self.is_owned(r, id, owner)) else {
            tracing::debug!(backend = "browser", id = %id, "Write skipped: no owned row");
            return Ok(());
        };

        let owner_column = self.owner_column();
        target.extend(
            columns
                .into_iter()
                .filter(|(k, _)| k != codec::ID_COLUMN && k != owner_column),
        );
        self.save_checklists(rows)
    }

    async fn delete(&self, id: &RecordId, owner: &OwnerId) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut rows = self.load_checklists()?;
        let before = rows.len();
        rows.retain(|r| !self.is_owned(r, id, owner));
        if rows.len() != before {
            self.save_checklists(rows)?;
            tracing::debug!(backend = "browser", id = %id, "Checklist deleted");
        }
        Ok(())
    }

    async fn get_profile(&self, owner: &OwnerId) -> Result<Option<Row>> {
        Ok(self
            .load_profiles()?
            .remove(owner.as_str())
            .and_then(|v| match v {
                Value::Object(row) => Some(row),
                _ => None,
            }))
    }

    async fn upsert_profile(&self, owner: &OwnerId, profile: Row) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut profiles = self.load_profiles()?;
        profiles.insert(owner.to_string(), Value::Object(profile));
        self.storage
            .set_item(PROFILES_KEY, &serde_json::to_string(&profiles)?)
    }

    async fn find_owner_by_national_id(&self, national_id: &str) -> Result<Option<OwnerId>> {
        Ok(self
            .load_profiles()?
            .into_iter()
            .find(|(_, v)| {
                v.as_object()
                    .map(codec::decode_profile)
                    .and_then(|p| p.national_id)
                    .as_deref()
                    == Some(national_id)
            })
            .and_then(|(owner, _)| OwnerId::parse(&owner).ok()))
    }

    async fn local_owner_id(&self) -> Result<Option<OwnerId>> {
        let _guard = self.write_lock.lock();
        if let Some(existing) = self.storage.get_item(OWNER_KEY)? {
            if let Ok(owner) = OwnerId::parse(&existing) {
                return Ok(Some(owner));
            }
        }
        let generated = format!("user-{}", uuid::Uuid::new_v4().simple());
        self.storage.set_item(OWNER_KEY, &generated)?;
        tracing::info!(owner = %generated, "Generated local owner id");
        OwnerId::parse(&generated).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    fn owner(s: &str) -> OwnerId {
        OwnerId::parse(s).unwrap()
    }

    fn encoded(value: Value) -> EncodedChecklist {
        match value {
            Value::Object(core) => EncodedChecklist {
                core,
                photos: Row::new(),
            },
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn test_ids_increment_across_owners() {
        let adapter = BrowserAdapter::new(MemoryStorage::new());
        let a = adapter.create(encoded(json!({"nome": "a"})), &owner("u1")).await.unwrap();
        let b = adapter.create(encoded(json!({"nome": "b"})), &owner("u2")).await.unwrap();
        assert_eq!(a, RecordId::from(1));
        assert_eq!(b, RecordId::from(2));
    }

    #[tokio::test]
    async fn test_patch_cannot_reassign_owner_or_id() {
        let adapter = BrowserAdapter::new(MemoryStorage::new());
        let id = adapter.create(encoded(json!({"nome": "a"})), &owner("u1")).await.unwrap();

        let mut columns = Row::new();
        columns.insert("userId".into(), json!("u2"));
        columns.insert("id".into(), json!(99));
        columns.insert("nome".into(), json!("b"));
        adapter.patch(&id, columns, &owner("u1")).await.unwrap();

        let row = adapter.get(&id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(row["nome"], json!("b"));
        assert_eq!(row["id"], json!(1));
        assert!(adapter.get(&id, &owner("u2")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_array_is_treated_as_empty() {
        let storage = MemoryStorage::new();
        storage.set_item(CHECKLISTS_KEY, "[{\"id\": 1,").unwrap();
        let adapter = BrowserAdapter::new(storage);

        assert!(adapter.list(&owner("u1")).await.unwrap().is_empty());
        let id = adapter.create(encoded(json!({"nome": "a"})), &owner("u1")).await.unwrap();
        assert_eq!(id, RecordId::from(1));
    }

    #[tokio::test]
    async fn test_list_projects_summary_columns() {
        let adapter = BrowserAdapter::new(MemoryStorage::new());
        adapter
            .create(
                encoded(json!({"nome": "a", "senhaWifi": "secret", "created_at": 5, "updated_at": 5})),
                &owner("u1"),
            )
            .await
            .unwrap();
        let rows = adapter.list(&owner("u1")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("senhaWifi").is_none());
        assert_eq!(rows[0]["nome"], json!("a"));
    }

    #[tokio::test]
    async fn test_local_owner_id_is_persisted() {
        let adapter = BrowserAdapter::new(MemoryStorage::new());
        let first = adapter.local_owner_id().await.unwrap().unwrap();
        let second = adapter.local_owner_id().await.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            adapter.storage.get_item(OWNER_KEY).unwrap().as_deref(),
            Some(first.as_str())
        );
    }
}
