//! # Remote Adapter
//!
//! Checklists and profiles in a remote relational service, reached through a
//! [`RestTransport`].
//!
//! ## Two-Phase Create
//!
//! ```text
//!  create(row, owner)
//!    │
//!    ├─ 1. INSERT core columns + user_id ──▶ id        (failure = error)
//!    │
//!    └─ 2. for each photo column with a payload:
//!            PATCH id, owner, {column: payload}         (failure = warn)
//! ```
//!
//! Photo payloads are large, so each travels in its own request after the
//! record exists. A follow-up that fails leaves the record in place without
//! that photo; `create` still reports success with the new id.
//!
//! ## Unconfigured Service
//!
//! Without a URL and key the adapter still exists so the rest of the app can
//! run: reads come back empty, writes and profile calls fail with
//! [`Error::NotConfigured`].

use async_trait::async_trait;
use std::sync::Arc;

use super::rest::{HttpTransport, RestQuery, RestTransport};
use super::{merged, BackendKind, RecordAdapter};
use crate::codec::{self, Dialect, EncodedChecklist, Row};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::{OwnerId, RecordId};

const CHECKLISTS_TABLE: &str = "checklists";
const USERS_TABLE: &str = "users";

/// Record adapter over the remote REST service
pub struct RemoteAdapter {
    transport: Option<Arc<dyn RestTransport>>,
    dialect: Dialect,
}

impl RemoteAdapter {
    /// Connect with `config`; missing settings give an unconfigured adapter
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        if !config.is_ready() {
            tracing::warn!("Remote backend selected without URL and key; reads return nothing");
            return Ok(Self::unconfigured(config.native_booleans));
        }
        let transport: Arc<dyn RestTransport> = Arc::new(HttpTransport::new(config)?);
        Ok(Self::with_transport(transport, config.native_booleans))
    }

    /// Use an existing transport
    pub fn with_transport(transport: Arc<dyn RestTransport>, native_booleans: bool) -> Self {
        Self {
            transport: Some(transport),
            dialect: Dialect::remote(native_booleans),
        }
    }

    /// An adapter with no service behind it
    pub fn unconfigured(native_booleans: bool) -> Self {
        Self {
            transport: None,
            dialect: Dialect::remote(native_booleans),
        }
    }

    /// Whether a service is configured
    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    fn client(&self) -> Result<&dyn RestTransport> {
        self.transport
            .as_deref()
            .ok_or_else(|| Error::NotConfigured("remote URL and API key are not set".into()))
    }

    fn owned(&self, id: &RecordId, owner: &OwnerId) -> RestQuery {
        RestQuery::new()
            .eq(codec::ID_COLUMN, id.as_str())
            .eq(self.dialect.owner_column, owner.as_str())
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl RecordAdapter for RemoteAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Row>> {
        let Some(client) = self.transport.as_deref() else {
            return Ok(Vec::new());
        };
        let query = RestQuery::new()
            .select(codec::summary_columns(&self.dialect))
            .eq(self.dialect.owner_column, owner.as_str())
            .order_desc(codec::CREATED_AT_COLUMN)
            .order_desc(codec::ID_COLUMN);
        client.select(CHECKLISTS_TABLE, &query).await
    }

    async fn get(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>> {
        let Some(client) = self.transport.as_deref() else {
            return Ok(None);
        };
        let rows = client
            .select(CHECKLISTS_TABLE, &self.owned(id, owner).limit(1))
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn get_photos(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>> {
        let Some(client) = self.transport.as_deref() else {
            return Ok(None);
        };
        let mut columns = vec![codec::ID_COLUMN.to_string()];
        columns.extend(codec::photo_columns(&self.dialect));
        let query = self.owned(id, owner).select(columns).limit(1);
        Ok(client.select(CHECKLISTS_TABLE, &query).await?.into_iter().next())
    }

    async fn create(&self, row: EncodedChecklist, owner: &OwnerId) -> Result<RecordId> {
        let client = self.client()?;
        let EncodedChecklist { mut core, photos } = row;
        core.insert(
            self.dialect.owner_column.to_string(),
            owner.to_string().into(),
        );

        let stored = client.insert(CHECKLISTS_TABLE, core).await?;
        let id = codec::decode_id(&stored).ok_or_else(|| {
            Error::SerializationError("remote insert returned a row without id".into())
        })?;
        tracing::debug!(backend = "remote", id = %id, owner = %owner, "Checklist created");

        let query = self.owned(&id, owner);
        for (column, value) in photos {
            let mut single = Row::new();
            single.insert(column.clone(), value);
            match client.update(CHECKLISTS_TABLE, &query, single).await {
                Ok(0) => {
                    tracing::warn!(backend = "remote", id = %id, column = %column, "Photo follow-up matched no row");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        backend = "remote",
                        id = %id,
                        column = %column,
                        error = %e,
                        "Photo follow-up failed; record kept without it"
                    );
                }
            }
        }

        Ok(id)
    }

    async fn update(&self, id: &RecordId, row: EncodedChecklist, owner: &OwnerId) -> Result<()> {
        self.patch(id, merged(row), owner).await
    }

    async fn patch(&self, id: &RecordId, mut columns: Row, owner: &OwnerId) -> Result<()> {
        let client = self.client()?;
        columns.remove(codec::ID_COLUMN);
        columns.remove(self.dialect.owner_column);
        let changed = client
            .update(CHECKLISTS_TABLE, &self.owned(id, owner), columns)
            .await?;
        tracing::debug!(backend = "remote", id = %id, changed, "Checklist columns written");
        Ok(())
    }

    async fn delete(&self, id: &RecordId, owner: &OwnerId) -> Result<()> {
        let removed = self
            .client()?
            .delete(CHECKLISTS_TABLE, &self.owned(id, owner))
            .await?;
        tracing::debug!(backend = "remote", id = %id, removed, "Checklist delete");
        Ok(())
    }

    async fn get_profile(&self, owner: &OwnerId) -> Result<Option<Row>> {
        let query = RestQuery::new()
            .eq(codec::ID_COLUMN, owner.as_str())
            .limit(1);
        Ok(self
            .client()?
            .select(USERS_TABLE, &query)
            .await?
            .into_iter()
            .next())
    }

    async fn upsert_profile(&self, owner: &OwnerId, mut profile: Row) -> Result<()> {
        let client = self.client()?;
        profile.insert(codec::ID_COLUMN.to_string(), owner.to_string().into());
        client.upsert(USERS_TABLE, profile, codec::ID_COLUMN).await
    }

    async fn find_owner_by_national_id(&self, national_id: &str) -> Result<Option<OwnerId>> {
        let query = RestQuery::new()
            .select([codec::ID_COLUMN])
            .eq(codec::PROFILE_NATIONAL_ID, national_id)
            .limit(1);
        let rows = self.client()?.select(USERS_TABLE, &query).await?;
        Ok(rows
            .first()
            .and_then(codec::decode_id)
            .and_then(|id| OwnerId::parse(id.as_str()).ok()))
    }

    async fn local_owner_id(&self) -> Result<Option<OwnerId>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fake::MemoryTransport;
    use serde_json::{json, Value};

    fn owner(s: &str) -> OwnerId {
        OwnerId::parse(s).unwrap()
    }

    fn object(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn adapter() -> (Arc<MemoryTransport>, RemoteAdapter) {
        let transport = Arc::new(MemoryTransport::new());
        let adapter = RemoteAdapter::with_transport(transport.clone(), false);
        (transport, adapter)
    }

    fn with_photo() -> EncodedChecklist {
        EncodedChecklist {
            core: object(json!({"nome": "Ana Silva", "corfibra": "azul"})),
            photos: object(json!({
                "fotoctodatauri": "data:image/jpeg;base64,AA",
                "fotomacequipdatauri": "data:image/png;base64,BB",
            })),
        }
    }

    #[tokio::test]
    async fn test_two_phase_create_writes_photos_separately() {
        let (transport, adapter) = adapter();
        let id = adapter.create(with_photo(), &owner("u1")).await.unwrap();

        let rows = transport.rows(CHECKLISTS_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["user_id"], json!("u1"));
        assert_eq!(rows[0]["fotoctodatauri"], json!("data:image/jpeg;base64,AA"));

        let photos = adapter.get_photos(&id, &owner("u1")).await.unwrap().unwrap();
        assert!(photos.get("nome").is_none());
        assert_eq!(photos["fotomacequipdatauri"], json!("data:image/png;base64,BB"));
    }

    #[tokio::test]
    async fn test_create_survives_failing_photo_follow_ups() {
        let (transport, adapter) = adapter();
        transport.fail_updates(true);

        let id = adapter.create(with_photo(), &owner("u1")).await.unwrap();
        let row = adapter.get(&id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(row["nome"], json!("Ana Silva"));
        assert!(row.get("fotoctodatauri").is_none());
    }

    #[tokio::test]
    async fn test_foreign_owner_sees_nothing() {
        let (_, adapter) = adapter();
        let id = adapter.create(with_photo(), &owner("u1")).await.unwrap();

        assert!(adapter.get(&id, &owner("u2")).await.unwrap().is_none());
        adapter
            .patch(&id, object(json!({"nome": "hijacked"})), &owner("u2"))
            .await
            .unwrap();
        adapter.delete(&id, &owner("u2")).await.unwrap();

        let row = adapter.get(&id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(row["nome"], json!("Ana Silva"));
    }

    #[tokio::test]
    async fn test_unconfigured_reads_empty_writes_fail() {
        let adapter = RemoteAdapter::unconfigured(false);
        let o = owner("u1");
        let id = RecordId::from(1);

        assert!(!adapter.is_configured());
        assert!(adapter.list(&o).await.unwrap().is_empty());
        assert!(adapter.get(&id, &o).await.unwrap().is_none());
        assert!(adapter.get_photos(&id, &o).await.unwrap().is_none());
        assert!(matches!(
            adapter.create(EncodedChecklist::default(), &o).await,
            Err(Error::NotConfigured(_))
        ));
        assert!(matches!(adapter.delete(&id, &o).await, Err(Error::NotConfigured(_))));
        assert!(matches!(adapter.get_profile(&o).await, Err(Error::NotConfigured(_))));
        assert_eq!(adapter.local_owner_id().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_profiles_live_in_users_table() {
        let (transport, adapter) = adapter();
        adapter
            .upsert_profile(
                &owner("u1"),
                object(json!({"first_name": "Ana", "last_name": "Silva", "phone": "(11) 3333-4444", "cpf": "12345678901"})),
            )
            .await
            .unwrap();

        let users = transport.rows(USERS_TABLE);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["id"], json!("u1"));

        let profile = adapter.get_profile(&owner("u1")).await.unwrap().unwrap();
        assert_eq!(profile["first_name"], json!("Ana"));
        assert_eq!(
            adapter.find_owner_by_national_id("12345678901").await.unwrap(),
            Some(owner("u1"))
        );
        assert_eq!(adapter.find_owner_by_national_id("000").await.unwrap(), None);
    }
}
