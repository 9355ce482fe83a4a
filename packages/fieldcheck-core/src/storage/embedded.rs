//! Embedded SQLite adapter.

use async_trait::async_trait;

use super::{merged, BackendKind, Database, RecordAdapter};
use crate::codec::{Dialect, EncodedChecklist, Row};
use crate::error::Result;
use crate::model::{OwnerId, RecordId};

/// Record adapter over the on-device [`Database`]
#[derive(Clone)]
pub struct EmbeddedAdapter {
    db: Database,
}

impl EmbeddedAdapter {
    /// Wrap an open database
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// SQLite ids are integers; anything else addresses no row
fn row_id(id: &RecordId) -> Option<i64> {
    id.as_str().parse().ok()
}

#[async_trait]
impl RecordAdapter for EmbeddedAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Embedded
    }

    fn dialect(&self) -> Dialect {
        Dialect::embedded()
    }

    async fn list(&self, owner: &OwnerId) -> Result<Vec<Row>> {
        self.db.list_checklists(owner.as_str())
    }

    async fn get(&self, id: &RecordId, owner: &OwnerId) -> Result<Option<Row>> {
        match row_id(id) {
            Some(id) => self.db.get_checklist(id, owner.as_str()),
            None => Ok(None),
        }
    }

    async fn create(&self, row: EncodedChecklist, owner: &OwnerId) -> Result<RecordId> {
        let id = self.db.insert_checklist(&merged(row), owner.as_str())?;
        tracing::debug!(backend = "embedded", id, owner = %owner, "Checklist created");
        Ok(RecordId::from(id))
    }

    async fn update(&self, id: &RecordId, row: EncodedChecklist, owner: &OwnerId) -> Result<()> {
        self.patch(id, merged(row), owner).await
    }

    async fn patch(&self, id: &RecordId, columns: Row, owner: &OwnerId) -> Result<()> {
        let Some(rowid) = row_id(id) else {
            return Ok(());
        };
        let changed = self.db.update_checklist(rowid, &columns, owner.as_str())?;
        tracing::debug!(backend = "embedded", id = rowid, changed, "Checklist columns written");
        Ok(())
    }

    async fn delete(&self, id: &RecordId, owner: &OwnerId) -> Result<()> {
        if let Some(rowid) = row_id(id) {
            let removed = self.db.delete_checklist(rowid, owner.as_str())?;
            tracing::debug!(backend = "embedded", id = rowid, removed, "Checklist delete");
        }
        Ok(())
    }

    async fn get_profile(&self, owner: &OwnerId) -> Result<Option<Row>> {
        self.db.get_profile(owner.as_str())
    }

    async fn upsert_profile(&self, owner: &OwnerId, profile: Row) -> Result<()> {
        self.db.upsert_profile(owner.as_str(), &profile)
    }

    async fn find_owner_by_national_id(&self, national_id: &str) -> Result<Option<OwnerId>> {
        Ok(self
            .db
            .find_owner_by_national_id(national_id)?
            .and_then(|o| OwnerId::parse(&o).ok()))
    }

    async fn local_owner_id(&self) -> Result<Option<OwnerId>> {
        OwnerId::parse(&self.db.local_owner_id()?).map(Some)
    }
}
