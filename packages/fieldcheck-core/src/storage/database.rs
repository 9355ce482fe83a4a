//! # Database
//!
//! SQLite wrapper for the embedded backend.
//!
//! ## Database Operations
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DATABASE OPERATIONS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │ EmbeddedAdapter │  Record-store contract                            │
//! │  └────────┬────────┘                                                   │
//! │           │  JSON rows                                                 │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    Database     │  High-level API                                   │
//! │  │   (this file)   │  - Checklists, owner-scoped                       │
//! │  │                 │  - Profiles                                       │
//! │  │                 │  - Meta (local owner id)                          │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │    rusqlite     │  One connection behind a mutex                    │
//! │  └────────┬────────┘                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  ┌─────────────────┐                                                   │
//! │  │   SQLite DB     │  - In-memory for tests                            │
//! │  │                 │  - File for production                            │
//! │  └─────────────────┘                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows cross this layer as flat JSON objects so that the field codec stays
//! the only place that knows column names. Statements are assembled from
//! those objects, so every identifier is checked against
//! [`schema::CHECKLIST_COLUMNS`] and double-quoted before it reaches SQL.

use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::schema;
use crate::codec::Row;
use crate::error::{Error, Result};

/// The embedded database handle
#[derive(Clone)]
pub struct Database {
    /// The underlying SQLite connection
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create a database
    ///
    /// If path is None, creates an in-memory database (useful for testing).
    pub async fn open(path: Option<&Path>) -> Result<Self> {
        let conn = match path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::StorageWriteError(format!("{}: {}", parent.display(), e)))?;
                }
                Connection::open(p)
                    .map_err(|e| Error::DatabaseError(format!("Failed to open database: {}", e)))?
            }
            None => Connection::open_in_memory().map_err(|e| {
                Error::DatabaseError(format!("Failed to create in-memory database: {}", e))
            })?,
        };

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Create missing tables, add columns introduced after the first release
    /// and hand owner-less rows to the local owner
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(schema::CREATE_TABLES)
            .map_err(|e| Error::DatabaseError(format!("Failed to create tables: {}", e)))?;

        let existing = table_columns(&conn, schema::CHECKLISTS_TABLE)?;
        for (column, sql_type) in schema::LATER_COLUMNS {
            if existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
                continue;
            }
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN \"{}\" {} DEFAULT NULL",
                schema::CHECKLISTS_TABLE,
                column,
                sql_type
            ))
            .map_err(|e| Error::DatabaseError(format!("Failed to add column {}: {}", column, e)))?;
            tracing::info!(column = *column, "Added missing checklist column");
        }

        conn.execute_batch(schema::CREATE_INDEXES)
            .map_err(|e| Error::DatabaseError(format!("Failed to create indexes: {}", e)))?;

        let orphans: i64 = conn.query_row(
            "SELECT COUNT(*) FROM checklists WHERE \"userId\" IS NULL OR \"userId\" = ''",
            [],
            |row| row.get(0),
        )?;
        if orphans > 0 {
            let owner = ensure_local_owner(&conn)?;
            conn.execute(
                "UPDATE checklists SET \"userId\" = ?1 WHERE \"userId\" IS NULL OR \"userId\" = ''",
                params![owner],
            )?;
            tracing::info!(adopted = orphans, owner = %owner, "Adopted checklists written without an owner");
        }

        tracing::debug!(columns = existing.len(), "Database schema ready");
        Ok(())
    }

    // ========================================================================
    // CHECKLIST OPERATIONS
    // ========================================================================

    /// List an owner's checklists, newest first
    ///
    /// Only the columns needed for a summary are read.
    pub fn list_checklists(&self, owner: &str) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        query_rows(
            &conn,
            "SELECT id, nome, created_at, updated_at FROM checklists
             WHERE \"userId\" = ?1
             ORDER BY created_at DESC, id DESC",
            params![owner],
        )
    }

    /// Get one checklist if it exists and belongs to `owner`
    pub fn get_checklist(&self, id: i64, owner: &str) -> Result<Option<Row>> {
        let conn = self.conn.lock();
        let mut rows = query_rows(
            &conn,
            "SELECT * FROM checklists WHERE id = ?1 AND \"userId\" = ?2",
            params![id, owner],
        )?;
        Ok(rows.pop())
    }

    /// Insert a checklist owned by `owner` and return its id
    pub fn insert_checklist(&self, columns: &Row, owner: &str) -> Result<i64> {
        let (names, mut values) = writable_columns(columns);
        let mut quoted: Vec<String> = names.iter().map(|n| quote(n)).collect();
        quoted.push(quote(schema::OWNER_COLUMN));
        values.push(SqlValue::Text(owner.to_string()));

        let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO checklists ({}) VALUES ({})",
            quoted.join(", "),
            placeholders.join(", ")
        );

        let conn = self.conn.lock();
        conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(conn.last_insert_rowid())
    }

    /// Set the given columns on an owned checklist
    ///
    /// Returns `false` when no row matched (absent or owned by someone else).
    pub fn update_checklist(&self, id: i64, columns: &Row, owner: &str) -> Result<bool> {
        let (names, mut values) = writable_columns(columns);
        if names.is_empty() {
            return Ok(false);
        }

        let assignments: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, n)| format!("{} = ?{}", quote(n), i + 1))
            .collect();
        let sql = format!(
            "UPDATE checklists SET {} WHERE id = ?{} AND \"userId\" = ?{}",
            assignments.join(", "),
            values.len() + 1,
            values.len() + 2
        );
        values.push(SqlValue::Integer(id));
        values.push(SqlValue::Text(owner.to_string()));

        let conn = self.conn.lock();
        let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(rows > 0)
    }

    /// Delete an owned checklist
    pub fn delete_checklist(&self, id: i64, owner: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM checklists WHERE id = ?1 AND \"userId\" = ?2",
            params![id, owner],
        )?;
        Ok(rows > 0)
    }

    // ========================================================================
    // PROFILE OPERATIONS
    // ========================================================================

    /// Get the profile of `owner`
    pub fn get_profile(&self, owner: &str) -> Result<Option<Row>> {
        let conn = self.conn.lock();
        let mut rows = query_rows(
            &conn,
            "SELECT first_name, last_name, phone, cpf FROM profiles WHERE owner_id = ?1",
            params![owner],
        )?;
        Ok(rows.pop())
    }

    /// Insert or replace the profile of `owner`
    pub fn upsert_profile(&self, owner: &str, profile: &Row) -> Result<()> {
        let text = |key: &str| profile.get(key).and_then(Value::as_str).map(str::to_string);
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO profiles (owner_id, first_name, last_name, phone, cpf, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(owner_id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                phone = excluded.phone,
                cpf = excluded.cpf,
                updated_at = excluded.updated_at",
            params![
                owner,
                text("first_name"),
                text("last_name"),
                text("phone"),
                text("cpf"),
                crate::time::now_timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Owner whose profile carries the given national id digits
    pub fn find_owner_by_national_id(&self, digits: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let owner = conn
            .query_row(
                "SELECT owner_id FROM profiles WHERE cpf = ?1 ORDER BY updated_at DESC LIMIT 1",
                params![digits],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    // ========================================================================
    // META
    // ========================================================================

    /// Owner id generated for this device, created on first call
    pub fn local_owner_id(&self) -> Result<String> {
        let conn = self.conn.lock();
        ensure_local_owner(&conn)
    }

    /// Read a meta value
    pub fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        get_meta(&conn, key)
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> = conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value.flatten().filter(|v| !v.is_empty()))
}

fn ensure_local_owner(conn: &Connection) -> Result<String> {
    if let Some(existing) = get_meta(conn, schema::META_LOCAL_OWNER)? {
        return Ok(existing);
    }
    let generated = format!("user-{}", uuid::Uuid::new_v4().simple());
    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES (?1, ?2)",
        params![schema::META_LOCAL_OWNER, generated],
    )?;
    tracing::info!(owner = %generated, "Generated local owner id");
    get_meta(conn, schema::META_LOCAL_OWNER)?
        .ok_or_else(|| Error::DatabaseError("local owner id was not persisted".into()))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Split a JSON row into known column names and SQL values
///
/// The owner column is never taken from the caller.
fn writable_columns(columns: &Row) -> (Vec<&str>, Vec<SqlValue>) {
    let mut names = Vec::with_capacity(columns.len());
    let mut values = Vec::with_capacity(columns.len() + 2);
    for (name, value) in columns {
        if name == schema::OWNER_COLUMN {
            tracing::debug!(column = %name, "Owner column set by the store, caller value dropped");
            continue;
        }
        if !schema::is_checklist_column(name) {
            tracing::warn!(column = %name, "Ignoring unknown checklist column");
            continue;
        }
        names.push(name.as_str());
        values.push(json_to_sql(value));
    }
    (names, values)
}

fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    }
}

fn query_rows(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params, |row| {
            let mut out = Row::new();
            for (i, name) in names.iter().enumerate() {
                out.insert(name.clone(), sql_to_json(row.get_ref(i)?));
            }
            Ok(out)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
