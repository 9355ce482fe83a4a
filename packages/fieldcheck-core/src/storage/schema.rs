//! # Database Schema
//!
//! SQL schema definitions for the embedded checklist database.
//!
//! ## Schema Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         DATABASE SCHEMA                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌──────────────────────┐  ┌─────────────────┐  ┌─────────────────┐    │
//! │  │     checklists       │  │      meta       │  │    profiles     │    │
//! │  ├──────────────────────┤  ├─────────────────┤  ├─────────────────┤    │
//! │  │ id (autoincrement)   │  │ key             │  │ owner_id (PK)   │    │
//! │  │ nome, ruaNumero, ... │  │ value           │  │ first_name      │    │
//! │  │ possuiSplitter  0/1/∅│  └─────────────────┘  │ last_name       │    │
//! │  │ fotoCto ...          │                       │ phone           │    │
//! │  │ fotoCtoDataUri ...   │  ◄── added later      │ cpf             │    │
//! │  │ userId               │  ◄── added later      │ updated_at      │    │
//! │  │ created_at (ms)      │                       └─────────────────┘    │
//! │  │ updated_at (ms)      │                                               │
//! │  └──────────────────────┘                                               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Databases written by older builds lack the columns marked "added later".
//! They are detected with `PRAGMA table_info` and added in place, so the
//! schema is never dropped or rebuilt.

/// Checklist table name
pub const CHECKLISTS_TABLE: &str = "checklists";

/// Owner column on the checklist table
pub const OWNER_COLUMN: &str = "userId";

/// Meta key holding the locally generated owner id
pub const META_LOCAL_OWNER: &str = "userId";

/// Create every table that does not exist yet
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT
);

CREATE TABLE IF NOT EXISTS checklists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    nome TEXT,
    ruaNumero TEXT,
    locClienteLink TEXT,
    locCtoLink TEXT,
    fotoCto TEXT,
    corFibra TEXT,
    possuiSplitter INTEGER,
    portaCliente TEXT,
    locCasaLink TEXT,
    fotoFrenteCasa TEXT,
    fotoInstalacao TEXT,
    fotoMacEquip TEXT,
    nomeWifi TEXT,
    senhaWifi TEXT,
    testeNavegacaoOk INTEGER,
    clienteSatisfeito INTEGER,
    fotoCtoDataUri TEXT,
    fotoFrenteCasaDataUri TEXT,
    fotoInstalacaoDataUri TEXT,
    fotoMacEquipDataUri TEXT,
    userId TEXT,
    created_at INTEGER,
    updated_at INTEGER
);

CREATE TABLE IF NOT EXISTS profiles (
    owner_id TEXT PRIMARY KEY NOT NULL,
    first_name TEXT,
    last_name TEXT,
    phone TEXT,
    cpf TEXT,
    updated_at INTEGER
);
"#;

/// Indexes, created after migration so that `userId` is guaranteed to exist
pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_checklists_owner_created
    ON checklists(userId, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_profiles_cpf ON profiles(cpf);
"#;

/// Columns that older databases may be missing, with their SQL type
pub const LATER_COLUMNS: &[(&str, &str)] = &[
    ("fotoCtoDataUri", "TEXT"),
    ("fotoFrenteCasaDataUri", "TEXT"),
    ("fotoInstalacaoDataUri", "TEXT"),
    ("fotoMacEquipDataUri", "TEXT"),
    ("userId", "TEXT"),
];

/// Every writable checklist column
pub const CHECKLIST_COLUMNS: &[&str] = &[
    "nome",
    "ruaNumero",
    "locClienteLink",
    "locCtoLink",
    "fotoCto",
    "corFibra",
    "possuiSplitter",
    "portaCliente",
    "locCasaLink",
    "fotoFrenteCasa",
    "fotoInstalacao",
    "fotoMacEquip",
    "nomeWifi",
    "senhaWifi",
    "testeNavegacaoOk",
    "clienteSatisfeito",
    "fotoCtoDataUri",
    "fotoFrenteCasaDataUri",
    "fotoInstalacaoDataUri",
    "fotoMacEquipDataUri",
    "userId",
    "created_at",
    "updated_at",
];

/// Whether `column` may appear in a generated statement
pub fn is_checklist_column(column: &str) -> bool {
    CHECKLIST_COLUMNS.contains(&column)
}
