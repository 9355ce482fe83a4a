//! FieldCheck CLI
//!
//! Drives the record store from a terminal: list and edit checklists,
//! attach or export photos, and manage the technician profile. Every
//! command goes through the same `RecordStore` contract the apps use, so
//! the backend is whatever the flags (or `FIELDCHECK_*` variables) select.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use fieldcheck_core::config::normalize_url;
use fieldcheck_core::{BackendPreference, RecordId, RemoteConfig, StoreConfig};

// ── CLI Arguments ─────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fieldcheck", version, about = "FieldCheck installation checklists")]
struct Cli {
    /// Backend to use: auto, remote, embedded or browser
    #[arg(long, default_value_t = BackendPreference::Auto, env = "FIELDCHECK_BACKEND")]
    backend: BackendPreference,

    /// SQLite file for the embedded backend
    #[arg(long, value_name = "PATH", env = "FIELDCHECK_DATABASE")]
    database: Option<PathBuf>,

    /// JSON file standing in for browser storage
    #[arg(long, value_name = "PATH", env = "FIELDCHECK_KV_FILE")]
    kv: Option<PathBuf>,

    /// Base URL of the remote service
    #[arg(long, env = "FIELDCHECK_REMOTE_URL")]
    remote_url: Option<String>,

    /// API key for the remote service
    #[arg(long, env = "FIELDCHECK_REMOTE_KEY", hide_env_values = true)]
    remote_key: Option<String>,

    /// Signed-in session token for the remote service
    #[arg(long, env = "FIELDCHECK_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Remote boolean columns are native booleans rather than integers
    #[arg(long, env = "FIELDCHECK_NATIVE_BOOLEANS")]
    native_booleans: bool,

    /// Owner id to act as; defaults to this device's local owner
    #[arg(long, env = "FIELDCHECK_OWNER")]
    owner: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the owner's checklists, newest first
    List,
    /// Print one checklist as JSON
    Show {
        id: String,
        /// Include durable photo payloads in full
        #[arg(long)]
        with_photos: bool,
    },
    /// Create a checklist from a JSON file
    Create {
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Replace a checklist's fields from a JSON file
    Update {
        id: String,
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
    },
    /// Delete a checklist
    Delete { id: String },
    /// Photo slots of a checklist
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// The technician profile
    #[command(subcommand)]
    Profile(ProfileCommand),
    /// Show the selected backend and the acting owner
    Whoami,
}

#[derive(Subcommand, Debug)]
enum PhotoCommand {
    /// Store an image file in a photo slot
    Attach {
        id: String,
        /// cto, house-front, installation or mac-label
        field: String,
        path: PathBuf,
    },
    /// Empty a photo slot
    Clear { id: String, field: String },
    /// Write a photo to disk (or print its URL)
    Export {
        id: String,
        field: String,
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Print the owner's profile
    Show,
    /// Update profile fields; omitted fields keep their value
    Set {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        cpf: Option<String>,
    },
    /// Find the owner registered under a CPF
    Find { cpf: String },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        let remote = RemoteConfig {
            url: self.remote_url.as_deref().and_then(normalize_url),
            api_key: non_blank(self.remote_key.as_deref()),
            access_token: non_blank(self.access_token.as_deref()),
            native_booleans: self.native_booleans,
        };

        let database_path = match self.backend {
            BackendPreference::Auto | BackendPreference::Embedded => {
                self.database.clone().or_else(|| default_path("fieldcheck.sqlite3"))
            }
            _ => self.database.clone(),
        };
        let kv_path = match self.backend {
            BackendPreference::Browser => self.kv.clone().or_else(|| default_path("storage.json")),
            _ => self.kv.clone(),
        };

        StoreConfig {
            backend: self.backend,
            database_path,
            kv_path,
            remote,
        }
    }
}

fn default_path(file: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|base| base.join("fieldcheck").join(file))
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

// ── Entry Point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldcheck_core=info,fieldcheck_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = fieldcheck_core::RecordStore::initialize(cli.store_config()).await?;
    let owner = commands::resolve_owner(&store, cli.owner.as_deref()).await;
    tracing::debug!(backend = %store.backend(), owner = ?owner.as_ref().ok(), "Store ready");

    match cli.command {
        Command::List => commands::list(&store, &owner?).await,
        Command::Show { id, with_photos } => {
            commands::show(&store, &RecordId::new(id), &owner?, with_photos).await
        }
        Command::Create { file } => commands::create(&store, &file, &owner?).await,
        Command::Update { id, file } => {
            commands::update(&store, &RecordId::new(id), &file, &owner?).await
        }
        Command::Delete { id } => commands::delete(&store, &RecordId::new(id), &owner?).await,
        Command::Photo(PhotoCommand::Attach { id, field, path }) => {
            commands::attach_photo(&store, &RecordId::new(id), &field, &path, &owner?).await
        }
        Command::Photo(PhotoCommand::Clear { id, field }) => {
            commands::clear_photo(&store, &RecordId::new(id), &field, &owner?).await
        }
        Command::Photo(PhotoCommand::Export { id, field, out }) => {
            commands::export_photo(&store, &RecordId::new(id), &field, out.as_deref(), &owner?)
                .await
        }
        Command::Profile(ProfileCommand::Show) => commands::show_profile(&store, &owner?).await,
        Command::Profile(ProfileCommand::Set {
            first_name,
            last_name,
            phone,
            cpf,
        }) => {
            let changes = commands::ProfileChanges {
                first_name,
                last_name,
                phone,
                national_id: cpf,
            };
            commands::set_profile(&store, &owner?, changes).await
        }
        Command::Profile(ProfileCommand::Find { cpf }) => commands::find_owner(&store, &cpf).await,
        Command::Whoami => commands::whoami(&store, owner.ok()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_explicit_embedded_database() {
        let cli = Cli::try_parse_from([
            "fieldcheck",
            "--backend",
            "embedded",
            "--database",
            "/tmp/fc.db",
            "list",
        ])
        .unwrap();
        let config = cli.store_config();
        assert_eq!(config.backend, BackendPreference::Embedded);
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/fc.db")));
        assert!(!config.remote.is_ready());
    }

    #[test]
    fn test_remote_flags_build_remote_config() {
        let cli = Cli::try_parse_from([
            "fieldcheck",
            "--backend",
            "remote",
            "--remote-url",
            "https://abc.example.co/",
            "--remote-key",
            "anon",
            "--owner",
            "u1",
            "photo",
            "clear",
            "7",
            "cto",
        ])
        .unwrap();
        let config = cli.store_config();
        assert_eq!(config.remote.url.as_deref(), Some("https://abc.example.co"));
        assert!(config.remote.is_ready());
        assert!(config.database_path.is_none());
        assert!(matches!(
            cli.command,
            Command::Photo(PhotoCommand::Clear { ref id, ref field }) if id == "7" && field == "cto"
        ));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        assert!(Cli::try_parse_from(["fieldcheck", "--backend", "cloud", "list"]).is_err());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(Some(" k ")).as_deref(), Some("k"));
    }
}
