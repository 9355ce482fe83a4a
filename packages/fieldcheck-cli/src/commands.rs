//! Command implementations
//!
//! Each function takes the initialized store plus the acting owner and
//! prints to stdout; logs go to stderr.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use fieldcheck_core::photo::parse_data_uri;
use fieldcheck_core::{
    resolve_for_display, ChecklistRecord, OwnerId, PhotoField, RecordId, RecordStore,
    StoredChecklist, UserProfile,
};

/// Owner from the flag, else the backend's local owner
pub async fn resolve_owner(store: &RecordStore, flag: Option<&str>) -> Result<String> {
    if let Some(owner) = flag {
        return Ok(OwnerId::parse(owner)?.to_string());
    }
    match store.local_owner_id().await? {
        Some(owner) => Ok(owner.to_string()),
        None => bail!("the {} backend has no local owner; pass --owner", store.backend()),
    }
}

fn parse_field(name: &str) -> Result<PhotoField> {
    PhotoField::parse(name).ok_or_else(|| {
        let known: Vec<&str> = PhotoField::ALL.iter().map(|f| f.as_str()).collect();
        eyre!("unknown photo field '{name}' (expected one of {})", known.join(", "))
    })
}

async fn read_record(file: &Path) -> Result<ChecklistRecord> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .wrap_err_with(|| format!("reading {}", file.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("parsing {}", file.display()))
}

async fn require(store: &RecordStore, id: &RecordId, owner: &str) -> Result<StoredChecklist> {
    store
        .get(id, owner)
        .await?
        .ok_or_else(|| eyre!("checklist {id} not found"))
}

// ── Checklists ────────────────────────────────────────────────────────────────

pub async fn list(store: &RecordStore, owner: &str) -> Result<()> {
    let summaries = store.list(owner).await?;
    if summaries.is_empty() {
        println!("No checklists.");
        return Ok(());
    }
    for summary in summaries {
        let title = if summary.title.is_empty() {
            "(untitled)"
        } else {
            summary.title.as_str()
        };
        println!(
            "{:>8}  {}  {}",
            summary.id,
            summary.created_at.format("%Y-%m-%d %H:%M"),
            title
        );
    }
    Ok(())
}

pub async fn show(store: &RecordStore, id: &RecordId, owner: &str, with_photos: bool) -> Result<()> {
    let mut stored = require(store, id, owner).await?;
    if !with_photos {
        for field in PhotoField::ALL {
            let photo = stored.record.photos.get_mut(field);
            if let Some(durable) = photo.durable_image.as_mut() {
                *durable = format!("<{} bytes>", durable.len());
            }
        }
    }
    println!("{}", serde_json::to_string_pretty(&stored)?);
    if !stored.record.is_complete() {
        eprintln!("note: checklist is incomplete");
    }
    Ok(())
}

pub async fn create(store: &RecordStore, file: &Path, owner: &str) -> Result<()> {
    let record = read_record(file).await?;
    let id = store.create(&record, owner).await?;
    println!("{id}");
    Ok(())
}

pub async fn update(store: &RecordStore, id: &RecordId, file: &Path, owner: &str) -> Result<()> {
    let record = read_record(file).await?;
    require(store, id, owner).await?;
    store.update(id, &record, owner).await?;
    println!("Updated {id}");
    Ok(())
}

pub async fn delete(store: &RecordStore, id: &RecordId, owner: &str) -> Result<()> {
    store.delete(id, owner).await?;
    println!("Deleted {id}");
    Ok(())
}

// ── Photos ────────────────────────────────────────────────────────────────────

pub async fn attach_photo(
    store: &RecordStore,
    id: &RecordId,
    field: &str,
    path: &Path,
    owner: &str,
) -> Result<()> {
    let field = parse_field(field)?;
    require(store, id, owner).await?;

    let path = tokio::fs::canonicalize(path)
        .await
        .wrap_err_with(|| format!("resolving {}", path.display()))?;
    let bytes = tokio::fs::read(&path).await?;
    let device_uri = format!("file://{}", path.display());

    store
        .attach_photo(id, field, &device_uri, &BASE64.encode(bytes), owner)
        .await?;
    println!("Attached {} to {id}", field.as_str());
    Ok(())
}

pub async fn clear_photo(store: &RecordStore, id: &RecordId, field: &str, owner: &str) -> Result<()> {
    let field = parse_field(field)?;
    store.clear_photo(id, field, owner).await?;
    println!("Cleared {} on {id}", field.as_str());
    Ok(())
}

pub async fn export_photo(
    store: &RecordStore,
    id: &RecordId,
    field: &str,
    out: Option<&Path>,
    owner: &str,
) -> Result<()> {
    let field = parse_field(field)?;
    let stored = require(store, id, owner).await?;
    let Some(uri) = resolve_for_display(&stored.record, field).await else {
        bail!("checklist {id} has no {} photo", field.as_str());
    };

    match parse_data_uri(&uri) {
        Some((mime, payload)) => {
            let bytes = BASE64
                .decode(payload)
                .wrap_err("stored photo is not valid base64")?;
            let extension = if mime == "image/png" { "png" } else { "jpg" };
            let target = match out {
                Some(path) => path.to_path_buf(),
                None => format!("{id}-{}.{extension}", field.as_str()).into(),
            };
            tokio::fs::write(&target, bytes).await?;
            println!("{}", target.display());
        }
        // Remote URL, nothing to write
        None => println!("{uri}"),
    }
    Ok(())
}

// ── Profiles ──────────────────────────────────────────────────────────────────

/// Profile fields given on the command line
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub national_id: Option<String>,
}

impl ProfileChanges {
    fn apply(self, mut profile: UserProfile) -> UserProfile {
        if let Some(v) = self.first_name {
            profile.first_name = v;
        }
        if let Some(v) = self.last_name {
            profile.last_name = v;
        }
        if let Some(v) = self.phone {
            profile.phone = v;
        }
        if let Some(v) = self.national_id {
            profile.national_id = Some(v);
        }
        profile
    }
}

fn print_profile(profile: &UserProfile) {
    println!("Name:  {}", profile.display_name());
    println!("Phone: {}", fieldcheck_core::model::format_phone_br(&profile.phone));
    if let Some(cpf) = &profile.national_id {
        println!("CPF:   {}", fieldcheck_core::model::format_national_id(cpf));
    }
}

pub async fn show_profile(store: &RecordStore, owner: &str) -> Result<()> {
    match store.get_profile(owner).await? {
        Some(profile) => print_profile(&profile),
        None => println!("No profile for {owner}."),
    }
    Ok(())
}

pub async fn set_profile(store: &RecordStore, owner: &str, changes: ProfileChanges) -> Result<()> {
    let current = store.get_profile(owner).await?.unwrap_or_default();
    let updated = changes.apply(current);
    store.upsert_profile(owner, &updated).await?;
    print_profile(&updated.normalized());
    Ok(())
}

pub async fn find_owner(store: &RecordStore, cpf: &str) -> Result<()> {
    match store.find_owner_by_national_id(cpf).await? {
        Some(owner) => println!("{owner}"),
        None => println!("No owner registered under that CPF."),
    }
    Ok(())
}

pub fn whoami(store: &RecordStore, owner: Option<String>) -> Result<()> {
    let info = fieldcheck_core::build_info();
    println!("backend: {}", store.backend());
    println!("owner:   {}", owner.as_deref().unwrap_or("(none)"));
    println!("core:    {} ({}, {})", info.version, info.target, info.profile);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcheck_core::StoreConfig;

    async fn temp_store(dir: &tempfile::TempDir) -> RecordStore {
        RecordStore::open(&StoreConfig::embedded(dir.path().join("cli.db")))
            .await
            .unwrap()
    }

    #[test]
    fn test_parse_field_accepts_known_names() {
        assert_eq!(parse_field("house-front").unwrap(), PhotoField::HouseFront);
        let err = parse_field("roof").unwrap_err().to_string();
        assert!(err.contains("mac-label"));
    }

    #[test]
    fn test_profile_changes_keep_omitted_fields() {
        let current = UserProfile {
            first_name: "Ana".into(),
            last_name: "Silva".into(),
            phone: "11987654321".into(),
            national_id: None,
        };
        let changes = ProfileChanges {
            phone: Some("(21) 99999-0000".into()),
            ..Default::default()
        };
        let updated = changes.apply(current);
        assert_eq!(updated.first_name, "Ana");
        assert_eq!(updated.phone, "(21) 99999-0000");
    }

    #[tokio::test]
    async fn test_create_from_file_then_export_photo() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        let owner = resolve_owner(&store, None).await.unwrap();

        let file = dir.path().join("record.json");
        std::fs::write(&file, r#"{"customerName": "Ana Silva", "hasSplitter": true}"#).unwrap();
        let record = read_record(&file).await.unwrap();
        let id = store.create(&record, &owner).await.unwrap();

        let image = dir.path().join("cto.jpg");
        std::fs::write(&image, b"not really a jpeg").unwrap();
        attach_photo(&store, &id, "cto", &image, &owner).await.unwrap();

        let out = dir.path().join("out.jpg");
        export_photo(&store, &id, "cto", Some(&out), &owner).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"not really a jpeg");
    }

    #[tokio::test]
    async fn test_export_missing_photo_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        let id = store.create(&ChecklistRecord::default(), "u1").await.unwrap();
        assert!(export_photo(&store, &id, "cto", None, "u1").await.is_err());
    }

    #[tokio::test]
    async fn test_flag_owner_wins_over_local_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = temp_store(&dir).await;
        assert_eq!(resolve_owner(&store, Some(" tech-7 ")).await.unwrap(), "tech-7");
        assert!(resolve_owner(&store, Some("  ")).await.is_err());
    }
}
