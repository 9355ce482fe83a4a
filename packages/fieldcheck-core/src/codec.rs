//! # Field Codec
//!
//! Bidirectional mapping between the canonical model and each backend's
//! native row shape.
//!
//! ## Row Shape
//!
//! Every adapter speaks in [`Row`]s: flat JSON objects keyed by column name.
//! SQLite rows, `localStorage` objects and PostgREST payloads all convert to
//! and from that shape without loss, which keeps the adapters free of any
//! field knowledge.
//!
//! ## Naming & Encoding Rules
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           DIALECTS                                      │
//! ├──────────────┬──────────────────┬──────────────────┬────────────────────┤
//! │              │ Embedded         │ Browser          │ Remote             │
//! ├──────────────┼──────────────────┼──────────────────┼────────────────────┤
//! │ columns      │ camelCase        │ camelCase        │ lowercase          │
//! │ owner column │ userId           │ userId           │ user_id            │
//! │ tri-state    │ 1 / 0 / NULL     │ 1 / 0 / null     │ 1 / 0 / null       │
//! │              │                  │                  │ (or true/false)    │
//! │ timestamps   │ unix millis      │ unix millis      │ RFC 3339           │
//! │ device URIs  │ stored           │ stored           │ not stored         │
//! └──────────────┴──────────────────┴──────────────────┴────────────────────┘
//! ```
//!
//! ## Tolerant Decoding
//!
//! The same logical field can come back under several spellings: PostgreSQL
//! folds unquoted identifiers to lowercase, SQLite keeps whatever case the
//! table was created with, and older builds wrote English names. Decoding
//! therefore probes, per field, the camelCase column, its lowercase form and
//! then the known alternates, and takes the first non-null value. Nothing
//! found means the zero value: `""`, [`TriState::Unknown`] or `None`.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::model::{
    ChecklistRecord, ChecklistSummary, OwnerId, Photo, PhotoField, Photos, RecordId,
    StoredChecklist, TriState, UserProfile,
};
use crate::time;

/// A backend-native row
pub type Row = Map<String, Value>;

// ============================================================================
// DIALECT
// ============================================================================

/// How column names are spelled on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnCase {
    /// `ruaNumero`, `fotoCtoDataUri`
    Camel,
    /// `ruanumero`, `fotoctodatauri`
    Lower,
}

/// How tri-state answers are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolEncoding {
    /// `1`, `0`, `null`
    Integer,
    /// `true`, `false`, `null`
    Native,
}

/// How timestamps are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampEncoding {
    /// Integer milliseconds since the Unix epoch
    UnixMillis,
    /// RFC 3339 string with millisecond precision
    Rfc3339,
}

/// Per-backend naming and value encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    /// Column spelling
    pub case: ColumnCase,
    /// Tri-state encoding
    pub booleans: BoolEncoding,
    /// Timestamp encoding
    pub timestamps: TimestampEncoding,
    /// Name of the owner column
    pub owner_column: &'static str,
    /// Whether device URIs are persisted next to durable payloads
    pub device_uris: bool,
}

impl Dialect {
    /// The on-device SQLite schema
    pub const fn embedded() -> Self {
        Self {
            case: ColumnCase::Camel,
            booleans: BoolEncoding::Integer,
            timestamps: TimestampEncoding::UnixMillis,
            owner_column: "userId",
            device_uris: true,
        }
    }

    /// Objects kept in browser storage
    pub const fn browser() -> Self {
        Self::embedded()
    }

    /// The remote relational service
    pub const fn remote(native_booleans: bool) -> Self {
        Self {
            case: ColumnCase::Lower,
            booleans: if native_booleans {
                BoolEncoding::Native
            } else {
                BoolEncoding::Integer
            },
            timestamps: TimestampEncoding::Rfc3339,
            owner_column: "user_id",
            device_uris: false,
        }
    }

    /// Spell a canonical camelCase column for this dialect
    pub fn column(&self, camel: &'static str) -> Cow<'static, str> {
        match self.case {
            ColumnCase::Camel => Cow::Borrowed(camel),
            ColumnCase::Lower => Cow::Owned(camel.to_ascii_lowercase()),
        }
    }

    fn encode_tristate(&self, value: TriState) -> Value {
        match (self.booleans, value.as_option()) {
            (_, None) => Value::Null,
            (BoolEncoding::Integer, Some(b)) => Value::from(i64::from(b)),
            (BoolEncoding::Native, Some(b)) => Value::Bool(b),
        }
    }

    fn encode_timestamp(&self, at: DateTime<Utc>) -> Value {
        match self.timestamps {
            TimestampEncoding::UnixMillis => Value::from(at.timestamp_millis()),
            TimestampEncoding::Rfc3339 => {
                Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            }
        }
    }
}

// ============================================================================
// FIELD TABLE
// ============================================================================

/// Identity column
pub const ID_COLUMN: &str = "id";
/// Creation timestamp column (same on every backend)
pub const CREATED_AT_COLUMN: &str = "created_at";
/// Last-write timestamp column (same on every backend)
pub const UPDATED_AT_COLUMN: &str = "updated_at";

const ID_KEYS: &[&str] = &["id", "ID", "Id"];
const OWNER_KEYS: &[&str] = &["userId", "userid", "user_id", "ownerId", "owner_id"];
const CREATED_KEYS: &[&str] = &["created_at", "createdAt", "createdat"];
const UPDATED_KEYS: &[&str] = &["updated_at", "updatedAt", "updatedat"];

#[derive(Debug, Clone, Copy)]
enum TextField {
    CustomerName,
    StreetAddress,
    CustomerLocation,
    CtoLocation,
    HouseLocation,
    FiberColor,
    ClientPort,
    WifiSsid,
    WifiPassword,
}

impl TextField {
    const ALL: [TextField; 9] = [
        TextField::CustomerName,
        TextField::StreetAddress,
        TextField::CustomerLocation,
        TextField::CtoLocation,
        TextField::HouseLocation,
        TextField::FiberColor,
        TextField::ClientPort,
        TextField::WifiSsid,
        TextField::WifiPassword,
    ];

    fn column(self) -> &'static str {
        match self {
            TextField::CustomerName => "nome",
            TextField::StreetAddress => "ruaNumero",
            TextField::CustomerLocation => "locClienteLink",
            TextField::CtoLocation => "locCtoLink",
            TextField::HouseLocation => "locCasaLink",
            TextField::FiberColor => "corFibra",
            TextField::ClientPort => "portaCliente",
            TextField::WifiSsid => "nomeWifi",
            TextField::WifiPassword => "senhaWifi",
        }
    }

    fn alternates(self) -> &'static [&'static str] {
        match self {
            TextField::CustomerName => &["customerName", "customer_name"],
            TextField::StreetAddress => &["streetAddress", "street_address"],
            TextField::CustomerLocation => &["customerLocationLink", "customer_location_link"],
            TextField::CtoLocation => &["ctoLocationLink", "cto_location_link"],
            TextField::HouseLocation => &["houseLocationLink", "house_location_link"],
            TextField::FiberColor => &["fiberColor", "fiber_color"],
            TextField::ClientPort => &["clientPort", "client_port"],
            TextField::WifiSsid => &["wifiSsid", "wifi_ssid"],
            TextField::WifiPassword => &["wifiPassword", "wifi_password"],
        }
    }

    fn get(self, r: &ChecklistRecord) -> &str {
        match self {
            TextField::CustomerName => &r.customer_name,
            TextField::StreetAddress => &r.street_address,
            TextField::CustomerLocation => &r.customer_location_link,
            TextField::CtoLocation => &r.cto_location_link,
            TextField::HouseLocation => &r.house_location_link,
            TextField::FiberColor => &r.fiber_color,
            TextField::ClientPort => &r.client_port,
            TextField::WifiSsid => &r.wifi_ssid,
            TextField::WifiPassword => &r.wifi_password,
        }
    }

    fn slot(self, r: &mut ChecklistRecord) -> &mut String {
        match self {
            TextField::CustomerName => &mut r.customer_name,
            TextField::StreetAddress => &mut r.street_address,
            TextField::CustomerLocation => &mut r.customer_location_link,
            TextField::CtoLocation => &mut r.cto_location_link,
            TextField::HouseLocation => &mut r.house_location_link,
            TextField::FiberColor => &mut r.fiber_color,
            TextField::ClientPort => &mut r.client_port,
            TextField::WifiSsid => &mut r.wifi_ssid,
            TextField::WifiPassword => &mut r.wifi_password,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FlagField {
    HasSplitter,
    BrowsingTestPassed,
    CustomerSatisfied,
}

impl FlagField {
    const ALL: [FlagField; 3] = [
        FlagField::HasSplitter,
        FlagField::BrowsingTestPassed,
        FlagField::CustomerSatisfied,
    ];

    fn column(self) -> &'static str {
        match self {
            FlagField::HasSplitter => "possuiSplitter",
            FlagField::BrowsingTestPassed => "testeNavegacaoOk",
            FlagField::CustomerSatisfied => "clienteSatisfeito",
        }
    }

    fn alternates(self) -> &'static [&'static str] {
        match self {
            FlagField::HasSplitter => &["hasSplitter", "has_splitter"],
            FlagField::BrowsingTestPassed => &["browsingTestPassed", "browsing_test_passed"],
            FlagField::CustomerSatisfied => &["customerSatisfied", "customer_satisfied"],
        }
    }

    fn slot(self, r: &mut ChecklistRecord) -> &mut TriState {
        match self {
            FlagField::HasSplitter => &mut r.has_splitter,
            FlagField::BrowsingTestPassed => &mut r.browsing_test_passed,
            FlagField::CustomerSatisfied => &mut r.customer_satisfied,
        }
    }

    fn get(self, r: &ChecklistRecord) -> TriState {
        match self {
            FlagField::HasSplitter => r.has_splitter,
            FlagField::BrowsingTestPassed => r.browsing_test_passed,
            FlagField::CustomerSatisfied => r.customer_satisfied,
        }
    }
}

/// camelCase column holding the device URI of a photo
pub fn device_column(field: PhotoField) -> &'static str {
    match field {
        PhotoField::Cto => "fotoCto",
        PhotoField::HouseFront => "fotoFrenteCasa",
        PhotoField::Installation => "fotoInstalacao",
        PhotoField::MacLabel => "fotoMacEquip",
    }
}

/// camelCase column holding the durable payload of a photo
pub fn durable_column(field: PhotoField) -> &'static str {
    match field {
        PhotoField::Cto => "fotoCtoDataUri",
        PhotoField::HouseFront => "fotoFrenteCasaDataUri",
        PhotoField::Installation => "fotoInstalacaoDataUri",
        PhotoField::MacLabel => "fotoMacEquipDataUri",
    }
}

fn device_alternates(field: PhotoField) -> &'static [&'static str] {
    match field {
        PhotoField::Cto => &["ctoPhotoUri", "cto_photo_uri"],
        PhotoField::HouseFront => &["houseFrontPhotoUri", "house_front_photo_uri"],
        PhotoField::Installation => &["installationPhotoUri", "installation_photo_uri"],
        PhotoField::MacLabel => &["macLabelPhotoUri", "mac_label_photo_uri"],
    }
}

fn durable_alternates(field: PhotoField) -> &'static [&'static str] {
    match field {
        PhotoField::Cto => &["ctoPhoto", "cto_photo"],
        PhotoField::HouseFront => &["houseFrontPhoto", "house_front_photo"],
        PhotoField::Installation => &["installationPhoto", "installation_photo"],
        PhotoField::MacLabel => &["macLabelPhoto", "mac_label_photo"],
    }
}

// ============================================================================
// KEY PROBING
// ============================================================================

/// First non-null value among `camel`, its lowercase form and `alternates`
fn probe<'a>(row: &'a Row, camel: &str, alternates: &[&str]) -> Option<&'a Value> {
    let lower = camel.to_ascii_lowercase();
    std::iter::once(camel)
        .chain(std::iter::once(lower.as_str()))
        .chain(alternates.iter().copied())
        .find_map(|key| row.get(key).filter(|v| !v.is_null()))
}

fn probe_keys<'a>(row: &'a Row, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| row.get(*key).filter(|v| !v.is_null()))
}

fn value_to_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn value_to_optional_text(value: Option<&Value>) -> Option<String> {
    Some(value_to_text(value)).filter(|s| !s.is_empty())
}

/// Decode a stored tri-state without ever collapsing `unknown` into `false`
pub fn decode_tristate(value: Option<&Value>) -> TriState {
    match value {
        Some(Value::Bool(b)) => TriState::from(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => TriState::Yes,
            Some(0) => TriState::No,
            _ => TriState::Unknown,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => TriState::Yes,
            "0" | "false" => TriState::No,
            _ => TriState::Unknown,
        },
        _ => TriState::Unknown,
    }
}

/// Decode a timestamp stored as unix millis, RFC 3339 or a numeric string
pub fn decode_timestamp(value: Option<&Value>) -> DateTime<Utc> {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(time::from_millis)
            .unwrap_or_default(),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.trim().parse::<i64>().ok().map(time::from_millis))
            .unwrap_or_default(),
        _ => DateTime::<Utc>::default(),
    }
}

/// Decode a backend id (integer or string) into an opaque token
pub fn decode_id(row: &Row) -> Option<RecordId> {
    match probe_keys(row, ID_KEYS)? {
        Value::Number(n) => Some(RecordId::new(n.to_string())),
        Value::String(s) if !s.is_empty() => Some(RecordId::new(s.clone())),
        _ => None,
    }
}

fn decode_owner(row: &Row) -> Option<OwnerId> {
    probe_keys(row, OWNER_KEYS)
        .map(|v| value_to_text(Some(v)))
        .and_then(|s| OwnerId::parse(&s).ok())
}

// ============================================================================
// CHECKLIST ENCODING
// ============================================================================

/// Which timestamps a write sets
#[derive(Debug, Clone, Copy)]
pub enum Stamp {
    /// `created_at = updated_at = at`
    Create(DateTime<Utc>),
    /// `updated_at = at`
    Update(DateTime<Utc>),
}

/// A checklist split the way adapters write it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedChecklist {
    /// Scalar, tri-state and timestamp columns; always written in full
    pub core: Row,
    /// Photo columns, present only for photos with a durable payload
    pub photos: Row,
}

/// Encode a checklist for `create` or `update`
pub fn encode_checklist(record: &ChecklistRecord, dialect: &Dialect, stamp: Stamp) -> EncodedChecklist {
    let mut core = Row::new();

    for field in TextField::ALL {
        core.insert(
            dialect.column(field.column()).into_owned(),
            Value::String(field.get(record).to_string()),
        );
    }
    for field in FlagField::ALL {
        core.insert(
            dialect.column(field.column()).into_owned(),
            dialect.encode_tristate(field.get(record)),
        );
    }
    match stamp {
        Stamp::Create(at) => {
            core.insert(CREATED_AT_COLUMN.into(), dialect.encode_timestamp(at));
            core.insert(UPDATED_AT_COLUMN.into(), dialect.encode_timestamp(at));
        }
        Stamp::Update(at) => {
            core.insert(UPDATED_AT_COLUMN.into(), dialect.encode_timestamp(at));
        }
    }

    EncodedChecklist {
        core,
        photos: encode_photos(&record.photos, dialect),
    }
}

/// Photo columns for every slot that carries a durable payload
///
/// A slot without one produces nothing at all, so an update never shadows a
/// payload stored earlier.
pub fn encode_photos(photos: &Photos, dialect: &Dialect) -> Row {
    let mut row = Row::new();
    for field in PhotoField::ALL {
        let photo = photos.get(field);
        let Some(durable) = photo.durable() else {
            continue;
        };
        row.insert(
            dialect.column(durable_column(field)).into_owned(),
            Value::String(durable.to_string()),
        );
        if dialect.device_uris {
            row.insert(
                dialect.column(device_column(field)).into_owned(),
                photo
                    .device_uri
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
        }
    }
    row
}

/// Columns that clear one photo: both slots null, plus a fresh `updated_at`
pub fn encode_photo_clear(field: PhotoField, dialect: &Dialect, at: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    row.insert(dialect.column(durable_column(field)).into_owned(), Value::Null);
    if dialect.device_uris {
        row.insert(dialect.column(device_column(field)).into_owned(), Value::Null);
    }
    row.extend(encode_touch(dialect, at));
    row
}

/// Just a fresh `updated_at`
pub fn encode_touch(dialect: &Dialect, at: DateTime<Utc>) -> Row {
    let mut row = Row::new();
    row.insert(UPDATED_AT_COLUMN.into(), dialect.encode_timestamp(at));
    row
}

/// Columns needed for the list view
pub fn summary_columns(dialect: &Dialect) -> Vec<String> {
    vec![
        ID_COLUMN.to_string(),
        dialect.column(TextField::CustomerName.column()).into_owned(),
        CREATED_AT_COLUMN.to_string(),
        UPDATED_AT_COLUMN.to_string(),
    ]
}

/// Columns holding photo data
pub fn photo_columns(dialect: &Dialect) -> Vec<String> {
    let mut cols = Vec::new();
    for field in PhotoField::ALL {
        if dialect.device_uris {
            cols.push(dialect.column(device_column(field)).into_owned());
        }
        cols.push(dialect.column(durable_column(field)).into_owned());
    }
    cols
}

// ============================================================================
// CHECKLIST DECODING
// ============================================================================

/// Decode the photo slots of a row
pub fn decode_photos(row: &Row) -> Photos {
    let mut photos = Photos::default();
    for field in PhotoField::ALL {
        *photos.get_mut(field) = Photo {
            device_uri: value_to_optional_text(probe(
                row,
                device_column(field),
                device_alternates(field),
            )),
            durable_image: value_to_optional_text(probe(
                row,
                durable_column(field),
                durable_alternates(field),
            )),
        };
    }
    photos
}

/// Decode the caller-visible content of a row
pub fn decode_record(row: &Row) -> ChecklistRecord {
    let mut record = ChecklistRecord::default();
    for field in TextField::ALL {
        *field.slot(&mut record) = value_to_text(probe(row, field.column(), field.alternates()));
    }
    for field in FlagField::ALL {
        *field.slot(&mut record) = decode_tristate(probe(row, field.column(), field.alternates()));
    }
    record.photos = decode_photos(row);
    record
}

/// Decode a full stored checklist
pub fn decode_checklist(row: &Row) -> Result<StoredChecklist> {
    let id = decode_id(row)
        .ok_or_else(|| Error::SerializationError("checklist row has no id".into()))?;
    Ok(StoredChecklist {
        id,
        owner_id: decode_owner(row),
        created_at: decode_timestamp(probe_keys(row, CREATED_KEYS)),
        updated_at: decode_timestamp(probe_keys(row, UPDATED_KEYS)),
        record: decode_record(row),
    })
}

/// Decode a list-view entry
pub fn decode_summary(row: &Row) -> Result<ChecklistSummary> {
    let id = decode_id(row)
        .ok_or_else(|| Error::SerializationError("checklist row has no id".into()))?;
    Ok(ChecklistSummary {
        id,
        title: value_to_text(probe(
            row,
            TextField::CustomerName.column(),
            TextField::CustomerName.alternates(),
        )),
        created_at: decode_timestamp(probe_keys(row, CREATED_KEYS)),
        updated_at: decode_timestamp(probe_keys(row, UPDATED_KEYS)),
    })
}

// ============================================================================
// PROFILES
// ============================================================================

/// Profile columns (identical on every backend)
pub const PROFILE_FIRST_NAME: &str = "first_name";
/// Last name column
pub const PROFILE_LAST_NAME: &str = "last_name";
/// Phone column
pub const PROFILE_PHONE: &str = "phone";
/// National id column
pub const PROFILE_NATIONAL_ID: &str = "cpf";

/// Encode a profile (callers normalize first)
pub fn encode_profile(profile: &UserProfile) -> Row {
    let mut row = Row::new();
    row.insert(PROFILE_FIRST_NAME.into(), Value::String(profile.first_name.clone()));
    row.insert(PROFILE_LAST_NAME.into(), Value::String(profile.last_name.clone()));
    row.insert(PROFILE_PHONE.into(), Value::String(profile.phone.clone()));
    row.insert(
        PROFILE_NATIONAL_ID.into(),
        profile
            .national_id
            .clone()
            .map(Value::String)
            .unwrap_or(Value::Null),
    );
    row
}

/// Decode a profile row
pub fn decode_profile(row: &Row) -> UserProfile {
    UserProfile {
        first_name: value_to_text(probe_keys(row, &["first_name", "firstName", "firstname"])),
        last_name: value_to_text(probe_keys(row, &["last_name", "lastName", "lastname"])),
        phone: value_to_text(probe_keys(row, &["phone", "telefone"])),
        national_id: value_to_optional_text(probe_keys(
            row,
            &["cpf", "national_id", "nationalId", "nationalid"],
        )),
    }
}

// ============================================================================
// TESTS
// ============================================================================
