//! Checklist records, photo slots and tri-state answers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{OwnerId, RecordId};

// ============================================================================
// TRI-STATE
// ============================================================================

/// A yes/no answer that may not have been given yet
///
/// `Unknown` is a real answer state ("not filled in"), not a synonym for
/// `No`. It serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TriState {
    /// Answered yes
    Yes,
    /// Answered no
    No,
    /// Not answered
    #[default]
    Unknown,
}

impl TriState {
    /// `Some(bool)` for an answered question, `None` otherwise
    pub fn as_option(self) -> Option<bool> {
        match self {
            TriState::Yes => Some(true),
            TriState::No => Some(false),
            TriState::Unknown => None,
        }
    }

    /// Whether the question has been answered
    pub fn is_known(self) -> bool {
        self != TriState::Unknown
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TriState::Yes,
            Some(false) => TriState::No,
            None => TriState::Unknown,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

impl Serialize for TriState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TriState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<bool>::deserialize(deserializer).map(TriState::from)
    }
}

// ============================================================================
// PHOTOS
// ============================================================================

/// The four photo slots of a checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhotoField {
    /// The fiber distribution box (CTO)
    Cto,
    /// Front of the customer's house
    HouseFront,
    /// The installed equipment (ONT/router)
    Installation,
    /// The equipment's MAC address label
    MacLabel,
}

impl PhotoField {
    /// Every photo field, in form order
    pub const ALL: [PhotoField; 4] = [
        PhotoField::Cto,
        PhotoField::HouseFront,
        PhotoField::Installation,
        PhotoField::MacLabel,
    ];

    /// Stable name used on the command line and in logs
    pub fn as_str(self) -> &'static str {
        match self {
            PhotoField::Cto => "cto",
            PhotoField::HouseFront => "house-front",
            PhotoField::Installation => "installation",
            PhotoField::MacLabel => "mac-label",
        }
    }

    /// Inverse of [`PhotoField::as_str`]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// One photo slot: a transient device reference plus the durable payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Path or URI on the capturing device; may dangle after reinstall
    pub device_uri: Option<String>,
    /// Self-contained `data:` URI; the field of record for display and export
    pub durable_image: Option<String>,
}

impl Photo {
    /// A photo captured on the device and already turned into a durable payload
    pub fn captured(device_uri: impl Into<String>, durable_image: impl Into<String>) -> Self {
        Self {
            device_uri: Some(device_uri.into()),
            durable_image: Some(durable_image.into()),
        }
    }

    /// Drop both slots together
    pub fn clear(&mut self) {
        self.device_uri = None;
        self.durable_image = None;
    }

    /// Neither slot is set
    pub fn is_empty(&self) -> bool {
        self.device_uri.is_none() && self.durable_image.is_none()
    }

    /// A non-empty durable payload, if any
    pub fn durable(&self) -> Option<&str> {
        self.durable_image.as_deref().filter(|s| !s.is_empty())
    }
}

/// All photo slots of a checklist
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photos {
    /// CTO photo
    pub cto: Photo,
    /// House-front photo
    pub house_front: Photo,
    /// Installation photo
    pub installation: Photo,
    /// MAC-label photo
    pub mac_label: Photo,
}

impl Photos {
    /// Borrow one slot
    pub fn get(&self, field: PhotoField) -> &Photo {
        match field {
            PhotoField::Cto => &self.cto,
            PhotoField::HouseFront => &self.house_front,
            PhotoField::Installation => &self.installation,
            PhotoField::MacLabel => &self.mac_label,
        }
    }

    /// Mutably borrow one slot
    pub fn get_mut(&mut self, field: PhotoField) -> &mut Photo {
        match field {
            PhotoField::Cto => &mut self.cto,
            PhotoField::HouseFront => &mut self.house_front,
            PhotoField::Installation => &mut self.installation,
            PhotoField::MacLabel => &mut self.mac_label,
        }
    }
}

// ============================================================================
// CHECKLIST
// ============================================================================

/// The caller-editable content of one technician visit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChecklistRecord {
    /// Customer name
    pub customer_name: String,
    /// Street and number
    pub street_address: String,
    /// Map link to the customer location
    pub customer_location_link: String,
    /// Map link to the CTO
    pub cto_location_link: String,
    /// Map link to the house
    pub house_location_link: String,
    /// Fiber color at the CTO
    pub fiber_color: String,
    /// Port assigned to the customer on the CTO
    pub client_port: String,
    /// Wi-Fi network name
    pub wifi_ssid: String,
    /// Wi-Fi password
    pub wifi_password: String,
    /// Whether a splitter is installed
    pub has_splitter: TriState,
    /// Whether the browsing test passed
    pub browsing_test_passed: TriState,
    /// Whether the customer is satisfied
    pub customer_satisfied: TriState,
    /// Photo slots
    pub photos: Photos,
}

impl ChecklistRecord {
    /// Whether the form is ready to be filed
    ///
    /// Every text field must be non-blank and every yes/no question answered.
    /// Photos are optional.
    pub fn is_complete(&self) -> bool {
        let texts = [
            &self.customer_name,
            &self.street_address,
            &self.customer_location_link,
            &self.cto_location_link,
            &self.house_location_link,
            &self.fiber_color,
            &self.client_port,
            &self.wifi_ssid,
            &self.wifi_password,
        ];
        texts.iter().all(|s| !s.trim().is_empty())
            && self.has_splitter.is_known()
            && self.browsing_test_passed.is_known()
            && self.customer_satisfied.is_known()
    }
}

/// A checklist as persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredChecklist {
    /// Backend-assigned id
    pub id: RecordId,
    /// Owner fixed at creation
    pub owner_id: Option<OwnerId>,
    /// Set by the store on create
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every write
    pub updated_at: DateTime<Utc>,
    /// The checklist content
    #[serde(flatten)]
    pub record: ChecklistRecord,
}

/// One entry of the checklist list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistSummary {
    /// Backend-assigned id
    pub id: RecordId,
    /// Display title (the customer name)
    pub title: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

/// Build the map link stored in the location fields from a GPS fix
pub fn map_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={latitude},{longitude}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_record() -> ChecklistRecord {
        ChecklistRecord {
            customer_name: "Ana Silva".into(),
            street_address: "Rua das Flores, 12".into(),
            customer_location_link: map_link(-23.5, -46.6),
            cto_location_link: map_link(-23.51, -46.61),
            house_location_link: map_link(-23.52, -46.62),
            fiber_color: "azul".into(),
            client_port: "4".into(),
            wifi_ssid: "AnaNet".into(),
            wifi_password: "s3nha-forte".into(),
            has_splitter: TriState::Yes,
            browsing_test_passed: TriState::Yes,
            customer_satisfied: TriState::No,
            photos: Photos::default(),
        }
    }

    #[test]
    fn test_tristate_serde_uses_null_for_unknown() {
        assert_eq!(serde_json::to_string(&TriState::Unknown).unwrap(), "null");
        assert_eq!(serde_json::to_string(&TriState::No).unwrap(), "false");
        let back: TriState = serde_json::from_str("null").unwrap();
        assert_eq!(back, TriState::Unknown);
        let back: TriState = serde_json::from_str("false").unwrap();
        assert_eq!(back, TriState::No);
    }

    #[test]
    fn test_missing_tristate_defaults_to_unknown() {
        let record: ChecklistRecord =
            serde_json::from_str(r#"{"customerName":"Ana Silva","hasSplitter":true}"#).unwrap();
        assert_eq!(record.has_splitter, TriState::Yes);
        assert_eq!(record.browsing_test_passed, TriState::Unknown);
        assert_eq!(record.street_address, "");
    }

    #[test]
    fn test_is_complete() {
        let mut record = complete_record();
        assert!(record.is_complete());

        record.customer_satisfied = TriState::Unknown;
        assert!(!record.is_complete());

        let mut record = complete_record();
        record.wifi_password = "   ".into();
        assert!(!record.is_complete());
    }

    #[test]
    fn test_photo_clear_drops_both_slots() {
        let mut photo = Photo::captured("file:///tmp/a.jpg", "data:image/jpeg;base64,AAAA");
        assert!(!photo.is_empty());
        photo.clear();
        assert!(photo.is_empty());
    }

    #[test]
    fn test_photo_field_names_round_trip() {
        for field in PhotoField::ALL {
            assert_eq!(PhotoField::parse(field.as_str()), Some(field));
        }
        assert_eq!(PhotoField::parse("roof"), None);
    }

    #[test]
    fn test_map_link() {
        assert_eq!(
            map_link(-23.5, -46.25),
            "https://www.google.com/maps?q=-23.5,-46.25"
        );
    }
}
