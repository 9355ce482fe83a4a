//! # User Profile
//!
//! One profile row per owner: name, phone and an optional national id (CPF).
//! Profiles are created implicitly by the first upsert and never deleted by
//! the record store.

use serde::{Deserialize, Serialize};

/// Profile of the technician who owns a set of checklists
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Phone number, stored masked
    pub phone: String,
    /// National id number, stored as digits only
    pub national_id: Option<String>,
}

impl UserProfile {
    /// The canonical form written by `upsert_profile`
    ///
    /// Names are trimmed, the phone is masked and the national id is reduced
    /// to digits (absent when nothing is left).
    pub fn normalized(&self) -> Self {
        let national_id = self
            .national_id
            .as_deref()
            .map(only_digits)
            .filter(|d| !d.is_empty());
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            phone: format_phone_br(&self.phone),
            national_id,
        }
    }

    /// "First Last", trimmed
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// Keep only ASCII digits
pub fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Mask a Brazilian phone number as `(DD) DDDD-DDDD` or `(DD) DDDDD-DDDD`
///
/// Partial input is masked as far as it goes; digits past the eleventh are
/// dropped.
pub fn format_phone_br(s: &str) -> String {
    let d = only_digits(s);
    let n = d.len();
    if n <= 2 {
        d
    } else if n <= 6 {
        format!("({}) {}", &d[..2], &d[2..])
    } else if n <= 10 {
        format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..])
    } else {
        format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..11])
    }
}

/// Mask a national id (CPF) as `000.000.000-00` for display
pub fn format_national_id(s: &str) -> String {
    let d = only_digits(s);
    let part = |from: usize, to: usize| d.get(from..to.min(d.len())).unwrap_or("");

    let mut out = part(0, 3).to_string();
    for (sep, from, to) in [('.', 3, 6), ('.', 6, 9), ('-', 9, 11)] {
        let p = part(from, to);
        if !p.is_empty() {
            out.push(sep);
            out.push_str(p);
        }
    }
    out
}
