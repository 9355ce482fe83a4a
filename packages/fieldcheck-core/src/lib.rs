//! # FieldCheck Core
//!
//! Ownership-scoped storage for site-inspection checklists. One record API
//! sits in front of three interchangeable backends, chosen at startup.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        FIELDCHECK CORE MODULES                          │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐  ┌──────────────┐   │
//! │  │    Model    │  │    Codec    │  │    Photo    │  │    Config    │   │
//! │  │             │  │             │  │             │  │              │   │
//! │  │ - Checklist │  │ - Dialects  │  │ - Data URIs │  │ - Env vars   │   │
//! │  │ - TriState  │  │ - Row <-> T │  │ - Shrink    │  │ - Preference │   │
//! │  │ - Profile   │  │ - Aliases   │  │ - Display   │  │ - Remote     │   │
//! │  └──────┬──────┘  └──────┬──────┘  └──────┬──────┘  └──────┬───────┘   │
//! │         │                │                │                │           │
//! │         └────────────────┴───────┬────────┴────────────────┘           │
//! │                                  │                                      │
//! │                        ┌─────────▼─────────┐                            │
//! │                        │    RecordStore    │                            │
//! │                        └─────────┬─────────┘                            │
//! │                                  │ RecordAdapter                        │
//! │         ┌────────────────────────┼────────────────────────┐            │
//! │         │                        │                        │            │
//! │  ┌──────▼──────┐          ┌──────▼──────┐          ┌──────▼──────┐     │
//! │  │  Embedded   │          │   Browser   │          │   Remote    │     │
//! │  │  (SQLite)   │          │ (key/value) │          │ (REST API)  │     │
//! │  └─────────────┘          └─────────────┘          └─────────────┘     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`model`] - Checklist, photo and profile types
//! - [`codec`] - Translation between records and backend rows
//! - [`photo`] - Durable photo encoding and display resolution
//! - [`config`] - Backend selection and remote credentials
//! - [`storage`] - The three backend adapters
//! - [`store`] - The record API callers use
//!
//! ## Platform Support
//!
//! | Platform | Backends | Status |
//! |----------|----------|--------|
//! | Desktop / mobile | Embedded, Browser (file), Remote | Supported |
//! | Web (wasm32) | Browser (`localStorage`), Remote | Supported |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod photo;
pub mod storage;
pub mod store;
pub mod time;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{BackendPreference, RemoteConfig, StoreConfig};
pub use error::{Error, Result};
pub use model::{
    ChecklistRecord, ChecklistSummary, OwnerId, Photo, PhotoField, Photos, RecordId,
    StoredChecklist, TriState, UserProfile,
};
pub use photo::{produce_durable, resolve_for_display};
pub use storage::{BackendKind, RecordAdapter};
pub use store::RecordStore;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of FieldCheck Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Returns build information for debugging
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        #[cfg(target_os = "ios")]
        target: "ios",
        #[cfg(target_os = "android")]
        target: "android",
        #[cfg(target_os = "macos")]
        target: "macos",
        #[cfg(target_os = "linux")]
        target: "linux",
        #[cfg(target_os = "windows")]
        target: "windows",
        #[cfg(target_arch = "wasm32")]
        target: "wasm32",
        #[cfg(not(any(
            target_os = "ios",
            target_os = "android",
            target_os = "macos",
            target_os = "linux",
            target_os = "windows",
            target_arch = "wasm32"
        )))]
        target: "unknown",
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        compress: cfg!(feature = "compress"),
    }
}

/// Build information for debugging
#[derive(Debug, Clone)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Target platform
    pub target: &'static str,
    /// Build profile (debug/release)
    pub profile: &'static str,
    /// Whether photos are re-encoded before storage
    pub compress: bool,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = build_info();
        assert_eq!(info.version, version());
        assert_eq!(info.compress, cfg!(feature = "compress"));
    }
}
