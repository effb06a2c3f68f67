//! ghproj core - domain types for GitHub Projects portability
//!
//! This crate holds everything that does not talk to the network: bundle
//! encoding, reference parsing, bulk target assembly, configuration and
//! credentials.

pub mod bulk;
pub mod bundle;
pub mod cancel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filter;
pub mod project;
pub mod reference;

pub use bulk::{BulkResult, BulkTarget, TargetId};
pub use bundle::{
    Bundle, BundleField, BundleFormat, BundleItem, BundleMetadata, BundleProject, BundleView,
    ContentType, FieldDataType, FieldValue, SchemaVersion, SelectOption, ViewLayout,
};
pub use cancel::CancelFlag;
pub use config::Config;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use filter::{ContentState, FilterExpr};
pub use project::{OwnerKind, ProjectHandle};
pub use reference::{parse_item_ref, parse_project_ref, ItemRef, ProjectRef};
