//! Portable project bundles
//!
//! A bundle is the unit of export/import: metadata, the source project's
//! facts, and optionally its items, fields and views. The same document
//! shape is written as JSON or YAML; decoding tries JSON first and falls
//! back to YAML.
//!
//! Evolution rules: new keys are optional and additive, and a key's meaning
//! never changes across versions. Collections that are absent stay `None`
//! so an importer can tell "not exported" from "exported but empty".

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Format version written by this build
pub const FORMAT_VERSION: &str = "1.0";

/// Highest schema major version this build understands
const SUPPORTED_MAJOR: u64 = 1;

/// Encoding of a bundle on disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleFormat {
    #[default]
    Json,
    Yaml,
}

impl FromStr for BundleFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(BundleFormat::Json),
            "yaml" | "yml" => Ok(BundleFormat::Yaml),
            other => Err(Error::Validation(format!(
                "Unknown bundle format '{}'. Expected json or yaml",
                other
            ))),
        }
    }
}

impl fmt::Display for BundleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleFormat::Json => f.write_str("json"),
            BundleFormat::Yaml => f.write_str("yaml"),
        }
    }
}

/// Schema generation of a decoded bundle, derived from `formatVersion`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// The 1.x schema
    V1,
    /// Written by a newer tool; decoded with the V1 field set
    Newer { major: u64 },
}

/// Export provenance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleMetadata {
    pub format_version: String,
    #[serde(rename = "exportedAtUTC", skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    pub exported_by: String,
    pub tool_version: String,
}

impl BundleMetadata {
    /// Metadata for a bundle exported now by `exported_by`
    pub fn current(exported_by: impl Into<String>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            exported_at: Some(Utc::now()),
            exported_by: exported_by.into(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Facts about the exported project; `id` is advisory only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleProject {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub closed: bool,
}

/// Kind of content behind a project item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Issue,
    PullRequest,
    #[default]
    DraftIssue,
}

/// A scalar field value
///
/// Text covers plain text, dates (`YYYY-MM-DD`), single-select option names
/// and iteration titles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// A project item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleItem {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub field_values: BTreeMap<String, FieldValue>,
}

/// GitHub's `ProjectV2FieldType`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldDataType {
    Assignees,
    Date,
    Iteration,
    Labels,
    LinkedPullRequests,
    Milestone,
    Number,
    ParentIssue,
    Repository,
    Reviewers,
    SingleSelect,
    SubIssuesProgress,
    Text,
    Title,
    TrackedBy,
    Tracks,
    #[default]
    #[serde(other)]
    Unknown,
}

impl FieldDataType {
    /// Whether fields of this type can be created through the API
    pub fn is_custom(&self) -> bool {
        matches!(
            self,
            FieldDataType::Text
                | FieldDataType::Number
                | FieldDataType::Date
                | FieldDataType::SingleSelect
                | FieldDataType::Iteration
        )
    }
}

/// A single-select option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectOption {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleField {
    pub id: String,
    pub name: String,
    pub data_type: FieldDataType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

/// Saved view layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewLayout {
    #[default]
    TableLayout,
    BoardLayout,
    RoadmapLayout,
}

/// A saved view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleView {
    pub id: String,
    pub name: String,
    pub layout: ViewLayout,
}

/// The portable export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub metadata: BundleMetadata,
    pub project: BundleProject,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<BundleItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<BundleField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<Vec<BundleView>>,
}

impl Bundle {
    /// A bundle with only metadata and project populated
    pub fn new(metadata: BundleMetadata, project: BundleProject) -> Self {
        Self {
            metadata,
            project,
            items: None,
            fields: None,
            views: None,
        }
    }

    /// Decode a bundle, trying JSON first and YAML second
    ///
    /// Input that is valid in both is therefore read as JSON.
    pub fn decode(bytes: &[u8]) -> Result<(Self, BundleFormat)> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Bundle("bundle is empty".to_string()));
        }

        let (bundle, format) = match serde_json::from_slice::<Bundle>(bytes) {
            Ok(bundle) => (bundle, BundleFormat::Json),
            Err(json_err) => {
                debug!(error = %json_err, "Bundle is not JSON, trying YAML");
                let bundle = serde_yaml::from_slice::<Bundle>(bytes).map_err(|yaml_err| {
                    Error::Bundle(format!(
                        "not valid JSON ({}) or YAML ({})",
                        json_err, yaml_err
                    ))
                })?;
                (bundle, BundleFormat::Yaml)
            }
        };

        bundle.validate()?;
        Ok((bundle, format))
    }

    /// Encode the bundle in the given format
    pub fn encode(&self, format: BundleFormat) -> Result<String> {
        match format {
            BundleFormat::Json => {
                let mut out = serde_json::to_string_pretty(self)?;
                out.push('\n');
                Ok(out)
            }
            BundleFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }

    /// Read and decode a bundle file
    pub fn read_from(path: &Path) -> Result<(Self, BundleFormat)> {
        let bytes = std::fs::read(path).map_err(Error::Io)?;
        Self::decode(&bytes)
    }

    /// Encode and write a bundle file
    ///
    /// The bundle is written to a temporary file next to `path` and renamed
    /// into place, so a failure never leaves a truncated bundle behind.
    pub fn write_to(&self, path: &Path, format: BundleFormat) -> Result<()> {
        let encoded = self.encode(format)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp_file = NamedTempFile::new_in(dir)?;
        temp_file.write_all(encoded.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(path).map_err(|e| Error::Io(e.error))?;

        debug!(path = %path.display(), %format, "Wrote bundle");
        Ok(())
    }

    /// Schema generation named by `metadata.formatVersion`
    pub fn schema_version(&self) -> SchemaVersion {
        let raw = self.metadata.format_version.trim();
        let major = raw.split('.').next().and_then(|m| m.parse::<u64>().ok());

        match major {
            Some(major) if major > SUPPORTED_MAJOR => SchemaVersion::Newer { major },
            Some(_) => SchemaVersion::V1,
            None => {
                warn!(
                    format_version = raw,
                    "Bundle has no usable formatVersion; assuming {}", FORMAT_VERSION
                );
                SchemaVersion::V1
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.project.title.trim().is_empty() {
            return Err(Error::Bundle("project.title is required".to_string()));
        }
        Ok(())
    }
}
