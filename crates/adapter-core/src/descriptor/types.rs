//! Descriptor data structures.
//!
//! A [`Descriptor`] can only be obtained through the parser, so every
//! instance satisfies the schema invariants: non-empty `files`, unique
//! versions, and a `default_version` that names one of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CatalogConfig;

/// Adapter category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterType {
    /// Adapter trained for a downstream task
    TextTask,
    /// Adapter trained for a language
    TextLang,
}

impl AdapterType {
    /// Return the canonical string for this adapter type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterType::TextTask => "text_task",
            AdapterType::TextLang => "text_lang",
        }
    }
}

impl std::str::FromStr for AdapterType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text_task" | "text-task" => Ok(AdapterType::TextTask),
            "text_lang" | "text-lang" => Ok(AdapterType::TextLang),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for AdapterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One downloadable version of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub version: String,
    pub url: String,
    /// SHA-1 digest as lowercase hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    /// SHA-256 digest as lowercase hex
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FileEntry {
    pub fn new(version: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            url: url.into(),
            sha1: None,
            sha256: None,
            description: None,
        }
    }

    pub fn with_sha1(mut self, digest: impl Into<String>) -> Self {
        self.sha1 = Some(digest.into());
        self
    }

    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        self.sha256 = Some(digest.into());
        self
    }

    /// Whether at least one digest is declared.
    pub fn is_verifiable(&self) -> bool {
        self.sha1.is_some() || self.sha256.is_some()
    }
}

/// The `config` block of a card: which named adapter architecture to use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchitectureConfig {
    /// Short key of an externally defined configuration template
    pub using: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_linearity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_factor: Option<f64>,
    /// Any other keys inside `config`
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Optional ways of reaching the authors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Contact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
}

impl Contact {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.github.is_none() && self.twitter.is_none()
    }
}

/// Validated metadata for one adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptor {
    #[serde(rename = "type")]
    pub(crate) adapter_type: AdapterType,
    pub(crate) task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) subtask: Option<String>,
    pub(crate) model_type: String,
    pub(crate) model_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) model_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) author: Option<String>,
    #[serde(skip_serializing_if = "Contact::is_empty")]
    pub(crate) contact: Contact,
    pub(crate) config: ArchitectureConfig,
    pub(crate) default_version: String,
    pub(crate) files: Vec<FileEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) prediction_head: Option<bool>,
    /// Unrecognised and free-text fields (citation, description, url, ...)
    #[serde(flatten)]
    pub(crate) metadata: BTreeMap<String, serde_yaml::Value>,
    /// Position of the default version within `files`
    #[serde(skip)]
    pub(crate) default_index: usize,
}

impl Descriptor {
    pub fn adapter_type(&self) -> AdapterType {
        self.adapter_type
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn subtask(&self) -> Option<&str> {
        self.subtask.as_deref()
    }

    /// Base model type with its original casing (e.g. `GPT2`).
    pub fn model_type(&self) -> &str {
        &self.model_type
    }

    /// Base model name with its original casing.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Advisory name of the model-loading class.
    pub fn model_class(&self) -> Option<&str> {
        self.model_class.as_deref()
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn config(&self) -> &ArchitectureConfig {
        &self.config
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// All file entries, in card order.
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Advisory flag: the archive ships a prediction head.
    pub fn prediction_head(&self) -> Option<bool> {
        self.prediction_head
    }

    /// Opaque metadata carried through from the card.
    pub fn metadata(&self) -> &BTreeMap<String, serde_yaml::Value> {
        &self.metadata
    }

    /// Look up a free-text metadata field such as `citation` or `description`.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    /// The entry named by `default_version`.
    pub fn default_file(&self) -> &FileEntry {
        &self.files[self.default_index]
    }

    /// The entry for `version`, if the card lists it.
    pub fn file(&self, version: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.version == version)
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.version.as_str())
    }

    /// Stable display identifier: `<model_name>_<task>_<subtask>_<config>`.
    ///
    /// Slashes in any part (e.g. `facebook/bart-base`) become hyphens.
    pub fn identifier(&self) -> String {
        let mut parts = vec![self.model_name.as_str(), self.task.as_str()];
        if let Some(subtask) = &self.subtask {
            parts.push(subtask);
        }
        parts.push(&self.config.using);
        parts
            .join(CatalogConfig::IDENTIFIER_SEPARATOR)
            .replace('/', "-")
    }
}
