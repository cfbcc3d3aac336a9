//! Resolving a query to one descriptor and one file entry.

use std::fmt;

use super::index::CatalogIndex;
use crate::descriptor::{Descriptor, FileEntry};
use crate::error::ResolutionError;

/// What a caller is asking the catalog for.
///
/// `task` is required. A query that still matches more than one adapter is
/// ambiguous; `model_name` and `config` (the architecture, `config.using`)
/// narrow it down. Without `version`, the default version is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterQuery<'a> {
    pub task: &'a str,
    pub subtask: Option<&'a str>,
    pub model_name: Option<&'a str>,
    pub config: Option<&'a str>,
    pub version: Option<&'a str>,
}

impl<'a> AdapterQuery<'a> {
    pub fn new(task: &'a str) -> Self {
        Self {
            task,
            ..Default::default()
        }
    }

    pub fn subtask(mut self, subtask: &'a str) -> Self {
        self.subtask = Some(subtask);
        self
    }

    pub fn model_name(mut self, model_name: &'a str) -> Self {
        self.model_name = Some(model_name);
        self
    }

    pub fn config(mut self, config: &'a str) -> Self {
        self.config = Some(config);
        self
    }

    pub fn version(mut self, version: &'a str) -> Self {
        self.version = Some(version);
        self
    }
}

impl fmt::Display for AdapterQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task={}", self.task)?;
        if let Some(subtask) = self.subtask {
            write!(f, " subtask={}", subtask)?;
        }
        if let Some(model_name) = self.model_name {
            write!(f, " model={}", model_name)?;
        }
        if let Some(config) = self.config {
            write!(f, " config={}", config)?;
        }
        if let Some(version) = self.version {
            write!(f, " version={}", version)?;
        }
        Ok(())
    }
}

impl CatalogIndex {
    /// Find the single descriptor a query refers to.
    ///
    /// More than one match is always [`ResolutionError::Ambiguous`]; the
    /// index never picks one on the caller's behalf.
    pub fn resolve_descriptor(
        &self,
        query: &AdapterQuery<'_>,
    ) -> Result<&Descriptor, ResolutionError> {
        let mut matches = self.lookup(
            query.task,
            query.subtask,
            None,
            query.model_name,
            query.config,
        );
        match matches.len() {
            0 => Err(ResolutionError::NotFound {
                query: query.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(ResolutionError::Ambiguous {
                query: query.to_string(),
                candidates: matches.iter().map(|d| d.identifier()).collect(),
            }),
        }
    }

    /// Resolve a query to a concrete file entry.
    pub fn resolve_query(&self, query: &AdapterQuery<'_>) -> Result<&FileEntry, ResolutionError> {
        let descriptor = self.resolve_descriptor(query)?;
        select_version(descriptor, query.version)
    }

    /// Resolve `(task, subtask, model_name, version)` to a file entry.
    pub fn resolve(
        &self,
        task: &str,
        subtask: Option<&str>,
        model_name: Option<&str>,
        version: Option<&str>,
    ) -> Result<&FileEntry, ResolutionError> {
        self.resolve_query(&AdapterQuery {
            task,
            subtask,
            model_name,
            config: None,
            version,
        })
    }
}

/// Pick `version` from a descriptor, falling back to its default.
pub fn select_version<'d>(
    descriptor: &'d Descriptor,
    version: Option<&str>,
) -> Result<&'d FileEntry, ResolutionError> {
    match version {
        None => Ok(descriptor.default_file()),
        Some(version) => {
            descriptor
                .file(version)
                .ok_or_else(|| ResolutionError::UnknownVersion {
                    descriptor: descriptor.identifier(),
                    version: version.to_string(),
                    available: descriptor.versions().map(str::to_string).collect(),
                })
        }
    }
}
