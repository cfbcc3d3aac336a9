//! Immutable lookup index over a set of descriptors.
//!
//! The index owns the descriptors in one `Vec`; every lookup table stores
//! positions into it. All keys are trimmed and lowercased.

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::descriptor::Descriptor;
use crate::error::RecordError;
use crate::source::RawRecord;

fn key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// One built catalog generation.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    descriptors: Vec<Descriptor>,
    record_ids: Vec<String>,
    by_task: HashMap<String, Vec<usize>>,
    by_task_subtask: HashMap<(String, String), Vec<usize>>,
    by_model_type: HashMap<String, Vec<usize>>,
    by_model: HashMap<(String, String), Vec<usize>>,
}

impl CatalogIndex {
    /// Parse every record and index the ones that validate.
    ///
    /// Invalid records are returned alongside, never dropped silently.
    pub fn build(records: impl IntoIterator<Item = RawRecord>) -> (Self, Vec<RecordError>) {
        let mut parsed = Vec::new();
        let mut errors = Vec::new();

        for record in records {
            match record.parse() {
                Ok(descriptor) => parsed.push((record.id, descriptor)),
                Err(error) => {
                    warn!("Skipping descriptor {}: {}", record.id, error);
                    errors.push(RecordError::new(record.id, error));
                }
            }
        }

        let index = Self::from_descriptors(parsed);
        debug!(
            "Built catalog index with {} descriptors ({} rejected)",
            index.len(),
            errors.len()
        );
        (index, errors)
    }

    /// Index already-validated descriptors, keyed by record id.
    pub fn from_descriptors(items: impl IntoIterator<Item = (String, Descriptor)>) -> Self {
        let mut index = Self::default();

        for (record_id, descriptor) in items {
            let pos = index.descriptors.len();
            let task = key(descriptor.task());
            let model_type = key(descriptor.model_type());

            if let Some(subtask) = descriptor.subtask() {
                index
                    .by_task_subtask
                    .entry((task.clone(), key(subtask)))
                    .or_default()
                    .push(pos);
            }
            index.by_task.entry(task).or_default().push(pos);
            index
                .by_model
                .entry((model_type.clone(), key(descriptor.model_name())))
                .or_default()
                .push(pos);
            index.by_model_type.entry(model_type).or_default().push(pos);

            index.descriptors.push(descriptor);
            index.record_ids.push(record_id);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All descriptors in load order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Descriptors paired with the id of the record they came from.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Descriptor)> {
        self.record_ids
            .iter()
            .map(String::as_str)
            .zip(self.descriptors.iter())
    }

    /// Descriptors for a task, optionally narrowed by subtask, base model and
    /// architecture (`config.using`).
    ///
    /// An omitted `subtask` matches every subtask of the task. Matching is
    /// case-insensitive throughout. Results are in load order.
    pub fn lookup(
        &self,
        task: &str,
        subtask: Option<&str>,
        model_type: Option<&str>,
        model_name: Option<&str>,
        config: Option<&str>,
    ) -> Vec<&Descriptor> {
        let task = key(task);
        let positions = match subtask {
            Some(subtask) => self.by_task_subtask.get(&(task, key(subtask))),
            None => self.by_task.get(&task),
        };

        let model_type = model_type.map(key);
        let model_name = model_name.map(key);
        let config = config.map(key);

        positions
            .into_iter()
            .flatten()
            .map(|&pos| &self.descriptors[pos])
            .filter(|d| {
                model_type
                    .as_deref()
                    .map_or(true, |mt| key(d.model_type()) == mt)
            })
            .filter(|d| {
                model_name
                    .as_deref()
                    .map_or(true, |mn| key(d.model_name()) == mn)
            })
            .filter(|d| config.as_deref().map_or(true, |c| key(&d.config().using) == c))
            .collect()
    }

    /// Descriptors compatible with a base model, across all tasks.
    ///
    /// An omitted `model_name` matches every model of the type.
    pub fn lookup_model(&self, model_type: &str, model_name: Option<&str>) -> Vec<&Descriptor> {
        let model_type = key(model_type);
        let positions = match model_name {
            Some(name) => self.by_model.get(&(model_type, key(name))),
            None => self.by_model_type.get(&model_type),
        };
        positions
            .into_iter()
            .flatten()
            .map(|&pos| &self.descriptors[pos])
            .collect()
    }
}
