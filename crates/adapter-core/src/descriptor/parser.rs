//! Descriptor card parser.
//!
//! Turns one raw YAML record into a validated [`Descriptor`]. Every failure
//! is a [`SchemaError`] naming the offending field by path.
//!
//! Normalization applied here:
//! - `files` given as a mapping keyed by version becomes a sequence
//! - numeric versions (`default_version: 1`) become strings
//! - digests are lowercased
//! - null and empty-string optional fields are treated as absent

use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use super::types::{AdapterType, ArchitectureConfig, Contact, Descriptor, FileEntry};
use crate::config::{CatalogConfig, HashingConfig};
use crate::error::SchemaError;

type Fields = BTreeMap<String, Value>;

/// Parse a card from YAML (or JSON) text.
pub fn parse_descriptor_str(input: &str) -> Result<Descriptor, SchemaError> {
    let value: Value = serde_yaml::from_str(input).map_err(|e| {
        SchemaError::new(
            CatalogConfig::DOCUMENT_FIELD,
            format!("not a valid YAML document: {}", e),
        )
    })?;
    parse_descriptor(&value)
}

/// Parse an already-loaded record.
pub fn parse_descriptor(raw: &Value) -> Result<Descriptor, SchemaError> {
    let mapping = raw.as_mapping().ok_or_else(|| {
        SchemaError::wrong_type(CatalogConfig::DOCUMENT_FIELD, "a mapping of fields")
    })?;
    let mut fields = into_fields(mapping, "")?;

    let type_str = take_required_str(&mut fields, "", "type")?;
    let adapter_type = AdapterType::from_str(&type_str).map_err(|_| {
        SchemaError::new(
            "type",
            format!("unknown adapter type {:?} (expected text_task or text_lang)", type_str),
        )
    })?;

    let task = take_required_str(&mut fields, "", "task")?;
    let subtask = take_optional_str(&mut fields, "", "subtask")?;
    let model_type = take_required_str(&mut fields, "", "model_type")?;
    let model_name = take_required_str(&mut fields, "", "model_name")?;
    let model_class = take_optional_str(&mut fields, "", "model_class")?;
    let author = take_optional_str(&mut fields, "", "author")?;
    let contact = take_contact(&mut fields)?;
    let config = take_config(&mut fields)?;
    let prediction_head = take_optional_bool(&mut fields, "", "prediction_head")?;

    let default_version = match fields.remove("default_version") {
        Some(value) if !value.is_null() => scalar_to_string(&value)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SchemaError::wrong_type("default_version", "a non-empty version string"))?,
        _ => return Err(SchemaError::missing("default_version")),
    };

    let files = match fields.remove("files") {
        Some(value) if !value.is_null() => parse_files(&value)?,
        _ => return Err(SchemaError::missing("files")),
    };

    let default_index = files
        .iter()
        .position(|f| f.version == default_version)
        .ok_or_else(|| {
            SchemaError::new(
                "default_version",
                format!(
                    "{:?} does not match any version in files (available: {})",
                    default_version,
                    files
                        .iter()
                        .map(|f| f.version.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )
        })?;

    Ok(Descriptor {
        adapter_type,
        task,
        subtask,
        model_type,
        model_name,
        model_class,
        author,
        contact,
        config,
        default_version,
        files,
        prediction_head,
        metadata: fields,
        default_index,
    })
}

fn parse_files(value: &Value) -> Result<Vec<FileEntry>, SchemaError> {
    let files = match value {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let path = format!("files[{}]", i);
                let mapping = item
                    .as_mapping()
                    .ok_or_else(|| SchemaError::wrong_type(&path, "a mapping"))?;
                parse_file_entry(&path, mapping, None)
            })
            .collect::<Result<Vec<_>, _>>()?,
        Value::Mapping(entries) => entries
            .iter()
            .map(|(key, item)| {
                let version = scalar_to_string(key)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| SchemaError::wrong_type("files", "version keys to be strings"))?;
                let path = format!("files.{}", version);
                let mapping = item
                    .as_mapping()
                    .ok_or_else(|| SchemaError::wrong_type(&path, "a mapping"))?;
                parse_file_entry(&path, mapping, Some(version))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(SchemaError::wrong_type(
                "files",
                "a sequence of entries or a mapping keyed by version",
            ))
        }
    };

    if files.is_empty() {
        return Err(SchemaError::new("files", "must contain at least one entry"));
    }

    let mut seen = HashSet::new();
    for (i, file) in files.iter().enumerate() {
        if !seen.insert(file.version.as_str()) {
            return Err(SchemaError::new(
                format!("files[{}].version", i),
                format!("duplicate version {:?}", file.version),
            ));
        }
    }

    Ok(files)
}

fn parse_file_entry(
    path: &str,
    mapping: &Mapping,
    key_version: Option<String>,
) -> Result<FileEntry, SchemaError> {
    let mut fields = into_fields(mapping, path)?;

    let declared = match fields.remove("version") {
        Some(value) if !value.is_null() => Some(
            scalar_to_string(&value)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| SchemaError::wrong_type(field_path(path, "version"), "a non-empty version string"))?,
        ),
        _ => None,
    };

    let version = match (key_version, declared) {
        (Some(key), Some(declared)) if key != declared => {
            return Err(SchemaError::new(
                field_path(path, "version"),
                format!("{:?} disagrees with its key {:?}", declared, key),
            ))
        }
        (Some(key), _) => key,
        (None, Some(declared)) => declared,
        (None, None) => return Err(SchemaError::missing(field_path(path, "version"))),
    };

    let url = take_required_str(&mut fields, path, "url")?;
    let sha1 = take_digest(&mut fields, path, "sha1", HashingConfig::SHA1_HEX_LEN)?;
    let sha256 = take_digest(&mut fields, path, "sha256", HashingConfig::SHA256_HEX_LEN)?;
    let description = take_optional_str(&mut fields, path, "description")?;

    if sha1.is_none() && sha256.is_none() {
        return Err(SchemaError::new(
            path,
            "at least one of sha1 or sha256 is required",
        ));
    }

    Ok(FileEntry {
        version,
        url,
        sha1,
        sha256,
        description,
    })
}

fn take_config(fields: &mut Fields) -> Result<ArchitectureConfig, SchemaError> {
    let mapping = match fields.remove("config") {
        Some(Value::Mapping(mapping)) => mapping,
        Some(Value::Null) | None => return Err(SchemaError::missing("config.using")),
        Some(_) => return Err(SchemaError::wrong_type("config", "a mapping with a `using` key")),
    };
    let mut config = into_fields(&mapping, "config")?;

    let using = take_required_str(&mut config, "config", "using")?;
    let non_linearity = take_optional_str(&mut config, "config", "non_linearity")?;
    let reduction_factor = match config.remove("reduction_factor") {
        Some(Value::Null) | None => None,
        Some(value) => match value.as_f64() {
            Some(factor) if factor > 0.0 => Some(factor),
            _ => {
                return Err(SchemaError::wrong_type(
                    "config.reduction_factor",
                    "a positive number",
                ))
            }
        },
    };

    Ok(ArchitectureConfig {
        using,
        non_linearity,
        reduction_factor,
        extra: config,
    })
}

/// Contact handles may sit at the top level or inside a `contact` mapping.
fn take_contact(fields: &mut Fields) -> Result<Contact, SchemaError> {
    let mut nested = match fields.remove("contact") {
        Some(Value::Mapping(mapping)) => into_fields(&mapping, "contact")?,
        Some(Value::Null) | None => Fields::new(),
        Some(_) => return Err(SchemaError::wrong_type("contact", "a mapping")),
    };

    let mut pick = |key: &str| -> Result<Option<String>, SchemaError> {
        match take_optional_str(fields, "", key)? {
            Some(value) => Ok(Some(value)),
            None => take_optional_str(&mut nested, "contact", key),
        }
    };

    let email = pick("email")?;
    let github = pick("github")?;
    let twitter = pick("twitter")?;

    Ok(Contact {
        email,
        github,
        twitter,
    })
}

fn take_digest(
    fields: &mut Fields,
    path: &str,
    key: &str,
    expected_len: usize,
) -> Result<Option<String>, SchemaError> {
    let Some(digest) = take_optional_str(fields, path, key)? else {
        return Ok(None);
    };
    if digest.len() != expected_len || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(SchemaError::new(
            field_path(path, key),
            format!("expected {} hexadecimal characters", expected_len),
        ));
    }
    Ok(Some(digest.to_lowercase()))
}

fn take_required_str(fields: &mut Fields, path: &str, key: &str) -> Result<String, SchemaError> {
    take_optional_str(fields, path, key)?.ok_or_else(|| SchemaError::missing(field_path(path, key)))
}

fn take_optional_str(
    fields: &mut Fields,
    path: &str,
    key: &str,
) -> Result<Option<String>, SchemaError> {
    match fields.remove(key) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(_) => Err(SchemaError::wrong_type(field_path(path, key), "a string")),
    }
}

fn take_optional_bool(
    fields: &mut Fields,
    path: &str,
    key: &str,
) -> Result<Option<bool>, SchemaError> {
    match fields.remove(key) {
        Some(Value::Null) | None => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(_) => Err(SchemaError::wrong_type(field_path(path, key), "a boolean")),
    }
}

/// Render a string or number scalar as a string.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn into_fields(mapping: &Mapping, path: &str) -> Result<Fields, SchemaError> {
    let mut fields = Fields::new();
    for (key, value) in mapping {
        let Value::String(name) = key else {
            let at = if path.is_empty() {
                CatalogConfig::DOCUMENT_FIELD
            } else {
                path
            };
            return Err(SchemaError::wrong_type(at, "field names to be strings"));
        };
        fields.insert(name.clone(), value.clone());
    }
    Ok(fields)
}

fn field_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA1: &str = "da39a3ee5e6b4b0d3255bfef95601890afd80709";
    const SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn card(files: &str) -> String {
        format!(
            r#"
type: text_task
task: sts
subtask: mrpc
model_type: bert
model_name: bert-base-uncased
author: Jane Doe
email: jane@example.org
config:
  using: pfeiffer
  non_linearity: relu
  reduction_factor: 16
default_version: "1"
citation: "@inproceedings{{doe2020}}"
description: Adapter for MRPC
{}
"#,
            files
        )
    }

    fn sequence_files() -> String {
        format!(
            r#"files:
  - version: "1"
    url: https://example.org/mrpc.zip
    sha1: {}
    sha256: {}
"#,
            SHA1, SHA256
        )
    }

    fn expect_error(input: &str) -> SchemaError {
        parse_descriptor_str(input).expect_err("card should be rejected")
    }

    #[test]
    fn test_parse_complete_card() {
        let descriptor = parse_descriptor_str(&card(&sequence_files())).unwrap();

        assert_eq!(descriptor.adapter_type(), AdapterType::TextTask);
        assert_eq!(descriptor.task(), "sts");
        assert_eq!(descriptor.subtask(), Some("mrpc"));
        assert_eq!(descriptor.model_name(), "bert-base-uncased");
        assert_eq!(descriptor.author(), Some("Jane Doe"));
        assert_eq!(descriptor.contact().email.as_deref(), Some("jane@example.org"));
        assert_eq!(descriptor.config().using, "pfeiffer");
        assert_eq!(descriptor.config().non_linearity.as_deref(), Some("relu"));
        assert_eq!(descriptor.config().reduction_factor, Some(16.0));
        assert_eq!(descriptor.default_file().url, "https://example.org/mrpc.zip");
        assert_eq!(descriptor.metadata_str("description"), Some("Adapter for MRPC"));
        assert!(descriptor.metadata().contains_key("citation"));
        assert_eq!(descriptor.identifier(), "bert-base-uncased_sts_mrpc_pfeiffer");
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = card(&sequence_files());
        assert_eq!(
            parse_descriptor_str(&input).unwrap(),
            parse_descriptor_str(&input).unwrap()
        );
    }

    #[test]
    fn test_files_mapping_normalizes_to_sequence() {
        let files = format!(
            r#"files:
  1:
    url: https://example.org/mrpc.zip
    sha256: {}
"#,
            SHA256
        );
        let descriptor = parse_descriptor_str(&card(&files)).unwrap();
        assert_eq!(descriptor.files().len(), 1);
        assert_eq!(descriptor.files()[0].version, "1");
        assert_eq!(descriptor.files()[0].sha1, None);
    }

    #[test]
    fn test_files_mapping_version_must_agree_with_key() {
        let files = format!(
            r#"files:
  "1":
    version: "2"
    url: https://example.org/mrpc.zip
    sha256: {}
"#,
            SHA256
        );
        let err = expect_error(&card(&files));
        assert_eq!(err.field, "files.1.version");
    }

    #[test]
    fn test_missing_files() {
        let err = expect_error(&card(""));
        assert_eq!(err.field, "files");
    }

    #[test]
    fn test_empty_files() {
        let err = expect_error(&card("files: []"));
        assert_eq!(err.field, "files");
        assert!(err.rule.contains("at least one"));
    }

    #[test]
    fn test_files_wrong_shape() {
        let err = expect_error(&card("files: https://example.org/mrpc.zip"));
        assert_eq!(err.field, "files");
    }

    #[test]
    fn test_default_version_must_resolve() {
        let input = card(&sequence_files()).replace("default_version: \"1\"", "default_version: \"2\"");
        let err = expect_error(&input);
        assert_eq!(err.field, "default_version");
    }

    #[test]
    fn test_numeric_default_version() {
        let input = card(&sequence_files()).replace("default_version: \"1\"", "default_version: 1");
        let descriptor = parse_descriptor_str(&input).unwrap();
        assert_eq!(descriptor.default_version(), "1");
    }

    #[test]
    fn test_duplicate_versions_rejected() {
        let files = format!(
            r#"files:
  - version: "1"
    url: https://example.org/a.zip
    sha256: {sha}
  - version: "1"
    url: https://example.org/b.zip
    sha256: {sha}
"#,
            sha = SHA256
        );
        let err = expect_error(&card(&files));
        assert_eq!(err.field, "files[1].version");
    }

    #[test]
    fn test_file_entry_requires_a_digest() {
        let files = r#"files:
  - version: "1"
    url: https://example.org/a.zip
"#;
        let err = expect_error(&card(files));
        assert_eq!(err.field, "files[0]");
    }

    #[test]
    fn test_file_entry_requires_url() {
        let files = format!(
            r#"files:
  - version: "1"
    sha256: {}
"#,
            SHA256
        );
        let err = expect_error(&card(&files));
        assert_eq!(err.field, "files[0].url");
    }

    #[test]
    fn test_malformed_digest() {
        let files = r#"files:
  - version: "1"
    url: https://example.org/a.zip
    sha256: not-a-digest
"#;
        let err = expect_error(&card(files));
        assert_eq!(err.field, "files[0].sha256");
    }

    #[test]
    fn test_digest_is_lowercased() {
        let files = format!(
            r#"files:
  - version: "1"
    url: https://example.org/a.zip
    sha1: {}
"#,
            SHA1.to_uppercase()
        );
        let descriptor = parse_descriptor_str(&card(&files)).unwrap();
        assert_eq!(descriptor.files()[0].sha1.as_deref(), Some(SHA1));
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["type", "task", "model_type", "model_name"] {
            let input: String = card(&sequence_files())
                .lines()
                .filter(|line| !line.starts_with(&format!("{}:", field)))
                .collect::<Vec<_>>()
                .join("\n");
            let err = expect_error(&input);
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn test_missing_config_using() {
        let input = card(&sequence_files()).replace("  using: pfeiffer\n", "");
        let err = expect_error(&input);
        assert_eq!(err.field, "config.using");
    }

    #[test]
    fn test_config_must_be_mapping() {
        let input = card(&sequence_files()).replace(
            "config:\n  using: pfeiffer\n  non_linearity: relu\n  reduction_factor: 16\n",
            "config: pfeiffer\n",
        );
        let err = expect_error(&input);
        assert_eq!(err.field, "config");
    }

    #[test]
    fn test_unknown_adapter_type() {
        let input = card(&sequence_files()).replace("type: text_task", "type: image_task");
        let err = expect_error(&input);
        assert_eq!(err.field, "type");
    }

    #[test]
    fn test_wrong_scalar_kind() {
        let input = card(&sequence_files()).replace("task: sts", "task: [sts]");
        let err = expect_error(&input);
        assert_eq!(err.field, "task");
        assert_eq!(err.rule, "expected a string");
    }

    #[test]
    fn test_model_casing_retained() {
        let input = card(&sequence_files()).replace("model_type: bert", "model_type: GPT2");
        let descriptor = parse_descriptor_str(&input).unwrap();
        assert_eq!(descriptor.model_type(), "GPT2");
    }

    #[test]
    fn test_unknown_fields_preserved() {
        let input = format!("{}\nlicense: apache-2.0\n", card(&sequence_files()));
        let descriptor = parse_descriptor_str(&input).unwrap();
        assert_eq!(descriptor.metadata_str("license"), Some("apache-2.0"));
    }

    #[test]
    fn test_nested_contact_and_advisory_fields() {
        let input = card(&sequence_files()).replace(
            "email: jane@example.org",
            "contact:\n  github: janedoe\nmodel_class: BertModelWithHeads\nprediction_head: true",
        );
        let descriptor = parse_descriptor_str(&input).unwrap();
        assert_eq!(descriptor.contact().github.as_deref(), Some("janedoe"));
        assert_eq!(descriptor.contact().email, None);
        assert_eq!(descriptor.model_class(), Some("BertModelWithHeads"));
        assert_eq!(descriptor.prediction_head(), Some(true));
    }

    #[test]
    fn test_optional_subtask() {
        let input = card(&sequence_files()).replace("subtask: mrpc\n", "subtask:\n");
        let descriptor = parse_descriptor_str(&input).unwrap();
        assert_eq!(descriptor.subtask(), None);
        assert_eq!(descriptor.identifier(), "bert-base-uncased_sts_pfeiffer");
    }

    #[test]
    fn test_not_a_mapping() {
        let err = expect_error("- just\n- a list\n");
        assert_eq!(err.field, CatalogConfig::DOCUMENT_FIELD);
    }

    #[test]
    fn test_invalid_yaml() {
        let err = expect_error("type: [unterminated");
        assert_eq!(err.field, CatalogConfig::DOCUMENT_FIELD);
    }
}
