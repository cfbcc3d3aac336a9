//! Human-readable and JSON rendering of catalog results.

use adapter_catalog::{Descriptor, FileEntry};
use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

/// JSON shape of a resolved query.
#[derive(Debug, Serialize)]
pub struct Resolved<'a> {
    pub identifier: String,
    pub adapter_type: &'a str,
    pub task: &'a str,
    pub subtask: Option<&'a str>,
    pub model_type: &'a str,
    pub model_name: &'a str,
    pub config: &'a str,
    pub file: &'a FileEntry,
}

impl<'a> Resolved<'a> {
    pub fn new(descriptor: &'a Descriptor, file: &'a FileEntry) -> Self {
        Self {
            identifier: descriptor.identifier(),
            adapter_type: descriptor.adapter_type().as_str(),
            task: descriptor.task(),
            subtask: descriptor.subtask(),
            model_type: descriptor.model_type(),
            model_name: descriptor.model_name(),
            config: &descriptor.config().using,
            file,
        }
    }
}

pub fn subtask_matches(descriptor: &Descriptor, subtask: Option<&str>) -> bool {
    subtask.map_or(true, |s| {
        descriptor
            .subtask()
            .is_some_and(|own| own.eq_ignore_ascii_case(s.trim()))
    })
}

pub fn model_name_matches(descriptor: &Descriptor, model_name: Option<&str>) -> bool {
    model_name.map_or(true, |m| descriptor.model_name().eq_ignore_ascii_case(m.trim()))
}

pub fn config_matches(descriptor: &Descriptor, config: Option<&str>) -> bool {
    config.map_or(true, |c| descriptor.config().using.eq_ignore_ascii_case(c.trim()))
}

/// JSON array of full descriptors.
///
/// Card metadata may use keys JSON can't represent (numbers, nulls,
/// sequences), so descriptors go through YAML first and keys are rendered
/// as YAML scalars.
pub fn descriptors_json(descriptors: &[&Descriptor]) -> anyhow::Result<JsonValue> {
    descriptors
        .iter()
        .map(|d| -> anyhow::Result<JsonValue> { Ok(yaml_to_json(serde_yaml::to_value(d)?)) })
        .collect()
}

fn yaml_to_json(value: YamlValue) -> JsonValue {
    match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(b) => JsonValue::Bool(b),
        YamlValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else if let Some(u) = n.as_u64() {
                u.into()
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(JsonValue::Null, JsonValue::Number)
            }
        }
        YamlValue::String(s) => JsonValue::String(s),
        YamlValue::Sequence(seq) => JsonValue::Array(seq.into_iter().map(yaml_to_json).collect()),
        YamlValue::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (json_key(k), yaml_to_json(v)))
                .collect(),
        ),
        YamlValue::Tagged(tagged) => {
            let tagged = *tagged;
            yaml_to_json(tagged.value)
        }
    }
}

fn json_key(key: YamlValue) -> String {
    match key {
        YamlValue::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

pub fn print_table(descriptors: &[&Descriptor]) {
    if descriptors.is_empty() {
        println!("No adapters found");
        return;
    }

    let rows: Vec<[String; 4]> = descriptors
        .iter()
        .map(|d| {
            [
                d.identifier(),
                d.adapter_type().to_string(),
                d.default_version().to_string(),
                d.versions().collect::<Vec<_>>().join(","),
            ]
        })
        .collect();

    let width = rows
        .iter()
        .map(|row| row[0].len())
        .max()
        .unwrap_or(0)
        .max("ADAPTER".len());

    println!("{:<width$}  {:<9}  {:<7}  VERSIONS", "ADAPTER", "TYPE", "DEFAULT");
    for [identifier, adapter_type, default, versions] in rows {
        println!(
            "{:<width$}  {:<9}  {:<7}  {}",
            identifier, adapter_type, default, versions
        );
    }
}

pub fn print_resolved(descriptor: &Descriptor, file: &FileEntry) {
    println!("adapter:  {}", descriptor.identifier());
    println!("model:    {} ({})", descriptor.model_name(), descriptor.model_type());
    if let Some(author) = descriptor.author() {
        println!("author:   {}", author);
    }
    println!("version:  {}", file.version);
    println!("url:      {}", file.url);
    if let Some(sha1) = &file.sha1 {
        println!("sha1:     {}", sha1);
    }
    if let Some(sha256) = &file.sha256 {
        println!("sha256:   {}", sha256);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_catalog::parse_descriptor_str;

    fn descriptor() -> Descriptor {
        parse_descriptor_str(
            "type: text_task\ntask: lm\nsubtask: Poem\nmodel_type: GPT2\nmodel_name: gpt2\nconfig:\n  using: pfeiffer\ndefault_version: \"1\"\nfiles:\n  - version: \"1\"\n    url: https://example.org/poem.zip\n    sha256: e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\n",
        )
        .unwrap()
    }

    #[test]
    fn test_filters() {
        let d = descriptor();
        assert!(subtask_matches(&d, None));
        assert!(subtask_matches(&d, Some("poem")));
        assert!(!subtask_matches(&d, Some("news")));
        assert!(model_name_matches(&d, Some("GPT2")));
        assert!(!model_name_matches(&d, Some("bert-base-uncased")));
        assert!(config_matches(&d, Some("Pfeiffer")));
        assert!(!config_matches(&d, Some("houlsby")));
    }

    #[test]
    fn test_listing_json_with_non_string_metadata_keys() {
        let d = parse_descriptor_str(
            "type: text_task\ntask: lm\nmodel_type: gpt2\nmodel_name: gpt2\nconfig:\n  using: pfeiffer\ndefault_version: \"1\"\nfiles:\n  - version: \"1\"\n    url: https://example.org/lm.zip\n    sha256: e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855\ncitation:\n  1: first\n  ~: nothing\n",
        )
        .unwrap();

        let json = descriptors_json(&[&d]).unwrap();
        assert_eq!(json[0]["task"], "lm");
        assert_eq!(json[0]["citation"]["1"], "first");
        assert_eq!(json[0]["citation"]["null"], "nothing");
        assert_eq!(json[0]["files"][0]["version"], "1");
    }

    #[test]
    fn test_resolved_json_shape() {
        let d = descriptor();
        let json = serde_json::to_value(Resolved::new(&d, d.default_file())).unwrap();
        assert_eq!(json["identifier"], "gpt2_lm_Poem_pfeiffer");
        assert_eq!(json["adapter_type"], "text_task");
        assert_eq!(json["file"]["url"], "https://example.org/poem.zip");
        assert!(json["file"].get("sha1").is_none());
    }
}
