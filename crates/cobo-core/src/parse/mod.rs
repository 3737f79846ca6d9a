pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod request_body;
pub mod response;
pub mod schema;
pub mod spec;

use std::path::Path;

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use operation::PathItem;
use spec::OpenApiSpec;

/// A loaded OpenAPI document.
///
/// The typed tree drives matching, planning and rendering. The raw JSON tree
/// is kept alongside it so `$ref` pointers can be walked segment by segment.
#[derive(Debug, Clone)]
pub struct Specification {
    document: OpenApiSpec,
    raw: Value,
}

impl Specification {
    pub fn from_value(raw: Value) -> Result<Self, ParseError> {
        let document: OpenApiSpec =
            serde_path_to_error::deserialize(&raw).map_err(|err| ParseError::Document {
                path: err.path().to_string(),
                source: err.into_inner(),
            })?;
        validate_version(&document)?;
        Ok(Self { document, raw })
    }

    pub fn document(&self) -> &OpenApiSpec {
        &self.document
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Path templates in document order.
    pub fn paths(&self) -> &IndexMap<String, PathItem> {
        &self.document.paths
    }
}

/// Serialization format of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// `.json` files are JSON; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }
}

/// Parse an OpenAPI document in the given format.
pub fn from_str(input: &str, format: SpecFormat) -> Result<Specification, ParseError> {
    match format {
        SpecFormat::Yaml => from_yaml(input),
        SpecFormat::Json => from_json(input),
    }
}

/// Parse an OpenAPI document from YAML.
pub fn from_yaml(input: &str) -> Result<Specification, ParseError> {
    let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(input)?;
    Specification::from_value(yaml_to_json(value))
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<Specification, ParseError> {
    let value: Value = serde_json::from_str(input)?;
    Specification::from_value(value)
}

/// A node that is either `{"$ref": "..."}` or an inline definition.
pub(crate) enum RefOr<T> {
    Ref(String),
    Inline(T),
}

impl<T> RefOr<T> {
    /// Split off references before reading the node inline, so a malformed
    /// inline node reports its own error instead of a failed variant match.
    pub(crate) fn read<'de, D>(
        deserializer: D,
        inline: impl FnOnce(Value) -> Result<T, serde_json::Error>,
    ) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        if let Some(path) = value.get("$ref").and_then(Value::as_str) {
            return Ok(RefOr::Ref(path.to_string()));
        }
        inline(value)
            .map(RefOr::Inline)
            .map_err(serde::de::Error::custom)
    }
}

/// Read a field whose value some documents get wrong (`required: true` on a
/// property, an unknown `type`), falling back to the field's default.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn validate_version(spec: &OpenApiSpec) -> Result<(), ParseError> {
    if !spec.openapi.starts_with("3.") {
        return Err(ParseError::UnsupportedVersion(spec.openapi.clone()));
    }
    Ok(())
}

/// YAML allows non-string mapping keys (`200:` response codes); JSON does not.
fn yaml_to_json(value: serde_yaml_ng::Value) -> Value {
    use serde_yaml_ng::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(seq) => Value::Array(seq.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml_ng::Value) -> String {
    use serde_yaml_ng::Value as Yaml;

    match key {
        Yaml::String(s) => s,
        Yaml::Number(n) => n.to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Null => "null".to_string(),
        other => serde_yaml_ng::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_response_codes_become_string_keys() {
        let yaml = r#"
openapi: "3.0.3"
info:
  title: Codes
  version: "1"
paths:
  /ping:
    get:
      responses:
        200:
          description: ok
"#;
        let spec = from_yaml(yaml).unwrap();
        let op = spec.paths()["/ping"].get.as_ref().unwrap();
        assert!(op.responses.contains_key("200"));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(SpecFormat::from_path(Path::new("a/spec.JSON")), SpecFormat::Json);
        assert_eq!(SpecFormat::from_path(Path::new("spec.yml")), SpecFormat::Yaml);
        assert_eq!(SpecFormat::from_path(Path::new("spec")), SpecFormat::Yaml);
    }
}
