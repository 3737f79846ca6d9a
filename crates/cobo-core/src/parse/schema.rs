use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::{RefOr, lenient};

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// The `type` field can be a single type or an array of types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
}

impl TypeSet {
    /// The first non-null type named by this set.
    pub fn primary(&self) -> Option<&SchemaType> {
        match self {
            TypeSet::Single(t) => Some(t),
            TypeSet::Multiple(types) => types.iter().find(|t| **t != SchemaType::Null),
        }
    }
}

/// A reference or inline schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

impl<'de> Deserialize<'de> for SchemaOrRef {
    /// Boolean schemas (`true`/`false`) read as an empty schema.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let node = RefOr::read(deserializer, |value| match value {
            serde_json::Value::Bool(_) => Ok(Schema::default()),
            other => serde_json::from_value(other),
        })?;
        Ok(match node {
            RefOr::Ref(ref_path) => SchemaOrRef::Ref { ref_path },
            RefOr::Inline(schema) => SchemaOrRef::Schema(Box::new(schema)),
        })
    }
}

/// Discriminator for polymorphic schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// A JSON Schema object, restricted to the keywords the request engine reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_type: Option<TypeSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    // Composition
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

/// Tagged view over a [`Schema`], one variant per shape the engine handles.
///
/// Composition keywords take precedence over `type`: a schema with both
/// `oneOf` and `properties` is treated as a union.
#[derive(Debug, Clone, Copy)]
pub enum SchemaKind<'a> {
    OneOf {
        variants: &'a [SchemaOrRef],
        discriminator: Option<&'a Discriminator>,
    },
    AllOf(&'a [SchemaOrRef]),
    Array(Option<&'a SchemaOrRef>),
    Object {
        properties: &'a IndexMap<String, SchemaOrRef>,
        required: &'a [String],
    },
    Scalar(Option<&'a SchemaType>),
}

impl Schema {
    pub fn kind(&self) -> SchemaKind<'_> {
        if !self.one_of.is_empty() {
            return SchemaKind::OneOf {
                variants: &self.one_of,
                discriminator: self.discriminator.as_ref(),
            };
        }
        if !self.all_of.is_empty() {
            return SchemaKind::AllOf(&self.all_of);
        }
        match self.primary_type() {
            Some(SchemaType::Array) => SchemaKind::Array(self.items.as_deref()),
            Some(SchemaType::Object) => SchemaKind::Object {
                properties: &self.properties,
                required: &self.required,
            },
            None if !self.properties.is_empty() => SchemaKind::Object {
                properties: &self.properties,
                required: &self.required,
            },
            None if self.items.is_some() => SchemaKind::Array(self.items.as_deref()),
            other => SchemaKind::Scalar(other),
        }
    }

    pub fn primary_type(&self) -> Option<&SchemaType> {
        self.schema_type.as_ref().and_then(TypeSet::primary)
    }

    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }
}

impl SchemaOrRef {
    pub fn ref_path(&self) -> Option<&str> {
        match self {
            SchemaOrRef::Ref { ref_path } => Some(ref_path),
            SchemaOrRef::Schema(_) => None,
        }
    }
}
