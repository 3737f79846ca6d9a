use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::RefOr;
use super::media_type::{JSON_MEDIA_TYPE, MediaType};
use super::schema::SchemaOrRef;

/// A response definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

impl Response {
    pub fn json_schema(&self) -> Option<&SchemaOrRef> {
        self.content
            .get(JSON_MEDIA_TYPE)
            .and_then(|mt| mt.schema.as_ref())
    }
}

/// A reference or inline response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Response(Response),
}

impl<'de> Deserialize<'de> for ResponseOrRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RefOr::read(deserializer, serde_json::from_value)? {
            RefOr::Ref(ref_path) => ResponseOrRef::Ref { ref_path },
            RefOr::Inline(response) => ResponseOrRef::Response(response),
        })
    }
}
