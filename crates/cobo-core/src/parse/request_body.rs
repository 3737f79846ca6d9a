use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use super::RefOr;
use super::media_type::{JSON_MEDIA_TYPE, MediaType};
use super::schema::SchemaOrRef;

/// A request body definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

impl RequestBody {
    /// Schema of the `application/json` content, if declared.
    pub fn json_schema(&self) -> Option<&SchemaOrRef> {
        self.content
            .get(JSON_MEDIA_TYPE)
            .and_then(|mt| mt.schema.as_ref())
    }
}

/// A reference or inline request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBodyOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    RequestBody(RequestBody),
}

impl<'de> Deserialize<'de> for RequestBodyOrRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RefOr::read(deserializer, serde_json::from_value)? {
            RefOr::Ref(ref_path) => RequestBodyOrRef::Ref { ref_path },
            RefOr::Inline(body) => RequestBodyOrRef::RequestBody(body),
        })
    }
}
