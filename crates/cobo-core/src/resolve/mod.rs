//! `$ref` resolution over a loaded [`Specification`].
//!
//! References are JSON pointers into the raw document (`#/components/schemas/Foo`,
//! `#/paths/~1wallets/get/parameters/0`). A target that is itself a reference is
//! followed until a concrete node is reached; chains that revisit a pointer or
//! exceed [`MAX_REF_DEPTH`] fail with [`ResolveError::CyclicReference`].

pub mod compose;
pub mod operation;

use std::borrow::Cow;
use std::collections::HashSet;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ResolveError;
use crate::parse::Specification;
use crate::parse::parameter::{Parameter, ParameterOrRef};
use crate::parse::request_body::{RequestBody, RequestBodyOrRef};
use crate::parse::response::{Response, ResponseOrRef};
use crate::parse::schema::{Schema, SchemaOrRef};

pub use compose::{UNKNOWN_DISCRIMINATOR_VALUE, Variant, discriminator_label, merge_all_of};
pub use operation::ResolvedOperation;

/// Upper bound on reference indirection and `allOf` nesting.
pub const MAX_REF_DEPTH: usize = 32;

/// Either side of an `XOrRef` node.
pub enum Node<'a, T> {
    Ref(&'a str),
    Inline(&'a T),
}

/// A document node that is either inline or a `$ref` to a `Target`.
pub trait Resolvable {
    type Target: Clone + DeserializeOwned;

    fn node(&self) -> Node<'_, Self::Target>;
}

impl Resolvable for SchemaOrRef {
    type Target = Schema;

    fn node(&self) -> Node<'_, Schema> {
        match self {
            SchemaOrRef::Ref { ref_path } => Node::Ref(ref_path),
            SchemaOrRef::Schema(schema) => Node::Inline(schema),
        }
    }
}

impl Resolvable for ParameterOrRef {
    type Target = Parameter;

    fn node(&self) -> Node<'_, Parameter> {
        match self {
            ParameterOrRef::Ref { ref_path } => Node::Ref(ref_path),
            ParameterOrRef::Parameter(p) => Node::Inline(p),
        }
    }
}

impl Resolvable for RequestBodyOrRef {
    type Target = RequestBody;

    fn node(&self) -> Node<'_, RequestBody> {
        match self {
            RequestBodyOrRef::Ref { ref_path } => Node::Ref(ref_path),
            RequestBodyOrRef::RequestBody(rb) => Node::Inline(rb),
        }
    }
}

impl Resolvable for ResponseOrRef {
    type Target = Response;

    fn node(&self) -> Node<'_, Response> {
        match self {
            ResponseOrRef::Ref { ref_path } => Node::Ref(ref_path),
            ResponseOrRef::Response(r) => Node::Inline(r),
        }
    }
}

/// Resolve a possibly-referenced node. Inline nodes are returned borrowed and
/// unchanged.
pub fn resolve<'a, R: Resolvable>(
    spec: &Specification,
    node: &'a R,
) -> Result<Cow<'a, R::Target>, ResolveError> {
    match node.node() {
        Node::Inline(target) => Ok(Cow::Borrowed(target)),
        Node::Ref(ref_path) => resolve_ref(spec, ref_path).map(Cow::Owned),
    }
}

/// Resolve a pointer and deserialize the target as `T`.
pub fn resolve_ref<T: DeserializeOwned>(
    spec: &Specification,
    ref_path: &str,
) -> Result<T, ResolveError> {
    let node = lookup(spec, ref_path)?;
    serde_json::from_value(node.clone()).map_err(|source| ResolveError::MalformedTarget {
        ref_path: ref_path.to_string(),
        source,
    })
}

/// Follow a reference chain to the first node without a `$ref`.
pub fn lookup<'s>(spec: &'s Specification, ref_path: &str) -> Result<&'s Value, ResolveError> {
    let mut current = ref_path.to_string();
    let mut seen = HashSet::new();

    for depth in 0..MAX_REF_DEPTH {
        if !seen.insert(current.clone()) {
            return Err(ResolveError::CyclicReference {
                ref_path: ref_path.to_string(),
                depth,
            });
        }
        let node = walk_pointer(spec.raw(), &current)?;
        match node.get("$ref").and_then(Value::as_str) {
            Some(next) => {
                debug!("{current} -> {next}");
                current = next.to_string();
            }
            None => return Ok(node),
        }
    }

    Err(ResolveError::CyclicReference {
        ref_path: ref_path.to_string(),
        depth: MAX_REF_DEPTH,
    })
}

/// Last pointer segment, used as a display name (`#/components/schemas/Pet` -> `Pet`).
pub fn ref_name(ref_path: &str) -> &str {
    ref_path.rsplit('/').next().unwrap_or(ref_path)
}

fn walk_pointer<'v>(root: &'v Value, ref_path: &str) -> Result<&'v Value, ResolveError> {
    let mut segments = ref_path.split('/');
    if segments.next() != Some("#") {
        return Err(ResolveError::InvalidRefFormat(ref_path.to_string()));
    }

    let mut current = root;
    for raw in segments {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        let next = match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ResolveError::UnresolvableReference(ref_path.to_string()))?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn spec(json: Value) -> Specification {
        Specification::from_value(json).unwrap()
    }

    fn base(components: Value) -> Value {
        serde_json::json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/a/{id}": {"get": {"parameters": [{"name": "id", "in": "path", "required": true}]}}
            },
            "components": components
        })
    }

    #[test]
    fn follows_reference_chains() {
        let s = spec(base(serde_json::json!({
            "schemas": {
                "A": {"$ref": "#/components/schemas/B"},
                "B": {"$ref": "#/components/schemas/C"},
                "C": {"title": "Concrete"}
            }
        })));
        let schema: Schema = resolve_ref(&s, "#/components/schemas/A").unwrap();
        assert_eq!(schema.title.as_deref(), Some("Concrete"));
    }

    #[test]
    fn walks_escaped_path_segments_and_indices() {
        let s = spec(base(serde_json::json!({})));
        let param: Parameter = resolve_ref(&s, "#/paths/~1a~1{id}/get/parameters/0").unwrap();
        assert_eq!(param.name, "id");
    }

    #[test]
    fn self_reference_is_cyclic() {
        let s = spec(base(serde_json::json!({
            "schemas": {"Loop": {"$ref": "#/components/schemas/Loop"}}
        })));
        let err = resolve_ref::<Schema>(&s, "#/components/schemas/Loop").unwrap_err();
        assert!(matches!(err, ResolveError::CyclicReference { .. }));
    }

    #[test]
    fn two_step_cycle_is_detected() {
        let s = spec(base(serde_json::json!({
            "schemas": {
                "A": {"$ref": "#/components/schemas/B"},
                "B": {"$ref": "#/components/schemas/A"}
            }
        })));
        let err = lookup(&s, "#/components/schemas/A").unwrap_err();
        match err {
            ResolveError::CyclicReference { ref_path, depth } => {
                assert_eq!(ref_path, "#/components/schemas/A");
                assert_eq!(depth, 2);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn missing_segment_is_unresolvable() {
        let s = spec(base(serde_json::json!({"schemas": {}})));
        let err = resolve_ref::<Schema>(&s, "#/components/schemas/Nope").unwrap_err();
        assert!(matches!(err, ResolveError::UnresolvableReference(ref p) if p == "#/components/schemas/Nope"));
    }

    #[test]
    fn external_pointer_is_rejected() {
        let s = parse::from_json(&base(serde_json::json!({})).to_string()).unwrap();
        let err = lookup(&s, "other.yaml#/components/schemas/X").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidRefFormat(_)));
    }

    #[test]
    fn inline_node_is_returned_unchanged() {
        let s = spec(base(serde_json::json!({})));
        let inline = SchemaOrRef::Schema(Box::new(Schema {
            title: Some("Inline".into()),
            ..Schema::default()
        }));
        let resolved = resolve(&s, &inline).unwrap();
        assert!(matches!(resolved, Cow::Borrowed(_)));
        match &inline {
            SchemaOrRef::Schema(original) => assert_eq!(resolved.as_ref(), original.as_ref()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn ref_name_takes_last_segment() {
        assert_eq!(ref_name("#/components/schemas/Pet"), "Pet");
        assert_eq!(ref_name("Pet"), "Pet");
    }
}
