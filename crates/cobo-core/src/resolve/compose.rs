//! Flattening of `allOf` compositions and labelling of `oneOf` variants.

use crate::error::ResolveError;
use crate::parse::Specification;
use crate::parse::schema::{Schema, SchemaKind, SchemaOrRef};

use super::{MAX_REF_DEPTH, ref_name, resolve};

pub const UNKNOWN_DISCRIMINATOR_VALUE: &str = "Unknown discriminator value";

/// Flatten an `allOf` schema into a single schema.
///
/// Members are resolved and applied in order, then the schema's own keywords on
/// top. A later layer replaces an earlier one keyword by keyword and property by
/// property (no deep merge of a property's own schema); `required` lists
/// accumulate. Schemas without `allOf` are returned as-is.
pub fn merge_all_of(schema: &Schema, spec: &Specification) -> Result<Schema, ResolveError> {
    merge_at_depth(schema, spec, 0)
}

fn merge_at_depth(
    schema: &Schema,
    spec: &Specification,
    depth: usize,
) -> Result<Schema, ResolveError> {
    let SchemaKind::AllOf(members) = schema.kind() else {
        if schema.all_of.is_empty() {
            return Ok(schema.clone());
        }
        // oneOf alongside allOf: flatten the shared part, keep the union.
        let mut shared = schema.clone();
        let one_of = std::mem::take(&mut shared.one_of);
        let mut merged = merge_at_depth(&shared, spec, depth)?;
        merged.one_of = one_of;
        return Ok(merged);
    };

    if depth >= MAX_REF_DEPTH {
        return Err(ResolveError::CyclicReference {
            ref_path: first_ref(members).unwrap_or("allOf").to_string(),
            depth,
        });
    }

    let mut merged = Schema::default();
    for member in members {
        let resolved = resolve(spec, member)?;
        let flat = merge_at_depth(&resolved, spec, depth + 1)?;
        overlay(&mut merged, flat);
    }

    let mut own = schema.clone();
    own.all_of.clear();
    overlay(&mut merged, own);
    Ok(merged)
}

fn first_ref(members: &[SchemaOrRef]) -> Option<&str> {
    members.iter().find_map(SchemaOrRef::ref_path)
}

fn overlay(target: &mut Schema, layer: Schema) {
    macro_rules! replace_if_set {
        ($($field:ident),*) => {
            $(if layer.$field.is_some() {
                target.$field = layer.$field;
            })*
        };
    }
    replace_if_set!(
        schema_type,
        title,
        description,
        items,
        discriminator,
        const_value,
        example
    );

    if !layer.enum_values.is_empty() {
        target.enum_values = layer.enum_values;
    }
    if !layer.one_of.is_empty() {
        target.one_of = layer.one_of;
    }
    for (name, property) in layer.properties {
        target.properties.insert(name, property);
    }
    for name in layer.required {
        if !target.required.contains(&name) {
            target.required.push(name);
        }
    }
}

/// Human label for a `oneOf` variant: `title`, else `description`, else the
/// first `title`/`description` among its `allOf` members.
pub fn discriminator_label(schema: &Schema, spec: &Specification) -> String {
    if let Some(label) = schema.title.as_ref().or(schema.description.as_ref()) {
        return label.clone();
    }
    for member in &schema.all_of {
        let Ok(resolved) = resolve(spec, member) else {
            continue;
        };
        if let Some(label) = resolved.title.as_ref().or(resolved.description.as_ref()) {
            return label.clone();
        }
    }
    UNKNOWN_DISCRIMINATOR_VALUE.to_string()
}

/// One branch of a `oneOf` union, resolved and flattened.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub ref_path: Option<String>,
    /// Discriminator values that explicitly select this branch, from the
    /// discriminator mapping or a single-valued `enum`/`const` on the
    /// discriminator property.
    pub selectors: Vec<String>,
    pub schema: Schema,
}

impl Variant {
    /// Resolve and flatten every branch of `union`.
    pub fn all(union: &Schema, spec: &Specification) -> Result<Vec<Variant>, ResolveError> {
        let discriminator = union.discriminator.as_ref();
        let mut variants = Vec::with_capacity(union.one_of.len());

        for branch in &union.one_of {
            let resolved = resolve(spec, branch)?;
            let label = discriminator_label(&resolved, spec);
            let schema = merge_all_of(&resolved, spec)?;
            let ref_path = branch.ref_path().map(str::to_string);

            let mut selectors = Vec::new();
            if let Some(d) = discriminator {
                if let Some(ref_path) = &ref_path {
                    selectors.extend(
                        d.mapping
                            .iter()
                            .filter(|(_, target)| *target == ref_path)
                            .map(|(value, _)| value.clone()),
                    );
                }
                if let Some(value) = fixed_value(&schema, &d.property_name, spec) {
                    if !selectors.contains(&value) {
                        selectors.push(value);
                    }
                }
            }

            variants.push(Variant {
                label,
                ref_path,
                selectors,
                schema,
            });
        }
        Ok(variants)
    }

    /// Pick the branch a discriminator value selects: explicit selectors first,
    /// then labels, then reference names.
    pub fn select<'v>(variants: &'v [Variant], value: &str) -> Option<&'v Variant> {
        variants
            .iter()
            .find(|v| v.selectors.iter().any(|s| s == value))
            .or_else(|| variants.iter().find(|v| v.label == value))
            .or_else(|| {
                variants
                    .iter()
                    .find(|v| v.ref_path.as_deref().map(ref_name) == Some(value))
            })
    }

    /// The value a user would type to select this branch.
    pub fn display_value(&self) -> &str {
        self.selectors.first().unwrap_or(&self.label)
    }
}

fn fixed_value(schema: &Schema, property: &str, spec: &Specification) -> Option<String> {
    let prop = resolve(spec, schema.properties.get(property)?).ok()?;
    let value = match (&prop.const_value, prop.enum_values.as_slice()) {
        (Some(c), _) => c,
        (None, [single]) => single,
        _ => return None,
    };
    Some(match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}
