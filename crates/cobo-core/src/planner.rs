//! Deciding which inputs an operation needs and where each supplied value goes.
//!
//! Collection policy lives here; soliciting values is delegated to a
//! [`PromptSurface`] so the policy can be exercised without a terminal.

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::PlanError;
use crate::parse::Specification;
use crate::parse::parameter::{Parameter, ParameterLocation};
use crate::parse::schema::{Schema, SchemaType};
use crate::resolve::{ResolvedOperation, Variant, resolve};

/// Key/value pairs in the order the user supplied them.
pub type Inputs = IndexMap<String, String>;

const NO_DESCRIPTION: &str = "No description";

/// Upper bound on prompt rounds. A discriminated body needs two: one for the
/// discriminator, one for the chosen variant's fields.
const MAX_PROMPT_ROUNDS: usize = 3;

/// A required input the user has not supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct NeededInput {
    pub name: String,
    pub description: String,
    /// Allowed values, when the schema enumerates them.
    pub choices: Vec<String>,
}

impl NeededInput {
    pub fn prompt_label(&self) -> String {
        if self.choices.is_empty() {
            format!("{} (REQUIRED - {})", self.name, self.description)
        } else {
            format!(
                "{} (REQUIRED - {}) [{}]",
                self.name,
                self.description,
                self.choices.join(", ")
            )
        }
    }
}

/// Blocking input of one value. Implementations offer `need.choices` as a
/// pick list when it is non-empty.
pub trait PromptSurface {
    fn ask(&mut self, need: &NeededInput) -> std::io::Result<String>;
}

/// Supplied values partitioned by destination.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPlan {
    pub path_params: Inputs,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// The request body schema with its `oneOf` branches expanded.
struct BodyShape {
    schema: Schema,
    discriminator: Option<String>,
    variants: Vec<Variant>,
}

impl BodyShape {
    fn load(spec: &Specification, op: &ResolvedOperation) -> Result<Option<Self>, PlanError> {
        let Some(schema) = op.body_schema(spec)? else {
            return Ok(None);
        };
        let variants = if schema.one_of.is_empty() {
            Vec::new()
        } else {
            Variant::all(&schema, spec)?
        };
        let discriminator = schema
            .discriminator
            .as_ref()
            .map(|d| d.property_name.clone());
        Ok(Some(Self {
            schema,
            discriminator,
            variants,
        }))
    }

    /// The branch chosen by the supplied discriminator value, if any.
    fn selected(&self, supplied: &Inputs) -> Result<Option<&Variant>, PlanError> {
        let Some(property) = &self.discriminator else {
            return Ok(None);
        };
        let Some(value) = supplied.get(property) else {
            return Ok(None);
        };
        match Variant::select(&self.variants, value) {
            Some(variant) => Ok(Some(variant)),
            None => Err(PlanError::UnknownVariant {
                discriminator: property.clone(),
                value: value.clone(),
                known: self
                    .variants
                    .iter()
                    .map(|v| v.display_value().to_string())
                    .collect(),
            }),
        }
    }

    fn property(&self, spec: &Specification, name: &str, variant: Option<&Variant>) -> Option<Schema> {
        let prop = variant
            .and_then(|v| v.schema.properties.get(name))
            .or_else(|| self.schema.properties.get(name))?;
        resolve(spec, prop).ok().map(|s| s.into_owned())
    }
}

/// Required inputs absent from `supplied`, in declaration order.
///
/// GET/DELETE consult the declared parameters, skipping those bound from the
/// path. POST/PUT consult required non-path parameters and the request body's
/// `required` list. For a discriminated `oneOf` body the discriminator is
/// requested first; once it is known only the selected variant's `required`
/// set (plus the outer schema's) applies.
pub fn required_missing(
    spec: &Specification,
    op: &ResolvedOperation,
    supplied: &Inputs,
    path_params: &Inputs,
) -> Result<Vec<NeededInput>, PlanError> {
    let mut missing: Vec<NeededInput> = Vec::new();

    for param in op.non_path_parameters() {
        if param.required && !supplied.contains_key(&param.name) && !path_params.contains_key(&param.name) {
            push_unique(&mut missing, parameter_need(spec, param));
        }
    }

    if !op.method.has_body() {
        return Ok(missing);
    }
    let Some(body) = BodyShape::load(spec, op)? else {
        return Ok(missing);
    };

    let mut required: Vec<&String> = body.schema.required.iter().collect();
    let variant = body.selected(supplied)?;
    match (&body.discriminator, variant) {
        (Some(property), None) if !body.variants.is_empty() => {
            // The variant's own required set is unknown until this is answered.
            push_unique(
                &mut missing,
                NeededInput {
                    name: property.clone(),
                    description: body
                        .property(spec, property, None)
                        .and_then(|s| s.description)
                        .unwrap_or_else(|| "selects the request body structure".to_string()),
                    choices: body
                        .variants
                        .iter()
                        .map(|v| v.display_value().to_string())
                        .collect(),
                },
            );
        }
        (_, Some(variant)) => required.extend(variant.schema.required.iter()),
        _ => {}
    }

    for name in required {
        if supplied.contains_key(name) || path_params.contains_key(name) {
            continue;
        }
        let prop = body.property(spec, name, variant);
        push_unique(
            &mut missing,
            NeededInput {
                name: name.clone(),
                description: prop
                    .as_ref()
                    .and_then(|s| s.description.clone())
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                choices: prop.as_ref().map(enum_strings).unwrap_or_default(),
            },
        );
    }

    Ok(missing)
}

/// Every name the operation accepts: declared parameters, body properties and
/// the properties of every `oneOf` branch.
pub fn valid_parameters(
    spec: &Specification,
    op: &ResolvedOperation,
) -> Result<Vec<String>, PlanError> {
    let mut valid: Vec<String> = Vec::new();

    for param in &op.parameters {
        push_name(&mut valid, &param.name);
    }
    if op.method.has_body() {
        if let Some(body) = BodyShape::load(spec, op)? {
            if let Some(property) = &body.discriminator {
                push_name(&mut valid, property);
            }
            for name in body.schema.properties.keys() {
                push_name(&mut valid, name);
            }
            for variant in &body.variants {
                for name in variant.schema.properties.keys() {
                    push_name(&mut valid, name);
                }
            }
        }
    }
    Ok(valid)
}

/// Client-side gate: every supplied key must be a declared input.
pub fn validate(
    spec: &Specification,
    op: &ResolvedOperation,
    supplied: &Inputs,
) -> Result<(), PlanError> {
    let valid = valid_parameters(spec, op)?;
    let invalid: Vec<String> = supplied
        .keys()
        .filter(|key| !valid.contains(*key))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(PlanError::InvalidParameter { invalid, valid })
    }
}

/// Ask for each missing required input and merge the answers into `supplied`.
pub fn fill_missing(
    spec: &Specification,
    op: &ResolvedOperation,
    supplied: &mut Inputs,
    path_params: &Inputs,
    prompt: &mut dyn PromptSurface,
) -> Result<(), PlanError> {
    for _ in 0..MAX_PROMPT_ROUNDS {
        let missing = required_missing(spec, op, supplied, path_params)?;
        if missing.is_empty() {
            break;
        }
        for need in missing {
            let value = prompt.ask(&need).map_err(|source| PlanError::Prompt {
                name: need.name.clone(),
                source,
            })?;
            supplied.insert(need.name, value);
        }
    }
    Ok(())
}

/// Route each supplied value to the path, query string, headers or JSON body.
///
/// For GET/DELETE everything not bound elsewhere becomes a query parameter.
/// For POST/PUT, names of declared query/header parameters go there and the
/// rest form the body; body values are typed by their property schema.
pub fn build_plan(
    spec: &Specification,
    op: &ResolvedOperation,
    supplied: &Inputs,
    path_params: Inputs,
) -> Result<RequestPlan, PlanError> {
    let body_shape = if op.method.has_body() {
        BodyShape::load(spec, op)?
    } else {
        None
    };
    let variant = match &body_shape {
        Some(shape) => shape.selected(supplied)?,
        None => None,
    };

    let mut plan = RequestPlan::default();
    let mut body = serde_json::Map::new();

    for (key, value) in supplied {
        let declared = op.parameter(key).map(|p| p.location);
        match declared {
            _ if path_params.contains_key(key) => {
                debug!("ignoring --{key}: bound from the request path");
            }
            Some(ParameterLocation::Path) => {
                debug!("ignoring --{key}: not a path parameter of this template");
            }
            Some(ParameterLocation::Header) => plan.headers.push((key.clone(), value.clone())),
            Some(ParameterLocation::Query) => plan.query.push((key.clone(), value.clone())),
            Some(ParameterLocation::Cookie) => {
                debug!("ignoring --{key}: cookie parameters are not sent");
            }
            None if op.method.has_body() => {
                let schema = body_shape
                    .as_ref()
                    .and_then(|shape| shape.property(spec, key, variant));
                body.insert(key.clone(), coerce(value, schema.as_ref()));
            }
            None => plan.query.push((key.clone(), value.clone())),
        }
    }

    if op.method.has_body() {
        plan.body = Some(Value::Object(body));
    }
    plan.path_params = path_params;
    Ok(plan)
}

fn push_unique(missing: &mut Vec<NeededInput>, need: NeededInput) {
    if !missing.iter().any(|m| m.name == need.name) {
        missing.push(need);
    }
}

fn push_name(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

fn parameter_need(spec: &Specification, param: &Parameter) -> NeededInput {
    let schema = param
        .schema
        .as_ref()
        .and_then(|s| resolve(spec, s).ok())
        .map(|s| s.into_owned());
    NeededInput {
        name: param.name.clone(),
        description: param
            .description
            .clone()
            .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        choices: schema.as_ref().map(enum_strings).unwrap_or_default(),
    }
}

fn enum_strings(schema: &Schema) -> Vec<String> {
    schema
        .enum_values
        .iter()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// Non-string body properties take JSON literals (`3`, `true`, `["a"]`);
/// anything that does not parse is sent as the original string.
fn coerce(value: &str, schema: Option<&Schema>) -> Value {
    match schema.and_then(Schema::primary_type) {
        Some(
            SchemaType::Integer
            | SchemaType::Number
            | SchemaType::Boolean
            | SchemaType::Array
            | SchemaType::Object,
        ) => serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string())),
        _ => Value::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn typed(t: &str) -> Schema {
        serde_json::from_value(json!({"type": t})).unwrap()
    }

    #[test]
    fn coerce_follows_property_type() {
        assert_eq!(coerce("3", Some(&typed("integer"))), json!(3));
        assert_eq!(coerce("true", Some(&typed("boolean"))), json!(true));
        assert_eq!(coerce("[\"a\"]", Some(&typed("array"))), json!(["a"]));
        assert_eq!(coerce("3", Some(&typed("string"))), json!("3"));
        assert_eq!(coerce("abc", Some(&typed("number"))), json!("abc"));
        assert_eq!(coerce("3", None), json!("3"));
    }

    #[test]
    fn prompt_label_lists_choices() {
        let need = NeededInput {
            name: "chain_id".into(),
            description: "The chain".into(),
            choices: vec!["ETH".into(), "BTC".into()],
        };
        assert_eq!(need.prompt_label(), "chain_id (REQUIRED - The chain) [ETH, BTC]");
    }
}
