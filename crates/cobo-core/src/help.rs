//! Human-readable help for operations, parameters and schema fragments.
//!
//! Rendering never fails: anything that cannot be resolved degrades to
//! placeholder text. Schemas are only read; "required" markers are computed
//! per call.

use colored::Colorize;
use serde_json::Value;

use crate::parse::Specification;
use crate::parse::parameter::Parameter;
use crate::parse::response::ResponseOrRef;
use crate::parse::schema::{Schema, SchemaKind, SchemaOrRef};
use crate::resolve::{ResolvedOperation, Variant, merge_all_of, ref_name, resolve};

pub const NO_DESCRIPTION: &str = "No description available";

/// One documented input: a parameter or a schema property.
struct FieldDoc<'a> {
    name: &'a str,
    required: bool,
    example: Option<&'a Value>,
    description: Option<&'a str>,
    schema: Option<&'a Schema>,
}

/// Full help for an operation: description, parameters, body and responses.
pub fn render_operation(spec: &Specification, op: &ResolvedOperation, title: &str) -> String {
    let mut out = format!("{}\n", title.cyan().bold());
    let description = op.description.as_deref().or(op.summary.as_deref());
    out.push_str(&description_block(description, ""));
    out.push('\n');

    if !op.parameters.is_empty() {
        out.push_str(&format!("{}\n", "URL Parameters:".yellow().bold()));
        for param in &op.parameters {
            out.push_str(&render_parameter(spec, param));
            out.push('\n');
        }
    }

    if op.request_body.is_some() {
        out.push_str(&format!("{}\n", "Request Body:".yellow().bold()));
        out.push_str(&render_request_body(spec, op));
    }

    if !op.responses.is_empty() {
        out.push_str(&format!("{}\n", "Responses:".yellow().bold()));
        for (status, response) in &op.responses {
            out.push_str(&render_response(spec, status, response));
        }
    }

    out
}

/// Help for a single named input of `op`, or `None` when the operation does
/// not declare it.
pub fn parameter_help(spec: &Specification, op: &ResolvedOperation, name: &str) -> Option<String> {
    if let Some(param) = op.parameter(name) {
        return Some(render_parameter(spec, param));
    }
    if !op.method.has_body() {
        return None;
    }

    let schema = op.body_schema(spec).ok()??;
    if !schema.one_of.is_empty() {
        let variants = Variant::all(&schema, spec).ok()?;
        if !variants
            .iter()
            .any(|v| v.schema.properties.contains_key(name))
        {
            return None;
        }
        let discriminator = discriminator_name(&schema);
        return Some(render_variants(spec, &variants, discriminator, Some(name)));
    }

    let property = schema.properties.get(name)?;
    Some(render_property(spec, name, property, schema.is_required(name)))
}

/// Help block for a declared parameter.
pub fn render_parameter(spec: &Specification, param: &Parameter) -> String {
    let schema = param
        .schema
        .as_ref()
        .and_then(|s| resolve(spec, s).ok());
    let schema = schema.as_deref();
    render_field(
        spec,
        &FieldDoc {
            name: &param.name,
            required: param.required,
            example: param.example.as_ref().or(schema.and_then(|s| s.example.as_ref())),
            description: param
                .description
                .as_deref()
                .or(schema.and_then(|s| s.description.as_deref())),
            schema,
        },
    )
}

/// Help block for a schema property.
pub fn render_property(
    spec: &Specification,
    name: &str,
    property: &SchemaOrRef,
    required: bool,
) -> String {
    match resolve(spec, property) {
        Ok(schema) => render_field(
            spec,
            &FieldDoc {
                name,
                required,
                example: schema.example.as_ref(),
                description: schema.description.as_deref(),
                schema: Some(&*schema),
            },
        ),
        Err(err) => render_field(
            spec,
            &FieldDoc {
                name,
                required,
                example: None,
                description: Some(&err.to_string()),
                schema: None,
            },
        ),
    }
}

fn render_field(spec: &Specification, field: &FieldDoc<'_>) -> String {
    let mut out = format!("  {}", field.name.cyan().bold());
    if field.required {
        out.push_str(&format!(" {}", "(Required)".red().bold()));
    }
    if let Some(example) = field.example {
        out.push_str(&format!(" - Example: {}", display_value(example)));
    }
    out.push('\n');
    out.push_str(&description_block(field.description, "    "));

    let Some(schema) = field.schema else {
        return out;
    };

    if !schema.enum_values.is_empty() {
        out.push_str(&format!("    {}\n", "Possible values:".yellow().bold()));
        for value in &schema.enum_values {
            out.push_str(&format!("      - {}\n", display_value(value)));
        }
    }

    if let SchemaKind::Array(items) = schema.kind() {
        out.push_str(&render_array_items(spec, items));
    }

    out
}

/// One level of array unrolling: the item type and its properties.
fn render_array_items(spec: &Specification, items: Option<&SchemaOrRef>) -> String {
    let name = items.and_then(SchemaOrRef::ref_path).map(ref_name).unwrap_or("");
    let item_schema = items.and_then(|i| resolve(spec, i).ok());
    let description = item_schema
        .as_ref()
        .and_then(|s| s.description.as_deref())
        .unwrap_or(NO_DESCRIPTION);

    let mut out = format!(
        "    {}\n",
        format!("Array of {name} - {description}").yellow().bold()
    );
    if let Some(item_schema) = item_schema {
        for (prop, prop_schema) in &item_schema.properties {
            let prop_description = resolve(spec, prop_schema)
                .ok()
                .and_then(|s| s.description.clone())
                .unwrap_or_else(|| NO_DESCRIPTION.to_string());
            out.push_str(&format!("        - {} - {}\n", prop.cyan(), prop_description));
        }
    }
    out
}

fn render_request_body(spec: &Specification, op: &ResolvedOperation) -> String {
    let schema = match op.body_schema(spec) {
        Ok(Some(schema)) => schema,
        Ok(None) => return format!("  {NO_DESCRIPTION}\n\n"),
        Err(err) => return format!("  {err}\n\n"),
    };

    if schema.one_of.is_empty() {
        return render_properties(spec, &schema, "");
    }

    let discriminator = discriminator_name(&schema);
    let mut out = format!(
        "  This request body can have different structures based on the '{discriminator}':\n\n"
    );
    match Variant::all(&schema, spec) {
        Ok(variants) => out.push_str(&render_variants(spec, &variants, discriminator, None)),
        Err(err) => out.push_str(&format!("  {err}\n\n")),
    }
    out
}

/// One block per `oneOf` branch, optionally narrowed to a single property.
fn render_variants(
    spec: &Specification,
    variants: &[Variant],
    discriminator: &str,
    only: Option<&str>,
) -> String {
    let mut out = String::new();
    for variant in variants {
        let body = match only {
            None => render_properties(spec, &variant.schema, ""),
            Some(name) => match variant.schema.properties.get(name) {
                Some(property) => {
                    let required = variant.schema.is_required(name);
                    format!("{}\n", render_property(spec, name, property, required))
                }
                None => continue,
            },
        };
        out.push_str(&format!(
            "  For {}:\n",
            format!("{discriminator} = {}", variant.label).green().bold()
        ));
        out.push_str(&body);
    }
    out
}

fn render_properties(spec: &Specification, schema: &Schema, indent: &str) -> String {
    let mut out = String::new();
    for (name, property) in &schema.properties {
        let block = render_property(spec, name, property, schema.is_required(name));
        out.push_str(&indent_lines(&block, indent));
        out.push('\n');
    }
    out
}

fn render_response(spec: &Specification, status: &str, response: &ResponseOrRef) -> String {
    let mut out = format!("  {}:\n", status.green().bold());
    let response = match resolve(spec, response) {
        Ok(response) => response,
        Err(err) => {
            out.push_str(&format!("    {err}\n\n"));
            return out;
        }
    };
    out.push_str(&format!(
        "    {}\n",
        response.description.as_deref().unwrap_or(NO_DESCRIPTION)
    ));

    let body = response
        .json_schema()
        .and_then(|s| resolve(spec, s).ok())
        .and_then(|s| merge_all_of(&s, spec).ok());
    let fields = match body.as_ref().map(Schema::kind) {
        Some(SchemaKind::Object { properties, .. }) if !properties.is_empty() => {
            out.push_str(&format!("    {}\n", "Response body:".cyan()));
            body.as_ref().map(|b| render_properties(spec, b, "    "))
        }
        Some(SchemaKind::Array(Some(items))) => {
            out.push_str(&format!("    {}\n", "Response body (array):".cyan()));
            resolve(spec, items)
                .ok()
                .and_then(|s| merge_all_of(&s, spec).ok())
                .map(|item| render_properties(spec, &item, "    "))
        }
        _ => None,
    };
    // Each rendered property already ends with a blank line.
    match fields {
        Some(fields) if !fields.is_empty() => out.push_str(&fields),
        _ => out.push('\n'),
    }
    out
}

fn discriminator_name(schema: &Schema) -> &str {
    schema
        .discriminator
        .as_ref()
        .map(|d| d.property_name.as_str())
        .unwrap_or("unknown discriminator")
}

/// `Description: first line` then the remaining non-empty lines, all at `indent`.
fn description_block(description: Option<&str>, indent: &str) -> String {
    let lines: Vec<&str> = description
        .unwrap_or(NO_DESCRIPTION)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let (first, rest) = match lines.split_first() {
        Some((first, rest)) => (*first, rest),
        None => (NO_DESCRIPTION, &[][..]),
    };

    let mut out = format!("{indent}{}{first}\n", "Description: ".yellow().bold());
    for line in rest {
        out.push_str(&format!("{indent}{line}\n"));
    }
    out
}

fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.lines()
        .map(|line| {
            if line.is_empty() {
                "\n".to_string()
            } else {
                format!("{indent}{line}\n")
            }
        })
        .collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_block_skips_blank_lines() {
        colored::control::set_override(false);
        let text = description_block(Some("First\n\n   second  \n"), "  ");
        assert_eq!(text, "  Description: First\n  second\n");
    }

    #[test]
    fn missing_description_uses_placeholder() {
        colored::control::set_override(false);
        assert_eq!(
            description_block(None, ""),
            format!("Description: {NO_DESCRIPTION}\n")
        );
        assert_eq!(
            description_block(Some("  \n "), ""),
            format!("Description: {NO_DESCRIPTION}\n")
        );
    }

    #[test]
    fn indent_keeps_blank_lines_bare() {
        assert_eq!(indent_lines("a\n\nb\n", "  "), "  a\n\n  b\n");
    }
}
