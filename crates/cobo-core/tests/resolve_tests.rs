use cobo_core::parse::operation::HttpMethod;
use cobo_core::parse::parameter::{Parameter, ParameterLocation};
use cobo_core::parse::schema::Schema;
use cobo_core::parse::{self, Specification};
use cobo_core::resolve::{ResolvedOperation, Variant, resolve_ref};
use serde_json::json;

const WALLETS: &str = include_str!("fixtures/wallets.yaml");

fn wallets() -> Specification {
    parse::from_yaml(WALLETS).unwrap()
}

fn resolved(spec: &Specification, method: HttpMethod, template: &str) -> ResolvedOperation {
    let item = &spec.paths()[template];
    let operation = item.operation(method).unwrap();
    ResolvedOperation::new(spec, method, template, item, operation).unwrap()
}

#[test]
fn path_level_parameters_are_folded_in() {
    let spec = wallets();
    let op = resolved(&spec, HttpMethod::Put, "/wallets/{wallet_id}");
    let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["wallet_id", "X-Request-Id"]);
    assert_eq!(op.parameters[0].location, ParameterLocation::Path);
    assert!(op.parameters[0].required);
    assert_eq!(op.non_path_parameters().count(), 1);
}

#[test]
fn operation_parameter_overrides_path_level_one() {
    let spec = Specification::from_value(json!({
        "openapi": "3.0.0",
        "info": {"title": "t", "version": "1"},
        "paths": {
            "/items": {
                "parameters": [{"name": "limit", "in": "query", "description": "path level"}],
                "get": {
                    "parameters": [
                        {"name": "limit", "in": "query", "description": "operation level", "required": true},
                        {"name": "limit", "in": "header", "description": "a header"}
                    ],
                    "responses": {}
                }
            }
        }
    }))
    .unwrap();
    let op = resolved(&spec, HttpMethod::Get, "/items");
    assert_eq!(op.parameters.len(), 2);
    assert_eq!(op.parameters[0].description.as_deref(), Some("operation level"));
    assert!(op.parameters[0].required);
    assert_eq!(op.parameters[1].location, ParameterLocation::Header);
}

#[test]
fn request_body_reference_is_resolved() {
    let spec = wallets();
    let op = resolved(&spec, HttpMethod::Put, "/wallets/{wallet_id}");
    let body = op.request_body.as_ref().expect("body should resolve");
    assert!(body.json_schema().is_some());

    let schema = op.body_schema(&spec).unwrap().unwrap();
    assert_eq!(schema.properties.keys().collect::<Vec<_>>(), ["name"]);
    assert_eq!(schema.required, ["name"]);
}

#[test]
fn operations_without_body_have_no_body_schema() {
    let spec = wallets();
    let op = resolved(&spec, HttpMethod::Get, "/wallets");
    assert!(op.body_schema(&spec).unwrap().is_none());
}

#[test]
fn pointer_into_paths_resolves() {
    let spec = wallets();
    let param: Parameter = resolve_ref(&spec, "#/paths/~1wallets/get/parameters/1").unwrap();
    assert_eq!(param.name, "limit");
    assert_eq!(param.example, Some(json!(10)));

    // A pointer to a `$ref` node follows the chain.
    let param: Parameter =
        resolve_ref(&spec, "#/paths/~1wallets~1{wallet_id}/parameters/0").unwrap();
    assert_eq!(param.name, "wallet_id");
}

#[test]
fn variants_of_discriminated_body() {
    let spec = wallets();
    let op = resolved(&spec, HttpMethod::Post, "/wallets");
    let union = op.body_schema(&spec).unwrap().unwrap();
    assert_eq!(union.one_of.len(), 2);

    let variants = Variant::all(&union, &spec).unwrap();
    let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, ["Custodial", "MPC"]);
    assert_eq!(variants[0].selectors, ["Custodial"]);

    let mpc = Variant::select(&variants, "MPC").unwrap();
    assert_eq!(mpc.schema.required, ["wallet_type", "name", "vault_id"]);
    assert_eq!(
        mpc.schema.properties.keys().collect::<Vec<_>>(),
        ["wallet_type", "name", "vault_id", "threshold"]
    );
    assert_eq!(
        Variant::select(&variants, "CreateMpcWalletParams").unwrap().label,
        "MPC"
    );
}

#[test]
fn variant_labels_come_from_titles() {
    let spec = Specification::from_value(json!({
        "openapi": "3.1.0",
        "info": {"title": "t", "version": "1"},
        "paths": {},
        "components": {"schemas": {
            "A": {"title": "A", "type": "object"},
            "B": {"allOf": [{"title": "B"}]}
        }}
    }))
    .unwrap();
    let union: Schema = serde_json::from_value(json!({
        "oneOf": [
            {"$ref": "#/components/schemas/A"},
            {"$ref": "#/components/schemas/B"}
        ]
    }))
    .unwrap();
    let labels: Vec<String> = Variant::all(&union, &spec)
        .unwrap()
        .into_iter()
        .map(|v| v.label)
        .collect();
    assert_eq!(labels, ["A", "B"]);
}
