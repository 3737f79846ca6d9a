use cobo_core::parse::{self, SpecFormat};
use cobo_core::parse::operation::HttpMethod;
use cobo_core::parse::parameter::ParameterOrRef;
use cobo_core::parse::response::ResponseOrRef;
use cobo_core::parse::schema::{Schema, SchemaKind, SchemaOrRef};
use cobo_core::error::ParseError;
use cobo_core::matcher::match_operation;
use cobo_core::resolve::{lookup, resolve_ref};

const WALLETS: &str = include_str!("fixtures/wallets.yaml");

#[test]
fn parse_wallets_yaml() {
    let spec = parse::from_yaml(WALLETS).expect("should parse wallets.yaml");
    let doc = spec.document();
    assert_eq!(doc.openapi, "3.1.0");
    assert_eq!(doc.info.title, "Wallets API");
    assert_eq!(
        spec.paths().keys().collect::<Vec<_>>(),
        [
            "/wallets",
            "/wallets/{wallet_id}",
            "/wallets/{wallet_id}/addresses",
            "/wallets/{wallet_id}/tags"
        ]
    );

    let item = spec.paths().get("/wallets/{wallet_id}").unwrap();
    assert!(item.operation(HttpMethod::Get).is_some());
    assert!(item.operation(HttpMethod::Put).is_some());
    assert!(item.operation(HttpMethod::Delete).is_some());
    assert!(item.operation(HttpMethod::Post).is_none());
    assert!(matches!(item.parameters[0], ParameterOrRef::Ref { .. }));
}

#[test]
fn numeric_status_keys_become_strings() {
    let spec = parse::from_yaml(WALLETS).unwrap();
    let get = spec.paths()["/wallets"].get.as_ref().unwrap();
    let codes: Vec<&str> = get.responses.keys().map(String::as_str).collect();
    assert_eq!(codes, ["200", "4XX"]);
    assert!(matches!(get.responses["200"], ResponseOrRef::Response(_)));
    assert!(matches!(get.responses["4XX"], ResponseOrRef::Ref { .. }));

    // The raw tree agrees with the typed one.
    assert!(spec.raw()["paths"]["/wallets"]["get"]["responses"]["200"].is_object());
}

#[test]
fn components_are_reached_through_the_raw_tree() {
    let spec = parse::from_yaml(WALLETS).unwrap();
    assert!(lookup(&spec, "#/components/parameters/wallet_id").is_ok());
    assert!(lookup(&spec, "#/components/requestBodies/UpdateWallet").is_ok());

    let create: Schema = resolve_ref(&spec, "#/components/schemas/CreateWalletParams").unwrap();
    match create.kind() {
        SchemaKind::OneOf {
            variants,
            discriminator,
        } => {
            assert_eq!(variants.len(), 2);
            let discriminator = discriminator.expect("should have a discriminator");
            assert_eq!(discriminator.property_name, "wallet_type");
            assert_eq!(discriminator.mapping.len(), 2);
        }
        other => panic!("expected oneOf, got {other:?}"),
    }

    let wallet_type: Schema = resolve_ref(&spec, "#/components/schemas/WalletType").unwrap();
    assert_eq!(wallet_type.enum_values.len(), 2);
}

#[test]
fn parse_json_document() {
    let json = r#"{
        "openapi": "3.0.3",
        "info": {"title": "Json", "version": "1"},
        "paths": {"/ping": {"get": {"responses": {"200": {"description": "pong"}}}}}
    }"#;
    let spec = parse::from_str(json, SpecFormat::Json).unwrap();
    assert_eq!(spec.document().info.title, "Json");
    assert!(spec.paths()["/ping"].get.is_some());
}

#[test]
fn spec_format_follows_extension() {
    use std::path::Path;
    assert_eq!(SpecFormat::from_path(Path::new("api.JSON")), SpecFormat::Json);
    assert_eq!(SpecFormat::from_path(Path::new("api.yaml")), SpecFormat::Yaml);
    assert_eq!(SpecFormat::from_path(Path::new("api")), SpecFormat::Yaml);
}

#[test]
fn parse_invalid_version() {
    let yaml = r#"
openapi: "2.0.0"
info:
  title: Test
  version: "1.0"
paths: {}
"#;
    let err = parse::from_yaml(yaml).unwrap_err();
    assert_eq!(err.to_string(), "unsupported OpenAPI version: 2.0.0");
}

#[test]
fn parse_malformed_yaml() {
    let err = parse::from_yaml("openapi: [unclosed").unwrap_err();
    assert!(err.to_string().starts_with("failed to parse YAML"), "{err}");
}

const LOOSE: &str = r#"
openapi: 3.1.0
info:
  title: Loose
  version: "1"
paths:
  /wallets:
    get:
      responses:
        "200":
          description: ok
  /uploads:
    post:
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                anything: true
                upload:
                  type: file
                label:
                  type: string
                  required: true
      responses: {}
"#;

#[test]
fn unusual_schema_nodes_do_not_block_loading() {
    let spec = parse::from_yaml(LOOSE).expect("document should load");
    assert!(match_operation(&spec, HttpMethod::Get, "/wallets").is_ok());

    let post = match_operation(&spec, HttpMethod::Post, "/uploads").unwrap();
    let body = post.body_schema(&spec).unwrap().unwrap();
    assert_eq!(
        body.properties.keys().collect::<Vec<_>>(),
        ["anything", "upload", "label"]
    );
    match &body.properties["upload"] {
        SchemaOrRef::Schema(upload) => assert_eq!(upload.schema_type, None),
        SchemaOrRef::Ref { .. } => panic!("expected inline schema"),
    }
}

#[test]
fn malformed_node_reports_its_location() {
    let yaml = r#"
openapi: 3.0.3
info:
  title: Broken
  version: "1"
paths:
  /wallets:
    get:
      parameters:
        - in: query
          description: no name
"#;
    let err = parse::from_yaml(yaml).unwrap_err();
    match &err {
        ParseError::Document { path, .. } => {
            assert!(path.starts_with("paths./wallets.get.parameters"), "{path}")
        }
        other => panic!("expected a document error, got {other:?}"),
    }
    assert!(err.to_string().contains("missing field `name`"), "{err}");
}
