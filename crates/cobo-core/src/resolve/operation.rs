use indexmap::IndexMap;

use crate::error::ResolveError;
use crate::parse::Specification;
use crate::parse::operation::{HttpMethod, Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterLocation};
use crate::parse::request_body::RequestBody;
use crate::parse::response::ResponseOrRef;
use crate::parse::schema::Schema;

use super::{merge_all_of, resolve};

/// An operation with its parameters and request body dereferenced.
///
/// Path-level parameters are folded in; an operation-level parameter with the
/// same name and location replaces the path-level one.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub method: HttpMethod,
    pub path_template: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: IndexMap<String, ResponseOrRef>,
}

impl ResolvedOperation {
    pub fn new(
        spec: &Specification,
        method: HttpMethod,
        path_template: &str,
        item: &PathItem,
        operation: &Operation,
    ) -> Result<Self, ResolveError> {
        let mut parameters: Vec<Parameter> = Vec::new();
        for p in item.parameters.iter().chain(&operation.parameters) {
            let param = resolve(spec, p)?.into_owned();
            match parameters
                .iter_mut()
                .find(|existing| existing.name == param.name && existing.location == param.location)
            {
                Some(existing) => *existing = param,
                None => parameters.push(param),
            }
        }

        let request_body = operation
            .request_body
            .as_ref()
            .map(|rb| resolve(spec, rb).map(|rb| rb.into_owned()))
            .transpose()?;

        Ok(Self {
            method,
            path_template: path_template.to_string(),
            operation_id: operation.operation_id.clone(),
            summary: operation.summary.clone(),
            description: operation
                .description
                .clone()
                .or_else(|| item.description.clone()),
            parameters,
            request_body,
            responses: operation.responses.clone(),
        })
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Parameters the caller may supply outside the path.
    pub fn non_path_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(|p| p.location != ParameterLocation::Path)
    }

    /// The JSON request body schema, dereferenced and with `allOf` flattened.
    /// A `oneOf` union is left intact.
    pub fn body_schema(&self, spec: &Specification) -> Result<Option<Schema>, ResolveError> {
        let Some(schema_ref) = self.request_body.as_ref().and_then(RequestBody::json_schema) else {
            return Ok(None);
        };
        let resolved = resolve(spec, schema_ref)?;
        merge_all_of(&resolved, spec).map(Some)
    }
}
