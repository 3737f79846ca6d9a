//! Mapping a concrete request path onto the document's path templates.

use indexmap::IndexMap;
use log::debug;

use crate::error::{Error, MatchError};
use crate::parse::Specification;
use crate::parse::operation::{HttpMethod, Operation, PathItem};
use crate::resolve::ResolvedOperation;

/// An operation located for a concrete path.
#[derive(Debug, Clone, Copy)]
pub struct MatchedOperation<'s> {
    pub template: &'s str,
    pub item: &'s PathItem,
    pub operation: &'s Operation,
}

/// Whether a path template such as `/wallets/{wallet_id}` matches a concrete
/// path. Segment counts must agree, literal segments must be equal, and a
/// `{param}` segment accepts any non-empty value.
pub fn template_matches(template: &str, path: &str) -> bool {
    let template_parts: Vec<&str> = template.split('/').collect();
    let path_parts: Vec<&str> = path.split('/').collect();

    template_parts.len() == path_parts.len()
        && template_parts
            .iter()
            .zip(&path_parts)
            .all(|(t, p)| match placeholder(t) {
                Some(_) => !p.is_empty(),
                None => t == p,
            })
}

/// Find the operation for `method` on `path`.
///
/// Templates are tried in document order. A template that matches the path but
/// lacks the method does not stop the search; if no matching template declares
/// the method the result is [`MatchError::MethodNotAllowed`], and if none matches
/// at all it is [`MatchError::PathNotFound`].
pub fn find_operation<'s>(
    spec: &'s Specification,
    method: HttpMethod,
    path: &str,
) -> Result<MatchedOperation<'s>, MatchError> {
    let mut path_matched = false;

    for (template, item) in spec.paths() {
        if !template_matches(template, path) {
            continue;
        }
        path_matched = true;
        if let Some(operation) = item.operation(method) {
            debug!("{method} {path} matched template {template}");
            return Ok(MatchedOperation {
                template,
                item,
                operation,
            });
        }
    }

    if path_matched {
        Err(MatchError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
        })
    } else {
        Err(MatchError::PathNotFound(path.to_string()))
    }
}

/// Find and dereference the operation for `method` on `path`.
pub fn match_operation(
    spec: &Specification,
    method: HttpMethod,
    path: &str,
) -> Result<ResolvedOperation, Error> {
    let found = find_operation(spec, method, path)?;
    let resolved =
        ResolvedOperation::new(spec, method, found.template, found.item, found.operation)?;
    Ok(resolved)
}

/// Bind `{name}` template segments to the corresponding concrete segments.
pub fn extract_path_params(template: &str, path: &str) -> IndexMap<String, String> {
    template
        .split('/')
        .zip(path.split('/'))
        .filter_map(|(t, p)| placeholder(t).map(|name| (name.to_string(), p.to_string())))
        .collect()
}

/// Path templates declaring `method`, in document order.
pub fn list_operations(spec: &Specification, method: HttpMethod) -> Vec<&str> {
    spec.paths()
        .iter()
        .filter(|(_, item)| item.operation(method).is_some())
        .map(|(template, _)| template.as_str())
        .collect()
}

fn placeholder(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_segments_must_match() {
        assert!(template_matches("/a/{id}/b", "/a/123/b"));
        assert!(!template_matches("/a/{id}/b", "/a/123/c"));
        assert!(!template_matches("/a/{id}/b", "/a/123"));
        assert!(!template_matches("/a/{id}/b", "/a//b"));
        assert!(template_matches("/wallets", "/wallets"));
    }

    #[test]
    fn path_params_bind_by_position() {
        let params = extract_path_params("/wallets/{wallet_id}/addresses/{address}", "/wallets/w1/addresses/0xabc");
        assert_eq!(params.len(), 2);
        assert_eq!(params["wallet_id"], "w1");
        assert_eq!(params["address"], "0xabc");
    }

    #[test]
    fn literal_templates_have_no_params() {
        assert!(extract_path_params("/wallets", "/wallets").is_empty());
    }
}
