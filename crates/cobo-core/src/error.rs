use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by an [`HttpTransport`](crate::transport::HttpTransport).
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid OpenAPI document at {path}: {source}")]
    Document {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unable to resolve reference: {0}")]
    UnresolvableReference(String),

    #[error("cyclic reference detected while resolving {ref_path} (depth {depth})")]
    CyclicReference { ref_path: String, depth: usize },

    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("reference {ref_path} does not point to the expected kind of node: {source}")]
    MalformedTarget {
        ref_path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("custom OpenAPI specification file not found: {}", .0.display())]
    SpecNotFound(PathBuf),

    #[error("failed to parse OpenAPI specification {origin}: {source}")]
    SpecParseError {
        origin: String,
        #[source]
        source: ParseError,
    },

    #[error("failed to download OpenAPI specification from {url}: {message}")]
    SpecFetchError { url: String, message: String },

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("the path '{0}' is not defined in the OpenAPI specification")]
    PathNotFound(String),

    #[error("no {method} operation found for path: {path}")]
    MethodNotAllowed { method: String, path: String },
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("invalid parameter(s): {}. Valid parameters are: {}", .invalid.join(", "), .valid.join(", "))]
    InvalidParameter {
        invalid: Vec<String>,
        valid: Vec<String>,
    },

    #[error("unknown value '{value}' for '{discriminator}'. Expected one of: {}", .known.join(", "))]
    UnknownVariant {
        discriminator: String,
        value: String,
        known: Vec<String>,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("failed to read input for '{name}': {source}")]
    Prompt {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    MissingCredentials(String),

    #[error("invalid authentication method: {0}")]
    UnsupportedAuthMethod(String),

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("{0}")]
    Transport(TransportError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Any failure of a single command invocation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
