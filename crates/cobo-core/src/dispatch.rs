//! Turning a [`RequestPlan`] into an authenticated HTTP call.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::config::{CliConfig, Environment};
use crate::error::DispatchError;
use crate::parse::operation::HttpMethod;
use crate::planner::RequestPlan;
use crate::signer::{Ed25519Signer, Signer};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

/// GraphQL endpoint; the only path sent without the version prefix.
pub const GRAPHQL_PATH: &str = "/web/graphql";

const API_PREFIX: &str = "/v2";

pub const API_KEY_HEADER: &str = "Biz-Api-Key";
pub const API_NONCE_HEADER: &str = "Biz-Api-Nonce";
pub const API_SIGNATURE_HEADER: &str = "Biz-Api-Signature";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMethod {
    #[default]
    ApiKey,
    User,
    Org,
}

impl AuthMethod {
    pub const ALL: [AuthMethod; 3] = [AuthMethod::ApiKey, AuthMethod::User, AuthMethod::Org];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "apikey",
            Self::User => "user",
            Self::Org => "org",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMethod {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DispatchError::UnsupportedAuthMethod(s.to_string()))
    }
}

/// How each request proves who sent it.
pub enum Credentials {
    /// Signed with the API secret; the key travels in a header.
    ApiKey {
        key: String,
        signer: Box<dyn Signer>,
    },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Credentials {
    /// Pick the credentials `method` needs out of `config`.
    pub fn from_config(config: &CliConfig, method: AuthMethod) -> Result<Self, DispatchError> {
        let env = config.environment;
        match method {
            AuthMethod::ApiKey => match (config.get("api_key"), config.get("api_secret")) {
                (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                    Ok(Self::ApiKey {
                        key: key.to_string(),
                        signer: Box::new(Ed25519Signer::from_hex(secret)?),
                    })
                }
                _ => Err(DispatchError::MissingCredentials(format!(
                    "API key or secret not found for {env}. Please run 'cobo keys generate' to generate a new key pair."
                ))),
            },
            AuthMethod::User => bearer(config, "user_access_token", env),
            AuthMethod::Org => bearer(config, "org_access_token", env),
        }
    }
}

fn bearer(
    config: &CliConfig,
    key: &str,
    env: Environment,
) -> Result<Credentials, DispatchError> {
    match config.get(key) {
        Some(token) if !token.is_empty() => Ok(Credentials::Bearer(token.to_string())),
        _ => Err(DispatchError::MissingCredentials(format!(
            "{key} not found for {env}. Please log in first."
        ))),
    }
}

/// Milliseconds since the Unix epoch.
pub fn millis_nonce() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Sends planned requests to one API host with one set of credentials.
pub struct RequestDispatcher<T> {
    transport: T,
    base_url: String,
    credentials: Credentials,
    nonce: fn() -> u64,
}

impl<T: HttpTransport> RequestDispatcher<T> {
    pub fn new(transport: T, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            credentials,
            nonce: millis_nonce,
        }
    }

    /// Replace the nonce source.
    pub fn with_nonce(mut self, nonce: fn() -> u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Substitute path parameters into `template`, prefix `/v2` (except for
    /// GraphQL), attach auth headers and send.
    pub fn dispatch(
        &self,
        method: HttpMethod,
        template: &str,
        plan: &RequestPlan,
    ) -> Result<HttpResponse, DispatchError> {
        let path = request_path(template, plan);
        let query = serde_urlencoded::to_string(&plan.query)
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;
        let body = plan
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| DispatchError::Transport(Box::new(e)))?;

        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let mut headers = plan.headers.clone();
        match &self.credentials {
            Credentials::ApiKey { key, signer } => {
                let nonce = (self.nonce)().to_string();
                let message = format!(
                    "{}|{}|{}|{}|{}",
                    method.as_str(),
                    path,
                    nonce,
                    query,
                    body.as_deref().unwrap_or("")
                );
                let signature = hex::encode(signer.sign(message.as_bytes()));
                headers.push((API_KEY_HEADER.to_string(), key.clone()));
                headers.push((API_NONCE_HEADER.to_string(), nonce));
                headers.push((API_SIGNATURE_HEADER.to_string(), signature));
            }
            Credentials::Bearer(token) => {
                headers.push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }

        info!("Making {method} request to {url}");
        self.transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .map_err(DispatchError::Transport)
    }
}

/// The path as sent and signed: parameters substituted, version-prefixed.
pub fn request_path(template: &str, plan: &RequestPlan) -> String {
    let mut path = template.to_string();
    for (name, value) in &plan.path_params {
        path = path.replace(&format!("{{{name}}}"), value);
    }
    if path.starts_with(GRAPHQL_PATH) {
        path
    } else {
        format!("{API_PREFIX}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn plan_with_path(params: &[(&str, &str)]) -> RequestPlan {
        RequestPlan {
            path_params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<IndexMap<_, _>>(),
            ..RequestPlan::default()
        }
    }

    #[test]
    fn auth_method_parses_case_insensitively() {
        assert_eq!("APIKEY".parse::<AuthMethod>().unwrap(), AuthMethod::ApiKey);
        assert_eq!("org".parse::<AuthMethod>().unwrap(), AuthMethod::Org);
        let err = "oauth".parse::<AuthMethod>().unwrap_err();
        assert_eq!(err.to_string(), "invalid authentication method: oauth");
    }

    #[test]
    fn paths_are_prefixed_except_graphql() {
        let plan = plan_with_path(&[("wallet_id", "w1")]);
        assert_eq!(request_path("/wallets/{wallet_id}", &plan), "/v2/wallets/w1");
        assert_eq!(request_path(GRAPHQL_PATH, &plan), "/web/graphql");
    }

    #[test]
    fn missing_tokens_are_reported() {
        let config = CliConfig::default();
        for method in AuthMethod::ALL {
            let err = Credentials::from_config(&config, method).err().unwrap();
            assert!(matches!(err, DispatchError::MissingCredentials(_)), "{method}");
        }
    }
}
