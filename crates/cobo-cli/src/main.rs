mod args;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use log::{LevelFilter, debug, info};
use serde_json::{Value, json};

use cobo_core::config::{self, CliConfig, Environment};
use cobo_core::dispatch::{AuthMethod, Credentials, GRAPHQL_PATH, RequestDispatcher};
use cobo_core::help::{parameter_help, render_operation};
use cobo_core::matcher::{extract_path_params, list_operations, match_operation};
use cobo_core::planner::{self, RequestPlan};
use cobo_core::resolve::ResolvedOperation;
use cobo_core::spec_store::SpecStore;
use cobo_core::transport::{HttpResponse, ReqwestTransport};
use cobo_core::{HttpMethod, Specification};

use crate::args::{TerminalPrompt, page, parse_extra_args};

#[derive(Parser)]
#[command(name = "cobo", about = "Command-line client for the Cobo WaaS 2.0 API", version)]
struct Cli {
    /// Target environment (dev or prod)
    #[arg(short, long, global = true)]
    env: Option<Environment>,

    /// Authentication method (apikey, user or org)
    #[arg(short, long, global = true)]
    auth: Option<AuthMethod>,

    /// Log debug output
    #[arg(long, global = true)]
    enable_debug: bool,

    /// Path to the config file [default: ~/.cobo/config.yaml]
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    /// Path to a custom OpenAPI document (YAML or JSON)
    #[arg(long, global = true)]
    spec: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a GET request
    Get(VerbArgs),

    /// Send a POST request
    Post(VerbArgs),

    /// Send a PUT request
    Put(VerbArgs),

    /// Send a DELETE request
    Delete(VerbArgs),

    /// Execute a GraphQL query
    Graphql {
        /// Query text, or a JSON object with a "query" key
        #[arg(short, long)]
        query: String,

        /// Query variables as a JSON object
        #[arg(short, long, default_value = "{}")]
        variables: String,

        /// Print the response body as received
        #[arg(long)]
        raw: bool,
    },

    /// Manage the cached OpenAPI document
    Spec {
        #[command(subcommand)]
        command: SpecCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum SpecCommand {
    /// Download the latest document, replacing the cache
    Update,
}

#[derive(Args)]
struct VerbArgs {
    /// API path, e.g. /wallets/{wallet_id}
    path: Option<String>,

    /// Show help for the operation, or for the given parameters
    #[arg(short, long)]
    describe: bool,

    /// List the paths that accept this method
    #[arg(short, long)]
    list: bool,

    /// Operation parameters as --name value
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    params: Vec<String>,
}

/// Settings shared by every subcommand.
struct Session {
    config: CliConfig,
    auth: Option<AuthMethod>,
    spec_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.enable_debug);

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        clap_complete::generate(shell, &mut cmd, "cobo", &mut std::io::stdout());
        return Ok(());
    }

    let session = Session::load(&cli)?;

    match cli.command {
        Commands::Get(args) => cmd_verb(&session, HttpMethod::Get, args),
        Commands::Post(args) => cmd_verb(&session, HttpMethod::Post, args),
        Commands::Put(args) => cmd_verb(&session, HttpMethod::Put, args),
        Commands::Delete(args) => cmd_verb(&session, HttpMethod::Delete, args),
        Commands::Graphql {
            query,
            variables,
            raw,
        } => cmd_graphql(&session, &query, &variables, raw),
        Commands::Spec {
            command: SpecCommand::Update,
        } => cmd_spec_update(&session),
        Commands::Completions { .. } => Ok(()),
    }
}

fn init_logging(enable_debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if enable_debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

impl Session {
    fn load(cli: &Cli) -> Result<Self> {
        let path = match &cli.config_file {
            Some(path) => Some(path.clone()),
            None => config::default_config_path(),
        };

        let mut config = match &path {
            Some(path) => config::load_config(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
                .unwrap_or_default(),
            None => CliConfig::default(),
        };
        if let Some(env) = cli.env {
            config.environment = env;
        }
        debug!("using {} environment", config.environment);

        Ok(Self {
            config,
            auth: cli.auth,
            spec_path: cli.spec.clone(),
        })
    }

    fn spec_store(&self) -> Result<SpecStore<ReqwestTransport>> {
        let cache_dir = config::config_dir().context("could not determine the home directory")?;
        let mut store = SpecStore::new(cache_dir, ReqwestTransport::new());
        if let Some(url) = &self.config.spec_url {
            store = store.with_url(url.clone());
        }
        Ok(store)
    }

    fn load_spec(&self) -> Result<Specification> {
        Ok(self.spec_store()?.load(self.spec_path.as_deref())?)
    }

    /// The `--auth` flag, else the configured method, else API key signing.
    fn auth_method(&self) -> Result<AuthMethod> {
        if let Some(method) = self.auth {
            return Ok(method);
        }
        match &self.config.auth_method {
            Some(raw) => Ok(raw.parse()?),
            None => Ok(AuthMethod::default()),
        }
    }

    fn send(&self, method: HttpMethod, template: &str, plan: &RequestPlan) -> Result<HttpResponse> {
        let credentials = Credentials::from_config(&self.config, self.auth_method()?)?;
        let dispatcher =
            RequestDispatcher::new(ReqwestTransport::new(), self.config.api_host(), credentials);
        Ok(dispatcher.dispatch(method, template, plan)?)
    }
}

fn cmd_verb(session: &Session, method: HttpMethod, args: VerbArgs) -> Result<()> {
    let extra = parse_extra_args(&args.params)?;
    let describe = args.describe || extra.describe;
    let spec = session.load_spec()?;

    if args.list || extra.list {
        let listing = format_operation_list(method, &list_operations(&spec, method));
        std::io::stdout().lock().write_all(listing.as_bytes())?;
        return Ok(());
    }

    let Some(path) = args.path else {
        if describe {
            bail!("Path is required to describe an operation.");
        }
        bail!("Path is required. Use -l to list the available paths.");
    };

    let op = match_operation(&spec, method, &path)?;
    let title = format!("{method} {path}");

    if describe {
        if extra.params.is_empty() {
            return page(&render_operation(&spec, &op, &title));
        }
        for name in extra.params.keys() {
            match parameter_help(&spec, &op, name) {
                Some(text) => print!("{text}"),
                None => println!("Parameter '{name}' not found for {title}"),
            }
        }
        return Ok(());
    }

    let mut supplied = extra.params;
    planner::validate(&spec, &op, &supplied)?;
    let path_params = extract_path_params(&op.path_template, &path);
    planner::fill_missing(&spec, &op, &mut supplied, &path_params, &mut TerminalPrompt)?;
    let plan = planner::build_plan(&spec, &op, &supplied, path_params)?;

    if let Some(line) = description_line(&op) {
        eprintln!("{line}");
    }
    let response = session.send(method, &op.path_template, &plan)?;
    info!("{title} returned status {}", response.status);
    print_response(&response.body, false)
}

fn format_operation_list(method: HttpMethod, paths: &[&str]) -> String {
    if paths.is_empty() {
        return format!("No API operations found for {method}.\n");
    }
    let mut out = format!("API operations for {method}:\n");
    for path in paths {
        out.push_str(&format!("  - {path}\n"));
    }
    out
}

fn description_line(op: &ResolvedOperation) -> Option<String> {
    op.description
        .as_deref()
        .or(op.summary.as_deref())
        .map(|text| format!("Description: {}", text.trim()))
}

fn cmd_graphql(session: &Session, query: &str, variables: &str, raw: bool) -> Result<()> {
    let query = graphql_query(query)?;
    let variables: Value = serde_json::from_str(variables)
        .context("Variables must be a valid JSON string.")?;

    let plan = RequestPlan {
        body: Some(json!({ "query": query, "variables": variables })),
        ..RequestPlan::default()
    };
    let response = session.send(HttpMethod::Post, GRAPHQL_PATH, &plan)?;
    print_response(&response.body, raw)
}

/// Accept either raw GraphQL text or a JSON object carrying it under `query`.
fn graphql_query(input: &str) -> Result<String> {
    let Ok(parsed) = serde_json::from_str::<Value>(input) else {
        return Ok(input.to_string());
    };
    match parsed.get("query").and_then(Value::as_str) {
        Some(query) => Ok(query.to_string()),
        None => bail!("Query must be a valid JSON string containing a 'query' key."),
    }
}

fn cmd_spec_update(session: &Session) -> Result<()> {
    let store = session.spec_store()?;
    let spec = store.update()?;
    let document = spec.document();
    eprintln!(
        "Updated OpenAPI specification: {} {}",
        document.info.title, document.info.version
    );
    eprintln!("  Saved to {}", store.cache_path().display());
    eprintln!("  Paths: {}", document.paths.len());
    Ok(())
}

/// Pretty-print JSON bodies through the pager; anything else is echoed as is.
fn print_response(body: &str, raw: bool) -> Result<()> {
    if raw {
        println!("{body}");
        return Ok(());
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            let mut text = serde_json::to_string_pretty(&value)?;
            text.push('\n');
            page(&text)
        }
        Err(_) => {
            println!("{body}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_query_forms() {
        assert_eq!(graphql_query("{ wallets { id } }").unwrap(), "{ wallets { id } }");
        assert_eq!(
            graphql_query(r#"{"query": "{ wallets { id } }"}"#).unwrap(),
            "{ wallets { id } }"
        );
        assert!(graphql_query(r#"{"operationName": "x"}"#).is_err());
    }

    #[test]
    fn verb_arguments_after_path() {
        let cli = Cli::try_parse_from([
            "cobo", "-e", "prod", "get", "/wallets", "--wallet_type", "MPC", "-d",
        ])
        .unwrap();
        assert_eq!(cli.env, Some(Environment::Prod));
        let Commands::Get(args) = cli.command else {
            panic!("expected get");
        };
        assert_eq!(args.path.as_deref(), Some("/wallets"));
        let extra = parse_extra_args(&args.params).unwrap();
        assert_eq!(extra.params["wallet_type"], "MPC");
        assert!(args.describe || extra.describe);
    }

    #[test]
    fn unknown_auth_method_is_rejected() {
        assert!(Cli::try_parse_from(["cobo", "-a", "oauth", "spec", "update"]).is_err());

        let session = Session {
            config: CliConfig {
                auth_method: Some("Org".to_string()),
                ..CliConfig::default()
            },
            auth: None,
            spec_path: None,
        };
        assert_eq!(session.auth_method().unwrap(), AuthMethod::Org);

        let session = Session {
            config: CliConfig {
                auth_method: Some("oauth".to_string()),
                ..CliConfig::default()
            },
            auth: None,
            spec_path: None,
        };
        assert_eq!(
            session.auth_method().unwrap_err().to_string(),
            "invalid authentication method: oauth"
        );

        let session = Session {
            auth: Some(AuthMethod::User),
            ..session
        };
        assert_eq!(session.auth_method().unwrap(), AuthMethod::User);
    }

    #[test]
    fn operation_list_format() {
        assert_eq!(
            format_operation_list(HttpMethod::Get, &["/wallets", "/wallets/{wallet_id}"]),
            "API operations for GET:\n  - /wallets\n  - /wallets/{wallet_id}\n"
        );
        assert_eq!(
            format_operation_list(HttpMethod::Delete, &[]),
            "No API operations found for DELETE.\n"
        );
    }

    #[test]
    fn description_prefers_description_over_summary() {
        let spec = Specification::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "t", "version": "1"},
            "paths": {
                "/a": {"get": {"summary": "Short", "description": "List wallets.\n"}},
                "/b": {"get": {"summary": "Short"}},
                "/c": {"get": {}}
            }
        }))
        .unwrap();
        let line = |path| {
            let op = match_operation(&spec, HttpMethod::Get, path).unwrap();
            description_line(&op)
        };

        assert_eq!(line("/a").as_deref(), Some("Description: List wallets."));
        assert_eq!(line("/b").as_deref(), Some("Description: Short"));
        assert_eq!(line("/c"), None);
    }

    #[test]
    fn command_definition_is_valid() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
