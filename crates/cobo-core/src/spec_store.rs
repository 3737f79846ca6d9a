//! Locating, caching and refreshing the OpenAPI document.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::SpecError;
use crate::parse::operation::HttpMethod;
use crate::parse::{self, SpecFormat, Specification};
use crate::transport::{HttpRequest, HttpTransport};

pub const DEFAULT_SPEC_URL: &str = "https://raw.githubusercontent.com/CoboGlobal/developer-site/master/v2/cobo_waas2_openapi_spec/dev_openapi.yaml";

pub const SPEC_CACHE_FILE: &str = "openapi.yaml";

/// Cached documents older than this are downloaded again.
pub const SPEC_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The cached copy of the remote document plus the means to refresh it.
///
/// A refresh that fails is an error even when an older cached copy exists.
pub struct SpecStore<T> {
    cache_dir: PathBuf,
    url: String,
    max_age: Duration,
    transport: T,
}

impl<T: HttpTransport> SpecStore<T> {
    pub fn new(cache_dir: impl Into<PathBuf>, transport: T) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            url: DEFAULT_SPEC_URL.to_string(),
            max_age: SPEC_MAX_AGE,
            transport,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(SPEC_CACHE_FILE)
    }

    /// Load `custom` when given, else the cache, refreshing it when absent or
    /// stale.
    pub fn load(&self, custom: Option<&Path>) -> Result<Specification, SpecError> {
        if let Some(path) = custom {
            if !path.exists() {
                return Err(SpecError::SpecNotFound(path.to_path_buf()));
            }
            debug!("loading OpenAPI specification from {}", path.display());
            return read_spec(path, SpecFormat::from_path(path));
        }

        let cache = self.cache_path();
        if !cache.exists() {
            info!("no cached OpenAPI specification, downloading");
            return self.update();
        }
        if !self.is_fresh(&cache) {
            warn!(
                "cached OpenAPI specification is older than {} days, refreshing",
                self.max_age.as_secs() / 86_400
            );
            return self.update();
        }

        debug!("using cached OpenAPI specification {}", cache.display());
        read_spec(&cache, SpecFormat::Yaml)
    }

    /// Download the document, and only once it parses, replace the cache.
    pub fn update(&self) -> Result<Specification, SpecError> {
        info!("Downloading OpenAPI specification from {}", self.url);
        let response = self
            .transport
            .send(HttpRequest {
                method: HttpMethod::Get,
                url: self.url.clone(),
                headers: Vec::new(),
                body: None,
            })
            .map_err(|e| SpecError::SpecFetchError {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        if !response.is_success() {
            return Err(SpecError::SpecFetchError {
                url: self.url.clone(),
                message: format!("HTTP status {}", response.status),
            });
        }

        let spec =
            parse::from_yaml(&response.body).map_err(|source| SpecError::SpecParseError {
                origin: self.url.clone(),
                source,
            })?;
        self.persist(&response.body)?;
        Ok(spec)
    }

    fn is_fresh(&self, path: &Path) -> bool {
        fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map(|modified| modified.elapsed().unwrap_or(Duration::ZERO) < self.max_age)
            .unwrap_or(false)
    }

    /// Write to a sibling temp file, then rename over the cache.
    fn persist(&self, content: &str) -> Result<(), SpecError> {
        fs::create_dir_all(&self.cache_dir).map_err(io_error(&self.cache_dir))?;
        let target = self.cache_path();
        let staging = self.cache_dir.join(format!("{SPEC_CACHE_FILE}.tmp"));
        fs::write(&staging, content).map_err(io_error(&staging))?;
        if let Err(source) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(SpecError::Io {
                path: target,
                source,
            });
        }
        debug!("cached OpenAPI specification at {}", target.display());
        Ok(())
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SpecError {
    let path = path.to_path_buf();
    move |source| SpecError::Io { path, source }
}

fn read_spec(path: &Path, format: SpecFormat) -> Result<Specification, SpecError> {
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    parse::from_str(&content, format).map_err(|source| SpecError::SpecParseError {
        origin: path.display().to_string(),
        source,
    })
}
