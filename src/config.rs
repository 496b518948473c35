//! Configuration for statusward.
//!
//! [`IntegrationConfig`] is assembled with [`IntegrationConfigBuilder`] and is
//! immutable once built. [`ServerConfig`] loads the daemon settings from
//! environment variables with sensible defaults.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::client::{CachetClient, StatusPageApi};
use crate::reconcile::{Clock, GroupingPolicy, LocalClock, SystemClock};

/// Header carrying the API token on every request.
pub const ACCESS_TOKEN_HEADER: &str = "X-Cachet-Token";

/// Configuration error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API URL can not be empty")]
    EmptyApiUrl,
    #[error("invalid API URL {url}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("access token can not be empty")]
    EmptyAccessToken,
    #[error("username can not be empty")]
    EmptyUsername,
    #[error("password can not be empty")]
    EmptyPassword,
    #[error("timeout can not be equal to zero")]
    ZeroTimeout,
    #[error("request headers can not be empty")]
    EmptyHeaders,
    #[error("invalid request header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("HTTP client could not be built: {0}")]
    HttpClient(String),
    #[error("no credentials configured (set STATUSWARD_ACCESS_TOKEN or STATUSWARD_USERNAME and STATUSWARD_PASSWORD)")]
    MissingCredentials,
}

/// How requests authenticate against the status page.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Sent in the [`ACCESS_TOKEN_HEADER`] header.
    Token(String),
    /// Sent as HTTP basic auth.
    Basic { username: String, password: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => write!(f, "Basic({}:***)", username),
        }
    }
}

/// Everything needed to talk to the remote API.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Base URL without a trailing slash, e.g. `https://status.example.com/api/v1`.
    pub api_url: String,
    pub credentials: Credentials,
    /// Extra headers sent with every request.
    pub headers: HashMap<String, String>,
    /// Per-request timeout. `None` keeps the HTTP client default.
    pub timeout: Option<Duration>,
    /// Strict mode: transport failures are raised instead of degrading to
    /// an empty result, and a failing unit aborts the whole batch.
    pub fail_fast: bool,
}

/// Immutable configuration of the reconciliation engine.
#[derive(Clone)]
pub struct IntegrationConfig {
    pub connection: Connection,
    pub grouping: GroupingPolicy,
    pub clock: Arc<dyn Clock>,
    pub client: Arc<dyn StatusPageApi>,
}

impl fmt::Debug for IntegrationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntegrationConfig")
            .field("connection", &self.connection)
            .field("grouping", &self.grouping)
            .finish_non_exhaustive()
    }
}

impl IntegrationConfig {
    /// Start a configuration authenticating with an access token.
    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> IntegrationConfigBuilder {
        IntegrationConfigBuilder::new(api_url, Credentials::Token(token.into()))
    }

    /// Start a configuration authenticating with basic credentials.
    pub fn with_basic_auth(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> IntegrationConfigBuilder {
        IntegrationConfigBuilder::new(
            api_url,
            Credentials::Basic {
                username: username.into(),
                password: password.into(),
            },
        )
    }
}

/// Staged builder for [`IntegrationConfig`]. Nothing is validated until
/// [`build`](Self::build).
pub struct IntegrationConfigBuilder {
    api_url: String,
    credentials: Credentials,
    headers: Option<HashMap<String, String>>,
    timeout: Option<Duration>,
    fail_fast: bool,
    group_id: i64,
    watcher_groups: HashMap<String, i64>,
    clock: Option<Arc<dyn Clock>>,
    client: Option<Arc<dyn StatusPageApi>>,
}

impl IntegrationConfigBuilder {
    pub fn new(api_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            api_url: api_url.into(),
            credentials,
            headers: None,
            timeout: None,
            fail_fast: false,
            group_id: 0,
            watcher_groups: HashMap::new(),
            clock: None,
            client: None,
        }
    }

    /// Per-request timeout. Must not be zero.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Extra headers for every request. Must not be empty.
    pub fn headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Enable strict mode.
    pub fn fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Group id used when a check's group is unknown (default 0).
    pub fn group_id(mut self, group_id: i64) -> Self {
        self.group_id = group_id;
        self
    }

    /// Map of check group names to remote group ids.
    pub fn watcher_groups(mut self, groups: HashMap<String, i64>) -> Self {
        self.watcher_groups = groups;
        self
    }

    /// Source of "today" for incident bucketing (default: UTC system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replace the HTTP client with another [`StatusPageApi`].
    pub fn client(mut self, client: Arc<dyn StatusPageApi>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<IntegrationConfig, ConfigError> {
        let api_url = normalize_api_url(&self.api_url)?;

        match &self.credentials {
            Credentials::Token(token) if token.trim().is_empty() => {
                return Err(ConfigError::EmptyAccessToken)
            }
            Credentials::Basic { username, .. } if username.trim().is_empty() => {
                return Err(ConfigError::EmptyUsername)
            }
            Credentials::Basic { password, .. } if password.trim().is_empty() => {
                return Err(ConfigError::EmptyPassword)
            }
            _ => {}
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroTimeout);
        }

        let headers = match self.headers {
            Some(h) if h.is_empty() => return Err(ConfigError::EmptyHeaders),
            Some(h) => h,
            None => HashMap::new(),
        };

        let connection = Connection {
            api_url,
            credentials: self.credentials,
            headers,
            timeout: self.timeout,
            fail_fast: self.fail_fast,
        };

        let client: Arc<dyn StatusPageApi> = match self.client {
            Some(client) => client,
            None => Arc::new(CachetClient::new(&connection)?),
        };

        Ok(IntegrationConfig {
            connection,
            grouping: GroupingPolicy::new(self.group_id, self.watcher_groups),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            client,
        })
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::EmptyApiUrl);
    }
    let trimmed = trimmed.trim_end_matches('/');
    Url::parse(trimmed).map_err(|e| ConfigError::InvalidApiUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(trimmed.to_string())
}

/// Daemon configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP port for the ingest API (default: 8080)
    pub http_port: u16,
    /// Base URL of the status page API
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Default group id (default: 0)
    pub group_id: i64,
    pub watcher_groups: HashMap<String, i64>,
    pub timeout: Option<Duration>,
    pub fail_fast: bool,
    /// Bucket incidents by local date instead of UTC
    pub local_dates: bool,
    /// Upper bound on reconciling one batch or one single result
    pub batch_deadline: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            api_url: None,
            access_token: None,
            username: None,
            password: None,
            group_id: 0,
            watcher_groups: HashMap::new(),
            timeout: None,
            fail_fast: false,
            local_dates: false,
            batch_deadline: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `STATUSWARD_HTTP_PORT`: HTTP port (default: 8080)
    /// - `STATUSWARD_API_URL`: status page API base URL
    /// - `STATUSWARD_ACCESS_TOKEN`: API token
    /// - `STATUSWARD_USERNAME` / `STATUSWARD_PASSWORD`: basic credentials
    /// - `STATUSWARD_GROUP_ID`: default group id (default: 0)
    /// - `STATUSWARD_WATCHER_GROUPS`: `name=id,name=id`
    /// - `STATUSWARD_TIMEOUT_SECS`: request timeout in seconds
    /// - `STATUSWARD_FAIL_FAST`: `true` or `1` enables strict mode
    /// - `STATUSWARD_LOCAL_DATES`: `true` or `1` buckets incidents by local date
    /// - `STATUSWARD_BATCH_DEADLINE_SECS`: deadline for one request in seconds
    pub fn load() -> Self {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with an arbitrary variable source.
    pub fn load_from<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port_str) = var("STATUSWARD_HTTP_PORT") {
            match port_str.parse() {
                Ok(port) => cfg.http_port = port,
                Err(_) => tracing::warn!("Ignoring invalid STATUSWARD_HTTP_PORT: {}", port_str),
            }
        }

        cfg.api_url = non_empty(var("STATUSWARD_API_URL"));
        cfg.access_token = non_empty(var("STATUSWARD_ACCESS_TOKEN"));
        cfg.username = non_empty(var("STATUSWARD_USERNAME"));
        cfg.password = non_empty(var("STATUSWARD_PASSWORD"));

        if let Some(group_str) = var("STATUSWARD_GROUP_ID") {
            match group_str.parse() {
                Ok(id) => cfg.group_id = id,
                Err(_) => tracing::warn!("Ignoring invalid STATUSWARD_GROUP_ID: {}", group_str),
            }
        }

        if let Some(groups) = var("STATUSWARD_WATCHER_GROUPS") {
            cfg.watcher_groups = parse_watcher_groups(&groups);
        }

        cfg.timeout = seconds(var("STATUSWARD_TIMEOUT_SECS"), "STATUSWARD_TIMEOUT_SECS");
        cfg.batch_deadline = seconds(
            var("STATUSWARD_BATCH_DEADLINE_SECS"),
            "STATUSWARD_BATCH_DEADLINE_SECS",
        );

        if let Some(value) = var("STATUSWARD_FAIL_FAST") {
            cfg.fail_fast = flag(&value);
        }
        if let Some(value) = var("STATUSWARD_LOCAL_DATES") {
            cfg.local_dates = flag(&value);
        }

        cfg
    }

    /// Builder for the integration described by this configuration.
    pub fn integration_builder(&self) -> Result<IntegrationConfigBuilder, ConfigError> {
        let api_url = self.api_url.clone().ok_or(ConfigError::EmptyApiUrl)?;

        let credentials = match (&self.access_token, &self.username, &self.password) {
            (Some(token), _, _) => Credentials::Token(token.clone()),
            (None, Some(username), Some(password)) => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => return Err(ConfigError::MissingCredentials),
        };

        let mut builder = IntegrationConfigBuilder::new(api_url, credentials)
            .group_id(self.group_id)
            .watcher_groups(self.watcher_groups.clone());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if self.fail_fast {
            builder = builder.fail_fast();
        }
        if self.local_dates {
            builder = builder.clock(Arc::new(LocalClock));
        }
        Ok(builder)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn seconds(value: Option<String>, key: &str) -> Option<Duration> {
    let raw = value?;
    match raw.parse::<f64>() {
        Ok(secs) if secs > 0.0 => Some(Duration::from_secs_f64(secs)),
        _ => {
            tracing::warn!("Ignoring invalid {}: {}", key, raw);
            None
        }
    }
}

/// Parse `name=id,name=id`. Malformed entries are skipped.
fn parse_watcher_groups(raw: &str) -> HashMap<String, i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let parsed = entry
                .split_once('=')
                .and_then(|(name, id)| Some((name.trim(), id.trim().parse::<i64>().ok()?)))
                .filter(|(name, _)| !name.is_empty());
            if parsed.is_none() {
                tracing::warn!("Ignoring malformed watcher group entry: {}", entry);
            }
            parsed.map(|(name, id)| (name.to_string(), id))
        })
        .collect()
}
