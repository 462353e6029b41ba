//! Configuration for the AJVS export services
//!
//! Layered, later sources winning: built-in defaults, `config/default`,
//! `config/{APP_ENV}`, `config/local`, then `APP__SECTION__KEY` environment
//! variables. Only `database.url` has no usable default in production.

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Read-only catalog connection
    pub database: DatabaseConfig,

    /// Journal identity shared by the OAI-PMH and RSS renderers
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// RSS feed configuration
    #[serde(default)]
    pub feed: FeedConfig,

    /// OAI-PMH responder limits
    #[serde(default)]
    pub oai: OaiConfig,

    /// Per-client admission control for both endpoints
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Whole-request deadline, store query included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Grace period for in-flight harvests after SIGTERM
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Postgres DSN; a read-only role is sufficient
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Upper bound for a single catalog query
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Repository name reported by Identify
    #[serde(default = "default_repository_name")]
    pub name: String,

    /// Journal title used in dc:source and the feed's source block
    #[serde(default = "default_journal_title")]
    pub journal_title: String,

    /// Publisher used in dc:publisher and dc:rights
    #[serde(default = "default_publisher")]
    pub publisher: String,

    /// Domain embedded in OAI identifiers
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Public URL of the OAI-PMH endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root of canonical article URLs
    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_earliest_datestamp")]
    pub earliest_datestamp: String,

    #[serde(default = "default_set_spec")]
    pub set_spec: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,

    #[serde(default = "default_feed_description")]
    pub description: String,

    /// URL the feed is served from (atom:link rel="self")
    #[serde(default = "default_feed_self_url")]
    pub self_url: String,

    #[serde(default = "default_feed_image_url")]
    pub image_url: String,

    /// Number of articles in the feed
    #[serde(default = "default_feed_item_limit")]
    pub item_limit: u64,

    #[serde(default = "default_feed_ttl")]
    pub ttl_minutes: u32,

    /// Cache-Control max-age for successful responses
    #[serde(default = "default_feed_cache_max_age")]
    pub cache_max_age_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OaiConfig {
    /// Cap on ListRecords / ListIdentifiers result sets
    #[serde(default = "default_oai_max_records")]
    pub max_records: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Fixed window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests admitted per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Count OAI-PMH and RSS requests against one quota per client
    #[serde(default)]
    pub shared_quota: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// EnvFilter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port; 0 turns the exporter off
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_query_timeout() -> u64 { 5 }
fn default_repository_name() -> String { "African Journal of Veterinary Sciences".to_string() }
fn default_journal_title() -> String { "African Journal of Veterinary Sciences".to_string() }
fn default_publisher() -> String { "African Journal of Veterinary Sciences".to_string() }
fn default_domain() -> String { "ajvs.org".to_string() }
fn default_base_url() -> String { "https://ajvs.org/api/oai".to_string() }
fn default_site_url() -> String { "https://ajvs.org".to_string() }
fn default_admin_email() -> String { "editor@ajvs.org".to_string() }
fn default_earliest_datestamp() -> String { "2020-01-01T00:00:00Z".to_string() }
fn default_set_spec() -> String { "journal:ajvs".to_string() }
fn default_feed_title() -> String { "African Journal of Veterinary Sciences - Latest Articles".to_string() }
fn default_feed_description() -> String {
    "Recently published peer-reviewed articles from the African Journal of Veterinary Sciences".to_string()
}
fn default_feed_self_url() -> String { "https://ajvs.org/api/rss".to_string() }
fn default_feed_image_url() -> String { "https://ajvs.org/logo.png".to_string() }
fn default_feed_item_limit() -> u64 { 50 }
fn default_feed_ttl() -> u32 { 1440 }
fn default_feed_cache_max_age() -> u64 { 3600 }
fn default_oai_max_records() -> u64 { 1000 }
fn default_enabled() -> bool { true }
fn default_window_secs() -> u64 { 3600 }
fn default_max_requests() -> u32 { 100 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "ajvs-export".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/ajvs".to_string(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: default_repository_name(),
            journal_title: default_journal_title(),
            publisher: default_publisher(),
            domain: default_domain(),
            base_url: default_base_url(),
            site_url: default_site_url(),
            admin_email: default_admin_email(),
            earliest_datestamp: default_earliest_datestamp(),
            set_spec: default_set_spec(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
            self_url: default_feed_self_url(),
            image_url: default_feed_image_url(),
            item_limit: default_feed_item_limit(),
            ttl_minutes: default_feed_ttl(),
            cache_max_age_secs: default_feed_cache_max_age(),
        }
    }
}

impl Default for OaiConfig {
    fn default() -> Self {
        Self {
            max_records: default_oai_max_records(),
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            shared_quota: false,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl RepositoryConfig {
    /// OAI identifier for an article: `oai:<domain>:article/<id>`
    pub fn oai_identifier(&self, id: impl std::fmt::Display) -> String {
        format!("oai:{}:article/{}", self.domain, id)
    }

    /// Canonical public URL for an article
    pub fn article_url(&self, id: impl std::fmt::Display) -> String {
        format!("{}/articles/{}", self.site_url.trim_end_matches('/'), id)
    }
}

impl AppConfig {
    /// Load the layered configuration and validate it
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false));

        Self::finish(builder)
    }

    /// Load a single file plus environment overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::finish(Config::builder().add_source(File::with_name(path)))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        // e.g. APP__RATE_LIMIT__MAX_REQUESTS=200
        let env = Environment::with_prefix("APP").separator("__").try_parsing(true);
        let config: Self = builder.add_source(env).build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every response wrong
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Message(message.to_string()));

        if self.repository.domain.trim().is_empty() {
            return invalid("repository.domain must not be empty");
        }
        if self.repository.base_url.trim().is_empty() || self.repository.site_url.trim().is_empty() {
            return invalid("repository.base_url and repository.site_url must be set");
        }
        if self.oai.max_records == 0 {
            return invalid("oai.max_records must be positive");
        }
        if self.feed.item_limit == 0 {
            return invalid("feed.item_limit must be positive");
        }
        if self.rate_limit.enabled && self.rate_limit.window_secs == 0 {
            return invalid("rate_limit.window_secs must be positive when rate limiting is enabled");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    /// Get the per-query store timeout as Duration
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.database.query_timeout_secs)
    }

    /// Get the rate limit window as Duration
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit.window_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            repository: RepositoryConfig::default(),
            feed: FeedConfig::default(),
            oai: OaiConfig::default(),
            rate_limit: RateLimitSettings::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
