use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub backend: BackendConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub pat: PatConfig,
}

fn default_service_name() -> String {
    "identity-service".to_string()
}

fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

/// Endpoint of the internal platform backend every domain service call is
/// delegated to.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_seconds: u64,
}

fn default_backend_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Personal access token issuance policy. Enforced in the handler before
/// the downstream token service is called.
#[derive(Debug, Clone, Deserialize)]
pub struct PatConfig {
    #[serde(default = "default_pat_enabled")]
    pub enabled: bool,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_per_user_per_org: u32,
    #[serde(default = "default_max_lifetime_hours")]
    pub max_token_lifetime_hours: u32,
}

fn default_pat_enabled() -> bool {
    true
}

fn default_max_tokens() -> u32 {
    50
}

fn default_max_lifetime_hours() -> u32 {
    // one year
    8760
}

impl Default for PatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_tokens_per_user_per_org: default_max_tokens(),
            max_token_lifetime_hours: default_max_lifetime_hours(),
        }
    }
}

impl IdentityConfig {
    pub fn from_env() -> Result<Self, AppError> {
        core_config::load()
    }
}
