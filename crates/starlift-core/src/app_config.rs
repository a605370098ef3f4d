use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime configuration for an import run, loaded from the environment.
///
/// `uri`, `username`, and `password` identify the Northstar instance every
/// request is sent to; the rest tune the engine and have defaults.
#[derive(Clone)]
pub struct AppConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub env: Environment,
    pub log_level: String,
    pub default_city: Option<String>,
    pub default_county: Option<String>,
    pub request_timeout_secs: u64,
    pub concurrency: usize,
    pub log_dir: PathBuf,
    pub cache_path: PathBuf,
    pub cache_ttl_days: i64,
    pub debit_adjustment_id: Option<i64>,
    pub credit_adjustment_id: Option<i64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("default_city", &self.default_city)
            .field("default_county", &self.default_county)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("log_dir", &self.log_dir)
            .field("cache_path", &self.cache_path)
            .field("cache_ttl_days", &self.cache_ttl_days)
            .field("debit_adjustment_id", &self.debit_adjustment_id)
            .field("credit_adjustment_id", &self.credit_adjustment_id)
            .finish()
    }
}
