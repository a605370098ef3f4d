pub mod app_config;
pub mod config;
pub mod error;
pub mod row;
pub mod validate;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, RowError, SourceError};
pub use row::{read_rows, Row};
pub use validate::{validate_rows, Rule};
