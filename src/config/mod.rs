//! Application configuration
//!
//! The process-level configuration (server bind address, database path,
//! user-agent identity, dictionary directory) is a TOML file loaded once at
//! startup. Crawler, inspector and indexer configurations are entities in
//! the database and arrive through the API; their validation also lives
//! here.

mod parser;
mod types;
mod validation;

pub use parser::{load_config, load_config_with_hash};
pub use types::{AppConfig, IndexConfig, ServerConfig, StorageConfig, UserAgentConfig};
pub use validation::{validate_app_config, validate_crawler, validate_indexer, validate_inspector};
