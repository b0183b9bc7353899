use serde::Deserialize;

/// Main configuration structure for the Crawldex process
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the API listens on (e.g. "127.0.0.1:8600")
    #[serde(rename = "bind-address")]
    pub bind_address: String,
}

/// Persistence configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the full user agent string sent with every request
    ///
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Index build configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    /// Directory containing synonym dictionary files referenced by indexers
    #[serde(rename = "dictionaries-dir", default = "default_dictionaries_dir")]
    pub dictionaries_dir: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dictionaries_dir: default_dictionaries_dir(),
        }
    }
}

fn default_dictionaries_dir() -> String {
    "./dictionaries".to_string()
}
