//! Configuration module for datashare.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ShareError};

/// One gibibyte, the default upload ceiling.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/datashare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Physical file storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory every stored file must live under.
    #[serde(default = "default_storage_root")]
    pub root: String,
}

fn default_storage_root() -> String {
    "data/files".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

/// Upload and download rules.
#[derive(Debug, Clone, Deserialize)]
pub struct SharingConfig {
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Public base URL the download token is appended to.
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,
    /// Shortest allowed lifetime in days.
    #[serde(default = "default_min_expiration_days")]
    pub min_expiration_days: i64,
    /// Longest allowed lifetime in days.
    #[serde(default = "default_max_expiration_days")]
    pub max_expiration_days: i64,
    /// Lifetime used when the uploader does not ask for one.
    #[serde(default = "default_default_expiration_days")]
    pub default_expiration_days: i64,
    /// Minimum length of an optional file password.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// MIME types refused at upload.
    #[serde(default = "default_blocked_mime_types")]
    pub blocked_mime_types: Vec<String>,
    /// Filename extensions refused at upload (lowercase, no dot).
    #[serde(default = "default_blocked_extensions")]
    pub blocked_extensions: Vec<String>,
}

fn default_max_file_size() -> u64 {
    GIB
}

fn default_download_base_url() -> String {
    "http://localhost:4200/download".to_string()
}

fn default_min_expiration_days() -> i64 {
    1
}

fn default_max_expiration_days() -> i64 {
    7
}

fn default_default_expiration_days() -> i64 {
    7
}

fn default_min_password_length() -> usize {
    4
}

fn default_blocked_mime_types() -> Vec<String> {
    [
        "application/x-msdownload",
        "application/x-msdos-program",
        "application/x-msi",
        "application/x-exe",
        "application/exe",
        "application/x-winexe",
        "application/x-sh",
        "application/x-shellscript",
        "application/x-bat",
        "application/x-java-archive",
        "application/java-archive",
        "application/x-deb",
        "application/x-rpm",
        "application/x-apple-diskimage",
        "application/vnd.microsoft.portable-executable",
        "application/x-executable",
        "application/x-mach-binary",
        "text/x-shellscript",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_blocked_extensions() -> Vec<String> {
    [
        "exe", "bat", "cmd", "com", "pif", "application", "gadget", "msi", "msp", "scr", "dll",
        "vbs", "vbe", "js", "jse", "ws", "wsf", "wsh", "ps1", "psm1", "sh", "bash", "jar", "app",
        "deb", "rpm", "dmg", "pkg", "cpl", "inf", "ins", "isp", "lnk", "msc", "reg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for SharingConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: default_max_file_size(),
            download_base_url: default_download_base_url(),
            min_expiration_days: default_min_expiration_days(),
            max_expiration_days: default_max_expiration_days(),
            default_expiration_days: default_default_expiration_days(),
            min_password_length: default_min_password_length(),
            blocked_mime_types: default_blocked_mime_types(),
            blocked_extensions: default_blocked_extensions(),
        }
    }
}

/// Bearer token verification.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider.
    #[serde(default)]
    pub jwt_secret: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/datashare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Immutable rule set handed to the sharing service and file storage.
///
/// Built once at startup (or per test case) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SharingPolicy {
    pub max_file_size: u64,
    pub download_base_url: String,
    pub min_expiration_days: i64,
    pub max_expiration_days: i64,
    pub default_expiration_days: i64,
    pub min_password_length: usize,
    pub blocked_mime_types: Vec<String>,
    pub blocked_extensions: Vec<String>,
}

impl Default for SharingPolicy {
    fn default() -> Self {
        SharingConfig::default().into()
    }
}

impl From<SharingConfig> for SharingPolicy {
    fn from(c: SharingConfig) -> Self {
        Self {
            max_file_size: c.max_file_size_bytes,
            download_base_url: c.download_base_url.trim_end_matches('/').to_string(),
            min_expiration_days: c.min_expiration_days,
            max_expiration_days: c.max_expiration_days,
            default_expiration_days: c.default_expiration_days,
            min_password_length: c.min_password_length,
            blocked_mime_types: c
                .blocked_mime_types
                .into_iter()
                .map(|m| m.trim().to_lowercase())
                .collect(),
            blocked_extensions: c
                .blocked_extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Upload/download rules.
    #[serde(default)]
    pub sharing: SharingConfig,
    /// Bearer token verification.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ShareError::Config(format!("cannot read config: {e}")))?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DATASHARE_JWT_SECRET`: Override the JWT secret key
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("DATASHARE_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(ShareError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via DATASHARE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }

        let s = &self.sharing;
        if s.min_expiration_days < 1 || s.min_expiration_days > s.max_expiration_days {
            return Err(ShareError::Config(format!(
                "invalid expiration horizon [{}, {}]",
                s.min_expiration_days, s.max_expiration_days
            )));
        }
        if s.default_expiration_days < s.min_expiration_days
            || s.default_expiration_days > s.max_expiration_days
        {
            return Err(ShareError::Config(format!(
                "default_expiration_days {} is outside [{}, {}]",
                s.default_expiration_days, s.min_expiration_days, s.max_expiration_days
            )));
        }
        if s.max_file_size_bytes == 0 {
            return Err(ShareError::Config(
                "max_file_size_bytes must be positive".to_string(),
            ));
        }
        url::Url::parse(&s.download_base_url).map_err(|e| {
            ShareError::Config(format!(
                "download_base_url '{}' is not a valid URL: {e}",
                s.download_base_url
            ))
        })?;

        Ok(())
    }

    /// Build the immutable sharing policy from this configuration.
    pub fn sharing_policy(&self) -> SharingPolicy {
        self.sharing.clone().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = "secret".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/datashare.db");
        assert_eq!(config.storage.root, "data/files");

        assert_eq!(config.sharing.max_file_size_bytes, GIB);
        assert_eq!(config.sharing.min_expiration_days, 1);
        assert_eq!(config.sharing.max_expiration_days, 7);
        assert_eq!(config.sharing.default_expiration_days, 7);
        assert_eq!(config.sharing.min_password_length, 4);
        assert!(config
            .sharing
            .blocked_extensions
            .contains(&"exe".to_string()));
        assert!(config
            .sharing
            .blocked_mime_types
            .contains(&"application/x-msdownload".to_string()));

        assert!(config.auth.jwt_secret.is_empty());

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/datashare.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000
cors_origins = ["http://localhost:4200"]

[database]
path = "custom/db.sqlite"

[storage]
root = "custom/files"

[sharing]
max_file_size_bytes = 1048576
download_base_url = "https://share.example.com/d/"
min_expiration_days = 2
max_expiration_days = 5
default_expiration_days = 3
min_password_length = 6
blocked_mime_types = ["Application/X-Sh"]
blocked_extensions = [".EXE"]

[auth]
jwt_secret = "s3cret"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:4200"]);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.storage.root, "custom/files");
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(config.logging.level, "debug");

        let policy = config.sharing_policy();
        assert_eq!(policy.max_file_size, 1048576);
        assert_eq!(policy.download_base_url, "https://share.example.com/d");
        assert_eq!(policy.min_expiration_days, 2);
        assert_eq!(policy.max_expiration_days, 5);
        assert_eq!(policy.default_expiration_days, 3);
        assert_eq!(policy.min_password_length, 6);
        assert_eq!(policy.blocked_mime_types, vec!["application/x-sh"]);
        assert_eq!(policy.blocked_extensions, vec!["exe"]);
    }

    #[test]
    fn test_parse_partial_config_uses_defaults() {
        let config = Config::parse("[server]\nport = 1234\n").unwrap();
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.sharing.max_expiration_days, 7);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::parse("this is not [valid toml");
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_expiration_horizon() {
        let mut config = valid_config();
        config.sharing.min_expiration_days = 5;
        config.sharing.max_expiration_days = 2;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.sharing.default_expiration_days = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_download_base_url() {
        let mut config = valid_config();
        config.sharing.download_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/datashare.toml");
        assert!(matches!(result, Err(ShareError::Config(_))));
    }

    #[test]
    fn test_default_policy_matches_default_config() {
        let policy = SharingPolicy::default();
        assert_eq!(policy.max_file_size, GIB);
        assert_eq!(policy.download_base_url, "http://localhost:4200/download");
        assert_eq!(policy.min_password_length, 4);
    }
}
