use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fallback admin key used when neither the config file nor `ADMIN_KEY` sets one
pub const DEFAULT_ADMIN_KEY: &str = "AKATHON_ADMIN_CHANGE_ME";

/// Fallback flash-cookie signing secret
pub const DEFAULT_SESSION_SECRET: &str = "dev_secret_key";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_key")]
    pub key: String,
    /// Serve the raw SQLite file on /download-db. Exposes password hashes.
    #[serde(default)]
    pub allow_db_download: bool,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_secret")]
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default = "default_max_per_cohort")]
    pub max_per_cohort: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

// Default value functions
fn default_port() -> u16 {
    5000
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("akathon.db")
}

fn default_admin_key() -> String {
    DEFAULT_ADMIN_KEY.to_string()
}

fn default_max_failed_attempts() -> u32 {
    10
}

fn default_session_secret() -> String {
    DEFAULT_SESSION_SECRET.to_string()
}

fn default_max_per_cohort() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            num_threads: default_num_threads(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            key: default_admin_key(),
            allow_db_download: false,
            max_failed_attempts_per_minute: default_max_failed_attempts(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_per_cohort: default_max_per_cohort(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            admin: AdminConfig::default(),
            session: SessionConfig::default(),
            registration: RegistrationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Build the process configuration once at startup.
    ///
    /// Reads the TOML file when one is given, otherwise starts from defaults,
    /// then applies environment overrides looked up through `lookup`.
    pub fn load<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_overrides(lookup)?;
        config.validate()?;

        Ok(config)
    }

    /// Apply `ADMIN_KEY`, `SESSION_SECRET`, `PORT`, `DATABASE_PATH` and `LOG_LEVEL`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("ADMIN_KEY") {
            self.admin.key = key;
        }

        if let Some(secret) = lookup("SESSION_SECRET") {
            self.session.secret = secret;
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .context(format!("Invalid PORT value '{}'", port))?;
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.database.path.as_os_str().is_empty() {
            bail!("database path must not be empty");
        }

        if self.admin.key.is_empty() {
            bail!("admin key must not be empty");
        }

        if self.admin.max_failed_attempts_per_minute == 0 {
            bail!("max_failed_attempts_per_minute must be greater than 0");
        }

        if self.session.secret.is_empty() {
            bail!("session secret must not be empty");
        }

        if self.registration.max_per_cohort == 0 {
            bail!("max_per_cohort must be greater than 0");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }

    /// Emit warnings for settings that are unsafe outside development.
    /// Must run after tracing is initialised.
    pub fn log_warnings(&self) {
        if self.admin.key == DEFAULT_ADMIN_KEY {
            warn!("Admin key is the built-in default; set ADMIN_KEY before exposing this server");
        }

        if self.session.secret == DEFAULT_SESSION_SECRET {
            warn!("Session secret is the built-in default; flash cookies can be forged");
        }

        if self.admin.allow_db_download {
            info!("Raw database download is enabled for admin key holders");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::load(None, no_env).expect("defaults should validate");

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.registration.max_per_cohort, 30);
        assert_eq!(config.database.path, PathBuf::from("akathon.db"));
        assert_eq!(config.admin.key, DEFAULT_ADMIN_KEY);
        assert!(!config.admin.allow_db_download);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("ADMIN_KEY", "secret-admin"),
            ("SESSION_SECRET", "signing"),
            ("PORT", "8080"),
            ("DATABASE_PATH", "/tmp/other.db"),
        ]
        .into_iter()
        .collect();

        let config = Config::load(None, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.admin.key, "secret-admin");
        assert_eq!(config.session.secret, "signing");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_invalid_port_override() {
        let result = Config::load(None, |k| (k == "PORT").then(|| "not-a-port".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_admin_key_rejected() {
        let result = Config::load(None, |k| (k == "ADMIN_KEY").then(String::new));
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[admin]
key = "file-key"
allow_db_download = true

[registration]
max_per_cohort = 5

[logging]
format = "console"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path()), no_env).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.admin.key, "file-key");
        assert!(config.admin.allow_db_download);
        assert_eq!(config.admin.max_failed_attempts_per_minute, 10);
        assert_eq!(config.registration.max_per_cohort, 5);
        assert_eq!(config.logging.format, "console");
        assert_eq!(config.session.secret, DEFAULT_SESSION_SECRET);
    }

    #[test]
    fn test_env_beats_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[admin]\nkey = \"file-key\"").unwrap();

        let config = Config::load(Some(file.path()), |k| {
            (k == "ADMIN_KEY").then(|| "env-key".to_string())
        })
        .unwrap();

        assert_eq!(config.admin.key, "env-key");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.registration.max_per_cohort = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file(Path::new("/nonexistent/akathon.toml"));
        assert!(result.is_err());
    }
}
