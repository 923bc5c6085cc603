//! Environment-based configuration.
//!
//! Priority: environment variables, then a `.env` file, then defaults.
//! Production mode switches logging to JSON and tightens validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::{env, fs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    pub fn from_env() -> Self {
        match env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()).as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub app_name: String,
    pub version: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file (relative to the data dir).
    pub path: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Admin username encoded into the bearer token (matched case-insensitively).
    pub admin_username: String,
    /// How long an issued token stays valid.
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// ImgBB API key; must be set via env in production.
    pub imgbb_api_key: Option<String>,
    pub imgbb_upload_url: String,
    /// Per-file size limit accepted from clients.
    pub max_image_bytes: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub log_to_file: bool,
    pub log_to_stdout: bool,
    pub json_format: bool,
    pub max_file_size_mb: u64,
    pub max_log_files: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let environment = Environment::from_env();

        Self {
            environment,
            app_name: env::var("APP_NAME").unwrap_or_else(|_| "Shop Backoffice".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),

            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            },

            database: DatabaseConfig {
                path: env::var("DB_PATH").unwrap_or_else(|_| "shop.db".to_string()),
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DB_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
                connect_timeout_secs: 30,
                idle_timeout_secs: 600,
            },

            auth: AuthConfig {
                admin_username: env::var("ADMIN_USERNAME").unwrap_or_else(|_| "pakad".to_string()),
                token_ttl_secs: env::var("TOKEN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            },

            upload: UploadConfig {
                imgbb_api_key: env::var("IMGBB_API_KEY").ok(),
                imgbb_upload_url: env::var("IMGBB_UPLOAD_URL")
                    .unwrap_or_else(|_| "https://api.imgbb.com/1/upload".to_string()),
                max_image_bytes: 5 * 1024 * 1024,
                request_timeout_secs: 30,
            },

            logging: LoggingConfig {
                level: env::var("RUST_LOG").unwrap_or_else(|_| {
                    if environment.is_production() {
                        "warn".to_string()
                    } else {
                        "debug".to_string()
                    }
                }),
                log_to_file: true,
                log_to_stdout: env::var("LOG_TO_STDOUT").map(|s| s == "true").unwrap_or(true),
                json_format: environment.is_production(),
                max_file_size_mb: 10,
                max_log_files: 5,
            },
        }
    }
}

impl AppConfig {
    pub fn load() -> Self {
        Self::default()
    }

    /// Load key=value pairs from a `.env`-style file into the process
    /// environment, then build the config from it.
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        let content = fs::read_to_string(path).ok()?;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                env::set_var(key, value);
            }
        }

        Some(Self::default())
    }

    pub fn get_database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database.path)
    }

    pub fn is_production(&self) -> bool {
        self.environment.is_production()
    }

    /// Sanity checks before serving in production.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_production() {
            if self.upload.imgbb_api_key.is_none() {
                return Err(
                    "IMGBB_API_KEY must be set in production for image uploads. \
                     Set it via environment variable."
                        .to_string(),
                );
            }
            if self.auth.admin_username == "pakad" {
                eprintln!("WARNING: running in production with the default admin username");
            }
        }
        Ok(())
    }
}

static GLOBAL_CONFIG: OnceLock<AppConfig> = OnceLock::new();

pub fn init_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get_or_init(AppConfig::load)
}

pub fn get_config() -> &'static AppConfig {
    GLOBAL_CONFIG.get().expect("Configuration not initialized. Call init_config() first.")
}
