//! Application configuration.
//!
//! Loaded from `drivingschool.toml` (see [`AppConfig::from_default_location`])
//! and then overridden by environment variables. Every section is optional;
//! missing values fall back to defaults suitable for local development.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::repo_config::override_parsed;
use crate::db::{PostgresSettings, RepositorySettings, RepositoryType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No drivingschool.toml found in standard locations")]
    NotFound,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub repository: RepositorySettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub uploads: UploadSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub school: SchoolSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory with a pre-built browser client, served for unknown paths.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default = "default_max_body_mb")]
    pub max_body_mb: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_body_mb: default_max_body_mb(),
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_mb * 1024 * 1024
    }
}

/// Which mail transport to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Log messages and keep them in memory.
    #[default]
    Log,
    Smtp,
}

/// `[mail]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub transport: MailTransport,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_school_name")]
    pub from_name: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
            from_name: default_school_name(),
        }
    }
}

/// `[uploads]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_max_file_mb")]
    pub max_file_mb: usize,
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_file_mb: default_max_file_mb(),
            allowed_types: default_allowed_types(),
        }
    }
}

impl UploadSettings {
    pub fn max_file_bytes(&self) -> usize {
        self.max_file_mb * 1024 * 1024
    }

    pub fn is_allowed(&self, content_type: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(content_type.trim()))
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_otp_ttl_minutes")]
    pub otp_ttl_minutes: i64,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Wrong guesses allowed before a code stops working.
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: i32,
    /// Admin account created at startup when both fields are set.
    #[serde(default)]
    pub admin_email: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            otp_ttl_minutes: default_otp_ttl_minutes(),
            session_ttl_hours: default_session_ttl_hours(),
            otp_max_attempts: default_otp_max_attempts(),
            admin_email: None,
            admin_password: None,
        }
    }
}

/// `[school]` section, printed on PDFs and emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchoolSettings {
    #[serde(default = "default_school_name")]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        Self {
            name: default_school_name(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_mb() -> usize {
    20
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "no-reply@drivingschool.local".to_string()
}

fn default_school_name() -> String {
    "Driving School".to_string()
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_max_file_mb() -> usize {
    5
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "application/pdf".to_string(),
    ]
}

fn default_otp_ttl_minutes() -> i64 {
    10
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_otp_max_attempts() -> i32 {
    5
}

/// Longest OTP lifetime accepted by `validate`: one day.
pub const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;
/// Longest session lifetime accepted by `validate`: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 366 * 24;

impl AppConfig {
    /// Parse a configuration file without applying environment overrides.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load `drivingschool.toml` from the first standard location that has one.
    ///
    /// Searches, in order:
    /// 1. `drivingschool.toml`
    /// 2. `backend/drivingschool.toml`
    /// 3. `../drivingschool.toml`
    pub fn from_default_location() -> Result<Self, ConfigError> {
        let search_paths = [
            PathBuf::from("drivingschool.toml"),
            PathBuf::from("backend/drivingschool.toml"),
            PathBuf::from("../drivingschool.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(ConfigError::NotFound)
    }

    /// File config when one is found (defaults otherwise), then env overrides.
    ///
    /// `DRIVINGSCHOOL_CONFIG` points at an explicit file.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("DRIVINGSCHOOL_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => match Self::from_default_location() {
                Ok(config) => config,
                Err(ConfigError::NotFound) => Self::default(),
                Err(e) => return Err(e),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        override_parsed("PORT", &mut self.server.port);
        if let Ok(dir) = std::env::var("STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }

        match std::env::var("REPOSITORY_TYPE") {
            Ok(kind) => self.repository.repo_type = kind,
            Err(_) => {
                if std::env::var("DATABASE_URL").is_ok()
                    || std::env::var("PG_DATABASE_URL").is_ok()
                {
                    self.repository.repo_type = "postgres".to_string();
                }
            }
        }
        self.postgres.apply_env_overrides();

        if let Ok(host) = std::env::var("SMTP_HOST") {
            self.mail.smtp_host = host;
            self.mail.transport = MailTransport::Smtp;
        }
        override_parsed("SMTP_PORT", &mut self.mail.smtp_port);
        if let Ok(user) = std::env::var("SMTP_USERNAME") {
            self.mail.smtp_username = user;
        }
        if let Ok(password) = std::env::var("SMTP_PASSWORD") {
            self.mail.smtp_password = password;
        }
        if let Ok(from) = std::env::var("MAIL_FROM") {
            self.mail.from_address = from;
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(dir);
        }
        if let Ok(email) = std::env::var("ADMIN_EMAIL") {
            self.auth.admin_email = Some(email);
        }
        if let Ok(password) = std::env::var("ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
    }

    pub fn repository_type(&self) -> Result<RepositoryType, ConfigError> {
        self.repository
            .repository_type()
            .map_err(ConfigError::Invalid)
    }

    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.repository_type()?;
        if self.mail.transport == MailTransport::Smtp && self.mail.smtp_host.is_empty() {
            return Err(ConfigError::Invalid(
                "mail.transport = \"smtp\" requires mail.smtp_host".to_string(),
            ));
        }
        if !(1..=MAX_OTP_TTL_MINUTES).contains(&self.auth.otp_ttl_minutes) {
            return Err(ConfigError::Invalid(format!(
                "auth.otp_ttl_minutes must be between 1 and {}",
                MAX_OTP_TTL_MINUTES
            )));
        }
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.auth.session_ttl_hours) {
            return Err(ConfigError::Invalid(format!(
                "auth.session_ttl_hours must be between 1 and {}",
                MAX_SESSION_TTL_HOURS
            )));
        }
        if self.auth.otp_max_attempts < 1 {
            return Err(ConfigError::Invalid(
                "auth.otp_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
