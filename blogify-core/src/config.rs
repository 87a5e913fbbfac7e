//! Configuration management

use crate::error::{BlogifyError, BlogifyResult};
use crate::logging::LoggingConfig;
use crate::types::{AdmissionConfig, AuthConfig, BlogifyConfig};

use std::path::Path;
use std::str::FromStr;

/// Shortest accepted HMAC secret, in bytes
pub const MIN_SECRET_LEN: usize = 16;

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            window_ms: 15 * 60 * 1000,
            max_requests: 100,
            compaction_interval_ms: 60 * 1000,
            trust_forwarded_for: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            clock_tolerance_ms: 0,
            token_ttl_secs: 7 * 24 * 60 * 60,
            role_lookup_timeout_ms: 2000,
            require_login_to_read_post: true,
        }
    }
}

impl Default for BlogifyConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BlogifyConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BlogifyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BlogifyError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: BlogifyConfig = toml::from_str(&content).map_err(|e| BlogifyError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> BlogifyResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| BlogifyError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| BlogifyError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: crate::ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Load from an optional file, then apply environment overrides and validate
    pub fn load(path: Option<&Path>) -> BlogifyResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment
    pub fn apply_env_overrides(&mut self) -> BlogifyResult<()> {
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(v) = env_parse("BLOGIFY_RATE_LIMIT_WINDOW_MS")? {
            self.admission.window_ms = v;
        }
        if let Some(v) = env_parse("BLOGIFY_RATE_LIMIT_MAX")? {
            self.admission.max_requests = v;
        }
        if let Some(v) = env_parse("BLOGIFY_COMPACTION_INTERVAL_MS")? {
            self.admission.compaction_interval_ms = v;
        }
        if let Some(v) = env_parse("BLOGIFY_TRUST_FORWARDED_FOR")? {
            self.admission.trust_forwarded_for = v;
        }
        if let Some(v) = env_parse("BLOGIFY_REQUIRE_LOGIN_TO_READ")? {
            self.auth.require_login_to_read_post = v;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> BlogifyResult<()> {
        if self.admission.window_ms == 0 {
            return Err(invalid(
                "admission.window_ms must be greater than 0",
                "Set admission.window_ms to a positive value",
            ));
        }

        if self.admission.max_requests == 0 {
            return Err(invalid(
                "admission.max_requests must be greater than 0",
                "Set admission.max_requests to a positive value",
            ));
        }

        if self.admission.compaction_interval_ms == 0 {
            return Err(invalid(
                "admission.compaction_interval_ms must be greater than 0",
                "Set admission.compaction_interval_ms to a positive value",
            ));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(invalid(
                "JWT secret is not configured",
                "Set the JWT_SECRET environment variable",
            ));
        }

        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(invalid(
                "JWT secret is too short",
                "Use a secret of at least 16 bytes",
            ));
        }

        if self.auth.token_ttl_secs == 0 {
            return Err(invalid(
                "auth.token_ttl_secs must be greater than 0",
                "Set auth.token_ttl_secs to a positive value",
            ));
        }

        if self.auth.role_lookup_timeout_ms == 0 {
            return Err(invalid(
                "auth.role_lookup_timeout_ms must be greater than 0",
                "Set auth.role_lookup_timeout_ms to a positive value",
            ));
        }

        Ok(())
    }
}

fn invalid(message: &str, suggestion: &str) -> BlogifyError {
    BlogifyError::Config {
        message: message.to_string(),
        source: None,
        context: crate::ErrorContext::new("config")
            .with_operation("validate")
            .with_suggestion(suggestion),
    }
}

fn env_parse<T>(key: &str) -> BlogifyResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| BlogifyError::Config {
            message: format!("Invalid value for {}: {}", key, e),
            source: None,
            context: crate::ErrorContext::new("config")
                .with_operation("env_override")
                .with_metadata("variable", key),
        }),
        Err(_) => Ok(None),
    }
}
