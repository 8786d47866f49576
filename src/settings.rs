use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Development card number used when nothing else is configured
pub const DEFAULT_CARD_NUMBER: &str = "1001600244772";
/// EBSCO identity provider host
pub const DEFAULT_LOGIN_BASE_URL: &str = "https://login.ebsco.com";
/// Motor M1 API root
pub const DEFAULT_MOTOR_BASE_URL: &str = "https://sites.motor.com/m1";
/// Lifetime given to a fresh credential unless configured otherwise
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 25;
/// Upper bound for `auth.session_ttl_minutes`
pub const MAX_SESSION_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelaySettings {
    pub application: ApplicationSettings,
    pub auth: AuthSettings,
    pub proxy: ProxySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Comma-separated list of allowed origins, or `*` for any origin
    pub cors_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Keep a server-side session alive and attach it to every proxied request
    pub auto_auth: bool,
    pub card_number: String,
    /// Intentionally blank by default; auto-auth stays inactive until it is set
    pub password: String,
    pub login_base_url: String,
    pub cust_id: String,
    pub group_id: String,
    pub prof_id: String,
    /// Lifetime given to a fresh credential, kept below the provider's own
    /// 30 minute session
    pub session_ttl_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub motor_base_url: String,
    pub request_timeout_seconds: u64,
    pub max_redirects: usize,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            cors_origins: "*".to_string(),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            auto_auth: true,
            card_number: DEFAULT_CARD_NUMBER.to_string(),
            password: String::new(),
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
            cust_id: "s5672256".to_string(),
            group_id: "main".to_string(),
            prof_id: "autorepso".to_string(),
            session_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            motor_base_url: DEFAULT_MOTOR_BASE_URL.to_string(),
            request_timeout_seconds: 30,
            max_redirects: 5,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthSettings {
    /// Auto-auth only runs when it is enabled and a password is configured
    #[must_use]
    pub fn auto_auth_ready(&self) -> bool {
        self.auto_auth && !self.password.is_empty()
    }

    /// Session TTL as a chrono duration, clamped to `0..=MAX_SESSION_TTL_MINUTES`
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.clamp(0, MAX_SESSION_TTL_MINUTES))
    }
}

impl ProxySettings {
    /// Per-call timeout for every outbound request
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl RelaySettings {
    /// Load settings from configuration files and environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - TOML parsing fails
    /// - Logger initialization fails
    pub fn load() -> anyhow::Result<Self> {
        Self::load_env_file();

        // Load base settings from TOML or defaults
        let mut settings = Self::load_base_settings()?;

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut settings);
        settings.validate();

        settings.initialize_logging()?;

        Ok(settings)
    }

    /// Initialize `env_logger` with the configured level as default filter
    ///
    /// # Errors
    ///
    /// Returns an error if a logger was already installed
    fn initialize_logging(&self) -> anyhow::Result<()> {
        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.logging.level.as_str()),
        )
        .try_init()?;
        Ok(())
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `RELAY_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read
    /// - TOML parsing fails
    fn load_base_settings() -> anyhow::Result<Self> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("RELAY_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ RELAY_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let toml_content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        basic_toml::from_str(&toml_content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Replace out-of-range values with their defaults
    pub fn validate(&mut self) {
        let ttl = self.auth.session_ttl_minutes;
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&ttl) {
            println!(
                "⚠️  auth.session_ttl_minutes must be between 1 and {MAX_SESSION_TTL_MINUTES}, got {ttl}; using {DEFAULT_SESSION_TTL_MINUTES}"
            );
            self.auth.session_ttl_minutes = DEFAULT_SESSION_TTL_MINUTES;
        }
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_auth_env_overrides(&mut settings.auth);
        Self::apply_proxy_env_overrides(&mut settings.proxy);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    /// Apply environment overrides for application settings
    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        if let Ok(host) = std::env::var("HOST") {
            app_settings.host = host;
        }
        Self::apply_parsed_env_override("PORT", &mut app_settings.port);
        if let Ok(cors_origins) = std::env::var("CORS_ORIGINS") {
            app_settings.cors_origins = cors_origins;
        }
    }

    /// Apply environment overrides for the EBSCO login
    pub fn apply_auth_env_overrides(auth_settings: &mut AuthSettings) {
        Self::apply_parsed_env_override("EBSCO_AUTO_AUTH", &mut auth_settings.auto_auth);
        if let Ok(card_number) = std::env::var("EBSCO_CARD_NUMBER") {
            if !card_number.is_empty() {
                auth_settings.card_number = card_number;
            }
        }
        if let Ok(password) = std::env::var("EBSCO_PASSWORD") {
            auth_settings.password = password;
        }
        if let Ok(login_base_url) = std::env::var("EBSCO_LOGIN_URL") {
            auth_settings.login_base_url = login_base_url;
        }
        Self::apply_parsed_env_override(
            "EBSCO_SESSION_TTL_MINUTES",
            &mut auth_settings.session_ttl_minutes,
        );
    }

    /// Apply environment overrides for proxy settings
    pub fn apply_proxy_env_overrides(proxy_settings: &mut ProxySettings) {
        if let Ok(motor_base_url) = std::env::var("MOTOR_BASE_URL") {
            proxy_settings.motor_base_url = motor_base_url;
        }
        Self::apply_parsed_env_override(
            "UPSTREAM_TIMEOUT_SECONDS",
            &mut proxy_settings.request_timeout_seconds,
        );
        Self::apply_parsed_env_override("MAX_BODY_BYTES", &mut proxy_settings.max_body_bytes);
    }

    /// Apply environment overrides for logging settings
    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            logging_settings.level = log_level;
        }
    }

    /// Helper function to apply parseable environment variable overrides
    fn apply_parsed_env_override<T: std::str::FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<T>() {
                *target = value;
            } else {
                // The logger is not initialized yet at this point
                println!("⚠️  Ignoring unparseable value for {env_var}: {value_str}");
            }
        }
    }

    /// Load environment variables from .env file
    fn load_env_file() {
        if let Ok(contents) = std::fs::read_to_string(".env") {
            for line in contents.lines() {
                let line = line.trim();
                if line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Get CORS origins as a vector of strings
    #[must_use]
    pub fn get_cors_origins(&self) -> Vec<String> {
        self.application
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Whether any origin may call the relay
    #[must_use]
    pub fn allows_any_origin(&self) -> bool {
        self.get_cors_origins().iter().any(|origin| origin == "*")
    }
}
