//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`pluralkit.{profile}.toml`)
//! 3. Main config file (`pluralkit.toml` / `config.toml`)
//! 4. Environment variables (`PK_*`)
//! 5. Programmatic overrides (`ConfigLoader::merge`), applied key by key
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `PK_` prefix with `__` as separator:
//!
//! - `PK_BOT__PREFIX=pk!` → `bot.prefix = "pk!"`
//! - `PK_DATABASE__URL=postgres://...` → `database.url = "postgres://..."`
//! - `PK_LOGGING__LEVEL=info` → `logging.level = "info"`
//!
//! The bot token is not part of the file config; see [`Credentials`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pk_runtime::config::{ConfigLoader, Credentials, Serialized};
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .merge(Serialized::default("bot.prefix", "pk!"))
//!     .load()?;
//! let credentials = Credentials::from_env()?;
//! ```

use std::path::{Path, PathBuf};

use figment::{Figment, Provider};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::BotConfig;
use super::validation::validate_config;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "PK_";

/// Environment variable holding the bot token.
pub const TOKEN_VAR: &str = "TOKEN";

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            _ => Self::Custom(name.to_string()),
        }
    }

    /// Reads `PK_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("PK_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Secrets read from the process environment.
#[derive(Clone)]
pub struct Credentials {
    /// Bot token.
    pub token: String,
}

impl Credentials {
    /// Reads the bot token from `TOKEN`.
    pub fn from_env() -> ConfigResult<Self> {
        match std::env::var(TOKEN_VAR) {
            Ok(token) if !token.is_empty() => Ok(Self { token }),
            _ => Err(ConfigError::MissingCredential(TOKEN_VAR)),
        }
    }

    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic overrides.
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a provider above every other source.
    ///
    /// Only the keys the provider sets are overridden, so pass a partial
    /// provider such as `Serialized::default("bot.prefix", "pk!")`. A whole
    /// `Serialized::defaults(BotConfig { .. })` replaces every file and
    /// environment value.
    pub fn merge<T: Provider>(mut self, provider: T) -> Self {
        self.figment = self.figment.merge(provider);
        self
    }

    /// Loads and validates the configuration.
    pub fn load(self) -> ConfigResult<BotConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: BotConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        validate_config(&config)?;

        debug!(
            profile = %profile,
            prefix = %config.bot.prefix,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(BotConfig::default()));

        if let Some(path) = self.config_file.take() {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, &path)?;
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with {} prefix", ENV_PREFIX);
            figment = figment.merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["PROFILE"])
                    .map(|key| key.as_str().replace("__", ".").into()),
            );
        }

        Ok(figment.merge(std::mem::take(&mut self.figment)))
    }

    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            _ => {
                let _ = figment;
                Err(ConfigError::ParseError(format!(
                    "Unsupported or disabled configuration file format: .{ext}"
                )))
            }
        }
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd);
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pluralkit"));
        }
        paths
    }

    /// Merges the first config file found in the search paths, preceded by
    /// its profile-specific variant.
    #[cfg(feature = "toml-config")]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        for search_path in self.resolve_search_paths() {
            for stem in ["pluralkit", "config"] {
                let profile_path =
                    search_path.join(format!("{stem}.{}.toml", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    figment = figment.merge(Toml::file(&profile_path));
                }

                let base_path = search_path.join(format!("{stem}.toml"));
                if base_path.exists() {
                    info!(path = %base_path.display(), "Loading configuration file");
                    return figment.merge(Toml::file(&base_path));
                }
            }
        }

        warn!("No configuration file found, using defaults");
        figment
    }

    #[cfg(not(feature = "toml-config"))]
    fn load_config_files(&self, figment: Figment) -> Figment {
        let _ = self.resolve_search_paths();
        figment
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<BotConfig> {
    ConfigLoader::new().load()
}

// =============================================================================
// Tests
// =============================================================================
