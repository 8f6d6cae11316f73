//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables TOML configuration files (`tanuki.toml`, `config.toml`)
//! - `yaml-config`: enables YAML configuration files (`tanuki.yaml`, `tanuki.yml`, etc.)
//!
//! Both features can be enabled simultaneously; if so, both file formats are searched and loaded.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults, replaced by [`ConfigLoader::merge`] when given
//! 2. Profile-specific config file (`tanuki.{profile}.toml` / `tanuki.{profile}.yaml`)
//! 3. Main config file (`tanuki.toml` / `tanuki.yaml`)
//! 4. Environment variables (`TANUKI_*`)
//! 5. Keyed overrides from [`ConfigLoader::set`]
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `TANUKI_` prefix with `__` as separator:
//!
//! - `TANUKI_BOT__PREFIX=.` → `bot.prefix = "."`
//! - `TANUKI_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `TANUKI_STORAGE__IN_MEMORY=true` → `storage.in_memory = true`
//!
//! # Example
//!
//! ```rust,no_run
//! use tanuki_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/tanuki.toml")
//!     .load()?;
//! # Ok::<(), tanuki_runtime::ConfigError>(())
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::TanukiConfig;

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

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `TANUKI_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var("TANUKI_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Programmatic base layer, merged right above the defaults.
    figment: Figment,
    /// Keyed overrides, merged last.
    overrides: Figment,
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
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("tanuki"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges a whole configuration programmatically.
    ///
    /// It replaces the built-in defaults; files and the environment still
    /// override it. Use [`set`](Self::set) for values that must win.
    pub fn merge(mut self, config: TanukiConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Overrides a single dotted key (e.g. `"bot.prefix"`) above every other
    /// source.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<TanukiConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: TanukiConfig = figment.extract().map_err(|e| {
            ConfigError::ParseError(format!("Failed to extract configuration: {e}"))
        })?;

        debug!(
            profile = %profile,
            prefix = %config.bot.prefix,
            logging_level = %config.logging.level,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(TanukiConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = self.config_file.take() {
            if path.exists() {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, &path)?;
            } else {
                return Err(ConfigError::FileNotFound(path));
            }
        } else {
            figment = self.load_config_files(figment);
        }

        if self.load_env {
            trace!("Loading environment variables with TANUKI_ prefix");
            figment = figment.merge(Env::prefixed("TANUKI_").ignore(&["PROFILE"]).split("__"));
        }

        Ok(figment.merge(std::mem::take(&mut self.overrides)))
    }

    /// Merges a single config file into the figment, dispatching on file extension.
    ///
    /// Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("tanuki"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Common search logic for a single file format.
    ///
    /// Iterates `search_paths × base_names`, tries a profile-specific variant first, then the
    /// base file. Returns `(figment, true)` as soon as a base file is found.
    #[cfg(any(feature = "toml-config", feature = "yaml-config"))]
    fn load_format_files<F>(
        &self,
        mut figment: Figment,
        search_paths: &[PathBuf],
        base_names: &[&str],
        merge_fn: F,
    ) -> (Figment, bool)
    where
        F: Fn(Figment, &Path) -> Figment,
    {
        for search_path in search_paths {
            for base_name in base_names {
                if let Some((stem, ext)) = base_name.rsplit_once('.') {
                    let profile_path =
                        search_path.join(format!("{stem}.{}.{ext}", self.profile.as_str()));
                    if profile_path.exists() {
                        debug!(path = %profile_path.display(), "Loading profile-specific config");
                        figment = merge_fn(figment, &profile_path);
                    }

                    let base_path = search_path.join(base_name);
                    if base_path.exists() {
                        info!(path = %base_path.display(), "Loading configuration file");
                        figment = merge_fn(figment, &base_path);
                        return (figment, true);
                    }
                }
            }
        }
        (figment, false)
    }

    /// Searches for and loads configuration files from search paths.
    #[allow(unused_mut)]
    fn load_config_files(&self, mut figment: Figment) -> Figment {
        let search_paths = self.resolve_search_paths();
        let mut found = false;

        #[cfg(feature = "toml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tanuki.toml", "config.toml"],
                |fig, path| fig.merge(Toml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        #[cfg(feature = "yaml-config")]
        {
            let (f, ok) = self.load_format_files(
                figment,
                &search_paths,
                &["tanuki.yaml", "tanuki.yml", "config.yaml", "config.yml"],
                |fig, path| fig.merge(Yaml::file(path)),
            );
            figment = f;
            found |= ok;
        }

        if !found {
            warn!("No configuration file found, using defaults");
        }
        figment
    }
}

/// Loads configuration from the default locations and the environment.
pub fn load_config() -> ConfigResult<TanukiConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path` plus the environment.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<TanukiConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir(tag: &str) -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("tanuki-config-{}-{tag}-{n}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new()
            .search_path(temp_dir("empty"))
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.bot.prefix, "!");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .file(temp_dir("missing").join("nope.toml"))
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let path = temp_dir("ext").join("tanuki.ini");
        std::fs::write(&path, "prefix=!").unwrap();
        let err = ConfigLoader::new().file(&path).without_env().load().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_overrides_defaults() {
        let path = temp_dir("file").join("tanuki.toml");
        std::fs::write(
            &path,
            "[bot]\nprefix = \".\"\n\n[plugins]\ndisabled = [\"ping\"]\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let config = ConfigLoader::new().file(&path).without_env().load().unwrap();

        assert_eq!(config.bot.prefix, ".");
        assert_eq!(config.bot.name, "Tanuki");
        assert!(config.plugins.is_disabled("Ping"));
        assert_eq!(config.logging.level.as_str(), "debug");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_is_overridden_by_base_file() {
        let dir = temp_dir("profile");
        std::fs::write(
            dir.join("tanuki.production.toml"),
            "[bot]\nname = \"Prod\"\nowner = \"ops\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("tanuki.toml"), "[bot]\nname = \"Base\"\n").unwrap();

        let config = ConfigLoader::new()
            .search_path(&dir)
            .profile("prod")
            .without_env()
            .load()
            .unwrap();

        assert_eq!(config.bot.name, "Base");
        assert_eq!(config.bot.owner, "ops");
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_set_beats_file() {
        let path = temp_dir("set").join("tanuki.toml");
        std::fs::write(&path, "[bot]\nprefix = \".\"\n").unwrap();

        let config = ConfigLoader::new()
            .file(&path)
            .without_env()
            .set("bot.prefix", "?")
            .load()
            .unwrap();

        assert_eq!(config.bot.prefix, "?");
    }

    #[test]
    fn test_programmatic_merge() {
        let mut overrides = TanukiConfig::default();
        overrides.bot.prefix = "#".into();
        overrides.storage.in_memory = true;

        let config = ConfigLoader::new()
            .search_path(temp_dir("merge"))
            .without_env()
            .merge(overrides)
            .load()
            .unwrap();

        assert_eq!(config.bot.prefix, "#");
        assert!(config.storage.in_memory);
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("TANUKI_RUNTIME__SHUTDOWN_GRACE_MS", "250");
        }
        let config = ConfigLoader::new()
            .search_path(temp_dir("env"))
            .load()
            .unwrap();
        unsafe {
            std::env::remove_var("TANUKI_RUNTIME__SHUTDOWN_GRACE_MS");
        }

        assert_eq!(config.runtime.shutdown_grace_ms, 250);
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("PROD"), Profile::Production);
        assert_eq!(Profile::parse("dev"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }
}
