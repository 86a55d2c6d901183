//! Configuration structures for sp-autocopy.
//!
//! - [`WatchConfig`] - OS notifier settings (debouncing)
//! - [`DeployConfig`] - Deployment settings (property and command names)
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values the
//! SharePoint tooling uses, so an empty JSON object is a valid configuration.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default name of the project property listing token-replacement extensions.
pub const DEFAULT_TOKEN_EXTENSIONS_PROPERTY: &str = "TokenReplacementFileExtensions";

/// Default command used to resolve `{WebApplicationRoot}`.
pub const DEFAULT_WEB_APPLICATION_ROOT_COMMAND: &str =
    "Microsoft.VisualStudio.SharePoint.Commands.GetWebApplicationLocalPath";

/// Configuration for the OS-backed file notifier.
///
/// # Examples
///
/// ```
/// use spd_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple changes to a file within this window are delivered once.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Configuration for deployment and token substitution.
///
/// # Examples
///
/// ```
/// use spd_core::DeployConfig;
///
/// let config = DeployConfig::default();
/// assert_eq!(config.token_extensions_property, "TokenReplacementFileExtensions");
/// assert!(config.sharepoint_root.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Project property holding the semicolon-delimited extension allow-list.
    pub token_extensions_property: String,

    /// Connection command returning the web application's local path.
    pub web_application_root_command: String,

    /// Overrides the host's SharePoint install path for `{SharePointRoot}`.
    pub sharepoint_root: Option<Utf8PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            token_extensions_property: DEFAULT_TOKEN_EXTENSIONS_PROPERTY.to_owned(),
            web_application_root_command: DEFAULT_WEB_APPLICATION_ROOT_COMMAND.to_owned(),
            sharepoint_root: None,
        }
    }
}

/// Root configuration for sp-autocopy.
///
/// # Examples
///
/// ```
/// use spd_core::Config;
///
/// let config = Config::default();
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("debounce_ms"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// File notifier configuration.
    pub watch: WatchConfig,

    /// Deployment configuration.
    pub deploy: DeployConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file does not exist,
    /// [`ConfigError::Parse`] if it is not valid JSON, and
    /// [`ConfigError::InvalidOption`] if a value fails validation.
    pub fn from_json_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }
        let contents = std::fs::read_to_string(path.as_std_path())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates option values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for empty property or command names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.deploy.token_extensions_property.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "deploy.token_extensions_property",
                "must not be empty",
            ));
        }
        if self.deploy.web_application_root_command.trim().is_empty() {
            return Err(ConfigError::invalid_option(
                "deploy.web_application_root_command",
                "must not be empty",
            ));
        }
        Ok(())
    }
}
