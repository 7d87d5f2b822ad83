//! Configuration loading
//!
//! Config files are `key = value` lines; `#` starts a comment, lines
//! without `=` are ignored. Values land in the typed schema through
//! [`Config::set_param`], so an unknown key or a malformed value fails the
//! load.

use std::path::Path;

use tracing::{debug, info};

use super::types::Config;
use crate::error::ConfigError;

/// Comment marker
const COMMENT_CHAR: char = '#';

/// Option/value separator
const OPTION_CHAR: char = '=';

/// Load configuration: defaults, then the file at `path`
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` (with path and OS error) if the file
/// cannot be read, or a parse/validation error from its contents.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    debug!("Loading configuration from {:?}", path);

    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::FileNotFound {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let config = load_config_str(&contents)?;

    info!(
        "Configuration loaded from {:?}: vxfld_port={}, holdtime={}s",
        path, config.vxfld_port, config.holdtime
    );

    Ok(config)
}

/// Load configuration from a string in config-file syntax
///
/// # Errors
///
/// Returns `ConfigError` if parsing or validation fails.
pub fn load_config_str(contents: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    apply_str(&mut config, contents)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration, then apply `(name, value)` overrides on top
///
/// The host daemon's command line uses this to take precedence over the
/// file. Validation runs after the overrides.
///
/// # Errors
///
/// Returns `ConfigError` from the load, the overrides, or validation.
pub fn load_config_with_overrides<'a>(
    path: impl AsRef<Path>,
    overrides: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Config, ConfigError> {
    let mut config = load_config(path)?;
    config.apply_overrides(overrides)?;
    config.validate()?;
    Ok(config)
}

/// Apply config-file lines to an existing `Config`
fn apply_str(config: &mut Config, contents: &str) -> Result<(), ConfigError> {
    for line in contents.lines() {
        let line = match line.split_once(COMMENT_CHAR) {
            Some((before, _comment)) => before,
            None => line,
        };

        if let Some((option, value)) = line.split_once(OPTION_CHAR) {
            config.set_param(option.trim(), value.trim())?;
        }
    }
    Ok(())
}
