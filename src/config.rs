//! Utilities and definitions for config handling

use crate::bitap::MatchConfig;
use crate::diff::DiffConfig;
use crate::figment_utils::JsonProvider;
use crate::patch::PatchConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized},
    Figment,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use strum::{Display, EnumString};
use thiserror::Error;

#[cfg(target_os = "windows")]
use directories_next::ProjectDirs;

/// The expected filename for the config file
const CFG_FILE_NAME: &str = "config.json5";

/// The prefix for environment variables that override config values.
///
/// Nested keys are separated by a double underscore, e.g. `DIFFMATCH_MATCHING__THRESHOLD`.
const ENV_PREFIX: &str = "DIFFMATCH_";

/// Every tunable of the diff, match and patch engines
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineConfig {
    pub diff: DiffConfig,
    pub matching: MatchConfig,
    pub patch: PatchConfig,
}

/// The formats an edit script can be printed in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScriptFormat {
    /// The compact tab separated delta format
    #[default]
    Delta,
    /// A JSON array of edits
    Json,
}

/// The config struct for the application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Engine tunables
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// The format used to print edit scripts when none is given on the command line
    pub script_format: ScriptFormat,
}

/// The possible errors that can arise when attempting to read a config
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("The file failed to deserialize")]
    DeserializationFailure(#[from] anyhow::Error),
    #[error("Failed to read the config file")]
    ReadFileFailure(#[from] io::Error),
    #[error("Unable to compute the default config file path")]
    NoDefault,
}

impl Config {
    /// Read a config from a given filepath, or fall back to the default file paths
    ///
    /// Values from the environment take precedence over the file.
    pub fn try_from_file<P: AsRef<Path>>(path: Option<&P>) -> Result<Self, ReadError> {
        let config_fp = match path {
            Some(path) => path.as_ref().to_path_buf(),
            None => default_config_file_path().map_err(|_| ReadError::NoDefault)?,
        };
        info!("Reading config at {}", config_fp.to_string_lossy());
        let config_contents = fs::read_to_string(&config_fp)?;
        let config = Self::figment(&config_contents)
            .extract()
            .with_context(|| format!("Failed to parse config at {}", config_fp.to_string_lossy()))
            .map_err(ReadError::DeserializationFailure)?;
        Ok(config)
    }

    /// Layer the defaults, a JSON5 document and the environment, in increasing priority.
    fn figment(contents: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(JsonProvider::string(contents))
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .split("__")
                    .map(|key| key.as_str().replace('_', "-").into()),
            )
    }
}

/// Return the default location for the config file (for *nix, Linux and MacOS), this will use
/// $XDG_CONFIG/.config, where `$XDG_CONFIG` is `$HOME/.config` by default.
#[cfg(not(target_os = "windows"))]
fn default_config_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("diffmatch");
    let file_path = xdg_dirs.place_config_file(CFG_FILE_NAME)?;
    Ok(file_path)
}

/// Return the default location for the config file (for windows), this will use the roaming
/// app data directory.
#[cfg(target_os = "windows")]
fn default_config_file_path() -> Result<PathBuf> {
    let Some(proj_dirs) = ProjectDirs::from("io", "diffmatch", "diffmatch") else {
        anyhow::bail!("Was not able to retrieve config path");
    };
    let mut config_file: PathBuf = proj_dirs.config_dir().into();
    config_file.push(CFG_FILE_NAME);
    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sample_config() {
        let mut sample_config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        sample_config_path.push("assets/sample_config.json5");
        let config = Config::try_from_file(Some(sample_config_path).as_ref()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.json5",
                r#"{
                    // Only override a couple of values
                    matching: { threshold: 0.25 },
                    patch: { margin: 8 },
                    "script-format": "json",
                }"#,
            )?;
            let config = Config::try_from_file(Some(&"config.json5")).unwrap();
            assert_eq!(config.engine.matching.threshold, 0.25);
            assert_eq!(config.engine.matching.distance, 1000);
            assert_eq!(config.engine.patch.margin, 8);
            assert_eq!(config.engine.diff, DiffConfig::default());
            assert_eq!(config.script_format, ScriptFormat::Json);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json5", "{ diff: { timeout: 2.5 } }")?;
            jail.set_env("DIFFMATCH_DIFF__EDIT_COST", "6");
            jail.set_env("DIFFMATCH_MATCHING__MAX_BITS", "64");
            let config = Config::try_from_file(Some(&"config.json5")).unwrap();
            assert_eq!(config.engine.diff.timeout, 2.5);
            assert_eq!(config.engine.diff.edit_cost, 6);
            assert_eq!(config.engine.matching.max_bits, 64);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_config() {
        Jail::expect_with(|jail| {
            jail.create_file("config.json5", "{ diff: { timeout: \"soon\" } }")?;
            let result = Config::try_from_file(Some(&"config.json5"));
            assert!(matches!(result, Err(ReadError::DeserializationFailure(_))));
            Ok(())
        });
    }

    #[test]
    fn test_missing_config() {
        let result = Config::try_from_file(Some(&"/nonexistent/diffmatch/config.json5"));
        assert!(matches!(result, Err(ReadError::ReadFileFailure(_))));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_default_path_uses_xdg_config_home() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            fs::create_dir_all(jail.directory().join("diffmatch")).unwrap();
            jail.create_file("diffmatch/config.json5", "{ patch: { margin: 6 } }")?;
            let config = Config::try_from_file(None::<&PathBuf>).unwrap();
            assert_eq!(config.engine.patch.margin, 6);
            Ok(())
        });
    }

    #[test]
    fn test_default_round_trips_through_json() {
        let config = Config::default();
        let text = serde_json::to_string_pretty(&config).unwrap();
        let parsed: Config = json5::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
