// SPDX-FileCopyrightText: 2026 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "sinklight.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, String),

    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, String),
}

/// Returns the default search paths for `sinklight.toml`
/// (current directory → XDG config → /etc).
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("sinklight").join(CONFIG_FILE_NAME));
    }
    paths.push(PathBuf::from("/etc/sinklight").join(CONFIG_FILE_NAME));
    paths
}

/// Extract and deserialize a named section from a TOML file.
///
/// `Ok(None)` when the section is absent.
fn load_section_from_file<T: DeserializeOwned>(
    path: &Path,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

    let table: toml::Table = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;

    let Some(section) = table.get(key) else {
        return Ok(None);
    };

    // Round-trip through a string so serde defaults apply to missing keys.
    let section_toml = toml::to_string(section)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    let cfg = toml::from_str::<T>(&section_toml)
        .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
    Ok(Some(cfg))
}

/// Trait for loading configuration from a `sinklight.toml` section.
pub trait ConfigFile: Sized + Default + DeserializeOwned {
    /// Section key in `sinklight.toml` (e.g. `"sinklight-server"`).
    fn section_key() -> &'static str;

    /// Load the section from a specific file path.
    ///
    /// Errors if the file cannot be read, is not valid TOML, or lacks the
    /// `[<section_key>]` table.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        load_section_from_file::<Self>(path, Self::section_key())?.ok_or_else(|| {
            ConfigError::ParseError(
                path.to_path_buf(),
                format!("missing [{}] section", Self::section_key()),
            )
        })
    }

    /// Load the first default-path file that carries the section.
    ///
    /// Returns `(Default::default(), None)` when none does.
    fn load_from_default_paths() -> Result<(Self, Option<PathBuf>), ConfigError> {
        for path in config_search_paths() {
            if path.exists() {
                if let Some(cfg) = load_section_from_file::<Self>(&path, Self::section_key())? {
                    return Ok((cfg, Some(path)));
                }
            }
        }
        Ok((Self::default(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Sample {
        name: String,
        retries: u32,
    }

    impl ConfigFile for Sample {
        fn section_key() -> &'static str {
            "sample"
        }
    }

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sinklight-app-{}-{}.toml",
            std::process::id(),
            name
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_section_with_defaults() {
        let path = write_temp("defaults", "[sample]\nname = \"kitchen\"\n");
        let cfg = Sample::load_from_file(&path).unwrap();
        assert_eq!(
            cfg,
            Sample {
                name: "kitchen".to_string(),
                retries: 0
            }
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_section_is_an_error() {
        let path = write_temp("missing", "[other]\nname = \"x\"\n");
        let err = Sample::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("missing [sample] section"));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let path = write_temp("invalid", "[sample\n");
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ParseError(_, _))
        ));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_unreadable_file_is_a_read_error() {
        let path = std::env::temp_dir().join("sinklight-app-does-not-exist.toml");
        assert!(matches!(
            Sample::load_from_file(&path),
            Err(ConfigError::ReadError(_, _))
        ));
    }

    #[test]
    fn test_search_paths_order() {
        let paths = config_search_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from("sinklight.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/sinklight/sinklight.toml"))
        );
    }
}
