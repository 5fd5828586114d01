use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ScopeConfig, CONFIG_FILE};
use crate::core::{ScopeError, ScopeResult};

/// Loads the rule-bearing keys of one configuration file.
///
/// A file that cannot be read or parsed is an error; callers must not fall
/// back to an empty config.
pub fn load_config_file(path: &Path) -> ScopeResult<ScopeConfig> {
    let content = fs::read_to_string(path).map_err(|e| ScopeError::Config {
        path: path.to_path_buf(),
        message: format!("unable to read file: {e}"),
    })?;

    let config = toml::from_str::<ScopeConfig>(&content).map_err(|source| {
        ScopeError::ConfigParse {
            source,
            path: path.to_path_buf(),
        }
    })?;

    tracing::debug!(
        "Loaded config from {:?} ({} tree, {} content patterns)",
        path,
        config.exclude_tree.len(),
        config.exclude_content.len()
    );
    Ok(config)
}

/// Writes the bundled defaults into `target_dir` as a `.grobl.toml`.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn write_default_config(target_dir: &Path, overwrite: bool) -> ScopeResult<PathBuf> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() && !overwrite {
        return Err(ScopeError::Config {
            path: config_path,
            message: "file already exists".to_string(),
        });
    }

    let body = toml::to_string_pretty(&ScopeConfig::bundled_defaults()).map_err(|e| {
        ScopeError::Config {
            path: config_path.clone(),
            message: format!("unable to serialize defaults: {e}"),
        }
    })?;

    fs::write(&config_path, body).map_err(|e| ScopeError::io(e, &config_path))?;
    tracing::info!("Wrote default config to {:?}", config_path);
    Ok(config_path)
}

/// Reads a plain pattern-per-line file (legacy `--ignore-file`).
pub fn read_pattern_file(path: &Path) -> ScopeResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScopeError::PathNotFound(path.to_path_buf()),
        _ => ScopeError::io(e, path),
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
