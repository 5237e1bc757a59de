//! Configuration loading for Report Lens

mod schema;

pub use schema::{Config, DEFAULT_API_BASE_URL, DEFAULT_DATA_PATH, DEFAULT_TIMEOUT_SECS};

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = ".reportlensrc.json";

/// Load `.reportlensrc.json` (or the `--config` override) with its `extends` chain applied.
///
/// Without an override the file is looked up from `work_dir` upward; no file
/// at all yields the default config.
pub fn load_config(work_dir: &Path, custom_path: Option<&Path>) -> Result<Config> {
    let located = match custom_path {
        Some(p) => {
            let explicit = work_dir.join(p);
            if !explicit.is_file() {
                anyhow::bail!("No config at {}", explicit.display());
            }
            Some(explicit)
        }
        None => find_config_in_parents(work_dir),
    };

    located.map_or_else(|| Ok(Config::default()), |path| read_layered(&path, &mut HashSet::new()))
}

fn read_layered(path: &Path, seen: &mut HashSet<PathBuf>) -> Result<Config> {
    let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !seen.insert(key) {
        anyhow::bail!("Config extends itself via {}", path.display());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Cannot read config {}", path.display()))?;
    let mut config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("Config {} is not valid JSON", path.display()))?;

    if let Some(parent) = config.extends.take() {
        let base_path = extends_target(path, &parent)?;
        config.merge_from(read_layered(&base_path, seen)?);
    }
    Ok(config)
}

/// `extends` is relative to the file naming it; a bare name gets `.json`
fn extends_target(from: &Path, reference: &str) -> Result<PathBuf> {
    let mut target = from.parent().unwrap_or(Path::new(".")).join(reference);
    if target.extension().is_none() {
        target.set_extension("json");
    }
    if !target.is_file() {
        anyhow::bail!(
            "{} extends {}, which does not exist",
            from.display(),
            target.display()
        );
    }
    Ok(target)
}

/// Search for .reportlensrc.json in directory and its parents
pub fn find_config_in_parents(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
}

/// Write a starter config into `dir`. Returns None if one already exists.
pub fn write_starter(dir: &Path, api_base_url: Option<&str>) -> Result<Option<PathBuf>> {
    let config_path = dir.join(CONFIG_FILENAME);
    if config_path.exists() {
        return Ok(None);
    }

    let mut json = serde_json::to_string_pretty(&Config::starter(api_base_url))
        .context("Failed to serialize starter config")?;
    json.push('\n');

    fs::write(&config_path, json)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
    Ok(Some(config_path))
}
