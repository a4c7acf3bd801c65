use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for autoshorts

/// Get the main autoshorts config directory
pub fn autoshorts_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("autoshorts");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default root for per-job workspaces (user cache dir, else system temp dir)
pub fn default_workspace_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("autoshorts").join("jobs"))
        .unwrap_or_else(|| std::env::temp_dir().join("autoshorts"))
}
