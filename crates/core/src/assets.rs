//! Locations of the twinchat config and data files, and the embedded default config.
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "twinchat";

static DEFAULT_DATA_DIR: Lazy<PathBuf> =
    Lazy::new(|| platform_dir(dirs::data_local_dir(), "~/.local/share"));

static DEFAULT_CONFIG_DIR: Lazy<PathBuf> =
    Lazy::new(|| platform_dir(dirs::config_dir(), "~/.config"));

fn platform_dir(base: Option<PathBuf>, fallback: &str) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(fallback)).join(APP_DIR)
}

/// `$<xdg_var>/twinchat` when the variable is set, `default` otherwise.
fn xdg_or(xdg_var: &str, default: &Path) -> PathBuf {
    std::env::var_os(xdg_var)
        .map(|home| PathBuf::from(home).join(APP_DIR))
        .unwrap_or_else(|| default.to_path_buf())
}

pub fn get_config_dir() -> PathBuf {
    xdg_or("XDG_CONFIG_HOME", &DEFAULT_CONFIG_DIR)
}

/// Directory for logs and REPL history; created on first use.
pub fn get_data_dir() -> std::io::Result<PathBuf> {
    let path = xdg_or("XDG_DATA_HOME", &DEFAULT_DATA_DIR);
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

pub fn get_default_config() -> &'static str {
    include_str!("../data/twinchat.yml")
}
