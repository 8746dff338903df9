//! Test utilities for twinchat-core
//!
//! Common helpers shared by the unit tests of this crate.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use tempfile::Builder;

use crate::model::{ModelConfig, ModelProvider};

/// Creates a temporary config file with the given content.
/// Uses tempfile::Builder to ensure unique directories for parallel tests.
///
/// # Panics
/// Panics if temp directory creation or file writing fails.
pub fn create_temp_config(content: &str) -> PathBuf {
    let temp_dir = Builder::new()
        .prefix("twinchat-test")
        .rand_bytes(8)
        .tempdir()
        .unwrap();
    let config_path = temp_dir.path().join("twinchat.yml");
    File::create(&config_path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    // Keep the temp directory alive by leaking it (this is just for tests)
    let _ = Box::leak(Box::new(temp_dir));
    config_path
}

/// Model configuration with no provider settings.
pub fn dummy_model_config(name: &str, provider: ModelProvider) -> ModelConfig {
    ModelConfig {
        name: name.to_string(),
        display_name: None,
        provider,
        settings: std::collections::HashMap::new(),
    }
}
