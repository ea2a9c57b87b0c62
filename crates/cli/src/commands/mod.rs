//! CLI command implementations.

pub mod pricing;
pub mod shop;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use solemate_storefront::{BackendError, CommerceError, ConfigError};
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input file is not valid JSON for the expected shape.
    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Backend client could not be built or a payload was invalid.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Controller operation failed.
    #[error(transparent)]
    Commerce(#[from] CommerceError),

    /// Output could not be serialized.
    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Print a value as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
pub fn emit<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
