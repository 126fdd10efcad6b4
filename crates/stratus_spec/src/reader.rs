//! Manifest file reading utilities.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{SpecError, SpecResult};
use crate::models::Manifest;

/// Reader for manifest files.
pub struct ManifestReader;

impl ManifestReader {
    /// Read a manifest from a file path, picking the format by extension.
    pub fn read(path: impl AsRef<Path>) -> SpecResult<Manifest> {
        let path = path.as_ref();
        debug!("Reading manifest from {:?}", path);

        if !path.exists() {
            return Err(SpecError::ManifestNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(SpecError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
