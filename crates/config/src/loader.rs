// crates/config/src/loader.rs

use std::path::Path;

use pipa_core::{PipaError, PipaResult};
use tracing::info;

use crate::PipaConfig;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads YAML or JSON, decided by extension. Validation is a separate
    /// step so callers can report both problems distinctly.
    pub fn load_from_file(path: &Path) -> PipaResult<PipaConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipaError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let config = if ext.eq_ignore_ascii_case("json") {
            serde_json::from_str(&contents).map_err(|e| {
                PipaError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                PipaError::Config(format!("Failed to parse {}: {}", path.display(), e))
            })?
        };

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> PipaResult<PipaConfig> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                info!("No configuration file given, using defaults");
                Ok(PipaConfig::default())
            }
        }
    }
}
