//! Persisted airline and aircraft selection.
//!
//! A missing file is not an error; it simply means nothing was selected yet.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Last airline and aircraft the pilot selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Selected airline.
    pub airline_id: Option<u32>,
    /// Selected aircraft.
    pub aircraft_id: Option<u32>,
}

impl Preferences {
    /// Read preferences, returning defaults if the file doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No preferences file");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Rewrite the preferences file, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file can't be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        fs::write(path, json)?;
        debug!(path = %path.display(), "Preferences saved");
        Ok(())
    }
}
