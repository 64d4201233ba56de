//! Saved connection profile.
//!
//! The profile remembers the connection fields of the last successful run so
//! they can prefill the next one. [`FileProfileStore`] keeps them under a
//! `Database` section of a YAML file; [`NoOpProfileStore`] is used when
//! persistence is turned off.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::config::{decode_component, encode_component};
use crate::error::{LoaderError, Result};

/// Name of the profile file section holding connection fields.
pub const PROFILE_SECTION: &str = "Database";

/// Connection fields remembered between runs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database_name: String,
}

impl fmt::Debug for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionProfile")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Storage for the connection profile.
pub trait ProfileStore: Send + Sync {
    /// Load the saved profile. A missing profile yields empty fields.
    fn load(&self) -> ConnectionProfile;

    /// Persist the profile.
    fn save(&self, profile: &ConnectionProfile) -> Result<()>;
}

/// Profile stored in a YAML file.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    path: PathBuf,
}

impl FileProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_document(&self) -> Result<Mapping> {
        if !self.path.exists() {
            return Ok(Mapping::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Mapping::new());
        }
        match serde_yaml::from_str::<Value>(&content)? {
            Value::Mapping(map) => Ok(map),
            Value::Null => Ok(Mapping::new()),
            _ => Err(LoaderError::Profile(format!(
                "{} is not a YAML mapping",
                self.path.display()
            ))),
        }
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self) -> ConnectionProfile {
        let document = match self.read_document() {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Ignoring unreadable profile {}: {}",
                    self.path.display(),
                    e
                );
                return ConnectionProfile::default();
            }
        };

        let Some(section) = document.get(PROFILE_SECTION) else {
            debug!("No saved profile in {}", self.path.display());
            return ConnectionProfile::default();
        };

        match serde_yaml::from_value::<ConnectionProfile>(section.clone()) {
            Ok(mut profile) => {
                profile.password = decode_component(&profile.password);
                debug!("Loaded connection profile from {}", self.path.display());
                profile
            }
            Err(e) => {
                warn!(
                    "Ignoring malformed profile section in {}: {}",
                    self.path.display(),
                    e
                );
                ConnectionProfile::default()
            }
        }
    }

    fn save(&self, profile: &ConnectionProfile) -> Result<()> {
        let mut document = self
            .read_document()
            .map_err(|e| LoaderError::Profile(e.to_string()))?;

        let stored = ConnectionProfile {
            password: encode_component(&profile.password),
            ..profile.clone()
        };
        let section =
            serde_yaml::to_value(&stored).map_err(|e| LoaderError::Profile(e.to_string()))?;
        document.insert(Value::String(PROFILE_SECTION.to_string()), section);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoaderError::Profile(format!("creating {}: {}", parent.display(), e))
            })?;
        }

        let yaml = serde_yaml::to_string(&Value::Mapping(document))
            .map_err(|e| LoaderError::Profile(e.to_string()))?;
        fs::write(&self.path, yaml).map_err(|e| {
            LoaderError::Profile(format!("writing {}: {}", self.path.display(), e))
        })?;

        debug!("Saved connection profile to {}", self.path.display());
        Ok(())
    }
}

/// Profile store that remembers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProfileStore;

impl ProfileStore for NoOpProfileStore {
    fn load(&self) -> ConnectionProfile {
        ConnectionProfile::default()
    }

    fn save(&self, _profile: &ConnectionProfile) -> Result<()> {
        Ok(())
    }
}
