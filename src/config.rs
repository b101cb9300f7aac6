use crate::counter::CounterConfig;
use crate::signal::Dialect;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named threshold setup: dialect plus the counter configuration tuned for
/// one camera/exercise arrangement. The built-in profiles carry the
/// uncalibrated defaults; saved profiles override them per setup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub dialect: Dialect,
    pub counter: CounterConfig,
}

impl Profile {
    pub fn for_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            counter: dialect.default_config(),
        }
    }

    /// Built-in profiles available without any config directory.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "pushup" => Some(Self::for_dialect(Dialect::Angle)),
            "brightness" => Some(Self::for_dialect(Dialect::BrightnessDelta)),
            _ => None,
        }
    }
}

pub trait ProfileStore {
    fn load(&self, name: &str) -> Option<Profile>;
    fn save(&self, name: &str, profile: &Profile) -> std::io::Result<()>;
}

/// Stores each profile as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let dir = if let Some(pd) = ProjectDirs::from("", "", "repkit") {
            pd.config_dir().join("profiles")
        } else {
            PathBuf::from("repkit_profiles")
        };
        Self { dir }
    }

    pub fn with_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl Default for FileProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore for FileProfileStore {
    fn load(&self, name: &str) -> Option<Profile> {
        let bytes = fs::read(self.path_for(name)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&self, name: &str, profile: &Profile) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(profile).unwrap_or_default();
        fs::write(self.path_for(name), data)
    }
}
