//! Extension pour intégrer le moteur de diffusion dans pmoconfig
//!
//! ```rust,ignore
//! use pmoconfig::get_config;
//! use pmobroadcast::BroadcastConfigExt;
//!
//! let config = get_config();
//! let manifest_dir = config.get_broadcast_manifest_dir()?;
//! let store = config.broadcast_manifest_store()?;
//! ```

use crate::config::BroadcastConfig;
use crate::store::FsManifestStore;
use anyhow::Result;
use pmoconfig::Config;

/// Répertoire par défaut des manifestes (relatif au config_dir)
const DEFAULT_MANIFEST_DIR: &str = "hls-data";

/// Trait d'extension pour gérer la configuration de diffusion dans pmoconfig
pub trait BroadcastConfigExt {
    /// Absolute manifest directory, created if missing.
    ///
    /// Relative values are resolved against the configuration directory
    /// (default: `<config_dir>/hls-data`).
    fn get_broadcast_manifest_dir(&self) -> Result<String>;

    fn set_broadcast_manifest_dir(&self, directory: String) -> Result<()>;

    /// The typed `broadcast` section.
    fn get_broadcast_config(&self) -> Result<BroadcastConfig>;

    /// A filesystem store rooted at the manifest directory.
    fn broadcast_manifest_store(&self) -> Result<FsManifestStore> {
        Ok(FsManifestStore::new(self.get_broadcast_manifest_dir()?))
    }
}

impl BroadcastConfigExt for Config {
    fn get_broadcast_manifest_dir(&self) -> Result<String> {
        self.get_managed_dir(&["broadcast", "manifest_dir"], DEFAULT_MANIFEST_DIR)
    }

    fn set_broadcast_manifest_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(&["broadcast", "manifest_dir"], directory)
    }

    fn get_broadcast_config(&self) -> Result<BroadcastConfig> {
        Ok(BroadcastConfig::from_pmoconfig(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_manifest_dir_is_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_yaml_str(dir.path().to_string_lossy(), "{}").unwrap();

        let manifest_dir = config.get_broadcast_manifest_dir().unwrap();
        assert_eq!(Path::new(&manifest_dir), dir.path().join("hls-data"));

        let store = config.broadcast_manifest_store().unwrap();
        assert_eq!(store.root(), dir.path().join("hls-data"));
    }

    #[test]
    fn test_set_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_yaml_str(dir.path().to_string_lossy(), "{}").unwrap();

        config
            .set_broadcast_manifest_dir("recordings".to_string())
            .unwrap();
        let manifest_dir = config.get_broadcast_manifest_dir().unwrap();
        assert_eq!(Path::new(&manifest_dir), dir.path().join("recordings"));
        assert_eq!(
            config.get_broadcast_config().unwrap().manifest_dir,
            "recordings"
        );
    }
}
