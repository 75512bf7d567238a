//! Configuration structures for the broadcast engine.
//!
//! The `broadcast` section of the YAML configuration declares where recorded
//! manifests live and which channels to create at startup. Channel entries
//! keep every field optional so that a half-written entry reaches channel
//! construction and is rejected there with a precise error.

use crate::channel::ChannelMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Top-level configuration block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "BroadcastConfig::default_manifest_dir")]
    pub manifest_dir: String,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl BroadcastConfig {
    fn default_manifest_dir() -> String {
        "hls-data".to_string()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads the `broadcast` section of a pmoconfig configuration.
    ///
    /// A missing section yields the defaults; a malformed one is an error.
    #[cfg(feature = "pmoconfig")]
    pub fn from_pmoconfig(cfg: &pmoconfig::Config) -> Result<Self> {
        match cfg.get_value(&["broadcast"]) {
            Ok(value) => serde_yaml::from_value(value).map_err(|e| Error::Config(e.to_string())),
            Err(_) => Ok(Self::default()),
        }
    }

    #[cfg(feature = "pmoconfig")]
    pub fn load_from_pmoconfig() -> Result<Self> {
        Self::from_pmoconfig(&pmoconfig::get_config())
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            manifest_dir: Self::default_manifest_dir(),
            channels: Vec::new(),
        }
    }
}

/// One channel declared in configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub mode: Option<ChannelMode>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub ibeacon_minor: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BroadcastConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.manifest_dir, "hls-data");
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_channels_section() {
        let yaml = r#"
manifest_dir: /srv/hls
channels:
  - source: groovy-set.m3u8
    mode: static
    color: green
    ibeacon_minor: 3
  - source: live.m3u8
    mode: livestream
    color: red
  - color: blue
"#;
        let config = BroadcastConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.manifest_dir, "/srv/hls");
        assert_eq!(config.channels.len(), 3);

        let first = &config.channels[0];
        assert_eq!(first.source.as_deref(), Some("groovy-set.m3u8"));
        assert_eq!(first.mode, Some(ChannelMode::Static));
        assert_eq!(first.ibeacon_minor, Some(3));

        assert_eq!(config.channels[1].mode, Some(ChannelMode::Livestream));
        assert!(config.channels[2].source.is_none());
    }

    #[test]
    fn test_unknown_mode_is_a_config_error() {
        let err = BroadcastConfig::from_yaml_str("channels:\n  - mode: rerun\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[cfg(feature = "pmoconfig")]
    #[test]
    fn test_from_pmoconfig() {
        let cfg = pmoconfig::Config::from_yaml_str(
            "/tmp",
            "broadcast:\n  channels:\n    - source: a.m3u8\n      mode: static\n      color: yellow\n",
        )
        .unwrap();
        let config = BroadcastConfig::from_pmoconfig(&cfg).unwrap();
        assert_eq!(config.manifest_dir, "hls-data");
        assert_eq!(config.channels.len(), 1);
    }
}
