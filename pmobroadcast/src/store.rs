//! Manifest storage.
//!
//! Channels never own their media: they read manifests through a
//! [`ManifestStore`], which keeps the engine testable and lets the host
//! application decide where recorded HLS data lives.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::sync::RwLock;

/// Read access to recorded manifests, keyed by source name.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn read_manifest(&self, source: &str) -> io::Result<String>;
}

/// Manifests stored as files below a root directory.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    root: PathBuf,
}

impl FsManifestStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `source` below the root, refusing anything that escapes it.
    pub fn resolve(&self, source: &str) -> io::Result<PathBuf> {
        let relative = Path::new(source);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if source.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("source '{source}' is not a relative manifest path"),
            ));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ManifestStore for FsManifestStore {
    async fn read_manifest(&self, source: &str) -> io::Result<String> {
        let path = self.resolve(source)?;
        tokio::fs::read_to_string(path).await
    }
}

/// In-memory manifests.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    manifests: RwLock<HashMap<String, String>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, source: impl Into<String>, manifest: impl Into<String>) {
        self.manifests
            .write()
            .await
            .insert(source.into(), manifest.into());
    }

    pub async fn remove(&self, source: &str) -> Option<String> {
        self.manifests.write().await.remove(source)
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn read_manifest(&self, source: &str) -> io::Result<String> {
        self.manifests
            .read()
            .await
            .get(source)
            .cloned()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no manifest named '{source}'"),
                )
            })
    }
}
