//! # pmobroadcast - Synchronized HLS broadcast channels
//!
//! `pmobroadcast` replays recorded HLS manifests as if they were live
//! transmissions. Every listener who tunes into a channel at a given moment
//! is sent to the same position in the recording, so a static file behaves
//! like a shared radio or TV signal.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmobroadcast::{Channel, ChannelMode, ChannelRegistry, FsManifestStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ChannelRegistry::new(Arc::new(FsManifestStore::new("hls-data")));
//!
//!     let channel = registry
//!         .create_channel(
//!             Channel::builder()
//!                 .source("groovy-set.m3u8")
//!                 .mode(ChannelMode::Static)
//!                 .color("green"),
//!         )
//!         .await?;
//!
//!     // What a joining player should load
//!     let manifest = channel.synchronized_manifest().await?;
//!     println!("{manifest}");
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Broadcast cycle
//!
//! - A channel starts idle. The first [`Channel::ensure_broadcasting`] (or
//!   [`Channel::tune_in`]) pins the playback clock; later calls reuse it.
//! - [`Channel::playback_offset`] is the time elapsed since that clock.
//! - A static channel expires when the offset reaches the manifest
//!   duration. It is then reset to idle and the next listener starts the
//!   same line-up from the top.
//! - [`Channel::reset`] rotates a channel to another recording. The channel
//!   keeps its id and color.
//!
//! ## Architecture
//!
//! - [`manifest`]: `#EXTINF:` duration parsing and `#EXT-X-START` injection
//! - [`channel`]: the per-channel synchronization state machine
//! - [`store`]: where manifests are read from
//! - [`registry`]: the set of channels exposed to the HTTP layer
//! - [`config`]: the `broadcast` configuration section
//! - [`error`]: error types and result aliases

pub mod channel;
pub mod color;
pub mod config;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod store;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

pub use channel::{BroadcastCycle, Channel, ChannelBuilder, ChannelMode, ChannelSummary, Tuning};
pub use color::ChannelColor;
pub use config::{BroadcastConfig, ChannelConfig};
pub use error::{Error, Result};
pub use registry::ChannelRegistry;
pub use store::{FsManifestStore, ManifestStore, MemoryManifestStore};

#[cfg(feature = "pmoconfig")]
pub use config_ext::BroadcastConfigExt;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
