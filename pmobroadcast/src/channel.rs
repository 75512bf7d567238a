//! Broadcast channels.
//!
//! A channel replays a recorded manifest as if it were a live transmission.
//! The first listener to tune in pins a playback clock; everyone joining
//! later is sent to `now - clock` so that all listeners hear the same
//! position. A static channel expires once its manifest duration has
//! elapsed and falls back to idle, ready to start the same line-up again.
//!
//! All mutable state of a channel lives in one state struct behind an
//! async mutex. Starting, rotating and expiring a broadcast each happen
//! under a single acquisition of that mutex, so two listeners racing to
//! tune in always agree on the clock and a rotation never exposes a new
//! source paired with the previous clock.

use crate::color::ChannelColor;
use crate::error::{Error, Result};
use crate::manifest;
use crate::store::ManifestStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::AbortHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// How a channel's duration is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    /// Finite duration read from the manifest; the broadcast expires.
    Static,
    /// Indefinite stream; never expires.
    Livestream,
}

/// Boundary view of a channel. Never carries clock state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: Uuid,
    pub source: String,
    pub mode: ChannelMode,
    pub color: ChannelColor,
    pub color_opaque: String,
    pub color_transparent: String,
    pub ibeacon_minor: Option<u32>,
}

/// Result of tuning into a channel: the source being played and the
/// position a joining listener must seek to, read together.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    pub source: String,
    pub offset: f64,
    pub cycle: u64,
    /// `true` when this call started the broadcast.
    pub started: bool,
}

/// Identity of the broadcast cycle currently on air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastCycle {
    pub number: u64,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct PlaybackClock {
    origin: Instant,
    started_at: DateTime<Utc>,
    cycle: u64,
}

struct ChannelState {
    source: String,
    /// `Some` for static channels, `None` for livestreams.
    duration: Option<f64>,
    clock: Option<PlaybackClock>,
    next_cycle: u64,
    expiry: Option<AbortHandle>,
}

impl ChannelState {
    fn mode(&self) -> ChannelMode {
        if self.duration.is_some() {
            ChannelMode::Static
        } else {
            ChannelMode::Livestream
        }
    }

    fn offset_at(&self, now: Instant) -> Result<f64> {
        let clock = self.clock.as_ref().ok_or(Error::NotBroadcasting)?;
        Ok(now.saturating_duration_since(clock.origin).as_secs_f64())
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        let (Some(clock), Some(seconds)) = (self.clock.as_ref(), self.duration) else {
            return false;
        };
        now.saturating_duration_since(clock.origin) >= span(seconds)
    }

    /// Pins a new clock if none is set. Returns `true` when a clock was pinned.
    fn pin_clock(&mut self) -> bool {
        if self.clock.is_some() {
            return false;
        }

        self.clock = Some(PlaybackClock {
            origin: Instant::now(),
            started_at: Utc::now(),
            cycle: self.next_cycle,
        });
        self.next_cycle += 1;
        true
    }

    fn clear_clock(&mut self) {
        self.clock = None;
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

impl Drop for ChannelState {
    fn drop(&mut self) {
        if let Some(handle) = self.expiry.take() {
            handle.abort();
        }
    }
}

/// Exact span of a duration in seconds, saturating for absurd values.
fn span(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

struct ChannelInner {
    id: Uuid,
    color: ChannelColor,
    ibeacon_minor: Option<u32>,
    auto_expire: bool,
    store: Arc<dyn ManifestStore>,
    state: Mutex<ChannelState>,
}

/// Public handle to a broadcast channel. Cloning shares the channel.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.inner.id)
            .field("color", &self.inner.color)
            .finish()
    }
}

impl Channel {
    pub fn builder() -> ChannelBuilder {
        ChannelBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn color(&self) -> ChannelColor {
        self.inner.color
    }

    pub fn ibeacon_minor(&self) -> Option<u32> {
        self.inner.ibeacon_minor
    }

    pub async fn source(&self) -> String {
        self.inner.state.lock().await.source.clone()
    }

    pub async fn mode(&self) -> ChannelMode {
        self.inner.state.lock().await.mode()
    }

    /// Total playback duration in seconds.
    ///
    /// Fails with [`Error::LivestreamDuration`] on a livestream channel.
    pub async fn duration(&self) -> Result<f64> {
        self.inner
            .state
            .lock()
            .await
            .duration
            .ok_or(Error::LivestreamDuration)
    }

    pub async fn is_broadcasting(&self) -> bool {
        self.inner.state.lock().await.clock.is_some()
    }

    pub async fn current_cycle(&self) -> Option<BroadcastCycle> {
        self.inner
            .state
            .lock()
            .await
            .clock
            .map(|clock| BroadcastCycle {
                number: clock.cycle,
                started_at: clock.started_at,
            })
    }

    pub async fn summary(&self) -> ChannelSummary {
        let state = self.inner.state.lock().await;
        ChannelSummary {
            id: self.inner.id,
            source: state.source.clone(),
            mode: state.mode(),
            color: self.inner.color,
            color_opaque: self.inner.color.opaque().to_string(),
            color_transparent: self.inner.color.transparent().to_string(),
            ibeacon_minor: self.inner.ibeacon_minor,
        }
    }

    /// Reads the current source manifest, line by line.
    pub async fn manifest_lines(&self) -> Result<Vec<String>> {
        let source = self.source().await;
        self.read_lines(&source).await
    }

    /// Starts the broadcast unless one is already running.
    ///
    /// Returns `true` if this call pinned the playback clock. A running
    /// clock is never touched.
    pub async fn ensure_broadcasting(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        self.start_locked(&mut state)
    }

    /// Seconds elapsed since the broadcast started.
    pub async fn playback_offset(&self) -> Result<f64> {
        self.inner.state.lock().await.offset_at(Instant::now())
    }

    /// Whether the current broadcast has run for its whole duration.
    ///
    /// Livestreams never expire; an idle channel is not expired.
    pub async fn is_expired(&self) -> bool {
        self.inner.state.lock().await.is_expired_at(Instant::now())
    }

    /// Ends the current broadcast cycle, optionally switching to `new_source`.
    ///
    /// The new manifest is read before anything changes, so a failure
    /// leaves the channel exactly as it was.
    pub async fn reset(&self, new_source: Option<&str>) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let replacement = match new_source {
            Some(source) if source.is_empty() => return Err(Error::MissingSource),
            Some(source) if source == state.source => {
                return Err(Error::InvalidRotation {
                    requested: source.to_string(),
                })
            }
            Some(source) => {
                let duration = match state.mode() {
                    ChannelMode::Static => Some(self.load_duration(source).await?),
                    ChannelMode::Livestream => None,
                };
                Some((source.to_string(), duration))
            }
            None => None,
        };

        // source and duration are swapped before the clock is cleared
        if let Some((source, duration)) = replacement {
            info!(
                channel = %self.inner.id,
                from = %state.source,
                to = %source,
                "Rotating channel source"
            );
            state.source = source;
            state.duration = duration;
        }
        state.clear_clock();

        debug!(channel = %self.inner.id, source = %state.source, "Channel reset");
        Ok(())
    }

    /// Resets the channel if its current broadcast has run its course.
    ///
    /// The check and the reset happen under one lock acquisition, so a
    /// cycle started in the meantime is never cleared. Returns `true` if a
    /// clock was cleared.
    pub async fn reset_if_expired(&self) -> bool {
        let mut state = self.inner.state.lock().await;
        if !state.is_expired_at(Instant::now()) {
            return false;
        }

        let cycle = state.clock.map(|c| c.cycle);
        state.clear_clock();
        info!(
            channel = %self.inner.id,
            source = %state.source,
            cycle = ?cycle,
            "Expired broadcast reset"
        );
        true
    }

    /// Starts the broadcast if needed and returns the source and offset
    /// observed under the same lock.
    pub async fn tune_in(&self) -> Result<Tuning> {
        let mut state = self.inner.state.lock().await;
        let started = self.start_locked(&mut state);
        let offset = state.offset_at(Instant::now())?;
        let cycle = state.clock.map(|c| c.cycle).ok_or(Error::NotBroadcasting)?;

        Ok(Tuning {
            source: state.source.clone(),
            offset,
            cycle,
            started,
        })
    }

    /// Manifest for a joining listener, starting at the shared position.
    pub async fn synchronized_manifest(&self) -> Result<String> {
        let tuning = self.tune_in().await?;
        let lines = self.read_lines(&tuning.source).await?;
        Ok(manifest::synchronize(lines, tuning.offset))
    }

    /// Turns a livestream into a static channel.
    ///
    /// The duration is computed from the current manifest. A running
    /// broadcast keeps its clock and expires once that duration has
    /// elapsed. Does nothing on a channel that is already static.
    pub async fn terminate_livestream(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.mode() == ChannelMode::Static {
            return Ok(());
        }

        let source = state.source.clone();
        let duration = self.load_duration(&source).await?;
        state.duration = Some(duration);

        info!(
            channel = %self.inner.id,
            source = %source,
            duration,
            "Livestream terminated, channel is now static"
        );

        self.arm_expiry(&mut state);
        Ok(())
    }

    fn start_locked(&self, state: &mut ChannelState) -> bool {
        if !state.pin_clock() {
            return false;
        }

        if let Some(clock) = &state.clock {
            debug!(
                channel = %self.inner.id,
                source = %state.source,
                cycle = clock.cycle,
                started_at = %clock.started_at,
                "Broadcast started"
            );
        }
        self.arm_expiry(state);
        true
    }

    /// Schedules the end of the current cycle for static channels.
    fn arm_expiry(&self, state: &mut ChannelState) {
        if !self.inner.auto_expire {
            return;
        }
        let (Some(clock), Some(seconds)) = (state.clock, state.duration) else {
            return;
        };
        let Some(deadline) = clock.origin.checked_add(span(seconds)) else {
            return;
        };

        if let Some(previous) = state.expiry.take() {
            previous.abort();
        }

        let weak: Weak<ChannelInner> = Arc::downgrade(&self.inner);
        let cycle = clock.cycle;
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                Channel { inner }.expire(cycle).await;
            }
        });
        state.expiry = Some(task.abort_handle());

        debug!(channel = %self.inner.id, cycle, seconds, "Expiry scheduled");
    }

    /// Ends cycle `cycle` if it is still on air and has run its course.
    async fn expire(&self, cycle: u64) {
        let mut state = self.inner.state.lock().await;

        let current = state.clock.map(|c| c.cycle);
        if current != Some(cycle) || !state.is_expired_at(Instant::now()) {
            debug!(
                channel = %self.inner.id,
                cycle,
                current = ?current,
                "Ignoring stale expiry"
            );
            return;
        }

        // this task owns the handle; dropping it instead of aborting
        state.expiry = None;
        state.clock = None;
        info!(
            channel = %self.inner.id,
            source = %state.source,
            cycle,
            "Broadcast expired"
        );
    }

    async fn read_lines(&self, source: &str) -> Result<Vec<String>> {
        let text = self
            .inner
            .store
            .read_manifest(source)
            .await
            .map_err(|e| Error::manifest(source, e))?;
        Ok(manifest::split_lines(&text))
    }

    async fn load_duration(&self, source: &str) -> Result<f64> {
        let lines = self.read_lines(source).await?;
        manifest::parse_duration(&lines)
    }
}

/// Builder for [`Channel`].
///
/// Every field except the iBeacon minor is required; [`ChannelBuilder::build`]
/// reports the first missing or invalid one.
#[derive(Debug, Clone)]
pub struct ChannelBuilder {
    source: Option<String>,
    mode: Option<ChannelMode>,
    color: Option<String>,
    ibeacon_minor: Option<u32>,
    auto_expire: bool,
}

impl Default for ChannelBuilder {
    fn default() -> Self {
        Self {
            source: None,
            mode: None,
            color: None,
            ibeacon_minor: None,
            auto_expire: true,
        }
    }
}

impl ChannelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &crate::config::ChannelConfig) -> Self {
        Self {
            source: config.source.clone(),
            mode: config.mode,
            color: config.color.clone(),
            ibeacon_minor: config.ibeacon_minor,
            ..Self::default()
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn mode(mut self, mode: ChannelMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Color by name (`yellow`, `red`, `green` or `blue`), validated on build.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn color_tag(self, color: ChannelColor) -> Self {
        self.color(color.slug())
    }

    pub fn ibeacon_minor(mut self, minor: u32) -> Self {
        self.ibeacon_minor = Some(minor);
        self
    }

    /// Disables the scheduled end of static broadcasts.
    ///
    /// Expired channels then stay on air until reset, for instance by
    /// [`ChannelRegistry::reap_expired`](crate::ChannelRegistry::reap_expired).
    pub fn auto_expire(mut self, enabled: bool) -> Self {
        self.auto_expire = enabled;
        self
    }

    /// Validates the definition and, for static channels, reads the
    /// manifest to compute its duration.
    pub async fn build(self, store: Arc<dyn ManifestStore>) -> Result<Channel> {
        let source = self
            .source
            .filter(|s| !s.is_empty())
            .ok_or(Error::MissingSource)?;
        let mode = self.mode.ok_or(Error::MissingMode)?;
        let color: ChannelColor = self.color.ok_or(Error::MissingColor)?.parse()?;

        let duration = match mode {
            ChannelMode::Static => {
                let text = store
                    .read_manifest(&source)
                    .await
                    .map_err(|e| Error::manifest(&source, e))?;
                Some(manifest::parse_duration(text.lines())?)
            }
            ChannelMode::Livestream => None,
        };

        let id = Uuid::new_v4();
        info!(
            channel = %id,
            source = %source,
            mode = ?mode,
            color = %color,
            duration = ?duration,
            "Channel created"
        );

        Ok(Channel {
            inner: Arc::new(ChannelInner {
                id,
                color,
                ibeacon_minor: self.ibeacon_minor,
                auto_expire: self.auto_expire,
                store,
                state: Mutex::new(ChannelState {
                    source,
                    duration,
                    clock: None,
                    next_cycle: 1,
                    expiry: None,
                }),
            }),
        })
    }
}
