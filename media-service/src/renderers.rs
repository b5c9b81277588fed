//! Renderer resource with simulated playback
//!
//! Renderers form a fixed set created with the service. Updating a
//! renderer's `state` drives a small state machine: entering `play` starts
//! a playback ticker that advances `offset` once per tick, and any other
//! state stops it.
//!
//! # Example
//!
//! ```rust,ignore
//! let renderers = service.renderers();
//! let id = renderers.ids()[0].clone();
//!
//! let mut updates = renderers.subscribe(&id)?;
//! renderers.update(&id, RendererUpdate::state("play"))?;
//!
//! while let Some(element) = updates.recv().await {
//!     if element.changed("offset") {
//!         println!("position: {} ms", element.data.offset);
//!     }
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use element_store::{ChangeStream, Element, ElementStore, Page, Record, Subscription};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::ids::{element_uri, IdGenerator};
use crate::resource::{
    json_feed, lenient_string, to_json, ElementFeed, Resource, ResourceAction, ResourceUpdate,
};

/// Resource type name
pub const RENDERERS: &str = "Renderers";

/// Well-known playback states
///
/// Any other string is accepted as a state too; only `play` has
/// side effects.
pub mod states {
    pub const IDLE: &str = "idle";
    pub const PLAY: &str = "play";
    pub const PAUSE: &str = "pause";
    pub const STOP: &str = "stop";
}

// ============================================================================
// Payload
// ============================================================================

/// Shuffle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shuffle {
    #[default]
    Off,
    On,
}

impl FromStr for Shuffle {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(Shuffle::Off),
            "on" => Ok(Shuffle::On),
            other => Err(ServiceError::Validation(format!("invalid shuffle value: {}", other))),
        }
    }
}

impl fmt::Display for Shuffle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shuffle::Off => f.write_str("off"),
            Shuffle::On => f.write_str("on"),
        }
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    #[default]
    Off,
    One,
    All,
}

impl FromStr for Repeat {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(Repeat::Off),
            "one" => Ok(Repeat::One),
            "all" => Ok(Repeat::All),
            other => Err(ServiceError::Validation(format!("invalid repeat value: {}", other))),
        }
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repeat::Off => f.write_str("off"),
            Repeat::One => f.write_str("one"),
            Repeat::All => f.write_str("all"),
        }
    }
}

/// Renderer payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererObject {
    pub id: String,
    pub uri: String,
    pub name: String,
    /// Playback state; any string, see [`states`]
    pub state: String,
    pub shuffle: Shuffle,
    pub repeat: Repeat,
    /// Playback position in milliseconds
    pub offset: u64,
    /// Reference to the media being rendered
    pub media: String,
}

impl Record for RendererObject {
    const KIND: &'static str = "renderer";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Partial renderer update
///
/// Unknown fields are ignored. Values of the wrong type are dropped, as
/// are `shuffle`/`repeat` values outside their domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RendererUpdate {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub shuffle: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub repeat: Option<String>,
}

impl RendererUpdate {
    /// Update only the playback state
    pub fn state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Default::default()
        }
    }

    pub fn with_shuffle(mut self, shuffle: impl Into<String>) -> Self {
        self.shuffle = Some(shuffle.into());
        self
    }

    pub fn with_repeat(mut self, repeat: impl Into<String>) -> Self {
        self.repeat = Some(repeat.into());
        self
    }
}

// ============================================================================
// Playback
// ============================================================================

/// Per-renderer playback slot
///
/// Holds at most one live ticker. The generation counter is bumped on
/// every cancellation; a tick only takes effect if it still carries the
/// current generation, checked under this slot's lock.
#[derive(Debug, Default)]
struct Playback {
    generation: u64,
    ticker: Option<JoinHandle<()>>,
}

impl Playback {
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn is_playing(&self) -> bool {
        self.ticker.is_some()
    }
}

/// State captured by a running ticker
struct Ticker {
    renderer_id: String,
    store: Arc<ElementStore<RendererObject>>,
    playback: Arc<Mutex<Playback>>,
    period: Duration,
    step_ms: u64,
    generation: u64,
}

impl Ticker {
    async fn run(self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if !self.tick() {
                break;
            }
        }
    }

    /// Advance the offset once; returns false when the ticker should stop
    fn tick(&self) -> bool {
        let playback = self.playback.lock();
        if playback.generation != self.generation {
            return false;
        }

        let step = self.step_ms;
        let result = self.store.modify(&self.renderer_id, |current| {
            let mut data = current.data.clone();
            data.offset = data.offset.saturating_add(step);
            Some((data, vec!["offset".to_string()]))
        });

        match result {
            Ok(Some(element)) => {
                trace!(renderer = %self.renderer_id, offset = element.data.offset, "Playback tick");
                true
            }
            Ok(None) => true,
            Err(e) => {
                warn!(renderer = %self.renderer_id, "Stopping playback ticker: {}", e);
                false
            }
        }
    }
}

// ============================================================================
// Renderers
// ============================================================================

/// The renderer resource
pub struct Renderers {
    store: Arc<ElementStore<RendererObject>>,
    playback: HashMap<String, Arc<Mutex<Playback>>>,
    changes: ChangeStream<ResourceUpdate>,
    runtime: Handle,
    tick_interval: Duration,
    step_ms: u64,
    emit_empty_updates: bool,
}

impl Renderers {
    /// Create the resource with its seeded renderer
    ///
    /// `media` is the reference the seeded renderer starts with.
    pub fn new(
        config: &ServiceConfig,
        ids: &dyn IdGenerator,
        runtime: Handle,
        media: impl Into<String>,
    ) -> Result<Self> {
        let store = Arc::new(ElementStore::new());
        let mut playback = HashMap::new();

        let id = ids.next_id();
        let uri = element_uri(&config.service_name, RENDERERS, &id);
        let renderer = RendererObject {
            id: id.clone(),
            uri: uri.clone(),
            name: config.renderer_name.clone(),
            state: states::IDLE.to_string(),
            shuffle: Shuffle::Off,
            repeat: Repeat::Off,
            offset: 0,
            media: media.into(),
        };
        store.insert(Element::from_record(uri, renderer))?;
        playback.insert(id.clone(), Arc::new(Mutex::new(Playback::default())));
        debug!(renderer = %id, name = %config.renderer_name, "Seeded renderer");

        Ok(Self {
            store,
            playback,
            changes: ChangeStream::new(ResourceUpdate::new(ResourceAction::Init)),
            runtime,
            tick_interval: config.tick_interval,
            step_ms: config.tick_millis(),
            emit_empty_updates: config.emit_empty_updates,
        })
    }

    fn not_found(id: &str) -> ServiceError {
        ServiceError::NotFound {
            kind: RendererObject::KIND,
            id: id.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Element<RendererObject>> {
        self.store.get(id).ok_or_else(|| Self::not_found(id))
    }

    pub fn list(&self, page: Page) -> Vec<Element<RendererObject>> {
        self.store.list(page)
    }

    /// Renderer ids in creation order
    pub fn ids(&self) -> Vec<String> {
        self.store.ids()
    }

    /// Subscribe to a renderer's snapshots, starting with the latest one
    pub fn subscribe(&self, id: &str) -> Result<Subscription<Element<RendererObject>>> {
        self.store.subscribe(id).ok_or_else(|| Self::not_found(id))
    }

    /// Subscribe to resource-level changes
    pub fn subscribe_changes(&self) -> Subscription<ResourceUpdate> {
        self.changes.subscribe()
    }

    /// Whether a renderer currently has a live playback ticker
    pub fn is_playing(&self, id: &str) -> bool {
        self.playback
            .get(id)
            .map(|slot| slot.lock().is_playing())
            .unwrap_or(false)
    }

    /// Apply a partial update
    ///
    /// Fields are processed in the order `state`, `shuffle`, `repeat`, and
    /// each accepted one is appended to `propertiesChanged`. The resulting
    /// snapshot is published on the renderer's stream; the call itself only
    /// confirms acceptance.
    pub fn update(&self, id: &str, changes: RendererUpdate) -> Result<()> {
        let slot = self.playback.get(id).ok_or_else(|| Self::not_found(id))?;
        let mut playback = slot.lock();

        let mut data = self.get(id)?.data;
        let mut changed = Vec::new();

        if let Some(state) = changes.state {
            if state == states::PLAY {
                self.start_ticker(id, slot, &mut playback);
            } else {
                playback.cancel();
            }
            debug!(renderer = %id, state = %state, "Renderer state changed");
            data.state = state;
            changed.push("state".to_string());
        }

        if let Some(raw) = changes.shuffle {
            match raw.parse::<Shuffle>() {
                Ok(shuffle) => {
                    data.shuffle = shuffle;
                    changed.push("shuffle".to_string());
                }
                Err(e) => warn!(renderer = %id, "Ignoring shuffle update: {}", e),
            }
        }

        if let Some(raw) = changes.repeat {
            match raw.parse::<Repeat>() {
                Ok(repeat) => {
                    data.repeat = repeat;
                    changed.push("repeat".to_string());
                }
                Err(e) => warn!(renderer = %id, "Ignoring repeat update: {}", e),
            }
        }

        if changed.is_empty() && !self.emit_empty_updates {
            debug!(renderer = %id, "Update changed nothing, not publishing");
            return Ok(());
        }

        self.store.publish(id, data, changed)?;
        Ok(())
    }

    /// Replace the renderer's ticker with a fresh one
    ///
    /// Called with the slot locked, so the new ticker cannot fire before
    /// the state change that started it has been published.
    fn start_ticker(&self, id: &str, slot: &Arc<Mutex<Playback>>, playback: &mut Playback) {
        playback.cancel();

        let ticker = Ticker {
            renderer_id: id.to_string(),
            store: Arc::clone(&self.store),
            playback: Arc::clone(slot),
            period: self.tick_interval,
            step_ms: self.step_ms,
            generation: playback.generation,
        };
        playback.ticker = Some(self.runtime.spawn(ticker.run()));
        debug!(renderer = %id, period_ms = self.step_ms, "Started playback ticker");
    }

    /// Cancel every running ticker
    pub fn stop_all(&self) {
        for (id, slot) in &self.playback {
            let mut playback = slot.lock();
            if playback.is_playing() {
                playback.cancel();
                info!(renderer = %id, "Stopped playback ticker");
            }
        }
    }
}

impl Drop for Renderers {
    fn drop(&mut self) {
        self.stop_all();
    }
}

impl fmt::Debug for Renderers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderers")
            .field("store", &self.store)
            .field("tick_interval", &self.tick_interval)
            .finish()
    }
}

impl Resource for Renderers {
    fn name(&self) -> &'static str {
        RENDERERS
    }

    fn changes(&self) -> Subscription<ResourceUpdate> {
        self.subscribe_changes()
    }

    fn len(&self) -> usize {
        self.store.len()
    }

    fn get_element(&self, id: &str) -> Result<Value> {
        to_json(&self.get(id)?)
    }

    fn list_elements(&self, page: Page) -> Result<Vec<Value>> {
        self.list(page).iter().map(to_json).collect()
    }

    fn update_element(&self, id: &str, payload: Value) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Self::not_found(id));
        }
        let changes: RendererUpdate = serde_json::from_value(payload)?;
        self.update(id, changes)
    }

    fn subscribe_element(&self, id: &str) -> Result<Box<dyn ElementFeed>> {
        Ok(json_feed(self.subscribe(id)?))
    }
}
