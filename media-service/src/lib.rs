//! # Media Service
//!
//! An in-process resource registry for a media service. Two resources are
//! exposed to a hosting framework:
//!
//! - **Renderers**: a fixed set of playback targets with simulated playback
//! - **Collections**: named lists of items that can be created and deleted
//!
//! Every element is independently observable, and each resource announces
//! structural changes on its own stream.
//!
//! ```rust,no_run
//! use media_service::{MediaService, RendererUpdate, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), media_service::ServiceError> {
//!     let service = MediaService::new(ServiceConfig::default())?;
//!
//!     let renderers = service.renderers();
//!     let id = renderers.ids().remove(0);
//!     let mut updates = renderers.subscribe(&id)?;
//!
//!     renderers.update(&id, RendererUpdate::state("play"))?;
//!
//!     while let Some(element) = updates.recv().await {
//!         println!("{} @ {} ms", element.data.state, element.data.offset);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Host boundary
//!
//! Hosts that relay requests from elsewhere go through [`MediaService::handle`]
//! with a [`Request`] and get back a [`Response`]. Element and resource
//! streams are reached through the [`Resource`] trait, which works on JSON
//! values so the host never depends on payload types.
//!
//! ## Architecture
//!
//! ```text
//! host
//!   ↓  Request / Response
//! MediaService (registry, resource lookup by name)
//!   ├── Renderers ──── ElementStore<RendererObject> ── playback tickers
//!   └── Collections ── ElementStore<CollectionObject>
//!   ↓
//! element_store (ordered storage, replay-last change streams)
//! ```

pub mod collections;
pub mod config;
pub mod error;
pub mod host;
pub mod ids;
pub mod logging;
pub mod renderers;
pub mod resource;
pub mod service;
mod worker;

pub use collections::{CollectionCreate, CollectionObject, CollectionUpdate, Collections};
pub use config::ServiceConfig;
pub use error::{ErrorCode, Result, ServiceError};
pub use host::{Request, Response, Status};
pub use ids::{element_uri, IdGenerator, SequentialIds, UuidGenerator};
pub use renderers::{Repeat, RendererObject, RendererUpdate, Renderers, Shuffle};
pub use resource::{ElementFeed, Resource, ResourceAction, ResourceUpdate};
pub use service::{MediaService, MediaServiceBuilder};

// Re-export the storage types that appear in this crate's API
pub use element_store::{Element, Page, Subscription};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        CollectionCreate, CollectionUpdate, Element, MediaService, Page, RendererUpdate, Request,
        Resource, Response, ServiceConfig, ServiceError,
    };
}
