//! The media service: identity plus its resources
//!
//! Construction seeds one collection and one renderer pointing at it.
//! Resources are looked up by name, case-insensitively, which is how the
//! host routes requests.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info};

use crate::collections::Collections;
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::ids::{IdGenerator, UuidGenerator};
use crate::renderers::Renderers;
use crate::resource::Resource;
use crate::worker::TimerRuntime;

/// Builder for [`MediaService`]
#[derive(Default)]
pub struct MediaServiceBuilder {
    config: ServiceConfig,
    ids: Option<Arc<dyn IdGenerator>>,
    runtime: Option<Handle>,
}

impl MediaServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom id source instead of random UUIDs
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Run playback tickers on this runtime
    ///
    /// Without one, the current runtime is used if the builder runs inside
    /// one, otherwise a dedicated worker thread is started.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> Result<MediaService> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => TimerRuntime::shared(handle),
            None => TimerRuntime::current_or_spawn()?,
        };
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UuidGenerator) as Arc<dyn IdGenerator>);

        let id = match &self.config.service_id {
            Some(id) => id.clone(),
            None => ids.next_id(),
        };

        let collections = Arc::new(Collections::new(&self.config, Arc::clone(&ids))?);
        let media = collections
            .default_collection()
            .map(|collection| collection.uri)
            .ok_or_else(|| ServiceError::Internal("default collection missing".into()))?;

        let renderers = Arc::new(Renderers::new(
            &self.config,
            ids.as_ref(),
            runtime.handle().clone(),
            media,
        )?);

        let resources: Vec<Arc<dyn Resource>> = vec![
            Arc::clone(&renderers) as Arc<dyn Resource>,
            Arc::clone(&collections) as Arc<dyn Resource>,
        ];

        info!(
            service = %self.config.service_name,
            id = %id,
            dedicated_runtime = runtime.is_dedicated(),
            "Media service started"
        );

        Ok(MediaService {
            id,
            name: self.config.service_name,
            renderers,
            collections,
            resources,
            _runtime: runtime,
        })
    }
}

/// A media service instance
///
/// Dropping the service stops all playback; if it owns a dedicated timer
/// runtime, that runtime is shut down last.
pub struct MediaService {
    id: String,
    name: String,
    renderers: Arc<Renderers>,
    collections: Arc<Collections>,
    resources: Vec<Arc<dyn Resource>>,
    // Must stay the last field so tickers are cancelled before it drops
    _runtime: TimerRuntime,
}

impl MediaService {
    /// Build a service from configuration with default id generation
    pub fn new(config: ServiceConfig) -> Result<Self> {
        Self::builder().with_config(config).build()
    }

    pub fn builder() -> MediaServiceBuilder {
        MediaServiceBuilder::new()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn renderers(&self) -> &Renderers {
        &self.renderers
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    /// Registered resources, in registration order
    pub fn resources(&self) -> &[Arc<dyn Resource>] {
        &self.resources
    }

    pub fn resource_names(&self) -> Vec<&'static str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Find a resource by name, ignoring case
    pub fn resource_by_name(&self, name: &str) -> Result<&dyn Resource> {
        let found = self
            .resources
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
            .map(|r| r.as_ref());

        match found {
            Some(resource) => Ok(resource),
            None => {
                debug!(resource = name, "Unknown resource requested");
                Err(ServiceError::ResourceNotFound(name.to_string()))
            }
        }
    }

    /// Cancel all playback tickers
    pub fn shutdown(&self) {
        self.renderers.stop_all();
        info!(service = %self.name, "Media service stopped");
    }
}

impl std::fmt::Debug for MediaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaService")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("resources", &self.resource_names())
            .field("runtime", &self._runtime)
            .finish()
    }
}
