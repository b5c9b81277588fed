//! Collection resource
//!
//! Collections are named lists of item references. Unlike renderers they
//! can be created and deleted at runtime, and every structural change is
//! announced on the resource-level change stream.

use std::fmt;
use std::sync::Arc;

use element_store::{ChangeStream, Element, ElementStore, Page, Record, Subscription};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::ids::{element_uri, IdGenerator};
use crate::resource::{
    json_feed, lenient_string, lenient_string_list, to_json, ElementFeed, Resource,
    ResourceAction, ResourceUpdate,
};

/// Resource type name
pub const COLLECTIONS: &str = "Collections";

/// Collection payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionObject {
    pub id: String,
    pub uri: String,
    pub name: String,
    /// Item references, in order
    pub items: Vec<String>,
}

impl Record for CollectionObject {
    const KIND: &'static str = "collection";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Payload for creating a collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionCreate {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

impl CollectionCreate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Partial collection update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionUpdate {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list", skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

impl CollectionUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: Some(items.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }
}

/// The collection resource
pub struct Collections {
    service_name: String,
    store: ElementStore<CollectionObject>,
    changes: ChangeStream<ResourceUpdate>,
    ids: Arc<dyn IdGenerator>,
    default_id: String,
    emit_empty_updates: bool,
}

impl Collections {
    /// Create the resource with its seeded default collection
    pub fn new(config: &ServiceConfig, ids: Arc<dyn IdGenerator>) -> Result<Self> {
        let store = ElementStore::new();
        let default_id = ids.next_id();
        let uri = element_uri(&config.service_name, COLLECTIONS, &default_id);
        let collection = CollectionObject {
            id: default_id.clone(),
            uri: uri.clone(),
            name: config.default_collection_name.clone(),
            items: Vec::new(),
        };
        store.insert(Element::from_record(uri, collection))?;
        debug!(collection = %default_id, "Seeded default collection");

        Ok(Self {
            service_name: config.service_name.clone(),
            store,
            changes: ChangeStream::new(ResourceUpdate::new(ResourceAction::Init)),
            ids,
            default_id,
            emit_empty_updates: config.emit_empty_updates,
        })
    }

    fn not_found(id: &str) -> ServiceError {
        ServiceError::NotFound {
            kind: CollectionObject::KIND,
            id: id.to_string(),
        }
    }

    pub fn get(&self, id: &str) -> Result<Element<CollectionObject>> {
        self.store.get(id).ok_or_else(|| Self::not_found(id))
    }

    pub fn list(&self, page: Page) -> Vec<Element<CollectionObject>> {
        self.store.list(page)
    }

    /// The collection seeded at startup
    ///
    /// Returns `None` once it has been deleted.
    pub fn default_collection(&self) -> Option<Element<CollectionObject>> {
        self.store.get(&self.default_id)
    }

    /// Create an empty collection
    ///
    /// Requires a non-empty name. Nothing is stored or announced when
    /// validation fails.
    pub fn create(&self, request: CollectionCreate) -> Result<Element<CollectionObject>> {
        let name = match request.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ServiceError::Validation("collection name is required".into())),
        };

        let id = self.ids.next_id();
        let uri = element_uri(&self.service_name, COLLECTIONS, &id);
        let element = Element::from_record(
            uri.clone(),
            CollectionObject {
                id: id.clone(),
                uri,
                name,
                items: Vec::new(),
            },
        );
        self.store.insert(element.clone())?;
        self.changes.publish(ResourceUpdate::new(ResourceAction::Add));

        info!(collection = %id, name = %element.data.name, "Created collection");
        Ok(element)
    }

    /// Delete a collection and announce its removal
    ///
    /// Subscribers to the deleted element see their stream end.
    pub fn delete(&self, id: &str) -> Result<()> {
        if !self.store.remove(id) {
            return Err(Self::not_found(id));
        }
        self.changes.publish(ResourceUpdate::new(ResourceAction::Remove));

        info!(collection = %id, "Deleted collection");
        Ok(())
    }

    /// Rename a collection or replace its items
    ///
    /// An empty name is ignored, as is a non-list `items` value.
    pub fn update(&self, id: &str, changes: CollectionUpdate) -> Result<()> {
        let emit_empty = self.emit_empty_updates;
        let published = self.store.modify(id, |current| {
            let mut data = current.data.clone();
            let mut changed = Vec::new();

            if let Some(name) = changes.name.filter(|name| !name.is_empty()) {
                data.name = name;
                changed.push("name".to_string());
            }
            if let Some(items) = changes.items {
                data.items = items;
                changed.push("items".to_string());
            }

            if changed.is_empty() && !emit_empty {
                return None;
            }
            Some((data, changed))
        });

        match published.map_err(|_| Self::not_found(id))? {
            Some(element) => {
                debug!(collection = %id, changed = ?element.properties_changed, "Updated collection")
            }
            None => debug!(collection = %id, "Update changed nothing, not publishing"),
        }
        Ok(())
    }

    pub fn subscribe(&self, id: &str) -> Result<Subscription<Element<CollectionObject>>> {
        self.store.subscribe(id).ok_or_else(|| Self::not_found(id))
    }

    pub fn subscribe_changes(&self) -> Subscription<ResourceUpdate> {
        self.changes.subscribe()
    }

    pub fn ids(&self) -> Vec<String> {
        self.store.ids()
    }
}

impl fmt::Debug for Collections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collections")
            .field("store", &self.store)
            .field("default_id", &self.default_id)
            .finish()
    }
}

impl Resource for Collections {
    fn name(&self) -> &'static str {
        COLLECTIONS
    }

    fn resource_subscribable(&self) -> bool {
        true
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

    fn create_element(&self, payload: Value) -> Result<Value> {
        let request: CollectionCreate = serde_json::from_value(payload)?;
        to_json(&self.create(request)?)
    }

    fn delete_element(&self, id: &str) -> Result<()> {
        self.delete(id)
    }

    fn update_element(&self, id: &str, payload: Value) -> Result<()> {
        if !self.store.contains(id) {
            return Err(Self::not_found(id));
        }
        let changes: CollectionUpdate = serde_json::from_value(payload)?;
        self.update(id, changes)
    }

    fn subscribe_element(&self, id: &str) -> Result<Box<dyn ElementFeed>> {
        Ok(json_feed(self.subscribe(id)?))
    }
}
