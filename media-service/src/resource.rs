//! Resource abstraction shared by renderers and collections
//!
//! A resource owns one element store and one resource-level change stream.
//! The [`Resource`] trait is the seam the host dispatches through: it works
//! on JSON payloads so the host never needs to know the element types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use element_store::{Element, Page, Subscription};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Result, ServiceError};

// ============================================================================
// Resource-level change events
// ============================================================================

/// Structural change to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceAction {
    /// The resource was constructed
    Init,
    /// An element was created
    Add,
    /// An element was deleted
    Remove,
    /// An element changed in a way that affects the resource as a whole
    Update,
}

/// Event on a resource's change stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUpdate {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,
    pub action: ResourceAction,
}

impl ResourceUpdate {
    pub fn new(action: ResourceAction) -> Self {
        Self {
            last_update: Utc::now(),
            action,
        }
    }
}

// ============================================================================
// Element feeds
// ============================================================================

/// Type-erased stream of element snapshots, serialized for relay
#[async_trait]
pub trait ElementFeed: Send {
    /// Wait for the next snapshot; `None` once the element is gone
    async fn next(&mut self) -> Option<Value>;

    /// Take the next queued snapshot without waiting
    fn try_next(&mut self) -> Option<Value>;
}

struct JsonFeed<T> {
    inner: Subscription<Element<T>>,
}

#[async_trait]
impl<T> ElementFeed for JsonFeed<T>
where
    T: Serialize + Send + 'static,
{
    async fn next(&mut self) -> Option<Value> {
        loop {
            let element = self.inner.recv().await?;
            if let Some(value) = serialize_snapshot(&element) {
                return Some(value);
            }
        }
    }

    fn try_next(&mut self) -> Option<Value> {
        loop {
            let element = self.inner.try_recv()?;
            if let Some(value) = serialize_snapshot(&element) {
                return Some(value);
            }
        }
    }
}

fn serialize_snapshot<T: Serialize>(element: &Element<T>) -> Option<Value> {
    match serde_json::to_value(element) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(id = %element.id, "Dropping unserializable snapshot: {}", e);
            None
        }
    }
}

/// Erase an element subscription into a JSON feed
pub fn json_feed<T>(subscription: Subscription<Element<T>>) -> Box<dyn ElementFeed>
where
    T: Serialize + Send + 'static,
{
    Box::new(JsonFeed {
        inner: subscription,
    })
}

/// Serialize a response value
///
/// Failure here means a bug in a payload type, so it maps to an internal
/// error rather than a validation error.
pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| ServiceError::Internal(e.to_string()))
}

// ============================================================================
// Resource trait
// ============================================================================

/// A named set of elements of one kind, as seen by the host
pub trait Resource: Send + Sync {
    /// Resource type name, e.g. "Renderers"
    fn name(&self) -> &'static str;

    /// Whether individual elements can be subscribed to
    fn element_subscribable(&self) -> bool {
        true
    }

    /// Whether the resource-level change stream is offered to remote subscribers
    fn resource_subscribable(&self) -> bool {
        false
    }

    /// Subscribe to resource-level changes, starting with the latest event
    fn changes(&self) -> Subscription<ResourceUpdate>;

    /// Number of elements
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_element(&self, id: &str) -> Result<Value>;

    fn list_elements(&self, page: Page) -> Result<Vec<Value>>;

    fn create_element(&self, _payload: Value) -> Result<Value> {
        Err(ServiceError::NotSupported {
            resource: self.name(),
            operation: "create",
        })
    }

    fn delete_element(&self, _id: &str) -> Result<()> {
        Err(ServiceError::NotSupported {
            resource: self.name(),
            operation: "delete",
        })
    }

    fn update_element(&self, _id: &str, _payload: Value) -> Result<()> {
        Err(ServiceError::NotSupported {
            resource: self.name(),
            operation: "update",
        })
    }

    fn subscribe_element(&self, id: &str) -> Result<Box<dyn ElementFeed>>;
}

// ============================================================================
// Lenient payload fields
// ============================================================================

/// Accept any JSON value, keeping it only if it is a string
///
/// Partial updates drop fields of the wrong type instead of rejecting the
/// whole request.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            tracing::warn!("Ignoring non-string field value: {}", other);
            None
        }
        None => None,
    })
}

/// Accept any JSON value, keeping it only if it is an array of strings
pub(crate) fn lenient_string_list<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Some(other) => {
            tracing::warn!("Ignoring non-list field value: {}", other);
            None
        }
        None => None,
    })
}
