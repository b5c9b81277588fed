//! Elements: typed payloads plus change metadata
//!
//! Every snapshot published on an element stream is a full `Element`, so a
//! subscriber never has to merge partial state. `properties_changed` tells
//! it which payload fields the most recent update touched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// One addressable record within a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element<T> {
    /// Identifier, immutable after creation
    pub id: String,

    /// Derived address, fixed at creation
    pub uri: String,

    /// When this snapshot was produced
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_update: DateTime<Utc>,

    /// Payload fields mutated by the update that produced this snapshot
    pub properties_changed: Vec<String>,

    /// The payload itself
    pub data: T,
}

impl<T> Element<T> {
    /// Create a freshly initialized element with no changed properties
    pub fn new(id: impl Into<String>, uri: impl Into<String>, data: T) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            last_update: Utc::now(),
            properties_changed: Vec::new(),
            data,
        }
    }

    /// Derive the next snapshot of this element
    ///
    /// Identity (`id`, `uri`) carries over unchanged; the timestamp is
    /// restamped and `properties_changed` replaced.
    pub fn updated(&self, data: T, properties_changed: Vec<String>) -> Self {
        Self {
            id: self.id.clone(),
            uri: self.uri.clone(),
            last_update: Utc::now(),
            properties_changed,
            data,
        }
    }

    /// Whether the update that produced this snapshot touched `field`
    pub fn changed(&self, field: &str) -> bool {
        self.properties_changed.iter().any(|f| f == field)
    }
}

impl<T: Record> Element<T> {
    /// Create an element whose id is taken from the record itself
    pub fn from_record(uri: impl Into<String>, data: T) -> Self {
        Self::new(data.id().to_string(), uri, data)
    }
}
