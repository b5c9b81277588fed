//! Identifier generation and element addressing

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Source of element and service identifiers
///
/// Implementations must return a different id on every call for the
/// lifetime of the process.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random (v4) UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic ids of the form `<prefix>-<n>`
///
/// Useful for reproducible demos and tests.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

/// Address of an element: `/<service>/<resource>/<id>`
///
/// Service and resource names are lowercased; the id is kept verbatim.
pub fn element_uri(service: &str, resource: &str, id: &str) -> String {
    format!(
        "/{}/{}/{}",
        service.to_lowercase(),
        resource.to_lowercase(),
        id
    )
}
