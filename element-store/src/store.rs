//! Ordered element storage with per-element change streams
//!
//! This module provides the core storage primitives:
//! - `Page`: offset/limit window over an ordered sequence
//! - `ElementStore<T>`: insertion-ordered elements, each backed by its own
//!   replay-last [`ChangeStream`]

use std::ops::Range;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::element::Element;
use crate::error::{Result, StoreError};
use crate::record::Record;
use crate::stream::{ChangeStream, Subscription};

// ============================================================================
// Page - pagination window
// ============================================================================

/// Offset/limit window for listing elements
///
/// Both bounds are optional. A missing offset starts at the beginning, a
/// missing limit runs to the end. Out-of-range values are clamped rather
/// than rejected, so an offset past the end yields an empty window.
///
/// ```rust
/// use element_store::Page;
///
/// assert_eq!(Page::all().bounds(5), 0..5);
/// assert_eq!(Page::new(Some(1), Some(2)).bounds(5), 1..3);
/// assert_eq!(Page::new(Some(4), Some(10)).bounds(5), 4..5);
/// assert_eq!(Page::new(Some(9), None).bounds(5), 5..5);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl Page {
    /// The whole sequence
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    /// Build a page from signed request values, clamping negatives to zero
    pub fn from_signed(offset: Option<i64>, limit: Option<i64>) -> Self {
        let clamp = |v: i64| usize::try_from(v.max(0)).unwrap_or(usize::MAX);
        Self {
            offset: offset.map(clamp),
            limit: limit.map(clamp),
        }
    }

    /// Resolve this page against a sequence of `len` items
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let start = self.offset.unwrap_or(0).min(len);
        let remaining = len - start;
        let count = self.limit.unwrap_or(remaining).min(remaining);
        start..start + count
    }
}

// ============================================================================
// ElementStore<T>
// ============================================================================

struct Slot<T> {
    id: String,
    stream: ChangeStream<Element<T>>,
}

/// Insertion-ordered collection of independently observable elements
///
/// Lookups are linear scans by id; stores are expected to stay small.
/// Each element owns a [`ChangeStream`], so observers can follow a single
/// element and always start from its latest snapshot.
///
/// # Example
///
/// ```rust,ignore
/// let store = ElementStore::<Playlist>::new();
/// store.insert(Element::new("p-1", "/media/playlists/p-1", playlist))?;
///
/// let mut sub = store.subscribe("p-1").unwrap();
/// store.publish("p-1", renamed, vec!["title".into()])?;
///
/// // First the snapshot at subscription time, then the update
/// let initial = sub.try_recv();
/// let update = sub.try_recv();
/// ```
pub struct ElementStore<T: Record> {
    slots: RwLock<Vec<Arc<Slot<T>>>>,
}

impl<T: Record> ElementStore<T> {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    fn slot(&self, id: &str) -> Option<Arc<Slot<T>>> {
        self.slots.read().iter().find(|slot| slot.id == id).cloned()
    }

    /// Latest snapshot of an element
    pub fn get(&self, id: &str) -> Option<Element<T>> {
        self.slot(id).map(|slot| slot.stream.latest())
    }

    /// Whether an element with this id exists
    pub fn contains(&self, id: &str) -> bool {
        self.slots.read().iter().any(|slot| slot.id == id)
    }

    /// Latest snapshots of the elements inside `page`, in insertion order
    pub fn list(&self, page: Page) -> Vec<Element<T>> {
        let slots = self.slots.read();
        let range = page.bounds(slots.len());
        slots[range]
            .iter()
            .map(|slot| slot.stream.latest())
            .collect()
    }

    /// Append an element
    ///
    /// Fails with [`StoreError::DuplicateId`] if the id is already present.
    pub fn insert(&self, element: Element<T>) -> Result<()> {
        let mut slots = self.slots.write();
        if slots.iter().any(|slot| slot.id == element.id) {
            return Err(StoreError::DuplicateId(element.id));
        }

        debug!(kind = T::KIND, id = %element.id, "Inserting element");
        slots.push(Arc::new(Slot {
            id: element.id.clone(),
            stream: ChangeStream::new(element),
        }));
        Ok(())
    }

    /// Remove the element with this id, returning whether one was removed
    ///
    /// Subscribers of the removed element see their stream end once the
    /// last queued snapshot is consumed.
    pub fn remove(&self, id: &str) -> bool {
        let mut slots = self.slots.write();
        match slots.iter().position(|slot| slot.id == id) {
            Some(index) => {
                slots.remove(index);
                debug!(kind = T::KIND, id, "Removed element");
                true
            }
            None => false,
        }
    }

    /// Replace an element's payload and notify its subscribers
    ///
    /// Stamps `last_update`, sets `properties_changed` and returns the
    /// published snapshot.
    pub fn publish(&self, id: &str, data: T, properties_changed: Vec<String>) -> Result<Element<T>> {
        let slot = self
            .slot(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        trace!(kind = T::KIND, id, changed = ?properties_changed, "Publishing element update");
        Ok(slot
            .stream
            .publish_with(|current| current.updated(data, properties_changed)))
    }

    /// Derive an element's next payload from its latest snapshot and publish it
    ///
    /// `update` returns the new payload and the list of changed fields, or
    /// `None` to leave the element untouched. Runs under the element's
    /// stream lock, so concurrent modifications of the same element are
    /// applied one after another.
    pub fn modify<F>(&self, id: &str, update: F) -> Result<Option<Element<T>>>
    where
        F: FnOnce(&Element<T>) -> Option<(T, Vec<String>)>,
    {
        let slot = self
            .slot(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        Ok(slot.stream.publish_if(|current| {
            update(current).map(|(data, changed)| current.updated(data, changed))
        }))
    }

    /// Subscribe to an element's snapshots, starting with the latest one
    pub fn subscribe(&self, id: &str) -> Option<Subscription<Element<T>>> {
        self.slot(id).map(|slot| slot.stream.subscribe())
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element ids in insertion order
    pub fn ids(&self) -> Vec<String> {
        self.slots.read().iter().map(|slot| slot.id.clone()).collect()
    }
}

impl<T: Record> Default for ElementStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> std::fmt::Debug for ElementStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementStore")
            .field("kind", &T::KIND)
            .field("element_count", &self.len())
            .finish()
    }
}
