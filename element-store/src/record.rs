//! Record trait for payloads held in an ElementStore
//!
//! A record is the typed payload wrapped by an [`Element`](crate::Element).
//! The store only needs to know how to find a record by id; everything else
//! about the payload belongs to the resource that owns the store.
//!
//! # Example
//!
//! ```rust
//! use element_store::Record;
//!
//! #[derive(Clone, Debug)]
//! pub struct Playlist {
//!     pub id: String,
//!     pub title: String,
//! }
//!
//! impl Record for Playlist {
//!     const KIND: &'static str = "playlist";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//! ```

/// Payload stored in an element
///
/// Records must be:
/// - Clone: snapshots are handed to every subscriber
/// - Send + Sync: stores are shared with timer tasks
/// - 'static: streams outlive the call that created them
pub trait Record: Clone + Send + Sync + 'static {
    /// Human-readable kind, used in log fields
    const KIND: &'static str;

    /// Identifier of this record, unique within its store
    fn id(&self) -> &str;
}
