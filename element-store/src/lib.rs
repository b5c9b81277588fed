//! Element Store
//!
//! An ordered, in-memory collection of records where every record is
//! independently observable.
//!
//! # Features
//!
//! - **Ordered Storage**: Elements keep their insertion order; removal
//!   preserves the relative order of the rest
//! - **Pagination**: Clamped offset/limit windows via [`Page`]
//! - **Replay-last Streams**: Subscribers receive the latest snapshot
//!   first, then every later update in emission order
//! - **Fire-and-forget Delivery**: Publishers never wait on subscribers
//!
//! # Quick Start
//!
//! ```rust
//! use element_store::{Element, ElementStore, Page, Record};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Playlist {
//!     id: String,
//!     title: String,
//! }
//!
//! impl Record for Playlist {
//!     const KIND: &'static str = "playlist";
//!
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! let store = ElementStore::<Playlist>::new();
//! let playlist = Playlist { id: "p-1".into(), title: "Road trip".into() };
//! store.insert(Element::from_record("/media/playlists/p-1", playlist)).unwrap();
//!
//! // Observe a single element
//! let mut sub = store.subscribe("p-1").unwrap();
//!
//! let renamed = Playlist { id: "p-1".into(), title: "Commute".into() };
//! store.publish("p-1", renamed, vec!["title".into()]).unwrap();
//!
//! assert_eq!(sub.try_recv().unwrap().data.title, "Road trip");
//! assert_eq!(sub.try_recv().unwrap().properties_changed, vec!["title"]);
//! assert_eq!(store.list(Page::all()).len(), 1);
//! ```
//!
//! # Architecture
//!
//! ```text
//! ElementStore<T>
//!     │
//!     └── slots: RwLock<Vec<Arc<Slot>>>        (insertion order)
//!             │
//!             └── Slot { id, ChangeStream<Element<T>> }
//!                     │
//!                     ├── current: Element<T>  (replayed to new subscribers)
//!                     └── subscribers: Vec<mpsc::UnboundedSender>
//!                             │
//!                             └── Subscription<Element<T>>
//! ```

// Modules
pub mod element;
pub mod error;
pub mod record;
pub mod store;
pub mod stream;

// Re-exports - Public API
pub use element::Element;
pub use error::{Result, StoreError};
pub use record::Record;
pub use store::{ElementStore, Page};
pub use stream::{ChangeStream, MappedSubscription, Subscription, TryIter};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::element::Element;
    pub use crate::record::Record;
    pub use crate::store::{ElementStore, Page};
    pub use crate::stream::{ChangeStream, Subscription};
}
