//! Replay-last change streams
//!
//! A `ChangeStream` holds the latest value of something observable together
//! with the channels of everyone subscribed to it. New subscribers receive
//! the latest value first, then every later publication in order.
//!
//! Delivery is fire-and-forget: each subscriber owns an unbounded queue, so a
//! slow or absent consumer never blocks the publisher. Subscribers that have
//! been dropped are pruned on the next publication.
//!
//! # Example
//!
//! ```rust
//! use element_store::ChangeStream;
//!
//! let stream = ChangeStream::new(1u32);
//! stream.publish(2);
//!
//! // Late subscribers still see the current value
//! let mut sub = stream.subscribe();
//! assert_eq!(sub.try_recv(), Some(2));
//!
//! stream.publish(3);
//! assert_eq!(sub.try_recv(), Some(3));
//! assert_eq!(sub.try_recv(), None);
//! ```

use parking_lot::Mutex;
use tokio::sync::mpsc;

struct StreamState<T> {
    current: T,
    subscribers: Vec<mpsc::UnboundedSender<T>>,
}

/// Ordered, replay-last notification channel
pub struct ChangeStream<T> {
    state: Mutex<StreamState<T>>,
}

impl<T: Clone> ChangeStream<T> {
    /// Create a stream whose current value is `initial`
    pub fn new(initial: T) -> Self {
        Self {
            state: Mutex::new(StreamState {
                current: initial,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Current value of the stream
    pub fn latest(&self) -> T {
        self.state.lock().current.clone()
    }

    /// Replace the current value and deliver it to every subscriber
    ///
    /// Returns the number of subscribers the value was delivered to.
    pub fn publish(&self, value: T) -> usize {
        let mut state = self.state.lock();
        Self::deliver(&mut state, value);
        state.subscribers.len()
    }

    /// Derive the next value from the current one and publish it
    ///
    /// The read and the publication happen under the same lock, so two
    /// concurrent calls never derive from the same snapshot.
    pub fn publish_with<F>(&self, next: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut state = self.state.lock();
        let value = next(&state.current);
        Self::deliver(&mut state, value.clone());
        value
    }

    /// Like [`publish_with`](Self::publish_with), but `next` may decline
    /// to publish by returning `None`
    pub fn publish_if<F>(&self, next: F) -> Option<T>
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut state = self.state.lock();
        let value = next(&state.current)?;
        Self::deliver(&mut state, value.clone());
        Some(value)
    }

    fn deliver(state: &mut StreamState<T>, value: T) {
        state
            .subscribers
            .retain(|tx| tx.send(value.clone()).is_ok());
        state.current = value;
    }

    /// Subscribe to this stream
    ///
    /// The returned subscription yields the current value immediately,
    /// followed by every later publication in emission order.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();
        // The receiver is alive, so this cannot fail
        let _ = tx.send(state.current.clone());
        state.subscribers.push(tx);
        Subscription { rx }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for ChangeStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ChangeStream")
            .field("current", &state.current)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// Receiving side of a [`ChangeStream`]
///
/// Supports async, blocking and non-blocking consumption:
///
/// ```rust,ignore
/// // Async
/// while let Some(value) = sub.recv().await { /* ... */ }
///
/// // Drain whatever is queued right now
/// for value in sub.try_iter() { /* ... */ }
///
/// // Blocking (outside of an async runtime only)
/// for value in sub { /* ... */ }
/// ```
///
/// All methods return `None` once the stream has been dropped and the
/// queue is drained.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wait for the next value
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next value if one is queued
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Block the current thread until the next value arrives
    ///
    /// Must not be called from within an async execution context.
    pub fn blocking_recv(&mut self) -> Option<T> {
        self.rx.blocking_recv()
    }

    /// Non-blocking iterator over the values queued right now
    pub fn try_iter(&mut self) -> TryIter<'_, T> {
        TryIter { inner: self }
    }

    /// Transform every received value
    pub fn map<U, F>(self, f: F) -> MappedSubscription<T, F>
    where
        F: FnMut(T) -> U,
    {
        MappedSubscription { inner: self, f }
    }
}

impl<T> Iterator for Subscription<T> {
    type Item = T;

    /// Block until the next value
    fn next(&mut self) -> Option<Self::Item> {
        self.blocking_recv()
    }
}

/// Non-blocking iterator over queued values
pub struct TryIter<'a, T> {
    inner: &'a mut Subscription<T>,
}

impl<'a, T> Iterator for TryIter<'a, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Subscription whose values pass through a mapping function
pub struct MappedSubscription<T, F> {
    inner: Subscription<T>,
    f: F,
}

impl<T, U, F> MappedSubscription<T, F>
where
    F: FnMut(T) -> U,
{
    /// Wait for the next mapped value
    pub async fn recv(&mut self) -> Option<U> {
        let value = self.inner.recv().await?;
        Some((self.f)(value))
    }

    /// Take the next mapped value if one is queued
    pub fn try_recv(&mut self) -> Option<U> {
        let value = self.inner.try_recv()?;
        Some((self.f)(value))
    }
}
