//! Runtime for playback timers
//!
//! The service API is synchronous. Playback tickers still need an async
//! timer, so they are spawned onto a tokio runtime: the caller's, when one
//! is available, or else a dedicated background thread that owns a
//! single-threaded runtime for the lifetime of the service.

use std::thread::{self, JoinHandle};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

/// Where playback tickers run
pub enum TimerRuntime {
    /// A runtime owned by the caller
    Shared(Handle),
    /// A runtime owned by a background thread
    Dedicated(DedicatedRuntime),
}

impl TimerRuntime {
    /// Use a runtime the caller already owns
    pub fn shared(handle: Handle) -> Self {
        TimerRuntime::Shared(handle)
    }

    /// Use the current runtime if called from inside one, otherwise spawn
    /// a dedicated worker thread
    pub fn current_or_spawn() -> std::io::Result<Self> {
        match Handle::try_current() {
            Ok(handle) => Ok(TimerRuntime::Shared(handle)),
            Err(_) => Ok(TimerRuntime::Dedicated(DedicatedRuntime::spawn()?)),
        }
    }

    /// Handle used to spawn tickers
    pub fn handle(&self) -> &Handle {
        match self {
            TimerRuntime::Shared(handle) => handle,
            TimerRuntime::Dedicated(runtime) => &runtime.handle,
        }
    }

    pub fn is_dedicated(&self) -> bool {
        matches!(self, TimerRuntime::Dedicated(_))
    }
}

impl std::fmt::Debug for TimerRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerRuntime::Shared(_) => f.write_str("TimerRuntime::Shared"),
            TimerRuntime::Dedicated(_) => f.write_str("TimerRuntime::Dedicated"),
        }
    }
}

/// Background thread driving a current-thread tokio runtime
///
/// The runtime stays up until this value is dropped, which signals the
/// thread to exit and joins it.
pub struct DedicatedRuntime {
    handle: Handle,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DedicatedRuntime {
    /// Spawn the worker thread and its runtime
    pub fn spawn() -> std::io::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let handle = rt.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("media-playback".to_string())
            .spawn(move || {
                tracing::debug!("Playback timer worker started");
                rt.block_on(async {
                    // Either an explicit signal or the sender being dropped
                    let _ = shutdown_rx.await;
                });
                tracing::debug!("Playback timer worker shut down");
            })?;

        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }
}

impl Drop for DedicatedRuntime {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            // Joining from the worker itself would deadlock
            if thread.thread().id() != thread::current().id() {
                if thread.join().is_err() {
                    tracing::warn!("Playback timer worker panicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_spawns_dedicated_outside_runtime() {
        let runtime = TimerRuntime::current_or_spawn().unwrap();
        assert!(runtime.is_dedicated());

        let (tx, rx) = std::sync::mpsc::channel();
        runtime.handle().spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = tx.send(42);
        });

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 42);
    }

    #[tokio::test]
    async fn test_uses_current_runtime() {
        let runtime = TimerRuntime::current_or_spawn().unwrap();
        assert!(!runtime.is_dedicated());
    }

    #[test]
    fn test_drop_joins_worker() {
        let runtime = DedicatedRuntime::spawn().unwrap();
        drop(runtime);
    }
}
