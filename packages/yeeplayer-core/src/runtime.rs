//! Task spawning abstraction for runtime independence.
//!
//! Board sessions, WebSocket transport drivers and relay helpers are all
//! started through [`TaskSpawner`], so an embedding application can decide
//! which runtime they land on.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Spawned tasks run detached until they finish on their own; callers stop
/// them through the cancellation tokens the tasks were given.
///
/// # Example
///
/// ```ignore
/// let (session, handle) = BoardSession::new(&config, emitter)?;
/// let transport = Arc::new(hub.join(session.event_sink()));
/// TokioSpawner::current().spawn(session.run(transport));
/// handle.dispatch(Command::Sound { sound: None });
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a detached background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a spawner bound to the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a spawner bound to the current runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
