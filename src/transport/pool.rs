//! Session pool keyed by SessionId.
//!
//! Maps each session identifier to the handle of its worker, creating the
//! session the first time either side connects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              SessionPool                │
//! │  ┌─────────────────────────────────┐    │
//! │  │ "a1f3…" → SessionHandle (worker) │    │
//! │  │ "9c0e…" → SessionHandle (worker) │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::bridge::{SessionBridge, SessionHandle, SessionWorker, TransformRegistry};
use crate::config::BridgeConfig;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;

// ============================================================================
// SessionPool
// ============================================================================

/// Registry of live sessions.
///
/// Thread-safe; shared by both accept loops.
pub struct SessionPool {
    /// Configuration applied to new sessions.
    config: BridgeConfig,

    /// Transformation registry shared by every session.
    registry: Arc<dyn TransformRegistry>,

    /// Active sessions by ID.
    sessions: RwLock<FxHashMap<SessionId, SessionHandle>>,
}

impl SessionPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(config: BridgeConfig, registry: Arc<dyn TransformRegistry>) -> Self {
        Self {
            config,
            registry,
            sessions: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the number of live sessions.
    #[inline]
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns the handle for `session_id`, if the session is live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionNotFound`] if there is no such live session.
    pub fn get(&self, session_id: &SessionId) -> Result<SessionHandle> {
        self.sessions
            .read()
            .get(session_id)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| Error::session_not_found(session_id.clone()))
    }

    /// Returns the handle for `session_id`, spawning a new session if needed.
    ///
    /// A session whose worker has stopped is replaced. Must be called from
    /// within a tokio runtime.
    pub fn get_or_create(&self, session_id: &SessionId) -> SessionHandle {
        if let Ok(handle) = self.get(session_id) {
            return handle;
        }

        let mut sessions = self.sessions.write();

        // Another connection may have created it while we waited for the lock.
        if let Some(handle) = sessions.get(session_id)
            && !handle.is_closed()
        {
            return handle.clone();
        }

        let bridge = SessionBridge::new(
            session_id.clone(),
            &self.config,
            Arc::clone(&self.registry),
        );
        let handle = SessionWorker::spawn(bridge);
        sessions.insert(session_id.clone(), handle.clone());

        info!(session_id = %session_id, "Session created");
        handle
    }

    /// Stops and removes a session. Unknown sessions are ignored.
    pub fn remove(&self, session_id: &SessionId) {
        let removed = self.sessions.write().remove(session_id);

        if let Some(handle) = removed {
            handle.shutdown();
            debug!(session_id = %session_id, "Session removed from pool");
        }
    }

    /// Stops every session.
    pub fn shutdown(&self) {
        let sessions: Vec<_> = self.sessions.write().drain().collect();

        for (session_id, handle) in sessions {
            handle.shutdown();
            debug!(session_id = %session_id, "Session stopped during shutdown");
        }
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("session_count", &self.session_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio_test::{assert_err, assert_ok};

    use crate::bridge::MiddlewareRegistry;

    fn pool() -> SessionPool {
        SessionPool::new(BridgeConfig::default(), Arc::new(MiddlewareRegistry::new()))
    }

    fn session(name: &str) -> SessionId {
        SessionId::new(name).expect("valid session id")
    }

    #[tokio::test]
    async fn test_get_or_create_reuses_session() {
        let pool = pool();
        let a = pool.get_or_create(&session("a"));
        let b = pool.get_or_create(&session("a"));
        pool.get_or_create(&session("b"));

        assert_eq!(a.session_id(), b.session_id());
        assert_eq!(pool.session_count(), 2);

        pool.shutdown();
        assert_eq!(pool.session_count(), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let pool = pool();
        let err = assert_err!(pool.get(&session("missing")));
        assert!(matches!(err, Error::SessionNotFound { .. }));

        pool.get_or_create(&session("present"));
        let handle = assert_ok!(pool.get(&session("present")));
        assert_eq!(handle.session_id().as_str(), "present");
    }

    #[tokio::test]
    async fn test_remove_stops_worker() {
        let pool = pool();
        let handle = pool.get_or_create(&session("a"));

        pool.remove(&session("a"));
        pool.remove(&session("never-existed"));

        tokio::time::timeout(Duration::from_secs(1), async {
            while !handle.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("worker stops");
        assert_eq!(pool.session_count(), 0);
    }

    #[tokio::test]
    async fn test_closed_session_is_replaced() {
        let pool = pool();
        let first = pool.get_or_create(&session("a"));
        first.shutdown();

        tokio::time::timeout(Duration::from_secs(1), async {
            while !first.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("worker stops");

        assert_err!(pool.get(&session("a")));

        let second = pool.get_or_create(&session("a"));
        assert!(!second.is_closed());
        assert_ok!(second.status().await);
        assert_eq!(pool.session_count(), 1);
    }
}
