//! Session state.
//!
//! # Responsibilities
//! - Hold per-visitor values (CSRF tokens, user data) and the auth flag
//! - Keep sessions in memory keyed by an opaque id
//!
//! - Evict sessions idle for longer than the configured timeout
//!
//! # Design Decisions
//! - Each session sits behind its own mutex, held for the whole dispatch;
//!   concurrent requests on one session run one after the other
//! - Ids are UUID v4; unknown or expired ids start a fresh session
//! - A fresh session is stored only once an action puts something in it
//! - The store is capped; when full, new sessions are not kept
//! - No persistence

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "mvc_session";

/// Idle time after which a session is dropped, unless configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Most sessions kept at once, unless configured.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// String-keyed bag of JSON values plus an authenticated flag.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Session {
    values: HashMap<String, Value>,
    authenticated: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value under `key` deserialized as `T`, or `None` if absent or of
    /// another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.authenticated = false;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }
}

#[derive(Debug)]
struct Entry {
    session: Mutex<Session>,
    /// Milliseconds since the store's epoch.
    last_seen: AtomicU64,
}

/// In-memory session store shared across request tasks.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Arc<Entry>>>,
    epoch: Instant,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            epoch: Instant::now(),
            idle_timeout,
            max_sessions,
        }
    }

    /// Run `f` on the session for `id` while holding its lock.
    ///
    /// Unknown or expired ids start a fresh session, which is kept only if
    /// `f` leaves something in it. Returns the result of `f` and, when a
    /// fresh session was kept, the id to hand to the client.
    pub fn with_session<R>(
        &self,
        id: Option<&str>,
        f: impl FnOnce(&mut Session) -> R,
    ) -> (R, Option<String>) {
        if let Some(entry) = id.and_then(|id| self.live_entry(id)) {
            let mut session = lock(&entry.session);
            return (f(&mut session), None);
        }

        let mut session = Session::new();
        let value = f(&mut session);
        if session == Session::default() {
            return (value, None);
        }
        (value, self.insert(session))
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.now_millis();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !self.is_expired(entry, now));
        before.saturating_sub(self.inner.len())
    }

    /// Sweep every `every` until `shutdown` fires.
    pub fn spawn_sweeper(
        &self,
        every: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = store.sweep();
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = store.len(), "Expired sessions evicted");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }

    pub fn remove(&self, id: &str) {
        self.inner.remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn live_entry(&self, id: &str) -> Option<Arc<Entry>> {
        let now = self.now_millis();
        let entry = self.inner.get(id).map(|e| Arc::clone(e.value()))?;
        if self.is_expired(&entry, now) {
            self.inner.remove_if(id, |_, e| self.is_expired(e, now));
            return None;
        }
        entry.last_seen.store(now, Ordering::Relaxed);
        Some(entry)
    }

    fn insert(&self, session: Session) -> Option<String> {
        if self.inner.len() >= self.max_sessions {
            self.sweep();
            if self.inner.len() >= self.max_sessions {
                tracing::warn!(
                    max_sessions = self.max_sessions,
                    "Session store full, new session not kept"
                );
                return None;
            }
        }

        let id = Uuid::new_v4().to_string();
        let entry = Entry {
            session: Mutex::new(session),
            last_seen: AtomicU64::new(self.now_millis()),
        };
        self.inner.insert(id.clone(), Arc::new(entry));
        Some(id)
    }

    fn is_expired(&self, entry: &Entry, now: u64) -> bool {
        let idle = now.saturating_sub(entry.last_seen.load(Ordering::Relaxed));
        u128::from(idle) > self.idle_timeout.as_millis()
    }

    fn now_millis(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

// A panicking action leaves its session as it was at the panic.
fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::csrf;
    use crate::lifecycle::Shutdown;

    #[test]
    fn test_session_values() {
        let mut session = Session::new();
        session.set("user_name", "pika");
        session.set("tokens", serde_json::json!(["a", "b"]));

        assert_eq!(session.get_as::<String>("user_name").as_deref(), Some("pika"));
        assert_eq!(
            session.get_as::<Vec<String>>("tokens"),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(session.get_as::<u32>("user_name"), None);

        session.remove("user_name");
        assert!(session.get("user_name").is_none());
    }

    #[test]
    fn test_clear_resets_authentication() {
        let mut session = Session::new();
        session.set_authenticated(true);
        session.set("k", 1);
        session.clear();
        assert!(!session.is_authenticated());
        assert!(session.get("k").is_none());
    }

    #[test]
    fn test_store_round_trip() {
        let store = SessionStore::new();

        let ((), id) = store.with_session(None, |s| s.set_authenticated(true));
        let id = id.unwrap();
        assert_eq!(store.len(), 1);

        let (authenticated, issued) = store.with_session(Some(&id), |s| s.is_authenticated());
        assert!(authenticated);
        assert_eq!(issued, None);

        let (authenticated, issued) = store.with_session(Some("unknown"), |s| s.is_authenticated());
        assert!(!authenticated);
        assert_eq!(issued, None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_untouched_session_is_not_kept() {
        let store = SessionStore::new();
        let ((), issued) = store.with_session(None, |_| ());
        assert_eq!(issued, None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_sessions_are_evicted() {
        let store = SessionStore::with_limits(Duration::from_millis(20), 100);
        let (_, first) = store.with_session(None, |s| s.set("k", 1));
        let (_, second) = store.with_session(None, |s| s.set("k", 2));
        assert_eq!(store.len(), 2);

        std::thread::sleep(Duration::from_millis(60));

        // Looking up an expired id starts over and drops the stale entry.
        let (value, issued) = store.with_session(second.as_deref(), |s| s.get("k").cloned());
        assert_eq!(value, None);
        assert_eq!(issued, None);
        assert_eq!(store.len(), 1);

        assert_eq!(store.sweep(), 1);
        assert!(store.is_empty());

        let (value, _) = store.with_session(first.as_deref(), |s| s.get("k").cloned());
        assert_eq!(value, None);
    }

    #[test]
    fn test_store_is_capped() {
        let store = SessionStore::with_limits(Duration::from_secs(3600), 3);
        let issued: Vec<_> = (0..5)
            .map(|i| store.with_session(None, |s| s.set("n", i)).1)
            .collect();

        assert_eq!(store.len(), 3);
        assert!(issued[..3].iter().all(Option::is_some));
        assert!(issued[3..].iter().all(Option::is_none));
    }

    #[test]
    fn test_concurrent_requests_keep_each_others_tokens() {
        let store = SessionStore::new();
        let (_, id) = store.with_session(None, |s| s.set("tabs", 0));
        let id = id.unwrap();

        let tokens: Vec<String> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        store
                            .with_session(Some(&id), |s| csrf::generate_token(s, "signin"))
                            .0
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for token in &tokens {
            let (valid, _) = store.with_session(Some(&id), |s| csrf::check_token(s, "signin", token));
            assert!(valid, "token {token} was lost");
        }
    }

    #[tokio::test]
    async fn test_sweeper_evicts_until_shutdown() {
        let store = SessionStore::with_limits(Duration::from_millis(10), 100);
        let shutdown = Shutdown::new();
        let sweeper = store.spawn_sweeper(Duration::from_millis(10), shutdown.subscribe());

        store.with_session(None, |s| s.set("k", 1));
        assert_eq!(store.len(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.is_empty());

        shutdown.trigger();
        sweeper.await.unwrap();
    }
}
