use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::debug;

use cligate_core::Turn;

/// Retention and eviction policy for the store.
#[derive(Debug, Clone)]
pub struct SessionStoreConfig {
    /// Upper bound on turns kept per session; oldest are dropped first.
    pub max_turns: usize,
    /// Idle window after which a session becomes eligible for eviction.
    pub idle_ttl: Duration,
}

impl Default for SessionStoreConfig {
    fn default() -> Self {
        Self {
            max_turns: 20,
            idle_ttl: Duration::from_secs(30 * 60),
        }
    }
}

struct Session {
    turns: VecDeque<Turn>,
    last_touched: Instant,
}

impl Session {
    fn new() -> Self {
        Self {
            turns: VecDeque::new(),
            last_touched: Instant::now(),
        }
    }

    fn push_capped(&mut self, turn: Turn, max_turns: usize) {
        self.turns.push_back(turn);
        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }
    }

    fn touch(&mut self) {
        self.last_touched = Instant::now();
    }
}

/// Map from session identifier to its turns.
///
/// The outer map is read-mostly; each session sits behind its own `Mutex` so
/// two requests on the same identifier serialize their appends while distinct
/// identifiers never contend. Created at process start, dropped at shutdown —
/// there is no ambient global.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
    config: SessionStoreConfig,
}

impl SessionStore {
    pub fn new(config: SessionStoreConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Prior turns for a session, oldest first. An unknown identifier yields
    /// an empty sequence — sessions come into being on first append.
    pub async fn load(&self, session_id: &str) -> Vec<Turn> {
        let entry = {
            let map = self.sessions.read().await;
            map.get(session_id).cloned()
        };
        match entry {
            Some(session) => {
                let mut session = session.lock().await;
                session.touch();
                session.turns.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Append one turn, creating the session if needed.
    pub async fn append(&self, session_id: &str, turn: Turn) {
        let session = self.get_or_create(session_id).await;
        let mut session = session.lock().await;
        session.push_capped(turn, self.config.max_turns);
        session.touch();
    }

    /// Append a user turn and the assistant turn it produced under a single
    /// lock acquisition, so a concurrent request on the same session cannot
    /// interleave between them.
    pub async fn append_exchange(&self, session_id: &str, user: Turn, assistant: Turn) {
        let session = self.get_or_create(session_id).await;
        let mut session = session.lock().await;
        session.push_capped(user, self.config.max_turns);
        session.push_capped(assistant, self.config.max_turns);
        session.touch();
    }

    /// Drop a session explicitly. Returns whether it existed.
    pub async fn reset(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Evict sessions idle longer than the configured TTL. Advisory: runs
    /// periodically from the binary and never blocks a request — a session
    /// whose lock is currently held is in use and is left alone.
    pub async fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.sessions.write().await;
        let before = map.len();
        map.retain(|_, session| match session.try_lock() {
            Ok(session) => now.duration_since(session.last_touched) <= self.config.idle_ttl,
            Err(_) => true,
        });
        let evicted = before - map.len();
        if evicted > 0 {
            debug!(evicted, remaining = map.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        if let Some(session) = self.sessions.read().await.get(session_id) {
            return session.clone();
        }
        let mut map = self.sessions.write().await;
        map.entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cligate_core::Role;

    fn store(max_turns: usize, idle_ttl: Duration) -> SessionStore {
        SessionStore::new(SessionStoreConfig {
            max_turns,
            idle_ttl,
        })
    }

    #[tokio::test]
    async fn unknown_session_loads_empty() {
        let store = store(10, Duration::from_secs(60));
        assert!(store.load("nope").await.is_empty());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn retention_keeps_most_recent_in_order() {
        let store = store(4, Duration::from_secs(60));
        for i in 0..7 {
            store.append("s", Turn::new(Role::User, format!("m{i}"))).await;
        }
        let turns = store.load("s").await;
        let contents: Vec<_> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["m3", "m4", "m5", "m6"]);
    }

    #[tokio::test]
    async fn concurrent_exchanges_never_interleave() {
        let store = store(1000, Duration::from_secs(60));
        let mut handles = Vec::new();
        for worker in 0..4 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    store
                        .append_exchange(
                            "shared",
                            Turn::new(Role::User, format!("q-{worker}-{i}")),
                            Turn::new(Role::Assistant, format!("r-{worker}-{i}")),
                        )
                        .await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = store.load("shared").await;
        assert_eq!(turns.len(), 200);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
            // The answer belongs to the question it was appended with.
            assert_eq!(
                pair[1].content.strip_prefix("r-").unwrap(),
                pair[0].content.strip_prefix("q-").unwrap()
            );
        }
    }

    #[tokio::test]
    async fn distinct_sessions_progress_concurrently() {
        let store = store(100, Duration::from_secs(60));
        let mut handles = Vec::new();
        for id in ["a", "b", "c"] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..20 {
                    store.append(id, Turn::new(Role::User, format!("{id}-{i}"))).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        for id in ["a", "b", "c"] {
            assert_eq!(store.load(id).await.len(), 20);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_evicted_after_ttl() {
        let store = store(10, Duration::from_secs(60));
        store.append("stale", Turn::new(Role::User, "old")).await;

        tokio::time::advance(Duration::from_secs(55)).await;
        store.append("fresh", Turn::new(Role::User, "new")).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        let evicted = store.evict_expired().await;

        assert_eq!(evicted, 1);
        assert!(store.load("stale").await.is_empty());
        assert_eq!(store.load("fresh").await.len(), 1);
    }

    #[tokio::test]
    async fn reset_drops_the_session() {
        let store = store(10, Duration::from_secs(60));
        store.append("s", Turn::new(Role::User, "hello")).await;
        assert!(store.reset("s").await);
        assert!(!store.reset("s").await);
        assert!(store.load("s").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_counts_as_activity() {
        let store = store(10, Duration::from_secs(60));
        store.append("s", Turn::new(Role::User, "hello")).await;

        tokio::time::advance(Duration::from_secs(45)).await;
        let _ = store.load("s").await;

        tokio::time::advance(Duration::from_secs(45)).await;
        assert_eq!(store.evict_expired().await, 0);
        assert_eq!(store.load("s").await.len(), 1);
    }
}
