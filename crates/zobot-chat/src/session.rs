//! Session state and the process-wide session store.
//!
//! Sessions are keyed by the opaque id the widget generates and keeps in
//! local storage. They are created lazily on the first message and live
//! for the lifetime of the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::intent::Intent;
use crate::scoring::LeadScore;

// =============================================================================
// Session types
// =============================================================================

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

/// One message in a session's history. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Epoch seconds.
    pub at: i64,
}

/// Boolean context flags owned by the stateful rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFlag {
    /// Set by the buy rule once the product carousel is shown.
    ProductsShown,
    /// Set by the sell rule once the upload prompt is shown.
    UploadRequested,
}

/// A flag change requested by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    pub flag: ContextFlag,
    pub value: bool,
}

impl FlagUpdate {
    pub fn set(flag: ContextFlag) -> Self {
        Self { flag, value: true }
    }

    pub fn clear(flag: ContextFlag) -> Self {
        Self { flag, value: false }
    }
}

/// Context carried across turns so stateful rules can tell a first
/// request from its follow-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub last_intent: Option<Intent>,
    pub products_shown: bool,
    pub upload_requested: bool,
}

impl SessionContext {
    pub fn flag(&self, flag: ContextFlag) -> bool {
        match flag {
            ContextFlag::ProductsShown => self.products_shown,
            ContextFlag::UploadRequested => self.upload_requested,
        }
    }

    pub fn set_flag(&mut self, flag: ContextFlag, value: bool) {
        match flag {
            ContextFlag::ProductsShown => self.products_shown = value,
            ContextFlag::UploadRequested => self.upload_requested = value,
        }
    }

    /// Whether the previous turn resolved to `intent`.
    pub fn last_was(&self, intent: Intent) -> bool {
        self.last_intent == Some(intent)
    }

    /// Record the outcome of a dispatched turn. `last_intent` is always
    /// overwritten.
    pub fn record(&mut self, intent: Intent, update: Option<FlagUpdate>) {
        self.last_intent = Some(intent);
        if let Some(update) = update {
            self.set_flag(update.flag, update.value);
        }
    }
}

/// Per-conversation state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub history: Vec<Turn>,
    pub context: SessionContext,
    pub lead_score: LeadScore,
    pub started_at: i64,
    pub last_message_at: i64,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: id.into(),
            history: Vec::new(),
            context: SessionContext::default(),
            lead_score: LeadScore::new(),
            started_at: now,
            last_message_at: now,
        }
    }

    pub fn push_turn(&mut self, role: Role, content: impl Into<String>) {
        let now = Utc::now().timestamp();
        self.last_message_at = now;
        self.history.push(Turn {
            role,
            content: content.into(),
            at: now,
        });
    }
}

// =============================================================================
// SessionStore
// =============================================================================

/// Shared handle to one session. Lock it for the whole read-modify-write
/// of a turn.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock a session handle, mapping poisoning to a storage error.
pub fn lock_session(handle: &SessionHandle) -> Result<MutexGuard<'_, Session>, ChatError> {
    handle
        .lock()
        .map_err(|e| ChatError::Storage(format!("session lock poisoned: {}", e)))
}

/// Process-wide map from session id to session.
///
/// The map lock is held only for lookup and insertion; each session has
/// its own mutex so unrelated sessions never contend.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `id`, creating an empty one if absent.
    pub fn get_or_create(&self, id: &str) -> Result<SessionHandle, ChatError> {
        let mut sessions = self.map()?;
        let handle = sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Session created");
                Arc::new(Mutex::new(Session::new(id)))
            })
            .clone();
        Ok(handle)
    }

    /// Return the session for `id` without creating one.
    pub fn get(&self, id: &str) -> Result<Option<SessionHandle>, ChatError> {
        Ok(self.map()?.get(id).cloned())
    }

    pub fn append_turn(&self, id: &str, role: Role, text: &str) -> Result<(), ChatError> {
        let handle = self.get_or_create(id)?;
        lock_session(&handle)?.push_turn(role, text);
        Ok(())
    }

    /// Current score, or `None` for an unknown session.
    pub fn lead_score(&self, id: &str) -> Result<Option<u64>, ChatError> {
        match self.get(id)? {
            Some(handle) => Ok(Some(lock_session(&handle)?.lead_score.total())),
            None => Ok(None),
        }
    }

    /// Add `delta` to the session's score and return the new total.
    pub fn add_score(&self, id: &str, delta: u32) -> Result<u64, ChatError> {
        let handle = self.get_or_create(id)?;
        let mut session = lock_session(&handle)?;
        Ok(session.lead_score.add(delta))
    }

    /// Clone of the session's current state.
    pub fn snapshot(&self, id: &str) -> Option<Session> {
        let handle = self.get(id).ok()??;
        let session = lock_session(&handle).ok()?;
        Some(session.clone())
    }

    pub fn len(&self) -> usize {
        self.map().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn map(&self) -> Result<MutexGuard<'_, HashMap<String, SessionHandle>>, ChatError> {
        self.sessions
            .lock()
            .map_err(|e| ChatError::Storage(format!("session map lock poisoned: {}", e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // ---- Session creation ----

    #[test]
    fn test_get_or_create_new_session_is_empty() {
        let store = SessionStore::new();
        let handle = store.get_or_create("sess_abc").unwrap();
        let session = handle.lock().unwrap();
        assert_eq!(session.id, "sess_abc");
        assert!(session.history.is_empty());
        assert_eq!(session.context, SessionContext::default());
        assert_eq!(session.lead_score.total(), 0);
    }

    #[test]
    fn test_get_or_create_returns_same_session() {
        let store = SessionStore::new();
        let a = store.get_or_create("s1").unwrap();
        let b = store.get_or_create("s1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_does_not_create() {
        let store = SessionStore::new();
        assert!(store.get("missing").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_session_timestamps() {
        let now = Utc::now().timestamp();
        let session = Session::new("s");
        assert!((session.started_at - now).abs() < 2);
        assert_eq!(session.started_at, session.last_message_at);
    }

    // ---- Turns ----

    #[test]
    fn test_append_turn_keeps_order() {
        let store = SessionStore::new();
        store.append_turn("s1", Role::User, "hello").unwrap();
        store.append_turn("s1", Role::Bot, "hi there").unwrap();
        let session = store.snapshot("s1").unwrap();
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].role, Role::User);
        assert_eq!(session.history[0].content, "hello");
        assert_eq!(session.history[1].role, Role::Bot);
    }

    #[test]
    fn test_append_turn_creates_session_lazily() {
        let store = SessionStore::new();
        store.append_turn("fresh", Role::User, "x").unwrap();
        assert_eq!(store.len(), 1);
    }

    // ---- Scores ----

    #[test]
    fn test_lead_score_unknown_session() {
        let store = SessionStore::new();
        assert_eq!(store.lead_score("nope").unwrap(), None);
    }

    #[test]
    fn test_add_score_accumulates() {
        let store = SessionStore::new();
        assert_eq!(store.add_score("s1", 20).unwrap(), 20);
        assert_eq!(store.add_score("s1", 30).unwrap(), 50);
        assert_eq!(store.lead_score("s1").unwrap(), Some(50));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.add_score("a", 15).unwrap();
        {
            let handle = store.get_or_create("a").unwrap();
            handle.lock().unwrap().context.products_shown = true;
        }
        store.get_or_create("b").unwrap();
        assert_eq!(store.lead_score("b").unwrap(), Some(0));
        assert!(!store.snapshot("b").unwrap().context.products_shown);
    }

    #[test]
    fn test_concurrent_add_score_loses_no_increments() {
        let store = Arc::new(SessionStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    store.add_score("shared", 5).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.lead_score("shared").unwrap(), Some(8 * 100 * 5));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_distinct_sessions() {
        let store = Arc::new(SessionStore::new());
        let handles: Vec<_> = (0..10)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.add_score(&format!("s{}", i), 10).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 10);
    }

    // ---- Context ----

    #[test]
    fn test_context_record_sets_last_intent() {
        let mut ctx = SessionContext::default();
        ctx.record(Intent::Pricing, None);
        assert_eq!(ctx.last_intent, Some(Intent::Pricing));
        assert!(ctx.last_was(Intent::Pricing));
        assert!(!ctx.last_was(Intent::Buy));
    }

    #[test]
    fn test_context_record_applies_flag_update() {
        let mut ctx = SessionContext::default();
        ctx.record(Intent::Buy, Some(FlagUpdate::set(ContextFlag::ProductsShown)));
        assert!(ctx.products_shown);
        assert!(!ctx.upload_requested);

        ctx.record(
            Intent::PurchaseConfirmed,
            Some(FlagUpdate::clear(ContextFlag::ProductsShown)),
        );
        assert!(!ctx.products_shown);
        assert_eq!(ctx.last_intent, Some(Intent::PurchaseConfirmed));
    }

    #[test]
    fn test_context_flags_are_independent() {
        let mut ctx = SessionContext::default();
        ctx.set_flag(ContextFlag::UploadRequested, true);
        assert!(ctx.flag(ContextFlag::UploadRequested));
        assert!(!ctx.flag(ContextFlag::ProductsShown));
    }

    #[test]
    fn test_context_serializes_camel_case() {
        let mut ctx = SessionContext::default();
        ctx.record(Intent::Sell, Some(FlagUpdate::set(ContextFlag::UploadRequested)));
        let v = serde_json::to_value(&ctx).unwrap();
        assert_eq!(v["lastIntent"], "sell");
        assert_eq!(v["uploadRequested"], true);
        assert_eq!(v["productsShown"], false);
    }
}
