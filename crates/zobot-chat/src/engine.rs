//! Chat engine: validates a message, runs it through the dispatcher under the
//! session lock, and hands high-value turns to the lead notifier.

use std::sync::Arc;

use serde::Serialize;
use zobot_core::config::ChatConfig;

use crate::dispatcher::Dispatcher;
use crate::error::ChatError;
use crate::intent::{Intent, UiAction};
use crate::knowledge::KnowledgeSource;
use crate::leads::{LeadEvent, LeadNotifier};
use crate::session::{lock_session, Role, Session, SessionStore};

/// Reply to one chat message, as sent to the widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply_text: String,
    pub intent: Intent,
    pub confidence_score: f32,
    pub lead_score: u64,
    pub action: Option<UiAction>,
}

pub struct ChatEngine {
    config: ChatConfig,
    dispatcher: Dispatcher,
    sessions: SessionStore,
    notifier: Arc<dyn LeadNotifier>,
}

impl ChatEngine {
    pub fn new(config: ChatConfig, notifier: Arc<dyn LeadNotifier>) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::new(),
            sessions: SessionStore::new(),
            notifier,
        }
    }

    /// Replace the knowledge source behind the fallback rule.
    pub fn with_knowledge(mut self, source: impl KnowledgeSource + 'static) -> Self {
        self.dispatcher = self.dispatcher.with_knowledge(Box::new(source));
        self
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Handle one message for `session_id`, creating the session if needed.
    ///
    /// The session stays locked from dispatch until the score is applied, so
    /// concurrent messages for one session are serialized and never lose an
    /// update. The lead notification runs after the lock is released.
    pub fn handle_message(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        if !self.config.enabled {
            return Err(ChatError::Disabled);
        }
        if session_id.trim().is_empty() {
            return Err(ChatError::InvalidSessionId);
        }
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }

        let handle = self.sessions.get_or_create(session_id)?;
        let (result, lead_score) = {
            let mut session = lock_session(&handle)?;
            session.push_turn(Role::User, message);

            let result = self.dispatcher.dispatch(message, &session.context);
            session.context.record(result.intent, result.flag_update);
            let lead_score = session.lead_score.add(result.score_delta);

            session.push_turn(Role::Bot, result.reply_text.clone());
            (result, lead_score)
        };

        tracing::debug!(
            session_id = %session_id,
            intent = %result.intent,
            confidence = result.confidence,
            score = lead_score,
            "Message handled"
        );

        if result.intent.is_high_value() {
            let lead = LeadEvent::new(session_id, message, lead_score, result.intent);
            self.notifier.notify(&lead);
        }

        Ok(ChatReply {
            reply_text: result.reply_text,
            intent: result.intent,
            confidence_score: result.confidence,
            lead_score,
            action: result.action,
        })
    }

    /// Snapshot of a session, if it exists.
    pub fn session(&self, session_id: &str) -> Option<Session> {
        self.sessions.snapshot(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
