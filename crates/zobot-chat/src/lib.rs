//! Scripted sales conversation for the Zobot widget.
//!
//! Keyword rules classify each message, per-session context drives the
//! two-step buy and sell flows, and every rule contributes to a running
//! lead score. High-value turns are handed to a [`LeadNotifier`].

pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod intent;
pub mod knowledge;
pub mod leads;
pub mod rules;
pub mod scoring;
pub mod session;

pub use dispatcher::{DispatchResult, Dispatcher};
pub use engine::{ChatEngine, ChatReply};
pub use error::ChatError;
pub use intent::{Intent, Topic, UiAction};
pub use knowledge::{KnowledgeAnswer, KnowledgeSource, SmartFallback, StaticKnowledgeBase};
pub use leads::{CrmLeadNotifier, LeadEvent, LeadNotifier, NoopLeadNotifier};
pub use rules::{default_rules, Matcher, Responder, Rule};
pub use scoring::{LeadScore, ScoreDelta};
pub use session::{ContextFlag, FlagUpdate, Role, Session, SessionContext, SessionStore, Turn};
