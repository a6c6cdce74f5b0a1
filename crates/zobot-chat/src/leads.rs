//! Lead notification for high-value conversations.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;
use zobot_core::journal::JsonJournal;

use crate::intent::Intent;

/// Journal that receives simulated CRM lead payloads.
pub const CRM_LEADS_JOURNAL: &str = "crm_leads";

/// A session crossed a high-value intent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEvent {
    pub id: Uuid,
    pub session_id: String,
    pub message: String,
    pub score: u64,
    pub intent: Intent,
    pub at: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(session_id: &str, message: &str, score: u64, intent: Intent) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            message: message.to_string(),
            score,
            intent,
            at: Utc::now(),
        }
    }
}

/// Receiver of lead events.
///
/// Fire-and-forget: implementations handle their own failures and must
/// not block the caller.
pub trait LeadNotifier: Send + Sync {
    fn notify(&self, lead: &LeadEvent);
}

/// Discards every lead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLeadNotifier;

impl LeadNotifier for NoopLeadNotifier {
    fn notify(&self, lead: &LeadEvent) {
        tracing::debug!(session_id = %lead.session_id, intent = %lead.intent, "Lead notification disabled");
    }
}

/// Records a CRM-style lead creation request in the `crm_leads` journal.
#[derive(Clone)]
pub struct CrmLeadNotifier {
    journal: JsonJournal,
}

impl CrmLeadNotifier {
    pub fn new(journal: JsonJournal) -> Self {
        Self { journal }
    }

    /// CRM lead payload for `lead`.
    pub fn payload(lead: &LeadEvent) -> serde_json::Value {
        let visitor: String = lead.session_id.chars().take(4).collect();
        json!({
            "data": [{
                "Last_Name": format!("Visitor-{}", visitor),
                "Description": format!("Intent: {}. Source: Zobot.", lead.intent),
                "Lead_Source": "Zobot",
                "Lead_Status": "Pre-Qualified",
                "Scoring": lead.score,
            }]
        })
    }
}

impl LeadNotifier for CrmLeadNotifier {
    fn notify(&self, lead: &LeadEvent) {
        tracing::info!(
            lead_id = %lead.id,
            session_id = %lead.session_id,
            intent = %lead.intent,
            score = lead.score,
            "Creating CRM lead"
        );
        self.journal.append(CRM_LEADS_JOURNAL, Self::payload(lead));
    }
}
