//! Closed vocabularies shared by the dispatcher and the wire format:
//! intents, knowledge-base topics, and UI actions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Topic
// =============================================================================

/// A knowledge-base topic. Its label doubles as the lookup keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Automation,
    Integration,
    Security,
    Analytics,
    Team,
    Mobile,
    Support,
    Training,
    Customization,
    Performance,
    Pricing,
    Lead,
    Crm,
    Reporting,
    Workflow,
}

impl Topic {
    /// All topics in lookup order. The first topic whose keyword appears
    /// in a message wins.
    pub const ALL: [Topic; 15] = [
        Topic::Automation,
        Topic::Integration,
        Topic::Security,
        Topic::Analytics,
        Topic::Team,
        Topic::Mobile,
        Topic::Support,
        Topic::Training,
        Topic::Customization,
        Topic::Performance,
        Topic::Pricing,
        Topic::Lead,
        Topic::Crm,
        Topic::Reporting,
        Topic::Workflow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Automation => "automation",
            Topic::Integration => "integration",
            Topic::Security => "security",
            Topic::Analytics => "analytics",
            Topic::Team => "team",
            Topic::Mobile => "mobile",
            Topic::Support => "support",
            Topic::Training => "training",
            Topic::Customization => "customization",
            Topic::Performance => "performance",
            Topic::Pricing => "pricing",
            Topic::Lead => "lead",
            Topic::Crm => "crm",
            Topic::Reporting => "reporting",
            Topic::Workflow => "workflow",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topic {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown topic: {}", s))
    }
}

// =============================================================================
// Intent
// =============================================================================

/// The purpose assigned to a user message by the rule chain.
///
/// Serialized as its snake_case label. Knowledge-base answers carry the
/// topic label instead (e.g. `"automation"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Intent {
    Greeting,
    Buy,
    PurchaseConfirmed,
    Sell,
    ListingConfirmed,
    Support,
    Demo,
    Pricing,
    Features,
    Trial,
    BusinessInquiry,
    AddToCart,
    /// `Topic::Support` and `Topic::Pricing` share their labels with
    /// [`Intent::Support`] and [`Intent::Pricing`], and parse back as those.
    /// The support and pricing rules run before the knowledge base, so the
    /// dispatcher never produces either topic.
    Knowledge(Topic),
    CustomQuery,
    Clarification,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::Buy => "buy",
            Intent::PurchaseConfirmed => "purchase_confirmed",
            Intent::Sell => "sell",
            Intent::ListingConfirmed => "listing_confirmed",
            Intent::Support => "support",
            Intent::Demo => "demo",
            Intent::Pricing => "pricing",
            Intent::Features => "features",
            Intent::Trial => "trial",
            Intent::BusinessInquiry => "business_inquiry",
            Intent::AddToCart => "add_to_cart",
            Intent::Knowledge(topic) => topic.as_str(),
            Intent::CustomQuery => "custom_query",
            Intent::Clarification => "clarification",
        }
    }

    /// Intents that trigger a CRM lead notification.
    pub fn is_high_value(&self) -> bool {
        matches!(self, Intent::Buy | Intent::Demo)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = String;

    /// Named intents take precedence over topics sharing a label
    /// (`support`, `pricing`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greeting" => Ok(Intent::Greeting),
            "buy" => Ok(Intent::Buy),
            "purchase_confirmed" => Ok(Intent::PurchaseConfirmed),
            "sell" => Ok(Intent::Sell),
            "listing_confirmed" => Ok(Intent::ListingConfirmed),
            "support" => Ok(Intent::Support),
            "demo" => Ok(Intent::Demo),
            "pricing" => Ok(Intent::Pricing),
            "features" => Ok(Intent::Features),
            "trial" => Ok(Intent::Trial),
            "business_inquiry" => Ok(Intent::BusinessInquiry),
            "add_to_cart" => Ok(Intent::AddToCart),
            "custom_query" => Ok(Intent::CustomQuery),
            "clarification" => Ok(Intent::Clarification),
            other => other
                .parse::<Topic>()
                .map(Intent::Knowledge)
                .map_err(|_| format!("Unknown intent: {}", other)),
        }
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        intent.as_str().to_string()
    }
}

impl TryFrom<String> for Intent {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

// =============================================================================
// UiAction
// =============================================================================

/// Follow-up affordance the widget should render.
///
/// Serialized as `{ "type": "show_products" }` etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiAction {
    ShowProducts,
    PromptUpload,
    SupportMode,
}

impl fmt::Display for UiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UiAction::ShowProducts => write!(f, "show_products"),
            UiAction::PromptUpload => write!(f, "prompt_upload"),
            UiAction::SupportMode => write!(f, "support_mode"),
        }
    }
}
