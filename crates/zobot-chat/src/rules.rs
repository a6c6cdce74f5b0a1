//! The ordered intent rule table.
//!
//! Rules are evaluated top to bottom against the lowercased message and the
//! session context; the first match wins and later rules are unreachable
//! for that message. Keyword matching is plain substring matching, so
//! `hi` also matches inside words such as `this` or `shipping`.

use regex::Regex;

use crate::intent::{Intent, UiAction};
use crate::scoring::ScoreDelta;
use crate::session::{ContextFlag, SessionContext};

// =============================================================================
// Rule building blocks
// =============================================================================

/// Predicate half of a rule.
pub enum Matcher {
    /// Regex over the lowercased message.
    Pattern(Regex),
    /// Any keyword occurs as a substring of the lowercased message.
    AnyOf(&'static [&'static str]),
    /// The previous turn resolved to `after` and the message is longer
    /// than `min_chars` characters.
    FollowUp { after: Intent, min_chars: usize },
    /// Matches everything.
    Always,
}

impl Matcher {
    pub fn matches(&self, lower: &str, context: &SessionContext) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(lower),
            Matcher::AnyOf(keywords) => keywords.iter().any(|k| lower.contains(k)),
            Matcher::FollowUp { after, min_chars } => {
                context.last_was(*after) && lower.chars().count() > *min_chars
            }
            Matcher::Always => true,
        }
    }
}

/// A scripted reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub intent: Intent,
    pub text: &'static str,
    pub confidence: f32,
    pub score_delta: u32,
    pub action: Option<UiAction>,
}

/// A two-step exchange gated on a context flag.
///
/// The first match shows `opening` and sets `flag`. A later match while the
/// previous turn was `opening.intent` and `flag` is still set confirms:
/// `confirmed` fires with a reply echoing the message, and `flag` is cleared.
pub struct Staged {
    pub flag: ContextFlag,
    pub opening: Reply,
    pub confirmed: Intent,
    pub confirmed_confidence: f32,
    pub confirmed_delta: u32,
    pub confirmation: fn(&str) -> String,
}

impl Staged {
    /// Whether `context` is waiting on this exchange's second step.
    pub fn awaiting_confirmation(&self, context: &SessionContext) -> bool {
        context.last_was(self.opening.intent) && context.flag(self.flag)
    }
}

/// Action half of a rule.
pub enum Responder {
    Fixed(Reply),
    Staged(Staged),
    /// Defer to the dispatcher's knowledge source.
    Knowledge,
}

/// One entry of the rule table.
pub struct Rule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub responder: Responder,
}

impl Rule {
    fn fixed(name: &'static str, keywords: &'static [&'static str], reply: Reply) -> Self {
        Self {
            name,
            matcher: Matcher::AnyOf(keywords),
            responder: Responder::Fixed(reply),
        }
    }
}

// =============================================================================
// Default table
// =============================================================================

fn purchase_confirmation(message: &str) -> String {
    format!(
        "Excellent! I'm processing your order for the {}. You'll receive a confirmation email shortly. Is there anything else I can help you with?",
        message
    )
}

fn listing_confirmation(message: &str) -> String {
    format!(
        "Perfect! I've listed your {} on our marketplace. It's now live and visible to thousands of potential buyers. You'll receive notifications when interested buyers contact you. Want to list another item or need help with anything else?",
        message
    )
}

/// The production rule table, in precedence order.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "greeting",
            matcher: Matcher::Pattern(
                Regex::new("hi|hello|hey|greet").expect("Invalid greeting regex"),
            ),
            responder: Responder::Fixed(Reply {
                intent: Intent::Greeting,
                text: "Hello! Welcome to the Zobot sales assistant. How can I help you today?",
                confidence: 0.95,
                score_delta: ScoreDelta::NONE,
                action: None,
            }),
        },
        Rule {
            name: "buy",
            matcher: Matcher::AnyOf(&["buy", "purchase", "want to get"]),
            responder: Responder::Staged(Staged {
                flag: ContextFlag::ProductsShown,
                opening: Reply {
                    intent: Intent::Buy,
                    text: "That's great! We have some amazing products. I'm creating a prioritized lead for you right now.",
                    confidence: 0.9,
                    score_delta: ScoreDelta::BUY,
                    action: Some(UiAction::ShowProducts),
                },
                confirmed: Intent::PurchaseConfirmed,
                confirmed_confidence: 0.95,
                confirmed_delta: ScoreDelta::PURCHASE_CONFIRMED,
                confirmation: purchase_confirmation,
            }),
        },
        Rule {
            name: "sell",
            matcher: Matcher::AnyOf(&["sell", "list", "list this", "list item"]),
            responder: Responder::Staged(Staged {
                flag: ContextFlag::UploadRequested,
                opening: Reply {
                    intent: Intent::Sell,
                    text: "We can help you list items. Please click the upload button to share a photo of what you're selling.",
                    confidence: 0.85,
                    score_delta: ScoreDelta::SELL,
                    action: Some(UiAction::PromptUpload),
                },
                confirmed: Intent::ListingConfirmed,
                confirmed_confidence: 0.95,
                confirmed_delta: ScoreDelta::LISTING_CONFIRMED,
                confirmation: listing_confirmation,
            }),
        },
        Rule::fixed(
            "support",
            &["support", "help", "broken", "issue"],
            Reply {
                intent: Intent::Support,
                text: "I understand you need help. I'm checking our support base...",
                confidence: 0.8,
                score_delta: ScoreDelta::SUPPORT,
                action: Some(UiAction::SupportMode),
            },
        ),
        Rule::fixed(
            "demo",
            &["demo"],
            Reply {
                intent: Intent::Demo,
                text: "I've scheduled a demo request and updated your Lead status.",
                confidence: 0.9,
                score_delta: ScoreDelta::DEMO,
                action: None,
            },
        ),
        Rule::fixed(
            "pricing",
            &["price", "cost", "pricing"],
            Reply {
                intent: Intent::Pricing,
                text: "Our pricing starts at $29/mo for Basic and $79/mo for Pro.",
                confidence: 0.9,
                score_delta: ScoreDelta::NONE,
                action: None,
            },
        ),
        Rule::fixed(
            "features",
            &["feature", "capability", "what can"],
            Reply {
                intent: Intent::Features,
                text: "Our key features include: Lead Scoring, CRM Integration, AI-powered chat, Real-time Analytics, and Sales Automation. Which interests you most?",
                confidence: 0.85,
                score_delta: ScoreDelta::FEATURES,
                action: None,
            },
        ),
        Rule::fixed(
            "trial",
            &["trial", "free", "try"],
            Reply {
                intent: Intent::Trial,
                text: "Great! We offer a 14-day free trial with no credit card required. I'll get you set up right away!",
                confidence: 0.9,
                score_delta: ScoreDelta::TRIAL,
                action: None,
            },
        ),
        Rule::fixed(
            "business_inquiry",
            &["account", "revenue", "target"],
            Reply {
                intent: Intent::BusinessInquiry,
                text: "I can help you optimize your Accounts and meet revenue targets. Let me gather some information about your current setup and goals. What's your main challenge right now?",
                confidence: 0.8,
                score_delta: ScoreDelta::BUSINESS_INQUIRY,
                action: None,
            },
        ),
        Rule {
            name: "add_to_cart",
            matcher: Matcher::FollowUp {
                after: Intent::Buy,
                min_chars: 2,
            },
            responder: Responder::Fixed(Reply {
                intent: Intent::AddToCart,
                text: "Excellent choice. I'll add that to your cart.",
                confidence: 0.5,
                score_delta: ScoreDelta::NONE,
                action: None,
            }),
        },
        Rule {
            name: "knowledge",
            matcher: Matcher::Always,
            responder: Responder::Knowledge,
        },
    ]
}
