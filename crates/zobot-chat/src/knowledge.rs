//! Knowledge-base fallback for messages no keyword rule claimed.
//!
//! A [`KnowledgeSource`] answers free-form questions. The built-in
//! [`StaticKnowledgeBase`] matches canned topic descriptions and otherwise
//! synthesizes a templated reply through [`SmartFallback`].

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::error::ChatError;
use crate::intent::{Intent, Topic};

/// Answer produced by a knowledge source.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeAnswer {
    pub reply: String,
    pub intent: Intent,
    pub confidence: f32,
}

/// Something that can answer a free-form message.
///
/// `Ok(None)` means the source has nothing to say; errors are recovered by
/// the dispatcher and never reach the caller.
pub trait KnowledgeSource: Send + Sync {
    fn lookup(&self, message: &str) -> Result<Option<KnowledgeAnswer>, ChatError>;
}

// =============================================================================
// StaticKnowledgeBase
// =============================================================================

/// Confidence reported for a topic hit.
pub const TOPIC_CONFIDENCE: f32 = 0.85;
/// Confidence reported for a synthesized answer.
pub const SYNTHESIZED_CONFIDENCE: f32 = 0.6;

/// Canned description for each topic.
pub fn describe(topic: Topic) -> &'static str {
    match topic {
        Topic::Automation => "Our automation features help you save time by automating repetitive tasks. You can set up workflows, triggers, and actions to streamline your business processes. This includes email automation, task assignment, and custom workflows.",
        Topic::Integration => "We integrate with 1000+ popular apps including Salesforce, Slack, HubSpot, Google Workspace, and more. Our API-first approach makes integration seamless and enables real-time data sync across your tools.",
        Topic::Security => "We use enterprise-grade security with 256-bit encryption, SOC 2 Type II compliance, and regular third-party security audits. Your data is encrypted at rest and in transit. We also offer SSO, 2FA, and granular permissions.",
        Topic::Analytics => "Get real-time analytics dashboards with custom reports, KPI tracking, and predictive insights powered by AI. Track sales performance, lead conversion rates, and team productivity with visual charts and exportable reports.",
        Topic::Team => "Collaborate seamlessly with your team with built-in collaboration tools, role-based access control, activity tracking, and shared workspaces. Assign tasks, leave comments, and track progress in real-time.",
        Topic::Mobile => "Our mobile app (iOS and Android) lets you manage everything on the go with full offline support, push notifications, and native performance. Sync changes across all devices automatically.",
        Topic::Support => "We offer 24/7 support via email, live chat, and comprehensive knowledge base. Premium plans include dedicated account managers, priority support, and custom onboarding.",
        Topic::Training => "We provide comprehensive training through video tutorials, live webinars, certification programs, and personalized onboarding. Our Academy has 100+ courses to help you master the platform.",
        Topic::Customization => "Customize every aspect of the platform to match your workflow. Use our low-code builder for custom fields and layouts, or leverage our REST API and webhooks for advanced customization.",
        Topic::Performance => "Our infrastructure is optimized for speed with 99.99% uptime SLA, automatic scaling, global CDN delivery, and sub-100ms response times. We handle millions of transactions daily.",
        Topic::Pricing => "Our pricing starts at $29/mo for the Basic plan, $79/mo for the Pro plan, and custom pricing for Enterprise. All plans include core CRM features, email, and 24/7 support.",
        Topic::Lead => "Lead management includes automated lead scoring, lead assignment, lead enrichment, and conversion tracking. Our AI helps you prioritize high-quality leads and close deals faster.",
        Topic::Crm => "Our CRM platform consolidates all your customer data in one place, providing 360-degree customer views, activity tracking, and sales pipeline management. Boost your sales team productivity by 40%.",
        Topic::Reporting => "Advanced reporting with custom dashboards, automatic email reports, scheduled exports, and data visualization. Create reports for any metric and drill down into detailed analytics.",
        Topic::Workflow => "Create powerful workflows without coding. Set up triggers, conditions, and actions to automate complex business processes. Pre-built templates for common scenarios included.",
    }
}

/// Built-in topic table with a synthesized fallback.
#[derive(Default)]
pub struct StaticKnowledgeBase {
    fallback: SmartFallback,
}

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// First topic, in table order, whose keyword occurs in `message`.
    pub fn find_topic(message: &str) -> Option<Topic> {
        let lower = message.to_lowercase();
        Topic::ALL
            .iter()
            .copied()
            .find(|t| lower.contains(t.as_str()))
    }
}

impl KnowledgeSource for StaticKnowledgeBase {
    fn lookup(&self, message: &str) -> Result<Option<KnowledgeAnswer>, ChatError> {
        if let Some(topic) = Self::find_topic(message) {
            return Ok(Some(KnowledgeAnswer {
                reply: format!(
                    "Great question about {}! {} Would you like to know more, or shall we set up a demo?",
                    topic,
                    describe(topic)
                ),
                intent: Intent::Knowledge(topic),
                confidence: TOPIC_CONFIDENCE,
            }));
        }

        Ok(Some(KnowledgeAnswer {
            reply: self.fallback.compose(message),
            intent: Intent::CustomQuery,
            confidence: SYNTHESIZED_CONFIDENCE,
        }))
    }
}

// =============================================================================
// SmartFallback
// =============================================================================

/// Shape of a message, judged by its first word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    /// Starts with how/what/why/when/where.
    Open,
    /// Starts with can/does/is/will.
    YesNo,
    Other,
}

impl QueryShape {
    pub fn of(query: &str) -> Self {
        static OPEN: OnceLock<Regex> = OnceLock::new();
        static YES_NO: OnceLock<Regex> = OnceLock::new();
        let open = OPEN.get_or_init(|| {
            Regex::new(r"(?i)^\s*(?:how|what|why|when|where)\b").expect("Invalid open-question regex")
        });
        let yes_no = YES_NO.get_or_init(|| {
            Regex::new(r"(?i)^\s*(?:can|does|is|will)\b").expect("Invalid yes/no regex")
        });

        if open.is_match(query) {
            QueryShape::Open
        } else if yes_no.is_match(query) {
            QueryShape::YesNo
        } else {
            QueryShape::Other
        }
    }
}

/// Number of opening phrases [`SmartFallback::compose_with`] accepts.
pub const OPENER_COUNT: usize = 3;

/// Templated reply for messages nothing else understood.
#[derive(Debug, Default, Clone, Copy)]
pub struct SmartFallback;

impl SmartFallback {
    /// Compose a reply with a randomly chosen opener.
    pub fn compose(&self, query: &str) -> String {
        let opener = rand::rng().random_range(0..OPENER_COUNT);
        self.compose_with(query, opener)
    }

    /// Compose a reply with opener `opener % OPENER_COUNT`.
    pub fn compose_with(&self, query: &str, opener: usize) -> String {
        let first_word = query
            .split_whitespace()
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default();

        let starter = match opener % OPENER_COUNT {
            0 => format!("Regarding \"{}\": ", query),
            1 => format!("That's a great question about {}! ", first_word),
            _ => "Interesting inquiry! ".to_string(),
        };

        let closing = match QueryShape::of(query) {
            QueryShape::Open => "I can help you understand that better. Our team specializes in CRM solutions, lead management, and sales automation. Could you be more specific about what you'd like to know?".to_string(),
            QueryShape::YesNo => "That's definitely something we can address. Our platform is designed to be flexible and comprehensive. Let me connect you with our sales team who can provide detailed information. Would you like to schedule a call?".to_string(),
            QueryShape::Other => format!(
                "For personalized guidance on \"{}\", I recommend scheduling a demo with our team. They can walk you through exactly how our solution addresses your needs.",
                query
            ),
        };

        starter + &closing
    }
}
