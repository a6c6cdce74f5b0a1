//! Turns a message plus session context into a scripted reply.
//!
//! [`Dispatcher::dispatch`] never mutates anything. The caller applies the
//! returned [`FlagUpdate`] and score delta while it holds the session lock.

use crate::intent::{Intent, UiAction};
use crate::knowledge::{KnowledgeSource, SmartFallback, StaticKnowledgeBase};
use crate::rules::{default_rules, Reply, Responder, Rule, Staged};
use crate::scoring::ScoreDelta;
use crate::session::{FlagUpdate, SessionContext};

/// Confidence when the knowledge source had nothing to offer.
pub const CLARIFICATION_CONFIDENCE: f32 = 0.4;
/// Confidence when the knowledge source failed and the fallback answered.
pub const DEGRADED_CONFIDENCE: f32 = 0.5;

/// Outcome of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub reply_text: String,
    pub intent: Intent,
    pub confidence: f32,
    pub score_delta: u32,
    pub action: Option<UiAction>,
    pub flag_update: Option<FlagUpdate>,
}

impl DispatchResult {
    fn from_reply(reply: &Reply, flag_update: Option<FlagUpdate>) -> Self {
        Self {
            reply_text: reply.text.to_string(),
            intent: reply.intent,
            confidence: reply.confidence,
            score_delta: reply.score_delta,
            action: reply.action,
            flag_update,
        }
    }

    fn confirmed(staged: &Staged, message: &str) -> Self {
        Self {
            reply_text: (staged.confirmation)(message),
            intent: staged.confirmed,
            confidence: staged.confirmed_confidence,
            score_delta: staged.confirmed_delta,
            action: None,
            flag_update: Some(FlagUpdate::clear(staged.flag)),
        }
    }
}

/// First-match-wins rule chain with a knowledge fallback.
pub struct Dispatcher {
    rules: Vec<Rule>,
    knowledge: Box<dyn KnowledgeSource>,
    fallback: SmartFallback,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Default rule table backed by [`StaticKnowledgeBase`].
    pub fn new() -> Self {
        Self::with_rules(default_rules(), Box::new(StaticKnowledgeBase::new()))
    }

    pub fn with_rules(rules: Vec<Rule>, knowledge: Box<dyn KnowledgeSource>) -> Self {
        Self {
            rules,
            knowledge,
            fallback: SmartFallback,
        }
    }

    /// Swap the knowledge source, keeping the rules.
    pub fn with_knowledge(mut self, knowledge: Box<dyn KnowledgeSource>) -> Self {
        self.knowledge = knowledge;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The rule that claims `message`, if any.
    pub fn rule_for(&self, message: &str, context: &SessionContext) -> Option<&Rule> {
        let lower = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(&lower, context))
    }

    pub fn dispatch(&self, message: &str, context: &SessionContext) -> DispatchResult {
        let Some(rule) = self.rule_for(message, context) else {
            return self.consult_knowledge(message);
        };

        tracing::trace!(rule = rule.name, "Rule matched");

        match &rule.responder {
            Responder::Fixed(reply) => DispatchResult::from_reply(reply, None),
            Responder::Staged(staged) if staged.awaiting_confirmation(context) => {
                DispatchResult::confirmed(staged, message)
            }
            Responder::Staged(staged) => {
                DispatchResult::from_reply(&staged.opening, Some(FlagUpdate::set(staged.flag)))
            }
            Responder::Knowledge => self.consult_knowledge(message),
        }
    }

    fn consult_knowledge(&self, message: &str) -> DispatchResult {
        let (reply_text, intent, confidence, score_delta) = match self.knowledge.lookup(message) {
            Ok(Some(answer)) => (
                answer.reply,
                answer.intent,
                answer.confidence,
                ScoreDelta::KNOWLEDGE,
            ),
            Ok(None) => (
                format!(
                    "I'm here to help with \"{}\". Could you give me more details about what you're looking for? I can assist with pricing, features, trials, or business optimization.",
                    message
                ),
                Intent::Clarification,
                CLARIFICATION_CONFIDENCE,
                ScoreDelta::NONE,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Knowledge lookup failed, using fallback reply");
                (
                    self.fallback.compose(message),
                    Intent::CustomQuery,
                    DEGRADED_CONFIDENCE,
                    ScoreDelta::NONE,
                )
            }
        };

        DispatchResult {
            reply_text,
            intent,
            confidence,
            score_delta,
            action: None,
            flag_update: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::intent::Topic;
    use crate::knowledge::KnowledgeAnswer;
    use crate::session::ContextFlag;

    struct FailingKnowledge;

    impl KnowledgeSource for FailingKnowledge {
        fn lookup(&self, _message: &str) -> Result<Option<KnowledgeAnswer>, ChatError> {
            Err(ChatError::Knowledge("backend unreachable".into()))
        }
    }

    struct SilentKnowledge;

    impl KnowledgeSource for SilentKnowledge {
        fn lookup(&self, _message: &str) -> Result<Option<KnowledgeAnswer>, ChatError> {
            Ok(None)
        }
    }

    /// Apply a result to a context the way the engine does.
    fn apply(ctx: &mut SessionContext, result: &DispatchResult) {
        ctx.record(result.intent, result.flag_update);
    }

    fn run(dispatcher: &Dispatcher, messages: &[&str]) -> Vec<DispatchResult> {
        let mut ctx = SessionContext::default();
        messages
            .iter()
            .map(|m| {
                let result = dispatcher.dispatch(m, &ctx);
                apply(&mut ctx, &result);
                result
            })
            .collect()
    }

    // ---- Greeting ----

    #[test]
    fn test_hello_is_greeting_regardless_of_state() {
        let d = Dispatcher::new();
        let states = [
            SessionContext::default(),
            SessionContext {
                last_intent: Some(Intent::Buy),
                products_shown: true,
                upload_requested: false,
            },
            SessionContext {
                last_intent: Some(Intent::Sell),
                products_shown: false,
                upload_requested: true,
            },
        ];
        for ctx in &states {
            let r = d.dispatch("Hello, I want to buy", ctx);
            assert_eq!(r.intent, Intent::Greeting);
            assert_eq!(r.confidence, 0.95);
            assert_eq!(r.score_delta, 0);
            assert!(r.flag_update.is_none());
        }
    }

    #[test]
    fn test_hi_inside_word_is_greeting() {
        let d = Dispatcher::new();
        let r = d.dispatch("Can I list this bike", &SessionContext::default());
        assert_eq!(r.intent, Intent::Greeting);
    }

    // ---- Buy flow ----

    #[test]
    fn test_buy_then_purchase_confirmed() {
        let d = Dispatcher::new();
        let results = run(&d, &["I want to buy a widget", "I want to buy the Pro plan"]);

        assert_eq!(results[0].intent, Intent::Buy);
        assert_eq!(results[0].confidence, 0.9);
        assert_eq!(results[0].score_delta, 20);
        assert_eq!(results[0].action, Some(UiAction::ShowProducts));
        assert_eq!(
            results[0].flag_update,
            Some(FlagUpdate::set(ContextFlag::ProductsShown))
        );

        assert_eq!(results[1].intent, Intent::PurchaseConfirmed);
        assert_eq!(results[1].confidence, 0.95);
        assert_eq!(results[1].score_delta, 30);
        assert_eq!(results[1].action, None);
        assert_eq!(
            results[1].flag_update,
            Some(FlagUpdate::clear(ContextFlag::ProductsShown))
        );
        assert!(results[1]
            .reply_text
            .contains("order for the I want to buy the Pro plan."));
    }

    #[test]
    fn test_third_buy_starts_over() {
        let d = Dispatcher::new();
        let results = run(&d, &["buy", "buy more", "buy again"]);
        assert_eq!(results[1].intent, Intent::PurchaseConfirmed);
        assert_eq!(results[2].intent, Intent::Buy);
        assert_eq!(results[2].action, Some(UiAction::ShowProducts));
    }

    #[test]
    fn test_buy_follow_up_without_keyword_adds_to_cart() {
        let d = Dispatcher::new();
        let results = run(&d, &["I want to buy", "the blue one"]);
        assert_eq!(results[1].intent, Intent::AddToCart);
        assert_eq!(results[1].confidence, 0.5);
        assert_eq!(results[1].score_delta, 0);
        assert!(results[1].flag_update.is_none());
    }

    #[test]
    fn test_short_follow_up_falls_to_knowledge() {
        let d = Dispatcher::new();
        let results = run(&d, &["purchase", "ok"]);
        assert_eq!(results[1].intent, Intent::CustomQuery);
    }

    // ---- Sell flow ----

    #[test]
    fn test_sell_then_listing_confirmed() {
        let d = Dispatcher::new();
        let results = run(&d, &["I want to sell my bike", "sell the red bike"]);

        assert_eq!(results[0].intent, Intent::Sell);
        assert_eq!(results[0].confidence, 0.85);
        assert_eq!(results[0].score_delta, 10);
        assert_eq!(results[0].action, Some(UiAction::PromptUpload));

        assert_eq!(results[1].intent, Intent::ListingConfirmed);
        assert_eq!(results[1].score_delta, 15);
        assert_eq!(
            results[1].flag_update,
            Some(FlagUpdate::clear(ContextFlag::UploadRequested))
        );
        assert!(results[1].reply_text.contains("listed your sell the red bike"));
    }

    // ---- Fixed rules ----

    #[test]
    fn test_fixed_rules() {
        let d = Dispatcher::new();
        let ctx = SessionContext::default();
        let cases = [
            ("my screen is broken", Intent::Support, 0.8, 5, Some(UiAction::SupportMode)),
            ("book a demo", Intent::Demo, 0.9, 15, None),
            ("What is your pricing", Intent::Pricing, 0.9, 0, None),
            ("what can it do", Intent::Features, 0.85, 5, None),
            ("free trial please", Intent::Trial, 0.9, 15, None),
            ("grow revenue", Intent::BusinessInquiry, 0.8, 10, None),
        ];
        for (message, intent, confidence, delta, action) in cases {
            let r = d.dispatch(message, &ctx);
            assert_eq!(r.intent, intent, "message: {}", message);
            assert_eq!(r.confidence, confidence, "message: {}", message);
            assert_eq!(r.score_delta, delta, "message: {}", message);
            assert_eq!(r.action, action, "message: {}", message);
        }
    }

    #[test]
    fn test_precedence_buy_before_demo() {
        let d = Dispatcher::new();
        let r = d.dispatch("buy a demo unit", &SessionContext::default());
        assert_eq!(r.intent, Intent::Buy);
    }

    #[test]
    fn test_precedence_support_before_pricing() {
        let d = Dispatcher::new();
        let r = d.dispatch("support cost", &SessionContext::default());
        assert_eq!(r.intent, Intent::Support);
    }

    #[test]
    fn test_support_and_pricing_never_reach_knowledge() {
        let d = Dispatcher::new();
        let ctx = SessionContext::default();
        assert_eq!(
            d.dispatch("tell me about support for automation", &ctx).intent,
            Intent::Support
        );
        assert_eq!(
            d.dispatch("pricing of the crm module", &ctx).intent,
            Intent::Pricing
        );
    }

    #[test]
    fn test_rule_for_names_winning_rule() {
        let d = Dispatcher::new();
        let ctx = SessionContext::default();
        assert_eq!(d.rule_for("PRICE?", &ctx).map(|r| r.name), Some("pricing"));
        assert_eq!(d.rule_for("zzz", &ctx).map(|r| r.name), Some("knowledge"));
    }

    // ---- Knowledge fallback ----

    #[test]
    fn test_gibberish_is_low_confidence() {
        let d = Dispatcher::new();
        let r = d.dispatch("asdkjalksd", &SessionContext::default());
        assert!(matches!(r.intent, Intent::CustomQuery | Intent::Clarification));
        assert!(r.confidence <= 0.6);
        assert_eq!(r.action, None);
    }

    #[test]
    fn test_knowledge_topic_adds_delta() {
        let d = Dispatcher::new();
        let r = d.dispatch("Do you do workflow automation", &SessionContext::default());
        assert_eq!(r.intent, Intent::Knowledge(Topic::Automation));
        assert_eq!(r.confidence, 0.85);
        assert_eq!(r.score_delta, ScoreDelta::KNOWLEDGE);
    }

    #[test]
    fn test_silent_knowledge_asks_for_clarification() {
        let d = Dispatcher::new().with_knowledge(Box::new(SilentKnowledge));
        let r = d.dispatch("zzz", &SessionContext::default());
        assert_eq!(r.intent, Intent::Clarification);
        assert_eq!(r.confidence, CLARIFICATION_CONFIDENCE);
        assert_eq!(r.score_delta, 0);
        assert!(r.reply_text.starts_with("I'm here to help with \"zzz\"."));
    }

    #[test]
    fn test_failing_knowledge_degrades() {
        let d = Dispatcher::new().with_knowledge(Box::new(FailingKnowledge));
        let r = d.dispatch("quantum leap", &SessionContext::default());
        assert_eq!(r.intent, Intent::CustomQuery);
        assert_eq!(r.confidence, DEGRADED_CONFIDENCE);
        assert_eq!(r.score_delta, 0);
        assert!(!r.reply_text.is_empty());
    }

    #[test]
    fn test_empty_rule_table_uses_knowledge() {
        let d = Dispatcher::with_rules(Vec::new(), Box::new(SilentKnowledge));
        let r = d.dispatch("hello", &SessionContext::default());
        assert_eq!(r.intent, Intent::Clarification);
    }

    // ---- Replay ----

    #[test]
    fn test_replay_yields_same_deltas() {
        let d = Dispatcher::new();
        let script = [
            "hello",
            "I want to buy",
            "buy the Pro plan",
            "book a demo",
            "free trial",
            "my account targets",
            "asdkjalksd",
        ];
        let first: Vec<u32> = run(&d, &script).iter().map(|r| r.score_delta).collect();
        let second: Vec<u32> = run(&d, &script).iter().map(|r| r.score_delta).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![0, 20, 30, 15, 15, 10, 5]);
    }
}
