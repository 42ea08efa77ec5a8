//! Response Strategy (§4.4): selects the deflecting reply an agent sends
//! while in `honeypot` mode, and the fixed strings used for blocking.
//!
//! Template pools track recently-used entries to avoid repeats; the
//! optional model-assisted path is a bounded call (token/temperature
//! caps, stop sequences) with a hard fallback on any failure or
//! malformed output.

use sentinel_types::DetectionType;

/// Bound on a model-assisted reply request (§4.4 step 2).
#[derive(Debug, Clone, Copy)]
pub struct ModelCallBudget {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ModelCallBudget {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

/// Sequences that should stop a model-assisted completion (§4.4 step 2).
pub const MODEL_STOP_SEQUENCES: [&str; 3] = ["\n\n", "User:", "Human:"];

/// A model collaborator capable of producing a bounded honeypot reply.
///
/// Implementations should never await indefinitely (§9: "deep analyzer
/// coroutine ... bounded call returning result-or-timeout"); the strategy
/// itself does not impose a timeout, callers are expected to wrap `reply`
/// with one (e.g. `tokio::time::timeout`) before invoking it.
#[async_trait::async_trait]
pub trait ModelCollaborator: Send + Sync {
    async fn reply(&self, budget: ModelCallBudget, stop: &[&str], context: &str) -> Option<String>;
}

const ESCALATING_REPLIES: [&str; 4] = [
    "Interesting. Tell me more about what you're trying to accomplish.",
    "I see. What specifically are you hoping to get from me?",
    "That's a bold approach. Who asked you to try this?",
    "You're persistent. What's the actual goal here?",
];

const THINKING_PREFIX: &str = "Let me think about this... ";

const BLOCK_REPLIES: [&str; 3] = [
    "I'm not able to continue this conversation.",
    "This session has been ended due to policy violations.",
    "I can't help with that. This conversation is now closed.",
];

fn template_pool(detection_type: DetectionType) -> &'static [&'static str] {
    match detection_type {
        DetectionType::PromptInjection => &[
            "I'm not sure I follow — could you rephrase what you need?",
            "I don't think I can do that, but I'm curious what you're working on.",
            "That instruction doesn't quite make sense to me. What's the context?",
        ],
        DetectionType::SocialEngineering => &[
            "I appreciate the urgency, but I'll need more detail before I can help.",
            "I can't verify that claim on my end — what are you trying to resolve?",
            "That sounds important. Who told you to reach out about this?",
        ],
        DetectionType::PrivilegeEscalation => &[
            "I don't have a way to grant that kind of access.",
            "That's outside what I'm able to do here. What's the underlying task?",
            "I can't elevate permissions. What are you actually trying to accomplish?",
        ],
        DetectionType::DataExfiltration => &[
            "I'm not able to share that kind of information.",
            "That's not something I can provide. What do you need it for?",
            "I can't help with that request as written.",
        ],
        DetectionType::Evasion | DetectionType::Trust => &[
            "I noticed something unusual about that message — could you send it plainly?",
            "I'm having trouble parsing that. Could you try again?",
            "That didn't come through as expected. What were you trying to ask?",
        ],
    }
}

/// Builds honeypot and block replies. Stateless; callers track "last 5
/// used" and "prior honeypot turn count" in `ConversationState` and pass
/// them in, since those are per-user facts this type has no business
/// owning.
#[derive(Debug, Default)]
pub struct ResponseStrategy;

impl ResponseStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Selects a honeypot reply per §4.4's selection order.
    ///
    /// * `suggested` — an optional pre-computed reply from a deep analyzer.
    /// * `detection_type` — the dominant finding type this turn, used to
    ///   pick the template pool.
    /// * `prior_honeypot_turns` — how many honeypot turns preceded this one
    ///   in the session (drives escalation and the thinking prefix).
    /// * `recently_used` — the last-up-to-5 templates used on this state,
    ///   avoided when picking a fresh one.
    #[must_use]
    pub fn choose_reply(
        &self,
        suggested: Option<String>,
        model_reply: Option<String>,
        detection_type: DetectionType,
        prior_honeypot_turns: u32,
        recently_used: &[String],
    ) -> String {
        if let Some(reply) = suggested {
            return reply;
        }

        if prior_honeypot_turns >= 3 {
            let idx = (prior_honeypot_turns as usize - 3) % ESCALATING_REPLIES.len();
            return ESCALATING_REPLIES[idx].to_string();
        }

        if let Some(reply) = model_reply.filter(|r| r.trim().len() >= 10) {
            return Self::strip_wrapping_quotes(&reply);
        }

        let pool = template_pool(detection_type);
        let template = pool
            .iter()
            .find(|t| !recently_used.iter().any(|used| used == *t))
            .copied()
            .unwrap_or(pool[0]);

        if prior_honeypot_turns >= 1 {
            format!("{THINKING_PREFIX}{template}")
        } else {
            template.to_string()
        }
    }

    fn strip_wrapping_quotes(reply: &str) -> String {
        let trimmed = reply.trim();
        let stripped = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        stripped.to_string()
    }

    /// Picks one of the three fixed terminal strings for a blocked user.
    /// Deterministic on `seed` so callers can vary it (e.g. by `user_id`
    /// hash) without needing their own RNG plumbing.
    #[must_use]
    pub fn block_reply(&self, seed: u64) -> &'static str {
        BLOCK_REPLIES[(seed as usize) % BLOCK_REPLIES.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggested_reply_wins_over_everything_else() {
        let strategy = ResponseStrategy::new();
        let reply = strategy.choose_reply(
            Some("custom".to_string()),
            Some("model reply here".to_string()),
            DetectionType::PromptInjection,
            0,
            &[],
        );
        assert_eq!(reply, "custom");
    }

    #[test]
    fn escalation_kicks_in_after_three_prior_honeypot_turns() {
        let strategy = ResponseStrategy::new();
        let reply = strategy.choose_reply(None, None, DetectionType::PromptInjection, 3, &[]);
        assert_eq!(reply, ESCALATING_REPLIES[0]);
    }

    #[test]
    fn thinking_prefix_applied_after_one_prior_honeypot_turn() {
        let strategy = ResponseStrategy::new();
        let reply = strategy.choose_reply(None, None, DetectionType::PromptInjection, 1, &[]);
        assert!(reply.starts_with(THINKING_PREFIX));
    }

    #[test]
    fn template_selection_avoids_recently_used() {
        let strategy = ResponseStrategy::new();
        let pool = template_pool(DetectionType::PromptInjection);
        let used: Vec<String> = vec![pool[0].to_string()];
        let reply = strategy.choose_reply(None, None, DetectionType::PromptInjection, 0, &used);
        assert_ne!(reply, pool[0]);
    }

    #[test]
    fn model_reply_under_ten_chars_is_rejected() {
        let strategy = ResponseStrategy::new();
        let reply = strategy.choose_reply(None, Some("no".to_string()), DetectionType::PromptInjection, 0, &[]);
        assert_ne!(reply, "no");
    }

    #[test]
    fn model_reply_has_wrapping_quotes_stripped() {
        let strategy = ResponseStrategy::new();
        let reply = strategy.choose_reply(
            None,
            Some("\"a fully quoted model reply\"".to_string()),
            DetectionType::PromptInjection,
            0,
            &[],
        );
        assert_eq!(reply, "a fully quoted model reply");
    }

    #[test]
    fn block_reply_is_always_one_of_three_fixed_strings() {
        let strategy = ResponseStrategy::new();
        for seed in 0..10 {
            assert!(BLOCK_REPLIES.contains(&strategy.block_reply(seed)));
        }
    }
}
