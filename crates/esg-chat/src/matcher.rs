//! Local rule-based response engine.
//!
//! Answers an utterance from the knowledge base in three steps: verbatim
//! lookup in the response table, then the ordered keyword rules against the
//! lowercased utterance, then the catalog's default text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use esg_core::KnowledgeBase;

/// Which step of the matcher produced an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule")]
pub enum MatchSource {
    /// Verbatim hit in the response table.
    ExactMatch,
    /// Keyword rule at this position in declaration order.
    KeywordRule(usize),
    /// Nothing matched.
    Default,
}

/// An answer borrowed from the knowledge base, with its provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub text: &'a str,
    pub source: MatchSource,
}

/// Pure utterance -> response classifier over an injected knowledge base.
#[derive(Clone)]
pub struct IntentMatcher {
    knowledge: Arc<KnowledgeBase>,
}

impl IntentMatcher {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Answer text for `utterance`. Total: always a non-empty string.
    pub fn classify(&self, utterance: &str) -> String {
        self.resolve(utterance).text.to_string()
    }

    /// Like [`classify`](Self::classify) but reports which step answered.
    pub fn resolve(&self, utterance: &str) -> Resolution<'_> {
        // No normalization on the exact path.
        if let Some(answer) = self.knowledge.responses().lookup(utterance) {
            return Resolution {
                text: answer,
                source: MatchSource::ExactMatch,
            };
        }

        let lowered = utterance.to_lowercase();
        let hit = self
            .knowledge
            .keyword_rules()
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(&lowered));

        match hit {
            Some((index, rule)) => Resolution {
                text: &rule.response,
                source: MatchSource::KeywordRule(index),
            },
            None => Resolution {
                text: self.knowledge.default_response(),
                source: MatchSource::Default,
            },
        }
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }
}

// =============================================================================
// Tests
// =============================================================================
