//! Immutable ESG knowledge base.
//!
//! Holds the question catalog, the exact-match response table and the
//! ordered keyword rules. Built once at startup and shared read-only.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::{EsgError, Result};
use crate::types::Question;

/// French production catalog shipped with the binary.
const BUILTIN_CATALOG: &str = include_str!("../data/catalog_fr.json");

/// Public demo catalog: fictitious figures, no exact-match table.
const DEMO_CATALOG: &str = include_str!("../data/demo_fr.json");

const DEFAULT_GREETING: &str =
    "Bonjour, je suis votre assistant ESG. Comment puis-je vous aider aujourd'hui?";

// =============================================================================
// ResponseTable
// =============================================================================

/// Exact question text -> answer. Keys are compared verbatim.
#[derive(Clone, Debug, Default)]
pub struct ResponseTable {
    entries: HashMap<String, String>,
}

impl ResponseTable {
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Verbatim lookup; `None` on a miss.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.entries.get(question).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// =============================================================================
// KeywordRule
// =============================================================================

/// How a rule's keywords combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordMode {
    /// Any keyword present as a substring.
    #[default]
    Any,
    /// Every keyword present as a substring.
    All,
}

/// A fallback rule. Rules are evaluated in declaration order and the first
/// match wins.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Short label used in logs.
    #[serde(default)]
    pub topic: String,
    pub keywords: Vec<String>,
    pub response: String,
    #[serde(default)]
    pub mode: KeywordMode,
}

impl KeywordRule {
    /// Test the rule against an already lowercased utterance. Containment is
    /// plain substring search, not tokenized.
    pub fn matches(&self, lowered: &str) -> bool {
        match self.mode {
            KeywordMode::Any => self.keywords.iter().any(|k| lowered.contains(k.as_str())),
            KeywordMode::All => self.keywords.iter().all(|k| lowered.contains(k.as_str())),
        }
    }
}

// =============================================================================
// KnowledgeBase
// =============================================================================

/// On-disk catalog shape.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    greeting: Option<String>,
    questions: Vec<Question>,
    #[serde(default)]
    responses: HashMap<String, String>,
    #[serde(default)]
    keyword_rules: Vec<KeywordRule>,
    default_response: String,
}

/// Read-only catalog shared by the intent matcher and the question index.
#[derive(Clone, Debug)]
pub struct KnowledgeBase {
    questions: Vec<Question>,
    responses: ResponseTable,
    rules: Vec<KeywordRule>,
    default_response: String,
    greeting: String,
}

impl KnowledgeBase {
    /// The built-in French catalog.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    /// The demo catalog.
    pub fn demo() -> Result<Self> {
        Self::from_json_str(DEMO_CATALOG)
    }

    /// Load a JSON catalog from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let kb = Self::from_json_str(&content)?;
        info!(
            path = %path.display(),
            questions = kb.questions.len(),
            responses = kb.responses.len(),
            rules = kb.rules.len(),
            "Knowledge base loaded"
        );
        Ok(kb)
    }

    /// Pick the catalog named by the `[chat]` section: an explicit file, else
    /// the demo catalog in demo mode, else the built-in one.
    pub fn from_config(chat: &ChatConfig) -> Result<Self> {
        if let Some(ref path) = chat.catalog_path {
            if chat.demo_mode {
                warn!(path = %path, "Demo mode ignored: a catalog file is configured");
            }
            return Self::load(Path::new(path));
        }
        if chat.demo_mode {
            info!("Demo mode: serving the demo catalog");
            return Self::demo();
        }
        Self::builtin()
    }

    /// Parse a JSON catalog.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::from_parts(
            file.questions,
            file.responses,
            file.keyword_rules,
            file.default_response,
            file.greeting,
        )
    }

    /// Validate and assemble a knowledge base.
    ///
    /// Question ids must be unique, the default response and every answer
    /// text non-empty, and every rule must carry at least one keyword.
    /// Keywords are lowercased.
    pub fn from_parts(
        questions: Vec<Question>,
        responses: HashMap<String, String>,
        rules: Vec<KeywordRule>,
        default_response: String,
        greeting: Option<String>,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id.as_str()) {
                return Err(EsgError::DuplicateQuestionId(q.id.clone()));
            }
        }

        if default_response.trim().is_empty() {
            return Err(EsgError::Catalog(
                "default response must not be empty".to_string(),
            ));
        }

        if let Some(key) = responses
            .iter()
            .find(|(_, answer)| answer.trim().is_empty())
            .map(|(key, _)| key)
        {
            return Err(EsgError::Catalog(format!(
                "response for '{}' must not be empty",
                key
            )));
        }

        let mut normalized = Vec::with_capacity(rules.len());
        for (i, mut rule) in rules.into_iter().enumerate() {
            rule.keywords = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            if rule.response.trim().is_empty() {
                return Err(EsgError::Catalog(format!(
                    "keyword rule #{} ({}) has an empty response",
                    i, rule.topic
                )));
            }
            if rule.keywords.is_empty() {
                return Err(EsgError::Catalog(format!(
                    "keyword rule #{} ({}) has no keywords",
                    i, rule.topic
                )));
            }
            normalized.push(rule);
        }

        let texts: HashSet<&str> = questions.iter().map(|q| q.text.as_str()).collect();
        for key in responses.keys() {
            if !texts.contains(key.as_str()) {
                debug!(key = %key, "Response entry has no matching catalog question");
            }
        }

        Ok(Self {
            questions,
            responses: ResponseTable::new(responses),
            rules: normalized,
            default_response,
            greeting: greeting
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn responses(&self) -> &ResponseTable {
        &self.responses
    }

    pub fn keyword_rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn default_response(&self) -> &str {
        &self.default_response
    }

    /// First assistant message of every new session.
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Distinct categories in catalog order.
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for q in &self.questions {
            if !out.contains(&q.category.as_str()) {
                out.push(&q.category);
            }
        }
        out
    }
}
