//! Two-level (category -> subcategory) browsing view over the catalog.

use std::sync::Arc;

use esg_core::{CategoryGroup, KnowledgeBase, Question, SubcategoryGroup};

/// Search-driven grouping over an injected knowledge base.
#[derive(Clone)]
pub struct QuestionIndex {
    knowledge: Arc<KnowledgeBase>,
}

impl QuestionIndex {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Grouped view of the whole catalog filtered by `search_term`.
    pub fn view(&self, search_term: &str) -> Vec<CategoryGroup> {
        build_view(self.knowledge.questions(), search_term)
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.knowledge.question(id)
    }

    pub fn len(&self) -> usize {
        self.knowledge.questions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.knowledge.questions().is_empty()
    }
}

/// Case-insensitive substring test against text, category and subcategory.
/// `needle` must already be lowercased.
fn retains(question: &Question, needle: &str) -> bool {
    needle.is_empty()
        || question.text.to_lowercase().contains(needle)
        || question.category.to_lowercase().contains(needle)
        || question.subcategory.to_lowercase().contains(needle)
}

/// Group `catalog` by category and subcategory, keeping only questions that
/// match `search_term`.
///
/// The category list always comes from the unfiltered catalog, so a search
/// can empty a tab but never remove it. Subcategories appear in the order
/// the filtered questions first mention them.
pub fn build_view(catalog: &[Question], search_term: &str) -> Vec<CategoryGroup> {
    let needle = search_term.to_lowercase();

    let mut groups: Vec<CategoryGroup> = Vec::new();
    for q in catalog {
        if !groups.iter().any(|g| g.category == q.category) {
            groups.push(CategoryGroup {
                category: q.category.clone(),
                subcategories: Vec::new(),
            });
        }
    }

    for q in catalog.iter().filter(|q| retains(q, &needle)) {
        let Some(group) = groups.iter_mut().find(|g| g.category == q.category) else {
            continue;
        };
        match group
            .subcategories
            .iter_mut()
            .find(|s| s.name == q.subcategory)
        {
            Some(sub) => sub.questions.push(q.clone()),
            None => group.subcategories.push(SubcategoryGroup {
                name: q.subcategory.clone(),
                questions: vec![q.clone()],
            }),
        }
    }

    groups
}

// =============================================================================
// Tests
// =============================================================================
