use chrono::Utc;
use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog records
// =============================================================================

/// A catalog question. `category` and `subcategory` are free-form labels;
/// grouping is derived from them, never declared.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub category: String,
    pub subcategory: String,
}

/// One subcategory of a [`CategoryGroup`] with its matching questions in
/// catalog order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryGroup {
    pub name: String,
    pub questions: Vec<Question>,
}

/// Derived browsing group: a category tab and its (possibly empty) list of
/// subcategories. Rebuilt on every search, never mutated in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub category: String,
    pub subcategories: Vec<SubcategoryGroup>,
}

impl CategoryGroup {
    /// Number of questions across all subcategories.
    pub fn question_count(&self) -> usize {
        self.subcategories.iter().map(|s| s.questions.len()).sum()
    }

    /// True when the search left nothing in this tab.
    pub fn is_empty(&self) -> bool {
        self.subcategories.is_empty()
    }
}

// =============================================================================
// Transcript
// =============================================================================

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A display-ready transcript entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Epoch seconds (UTC).
    pub created_at: i64,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

// =============================================================================
// User profile
// =============================================================================

/// Display fields of the signed-in user, handed in by the session store
/// collaborator. Never parsed or validated here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub role: String,
}

impl UserProfile {
    /// Avatar initials: first letters of first and last name, else the first
    /// letter of the email, else `"U"`.
    pub fn initials(&self) -> String {
        let first = |s: &Option<String>| s.as_deref().and_then(|v| v.trim().chars().next());
        if let (Some(f), Some(l)) = (first(&self.first_name), first(&self.last_name)) {
            return format!("{}{}", f, l).to_uppercase();
        }
        match self.email.trim().chars().next() {
            Some(c) => c.to_uppercase().to_string(),
            None => "U".to_string(),
        }
    }

    /// "First Last" when both names are known, otherwise the email.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(f), Some(l)) if !f.trim().is_empty() && !l.trim().is_empty() => {
                format!("{} {}", f.trim(), l.trim())
            }
            _ => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(first: Option<&str>, last: Option<&str>, email: &str) -> UserProfile {
        UserProfile {
            email: email.to_string(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            company: None,
            role: "analyst".to_string(),
        }
    }

    #[test]
    fn test_message_constructors() {
        let m = Message::user("Bonjour");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "Bonjour");
        assert!(m.created_at > 0);

        let m = Message::assistant("Salut");
        assert_eq!(m.role, Role::Assistant);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_initials_from_names() {
        let p = profile(Some("claire"), Some("dupont"), "c.dupont@example.fr");
        assert_eq!(p.initials(), "CD");
    }

    #[test]
    fn test_initials_falls_back_to_email() {
        let p = profile(Some("Claire"), None, "claire@example.fr");
        assert_eq!(p.initials(), "C");
    }

    #[test]
    fn test_initials_default() {
        let p = profile(None, None, "");
        assert_eq!(p.initials(), "U");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            profile(Some("Claire"), Some("Dupont"), "c@example.fr").display_name(),
            "Claire Dupont"
        );
        assert_eq!(
            profile(None, Some("Dupont"), "c@example.fr").display_name(),
            "c@example.fr"
        );
    }

    #[test]
    fn test_profile_deserializes_camel_case() {
        let json = r#"{"email":"a@b.fr","firstName":"Ana","lastName":"Bel","role":"admin"}"#;
        let p: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(p.first_name.as_deref(), Some("Ana"));
        assert_eq!(p.initials(), "AB");
        assert!(p.company.is_none());
    }

    #[test]
    fn test_category_group_counts() {
        let q = Question {
            id: "q1".into(),
            text: "t".into(),
            category: "C".into(),
            subcategory: "S".into(),
        };
        let group = CategoryGroup {
            category: "C".into(),
            subcategories: vec![SubcategoryGroup {
                name: "S".into(),
                questions: vec![q.clone(), q],
            }],
        };
        assert_eq!(group.question_count(), 2);
        assert!(!group.is_empty());
    }
}
