use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::i18n::Strings;

pub type NoteId = String;
pub type CategoryId = String;

/// A single note as persisted in the `notes` snapshot.
///
/// Timestamps are Unix epoch milliseconds. `deleted_at` doubles as the
/// lifecycle marker: `Some` means the note sits in the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Trashed { since: i64 },
}

impl Note {
    pub fn lifecycle(&self) -> Lifecycle {
        match self.deleted_at {
            Some(since) => Lifecycle::Trashed { since },
            None => Lifecycle::Active,
        }
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn display_title<'a>(&'a self, strings: &'a Strings) -> &'a str {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            strings.untitled
        } else {
            trimmed
        }
    }

    pub fn matches_text(&self, needle: &Regex) -> bool {
        needle.is_match(&self.title) || needle.is_match(&self.content)
    }
}

/// Partial update merged by `Store::update_note`. `None` leaves a field alone;
/// `category_id: Some(None)` clears the category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Option<CategoryId>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn category(category_id: Option<CategoryId>) -> Self {
        Self {
            category_id: Some(category_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.category_id.is_none()
    }

    pub(crate) fn apply_to(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(category_id) = self.category_id {
            note.category_id = category_id;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

pub fn default_categories() -> Vec<Category> {
    vec![
        Category::new("work", "Work"),
        Category::new("personal", "Personal"),
        Category::new("ideas", "Ideas"),
    ]
}

/// Which slice of the active notes the sidebar is showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(CategoryId),
}

impl CategoryFilter {
    pub fn category_id(&self) -> Option<&str> {
        match self {
            CategoryFilter::All => None,
            CategoryFilter::Category(id) => Some(id.as_str()),
        }
    }

    pub fn admits(&self, note: &Note) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(id) => note.category_id.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn strings(self) -> &'static Strings {
        Strings::for_language(self)
    }

    pub fn next(self) -> Self {
        match self {
            Language::En => Language::Zh,
            Language::Zh => Language::En,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub dark_mode: bool,
    pub language: Language,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_snapshot_omits_absent_optionals() {
        let note = Note {
            id: "n1".into(),
            title: "Title".into(),
            content: "Body".into(),
            updated_at: 42,
            category_id: None,
            is_pinned: false,
            deleted_at: None,
        };
        let json = serde_json::to_string(&note).expect("serialize");
        assert!(json.contains("\"updatedAt\":42"));
        assert!(json.contains("\"isPinned\":false"));
        assert!(!json.contains("deletedAt"));
        assert!(!json.contains("categoryId"));
    }

    #[test]
    fn note_snapshot_tolerates_missing_pin_flag() {
        let raw = r#"{"id":"a","title":"t","content":"c","updatedAt":7,"deletedAt":9}"#;
        let note: Note = serde_json::from_str(raw).expect("parse");
        assert!(!note.is_pinned);
        assert_eq!(note.lifecycle(), Lifecycle::Trashed { since: 9 });
    }

    #[test]
    fn settings_fill_missing_fields_with_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"language":"zh"}"#).expect("parse");
        assert!(!settings.dark_mode);
        assert_eq!(settings.language, Language::Zh);
    }

    #[test]
    fn patch_can_clear_category() {
        let mut note = Note {
            id: "n".into(),
            title: String::new(),
            content: String::new(),
            updated_at: 0,
            category_id: Some("work".into()),
            is_pinned: false,
            deleted_at: None,
        };
        NotePatch::category(None).apply_to(&mut note);
        assert_eq!(note.category_id, None);
    }
}
