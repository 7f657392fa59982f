use regex::Regex;

use crate::model::{CategoryFilter, Note};

pub mod matcher;

pub use matcher::SearchMatcher;

/// What the note list is currently showing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    pub trash_view: bool,
    pub category: CategoryFilter,
    pub search_query: String,
}

impl ViewFilter {
    pub fn normalized_query(&self) -> Option<String> {
        let trimmed = self.search_query.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// The case-insensitive literal pattern shared by filtering, list
    /// highlighting and the in-note matcher.
    pub fn query_regex(&self) -> Option<Regex> {
        self.normalized_query()
            .and_then(|query| matcher::literal_regex(&query))
    }
}

/// Derive the visible note list. Pinned notes first, then most recently
/// modified; ties keep their input order.
pub fn project<'a>(notes: &'a [Note], filter: &ViewFilter) -> Vec<&'a Note> {
    let needle = filter.query_regex();
    let mut visible: Vec<&Note> = notes
        .iter()
        .filter(|note| {
            if filter.trash_view {
                note.is_trashed()
            } else {
                !note.is_trashed() && filter.category.admits(note)
            }
        })
        .filter(|note| match needle.as_ref() {
            Some(needle) => note.matches_text(needle),
            None => true,
        })
        .collect();

    visible.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    visible
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, updated_at: i64) -> Note {
        Note {
            id: id.into(),
            title: format!("title {id}"),
            content: String::new(),
            updated_at,
            category_id: None,
            is_pinned: false,
            deleted_at: None,
        }
    }

    fn ids(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|n| n.id.clone()).collect()
    }

    #[test]
    fn pinned_first_then_most_recent() {
        let mut pinned_old = note("pinned-old", 1);
        pinned_old.is_pinned = true;
        let notes = vec![note("a", 5), pinned_old, note("b", 9), note("c", 5)];

        let visible = project(&notes, &ViewFilter::default());
        assert_eq!(ids(&visible), vec!["pinned-old", "b", "a", "c"]);

        for pair in visible.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            assert!(
                (a.is_pinned && !b.is_pinned)
                    || (a.is_pinned == b.is_pinned && a.updated_at >= b.updated_at)
            );
        }
    }

    #[test]
    fn projection_is_idempotent_and_leaves_input_alone() {
        let notes = vec![note("x", 3), note("y", 3), note("z", 8)];
        let before = notes.clone();
        let filter = ViewFilter::default();

        let first = ids(&project(&notes, &filter));
        let second = ids(&project(&notes, &filter));
        assert_eq!(first, second);
        assert_eq!(first, vec!["z", "x", "y"]);
        assert_eq!(notes, before);
    }

    #[test]
    fn trash_view_ignores_category_filter() {
        let mut trashed = note("gone", 4);
        trashed.deleted_at = Some(10);
        trashed.category_id = Some("ideas".into());
        let mut work = note("work", 2);
        work.category_id = Some("work".into());
        let notes = vec![trashed, work];

        let filter = ViewFilter {
            trash_view: true,
            category: CategoryFilter::Category("work".into()),
            search_query: String::new(),
        };
        assert_eq!(ids(&project(&notes, &filter)), vec!["gone"]);

        let filter = ViewFilter {
            trash_view: false,
            ..filter
        };
        assert_eq!(ids(&project(&notes, &filter)), vec!["work"]);
    }

    #[test]
    fn query_is_trimmed_and_case_insensitive() {
        let mut grocery = note("g", 1);
        grocery.content = "Buy MILK and eggs".into();
        let notes = vec![grocery, note("other", 2)];

        let filter = ViewFilter {
            search_query: "  milk ".into(),
            ..ViewFilter::default()
        };
        assert_eq!(ids(&project(&notes, &filter)), vec!["g"]);

        let filter = ViewFilter {
            search_query: "   ".into(),
            ..ViewFilter::default()
        };
        assert_eq!(project(&notes, &filter).len(), 2);
    }

    #[test]
    fn listed_notes_always_have_a_body_match() {
        let mut city = note("city", 1);
        city.title = String::new();
        city.content = "İstanbul".into();
        let mut tea = note("tea", 2);
        tea.title = String::new();
        tea.content = "Earl Grey (hot)".into();
        let notes = vec![city, tea];

        for query in ["i", "İ", "GREY (", "(hot)"] {
            let filter = ViewFilter {
                search_query: query.into(),
                ..ViewFilter::default()
            };
            for listed in project(&notes, &filter) {
                let matcher = SearchMatcher::new(&listed.content, query);
                assert!(matcher.count() > 0, "{query:?} listed {}", listed.id);
            }
        }
    }
}
