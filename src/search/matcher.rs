use std::ops::Range;

use regex::{Regex, RegexBuilder};

/// Literal, case-insensitive occurrences of a query inside one note's content,
/// with a wrap-around cursor for next/previous navigation.
#[derive(Debug, Clone, Default)]
pub struct SearchMatcher {
    matches: Vec<Range<usize>>,
    current: usize,
}

/// Build the regex used for both match scanning and highlighting. Pattern
/// metacharacters in `query` are escaped so the query is always literal text.
pub fn literal_regex(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
        .ok()
}

impl SearchMatcher {
    pub fn new(content: &str, query: &str) -> Self {
        let mut matcher = Self::default();
        matcher.rederive(content, query);
        matcher
    }

    /// Rescan after the content or query changed. The cursor goes back to 0.
    pub fn rederive(&mut self, content: &str, query: &str) {
        self.current = 0;
        self.matches = if content.is_empty() {
            Vec::new()
        } else {
            literal_regex(query)
                .map(|regex| regex.find_iter(content).map(|m| m.range()).collect())
                .unwrap_or_default()
        };
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.matches.iter().map(|range| range.start).collect()
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.matches
    }

    pub fn count(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_range(&self) -> Option<Range<usize>> {
        self.matches.get(self.current).cloned()
    }

    pub fn next(&mut self) -> usize {
        if !self.matches.is_empty() {
            self.current = (self.current + 1) % self.matches.len();
        }
        self.current
    }

    pub fn previous(&mut self) -> usize {
        if !self.matches.is_empty() {
            let len = self.matches.len();
            self.current = (self.current + len - 1) % len;
        }
        self.current
    }

    /// "current/total" as shown in the editor, 1-based; `0/0` without matches.
    pub fn counter_label(&self) -> String {
        if self.matches.is_empty() {
            "0/0".to_string()
        } else {
            format!("{}/{}", self.current + 1, self.matches.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_occurrence_left_to_right() {
        let mut matcher = SearchMatcher::new("the cat sat on the mat", "at");
        assert_eq!(matcher.offsets(), vec![5, 9, 20]);
        assert_eq!(matcher.current(), 0);
        assert_eq!(matcher.next(), 1);
        assert_eq!(matcher.next(), 2);
        assert_eq!(matcher.next(), 0);
        assert_eq!(matcher.previous(), 2);
        assert_eq!(matcher.counter_label(), "3/3");
    }

    #[test]
    fn pattern_characters_are_literal() {
        let matcher = SearchMatcher::new("cost: $5.00 (approx) or 5x00", "5.00");
        assert_eq!(matcher.offsets(), vec![7]);

        let matcher = SearchMatcher::new("a (b) [c]", "(b)");
        assert_eq!(matcher.offsets(), vec![2]);
    }

    #[test]
    fn case_insensitive_and_non_overlapping() {
        let matcher = SearchMatcher::new("AaAa", "aa");
        assert_eq!(matcher.offsets(), vec![0, 2]);
    }

    #[test]
    fn empty_inputs_yield_no_matches() {
        let mut matcher = SearchMatcher::new("", "x");
        assert!(matcher.is_empty());
        assert_eq!(matcher.next(), 0);
        assert_eq!(matcher.previous(), 0);

        let matcher = SearchMatcher::new("content", "");
        assert_eq!(matcher.count(), 0);
        assert_eq!(matcher.counter_label(), "0/0");
    }

    #[test]
    fn rederive_resets_cursor_and_tolerates_no_match() {
        let mut matcher = SearchMatcher::new("one two one", "one");
        matcher.next();
        assert_eq!(matcher.current(), 1);

        matcher.rederive("one two one three", "one");
        assert_eq!(matcher.current(), 0);
        assert_eq!(matcher.count(), 2);

        matcher.rederive("nothing here", "one");
        assert_eq!(matcher.count(), 0);
        assert_eq!(matcher.current_range(), None);
    }
}
