use unicode_segmentation::UnicodeSegmentation;

use crate::ai::AiAction;
use crate::model::{CategoryId, NoteId};
use crate::search::SearchMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    List,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Content,
}

#[derive(Debug, Clone, Default)]
pub struct NewCategoryOverlay {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmDeleteCategory {
    pub category_id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct ConfirmPurge {
    pub note_id: NoteId,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MenuOverlay {
    pub selected: usize,
}

impl MenuOverlay {
    pub fn move_selection(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(len) as usize;
    }
}

pub const SETTINGS_ROWS: usize = 2;

#[derive(Debug, Clone)]
pub enum OverlayState {
    NewCategory(NewCategoryOverlay),
    DeleteCategory(ConfirmDeleteCategory),
    Purge(ConfirmPurge),
    EmptyTrash,
    Settings(MenuOverlay),
    AiMenu(MenuOverlay),
}

/// Grapheme-aware single-field text buffer. Byte offsets throughout.
#[derive(Debug, Clone)]
pub struct EditorState {
    note_id: NoteId,
    field: EditorField,
    buffer: String,
    cursor: usize,
    preferred_column: Option<usize>,
}

impl EditorState {
    pub fn new(note_id: NoteId, field: EditorField, buffer: String) -> Self {
        let cursor = buffer.len();
        Self {
            note_id,
            field,
            buffer,
            cursor,
            preferred_column: None,
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn field(&self) -> EditorField {
        self.field
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Place the cursor at `offset`, snapped back to a char boundary.
    pub fn set_cursor(&mut self, offset: usize) {
        let mut offset = offset.min(self.buffer.len());
        while !self.buffer.is_char_boundary(offset) {
            offset -= 1;
        }
        self.cursor = offset;
        self.preferred_column = None;
    }

    /// Swap in text that changed underneath the editor (e.g. an AI result).
    pub fn replace_buffer(&mut self, buffer: String) {
        self.buffer = buffer;
        let cursor = self.cursor;
        self.set_cursor(cursor);
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut scratch = [0u8; 4];
        let encoded = ch.encode_utf8(&mut scratch);
        self.buffer.insert_str(self.cursor, encoded);
        self.cursor += encoded.len();
        self.preferred_column = None;
        true
    }

    pub fn insert_newline(&mut self) -> bool {
        self.buffer.insert(self.cursor, '\n');
        self.cursor += 1;
        self.preferred_column = Some(0);
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let prev = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.buffer.drain(prev..self.cursor);
        self.cursor = prev;
        self.preferred_column = None;
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.buffer.len() {
            return false;
        }
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.buffer.drain(self.cursor..next);
        self.preferred_column = None;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor = prev_grapheme_boundary(&self.buffer, self.cursor);
        self.preferred_column = None;
        true
    }

    pub fn move_right(&mut self) -> bool {
        let next = next_grapheme_boundary(&self.buffer, self.cursor);
        if next == self.cursor {
            return false;
        }
        self.cursor = next;
        self.preferred_column = None;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let start = line_start(&self.buffer, self.cursor);
        if self.cursor == start {
            return false;
        }
        self.cursor = start;
        self.preferred_column = Some(0);
        true
    }

    pub fn move_end(&mut self) -> bool {
        let end = line_end(&self.buffer, self.cursor);
        if self.cursor == end {
            return false;
        }
        self.cursor = end;
        self.preferred_column = Some(column_at(
            &self.buffer,
            line_start(&self.buffer, self.cursor),
            self.cursor,
        ));
        true
    }

    pub fn move_up(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        if current_line_start == 0 {
            if self.cursor == 0 {
                return false;
            }
            self.cursor = 0;
            self.preferred_column = Some(column);
            return true;
        }
        let prev_line_start = line_start(&self.buffer, current_line_start - 1);
        self.cursor = position_for_column(&self.buffer, prev_line_start, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn move_down(&mut self) -> bool {
        let current_line_start = line_start(&self.buffer, self.cursor);
        let column = self
            .preferred_column
            .unwrap_or_else(|| column_at(&self.buffer, current_line_start, self.cursor));
        let current_line_end = line_end(&self.buffer, self.cursor);
        if current_line_end == self.buffer.len() {
            if self.cursor == self.buffer.len() {
                return false;
            }
            self.cursor = self.buffer.len();
            self.preferred_column = Some(column);
            return true;
        }
        self.cursor = position_for_column(&self.buffer, current_line_end + 1, column);
        self.preferred_column = Some(column);
        true
    }

    pub fn move_word_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let mut idx = self.cursor;
        while idx > 0 {
            let prev = prev_grapheme_boundary(&self.buffer, idx);
            if !self.buffer[prev..idx].trim().is_empty() {
                break;
            }
            idx = prev;
        }
        while idx > 0 {
            let prev = prev_grapheme_boundary(&self.buffer, idx);
            if self.buffer[prev..idx].trim().is_empty() {
                break;
            }
            idx = prev;
        }
        self.cursor = idx;
        self.preferred_column = None;
        true
    }

    pub fn move_word_right(&mut self) -> bool {
        let len = self.buffer.len();
        let mut idx = self.cursor;
        while idx < len {
            let next = next_grapheme_boundary(&self.buffer, idx);
            if self.buffer[idx..next].trim().is_empty() {
                break;
            }
            idx = next;
        }
        while idx < len {
            let next = next_grapheme_boundary(&self.buffer, idx);
            if !self.buffer[idx..next].trim().is_empty() {
                break;
            }
            idx = next;
        }
        if idx == self.cursor {
            return false;
        }
        self.cursor = idx;
        self.preferred_column = None;
        true
    }
}

/// View state of the terminal front-end. Note data itself lives in the
/// [`Store`](crate::store::Store).
#[derive(Debug)]
pub struct AppState {
    pub focus: FocusPane,
    pub search_active: bool,
    pub status_message: Option<String>,
    pub overlay: Option<OverlayState>,
    pub editor: Option<EditorState>,
    pub matcher: SearchMatcher,
    matched_against: Option<(NoteId, String, String)>,
    pub ai_pending: Option<(NoteId, AiAction)>,
    pub focus_mode: bool,
    pub preview_chars: usize,
}

impl AppState {
    pub fn new(preview_chars: usize) -> Self {
        Self {
            focus: FocusPane::List,
            search_active: false,
            status_message: None,
            overlay: None,
            editor: None,
            matcher: SearchMatcher::default(),
            matched_against: None,
            ai_pending: None,
            focus_mode: false,
            preview_chars,
        }
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn open_overlay(&mut self, overlay: OverlayState) {
        self.overlay = Some(overlay);
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut EditorState> {
        self.editor.as_mut()
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_some()
    }

    pub fn begin_editor(&mut self, note_id: NoteId, field: EditorField, text: String) {
        self.editor = Some(EditorState::new(note_id, field, text));
        self.focus = FocusPane::Editor;
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
        if self.focus == FocusPane::Editor {
            self.focus = FocusPane::List;
        }
    }

    pub fn cycle_focus(&mut self) {
        self.focus = match (self.focus, self.focus_mode) {
            (_, true) => FocusPane::Editor,
            (FocusPane::Sidebar, false) => FocusPane::List,
            (FocusPane::List, false) => FocusPane::Editor,
            (FocusPane::Editor, false) => FocusPane::Sidebar,
        };
    }

    pub fn toggle_focus_mode(&mut self) -> bool {
        self.focus_mode = !self.focus_mode;
        self.focus = if self.focus_mode {
            FocusPane::Editor
        } else {
            FocusPane::List
        };
        self.focus_mode
    }

    /// Rescan for matches when the note, its content, or the query changed
    /// since the last scan. An unchanged input keeps the cursor where it is.
    pub fn sync_matcher(&mut self, note: Option<(&str, &str)>, query: &str) {
        let query = query.trim();
        let key = note.map(|(id, content)| (id.to_string(), content.to_string(), query.to_string()));
        if key == self.matched_against {
            return;
        }
        match note {
            Some((_, content)) => self.matcher.rederive(content, query),
            None => self.matcher.rederive("", query),
        }
        self.matched_against = key;
    }

    pub fn ai_in_flight(&self) -> bool {
        self.ai_pending.is_some()
    }
}

fn prev_grapheme_boundary(text: &str, cursor: usize) -> usize {
    text[..cursor]
        .grapheme_indices(true)
        .last()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_grapheme_boundary(text: &str, cursor: usize) -> usize {
    if cursor >= text.len() {
        return text.len();
    }
    text[cursor..]
        .graphemes(true)
        .next()
        .map(|grapheme| cursor + grapheme.len())
        .unwrap_or(text.len())
}

fn line_start(text: &str, cursor: usize) -> usize {
    text[..cursor].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn line_end(text: &str, cursor: usize) -> usize {
    text[cursor..]
        .find('\n')
        .map(|idx| cursor + idx)
        .unwrap_or(text.len())
}

fn column_at(text: &str, line_start: usize, cursor: usize) -> usize {
    text[line_start..cursor].graphemes(true).count()
}

fn position_for_column(text: &str, line_start: usize, column: usize) -> usize {
    let line_end = line_end(text, line_start);
    let mut position = line_start;
    for grapheme in text[line_start..line_end].graphemes(true).take(column) {
        position += grapheme.len();
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor(text: &str) -> EditorState {
        EditorState::new("n".into(), EditorField::Content, text.to_string())
    }

    #[test]
    fn backspace_removes_whole_grapheme() {
        let mut editor = editor("cafe\u{301}");
        assert!(editor.backspace());
        assert_eq!(editor.buffer(), "caf");
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn word_navigation_skips_whitespace() {
        let mut editor = editor("alpha  beta");
        assert!(editor.move_word_left());
        assert_eq!(editor.cursor(), 7);
        assert!(editor.move_word_left());
        assert_eq!(editor.cursor(), 0);
        assert!(editor.move_word_right());
        assert_eq!(editor.cursor(), 7);
    }

    #[test]
    fn vertical_moves_keep_preferred_column() {
        let mut editor = editor("abcdef\nxy\nlonger line");
        editor.set_cursor(5);
        assert!(editor.move_down());
        assert_eq!(editor.cursor(), 9);
        assert!(editor.move_down());
        assert_eq!(editor.cursor(), 15);
        assert!(editor.move_up());
        assert!(editor.move_up());
        assert_eq!(editor.cursor(), 5);
    }

    #[test]
    fn set_cursor_snaps_to_char_boundary() {
        let mut editor = editor("日本語");
        editor.set_cursor(4);
        assert_eq!(editor.cursor(), 3);
        editor.replace_buffer("日".into());
        assert_eq!(editor.cursor(), 3);
    }

    #[test]
    fn matcher_resets_only_when_input_changes() {
        let mut state = AppState::new(80);
        state.sync_matcher(Some(("a", "one two one")), "one");
        state.matcher.next();
        state.sync_matcher(Some(("a", "one two one")), " one ");
        assert_eq!(state.matcher.current(), 1);

        state.sync_matcher(Some(("a", "one two one!")), "one");
        assert_eq!(state.matcher.current(), 0);
        assert_eq!(state.matcher.count(), 2);

        state.sync_matcher(None, "one");
        assert_eq!(state.matcher.count(), 0);
    }

    #[test]
    fn menu_selection_wraps() {
        let mut menu = MenuOverlay::default();
        menu.move_selection(-1, 4);
        assert_eq!(menu.selected, 3);
        menu.move_selection(1, 4);
        assert_eq!(menu.selected, 0);
    }
}
