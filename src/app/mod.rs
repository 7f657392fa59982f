use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use ratatui::Terminal;
use strum::IntoEnumIterator;

use crate::ai::{self, AiAction, AiRequest, ApplyStatus, TextGenerator};
use crate::config::AppConfig;
use crate::model::{CategoryFilter, CategoryId, NotePatch};
use crate::store::{Preconfirmed, Store};
use crate::ui;

mod actions;
pub mod state;

pub use actions::AiDispatcher;
pub use state::{
    AppState, ConfirmDeleteCategory, ConfirmPurge, EditorField, EditorState, FocusPane,
    MenuOverlay, NewCategoryOverlay, OverlayState, SETTINGS_ROWS,
};

/// Minimum trimmed length before the AI menu is offered.
const AI_MENU_MIN_CHARS: usize = 5;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    CycleFocus,
    NewNote,
    EditTitle,
    EditContent,
    StartSearch,
    TogglePin,
    DeleteNote,
    RestoreNote,
    ToggleTrashView,
    EmptyTrash,
    NewCategory,
    DeleteCategory,
    NextMatch,
    PreviousMatch,
    ShowAiMenu,
    ShowSettings,
    ToggleFocusMode,
}

/// One row of the category sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEntry {
    All,
    Category(CategoryId),
    Trash,
}

pub fn sidebar_entries(store: &Store) -> Vec<SidebarEntry> {
    let mut entries = Vec::with_capacity(store.categories().len() + 2);
    entries.push(SidebarEntry::All);
    entries.extend(store.category_ids().cloned().map(SidebarEntry::Category));
    entries.push(SidebarEntry::Trash);
    entries
}

pub fn current_sidebar_index(store: &Store, entries: &[SidebarEntry]) -> usize {
    let view = store.view();
    let current = if view.trash_view {
        SidebarEntry::Trash
    } else {
        match &view.category {
            CategoryFilter::All => SidebarEntry::All,
            CategoryFilter::Category(id) => SidebarEntry::Category(id.clone()),
        }
    };
    entries
        .iter()
        .position(|entry| *entry == current)
        .unwrap_or(0)
}

fn is_plain(key: &KeyEvent) -> bool {
    !key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

pub struct App {
    pub config: Arc<AppConfig>,
    store: Store,
    state: AppState,
    ai: AiDispatcher,
    list_state: ListState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: Store, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let state = AppState::new(config.ui.preview_chars);
        let ai = AiDispatcher::new(generator).context("initialising AI dispatcher")?;
        let tick_rate = config.ui.tick_rate();
        let mut app = Self {
            config,
            store,
            state,
            ai,
            list_state: ListState::default(),
            should_quit: false,
            tick_rate,
        };
        app.select_first_visible();
        Ok(app)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            self.list_state.select(self.selected_index());
            terminal
                .draw(|frame| ui::draw_app(frame, &self.store, &self.state, &mut self.list_state))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            let timeout = self
                .tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(0));

            if event::poll(timeout).context("polling for terminal events")? {
                if let Event::Key(key) = event::read().context("reading terminal event")? {
                    self.handle_key(key);
                }
            }

            if last_tick.elapsed() >= self.tick_rate {
                self.on_tick();
                last_tick = Instant::now();
            }
        }
        Ok(())
    }

    fn selected_index(&self) -> Option<usize> {
        let active = self.store.active_note_id()?;
        self.store
            .visible_notes()
            .iter()
            .position(|note| note.id == active)
    }

    fn select_first_visible(&mut self) {
        let first = self.store.visible_notes().first().map(|note| note.id.clone());
        self.store.select_note(first.as_deref());
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if self.state.overlay().is_some() {
            self.handle_overlay_key(key);
        } else if self.state.is_editing() {
            if !self.handle_editor_key(key) && ctrl_c {
                self.should_quit = true;
            }
        } else if !(self.state.search_active && self.handle_search_key(key)) {
            if let Some(action) = self.map_key(key) {
                self.handle_action(action);
            }
        }
        self.sync_matcher();
    }

    fn map_key(&self, key: KeyEvent) -> Option<Action> {
        let action = match key.code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
            KeyCode::Char('j') | KeyCode::Down => Action::SelectNext,
            KeyCode::Char('k') | KeyCode::Up => Action::SelectPrevious,
            KeyCode::Tab => Action::CycleFocus,
            KeyCode::Char('a') if is_plain(&key) => Action::NewNote,
            KeyCode::Char('r') if is_plain(&key) => Action::EditTitle,
            KeyCode::Char('e') | KeyCode::Enter if is_plain(&key) => Action::EditContent,
            KeyCode::Char('/') if is_plain(&key) => Action::StartSearch,
            KeyCode::Char('p') if is_plain(&key) => Action::TogglePin,
            KeyCode::Char('d') if is_plain(&key) => Action::DeleteNote,
            KeyCode::Char('u') if is_plain(&key) => Action::RestoreNote,
            KeyCode::Char('T') => Action::ToggleTrashView,
            KeyCode::Char('E') => Action::EmptyTrash,
            KeyCode::Char('c') if is_plain(&key) => Action::NewCategory,
            KeyCode::Char('x') if is_plain(&key) => Action::DeleteCategory,
            KeyCode::Char('n') if is_plain(&key) => Action::NextMatch,
            KeyCode::Char('N') => Action::PreviousMatch,
            KeyCode::Char('i') if is_plain(&key) => Action::ShowAiMenu,
            KeyCode::Char('s') if is_plain(&key) => Action::ShowSettings,
            KeyCode::Char('f') if is_plain(&key) => Action::ToggleFocusMode,
            _ => return None,
        };
        Some(action)
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.move_selection(1),
            Action::SelectPrevious => self.move_selection(-1),
            Action::CycleFocus => self.state.cycle_focus(),
            Action::NewNote => self.handle_new_note(),
            Action::EditTitle => self.handle_edit(EditorField::Title),
            Action::EditContent => self.handle_edit(EditorField::Content),
            Action::StartSearch => {
                self.state.search_active = true;
                self.state
                    .set_status_message(Some("Search: type to filter • Enter keep • Esc clear"));
            }
            Action::TogglePin => self.handle_toggle_pin(),
            Action::DeleteNote => self.handle_delete_note(),
            Action::RestoreNote => self.handle_restore_note(),
            Action::ToggleTrashView => self.handle_toggle_trash_view(),
            Action::EmptyTrash => self.handle_empty_trash(),
            Action::NewCategory => {
                self.state
                    .open_overlay(OverlayState::NewCategory(NewCategoryOverlay::default()));
            }
            Action::DeleteCategory => self.handle_delete_category(),
            Action::NextMatch => self.step_match(true),
            Action::PreviousMatch => self.step_match(false),
            Action::ShowAiMenu => self.handle_show_ai_menu(),
            Action::ShowSettings => {
                self.state
                    .open_overlay(OverlayState::Settings(MenuOverlay::default()));
            }
            Action::ToggleFocusMode => {
                let enabled = self.state.toggle_focus_mode();
                let message = if enabled {
                    "Focus mode on"
                } else {
                    "Focus mode off"
                };
                self.state.set_status_message(Some(message));
            }
        }
    }

    fn on_tick(&mut self) {
        while let Some(outcome) = self.ai.try_recv() {
            let note_id = outcome.note_id.clone();
            let action = outcome.action;
            self.state.ai_pending = None;
            match ai::apply(&mut self.store, outcome) {
                Ok(ApplyStatus::Applied) => {
                    self.reload_editor(&note_id);
                    let label = action.label(self.store.strings());
                    self.state.set_status_message(Some(format!("{label}: done")));
                }
                Ok(ApplyStatus::Discarded | ApplyStatus::Skipped) => {}
                Err(err) => {
                    tracing::error!(?err, id = %note_id, %action, "ai request failed");
                    self.state
                        .set_status_message(Some(self.store.strings().ai_error));
                }
            }
        }
        self.sync_matcher();
    }

    fn sync_matcher(&mut self) {
        let note = self
            .store
            .active_note()
            .map(|note| (note.id.as_str(), note.content.as_str()));
        self.state
            .sync_matcher(note, &self.store.view().search_query);
    }

    fn move_selection(&mut self, delta: isize) {
        match self.state.focus {
            FocusPane::Sidebar => {
                let entries = sidebar_entries(&self.store);
                let current = current_sidebar_index(&self.store, &entries) as isize;
                let next = (current + delta).clamp(0, entries.len() as isize - 1) as usize;
                match &entries[next] {
                    SidebarEntry::All => self.store.select_category(CategoryFilter::All),
                    SidebarEntry::Category(id) => self
                        .store
                        .select_category(CategoryFilter::Category(id.clone())),
                    SidebarEntry::Trash => self.store.set_trash_view(true),
                }
                self.select_first_visible();
            }
            FocusPane::List | FocusPane::Editor => {
                let visible: Vec<String> = self
                    .store
                    .visible_notes()
                    .iter()
                    .map(|note| note.id.clone())
                    .collect();
                if visible.is_empty() {
                    return;
                }
                let next = match self.selected_index() {
                    Some(idx) => (idx as isize + delta).clamp(0, visible.len() as isize - 1),
                    None => 0,
                } as usize;
                self.store.select_note(Some(&visible[next]));
            }
        }
    }

    fn handle_new_note(&mut self) {
        let note = self.store.create_note();
        self.state
            .begin_editor(note.id, EditorField::Title, String::new());
        self.state.set_status_message(Some(
            "New note: type a title • Enter to body • Tab switch field • Esc done",
        ));
    }

    fn handle_edit(&mut self, field: EditorField) {
        let Some(note) = self.store.active_note() else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        if note.is_trashed() {
            self.state
                .set_status_message(Some(self.store.strings().note_in_trash));
            return;
        }
        let text = match field {
            EditorField::Title => note.title.clone(),
            EditorField::Content => note.content.clone(),
        };
        let id = note.id.clone();
        self.state.begin_editor(id, field, text);
        self.state
            .set_status_message(Some("Editing • Tab switch field • Ctrl-n/p matches • Esc done"));
    }

    fn handle_toggle_pin(&mut self) {
        let Some(id) = self.store.active_note_id().map(str::to_string) else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        if !self.store.toggle_pin(&id) {
            self.state
                .set_status_message(Some("Trashed notes cannot be pinned"));
            return;
        }
        let pinned = self.store.note(&id).map(|n| n.is_pinned).unwrap_or(false);
        let message = if pinned { "Note pinned" } else { "Note unpinned" };
        self.state.set_status_message(Some(message));
    }

    fn handle_delete_note(&mut self) {
        let Some(note) = self.store.active_note() else {
            self.state.set_status_message(Some("No note selected"));
            return;
        };
        if note.is_trashed() {
            let title = note.display_title(self.store.strings()).to_string();
            let note_id = note.id.clone();
            self.state
                .open_overlay(OverlayState::Purge(ConfirmPurge { note_id, title }));
            return;
        }
        let id = note.id.clone();
        if self.state.editor().map(|e| e.note_id() == id).unwrap_or(false) {
            self.state.close_editor();
        }
        self.store.move_to_trash(&id);
        self.select_first_visible();
        self.state.set_status_message(Some("Note moved to trash"));
    }

    fn handle_restore_note(&mut self) {
        let Some(id) = self
            .store
            .active_note()
            .filter(|note| note.is_trashed())
            .map(|note| note.id.clone())
        else {
            self.state
                .set_status_message(Some("Select a trashed note to restore"));
            return;
        };
        self.store.restore_note(&id);
        self.state.set_status_message(Some("Note restored"));
    }

    fn handle_toggle_trash_view(&mut self) {
        self.state.close_editor();
        self.store.toggle_trash_view();
        self.select_first_visible();
        if self.store.view().trash_view {
            self.state.set_status_message(Some(
                "Trash view: j/k browse • u restore • d delete forever • E empty • T exit",
            ));
        } else {
            self.state.set_status_message(Some("Back to active notes"));
        }
    }

    fn handle_empty_trash(&mut self) {
        if self.store.trash_count() == 0 {
            self.state
                .set_status_message(Some(self.store.strings().trash_empty));
            return;
        }
        self.state.open_overlay(OverlayState::EmptyTrash);
    }

    fn handle_delete_category(&mut self) {
        let Some(category) = self
            .store
            .view()
            .category
            .category_id()
            .filter(|_| !self.store.view().trash_view)
            .and_then(|id| self.store.category(id))
        else {
            self.state
                .set_status_message(Some("Select a category in the sidebar first"));
            return;
        };
        let overlay = ConfirmDeleteCategory {
            category_id: category.id.clone(),
            name: category.name.clone(),
        };
        self.state.open_overlay(OverlayState::DeleteCategory(overlay));
    }

    fn handle_show_ai_menu(&mut self) {
        if self.state.ai_in_flight() {
            self.state
                .set_status_message(Some(self.store.strings().ai_working));
            return;
        }
        let eligible = self
            .store
            .active_note()
            .map(|note| {
                !note.is_trashed() && note.content.trim().chars().count() > AI_MENU_MIN_CHARS
            })
            .unwrap_or(false);
        if !eligible {
            self.state
                .set_status_message(Some("Write a little more before asking the AI"));
            return;
        }
        self.state
            .open_overlay(OverlayState::AiMenu(MenuOverlay::default()));
    }

    fn step_match(&mut self, forward: bool) {
        if self.state.matcher.is_empty() {
            self.state.set_status_message(Some("No matches"));
            return;
        }
        if forward {
            self.state.matcher.next();
        } else {
            self.state.matcher.previous();
        }
        let range = self.state.matcher.current_range();
        if let (Some(range), Some(editor)) = (range, self.state.editor_mut()) {
            if editor.field() == EditorField::Content {
                editor.set_cursor(range.start);
            }
        }
        let label = self.state.matcher.counter_label();
        self.state.set_status_message(Some(format!("Match {label}")));
    }

    fn start_ai_action(&mut self, action: AiAction) {
        let language = self.store.settings().language;
        let Some(request) = self
            .store
            .active_note()
            .and_then(|note| AiRequest::prepare(note, action, language))
        else {
            return;
        };
        self.state.ai_pending = Some((request.note_id.clone(), action));
        self.ai.dispatch(request);
        self.state
            .set_status_message(Some(self.store.strings().ai_working));
    }

    fn reload_editor(&mut self, note_id: &str) {
        let Some(note) = self.store.note(note_id) else {
            return;
        };
        if let Some(editor) = self.state.editor_mut() {
            if editor.note_id() == note_id {
                let text = match editor.field() {
                    EditorField::Title => note.title.clone(),
                    EditorField::Content => note.content.clone(),
                };
                editor.replace_buffer(text);
            }
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) {
        let Some(overlay) = self.state.overlay.clone() else {
            return;
        };
        match overlay {
            OverlayState::NewCategory(mut draft) => match key.code {
                KeyCode::Esc => self.state.close_overlay(),
                KeyCode::Enter => match self.store.add_category(&draft.name) {
                    Some(category) => {
                        self.state.close_overlay();
                        self.select_first_visible();
                        self.state
                            .set_status_message(Some(format!("Category '{}' created", category.name)));
                    }
                    None => {
                        self.state
                            .set_status_message(Some("Category name cannot be empty"));
                    }
                },
                KeyCode::Backspace => {
                    draft.name.pop();
                    self.state.open_overlay(OverlayState::NewCategory(draft));
                }
                KeyCode::Char(ch) if is_plain(&key) => {
                    if draft.name.chars().count() < 60 {
                        draft.name.push(ch);
                    }
                    self.state.open_overlay(OverlayState::NewCategory(draft));
                }
                _ => {}
            },
            OverlayState::DeleteCategory(confirm) => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.state.close_overlay();
                    if self.store.delete_category(&confirm.category_id) {
                        self.select_first_visible();
                        self.state
                            .set_status_message(Some(format!("Category '{}' deleted", confirm.name)));
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.state.close_overlay(),
                _ => {}
            },
            OverlayState::Purge(confirm) => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.state.close_overlay();
                    self.store.permanently_delete(&confirm.note_id);
                    self.select_first_visible();
                    self.state
                        .set_status_message(Some(format!("'{}' deleted forever", confirm.title)));
                }
                KeyCode::Char('n') | KeyCode::Esc => self.state.close_overlay(),
                _ => {}
            },
            OverlayState::EmptyTrash => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.state.close_overlay();
                    self.state.close_editor();
                    if let Some(removed) = self.store.empty_trash(&mut Preconfirmed) {
                        self.state
                            .set_status_message(Some(format!("Removed {removed} note(s) from trash")));
                    }
                }
                KeyCode::Char('n') | KeyCode::Esc => self.state.close_overlay(),
                _ => {}
            },
            OverlayState::Settings(mut menu) => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => self.state.close_overlay(),
                KeyCode::Char('j') | KeyCode::Down => {
                    menu.move_selection(1, SETTINGS_ROWS);
                    self.state.open_overlay(OverlayState::Settings(menu));
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    menu.move_selection(-1, SETTINGS_ROWS);
                    self.state.open_overlay(OverlayState::Settings(menu));
                }
                KeyCode::Enter | KeyCode::Char(' ') => match menu.selected {
                    0 => self.store.toggle_dark_mode(),
                    _ => {
                        let next = self.store.settings().language.next();
                        self.store.set_language(next);
                    }
                },
                _ => {}
            },
            OverlayState::AiMenu(mut menu) => {
                let actions: Vec<AiAction> = AiAction::iter().collect();
                match key.code {
                    KeyCode::Esc => self.state.close_overlay(),
                    KeyCode::Char('j') | KeyCode::Down => {
                        menu.move_selection(1, actions.len());
                        self.state.open_overlay(OverlayState::AiMenu(menu));
                    }
                    KeyCode::Char('k') | KeyCode::Up => {
                        menu.move_selection(-1, actions.len());
                        self.state.open_overlay(OverlayState::AiMenu(menu));
                    }
                    KeyCode::Enter => {
                        self.state.close_overlay();
                        if let Some(action) = actions.get(menu.selected).copied() {
                            self.start_ai_action(action);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        let mut query = self.store.view().search_query.clone();
        match key.code {
            KeyCode::Esc => {
                self.state.search_active = false;
                query.clear();
            }
            KeyCode::Enter => {
                self.state.search_active = false;
                return true;
            }
            KeyCode::Backspace => {
                query.pop();
            }
            KeyCode::Char(ch) if is_plain(&key) => query.push(ch),
            _ => return false,
        }
        self.store.set_search_query(query);
        if self.selected_index().is_none() {
            self.select_first_visible();
        }
        true
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('n') => {
                    self.step_match(true);
                    return true;
                }
                KeyCode::Char('p') => {
                    self.step_match(false);
                    return true;
                }
                KeyCode::Left => {
                    if let Some(editor) = self.state.editor_mut() {
                        editor.move_word_left();
                    }
                    return true;
                }
                KeyCode::Right => {
                    if let Some(editor) = self.state.editor_mut() {
                        editor.move_word_right();
                    }
                    return true;
                }
                _ => return false,
            }
        }

        let field = self.state.editor().map(|editor| editor.field());
        match key.code {
            KeyCode::Esc => {
                self.state.close_editor();
                self.state.set_status_message(Some("Done editing"));
            }
            KeyCode::Tab => self.switch_editor_field(),
            KeyCode::Enter if field == Some(EditorField::Title) => self.switch_editor_field(),
            KeyCode::Enter => {
                self.apply_editor_change(|editor| editor.insert_newline());
            }
            KeyCode::Backspace => {
                self.apply_editor_change(|editor| editor.backspace());
            }
            KeyCode::Delete => {
                self.apply_editor_change(|editor| editor.delete());
            }
            KeyCode::Char(ch) if is_plain(&key) => {
                self.apply_editor_change(|editor| editor.insert_char(ch));
            }
            KeyCode::Left => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_left();
                }
            }
            KeyCode::Right => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_right();
                }
            }
            KeyCode::Up => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_up();
                }
            }
            KeyCode::Down => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_down();
                }
            }
            KeyCode::Home => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_home();
                }
            }
            KeyCode::End => {
                if let Some(editor) = self.state.editor_mut() {
                    editor.move_end();
                }
            }
            _ => return false,
        }
        true
    }

    fn switch_editor_field(&mut self) {
        let Some(editor) = self.state.editor() else {
            return;
        };
        let id = editor.note_id().to_string();
        let next = match editor.field() {
            EditorField::Title => EditorField::Content,
            EditorField::Content => EditorField::Title,
        };
        let Some(note) = self.store.note(&id) else {
            self.state.close_editor();
            return;
        };
        let text = match next {
            EditorField::Title => note.title.clone(),
            EditorField::Content => note.content.clone(),
        };
        self.state.begin_editor(id, next, text);
    }

    /// Apply an edit to the buffer and write it straight through to the store.
    fn apply_editor_change<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut EditorState) -> bool,
    {
        let Some(editor) = self.state.editor_mut() else {
            return false;
        };
        if !f(editor) {
            return false;
        }
        let id = editor.note_id().to_string();
        let text = editor.buffer().to_string();
        let patch = match editor.field() {
            EditorField::Title => NotePatch::title(text),
            EditorField::Content => NotePatch::content(text),
        };
        if !self.store.update_note(&id, patch) {
            tracing::warn!(id = %id, "edited note no longer exists");
            self.state.close_editor();
            return false;
        }
        true
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
