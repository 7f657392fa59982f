use std::ops::Range;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;
use regex::Regex;
use strum::IntoEnumIterator;
use time::{macros::format_description, OffsetDateTime};
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::ai::AiAction;
use crate::app::state::{AppState, EditorField, EditorState, FocusPane, OverlayState};
use crate::app::{current_sidebar_index, sidebar_entries, SidebarEntry};
use crate::model::{CategoryFilter, Language};
use crate::store::Store;

pub mod theme;

pub use theme::Palette;

pub fn draw_app(frame: &mut Frame, store: &Store, state: &AppState, list_state: &mut ListState) {
    let palette = Palette::for_mode(store.settings().dark_mode);
    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        frame.size(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.size());

    let highlight_regex = store.view().query_regex();

    if state.focus_mode {
        render_editor(frame, vertical[0], store, state, &palette);
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(24),
                Constraint::Percentage(35),
                Constraint::Min(20),
            ])
            .split(vertical[0]);
        render_sidebar(frame, columns[0], store, state, &palette);
        render_note_list(
            frame,
            columns[1],
            store,
            state,
            list_state,
            highlight_regex.as_ref(),
            &palette,
        );
        render_editor(frame, columns[2], store, state, &palette);
    }

    let status = build_status_line(store, state, &palette);
    frame.render_widget(Paragraph::new(status), vertical[1]);

    render_overlay(frame, store, state, &palette);
}

fn pane_block<'a>(title: impl Into<Line<'a>>, focused: bool, palette: &Palette) -> Block<'a> {
    let border = if focused {
        Style::default().fg(palette.accent)
    } else {
        Style::default().fg(palette.muted)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
}

fn render_sidebar(frame: &mut Frame, area: Rect, store: &Store, state: &AppState, palette: &Palette) {
    let strings = store.strings();
    let entries = sidebar_entries(store);
    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let (label, count, style) = match entry {
                SidebarEntry::All => (
                    strings.all_notes.to_string(),
                    active_count(store, &CategoryFilter::All),
                    Style::default(),
                ),
                SidebarEntry::Category(id) => (
                    store.category_name(id).unwrap_or(id).to_string(),
                    active_count(store, &CategoryFilter::Category(id.clone())),
                    Style::default(),
                ),
                SidebarEntry::Trash => (
                    strings.trash.to_string(),
                    store.trash_count(),
                    Style::default().fg(palette.danger),
                ),
            };
            ListItem::new(Line::from(vec![
                Span::styled(label, style),
                Span::styled(format!(" ({count})"), Style::default().fg(palette.muted)),
            ]))
        })
        .collect();

    let mut sidebar_state =
        ListState::default().with_selected(Some(current_sidebar_index(store, &entries)));
    let list = List::new(items)
        .block(pane_block(
            strings.app_name,
            state.focus == FocusPane::Sidebar,
            palette,
        ))
        .highlight_style(
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, &mut sidebar_state);
}

fn active_count(store: &Store, filter: &CategoryFilter) -> usize {
    store
        .notes()
        .iter()
        .filter(|note| !note.is_trashed() && filter.admits(note))
        .count()
}

fn render_note_list(
    frame: &mut Frame,
    area: Rect,
    store: &Store,
    state: &AppState,
    list_state: &mut ListState,
    regex: Option<&Regex>,
    palette: &Palette,
) {
    let strings = store.strings();
    let highlight_style = Style::default()
        .fg(palette.highlight)
        .add_modifier(Modifier::BOLD);
    let visible = store.visible_notes();

    let mut items = Vec::with_capacity(visible.len());
    for note in &visible {
        let mut title_spans = Vec::new();
        if note.is_pinned {
            title_spans.push(Span::styled(
                "★ ",
                Style::default().fg(palette.pin).add_modifier(Modifier::BOLD),
            ));
        }
        title_spans.extend(highlight_line(
            note.display_title(strings),
            regex,
            highlight_style,
            Style::default().add_modifier(Modifier::BOLD),
        ));

        let mut meta = format_timestamp(note.updated_at);
        if let Some(name) = note
            .category_id
            .as_deref()
            .and_then(|id| store.category_name(id))
        {
            meta.push_str(" • ");
            meta.push_str(name);
        }

        let preview = preview_snippet(&note.content, state.preview_chars);
        items.push(ListItem::new(vec![
            Line::from(title_spans),
            Line::from(Span::styled(meta, Style::default().fg(palette.muted))),
            Line::from(highlight_line(&preview, regex, highlight_style, Style::default())),
        ]));
    }
    if items.is_empty() {
        let empty = if store.view().trash_view {
            strings.trash_empty
        } else {
            strings.no_notes
        };
        items.push(ListItem::new(Span::styled(
            empty,
            Style::default().fg(palette.muted),
        )));
    }

    let title = if store.view().trash_view {
        strings.trash
    } else {
        match &store.view().category {
            CategoryFilter::All => strings.all_notes,
            CategoryFilter::Category(id) => store.category_name(id).unwrap_or(strings.all_notes),
        }
    };
    let list = List::new(items)
        .block(pane_block(title, state.focus == FocusPane::List, palette))
        .highlight_style(
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, area, list_state);
}

fn render_editor(frame: &mut Frame, area: Rect, store: &Store, state: &AppState, palette: &Palette) {
    let strings = store.strings();
    let focused = state.focus == FocusPane::Editor;
    let Some(note) = store.active_note() else {
        let placeholder = Paragraph::new(Span::styled(
            strings.select_note,
            Style::default().fg(palette.muted),
        ))
        .block(pane_block("Editor", focused, palette));
        frame.render_widget(placeholder, area);
        return;
    };

    let editor = state
        .editor()
        .filter(|editor| editor.note_id() == note.id);
    let title_text = match editor {
        Some(editor) if editor.field() == EditorField::Title => editor.buffer(),
        _ => note.title.as_str(),
    };
    let body_text = match editor {
        Some(editor) if editor.field() == EditorField::Content => editor.buffer(),
        _ => note.content.as_str(),
    };

    let mut lines = Vec::new();
    if note.is_trashed() {
        lines.push(Line::from(Span::styled(
            strings.note_in_trash,
            Style::default()
                .fg(palette.danger)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        )));
    }
    let title_row = lines.len() as u16;
    if title_text.is_empty() && editor.is_none() {
        lines.push(Line::from(Span::styled(
            strings.untitled,
            Style::default().fg(palette.muted).add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            title_text.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }

    let mut meta = vec![Span::styled(
        format_timestamp(note.updated_at),
        Style::default().fg(palette.muted),
    )];
    if note.is_pinned {
        meta.push(Span::styled(
            format!(" • ★ {}", strings.pinned),
            Style::default().fg(palette.pin),
        ));
    }
    if let Some(name) = note
        .category_id
        .as_deref()
        .and_then(|id| store.category_name(id))
    {
        meta.push(Span::styled(
            format!(" • {name}"),
            Style::default().fg(palette.muted),
        ));
    }
    meta.push(Span::styled(
        format!(" • {} {}", body_text.chars().count(), strings.characters),
        Style::default().fg(palette.muted),
    ));
    if store.view().normalized_query().is_some() {
        meta.push(Span::styled(
            format!(" • {}", state.matcher.counter_label()),
            Style::default().fg(palette.highlight),
        ));
    }
    lines.push(Line::from(meta));
    lines.push(Line::from(""));
    let body_row = lines.len() as u16;

    lines.extend(highlight_body(
        body_text,
        state.matcher.ranges(),
        Some(state.matcher.current()),
        Style::default(),
        Style::default()
            .fg(palette.background)
            .bg(palette.highlight),
        Style::default()
            .fg(palette.background)
            .bg(palette.current_match)
            .add_modifier(Modifier::BOLD),
    ));

    let block_title = match (editor.is_some(), state.ai_pending.as_ref()) {
        (_, Some((id, action))) if *id == note.id => {
            format!("Editor [{}: {}]", action.label(strings), strings.ai_working)
        }
        (true, _) => "Editor [EDIT]".to_string(),
        (false, _) => "Editor".to_string(),
    };
    let paragraph = Paragraph::new(Text::from(lines))
        .block(pane_block(block_title, focused, palette))
        .wrap(Wrap { trim: false });
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);

    if let Some(editor) = editor {
        let row_offset = match editor.field() {
            EditorField::Title => title_row,
            EditorField::Content => body_row,
        };
        if let Some((cursor_x, cursor_y)) = editor_cursor_screen_position(editor, area, row_offset)
        {
            frame.set_cursor(cursor_x, cursor_y);
        }
    }
}

fn build_status_line(store: &Store, state: &AppState, palette: &Palette) -> Text<'static> {
    let strings = store.strings();
    let first = match &state.status_message {
        Some(message) => Line::from(Span::raw(message.clone())),
        None => Line::from(Span::styled(
            "a new • e edit • / search • p pin • d trash • T trash view • i AI • s settings • q quit",
            Style::default().fg(palette.muted),
        )),
    };

    if state.search_active {
        let query = &store.view().search_query;
        let input = if query.is_empty() {
            Span::styled(
                format!("▌{}", strings.search_placeholder),
                Style::default().fg(palette.muted),
            )
        } else {
            Span::styled(format!("{query}▌"), Style::default().fg(palette.accent))
        };
        let second = Line::from(vec![
            Span::styled("Search: ", Style::default().add_modifier(Modifier::BOLD)),
            input,
        ]);
        return Text::from(vec![first, second]);
    }

    let visible = store.visible_notes().len();
    let total = store.notes().iter().filter(|note| !note.is_trashed()).count();
    let focus = match state.focus {
        FocusPane::Sidebar => "Sidebar",
        FocusPane::List => "List",
        FocusPane::Editor => "Editor",
    };
    let mut spans = vec![
        Span::raw(format!("Notes: {visible}/{total}")),
        Span::raw(" | Focus: "),
        Span::styled(focus, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if store.view().trash_view {
        spans.push(Span::raw(" | View: "));
        spans.push(Span::styled(
            strings.trash,
            Style::default()
                .fg(palette.danger)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ));
    }
    if let Some(query) = store.view().normalized_query() {
        spans.push(Span::raw(" | Search: "));
        spans.push(Span::styled(query, Style::default().fg(palette.accent)));
    }
    if state.ai_in_flight() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            strings.ai_working,
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::ITALIC),
        ));
    }
    Text::from(vec![
        first,
        Line::from(spans).style(Style::default().fg(palette.muted)),
    ])
}

fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|dt| {
            dt.format(&format_description!("[year]-[month]-[day] [hour]:[minute]"))
                .ok()
        })
        .unwrap_or_else(|| millis.to_string())
}

fn preview_snippet(content: &str, limit: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut snippet: String = flat.chars().take(limit).collect();
    snippet.push('…');
    snippet
}

fn highlight_line(
    text: &str,
    regex: Option<&Regex>,
    highlight_style: Style,
    base_style: Style,
) -> Vec<Span<'static>> {
    let Some(re) = regex else {
        return vec![Span::styled(text.to_string(), base_style)];
    };
    let mut spans = Vec::new();
    let mut last = 0;
    for mat in re.find_iter(text) {
        if mat.start() > last {
            spans.push(Span::styled(text[last..mat.start()].to_string(), base_style));
        }
        spans.push(Span::styled(mat.as_str().to_string(), highlight_style));
        last = mat.end();
    }
    if last < text.len() {
        spans.push(Span::styled(text[last..].to_string(), base_style));
    }
    if spans.is_empty() {
        spans.push(Span::styled(text.to_string(), base_style));
    }
    spans
}

/// Split `body` into lines, styling the byte ranges in `matches`. The match
/// at index `current` gets `current_style`.
fn highlight_body(
    body: &str,
    matches: &[Range<usize>],
    current: Option<usize>,
    base_style: Style,
    highlight_style: Style,
    current_style: Style,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut line_start = 0;
    for line in body.split('\n') {
        let line_end = line_start + line.len();
        let mut spans = Vec::new();
        let mut last = line_start;
        for (idx, range) in matches.iter().enumerate() {
            let start = range.start.max(line_start);
            let end = range.end.min(line_end);
            if start >= end
                || start < last
                || !body.is_char_boundary(start)
                || !body.is_char_boundary(end)
            {
                continue;
            }
            if start > last {
                spans.push(Span::styled(body[last..start].to_string(), base_style));
            }
            let style = if current == Some(idx) {
                current_style
            } else {
                highlight_style
            };
            spans.push(Span::styled(body[start..end].to_string(), style));
            last = end;
        }
        if last < line_end {
            spans.push(Span::styled(body[last..line_end].to_string(), base_style));
        }
        lines.push(Line::from(spans));
        line_start = line_end + 1;
    }
    lines
}

fn editor_cursor_screen_position(
    editor: &EditorState,
    area: Rect,
    row_offset: u16,
) -> Option<(u16, u16)> {
    let inner_width = area.width.saturating_sub(2);
    let inner_height = area.height.saturating_sub(2);
    if inner_width == 0 || inner_height == 0 {
        return None;
    }

    let mut row = row_offset;
    let mut col = 0usize;
    let width_limit = inner_width as usize;
    let buffer = editor.buffer();
    let cursor = editor.cursor().min(buffer.len());

    for grapheme in buffer[..cursor].graphemes(true) {
        if grapheme == "\n" {
            row += 1;
            col = 0;
            continue;
        }
        let glyph_width = UnicodeWidthStr::width(grapheme);
        if glyph_width > 0 && col + glyph_width > width_limit {
            row += 1;
            col = 0;
        }
        col += glyph_width;
    }

    let row = row.min(inner_height.saturating_sub(1));
    let col = col.min(width_limit - 1) as u16;
    Some((area.x + 1 + col, area.y + 1 + row))
}

fn render_overlay(frame: &mut Frame, store: &Store, state: &AppState, palette: &Palette) {
    let strings = store.strings();
    let hint = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(palette.muted)));
    match state.overlay() {
        Some(OverlayState::NewCategory(draft)) => {
            let mut name = draft.name.clone();
            name.push('▌');
            render_dialog(
                frame,
                strings.new_category,
                vec![
                    Line::from(name),
                    Line::from(""),
                    hint("Enter to create • Esc to cancel"),
                ],
                palette.accent,
            );
        }
        Some(OverlayState::DeleteCategory(confirm)) => {
            render_dialog(
                frame,
                "Delete Category",
                vec![
                    Line::from(format!("Delete category '{}'?", confirm.name)),
                    Line::from(Span::styled(
                        "Its notes stay, without a category.",
                        Style::default().fg(palette.muted),
                    )),
                    Line::from(""),
                    hint("Enter or y delete • Esc cancel"),
                ],
                palette.danger,
            );
        }
        Some(OverlayState::Purge(confirm)) => {
            render_dialog(
                frame,
                "Delete Forever",
                vec![
                    Line::from(Span::styled(
                        format!("Permanently delete '{}'?", confirm.title),
                        Style::default().fg(palette.danger).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        "This cannot be undone.",
                        Style::default().fg(palette.danger),
                    )),
                    Line::from(""),
                    hint("Enter or y delete • Esc cancel"),
                ],
                palette.danger,
            );
        }
        Some(OverlayState::EmptyTrash) => {
            render_dialog(
                frame,
                strings.trash,
                vec![
                    Line::from(Span::styled(
                        strings.empty_confirm,
                        Style::default().fg(palette.danger).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    hint("Enter or y empty • Esc cancel"),
                ],
                palette.danger,
            );
        }
        Some(OverlayState::Settings(menu)) => {
            let settings = store.settings();
            let language = match settings.language {
                Language::En => "English",
                Language::Zh => "中文",
            };
            let rows = [
                format!(
                    "{}: {}",
                    strings.dark_mode,
                    if settings.dark_mode { "on" } else { "off" }
                ),
                format!("{}: {}", strings.language, language),
            ];
            let mut lines = menu_lines(&rows, menu.selected, palette);
            lines.push(Line::from(""));
            lines.push(hint("j/k move • Enter toggle • Esc close"));
            render_dialog(frame, strings.settings, lines, palette.accent);
        }
        Some(OverlayState::AiMenu(menu)) => {
            let rows: Vec<String> = AiAction::iter()
                .map(|action| action.label(strings).to_string())
                .collect();
            let mut lines = menu_lines(&rows, menu.selected, palette);
            lines.push(Line::from(""));
            lines.push(hint("j/k move • Enter run • Esc cancel"));
            render_dialog(frame, strings.ai_menu, lines, palette.accent);
        }
        None => {}
    }
}

fn menu_lines(rows: &[String], selected: usize, palette: &Palette) -> Vec<Line<'static>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| {
            if idx == selected {
                Line::from(Span::styled(
                    format!("▸ {row}"),
                    Style::default()
                        .bg(palette.selection)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {row}"))
            }
        })
        .collect()
}

fn render_dialog(
    frame: &mut Frame,
    title: &str,
    lines: Vec<Line<'static>>,
    accent: Color,
) {
    let area = centered_rect(60, 30, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(title.to_string())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
