use std::fmt::Write as _;
use std::io::{self, Read};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::ai::{self, AiAction, ApplyStatus, TextGenerator};
use crate::model::{CategoryFilter, CategoryId, Language, Lifecycle, Note, NotePatch};
use crate::search::SearchMatcher;
use crate::store::{ConfirmationGate, Store};

/// Characters of the id printed in listings; any unique prefix is accepted back.
const SHORT_ID_LEN: usize = 8;

#[derive(Args, Debug, Clone)]
pub struct NewArgs {
    /// Title for the note (may be left empty)
    #[arg()]
    pub title: Option<String>,
    /// Provide the note body inline. If omitted, reads piped stdin.
    #[arg(long)]
    pub body: Option<String>,
    /// Category id or name
    #[arg(long)]
    pub category: Option<String>,
    /// Pin the new note
    #[arg(long)]
    pub pin: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Show the trash instead of active notes
    #[arg(long)]
    pub trash: bool,
    /// Only notes in this category (id or name)
    #[arg(long, conflicts_with = "trash")]
    pub category: Option<String>,
    /// Case-insensitive substring filter over title and body
    #[arg(long, short)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Note id or unique id prefix
    pub note: String,
    /// Report where this text occurs in the body
    #[arg(long)]
    pub find: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Note id or unique id prefix
    pub note: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// New body
    #[arg(long, conflicts_with = "stdin")]
    pub body: Option<String>,
    /// Read the new body from piped stdin
    #[arg(long)]
    pub stdin: bool,
    /// Move to this category (id or name)
    #[arg(long, conflicts_with = "no_category")]
    pub category: Option<String>,
    /// Clear the note's category
    #[arg(long)]
    pub no_category: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NoteRef {
    /// Note id or unique id prefix
    pub note: String,
}

#[derive(Args, Debug, Clone)]
pub struct EmptyTrashArgs {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    pub yes: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create a category
    Add {
        /// Display name (whitespace trimmed)
        name: String,
    },
    /// Delete a category; its notes become uncategorised
    Delete {
        /// Category id or name
        category: String,
    },
    /// List categories with their note counts
    List,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Turn dark mode on or off
    #[arg(long)]
    pub dark_mode: Option<bool>,
    /// Interface and AI response language (en, zh)
    #[arg(long)]
    pub language: Option<Language>,
}

#[derive(Args, Debug, Clone)]
pub struct AiArgs {
    /// Note id or unique id prefix
    pub note: String,
    /// summarize, polish, suggest-title or continue-writing
    pub action: AiAction,
}

pub fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    Ok(Some(buf))
}

pub fn new_note(store: &mut Store, args: NewArgs, body: Option<String>) -> Result<String> {
    if let Some(reference) = args.category.as_deref() {
        let category_id = resolve_category(store, reference)?;
        store.select_category(CategoryFilter::Category(category_id));
    }
    let note = store.create_note();
    let patch = NotePatch {
        title: args.title.map(|title| title.trim().to_string()),
        content: body,
        category_id: None,
    };
    if !patch.is_empty() {
        store.update_note(&note.id, patch);
    }
    if args.pin {
        store.toggle_pin(&note.id);
    }
    Ok(format!(
        "Created note {}{}\n",
        short_id(&note.id),
        if args.pin { " (pinned)" } else { "" }
    ))
}

pub fn list_notes(store: &mut Store, args: ListArgs) -> Result<String> {
    if args.trash {
        store.set_trash_view(true);
    } else {
        let filter = match args.category.as_deref() {
            Some(reference) => CategoryFilter::Category(resolve_category(store, reference)?),
            None => CategoryFilter::All,
        };
        store.select_category(filter);
    }
    store.set_search_query(args.search.unwrap_or_default());

    let strings = store.strings();
    let visible = store.visible_notes();
    if visible.is_empty() {
        let empty = if args.trash {
            strings.trash_empty
        } else {
            strings.no_notes
        };
        return Ok(format!("{empty}\n"));
    }
    let mut out = String::new();
    for note in visible {
        let mut headline = format!("{}  {}", short_id(&note.id), note.display_title(strings));
        if note.is_pinned {
            headline.push_str("  [PINNED]");
        }
        if let Some(name) = note
            .category_id
            .as_deref()
            .and_then(|id| store.category_name(id))
        {
            let _ = write!(&mut headline, "  [{name}]");
        }
        let _ = writeln!(&mut out, "{headline}");
        let _ = writeln!(&mut out, "    updated {}", format_timestamp(note.updated_at));
        if let Lifecycle::Trashed { since } = note.lifecycle() {
            let _ = writeln!(&mut out, "    trashed {}", format_timestamp(since));
        }
    }
    Ok(out)
}

pub fn show_note(store: &Store, args: ShowArgs) -> Result<String> {
    let note = resolve_note(store, &args.note)?;
    let strings = store.strings();
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", note.display_title(strings));
    let _ = writeln!(&mut out, "id       {}", note.id);
    let _ = writeln!(&mut out, "updated  {}", format_timestamp(note.updated_at));
    if let Some(name) = note
        .category_id
        .as_deref()
        .and_then(|id| store.category_name(id))
    {
        let _ = writeln!(&mut out, "category {name}");
    }
    if note.is_pinned {
        let _ = writeln!(&mut out, "pinned   yes");
    }
    if let Lifecycle::Trashed { since } = note.lifecycle() {
        let _ = writeln!(
            &mut out,
            "{} ({})",
            strings.note_in_trash,
            format_timestamp(since)
        );
    }
    let _ = writeln!(
        &mut out,
        "{} {}",
        note.content.chars().count(),
        strings.characters
    );
    out.push('\n');
    out.push_str(&note.content);
    if !note.content.ends_with('\n') {
        out.push('\n');
    }

    if let Some(query) = args.find.as_deref() {
        let matcher = SearchMatcher::new(&note.content, query.trim());
        let _ = writeln!(
            &mut out,
            "\n{} match(es) for '{}' at byte offsets {:?}",
            matcher.count(),
            query.trim(),
            matcher.offsets()
        );
    }
    Ok(out)
}

pub fn edit_note(store: &mut Store, args: EditArgs, body: Option<String>) -> Result<String> {
    let note = resolve_note(store, &args.note)?;
    if note.is_trashed() {
        bail!("note {} is in the trash; restore it first", short_id(&note.id));
    }
    let id = note.id.clone();
    let mut patch = if args.no_category {
        NotePatch::category(None)
    } else {
        match args.category.as_deref() {
            Some(reference) => NotePatch::category(Some(resolve_category(store, reference)?)),
            None => NotePatch::default(),
        }
    };
    patch.title = args.title;
    patch.content = body;
    if patch.is_empty() {
        bail!("nothing to change; pass --title, --body, --stdin, --category or --no-category");
    }
    store.update_note(&id, patch);
    Ok(format!("Updated note {}\n", short_id(&id)))
}

pub fn pin_note(store: &mut Store, reference: &str) -> Result<String> {
    let id = resolve_note(store, reference)?.id.clone();
    if !store.toggle_pin(&id) {
        bail!("note {} is in the trash and cannot be pinned", short_id(&id));
    }
    let pinned = store.note(&id).map(|note| note.is_pinned).unwrap_or(false);
    Ok(format!(
        "{} note {}\n",
        if pinned { "Pinned" } else { "Unpinned" },
        short_id(&id)
    ))
}

pub fn trash_note(store: &mut Store, reference: &str) -> Result<String> {
    let note = resolve_note(store, reference)?;
    if note.is_trashed() {
        return Ok(format!("Note {} is already in the trash\n", short_id(&note.id)));
    }
    let id = note.id.clone();
    store.move_to_trash(&id);
    Ok(format!("Moved note {} to the trash\n", short_id(&id)))
}

pub fn restore_note(store: &mut Store, reference: &str) -> Result<String> {
    let note = resolve_note(store, reference)?;
    if !note.is_trashed() {
        return Ok(format!("Note {} is not in the trash\n", short_id(&note.id)));
    }
    let id = note.id.clone();
    store.restore_note(&id);
    Ok(format!("Restored note {}\n", short_id(&id)))
}

pub fn purge_note(store: &mut Store, reference: &str) -> Result<String> {
    let note = resolve_note(store, reference)?;
    if !note.is_trashed() {
        bail!(
            "note {} is not in the trash; trash it before deleting it forever",
            short_id(&note.id)
        );
    }
    let id = note.id.clone();
    store.permanently_delete(&id);
    Ok(format!("Deleted note {} forever\n", short_id(&id)))
}

pub fn empty_trash(store: &mut Store, gate: &mut dyn ConfirmationGate) -> String {
    match store.empty_trash(gate) {
        Some(0) => format!("{}\n", store.strings().trash_empty),
        Some(removed) => format!("Removed {removed} note(s) from the trash\n"),
        None => "Aborted; the trash was left alone\n".to_string(),
    }
}

pub fn handle_category_command(store: &mut Store, args: CategoryArgs) -> Result<String> {
    match args.command {
        CategoryCommand::Add { name } => match store.add_category(&name) {
            Some(category) => Ok(format!(
                "Created category '{}' ({})\n",
                category.name, category.id
            )),
            None => bail!("category name cannot be empty"),
        },
        CategoryCommand::Delete { category } => {
            let id = resolve_category(store, &category)?;
            let name = store.category_name(&id).unwrap_or(&id).to_string();
            store.delete_category(&id);
            Ok(format!("Deleted category '{name}'\n"))
        }
        CategoryCommand::List => Ok(format_categories(store)),
    }
}

fn format_categories(store: &Store) -> String {
    if store.categories().is_empty() {
        return "(no categories)\n".to_string();
    }
    let mut out = String::new();
    for category in store.categories() {
        let count = store
            .notes()
            .iter()
            .filter(|note| {
                !note.is_trashed() && note.category_id.as_deref() == Some(category.id.as_str())
            })
            .count();
        let _ = writeln!(&mut out, "{:<12} {} ({count})", category.id, category.name);
    }
    out
}

pub fn settings(store: &mut Store, args: SettingsArgs) -> String {
    if let Some(dark_mode) = args.dark_mode {
        store.set_dark_mode(dark_mode);
    }
    if let Some(language) = args.language {
        store.set_language(language);
    }
    let settings = store.settings();
    format!(
        "dark_mode = {}\nlanguage  = {}\n",
        settings.dark_mode, settings.language
    )
}

pub async fn run_ai(
    store: &mut Store,
    args: AiArgs,
    generator: &dyn TextGenerator,
) -> Result<String> {
    let note = resolve_note(store, &args.note)?;
    if note.is_trashed() {
        bail!("note {} is in the trash; restore it first", short_id(&note.id));
    }
    let id = note.id.clone();
    let status = ai::request_transform(store, &id, args.action, generator)
        .await
        .with_context(|| format!("running {} on note {}", args.action, short_id(&id)))?;
    let message = match status {
        ApplyStatus::Applied => {
            let label = args.action.label(store.strings());
            format!("{label}: applied to note {}\n", short_id(&id))
        }
        ApplyStatus::Skipped => "The note is empty; nothing to send\n".to_string(),
        ApplyStatus::Discarded => "The note disappeared; result discarded\n".to_string(),
    };
    Ok(message)
}

fn resolve_note<'a>(store: &'a Store, reference: &str) -> Result<&'a Note> {
    let reference = reference.trim();
    if reference.is_empty() {
        bail!("note id cannot be empty");
    }
    if let Some(note) = store.note(reference) {
        return Ok(note);
    }
    let candidates = store.notes_with_prefix(reference);
    match candidates.as_slice() {
        [] => bail!("no note matches '{reference}'"),
        [note] => Ok(*note),
        many => bail!(
            "'{reference}' is ambiguous ({} notes match); use more characters",
            many.len()
        ),
    }
}

fn resolve_category(store: &Store, reference: &str) -> Result<CategoryId> {
    let reference = reference.trim();
    if let Some(category) = store.category(reference) {
        return Ok(category.id.clone());
    }
    store
        .categories()
        .iter()
        .find(|category| category.name.eq_ignore_ascii_case(reference))
        .map(|category| category.id.clone())
        .with_context(|| format!("no category named '{reference}'"))
}

fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

fn format_timestamp(millis: i64) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}
