use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::i18n::Strings;
use crate::model::{
    default_categories, Category, CategoryFilter, CategoryId, Language, Note, NoteId, NotePatch,
    Settings,
};
use crate::search::{project, ViewFilter};
use crate::storage::{KeyValueStore, CATEGORIES_KEY, NOTES_KEY, SETTINGS_KEY};

mod confirm;

pub use confirm::{ConfirmationGate, Declined, Preconfirmed, TerminalPrompt};

/// Source of "now" for note timestamps, in Unix epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn starting_at(millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(millis)),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

enum Snapshot<T> {
    Absent,
    Malformed,
    /// The backend failed; the stored value may still be intact.
    Unreadable,
    Present(T),
}

fn read_snapshot<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> Snapshot<T> {
    match kv.get(key) {
        Ok(None) => Snapshot::Absent,
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Snapshot::Present(value),
            Err(err) => {
                tracing::warn!(?err, key, "ignoring malformed snapshot");
                Snapshot::Malformed
            }
        },
        Err(err) => {
            tracing::error!(?err, key, "failed to read snapshot, writes to it are disabled");
            Snapshot::Unreadable
        }
    }
}

/// The single state container: notes, categories, settings and the current
/// view. Loads once on construction and writes a full snapshot after every
/// mutation. Persistence failures are logged and otherwise ignored; the
/// in-memory state stays authoritative. A key that could not be read at load
/// is never written back, so a failed read cannot overwrite stored data.
pub struct Store {
    kv: Box<dyn KeyValueStore + Send>,
    clock: Box<dyn Clock>,
    notes: Vec<Note>,
    categories: Vec<Category>,
    settings: Settings,
    view: ViewFilter,
    active_note: Option<NoteId>,
    unreadable: Vec<&'static str>,
}

impl Store {
    pub fn open<K>(kv: K) -> Self
    where
        K: KeyValueStore + Send + 'static,
    {
        Self::with_clock(kv, SystemClock)
    }

    pub fn with_clock<K, C>(kv: K, clock: C) -> Self
    where
        K: KeyValueStore + Send + 'static,
        C: Clock + 'static,
    {
        let mut unreadable = Vec::new();
        let notes = match read_snapshot::<Vec<Note>>(&kv, NOTES_KEY) {
            Snapshot::Present(notes) => notes,
            Snapshot::Absent | Snapshot::Malformed => Vec::new(),
            Snapshot::Unreadable => {
                unreadable.push(NOTES_KEY);
                Vec::new()
            }
        };
        // An explicitly emptied list stays empty; defaults only on first run.
        let categories = match read_snapshot::<Vec<Category>>(&kv, CATEGORIES_KEY) {
            Snapshot::Present(categories) => categories,
            Snapshot::Absent => default_categories(),
            Snapshot::Malformed => Vec::new(),
            Snapshot::Unreadable => {
                unreadable.push(CATEGORIES_KEY);
                Vec::new()
            }
        };
        let settings = match read_snapshot::<Settings>(&kv, SETTINGS_KEY) {
            Snapshot::Present(settings) => settings,
            Snapshot::Absent | Snapshot::Malformed => Settings::default(),
            Snapshot::Unreadable => {
                unreadable.push(SETTINGS_KEY);
                Settings::default()
            }
        };
        tracing::debug!(
            notes = notes.len(),
            categories = categories.len(),
            "store loaded"
        );

        Self {
            kv: Box::new(kv),
            clock: Box::new(clock),
            notes,
            categories,
            settings,
            view: ViewFilter::default(),
            active_note: None,
            unreadable,
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn strings(&self) -> &'static Strings {
        self.settings.language.strings()
    }

    pub fn view(&self) -> &ViewFilter {
        &self.view
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn category_name(&self, id: &str) -> Option<&str> {
        self.category(id).map(|category| category.name.as_str())
    }

    pub fn active_note_id(&self) -> Option<&str> {
        self.active_note.as_deref()
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.active_note.as_deref().and_then(|id| self.note(id))
    }

    pub fn visible_notes(&self) -> Vec<&Note> {
        project(&self.notes, &self.view)
    }

    pub fn trash_count(&self) -> usize {
        self.notes.iter().filter(|note| note.is_trashed()).count()
    }

    /// Notes whose id starts with `prefix`.
    pub fn notes_with_prefix(&self, prefix: &str) -> Vec<&Note> {
        self.notes
            .iter()
            .filter(|note| note.id.starts_with(prefix))
            .collect()
    }

    pub fn create_note(&mut self) -> Note {
        let category_id = self
            .view
            .category
            .category_id()
            .filter(|id| self.category(id).is_some())
            .map(str::to_string);
        let note = Note {
            id: Uuid::new_v4().to_string(),
            title: String::new(),
            content: String::new(),
            updated_at: self.clock.now_millis(),
            category_id,
            is_pinned: false,
            deleted_at: None,
        };
        self.notes.insert(0, note.clone());
        self.active_note = Some(note.id.clone());
        self.view.trash_view = false;
        tracing::debug!(id = %note.id, "note created");
        self.persist_collections();
        note
    }

    /// Merge `patch` into the note. Returns false when the id is unknown.
    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            return false;
        };
        patch.apply_to(note);
        note.updated_at = now.max(note.updated_at);
        self.persist_collections();
        true
    }

    /// Flip the pin flag. `updated_at` is left alone; trashed notes cannot be
    /// pinned.
    pub fn toggle_pin(&mut self, id: &str) -> bool {
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            return false;
        };
        if note.is_trashed() {
            return false;
        }
        note.is_pinned = !note.is_pinned;
        self.persist_collections();
        true
    }

    pub fn move_to_trash(&mut self, id: &str) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            return false;
        };
        note.deleted_at = Some(now);
        note.is_pinned = false;
        if self.active_note.as_deref() == Some(id) {
            self.active_note = None;
        }
        self.persist_collections();
        true
    }

    pub fn restore_note(&mut self, id: &str) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.notes.iter_mut().find(|note| note.id == id) else {
            return false;
        };
        note.deleted_at = None;
        note.updated_at = now.max(note.updated_at);
        self.persist_collections();
        true
    }

    pub fn permanently_delete(&mut self, id: &str) -> bool {
        let before = self.notes.len();
        self.notes.retain(|note| note.id != id);
        if self.notes.len() == before {
            return false;
        }
        if self.active_note.as_deref() == Some(id) {
            self.active_note = None;
        }
        self.persist_collections();
        true
    }

    /// Remove every trashed note once `gate` agrees. Returns the number of
    /// notes removed, or `None` when the confirmation was declined.
    pub fn empty_trash(&mut self, gate: &mut dyn ConfirmationGate) -> Option<usize> {
        let trashed = self.trash_count();
        if trashed == 0 {
            self.active_note = None;
            return Some(0);
        }
        if !gate.confirm(self.strings().empty_confirm) {
            tracing::debug!("empty trash declined");
            return None;
        }
        self.notes.retain(|note| !note.is_trashed());
        self.active_note = None;
        tracing::info!(removed = trashed, "trash emptied");
        self.persist_collections();
        Some(trashed)
    }

    /// Append a category named `name` (trimmed) and select it. Blank names
    /// are rejected.
    pub fn add_category(&mut self, name: &str) -> Option<Category> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let category = Category::new(Uuid::new_v4().to_string(), name);
        self.categories.push(category.clone());
        self.select_category(CategoryFilter::Category(category.id.clone()));
        self.persist_collections();
        Some(category)
    }

    /// Remove a category and clear it from every note that referenced it.
    pub fn delete_category(&mut self, id: &str) -> bool {
        let before = self.categories.len();
        self.categories.retain(|category| category.id != id);
        if self.categories.len() == before {
            return false;
        }
        let mut cleared = 0usize;
        for note in self
            .notes
            .iter_mut()
            .filter(|note| note.category_id.as_deref() == Some(id))
        {
            note.category_id = None;
            cleared += 1;
        }
        if self.view.category.category_id() == Some(id) {
            self.view.category = CategoryFilter::All;
        }
        tracing::debug!(id, cleared, "category deleted");
        self.persist_collections();
        true
    }

    /// Show the active notes of one category (or all). Leaves the trash view.
    pub fn select_category(&mut self, filter: CategoryFilter) {
        self.view.category = filter;
        self.view.trash_view = false;
    }

    /// Entering the trash view resets the category filter to "all".
    pub fn set_trash_view(&mut self, trash_view: bool) {
        self.view.trash_view = trash_view;
        if trash_view {
            self.view.category = CategoryFilter::All;
        }
    }

    pub fn toggle_trash_view(&mut self) {
        self.set_trash_view(!self.view.trash_view);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.view.search_query = query.into();
    }

    pub fn select_note(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if self.note(id).is_some() => {
                self.active_note = Some(id.to_string());
                true
            }
            Some(_) => false,
            None => {
                self.active_note = None;
                true
            }
        }
    }

    pub fn set_dark_mode(&mut self, dark_mode: bool) {
        if self.settings.dark_mode != dark_mode {
            self.settings.dark_mode = dark_mode;
            self.persist_settings();
        }
    }

    pub fn toggle_dark_mode(&mut self) {
        self.set_dark_mode(!self.settings.dark_mode);
    }

    pub fn set_language(&mut self, language: Language) {
        if self.settings.language != language {
            self.settings.language = language;
            self.persist_settings();
        }
    }

    pub fn category_ids(&self) -> impl Iterator<Item = &CategoryId> {
        self.categories.iter().map(|category| &category.id)
    }

    fn persist_collections(&self) {
        self.write_snapshot(NOTES_KEY, &self.notes);
        self.write_snapshot(CATEGORIES_KEY, &self.categories);
    }

    fn persist_settings(&self) {
        self.write_snapshot(SETTINGS_KEY, &self.settings);
    }

    fn write_snapshot<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        if self.unreadable.iter().any(|unreadable| *unreadable == key) {
            tracing::error!(key, "not persisting snapshot that failed to load");
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(?err, key, "failed to serialize snapshot");
                return;
            }
        };
        if let Err(err) = self.kv.set(key, &raw) {
            tracing::warn!(?err, key, "failed to persist snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;

    fn store_at(millis: i64) -> (Arc<MemoryStore>, ManualClock, Store) {
        let kv = Arc::new(MemoryStore::new());
        let clock = ManualClock::starting_at(millis);
        let store = Store::with_clock(Arc::clone(&kv), clock.clone());
        (kv, clock, store)
    }

    fn persisted_notes(kv: &MemoryStore) -> Vec<Note> {
        let raw = kv.snapshot(NOTES_KEY).expect("notes snapshot");
        serde_json::from_str(&raw).expect("notes json")
    }

    #[test]
    fn first_run_gets_default_categories_and_settings() {
        let (_kv, _clock, store) = store_at(0);
        let ids: Vec<_> = store.category_ids().cloned().collect();
        assert_eq!(ids, vec!["work", "personal", "ideas"]);
        assert_eq!(store.settings(), Settings::default());
        assert!(store.notes().is_empty());
    }

    #[test]
    fn emptied_category_list_stays_empty() {
        let kv = MemoryStore::with_entries([(CATEGORIES_KEY, "[]")]);
        let store = Store::open(kv);
        assert!(store.categories().is_empty());
    }

    #[test]
    fn malformed_snapshot_only_affects_its_own_key() {
        let kv = MemoryStore::with_entries([
            (NOTES_KEY, "{not json"),
            (CATEGORIES_KEY, r#"[{"id":"c1","name":"Reading"}]"#),
            (SETTINGS_KEY, r#"{"darkMode":true,"language":"zh"}"#),
        ]);
        let store = Store::open(kv);
        assert!(store.notes().is_empty());
        assert_eq!(store.categories(), &[Category::new("c1", "Reading")]);
        assert!(store.settings().dark_mode);
        assert_eq!(store.settings().language, Language::Zh);

        let kv = MemoryStore::with_entries([(CATEGORIES_KEY, "42"), (SETTINGS_KEY, "oops")]);
        let store = Store::open(kv);
        assert!(store.categories().is_empty());
        assert_eq!(store.settings(), Settings::default());
    }

    /// Fails every read of one key; everything else goes to the inner store.
    struct FailingRead {
        inner: Arc<MemoryStore>,
        key: &'static str,
    }

    impl KeyValueStore for FailingRead {
        fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            if key == self.key {
                anyhow::bail!("database is locked");
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_read_never_overwrites_stored_notes() {
        let kv = Arc::new(MemoryStore::new());
        {
            let mut store = Store::open(Arc::clone(&kv));
            for _ in 0..3 {
                store.create_note();
            }
        }

        let mut flaky = Store::open(FailingRead {
            inner: Arc::clone(&kv),
            key: NOTES_KEY,
        });
        assert!(flaky.notes().is_empty());
        flaky.create_note();
        flaky.add_category("Reading");
        drop(flaky);

        let reopened = Store::open(Arc::clone(&kv));
        assert_eq!(reopened.notes().len(), 3);
        assert_eq!(reopened.categories().len(), 4);
    }

    #[test]
    fn create_note_takes_real_category_filter() {
        let (_kv, _clock, mut store) = store_at(100);
        store.select_category(CategoryFilter::Category("work".into()));
        let note = store.create_note();
        assert_eq!(note.category_id.as_deref(), Some("work"));
        assert_eq!(store.active_note_id(), Some(note.id.as_str()));

        store.select_category(CategoryFilter::All);
        let note = store.create_note();
        assert_eq!(note.category_id, None);
        assert_eq!(store.notes()[0].id, note.id);
        assert_eq!(note.updated_at, 100);
        assert!(!note.is_pinned);
    }

    #[test]
    fn create_note_leaves_trash_view() {
        let (_kv, _clock, mut store) = store_at(0);
        store.set_trash_view(true);
        store.create_note();
        assert!(!store.view().trash_view);
    }

    #[test]
    fn update_refreshes_timestamp_and_pin_does_not() {
        let (kv, clock, mut store) = store_at(10);
        let id = store.create_note().id;

        clock.set(50);
        assert!(store.update_note(&id, NotePatch::title("Groceries")));
        assert_eq!(store.note(&id).map(|n| n.updated_at), Some(50));

        clock.set(90);
        assert!(store.toggle_pin(&id));
        let note = store.note(&id).expect("note");
        assert!(note.is_pinned);
        assert_eq!(note.updated_at, 50);

        // A clock that went backwards never moves updated_at back.
        clock.set(20);
        store.update_note(&id, NotePatch::content("milk"));
        assert_eq!(store.note(&id).map(|n| n.updated_at), Some(50));

        let saved = persisted_notes(&kv);
        assert_eq!(saved[0].title, "Groceries");
        assert_eq!(saved[0].content, "milk");
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let (kv, _clock, mut store) = store_at(0);
        assert!(!store.update_note("missing", NotePatch::title("x")));
        assert!(!store.toggle_pin("missing"));
        assert!(!store.move_to_trash("missing"));
        assert!(!store.restore_note("missing"));
        assert!(!store.permanently_delete("missing"));
        assert!(!store.delete_category("missing"));
        assert_eq!(kv.snapshot(NOTES_KEY), None);
    }

    #[test]
    fn trash_then_restore_drops_pin() {
        let (_kv, clock, mut store) = store_at(0);
        let id = store.create_note().id;
        store.toggle_pin(&id);

        clock.set(5);
        assert!(store.move_to_trash(&id));
        let note = store.note(&id).expect("note");
        assert_eq!(note.deleted_at, Some(5));
        assert!(!note.is_pinned);
        assert_eq!(store.active_note_id(), None);
        assert!(!store.toggle_pin(&id));

        clock.set(9);
        assert!(store.restore_note(&id));
        let note = store.note(&id).expect("note");
        assert_eq!(note.deleted_at, None);
        assert!(!note.is_pinned);
        assert_eq!(note.updated_at, 9);
    }

    #[test]
    fn permanent_delete_clears_selection() {
        let (kv, _clock, mut store) = store_at(0);
        let id = store.create_note().id;
        assert!(store.permanently_delete(&id));
        assert!(store.note(&id).is_none());
        assert_eq!(store.active_note_id(), None);
        assert!(persisted_notes(&kv).is_empty());
    }

    #[test]
    fn empty_trash_requires_confirmation() {
        let (_kv, clock, mut store) = store_at(0);
        let keep = store.create_note().id;
        clock.advance(1);
        let gone = store.create_note().id;
        store.move_to_trash(&gone);
        store.select_note(Some(&keep));

        assert_eq!(store.empty_trash(&mut Declined), None);
        assert_eq!(store.trash_count(), 1);
        assert_eq!(store.active_note_id(), Some(keep.as_str()));

        assert_eq!(store.empty_trash(&mut Preconfirmed), Some(1));
        assert_eq!(store.trash_count(), 0);
        assert!(store.note(&keep).is_some());
        assert_eq!(store.active_note_id(), None);

        store.select_note(Some(&keep));
        assert_eq!(store.empty_trash(&mut Declined), Some(0));
        assert_eq!(store.active_note_id(), None);
    }

    #[test]
    fn add_category_selects_it_and_rejects_blank_names() {
        let (_kv, _clock, mut store) = store_at(0);
        store.set_trash_view(true);

        let added = store.add_category("  Work ").expect("category");
        assert_eq!(added.name, "Work");
        assert!(store.categories().contains(&added));
        assert_eq!(
            store.view().category,
            CategoryFilter::Category(added.id.clone())
        );
        assert!(!store.view().trash_view);

        let count = store.categories().len();
        assert_matches!(store.add_category("   "), None);
        assert_eq!(store.categories().len(), count);
    }

    #[test]
    fn delete_category_uncategorizes_notes() {
        let (_kv, _clock, mut store) = store_at(0);
        store.select_category(CategoryFilter::Category("ideas".into()));
        let id = store.create_note().id;

        assert!(store.delete_category("ideas"));
        let note = store.note(&id).expect("note survives");
        assert_eq!(note.category_id, None);
        assert_eq!(store.view().category, CategoryFilter::All);
        assert!(store.category("ideas").is_none());
    }

    #[test]
    fn trash_view_resets_category_filter() {
        let (_kv, _clock, mut store) = store_at(0);
        store.select_category(CategoryFilter::Category("work".into()));
        store.toggle_trash_view();
        assert!(store.view().trash_view);
        assert_eq!(store.view().category, CategoryFilter::All);

        store.select_category(CategoryFilter::Category("personal".into()));
        assert!(!store.view().trash_view);
    }

    #[test]
    fn settings_persist_only_on_change() {
        let (kv, _clock, mut store) = store_at(0);
        store.set_dark_mode(false);
        assert_eq!(kv.snapshot(SETTINGS_KEY), None);

        store.toggle_dark_mode();
        store.set_language(Language::Zh);
        let saved: Settings =
            serde_json::from_str(&kv.snapshot(SETTINGS_KEY).expect("settings")).expect("json");
        assert_eq!(
            saved,
            Settings {
                dark_mode: true,
                language: Language::Zh
            }
        );
        assert_eq!(store.strings().trash, "回收站");
    }

    #[test]
    fn write_failures_keep_in_memory_state() {
        let (kv, _clock, mut store) = store_at(0);
        let id = store.create_note().id;
        kv.set_fail_writes(true);

        assert!(store.update_note(&id, NotePatch::content("still here")));
        assert_eq!(
            store.note(&id).map(|n| n.content.as_str()),
            Some("still here")
        );
        assert_eq!(persisted_notes(&kv)[0].content, "");
    }

    #[test]
    fn state_survives_reload() {
        let kv = Arc::new(MemoryStore::new());
        let id = {
            let mut store = Store::with_clock(Arc::clone(&kv), ManualClock::starting_at(7));
            let id = store.create_note().id;
            store.update_note(&id, NotePatch::title("Persisted"));
            store.add_category("Reading");
            id
        };
        let store = Store::open(Arc::clone(&kv));
        assert_eq!(store.note(&id).map(|n| n.title.as_str()), Some("Persisted"));
        assert_eq!(store.categories().len(), 4);
    }

    #[test]
    fn lifecycle_stays_exclusive() {
        let (_kv, clock, mut store) = store_at(0);
        let ids: Vec<_> = (0..4)
            .map(|_| {
                clock.advance(1);
                store.create_note().id
            })
            .collect();
        store.move_to_trash(&ids[0]);
        store.move_to_trash(&ids[1]);
        store.restore_note(&ids[1]);

        let trashed = store.notes().iter().filter(|n| n.is_trashed()).count();
        let active = store.notes().iter().filter(|n| !n.is_trashed()).count();
        assert_eq!((trashed, active), (1, 3));
        assert_eq!(store.trash_count(), 1);
    }
}
