use async_trait::async_trait;
use strum::{Display, EnumIter, EnumString};

use crate::i18n::Strings;
use crate::model::{Language, Note, NoteId, NotePatch};
use crate::store::Store;

pub mod gemini;

pub use gemini::GeminiClient;

/// Errors from the text-generation boundary.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// No API key was found in the configured environment variable.
    #[error("no API key configured (set {0})")]
    NotConfigured(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("the model returned no text")]
    EmptyResponse,

    #[error("unexpected response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum AiAction {
    Summarize,
    Polish,
    SuggestTitle,
    ContinueWriting,
}

impl AiAction {
    pub fn label(self, strings: &Strings) -> &'static str {
        match self {
            AiAction::Summarize => strings.summarize,
            AiAction::Polish => strings.polish,
            AiAction::SuggestTitle => strings.suggest_title,
            AiAction::ContinueWriting => strings.continue_writing,
        }
    }
}

fn language_directive(language: Language) -> &'static str {
    match language {
        Language::En => "Please respond in English.",
        Language::Zh => "请用简体中文回复。",
    }
}

pub fn build_prompt(action: AiAction, content: &str, language: Language) -> String {
    let lang = language_directive(language);
    match action {
        AiAction::Summarize => format!(
            "Provide a concise 1-2 sentence summary for the following text. \
             Format it as a quote block (start with '> '). {lang}\n\nText: {content}"
        ),
        AiAction::Polish => format!(
            "Improve the writing of the following text. Keep the meaning but make it more \
             professional, clear, and elegant. Return ONLY the polished text. {lang}\n\nText: {content}"
        ),
        AiAction::SuggestTitle => format!(
            "Based on the following content, suggest a short, catchy, and professional title \
             (max 6 words). Return ONLY the title text. {lang}\n\nContent: {content}"
        ),
        AiAction::ContinueWriting => format!(
            "Based on the content below, naturally continue the writing for one coherent \
             paragraph. Do not repeat the existing text. Return ONLY the new content. \
             {lang}\n\nContent: {content}"
        ),
    }
}

/// Prompt in, text out. One request per call, no streaming.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Stand-in used when no API key is available; every call fails.
#[derive(Debug, Clone)]
pub struct UnconfiguredGenerator {
    pub key_env: String,
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::NotConfigured(self.key_env.clone()))
    }
}

/// A prompt ready to send, detached from the store so it can cross an await
/// point or a thread boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiRequest {
    pub note_id: NoteId,
    pub action: AiAction,
    pub prompt: String,
}

impl AiRequest {
    /// `None` when the note has nothing to work with.
    pub fn prepare(note: &Note, action: AiAction, language: Language) -> Option<Self> {
        if note.content.trim().is_empty() {
            return None;
        }
        Some(Self {
            note_id: note.id.clone(),
            action,
            prompt: build_prompt(action, &note.content, language),
        })
    }

    pub async fn execute(self, generator: &dyn TextGenerator) -> AiOutcome {
        let result = match generator.generate(&self.prompt).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Err(AiError::EmptyResponse)
                } else {
                    Ok(trimmed.to_string())
                }
            }
            Err(err) => Err(err),
        };
        AiOutcome {
            note_id: self.note_id,
            action: self.action,
            result,
        }
    }
}

#[derive(Debug)]
pub struct AiOutcome {
    pub note_id: NoteId,
    pub action: AiAction,
    pub result: Result<String, AiError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStatus {
    Applied,
    /// The target note disappeared while the request was outstanding.
    Discarded,
    /// Nothing to send: the note is missing or its content is blank.
    Skipped,
}

fn quote_block(text: &str) -> String {
    if text.starts_with('>') {
        return text.to_string();
    }
    text.lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold a finished request back into the store. The note's current content
/// is used, so edits made while the request was in flight survive. On error
/// the note is untouched.
pub fn apply(store: &mut Store, outcome: AiOutcome) -> Result<ApplyStatus, AiError> {
    let text = outcome.result?;
    let Some(note) = store.note(&outcome.note_id) else {
        tracing::debug!(id = %outcome.note_id, action = %outcome.action, "note gone, discarding ai result");
        return Ok(ApplyStatus::Discarded);
    };

    let patch = match outcome.action {
        AiAction::Summarize => {
            NotePatch::content(format!("{}\n\n{}", quote_block(&text), note.content))
        }
        AiAction::Polish => NotePatch::content(text),
        AiAction::SuggestTitle => NotePatch::title(text),
        AiAction::ContinueWriting => NotePatch::content(format!("{}\n\n{}", note.content, text)),
    };
    store.update_note(&outcome.note_id, patch);
    tracing::info!(id = %outcome.note_id, action = %outcome.action, "ai result applied");
    Ok(ApplyStatus::Applied)
}

/// Run one action end to end against the store.
pub async fn request_transform(
    store: &mut Store,
    note_id: &str,
    action: AiAction,
    generator: &dyn TextGenerator,
) -> Result<ApplyStatus, AiError> {
    let language = store.settings().language;
    let Some(request) = store
        .note(note_id)
        .and_then(|note| AiRequest::prepare(note, action, language))
    else {
        return Ok(ApplyStatus::Skipped);
    };
    let outcome = request.execute(generator).await;
    apply(store, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NotePatch;
    use crate::storage::MemoryStore;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::str::FromStr;

    struct FakeGenerator {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(AiError::Api {
                    status: *status,
                    body: "boom".into(),
                }),
            }
        }
    }

    fn store_with_note(content: &str) -> (Store, String) {
        let mut store = Store::open(MemoryStore::new());
        let id = store.create_note().id;
        store.update_note(&id, NotePatch::content(content));
        (store, id)
    }

    fn content(store: &Store, id: &str) -> String {
        store.note(id).map(|n| n.content.clone()).unwrap_or_default()
    }

    #[tokio::test]
    async fn summarize_prepends_quote_block() {
        let (mut store, id) = store_with_note("Long meeting notes");
        let generator = FakeGenerator::replying("  Short summary. \n");

        let status = request_transform(&mut store, &id, AiAction::Summarize, &generator).await;
        assert_matches!(status, Ok(ApplyStatus::Applied));
        assert_eq!(
            content(&store, &id),
            "> Short summary.\n\nLong meeting notes"
        );
    }

    #[tokio::test]
    async fn failure_leaves_note_untouched() {
        let (mut store, id) = store_with_note("Keep me");
        let before = store.note(&id).cloned();
        let generator = FakeGenerator::failing(503);

        let status = request_transform(&mut store, &id, AiAction::Polish, &generator).await;
        assert_matches!(status, Err(AiError::Api { status: 503, .. }));
        assert_eq!(store.note(&id).cloned(), before);
    }

    #[tokio::test]
    async fn blank_reply_is_an_error() {
        let (mut store, id) = store_with_note("Something");
        let generator = FakeGenerator::replying("   ");

        let status = request_transform(&mut store, &id, AiAction::SuggestTitle, &generator).await;
        assert_matches!(status, Err(AiError::EmptyResponse));
        assert_eq!(store.note(&id).map(|n| n.title.clone()), Some(String::new()));
    }

    #[tokio::test]
    async fn blank_content_is_skipped_without_calling_out() {
        let (mut store, id) = store_with_note("   \n ");
        let generator = FakeGenerator::replying("unused");

        let status = request_transform(&mut store, &id, AiAction::Polish, &generator).await;
        assert_matches!(status, Ok(ApplyStatus::Skipped));
        assert!(generator.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn result_for_deleted_note_is_discarded() {
        let (mut store, id) = store_with_note("Draft");
        let note = store.note(&id).cloned().expect("note");
        let request = AiRequest::prepare(&note, AiAction::ContinueWriting, Language::En)
            .expect("request");

        store.permanently_delete(&id);
        let outcome = request
            .execute(&FakeGenerator::replying("More text"))
            .await;
        assert_matches!(apply(&mut store, outcome), Ok(ApplyStatus::Discarded));
        assert!(store.notes().is_empty());
    }

    #[tokio::test]
    async fn composes_against_content_at_apply_time() {
        let (mut store, id) = store_with_note("First");
        let note = store.note(&id).cloned().expect("note");
        let request = AiRequest::prepare(&note, AiAction::ContinueWriting, Language::En)
            .expect("request");

        store.update_note(&id, NotePatch::content("First, edited"));
        let outcome = request.execute(&FakeGenerator::replying("Second")).await;
        assert_matches!(apply(&mut store, outcome), Ok(ApplyStatus::Applied));
        assert_eq!(content(&store, &id), "First, edited\n\nSecond");
    }

    #[tokio::test]
    async fn polish_and_title_replace_fields() {
        let (mut store, id) = store_with_note("rough draft");
        let polished = FakeGenerator::replying("Refined draft.");
        request_transform(&mut store, &id, AiAction::Polish, &polished)
            .await
            .expect("polish");
        assert_eq!(content(&store, &id), "Refined draft.");

        let titled = FakeGenerator::replying("A Refined Draft");
        request_transform(&mut store, &id, AiAction::SuggestTitle, &titled)
            .await
            .expect("title");
        assert_eq!(
            store.note(&id).map(|n| n.title.as_str()),
            Some("A Refined Draft")
        );
    }

    #[tokio::test]
    async fn prompt_carries_language_directive() {
        let (mut store, id) = store_with_note("你好世界");
        store.set_language(Language::Zh);
        let generator = FakeGenerator::replying("标题");

        request_transform(&mut store, &id, AiAction::SuggestTitle, &generator)
            .await
            .expect("title");
        let prompts = generator.prompts.lock();
        assert!(prompts[0].contains("请用简体中文回复。"));
        assert!(prompts[0].ends_with("Content: 你好世界"));
    }

    #[test]
    fn multi_line_summary_is_quoted_per_line() {
        assert_eq!(quote_block("one\ntwo"), "> one\n> two");
        assert_eq!(quote_block("> already quoted"), "> already quoted");
    }

    #[test]
    fn actions_parse_from_kebab_case() {
        assert_eq!(
            AiAction::from_str("suggest-title").ok(),
            Some(AiAction::SuggestTitle)
        );
        assert_eq!(AiAction::ContinueWriting.to_string(), "continue-writing");
    }
}
