use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::ai::{AiError, GeminiClient, TextGenerator, UnconfiguredGenerator};
use crate::app::App;
use crate::config::{AiOptions, ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;
use crate::store::{Preconfirmed, Store, TerminalPrompt};

pub mod commands;

use self::commands::{
    AiArgs, CategoryArgs, EditArgs, EmptyTrashArgs, ListArgs, NewArgs, NoteRef, SettingsArgs,
    ShowArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "zennote",
    version,
    about = "Keyboard-first personal notes with categories, trash and AI-assisted writing"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over ZENNOTE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over ZENNOTE_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Create a new note
    New(NewArgs),
    /// List notes, newest first with pinned notes on top
    List(ListArgs),
    /// Print one note
    Show(ShowArgs),
    /// Change a note's title, body or category
    Edit(EditArgs),
    /// Toggle the pinned flag of a note
    Pin(NoteRef),
    /// Move a note to the trash
    Trash(NoteRef),
    /// Bring a note back from the trash
    Restore(NoteRef),
    /// Delete a note permanently
    Purge(NoteRef),
    /// Permanently delete every note in the trash
    EmptyTrash(EmptyTrashArgs),
    /// Manage categories
    Category(CategoryArgs),
    /// Show or change appearance and language settings
    Settings(SettingsArgs),
    /// Run an AI writing action against a note
    Ai(AiArgs),
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    let command = cli.command.unwrap_or(Commands::Tui);
    // The TUI owns the terminal, so its logs go to a file.
    let target = match command {
        Commands::Tui => LogTarget::File(paths.log_dir.join("zennote.log")),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let storage = storage::init(&paths, &config.storage)?;
    let mut store = Store::open(storage);

    let config = Arc::new(config);
    let output = match command {
        Commands::Tui => {
            let generator = generator_from_config(&config.ai);
            let mut app = App::new(config, store, generator)?;
            return app.run();
        }
        Commands::New(args) => {
            let body = match args.body.clone() {
                Some(body) => Some(body),
                None => commands::read_stdin()?,
            };
            commands::new_note(&mut store, args, body)?
        }
        Commands::List(args) => commands::list_notes(&mut store, args)?,
        Commands::Show(args) => commands::show_note(&store, args)?,
        Commands::Edit(args) => {
            let body = match (&args.body, args.stdin) {
                (Some(body), _) => Some(body.clone()),
                (None, true) => commands::read_stdin()?,
                (None, false) => None,
            };
            commands::edit_note(&mut store, args, body)?
        }
        Commands::Pin(args) => commands::pin_note(&mut store, &args.note)?,
        Commands::Trash(args) => commands::trash_note(&mut store, &args.note)?,
        Commands::Restore(args) => commands::restore_note(&mut store, &args.note)?,
        Commands::Purge(args) => commands::purge_note(&mut store, &args.note)?,
        Commands::EmptyTrash(args) => {
            if args.yes {
                commands::empty_trash(&mut store, &mut Preconfirmed)
            } else {
                commands::empty_trash(&mut store, &mut TerminalPrompt)
            }
        }
        Commands::Category(args) => commands::handle_category_command(&mut store, args)?,
        Commands::Settings(args) => commands::settings(&mut store, args),
        Commands::Ai(args) => {
            let client = GeminiClient::from_config(&config.ai)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("starting async runtime")?;
            runtime.block_on(commands::run_ai(&mut store, args, &client))?
        }
    };
    print!("{output}");
    Ok(())
}

/// The TUI still starts without an API key; AI actions then report the
/// missing configuration instead.
fn generator_from_config(options: &AiOptions) -> Arc<dyn TextGenerator> {
    match GeminiClient::from_config(options) {
        Ok(client) => Arc::new(client),
        Err(AiError::NotConfigured(key_env)) => {
            tracing::warn!(%key_env, "no AI API key found, AI actions are disabled");
            Arc::new(UnconfiguredGenerator { key_env })
        }
        Err(err) => {
            tracing::error!(?err, "failed to build AI client");
            Arc::new(UnconfiguredGenerator {
                key_env: options.api_key_env.clone(),
            })
        }
    }
}

fn init_tracing(level: &str, target: LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| -> Result<()> {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init(),
            LogTarget::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
