pub mod ai;
pub mod app;
pub mod cli;
pub mod config;
pub mod i18n;
pub mod model;
pub mod search;
pub mod storage;
pub mod store;
pub mod ui;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{Category, Note, NotePatch, Settings};
pub use store::Store;
