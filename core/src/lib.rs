//! Clipboard history core: a two-entry durable history, a polling watcher
//! and the switch that toggles the clipboard between the last two copies.
//!
//! OS access is behind [`ClipboardBackend`] and [`HotkeyRegistrar`]; the
//! client binary provides the real implementations. Everything that mutates
//! the history or the hotkeys runs on the [`Engine`] task.

pub mod clipboard;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod hotkey;
pub mod settings;
pub mod switch;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use clipboard::ClipboardBackend;
pub use db::Database;
pub use engine::{Command, Engine, Flow, DAEMON_TIMEOUT};
pub use error::{Error, Result};
pub use history::{Clock, HistoryEntry, HistoryStore, SystemClock, DEFAULT_CAPACITY};
pub use hotkey::{BindingName, HotkeyBinding, HotkeyId, HotkeyManager, HotkeyRegistrar, KeyCombination};
pub use settings::SettingsStore;
pub use switch::{SwitchController, SwitchOutcome};
pub use watcher::{Watcher, WatcherState};
