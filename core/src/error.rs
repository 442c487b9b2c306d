use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the clipboard history core.
///
/// None of these are fatal to the running engine: storage and clipboard
/// failures are logged and retried on the next tick, hotkey conflicts are
/// reported back to whoever asked for the binding.
#[derive(Error, Debug)]
pub enum Error {
    /// The history or settings database rejected an operation
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// The directory holding the database could not be created
    #[error("cannot prepare storage location {path}: {source}")]
    StorageLocation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The OS clipboard could not be read or written right now
    #[error("clipboard unavailable: {0}")]
    ClipboardAccess(String),

    /// The requested key combination is taken by the OS or another binding
    #[error("hotkey {combination} could not be bound: {reason}")]
    HotkeyConflict { combination: String, reason: String },

    /// User input that does not describe a usable key combination
    #[error("invalid key combination \"{input}\": {reason}")]
    InvalidCombination { input: String, reason: String },
}

impl Error {
    pub fn clipboard(err: impl std::fmt::Display) -> Self {
        Error::ClipboardAccess(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
