use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::clipboard::ClipboardBackend;
use crate::error::Result;
use crate::history::{HistoryEntry, HistoryStore};

const OBSERVER_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Waiting for the next tick with the last observed text cached
    Idle,
    /// Reading the clipboard
    Polling,
}

/// Detects clipboard changes by comparing against the last text it saw.
pub struct Watcher {
    history: HistoryStore,
    last_seen: Option<String>,
    state: WatcherState,
    changed: broadcast::Sender<HistoryEntry>,
}

impl Watcher {
    /// The cache starts out as the newest stored entry, so text the previous
    /// run already recorded is not recorded again.
    pub fn new(history: HistoryStore) -> Self {
        let last_seen = match history.latest(1) {
            Ok(mut latest) => latest.pop(),
            Err(e) => {
                warn!("Could not read newest history entry: {}", e);
                None
            }
        };
        let (changed, _) = broadcast::channel(OBSERVER_BUFFER);
        Self {
            history,
            last_seen,
            state: WatcherState::Idle,
            changed,
        }
    }

    /// Receive every entry this watcher records from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEntry> {
        self.changed.subscribe()
    }

    pub fn state(&self) -> WatcherState {
        self.state
    }

    pub fn last_seen(&self) -> Option<&str> {
        self.last_seen.as_deref()
    }

    /// Treat `text` as already observed without recording it.
    pub fn mark_seen(&mut self, text: &str) {
        self.last_seen = Some(text.to_string());
    }

    /// Read the clipboard once and record it if it changed.
    ///
    /// A failed read leaves the cache untouched so the same text is picked up
    /// on the next tick. A failed append does not: that copy is lost.
    pub fn poll_once(&mut self, clipboard: &mut dyn ClipboardBackend) -> Result<Option<HistoryEntry>> {
        self.state = WatcherState::Polling;
        let result = self.observe(clipboard);
        self.state = WatcherState::Idle;
        result
    }

    fn observe(&mut self, clipboard: &mut dyn ClipboardBackend) -> Result<Option<HistoryEntry>> {
        let current = clipboard.read_text()?;
        // An empty or non-text clipboard is a gap, not a copy: the cache keeps
        // the last real text so re-copying it afterwards is still a duplicate.
        if current.is_empty() {
            debug!("Clipboard holds no text");
            return Ok(None);
        }
        if self.last_seen.as_deref() == Some(current.as_str()) {
            return Ok(None);
        }
        self.last_seen = Some(current.clone());

        let entry = self.history.append(&current)?;
        // No receivers is fine: nobody is showing the history right now.
        let _ = self.changed.send(entry.clone());
        Ok(Some(entry))
    }
}
