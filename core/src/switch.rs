use tracing::debug;

use crate::clipboard::ClipboardBackend;
use crate::error::Result;
use crate::history::HistoryStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Fewer than two entries recorded; the clipboard was left alone
    NotEnoughHistory,
    /// The clipboard now holds `to`
    Switched { to: String },
}

/// Toggles the clipboard between the two most recent history entries.
#[derive(Clone)]
pub struct SwitchController {
    history: HistoryStore,
}

impl SwitchController {
    pub fn new(history: HistoryStore) -> Self {
        Self { history }
    }

    /// If the clipboard holds the newest entry, put the one before it back;
    /// otherwise restore the newest. The target is recomputed from the live
    /// clipboard every call, so repeated calls alternate.
    pub fn switch(&self, clipboard: &mut dyn ClipboardBackend) -> Result<SwitchOutcome> {
        let items = self.history.latest(2)?;
        let [newest, previous] = items.as_slice() else {
            debug!("Switch skipped, {} history entries", items.len());
            return Ok(SwitchOutcome::NotEnoughHistory);
        };

        let current = clipboard.read_text()?;
        let target = if current == *newest { previous } else { newest };
        clipboard.write_text(target)?;
        Ok(SwitchOutcome::Switched { to: target.clone() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::Database;
    use crate::testing::MemoryClipboard;

    fn setup(entries: &[&str]) -> (SwitchController, MemoryClipboard) {
        let history = HistoryStore::new(Arc::new(Database::open_in_memory().unwrap()), 2);
        for entry in entries {
            history.append(entry).unwrap();
        }
        (SwitchController::new(history), MemoryClipboard::default())
    }

    #[test]
    fn empty_history_leaves_clipboard_alone() {
        let (switcher, mut clipboard) = setup(&[]);
        clipboard.copy("untouched");

        assert_eq!(switcher.switch(&mut clipboard).unwrap(), SwitchOutcome::NotEnoughHistory);
        assert_eq!(clipboard.text(), "untouched");
        assert!(clipboard.writes().is_empty());
    }

    #[test]
    fn single_entry_is_not_enough() {
        let (switcher, mut clipboard) = setup(&["only"]);
        clipboard.copy("only");

        assert_eq!(switcher.switch(&mut clipboard).unwrap(), SwitchOutcome::NotEnoughHistory);
        assert_eq!(clipboard.text(), "only");
    }

    #[test]
    fn newest_on_clipboard_switches_to_previous() {
        let (switcher, mut clipboard) = setup(&["x", "y"]);
        clipboard.copy("y");

        switcher.switch(&mut clipboard).unwrap();

        assert_eq!(clipboard.text(), "x");
    }

    #[test]
    fn anything_else_on_clipboard_restores_newest() {
        let (switcher, mut clipboard) = setup(&["x", "y"]);
        clipboard.copy("something unrelated");

        let outcome = switcher.switch(&mut clipboard).unwrap();

        assert_eq!(outcome, SwitchOutcome::Switched { to: "y".to_string() });
        assert_eq!(clipboard.text(), "y");
    }

    #[test]
    fn switching_twice_round_trips() {
        let (switcher, mut clipboard) = setup(&["x", "y"]);
        clipboard.copy("y");

        switcher.switch(&mut clipboard).unwrap();
        switcher.switch(&mut clipboard).unwrap();

        assert_eq!(clipboard.text(), "y");
        assert_eq!(clipboard.writes(), vec!["x", "y"]);
    }
}
