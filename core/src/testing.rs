//! In-memory stand-ins for the OS capabilities, shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::clipboard::ClipboardBackend;
use crate::error::{Error, Result};
use crate::hotkey::{HotkeyId, HotkeyRegistrar, KeyCombination};

#[derive(Default)]
struct ClipState {
    text: String,
    unavailable: bool,
    writes: Vec<String>,
}

/// Clipboard whose handle can be cloned so a test keeps access after the
/// engine took ownership of one copy.
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<ClipState>>,
}

impl MemoryClipboard {
    /// Simulate another application copying `text`
    pub fn copy(&self, text: &str) {
        self.state.lock().unwrap().text = text.to_string();
    }

    pub fn text(&self) -> String {
        self.state.lock().unwrap().text.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }
}

impl ClipboardBackend for MemoryClipboard {
    fn read_text(&mut self) -> Result<String> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(Error::clipboard("locked by another process"));
        }
        Ok(state.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(Error::clipboard("locked by another process"));
        }
        state.text = text.to_string();
        state.writes.push(text.to_string());
        Ok(())
    }
}

/// Registrar that tracks registrations and can simulate key presses.
#[derive(Default)]
pub struct FakeRegistrar {
    registered: HashMap<String, HotkeyId>,
    blocked: HashSet<String>,
    next_id: u32,
}

impl FakeRegistrar {
    /// Pretend another application owns `combination`
    pub fn block(&mut self, combination: &KeyCombination) {
        self.blocked.insert(combination.to_string());
    }

    /// The id the OS would report for a press, if anything is registered
    pub fn press(&self, combination: &KeyCombination) -> Option<HotkeyId> {
        self.registered.get(&combination.to_string()).copied()
    }
}

impl HotkeyRegistrar for FakeRegistrar {
    fn register(&mut self, combination: &KeyCombination) -> Result<HotkeyId> {
        let key = combination.to_string();
        if self.blocked.contains(&key) || self.registered.contains_key(&key) {
            return Err(Error::HotkeyConflict {
                combination: key,
                reason: "taken".to_string(),
            });
        }
        self.next_id += 1;
        let id = HotkeyId(self.next_id);
        self.registered.insert(key, id);
        Ok(id)
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<()> {
        self.registered.retain(|_, registered| *registered != id);
        Ok(())
    }
}
