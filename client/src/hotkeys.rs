use std::collections::HashMap;

use clipswap_core::{Command, Error, HotkeyId, HotkeyRegistrar, KeyCombination};
use global_hotkey::{hotkey::HotKey, GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// OS global hotkeys via the `global-hotkey` crate.
///
/// When the session offers no global hotkey support (e.g. pure Wayland) the
/// registrar still exists but every registration fails, so the tray and the
/// `--switch` flag keep working.
///
/// Only Linux is wired up: there the crate runs its own X11 event thread.
/// Windows and macOS deliver hotkeys through an event loop on the thread that
/// created the manager, and this binary runs none, so registrations there
/// would succeed and never fire.
pub struct GlobalHotkeyRegistrar {
    manager: Result<GlobalHotKeyManager, String>,
    registered: HashMap<u32, HotKey>,
}

impl GlobalHotkeyRegistrar {
    #[cfg(target_os = "linux")]
    pub fn new() -> Self {
        match GlobalHotKeyManager::new() {
            Ok(manager) => Self {
                manager: Ok(manager),
                registered: HashMap::new(),
            },
            Err(e) => {
                warn!("Global hotkeys unavailable: {}", e);
                Self::unavailable(format!("global hotkeys are not available in this session: {}", e))
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    pub fn new() -> Self {
        warn!("Global hotkeys are only supported on Linux; bind `clipswap --switch` to a shortcut instead");
        Self::unavailable("global hotkeys are not supported on this platform".to_string())
    }

    fn unavailable(reason: String) -> Self {
        Self {
            manager: Err(reason),
            registered: HashMap::new(),
        }
    }
}

/// Translate a normalized combination into the crate's hotkey type.
pub fn to_hotkey(combination: &KeyCombination) -> Result<HotKey, Error> {
    combination
        .to_string()
        .parse::<HotKey>()
        .map_err(|e| Error::InvalidCombination {
            input: combination.to_string(),
            reason: e.to_string(),
        })
}

impl HotkeyRegistrar for GlobalHotkeyRegistrar {
    fn register(&mut self, combination: &KeyCombination) -> Result<HotkeyId, Error> {
        let hotkey = to_hotkey(combination)?;
        let manager = self.manager.as_ref().map_err(|reason| Error::HotkeyConflict {
            combination: combination.to_string(),
            reason: reason.clone(),
        })?;
        manager.register(hotkey).map_err(|e| Error::HotkeyConflict {
            combination: combination.to_string(),
            reason: e.to_string(),
        })?;
        self.registered.insert(hotkey.id(), hotkey);
        Ok(HotkeyId(hotkey.id()))
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<(), Error> {
        let (Ok(manager), Some(hotkey)) = (&self.manager, self.registered.remove(&id.0)) else {
            return Ok(());
        };
        manager.unregister(hotkey).map_err(|e| Error::HotkeyConflict {
            combination: hotkey.into_string(),
            reason: e.to_string(),
        })
    }
}

/// Forward key presses to the engine from a dedicated thread; the OS
/// delivers them wherever its input hook runs.
pub fn forward_events(commands: UnboundedSender<Command>) {
    if cfg!(not(target_os = "linux")) {
        return;
    }
    std::thread::spawn(move || {
        for event in GlobalHotKeyEvent::receiver().iter() {
            if event.state != HotKeyState::Pressed {
                continue;
            }
            debug!("Hotkey event {}", event.id);
            if commands.send(Command::HotkeyPressed(HotkeyId(event.id))).is_err() {
                break;
            }
        }
    });
}
