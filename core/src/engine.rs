//! The single task every clipboard and hotkey mutation goes through.

use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::clipboard::ClipboardBackend;
use crate::error::{Error, Result};
use crate::history::{HistoryEntry, HistoryStore};
use crate::hotkey::{BindingName, HotkeyBinding, HotkeyId, HotkeyManager, HotkeyRegistrar, KeyCombination};
use crate::settings::SettingsStore;
use crate::switch::{SwitchController, SwitchOutcome};
use crate::watcher::Watcher;

/// How often a running engine refreshes its heartbeat row.
const HEARTBEAT_EVERY: Duration = Duration::from_secs(5);

/// A heartbeat older than this means no daemon is running.
pub const DAEMON_TIMEOUT: Duration = Duration::from_secs(15);

/// Requests sent to the engine by hotkey callbacks and the UI.
#[derive(Debug)]
pub enum Command {
    Switch,
    HotkeyPressed(HotkeyId),
    Rebind {
        name: BindingName,
        combination: KeyCombination,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Quit,
}

/// Whether the loop should keep going after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Engine<R> {
    clipboard: Box<dyn ClipboardBackend>,
    watcher: Watcher,
    switcher: SwitchController,
    hotkeys: HotkeyManager<R>,
    settings: SettingsStore,
    last_beat: Option<Instant>,
}

impl<R: HotkeyRegistrar> Engine<R> {
    pub fn new(
        clipboard: Box<dyn ClipboardBackend>,
        history: HistoryStore,
        settings: SettingsStore,
        registrar: R,
    ) -> Self {
        Self {
            clipboard,
            watcher: Watcher::new(history.clone()),
            switcher: SwitchController::new(history),
            hotkeys: HotkeyManager::new(registrar),
            settings,
            last_beat: None,
        }
    }

    /// Register the persisted bindings, creating defaults on first run.
    pub fn register_hotkeys(&mut self) -> Result<usize> {
        self.settings.ensure_default_bindings()?;
        let bindings = self.settings.bindings()?;
        Ok(self.hotkeys.register_all(&bindings))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEntry> {
        self.watcher.subscribe()
    }

    pub fn hotkeys(&self) -> &HotkeyManager<R> {
        &self.hotkeys
    }

    /// One poll of the clipboard, then any switch a `--switch` run left in
    /// the database. Failures are logged, never propagated.
    pub fn tick(&mut self) {
        match self.watcher.poll_once(&mut *self.clipboard) {
            Ok(Some(entry)) => info!("Recorded clipboard entry {}", entry.id),
            Ok(None) => {}
            Err(Error::ClipboardAccess(reason)) => debug!("Clipboard not readable, retrying next tick: {}", reason),
            Err(e) => error!("Failed to record clipboard change: {}", e),
        }

        self.heartbeat();
        match self.settings.take_switch_request() {
            Ok(true) => {
                debug!("Serving switch requested from the command line");
                self.switch_logged();
            }
            Ok(false) => {}
            Err(e) => warn!("Cannot read switch requests: {}", e),
        }
    }

    fn heartbeat(&mut self) {
        let now = Instant::now();
        if self.last_beat.is_some_and(|at| now.duration_since(at) < HEARTBEAT_EVERY) {
            return;
        }
        match self.settings.beat(Utc::now()) {
            Ok(()) => self.last_beat = Some(now),
            Err(e) => warn!("Cannot write heartbeat: {}", e),
        }
    }

    /// Switch the clipboard and mark the written text as seen in the same
    /// step, so the next tick does not record our own write.
    pub fn switch(&mut self) -> Result<SwitchOutcome> {
        let outcome = self.switcher.switch(&mut *self.clipboard)?;
        if let SwitchOutcome::Switched { to } = &outcome {
            self.watcher.mark_seen(to);
        }
        Ok(outcome)
    }

    /// Rebind a hotkey and persist it once the OS accepted it.
    pub fn rebind(&mut self, name: BindingName, combination: KeyCombination) -> Result<()> {
        self.hotkeys.rebind(name, combination.clone())?;
        self.settings.save_binding(&HotkeyBinding { name, combination })
    }

    pub fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Switch => self.switch_logged(),
            Command::HotkeyPressed(id) => match self.hotkeys.action_for(id) {
                Some(name) => {
                    debug!("Hotkey {} pressed", name);
                    self.switch_logged();
                }
                None => debug!("Ignoring unbound hotkey {:?}", id),
            },
            Command::Rebind {
                name,
                combination,
                reply,
            } => {
                let result = self.rebind(name, combination);
                if let Err(e) = &result {
                    warn!("Rebinding {} failed: {}", name, e);
                }
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Command::Quit => return Flow::Stop,
        }
        Flow::Continue
    }

    fn switch_logged(&mut self) {
        match self.switch() {
            Ok(SwitchOutcome::Switched { to }) => info!("Clipboard switched ({} chars)", to.chars().count()),
            Ok(SwitchOutcome::NotEnoughHistory) => info!("Nothing to switch to yet"),
            Err(e) => warn!("Switch failed: {}", e),
        }
    }

    /// Poll every `interval` and serve commands until `Quit` arrives or all
    /// senders are gone. Hotkeys are released on the way out.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Watching clipboard every {:?}", interval);
        if let Ok(true) = self.settings.take_switch_request() {
            debug!("Dropped a switch request left over from before start");
        }

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(),
                command = commands.recv() => match command {
                    Some(command) => {
                        if self.handle(command) == Flow::Stop {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.hotkeys.unregister_all();
        if let Err(e) = self.settings.clear_heartbeat() {
            warn!("Cannot clear heartbeat: {}", e);
        }
        info!("Clipboard watcher stopped");
    }
}
