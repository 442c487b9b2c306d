//! Clip Swap
//!
//! Keeps the last two clipboard texts and swaps between them on a hotkey.

use std::sync::Arc;

use clipswap_core::{
    Database, Engine, Error, HistoryStore, HotkeyBinding, SettingsStore, SwitchController, SwitchOutcome,
    DAEMON_TIMEOUT,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod clipboard;
mod config;
mod hotkeys;
mod settings;
mod tray;

use cli::Action;
use clipboard::Ownership;
use config::Config;
use hotkeys::GlobalHotkeyRegistrar;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let action = cli::parse_args(std::env::args().skip(1))?;
    if action == Action::Help {
        cli::print_usage();
        return Ok(());
    }

    let config = Config::load();
    init_logging(&config);

    if config.is_first_run() {
        info!("First run detected, saving default configuration...");
        if let Err(e) = config.save() {
            error!("Failed to save default config: {}", e);
        }
    }

    let db_path = config.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!("History database at {}", db_path.display());
    let history = HistoryStore::new(db.clone(), config.history_capacity);
    let settings = SettingsStore::new(db);

    match action {
        Action::PrintHistory => {
            println!("{}", serde_json::to_string_pretty(&history.entries()?)?);
            Ok(())
        }
        Action::Switch => {
            // The daemon owns the clipboard and knows not to record its own write.
            if settings.daemon_alive(DAEMON_TIMEOUT)? {
                settings.request_switch()?;
                info!("Switch handed to the running clipswap");
                return Ok(());
            }
            let mut clipboard = clipboard::system_clipboard(Ownership::UntilReplaced)?;
            match SwitchController::new(history).switch(&mut *clipboard)? {
                SwitchOutcome::Switched { to } => info!("Clipboard switched ({} chars)", to.chars().count()),
                SwitchOutcome::NotEnoughHistory => info!("Nothing to switch to yet"),
            }
            Ok(())
        }
        Action::Bind { name, combination } => {
            settings.ensure_default_bindings()?;
            let taken = settings
                .bindings()?
                .into_iter()
                .find(|b| b.name != name && b.combination == combination);
            if let Some(other) = taken {
                return Err(Error::HotkeyConflict {
                    combination: combination.to_string(),
                    reason: format!("already bound to {}", other.name),
                }
                .into());
            }
            settings.save_binding(&HotkeyBinding { name, combination })?;
            println!("{} saved; restart clipswap to apply it", name);
            Ok(())
        }
        Action::Run { tray } => run(&config, history, settings, tray && config.show_tray).await,
        Action::Help => Ok(()),
    }
}

async fn run(
    config: &Config,
    history: HistoryStore,
    settings: SettingsStore,
    show_tray: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Clip Swap");

    let clipboard = clipboard::system_clipboard(Ownership::Background)?;
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    let mut engine = Engine::new(clipboard, history.clone(), settings.clone(), GlobalHotkeyRegistrar::new());
    let active = engine.register_hotkeys()?;
    if active == 0 {
        warn!("No switch hotkey is active; use the tray menu or `clipswap --switch`");
    }
    hotkeys::forward_events(cmd_tx.clone());

    if show_tray {
        let controller = tray::start_tray(
            history.latest(history.capacity())?,
            engine.hotkeys().active_bindings(),
            cmd_tx.clone(),
        );
        let mut changes = engine.subscribe();
        let history = history.clone();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
                match history.latest(history.capacity()) {
                    Ok(items) => controller.set_history(items),
                    Err(e) => warn!("Cannot refresh tray history: {}", e),
                }
            }
        });
    }

    {
        let cmd_tx = cmd_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                let _ = cmd_tx.send(clipswap_core::Command::Quit);
            }
        });
    }
    drop(cmd_tx);

    engine.run(cmd_rx, config.poll_interval()).await;
    Ok(())
}
