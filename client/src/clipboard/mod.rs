use clipswap_core::{ClipboardBackend, Error};
use tracing::info;

#[cfg(not(target_os = "windows"))]
mod generic;
#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
pub use generic::ArboardClipboard;
#[cfg(target_os = "linux")]
pub use linux::WaylandClipboard;
#[cfg(target_os = "windows")]
pub use windows::WindowsClipboard;

/// Who keeps written text available once the write returns.
///
/// On X11 and Wayland the writing process serves the clipboard itself, so a
/// short-lived process has to stay around until someone else copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The daemon lives on and serves in the background
    Background,
    /// One-shot command: block in the write until the text is replaced
    UntilReplaced,
}

/// Pick the clipboard backend for the running session.
#[cfg(target_os = "linux")]
pub fn system_clipboard(ownership: Ownership) -> Result<Box<dyn ClipboardBackend>, Error> {
    let hold = ownership == Ownership::UntilReplaced;
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        info!("Using Wayland clipboard");
        return Ok(Box::new(WaylandClipboard::new(hold)));
    }
    info!("Using X11 clipboard");
    Ok(Box::new(ArboardClipboard::new(hold)?))
}

// Windows owns clipboard data once it is set.
#[cfg(target_os = "windows")]
pub fn system_clipboard(_ownership: Ownership) -> Result<Box<dyn ClipboardBackend>, Error> {
    info!("Using Windows clipboard");
    Ok(Box::new(WindowsClipboard::new()))
}

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
pub fn system_clipboard(ownership: Ownership) -> Result<Box<dyn ClipboardBackend>, Error> {
    info!("Using arboard clipboard");
    Ok(Box::new(ArboardClipboard::new(ownership == Ownership::UntilReplaced)?))
}
