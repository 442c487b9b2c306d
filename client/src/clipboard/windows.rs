use clipboard_win::{formats, get_clipboard, is_format_avail, set_clipboard};
use clipswap_core::{ClipboardBackend, Error};
use tracing::debug;

pub struct WindowsClipboard;

impl WindowsClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardBackend for WindowsClipboard {
    fn read_text(&mut self) -> Result<String, Error> {
        if !is_format_avail(formats::CF_UNICODETEXT) {
            return Ok(String::new());
        }
        get_clipboard::<String, _>(formats::Unicode).map_err(|e| Error::clipboard(format!("get clipboard: {}", e)))
    }

    fn write_text(&mut self, text: &str) -> Result<(), Error> {
        set_clipboard(formats::Unicode, text).map_err(|e| Error::clipboard(format!("set clipboard: {}", e)))?;
        debug!("Set text content on Windows: {} chars", text.len());
        Ok(())
    }
}
