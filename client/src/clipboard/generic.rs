use clipswap_core::{ClipboardBackend, Error};
use tracing::debug;

/// arboard-backed clipboard (X11, macOS).
///
/// On X11 the written text is served by this instance, so it has to live as
/// long as the process. With `wait` set, writes block until another
/// application takes ownership of the clipboard.
pub struct ArboardClipboard {
    inner: arboard::Clipboard,
    wait: bool,
}

impl ArboardClipboard {
    pub fn new(wait: bool) -> Result<Self, Error> {
        Ok(Self {
            inner: arboard::Clipboard::new().map_err(Error::clipboard)?,
            wait,
        })
    }

    #[cfg(target_os = "linux")]
    fn set(&mut self, text: &str) -> Result<(), arboard::Error> {
        use arboard::SetExtLinux;

        if self.wait {
            tracing::info!("Serving clipboard text until something else is copied");
            return self.inner.set().wait().text(text);
        }
        self.inner.set_text(text)
    }

    // The pasteboard keeps its contents after the process exits.
    #[cfg(not(target_os = "linux"))]
    fn set(&mut self, text: &str) -> Result<(), arboard::Error> {
        self.inner.set_text(text)
    }
}

impl ClipboardBackend for ArboardClipboard {
    fn read_text(&mut self) -> Result<String, Error> {
        match self.inner.get_text() {
            Ok(text) => Ok(text),
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => Err(Error::clipboard(e)),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), Error> {
        self.set(text).map_err(Error::clipboard)?;
        debug!("Set clipboard text: {} chars", text.len());
        Ok(())
    }
}
