use std::io::Read;

use clipswap_core::{ClipboardBackend, Error};
use tracing::{debug, info};
use wl_clipboard_rs::{
    copy::{MimeType as CopyMimeType, Options, Source},
    paste::{get_contents, ClipboardType, Error as PasteError, MimeType, Seat},
};

/// Wayland clipboard through the data-control protocol.
///
/// Written text is served by this process. In the background (daemon) mode
/// a serving thread lives as long as the process; in the foreground mode
/// `write_text` blocks until another client takes the selection.
pub struct WaylandClipboard {
    foreground: bool,
}

impl WaylandClipboard {
    pub fn new(foreground: bool) -> Self {
        Self { foreground }
    }
}

impl ClipboardBackend for WaylandClipboard {
    fn read_text(&mut self) -> Result<String, Error> {
        match get_contents(ClipboardType::Regular, Seat::Unspecified, MimeType::Text) {
            Ok((mut pipe, _)) => {
                let mut contents = String::new();
                pipe.read_to_string(&mut contents).map_err(Error::clipboard)?;
                Ok(contents)
            }
            Err(PasteError::NoSeats | PasteError::ClipboardEmpty | PasteError::NoMimeType) => Ok(String::new()),
            Err(e) => Err(Error::clipboard(e)),
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), Error> {
        let source = Source::Bytes(text.as_bytes().to_vec().into_boxed_slice());
        let mut options = Options::new();
        options.foreground(self.foreground);
        if self.foreground {
            info!("Serving clipboard text until something else is copied");
        }
        options.copy(source, CopyMimeType::Text).map_err(Error::clipboard)?;
        debug!("Set Wayland clipboard text: {} chars", text.len());
        Ok(())
    }
}
