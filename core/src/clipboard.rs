use crate::error::Result;

/// Text access to the OS clipboard.
///
/// `read_text` returns an empty string when the clipboard holds no text
/// (empty, or only non-text formats). Errors mean the clipboard could not be
/// reached at all, e.g. because another process holds it open.
pub trait ClipboardBackend: Send {
    fn read_text(&mut self) -> Result<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

