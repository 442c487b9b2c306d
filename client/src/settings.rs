//! Small desktop dialogs for editing a key binding, via zenity or kdialog.

use std::io;
use std::process::{Command, Output};

use clipswap_core::BindingName;
use tracing::warn;

fn dialog_title(name: BindingName) -> String {
    match name {
        BindingName::SwitchKey1 => "Clip Swap - Switch Key 1".to_string(),
        BindingName::SwitchKey2 => "Clip Swap - Switch Key 2".to_string(),
    }
}

// `Err` only when the tool could not be started; a cancelled dialog is `Ok(None)`.
fn try_zenity(title: &str, input: &str) -> io::Result<Option<String>> {
    let output = Command::new("zenity")
        .arg("--entry")
        .arg(format!("--title={}", title))
        .arg("--text=Key combination (e.g. ctrl+shift+z):")
        .arg(format!("--entry-text={}", input))
        .output()?;
    Ok(answer(&output))
}

fn try_kdialog(title: &str, input: &str) -> io::Result<Option<String>> {
    let output = Command::new("kdialog")
        .arg("--title")
        .arg(title)
        .arg("--inputbox")
        .arg("Key combination (e.g. ctrl+shift+z):")
        .arg(input)
        .output()?;
    Ok(answer(&output))
}

fn answer(output: &Output) -> Option<String> {
    if output.status.success() {
        non_empty(&output.stdout)
    } else {
        None
    }
}

/// Use the first dialog tool that exists. A cancel in that tool is final.
fn first_available<F>(first: io::Result<Option<String>>, second: F) -> Option<String>
where
    F: FnOnce() -> io::Result<Option<String>>,
{
    match first {
        Ok(answer) => answer,
        Err(_) => match second() {
            Ok(answer) => answer,
            Err(e) => {
                warn!("No dialog tool available (install zenity or kdialog): {}", e);
                None
            }
        },
    }
}

fn non_empty(stdout: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(stdout).trim().to_string();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Ask the user for a new combination. `None` when cancelled or when no
/// dialog tool is installed.
pub fn prompt_combination(name: BindingName, current: &str) -> Option<String> {
    let title = dialog_title(name);
    first_available(try_zenity(&title, current), || try_kdialog(&title, current))
}

/// Tell the user a binding could not be applied.
pub fn show_error(message: &str) {
    let zenity = Command::new("zenity")
        .arg("--error")
        .arg("--title=Clip Swap")
        .arg(format!("--text={}", message))
        .status();
    if zenity.is_ok() {
        return;
    }
    let kdialog = Command::new("kdialog").arg("--error").arg(message).status();
    if kdialog.is_err() {
        warn!("{}", message);
    }
}
