use clipswap_core::{BindingName, KeyCombination};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("unknown argument: {0} (use --help for usage)")]
    Unknown(String),
    #[error("--bind expects <name>=<combination>, got: {0}")]
    MalformedBind(String),
    #[error("--bind expects a value")]
    MissingBind,
    #[error(transparent)]
    Core(#[from] clipswap_core::Error),
}

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run { tray: bool },
    PrintHistory,
    Switch,
    Bind { name: BindingName, combination: KeyCombination },
    Help,
}

pub fn parse_args<I>(args: I) -> Result<Action, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut tray = true;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--history" => return Ok(Action::PrintHistory),
            "--switch" => return Ok(Action::Switch),
            "--bind" => {
                let value = args.next().ok_or(CliError::MissingBind)?;
                return parse_bind(&value);
            }
            "--no-tray" => tray = false,
            "--help" | "-h" => return Ok(Action::Help),
            other => {
                if let Some(value) = other.strip_prefix("--bind=") {
                    return parse_bind(value);
                }
                return Err(CliError::Unknown(arg));
            }
        }
    }

    Ok(Action::Run { tray })
}

fn parse_bind(value: &str) -> Result<Action, CliError> {
    let (name, combination) = value
        .split_once('=')
        .ok_or_else(|| CliError::MalformedBind(value.to_string()))?;
    Ok(Action::Bind {
        name: name.trim().parse()?,
        combination: KeyCombination::parse(combination)?,
    })
}

pub fn print_usage() {
    println!("clipswap usage:");
    println!("  (no arguments)              watch the clipboard and listen for switch hotkeys");
    println!("  --no-tray                   run without the tray icon");
    println!("  --history                   print the retained entries as JSON and exit");
    println!("  --switch                    swap the clipboard to the previous entry and exit");
    println!("  --bind <name>=<combination> store a binding, e.g. switch_key1=ctrl+alt+v");
    println!("  --help, -h                  show this help");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Action, CliError> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_arguments_runs_with_tray() {
        assert_eq!(parse(&[]).unwrap(), Action::Run { tray: true });
        assert_eq!(parse(&["--no-tray"]).unwrap(), Action::Run { tray: false });
    }

    #[test]
    fn one_shot_actions() {
        assert_eq!(parse(&["--history"]).unwrap(), Action::PrintHistory);
        assert_eq!(parse(&["--switch"]).unwrap(), Action::Switch);
        assert_eq!(parse(&["-h"]).unwrap(), Action::Help);
    }

    #[test]
    fn bind_accepts_both_spellings() {
        let expected = Action::Bind {
            name: BindingName::SwitchKey2,
            combination: KeyCombination::parse("ctrl+alt+v").unwrap(),
        };

        assert_eq!(parse(&["--bind", "switch_key2=Ctrl+Alt+V"]).unwrap(), expected);
        assert_eq!(parse(&["--bind=switch_key2=ctrl+alt+v"]).unwrap(), expected);
    }

    #[test]
    fn bind_rejects_bad_input() {
        assert!(matches!(parse(&["--bind"]), Err(CliError::MissingBind)));
        assert!(matches!(parse(&["--bind", "ctrl+z"]), Err(CliError::MalformedBind(_))));
        assert!(matches!(parse(&["--bind", "switch_key3=ctrl+z"]), Err(CliError::Core(_))));
        assert!(matches!(parse(&["--bind", "switch_key1=ctrl+shift"]), Err(CliError::Core(_))));
    }

    #[test]
    fn unknown_flags_fail() {
        assert!(matches!(parse(&["--verbose"]), Err(CliError::Unknown(_))));
    }
}
