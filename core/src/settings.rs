use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::Result;
use crate::hotkey::{BindingName, HotkeyBinding, KeyCombination};

const SWITCH_REQUEST: &str = "pending_switch";
const DAEMON_HEARTBEAT: &str = "daemon_heartbeat";

/// Durable key-value settings, stored next to the history.
///
/// Besides the bindings it carries the hand-off between a one-shot
/// `--switch` and a running daemon: the daemon keeps a heartbeat row fresh
/// and serves any pending switch request on its next tick.
#[derive(Clone)]
pub struct SettingsStore {
    db: Arc<Database>,
}

impl SettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.db.lock();
        let value = conn
            .query_row(
                "SELECT key_value FROM settings WHERE key_name = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO settings (key_name, key_value) VALUES (?1, ?2)
             ON CONFLICT(key_name) DO UPDATE SET key_value = excluded.key_value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Write the default combination for every binding that has none yet.
    pub fn ensure_default_bindings(&self) -> Result<()> {
        let conn = self.db.lock();
        for name in BindingName::ALL {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO settings (key_name, key_value) VALUES (?1, ?2)",
                params![name.key(), name.default_combination().to_string()],
            )?;
            if inserted > 0 {
                info!("Created default binding {} = {}", name, name.default_combination());
            }
        }
        Ok(())
    }

    /// Stored combination for `name`, or its default when missing. A stored
    /// value that no longer parses is overwritten with the default.
    pub fn binding(&self, name: BindingName) -> Result<KeyCombination> {
        let Some(stored) = self.get(name.key())? else {
            return Ok(name.default_combination());
        };
        match KeyCombination::parse(&stored) {
            Ok(combination) => Ok(combination),
            Err(e) => {
                let default = name.default_combination();
                warn!("Replacing stored {} with {}: {}", name, default, e);
                self.put(name.key(), &default.to_string())?;
                Ok(default)
            }
        }
    }

    pub fn bindings(&self) -> Result<Vec<HotkeyBinding>> {
        BindingName::ALL
            .into_iter()
            .map(|name| {
                Ok(HotkeyBinding {
                    name,
                    combination: self.binding(name)?,
                })
            })
            .collect()
    }

    pub fn save_binding(&self, binding: &HotkeyBinding) -> Result<()> {
        self.put(binding.name.key(), &binding.combination.to_string())
    }

    /// Ask the running daemon to switch on its next tick.
    pub fn request_switch(&self) -> Result<()> {
        self.put(SWITCH_REQUEST, &Utc::now().to_rfc3339())
    }

    /// Consume a pending switch request, if any.
    pub fn take_switch_request(&self) -> Result<bool> {
        let conn = self.db.lock();
        let removed = conn.execute("DELETE FROM settings WHERE key_name = ?1", params![SWITCH_REQUEST])?;
        Ok(removed > 0)
    }

    pub fn beat(&self, at: DateTime<Utc>) -> Result<()> {
        self.put(DAEMON_HEARTBEAT, &at.to_rfc3339())
    }

    pub fn clear_heartbeat(&self) -> Result<()> {
        let conn = self.db.lock();
        conn.execute("DELETE FROM settings WHERE key_name = ?1", params![DAEMON_HEARTBEAT])?;
        Ok(())
    }

    /// Whether a daemon refreshed its heartbeat within `max_age`.
    pub fn daemon_alive(&self, max_age: Duration) -> Result<bool> {
        let Some(stored) = self.get(DAEMON_HEARTBEAT)? else {
            return Ok(false);
        };
        let seen = match DateTime::parse_from_rfc3339(&stored) {
            Ok(seen) => seen.with_timezone(&Utc),
            Err(e) => {
                debug!("Unreadable heartbeat {:?}: {}", stored, e);
                return Ok(false);
            }
        };
        // A heartbeat from the future means the clock moved back; count it as fresh.
        Ok((Utc::now() - seen).to_std().map_or(true, |age| age <= max_age))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SettingsStore {
        SettingsStore::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn get_missing_key_is_none() {
        assert_eq!(settings().get("nothing").unwrap(), None);
    }

    #[test]
    fn put_overwrites_previous_value() {
        let settings = settings();
        settings.put("switch_key1", "ctrl+a").unwrap();
        settings.put("switch_key1", "ctrl+b").unwrap();

        assert_eq!(settings.get("switch_key1").unwrap().as_deref(), Some("ctrl+b"));
    }

    #[test]
    fn defaults_do_not_override_user_bindings() {
        let settings = settings();
        settings.put("switch_key1", "ctrl+alt+v").unwrap();

        settings.ensure_default_bindings().unwrap();

        assert_eq!(settings.get("switch_key1").unwrap().as_deref(), Some("ctrl+alt+v"));
        assert_eq!(settings.get("switch_key2").unwrap().as_deref(), Some("ctrl+shift+y"));
    }

    #[test]
    fn unparseable_binding_falls_back_to_default() {
        let settings = settings();
        settings.put("switch_key2", "ctrl+").unwrap();

        let combination = settings.binding(BindingName::SwitchKey2).unwrap();

        assert_eq!(combination, BindingName::SwitchKey2.default_combination());
        assert_eq!(settings.get("switch_key2").unwrap().as_deref(), Some("ctrl+shift+y"));
    }

    #[test]
    fn switch_request_is_taken_once() {
        let settings = settings();
        assert!(!settings.take_switch_request().unwrap());

        settings.request_switch().unwrap();

        assert!(settings.take_switch_request().unwrap());
        assert!(!settings.take_switch_request().unwrap());
    }

    #[test]
    fn daemon_is_alive_only_with_a_fresh_heartbeat() {
        let settings = settings();
        let max_age = Duration::from_secs(15);
        assert!(!settings.daemon_alive(max_age).unwrap());

        settings.beat(Utc::now()).unwrap();
        assert!(settings.daemon_alive(max_age).unwrap());

        settings.beat(Utc::now() - chrono::Duration::minutes(5)).unwrap();
        assert!(!settings.daemon_alive(max_age).unwrap());

        settings.beat(Utc::now()).unwrap();
        settings.clear_heartbeat().unwrap();
        assert!(!settings.daemon_alive(max_age).unwrap());
    }

    #[test]
    fn saved_binding_is_read_back_normalized() {
        let settings = settings();
        let binding = HotkeyBinding {
            name: BindingName::SwitchKey1,
            combination: KeyCombination::parse("V+Alt+Control").unwrap(),
        };

        settings.save_binding(&binding).unwrap();

        assert_eq!(settings.get("switch_key1").unwrap().as_deref(), Some("ctrl+alt+v"));
        assert_eq!(settings.bindings().unwrap()[0], binding);
    }
}
