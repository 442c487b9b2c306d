//! Named key bindings and the manager that keeps them registered with the OS.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

const MODIFIERS: [&str; 4] = ["ctrl", "alt", "shift", "super"];
const SEPARATOR: char = '+';

/// Normalized key combination such as `ctrl+shift+z`.
///
/// Modifiers come first in a fixed order, followed by exactly one main key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombination {
    keys: Vec<String>,
}

impl KeyCombination {
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidCombination {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.trim().is_empty() {
            return Err(invalid("no keys given"));
        }

        let mut modifiers: Vec<&'static str> = Vec::new();
        let mut main_keys: Vec<String> = Vec::new();
        for token in input.split(SEPARATOR) {
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid("empty key name"));
            }
            let name = canonical_key(token);
            match MODIFIERS.iter().find(|m| **m == name) {
                Some(modifier) => {
                    if !modifiers.contains(modifier) {
                        modifiers.push(*modifier);
                    }
                }
                None => {
                    if !main_keys.contains(&name) {
                        main_keys.push(name);
                    }
                }
            }
        }

        match main_keys.len() {
            0 => return Err(invalid("needs a key besides the modifiers")),
            1 => {}
            _ => return Err(invalid("only one key besides the modifiers is allowed")),
        }

        modifiers.sort_by_key(|m| MODIFIERS.iter().position(|known| known == m));
        let mut keys: Vec<String> = modifiers.into_iter().map(str::to_string).collect();
        keys.extend(main_keys);
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

fn canonical_key(token: &str) -> String {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "control" => "ctrl".to_string(),
        "option" => "alt".to_string(),
        "cmd" | "command" | "win" | "meta" => "super".to_string(),
        _ => lower,
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keys.join("+"))
    }
}

impl FromStr for KeyCombination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// The two switch bindings the app knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingName {
    SwitchKey1,
    SwitchKey2,
}

impl BindingName {
    pub const ALL: [BindingName; 2] = [BindingName::SwitchKey1, BindingName::SwitchKey2];

    /// Settings key the binding is persisted under
    pub fn key(self) -> &'static str {
        match self {
            BindingName::SwitchKey1 => "switch_key1",
            BindingName::SwitchKey2 => "switch_key2",
        }
    }

    pub fn default_combination(self) -> KeyCombination {
        let keys = match self {
            BindingName::SwitchKey1 => ["ctrl", "shift", "z"],
            BindingName::SwitchKey2 => ["ctrl", "shift", "y"],
        };
        KeyCombination {
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl fmt::Display for BindingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BindingName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BindingName::ALL
            .into_iter()
            .find(|name| name.key() == s.trim())
            .ok_or_else(|| Error::InvalidCombination {
                input: s.to_string(),
                reason: "unknown binding, expected switch_key1 or switch_key2".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub name: BindingName,
    pub combination: KeyCombination,
}

/// Identifier the OS reports back when a registered hotkey fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyId(pub u32);

/// OS-level global hotkey registration.
pub trait HotkeyRegistrar {
    /// Fails with [`Error::HotkeyConflict`] when the combination is taken.
    fn register(&mut self, combination: &KeyCombination) -> Result<HotkeyId>;
    fn unregister(&mut self, id: HotkeyId) -> Result<()>;
}

struct ActiveBinding {
    combination: KeyCombination,
    id: HotkeyId,
}

/// Owns the registered hotkeys and maps OS events back to bindings.
pub struct HotkeyManager<R> {
    registrar: R,
    active: BTreeMap<BindingName, ActiveBinding>,
}

impl<R: HotkeyRegistrar> HotkeyManager<R> {
    pub fn new(registrar: R) -> Self {
        Self {
            registrar,
            active: BTreeMap::new(),
        }
    }

    /// Register every binding; one that fails stays inactive and is logged.
    /// Returns how many bindings are active afterwards.
    pub fn register_all(&mut self, bindings: &[HotkeyBinding]) -> usize {
        for binding in bindings {
            if let Err(e) = self.rebind(binding.name, binding.combination.clone()) {
                warn!("Hotkey {} not registered: {}", binding.name, e);
            }
        }
        self.active.len()
    }

    /// Swap the combination behind `name`. On failure the previous
    /// combination stays registered and the error is returned.
    pub fn rebind(&mut self, name: BindingName, combination: KeyCombination) -> Result<()> {
        if let Some(current) = self.active.get(&name) {
            if current.combination == combination {
                return Ok(());
            }
        }

        if let Some((other, _)) = self
            .active
            .iter()
            .find(|(other, active)| **other != name && active.combination == combination)
        {
            return Err(Error::HotkeyConflict {
                combination: combination.to_string(),
                reason: format!("already used by {}", other),
            });
        }

        let previous = self.active.remove(&name);
        if let Some(previous) = &previous {
            if let Err(e) = self.registrar.unregister(previous.id) {
                warn!("Failed to unregister {} ({}): {}", name, previous.combination, e);
            }
        }

        match self.registrar.register(&combination) {
            Ok(id) => {
                info!("Bound {} to {}", name, combination);
                self.active.insert(name, ActiveBinding { combination, id });
                Ok(())
            }
            Err(e) => {
                if let Some(previous) = previous {
                    match self.registrar.register(&previous.combination) {
                        Ok(id) => {
                            self.active.insert(
                                name,
                                ActiveBinding {
                                    combination: previous.combination,
                                    id,
                                },
                            );
                        }
                        Err(restore) => {
                            warn!("Could not restore {} to {}: {}", name, previous.combination, restore);
                        }
                    }
                }
                Err(match e {
                    conflict @ Error::HotkeyConflict { .. } => conflict,
                    other => Error::HotkeyConflict {
                        combination: combination.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    pub fn action_for(&self, id: HotkeyId) -> Option<BindingName> {
        self.active
            .iter()
            .find(|(_, active)| active.id == id)
            .map(|(name, _)| *name)
    }

    pub fn combination(&self, name: BindingName) -> Option<&KeyCombination> {
        self.active.get(&name).map(|active| &active.combination)
    }

    /// Bindings the OS accepted; ones that failed to register are left out.
    pub fn active_bindings(&self) -> Vec<HotkeyBinding> {
        self.active
            .iter()
            .map(|(name, active)| HotkeyBinding {
                name: *name,
                combination: active.combination.clone(),
            })
            .collect()
    }

    pub fn unregister_all(&mut self) {
        for (name, active) in std::mem::take(&mut self.active) {
            if let Err(e) = self.registrar.unregister(active.id) {
                warn!("Failed to unregister {}: {}", name, e);
            }
        }
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegistrar;

    fn combo(s: &str) -> KeyCombination {
        KeyCombination::parse(s).unwrap()
    }

    #[test]
    fn parse_normalizes_order_case_and_aliases() {
        assert_eq!(combo("Shift+Control+Z").to_string(), "ctrl+shift+z");
        assert_eq!(combo("z + cmd + option").to_string(), "alt+super+z");
        assert_eq!(combo("ctrl+ctrl+v").to_string(), "ctrl+v");
        assert_eq!(combo("F9").to_string(), "f9");
    }

    #[test]
    fn parse_rejects_unusable_input() {
        for input in ["", "   ", "ctrl+", "ctrl+shift", "ctrl+a+b", "+z"] {
            assert!(
                matches!(KeyCombination::parse(input), Err(Error::InvalidCombination { .. })),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn binding_names_round_trip_through_keys() {
        for name in BindingName::ALL {
            assert_eq!(name.key().parse::<BindingName>().unwrap(), name);
        }
        assert!("switch_key3".parse::<BindingName>().is_err());
    }

    #[test]
    fn rebind_moves_the_action_to_the_new_combination() {
        let mut manager = HotkeyManager::new(FakeRegistrar::default());
        manager.rebind(BindingName::SwitchKey1, combo("ctrl+shift+z")).unwrap();

        manager.rebind(BindingName::SwitchKey1, combo("ctrl+alt+v")).unwrap();

        let old = manager.registrar().press(&combo("ctrl+shift+z"));
        let new = manager.registrar().press(&combo("ctrl+alt+v"));
        assert_eq!(old, None);
        assert_eq!(new.and_then(|id| manager.action_for(id)), Some(BindingName::SwitchKey1));
    }

    #[test]
    fn conflicting_rebind_keeps_previous_binding() {
        let mut registrar = FakeRegistrar::default();
        registrar.block(&combo("ctrl+alt+v"));
        let mut manager = HotkeyManager::new(registrar);
        manager.rebind(BindingName::SwitchKey1, combo("ctrl+shift+z")).unwrap();

        let err = manager.rebind(BindingName::SwitchKey1, combo("ctrl+alt+v")).unwrap_err();

        assert!(matches!(err, Error::HotkeyConflict { .. }));
        assert_eq!(manager.combination(BindingName::SwitchKey1), Some(&combo("ctrl+shift+z")));
        let id = manager.registrar().press(&combo("ctrl+shift+z")).unwrap();
        assert_eq!(manager.action_for(id), Some(BindingName::SwitchKey1));
    }

    #[test]
    fn two_bindings_cannot_share_a_combination() {
        let mut manager = HotkeyManager::new(FakeRegistrar::default());
        manager.rebind(BindingName::SwitchKey1, combo("ctrl+shift+z")).unwrap();

        let err = manager.rebind(BindingName::SwitchKey2, combo("ctrl+shift+z")).unwrap_err();

        assert!(matches!(err, Error::HotkeyConflict { .. }));
        assert_eq!(manager.combination(BindingName::SwitchKey2), None);
    }

    #[test]
    fn register_all_skips_failures() {
        let mut registrar = FakeRegistrar::default();
        registrar.block(&combo("ctrl+shift+y"));
        let mut manager = HotkeyManager::new(registrar);
        let bindings: Vec<HotkeyBinding> = BindingName::ALL
            .into_iter()
            .map(|name| HotkeyBinding {
                name,
                combination: name.default_combination(),
            })
            .collect();

        assert_eq!(manager.register_all(&bindings), 1);
        assert!(manager.combination(BindingName::SwitchKey1).is_some());
        assert!(manager.combination(BindingName::SwitchKey2).is_none());
        assert_eq!(manager.active_bindings(), vec![bindings[0].clone()]);
    }

    #[test]
    fn unregister_all_releases_every_hotkey() {
        let mut manager = HotkeyManager::new(FakeRegistrar::default());
        manager.rebind(BindingName::SwitchKey1, combo("ctrl+shift+z")).unwrap();
        manager.rebind(BindingName::SwitchKey2, combo("ctrl+shift+y")).unwrap();

        manager.unregister_all();

        assert!(manager.registrar().press(&combo("ctrl+shift+z")).is_none());
        assert!(manager.registrar().press(&combo("ctrl+shift+y")).is_none());
    }
}
