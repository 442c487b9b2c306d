// Linux system tray integration using ksni (StatusNotifier)
// Shows the retained history and bindings, with Switch, rebinding and Quit actions.

use clipswap_core::{BindingName, Command, HotkeyBinding};
use tokio::sync::mpsc::UnboundedSender;

const PREVIEW_CHARS: usize = 40;

/// One-line menu label for a history entry.
pub fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    let mut label: String = line.chars().take(PREVIEW_CHARS).collect();
    if line.chars().count() > PREVIEW_CHARS || text.trim().lines().count() > 1 {
        label.push('…');
    }
    if label.is_empty() {
        label.push_str("(blank)");
    }
    label
}

/// Menu label for a binding; `None` when its hotkey is not registered.
pub fn binding_label(name: BindingName, active: Option<&str>) -> String {
    let number = match name {
        BindingName::SwitchKey1 => 1,
        BindingName::SwitchKey2 => 2,
    };
    format!("Set switch key {} ({})…", number, active.unwrap_or("inactive"))
}

#[cfg(target_os = "linux")]
pub use linux::{start_tray, TrayController};

#[cfg(target_os = "linux")]
mod linux {
    use std::collections::BTreeMap;

    use clipswap_core::KeyCombination;
    use tokio::sync::oneshot;
    use tracing::{info, warn};

    use super::*;

    pub struct TrayController {
        handle: ksni::Handle<AppTray>,
    }

    impl TrayController {
        pub fn set_history(&self, items: Vec<String>) {
            self.handle.update(|t| t.history = items);
        }
    }

    /// `bindings` are the registered ones; any binding missing from it is
    /// shown as inactive.
    pub fn start_tray(
        history: Vec<String>,
        bindings: Vec<HotkeyBinding>,
        commands: UnboundedSender<Command>,
    ) -> TrayController {
        let tray = AppTray {
            history,
            bindings: bindings
                .into_iter()
                .map(|b| (b.name, b.combination.to_string()))
                .collect(),
            commands,
        };
        let service = ksni::TrayService::new(tray);
        let handle = service.handle();
        service.spawn();
        TrayController { handle }
    }

    struct AppTray {
        history: Vec<String>,
        bindings: BTreeMap<BindingName, String>,
        commands: UnboundedSender<Command>,
    }

    impl AppTray {
        /// Runs on the tray thread; blocks on the dialog and on the engine's answer.
        fn edit_binding(&mut self, name: BindingName) {
            let current = self.bindings.get(&name).cloned().unwrap_or_default();
            let Some(input) = crate::settings::prompt_combination(name, &current) else {
                return;
            };
            let combination = match KeyCombination::parse(&input) {
                Ok(combination) => combination,
                Err(e) => {
                    crate::settings::show_error(&e.to_string());
                    return;
                }
            };

            let (reply, answer) = oneshot::channel();
            let request = Command::Rebind {
                name,
                combination: combination.clone(),
                reply: Some(reply),
            };
            if self.commands.send(request).is_err() {
                warn!("Engine stopped, cannot rebind {}", name);
                return;
            }
            match answer.blocking_recv() {
                Ok(Ok(())) => {
                    info!("{} rebound from tray", name);
                    self.bindings.insert(name, combination.to_string());
                }
                Ok(Err(e)) => crate::settings::show_error(&e.to_string()),
                Err(_) => warn!("Engine dropped the rebind request for {}", name),
            }
        }
    }

    fn escape(label: &str) -> String {
        label.replace('_', "__")
    }

    fn label_item(label: String) -> ksni::MenuItem<AppTray> {
        ksni::MenuItem::Standard(ksni::menu::StandardItem {
            label: escape(&label),
            enabled: false,
            ..Default::default()
        })
    }

    impl ksni::Tray for AppTray {
        fn id(&self) -> String {
            "clipswap".into()
        }

        fn title(&self) -> String {
            "Clip Swap".into()
        }

        fn icon_pixmap(&self) -> Vec<ksni::Icon> {
            // Clipboard glyph; the dot turns green once there is something to switch to.
            fn make_icon(size: i32, ready: bool) -> ksni::Icon {
                let s = size as usize;
                let mut data = vec![0u8; s * s * 4];

                // ksni wants ARGB32
                fn put(data: &mut [u8], s: usize, x: usize, y: usize, r: u8, g: u8, b: u8) {
                    if x >= s || y >= s {
                        return;
                    }
                    let i = (y * s + x) * 4;
                    data[i..i + 4].copy_from_slice(&[255, r, g, b]);
                }
                fn fill_rect(data: &mut [u8], s: usize, x0: usize, y0: usize, x1: usize, y1: usize, rgb: (u8, u8, u8)) {
                    for y in y0..y1 {
                        for x in x0..x1 {
                            put(data, s, x, y, rgb.0, rgb.1, rgb.2);
                        }
                    }
                }
                fn outline(data: &mut [u8], s: usize, x0: usize, y0: usize, x1: usize, y1: usize) {
                    for x in x0..x1 {
                        put(data, s, x, y0, 60, 60, 70);
                        put(data, s, x, y1 - 1, 60, 60, 70);
                    }
                    for y in y0..y1 {
                        put(data, s, x0, y, 60, 60, 70);
                        put(data, s, x1 - 1, y, 60, 60, 70);
                    }
                }

                let pad = (size as f32 * 0.18) as usize;
                let top = pad + (size as f32 * 0.18) as usize;
                let right = s - pad;
                let bottom = s - pad;
                fill_rect(&mut data, s, pad, top, right, bottom, (240, 240, 245));
                outline(&mut data, s, pad, top, right, bottom);

                let clip_h = (size as f32 * 0.16) as usize;
                let clip_w = (size as f32 * 0.46) as usize;
                let cx0 = (s - clip_w) / 2;
                fill_rect(&mut data, s, cx0, pad, cx0 + clip_w, pad + clip_h, (200, 200, 210));
                outline(&mut data, s, cx0, pad, cx0 + clip_w, pad + clip_h);

                let dot_r = (size as f32 * 0.12) as i32;
                let cx = right as i32 - dot_r - 2;
                let cy = bottom as i32 - dot_r - 2;
                let (r, g, b) = if ready { (46, 204, 113) } else { (150, 150, 160) };
                for dy in -dot_r..=dot_r {
                    for dx in -dot_r..=dot_r {
                        if dx * dx + dy * dy <= dot_r * dot_r {
                            put(&mut data, s, (cx + dx) as usize, (cy + dy) as usize, r, g, b);
                        }
                    }
                }

                ksni::Icon { width: size, height: size, data }
            }

            let ready = self.history.len() >= 2;
            vec![make_icon(16, ready), make_icon(24, ready), make_icon(32, ready)]
        }

        fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
            let mut items = Vec::new();
            if self.history.is_empty() {
                items.push(label_item("No history yet".to_string()));
            }
            for (i, text) in self.history.iter().enumerate() {
                items.push(label_item(format!("{}. {}", i + 1, super::preview(text))));
            }
            items.push(ksni::MenuItem::Separator);

            items.push(ksni::MenuItem::Standard(ksni::menu::StandardItem {
                label: "Switch".into(),
                activate: Box::new(|me: &mut AppTray| {
                    let _ = me.commands.send(Command::Switch);
                }),
                ..Default::default()
            }));
            for name in BindingName::ALL {
                let label = super::binding_label(name, self.bindings.get(&name).map(String::as_str));
                items.push(ksni::MenuItem::Standard(ksni::menu::StandardItem {
                    label: escape(&label),
                    activate: Box::new(move |me: &mut AppTray| me.edit_binding(name)),
                    ..Default::default()
                }));
            }
            items.push(ksni::MenuItem::Separator);

            items.push(ksni::MenuItem::Standard(ksni::menu::StandardItem {
                label: "Quit".into(),
                activate: Box::new(|me: &mut AppTray| {
                    let _ = me.commands.send(Command::Quit);
                }),
                ..Default::default()
            }));
            items
        }
    }
}

// Stubs for non-Linux targets so the code compiles conditionally
#[cfg(not(target_os = "linux"))]
pub struct TrayController;
#[cfg(not(target_os = "linux"))]
impl TrayController {
    pub fn set_history(&self, _items: Vec<String>) {}
}
#[cfg(not(target_os = "linux"))]
pub fn start_tray(
    _history: Vec<String>,
    _bindings: Vec<HotkeyBinding>,
    _commands: UnboundedSender<Command>,
) -> TrayController {
    tracing::info!("Tray icon is only available on Linux");
    TrayController
}
