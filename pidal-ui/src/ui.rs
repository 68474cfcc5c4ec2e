//! Console stand-in for the display: a home screen showing the current
//! Configuration's labels and button indicators, and a list menu for
//! picking a Configuration.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use pidal_core::bus::{CONFIG_CHANGE, CONFIG_LIST, PEDAL_BUTTON_STATUS};
use pidal_core::dispatch::OverlayGuard;
use pidal_core::{handler, Configuration, Engine, EngineHandle, Notification};
use pidal_types::SWITCH_COUNT;

#[derive(Default)]
struct HomeScreen {
    title: String,
    labels: [String; SWITCH_COUNT],
    active: [bool; SWITCH_COUNT],
}

impl HomeScreen {
    fn render(&self) -> String {
        let buttons: Vec<String> = self
            .labels
            .iter()
            .zip(self.active.iter())
            .map(|(label, on)| if *on { format!("[{}]", label) } else { format!(" {} ", label) })
            .collect();
        format!("== {} ==  {}", self.title, buttons.join(" "))
    }
}

/// Open list menu. Dropping it closes the overlay.
struct ListMenu {
    items: Vec<Arc<dyn Configuration>>,
    cursor: usize,
    _overlay: OverlayGuard,
}

impl ListMenu {
    fn render(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} {}", if i == self.cursor { ">" } else { " " }, c.name()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuKey {
    Prev,
    Next,
    Select,
    Cancel,
}

pub struct ConsoleUi {
    engine: EngineHandle,
    home: Mutex<HomeScreen>,
    menu: Mutex<Option<ListMenu>>,
}

impl ConsoleUi {
    /// Subscribe to the engine's notifications.
    pub fn install(engine: &Engine) -> Arc<Self> {
        let ui = Arc::new(Self {
            engine: engine.handle(),
            home: Mutex::new(HomeScreen::default()),
            menu: Mutex::new(None),
        });

        let u = ui.clone();
        engine.subscribe(CONFIG_CHANGE, move |n| {
            if let Notification::ConfigChange(config) = n {
                u.show_config(config.as_ref());
            }
        });
        let u = ui.clone();
        engine.subscribe(PEDAL_BUTTON_STATUS, move |n| {
            if let Notification::PedalButtonStatus { index, active } = n {
                u.show_status(*index, *active);
            }
        });
        let u = Arc::downgrade(&ui);
        engine.subscribe(CONFIG_LIST, move |_| {
            if let Some(u) = u.upgrade() {
                u.open_menu();
            }
        });
        ui
    }

    fn home(&self) -> MutexGuard<'_, HomeScreen> {
        self.home.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn menu(&self) -> MutexGuard<'_, Option<ListMenu>> {
        self.menu.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn show_config(&self, config: &dyn Configuration) {
        let mut home = self.home();
        home.title = config.name().to_string();
        home.labels = config.button_labels();
        home.active = [false; SWITCH_COUNT];
        println!("{}", home.render());
    }

    fn show_status(&self, index: usize, active: bool) {
        let mut home = self.home();
        if let Some(slot) = home.active.get_mut(index) {
            *slot = active;
            println!("{}", home.render());
        }
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu().is_some()
    }

    fn open_menu(self: &Arc<Self>) {
        let Some(engine) = self.engine.get() else {
            return;
        };
        let mut menu = self.menu();
        if menu.is_some() {
            return;
        }

        let items = engine.configs();
        let cursor = engine
            .current_config()
            .and_then(|c| engine.registry().position(&c))
            .unwrap_or(0);
        let overlay = engine.overlay();

        let keys = [
            (MenuKey::Prev, 0),
            (MenuKey::Next, 1),
            (MenuKey::Select, 2),
            (MenuKey::Cancel, 3),
        ];
        for (key, index) in keys {
            let ui = Arc::downgrade(self);
            if let Err(e) = engine.register_footswitch(index, menu_handler(ui, key)) {
                log::warn!(target: "ui", "menu footswitch {}: {}", index, e);
            }
        }
        for (key, index) in [(MenuKey::Prev, 0), (MenuKey::Next, 1)] {
            let ui = Arc::downgrade(self);
            if let Err(e) = engine.register_auxiliary(index, menu_handler(ui, key)) {
                log::warn!(target: "ui", "menu auxiliary {}: {}", index, e);
            }
        }

        let opened = ListMenu {
            items,
            cursor,
            _overlay: overlay,
        };
        println!("{}", opened.render());
        *menu = Some(opened);
        log::debug!(target: "ui", "config menu opened");
    }

    fn menu_key(&self, key: MenuKey) {
        let chosen = {
            let mut menu = self.menu();
            let Some(open) = menu.as_mut() else {
                return;
            };
            let count = open.items.len();
            match key {
                MenuKey::Prev if count > 0 => {
                    open.cursor = (open.cursor + count - 1) % count;
                    println!("{}", open.render());
                    return;
                }
                MenuKey::Next if count > 0 => {
                    open.cursor = (open.cursor + 1) % count;
                    println!("{}", open.render());
                    return;
                }
                MenuKey::Select => open.items.get(open.cursor).cloned(),
                _ => None,
            }
            // Dropping the menu pops the overlay, so the chosen
            // Configuration binds into the base frame.
        };
        self.menu().take();
        log::debug!(target: "ui", "config menu closed");

        match (chosen, self.engine.get()) {
            (Some(config), Some(engine)) => {
                if let Err(e) = engine.set_config(config) {
                    log::warn!(target: "ui", "selected configuration failed to enter: {}", e);
                }
            }
            // Indicators kept updating underneath the menu.
            _ => println!("{}", self.home().render()),
        }
    }
}

fn menu_handler(ui: Weak<ConsoleUi>, key: MenuKey) -> pidal_core::SwitchHandler {
    handler(move |pressed| {
        if !pressed {
            return;
        }
        if let Some(ui) = ui.upgrade() {
            ui.menu_key(key);
        }
    })
}
