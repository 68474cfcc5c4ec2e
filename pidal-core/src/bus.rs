//! Named-event notifications from the control layer to the UI layer.
//!
//! One subscriber per event name: subscribing again under the same name
//! replaces the previous subscriber.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::configuration::Configuration;

pub const CONFIG_CHANGE: &str = "config_change";
pub const PEDAL_BUTTON_STATUS: &str = "pedal_button_status";
pub const CONFIG_LIST: &str = "config_list";

#[derive(Clone)]
pub enum Notification {
    /// A new Configuration became current.
    ConfigChange(Arc<dyn Configuration>),
    /// A footswitch's on/off indicator changed.
    PedalButtonStatus { index: usize, active: bool },
    /// Request to show the configuration picker.
    ConfigList,
    Custom { name: String, args: Vec<String> },
}

impl Notification {
    pub fn name(&self) -> &str {
        match self {
            Notification::ConfigChange(_) => CONFIG_CHANGE,
            Notification::PedalButtonStatus { .. } => PEDAL_BUTTON_STATUS,
            Notification::ConfigList => CONFIG_LIST,
            Notification::Custom { name, .. } => name,
        }
    }
}

impl std::fmt::Debug for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::ConfigChange(c) => write!(f, "ConfigChange({:?})", c.name()),
            Notification::PedalButtonStatus { index, active } => {
                write!(f, "PedalButtonStatus({}, {})", index, active)
            }
            Notification::ConfigList => f.write_str("ConfigList"),
            Notification::Custom { name, args } => write!(f, "Custom({}, {:?})", name, args),
        }
    }
}

pub type Subscriber = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
pub struct NotificationBus {
    subscriptions: Mutex<HashMap<String, Subscriber>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `subscriber` for `name`, replacing any existing one.
    pub fn subscribe<F>(&self, name: &str, subscriber: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let previous = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), Arc::new(subscriber));
        if previous.is_some() {
            log::debug!(target: "bus", "replaced subscriber for {}", name);
        }
    }

    pub fn unsubscribe(&self, name: &str) {
        self.subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name);
    }

    /// Deliver `notification` to the subscriber for its name, if any.
    /// Returns whether a subscriber ran.
    pub fn notify(&self, notification: Notification) -> bool {
        let subscriber = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(notification.name())
            .cloned();
        match subscriber {
            Some(s) => {
                s(&notification);
                true
            }
            None => false,
        }
    }
}
