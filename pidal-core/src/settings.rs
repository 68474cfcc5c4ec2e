use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::EngineResult;
use pidal_types::SWITCH_COUNT;

const DEFAULT_SETTINGS: &str = include_str!("../config.toml");

#[derive(Deserialize, Default, Clone)]
struct SettingsFile {
    #[serde(default)]
    input: InputSettings,
    #[serde(default)]
    midi: MidiSettings,
}

#[derive(Deserialize, Default, Clone)]
struct InputSettings {
    footswitch_pins: Option<[u8; SWITCH_COUNT]>,
    auxiliary_pins: Option<[u8; SWITCH_COUNT]>,
    quiet_interval_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default, Clone)]
struct MidiSettings {
    client_name: Option<String>,
    output_ports: Option<Vec<String>>,
    input_device: Option<String>,
    port_wait_ms: Option<u64>,
}

/// Controller settings: embedded defaults with an optional user override.
#[derive(Clone)]
pub struct Settings {
    input: InputSettings,
    midi: MidiSettings,
}

impl Settings {
    /// Load the embedded defaults merged with `~/.config/pidal/config.toml`.
    /// A malformed user file is logged and ignored.
    pub fn load() -> Self {
        let mut settings = Self::defaults();
        if let Some(path) = user_settings_path() {
            if path.exists() {
                if let Err(e) = settings.merge_file(&path) {
                    log::warn!(target: "settings", "ignoring settings {}: {}", path.display(), e);
                }
            }
        }
        settings
    }

    /// Load the embedded defaults merged with an explicit file. Unlike
    /// [`Settings::load`], read and parse failures are returned.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let mut settings = Self::defaults();
        settings.merge_file(path)?;
        Ok(settings)
    }

    /// The embedded defaults alone.
    pub fn defaults() -> Self {
        let base: SettingsFile = toml::from_str(DEFAULT_SETTINGS).unwrap_or_else(|e| {
            log::error!(target: "settings", "embedded config.toml is malformed: {}", e);
            SettingsFile::default()
        });
        Settings {
            input: base.input,
            midi: base.midi,
        }
    }

    fn merge_file(&mut self, path: &Path) -> EngineResult {
        let contents = std::fs::read_to_string(path)?;
        let user: SettingsFile = toml::from_str(&contents)?;
        merge_input(&mut self.input, user.input);
        merge_midi(&mut self.midi, user.midi);
        log::info!(target: "settings", "loaded {}", path.display());
        Ok(())
    }

    pub fn footswitch_pins(&self) -> [u8; SWITCH_COUNT] {
        self.input.footswitch_pins.unwrap_or([16, 20, 21, 26])
    }

    pub fn auxiliary_pins(&self) -> [u8; SWITCH_COUNT] {
        self.input.auxiliary_pins.unwrap_or([17, 22, 23, 27])
    }

    /// Minimum time between accepted transitions of one footswitch.
    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.input.quiet_interval_ms.unwrap_or(100))
    }

    /// Cadence of the release-confirmation pass (clamped to at least 1ms).
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.input.poll_interval_ms.unwrap_or(100).max(1))
    }

    pub fn client_name(&self) -> &str {
        self.midi.client_name.as_deref().unwrap_or("pidal")
    }

    pub fn output_ports(&self) -> &[String] {
        self.midi.output_ports.as_deref().unwrap_or(&[])
    }

    pub fn input_device(&self) -> Option<&str> {
        self.midi.input_device.as_deref()
    }

    pub fn port_wait(&self) -> Duration {
        Duration::from_millis(self.midi.port_wait_ms.unwrap_or(5000))
    }
}

fn user_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pidal").join("config.toml"))
}

fn merge_input(base: &mut InputSettings, user: InputSettings) {
    if user.footswitch_pins.is_some() {
        base.footswitch_pins = user.footswitch_pins;
    }
    if user.auxiliary_pins.is_some() {
        base.auxiliary_pins = user.auxiliary_pins;
    }
    if user.quiet_interval_ms.is_some() {
        base.quiet_interval_ms = user.quiet_interval_ms;
    }
    if user.poll_interval_ms.is_some() {
        base.poll_interval_ms = user.poll_interval_ms;
    }
}

fn merge_midi(base: &mut MidiSettings, user: MidiSettings) {
    if user.client_name.is_some() {
        base.client_name = user.client_name;
    }
    if user.output_ports.is_some() {
        base.output_ports = user.output_ports;
    }
    if user.input_device.is_some() {
        base.input_device = user.input_device;
    }
    if user.port_wait_ms.is_some() {
        base.port_wait_ms = user.port_wait_ms;
    }
}
