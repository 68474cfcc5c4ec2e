//! # pidal-core
//!
//! Control plane for a foot-operated effects controller: debounced
//! footswitches, layered switch dispatch, Configurations with enter/leave
//! hooks, a by-name notification bus and MIDI program switching.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pidal_core::{Engine, Settings};
//!
//! let engine = Engine::builder(Settings::load()).build();
//! engine.initialize()?;
//! engine.start()?;
//! engine.run_startup(|engine| {
//!     engine.add_config(my_config);
//!     Ok(())
//! })?;
//! ```
//!
//! ## Module Overview
//!
//! - [`debounce`]: footswitch state machine: edge handling and release polling
//! - [`dispatch`]: per-kind stacks of switch handler frames, overlay scopes
//! - [`configuration`]: the `Configuration` trait, registry, transition machine
//! - [`bus`]: named notifications to a single subscriber each
//! - [`encoder`]: bank/program to bank-select + program-change messages
//! - [`chord`]: `double_press` wrapping for "hold both" footswitch pairs
//! - [`buttons`]: toggle, radio and flag-set button groups
//! - [`midi`]: outbound sinks, inbound handler chain, midir ports
//! - [`engine`]: the context tying it all together
//! - [`settings`]: TOML settings (embedded defaults + user override)

pub mod bus;
pub mod buttons;
pub mod chord;
pub mod clock;
pub mod configuration;
pub mod debounce;
pub mod dispatch;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod gpio;
pub mod midi;
pub mod settings;

pub use bus::Notification;
pub use chord::double_press;
pub use configuration::{Configuration, Transition};
pub use dispatch::{handler, SwitchHandler};
pub use engine::{Engine, EngineBuilder, EngineHandle};
pub use error::{EngineError, EngineResult};
pub use settings::Settings;
