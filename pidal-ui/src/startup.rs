//! Configurations for a guitar rig: an amp-channel page and an effects page.

use std::sync::Arc;

use pidal_core::buttons::{
    control_change, program_switch, Actuator, ButtonConfig, ButtonGroup, FlagSetController,
    RadioButton, RadioController, ToggleButton,
};
use pidal_core::midi::{ProgramAction, ProgramMap};
use pidal_core::{Engine, EngineError, EngineResult};
use pidal_types::MidiMessage;

const BOOST_CC: u8 = 20;
const REVERB_CC: u8 = 21;
const WAH_CC: u8 = 22;
const EXPRESSION_CC: u8 = 11;

fn toggle(label: &str, port: &str, controller: u8) -> Arc<dyn ButtonGroup> {
    Arc::new(ToggleButton::new(
        label,
        control_change(port, controller, 127),
        control_change(port, controller, 0),
    ))
}

fn amp_config(port: &str) -> EngineResult<ButtonConfig> {
    let channels = RadioController::new(
        vec![
            RadioButton::new("Clean", program_switch(port, 0, 0), program_switch(port, 0, 0)),
            RadioButton::new("Crunch", program_switch(port, 0, 1), program_switch(port, 0, 0)),
            RadioButton::new("Lead", program_switch(port, 0, 2), program_switch(port, 0, 0)),
        ],
        0,
    );
    let groups: Vec<Arc<dyn ButtonGroup>> = vec![Arc::new(channels), toggle("Boost", port, BOOST_CC)];
    ButtonConfig::new("Amp", groups)
}

fn effects_config(port: &str) -> EngineResult<ButtonConfig> {
    let modulation = FlagSetController::new(
        &["Mod", "Dly"],
        (0..4)
            .map(|program| Actuator::new(program_switch(port, 1, program), program_switch(port, 1, 0)))
            .collect(),
        0,
    );
    let groups: Vec<Arc<dyn ButtonGroup>> = vec![
        Arc::new(modulation),
        toggle("Rev", port, REVERB_CC),
        toggle("Wah", port, WAH_CC),
    ];
    let expression_port = port.to_string();
    Ok(ButtonConfig::new("Effects", groups)?.with_controller("expression", move |engine, value| {
        let cc = MidiMessage::control_change(0, EXPRESSION_CC, value);
        if let Err(e) = engine.send(&cc, &expression_port) {
            log::warn!(target: "startup", "expression: {}", e);
        }
    }))
}

/// Register Configurations and the inbound program map.
pub fn register(engine: &Engine) -> EngineResult {
    let port = engine
        .settings()
        .output_ports()
        .first()
        .cloned()
        .ok_or_else(|| EngineError::InvalidPort("<none configured>".into()))?;

    let amp = Arc::new(amp_config(&port)?);
    let effects = Arc::new(effects_config(&port)?);
    engine.add_config(amp.clone());
    engine.add_config(effects.clone());

    let map = Arc::new(ProgramMap::new());
    map.bind_program(0, ProgramAction::Activate(amp.clone()));
    map.bind_program(1, ProgramAction::Activate(effects));
    map.bind_program(10, ProgramAction::Actuate {
        config: amp,
        footswitch: 3,
    });
    map.bind_controller(EXPRESSION_CC, "expression");
    map.install(engine);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidal_core::Settings;

    #[test]
    fn registers_both_pages_and_activates_amp() {
        let engine = Engine::builder(Settings::defaults()).build();
        engine.run_startup(register).unwrap();

        let names: Vec<String> = engine.configs().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["Amp", "Effects"]);
        assert_eq!(engine.current_config().unwrap().name(), "Amp");
        assert_eq!(
            engine.current_config().unwrap().button_labels(),
            ["Clean", "Crunch", "Lead", "Boost"].map(String::from)
        );
    }

    #[test]
    fn program_change_switches_page() {
        let engine = Engine::builder(Settings::defaults()).build();
        engine.run_startup(register).unwrap();

        assert!(engine.dispatch_input(&MidiMessage::program_change(0, 1)));
        assert_eq!(engine.current_config().unwrap().name(), "Effects");
    }
}
