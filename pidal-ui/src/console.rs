//! Line-oriented driver standing in for the switch board: each stdin line
//! is a command that presses or releases a simulated pin, or injects an
//! inbound MIDI message.

use std::io::{self, BufRead};

use pidal_core::gpio::SimulatedPins;
use pidal_core::Engine;
use pidal_types::{MidiMessage, SWITCH_COUNT};

const HELP: &str = "\
commands:
  p N      press footswitch N (0-3)
  r N      release footswitch N
  t N      press and release footswitch N
  a N      press auxiliary button N
  pc N     inbound program change N
  cc N V   inbound control change N = V
  s        show switch state
  q        quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Press(usize),
    Release(usize),
    Tap(usize),
    Aux(usize),
    Input(MidiMessage),
    State,
    Help,
    Quit,
}

fn switch(arg: Option<&str>) -> Option<usize> {
    arg?.parse().ok().filter(|i| *i < SWITCH_COUNT)
}

fn data_byte(arg: Option<&str>) -> Option<u8> {
    arg?.parse().ok().filter(|v| *v < 0x80)
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "p" | "press" => Command::Press(switch(words.next())?),
            "r" | "release" => Command::Release(switch(words.next())?),
            "t" | "tap" => Command::Tap(switch(words.next())?),
            "a" | "aux" => Command::Aux(switch(words.next())?),
            "pc" => Command::Input(MidiMessage::program_change(0, data_byte(words.next())?)),
            "cc" => {
                let controller = data_byte(words.next())?;
                let value = data_byte(words.next())?;
                Command::Input(MidiMessage::control_change(0, controller, value))
            }
            "s" | "state" => Command::State,
            "h" | "help" | "?" => Command::Help,
            "q" | "quit" => Command::Quit,
            _ => return None,
        };
        Some(command)
    }
}

/// Read commands from `input` until EOF or `q`.
pub fn run(engine: &Engine, pins: &SimulatedPins, input: impl BufRead) -> io::Result<()> {
    let footswitches = engine.settings().footswitch_pins();
    let auxiliary = engine.settings().auxiliary_pins();
    println!("{}", HELP);

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = Command::parse(&line) else {
            println!("? {}", line.trim());
            continue;
        };
        log::debug!(target: "console", "{:?}", command);
        match command {
            Command::Press(i) => pins.press(footswitches[i]),
            Command::Release(i) => pins.release(footswitches[i]),
            Command::Tap(i) => {
                pins.press(footswitches[i]);
                pins.release(footswitches[i]);
            }
            Command::Aux(i) => {
                pins.press(auxiliary[i]);
                pins.release(auxiliary[i]);
            }
            Command::Input(message) => {
                if !engine.dispatch_input(&message) {
                    println!("unhandled {:?}", message);
                }
            }
            Command::State => {
                let pressed: Vec<String> = (0..SWITCH_COUNT)
                    .map(|i| if engine.is_footswitch_pressed(i) { "down" } else { "up" }.to_string())
                    .collect();
                let config = engine
                    .current_config()
                    .map(|c| c.name().to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{} | {}", config, pressed.join(" "));
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidal_core::{handler, Settings};
    use std::sync::{Arc, Mutex};

    #[test]
    fn parses_switch_commands() {
        assert_eq!(Command::parse("p 2"), Some(Command::Press(2)));
        assert_eq!(Command::parse("release 0"), Some(Command::Release(0)));
        assert_eq!(Command::parse("a 3"), Some(Command::Aux(3)));
        assert_eq!(Command::parse("p 4"), None);
        assert_eq!(Command::parse("t"), None);
        assert_eq!(Command::parse("bogus"), None);
    }

    #[test]
    fn parses_midi_commands() {
        assert_eq!(
            Command::parse("cc 11 64"),
            Some(Command::Input(MidiMessage::control_change(0, 11, 64)))
        );
        assert_eq!(
            Command::parse("pc 5"),
            Some(Command::Input(MidiMessage::program_change(0, 5)))
        );
        assert_eq!(Command::parse("cc 11 200"), None);
    }

    #[test]
    fn script_drives_simulated_pins() {
        let pins = Arc::new(SimulatedPins::new());
        let engine = Engine::builder(Settings::defaults()).pins(pins.clone()).build();
        engine.initialize().unwrap();

        let presses = Arc::new(Mutex::new(Vec::new()));
        let p = presses.clone();
        engine
            .register_footswitch(1, handler(move |pressed| p.lock().unwrap().push(pressed)))
            .unwrap();
        let a = presses.clone();
        engine
            .register_auxiliary(0, handler(move |pressed| a.lock().unwrap().push(pressed)))
            .unwrap();

        let script = "p 1\n\nnonsense\na 0\nq\np 1\n";
        run(&engine, &pins, script.as_bytes()).unwrap();

        assert_eq!(*presses.lock().unwrap(), vec![true, true]);
        assert!(engine.is_footswitch_pressed(1));
    }
}
