mod console;
mod startup;
mod ui;

use std::fs::File;
use std::io;
use std::sync::Arc;

use pidal_core::gpio::SimulatedPins;
use pidal_core::midi::{wait_for_device, MidirInput, MidirOutputs};
use pidal_core::{Engine, EngineResult, Settings};

fn init_logging(verbose: bool) {
    use simplelog::*;

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    let log_path = dirs::config_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("pidal")
        .join("pidal.log");

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path).or_else(|_| File::create("/tmp/pidal.log")) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("pidal: cannot create log file: {}", e);
            return;
        }
    };

    if WriteLogger::init(log_level, Config::default(), log_file).is_err() {
        eprintln!("pidal: logger already initialized");
    }

    log::info!("pidal starting (log level: {:?})", log_level);
}

/// Create every configured output port.
fn open_outputs(settings: &Settings) -> EngineResult<MidirOutputs> {
    let outputs = MidirOutputs::new(settings.client_name());
    for port in settings.output_ports() {
        outputs.create_port(port)?;
    }
    Ok(outputs)
}

/// Wait for the configured input device and start feeding it to the engine.
fn open_input(engine: &Engine) -> EngineResult<Option<MidirInput>> {
    let settings = engine.settings();
    let Some(device) = settings.input_device() else {
        return Ok(None);
    };
    wait_for_device(settings.client_name(), device, settings.port_wait())?;
    let input = MidirInput::connect_device(settings.client_name(), "pidal_in", device)?;
    engine.start_input(Box::new(input.source()))?;
    log::info!(target: "midi", "reading MIDI input from {}", device);
    Ok(Some(input))
}

fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose" || a == "-v");
    init_logging(verbose);

    let settings = Settings::load();
    let pins = Arc::new(SimulatedPins::new());
    let mut builder = Engine::builder(settings.clone()).pins(pins.clone());

    if std::env::var_os("PIDAL_NO_MIDI").is_some() {
        log::info!(target: "midi", "PIDAL_NO_MIDI set, recording MIDI output in memory");
    } else {
        match open_outputs(&settings) {
            Ok(outputs) => builder = builder.output(Arc::new(outputs)),
            Err(e) => {
                log::warn!(target: "midi", "MIDI output unavailable, recording in memory: {}", e);
                eprintln!("pidal: MIDI output unavailable ({}), continuing without it", e);
            }
        }
    }

    let engine = builder.build();
    let _ui = ui::ConsoleUi::install(&engine);

    engine.initialize().map_err(io::Error::other)?;
    engine.start().map_err(io::Error::other)?;

    let input = match open_input(&engine) {
        Ok(input) => input,
        Err(e) => {
            log::warn!(target: "midi", "MIDI input unavailable: {}", e);
            None
        }
    };

    engine.run_startup(startup::register).map_err(io::Error::other)?;

    let stdin = io::stdin();
    let result = console::run(&engine, &pins, stdin.lock());
    drop(input);
    engine.shutdown();
    result
}
