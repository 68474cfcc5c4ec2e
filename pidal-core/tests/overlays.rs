mod common;

use std::sync::Arc;

use common::{Log, Recording, Rig};
use pidal_core::dispatch::PopStatus;
use pidal_core::midi::{ProgramAction, ProgramMap};
use pidal_core::{handler, EngineError};
use pidal_types::MidiMessage;

#[test]
fn overlay_shadows_and_restores_config_bindings() {
    let rig = Rig::new();
    let log = Log::default();
    rig.engine.set_config(Recording::new("A", &log)).unwrap();
    log.take();

    {
        let _menu = rig.engine.overlay();
        let l = log.clone();
        rig.engine
            .register_footswitch(1, handler(move |p| l.push(format!("menu {}", p))))
            .unwrap();

        rig.tap(1);
        rig.tap(0);
        assert_eq!(log.take(), vec!["menu true", "menu false"]);
        assert_eq!(rig.engine.footswitch_depth(), 2);
        assert_eq!(rig.engine.auxiliary_depth(), 2);
    }

    assert_eq!(rig.engine.footswitch_depth(), 1);
    rig.tap(1);
    assert_eq!(log.take(), vec!["A fs1 true", "A fs1 false"]);
}

#[test]
fn nested_overlays_unwind_in_order() {
    let rig = Rig::new();
    let log = Log::default();

    for level in 0..3 {
        rig.engine.push_footswitch_scope();
        let l = log.clone();
        rig.engine
            .register_footswitch(0, handler(move |p| {
                if p {
                    l.push(format!("level {}", level))
                }
            }))
            .unwrap();
    }

    for expected in ["level 2", "level 1", "level 0"] {
        rig.tap(0);
        assert_eq!(log.take(), vec![expected]);
        assert_eq!(rig.engine.pop_footswitch_scope(), PopStatus::Popped);
    }
    assert_eq!(rig.engine.pop_footswitch_scope(), PopStatus::AtBase);
    assert_eq!(rig.engine.footswitch_depth(), 1);
}

#[test]
fn auxiliary_overlay_is_independent() {
    let rig = Rig::new();
    let log = Log::default();
    let l = log.clone();
    rig.engine
        .register_auxiliary(0, handler(move |_| l.push("base")))
        .unwrap();

    rig.engine.push_auxiliary_scope();
    rig.aux(0);
    assert!(log.take().is_empty());
    assert_eq!(rig.engine.footswitch_depth(), 1);

    rig.engine.pop_auxiliary_scope();
    rig.aux(0);
    assert_eq!(log.take(), vec!["base"]);
}

#[test]
fn out_of_range_registration_fails() {
    let rig = Rig::new();
    assert!(rig.engine.register_footswitch(4, handler(|_| {})).is_err());
    assert!(rig.engine.register_auxiliary(9, handler(|_| {})).is_err());
}

#[test]
fn config_change_is_refused_while_overlay_is_open() {
    let rig = Rig::new();
    let log = Log::default();
    let a = Recording::new("A", &log);
    let b = Recording::new("B", &log);
    rig.engine.set_config(a).unwrap();

    let map = Arc::new(ProgramMap::new());
    map.bind_program(1, ProgramAction::Activate(b.clone()));
    map.install(&rig.engine);
    log.take();

    {
        let _menu = rig.engine.overlay();
        assert!(!rig.engine.dispatch_input(&MidiMessage::program_change(0, 1)));
        assert_eq!(rig.engine.set_config(b.clone()), Err(EngineError::OverlayOpen));
        assert_eq!(rig.engine.footswitch_depth(), 2);
    }

    assert_eq!(rig.engine.current_config().unwrap().name(), "A");
    rig.tap(0);
    assert_eq!(log.take(), vec!["A fs0 true", "A fs0 false"]);

    assert!(rig.engine.dispatch_input(&MidiMessage::program_change(0, 1)));
    rig.tap(0);
    assert_eq!(log.take(), vec!["leave A", "enter B", "B fs0 true", "B fs0 false"]);
}
