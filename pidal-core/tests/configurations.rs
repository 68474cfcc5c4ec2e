mod common;

use std::sync::{Arc, Mutex};

use common::{Log, Recording, Rig};
use pidal_core::bus::CONFIG_CHANGE;
use pidal_core::{Configuration, EngineError, Notification, Transition};

#[test]
fn transition_runs_leave_then_enter_then_notifies() {
    let rig = Rig::new();
    let log = Log::default();
    let a = Recording::new("A", &log);
    let b = Recording::new("B", &log);
    rig.engine.add_config(a.clone());
    rig.engine.add_config(b.clone());

    let l = log.clone();
    rig.engine.subscribe(CONFIG_CHANGE, move |n| {
        if let Notification::ConfigChange(c) = n {
            l.push(format!("changed {}", c.name()));
        }
    });

    assert_eq!(rig.engine.set_config(a.clone()).unwrap(), Transition::Changed);
    assert_eq!(rig.engine.set_config(b.clone()).unwrap(), Transition::Changed);
    assert_eq!(
        log.take(),
        vec!["enter A", "changed A", "leave A", "enter B", "changed B"]
    );
    assert_eq!(rig.engine.current_config().unwrap().name(), "B");
}

#[test]
fn setting_the_current_config_is_a_no_op() {
    let rig = Rig::new();
    let log = Log::default();
    let a = Recording::new("A", &log);
    rig.engine.set_config(a.clone()).unwrap();
    log.take();

    assert_eq!(rig.engine.set_config(a).unwrap(), Transition::Unchanged);
    assert!(log.take().is_empty());
}

#[test]
fn new_config_rebinds_footswitches() {
    let rig = Rig::new();
    let log = Log::default();
    let a = Recording::new("A", &log);
    let b = Recording::new("B", &log);

    rig.engine.set_config(a).unwrap();
    rig.tap(0);
    rig.engine.set_config(b).unwrap();
    rig.tap(0);

    let events: Vec<String> = log
        .take()
        .into_iter()
        .filter(|e| e.contains("fs0"))
        .collect();
    assert_eq!(events, vec!["A fs0 true", "A fs0 false", "B fs0 true", "B fs0 false"]);
}

#[test]
fn failing_leave_does_not_block_transition() {
    let rig = Rig::new();
    let log = Log::default();
    let a = Arc::new(Recording {
        name: "A".into(),
        log: log.clone(),
        fail_enter: false,
        fail_leave: true,
    });
    let b = Recording::new("B", &log);

    rig.engine.set_config(a).unwrap();
    assert!(rig.engine.set_config(b).is_ok());
    assert_eq!(rig.engine.current_config().unwrap().name(), "B");
}

#[test]
fn failing_enter_is_reported_but_target_stays_current() {
    let rig = Rig::new();
    let log = Log::default();
    let notified = Arc::new(Mutex::new(0));
    let n = notified.clone();
    rig.engine.subscribe(CONFIG_CHANGE, move |_| *n.lock().unwrap() += 1);

    let a = Arc::new(Recording {
        name: "A".into(),
        log: log.clone(),
        fail_enter: true,
        fail_leave: false,
    });
    assert_eq!(rig.engine.set_config(a), Err(EngineError::InvalidIndex(99)));
    assert_eq!(rig.engine.current_config().unwrap().name(), "A");
    assert_eq!(*notified.lock().unwrap(), 1);
}

#[test]
fn startup_hook_activates_first_registered_config() {
    let rig = Rig::new();
    let log = Log::default();
    rig.engine
        .run_startup(|engine| {
            engine.add_config(Recording::new("First", &log));
            engine.add_config(Recording::new("Second", &log));
            Ok(())
        })
        .unwrap();

    assert_eq!(rig.engine.current_config().unwrap().name(), "First");
    assert_eq!(log.take(), vec!["enter First"]);
}

#[test]
fn startup_hook_error_propagates() {
    let rig = Rig::new();
    let result = rig
        .engine
        .run_startup(|_| Err(EngineError::InvalidPort("to_gtx".into())));
    assert!(result.is_err());
    assert!(rig.engine.current_config().is_none());
}

#[test]
fn late_config_can_be_inserted() {
    let rig = Rig::new();
    let log = Log::default();
    rig.engine.add_config(Recording::new("A", &log));
    rig.engine.add_config(Recording::new("B", &log));
    rig.engine.add_config_at(Recording::new("Late", &log), 1);

    let names: Vec<String> = rig
        .engine
        .configs()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(names, vec!["A", "Late", "B"]);
}

#[test]
fn controllers_route_to_current_config() {
    let rig = Rig::new();
    let log = Log::default();
    rig.engine.set_controller("expression", 10);
    rig.engine.set_config(Recording::new("A", &log)).unwrap();
    log.take();

    rig.engine.set_controller("expression", 64);
    assert_eq!(log.take(), vec!["A expression=64"]);
}
