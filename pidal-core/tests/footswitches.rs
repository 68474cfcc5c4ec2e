mod common;

use common::{Log, Rig};
use pidal_core::handler;

fn bind_all(rig: &Rig, log: &Log) {
    for index in 0..4 {
        let log = log.clone();
        rig.engine
            .register_footswitch(index, handler(move |pressed| log.push(format!("{} {}", index, pressed))))
            .unwrap();
    }
}

#[test]
fn press_dispatches_immediately_release_waits_for_quiet() {
    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);

    rig.press(1);
    assert_eq!(log.take(), vec!["1 true"]);
    assert!(rig.engine.is_footswitch_pressed(1));

    rig.release(1);
    rig.clock.advance_ms(50);
    assert!(rig.engine.poll_releases().is_empty());
    assert!(log.take().is_empty());

    rig.clock.advance_ms(50);
    assert_eq!(rig.engine.poll_releases(), vec![1]);
    assert_eq!(log.take(), vec!["1 false"]);
    assert!(!rig.engine.is_footswitch_pressed(1));
}

#[test]
fn bounces_are_swallowed() {
    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);

    rig.press(0);
    rig.pins.bounce(16);
    rig.pins.bounce(16);
    assert_eq!(log.take(), vec!["0 true"]);
}

#[test]
fn held_switch_is_not_released() {
    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);

    rig.press(2);
    assert!(rig.settle().is_empty());
    assert!(rig.settle().is_empty());
    assert_eq!(log.take(), vec!["2 true"]);
}

#[test]
fn repress_within_quiet_interval_after_release_is_a_bounce() {
    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);

    rig.press(3);
    rig.release(3);
    rig.settle();
    rig.clock.advance_ms(10);
    rig.press(3);
    assert_eq!(log.take(), vec!["3 true", "3 false"]);
    assert!(!rig.engine.is_footswitch_pressed(3));

    rig.release(3);
    rig.clock.advance_ms(100);
    rig.press(3);
    assert_eq!(log.take(), vec!["3 true"]);
}

#[test]
fn unbound_switch_is_ignored() {
    let rig = Rig::new();
    rig.press(0);
    rig.release(0);
    assert_eq!(rig.settle(), vec![0]);
}

#[test]
fn auxiliary_buttons_report_presses_only() {
    let rig = Rig::new();
    let log = Log::default();
    let l = log.clone();
    rig.engine
        .register_auxiliary(2, handler(move |pressed| l.push(format!("aux {}", pressed))))
        .unwrap();

    rig.aux(2);
    rig.aux(2);
    rig.settle();
    assert_eq!(log.take(), vec!["aux true", "aux true"]);
}

#[test]
fn emulated_press_leaves_debounce_state_alone() {
    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);

    rig.engine.emulate_press(1, true);
    rig.engine.emulate_press(1, false);
    assert_eq!(log.take(), vec!["1 true", "1 false"]);
    assert!(!rig.engine.is_footswitch_pressed(1));

    rig.press(1);
    assert_eq!(log.take(), vec!["1 true"]);
}

#[test]
fn release_poller_thread_confirms_releases() {
    use std::time::{Duration, Instant};

    let rig = Rig::new();
    let log = Log::default();
    bind_all(&rig, &log);
    rig.engine.start().unwrap();

    rig.press(0);
    rig.release(0);
    rig.clock.advance_ms(150);

    let deadline = Instant::now() + Duration::from_secs(2);
    while log.len() < 2 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    rig.engine.shutdown();
    assert_eq!(log.take(), vec!["0 true", "0 false"]);
}
