use super::*;
use crate::config::{ButtonBackend, ClickcamConfig};
use crate::events::EventBus;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ButtonLevel::{High, Low};

const THRESHOLD: Duration = Duration::from_millis(500);

/// Run `(level, ms since start)` samples through a fresh classifier
fn run(samples: &[(ButtonLevel, u64)]) -> Vec<GestureEvent> {
    let start = Instant::now();
    let mut classifier = GestureClassifier::new(THRESHOLD);

    samples
        .iter()
        .filter_map(|&(level, ms)| classifier.classify(level, start + Duration::from_millis(ms)))
        .collect()
}

/// A press held for `held_ms`, sampled every 20 ms
fn press_for(held_ms: u64) -> Vec<(ButtonLevel, u64)> {
    let mut samples = vec![(Low, 0)];
    let mut t = 20;
    while t < 20 + held_ms {
        samples.push((High, t));
        t += 20;
    }
    samples.push((High, 20 + held_ms));
    samples.push((Low, 20 + held_ms + 20));
    samples
}

#[test]
fn test_hold_sequence() {
    let events = run(&[(Low, 0), (High, 20), (High, 40), (High, 600), (Low, 620)]);

    assert_eq!(
        events,
        vec![
            GestureEvent::PressStart,
            GestureEvent::HoldConfirmed,
            GestureEvent::ReleaseAsHoldStop
        ]
    );
}

#[test]
fn test_click_sequence() {
    let events = run(&[(Low, 0), (High, 20), (Low, 200)]);

    assert_eq!(
        events,
        vec![GestureEvent::PressStart, GestureEvent::ReleaseAsClick]
    );
}

#[test]
fn test_short_presses_are_clicks() {
    for held in [0, 20, 100, 300, 480] {
        let events = run(&press_for(held));
        assert_eq!(
            events,
            vec![GestureEvent::PressStart, GestureEvent::ReleaseAsClick],
            "press held for {} ms",
            held
        );
    }
}

#[test]
fn test_long_presses_are_holds() {
    for held in [520, 800, 3000] {
        let events = run(&press_for(held));

        let holds = events
            .iter()
            .filter(|e| **e == GestureEvent::HoldConfirmed)
            .count();
        let stops = events
            .iter()
            .filter(|e| **e == GestureEvent::ReleaseAsHoldStop)
            .count();

        assert_eq!(holds, 1, "press held for {} ms", held);
        assert_eq!(stops, 1, "press held for {} ms", held);
        assert!(!events.contains(&GestureEvent::ReleaseAsClick));
    }
}

#[test]
fn test_exact_threshold_is_still_click() {
    let events = run(&[(Low, 0), (High, 100), (High, 600), (Low, 600)]);

    assert_eq!(
        events,
        vec![GestureEvent::PressStart, GestureEvent::ReleaseAsClick]
    );
}

#[test]
fn test_steady_high_never_restarts_press() {
    let mut samples = vec![(Low, 0)];
    samples.extend((1..=200).map(|i| (High, i * 20)));

    let events = run(&samples);
    assert_eq!(
        events,
        vec![GestureEvent::PressStart, GestureEvent::HoldConfirmed]
    );
}

#[test]
fn test_steady_low_is_silent() {
    let samples: Vec<_> = (0..50).map(|i| (Low, i * 20)).collect();
    assert!(run(&samples).is_empty());
}

#[test]
fn test_back_to_back_gestures() {
    let events = run(&[
        (Low, 0),
        (High, 20),
        (Low, 100),
        (High, 120),
        (High, 700),
        (Low, 720),
        (High, 740),
        (Low, 760),
    ]);

    assert_eq!(
        events,
        vec![
            GestureEvent::PressStart,
            GestureEvent::ReleaseAsClick,
            GestureEvent::PressStart,
            GestureEvent::HoldConfirmed,
            GestureEvent::ReleaseAsHoldStop,
            GestureEvent::PressStart,
            GestureEvent::ReleaseAsClick,
        ]
    );
}

#[test]
fn test_state_tracks_press_timestamp() {
    let start = Instant::now();
    let mut classifier = GestureClassifier::new(THRESHOLD);
    assert_eq!(classifier.state(), GestureState::Idle);
    assert!(classifier.state().pressed_since().is_none());

    let pressed_at = start + Duration::from_millis(20);
    classifier.classify(High, pressed_at);
    assert_eq!(
        classifier.state(),
        GestureState::PressedUnconfirmed { since: pressed_at }
    );

    classifier.classify(High, start + Duration::from_millis(600));
    assert_eq!(
        classifier.state(),
        GestureState::HoldActive { since: pressed_at }
    );

    classifier.reset();
    assert_eq!(classifier.state(), GestureState::Idle);
}

#[test]
fn test_configurable_threshold() {
    let start = Instant::now();
    let mut classifier = GestureClassifier::new(Duration::from_millis(100));

    classifier.classify(High, start);
    assert_eq!(
        classifier.classify(High, start + Duration::from_millis(120)),
        Some(GestureEvent::HoldConfirmed)
    );
    assert_eq!(classifier.hold_threshold(), Duration::from_millis(100));
}

#[test]
fn test_simulated_button_levels() {
    let (mut button, handle) = SimulatedButton::new();
    assert_eq!(button.read_level().unwrap(), Low);

    handle.press();
    assert_eq!(button.read_level().unwrap(), High);

    assert_eq!(handle.toggle(), Low);
    assert_eq!(button.read_level().unwrap(), Low);

    handle.fail_next_reads(1);
    assert!(button.read_level().is_err());
    assert_eq!(button.read_level().unwrap(), Low);
}

#[test]
fn test_gpio_button_reads_value_file() {
    let dir = tempfile::tempdir().unwrap();
    let value = dir.path().join("value");
    std::fs::write(&value, "0\n").unwrap();

    let mut active_high = GpioButton::with_value_path(&value, true).unwrap();
    let mut active_low = GpioButton::with_value_path(&value, false).unwrap();
    assert_eq!(active_high.read_level().unwrap(), Low);
    assert_eq!(active_low.read_level().unwrap(), High);

    std::fs::write(&value, "1\n").unwrap();
    assert_eq!(active_high.read_level().unwrap(), High);
    assert_eq!(active_low.read_level().unwrap(), Low);

    std::fs::write(&value, "garbage").unwrap();
    assert!(active_high.read_level().is_err());
}

#[test]
fn test_gpio_button_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(GpioButton::with_value_path(dir.path().join("missing"), true).is_err());
}

#[test]
fn test_builder_backends() {
    let event_bus = Arc::new(EventBus::new(8));
    let mut config = ClickcamConfig::default().button;

    config.backend = ButtonBackend::Keyboard;
    assert!(ButtonInputBuilder::new()
        .config(config.clone())
        .build()
        .is_err());

    let setup = ButtonInputBuilder::new()
        .config(config)
        .event_bus(event_bus)
        .build()
        .unwrap();
    assert!(setup.keyboard.is_some());
}

#[tokio::test]
async fn test_keyboard_button_stop() {
    let event_bus = Arc::new(EventBus::new(8));
    let (_button, handle) = SimulatedButton::new();
    let keyboard = KeyboardButton::new(handle, event_bus);

    assert!(!keyboard.is_stopped());
    keyboard.stop().await.unwrap();
    assert!(keyboard.is_stopped());
}
