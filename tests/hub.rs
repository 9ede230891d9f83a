//! Integration tests driving a real hub against temporary directories.
//!
//! No kernel input devices are needed: these tests exercise the startup scan, the synthetic
//! event protocol, the directory watch, wake handling, and the query surface's behavior for
//! missing devices.

use std::{fs, path::Path, sync::Arc, thread, time::Duration, time::Instant};

use evhub::{
    Config, DEVICE_ADDED, DEVICE_REMOVED, DeviceClasses, Error, EvdevHub, EventHub,
    FINISHED_DEVICE_SCAN, Key, KeyState, RawEvent, VIRTUAL_KEYBOARD_ID,
};

fn hub_config(input: &Path, video: &Path) -> Config {
    let mut config = Config::default();
    config.input_directory = input.to_path_buf();
    config.video_directory = video.to_path_buf();
    config
}

fn drain(hub: &EvdevHub, timeout_ms: i32) -> Vec<RawEvent> {
    let zero = RawEvent {
        when: 0,
        device_id: 0,
        event_type: 0,
        code: 0,
        value: 0,
    };
    let mut buffer = [zero; 32];
    let n = hub.get_events(timeout_ms, &mut buffer);
    buffer[..n].to_vec()
}

#[test]
fn startup_scan_of_empty_directory_finishes() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let hub = EvdevHub::new(hub_config(input.path(), video.path())).unwrap();

    let events = drain(&hub, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, FINISHED_DEVICE_SCAN);

    // The scan already ran; with nothing attached a zero-timeout call returns nothing.
    assert!(drain(&hub, 0).is_empty());
}

#[test]
fn virtual_keyboard_is_announced_and_queryable() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.virtual_keyboard = true;
    let hub = EvdevHub::new(config).unwrap();

    let events = drain(&hub, 0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, DEVICE_ADDED);
    assert_eq!(events[0].device_id, VIRTUAL_KEYBOARD_ID);
    assert_eq!(events[1].event_type, FINISHED_DEVICE_SCAN);

    let classes = hub.device_classes(VIRTUAL_KEYBOARD_ID);
    assert!(classes.contains(DeviceClasses::KEYBOARD));
    assert!(classes.contains(DeviceClasses::ALPHAKEY));
    assert!(classes.contains(DeviceClasses::VIRTUAL));

    let identifier = hub.device_identifier(VIRTUAL_KEYBOARD_ID).unwrap();
    assert_eq!(identifier.name, "Virtual");
    assert!(!identifier.descriptor.is_empty());

    // No kernel descriptor: state queries stay unknown, the keymap still resolves.
    assert_eq!(
        hub.scan_code_state(VIRTUAL_KEYBOARD_ID, Key::KEY_A),
        KeyState::Unknown
    );
    assert_eq!(
        hub.map_key(VIRTUAL_KEYBOARD_ID, Key::KEY_A.raw() as u32, 0).unwrap(),
        Key::KEY_A
    );
    assert!(hub.is_device_enabled(VIRTUAL_KEYBOARD_ID));
    assert!(matches!(
        hub.disable_device(VIRTUAL_KEYBOARD_ID),
        Err(Error::Unsupported)
    ));
}

#[test]
fn missing_device_queries_are_empty_or_not_found() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let hub = EvdevHub::new(hub_config(input.path(), video.path())).unwrap();
    drain(&hub, 0);

    assert_eq!(hub.device_classes(42), DeviceClasses::empty());
    assert!(hub.device_identifier(42).is_none());
    assert_eq!(hub.device_controller_number(42), 0);
    assert_eq!(hub.scan_code_state(42, Key::KEY_A), KeyState::Unknown);
    assert!(hub.get_video_frames(42).is_empty());
    assert!(matches!(hub.enable_device(42), Err(Error::NotFound)));
    assert!(matches!(hub.disable_device(42), Err(Error::NotFound)));
    assert!(matches!(
        hub.absolute_axis_value(42, evhub::Abs::X),
        Err(Error::NotFound)
    ));

    let mut flags = [true; 2];
    assert!(!hub.mark_supported_key_codes(42, &[Key::KEY_A, Key::KEY_B], &mut flags));
}

#[test]
fn zero_capacity_leaves_pending_events_intact() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.virtual_keyboard = true;
    let hub = EvdevHub::new(config).unwrap();

    let mut empty: [RawEvent; 0] = [];
    assert_eq!(hub.get_events(1000, &mut empty), 0);

    // The startup scan still happens, undisturbed, on the next real call.
    let events = drain(&hub, 0);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, DEVICE_ADDED);
    assert_eq!(events[1].event_type, FINISHED_DEVICE_SCAN);
}

#[test]
fn wake_returns_promptly_from_a_long_wait() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let hub = Arc::new(EvdevHub::new(hub_config(input.path(), video.path())).unwrap());
    drain(&hub, 0);

    let waker = Arc::clone(&hub);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        waker.wake();
    });

    let started = Instant::now();
    let events = drain(&hub, 30_000);
    let elapsed = started.elapsed();
    handle.join().unwrap();

    assert!(events.is_empty());
    assert!(
        elapsed < Duration::from_secs(5),
        "wake took {elapsed:?} to interrupt the wait"
    );
}

#[test]
fn wakes_before_the_call_are_coalesced_and_consumed() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let hub = EvdevHub::new(hub_config(input.path(), video.path())).unwrap();
    drain(&hub, 0);

    for _ in 0..5 {
        hub.wake();
    }
    let started = Instant::now();
    assert!(drain(&hub, 10_000).is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn non_device_files_are_ignored() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();

    // Present before startup: a regular file is not an evdev node and must be skipped.
    fs::write(input.path().join("event0"), b"not a device").unwrap();
    fs::write(input.path().join("mouse0"), b"ignored by name").unwrap();

    let hub = EvdevHub::new(hub_config(input.path(), video.path())).unwrap();
    let events = drain(&hub, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, FINISHED_DEVICE_SCAN);

    // Hot-plugged garbage goes the same way, through the directory watch.
    fs::write(input.path().join("event1"), b"still not a device").unwrap();
    assert!(drain(&hub, 300).is_empty());
    fs::remove_file(input.path().join("event1")).unwrap();
    assert!(drain(&hub, 300).is_empty());
}

#[test]
fn excluded_paths_are_never_opened() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.excluded_devices = vec![format!("{}/event*", input.path().display())];
    fs::write(input.path().join("event0"), b"").unwrap();

    let hub = EvdevHub::new(config).unwrap();
    let events = drain(&hub, 0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, FINISHED_DEVICE_SCAN);
}

#[test]
fn reopen_recycles_the_virtual_keyboard() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.virtual_keyboard = true;
    let hub = EvdevHub::new(config).unwrap();
    drain(&hub, 0);

    hub.request_reopen_devices();
    let events = drain(&hub, 0);
    let kinds: Vec<u32> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![DEVICE_REMOVED, DEVICE_ADDED, FINISHED_DEVICE_SCAN]);
    assert_eq!(events[0].device_id, VIRTUAL_KEYBOARD_ID);
    assert_eq!(events[1].device_id, VIRTUAL_KEYBOARD_ID);
}

#[test]
fn dump_and_monitor_describe_a_live_hub() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.virtual_keyboard = true;
    let hub = EvdevHub::new(config).unwrap();
    drain(&hub, 0);

    // Nothing holds the hub lock here, so the watchdog probe must see it free.
    assert!(hub.monitor());

    let mut out = String::new();
    hub.dump(&mut out);
    assert!(out.contains("Event Hub State"));
    assert!(out.contains("Virtual"));
    assert!(out.contains(&format!("{VIRTUAL_KEYBOARD_ID}: ")));

    hub.set_excluded_devices(vec!["/dev/input/event9".into()]);
    let mut out = String::new();
    hub.dump(&mut out);
    assert!(out.contains("event9"));
}

#[test]
fn synthetic_timestamps_are_ordered() {
    let input = tempfile::tempdir().unwrap();
    let video = tempfile::tempdir().unwrap();
    let mut config = hub_config(input.path(), video.path());
    config.virtual_keyboard = true;
    let hub = EvdevHub::new(config).unwrap();

    let events = drain(&hub, 0);
    assert!(!events.is_empty());
    for pair in events.windows(2) {
        assert!(pair[0].when <= pair[1].when);
    }
    assert!(events[0].when > 0);
}
