//! A scripted [`EventHub`] double, plus protocol tests written against the trait.
//!
//! The double lets event sequences be staged without any kernel devices, which is how the
//! ordering rules of the synthetic protocol (add before events, remove last, one finished-scan
//! per cycle), the built-in-keyboard id alias, and the vibrator bookkeeping are pinned down.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Condvar, Mutex},
    thread,
    time::{Duration, Instant},
};

use evhub::{
    Abs, BUILT_IN_KEYBOARD_ID, DEVICE_ADDED, DEVICE_REMOVED, DeviceClasses, DeviceId, Error,
    EventHub, EventType, FINISHED_DEVICE_SCAN, InputDeviceIdentifier, InputProp, Key,
    KeyCharacterMap, KeyState, LedCode, PropertyMap, RawAbsoluteAxisInfo, RawEvent, Rel, Result,
    Switch, TouchVideoFrame, VirtualKeyDefinition, ff::Rumble,
};

#[derive(Default)]
struct FakeDevice {
    identifier: InputDeviceIdentifier,
    classes: DeviceClasses,
    enabled: bool,
    controller_number: i32,
    supported_keys: Vec<Key>,
    key_states: HashMap<Key, bool>,
    frames: Vec<TouchVideoFrame>,
    effect_id: Option<i16>,
    effect_playing: bool,
    next_effect_id: i16,
}

#[derive(Default)]
struct Inner {
    devices: HashMap<DeviceId, FakeDevice>,
    events: VecDeque<RawEvent>,
    /// Internal id of the adopted built-in keyboard, reported externally as id 0.
    built_in_keyboard: Option<DeviceId>,
    woken: bool,
}

impl Inner {
    fn resolve_id(&self, id: DeviceId) -> DeviceId {
        if id == BUILT_IN_KEYBOARD_ID {
            self.built_in_keyboard.unwrap_or(id)
        } else {
            id
        }
    }

    fn external_id(&self, internal: DeviceId) -> DeviceId {
        if self.built_in_keyboard == Some(internal) {
            BUILT_IN_KEYBOARD_ID
        } else {
            internal
        }
    }

    fn device(&self, id: DeviceId) -> Option<&FakeDevice> {
        self.devices.get(&self.resolve_id(id))
    }

    fn device_mut(&mut self, id: DeviceId) -> Option<&mut FakeDevice> {
        let internal = self.resolve_id(id);
        self.devices.get_mut(&internal)
    }
}

/// A scripted hub: tests stage devices (real ids ≥ 1) and events, the code under test consumes
/// them through the [`EventHub`] trait. The first internal alphabetic keyboard staged becomes
/// the built-in keyboard and is reported under the external alias id 0, like the real hub.
#[derive(Default)]
struct FakeEventHub {
    inner: Mutex<Inner>,
    condvar: Condvar,
}

impl FakeEventHub {
    fn new() -> Self {
        Self::default()
    }

    fn add_device(&self, id: DeviceId, name: &str, classes: DeviceClasses) {
        let mut inner = self.inner.lock().unwrap();
        let device = FakeDevice {
            identifier: InputDeviceIdentifier {
                name: name.into(),
                ..Default::default()
            },
            classes,
            enabled: true,
            ..Default::default()
        };
        inner.devices.insert(id, device);
        if inner.built_in_keyboard.is_none()
            && classes.contains(DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY)
            && !classes.contains(DeviceClasses::EXTERNAL)
            && !classes.contains(DeviceClasses::VIRTUAL)
        {
            inner.built_in_keyboard = Some(id);
        }
        let external = inner.external_id(id);
        inner.events.push_back(RawEvent {
            when: 0,
            device_id: external,
            event_type: DEVICE_ADDED,
            code: 0,
            value: 0,
        });
        self.condvar.notify_all();
    }

    fn remove_device(&self, id: DeviceId) {
        let mut inner = self.inner.lock().unwrap();
        // Capture the alias first: the consumer knows the built-in keyboard as id 0.
        let external = inner.external_id(id);
        inner.devices.remove(&id);
        if inner.built_in_keyboard == Some(id) {
            inner.built_in_keyboard = None;
        }
        inner.events.push_back(RawEvent {
            when: 0,
            device_id: external,
            event_type: DEVICE_REMOVED,
            code: 0,
            value: 0,
        });
        self.condvar.notify_all();
    }

    fn finish_device_scan(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.events.push_back(RawEvent {
            when: 0,
            device_id: 0,
            event_type: FINISHED_DEVICE_SCAN,
            code: 0,
            value: 0,
        });
        self.condvar.notify_all();
    }

    fn set_supported_keys(&self, id: DeviceId, keys: &[Key]) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(device) = inner.device_mut(id) {
            device.supported_keys = keys.to_vec();
        }
    }

    fn press_key(&self, id: DeviceId, key: Key, down: bool) {
        let mut inner = self.inner.lock().unwrap();
        let internal = inner.resolve_id(id);
        if let Some(device) = inner.devices.get_mut(&internal) {
            device.key_states.insert(key, down);
        }
        let external = inner.external_id(internal);
        inner.events.push_back(RawEvent {
            when: 0,
            device_id: external,
            event_type: EventType::KEY.raw() as u32,
            code: key.raw() as u32,
            value: down as i32,
        });
        self.condvar.notify_all();
    }

    fn effect_state(&self, id: DeviceId) -> (Option<i16>, bool) {
        let inner = self.inner.lock().unwrap();
        let device = inner.device(id).unwrap();
        (device.effect_id, device.effect_playing)
    }
}

impl EventHub for FakeEventHub {
    fn device_classes(&self, id: DeviceId) -> DeviceClasses {
        let inner = self.inner.lock().unwrap();
        inner
            .device(id)
            .map(|device| device.classes)
            .unwrap_or(DeviceClasses::empty())
    }

    fn device_identifier(&self, id: DeviceId) -> Option<InputDeviceIdentifier> {
        let inner = self.inner.lock().unwrap();
        inner.device(id).map(|device| device.identifier.clone())
    }

    fn device_controller_number(&self, id: DeviceId) -> i32 {
        let inner = self.inner.lock().unwrap();
        inner
            .device(id)
            .map(|device| device.controller_number)
            .unwrap_or(0)
    }

    fn configuration(&self, _id: DeviceId) -> PropertyMap {
        PropertyMap::new()
    }

    fn absolute_axis_info(&self, id: DeviceId, _axis: Abs) -> Result<RawAbsoluteAxisInfo> {
        let inner = self.inner.lock().unwrap();
        inner
            .device(id)
            .map(|_| RawAbsoluteAxisInfo::INVALID)
            .ok_or(Error::NotFound)
    }

    fn has_relative_axis(&self, _id: DeviceId, _axis: Rel) -> bool {
        false
    }

    fn has_input_property(&self, _id: DeviceId, _property: InputProp) -> bool {
        false
    }

    fn map_key(&self, id: DeviceId, scan_code: u32, _usage_code: u32) -> Result<Key> {
        let inner = self.inner.lock().unwrap();
        if inner.device(id).is_none() {
            return Err(Error::NotFound);
        }
        if scan_code <= Key::MAX.raw() as u32 {
            Ok(Key::from_raw(scan_code as u16))
        } else {
            Err(Error::NotFound)
        }
    }

    fn set_excluded_devices(&self, _globs: Vec<String>) {}

    fn get_events(&self, timeout_ms: i32, buffer: &mut [RawEvent]) -> usize {
        if buffer.is_empty() {
            return 0;
        }
        let deadline = if timeout_ms < 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_millis(timeout_ms as u64))
        };
        let mut inner = self.inner.lock().unwrap();
        loop {
            if !inner.events.is_empty() {
                let mut count = 0;
                while count < buffer.len() {
                    match inner.events.pop_front() {
                        Some(event) => {
                            buffer[count] = event;
                            count += 1;
                        }
                        None => break,
                    }
                }
                return count;
            }
            if inner.woken {
                inner.woken = false;
                return 0;
            }
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return 0;
                    }
                    let (guard, _timeout) = self
                        .condvar
                        .wait_timeout(inner, deadline - now)
                        .unwrap();
                    inner = guard;
                }
                None => {
                    inner = self.condvar.wait(inner).unwrap();
                }
            }
        }
    }

    fn get_video_frames(&self, id: DeviceId) -> Vec<TouchVideoFrame> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .device_mut(id)
            .map(|device| std::mem::take(&mut device.frames))
            .unwrap_or_default()
    }

    fn scan_code_state(&self, id: DeviceId, scan_code: Key) -> KeyState {
        let inner = self.inner.lock().unwrap();
        match inner.device(id) {
            Some(device) if device.enabled => match device.key_states.get(&scan_code) {
                Some(true) => KeyState::Down,
                Some(false) => KeyState::Up,
                None => KeyState::Unknown,
            },
            _ => KeyState::Unknown,
        }
    }

    fn key_code_state(&self, id: DeviceId, key_code: Key) -> KeyState {
        self.scan_code_state(id, key_code)
    }

    fn switch_state(&self, _id: DeviceId, _sw: Switch) -> KeyState {
        KeyState::Unknown
    }

    fn absolute_axis_value(&self, _id: DeviceId, _axis: Abs) -> Result<i32> {
        Err(Error::Unsupported)
    }

    fn mark_supported_key_codes(
        &self,
        id: DeviceId,
        key_codes: &[Key],
        out_flags: &mut [bool],
    ) -> bool {
        let inner = self.inner.lock().unwrap();
        let Some(device) = inner.device(id) else {
            return false;
        };
        for (key, flag) in key_codes.iter().zip(out_flags.iter_mut()) {
            *flag = device.supported_keys.contains(key);
        }
        true
    }

    fn has_scan_code(&self, id: DeviceId, scan_code: Key) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .device(id)
            .is_some_and(|device| device.supported_keys.contains(&scan_code))
    }

    fn has_led(&self, _id: DeviceId, _led: LedCode) -> bool {
        false
    }

    fn set_led_state(&self, _id: DeviceId, _led: LedCode, _on: bool) {}

    fn virtual_key_definitions(&self, _id: DeviceId) -> Vec<VirtualKeyDefinition> {
        Vec::new()
    }

    fn key_character_map(&self, _id: DeviceId) -> Option<Arc<dyn KeyCharacterMap>> {
        None
    }

    fn set_keyboard_layout_overlay(
        &self,
        _id: DeviceId,
        _map: Option<Arc<dyn KeyCharacterMap>>,
    ) -> bool {
        false
    }

    fn vibrate(&self, id: DeviceId, _effect: &Rumble) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(device) = inner.device_mut(id) {
            // A new effect always displaces the old one.
            device.effect_id = Some(device.next_effect_id);
            device.next_effect_id += 1;
            device.effect_playing = true;
        }
    }

    fn cancel_vibrate(&self, id: DeviceId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(device) = inner.device_mut(id) {
            device.effect_id = None;
            device.effect_playing = false;
        }
    }

    fn request_reopen_devices(&self) {}

    fn wake(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.woken = true;
        self.condvar.notify_all();
    }

    fn dump(&self, out: &mut String) {
        let inner = self.inner.lock().unwrap();
        out.push_str(&format!("FakeEventHub: {} devices\n", inner.devices.len()));
    }

    fn monitor(&self) -> bool {
        // Like the real hub: probe the lock, never park behind it.
        self.inner.try_lock().is_ok()
    }

    fn is_device_enabled(&self, id: DeviceId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.device(id).is_some_and(|device| device.enabled)
    }

    fn enable_device(&self, id: DeviceId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let device = inner.device_mut(id).ok_or(Error::NotFound)?;
        if device.enabled {
            return Err(Error::AlreadyInState);
        }
        device.enabled = true;
        Ok(())
    }

    fn disable_device(&self, id: DeviceId) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let device = inner.device_mut(id).ok_or(Error::NotFound)?;
        if !device.enabled {
            return Err(Error::AlreadyInState);
        }
        device.enabled = false;
        Ok(())
    }
}

fn drain(hub: &dyn EventHub, timeout_ms: i32) -> Vec<RawEvent> {
    let zero = RawEvent {
        when: 0,
        device_id: 0,
        event_type: 0,
        code: 0,
        value: 0,
    };
    let mut buffer = [zero; 16];
    let n = hub.get_events(timeout_ms, &mut buffer);
    buffer[..n].to_vec()
}

#[test]
fn cold_start_announces_keyboard_then_finishes() {
    let hub = FakeEventHub::new();
    hub.add_device(1, "membrane kbd", DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY);
    hub.finish_device_scan();

    // The first internal alphabetic keyboard is the built-in keyboard, so it is announced and
    // queried under the external alias id 0, never its internal id.
    let events = drain(&hub, 0);
    assert_eq!(events.len(), 2);
    assert_eq!(
        (events[0].event_type, events[0].device_id),
        (DEVICE_ADDED, BUILT_IN_KEYBOARD_ID)
    );
    assert_eq!(events[1].event_type, FINISHED_DEVICE_SCAN);
    assert_eq!(
        hub.device_classes(BUILT_IN_KEYBOARD_ID),
        DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY
    );

    // Nothing further: the next call runs into its timeout.
    let started = Instant::now();
    assert!(drain(&hub, 50).is_empty());
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn built_in_keyboard_alias_round_trip() {
    let hub = FakeEventHub::new();
    hub.add_device(7, "laptop kbd", DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY);
    hub.finish_device_scan();
    // A second alphabetic keyboard keeps its own id; the alias is already taken.
    hub.add_device(
        8,
        "usb kbd",
        DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY | DeviceClasses::EXTERNAL,
    );
    hub.press_key(7, Key::KEY_A, true);
    hub.remove_device(7);

    let ids: Vec<DeviceId> = drain(&hub, 0).iter().map(|e| e.device_id).collect();
    assert_eq!(ids, vec![BUILT_IN_KEYBOARD_ID, 0, 8, BUILT_IN_KEYBOARD_ID, BUILT_IN_KEYBOARD_ID]);

    // Id 0 stops resolving once the built-in keyboard is gone; the external one is untouched.
    assert_eq!(hub.device_classes(BUILT_IN_KEYBOARD_ID), DeviceClasses::empty());
    assert!(hub.device_classes(8).contains(DeviceClasses::EXTERNAL));
}

#[test]
fn added_precedes_events_and_removal_is_last() {
    let hub = FakeEventHub::new();
    hub.add_device(2, "pad", DeviceClasses::GAMEPAD | DeviceClasses::KEYBOARD);
    hub.finish_device_scan();
    hub.press_key(2, Key::BTN_SOUTH, true);
    hub.press_key(2, Key::BTN_SOUTH, false);
    hub.remove_device(2);

    let events = drain(&hub, 0);
    let kinds: Vec<u32> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        kinds,
        vec![
            DEVICE_ADDED,
            FINISHED_DEVICE_SCAN,
            EventType::KEY.raw() as u32,
            EventType::KEY.raw() as u32,
            DEVICE_REMOVED,
        ]
    );
    // The pad has no alpha keys, so its id is never aliased.
    assert_eq!(events[0].device_id, 2);
    // After removal the id queries as absent.
    assert_eq!(hub.device_classes(2), DeviceClasses::empty());
}

#[test]
fn vibrate_replaces_and_cancel_is_idempotent() {
    let hub = FakeEventHub::new();
    hub.add_device(3, "rumbler", DeviceClasses::GAMEPAD | DeviceClasses::VIBRATOR);
    drain(&hub, 0);

    hub.vibrate(3, &Rumble::new(0x8000, 0x8000, Duration::from_millis(100)));
    let (first, playing) = hub.effect_state(3);
    assert!(first.is_some());
    assert!(playing);

    // A second vibrate before completion displaces the first effect.
    hub.vibrate(3, &Rumble::new(0x4000, 0, Duration::from_millis(100)));
    let (second, playing) = hub.effect_state(3);
    assert!(playing);
    assert_ne!(first, second);

    hub.cancel_vibrate(3);
    assert_eq!(hub.effect_state(3), (None, false));
    hub.cancel_vibrate(3); // no-op
    assert_eq!(hub.effect_state(3), (None, false));
}

#[test]
fn wake_interrupts_a_blocking_consumer() {
    let hub = Arc::new(FakeEventHub::new());
    let waker = Arc::clone(&hub);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        waker.wake();
    });

    let started = Instant::now();
    let events = drain(hub.as_ref(), 30_000);
    handle.join().unwrap();
    assert!(events.is_empty());
    assert!(started.elapsed() < Duration::from_secs(5));

    // An uncontended double reports its lock free.
    assert!(hub.monitor());
}

#[test]
fn key_state_round_trips_through_disable_enable() {
    let hub = FakeEventHub::new();
    hub.add_device(4, "kbd", DeviceClasses::KEYBOARD);
    hub.set_supported_keys(4, &[Key::KEY_A, Key::KEY_SPACE]);
    drain(&hub, 0);

    hub.press_key(4, Key::KEY_A, true);
    drain(&hub, 0);
    assert_eq!(hub.scan_code_state(4, Key::KEY_A), KeyState::Down);

    hub.disable_device(4).unwrap();
    assert_eq!(hub.scan_code_state(4, Key::KEY_A), KeyState::Unknown);
    assert!(matches!(hub.disable_device(4), Err(Error::AlreadyInState)));

    hub.enable_device(4).unwrap();
    assert_eq!(hub.scan_code_state(4, Key::KEY_A), KeyState::Down);
    assert!(matches!(hub.enable_device(4), Err(Error::AlreadyInState)));

    let mut flags = [false; 3];
    assert!(hub.mark_supported_key_codes(4, &[Key::KEY_A, Key::KEY_B, Key::KEY_SPACE], &mut flags));
    assert_eq!(flags, [true, false, true]);
}
