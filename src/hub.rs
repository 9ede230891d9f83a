//! The event hub: the aggregation point for raw input events across all attached devices.
//!
//! The hub discovers devices through a directory watch, classifies and registers them, and
//! exposes one blocking [`EventHub::get_events`] stream interleaving kernel events with
//! synthetic add/remove/finished-scan records. Alongside the stream it answers capability and
//! state queries, drives vibrators and LEDs, and supports disabling/enabling devices without
//! forgetting them.
//!
//! Exactly one reader thread is expected to drive `get_events`; any number of caller threads may
//! issue queries and control operations concurrently. All shared state sits behind a single
//! mutex, released only across the blocking readiness wait.

use std::{
    collections::{HashMap, VecDeque},
    ffi::CString,
    fmt::Write as _,
    fs, io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
};

use crate::{
    abs_info::RawAbsoluteAxisInfo,
    classify::{self, DeviceClasses, ProbeInput},
    config::Config,
    device::Device,
    epoll::{EPOLL_MAX_EVENTS, EpollPump, PumpEvent, Readiness, WatchDir},
    error::{Error, Result},
    event::{
        Abs, BUILT_IN_KEYBOARD_ID, DEVICE_ADDED, DEVICE_REMOVED, DeviceId, FINISHED_DEVICE_SCAN,
        InputProp, Key, KeyState, NO_BUILT_IN_KEYBOARD, RawEvent, Rel, Switch,
        VIRTUAL_KEYBOARD_ID, now_nanos,
    },
    ff::Rumble,
    identifier::InputDeviceIdentifier,
    keymap::{GenericKeymap, KeyCharacterMap, KeymapResolver, KeyMap, LedCode, VirtualKeyDefinition},
    property_map::PropertyMap,
    raw::input::input_event,
    video::{TouchVideoDevice, TouchVideoFrame},
};

/// The operation table the input reader consumes.
///
/// There is one production implementation, [`EvdevHub`]; tests substitute their own.
pub trait EventHub: Send + Sync {
    /// Returns the classes of the device at `id`, or the empty set when no device is open there.
    fn device_classes(&self, id: DeviceId) -> DeviceClasses;

    /// Returns the identity of the device at `id`.
    fn device_identifier(&self, id: DeviceId) -> Option<InputDeviceIdentifier>;

    /// Returns the 1-based controller number assigned to the device, or 0.
    fn device_controller_number(&self, id: DeviceId) -> i32;

    /// Returns a copy of the device's configuration properties (empty when it has none).
    fn configuration(&self, id: DeviceId) -> PropertyMap;

    /// Describes one absolute axis; an invalid (all-zero) description when the device does not
    /// report the axis.
    fn absolute_axis_info(&self, id: DeviceId, axis: Abs) -> Result<RawAbsoluteAxisInfo>;

    /// Whether the device reports the given relative axis.
    fn has_relative_axis(&self, id: DeviceId, axis: Rel) -> bool;

    /// Whether the device advertises the given input property.
    fn has_input_property(&self, id: DeviceId, property: InputProp) -> bool;

    /// Maps a scan code (plus optional usage code) to a logical key through the device's layered
    /// key map.
    fn map_key(&self, id: DeviceId, scan_code: u32, usage_code: u32) -> Result<Key>;

    /// Replaces the set of path globs that are never opened.
    fn set_excluded_devices(&self, globs: Vec<String>);

    /// Waits up to `timeout_ms` (−1 for no timeout) for events and writes them into `buffer`.
    ///
    /// Returns the number of events delivered; 0 on timeout or wake. Synthetic lifecycle events
    /// take priority over kernel events. From a non-zero return until the next call, the hub
    /// holds its wake indication.
    fn get_events(&self, timeout_ms: i32, buffer: &mut [RawEvent]) -> usize;

    /// Drains the frames the device's paired touch-video node accumulated since the last call.
    fn get_video_frames(&self, id: DeviceId) -> Vec<TouchVideoFrame>;

    /// Current state of a raw scan code.
    fn scan_code_state(&self, id: DeviceId, scan_code: Key) -> KeyState;

    /// Current state of a logical key code, resolved through the key map.
    fn key_code_state(&self, id: DeviceId, key_code: Key) -> KeyState;

    /// Current state of a switch.
    fn switch_state(&self, id: DeviceId, sw: Switch) -> KeyState;

    /// Current value of an absolute axis.
    fn absolute_axis_value(&self, id: DeviceId, axis: Abs) -> Result<i32>;

    /// For each key code, records into `out_flags` whether the device can produce it. Returns
    /// false when no device is open at `id`.
    fn mark_supported_key_codes(&self, id: DeviceId, key_codes: &[Key], out_flags: &mut [bool])
    -> bool;

    /// Whether the device's kernel bitmask contains the scan code.
    fn has_scan_code(&self, id: DeviceId, scan_code: Key) -> bool;

    /// Whether the abstract LED code translates to an LED this device has.
    fn has_led(&self, id: DeviceId, led: LedCode) -> bool;

    /// Sets an LED, translating the abstract code per device. A no-op if unsupported.
    fn set_led_state(&self, id: DeviceId, led: LedCode, on: bool);

    /// The firmware-defined on-screen key polygons for a touch device.
    fn virtual_key_definitions(&self, id: DeviceId) -> Vec<VirtualKeyDefinition>;

    /// The key-character map queries currently resolve against (overlay first).
    fn key_character_map(&self, id: DeviceId) -> Option<Arc<dyn KeyCharacterMap>>;

    /// Installs or clears the keyboard layout overlay. Returns whether anything changed.
    fn set_keyboard_layout_overlay(
        &self,
        id: DeviceId,
        map: Option<Arc<dyn KeyCharacterMap>>,
    ) -> bool;

    /// Plays a rumble effect, cancelling any effect already playing on the device.
    fn vibrate(&self, id: DeviceId, effect: &Rumble);

    /// Stops and erases the playing effect, if any.
    fn cancel_vibrate(&self, id: DeviceId);

    /// Makes the next `get_events` turn close and rescan every device.
    fn request_reopen_devices(&self);

    /// Wakes a blocked `get_events` call promptly. Callable from any thread.
    fn wake(&self);

    /// Appends a human-readable state summary to `out`.
    fn dump(&self, out: &mut String);

    /// Tries to take the hub lock without blocking, releasing it immediately on success.
    ///
    /// Returns whether the lock was observed free. A watchdog polls this to tell a busy hub
    /// from a wedged one without parking its own thread behind the stuck lock.
    fn monitor(&self) -> bool;

    /// Whether the device at `id` is currently enabled.
    fn is_device_enabled(&self, id: DeviceId) -> bool;

    /// Reopens a disabled device's descriptor. [`Error::AlreadyInState`] if it was enabled.
    fn enable_device(&self, id: DeviceId) -> Result<()>;

    /// Closes the device's descriptor without forgetting the device. State queries against it
    /// return unknown until it is enabled again.
    fn disable_device(&self, id: DeviceId) -> Result<()>;
}

/// Pluggable wake indication.
///
/// The hub acquires this when `get_events` hands events to the consumer and releases it on the
/// next call, marking the span in which the system should stay awake for input processing. The
/// mechanism (a kernel wake lock, usually) belongs to the host integrator; the default is a
/// no-op.
pub trait WakeLock: Send + Sync {
    fn acquire(&self);
    fn release(&self);
}

/// The default, do-nothing wake indication.
#[derive(Debug, Default)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&self) {}
    fn release(&self) {}
}

/// Allocation bitmap for gamepad player numbers.
#[derive(Debug, Default)]
struct ControllerNumbers(u32);

impl ControllerNumbers {
    /// Claims the lowest free slot, 1-indexed; 0 when all 32 are taken.
    fn acquire(&mut self, name: &str) -> u16 {
        let slot = (!self.0).trailing_zeros();
        if slot >= 32 {
            log::info!("controller number pool exhausted, assigning 0 to '{name}'");
            return 0;
        }
        self.0 |= 1 << slot;
        (slot + 1) as u16
    }

    /// Returns a slot to the pool. Releasing 0 or an already-free slot is a logged no-op.
    fn release(&mut self, number: u16) {
        if number == 0 {
            return;
        }
        if number > 32 {
            log::warn!("releasing controller number {number} outside the pool");
            return;
        }
        let bit = 1u32 << (number - 1);
        if self.0 & bit == 0 {
            log::warn!("releasing controller number {number} that is not in use");
            return;
        }
        self.0 &= !bit;
    }
}

struct State {
    devices: HashMap<DeviceId, Device>,
    /// Devices opened but not yet announced through `DEVICE_ADDED`.
    opening: VecDeque<Device>,
    /// Devices torn down, awaiting their `DEVICE_REMOVED`, paired with the externally visible
    /// id they were known under (teardown may already have retired a built-in-keyboard alias).
    closing: VecDeque<(DeviceId, Device)>,
    /// Touch-video devices found before the touchscreen they belong to.
    unattached_video: Vec<TouchVideoDevice>,
    excluded: Vec<String>,
    controller_numbers: ControllerNumbers,
    next_device_id: DeviceId,
    built_in_keyboard_id: DeviceId,
    need_scan: bool,
    need_reopen: bool,
    need_finished_scan: bool,
    pending: [PumpEvent; EPOLL_MAX_EVENTS],
    pending_count: usize,
    pending_index: usize,
    pending_notify: bool,
    awake: bool,
    dropped_records: u64,
}

/// Configures and creates an [`EvdevHub`].
pub struct Builder {
    config: Config,
    keymap_resolver: Option<Arc<dyn KeymapResolver>>,
    wake_lock: Arc<dyn WakeLock>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("config", &self.config)
            .field("keymap_resolver", &self.keymap_resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Provides the key-character-map resolver. Without one, every device gets the generic
    /// (identity) map.
    pub fn keymap_resolver(mut self, resolver: Arc<dyn KeymapResolver>) -> Self {
        self.keymap_resolver = Some(resolver);
        self
    }

    /// Provides the wake indication implementation.
    pub fn wake_lock(mut self, wake_lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = wake_lock;
        self
    }

    /// Creates the hub, allocating its epoll and inotify instances and the wake pipe.
    ///
    /// Failure here is fatal: a hub without its multiplexer or directory watch is useless. The
    /// first `get_events` turn performs the startup device scan.
    pub fn build(self) -> io::Result<EvdevHub> {
        let pump = EpollPump::new(&self.config.input_directory, &self.config.video_directory)?;
        Ok(EvdevHub {
            state: Mutex::new(State {
                devices: HashMap::new(),
                opening: VecDeque::new(),
                closing: VecDeque::new(),
                unattached_video: Vec::new(),
                excluded: self.config.excluded_devices,
                controller_numbers: ControllerNumbers::default(),
                next_device_id: 1,
                built_in_keyboard_id: NO_BUILT_IN_KEYBOARD,
                need_scan: true,
                need_reopen: false,
                need_finished_scan: false,
                pending: [PumpEvent::default(); EPOLL_MAX_EVENTS],
                pending_count: 0,
                pending_index: 0,
                pending_notify: false,
                awake: false,
                dropped_records: 0,
            }),
            pump,
            input_directory: self.config.input_directory,
            video_directory: self.config.video_directory,
            config_directory: self.config.config_directory,
            virtual_keyboard: self.config.virtual_keyboard,
            keymap_resolver: self.keymap_resolver,
            wake_lock: self.wake_lock,
        })
    }
}

/// The production [`EventHub`] over the evdev kernel surface.
pub struct EvdevHub {
    // Protects all mutable hub state. Released only across the readiness wait.
    state: Mutex<State>,
    pump: EpollPump,
    input_directory: PathBuf,
    video_directory: PathBuf,
    config_directory: Option<PathBuf>,
    virtual_keyboard: bool,
    keymap_resolver: Option<Arc<dyn KeymapResolver>>,
    wake_lock: Arc<dyn WakeLock>,
}

impl EvdevHub {
    /// Starts building a hub from `config`.
    pub fn builder(config: Config) -> Builder {
        Builder {
            config,
            keymap_resolver: None,
            wake_lock: Arc::new(NoopWakeLock),
        }
    }

    /// Creates a hub with default collaborators.
    pub fn new(config: Config) -> io::Result<Self> {
        Self::builder(config).build()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve_id(state: &State, id: DeviceId) -> DeviceId {
        if id == BUILT_IN_KEYBOARD_ID {
            state.built_in_keyboard_id
        } else {
            id
        }
    }

    fn external_id(state: &State, internal: DeviceId) -> DeviceId {
        if internal == state.built_in_keyboard_id {
            BUILT_IN_KEYBOARD_ID
        } else {
            internal
        }
    }

    fn device<'a>(&self, state: &'a State, id: DeviceId) -> Option<&'a Device> {
        let internal = Self::resolve_id(state, id);
        if internal == NO_BUILT_IN_KEYBOARD {
            return None;
        }
        state.devices.get(&internal)
    }

    fn device_mut<'a>(&self, state: &'a mut State, id: DeviceId) -> Option<&'a mut Device> {
        let internal = Self::resolve_id(state, id);
        if internal == NO_BUILT_IN_KEYBOARD {
            return None;
        }
        state.devices.get_mut(&internal)
    }

    fn is_excluded(state: &State, path: &Path) -> bool {
        state
            .excluded
            .iter()
            .any(|glob| path_matches_glob(glob, path))
    }

    /// Computes a descriptor unique among the currently known devices.
    ///
    /// Devices awaiting their removal event are deliberately not consulted: a reconnecting
    /// device must get its old descriptor back.
    fn assign_descriptor_locked(state: &State, identifier: &mut InputDeviceIdentifier) {
        let mut nonce = 0u32;
        loop {
            let descriptor = identifier.compute_descriptor(nonce);
            let taken = state
                .devices
                .values()
                .chain(state.opening.iter())
                .any(|device| device.identifier.descriptor == descriptor);
            if !taken {
                if nonce > 0 {
                    log::debug!(
                        "descriptor collision for '{}', resolved with suffix {nonce}",
                        identifier.name
                    );
                }
                identifier.descriptor = descriptor;
                return;
            }
            nonce += 1;
        }
    }

    fn open_device_locked(&self, state: &mut State, path: &Path) {
        if Self::is_excluded(state, path) {
            log::debug!("not opening excluded device '{}'", path.display());
            return;
        }
        let already_open = state.devices.values().any(|device| device.path == path)
            || state.opening.iter().any(|device| device.path == path);
        if already_open {
            log::debug!("'{}' is already open, ignoring", path.display());
            return;
        }

        let mut device = match Device::open(path, state.next_device_id) {
            Ok(device) => device,
            Err(e) => {
                log::warn!("cannot open '{}': {e}", path.display());
                return;
            }
        };

        device.load_configuration(self.config_directory.as_deref());

        device.keymap = KeyMap::with_base(self.resolve_keymap(&device.identifier));

        let classes = classify::classify(
            &ProbeInput {
                key: &device.key_bitmask,
                abs: &device.abs_bitmask,
                rel: &device.rel_bitmask,
                sw: &device.sw_bitmask,
                ff: &device.ff_bitmask,
                prop: &device.prop_bitmask,
                identifier: &device.identifier,
                configuration: device.configuration.as_ref(),
            },
            |key| device.has_key_code(key),
        );
        if classes.is_empty() {
            log::debug!(
                "dropping '{}' ({}): no device classes",
                path.display(),
                device.identifier.name
            );
            return;
        }
        device.classes = classes;
        device.load_virtual_keys();

        Self::assign_descriptor_locked(state, &mut device.identifier);

        if classes.contains(DeviceClasses::GAMEPAD) {
            device.controller_number = state.controller_numbers.acquire(&device.identifier.name);
            device.set_led_for_controller();
        }

        if let Some(fd) = device.raw_fd() {
            if let Err(e) = self.pump.register_fd(fd) {
                log::error!("cannot register '{}' with epoll: {e}", path.display());
                state.controller_numbers.release(device.controller_number);
                return;
            }
        }

        state.next_device_id += 1;

        Self::maybe_adopt_built_in_keyboard(state, &device);

        if classes.contains(DeviceClasses::TOUCH) {
            let matching = state.unattached_video.iter().position(|video| {
                video.associated_input_path().as_deref() == Some(path)
            });
            if let Some(index) = matching {
                let video = state.unattached_video.swap_remove(index);
                self.attach_video_locked(&mut device, video);
            }
        }

        log::info!(
            "added device {} ('{}', {:?}) at '{}'",
            device.id,
            device.identifier.name,
            device.classes,
            path.display()
        );
        state.opening.push_back(device);
    }

    /// Records `device` as the built-in keyboard when it is the first eligible one: a real
    /// (non-virtual), internal, full alphabetic keyboard. Its events and lifecycle records are
    /// then reported under the external alias id 0.
    fn maybe_adopt_built_in_keyboard(state: &mut State, device: &Device) {
        if state.built_in_keyboard_id != NO_BUILT_IN_KEYBOARD || device.is_virtual {
            return;
        }
        if device
            .classes
            .contains(DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY)
            && !device.classes.contains(DeviceClasses::EXTERNAL)
        {
            log::info!(
                "device {} ('{}') is the built-in keyboard, reported as id 0",
                device.id,
                device.identifier.name
            );
            state.built_in_keyboard_id = device.id;
        }
    }

    fn resolve_keymap(
        &self,
        identifier: &InputDeviceIdentifier,
    ) -> Option<Arc<dyn KeyCharacterMap>> {
        match &self.keymap_resolver {
            Some(resolver) => match resolver.resolve(identifier) {
                Ok(Some(map)) => Some(map),
                Ok(None) => Some(Arc::new(GenericKeymap)),
                Err(e) => {
                    // Non-fatal: the device stays usable, key mapping queries will fail.
                    log::warn!("cannot load keymap for '{}': {e}", identifier.name);
                    None
                }
            },
            None => Some(Arc::new(GenericKeymap)),
        }
    }

    fn attach_video_locked(&self, device: &mut Device, video: TouchVideoDevice) {
        if device.has_valid_fd() {
            if let Err(e) = self.pump.register_fd(video.raw_fd()) {
                log::error!(
                    "cannot register video device '{}' with epoll: {e}",
                    video.path().display()
                );
                return;
            }
        }
        log::info!(
            "paired video device '{}' with '{}'",
            video.path().display(),
            device.path.display()
        );
        device.video = Some(video);
    }

    fn open_video_device_locked(&self, state: &mut State, path: &Path) {
        let already_open = state
            .unattached_video
            .iter()
            .any(|video| video.path() == path)
            || state.devices.values().chain(state.opening.iter()).any(|device| {
                device.video.as_ref().is_some_and(|video| video.path() == path)
            });
        if already_open {
            return;
        }

        let video = match TouchVideoDevice::open(path) {
            Ok(video) => video,
            Err(e) => {
                log::warn!("cannot open video device '{}': {e}", path.display());
                return;
            }
        };

        let input_path = video.associated_input_path();
        let mut owner = None;
        if let Some(input) = input_path.as_deref() {
            owner = state
                .devices
                .values_mut()
                .chain(state.opening.iter_mut())
                .find(|device| {
                    device.path == input && device.classes.contains(DeviceClasses::TOUCH)
                });
        }
        match owner {
            Some(device) => self.attach_video_locked(device, video),
            None => {
                log::debug!(
                    "video device '{}' has no touchscreen yet, keeping unattached",
                    path.display()
                );
                state.unattached_video.push(video);
            }
        }
    }

    fn close_video_device_by_path_locked(&self, state: &mut State, path: &Path) {
        if let Some(index) = state
            .unattached_video
            .iter()
            .position(|video| video.path() == path)
        {
            log::info!("removed unattached video device '{}'", path.display());
            state.unattached_video.remove(index);
            return;
        }
        for device in state.devices.values_mut().chain(state.opening.iter_mut()) {
            if device.video.as_ref().is_some_and(|video| video.path() == path) {
                let video = device.video.take();
                if let Some(video) = video {
                    if device.has_valid_fd() {
                        let _ = self.pump.unregister_fd(video.raw_fd());
                    }
                }
                log::info!(
                    "removed video device '{}' from '{}'",
                    path.display(),
                    device.path.display()
                );
                return;
            }
        }
    }

    /// Unhooks a device from the pump and the shared pools. The caller decides whether the
    /// record goes on to produce a `DEVICE_REMOVED`.
    fn teardown_device_locked(&self, state: &mut State, device: &mut Device) {
        if let Some(fd) = device.raw_fd() {
            if let Err(e) = self.pump.unregister_fd(fd) {
                log::warn!("cannot unregister '{}': {e}", device.path.display());
            }
        }
        if let Some(video) = device.video.take() {
            if device.has_valid_fd() {
                let _ = self.pump.unregister_fd(video.raw_fd());
            }
            // Still streamable, so a reappearing touchscreen can pick it back up.
            state.unattached_video.push(video);
        }
        state.controller_numbers.release(device.controller_number);
        device.controller_number = 0;
        if device.id == state.built_in_keyboard_id {
            log::warn!("built-in keyboard (device {}) is being removed", device.id);
            state.built_in_keyboard_id = NO_BUILT_IN_KEYBOARD;
        }
        device.close_fd();
    }

    /// Closes an announced device and queues its removal event.
    fn close_device_locked(&self, state: &mut State, id: DeviceId) {
        let Some(mut device) = state.devices.remove(&id) else {
            return;
        };
        log::info!(
            "removing device {} ('{}') at '{}'",
            device.id,
            device.identifier.name,
            device.path.display()
        );
        // The alias must be captured now: teardown retires a built-in keyboard's alias, but the
        // consumer knows the device by it.
        let external = Self::external_id(state, id);
        self.teardown_device_locked(state, &mut device);
        state.closing.push_back((external, device));
    }

    fn close_device_by_path_locked(&self, state: &mut State, path: &Path) {
        if let Some(id) = state
            .devices
            .values()
            .find(|device| device.path == path)
            .map(|device| device.id)
        {
            self.close_device_locked(state, id);
            return;
        }
        // Never announced: discard silently so the consumer sees neither lifecycle event.
        if let Some(index) = state.opening.iter().position(|device| device.path == path) {
            if let Some(mut device) = state.opening.remove(index) {
                self.teardown_device_locked(state, &mut device);
            }
        }
    }

    fn close_all_devices_locked(&self, state: &mut State) {
        let ids: Vec<DeviceId> = state.devices.keys().copied().collect();
        for id in ids {
            self.close_device_locked(state, id);
        }
        while let Some(mut device) = state.opening.pop_front() {
            self.teardown_device_locked(state, &mut device);
        }
    }

    fn scan_devices_locked(&self, state: &mut State) {
        if let Err(e) = self.scan_input_dir_locked(state) {
            log::error!(
                "cannot scan input directory '{}': {e}",
                self.input_directory.display()
            );
        }
        if let Err(e) = self.scan_video_dir_locked(state) {
            log::debug!(
                "cannot scan video directory '{}': {e}",
                self.video_directory.display()
            );
        }
        if self.virtual_keyboard {
            let present = state.devices.contains_key(&VIRTUAL_KEYBOARD_ID)
                || state.opening.iter().any(|device| device.is_virtual);
            if !present {
                let mut device = Device::virtual_keyboard();
                Self::assign_descriptor_locked(state, &mut device.identifier);
                log::info!("created virtual keyboard at id {}", device.id);
                state.opening.push_back(device);
            }
        }
    }

    fn scan_input_dir_locked(&self, state: &mut State) -> io::Result<()> {
        for entry in fs::read_dir(&self.input_directory)? {
            let entry = entry?;
            if !entry.file_name().as_encoded_bytes().starts_with(b"event") {
                continue;
            }
            self.open_device_locked(state, &entry.path());
        }
        Ok(())
    }

    fn scan_video_dir_locked(&self, state: &mut State) -> io::Result<()> {
        for entry in fs::read_dir(&self.video_directory)? {
            let entry = entry?;
            if !entry.file_name().as_encoded_bytes().starts_with(b"v4l-touch") {
                continue;
            }
            self.open_video_device_locked(state, &entry.path());
        }
        Ok(())
    }

    fn read_notify_locked(&self, state: &mut State) {
        let events = match self.pump.read_watch_events() {
            Ok(events) => events,
            Err(e) => {
                log::error!("cannot read directory watch events: {e}");
                return;
            }
        };
        for event in events {
            match event.dir {
                WatchDir::Input => {
                    if !event.name.as_encoded_bytes().starts_with(b"event") {
                        continue;
                    }
                    let path = self.input_directory.join(&event.name);
                    if event.created {
                        self.open_device_locked(state, &path);
                    } else {
                        self.close_device_by_path_locked(state, &path);
                    }
                }
                WatchDir::Video => {
                    if !event.name.as_encoded_bytes().starts_with(b"v4l-touch") {
                        continue;
                    }
                    let path = self.video_directory.join(&event.name);
                    if event.created {
                        self.open_video_device_locked(state, &path);
                    } else {
                        self.close_video_device_by_path_locked(state, &path);
                    }
                }
            }
        }
    }

    /// Finds which device (and which of its descriptors) an fd belongs to.
    fn fd_owner_locked(state: &State, fd: std::os::fd::RawFd) -> Option<(DeviceId, bool)> {
        for (&id, device) in &state.devices {
            if device.raw_fd() == Some(fd) {
                return Some((id, false));
            }
            if device.video.as_ref().map(|video| video.raw_fd()) == Some(fd) {
                return Some((id, true));
            }
        }
        None
    }
}

impl EventHub for EvdevHub {
    fn device_classes(&self, id: DeviceId) -> DeviceClasses {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.classes)
            .unwrap_or(DeviceClasses::empty())
    }

    fn device_identifier(&self, id: DeviceId) -> Option<InputDeviceIdentifier> {
        let state = self.lock();
        self.device(&state, id).map(|device| device.identifier.clone())
    }

    fn device_controller_number(&self, id: DeviceId) -> i32 {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.controller_number as i32)
            .unwrap_or(0)
    }

    fn configuration(&self, id: DeviceId) -> PropertyMap {
        let state = self.lock();
        self.device(&state, id)
            .and_then(|device| device.configuration.clone())
            .unwrap_or_default()
    }

    fn absolute_axis_info(&self, id: DeviceId, axis: Abs) -> Result<RawAbsoluteAxisInfo> {
        let state = self.lock();
        let device = self.device(&state, id).ok_or(Error::NotFound)?;
        device.absolute_axis_info(axis)
    }

    fn has_relative_axis(&self, id: DeviceId, axis: Rel) -> bool {
        let state = self.lock();
        self.device(&state, id)
            .is_some_and(|device| device.rel_bitmask.contains(axis))
    }

    fn has_input_property(&self, id: DeviceId, property: InputProp) -> bool {
        let state = self.lock();
        self.device(&state, id)
            .is_some_and(|device| device.prop_bitmask.contains(property))
    }

    fn map_key(&self, id: DeviceId, scan_code: u32, usage_code: u32) -> Result<Key> {
        let state = self.lock();
        let device = self.device(&state, id).ok_or(Error::NotFound)?;
        device
            .keymap
            .map_key(scan_code, usage_code)
            .ok_or(Error::NotFound)
    }

    fn set_excluded_devices(&self, globs: Vec<String>) {
        let mut state = self.lock();
        log::debug!("excluded devices: {globs:?}");
        state.excluded = globs;
    }

    fn get_events(&self, timeout_ms: i32, buffer: &mut [RawEvent]) -> usize {
        if buffer.is_empty() {
            return 0;
        }
        let mut read_buffer = vec![input_event::zeroed(); buffer.len().min(256)];
        let mut count = 0usize;
        let mut awoken = false;

        let mut state = self.lock();
        if state.awake {
            state.awake = false;
            self.wake_lock.release();
        }

        'turn: loop {
            let now = now_nanos();

            if state.need_reopen {
                state.need_reopen = false;
                self.close_all_devices_locked(&mut state);
                state.need_scan = true;
                log::info!("reopening all devices");
            }

            // Devices on their way out go first; their records must precede any reuse of the id.
            while let Some((external, device)) = state.closing.pop_front() {
                buffer[count] = RawEvent::synthetic(DEVICE_REMOVED, external, now);
                count += 1;
                drop(device); // the record is gone once its removal is reported
                if count == buffer.len() {
                    break 'turn;
                }
            }

            if state.need_scan {
                state.need_scan = false;
                self.scan_devices_locked(&mut state);
                state.need_finished_scan = true;
            }

            while let Some(device) = state.opening.pop_front() {
                let external = Self::external_id(&state, device.id);
                buffer[count] = RawEvent::synthetic(DEVICE_ADDED, external, now);
                count += 1;
                if let Some(old) = state.devices.insert(device.id, device) {
                    log::error!("device id {} was still present, dropping stale record", old.id);
                }
                state.need_finished_scan = true;
                if count == buffer.len() {
                    break 'turn;
                }
            }

            if state.need_finished_scan {
                state.need_finished_scan = false;
                buffer[count] = RawEvent::synthetic(FINISHED_DEVICE_SCAN, 0, now);
                count += 1;
                if count == buffer.len() {
                    break 'turn;
                }
            }

            // Work through the readiness batch from the previous wait.
            let mut device_changed = false;
            while state.pending_index < state.pending_count {
                let item = state.pending[state.pending_index];
                state.pending_index += 1;
                match item.readiness {
                    Readiness::Wake => {
                        if item.readable {
                            awoken = true;
                            self.pump.drain_wake();
                        }
                    }
                    Readiness::Notify => {
                        // Deferred until the batch is drained, so removals observed in this
                        // batch cannot race the events still queued behind them.
                        state.pending_notify = true;
                    }
                    Readiness::Fd(fd) => {
                        let Some((id, is_video)) = Self::fd_owner_locked(&state, fd) else {
                            log::warn!("readiness for unknown fd {fd}, ignoring");
                            continue;
                        };
                        if is_video {
                            let device = match state.devices.get_mut(&id) {
                                Some(device) => device,
                                None => continue,
                            };
                            if item.readable {
                                if let Some(video) = device.video.as_mut() {
                                    if let Err(e) = video.read_and_queue_frames() {
                                        log::warn!(
                                            "cannot read video frames from '{}': {e}",
                                            video.path().display()
                                        );
                                    }
                                }
                            } else if item.hangup {
                                if let Some(video) = device.video.take() {
                                    log::info!(
                                        "video device '{}' hung up",
                                        video.path().display()
                                    );
                                    let _ = self.pump.unregister_fd(video.raw_fd());
                                }
                            }
                            continue;
                        }

                        if item.readable {
                            let capacity = buffer.len() - count;
                            let slots = capacity.min(read_buffer.len());
                            let device = match state.devices.get_mut(&id) {
                                Some(device) => device,
                                None => continue,
                            };
                            match device.read_events(&mut read_buffer[..slots]) {
                                Ok(0) => {
                                    device_changed = true;
                                    self.close_device_locked(&mut state, id);
                                }
                                Ok(records) => {
                                    let external = Self::external_id(&state, id);
                                    let device = match state.devices.get_mut(&id) {
                                        Some(device) => device,
                                        None => continue,
                                    };
                                    for record in &read_buffer[..records] {
                                        device.note_event(record.type_, record.code, record.value);
                                        buffer[count] = RawEvent {
                                            when: record.time.tv_sec as i64 * 1_000_000_000
                                                + record.time.tv_usec as i64 * 1_000,
                                            device_id: external,
                                            event_type: record.type_ as u32,
                                            code: record.code as u32,
                                            value: record.value,
                                        };
                                        count += 1;
                                    }
                                    if count == buffer.len() {
                                        // The device may have more queued; revisit this fd on
                                        // the next turn.
                                        state.pending_index -= 1;
                                        break;
                                    }
                                }
                                Err(e)
                                    if e.kind() == io::ErrorKind::WouldBlock
                                        || e.kind() == io::ErrorKind::Interrupted => {}
                                Err(e) if e.raw_os_error() == Some(libc::ENODEV) => {
                                    device_changed = true;
                                    self.close_device_locked(&mut state, id);
                                }
                                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                                    state.dropped_records += 1;
                                    log::error!(
                                        "dropping garbled read from device {id}: {e}"
                                    );
                                }
                                Err(e) => {
                                    log::warn!("cannot read from device {id}: {e}");
                                    device_changed = true;
                                    self.close_device_locked(&mut state, id);
                                }
                            }
                        } else if item.hangup {
                            device_changed = true;
                            self.close_device_locked(&mut state, id);
                        }
                    }
                }
            }

            if state.pending_notify && state.pending_index >= state.pending_count {
                state.pending_notify = false;
                self.read_notify_locked(&mut state);
                device_changed = true;
            }

            if device_changed {
                continue 'turn;
            }
            if count > 0 || awoken {
                break 'turn;
            }

            // Nothing to deliver; wait for readiness with the hub lock released so callers can
            // query while the reader sleeps.
            state.pending_index = 0;
            state.pending_count = 0;
            drop(state);
            let mut events = [PumpEvent::default(); EPOLL_MAX_EVENTS];
            let wait_result = self.pump.wait(timeout_ms, &mut events);
            state = self.lock();
            match wait_result {
                Ok(0) => break 'turn, // timeout
                Ok(n) => {
                    state.pending[..n].copy_from_slice(&events[..n]);
                    state.pending_count = n;
                }
                Err(e) => {
                    log::error!("readiness wait failed: {e}");
                    break 'turn;
                }
            }
        }

        if count > 0 {
            self.wake_lock.acquire();
            state.awake = true;
        }
        count
    }

    fn get_video_frames(&self, id: DeviceId) -> Vec<TouchVideoFrame> {
        let mut state = self.lock();
        self.device_mut(&mut state, id)
            .and_then(|device| device.video.as_mut())
            .map(|video| video.take_frames())
            .unwrap_or_default()
    }

    fn scan_code_state(&self, id: DeviceId, scan_code: Key) -> KeyState {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.scan_code_state(scan_code))
            .unwrap_or(KeyState::Unknown)
    }

    fn key_code_state(&self, id: DeviceId, key_code: Key) -> KeyState {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.key_code_state(key_code))
            .unwrap_or(KeyState::Unknown)
    }

    fn switch_state(&self, id: DeviceId, sw: Switch) -> KeyState {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.switch_state(sw))
            .unwrap_or(KeyState::Unknown)
    }

    fn absolute_axis_value(&self, id: DeviceId, axis: Abs) -> Result<i32> {
        let state = self.lock();
        let device = self.device(&state, id).ok_or(Error::NotFound)?;
        device.absolute_axis_value(axis)
    }

    fn mark_supported_key_codes(
        &self,
        id: DeviceId,
        key_codes: &[Key],
        out_flags: &mut [bool],
    ) -> bool {
        let state = self.lock();
        let Some(device) = self.device(&state, id) else {
            return false;
        };
        for (key, flag) in key_codes.iter().zip(out_flags.iter_mut()) {
            *flag = device.has_key_code(*key);
        }
        true
    }

    fn has_scan_code(&self, id: DeviceId, scan_code: Key) -> bool {
        let state = self.lock();
        self.device(&state, id)
            .is_some_and(|device| device.key_bitmask.contains(scan_code))
    }

    fn has_led(&self, id: DeviceId, led: LedCode) -> bool {
        let state = self.lock();
        self.device(&state, id)
            .is_some_and(|device| device.map_led(led).is_some())
    }

    fn set_led_state(&self, id: DeviceId, led: LedCode, on: bool) {
        let mut state = self.lock();
        if let Some(device) = self.device_mut(&mut state, id) {
            device.set_led_state(led, on);
        }
    }

    fn virtual_key_definitions(&self, id: DeviceId) -> Vec<VirtualKeyDefinition> {
        let state = self.lock();
        self.device(&state, id)
            .map(|device| device.virtual_keys.clone())
            .unwrap_or_default()
    }

    fn key_character_map(&self, id: DeviceId) -> Option<Arc<dyn KeyCharacterMap>> {
        let state = self.lock();
        self.device(&state, id)
            .and_then(|device| device.keymap.character_map())
    }

    fn set_keyboard_layout_overlay(
        &self,
        id: DeviceId,
        map: Option<Arc<dyn KeyCharacterMap>>,
    ) -> bool {
        let mut state = self.lock();
        match self.device_mut(&mut state, id) {
            Some(device) => device.keymap.set_overlay(map),
            None => false,
        }
    }

    fn vibrate(&self, id: DeviceId, effect: &Rumble) {
        let mut state = self.lock();
        match self.device_mut(&mut state, id) {
            Some(device) => {
                if let Err(e) = device.vibrate(effect) {
                    log::warn!("cannot vibrate device {id}: {e}");
                }
            }
            None => log::warn!("cannot vibrate device {id}: no such device"),
        }
    }

    fn cancel_vibrate(&self, id: DeviceId) {
        let mut state = self.lock();
        if let Some(device) = self.device_mut(&mut state, id) {
            if let Err(e) = device.cancel_vibrate() {
                log::warn!("cannot cancel vibration on device {id}: {e}");
            }
        }
    }

    fn request_reopen_devices(&self) {
        let mut state = self.lock();
        state.need_reopen = true;
    }

    fn wake(&self) {
        self.pump.wake();
    }

    fn dump(&self, out: &mut String) {
        let state = self.lock();
        let _ = writeln!(out, "Event Hub State:");
        let _ = writeln!(out, "  BuiltInKeyboardId: {}", state.built_in_keyboard_id);
        let _ = writeln!(out, "  NextDeviceId: {}", state.next_device_id);
        let _ = writeln!(out, "  DroppedRecords: {}", state.dropped_records);
        let _ = writeln!(out, "  ExcludedDevices: {:?}", state.excluded);
        let _ = writeln!(out, "  Devices:");
        let mut ids: Vec<DeviceId> = state.devices.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let device = &state.devices[&id];
            let _ = writeln!(out, "    {id}: {}", device.identifier.name);
            let _ = writeln!(out, "      Classes: {:?}", device.classes);
            let _ = writeln!(out, "      Path: {}", device.path.display());
            let _ = writeln!(out, "      Enabled: {}", device.enabled);
            let _ = writeln!(out, "      Descriptor: {}", device.identifier.descriptor);
            let _ = writeln!(out, "      Location: {}", device.identifier.location);
            let _ = writeln!(out, "      ControllerNumber: {}", device.controller_number);
            let _ = writeln!(
                out,
                "      Identifier: bus={:?} vendor={:#06x} product={:#06x} version={:#06x}",
                device.identifier.bus,
                device.identifier.vendor,
                device.identifier.product,
                device.identifier.version
            );
            let _ = writeln!(out, "      HaveKeymap: {}", device.keymap.have_map());
            if let Some(video) = &device.video {
                let _ = writeln!(out, "      VideoDevice: {}", video.path().display());
            }
        }
        let _ = writeln!(
            out,
            "  UnattachedVideoDevices: {:?}",
            state
                .unattached_video
                .iter()
                .map(|video| video.path().display().to_string())
                .collect::<Vec<_>>()
        );
    }

    fn monitor(&self) -> bool {
        // A wedged hub lock must not park the watchdog as well; report instead of blocking.
        match self.state.try_lock() {
            Ok(guard) => {
                drop(guard);
                true
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                drop(poisoned.into_inner());
                true
            }
            Err(TryLockError::WouldBlock) => {
                log::warn!("hub lock is currently held");
                false
            }
        }
    }

    fn is_device_enabled(&self, id: DeviceId) -> bool {
        let state = self.lock();
        self.device(&state, id).is_some_and(|device| device.enabled)
    }

    fn enable_device(&self, id: DeviceId) -> Result<()> {
        let mut state = self.lock();
        let device = self.device_mut(&mut state, id).ok_or(Error::NotFound)?;
        if device.is_virtual {
            return Err(Error::Unsupported);
        }
        if device.enabled {
            log::warn!("duplicate call to enable device {id}");
            return Err(Error::AlreadyInState);
        }
        device.reopen_fd().map_err(Error::from)?;
        device.enabled = true;
        let fd = device.raw_fd();
        let video_fd = device.video.as_ref().map(|video| video.raw_fd());
        if let Some(fd) = fd {
            self.pump.register_fd(fd)?;
        }
        if let Some(fd) = video_fd {
            if let Err(e) = self.pump.register_fd(fd) {
                log::error!("cannot re-register video device: {e}");
            }
        }
        Ok(())
    }

    fn disable_device(&self, id: DeviceId) -> Result<()> {
        let mut state = self.lock();
        let device = self.device_mut(&mut state, id).ok_or(Error::NotFound)?;
        if device.is_virtual {
            return Err(Error::Unsupported);
        }
        if !device.enabled {
            log::warn!("duplicate call to disable device {id}");
            return Err(Error::AlreadyInState);
        }
        if let Some(fd) = device.raw_fd() {
            if let Err(e) = self.pump.unregister_fd(fd) {
                log::warn!("cannot unregister device {id}: {e}");
            }
        }
        if let Some(video) = device.video.as_ref() {
            if let Err(e) = self.pump.unregister_fd(video.raw_fd()) {
                log::warn!("cannot unregister video device of {id}: {e}");
            }
        }
        device.close_fd();
        device.enabled = false;
        Ok(())
    }
}

impl std::fmt::Debug for EvdevHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevHub")
            .field("input_directory", &self.input_directory)
            .field("video_directory", &self.video_directory)
            .field("virtual_keyboard", &self.virtual_keyboard)
            .finish_non_exhaustive()
    }
}

/// Matches a path against one exclusion glob via `fnmatch(3)`.
fn path_matches_glob(glob: &str, path: &Path) -> bool {
    let Ok(pattern) = CString::new(glob.as_bytes()) else {
        return false;
    };
    let Ok(subject) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::fnmatch(pattern.as_ptr(), subject.as_ptr(), 0) == 0 }
}
