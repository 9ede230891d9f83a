//! Per-device state.
//!
//! A [`Device`] is created when a path under the watched input directory passes the capability
//! probe. It owns the descriptor, the capability snapshot taken at open time, live key/switch
//! state mirrors, the layered key map, and the vibrator and LED bookkeeping. All mutation goes
//! through the hub, under the hub lock.

use std::{
    ffi::{c_char, c_int, c_void},
    fs::File,
    io::{self, Write},
    mem::MaybeUninit,
    os::{
        fd::{AsRawFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::{Path, PathBuf},
    slice,
};

use linux_ioctl::Ioctl;

use crate::{
    abs_info::RawAbsoluteAxisInfo,
    bits::{BitSet, BitValue, Word},
    classify::DeviceClasses,
    error::{Error, Result},
    event::{Abs, DeviceId, EventType, InputProp, Key, KeyState, Led, Rel, Switch},
    ff::{self, EffectId, Rumble},
    identifier::{Bus, InputDeviceIdentifier},
    keymap::{self, KeyMap, LedCode, VirtualKeyDefinition},
    property_map::PropertyMap,
    raw::input::{
        EVIOCGABS, EVIOCGBIT, EVIOCGID, EVIOCGKEY, EVIOCGNAME, EVIOCGPHYS, EVIOCGPROP, EVIOCGSW,
        EVIOCGUNIQ, EVIOCRMFF, EVIOCSCLOCKID, EVIOCSFF, input_event,
    },
    video::TouchVideoDevice,
};

pub(crate) struct Device {
    /// The open descriptor. `None` while the device is disabled; always `None` for the virtual
    /// keyboard, which never had one.
    file: Option<File>,
    pub id: DeviceId,
    pub path: PathBuf,
    pub identifier: InputDeviceIdentifier,
    pub classes: DeviceClasses,
    pub is_virtual: bool,
    pub enabled: bool,

    pub key_bitmask: BitSet<Key>,
    pub abs_bitmask: BitSet<Abs>,
    pub rel_bitmask: BitSet<Rel>,
    pub sw_bitmask: BitSet<Switch>,
    pub led_bitmask: BitSet<Led>,
    pub ff_bitmask: BitSet<ff::Feature>,
    pub prop_bitmask: BitSet<InputProp>,

    /// Last-seen key state, kept current from the event stream so queries don't re-ioctl.
    key_state: BitSet<Key>,
    sw_state: BitSet<Switch>,
    state_synced: bool,

    pub configuration: Option<PropertyMap>,
    pub virtual_keys: Vec<VirtualKeyDefinition>,
    pub keymap: KeyMap,

    pub ff_effect_id: Option<EffectId>,
    pub ff_effect_playing: bool,
    /// 1-based controller number, 0 when none is assigned.
    pub controller_number: u16,

    /// The paired touch-video device, owned exclusively once attached.
    pub video: Option<TouchVideoDevice>,
}

impl Device {
    /// Opens the evdev node at `path` and snapshots its identity and capabilities.
    ///
    /// Classification, key map resolution, and id/descriptor assignment are the hub's job; the
    /// returned record carries empty classes and no key map yet.
    pub fn open(path: &Path, id: DeviceId) -> io::Result<Device> {
        let file = open_node(path)?;

        let identifier = fetch_identifier(&file, path)?;
        let mut device = Device {
            file: Some(file),
            id,
            path: path.to_path_buf(),
            identifier,
            classes: DeviceClasses::empty(),
            is_virtual: false,
            enabled: true,
            key_bitmask: BitSet::new(),
            abs_bitmask: BitSet::new(),
            rel_bitmask: BitSet::new(),
            sw_bitmask: BitSet::new(),
            led_bitmask: BitSet::new(),
            ff_bitmask: BitSet::new(),
            prop_bitmask: BitSet::new(),
            key_state: BitSet::new(),
            sw_state: BitSet::new(),
            state_synced: false,
            configuration: None,
            virtual_keys: Vec::new(),
            keymap: KeyMap::default(),
            ff_effect_id: None,
            ff_effect_playing: false,
            controller_number: 0,
            video: None,
        };
        device.configure_fd()?;
        Ok(device)
    }

    /// Creates the synthetic always-present keyboard. It has no kernel descriptor and is never
    /// registered with epoll.
    pub fn virtual_keyboard() -> Device {
        let identifier = InputDeviceIdentifier {
            name: "Virtual".into(),
            bus: Bus::VIRTUAL,
            ..Default::default()
        };
        Device {
            file: None,
            id: crate::event::VIRTUAL_KEYBOARD_ID,
            path: PathBuf::from("<virtual>"),
            identifier,
            classes: DeviceClasses::KEYBOARD
                | DeviceClasses::ALPHAKEY
                | DeviceClasses::DPAD
                | DeviceClasses::VIRTUAL,
            is_virtual: true,
            enabled: true,
            key_bitmask: BitSet::new(),
            abs_bitmask: BitSet::new(),
            rel_bitmask: BitSet::new(),
            sw_bitmask: BitSet::new(),
            led_bitmask: BitSet::new(),
            ff_bitmask: BitSet::new(),
            prop_bitmask: BitSet::new(),
            key_state: BitSet::new(),
            sw_state: BitSet::new(),
            state_synced: false,
            configuration: None,
            virtual_keys: Vec::new(),
            keymap: KeyMap::with_base(Some(std::sync::Arc::new(keymap::GenericKeymap))),
            ff_effect_id: None,
            ff_effect_playing: false,
            controller_number: 0,
            video: None,
        }
    }

    /// Loads the capability bitmasks and the current key/switch state from the kernel.
    fn configure_fd(&mut self) -> io::Result<()> {
        let Some(file) = self.file.as_ref() else {
            return Err(io::Error::from_raw_os_error(libc::ENODEV));
        };

        self.key_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_KEY)", |len| {
            EVIOCGBIT(EventType::KEY.raw() as u8, len)
        })?;
        self.abs_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_ABS)", |len| {
            EVIOCGBIT(EventType::ABS.raw() as u8, len)
        })?;
        self.rel_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_REL)", |len| {
            EVIOCGBIT(EventType::REL.raw() as u8, len)
        })?;
        self.sw_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_SW)", |len| {
            EVIOCGBIT(EventType::SW.raw() as u8, len)
        })?;
        self.led_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_LED)", |len| {
            EVIOCGBIT(EventType::LED.raw() as u8, len)
        })?;
        self.ff_bitmask = fetch_bits(file, &self.path, "EVIOCGBIT(EV_FF)", |len| {
            EVIOCGBIT(EventType::FF.raw() as u8, len)
        })?;
        self.prop_bitmask = fetch_bits(file, &self.path, "EVIOCGPROP", EVIOCGPROP)?;

        set_monotonic_clock(file, &self.path);

        self.sync_state();
        Ok(())
    }

    /// Refreshes the key/switch mirrors from the kernel's view.
    fn sync_state(&mut self) {
        let Some(file) = self.file.as_ref() else {
            self.state_synced = false;
            return;
        };
        let key = fetch_bits(file, &self.path, "EVIOCGKEY", EVIOCGKEY);
        let sw = fetch_bits(file, &self.path, "EVIOCGSW", EVIOCGSW);
        match (key, sw) {
            (Ok(key), Ok(sw)) => {
                self.key_state = key;
                self.sw_state = sw;
                self.state_synced = true;
            }
            (key, sw) => {
                if let Some(e) = key.err().or(sw.err()) {
                    log::warn!("'{}': cannot read initial state: {e}", self.path.display());
                }
                self.state_synced = false;
            }
        }
    }

    pub fn has_valid_fd(&self) -> bool {
        self.file.is_some()
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.file.as_ref().map(|f| f.as_raw_fd())
    }

    /// Closes the descriptor, dropping all kernel subscriptions. The record itself survives.
    pub fn close_fd(&mut self) {
        self.file = None;
        self.state_synced = false;
        self.ff_effect_id = None;
        self.ff_effect_playing = false;
    }

    /// Reopens a disabled device's descriptor and resynchronizes its state mirrors.
    ///
    /// Capabilities were snapshotted at first open and are deliberately not re-probed.
    pub fn reopen_fd(&mut self) -> io::Result<()> {
        let file = open_node(&self.path)?;
        set_monotonic_clock(&file, &self.path);
        self.file = Some(file);
        self.sync_state();
        Ok(())
    }

    /// Reads pending evdev records into `out`. Returns the record count.
    pub fn read_events(&mut self, out: &mut [input_event]) -> io::Result<usize> {
        let Some(file) = self.file.as_ref() else {
            return Err(io::Error::from_raw_os_error(libc::ENODEV));
        };
        let byte_len = out.len() * size_of::<input_event>();
        let ret = unsafe { libc::read(file.as_raw_fd(), out.as_mut_ptr().cast(), byte_len) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        let bytes = ret as usize;
        if bytes % size_of::<input_event>() != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("got {bytes} bytes, not a multiple of the record size"),
            ));
        }
        Ok(bytes / size_of::<input_event>())
    }

    /// Folds an event that just came off the wire into the live state mirrors.
    pub fn note_event(&mut self, event_type: u16, code: u16, value: i32) {
        if event_type == EventType::KEY.raw() {
            let key = Key::from_raw(code);
            // Mirror only what the capability mask admits, so state queries stay inside it.
            if self.key_bitmask.contains(key) {
                if value != 0 {
                    self.key_state.insert(key);
                } else {
                    self.key_state.remove(key);
                }
            }
        } else if event_type == EventType::SW.raw() {
            let sw = Switch::from_raw(code);
            if self.sw_bitmask.contains(sw) {
                if value != 0 {
                    self.sw_state.insert(sw);
                } else {
                    self.sw_state.remove(sw);
                }
            }
        }
    }

    /// State of a raw scan code.
    pub fn scan_code_state(&self, scan_code: Key) -> KeyState {
        if !self.key_bitmask.contains(scan_code) || !self.has_valid_fd() {
            return KeyState::Unknown;
        }
        if self.state_synced {
            return down_up(self.key_state.contains(scan_code));
        }
        // Mirror miss: ask the kernel directly.
        match self
            .file
            .as_ref()
            .map(|f| fetch_bits::<Key>(f, &self.path, "EVIOCGKEY", EVIOCGKEY))
        {
            Some(Ok(state)) => down_up(state.contains(scan_code)),
            _ => KeyState::Unknown,
        }
    }

    /// State of a logical key code, resolved through the key map.
    pub fn key_code_state(&self, key_code: Key) -> KeyState {
        let scan_codes = self.scan_codes_for_key(key_code);
        let mut any_known = false;
        for scan in scan_codes {
            if scan > Key::MAX.raw() as u32 {
                continue;
            }
            match self.scan_code_state(Key::from_raw(scan as u16)) {
                KeyState::Down => return KeyState::Down,
                KeyState::Up => any_known = true,
                KeyState::Unknown => {}
            }
        }
        if any_known { KeyState::Up } else { KeyState::Unknown }
    }

    /// State of a switch.
    pub fn switch_state(&self, sw: Switch) -> KeyState {
        if !self.sw_bitmask.contains(sw) || !self.has_valid_fd() {
            return KeyState::Unknown;
        }
        if self.state_synced {
            return down_up(self.sw_state.contains(sw));
        }
        match self
            .file
            .as_ref()
            .map(|f| fetch_bits::<Switch>(f, &self.path, "EVIOCGSW", EVIOCGSW))
        {
            Some(Ok(state)) => down_up(state.contains(sw)),
            _ => KeyState::Unknown,
        }
    }

    /// Fetches the description of one absolute axis.
    pub fn absolute_axis_info(&self, axis: Abs) -> Result<RawAbsoluteAxisInfo> {
        Ok(self
            .fetch_absinfo(axis)?
            .map(RawAbsoluteAxisInfo::from)
            .unwrap_or(RawAbsoluteAxisInfo::INVALID))
    }

    /// Fetches the current value of one absolute axis.
    pub fn absolute_axis_value(&self, axis: Abs) -> Result<i32> {
        match self.fetch_absinfo(axis)? {
            Some(info) => Ok(info.value),
            None => Err(Error::Unsupported),
        }
    }

    fn fetch_absinfo(&self, axis: Abs) -> Result<Option<crate::raw::input::input_absinfo>> {
        if axis.raw() > Abs::MAX.raw() {
            return Err(Error::InvalidArgument);
        }
        if !self.abs_bitmask.contains(axis) {
            return Ok(None);
        }
        let file = self.file.as_ref().ok_or(Error::NotFound)?;
        let mut out = MaybeUninit::uninit();
        unsafe {
            device_ioctl(
                file,
                &self.path,
                "EVIOCGABS",
                EVIOCGABS(axis.raw() as u8),
                out.as_mut_ptr(),
            )?;
            Ok(Some(out.assume_init()))
        }
    }

    fn scan_codes_for_key(&self, key_code: Key) -> Vec<u32> {
        if self.keymap.have_map() {
            self.keymap.scan_codes_for_key(key_code)
        } else {
            vec![key_code.raw() as u32]
        }
    }

    /// Whether the device can produce `key_code`, resolved through the key map and the kernel
    /// key bitmask.
    pub fn has_key_code(&self, key_code: Key) -> bool {
        self.scan_codes_for_key(key_code).iter().any(|&scan| {
            scan <= Key::MAX.raw() as u32 && self.key_bitmask.contains(Key::from_raw(scan as u16))
        })
    }

    /// Translates an abstract LED code to this device's kernel LED index.
    pub fn map_led(&self, led: LedCode) -> Option<Led> {
        let mapped = self
            .keymap
            .led_for_code(led)
            .or_else(|| keymap::default_led(led))?;
        self.led_bitmask.contains(mapped).then_some(mapped)
    }

    /// Sets one LED, translating through the per-device table. A no-op if unsupported.
    pub fn set_led_state(&mut self, led: LedCode, on: bool) {
        let Some(mapped) = self.map_led(led) else {
            return;
        };
        if let Err(e) = self.write_event(EventType::LED.raw(), mapped.raw(), on as i32) {
            log::warn!("'{}': cannot set {led:?}: {e}", self.path.display());
        }
    }

    /// Lights the player-indicator LED matching the assigned controller number.
    pub fn set_led_for_controller(&mut self) {
        for number in 1..=4u16 {
            if let Some(code) = LedCode::controller(number) {
                self.set_led_state(code, self.controller_number == number);
            }
        }
    }

    /// Uploads and plays `effect`, cancelling any effect already playing.
    pub fn vibrate(&mut self, effect: &Rumble) -> Result<()> {
        if !self.classes.contains(DeviceClasses::VIBRATOR) {
            return Err(Error::Unsupported);
        }
        if self.ff_effect_playing {
            self.cancel_vibrate()?;
        } else if let Some(id) = self.ff_effect_id.take() {
            self.erase_effect(id);
        }

        let file = self.file.as_ref().ok_or(Error::NotFound)?;
        let mut raw = effect.to_raw();
        unsafe {
            device_ioctl(file, &self.path, "EVIOCSFF", EVIOCSFF, &mut raw)?;
        }
        let id = EffectId(raw.id);
        self.ff_effect_id = Some(id);
        self.write_event(EventType::FF.raw(), raw.id as u16, 1)
            .map_err(Error::Io)?;
        self.ff_effect_playing = true;
        Ok(())
    }

    /// Stops the playing effect and erases it from the device. Idempotent.
    pub fn cancel_vibrate(&mut self) -> Result<()> {
        if self.ff_effect_playing {
            self.ff_effect_playing = false;
            if let Some(id) = self.ff_effect_id {
                if let Err(e) = self.write_event(EventType::FF.raw(), id.0 as u16, 0) {
                    log::warn!("'{}': cannot stop effect: {e}", self.path.display());
                }
            }
        }
        if let Some(id) = self.ff_effect_id.take() {
            self.erase_effect(id);
        }
        Ok(())
    }

    fn erase_effect(&self, id: EffectId) {
        let Some(file) = self.file.as_ref() else {
            return;
        };
        if let Err(e) =
            unsafe { device_ioctl(file, &self.path, "EVIOCRMFF", EVIOCRMFF, id.0 as c_int) }
        {
            log::warn!("'{}': cannot erase effect {}: {e}", self.path.display(), id.0);
        }
    }

    /// Writes one event (LED, FF control) to the device.
    fn write_event(&self, event_type: u16, code: u16, value: i32) -> io::Result<()> {
        let mut file = self.file.as_ref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "device descriptor is closed")
        })?;
        let mut event = input_event::zeroed();
        event.type_ = event_type;
        event.code = code;
        event.value = value;
        let bytes = unsafe {
            slice::from_raw_parts((&raw const event).cast::<u8>(), size_of::<input_event>())
        };
        file.write_all(bytes)
    }

    /// Locates and loads the per-device configuration file, if one exists.
    pub fn load_configuration(&mut self, config_dir: Option<&Path>) {
        let Some(dir) = config_dir else { return };
        for candidate in configuration_file_names(&self.identifier) {
            let path = dir.join(candidate);
            match PropertyMap::load(&path) {
                Ok(map) => {
                    log::debug!(
                        "'{}': loaded configuration from '{}'",
                        self.path.display(),
                        path.display()
                    );
                    self.configuration = Some(map);
                    return;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    // Non-fatal: the device works without its tuning file.
                    log::warn!("cannot load configuration '{}': {e}", path.display());
                }
            }
        }
    }

    /// Loads the firmware virtual-key polygons for touch devices.
    pub fn load_virtual_keys(&mut self) {
        if !self.classes.contains(DeviceClasses::TOUCH) {
            return;
        }
        match keymap::load_virtual_keys(&self.identifier.name) {
            Ok(keys) => {
                if !keys.is_empty() {
                    log::debug!(
                        "'{}': loaded {} virtual keys",
                        self.path.display(),
                        keys.len()
                    );
                }
                self.virtual_keys = keys;
            }
            Err(e) => log::warn!("'{}': cannot load virtual keys: {e}", self.path.display()),
        }
    }
}

/// Event timestamps must come from the same clock the hub stamps synthetic events with.
fn set_monotonic_clock(file: &File, path: &Path) {
    let clockid: c_int = libc::CLOCK_MONOTONIC;
    if let Err(e) = unsafe { device_ioctl(file, path, "EVIOCSCLOCKID", EVIOCSCLOCKID, &clockid) } {
        log::warn!("'{}': cannot select monotonic clock: {e}", path.display());
    }
}

fn down_up(down: bool) -> KeyState {
    if down { KeyState::Down } else { KeyState::Up }
}

/// Candidate configuration file names, most specific first.
fn configuration_file_names(identifier: &InputDeviceIdentifier) -> Vec<String> {
    let mut names = Vec::new();
    if identifier.vendor != 0 || identifier.product != 0 {
        names.push(format!(
            "Vendor_{:04x}_Product_{:04x}.idc",
            identifier.vendor, identifier.product
        ));
    }
    if !identifier.name.is_empty() {
        let sanitized: String = identifier
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        names.push(format!("{sanitized}.idc"));
    }
    names
}

/// Opens an evdev node non-blocking, preferring read-write so LEDs and force feedback work, and
/// degrading to read-only when the user lacks write permission.
fn open_node(path: &Path) -> io::Result<File> {
    let flags = libc::O_NONBLOCK | libc::O_CLOEXEC;
    match File::options()
        .read(true)
        .write(true)
        .custom_flags(flags)
        .open(path)
    {
        Ok(file) => return Ok(file),
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            log::warn!(
                "no permission to open '{}' in read-write mode, retrying read-only",
                path.display()
            );
        }
        Err(e) => return Err(e),
    }
    File::options().read(true).custom_flags(flags).open(path)
}

/// Fetches the static identity of an open descriptor.
fn fetch_identifier(file: &File, path: &Path) -> io::Result<InputDeviceIdentifier> {
    let mut id = MaybeUninit::uninit();
    let raw = unsafe {
        device_ioctl(file, path, "EVIOCGID", EVIOCGID, id.as_mut_ptr())?;
        id.assume_init()
    };

    let name = unsafe { fetch_string(file, path, "EVIOCGNAME", EVIOCGNAME)? };
    let location = unsafe { fetch_string(file, path, "EVIOCGPHYS", EVIOCGPHYS) }
        .unwrap_or_default();
    let unique_id = unsafe { fetch_string(file, path, "EVIOCGUNIQ", EVIOCGUNIQ) }
        .unwrap_or_default();

    Ok(InputDeviceIdentifier {
        name,
        location,
        unique_id,
        bus: Bus::from_raw(raw.bustype),
        vendor: raw.vendor,
        product: raw.product,
        version: raw.version,
        descriptor: String::new(),
    })
}

/// Executes `ioctl` and adds device context to the error.
pub(crate) unsafe fn device_ioctl<T>(
    file: &File,
    path: &Path,
    name: &'static str,
    ioctl: Ioctl<T>,
    arg: T,
) -> io::Result<c_int> {
    match unsafe { ioctl.ioctl(file, arg) } {
        Ok(ok) => Ok(ok),
        Err(e) => Err(io::Error::new(
            e.kind(),
            format!("ioctl {name} failed for device '{}': {e}", path.display()),
        )),
    }
}

/// "Fetch string" ioctls return the number of copied bytes; a full buffer may mean truncation,
/// so the call is retried with a doubled buffer until it fits.
unsafe fn fetch_string(
    file: &File,
    path: &Path,
    ioctl_name: &'static str,
    ioctl: fn(usize) -> Ioctl<*mut c_char>,
) -> io::Result<String> {
    const INITIAL_LEN: usize = 64;
    let mut buf = vec![0_u8; INITIAL_LEN];
    let len = loop {
        let len = unsafe {
            device_ioctl(
                file,
                path,
                ioctl_name,
                ioctl(buf.len()),
                buf.as_mut_ptr() as *mut c_char,
            )?
        };
        if len as usize == buf.len() {
            buf.resize(buf.len() * 2, 0);
        } else {
            break len;
        }
    };

    // `len` includes the trailing 0 byte.
    buf.truncate(len.saturating_sub(1) as usize);
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Loads one capability bitmask straight into a typed [`BitSet`].
fn fetch_bits<V: BitValue>(
    file: &File,
    path: &Path,
    ioctl_name: &'static str,
    ioctl: fn(usize) -> Ioctl<*mut c_void>,
) -> io::Result<BitSet<V>> {
    let mut set = BitSet::<V>::new();
    let words = set.words_mut();
    unsafe {
        device_ioctl(
            file,
            path,
            ioctl_name,
            ioctl(words.len() * size_of::<Word>()),
            words.as_mut_ptr().cast(),
        )?;
    }
    Ok(set)
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("name", &self.identifier.name)
            .field("classes", &self.classes)
            .field("enabled", &self.enabled)
            .field("fd", &self.raw_fd())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_device() -> Device {
        let mut device = Device::virtual_keyboard();
        device.id = 7;
        device.is_virtual = false;
        device.classes = DeviceClasses::KEYBOARD;
        device
    }

    #[test]
    fn note_event_respects_bitmask() {
        let mut device = stub_device();
        device.key_bitmask.insert(Key::KEY_A);

        device.note_event(EventType::KEY.raw(), Key::KEY_A.raw(), 1);
        assert!(device.key_state.contains(Key::KEY_A));

        // A key the device never advertised must not leak into the mirror.
        device.note_event(EventType::KEY.raw(), Key::KEY_B.raw(), 1);
        assert!(!device.key_state.contains(Key::KEY_B));

        device.note_event(EventType::KEY.raw(), Key::KEY_A.raw(), 0);
        assert!(!device.key_state.contains(Key::KEY_A));
    }

    #[test]
    fn closed_device_reports_unknown() {
        let mut device = stub_device();
        device.key_bitmask.insert(Key::KEY_A);
        device.key_state.insert(Key::KEY_A);
        device.state_synced = true;

        // No fd: even a mirrored key is unknown.
        assert_eq!(device.scan_code_state(Key::KEY_A), KeyState::Unknown);
        assert_eq!(device.switch_state(Switch::LID), KeyState::Unknown);
    }

    #[test]
    fn key_code_state_through_identity_map() {
        let mut device = stub_device();
        device.keymap = KeyMap::default(); // no map at all: identity fallback
        device.key_bitmask.insert(Key::KEY_A);
        assert!(device.has_key_code(Key::KEY_A));
        assert!(!device.has_key_code(Key::KEY_B));
    }

    #[test]
    fn led_mapping_requires_capability() {
        let mut device = stub_device();
        assert_eq!(device.map_led(LedCode::CapsLock), None);
        device.led_bitmask.insert(Led::CAPSL);
        assert_eq!(device.map_led(LedCode::CapsLock), Some(Led::CAPSL));
        // Player LEDs resolve only through a key map override.
        assert_eq!(device.map_led(LedCode::Controller1), None);
    }

    #[test]
    fn configuration_file_name_candidates() {
        let identifier = InputDeviceIdentifier {
            name: "Acme Pad 3".into(),
            vendor: 0x1234,
            product: 0xabcd,
            ..Default::default()
        };
        let names = configuration_file_names(&identifier);
        assert_eq!(names[0], "Vendor_1234_Product_abcd.idc");
        assert_eq!(names[1], "Acme_Pad_3.idc");
    }

    #[test]
    fn vibrate_unsupported_without_class() {
        let mut device = stub_device();
        let err = device.vibrate(&Rumble::default()).unwrap_err();
        assert!(matches!(err, Error::Unsupported));
        // Cancelling with nothing playing is a no-op.
        device.cancel_vibrate().unwrap();
        assert!(device.ff_effect_id.is_none());
    }
}
