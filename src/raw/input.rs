//! `linux/input.h`, restricted to the hub's kernel surface.

use std::ffi::{c_char, c_int, c_uint, c_void};

use libc::timeval;
use linux_ioctl::{_IOC, _IOC_READ, _IOR, _IOW, Ioctl};

#[derive(Clone, Copy)]
#[repr(C)]
pub struct input_event {
    pub time: timeval,
    pub type_: u16,
    pub code: u16,
    pub value: i32,
}

impl input_event {
    pub const fn zeroed() -> Self {
        Self {
            time: timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            type_: 0,
            code: 0,
            value: 0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct input_id {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct input_absinfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

/// Get device ID.
pub const EVIOCGID: Ioctl<*mut input_id> = _IOR(b'E', 0x02);

/// Get device name.
pub const fn EVIOCGNAME(len: usize) -> Ioctl<*mut c_char> {
    _IOC(_IOC_READ, b'E', 0x06, len)
}
/// Get physical location.
pub const fn EVIOCGPHYS(len: usize) -> Ioctl<*mut c_char> {
    _IOC(_IOC_READ, b'E', 0x07, len)
}
/// Get unique identifier.
pub const fn EVIOCGUNIQ(len: usize) -> Ioctl<*mut c_char> {
    _IOC(_IOC_READ, b'E', 0x08, len)
}
/// Get device properties.
pub const fn EVIOCGPROP(len: usize) -> Ioctl<*mut c_void> {
    _IOC(_IOC_READ, b'E', 0x09, len)
}

/// Get global key state.
pub const fn EVIOCGKEY(len: usize) -> Ioctl<*mut c_void> {
    _IOC(_IOC_READ, b'E', 0x18, len)
}
/// Get all LEDs.
#[allow(dead_code)] // LED state is written, never read back
pub const fn EVIOCGLED(len: usize) -> Ioctl<*mut c_void> {
    _IOC(_IOC_READ, b'E', 0x19, len)
}
/// Get all switch states.
pub const fn EVIOCGSW(len: usize) -> Ioctl<*mut c_void> {
    _IOC(_IOC_READ, b'E', 0x1b, len)
}

/// Get the capability bits for event type `ev` (0 for the overall type mask).
pub const fn EVIOCGBIT(ev: u8, len: usize) -> Ioctl<*mut c_void> {
    _IOC(_IOC_READ, b'E', 0x20 + ev, len)
}
/// Get the `input_absinfo` for one absolute axis.
pub const fn EVIOCGABS(abs: u8) -> Ioctl<*mut input_absinfo> {
    _IOR(b'E', 0x40 + abs)
}

/// Send a force feedback effect.
///
/// Takes a mutable pointer: the kernel assigns the effect id into the passed structure.
pub const EVIOCSFF: Ioctl<*mut ff_effect> = _IOW(b'E', 0x80).cast_mut();
/// Erase a force feedback effect.
pub const EVIOCRMFF: Ioctl<c_int> = _IOW(b'E', 0x81).with_direct_arg();

/// Select the clock used for event timestamps.
pub const EVIOCSCLOCKID: Ioctl<*const c_int> = _IOW(b'E', 0xa0);

#[allow(dead_code)]
pub const EV_VERSION: c_uint = 0x010001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_replay {
    pub length: u16,
    pub delay: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_trigger {
    pub button: u16,
    pub interval: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_envelope {
    pub attack_length: u16,
    pub attack_level: u16,
    pub fade_length: u16,
    pub fade_level: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_constant_effect {
    pub level: i16,
    pub envelope: ff_envelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_ramp_effect {
    pub start_level: i16,
    pub end_level: i16,
    pub envelope: ff_envelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_condition_effect {
    pub right_saturation: u16,
    pub left_saturation: u16,

    pub right_coeff: i16,
    pub left_coeff: i16,

    pub deadband: u16,
    pub center: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_periodic_effect {
    pub waveform: u16,
    pub period: u16,
    pub magnitude: i16,
    pub offset: i16,
    pub phase: u16,

    pub envelope: ff_envelope,

    pub custom_len: u32,
    pub custom_data: *mut i16,
}
unsafe impl Send for ff_periodic_effect {}
unsafe impl Sync for ff_periodic_effect {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ff_rumble_effect {
    pub strong_magnitude: u16,
    pub weak_magnitude: u16,
}

#[derive(Clone, Copy)]
#[repr(C)]
pub struct ff_effect {
    pub type_: u16,
    pub id: i16,
    pub direction: u16,
    pub trigger: ff_trigger,
    pub replay: ff_replay,

    pub u: ff_effect_union,
}

/// The union must keep the kernel's full layout even though only the rumble member is used;
/// `EVIOCSFF` encodes `size_of::<ff_effect>()` into the request number.
#[derive(Clone, Copy)]
pub union ff_effect_union {
    pub constant: ff_constant_effect,
    pub ramp: ff_ramp_effect,
    pub periodic: ff_periodic_effect,
    pub condition: [ff_condition_effect; 2],
    pub rumble: ff_rumble_effect,
}
