//! The raw event stream delivered to the hub's consumer.
//!
//! [`RawEvent`] carries either an evdev record read from a device, or one of the synthetic
//! lifecycle records ([`DEVICE_ADDED`], [`DEVICE_REMOVED`], [`FINISHED_DEVICE_SCAN`]) that the hub
//! interleaves into the stream as devices come and go. Synthetic type codes live in a reserved
//! high range that no evdev event type can occupy.

pub(crate) mod codes;

pub use codes::{Abs, EventType, InputProp, Key, Led, Rel, Switch};

/// Identifies an input device for the lifetime of its current connection.
///
/// Real devices get ids ≥ 1. Id [`BUILT_IN_KEYBOARD_ID`] (0) is an external alias for the
/// built-in keyboard, and [`VIRTUAL_KEYBOARD_ID`] (−1) names the synthetic always-present
/// keyboard. After a device is removed its id may be reused.
pub type DeviceId = i32;

/// The id under which the synthetic virtual keyboard is reported.
pub const VIRTUAL_KEYBOARD_ID: DeviceId = -1;

/// The external alias for the built-in keyboard. No real device carries this id internally.
pub const BUILT_IN_KEYBOARD_ID: DeviceId = 0;

/// Internal sentinel: no built-in keyboard has been identified.
///
/// Must not conflict with any assigned device id, including the virtual keyboard id (−1).
pub(crate) const NO_BUILT_IN_KEYBOARD: DeviceId = -2;

/// Synthetic event type: a device was added.
pub const DEVICE_ADDED: u32 = 0x1000_0000;
/// Synthetic event type: a device was removed.
pub const DEVICE_REMOVED: u32 = 0x2000_0000;
/// Synthetic event type: all added/removed devices from the most recent scan have been reported.
///
/// Sent at least once, terminating the startup scan.
pub const FINISHED_DEVICE_SCAN: u32 = 0x3000_0000;

/// The lowest synthetic event type code.
pub const FIRST_SYNTHETIC_EVENT: u32 = DEVICE_ADDED;

/// A raw event as retrieved from the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Timestamp on the monotonic clock, in nanoseconds.
    pub when: i64,
    /// The device this event pertains to.
    pub device_id: DeviceId,
    /// An [`EventType`] code, or one of the synthetic type codes.
    pub event_type: u32,
    /// The evdev event code; 0 for synthetic events.
    pub code: u32,
    /// The evdev event value; 0 for synthetic events.
    pub value: i32,
}

impl RawEvent {
    pub(crate) fn synthetic(event_type: u32, device_id: DeviceId, when: i64) -> Self {
        Self {
            when,
            device_id,
            event_type,
            code: 0,
            value: 0,
        }
    }

    /// Returns whether this is one of the synthetic lifecycle events rather than an evdev record.
    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.event_type >= FIRST_SYNTHETIC_EVENT
    }
}

/// The result of a key, scan code, or switch state query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum KeyState {
    /// The device is missing, disabled, or does not report the queried code.
    Unknown = -1,
    /// The key or switch is released.
    Up = 0,
    /// The key or switch is pressed.
    Down = 1,
}

/// Current time on the monotonic clock, in nanoseconds.
///
/// This is the clock the hub configures on every opened device via `EVIOCSCLOCKID`, so event
/// timestamps and synthetic event timestamps are directly comparable.
pub(crate) fn now_nanos() -> i64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // Cannot fail for CLOCK_MONOTONIC.
    unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_codes_clear_of_evdev_types() {
        // Every evdev event type fits in a u16; the synthetic range must not collide.
        assert!(FIRST_SYNTHETIC_EVENT > u16::MAX as u32);
        assert!(DEVICE_ADDED < DEVICE_REMOVED);
        assert!(DEVICE_REMOVED < FINISHED_DEVICE_SCAN);

        let ev = RawEvent::synthetic(DEVICE_ADDED, 3, 17);
        assert!(ev.is_synthetic());
        let key = RawEvent {
            when: 17,
            device_id: 3,
            event_type: EventType::KEY.raw() as u32,
            code: Key::KEY_A.raw() as u32,
            value: 1,
        };
        assert!(!key.is_synthetic());
    }

    #[test]
    fn monotonic_clock_advances() {
        let a = now_nanos();
        let b = now_nanos();
        assert!(b >= a);
        assert!(a > 0);
    }
}
