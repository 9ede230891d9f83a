//! Aggregates raw input events from every evdev device on the system into a single blocking,
//! timestamped stream, with a query surface over device capabilities and current state.
//!
//! The central type is [`EvdevHub`]: it watches the input directory for device nodes, classifies
//! each one into [`DeviceClasses`], and interleaves synthetic add/remove/finished-scan records
//! with the kernel's events in [`EventHub::get_events`]. Consumers drive `get_events` from a
//! dedicated reader thread and may issue queries from any other thread.

#![warn(missing_debug_implementations)]

#[macro_use]
mod macros;

mod abs_info;
pub mod bits;
mod classify;
mod config;
mod device;
mod epoll;
mod error;
pub mod event;
pub mod ff;
mod hub;
mod identifier;
pub mod keymap;
mod property_map;
mod raw;
mod video;

pub use abs_info::RawAbsoluteAxisInfo;
pub use classify::{DeviceClasses, abs_axis_usage};
pub use config::{Config, DEFAULT_INPUT_DIRECTORY, DEFAULT_VIDEO_DIRECTORY};
pub use error::{Error, Result};
pub use event::{
    BUILT_IN_KEYBOARD_ID, DEVICE_ADDED, DEVICE_REMOVED, DeviceId, FINISHED_DEVICE_SCAN,
    FIRST_SYNTHETIC_EVENT, KeyState, RawEvent, VIRTUAL_KEYBOARD_ID,
};
pub use event::{Abs, EventType, InputProp, Key, Led, Rel, Switch};
pub use hub::{Builder, EvdevHub, EventHub, NoopWakeLock, WakeLock};
pub use identifier::{Bus, InputDeviceIdentifier};
pub use keymap::{
    GenericKeymap, KeyCharacterMap, KeyMap, KeymapResolver, LedCode, VirtualKeyDefinition,
};
pub use property_map::PropertyMap;
pub use video::TouchVideoFrame;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_sync() {
        fn assert<T: Send + Sync>() {}

        assert::<EvdevHub>();
        assert::<RawEvent>();
        assert::<TouchVideoFrame>();
        assert::<Config>();
    }
}
