//! Event types, codes, axis and button identifiers.
//!
//! Ported from `linux/input-event-codes.h`, restricted to the codes the hub itself consumes.
//! Codes without a named constant can still be represented via `from_raw`.

use std::fmt;

ffi_enum! {
    /// Input device properties.
    ///
    /// Many devices don't set any of these properties.
    pub enum InputProp: u8 {
        /// Indicates that the input position on screen should be indicated via a pointer.
        POINTER = 0x00,
        /// Indicates that the device's [`Abs`] axes map to the screen directly.
        ///
        /// Set for touchscreens and drawing tablets; unset for touchpads.
        DIRECT = 0x01,
        /// The touchpad registers clicks by pressing down on the surface.
        BUTTONPAD = 0x02,
        SEMI_MT = 0x03,
        TOPBUTTONPAD = 0x04,
        POINTING_STICK = 0x05,
        /// `ABS_X`/`ABS_Y`/`ABS_Z` report acceleration instead of position.
        ACCELEROMETER = 0x06,
    }
}
impl InputProp {
    pub(crate) const MAX: Self = Self(0x1f);
}
bitvalue!(InputProp);

impl fmt::Debug for InputProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "INPUT_PROP_{name}"),
            None => write!(f, "InputProp({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// Types of raw input events.
    pub enum EventType: u16 {
        /// Synchronization event, terminates a group of events.
        SYN = 0x00,
        /// A key or button press, release, or repeat.
        KEY = 0x01,
        /// A relative axis movement.
        REL = 0x02,
        /// An absolute axis change.
        ABS = 0x03,
        /// A miscellaneous event (eg. a raw scancode report).
        MSC = 0x04,
        /// A switch changed state.
        SW  = 0x05,
        /// An LED changed state, or is requested to change state.
        LED = 0x11,
        /// A sound started or stopped playing.
        SND = 0x12,
        /// The autorepeat settings have changed.
        REP = 0x14,
        /// Controls force-feedback parameters and effects.
        FF  = 0x15,
    }
}
impl EventType {
    pub(crate) const MAX: Self = Self(0x1f);
}
bitvalue!(EventType);

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "EV_{name}"),
            None => write!(f, "EventType({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// Keyboard keys and buttons.
    ///
    /// Only the codes the hub inspects for classification and state queries are named here;
    /// devices routinely report others, represented via [`Key::from_raw`].
    pub enum Key: u16 {
        KEY_RESERVED   = 0,
        KEY_ESC        = 1,
        KEY_Q          = 16,
        KEY_W          = 17,
        KEY_E          = 18,
        KEY_R          = 19,
        KEY_T          = 20,
        KEY_Y          = 21,
        KEY_U          = 22,
        KEY_I          = 23,
        KEY_O          = 24,
        KEY_P          = 25,
        KEY_ENTER      = 28,
        KEY_LEFTCTRL   = 29,
        KEY_A          = 30,
        KEY_S          = 31,
        KEY_D          = 32,
        KEY_F          = 33,
        KEY_G          = 34,
        KEY_H          = 35,
        KEY_J          = 36,
        KEY_K          = 37,
        KEY_L          = 38,
        KEY_LEFTSHIFT  = 42,
        KEY_Z          = 44,
        KEY_X          = 45,
        KEY_C          = 46,
        KEY_V          = 47,
        KEY_B          = 48,
        KEY_N          = 49,
        KEY_M          = 50,
        KEY_SPACE      = 57,
        KEY_CAPSLOCK   = 58,
        KEY_NUMLOCK    = 69,
        KEY_SCROLLLOCK = 70,
        KEY_UP         = 103,
        KEY_LEFT       = 105,
        KEY_RIGHT      = 106,
        KEY_DOWN       = 108,
        KEY_MUTE       = 113,
        KEY_POWER      = 116,

        /// Start of the miscellaneous button range; keys below this are "keyboard keys".
        BTN_MISC       = 0x100,
        /// Start of the mouse button range.
        BTN_MOUSE      = 0x110,
        BTN_RIGHT      = 0x111,
        BTN_MIDDLE     = 0x112,
        /// Start of the joystick button range.
        BTN_JOYSTICK   = 0x120,
        /// Start of the gamepad button range.
        BTN_GAMEPAD    = 0x130,
        BTN_EAST       = 0x131,
        BTN_NORTH      = 0x133,
        BTN_WEST       = 0x134,
        BTN_TL         = 0x136,
        BTN_TR         = 0x137,
        BTN_SELECT     = 0x13a,
        BTN_START      = 0x13b,
        BTN_MODE       = 0x13c,
        BTN_THUMBL     = 0x13d,
        BTN_THUMBR     = 0x13e,
        /// Start of the digitizer range.
        BTN_DIGI       = 0x140,
        BTN_TOUCH      = 0x14a,
        BTN_STYLUS     = 0x14b,
        BTN_STYLUS2    = 0x14c,
        /// End of the wheel range; also the first code past the joystick-ish button block.
        BTN_WHEEL      = 0x150,
        /// First "keyboard key" code above the button ranges.
        KEY_OK         = 0x160,
        BTN_DPAD_UP    = 0x220,
        BTN_DPAD_DOWN  = 0x221,
        BTN_DPAD_LEFT  = 0x222,
        BTN_DPAD_RIGHT = 0x223,
        MAX            = 0x2ff,
    }
}
bitvalue!(Key);

impl Key {
    /// `BTN_SOUTH`/`BTN_A`, the canonical gamepad button.
    pub const BTN_SOUTH: Self = Self(0x130);
    /// One past [`Key::MAX`]; usable as the exclusive end of a full-range scan.
    pub(crate) const END: Self = Self(Self::MAX.0 + 1);
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Key({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// Relative axes.
    pub enum Rel: u16 {
        X      = 0x00,
        Y      = 0x01,
        Z      = 0x02,
        RX     = 0x03,
        RY     = 0x04,
        RZ     = 0x05,
        HWHEEL = 0x06,
        DIAL   = 0x07,
        WHEEL  = 0x08,
        MISC   = 0x09,
        MAX    = 0x0f,
    }
}
bitvalue!(Rel);

impl fmt::Debug for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "REL_{name}"),
            None => write!(f, "Rel({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// Absolute axes.
    pub enum Abs: u16 {
        X           = 0x00,
        Y           = 0x01,
        Z           = 0x02,
        RX          = 0x03,
        RY          = 0x04,
        RZ          = 0x05,
        THROTTLE    = 0x06,
        RUDDER      = 0x07,
        WHEEL       = 0x08,
        GAS         = 0x09,
        BRAKE       = 0x0a,
        HAT0X       = 0x10,
        HAT0Y       = 0x11,
        HAT1X       = 0x12,
        HAT1Y       = 0x13,
        HAT2X       = 0x14,
        HAT2Y       = 0x15,
        HAT3X       = 0x16,
        HAT3Y       = 0x17,
        PRESSURE    = 0x18,
        DISTANCE    = 0x19,
        TILT_X      = 0x1a,
        TILT_Y      = 0x1b,
        TOOL_WIDTH  = 0x1c,
        VOLUME      = 0x20,
        MISC        = 0x28,
        /// Multitouch slot selector; its presence marks a multitouch protocol B device.
        MT_SLOT     = 0x2f,
        MT_TOUCH_MAJOR = 0x30,
        MT_TOUCH_MINOR = 0x31,
        MT_WIDTH_MAJOR = 0x32,
        MT_WIDTH_MINOR = 0x33,
        MT_ORIENTATION = 0x34,
        MT_POSITION_X  = 0x35,
        MT_POSITION_Y  = 0x36,
        MT_TOOL_TYPE   = 0x37,
        MT_BLOB_ID     = 0x38,
        MT_TRACKING_ID = 0x39,
        MT_PRESSURE    = 0x3a,
        MT_DISTANCE    = 0x3b,
        MT_TOOL_X      = 0x3c,
        MT_TOOL_Y      = 0x3d,
        MAX            = 0x3f,
    }
}
bitvalue!(Abs);

impl fmt::Debug for Abs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "ABS_{name}"),
            None => write!(f, "Abs({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// Switch codes.
    pub enum Switch: u16 {
        LID                  = 0x00,
        TABLET_MODE          = 0x01,
        HEADPHONE_INSERT     = 0x02,
        RFKILL_ALL           = 0x03,
        MICROPHONE_INSERT    = 0x04,
        DOCK                 = 0x05,
        LINEOUT_INSERT       = 0x06,
        JACK_PHYSICAL_INSERT = 0x07,
        VIDEOOUT_INSERT      = 0x08,
        CAMERA_LENS_COVER    = 0x09,
        KEYPAD_SLIDE         = 0x0a,
        MAX                  = 0x10,
    }
}
bitvalue!(Switch);

impl fmt::Debug for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "SW_{name}"),
            None => write!(f, "Switch({:#x})", self.0),
        }
    }
}

ffi_enum! {
    /// LED codes.
    pub enum Led: u16 {
        NUML     = 0x00,
        CAPSL    = 0x01,
        SCROLLL  = 0x02,
        COMPOSE  = 0x03,
        KANA     = 0x04,
        SLEEP    = 0x05,
        SUSPEND  = 0x06,
        MUTE     = 0x07,
        MISC     = 0x08,
        MAIL     = 0x09,
        CHARGING = 0x0a,
        MAX      = 0x0f,
    }
}
bitvalue!(Led);

impl fmt::Debug for Led {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "LED_{name}"),
            None => write!(f, "Led({:#x})", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_names() {
        assert_eq!(format!("{:?}", EventType::KEY), "EV_KEY");
        assert_eq!(format!("{:?}", Key::BTN_TOUCH), "BTN_TOUCH");
        assert_eq!(format!("{:?}", Key::from_raw(0x2f0)), "Key(0x2f0)");
        assert_eq!(format!("{:?}", Abs::MT_SLOT), "ABS_MT_SLOT");
        assert_eq!(format!("{:?}", Led::CAPSL), "LED_CAPSL");
    }

    #[test]
    fn button_range_layout() {
        // The classification rules lean on this ordering.
        assert!(Key::BTN_MISC < Key::BTN_MOUSE);
        assert!(Key::BTN_MOUSE < Key::BTN_JOYSTICK);
        assert!(Key::BTN_JOYSTICK < Key::BTN_GAMEPAD);
        assert!(Key::BTN_GAMEPAD < Key::BTN_DIGI);
        assert!(Key::BTN_WHEEL < Key::KEY_OK);
        assert!(Key::BTN_DPAD_RIGHT < Key::MAX);
    }
}
