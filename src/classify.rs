//! Device classification.
//!
//! A freshly opened descriptor is classified into a set of [`DeviceClasses`] from its capability
//! bitmasks, property bits, and configuration file. Classification happens once, at open time;
//! capability drift after open is ignored until the device is closed and reopened.

use bitflags::bitflags;

use crate::{
    bits::BitSet,
    event::{Abs, InputProp, Key, Rel, Switch},
    ff,
    identifier::InputDeviceIdentifier,
    property_map::PropertyMap,
};

bitflags! {
    /// Input device classes.
    ///
    /// Classes are additive capabilities: a gamepad with joystick axes carries both classes.
    /// Some classes imply others (D-pad and gamepad imply keyboard, joystick implies gamepad);
    /// the probe enforces the implications, so consumers can test single bits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct DeviceClasses: u32 {
        /// The device is a keyboard or has buttons.
        const KEYBOARD = 0x0000_0001;
        /// The device is an alpha-numeric keyboard (not just a dial pad).
        const ALPHAKEY = 0x0000_0002;
        /// The device is a touchscreen or touchpad (single- or multi-touch).
        const TOUCH = 0x0000_0004;
        /// The device is a cursor device such as a trackball or mouse.
        const CURSOR = 0x0000_0008;
        /// The device is a multi-touch touchscreen.
        const TOUCH_MT = 0x0000_0010;
        /// The device is a directional pad (implies `KEYBOARD`).
        const DPAD = 0x0000_0020;
        /// The device is a gamepad (implies `KEYBOARD`).
        const GAMEPAD = 0x0000_0040;
        /// The device has switches.
        const SWITCH = 0x0000_0080;
        /// The device is a joystick (implies `GAMEPAD`).
        const JOYSTICK = 0x0000_0100;
        /// The device has a vibrator (supports `FF_RUMBLE`).
        const VIBRATOR = 0x0000_0200;
        /// The device has a microphone.
        const MIC = 0x0000_0400;
        /// The device is an external stylus (reports data to fuse with touch data).
        const EXTERNAL_STYLUS = 0x0000_0800;
        /// The device is a rotary encoder.
        const ROTARY_ENCODER = 0x0000_1000;
        /// The device is virtual (has no kernel descriptor).
        const VIRTUAL = 0x4000_0000;
        /// The device is external (not built-in).
        const EXTERNAL = 0x8000_0000;
    }
}

/// The capability masks and metadata the probe inspects.
pub(crate) struct ProbeInput<'a> {
    pub key: &'a BitSet<Key>,
    pub abs: &'a BitSet<Abs>,
    pub rel: &'a BitSet<Rel>,
    pub sw: &'a BitSet<Switch>,
    pub ff: &'a BitSet<ff::Feature>,
    pub prop: &'a BitSet<InputProp>,
    pub identifier: &'a InputDeviceIdentifier,
    pub configuration: Option<&'a PropertyMap>,
}

/// Keys that all have to resolve for a device to count as a directional pad.
const DPAD_REQUIRED_KEYS: [Key; 4] = [
    Key::BTN_DPAD_UP,
    Key::BTN_DPAD_DOWN,
    Key::BTN_DPAD_LEFT,
    Key::BTN_DPAD_RIGHT,
];

/// Any one of these marks a gamepad.
const GAMEPAD_KEYS: [Key; 11] = [
    Key::BTN_SOUTH,
    Key::BTN_EAST,
    Key::BTN_NORTH,
    Key::BTN_WEST,
    Key::BTN_TL,
    Key::BTN_TR,
    Key::BTN_SELECT,
    Key::BTN_START,
    Key::BTN_MODE,
    Key::BTN_THUMBL,
    Key::BTN_THUMBR,
];

/// Classifies a probed device.
///
/// `has_keycode` resolves a logical key through the device's loaded key map and kernel bitmask,
/// so remapped d-pads and gamepads classify correctly.
pub(crate) fn classify(input: &ProbeInput<'_>, has_keycode: impl Fn(Key) -> bool) -> DeviceClasses {
    let mut classes = DeviceClasses::empty();

    // Keyboard keys live below the button block and above it, starting at KEY_OK.
    let have_keyboard_keys = input.key.any_in_range(Key::KEY_RESERVED..Key::BTN_MISC)
        || input.key.any_in_range(Key::KEY_OK..Key::END);
    let have_gamepad_buttons = input.key.any_in_range(Key::BTN_MISC..Key::BTN_MOUSE)
        || input.key.any_in_range(Key::BTN_JOYSTICK..Key::BTN_DIGI);

    if have_keyboard_keys {
        classes |= DeviceClasses::KEYBOARD;
    }

    if input.rel.contains(Rel::X) && input.rel.contains(Rel::Y) {
        classes |= DeviceClasses::CURSOR;
    }

    if !input.sw.is_empty() {
        classes |= DeviceClasses::SWITCH;
    }

    // Touch surfaces advertise INPUT_PROP_DIRECT and absolute X/Y. Absolute X/Y paired with
    // mouse buttons is a pointing surface instead; without either it is joystick-like and left
    // to the joystick derivation below.
    let have_abs_xy = input.abs.contains(Abs::X) && input.abs.contains(Abs::Y);
    let have_mouse_buttons = input.key.any_in_range(Key::BTN_MOUSE..Key::BTN_JOYSTICK);
    if input.prop.contains(InputProp::DIRECT) && have_abs_xy {
        classes |= DeviceClasses::TOUCH;
        if input.abs.contains(Abs::MT_SLOT) {
            classes |= DeviceClasses::TOUCH_MT;
        }
    } else if have_abs_xy && have_mouse_buttons {
        classes |= DeviceClasses::CURSOR;
    }

    // A stylus that is not itself a touch surface reports pressure or the stylus buttons.
    if !classes.contains(DeviceClasses::TOUCH)
        && (input.key.contains(Key::BTN_STYLUS)
            || (input.key.contains(Key::BTN_TOUCH) && input.abs.contains(Abs::PRESSURE)))
    {
        classes |= DeviceClasses::EXTERNAL_STYLUS;
    }

    if DPAD_REQUIRED_KEYS.iter().all(|&key| has_keycode(key)) {
        classes |= DeviceClasses::DPAD | DeviceClasses::KEYBOARD;
    }

    if GAMEPAD_KEYS.iter().any(|&key| has_keycode(key)) {
        classes |= DeviceClasses::GAMEPAD | DeviceClasses::KEYBOARD;
    }

    // Joysticks are gamepads that also own at least one absolute axis. The gamepad-button
    // requirement keeps accelerometers and similar axis-only devices out of this class.
    if have_gamepad_buttons || classes.contains(DeviceClasses::GAMEPAD) {
        let assumed =
            classes | DeviceClasses::JOYSTICK | DeviceClasses::GAMEPAD | DeviceClasses::KEYBOARD;
        let owns_joystick_axis = input
            .abs
            .iter()
            .any(|axis| abs_axis_usage(axis, assumed).contains(DeviceClasses::JOYSTICK));
        if owns_joystick_axis {
            classes = assumed;
        }
    }

    if input.ff.contains(ff::Feature::RUMBLE) {
        classes |= DeviceClasses::VIBRATOR;
    }

    if classes.contains(DeviceClasses::KEYBOARD) && has_alphabetic_keys(input.key) {
        classes |= DeviceClasses::ALPHAKEY;
    }

    if let Some(config) = input.configuration {
        if config.get_bool("audio.mic") == Some(true) {
            classes |= DeviceClasses::MIC;
        }
        if config.get("device.type") == Some("rotaryEncoder") {
            classes |= DeviceClasses::ROTARY_ENCODER;
        }
    }

    if is_external(input.identifier, input.configuration) {
        classes |= DeviceClasses::EXTERNAL;
    }

    classes
}

/// Whether the key bitmask intersects any of the three alphabetic scan-code rows.
fn has_alphabetic_keys(key: &BitSet<Key>) -> bool {
    let next = |k: Key| Key::from_raw(k.raw() + 1);
    key.any_in_range(Key::KEY_Q..next(Key::KEY_P))
        || key.any_in_range(Key::KEY_A..next(Key::KEY_L))
        || key.any_in_range(Key::KEY_Z..next(Key::KEY_M))
}

/// The external-device heuristic: an explicit `device.internal` property wins, otherwise the
/// bus type decides.
fn is_external(identifier: &InputDeviceIdentifier, configuration: Option<&PropertyMap>) -> bool {
    if let Some(internal) = configuration.and_then(|c| c.get_bool("device.internal")) {
        return !internal;
    }
    identifier.bus.is_external()
}

/// Resolves which class owns `axis` when several could claim it.
///
/// Priority: multitouch, then touch, then external stylus (pressure only), then joystick, then
/// cursor.
pub fn abs_axis_usage(axis: Abs, classes: DeviceClasses) -> DeviceClasses {
    let mt_axis = (Abs::MT_SLOT.raw()..=Abs::MT_TOOL_Y.raw()).contains(&axis.raw());
    if classes.contains(DeviceClasses::TOUCH_MT) && mt_axis {
        return DeviceClasses::TOUCH_MT;
    }

    let touch_axis = mt_axis
        || matches!(
            axis,
            Abs::X
                | Abs::Y
                | Abs::PRESSURE
                | Abs::TOOL_WIDTH
                | Abs::DISTANCE
                | Abs::TILT_X
                | Abs::TILT_Y
        );
    if classes.contains(DeviceClasses::TOUCH) && touch_axis {
        return DeviceClasses::TOUCH;
    }

    if classes.contains(DeviceClasses::EXTERNAL_STYLUS) && axis == Abs::PRESSURE {
        return DeviceClasses::EXTERNAL_STYLUS;
    }

    if classes.contains(DeviceClasses::JOYSTICK) {
        return DeviceClasses::JOYSTICK;
    }
    classes & DeviceClasses::CURSOR
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::Bus;

    struct Caps {
        key: BitSet<Key>,
        abs: BitSet<Abs>,
        rel: BitSet<Rel>,
        sw: BitSet<Switch>,
        ff: BitSet<ff::Feature>,
        prop: BitSet<InputProp>,
        identifier: InputDeviceIdentifier,
        configuration: Option<PropertyMap>,
    }

    impl Caps {
        fn new() -> Self {
            Self {
                key: BitSet::new(),
                abs: BitSet::new(),
                rel: BitSet::new(),
                sw: BitSet::new(),
                ff: BitSet::new(),
                prop: BitSet::new(),
                identifier: InputDeviceIdentifier::default(),
                configuration: None,
            }
        }

        fn classify(&self) -> DeviceClasses {
            let input = ProbeInput {
                key: &self.key,
                abs: &self.abs,
                rel: &self.rel,
                sw: &self.sw,
                ff: &self.ff,
                prop: &self.prop,
                identifier: &self.identifier,
                configuration: self.configuration.as_ref(),
            };
            // The identity fallback: a key code is present iff its bit is.
            classify(&input, |key| self.key.contains(key))
        }
    }

    #[test]
    fn plain_keyboard() {
        let mut caps = Caps::new();
        caps.key
            .extend([Key::KEY_ESC, Key::KEY_Q, Key::KEY_A, Key::KEY_SPACE, Key::KEY_ENTER]);
        assert_eq!(
            caps.classify(),
            DeviceClasses::KEYBOARD | DeviceClasses::ALPHAKEY
        );
    }

    #[test]
    fn dial_pad_is_not_alpha() {
        let mut caps = Caps::new();
        caps.key.extend([Key::KEY_ESC, Key::KEY_ENTER, Key::KEY_UP]);
        assert_eq!(caps.classify(), DeviceClasses::KEYBOARD);
    }

    #[test]
    fn mouse() {
        let mut caps = Caps::new();
        caps.rel.extend([Rel::X, Rel::Y, Rel::WHEEL]);
        caps.key.insert(Key::BTN_MOUSE);
        assert_eq!(caps.classify(), DeviceClasses::CURSOR);
    }

    #[test]
    fn multitouch_touchscreen() {
        let mut caps = Caps::new();
        caps.prop.insert(InputProp::DIRECT);
        caps.abs.extend([
            Abs::X,
            Abs::Y,
            Abs::MT_SLOT,
            Abs::MT_POSITION_X,
            Abs::MT_POSITION_Y,
            Abs::MT_TRACKING_ID,
        ]);
        caps.key.insert(Key::BTN_TOUCH);
        assert_eq!(caps.classify(), DeviceClasses::TOUCH | DeviceClasses::TOUCH_MT);
    }

    #[test]
    fn single_touch_screen() {
        let mut caps = Caps::new();
        caps.prop.insert(InputProp::DIRECT);
        caps.abs.extend([Abs::X, Abs::Y]);
        caps.key.insert(Key::BTN_TOUCH);
        assert_eq!(caps.classify(), DeviceClasses::TOUCH);
    }

    #[test]
    fn external_usb_gamepad_with_rumble() {
        let mut caps = Caps::new();
        caps.identifier.bus = Bus::USB;
        caps.key.extend([Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_START]);
        caps.ff.insert(ff::Feature::RUMBLE);
        assert_eq!(
            caps.classify(),
            DeviceClasses::GAMEPAD
                | DeviceClasses::KEYBOARD
                | DeviceClasses::VIBRATOR
                | DeviceClasses::EXTERNAL
        );
    }

    #[test]
    fn gamepad_with_axes_is_joystick() {
        let mut caps = Caps::new();
        caps.key.extend([Key::BTN_SOUTH, Key::BTN_TL]);
        caps.abs.extend([Abs::X, Abs::Y, Abs::RZ]);
        let classes = caps.classify();
        assert!(classes.contains(DeviceClasses::JOYSTICK));
        assert!(classes.contains(DeviceClasses::GAMEPAD));
        assert!(classes.contains(DeviceClasses::KEYBOARD));
        // Joystick axes without DIRECT are not touch.
        assert!(!classes.contains(DeviceClasses::TOUCH));
    }

    #[test]
    fn axes_without_gamepad_buttons_are_not_joystick() {
        // Accelerometer shape: axes but no buttons at all.
        let mut caps = Caps::new();
        caps.abs.extend([Abs::X, Abs::Y, Abs::Z]);
        caps.prop.insert(InputProp::ACCELEROMETER);
        assert_eq!(caps.classify(), DeviceClasses::empty());
    }

    #[test]
    fn dpad_requires_all_four_directions() {
        let mut caps = Caps::new();
        caps.key
            .extend([Key::BTN_DPAD_UP, Key::BTN_DPAD_DOWN, Key::BTN_DPAD_LEFT]);
        assert!(!caps.classify().contains(DeviceClasses::DPAD));

        caps.key.insert(Key::BTN_DPAD_RIGHT);
        let classes = caps.classify();
        assert!(classes.contains(DeviceClasses::DPAD));
        assert!(classes.contains(DeviceClasses::KEYBOARD));
    }

    #[test]
    fn lid_switch() {
        let mut caps = Caps::new();
        caps.sw.insert(Switch::LID);
        assert_eq!(caps.classify(), DeviceClasses::SWITCH);
    }

    #[test]
    fn external_stylus() {
        let mut caps = Caps::new();
        caps.key.extend([Key::BTN_TOUCH, Key::BTN_STYLUS]);
        caps.abs.insert(Abs::PRESSURE);
        assert_eq!(caps.classify(), DeviceClasses::EXTERNAL_STYLUS);
    }

    #[test]
    fn configuration_driven_classes() {
        let mut caps = Caps::new();
        caps.rel.extend([Rel::X, Rel::Y]);
        caps.identifier.bus = Bus::USB;
        caps.configuration = Some(
            PropertyMap::parse("device.type = rotaryEncoder\naudio.mic = 1\ndevice.internal = 1\n")
                .unwrap(),
        );
        let classes = caps.classify();
        assert!(classes.contains(DeviceClasses::ROTARY_ENCODER));
        assert!(classes.contains(DeviceClasses::MIC));
        // device.internal overrides the USB-bus heuristic.
        assert!(!classes.contains(DeviceClasses::EXTERNAL));
    }

    #[test]
    fn axis_usage_priority() {
        let touch_mt = DeviceClasses::TOUCH | DeviceClasses::TOUCH_MT | DeviceClasses::JOYSTICK;
        assert_eq!(abs_axis_usage(Abs::MT_POSITION_X, touch_mt), DeviceClasses::TOUCH_MT);
        assert_eq!(abs_axis_usage(Abs::X, touch_mt), DeviceClasses::TOUCH);
        assert_eq!(abs_axis_usage(Abs::RZ, touch_mt), DeviceClasses::JOYSTICK);

        let stylus = DeviceClasses::EXTERNAL_STYLUS | DeviceClasses::JOYSTICK;
        assert_eq!(abs_axis_usage(Abs::PRESSURE, stylus), DeviceClasses::EXTERNAL_STYLUS);

        assert_eq!(
            abs_axis_usage(Abs::X, DeviceClasses::CURSOR),
            DeviceClasses::CURSOR
        );
        assert_eq!(
            abs_axis_usage(Abs::X, DeviceClasses::SWITCH),
            DeviceClasses::empty()
        );
    }
}
