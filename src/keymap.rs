//! Key-character-map resolution and layering.
//!
//! Parsing key-character-map files is not this crate's job; consumers hand the hub a
//! [`KeymapResolver`] whose maps implement [`KeyCharacterMap`]. The hub resolves a base map per
//! device (falling back to [`GenericKeymap`], the identity map), and lets the consumer layer a
//! runtime overlay on top. Queries consult the overlay first, then the base.

use std::{fmt, fs, io, path::Path, sync::Arc};

use crate::{
    event::{Key, Led},
    identifier::InputDeviceIdentifier,
};

/// A loaded key-character map: translates per-device scan codes into logical [`Key`] codes.
///
/// Logical key codes are evdev key codes; a map that performs no remapping is the identity.
pub trait KeyCharacterMap: Send + Sync {
    /// Maps a scan code (and optional HID usage code) to a logical key.
    ///
    /// Returns `None` when the map has no entry for the code.
    fn map_key(&self, scan_code: u32, usage_code: u32) -> Option<Key>;

    /// Returns the scan codes that produce `key`, for capability queries.
    fn scan_codes_for_key(&self, key: Key) -> Vec<u32>;

    /// Translates an abstract LED code to this device's LED index, if the map defines one.
    fn led_for_code(&self, _led: LedCode) -> Option<Led> {
        None
    }
}

/// Resolves the base key-character map for a device by its identifier.
pub trait KeymapResolver: Send + Sync {
    /// Returns the map for `identifier`.
    ///
    /// `Ok(None)` means "no specific map" and selects the generic fallback; an error means the
    /// map exists but failed to load, leaving the device without any map (key mapping queries
    /// will fail, the device stays usable otherwise).
    fn resolve(
        &self,
        identifier: &InputDeviceIdentifier,
    ) -> io::Result<Option<Arc<dyn KeyCharacterMap>>>;
}

/// The identity map: scan codes are logical key codes already.
#[derive(Debug, Default)]
pub struct GenericKeymap;

impl KeyCharacterMap for GenericKeymap {
    fn map_key(&self, scan_code: u32, _usage_code: u32) -> Option<Key> {
        if scan_code <= Key::MAX.raw() as u32 {
            Some(Key::from_raw(scan_code as u16))
        } else {
            None
        }
    }

    fn scan_codes_for_key(&self, key: Key) -> Vec<u32> {
        vec![key.raw() as u32]
    }
}

/// A device's layered key map: optional overlay over an optional base.
#[derive(Clone, Default)]
pub struct KeyMap {
    base: Option<Arc<dyn KeyCharacterMap>>,
    overlay: Option<Arc<dyn KeyCharacterMap>>,
}

impl KeyMap {
    pub(crate) fn with_base(base: Option<Arc<dyn KeyCharacterMap>>) -> Self {
        Self {
            base,
            overlay: None,
        }
    }

    /// Whether any map (base or overlay) is loaded.
    pub fn have_map(&self) -> bool {
        self.base.is_some() || self.overlay.is_some()
    }

    /// Installs or clears the runtime overlay. Returns whether this changed anything.
    pub fn set_overlay(&mut self, overlay: Option<Arc<dyn KeyCharacterMap>>) -> bool {
        let changed = match (&self.overlay, &overlay) {
            (None, None) => false,
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            _ => true,
        };
        self.overlay = overlay;
        changed
    }

    /// Maps a scan code through the overlay, then the base.
    pub fn map_key(&self, scan_code: u32, usage_code: u32) -> Option<Key> {
        if let Some(overlay) = &self.overlay {
            if let Some(key) = overlay.map_key(scan_code, usage_code) {
                return Some(key);
            }
        }
        self.base.as_ref()?.map_key(scan_code, usage_code)
    }

    /// Returns the scan codes producing `key`: the overlay's if it has any, else the base's.
    pub fn scan_codes_for_key(&self, key: Key) -> Vec<u32> {
        if let Some(overlay) = &self.overlay {
            let codes = overlay.scan_codes_for_key(key);
            if !codes.is_empty() {
                return codes;
            }
        }
        self.base
            .as_ref()
            .map(|base| base.scan_codes_for_key(key))
            .unwrap_or_default()
    }

    /// LED translation through the overlay, then the base.
    pub fn led_for_code(&self, led: LedCode) -> Option<Led> {
        if let Some(overlay) = &self.overlay {
            if let Some(mapped) = overlay.led_for_code(led) {
                return Some(mapped);
            }
        }
        self.base.as_ref()?.led_for_code(led)
    }

    /// The map that queries currently see first: the overlay if installed, else the base.
    pub fn character_map(&self) -> Option<Arc<dyn KeyCharacterMap>> {
        self.overlay.clone().or_else(|| self.base.clone())
    }
}

impl fmt::Debug for KeyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMap")
            .field("base", &self.base.is_some())
            .field("overlay", &self.overlay.is_some())
            .finish()
    }
}

/// Abstract indicator identifiers, translated per-device to kernel LED indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCode {
    CapsLock,
    NumLock,
    ScrollLock,
    Compose,
    Kana,
    /// Player-indicator LEDs on game controllers.
    Controller1,
    Controller2,
    Controller3,
    Controller4,
}

impl LedCode {
    pub(crate) fn controller(number: u16) -> Option<Self> {
        match number {
            1 => Some(LedCode::Controller1),
            2 => Some(LedCode::Controller2),
            3 => Some(LedCode::Controller3),
            4 => Some(LedCode::Controller4),
            _ => None,
        }
    }
}

/// The built-in LED table used when the device's key map does not override the translation.
///
/// Player-indicator LEDs have no standard evdev code, so they resolve only through a key map.
pub(crate) fn default_led(led: LedCode) -> Option<Led> {
    match led {
        LedCode::CapsLock => Some(Led::CAPSL),
        LedCode::NumLock => Some(Led::NUML),
        LedCode::ScrollLock => Some(Led::SCROLLL),
        LedCode::Compose => Some(Led::COMPOSE),
        LedCode::Kana => Some(Led::KANA),
        LedCode::Controller1
        | LedCode::Controller2
        | LedCode::Controller3
        | LedCode::Controller4 => None,
    }
}

/// The location and extent of an on-screen firmware key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualKeyDefinition {
    pub scan_code: u32,
    pub center_x: i32,
    pub center_y: i32,
    pub width: i32,
    pub height: i32,
}

/// Where firmware exports virtual-key polygons for touch devices.
const VIRTUAL_KEY_DIR: &str = "/sys/board_properties";

/// Loads the virtual-key definitions for the device named `device_name`, if the firmware
/// exports any.
pub(crate) fn load_virtual_keys(device_name: &str) -> io::Result<Vec<VirtualKeyDefinition>> {
    let path = Path::new(VIRTUAL_KEY_DIR).join(format!("virtualkeys.{device_name}"));
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    parse_virtual_keys(&contents)
        .map_err(|msg| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {msg}", path.display())))
}

/// Parses the firmware virtual-key format: colon-separated sextets of
/// `0x01:<scan>:<center-x>:<center-y>:<width>:<height>`.
pub(crate) fn parse_virtual_keys(contents: &str) -> Result<Vec<VirtualKeyDefinition>, String> {
    const VERSION: &str = "0x01";

    let mut keys = Vec::new();
    let mut fields = contents.trim().split(':');
    loop {
        let version = match fields.next() {
            Some(v) if !v.trim().is_empty() => v.trim(),
            _ => break,
        };
        if version != VERSION {
            return Err(format!("unexpected virtual key version '{version}'"));
        }
        let mut int_field = |what: &str| -> Result<i32, String> {
            fields
                .next()
                .ok_or_else(|| format!("truncated entry: missing {what}"))?
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("non-numeric {what}"))
        };
        let scan_code = int_field("scan code")?;
        keys.push(VirtualKeyDefinition {
            scan_code: scan_code as u32,
            center_x: int_field("center x")?,
            center_y: int_field("center y")?,
            width: int_field("width")?,
            height: int_field("height")?,
        });
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneKey;
    impl KeyCharacterMap for OneKey {
        fn map_key(&self, scan_code: u32, _usage: u32) -> Option<Key> {
            (scan_code == 0xa1).then_some(Key::KEY_MUTE)
        }
        fn scan_codes_for_key(&self, key: Key) -> Vec<u32> {
            if key == Key::KEY_MUTE { vec![0xa1] } else { Vec::new() }
        }
        fn led_for_code(&self, led: LedCode) -> Option<Led> {
            (led == LedCode::Controller1).then_some(Led::MISC)
        }
    }

    #[test]
    fn generic_map_is_identity() {
        let map = GenericKeymap;
        assert_eq!(map.map_key(Key::KEY_A.raw() as u32, 0), Some(Key::KEY_A));
        assert_eq!(map.map_key(0x10000, 0), None);
        assert_eq!(map.scan_codes_for_key(Key::KEY_Q), vec![Key::KEY_Q.raw() as u32]);
    }

    #[test]
    fn overlay_takes_precedence() {
        let mut map = KeyMap::with_base(Some(Arc::new(GenericKeymap)));
        assert_eq!(map.map_key(0xa1, 0), Some(Key::from_raw(0xa1)));

        assert!(map.set_overlay(Some(Arc::new(OneKey))));
        assert_eq!(map.map_key(0xa1, 0), Some(Key::KEY_MUTE));
        // Codes the overlay doesn't know fall through to the base.
        assert_eq!(map.map_key(30, 0), Some(Key::KEY_A));
        assert_eq!(map.scan_codes_for_key(Key::KEY_MUTE), vec![0xa1]);
        assert_eq!(map.led_for_code(LedCode::Controller1), Some(Led::MISC));

        assert!(map.set_overlay(None));
        assert!(!map.set_overlay(None));
        assert_eq!(map.map_key(0xa1, 0), Some(Key::from_raw(0xa1)));
    }

    #[test]
    fn no_map_resolves_nothing() {
        let map = KeyMap::with_base(None);
        assert!(!map.have_map());
        assert_eq!(map.map_key(30, 0), None);
        assert!(map.scan_codes_for_key(Key::KEY_A).is_empty());
        assert!(map.character_map().is_none());
    }

    #[test]
    fn default_led_table() {
        assert_eq!(default_led(LedCode::CapsLock), Some(Led::CAPSL));
        assert_eq!(default_led(LedCode::Controller2), None);
        assert_eq!(LedCode::controller(3), Some(LedCode::Controller3));
        assert_eq!(LedCode::controller(5), None);
    }

    #[test]
    fn parses_virtual_keys() {
        let keys = parse_virtual_keys("0x01:158:55:835:90:55:0x01:139:172:835:125:55\n").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].scan_code, 158);
        assert_eq!(keys[1], VirtualKeyDefinition {
            scan_code: 139,
            center_x: 172,
            center_y: 835,
            width: 125,
            height: 55,
        });

        assert!(parse_virtual_keys("").unwrap().is_empty());
        assert!(parse_virtual_keys("0x02:1:2:3:4:5").is_err());
        assert!(parse_virtual_keys("0x01:158:55").is_err());
    }
}
