//! Device identity: hardware ids, bus type, and the stable descriptor string.

use std::fmt::{self, Write};

ffi_enum! {
    /// Bus types that devices can be attached to the system with.
    pub enum Bus: u16 {
        PCI         = 0x01,
        ISAPNP      = 0x02,
        USB         = 0x03,
        HIL         = 0x04,
        BLUETOOTH   = 0x05,
        VIRTUAL     = 0x06,
        ISA         = 0x10,
        I8042       = 0x11,
        XTKBD       = 0x12,
        RS232       = 0x13,
        GAMEPORT    = 0x14,
        PARPORT     = 0x15,
        AMIGA       = 0x16,
        ADB         = 0x17,
        I2C         = 0x18,
        HOST        = 0x19,
        GSC         = 0x1A,
        ATARI       = 0x1B,
        SPI         = 0x1C,
        RMI         = 0x1D,
        CEC         = 0x1E,
        INTEL_ISHTP = 0x1F,
        AMD_SFH     = 0x20,
    }
}

impl Bus {
    /// Returns whether this bus implies an externally attached device.
    pub fn is_external(&self) -> bool {
        matches!(*self, Bus::USB | Bus::BLUETOOTH)
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "BUS_{name}"),
            None => write!(f, "Bus({:#x})", self.0),
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Bus(0)
    }
}

/// Everything known about a device's identity, independent of its current connection.
///
/// The `descriptor` is a content-derived string that recognizes a physical device across
/// reconnects; it stays stable as long as the identity fields do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDeviceIdentifier {
    /// Device name, as reported by `EVIOCGNAME`.
    pub name: String,
    /// Physical location (`EVIOCGPHYS`), eg. `usb-0000:02:00.0-5/input1`. Empty for virtual
    /// devices.
    pub location: String,
    /// Unique id (`EVIOCGUNIQ`), typically a serial number. Often empty.
    pub unique_id: String,
    /// The bus the device is attached over.
    pub bus: Bus,
    /// Vendor id.
    pub vendor: u16,
    /// Product id.
    pub product: u16,
    /// Device or transport version.
    pub version: u16,
    /// Content-derived stable descriptor; filled in by the hub when the device is installed.
    pub descriptor: String,
}

impl InputDeviceIdentifier {
    /// Computes the descriptor hash over the identity fields.
    ///
    /// The unique id is preferred as the distinguishing component; devices without one fall back
    /// to the name, then to the location. `nonce` perturbs the hash to resolve collisions
    /// between physically distinct devices that report identical identities.
    pub(crate) fn compute_descriptor(&self, nonce: u32) -> String {
        let mut hasher = Fnv1a::new();
        hasher.write(&self.bus.raw().to_le_bytes());
        hasher.write(&self.vendor.to_le_bytes());
        hasher.write(&self.product.to_le_bytes());
        hasher.write(&self.version.to_le_bytes());
        if !self.unique_id.is_empty() {
            hasher.write(self.unique_id.as_bytes());
        } else if !self.name.is_empty() {
            hasher.write(self.name.as_bytes());
        } else {
            hasher.write(self.location.as_bytes());
        }
        if nonce != 0 {
            hasher.write(&nonce.to_le_bytes());
        }
        let mut out = String::with_capacity(16);
        let _ = write!(out, "{:016x}", hasher.finish());
        out
    }
}

/// FNV-1a, 64-bit. Deterministic across processes, unlike the std hasher.
struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, unique: &str) -> InputDeviceIdentifier {
        InputDeviceIdentifier {
            name: name.into(),
            unique_id: unique.into(),
            bus: Bus::USB,
            vendor: 0x046d,
            product: 0xc52b,
            version: 0x111,
            ..Default::default()
        }
    }

    #[test]
    fn descriptor_is_stable() {
        let a = ident("kbd", "serial-1").compute_descriptor(0);
        let b = ident("kbd", "serial-1").compute_descriptor(0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn descriptor_distinguishes_identity() {
        let base = ident("kbd", "serial-1").compute_descriptor(0);
        assert_ne!(base, ident("kbd", "serial-2").compute_descriptor(0));
        // Without a unique id, the name participates instead.
        assert_ne!(
            ident("kbd", "").compute_descriptor(0),
            ident("mouse", "").compute_descriptor(0)
        );
    }

    #[test]
    fn nonce_perturbs_descriptor() {
        let id = ident("kbd", "");
        assert_ne!(id.compute_descriptor(0), id.compute_descriptor(1));
        assert_ne!(id.compute_descriptor(1), id.compute_descriptor(2));
    }

    #[test]
    fn bus_debug() {
        assert_eq!(format!("{:?}", Bus::USB), "BUS_USB");
        assert_eq!(format!("{:?}", Bus(0xffff)), "Bus(0xffff)");
        assert!(Bus::BLUETOOTH.is_external());
        assert!(!Bus::I8042.is_external());
    }
}
