//! Force-feedback support.
//!
//! The hub drives vibrators through the kernel's force-feedback subsystem: a rumble waveform is
//! uploaded as an effect, played once, and erased when cancelled or replaced. Support is
//! advertised by the [`Feature::RUMBLE`] capability bit.

use std::{fmt, time::Duration};

use crate::raw::input::{ff_effect, ff_effect_union, ff_replay, ff_rumble_effect, ff_trigger};

ffi_enum! {
    /// Force feedback feature flags.
    ///
    /// Queried from the `EVIOCGBIT(EV_FF)` capability mask. The hub only ever plays
    /// [`Feature::RUMBLE`] effects; the remaining flags exist so that the mask can be reported
    /// faithfully.
    pub enum Feature: u16 {
        RUMBLE     = 0x50,
        PERIODIC   = 0x51,
        CONSTANT   = 0x52,
        SPRING     = 0x53,
        FRICTION   = 0x54,
        DAMPER     = 0x55,
        INERTIA    = 0x56,
        RAMP       = 0x57,

        SQUARE     = 0x58,
        TRIANGLE   = 0x59,
        SINE       = 0x5a,
        SAW_UP     = 0x5b,
        SAW_DOWN   = 0x5c,
        CUSTOM     = 0x5d,

        /// Device supports a global force-feedback gain.
        GAIN       = 0x60,
        /// Device supports an auto-center feature.
        AUTOCENTER = 0x61,
    }
}
impl Feature {
    pub(crate) const MAX: Self = Self(0x7f);
}
bitvalue!(Feature);

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_name() {
            Some(name) => write!(f, "FF_{name}"),
            None => write!(f, "Feature({:#x})", self.0),
        }
    }
}

/// Identifier the kernel assigns to an uploaded effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EffectId(pub(crate) i16);

impl EffectId {
    /// Returns the raw id.
    #[inline]
    pub fn raw(self) -> i16 {
        self.0
    }
}

/// A rumble waveform: the one effect shape the hub plays on vibrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rumble {
    strong_magnitude: u16,
    weak_magnitude: u16,
    duration: Duration,
}

impl Rumble {
    /// Creates a rumble effect with the given motor magnitudes and play duration.
    ///
    /// Durations above `u16::MAX` milliseconds are truncated to that maximum, which is the
    /// longest single play the kernel accepts.
    pub fn new(strong_magnitude: u16, weak_magnitude: u16, duration: Duration) -> Self {
        Self {
            strong_magnitude,
            weak_magnitude,
            duration,
        }
    }

    /// Returns the magnitude of the strong (usually left, low-frequency) motor.
    #[inline]
    pub fn strong_magnitude(&self) -> u16 {
        self.strong_magnitude
    }

    /// Returns the magnitude of the weak (usually right, high-frequency) motor.
    #[inline]
    pub fn weak_magnitude(&self) -> u16 {
        self.weak_magnitude
    }

    /// Returns the play duration.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Builds the `ff_effect` to upload, with `id` −1 so the kernel assigns a slot.
    pub(crate) fn to_raw(self) -> ff_effect {
        ff_effect {
            type_: Feature::RUMBLE.0,
            id: -1,
            direction: 0,
            trigger: ff_trigger {
                button: 0,
                interval: 0,
            },
            replay: ff_replay {
                length: self.duration.as_millis().min(u16::MAX as u128) as u16,
                delay: 0,
            },
            u: ff_effect_union {
                rumble: ff_rumble_effect {
                    strong_magnitude: self.strong_magnitude,
                    weak_magnitude: self.weak_magnitude,
                },
            },
        }
    }
}

impl Default for Rumble {
    fn default() -> Self {
        Self::new(0, 0, Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rumble_raw() {
        let raw = Rumble::new(0x8000, 0x4000, Duration::from_millis(250)).to_raw();
        assert_eq!(raw.type_, Feature::RUMBLE.0);
        assert_eq!(raw.id, -1);
        assert_eq!(raw.replay.length, 250);
        assert_eq!(unsafe { raw.u.rumble }.strong_magnitude, 0x8000);
    }

    #[test]
    fn overlong_duration_truncates() {
        let raw = Rumble::new(1, 1, Duration::from_secs(3600)).to_raw();
        assert_eq!(raw.replay.length, u16::MAX);
    }
}
