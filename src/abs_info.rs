use std::fmt;

use crate::raw::input::input_absinfo;

/// Describes an absolute axis.
///
/// All fields are zero when `valid` is false, which is how axes a device does not report are
/// represented.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct RawAbsoluteAxisInfo {
    /// Whether the remaining fields carry real data.
    pub valid: bool,
    /// Minimum axis value.
    pub min: i32,
    /// Maximum axis value.
    pub max: i32,
    /// Center flat position; `flat == 8` means the center spans −8 to 8.
    pub flat: i32,
    /// Error tolerance; `fuzz == 4` means the value is ±4 due to noise.
    pub fuzz: i32,
    /// Resolution in units per millimeter, or units per radian for rotational axes.
    pub resolution: i32,
}

impl RawAbsoluteAxisInfo {
    /// The invalid, all-zero description used for unsupported axes.
    pub const INVALID: Self = Self {
        valid: false,
        min: 0,
        max: 0,
        flat: 0,
        fuzz: 0,
        resolution: 0,
    };
}

impl From<input_absinfo> for RawAbsoluteAxisInfo {
    fn from(raw: input_absinfo) -> Self {
        Self {
            valid: true,
            min: raw.minimum,
            max: raw.maximum,
            flat: raw.flat,
            fuzz: raw.fuzz,
            resolution: raw.resolution,
        }
    }
}

impl fmt::Debug for RawAbsoluteAxisInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return f.write_str("RawAbsoluteAxisInfo(invalid)");
        }
        f.debug_struct("RawAbsoluteAxisInfo")
            .field("min", &self.min)
            .field("max", &self.max)
            .field("flat", &self.flat)
            .field("fuzz", &self.fuzz)
            .field("resolution", &self.resolution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_is_zeroed() {
        let info = RawAbsoluteAxisInfo::INVALID;
        assert!(!info.valid);
        assert_eq!((info.min, info.max, info.flat, info.fuzz, info.resolution), (0, 0, 0, 0, 0));
        assert_eq!(info, RawAbsoluteAxisInfo::default());
    }

    #[test]
    fn from_raw_is_valid() {
        let info = RawAbsoluteAxisInfo::from(input_absinfo {
            value: 12,
            minimum: 0,
            maximum: 4095,
            fuzz: 4,
            flat: 0,
            resolution: 10,
        });
        assert!(info.valid);
        assert_eq!(info.max, 4095);
        assert_eq!(info.resolution, 10);
    }
}
