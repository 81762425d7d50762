use std::fmt::Display;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A fixed-point quantity: an integer number of `prefix` units.
///
/// Values written into netlists go through this type so that swept biases
/// such as `-1.4` are emitted exactly (`-1400000u`) rather than as the nearest
/// binary float.
///
/// Equality compares the quantity, not its representation: `SiValue::zero()`
/// equals `SiValue::volts(0.0)`, and `500m` equals `500000u`.
#[derive(Copy, Clone, Default, Debug, Serialize, Deserialize)]
pub struct SiValue {
    value: i64,
    prefix: SiPrefix,
}

impl SiValue {
    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn new(value: i64, prefix: SiPrefix) -> Self {
        Self { value, prefix }
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn prefix(&self) -> SiPrefix {
        self.prefix
    }

    /// Rounds `value` to a whole number of `precision` units.
    ///
    /// `with_precision(0.35, SiPrefix::Milli)` is `350m`.
    pub fn with_precision(value: f64, precision: SiPrefix) -> Self {
        let value = (value / precision.multiplier()).round() as i64;
        Self {
            value,
            prefix: precision,
        }
    }

    /// A voltage, rounded to the nearest microvolt.
    #[inline]
    pub fn volts(value: f64) -> Self {
        Self::with_precision(value, SiPrefix::Micro)
    }

    /// A time, rounded to the nearest femtosecond.
    #[inline]
    pub fn seconds(value: f64) -> Self {
        Self::with_precision(value, SiPrefix::Femto)
    }

    /// A capacitance, rounded to the nearest yoctofarad.
    #[inline]
    pub fn farads(value: f64) -> Self {
        Self::with_precision(value, SiPrefix::Yocto)
    }

    /// A resistance, rounded to the nearest milliohm.
    #[inline]
    pub fn ohms(value: f64) -> Self {
        Self::with_precision(value, SiPrefix::Milli)
    }

    #[inline]
    pub fn to_f64(self) -> f64 {
        self.into()
    }
}

impl SiValue {
    /// Mantissa and power of ten, with trailing decimal zeros moved into the power.
    fn normalized(&self) -> (i64, i32) {
        if self.value == 0 {
            return (0, 0);
        }
        let (mut mantissa, mut exponent) = (self.value, self.prefix.exponent());
        while mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }
        (mantissa, exponent)
    }
}

impl PartialEq for SiValue {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for SiValue {}

impl Hash for SiValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl From<SiValue> for f64 {
    #[inline]
    fn from(value: SiValue) -> Self {
        value.value as f64 * value.prefix.multiplier()
    }
}

#[derive(
    Copy, Clone, Default, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum SiPrefix {
    Yocto,
    Zepto,
    Atto,
    Femto,
    Pico,
    Nano,
    Micro,
    Milli,
    #[default]
    None,
    Kilo,
    Mega,
    Giga,
    Tera,
    Peta,
    Exa,
    Zetta,
    Yotta,
}

impl SiPrefix {
    pub fn multiplier(&self) -> f64 {
        match self {
            SiPrefix::Yocto => 1e-24,
            SiPrefix::Zepto => 1e-21,
            SiPrefix::Atto => 1e-18,
            SiPrefix::Femto => 1e-15,
            SiPrefix::Pico => 1e-12,
            SiPrefix::Nano => 1e-9,
            SiPrefix::Micro => 1e-6,
            SiPrefix::Milli => 1e-3,
            SiPrefix::None => 1e0,
            SiPrefix::Kilo => 1e3,
            SiPrefix::Mega => 1e6,
            SiPrefix::Giga => 1e9,
            SiPrefix::Tera => 1e12,
            SiPrefix::Peta => 1e15,
            SiPrefix::Exa => 1e18,
            SiPrefix::Zetta => 1e21,
            SiPrefix::Yotta => 1e24,
        }
    }

    /// The power of ten this prefix stands for.
    pub fn exponent(&self) -> i32 {
        (*self as i32 - SiPrefix::None as i32) * 3
    }

    /// The scale-factor suffix understood by SPICE engines, if there is one.
    ///
    /// SPICE suffixes are case-insensitive, so mega is spelled `meg`.
    pub fn spice_suffix(&self) -> Option<&'static str> {
        match self {
            Self::Femto => Some("f"),
            Self::Pico => Some("p"),
            Self::Nano => Some("n"),
            Self::Micro => Some("u"),
            Self::Milli => Some("m"),
            Self::None => Some(""),
            Self::Kilo => Some("k"),
            Self::Mega => Some("meg"),
            Self::Giga => Some("g"),
            Self::Tera => Some("t"),
            _ => None,
        }
    }
}

impl Display for SiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.prefix.spice_suffix() {
            Some(suffix) => write!(f, "{}{}", self.value, suffix),
            None => write!(f, "{}e{}", self.value, self.prefix.exponent()),
        }
    }
}

impl Display for SiPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.spice_suffix() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "e{}", self.exponent()),
        }
    }
}

#[cfg(test)]
mod tests {
    use float_eq::float_eq;

    use super::*;

    #[test]
    fn swept_bias_is_exact() {
        let v = SiValue::volts(-1.4);
        assert_eq!(v, SiValue::new(-1_400_000, SiPrefix::Micro));
        assert_eq!(v.to_string(), "-1400000u");
        assert!(float_eq!(v.to_f64(), -1.4, abs <= 1e-12));
    }

    #[test]
    fn prefixes_without_suffix_use_exponent() {
        assert_eq!(SiValue::farads(1e-24).to_string(), "1e-24");
        assert_eq!(SiValue::new(3, SiPrefix::Atto).to_string(), "3e-18");
        assert_eq!(SiValue::new(2, SiPrefix::Peta).to_string(), "2e15");
    }

    #[test]
    fn equality_ignores_representation() {
        assert_eq!(SiValue::zero(), SiValue::volts(0.0));
        assert_eq!(SiValue::zero(), SiValue::farads(0.0));
        assert_eq!(SiValue::volts(0.5), SiValue::new(500, SiPrefix::Milli));
        assert_eq!(SiValue::new(1, SiPrefix::Kilo), SiValue::new(1000, SiPrefix::None));
        assert_ne!(SiValue::volts(0.5), SiValue::volts(0.6));
        assert_ne!(SiValue::volts(-0.5), SiValue::volts(0.5));

        let seen: std::collections::HashSet<SiValue> =
            [SiValue::volts(0.2), SiValue::new(200, SiPrefix::Milli), SiValue::zero()]
                .into_iter()
                .collect();
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&SiValue::volts(0.0)));
    }

    #[test]
    fn exponents() {
        assert_eq!(SiPrefix::Yocto.exponent(), -24);
        assert_eq!(SiPrefix::None.exponent(), 0);
        assert_eq!(SiPrefix::Kilo.exponent(), 3);
        assert_eq!(SiPrefix::Yotta.exponent(), 24);
    }

    #[test]
    fn times_round_to_femtoseconds() {
        let t = SiValue::seconds(0.1e-9);
        assert_eq!(t, SiValue::new(100_000, SiPrefix::Femto));
        assert_eq!(t.to_string(), "100000f");
    }
}
