//! Fixed-point amounts with 8 fractional digits
//!
//! All financial values in the vault are `UFix64`: an unsigned 64-bit integer
//! counting 1e-8 units. Multiplications truncate, divisions round down, and
//! nothing panics; overflow surfaces as `None` or [`PrizeVaultError::Overflow`].

use crate::error::PrizeVaultError;
use crate::types::Weight;
use core::fmt;
use core::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Number of fractional decimal digits
pub const DECIMALS: u32 = 8;

/// Raw units per 1.0
pub const SCALE: u64 = 100_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UFix64(u64);

impl UFix64 {
    pub const ZERO: UFix64 = UFix64(0);
    pub const ONE: UFix64 = UFix64(SCALE);
    pub const MAX: UFix64 = UFix64(u64::MAX);
    /// Smallest representable step (1e-8)
    pub const EPSILON: UFix64 = UFix64(1);

    pub const fn from_raw(raw: u64) -> Self {
        UFix64(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whole units, saturating at `MAX`
    pub const fn from_int(units: u64) -> Self {
        UFix64(units.saturating_mul(SCALE))
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: UFix64) -> Option<UFix64> {
        self.0.checked_add(rhs.0).map(UFix64)
    }

    pub fn checked_sub(self, rhs: UFix64) -> Option<UFix64> {
        self.0.checked_sub(rhs.0).map(UFix64)
    }

    pub fn saturating_add(self, rhs: UFix64) -> UFix64 {
        UFix64(self.0.saturating_add(rhs.0))
    }

    /// Subtract, clamping at zero
    pub fn saturating_sub(self, rhs: UFix64) -> UFix64 {
        UFix64(self.0.saturating_sub(rhs.0))
    }

    pub fn try_add(self, rhs: UFix64) -> Result<UFix64, PrizeVaultError> {
        self.checked_add(rhs).ok_or(PrizeVaultError::Overflow)
    }

    pub fn try_sub(self, rhs: UFix64) -> Result<UFix64, PrizeVaultError> {
        self.checked_sub(rhs).ok_or(PrizeVaultError::Overflow)
    }

    /// `self * rhs`, truncated
    pub fn mul(self, rhs: UFix64) -> Option<UFix64> {
        let wide = (self.0 as u128) * (rhs.0 as u128) / (SCALE as u128);
        u64::try_from(wide).ok().map(UFix64)
    }

    /// `self / rhs`, rounded down; `None` when `rhs` is zero
    pub fn div(self, rhs: UFix64) -> Option<UFix64> {
        if rhs.0 == 0 {
            return None;
        }
        let wide = (self.0 as u128) * (SCALE as u128) / (rhs.0 as u128);
        u64::try_from(wide).ok().map(UFix64)
    }

    /// `self * num / den` computed in 128 bits, rounded down
    ///
    /// This is the conversion used for shares and assets: scaling by a ratio
    /// without going through an intermediate (lossy) price.
    pub fn mul_div(self, num: UFix64, den: UFix64) -> Option<UFix64> {
        if den.0 == 0 {
            return None;
        }
        let wide = (self.0 as u128) * (num.0 as u128) / (den.0 as u128);
        u64::try_from(wide).ok().map(UFix64)
    }

    /// `self * num / den`, rounded up
    pub fn mul_div_ceil(self, num: UFix64, den: UFix64) -> Option<UFix64> {
        if den.0 == 0 {
            return None;
        }
        let product = (self.0 as u128) * (num.0 as u128);
        let den = den.0 as u128;
        let wide = product / den + u128::from(product % den != 0);
        u64::try_from(wide).ok().map(UFix64)
    }

    /// Balance-seconds for TWAB accumulation
    pub fn to_weight(self, seconds: u64) -> Weight {
        (self.0 as Weight).saturating_mul(seconds as Weight)
    }

    /// Sum a sequence of amounts, `None` on overflow
    pub fn checked_sum<I: IntoIterator<Item = UFix64>>(iter: I) -> Option<UFix64> {
        iter.into_iter()
            .try_fold(UFix64::ZERO, |acc, v| acc.checked_add(v))
    }
}

impl fmt::Display for UFix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:08}", self.0 / SCALE, self.0 % SCALE)
    }
}

impl FromStr for UFix64 {
    type Err = PrizeVaultError;

    /// Parses `"12"`, `"12.5"` or `"0.00000001"`; signs, exponents and more
    /// than 8 fractional digits are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PrizeVaultError::InvalidAmount(format!("cannot parse {:?}", s));
        let s = s.trim();
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
            || frac_part.len() > DECIMALS as usize
        {
            return Err(invalid());
        }

        let int: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut frac: u64 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        for _ in frac_part.len()..DECIMALS as usize {
            frac *= 10;
        }

        int.checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(UFix64)
            .ok_or(PrizeVaultError::Overflow)
    }
}

impl Serialize for UFix64 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct UFix64Visitor;

impl<'de> de::Visitor<'de> for UFix64Visitor {
    type Value = UFix64;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal string with at most 8 fractional digits, or a whole number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<UFix64, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<UFix64, E> {
        v.checked_mul(SCALE)
            .map(UFix64)
            .ok_or_else(|| E::custom("amount overflows UFix64"))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<UFix64, E> {
        let v = u64::try_from(v).map_err(|_| E::custom("amount must not be negative"))?;
        self.visit_u64(v)
    }
}

impl<'de> Deserialize<'de> for UFix64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UFix64Visitor)
    }
}
