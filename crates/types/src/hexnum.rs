use alloy::primitives::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt,
    ops::{Add, Deref, Sub},
    str::FromStr,
};

/// An arbitrary-precision unsigned integer that serializes as a
/// `0x`-prefixed lowercase hex string, for both SQLite storage and the
/// client-facing JSON wire protocol.
///
/// Wraps [`alloy::primitives::U256`] so every monetary field in the data
/// model (burn, tips, rewards, issuance, priority fee, ...) can exceed
/// 64 bits without truncation: a full block's worth of transactions at a
/// high base fee routinely overflows `u64`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexU256(pub U256);

impl HexU256 {
    /// The zero value.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Wrap a `U256`.
    pub const fn new(value: U256) -> Self {
        Self(value)
    }

    /// Construct from a `u64`, for literal constants (gas, block counts).
    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    /// Construct from a `u128`, for era-based reward constants.
    pub fn from_u128(value: u128) -> Self {
        Self(U256::from(value))
    }

    /// Render as a `0x`-prefixed lowercase hex string with no leading
    /// zeros beyond a single `0`.
    pub fn to_hex_string(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl Deref for HexU256 {
    type Target = U256;

    fn deref(&self) -> &U256 {
        &self.0
    }
}

impl From<U256> for HexU256 {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<HexU256> for U256 {
    fn from(value: HexU256) -> Self {
        value.0
    }
}

impl Add for HexU256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for HexU256 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for HexU256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl FromStr for HexU256 {
    type Err = alloy::primitives::ruint::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        U256::from_str(s).map(Self)
    }
}

/// Parse a possibly-empty `0x`-hex string as reported by the upstream
/// node, defaulting empty strings to zero (the original daemon treats an
/// absent `effectiveGasPrice`/`baseFeePerGas` the same way).
pub fn parse_hex_or_zero(s: &str) -> Result<HexU256, alloy::primitives::ruint::ParseError> {
    if s.is_empty() {
        Ok(HexU256::ZERO)
    } else {
        HexU256::from_str(s)
    }
}

impl Serialize for HexU256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for HexU256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_or_zero(&s).map_err(de::Error::custom)
    }
}

/// A signed arbitrary-precision integer, serialized as `0x…` when
/// non-negative and `-0x…` when negative — matching `hexutil.EncodeBig`'s
/// treatment of a signed `*big.Int` in the daemon this was distilled from.
///
/// Used for quantities derived as the difference of two monotone
/// [`HexU256`] cumulative totals (namely issuance, `rewards - burned`),
/// which is *not* itself monotone and routinely goes negative over a
/// window where burn outpaces reward. Do not use this for a field the
/// data model documents as non-negative; those stay [`HexU256`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexI256 {
    negative: bool,
    magnitude: U256,
}

impl HexI256 {
    /// The zero value.
    pub const ZERO: Self = Self { negative: false, magnitude: U256::ZERO };

    /// `lhs - rhs`, signed, for two non-negative magnitudes.
    pub fn signed_diff(lhs: U256, rhs: U256) -> Self {
        if lhs >= rhs {
            Self { negative: false, magnitude: lhs - rhs }
        } else {
            Self { negative: true, magnitude: rhs - lhs }
        }
        .normalized()
    }

    fn normalized(self) -> Self {
        if self.magnitude.is_zero() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Render as a `0x`-prefixed lowercase hex string, `-`-prefixed when
    /// negative.
    pub fn to_hex_string(self) -> String {
        if self.negative {
            format!("-{:#x}", self.magnitude)
        } else {
            format!("{:#x}", self.magnitude)
        }
    }

    /// Whether this value is strictly less than zero.
    pub const fn is_negative(self) -> bool {
        self.negative
    }

    /// The unsigned magnitude, discarding sign.
    pub const fn unsigned_abs(self) -> U256 {
        self.magnitude
    }

    /// Convert to an unsigned [`HexU256`], saturating negative values to
    /// zero. Intended only for sites where the surrounding data model
    /// documents a field as non-negative (e.g. a per-block total that is
    /// overwhelmingly positive in practice); do not use this to paper
    /// over a value the spec expects to stay signed.
    pub const fn saturating_to_unsigned(self) -> HexU256 {
        if self.negative {
            HexU256::ZERO
        } else {
            HexU256::new(self.magnitude)
        }
    }
}

impl std::ops::Neg for HexI256 {
    type Output = Self;

    fn neg(self) -> Self {
        Self { negative: !self.negative, magnitude: self.magnitude }.normalized()
    }
}

impl Add for HexI256 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.negative == rhs.negative {
            Self { negative: self.negative, magnitude: self.magnitude + rhs.magnitude }
        } else if self.magnitude >= rhs.magnitude {
            Self { negative: self.negative, magnitude: self.magnitude - rhs.magnitude }
        } else {
            Self { negative: rhs.negative, magnitude: rhs.magnitude - self.magnitude }
        }
        .normalized()
    }
}

impl Sub for HexI256 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl fmt::Display for HexI256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex_string())
    }
}

impl FromStr for HexI256 {
    type Err = alloy::primitives::ruint::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix('-') {
            U256::from_str(rest).map(|magnitude| Self { negative: true, magnitude }.normalized())
        } else {
            U256::from_str(s).map(|magnitude| Self { negative: false, magnitude }.normalized())
        }
    }
}

impl Serialize for HexI256 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex_string())
    }
}

impl<'de> Deserialize<'de> for HexI256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            Ok(Self::ZERO)
        } else {
            Self::from_str(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_hex() {
        let v = HexU256::from_u64(123_456_789);
        let s = v.to_hex_string();
        assert!(s.starts_with("0x"));
        let back: HexU256 = s.parse().unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(parse_hex_or_zero("").unwrap(), HexU256::ZERO);
    }

    #[test]
    fn serializes_as_hex_json_string() {
        let v = HexU256::from_u64(255);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"0xff\"");
    }

    #[test]
    fn signed_diff_below_zero_does_not_panic_and_renders_with_minus() {
        let d = HexI256::signed_diff(U256::from(5u64), U256::from(20u64));
        assert_eq!(d.to_hex_string(), "-0xf");
    }

    #[test]
    fn signed_diff_at_or_above_zero_has_no_minus() {
        let d = HexI256::signed_diff(U256::from(20u64), U256::from(5u64));
        assert_eq!(d.to_hex_string(), "0xf");
        assert_eq!(HexI256::signed_diff(U256::from(5u64), U256::from(5u64)), HexI256::ZERO);
    }

    #[test]
    fn hex_i256_sub_can_cross_zero_in_either_direction() {
        let positive = HexI256::signed_diff(U256::from(10u64), U256::from(0u64));
        let more_positive = HexI256::signed_diff(U256::from(30u64), U256::from(0u64));
        assert_eq!((positive - more_positive).to_hex_string(), "-0x14");
        assert_eq!((more_positive - positive).to_hex_string(), "0x14");
    }

    #[test]
    fn hex_i256_roundtrips_negative_through_hex() {
        let v = HexI256::signed_diff(U256::from(3u64), U256::from(100u64));
        let s = v.to_hex_string();
        assert_eq!(s, "-0x61");
        let back: HexI256 = s.parse().unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn hex_i256_serializes_with_minus_prefix() {
        let v = HexI256::signed_diff(U256::from(3u64), U256::from(100u64));
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"-0x61\"");
        let back: HexI256 = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
