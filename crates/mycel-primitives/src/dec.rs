//! Fixed-point decimal with 18 fractional digits
//!
//! Gas prices are fractional ("0.002uoki per gas unit") while fees are whole
//! coin amounts. Every operation here is integer arithmetic so that all nodes
//! compute identical fee requirements.

use crate::error::PrimitiveError;
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits
pub const PRECISION: u32 = 18;

const SCALE: u128 = 10u128.pow(PRECISION);

/// Non-negative fixed-point decimal (value = raw / 10^18)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Dec(u128);

impl Dec {
    /// Zero
    pub const ZERO: Dec = Dec(0);

    /// One
    pub const ONE: Dec = Dec(SCALE);

    /// Build from the raw scaled representation
    pub const fn from_raw(raw: u128) -> Self {
        Dec(raw)
    }

    /// Raw scaled representation
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Build from an integer
    pub fn from_int(value: u128) -> Option<Self> {
        value.checked_mul(SCALE).map(Dec)
    }

    /// Parse a decimal string such as `"0.002"` or `"25"`.
    ///
    /// More than 18 fractional digits is an error rather than a silent rounding.
    pub fn from_str_exact(s: &str) -> Result<Self, PrimitiveError> {
        let s = s.trim();
        let invalid = || PrimitiveError::InvalidDecimal(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if frac_part.len() > PRECISION as usize {
            return Err(invalid());
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid())?
        };
        let mut frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| invalid())?
        };
        frac_value *= 10u128.pow(PRECISION - frac_part.len() as u32);

        int_value
            .checked_mul(SCALE)
            .and_then(|v| v.checked_add(frac_value))
            .map(Dec)
            .ok_or_else(invalid)
    }

    /// `self * n`, rounded up to the next whole unit. `None` on overflow.
    pub fn mul_int_ceil(&self, n: u128) -> Option<u128> {
        let product = self.0.checked_mul(n)?;
        let whole = product / SCALE;
        if product % SCALE == 0 {
            Some(whole)
        } else {
            whole.checked_add(1)
        }
    }

    /// `amount / n` as a decimal, truncated. `None` when `n == 0` or on overflow.
    pub fn quo_int(amount: u128, n: u128) -> Option<Self> {
        if n == 0 {
            return None;
        }
        amount.checked_mul(SCALE).map(|scaled| Dec(scaled / n))
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Integer part, truncated
    pub fn truncate(&self) -> u128 {
        self.0 / SCALE
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let int = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", int);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}.{}", int, digits.trim_end_matches('0'))
    }
}

impl FromStr for Dec {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dec::from_str_exact(s)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::Dec;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Dec {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_string())
        }
    }

    impl<'de> Deserialize<'de> for Dec {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Dec::from_str_exact(&s).map_err(de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fraction() {
        let d = Dec::from_str_exact("0.002").unwrap();
        assert_eq!(d.raw(), 2_000_000_000_000_000);
        assert_eq!(d.to_string(), "0.002");
    }

    #[test]
    fn test_parse_integer_and_leading_dot() {
        assert_eq!(Dec::from_str_exact("25").unwrap(), Dec::from_int(25).unwrap());
        assert_eq!(
            Dec::from_str_exact(".5").unwrap(),
            Dec::from_str_exact("0.5").unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Dec::from_str_exact("").is_err());
        assert!(Dec::from_str_exact(".").is_err());
        assert!(Dec::from_str_exact("-1").is_err());
        assert!(Dec::from_str_exact("1.2.3").is_err());
        assert!(Dec::from_str_exact("0.0000000000000000001").is_err());
    }

    #[test]
    fn test_mul_int_ceil_rounds_up() {
        let d = Dec::from_str_exact("0.0025").unwrap();
        // 0.0025 * 1001 = 2.5025 -> 3
        assert_eq!(d.mul_int_ceil(1001), Some(3));
        assert_eq!(d.mul_int_ceil(400), Some(1));
        assert_eq!(Dec::ZERO.mul_int_ceil(123), Some(0));
    }

    #[test]
    fn test_mul_int_ceil_overflow() {
        let d = Dec::from_raw(u128::MAX / 2);
        assert_eq!(d.mul_int_ceil(3), None);
    }

    #[test]
    fn test_quo_int() {
        let price = Dec::quo_int(1000, 500_000).unwrap();
        assert_eq!(price, Dec::from_str_exact("0.002").unwrap());
        assert_eq!(Dec::quo_int(1, 0), None);
    }
}
