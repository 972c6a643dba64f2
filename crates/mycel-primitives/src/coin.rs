//! Coin amounts and gas prices

use crate::dec::Dec;
use crate::error::PrimitiveError;
use std::fmt;
use std::str::FromStr;

/// Validate a denomination: a letter followed by 2..=127 of `[a-zA-Z0-9/:._-]`
pub fn validate_denom(denom: &str) -> Result<(), PrimitiveError> {
    let bytes = denom.as_bytes();
    let ok = (3..=128).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[1..]
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'/' | b':' | b'.' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(PrimitiveError::InvalidCoin(format!("invalid denom: {}", denom)))
    }
}

/// Split `"1000uoki"` into `("1000", "uoki")`
fn split_amount_denom(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(|c: char| c.is_ascii_alphabetic())?;
    if idx == 0 {
        return None;
    }
    Some((&s[..idx], &s[idx..]))
}

/// A whole amount of one denomination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coin {
    /// Denomination
    pub denom: String,
    /// Amount
    pub amount: u128,
}

impl Coin {
    /// Create a new coin
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (amount, denom) =
            split_amount_denom(s).ok_or_else(|| PrimitiveError::InvalidCoin(s.to_string()))?;
        validate_denom(denom)?;
        let amount = amount
            .parse()
            .map_err(|_| PrimitiveError::InvalidCoin(s.to_string()))?;
        Ok(Coin::new(denom, amount))
    }
}

/// A set of coins, kept sorted by denomination
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from coins as given. Use [`Coins::validate`] to check the invariants.
    pub fn from_vec(coins: Vec<Coin>) -> Self {
        Self(coins)
    }

    /// Single-coin set
    pub fn one(denom: impl Into<String>, amount: u128) -> Self {
        Self(vec![Coin::new(denom, amount)])
    }

    /// Sorted, de-duplicated, strictly positive and well-named
    pub fn validate(&self) -> Result<(), PrimitiveError> {
        for (i, coin) in self.0.iter().enumerate() {
            validate_denom(&coin.denom)?;
            if coin.amount == 0 {
                return Err(PrimitiveError::InvalidCoin(format!("zero amount: {}", coin)));
            }
            if i > 0 && self.0[i - 1].denom >= coin.denom {
                return Err(PrimitiveError::InvalidCoin(
                    "coins must be sorted and unique".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Amount held in `denom`
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }

    /// No coins, or only zero amounts
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|c| c.amount == 0)
    }

    /// Number of denominations
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over coins
    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl FromStr for Coins {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Coins::new());
        }
        let mut coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        let coins = Coins(coins);
        coins.validate()?;
        Ok(coins)
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A fractional amount of one denomination, used for gas prices
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecCoin {
    /// Denomination
    pub denom: String,
    /// Amount per gas unit
    pub amount: Dec,
}

impl DecCoin {
    /// Create a new decimal coin
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for DecCoin {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (amount, denom) =
            split_amount_denom(s).ok_or_else(|| PrimitiveError::InvalidCoin(s.to_string()))?;
        validate_denom(denom)?;
        Ok(DecCoin::new(denom, Dec::from_str_exact(amount)?))
    }
}
