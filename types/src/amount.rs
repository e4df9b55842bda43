//! BSQ token amounts.
//!
//! Amounts are integer base-chain satoshis. BSQ has two decimal places, so
//! 1 BSQ = 100 satoshis; the conversion is only used for display.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Satoshis per displayed BSQ unit.
pub const SATOSHIS_PER_BSQ: u64 = 100;

/// A BSQ amount in satoshis.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BsqAmount(u64);

impl BsqAmount {
    pub const ZERO: Self = Self(0);

    pub fn new(satoshis: u64) -> Self {
        Self(satoshis)
    }

    /// Whole BSQ units (convenience for defaults and tests).
    pub fn from_bsq(bsq: u64) -> Self {
        Self(bsq * SATOSHIS_PER_BSQ)
    }

    pub fn satoshis(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for BsqAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for BsqAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for BsqAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for BsqAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, a| acc + a)
    }
}

impl fmt::Display for BsqAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:02} BSQ",
            self.0 / SATOSHIS_PER_BSQ,
            self.0 % SATOSHIS_PER_BSQ
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(BsqAmount::new(12_345).to_string(), "123.45 BSQ");
        assert_eq!(BsqAmount::new(7).to_string(), "0.07 BSQ");
    }

    #[test]
    fn sum_of_amounts() {
        let total: BsqAmount = [1, 2, 3].into_iter().map(BsqAmount::new).sum();
        assert_eq!(total, BsqAmount::new(6));
    }

    #[test]
    fn checked_sub_underflow() {
        assert!(BsqAmount::new(1).checked_sub(BsqAmount::new(2)).is_none());
    }
}
