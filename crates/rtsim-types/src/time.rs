//! # rtsim-types::time
//!
//! Defines `Tick`, the fundamental unit of virtual time in the kernel.
//! All simulation time is a discrete, totally-ordered quantity; there is no
//! wall-clock relationship implied anywhere in this module.

use std::fmt;
use std::ops::{Add, Div, Mul, Rem, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A monotonically non-decreasing instant or duration of virtual time.
///
/// Backed by `i64` rather than `u64` so that intermediate arithmetic in
/// delay distributions (subtracting a mean, applying jitter) can transiently
/// go negative before a caller clamps it, without wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tick(pub i64);

/// The sentinel meaning "never" for events with no scheduled time.
pub const TICK_INFTY: Tick = Tick(i64::MAX);

/// The start of simulated time. Every `Simulation` begins here.
pub const TICK_ZERO: Tick = Tick(0);

impl Tick {
    pub const fn new(v: i64) -> Self {
        Tick(v)
    }

    pub const fn is_infty(self) -> bool {
        self.0 == TICK_INFTY.0
    }

    pub fn saturating_add(self, rhs: Tick) -> Tick {
        Tick(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Tick) -> Tick {
        Tick(self.0.saturating_sub(rhs.0))
    }
}

/// Truncates toward zero, per the data model's construction rule.
impl From<f64> for Tick {
    fn from(v: f64) -> Self {
        Tick(v.trunc() as i64)
    }
}

impl From<i64> for Tick {
    fn from(v: i64) -> Self {
        Tick(v)
    }
}

impl FromStr for Tick {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Tick)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Tick {
    type Output = Tick;
    fn add(self, rhs: Tick) -> Tick {
        Tick(self.0 + rhs.0)
    }
}

impl Sub for Tick {
    type Output = Tick;
    fn sub(self, rhs: Tick) -> Tick {
        Tick(self.0 - rhs.0)
    }
}

impl Mul<i64> for Tick {
    type Output = Tick;
    fn mul(self, rhs: i64) -> Tick {
        Tick(self.0 * rhs)
    }
}

impl Div<i64> for Tick {
    type Output = Tick;
    fn div(self, rhs: i64) -> Tick {
        Tick(self.0 / rhs)
    }
}

impl Rem<i64> for Tick {
    type Output = Tick;
    fn rem(self, rhs: i64) -> Tick {
        Tick(self.0 % rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("42".parse::<Tick>().unwrap(), Tick(42));
        assert_eq!("  -7 ".parse::<Tick>().unwrap(), Tick(-7));
        assert!("abc".parse::<Tick>().is_err());
    }

    #[test]
    fn float_truncates_toward_zero() {
        assert_eq!(Tick::from(3.9), Tick(3));
        assert_eq!(Tick::from(-3.9), Tick(-3));
    }

    #[test]
    fn arithmetic_and_ordering() {
        let a = Tick(10);
        let b = Tick(3);
        assert_eq!(a + b, Tick(13));
        assert_eq!(a - b, Tick(7));
        assert_eq!(a * 2, Tick(20));
        assert_eq!(a / 2, Tick(5));
        assert_eq!(a % 3, Tick(1));
        assert!(b < a);
    }
}
