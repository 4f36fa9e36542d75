//! Credit counts exchanged between a consumer and the bridge.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A number of items a consumer is willing to receive.
///
/// Either a bounded count or [`Demand::Unlimited`]. Arithmetic saturates:
/// unlimited absorbs every addition and subtraction, bounded subtraction
/// stops at zero and bounded addition that would overflow becomes unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Demand {
    /// At most this many items.
    Max(usize),
    /// No limit; the producer never has to buffer.
    Unlimited,
}

impl Demand {
    /// Zero credit.
    pub const NONE: Demand = Demand::Max(0);

    /// Creates a bounded demand.
    #[inline]
    pub const fn max(n: usize) -> Self {
        Demand::Max(n)
    }

    /// Returns `true` for [`Demand::Unlimited`].
    #[inline]
    pub const fn is_unlimited(self) -> bool {
        matches!(self, Demand::Unlimited)
    }

    /// Returns `true` for a bounded demand of zero.
    #[inline]
    pub const fn is_none(self) -> bool {
        matches!(self, Demand::Max(0))
    }
}

impl Default for Demand {
    fn default() -> Self {
        Demand::NONE
    }
}

impl From<usize> for Demand {
    fn from(n: usize) -> Self {
        Demand::Max(n)
    }
}

impl fmt::Display for Demand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Demand::Max(n) => write!(f, "max({n})"),
            Demand::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl Add for Demand {
    type Output = Demand;

    fn add(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Max(a), Demand::Max(b)) => a.checked_add(b).map_or(Demand::Unlimited, Demand::Max),
            _ => Demand::Unlimited,
        }
    }
}

impl Add<usize> for Demand {
    type Output = Demand;

    fn add(self, rhs: usize) -> Demand {
        self + Demand::Max(rhs)
    }
}

impl AddAssign for Demand {
    fn add_assign(&mut self, rhs: Demand) {
        *self = *self + rhs;
    }
}

impl AddAssign<usize> for Demand {
    fn add_assign(&mut self, rhs: usize) {
        *self = *self + rhs;
    }
}

impl Sub for Demand {
    type Output = Demand;

    fn sub(self, rhs: Demand) -> Demand {
        match (self, rhs) {
            (Demand::Unlimited, _) => Demand::Unlimited,
            (Demand::Max(_), Demand::Unlimited) => Demand::NONE,
            (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_sub(b)),
        }
    }
}

impl SubAssign for Demand {
    fn sub_assign(&mut self, rhs: Demand) {
        *self = *self - rhs;
    }
}

impl PartialOrd for Demand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Demand {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Demand::Unlimited, Demand::Unlimited) => Ordering::Equal,
            (Demand::Unlimited, Demand::Max(_)) => Ordering::Greater,
            (Demand::Max(_), Demand::Unlimited) => Ordering::Less,
            (Demand::Max(a), Demand::Max(b)) => a.cmp(b),
        }
    }
}

impl PartialEq<usize> for Demand {
    fn eq(&self, other: &usize) -> bool {
        *self == Demand::Max(*other)
    }
}

impl PartialOrd<usize> for Demand {
    fn partial_cmp(&self, other: &usize) -> Option<Ordering> {
        Some(self.cmp(&Demand::Max(*other)))
    }
}
