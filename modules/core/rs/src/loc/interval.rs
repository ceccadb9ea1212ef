use std::fmt::Display;
use std::rc::Rc;
use std::sync::Arc;

use crate::num::PrimInt;
#[cfg(feature = "bitcode")]
use bitcode::{Decode, Encode};
use derive_getters::Dissolve;
use eyre::{eyre, Result};
use impl_tools::autoimpl;

/// Interval is a half-open genomic region [start, end).
/// Empty intervals (start == end) and intervals with negative length are rejected at construction.
#[cfg_attr(feature = "bitcode", derive(Encode, Decode))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Dissolve)]
pub struct Interval<Idx: PrimInt> {
    start: Idx,
    end: Idx,
}

/// Trait for types that can be generally viewed as half-open genomic intervals [start, end).
#[autoimpl(for <T: trait + ?Sized> &T, Box<T>, Rc<T>, Arc<T>)]
#[allow(clippy::len_without_is_empty)]
pub trait IntervalOp {
    type Idx: PrimInt;

    /// Start position of the interval-like object.
    fn start(&self) -> Self::Idx;

    /// End position of the interval-like object.
    fn end(&self) -> Self::Idx;

    /// Length of the interval-like object.
    fn len(&self) -> Self::Idx {
        self.end() - self.start()
    }

    /// Check if the interval-like object contains a given position.
    fn contains(&self, pos: Self::Idx) -> bool {
        self.start() <= pos && pos < self.end()
    }

    /// Check if the interval-like object intersects with another interval-like object.
    /// The condition is strict and doesn't allow touching intervals.
    fn intersects(&self, other: &Self) -> bool {
        self.start() < other.end() && other.start() < self.end()
    }

    /// Check if the interval-like object touches another interval-like object.
    /// The condition is strict and should not allow overlapping intervals.
    fn touches(&self, other: &Self) -> bool {
        self.start() == other.end() || self.end() == other.start()
    }

    /// Distance between two non-overlapping interval-like objects, zero if they intersect or touch.
    fn gap(&self, other: &Self) -> Self::Idx {
        if self.end() <= other.start() {
            other.start() - self.end()
        } else if other.end() <= self.start() {
            self.start() - other.end()
        } else {
            <Self::Idx as ::num::Zero>::zero()
        }
    }
}

impl<T: PrimInt> IntervalOp for Interval<T> {
    type Idx = T;

    #[inline(always)]
    fn start(&self) -> Self::Idx {
        self.start
    }
    #[inline(always)]
    fn end(&self) -> Self::Idx {
        self.end
    }
}

impl<Idx: PrimInt> Interval<Idx> {
    pub fn new(start: Idx, end: Idx) -> Result<Self> {
        if start < end {
            Ok(Self { start, end })
        } else {
            Err(eyre!("Invalid interval: start >= end"))
        }
    }

    /// Smallest interval covering both intervals, regardless of the distance between them.
    pub fn envelope(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl<Idx: PrimInt + Display> Display for Interval<Idx> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl<Idx: PrimInt> From<Interval<Idx>> for (Idx, Idx) {
    fn from(interval: Interval<Idx>) -> Self {
        (interval.start, interval.end)
    }
}

impl<Idx: PrimInt> PartialEq<(Idx, Idx)> for Interval<Idx> {
    fn eq(&self, other: &(Idx, Idx)) -> bool {
        self.start == other.0 && self.end == other.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construct() {
        assert_eq!(
            Interval::new(0, 10).unwrap(),
            Interval { start: 0, end: 10 }
        );
        assert!(Interval::new(1, 0).is_err());
        assert!(Interval::new(0, 0).is_err());
        assert_eq!(Interval::new(0, 200).unwrap(), (0, 200));
    }

    #[test]
    fn test_len() {
        assert_eq!(Interval::new(0, 10).unwrap().len(), 10);
        assert_eq!(Interval::new(0, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_contains() {
        let interval = Interval::new(1, 10).unwrap();
        assert!(!interval.contains(0));
        assert!(interval.contains(1));
        assert!(interval.contains(9));
        assert!(!interval.contains(10));
    }

    #[test]
    fn test_intersects_and_touches() {
        let interval = Interval::new(1, 10).unwrap();
        assert!(!interval.intersects(&Interval::new(0, 1).unwrap()));
        assert!(interval.intersects(&Interval::new(0, 2).unwrap()));
        assert!(interval.intersects(&Interval::new(9, 10).unwrap()));
        assert!(!interval.intersects(&Interval::new(10, 11).unwrap()));

        assert!(interval.touches(&Interval::new(0, 1).unwrap()));
        assert!(!interval.touches(&Interval::new(5, 9).unwrap()));
        assert!(interval.touches(&Interval::new(10, 11).unwrap()));
    }

    #[test]
    fn test_gap() {
        let interval = Interval::new(10, 20).unwrap();
        assert_eq!(interval.gap(&Interval::new(25, 30).unwrap()), 5);
        assert_eq!(interval.gap(&Interval::new(0, 4).unwrap()), 6);
        assert_eq!(interval.gap(&Interval::new(20, 30).unwrap()), 0);
        assert_eq!(interval.gap(&Interval::new(15, 30).unwrap()), 0);
    }

    #[test]
    fn test_envelope() {
        let interval = Interval::new(1, 10).unwrap();
        assert_eq!(
            interval.envelope(&Interval::new(11, 12).unwrap()),
            Interval { start: 1, end: 12 }
        );
        assert_eq!(interval.envelope(&Interval::new(2, 5).unwrap()), interval);
    }
}
