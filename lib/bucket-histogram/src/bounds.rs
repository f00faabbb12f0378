//! Bucket bound sequences.

use snafu::ensure;
use tracing::debug;

use crate::error::{BoundsViolation, HistogramError, InvalidBounds, InvalidGrowthFactor};

/// A validated sequence of bucket upper bounds.
///
/// Bounds are owned, non-empty, strictly positive, and strictly increasing. Bucket `i` covers the half-open interval
/// `(bounds[i - 1], bounds[i]]`, with the lower edge of the first bucket conceptually zero.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BucketBounds {
    bounds: Box<[i64]>,
}

impl BucketBounds {
    /// Creates a new `BucketBounds` from the given upper bounds.
    ///
    /// The bounds are copied into owned storage before being validated.
    ///
    /// ## Errors
    ///
    /// If the bounds are empty, contain a bound that is not greater than zero, or contain a bound that is not greater
    /// than the bound before it, an error is returned.
    pub fn new(bounds: &[i64]) -> Result<Self, HistogramError> {
        Self::from_boxed(bounds.into())
    }

    fn from_boxed(bounds: Box<[i64]>) -> Result<Self, HistogramError> {
        if let Err(violation) = validate(&bounds) {
            debug!(%violation, buckets = bounds.len(), "Rejected histogram bucket bounds.");
            return InvalidBounds { violation }.fail();
        }

        Ok(Self { bounds })
    }

    /// Creates `count` evenly spaced bounds: `start`, `start + width`, `start + 2 * width`, and so on.
    ///
    /// ## Errors
    ///
    /// If `count` is zero, `start` is not greater than zero, `width` is not greater than zero, or the generated bounds
    /// would overflow `i64`, an error is returned.
    pub fn linear(start: i64, width: i64, count: usize) -> Result<Self, HistogramError> {
        let mut bounds = Vec::with_capacity(count);
        let mut next = start;
        for index in 0..count {
            if index > 0 {
                next = match next.checked_add(width) {
                    Some(next) => next,
                    None => {
                        return InvalidBounds {
                            violation: BoundsViolation::Overflow { index },
                        }
                        .fail()
                    }
                };
            }
            bounds.push(next);
        }

        Self::from_boxed(bounds.into_boxed_slice())
    }

    /// Creates `count` exponentially spaced bounds, where bound `i` is `ceil(start * factor^i)`.
    ///
    /// Whenever rounding would produce a bound that does not exceed the bound before it, the bound is raised to one
    /// more than the previous bound, so small starting values with small factors still yield strictly increasing
    /// bounds.
    ///
    /// ## Errors
    ///
    /// If `factor` is not a finite number greater than 1.0, an error is returned. If `count` is zero, `start` is not
    /// greater than zero, or the generated bounds would overflow `i64`, an error is returned.
    pub fn exponential(start: i64, factor: f64, count: usize) -> Result<Self, HistogramError> {
        ensure!(factor.is_finite() && factor > 1.0, InvalidGrowthFactor { factor });

        let mut bounds: Vec<i64> = Vec::with_capacity(count);
        let mut scaled = start as f64;
        for index in 0..count {
            let rounded = scaled.ceil();
            // `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
            if rounded >= i64::MAX as f64 {
                return InvalidBounds {
                    violation: BoundsViolation::Overflow { index },
                }
                .fail();
            }

            #[allow(clippy::cast_possible_truncation)]
            let mut next = rounded as i64;
            if let Some(previous) = bounds.last().copied() {
                if next <= previous {
                    next = match previous.checked_add(1) {
                        Some(next) => next,
                        None => {
                            return InvalidBounds {
                                violation: BoundsViolation::Overflow { index },
                            }
                            .fail()
                        }
                    };
                }
            }

            bounds.push(next);
            scaled *= factor;
        }

        Self::from_boxed(bounds.into_boxed_slice())
    }

    /// Returns the number of buckets these bounds define.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    /// Returns the upper bound at the given index, if it exists.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.bounds.get(index).copied()
    }

    /// Returns the bounds as a slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.bounds
    }

    /// Returns the largest bound.
    pub fn last(&self) -> i64 {
        // Bounds are never empty once validated.
        self.bounds[self.bounds.len() - 1]
    }

    /// Finds the index of the bucket that the given value falls into.
    ///
    /// This is a lower-bound search for the smallest index `i` such that `bounds[i] >= value`. Values at or below zero
    /// fall into the first bucket. If the value exceeds every bound, `None` is returned.
    #[inline]
    pub fn bucket_index(&self, value: i64) -> Option<usize> {
        let mut low = 0;
        let mut high = self.bounds.len() - 1;
        while low < high {
            let mid = low + (high - low) / 2;
            if self.bounds[mid] < value {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        if value <= self.bounds[high] {
            Some(high)
        } else {
            None
        }
    }
}

impl AsRef<[i64]> for BucketBounds {
    fn as_ref(&self) -> &[i64] {
        &self.bounds
    }
}

impl TryFrom<Vec<i64>> for BucketBounds {
    type Error = HistogramError;

    fn try_from(bounds: Vec<i64>) -> Result<Self, Self::Error> {
        Self::from_boxed(bounds.into_boxed_slice())
    }
}

fn validate(bounds: &[i64]) -> Result<(), BoundsViolation> {
    if bounds.is_empty() {
        return Err(BoundsViolation::Empty);
    }

    let mut previous = None;
    for (index, bound) in bounds.iter().copied().enumerate() {
        if bound <= 0 {
            return Err(BoundsViolation::NotPositive { index, bound });
        }

        if let Some(previous) = previous {
            if bound <= previous {
                return Err(BoundsViolation::NotIncreasing {
                    index,
                    previous,
                    bound,
                });
            }
        }

        previous = Some(bound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn violation(result: Result<BucketBounds, HistogramError>) -> BoundsViolation {
        match result {
            Err(HistogramError::InvalidBounds { violation }) => violation,
            other => panic!("expected invalid bounds, got {:?}", other),
        }
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert_eq!(violation(BucketBounds::new(&[])), BoundsViolation::Empty);
        assert_eq!(
            violation(BucketBounds::new(&[-1, 5])),
            BoundsViolation::NotPositive { index: 0, bound: -1 }
        );
        assert_eq!(
            violation(BucketBounds::new(&[0, 5])),
            BoundsViolation::NotPositive { index: 0, bound: 0 }
        );
        assert_eq!(
            violation(BucketBounds::new(&[5, 5])),
            BoundsViolation::NotIncreasing {
                index: 1,
                previous: 5,
                bound: 5
            }
        );
        assert_eq!(
            violation(BucketBounds::new(&[1, 10, 5])),
            BoundsViolation::NotIncreasing {
                index: 2,
                previous: 10,
                bound: 5
            }
        );
    }

    #[test]
    fn accepts_valid_bounds() {
        let bounds = BucketBounds::new(&[1, 5, 10]).unwrap();
        assert_eq!(bounds.len(), 3);
        assert_eq!(bounds.as_slice(), &[1, 5, 10]);
        assert_eq!(bounds.get(1), Some(5));
        assert_eq!(bounds.get(3), None);
        assert_eq!(bounds.last(), 10);
    }

    #[test]
    fn bounds_are_copied() {
        let mut raw = vec![1, 5, 10];
        let bounds = BucketBounds::new(&raw).unwrap();
        raw[0] = 100;
        assert_eq!(bounds.as_slice(), &[1, 5, 10]);
    }

    #[test]
    fn bucket_index() {
        let bounds = BucketBounds::new(&[1, 5, 10]).unwrap();
        assert_eq!(bounds.bucket_index(i64::MIN), Some(0));
        assert_eq!(bounds.bucket_index(0), Some(0));
        assert_eq!(bounds.bucket_index(1), Some(0));
        assert_eq!(bounds.bucket_index(2), Some(1));
        assert_eq!(bounds.bucket_index(5), Some(1));
        assert_eq!(bounds.bucket_index(6), Some(2));
        assert_eq!(bounds.bucket_index(10), Some(2));
        assert_eq!(bounds.bucket_index(11), None);
        assert_eq!(bounds.bucket_index(i64::MAX), None);

        let single = BucketBounds::new(&[7]).unwrap();
        assert_eq!(single.bucket_index(7), Some(0));
        assert_eq!(single.bucket_index(8), None);
    }

    #[test]
    fn linear() {
        let bounds = BucketBounds::linear(10, 10, 4).unwrap();
        assert_eq!(bounds.as_slice(), &[10, 20, 30, 40]);

        assert_eq!(violation(BucketBounds::linear(10, 10, 0)), BoundsViolation::Empty);
        assert_eq!(
            violation(BucketBounds::linear(0, 10, 2)),
            BoundsViolation::NotPositive { index: 0, bound: 0 }
        );
        assert_eq!(
            violation(BucketBounds::linear(10, 0, 2)),
            BoundsViolation::NotIncreasing {
                index: 1,
                previous: 10,
                bound: 10
            }
        );
        assert_eq!(
            violation(BucketBounds::linear(i64::MAX - 1, 2, 2)),
            BoundsViolation::Overflow { index: 1 }
        );
    }

    #[test]
    fn exponential() {
        let bounds = BucketBounds::exponential(1, 2.0, 5).unwrap();
        assert_eq!(bounds.as_slice(), &[1, 2, 4, 8, 16]);

        // 1, 1.1, 1.21, 1.331 all round up to 2, so later bounds are bumped.
        let bounds = BucketBounds::exponential(1, 1.1, 4).unwrap();
        assert_eq!(bounds.as_slice(), &[1, 2, 3, 4]);

        assert!(matches!(
            BucketBounds::exponential(1, 1.0, 4),
            Err(HistogramError::InvalidGrowthFactor { .. })
        ));
        assert!(matches!(
            BucketBounds::exponential(1, f64::NAN, 4),
            Err(HistogramError::InvalidGrowthFactor { .. })
        ));
        assert!(matches!(
            BucketBounds::exponential(1, f64::INFINITY, 4),
            Err(HistogramError::InvalidGrowthFactor { .. })
        ));
        assert_eq!(violation(BucketBounds::exponential(1, 2.0, 0)), BoundsViolation::Empty);
        assert_eq!(
            violation(BucketBounds::exponential(1, 2.0, 64)),
            BoundsViolation::Overflow { index: 63 }
        );
    }

    proptest! {
        #[test]
        fn property_test_bucket_index_is_lower_bound(
            raw in proptest::collection::btree_set(1i64..1_000_000, 1..64),
            value in -10i64..1_100_000,
        ) {
            let raw = raw.into_iter().collect::<Vec<_>>();
            let bounds = BucketBounds::new(&raw).unwrap();

            let expected = raw.iter().position(|bound| *bound >= value);
            prop_assert_eq!(bounds.bucket_index(value), expected);
        }
    }
}
