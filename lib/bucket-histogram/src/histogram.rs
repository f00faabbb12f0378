//! Fixed-bucket histogram.

use std::{fmt, iter::Zip, slice};

use snafu::ensure;
use tracing::debug;

use crate::bounds::BucketBounds;
use crate::error::{HistogramError, IncompatibleHistograms, InvalidFactor};

const TWO_NINES: f64 = 0.99;
const FOUR_NINES: f64 = 0.9999;

/// Minimum value reported before any observation has been recorded.
const NO_MIN: i64 = i64::MAX;

/// Maximum value reported before any observation has been recorded.
const NO_MAX: i64 = 0;

/// A fixed-bucket histogram.
///
/// `Histogram` counts observations against a fixed set of upper bounds (see [`BucketBounds`]), and tracks the
/// smallest and largest observation seen. Recording an observation is a binary search over the bounds and a single
/// counter increment: it never allocates, and values larger than the largest bound are rejected rather than recorded.
///
/// ## Minimum and maximum tracking
///
/// The trackers are updated with an either/or rule: an observation smaller than the current minimum becomes the new
/// minimum, and only an observation that is _not_ a new minimum is considered as a new maximum. The very first
/// observation therefore only ever sets the minimum, leaving the maximum at zero until a later, larger observation is
/// recorded. Merging applies the same rule to the other histogram's minimum, and then to its maximum.
///
/// Until an observation is recorded, [`min`][Self::min] returns `i64::MAX` and [`max`][Self::max] returns `0`.
///
/// ## Concurrency
///
/// All mutating methods take `&mut self`, so a histogram has exactly one writer at a time. Queries take `&self` and
/// may be called concurrently with one another.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Histogram {
    /// The upper bound of each bucket.
    bounds: BucketBounds,

    /// The number of observations within each bucket.
    counts: Box<[u64]>,

    /// The smallest observation recorded.
    min: i64,

    /// The largest observation recorded.
    max: i64,
}

impl Histogram {
    /// Creates a new `Histogram` with the given bucket upper bounds.
    ///
    /// The bounds are copied into the histogram.
    ///
    /// ## Errors
    ///
    /// If the bounds are empty, contain a bound that is not greater than zero, or contain a bound that is not greater
    /// than the bound before it, an error is returned.
    pub fn new(bounds: &[i64]) -> Result<Self, HistogramError> {
        BucketBounds::new(bounds).map(Self::from_bounds)
    }

    /// Creates a new `Histogram` from already-validated bucket bounds.
    pub fn from_bounds(bounds: BucketBounds) -> Self {
        let counts = vec![0; bounds.len()].into_boxed_slice();
        Self {
            bounds,
            counts,
            min: NO_MIN,
            max: NO_MAX,
        }
    }

    /// Records a single observation.
    ///
    /// Returns `true` if the observation fell within a bucket and was recorded. If the observation is larger than the
    /// largest bound, `false` is returned and the histogram is left unchanged. Observations at or below zero are
    /// recorded in the first bucket.
    #[inline]
    pub fn add_observation(&mut self, value: i64) -> bool {
        match self.bounds.bucket_index(value) {
            Some(idx) => {
                self.counts[idx] += 1;
                self.track(value);
                true
            }
            None => false,
        }
    }

    /// Merges the observations of another histogram into this histogram.
    ///
    /// Counts are summed bucket by bucket, and the other histogram's minimum and maximum are then fed through this
    /// histogram's minimum/maximum tracking, in that order. Merging a histogram with no observations leaves the
    /// minimum and maximum untouched.
    ///
    /// ## Errors
    ///
    /// If the histograms do not have identical bucket bounds, an error is returned and neither histogram is modified.
    pub fn add_observations(&mut self, other: &Histogram) -> Result<(), HistogramError> {
        if self.bounds != other.bounds {
            debug!(
                ours = self.bounds.len(),
                theirs = other.bounds.len(),
                "Refusing to merge histograms with different bucket bounds."
            );
            return IncompatibleHistograms {
                ours: self.bounds.len(),
                theirs: other.bounds.len(),
            }
            .fail();
        }

        for (ours, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *ours += *theirs;
        }

        if !other.is_empty() {
            self.track(other.min);
            self.track(other.max);
        }

        Ok(())
    }

    /// Clears the histogram, resetting all bucket counts and the minimum/maximum trackers.
    ///
    /// The bucket bounds are unchanged.
    pub fn clear(&mut self) {
        self.counts.fill(0);
        self.min = NO_MIN;
        self.max = NO_MAX;
    }

    fn track(&mut self, value: i64) {
        if value < self.min {
            self.min = value;
        } else if value > self.max {
            self.max = value;
        }
    }

    /// Returns the bucket bounds of this histogram.
    pub fn bounds(&self) -> &BucketBounds {
        &self.bounds
    }

    /// Returns the number of buckets in the histogram.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether or not any observations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|count| *count == 0)
    }

    /// Returns the total number of observations recorded.
    pub fn count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns the smallest observation recorded, or `i64::MAX` if the histogram is empty.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Returns the largest observation recorded, or `0` if the histogram is empty.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Returns the upper bound of the bucket at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [`len`][Self::len].
    pub fn upper_bound_at(&self, index: usize) -> i64 {
        self.bounds.as_slice()[index]
    }

    /// Returns the number of observations in the bucket at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not less than [`len`][Self::len].
    pub fn count_at(&self, index: usize) -> u64 {
        self.counts[index]
    }

    /// Returns the upper bound and count of the bucket at the given index, if it exists.
    pub fn bucket(&self, index: usize) -> Option<(i64, u64)> {
        Some((self.bounds.get(index)?, *self.counts.get(index)?))
    }

    /// Returns an iterator over the buckets, as `(upper bound, count)` pairs, in ascending order.
    pub fn buckets(&self) -> Buckets<'_> {
        Buckets {
            inner: self.bounds.as_slice().iter().zip(self.counts.iter()),
        }
    }

    /// Returns the estimated mean of all observations, rounded to two decimal places.
    ///
    /// Each non-empty bucket contributes the midpoint of its effective range, weighted by its count. The effective
    /// range of a bucket is narrowed by the tracked minimum and maximum: the first bucket starts at the minimum when it
    /// holds observations, no bucket extends below the minimum, and no bucket extends above the maximum. The weighted
    /// sum is computed exactly with integer arithmetic, and rounded half away from zero.
    ///
    /// Returns `0.0` if the histogram is empty.
    pub fn mean(&self) -> f64 {
        self.mean_hundredths() as f64 / 100.0
    }

    fn mean_hundredths(&self) -> i128 {
        let total = self.count();
        if total == 0 {
            return 0;
        }

        let min = i128::from(self.min);
        let max = i128::from(self.max);

        let mut lower = if self.counts[0] > 0 { min } else { 0 };
        let mut weighted_sum = 0i128;
        for (bound, count) in self.buckets() {
            let bound = i128::from(bound);
            if count > 0 {
                let upper = bound.min(max);
                let midpoint = lower + (upper - lower).div_euclid(2);
                weighted_sum = weighted_sum.saturating_add(midpoint.saturating_mul(i128::from(count)));
            }

            lower = (bound + 1).max(min);
        }

        divide_round_half_away(weighted_sum.saturating_mul(100), i128::from(total))
    }

    /// Returns the upper bound of the bucket holding the observation at the given quantile.
    ///
    /// Buckets are scanned from the highest downward, accumulating their counts, until the accumulated tail holds at
    /// least `count - round(count * factor)` observations. Only buckets that bring the tail above zero are
    /// considered, so empty buckets at the top of the histogram are never reported.
    ///
    /// Returns `0` if the histogram is empty.
    ///
    /// ## Errors
    ///
    /// If `factor` is not strictly between 0.0 and 1.0, an error is returned.
    pub fn upper_bound_for_factor(&self, factor: f64) -> Result<i64, HistogramError> {
        ensure!(factor > 0.0 && factor < 1.0, InvalidFactor { factor });

        Ok(self.upper_bound_for_valid_factor(factor))
    }

    /// Returns the upper bound of the bucket holding the 99th percentile observation.
    ///
    /// Returns `0` if the histogram is empty.
    pub fn two_nines_upper_bound(&self) -> i64 {
        self.upper_bound_for_valid_factor(TWO_NINES)
    }

    /// Returns the upper bound of the bucket holding the 99.99th percentile observation.
    ///
    /// Returns `0` if the histogram is empty.
    pub fn four_nines_upper_bound(&self) -> i64 {
        self.upper_bound_for_valid_factor(FOUR_NINES)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn upper_bound_for_valid_factor(&self, factor: f64) -> i64 {
        let total = self.count();

        // SAFETY: `factor` is within (0.0, 1.0), so the rounded product is a whole number in [0, total].
        let head = (total as f64 * factor).round() as u64;
        let tail_target = total.saturating_sub(head);

        let mut tail = 0;
        for (bound, count) in self.buckets().rev() {
            tail += count;
            if tail > 0 && tail >= tail_target {
                return bound;
            }
        }

        0
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "min={}, max={}, mean={:.2}, 99%={}, 99.99%={}, [",
            self.min,
            self.max,
            self.mean(),
            self.two_nines_upper_bound(),
            self.four_nines_upper_bound()
        )?;

        let mut first = true;
        for (bound, count) in self.buckets().filter(|(_, count)| *count > 0) {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", bound, count)?;
            first = false;
        }

        write!(f, "]")
    }
}

/// Iterator over the buckets of a [`Histogram`].
///
/// Yields `(upper bound, count)` pairs in ascending bound order.
#[derive(Clone, Debug)]
pub struct Buckets<'a> {
    inner: Zip<slice::Iter<'a, i64>, slice::Iter<'a, u64>>,
}

impl Iterator for Buckets<'_> {
    type Item = (i64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(bound, count)| (*bound, *count))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for Buckets<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(bound, count)| (*bound, *count))
    }
}

impl ExactSizeIterator for Buckets<'_> {}

fn divide_round_half_away(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator
        .unsigned_abs()
        .saturating_mul(2)
        .saturating_add(denominator.unsigned_abs())
        / denominator.unsigned_abs().saturating_mul(2);

    // SAFETY: The quotient is no larger than the absolute numerator, plus one.
    let quotient = quotient as i128;
    if (numerator < 0) != (denominator < 0) {
        -quotient
    } else {
        quotient
    }
}
