use std::fmt;

use snafu::Snafu;

/// A histogram error.
#[derive(Clone, Debug, PartialEq, Snafu)]
#[snafu(context(suffix(false)), visibility(pub(crate)))]
pub enum HistogramError {
    /// The bucket bounds were rejected during construction.
    ///
    /// Bounds must be non-empty, strictly positive, and strictly increasing.
    #[snafu(display("Invalid bucket bounds: {}.", violation))]
    InvalidBounds {
        /// Which rule the bounds violated.
        violation: BoundsViolation,
    },

    /// Two histograms with different bucket bounds were merged.
    #[snafu(display(
        "Histograms have incompatible bucket bounds ({} buckets vs {} buckets).",
        ours,
        theirs
    ))]
    IncompatibleHistograms {
        /// Number of buckets in the histogram being merged into.
        ours: usize,

        /// Number of buckets in the histogram being merged from.
        theirs: usize,
    },

    /// A percentile factor outside of the open interval `(0.0, 1.0)` was given.
    #[snafu(display("Factor must be between 0.0 and 1.0 exclusive, got {}.", factor))]
    InvalidFactor {
        /// The rejected factor.
        factor: f64,
    },

    /// An exponential bucket layout was requested with a growth factor that is not a finite number greater than 1.0.
    #[snafu(display("Growth factor must be a finite number greater than 1.0, got {}.", factor))]
    InvalidGrowthFactor {
        /// The rejected growth factor.
        factor: f64,
    },
}

/// The rule a sequence of bucket bounds failed to uphold.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundsViolation {
    /// No bounds were given.
    Empty,

    /// A bound was zero or negative.
    NotPositive {
        /// Position of the offending bound.
        index: usize,

        /// The offending bound.
        bound: i64,
    },

    /// A bound was not strictly greater than the bound before it.
    NotIncreasing {
        /// Position of the offending bound.
        index: usize,

        /// The bound immediately before the offending bound.
        previous: i64,

        /// The offending bound.
        bound: i64,
    },

    /// Generating the bound at the given position overflowed `i64`.
    Overflow {
        /// Position of the bound that could not be generated.
        index: usize,
    },
}

impl fmt::Display for BoundsViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "at least one bound is required"),
            Self::NotPositive { index, bound } => {
                write!(f, "bound {} at index {} must be greater than 0", bound, index)
            }
            Self::NotIncreasing { index, previous, bound } => write!(
                f,
                "bound {} at index {} must be greater than previous bound {}",
                bound, index, previous
            ),
            Self::Overflow { index } => write!(f, "bound at index {} overflows i64", index),
        }
    }
}
