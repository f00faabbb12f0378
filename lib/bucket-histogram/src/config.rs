use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::bounds::BucketBounds;
use crate::error::HistogramError;
use crate::histogram::Histogram;

/// How the bucket bounds of a histogram are laid out.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
enum RawHistogramConfiguration {
    /// An explicit list of upper bounds.
    Explicit {
        /// Upper bounds, in strictly increasing order.
        bounds: Vec<i64>,
    },

    /// Evenly spaced upper bounds.
    ///
    /// Generates `count` bounds of the form `start + i * width`.
    Linear {
        /// The first upper bound.
        start: i64,

        /// The distance between consecutive upper bounds.
        width: i64,

        /// The number of buckets.
        count: usize,
    },

    /// Exponentially spaced upper bounds.
    ///
    /// Generates `count` bounds of the form `ceil(start * factor^i)`.
    Exponential {
        /// The first upper bound.
        start: i64,

        /// The growth factor between consecutive upper bounds. Must be greater than 1.0.
        factor: f64,

        /// The number of buckets.
        count: usize,
    },
}

/// Histogram configuration.
///
/// Describes the bucket layout of a histogram in a form that can be deserialized from configuration, and is validated
/// while being deserialized: a `HistogramConfiguration` always describes valid bucket bounds.
///
/// Three layouts are supported, selected by the `type` field:
///
/// - `explicit`: a list of upper bounds given as `bounds`
/// - `linear`: `count` bounds starting at `start`, each `width` apart
/// - `exponential`: `count` bounds starting at `start`, each `factor` times the previous one, rounded up
///
/// ```
/// use bucket_histogram::HistogramConfiguration;
///
/// let config: HistogramConfiguration =
///     serde_json::from_str(r#"{ "type": "linear", "start": 10, "width": 10, "count": 4 }"#).unwrap();
/// assert_eq!(config.bounds().as_slice(), &[10, 20, 30, 40]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct HistogramConfiguration {
    bounds: BucketBounds,
}

impl HistogramConfiguration {
    /// Creates a new `HistogramConfiguration` from the given bucket bounds.
    pub fn from_bounds(bounds: BucketBounds) -> Self {
        Self { bounds }
    }

    /// Returns the configured bucket bounds.
    pub fn bounds(&self) -> &BucketBounds {
        &self.bounds
    }

    /// Creates an empty histogram with the configured bucket bounds.
    pub fn build(&self) -> Histogram {
        Histogram::from_bounds(self.bounds.clone())
    }
}

impl<'de> Deserialize<'de> for HistogramConfiguration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawHistogramConfiguration::deserialize(deserializer)?;
        raw.into_bounds().map(Self::from_bounds).map_err(serde::de::Error::custom)
    }
}

impl RawHistogramConfiguration {
    fn into_bounds(self) -> Result<BucketBounds, HistogramError> {
        let bounds = match self {
            Self::Explicit { bounds } => BucketBounds::try_from(bounds)?,
            Self::Linear { start, width, count } => BucketBounds::linear(start, width, count)?,
            Self::Exponential { start, factor, count } => BucketBounds::exponential(start, factor, count)?,
        };

        debug!(
            buckets = bounds.len(),
            largest_bound = bounds.last(),
            "Loaded histogram bucket layout from configuration."
        );

        Ok(bounds)
    }
}
