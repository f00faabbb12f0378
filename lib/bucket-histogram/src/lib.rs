//! A fixed-bucket histogram for recording latency-like observations against a predefined set of upper bounds.
//!
//! Observations are classified into `n` contiguous buckets, `(bounds[i - 1], bounds[i]]`, where the lower edge of the
//! first bucket is conceptually zero. Insertion is a binary search over the bounds followed by a single counter
//! increment, so recording is `O(log n)` and never allocates.
//!
//! # Quick Start
//!
//! ```
//! use bucket_histogram::Histogram;
//!
//! let mut histogram = Histogram::new(&[1, 5, 10]).unwrap();
//! assert!(histogram.add_observation(4));
//! assert!(histogram.add_observation(10));
//! assert!(!histogram.add_observation(11));
//!
//! assert_eq!(histogram.count(), 2);
//! assert_eq!(histogram.two_nines_upper_bound(), 10);
//! ```
//!
//! # Concurrency
//!
//! [`Histogram`] is designed for a single writer: every mutating method takes `&mut self`. Callers recording from
//! multiple threads should either keep one histogram per thread and periodically fold them together with
//! [`Histogram::add_observations`], or wrap a shared histogram in a lock.
#![deny(warnings)]
#![deny(missing_docs)]

mod bounds;
pub use self::bounds::BucketBounds;

mod config;
pub use self::config::HistogramConfiguration;

mod error;
pub use self::error::{BoundsViolation, HistogramError};

mod histogram;
pub use self::histogram::{Buckets, Histogram};
