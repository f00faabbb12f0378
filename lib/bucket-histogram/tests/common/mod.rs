#![allow(dead_code)]

use bucket_histogram::{BucketBounds, Histogram};
use dhat::HeapStats;
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

/// Creates an empty histogram with exponentially spaced buckets, from 1ms to ~16s in microseconds.
pub fn latency_histogram() -> Histogram {
    let bounds = BucketBounds::exponential(1_000, 2.0, 15).expect("bounds should be valid");
    Histogram::from_bounds(bounds)
}

pub fn make_points(size: usize) -> Vec<i64> {
    // Generate a set of samples that roughly correspond to the latency of a typical web service, in microseconds, with
    // a long tail. We limit this so the samples bottom out at 15 milliseconds and tail off at 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let seed = 0xC0FFEE;

    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    distribution
        .sample_iter(&mut rng)
        // Scale by 10,000 to get microseconds.
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .map(|n| n as i64)
        .take(size)
        .collect::<Vec<_>>()
}

#[non_exhaustive]
pub struct MathableHeapStats {
    pub total_blocks: u64,
    pub total_bytes: u64,
    pub curr_blocks: usize,
    pub curr_bytes: usize,
}

impl From<HeapStats> for MathableHeapStats {
    fn from(stats: HeapStats) -> Self {
        Self {
            total_blocks: stats.total_blocks,
            total_bytes: stats.total_bytes,
            curr_blocks: stats.curr_blocks,
            curr_bytes: stats.curr_bytes,
        }
    }
}

impl std::ops::Sub for MathableHeapStats {
    type Output = MathableHeapStats;

    fn sub(self, rhs: MathableHeapStats) -> Self::Output {
        MathableHeapStats {
            total_blocks: self.total_blocks - rhs.total_blocks,
            total_bytes: self.total_bytes - rhs.total_bytes,
            curr_blocks: self.curr_blocks - rhs.curr_blocks,
            curr_bytes: self.curr_bytes - rhs.curr_bytes,
        }
    }
}
