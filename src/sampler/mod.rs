pub mod cookies;
pub mod origin;

use serde::{Deserialize, Serialize};

pub use cookies::{CookieAggregate, CookieSampler, CookieScan, CookieStatistics};
pub use origin::{KeyValueSample, OpaqueSample, OriginSample, OriginSampler};

/// Entries above this size count as large keys
pub const LARGE_ENTRY_BYTES: u64 = 100 * 1024;

/// Size class of a single stored entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Lt1k,
    Lt10k,
    Lt100k,
    Gte100k,
}

impl SizeBucket {
    pub fn classify(size: u64) -> Self {
        if size < 1024 {
            SizeBucket::Lt1k
        } else if size < 10 * 1024 {
            SizeBucket::Lt10k
        } else if size < 100 * 1024 {
            SizeBucket::Lt100k
        } else {
            SizeBucket::Gte100k
        }
    }
}

impl std::fmt::Display for SizeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SizeBucket::Lt1k => write!(f, "< 1 KB"),
            SizeBucket::Lt10k => write!(f, "1-10 KB"),
            SizeBucket::Lt100k => write!(f, "10-100 KB"),
            SizeBucket::Gte100k => write!(f, ">= 100 KB"),
        }
    }
}

/// Entry counts per size bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    pub lt1k: u64,
    pub lt10k: u64,
    pub lt100k: u64,
    pub gte100k: u64,
}

impl BucketCounts {
    pub fn record(&mut self, size: u64) {
        match SizeBucket::classify(size) {
            SizeBucket::Lt1k => self.lt1k += 1,
            SizeBucket::Lt10k => self.lt10k += 1,
            SizeBucket::Lt100k => self.lt100k += 1,
            SizeBucket::Gte100k => self.gte100k += 1,
        }
    }

    pub fn get(&self, bucket: SizeBucket) -> u64 {
        match bucket {
            SizeBucket::Lt1k => self.lt1k,
            SizeBucket::Lt10k => self.lt10k,
            SizeBucket::Lt100k => self.lt100k,
            SizeBucket::Gte100k => self.gte100k,
        }
    }

    pub fn add(&mut self, other: &BucketCounts) {
        self.lt1k += other.lt1k;
        self.lt10k += other.lt10k;
        self.lt100k += other.lt100k;
        self.gte100k += other.gte100k;
    }

    pub fn total(&self) -> u64 {
        self.lt1k + self.lt10k + self.lt100k + self.gte100k
    }
}

/// Knobs for the coarse IndexedDB/Cache size estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerOptions {
    pub opaque_size_estimates: bool,
    pub indexed_db_estimate_bytes: u64,
    pub cache_bucket_estimate_bytes: u64,
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            opaque_size_estimates: false,
            indexed_db_estimate_bytes: 5_000,
            cache_bucket_estimate_bytes: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(SizeBucket::classify(0), SizeBucket::Lt1k);
        assert_eq!(SizeBucket::classify(1023), SizeBucket::Lt1k);
        assert_eq!(SizeBucket::classify(1024), SizeBucket::Lt10k);
        assert_eq!(SizeBucket::classify(10 * 1024), SizeBucket::Lt100k);
        assert_eq!(SizeBucket::classify(100 * 1024), SizeBucket::Gte100k);
    }

    #[test]
    fn test_bucket_counts_add() {
        let mut a = BucketCounts::default();
        a.record(10);
        a.record(5000);
        let mut b = BucketCounts::default();
        b.record(200_000);
        a.add(&b);
        assert_eq!(a.total(), 3);
        assert_eq!(a.get(SizeBucket::Gte100k), 1);
        assert_eq!(a.get(SizeBucket::Lt10k), 1);
    }
}
