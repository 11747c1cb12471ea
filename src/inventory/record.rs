use serde::{Deserialize, Serialize};

use crate::sampler::{BucketCounts, CookieAggregate, KeyValueSample, OriginSample};

/// The five kinds of client-side state tracked per domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Local,
    Session,
    Indexed,
    Cache,
    Cookies,
}

impl StorageClass {
    pub const ALL: [StorageClass; 5] = [
        StorageClass::Local,
        StorageClass::Session,
        StorageClass::Indexed,
        StorageClass::Cache,
        StorageClass::Cookies,
    ];
}

impl std::fmt::Display for StorageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageClass::Local => write!(f, "LocalStorage"),
            StorageClass::Session => write!(f, "SessionStorage"),
            StorageClass::Indexed => write!(f, "IndexedDB"),
            StorageClass::Cache => write!(f, "Cache"),
            StorageClass::Cookies => write!(f, "Cookies"),
        }
    }
}

/// Count and estimated bytes for one storage class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageClassMetric {
    pub count: u64,
    pub size: u64,
}

/// Key/value classes also keep per-entry size buckets and quality counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueMetric {
    pub count: u64,
    pub size: u64,
    pub size_buckets: BucketCounts,
    pub json_parse_failures: u64,
    pub large_key_count: u64,
}

impl KeyValueMetric {
    fn add_sample(&mut self, sample: &KeyValueSample) {
        self.count += sample.count;
        self.size += sample.size;
        self.size_buckets.add(&sample.buckets);
        self.json_parse_failures += sample.json_parse_failures;
        self.large_key_count += sample.large_key_count;
    }

    fn add(&mut self, other: &KeyValueMetric) {
        self.count += other.count;
        self.size += other.size;
        self.size_buckets.add(&other.size_buckets);
        self.json_parse_failures += other.json_parse_failures;
        self.large_key_count += other.large_key_count;
    }
}

impl StorageClassMetric {
    fn add(&mut self, count: u64, size: u64) {
        self.count += count;
        self.size += size;
    }
}

/// Merged inventory of one hostname.
///
/// Fields only ever grow: every merge adds, nothing overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain: String,
    pub local: KeyValueMetric,
    pub session: KeyValueMetric,
    pub indexed: StorageClassMetric,
    pub cache: StorageClassMetric,
    pub cookies: StorageClassMetric,
}

impl DomainRecord {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    /// Count and size of one class
    pub fn metric(&self, class: StorageClass) -> StorageClassMetric {
        match class {
            StorageClass::Local => StorageClassMetric {
                count: self.local.count,
                size: self.local.size,
            },
            StorageClass::Session => StorageClassMetric {
                count: self.session.count,
                size: self.session.size,
            },
            StorageClass::Indexed => self.indexed,
            StorageClass::Cache => self.cache,
            StorageClass::Cookies => self.cookies,
        }
    }

    /// Whether the domain has anything stored in `class`
    pub fn uses(&self, class: StorageClass) -> bool {
        self.metric(class).count > 0
    }

    pub fn total_size(&self) -> u64 {
        StorageClass::ALL.iter().map(|c| self.metric(*c).size).sum()
    }

    pub fn total_items(&self) -> u64 {
        StorageClass::ALL.iter().map(|c| self.metric(*c).count).sum()
    }

    pub fn json_parse_failures(&self) -> u64 {
        self.local.json_parse_failures + self.session.json_parse_failures
    }

    pub fn large_key_count(&self) -> u64 {
        self.local.large_key_count + self.session.large_key_count
    }

    /// Add one origin's sample
    pub fn add_origin_sample(&mut self, sample: &OriginSample) {
        self.local.add_sample(&sample.local);
        self.session.add_sample(&sample.session);
        self.indexed.add(sample.indexed.count, sample.indexed.size);
        self.cache.add(sample.cache.count, sample.cache.size);
    }

    /// Add the domain's cookie totals
    pub fn add_cookies(&mut self, cookies: &CookieAggregate) {
        self.cookies.add(cookies.count, cookies.size);
    }

    /// Fold another record for the same domain into this one
    pub fn merge(&mut self, other: &DomainRecord) {
        self.local.add(&other.local);
        self.session.add(&other.session);
        self.indexed.add(other.indexed.count, other.indexed.size);
        self.cache.add(other.cache.count, other.cache.size);
        self.cookies.add(other.cookies.count, other.cookies.size);
    }
}
