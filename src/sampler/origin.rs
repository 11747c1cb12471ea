use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BucketCounts, SamplerOptions, LARGE_ENTRY_BYTES};
use crate::common::errors::HostError;
use crate::host::{Capabilities, ExecutionContext, OriginView};

/// Tally of one key/value store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueSample {
    pub count: u64,
    /// Sum of `len(key) + len(value)` over all entries
    pub size: u64,
    pub buckets: BucketCounts,
    pub json_parse_failures: u64,
    pub large_key_count: u64,
}

impl KeyValueSample {
    /// Tally a store's entries
    pub fn from_entries<K: AsRef<str>, V: AsRef<str>>(entries: &[(K, V)]) -> Self {
        let mut sample = KeyValueSample::default();
        for (key, value) in entries {
            let (key, value) = (key.as_ref(), value.as_ref());
            let entry_size = (key.len() + value.len()) as u64;

            sample.count += 1;
            sample.size += entry_size;
            sample.buckets.record(entry_size);
            if entry_size > LARGE_ENTRY_BYTES {
                sample.large_key_count += 1;
            }
            // Empty values are not counted as parse failures
            if !value.is_empty()
                && serde_json::from_str::<serde::de::IgnoredAny>(value).is_err()
            {
                sample.json_parse_failures += 1;
            }
        }
        sample
    }
}

/// Count, size and names for a store the host can only list (IndexedDB, Cache)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaqueSample {
    pub count: u64,
    pub size: u64,
    pub names: Vec<String>,
}

/// Everything sampled from one origin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginSample {
    pub local: KeyValueSample,
    pub session: KeyValueSample,
    pub indexed: OpaqueSample,
    pub cache: OpaqueSample,
    /// Which optional APIs were present; absent ones leave a zero sub-result
    pub capabilities: Capabilities,
}

/// Samples the storage of a single origin
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginSampler {
    options: SamplerOptions,
}

impl OriginSampler {
    pub fn new(options: SamplerOptions) -> Self {
        Self { options }
    }

    /// Sample inside the context. Errors only when the context itself is unreachable.
    pub fn sample(&self, ctx: &dyn ExecutionContext) -> Result<OriginSample, HostError> {
        ctx.run_sampler(&|view: &dyn OriginView| self.sample_view(view))
    }

    /// Sample an already-reachable origin view
    pub fn sample_view(&self, view: &dyn OriginView) -> OriginSample {
        let capabilities = view.capabilities();

        let local = KeyValueSample::from_entries(&view.local_entries());
        let session = KeyValueSample::from_entries(&view.session_entries());

        let mut indexed = OpaqueSample::default();
        if capabilities.structured_db {
            let databases = view.databases();
            indexed.count = databases.len() as u64;
            indexed.size = databases.iter().filter_map(|db| db.size).sum();
            indexed.names = databases.into_iter().map(|db| db.name).collect();
            if self.options.opaque_size_estimates && indexed.size == 0 {
                indexed.size = indexed.count * self.options.indexed_db_estimate_bytes;
            }
        } else {
            debug!(
                action = "skip",
                component = "origin_sampler",
                capability = "structured_db",
                "Structured database API unavailable"
            );
        }

        // Per-bucket content sizing is not computed
        let mut cache = OpaqueSample::default();
        if capabilities.cache_buckets {
            cache.names = view.cache_names();
            cache.count = cache.names.len() as u64;
            if self.options.opaque_size_estimates {
                cache.size = cache.count * self.options.cache_bucket_estimate_bytes;
            }
        } else {
            debug!(
                action = "skip",
                component = "origin_sampler",
                capability = "cache_buckets",
                "Cache bucket API unavailable"
            );
        }

        OriginSample {
            local,
            session,
            indexed,
            cache,
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DatabaseInfo;

    struct FakeView {
        capabilities: Capabilities,
        local: Vec<(String, String)>,
        databases: Vec<DatabaseInfo>,
        caches: Vec<String>,
    }

    impl OriginView for FakeView {
        fn capabilities(&self) -> Capabilities {
            self.capabilities
        }
        fn local_entries(&self) -> Vec<(String, String)> {
            self.local.clone()
        }
        fn session_entries(&self) -> Vec<(String, String)> {
            Vec::new()
        }
        fn databases(&self) -> Vec<DatabaseInfo> {
            self.databases.clone()
        }
        fn cache_names(&self) -> Vec<String> {
            self.caches.clone()
        }
    }

    fn view(capabilities: Capabilities) -> FakeView {
        FakeView {
            capabilities,
            local: vec![
                ("theme".into(), "\"dark\"".into()),
                ("blob".into(), "not json".into()),
                ("empty".into(), String::new()),
            ],
            databases: vec![
                DatabaseInfo { name: "app".into(), size: Some(4096) },
                DatabaseInfo { name: "logs".into(), size: None },
            ],
            caches: vec!["v1".into(), "v2".into()],
        }
    }

    #[test]
    fn test_key_value_tally() {
        let sample = KeyValueSample::from_entries(&[("ab", "{}"), ("c", "oops")]);
        assert_eq!(sample.count, 2);
        assert_eq!(sample.size, 2 + 2 + 1 + 4);
        assert_eq!(sample.buckets.lt1k, 2);
        assert_eq!(sample.json_parse_failures, 1);
        assert_eq!(sample.large_key_count, 0);
    }

    #[test]
    fn test_large_entries_counted() {
        let big = "x".repeat(LARGE_ENTRY_BYTES as usize + 1);
        let sample = KeyValueSample::from_entries(&[("k", big.as_str())]);
        assert_eq!(sample.large_key_count, 1);
        assert_eq!(sample.buckets.gte100k, 1);
    }

    #[test]
    fn test_full_capabilities() {
        let sample = OriginSampler::default().sample_view(&view(Capabilities::default()));
        assert_eq!(sample.local.count, 3);
        assert_eq!(sample.local.json_parse_failures, 1);
        assert_eq!(sample.indexed.count, 2);
        assert_eq!(sample.indexed.size, 4096);
        assert_eq!(sample.indexed.names, vec!["app".to_string(), "logs".to_string()]);
        assert_eq!(sample.cache.count, 2);
        assert_eq!(sample.cache.size, 0);
    }

    #[test]
    fn test_missing_capabilities_yield_zero() {
        let caps = Capabilities {
            structured_db: false,
            cache_buckets: false,
        };
        let sample = OriginSampler::default().sample_view(&view(caps));
        assert_eq!(sample.local.count, 3);
        assert_eq!(sample.indexed, OpaqueSample::default());
        assert_eq!(sample.cache, OpaqueSample::default());
        assert!(!sample.capabilities.structured_db);
    }

    #[test]
    fn test_opaque_estimates() {
        let sampler = OriginSampler::new(SamplerOptions {
            opaque_size_estimates: true,
            ..SamplerOptions::default()
        });
        let mut v = view(Capabilities::default());
        v.databases = vec![DatabaseInfo { name: "app".into(), size: None }];
        let sample = sampler.sample_view(&v);
        assert_eq!(sample.indexed.size, 5_000);
        assert_eq!(sample.cache.size, 20_000);
    }
}
