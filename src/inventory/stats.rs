//! Descriptive analytics over one collection cycle.
//!
//! Everything here is a pure function of the merged records and the cookie
//! jar classification; a [`Statistics`] value is built once and never updated.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::record::{DomainRecord, StorageClass};
use crate::sampler::cookies::{
    CookieExpiryBreakdown, CookieSecurityBreakdown, CookieStatistics, SecurityCombination,
};
use crate::sampler::BucketCounts;

pub const HISTOGRAM_BINS: usize = 10;

/// Entry size distribution for the classes that record per-entry sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSizeBuckets {
    pub local: BucketCounts,
    pub session: BucketCounts,
    pub cookies: BucketCounts,
}

/// Fleet-wide data quality counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTotals {
    pub local_json_failures: u64,
    pub session_json_failures: u64,
    pub local_large_keys: u64,
    pub session_large_keys: u64,
}

/// Average entry size per class, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassAverages {
    pub local: f64,
    pub session: f64,
    pub indexed: f64,
    pub cache: f64,
    pub cookies: f64,
}

impl ClassAverages {
    pub fn get(&self, class: StorageClass) -> f64 {
        match class {
            StorageClass::Local => self.local,
            StorageClass::Session => self.session,
            StorageClass::Indexed => self.indexed,
            StorageClass::Cache => self.cache,
            StorageClass::Cookies => self.cookies,
        }
    }
}

/// One step of the Pareto curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationPoint {
    pub domain: String,
    pub size: u64,
    pub cumulative_ratio: f64,
    /// 1-based
    pub rank: usize,
}

/// How many domains use each class at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassUsageCounts {
    pub local: u64,
    pub session: u64,
    pub indexed: u64,
    pub cache: u64,
    pub cookies: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoragePreference {
    pub local_only: u64,
    pub cookies_only: u64,
    /// More than one class in use
    pub mixed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldEntry {
    pub tld: String,
    pub count: u64,
    pub size: u64,
}

/// Hostname length classes: <10, <20, <30, longer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBuckets {
    pub short: u64,
    pub medium: u64,
    pub long: u64,
    pub very_long: u64,
}

/// Mutually exclusive classification by which classes are in use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageCombinationCounts {
    pub none: u64,
    pub local_only: u64,
    pub cookies_only: u64,
    pub local_and_cookies: u64,
    pub all: u64,
    pub other: u64,
}

impl StorageCombinationCounts {
    pub fn total(&self) -> u64 {
        self.none + self.local_only + self.cookies_only + self.local_and_cookies + self.all + self.other
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonFailureEntry {
    pub domain: String,
    pub fail_count: u64,
    /// Failures over key/value entries of the domain
    pub fail_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub min: u64,
    pub max: u64,
    pub avg: f64,
    pub median: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: u64,
    pub median: u64,
    pub q3: u64,
}

/// Snapshot of every derived view for one collection cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub domain_count: usize,
    pub total_size: u64,
    pub total_items: u64,
    pub size_buckets: ClassSizeBuckets,
    pub cookie_security: CookieSecurityBreakdown,
    pub cookie_expiry: CookieExpiryBreakdown,
    pub expiring_soon_by_domain: BTreeMap<String, u64>,
    pub quality: QualityTotals,
    pub avg_item_size: ClassAverages,
    pub concentration: Vec<ConcentrationPoint>,
    pub size_histogram: [u64; HISTOGRAM_BINS],
    pub item_count_histogram: [u64; HISTOGRAM_BINS],
    pub class_usage: ClassUsageCounts,
    pub preference: StoragePreference,
    pub tld_breakdown: Vec<TldEntry>,
    pub length_buckets: LengthBuckets,
    pub storage_combinations: StorageCombinationCounts,
    pub insecure_cookie_domains: Vec<DomainCount>,
    pub expired_cookie_domains: Vec<DomainCount>,
    pub security_combinations: Vec<SecurityCombination>,
    pub json_failure_ranking: Vec<JsonFailureEntry>,
    pub large_key_ranking: Vec<DomainCount>,
    pub size_summary: SizeSummary,
    pub quartiles: Quartiles,
    /// Per-domain totals in domain-name order
    pub domain_sizes: Vec<u64>,
}

impl Statistics {
    /// Smallest number of domains that together hold at least `share` of all bytes
    pub fn domains_for_share(&self, share: f64) -> usize {
        self.concentration
            .iter()
            .position(|p| p.cumulative_ratio >= share)
            .map(|idx| idx + 1)
            .unwrap_or(self.concentration.len())
    }
}

/// Builds [`Statistics`] from merged records
#[derive(Debug, Clone, Copy)]
pub struct StatisticsEngine {
    top_n: usize,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl StatisticsEngine {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// Compute every view.
    ///
    /// Records are visited in domain-name order, which is also the tie-break
    /// order of every ranking.
    pub fn compute(
        &self,
        records: &HashMap<String, DomainRecord>,
        cookies: &CookieStatistics,
    ) -> Statistics {
        let mut domains: Vec<&DomainRecord> = records.values().collect();
        domains.sort_by(|a, b| a.domain.cmp(&b.domain));

        let sizes: Vec<u64> = domains.iter().map(|d| d.total_size()).collect();
        let items: Vec<u64> = domains.iter().map(|d| d.total_items()).collect();
        let total_size: u64 = sizes.iter().sum();
        let total_items: u64 = items.iter().sum();

        let concentration = concentration_curve(&domains, &sizes, total_size);
        let size_histogram = histogram(&sizes);
        let item_count_histogram = histogram(&items);

        let mut size_buckets = ClassSizeBuckets {
            cookies: cookies.size_buckets,
            ..ClassSizeBuckets::default()
        };
        let mut quality = QualityTotals::default();
        for d in &domains {
            size_buckets.local.add(&d.local.size_buckets);
            size_buckets.session.add(&d.session.size_buckets);
            quality.local_json_failures += d.local.json_parse_failures;
            quality.session_json_failures += d.session.json_parse_failures;
            quality.local_large_keys += d.local.large_key_count;
            quality.session_large_keys += d.session.large_key_count;
        }

        let (class_usage, preference, storage_combinations) = usage_breakdowns(&domains);

        let mut length_buckets = LengthBuckets::default();
        for d in &domains {
            match d.domain.chars().count() {
                0..=9 => length_buckets.short += 1,
                10..=19 => length_buckets.medium += 1,
                20..=29 => length_buckets.long += 1,
                _ => length_buckets.very_long += 1,
            }
        }

        let mut sorted_sizes = sizes.clone();
        sorted_sizes.sort_unstable();

        Statistics {
            domain_count: domains.len(),
            total_size,
            total_items,
            size_buckets,
            cookie_security: cookies.security,
            cookie_expiry: cookies.expiry,
            expiring_soon_by_domain: cookies.expiring_soon_by_domain.clone(),
            quality,
            avg_item_size: class_averages(&domains),
            concentration,
            size_histogram,
            item_count_histogram,
            class_usage,
            preference,
            tld_breakdown: tld_breakdown(&domains),
            length_buckets,
            storage_combinations,
            insecure_cookie_domains: self.top_counts(&cookies.insecure_by_domain),
            expired_cookie_domains: self.top_counts(&cookies.expired_by_domain),
            security_combinations: cookies.security_combinations.clone(),
            json_failure_ranking: self.json_failure_ranking(&domains),
            large_key_ranking: self.large_key_ranking(&domains),
            size_summary: size_summary(&sorted_sizes),
            quartiles: quartiles(&sorted_sizes),
            domain_sizes: sizes,
        }
    }

    fn top_counts(&self, by_domain: &BTreeMap<String, u64>) -> Vec<DomainCount> {
        let mut counts: Vec<DomainCount> = by_domain
            .iter()
            .map(|(domain, count)| DomainCount {
                domain: domain.clone(),
                count: *count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(self.top_n);
        counts
    }

    fn json_failure_ranking(&self, domains: &[&DomainRecord]) -> Vec<JsonFailureEntry> {
        let mut ranking: Vec<JsonFailureEntry> = domains
            .iter()
            .filter(|d| d.json_parse_failures() > 0)
            .map(|d| {
                let entries = d.local.count + d.session.count;
                JsonFailureEntry {
                    domain: d.domain.clone(),
                    fail_count: d.json_parse_failures(),
                    fail_rate: d.json_parse_failures() as f64 / entries.max(1) as f64,
                }
            })
            .collect();
        ranking.sort_by(|a, b| b.fail_count.cmp(&a.fail_count));
        ranking.truncate(self.top_n);
        ranking
    }

    fn large_key_ranking(&self, domains: &[&DomainRecord]) -> Vec<DomainCount> {
        let mut ranking: Vec<DomainCount> = domains
            .iter()
            .filter(|d| d.large_key_count() > 0)
            .map(|d| DomainCount {
                domain: d.domain.clone(),
                count: d.large_key_count(),
            })
            .collect();
        ranking.sort_by(|a, b| b.count.cmp(&a.count));
        ranking.truncate(self.top_n);
        ranking
    }
}

fn concentration_curve(
    domains: &[&DomainRecord],
    sizes: &[u64],
    total_size: u64,
) -> Vec<ConcentrationPoint> {
    let mut ranked: Vec<(&DomainRecord, u64)> =
        domains.iter().copied().zip(sizes.iter().copied()).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut cumulative = 0u64;
    ranked
        .into_iter()
        .enumerate()
        .map(|(idx, (record, size))| {
            cumulative += size;
            let cumulative_ratio = if total_size > 0 {
                cumulative as f64 / total_size as f64
            } else {
                0.0
            };
            ConcentrationPoint {
                domain: record.domain.clone(),
                size,
                cumulative_ratio,
                rank: idx + 1,
            }
        })
        .collect()
}

/// Equal-width bins from 0 to the observed maximum (at least 1)
fn histogram(values: &[u64]) -> [u64; HISTOGRAM_BINS] {
    let mut bins = [0u64; HISTOGRAM_BINS];
    let max = values.iter().copied().max().unwrap_or(0).max(1) as f64;
    for value in values {
        let idx = ((*value as f64 / max) * HISTOGRAM_BINS as f64).floor() as usize;
        bins[idx.min(HISTOGRAM_BINS - 1)] += 1;
    }
    bins
}

fn class_averages(domains: &[&DomainRecord]) -> ClassAverages {
    let avg = |class: StorageClass| {
        let (size, count) = domains.iter().fold((0u64, 0u64), |(s, c), d| {
            let m = d.metric(class);
            (s + m.size, c + m.count)
        });
        size as f64 / count.max(1) as f64
    };
    ClassAverages {
        local: avg(StorageClass::Local),
        session: avg(StorageClass::Session),
        indexed: avg(StorageClass::Indexed),
        cache: avg(StorageClass::Cache),
        cookies: avg(StorageClass::Cookies),
    }
}

fn usage_breakdowns(
    domains: &[&DomainRecord],
) -> (ClassUsageCounts, StoragePreference, StorageCombinationCounts) {
    let mut usage = ClassUsageCounts::default();
    let mut preference = StoragePreference::default();
    let mut combinations = StorageCombinationCounts::default();

    for d in domains {
        let local = d.uses(StorageClass::Local);
        let session = d.uses(StorageClass::Session);
        let indexed = d.uses(StorageClass::Indexed);
        let cache = d.uses(StorageClass::Cache);
        let cookies = d.uses(StorageClass::Cookies);

        usage.local += u64::from(local);
        usage.session += u64::from(session);
        usage.indexed += u64::from(indexed);
        usage.cache += u64::from(cache);
        usage.cookies += u64::from(cookies);

        let in_use = [local, session, indexed, cache, cookies]
            .iter()
            .filter(|u| **u)
            .count();
        let others = session || indexed || cache;

        if in_use > 1 {
            preference.mixed += 1;
        }

        match (local, cookies, others) {
            (false, false, false) => combinations.none += 1,
            (true, false, false) => {
                combinations.local_only += 1;
                preference.local_only += 1;
            }
            (false, true, false) => {
                combinations.cookies_only += 1;
                preference.cookies_only += 1;
            }
            (true, true, false) => combinations.local_and_cookies += 1,
            _ if in_use == StorageClass::ALL.len() => combinations.all += 1,
            _ => combinations.other += 1,
        }
    }

    (usage, preference, combinations)
}

fn tld_breakdown(domains: &[&DomainRecord]) -> Vec<TldEntry> {
    let mut by_tld: BTreeMap<String, TldEntry> = BTreeMap::new();
    for d in domains {
        let tld = match d.domain.rsplit_once('.') {
            Some((_, last)) => last.to_string(),
            None => "other".to_string(),
        };
        let entry = by_tld.entry(tld.clone()).or_insert(TldEntry {
            tld,
            count: 0,
            size: 0,
        });
        entry.count += 1;
        entry.size += d.total_size();
    }
    let mut entries: Vec<TldEntry> = by_tld.into_values().collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

fn size_summary(sorted: &[u64]) -> SizeSummary {
    if sorted.is_empty() {
        return SizeSummary::default();
    }
    let sum: u64 = sorted.iter().sum();
    SizeSummary {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        avg: sum as f64 / sorted.len() as f64,
        median: sorted[sorted.len() / 2],
    }
}

fn quartiles(sorted: &[u64]) -> Quartiles {
    if sorted.is_empty() {
        return Quartiles::default();
    }
    let n = sorted.len();
    Quartiles {
        q1: sorted[n / 4],
        median: sorted[n / 2],
        q3: sorted[(3 * n) / 4],
    }
}
