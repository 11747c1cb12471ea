use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use super::BucketCounts;
use crate::common::errors::HostError;
use crate::host::{BrowserHost, Cookie, SameSite};

const DAY_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Per-domain cookie totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAggregate {
    pub count: u64,
    /// Sum of `len(name) + len(value)`
    pub size: u64,
}

/// Time-to-expiry class of a cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryBucket {
    Expired,
    Lt7d,
    Lt30d,
    Mid,
    Gt180d,
    NoExpiry,
}

impl ExpiryBucket {
    /// Classify by `expiration_date - now` (both Unix seconds)
    pub fn classify(expiration_date: Option<f64>, now: f64) -> Self {
        let expires = match expiration_date {
            Some(date) if date != 0.0 && !date.is_nan() => date,
            _ => return ExpiryBucket::NoExpiry,
        };
        let delta = expires - now;
        if delta < 0.0 {
            ExpiryBucket::Expired
        } else if delta <= 7.0 * DAY_SECS {
            ExpiryBucket::Lt7d
        } else if delta <= 30.0 * DAY_SECS {
            ExpiryBucket::Lt30d
        } else if delta >= 180.0 * DAY_SECS {
            ExpiryBucket::Gt180d
        } else {
            ExpiryBucket::Mid
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieSecurityBreakdown {
    pub secure: u64,
    pub insecure: u64,
    pub http_only: u64,
    pub not_http_only: u64,
    pub same_site_strict: u64,
    pub same_site_lax: u64,
    pub same_site_none: u64,
    pub same_site_unspecified: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieExpiryBreakdown {
    pub expired: u64,
    pub lt7d: u64,
    pub lt30d: u64,
    pub mid: u64,
    pub gt180d: u64,
    pub no_expiry: u64,
}

impl CookieExpiryBreakdown {
    fn record(&mut self, bucket: ExpiryBucket) {
        match bucket {
            ExpiryBucket::Expired => self.expired += 1,
            ExpiryBucket::Lt7d => self.lt7d += 1,
            ExpiryBucket::Lt30d => self.lt30d += 1,
            ExpiryBucket::Mid => self.mid += 1,
            ExpiryBucket::Gt180d => self.gt180d += 1,
            ExpiryBucket::NoExpiry => self.no_expiry += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.expired + self.lt7d + self.lt30d + self.mid + self.gt180d + self.no_expiry
    }
}

/// One cell of the secure x httpOnly x SameSite cross.
///
/// Only explicit SameSite values take part; unspecified cookies are not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCombination {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub count: u64,
}

const EXPLICIT_SAME_SITE: [SameSite; 3] = [SameSite::Strict, SameSite::Lax, SameSite::NoRestriction];

fn combination_index(secure: bool, http_only: bool, same_site: SameSite) -> Option<usize> {
    let site = EXPLICIT_SAME_SITE.iter().position(|s| *s == same_site)?;
    Some((usize::from(!secure) * 2 + usize::from(!http_only)) * 3 + site)
}

/// Fleet-wide cookie classification gathered in one pass over the jar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieStatistics {
    pub size_buckets: BucketCounts,
    pub security: CookieSecurityBreakdown,
    pub expiry: CookieExpiryBreakdown,
    pub expiring_soon_by_domain: BTreeMap<String, u64>,
    pub insecure_by_domain: BTreeMap<String, u64>,
    pub expired_by_domain: BTreeMap<String, u64>,
    /// All 12 cells, secure before insecure, httpOnly before not, Strict/Lax/None
    pub security_combinations: Vec<SecurityCombination>,
}

impl Default for CookieStatistics {
    fn default() -> Self {
        let mut security_combinations = Vec::with_capacity(12);
        for secure in [true, false] {
            for http_only in [true, false] {
                for same_site in EXPLICIT_SAME_SITE {
                    security_combinations.push(SecurityCombination {
                        secure,
                        http_only,
                        same_site,
                        count: 0,
                    });
                }
            }
        }
        Self {
            size_buckets: BucketCounts::default(),
            security: CookieSecurityBreakdown::default(),
            expiry: CookieExpiryBreakdown::default(),
            expiring_soon_by_domain: BTreeMap::new(),
            insecure_by_domain: BTreeMap::new(),
            expired_by_domain: BTreeMap::new(),
            security_combinations,
        }
    }
}

impl CookieStatistics {
    fn record(&mut self, domain: &str, cookie: &Cookie, size: u64, now: f64) {
        self.size_buckets.record(size);

        if cookie.secure {
            self.security.secure += 1;
        } else {
            self.security.insecure += 1;
            *self.insecure_by_domain.entry(domain.to_string()).or_insert(0) += 1;
        }
        if cookie.http_only {
            self.security.http_only += 1;
        } else {
            self.security.not_http_only += 1;
        }
        match cookie.same_site {
            SameSite::Strict => self.security.same_site_strict += 1,
            SameSite::Lax => self.security.same_site_lax += 1,
            SameSite::NoRestriction => self.security.same_site_none += 1,
            SameSite::Unspecified => self.security.same_site_unspecified += 1,
        }
        if let Some(idx) = combination_index(cookie.secure, cookie.http_only, cookie.same_site) {
            self.security_combinations[idx].count += 1;
        }

        let bucket = ExpiryBucket::classify(cookie.expiration_date, now);
        self.expiry.record(bucket);
        match bucket {
            ExpiryBucket::Lt7d => {
                *self.expiring_soon_by_domain.entry(domain.to_string()).or_insert(0) += 1;
            }
            ExpiryBucket::Expired => {
                *self.expired_by_domain.entry(domain.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }
}

/// Output of one cookie jar pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieScan {
    pub by_domain: HashMap<String, CookieAggregate>,
    pub statistics: CookieStatistics,
}

/// Registrable domain of a cookie: leading dot stripped, lowercased
pub fn cookie_domain(raw: &str) -> String {
    let raw = raw.trim();
    raw.strip_prefix('.').unwrap_or(raw).to_lowercase()
}

/// Groups every cookie in the jar by domain and classifies it
#[derive(Debug, Clone, Copy)]
pub struct CookieSampler {
    now: f64,
}

impl CookieSampler {
    /// Sampler whose expiry reference is the wall clock
    pub fn new() -> Self {
        Self::at(chrono::Utc::now().timestamp_millis() as f64 / 1000.0)
    }

    /// Sampler with a fixed reference time (Unix seconds)
    pub fn at(now: f64) -> Self {
        Self { now }
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Enumerate the host's cookie jar once and aggregate it
    pub fn sample_all(&self, host: &dyn BrowserHost) -> Result<CookieScan, HostError> {
        let cookies = host.enumerate_all_cookies()?;
        let scan = self.aggregate(&cookies);
        info!(
            action = "complete",
            component = "cookie_sampler",
            cookie_count = cookies.len(),
            domain_count = scan.by_domain.len(),
            "Cookie jar sampled"
        );
        Ok(scan)
    }

    /// Aggregate an already enumerated cookie list
    pub fn aggregate(&self, cookies: &[Cookie]) -> CookieScan {
        let mut scan = CookieScan::default();
        for cookie in cookies {
            let domain = cookie_domain(&cookie.domain);
            if domain.is_empty() {
                continue;
            }
            let size = (cookie.name.len() + cookie.value.len()) as u64;

            let entry = scan.by_domain.entry(domain.clone()).or_default();
            entry.count += 1;
            entry.size += size;

            scan.statistics.record(&domain, cookie, size, self.now);
        }
        scan
    }
}

impl Default for CookieSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: f64 = 1_700_000_000.0;

    fn cookie(name: &str, value: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: "/".into(),
            secure: true,
            http_only: false,
            same_site: SameSite::Lax,
            expiration_date: None,
        }
    }

    #[test]
    fn test_expiry_classification() {
        assert_eq!(ExpiryBucket::classify(None, NOW), ExpiryBucket::NoExpiry);
        assert_eq!(ExpiryBucket::classify(Some(NOW - 1.0), NOW), ExpiryBucket::Expired);
        assert_eq!(ExpiryBucket::classify(Some(NOW + DAY_SECS), NOW), ExpiryBucket::Lt7d);
        assert_eq!(ExpiryBucket::classify(Some(NOW + 7.0 * DAY_SECS), NOW), ExpiryBucket::Lt7d);
        assert_eq!(ExpiryBucket::classify(Some(NOW + 20.0 * DAY_SECS), NOW), ExpiryBucket::Lt30d);
        assert_eq!(ExpiryBucket::classify(Some(NOW + 90.0 * DAY_SECS), NOW), ExpiryBucket::Mid);
        assert_eq!(ExpiryBucket::classify(Some(NOW + 180.0 * DAY_SECS), NOW), ExpiryBucket::Gt180d);
    }

    #[test]
    fn test_grouping_strips_leading_dot() {
        let cookies = vec![
            cookie("a", "123456789", ".shop.test"),
            cookie("bb", "x".repeat(18).as_str(), "shop.test"),
            cookie("ccc", "y".repeat(27).as_str(), "Shop.Test"),
        ];
        let scan = CookieSampler::at(NOW).aggregate(&cookies);
        assert_eq!(scan.by_domain.len(), 1);
        assert_eq!(
            scan.by_domain["shop.test"],
            CookieAggregate { count: 3, size: 60 }
        );
    }

    #[test]
    fn test_empty_domain_is_skipped() {
        let scan = CookieSampler::at(NOW).aggregate(&[cookie("a", "b", ".")]);
        assert!(scan.by_domain.is_empty());
        assert_eq!(scan.statistics.expiry.total(), 0);
    }

    #[test]
    fn test_security_and_expiry_statistics() {
        let mut insecure = cookie("t", "1", "ads.test");
        insecure.secure = false;
        insecure.same_site = SameSite::Unspecified;
        insecure.expiration_date = Some(NOW - 10.0);

        let mut soon = cookie("s", "2", "bank.test");
        soon.http_only = true;
        soon.same_site = SameSite::Strict;
        soon.expiration_date = Some(NOW + 3600.0);

        let scan = CookieSampler::at(NOW).aggregate(&[insecure, soon, cookie("p", "3", "bank.test")]);
        let stats = &scan.statistics;

        assert_eq!(stats.security.secure, 2);
        assert_eq!(stats.security.insecure, 1);
        assert_eq!(stats.security.http_only, 1);
        assert_eq!(stats.security.same_site_strict, 1);
        assert_eq!(stats.security.same_site_lax, 1);
        assert_eq!(stats.security.same_site_unspecified, 1);
        assert_eq!(stats.expiry.expired, 1);
        assert_eq!(stats.expiry.lt7d, 1);
        assert_eq!(stats.expiry.no_expiry, 1);
        assert_eq!(stats.expiring_soon_by_domain.get("bank.test"), Some(&1));
        assert_eq!(stats.expired_by_domain.get("ads.test"), Some(&1));
        assert_eq!(stats.insecure_by_domain.get("ads.test"), Some(&1));

        // The unspecified cookie stays out of the cross
        let crossed: u64 = stats.security_combinations.iter().map(|c| c.count).sum();
        assert_eq!(stats.security_combinations.len(), 12);
        assert_eq!(crossed, 2);
        let strict = stats
            .security_combinations
            .iter()
            .find(|c| c.secure && c.http_only && c.same_site == SameSite::Strict)
            .map(|c| c.count);
        assert_eq!(strict, Some(1));
    }
}
