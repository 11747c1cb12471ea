use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::record::DomainRecord;
use super::stats::{Statistics, StatisticsEngine};
use crate::common::errors::{HostError, InventoryError, InventoryResult};
use crate::filter::hostname;
use crate::host::{BrowserHost, ExecutionContext};
use crate::sampler::{CookieAggregate, CookieSampler, OriginSample, OriginSampler, SamplerOptions};

/// Result of one collection cycle
#[derive(Debug, Clone, Serialize)]
pub struct Inventory {
    /// Records sorted by total estimated size, largest first
    pub domains: Vec<DomainRecord>,
    pub stats: Statistics,
    /// Distinct hostnames a sampling task was launched for
    pub sampled_origins: usize,
    /// Hostnames whose sampling failed and contributed nothing
    pub failed_origins: Vec<String>,
    pub duration_secs: f64,
}

/// Fans sampling out over every open origin plus the cookie jar, then merges
pub struct CollectionCoordinator<'h> {
    host: &'h dyn BrowserHost,
    origin_sampler: OriginSampler,
    cookie_sampler: CookieSampler,
    engine: StatisticsEngine,
}

impl<'h> CollectionCoordinator<'h> {
    pub fn new(host: &'h dyn BrowserHost) -> Self {
        Self {
            host,
            origin_sampler: OriginSampler::default(),
            cookie_sampler: CookieSampler::new(),
            engine: StatisticsEngine::default(),
        }
    }

    pub fn with_sampler_options(mut self, options: SamplerOptions) -> Self {
        self.origin_sampler = OriginSampler::new(options);
        self
    }

    pub fn with_cookie_sampler(mut self, sampler: CookieSampler) -> Self {
        self.cookie_sampler = sampler;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.engine = StatisticsEngine::new(top_n);
        self
    }

    /// Run one collection cycle.
    ///
    /// A failed origin contributes nothing; a failed cookie scan fails the cycle.
    pub fn collect(&self) -> InventoryResult<Inventory> {
        let start = Instant::now();
        info!(action = "start", component = "collector", "Starting storage collection");

        let contexts = self.host.list_open_origins();
        let targets = dedup_by_hostname(&contexts);
        info!(
            action = "fan_out",
            component = "collector",
            open_contexts = contexts.len(),
            origins = targets.len(),
            "Sampling open origins"
        );

        // Sampling waits on the host, not the CPU: one worker per origin plus
        // one for the cookie jar, so no origin queues behind another.
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(targets.len() + 1)
            .thread_name(|idx| format!("originscope-sampler-{}", idx))
            .build()
            .map_err(InventoryError::WorkerPool)?;

        let (origin_results, cookie_result) = pool.install(|| {
            rayon::join(
                || sample_each(&targets, &self.origin_sampler),
                || self.cookie_sampler.sample_all(self.host),
            )
        });

        let cookie_scan = cookie_result.map_err(|e| {
            warn!(action = "fail", component = "collector", error = %e, "Cookie scan failed");
            InventoryError::CookieScan(e)
        })?;

        let mut samples = Vec::with_capacity(origin_results.len());
        let mut failed_origins = Vec::new();
        for (host, result) in origin_results {
            match result {
                Ok(sample) => samples.push((host, sample)),
                Err(e) => {
                    warn!(
                        action = "skip",
                        component = "origin_sampler",
                        domain = %host,
                        error = %e,
                        "Origin sampling failed, skipping"
                    );
                    failed_origins.push(host);
                }
            }
        }
        failed_origins.sort();

        let records = merge(samples, &cookie_scan.by_domain);
        let domains = sort_by_total_size(&records);
        let stats = self.engine.compute(&records, &cookie_scan.statistics);

        let duration = start.elapsed();
        info!(
            action = "complete",
            component = "collector",
            domains = domains.len(),
            failed_origins = failed_origins.len(),
            total_size = stats.total_size,
            duration_ms = duration.as_millis(),
            "Storage collection completed"
        );

        Ok(Inventory {
            domains,
            stats,
            sampled_origins: targets.len(),
            failed_origins,
            duration_secs: duration.as_secs_f64(),
        })
    }
}

/// One sampling target per hostname; a later context replaces an earlier one.
///
/// Contexts that share a hostname on different ports or schemes collapse into
/// a single sample, so storage only reachable through the replaced context is
/// never counted. This is an open design choice kept for compatibility, not
/// a correctness guarantee; revisit it if per-port inventories are needed.
fn dedup_by_hostname<'a>(
    contexts: &'a [Box<dyn ExecutionContext + 'a>],
) -> Vec<(String, &'a dyn ExecutionContext)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_host: HashMap<String, &'a dyn ExecutionContext> = HashMap::new();

    for ctx in contexts {
        let url = ctx.url();
        if !hostname::is_scannable_url(url) {
            debug!(action = "skip", component = "collector", url = url, "Not a scannable page");
            continue;
        }
        let host = hostname::normalize(url);
        if host.is_empty() {
            continue;
        }
        if by_host.insert(host.clone(), &**ctx).is_none() {
            order.push(host);
        } else {
            debug!(action = "dedup", component = "collector", domain = %host, "Replacing earlier context for hostname");
        }
    }

    order
        .into_iter()
        .filter_map(|host| by_host.remove(&host).map(|ctx| (host, ctx)))
        .collect()
}

/// Run one spawned task per target inside the current pool and wait for all
fn sample_each(
    targets: &[(String, &dyn ExecutionContext)],
    sampler: &OriginSampler,
) -> Vec<(String, Result<OriginSample, HostError>)> {
    let results = Mutex::new(Vec::with_capacity(targets.len()));
    rayon::scope(|scope| {
        for (host, ctx) in targets {
            let results = &results;
            let ctx: &dyn ExecutionContext = *ctx;
            scope.spawn(move |_| {
                let result = sampler.sample(ctx);
                results
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((host.clone(), result));
            });
        }
    });
    results.into_inner().unwrap_or_else(|e| e.into_inner())
}

/// Merge origin samples and cookie aggregates into one record per hostname.
///
/// Only additions are performed, so the result does not depend on input order.
pub fn merge<I>(samples: I, cookies: &HashMap<String, CookieAggregate>) -> HashMap<String, DomainRecord>
where
    I: IntoIterator<Item = (String, OriginSample)>,
{
    let mut records: HashMap<String, DomainRecord> = HashMap::new();

    for (host, sample) in samples {
        let mut partial = DomainRecord::new(host.clone());
        partial.add_origin_sample(&sample);
        records
            .entry(host.clone())
            .or_insert_with(|| DomainRecord::new(host))
            .merge(&partial);
    }

    for (domain, aggregate) in cookies {
        records
            .entry(domain.clone())
            .or_insert_with(|| DomainRecord::new(domain.clone()))
            .add_cookies(aggregate);
    }

    records
}

/// Records ordered by total estimated size, largest first, ties by name
pub fn sort_by_total_size(records: &HashMap<String, DomainRecord>) -> Vec<DomainRecord> {
    let mut domains: Vec<DomainRecord> = records.values().cloned().collect();
    domains.sort_by(|a, b| {
        b.total_size()
            .cmp(&a.total_size())
            .then_with(|| a.domain.cmp(&b.domain))
    });
    domains
}
