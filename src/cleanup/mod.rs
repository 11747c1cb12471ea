//! Selective per-domain cleanup.
//!
//! The filter policy doubles as a protection list here: a domain the policy
//! blocks from the inventory is never handed to the cleaner.

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use crate::common::errors::HostError;
use crate::common::format;
use crate::filter::FilterPolicy;
use crate::inventory::DomainRecord;

/// Host capability that wipes every storage class of one domain
pub trait StorageCleaner: Send + Sync {
    fn clear_domain(&self, domain: &str) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanMode {
    /// Report what would be cleared
    DryRun,
    Execute,
}

impl std::fmt::Display for CleanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CleanMode::DryRun => write!(f, "dry_run"),
            CleanMode::Execute => write!(f, "execute"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedClean {
    pub domain: String,
    pub error: String,
}

/// Report from a clean run
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub mode: CleanMode,
    pub session_id: String,
    /// Cleared, or would be cleared in dry-run mode
    pub cleared: Vec<String>,
    /// Protected by the filter policy
    pub skipped: Vec<String>,
    pub failed: Vec<FailedClean>,
    pub bytes_freed: u64,
}

/// Clear each domain in order, skipping the ones the policy blocks.
///
/// A failing domain is recorded and the run continues.
pub fn clean_domains(
    records: &[DomainRecord],
    policy: &FilterPolicy,
    cleaner: &dyn StorageCleaner,
    mode: CleanMode,
    show_progress: bool,
) -> CleanReport {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(
        action = "start",
        component = "cleanup",
        mode = %mode,
        session_id = %session_id,
        domains = records.len(),
        "Starting selective cleanup"
    );

    let pb = if show_progress && mode == CleanMode::Execute {
        let pb = ProgressBar::new(records.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.red} [{bar:40.red/blue}] {pos}/{len} Clearing... {msg}")
        {
            pb.set_style(style.progress_chars("━━░"));
        }
        Some(pb)
    } else {
        None
    };

    let mut report = CleanReport {
        mode,
        session_id,
        cleared: Vec::new(),
        skipped: Vec::new(),
        failed: Vec::new(),
        bytes_freed: 0,
    };

    for record in records {
        if let Some(ref pb) = pb {
            pb.set_message(format::truncate_host(&record.domain, 40));
        }

        if policy.is_blocked(&record.domain) {
            report.skipped.push(record.domain.clone());
        } else {
            match mode {
                CleanMode::DryRun => {
                    report.cleared.push(record.domain.clone());
                    report.bytes_freed += record.total_size();
                }
                CleanMode::Execute => match cleaner.clear_domain(&record.domain) {
                    Ok(()) => {
                        report.cleared.push(record.domain.clone());
                        report.bytes_freed += record.total_size();
                    }
                    Err(e) => {
                        warn!(
                            action = "fail",
                            component = "cleanup",
                            domain = %record.domain,
                            error = %e,
                            "Failed to clear domain"
                        );
                        report.failed.push(FailedClean {
                            domain: record.domain.clone(),
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(ref pb) = pb {
        pb.finish_and_clear();
    }

    info!(
        action = "complete",
        component = "cleanup",
        cleared = report.cleared.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        bytes_freed = report.bytes_freed,
        "Selective cleanup completed"
    );

    report
}
