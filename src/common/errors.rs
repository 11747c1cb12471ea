use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by host collaborators (open contexts, cookie jar, snapshots).
#[derive(Debug, Error)]
pub enum HostError {
    /// The execution context closed or could not be reached
    #[error("origin '{origin}' is unreachable: {reason}")]
    ContextUnreachable { origin: String, reason: String },

    /// The host boundary gave up waiting on the context
    #[error("origin '{origin}' timed out")]
    TimedOut { origin: String },

    /// The global cookie listing failed
    #[error("cookie enumeration failed: {0}")]
    CookieEnumeration(String),

    /// A host-side cleanup call failed
    #[error("failed to clear '{domain}': {reason}")]
    ClearFailed { domain: String, reason: String },

    /// Snapshot file could not be read
    #[error("failed to read snapshot '{}': {source}", path.display())]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Snapshot file is not valid JSON
    #[error("failed to parse snapshot '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Errors surfaced by the inventory engine and the filter settings layer.
///
/// Origin-level failures never show up here: the coordinator recovers them
/// locally. Only cycle-level and settings-level problems reach the caller.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Cookies are a primary data source, so their failure aborts the cycle
    #[error("cookie scan failed")]
    CookieScan(#[source] HostError),

    /// Filter settings could not be read or written
    #[error("settings error in '{}': {message}", path.display())]
    Settings { path: PathBuf, message: String },

    /// The per-origin sampling threads could not be started
    #[error("failed to start sampling workers")]
    WorkerPool(#[source] rayon::ThreadPoolBuildError),

    #[error("settings I/O error at '{}'", path.display())]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type InventoryResult<T> = Result<T, InventoryError>;
