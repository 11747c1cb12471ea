//! Contracts for the browser host that owns the open origins and cookie jar.
//!
//! Nothing in this module touches a real browser: a host binding implements
//! [`BrowserHost`] and [`ExecutionContext`], and the inventory engine only
//! talks to those traits.

pub mod snapshot;

use serde::{Deserialize, Serialize};

use crate::common::errors::HostError;
use crate::sampler::origin::OriginSample;

pub use snapshot::SnapshotHost;

/// Optional storage APIs available in one execution context.
///
/// Decided once per context so the sampler never probes for APIs itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default = "enabled")]
    pub structured_db: bool,
    #[serde(default = "enabled")]
    pub cache_buckets: bool,
}

fn enabled() -> bool {
    true
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            structured_db: true,
            cache_buckets: true,
        }
    }
}

/// A structured database as listed by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    /// Declared size, when the host knows it
    #[serde(default)]
    pub size: Option<u64>,
}

/// Read access to one origin's storage, available inside [`ExecutionContext::run_sampler`]
pub trait OriginView {
    fn capabilities(&self) -> Capabilities;
    /// Persistent key/value entries
    fn local_entries(&self) -> Vec<(String, String)>;
    /// Session-scoped key/value entries
    fn session_entries(&self) -> Vec<(String, String)>;
    /// Only consulted when `capabilities().structured_db` is set
    fn databases(&self) -> Vec<DatabaseInfo>;
    /// Only consulted when `capabilities().cache_buckets` is set
    fn cache_names(&self) -> Vec<String>;
}

/// Sampling routine executed inside an origin
pub type SamplerFn<'a> = dyn Fn(&dyn OriginView) -> OriginSample + Sync + 'a;

/// A reachable per-origin handle (e.g. an open tab)
pub trait ExecutionContext: Send + Sync {
    /// URL currently loaded in the context
    fn url(&self) -> &str;

    /// Run `sampler` inside the origin. Fails if the context closed or timed out.
    fn run_sampler(&self, sampler: &SamplerFn<'_>) -> Result<OriginSample, HostError>;
}

impl<T: ExecutionContext + ?Sized> ExecutionContext for &T {
    fn url(&self) -> &str {
        (**self).url()
    }

    fn run_sampler(&self, sampler: &SamplerFn<'_>) -> Result<OriginSample, HostError> {
        (**self).run_sampler(sampler)
    }
}

/// SameSite attribute as reported by the cookie jar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSite {
    #[serde(alias = "Strict")]
    Strict,
    #[serde(alias = "Lax")]
    Lax,
    #[serde(rename = "no_restriction", alias = "none", alias = "None")]
    NoRestriction,
    #[default]
    #[serde(other)]
    Unspecified,
}

/// One cookie from the global cookie jar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    pub domain: String,
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: SameSite,
    /// Seconds since the Unix epoch; absent for session cookies
    #[serde(default)]
    pub expiration_date: Option<f64>,
}

fn root_path() -> String {
    "/".to_string()
}

/// The browser: open origins plus the global cookie jar
pub trait BrowserHost: Send + Sync {
    /// Zero or more reachable origin contexts, in host enumeration order
    fn list_open_origins(&self) -> Vec<Box<dyn ExecutionContext + '_>>;

    fn enumerate_all_cookies(&self) -> Result<Vec<Cookie>, HostError>;
}
