use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use super::{BrowserHost, Capabilities, Cookie, DatabaseInfo, ExecutionContext, OriginView, SamplerFn};
use crate::cleanup::StorageCleaner;
use crate::common::errors::HostError;
use crate::sampler::origin::OriginSample;

/// One open origin captured in a snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotOrigin {
    pub url: String,
    /// Unreachable origins fail when sampled, like a tab closed mid-scan
    #[serde(default = "reachable")]
    pub reachable: bool,
    /// Makes sampling fail as if the host gave up waiting on the context
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub local: BTreeMap<String, String>,
    #[serde(default)]
    pub session: BTreeMap<String, String>,
    #[serde(default)]
    pub databases: Vec<DatabaseInfo>,
    #[serde(default)]
    pub caches: Vec<String>,
}

fn reachable() -> bool {
    true
}

impl Default for SnapshotOrigin {
    fn default() -> Self {
        Self {
            url: String::new(),
            reachable: true,
            timed_out: false,
            capabilities: Capabilities::default(),
            local: BTreeMap::new(),
            session: BTreeMap::new(),
            databases: Vec::new(),
            caches: Vec::new(),
        }
    }
}

impl OriginView for SnapshotOrigin {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn local_entries(&self) -> Vec<(String, String)> {
        self.local.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn session_entries(&self) -> Vec<(String, String)> {
        self.session.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    fn databases(&self) -> Vec<DatabaseInfo> {
        self.databases.clone()
    }

    fn cache_names(&self) -> Vec<String> {
        self.caches.clone()
    }
}

impl ExecutionContext for SnapshotOrigin {
    fn url(&self) -> &str {
        &self.url
    }

    fn run_sampler(&self, sampler: &SamplerFn<'_>) -> Result<OriginSample, HostError> {
        if !self.reachable {
            return Err(HostError::ContextUnreachable {
                origin: self.url.clone(),
                reason: "context closed".into(),
            });
        }
        if self.timed_out {
            return Err(HostError::TimedOut {
                origin: self.url.clone(),
            });
        }
        Ok(sampler(self))
    }
}

/// A browser host backed by a JSON snapshot of open origins and cookies
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SnapshotHost {
    #[serde(default)]
    pub origins: Vec<SnapshotOrigin>,
    #[serde(default)]
    pub cookies: Vec<Cookie>,
    /// Reference time in Unix seconds for cookie expiry; defaults to the wall clock
    #[serde(default)]
    pub now: Option<f64>,
    /// Makes cookie enumeration fail with this message
    #[serde(default)]
    pub cookie_jar_error: Option<String>,
    #[serde(skip)]
    cleared: Mutex<Vec<String>>,
}

impl SnapshotHost {
    pub fn new(origins: Vec<SnapshotOrigin>, cookies: Vec<Cookie>) -> Self {
        Self {
            origins,
            cookies,
            ..Self::default()
        }
    }

    /// Load a snapshot from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, HostError> {
        let contents = std::fs::read_to_string(path).map_err(|source| HostError::Snapshot {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| HostError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Domains cleared through this host, in call order
    pub fn cleared_domains(&self) -> Vec<String> {
        self.cleared.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl BrowserHost for SnapshotHost {
    fn list_open_origins(&self) -> Vec<Box<dyn ExecutionContext + '_>> {
        self.origins
            .iter()
            .map(|o| Box::new(o) as Box<dyn ExecutionContext + '_>)
            .collect()
    }

    fn enumerate_all_cookies(&self) -> Result<Vec<Cookie>, HostError> {
        match &self.cookie_jar_error {
            Some(message) => Err(HostError::CookieEnumeration(message.clone())),
            None => Ok(self.cookies.clone()),
        }
    }
}

impl StorageCleaner for SnapshotHost {
    fn clear_domain(&self, domain: &str) -> Result<(), HostError> {
        self.cleared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(domain.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SameSite;

    #[test]
    fn test_parse_minimal_snapshot() {
        let json = r#"{
            "origins": [{ "url": "https://a.example.com/", "local": { "k": "v" } }],
            "cookies": [{ "name": "sid", "value": "1", "domain": ".shop.test", "same_site": "Lax" }]
        }"#;
        let host: SnapshotHost = serde_json::from_str(json).unwrap();
        assert_eq!(host.origins.len(), 1);
        assert!(host.origins[0].reachable);
        assert!(host.origins[0].capabilities.structured_db);
        assert_eq!(host.cookies[0].path, "/");
        assert_eq!(host.cookies[0].same_site, SameSite::Lax);
        assert!(host.cookies[0].expiration_date.is_none());
    }

    #[test]
    fn test_unknown_same_site_is_unspecified() {
        let json = r#"{ "name": "a", "domain": "x.test", "same_site": "weird" }"#;
        let cookie: Cookie = serde_json::from_str(json).unwrap();
        assert_eq!(cookie.same_site, SameSite::Unspecified);
    }

    #[test]
    fn test_unreachable_origin_fails_to_sample() {
        let origin = SnapshotOrigin {
            url: "https://gone.test/".into(),
            reachable: false,
            ..SnapshotOrigin::default()
        };
        let result = origin.run_sampler(&|_view: &dyn OriginView| OriginSample::default());
        assert!(matches!(result, Err(HostError::ContextUnreachable { .. })));
    }

    #[test]
    fn test_timed_out_origin_fails_to_sample() {
        let json = r#"{ "url": "https://slow.test/", "timed_out": true }"#;
        let origin: SnapshotOrigin = serde_json::from_str(json).unwrap();
        assert!(origin.reachable);
        let result = origin.run_sampler(&|_view: &dyn OriginView| OriginSample::default());
        assert!(matches!(result, Err(HostError::TimedOut { .. })));
    }

    #[test]
    fn test_cookie_jar_error() {
        let host = SnapshotHost {
            cookie_jar_error: Some("permission denied".into()),
            ..SnapshotHost::default()
        };
        assert!(host.enumerate_all_cookies().is_err());
    }
}
