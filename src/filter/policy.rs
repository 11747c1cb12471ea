use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, warn};

use super::{hostname, rules};
use crate::common::errors::{InventoryError, InventoryResult};

/// How the domain lists are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Every domain is allowed
    #[default]
    Disabled,
    /// Only domains on the whitelist are allowed
    Whitelist,
    /// Everything except the blacklist is allowed
    Blacklist,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::Disabled => write!(f, "disabled"),
            FilterMode::Whitelist => write!(f, "whitelist"),
            FilterMode::Blacklist => write!(f, "blacklist"),
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" => Ok(FilterMode::Disabled),
            "whitelist" => Ok(FilterMode::Whitelist),
            "blacklist" => Ok(FilterMode::Blacklist),
            other => Err(format!("unknown filter mode '{}'", other)),
        }
    }
}

/// Which rule list an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleList {
    Whitelist,
    Blacklist,
}

/// Persisted filter settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl FilterSettings {
    /// Decide whether an operation on `url_or_host` may proceed.
    ///
    /// Fails open: a disabled filter or an input with no extractable host is
    /// always allowed.
    pub fn is_allowed(&self, url_or_host: &str) -> bool {
        if self.mode == FilterMode::Disabled {
            return true;
        }

        let domain = hostname::normalize(url_or_host);
        if domain.is_empty() {
            return true;
        }

        match self.mode {
            FilterMode::Whitelist => rules::matches(&domain, &self.whitelist),
            FilterMode::Blacklist => !rules::matches(&domain, &self.blacklist),
            FilterMode::Disabled => true,
        }
    }

    fn list_mut(&mut self, list: RuleList) -> &mut Vec<String> {
        match list {
            RuleList::Whitelist => &mut self.whitelist,
            RuleList::Blacklist => &mut self.blacklist,
        }
    }

    /// Add a rule, returning false if it was already present
    pub fn add_rule(&mut self, list: RuleList, rule: &str) -> bool {
        let rule = rule.trim().to_lowercase();
        if rule.is_empty() {
            return false;
        }
        let rules = self.list_mut(list);
        if rules.iter().any(|r| r.trim().eq_ignore_ascii_case(&rule)) {
            return false;
        }
        rules.push(rule);
        true
    }

    /// Remove a rule, returning false if it was not present
    pub fn remove_rule(&mut self, list: RuleList, rule: &str) -> bool {
        let rule = rule.trim().to_lowercase();
        let rules = self.list_mut(list);
        let before = rules.len();
        rules.retain(|r| !r.trim().eq_ignore_ascii_case(&rule));
        rules.len() != before
    }
}

/// Backing store for filter settings
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> InventoryResult<FilterSettings>;
    fn save(&self, settings: &FilterSettings) -> InventoryResult<()>;
}

/// Settings kept in a TOML file
#[derive(Debug, Clone)]
pub struct TomlSettingsStore {
    path: PathBuf,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for TomlSettingsStore {
    /// A missing file means nothing was ever saved, which is the default
    fn load(&self) -> InventoryResult<FilterSettings> {
        if !self.path.exists() {
            return Ok(FilterSettings::default());
        }
        let contents =
            std::fs::read_to_string(&self.path).map_err(|source| InventoryError::SettingsIo {
                path: self.path.clone(),
                source,
            })?;
        toml::from_str(&contents).map_err(|e| InventoryError::Settings {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn save(&self, settings: &FilterSettings) -> InventoryResult<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| InventoryError::SettingsIo {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let contents = toml::to_string_pretty(settings).map_err(|e| InventoryError::Settings {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, contents).map_err(|source| InventoryError::SettingsIo {
            path: self.path.clone(),
            source,
        })
    }
}

/// Settings held in memory, for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<FilterSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> InventoryResult<FilterSettings> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone())
    }

    fn save(&self, settings: &FilterSettings) -> InventoryResult<()> {
        *self.settings.lock().unwrap_or_else(|e| e.into_inner()) = settings.clone();
        Ok(())
    }
}

/// Domain filter with lazily loaded, cached settings.
///
/// The cache is either empty or a complete snapshot. Saving goes to the store
/// first and then drops the snapshot, so the next read reloads.
pub struct FilterPolicy {
    store: Box<dyn SettingsStore>,
    cached: RwLock<Option<Arc<FilterSettings>>>,
}

impl FilterPolicy {
    pub fn new(store: impl SettingsStore + 'static) -> Self {
        Self {
            store: Box::new(store),
            cached: RwLock::new(None),
        }
    }

    /// Current settings snapshot, loading from the store if needed.
    ///
    /// A load failure falls back to a disabled filter so nothing is blocked.
    pub fn load(&self) -> Arc<FilterSettings> {
        if let Some(settings) = self
            .cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
        {
            return Arc::clone(settings);
        }

        let settings = match self.store.load() {
            Ok(settings) => {
                debug!(
                    action = "load",
                    component = "filter_settings",
                    mode = %settings.mode,
                    whitelist = settings.whitelist.len(),
                    blacklist = settings.blacklist.len(),
                    "Loaded domain filter settings"
                );
                settings
            }
            Err(e) => {
                warn!(
                    action = "load",
                    component = "filter_settings",
                    error = %e,
                    "Failed to load filter settings, filtering disabled"
                );
                FilterSettings::default()
            }
        };

        let settings = Arc::new(settings);
        let mut cached = self.cached.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(cached.get_or_insert(settings))
    }

    /// Drop the cached snapshot
    pub fn invalidate(&self) {
        self.cached
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    pub fn is_allowed(&self, url_or_host: &str) -> bool {
        self.load().is_allowed(url_or_host)
    }

    pub fn is_blocked(&self, url_or_host: &str) -> bool {
        !self.is_allowed(url_or_host)
    }

    /// Copy of the current settings, fail-open like [`FilterPolicy::load`]
    pub fn settings(&self) -> FilterSettings {
        self.load().as_ref().clone()
    }

    /// Read the store directly, surfacing load errors.
    ///
    /// Edits must start from here: a read-modify-write on the fail-open
    /// fallback would overwrite the stored rules with an empty disabled filter.
    /// A successful read replaces the cached snapshot.
    pub fn try_settings(&self) -> InventoryResult<FilterSettings> {
        let settings = self.store.load()?;
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) =
            Some(Arc::new(settings.clone()));
        Ok(settings)
    }

    /// Write-through save. The cache is only cleared once the store accepted the write.
    pub fn save(&self, settings: &FilterSettings) -> InventoryResult<()> {
        self.store.save(settings)?;
        self.invalidate();
        Ok(())
    }
}

impl std::fmt::Debug for FilterPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cached
            .read()
            .map(|c| c.is_some())
            .unwrap_or(false);
        f.debug_struct("FilterPolicy")
            .field("cached", &cached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(mode: FilterMode, whitelist: &[&str], blacklist: &[&str]) -> FilterSettings {
        FilterSettings {
            mode,
            whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
            blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
        }
    }

    struct CountingStore {
        loads: Arc<AtomicUsize>,
        inner: MemorySettingsStore,
    }

    impl SettingsStore for CountingStore {
        fn load(&self) -> InventoryResult<FilterSettings> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load()
        }

        fn save(&self, settings: &FilterSettings) -> InventoryResult<()> {
            self.inner.save(settings)
        }
    }

    struct BrokenStore;

    impl SettingsStore for BrokenStore {
        fn load(&self) -> InventoryResult<FilterSettings> {
            Err(InventoryError::Settings {
                path: PathBuf::from("broken.toml"),
                message: "unreadable".into(),
            })
        }

        fn save(&self, _settings: &FilterSettings) -> InventoryResult<()> {
            Err(InventoryError::Settings {
                path: PathBuf::from("broken.toml"),
                message: "read-only".into(),
            })
        }
    }

    #[test]
    fn test_disabled_allows_everything() {
        let s = settings(FilterMode::Disabled, &[], &["example.com"]);
        assert!(s.is_allowed("https://example.com"));
    }

    #[test]
    fn test_whitelist_mode() {
        let s = settings(FilterMode::Whitelist, &["example.com"], &[]);
        assert!(s.is_allowed("https://sub.example.com/path"));
        assert!(!s.is_allowed("https://other.com"));
    }

    #[test]
    fn test_blacklist_mode() {
        let s = settings(FilterMode::Blacklist, &[], &["*.ads.net"]);
        assert!(!s.is_allowed("https://track.ads.net/p.gif"));
        assert!(s.is_allowed("https://example.com"));
    }

    #[test]
    fn test_unparseable_input_fails_open() {
        for mode in [FilterMode::Disabled, FilterMode::Whitelist, FilterMode::Blacklist] {
            let s = settings(mode, &["example.com"], &["example.com"]);
            assert!(s.is_allowed("not a url"), "mode {} should fail open", mode);
        }
    }

    #[test]
    fn test_add_and_remove_rules() {
        let mut s = FilterSettings::default();
        assert!(s.add_rule(RuleList::Whitelist, " Example.com "));
        assert!(!s.add_rule(RuleList::Whitelist, "example.com"));
        assert_eq!(s.whitelist, vec!["example.com".to_string()]);
        assert!(s.remove_rule(RuleList::Whitelist, "EXAMPLE.COM"));
        assert!(!s.remove_rule(RuleList::Whitelist, "example.com"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Whitelist".parse::<FilterMode>(), Ok(FilterMode::Whitelist));
        assert!("sometimes".parse::<FilterMode>().is_err());
    }

    #[test]
    fn test_policy_caches_until_invalidated() {
        let loads = Arc::new(AtomicUsize::new(0));
        let policy = FilterPolicy::new(CountingStore {
            loads: Arc::clone(&loads),
            inner: MemorySettingsStore::new(settings(FilterMode::Blacklist, &[], &["a.com"])),
        });

        assert!(policy.is_blocked("https://a.com"));
        assert!(policy.is_allowed("https://b.com"));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        policy.invalidate();
        assert!(policy.is_blocked("a.com"));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_save_is_write_through() {
        let policy = FilterPolicy::new(MemorySettingsStore::default());
        assert!(policy.is_allowed("https://other.com"));

        policy
            .save(&settings(FilterMode::Whitelist, &["example.com"], &[]))
            .unwrap();
        assert!(!policy.is_allowed("https://other.com"));
        assert_eq!(policy.settings().mode, FilterMode::Whitelist);
    }

    #[test]
    fn test_load_failure_falls_back_to_disabled() {
        let policy = FilterPolicy::new(BrokenStore);
        assert_eq!(policy.settings().mode, FilterMode::Disabled);
        assert!(policy.is_allowed("https://anything.example"));
    }

    #[test]
    fn test_try_settings_surfaces_load_failure() {
        let policy = FilterPolicy::new(BrokenStore);
        assert!(matches!(
            policy.try_settings(),
            Err(InventoryError::Settings { .. })
        ));
        // The fail-open read path is unaffected
        assert!(policy.is_allowed("https://anything.example"));
    }

    #[test]
    fn test_try_settings_refreshes_cache() {
        let loads = Arc::new(AtomicUsize::new(0));
        let policy = FilterPolicy::new(CountingStore {
            loads: Arc::clone(&loads),
            inner: MemorySettingsStore::new(settings(FilterMode::Blacklist, &[], &["a.com"])),
        });

        assert_eq!(policy.try_settings().unwrap().blacklist, vec!["a.com"]);
        assert!(policy.is_blocked("a.com"));
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_save_failure_is_propagated() {
        let policy = FilterPolicy::new(BrokenStore);
        let result = policy.save(&FilterSettings::default());
        assert!(matches!(result, Err(InventoryError::Settings { .. })));
    }
}
