pub mod hostname;
pub mod policy;
pub mod rules;

pub use hostname::{is_restricted_url, is_scannable_url, normalize};
pub use policy::{
    FilterMode, FilterPolicy, FilterSettings, MemorySettingsStore, RuleList, SettingsStore,
    TomlSettingsStore,
};
pub use rules::matches;
