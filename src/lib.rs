//! # OriginScope
//!
//! Per-origin browser storage inventory.
//!
//! OriginScope samples every open origin's LocalStorage, SessionStorage,
//! IndexedDB and Cache Storage, reads the global cookie jar, merges the
//! results into one record per hostname and derives storage analytics:
//!
//! - **Domain filtering**: whitelist / blacklist rules with `*.suffix` wildcards
//! - **Parallel collection**: one sampling task per origin plus the cookie scan
//! - **Analytics**: size distributions, concentration curve, cookie hygiene, data quality
//! - **Selective cleanup**: clear every domain the filter does not protect

pub mod cleanup;
pub mod cli;
pub mod common;
pub mod filter;
pub mod host;
pub mod inventory;
pub mod sampler;
