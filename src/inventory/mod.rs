pub mod collector;
pub mod record;
pub mod stats;

pub use collector::{merge, sort_by_total_size, CollectionCoordinator, Inventory};
pub use record::{DomainRecord, KeyValueMetric, StorageClass, StorageClassMetric};
pub use stats::{Statistics, StatisticsEngine};
