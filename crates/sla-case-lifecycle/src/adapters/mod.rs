//! Adapters layer (Hexagonal Architecture)
//!
//! Concrete implementations of the outbound ports.

mod bus_notifier;
mod clock;
pub(crate) mod memory_store;
#[cfg(feature = "rocksdb")]
mod rocksdb_store;
mod user_directory;

pub use bus_notifier::BusNotificationSender;
pub use clock::{ManualClock, SystemClock};
pub use memory_store::InMemoryCaseStore;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbCaseStore, RocksDbConfig, CF_CASES, CF_CASE_INDEX};
pub use user_directory::InMemoryUserDirectory;
