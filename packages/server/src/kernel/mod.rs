//! Kernel module - server infrastructure and dependencies.

pub mod cache;
pub mod deps;
pub mod memory_cache;
pub mod redis_cache;
pub mod scheduled_tasks;
pub mod single_flight;

pub use cache::{CacheError, CacheResult, CacheStore, CacheStoreExt};
pub use deps::ServerDeps;
pub use memory_cache::MemoryCache;
pub use redis_cache::RedisCache;
pub use scheduled_tasks::start_scheduler;
pub use single_flight::{FlightError, SingleFlight};
