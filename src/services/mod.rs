// Service exports
pub mod appwrite;
pub mod cache;
pub mod memory;
pub mod postgres;
pub mod store;

pub use appwrite::{AppwriteCollections, AppwriteError, AppwriteStore};
pub use cache::{CacheError, CacheKey, CacheManager};
pub use memory::InMemoryStore;
pub use postgres::{PostgresError, PostgresStore};
pub use store::{DecisionStore, StoreError};
