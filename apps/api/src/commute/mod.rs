// Commute Cache: the only shared mutable state in the match engine.

pub mod cache;
pub mod handlers;
pub mod pg_store;
pub mod postcode;
pub mod redis_store;

pub use cache::{CommuteCache, CommuteStore};
