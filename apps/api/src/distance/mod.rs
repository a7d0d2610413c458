// Distance Resolver: commute minutes for postcode pairs from the Distance Matrix API.
// There is exactly one provider and one client. Do not add fallbacks or estimators here.

pub mod batching;
pub mod client;
pub mod error;
pub mod rate_limit;
pub mod resolver;

#[cfg(test)]
pub mod testing;

pub use client::DistanceMatrixClient;
pub use error::DistanceError;
pub use resolver::DistanceResolver;
