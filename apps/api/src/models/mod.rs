pub mod candidate;
pub mod client;
