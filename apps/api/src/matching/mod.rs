// Match Generation Engine: candidate × client pairings, role-flagged and sorted by commute.
// Commute minutes come only from the commute cache and the distance resolver.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod source;
