// Role Normalizer: free-text job titles → closed, versioned taxonomy.
// Pure code only; the taxonomy is injected through `AppState` so it can be swapped in tests.

pub mod handlers;
pub mod normalizer;
pub mod taxonomy;

pub use taxonomy::RoleTaxonomy;
