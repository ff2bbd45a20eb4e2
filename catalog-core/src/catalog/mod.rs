//! Catalog writes: idempotent file upserts, deletion reconciliation, and the
//! hand-off to the move tracker.

mod classify;
mod writer;

pub use classify::classify_extension;
pub use writer::{CatalogWriter, WriteOutcome};
