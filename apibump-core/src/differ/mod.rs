//! Diff engine for comparing two interface models.
//!
//! A differ turns the base and head [`Model`] of one domain into an ordered
//! list of [`Impact`]s:
//!
//! - **Symbol-level**: removed and added symbols, requiredness, return shape
//! - **Parameter-level**: parameters matched by name, then by position
//! - **Stable order**: removals, additions, then changes by name and position
//!
//! Differs are pure. Running one twice on the same inputs yields the same
//! impacts in the same order.

pub mod changes;
pub mod comparator;

use crate::model::Model;
use crate::severity::SeverityTable;

pub use changes::{sort_impacts, Impact, ImpactGroup, ImpactSummary};
pub use comparator::{MigrationDiffer, SignatureDiffer};

/// Compares two models of the same domain.
pub trait Differ: Send + Sync {
    /// Classify every difference between `old` and `new`.
    ///
    /// `domain` selects domain-scoped severity overrides in `rules`.
    fn diff(&self, old: &Model, new: &Model, rules: &SeverityTable, domain: &str) -> Vec<Impact>;
}
