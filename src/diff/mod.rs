//! Tree differences
//!
//! Comparing two hashed trees yields three disjoint path sets: created,
//! deleted and changed. Unchanged subtrees are skipped on hash equality.

pub mod collector;
pub mod comparator;

pub use collector::TreeDifferenceCollector;
pub use comparator::TreeComparator;
