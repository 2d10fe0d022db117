//! Integration tests for hashsync

mod actualize_idempotence;
mod apply_roundtrip;
mod diff_scenarios;
mod incremental_equivalence;
mod output_roots;
mod storage_backends;
mod tree_determinism;
