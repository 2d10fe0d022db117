//! Property-based tests for hashsync

mod determinism;
mod diff_roundtrip;
