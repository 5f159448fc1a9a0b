//! Property test suite entry point.

mod diff_properties;
mod sync_invariants;
