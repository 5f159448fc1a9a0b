//! Path safety checks.

pub mod path_policy;

pub use path_policy::{PathPolicyViolation, is_under_root, normalize_path, safe_join};
