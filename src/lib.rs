//! skillsync: keep AI coding assistant skills in sync across Claude Code,
//! Cursor and Codex.
//!
//! The library is split the same way a sync flows: [`parser`] reads skill
//! trees into [`core::Skill`]s, [`sync`] plans and applies changes using
//! [`diff`], and [`backup`] snapshots target files before they change.

pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod core;
pub mod diff;
pub mod error;
pub mod parser;
pub mod security;
pub mod sync;
pub mod test_utils;
pub mod utils;

pub use error::{Result, SkillSyncError};
