//! E2E test suite entry point.

mod backup_workflow;
mod sync_workflow;
