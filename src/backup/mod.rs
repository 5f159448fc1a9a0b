//! Backup store: snapshots of target files taken before a sync mutates them.

pub mod index;
pub mod lock;
pub mod retention;
pub mod store;

pub use index::{BackupFile, BackupIndex, BackupMetadata, BackupRecord};
pub use lock::{LockInfo, StoreLock};
pub use retention::{CleanupOptions, parse_duration, select_for_cleanup};
pub use store::{BackupStore, FileProblem, ListFilter, VerifyReport, VerifyStatus};
