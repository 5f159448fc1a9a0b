//! Skill synchronization between platforms.
//!
//! The flow is: parse source tiers and the target tier, [`plan`] an action
//! per name, let a [`ConflictResolver`] answer deferred conflicts, then
//! hand the plan to the [`Executor`].

pub mod cancel;
pub mod conflict;
pub mod engine;
pub mod executor;
pub mod planner;
pub mod resolver;
pub mod spec;
pub mod strategy;

pub use cancel::{CancelFlag, cancel_on_ctrl_c};
pub use conflict::{Conflict, ConflictKind, detect};
pub use engine::{PreparedSync, SyncEngine, SyncOptions};
pub use executor::{Executor, SkillResult, SyncResult};
pub use planner::{Destination, Plan, PlanItem, SyncAction, plan};
pub use resolver::{Choice, ConflictResolver, ScriptedResolver};
pub use spec::{SyncSpec, validate_endpoints};
pub use strategy::Strategy;
