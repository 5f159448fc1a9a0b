//! Core skill types and logic

pub mod frontmatter;
pub mod platform;
pub mod scope;
pub mod skill;
pub mod validation;

pub use platform::{Platform, skills_dir};
pub use scope::Scope;
pub use skill::{ParseWarning, Skill, SkillOrigin, SkillType, normalize_content};
pub use validation::{ValidationWarning, slugify, validate_metadata, validate_name};
