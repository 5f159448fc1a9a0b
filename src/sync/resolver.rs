//! Conflict resolution seam for the interactive strategy.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::conflict::Conflict;

/// A caller's decision for one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Choice {
    /// Write the source version
    UseSource,
    /// Leave the target as it is
    UseTarget,
    /// Write the two-way merge, markers included
    Merge,
    Skip,
}

impl Choice {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UseSource => "use-source",
            Self::UseTarget => "use-target",
            Self::Merge => "merge",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s" | "source" | "use-source" => Ok(Self::UseSource),
            "t" | "target" | "use-target" => Ok(Self::UseTarget),
            "m" | "merge" => Ok(Self::Merge),
            "k" | "skip" | "" => Ok(Self::Skip),
            other => Err(format!("unknown choice '{other}'")),
        }
    }
}

/// Supplies a [`Choice`] for each conflict under the interactive strategy.
pub trait ConflictResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Choice;
}

/// Plays back a fixed list of choices, then a default.
#[derive(Debug, Clone)]
pub struct ScriptedResolver {
    choices: VecDeque<Choice>,
    fallback: Choice,
    seen: Vec<String>,
}

impl ScriptedResolver {
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        Self {
            choices: choices.into_iter().collect(),
            fallback: Choice::Skip,
            seen: Vec::new(),
        }
    }

    /// Answer every conflict with `choice`.
    #[must_use]
    pub fn always(choice: Choice) -> Self {
        Self::new([]).with_fallback(choice)
    }

    #[must_use]
    pub const fn with_fallback(mut self, choice: Choice) -> Self {
        self.fallback = choice;
        self
    }

    /// Names of the conflicts asked about, in order.
    #[must_use]
    pub fn seen(&self) -> &[String] {
        &self.seen
    }
}

impl ConflictResolver for ScriptedResolver {
    fn resolve(&mut self, conflict: &Conflict) -> Choice {
        self.seen.push(conflict.name.clone());
        self.choices.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Platform, Scope, Skill};
    use crate::sync::conflict::detect;

    #[test]
    fn parse_choices() {
        assert_eq!("s".parse::<Choice>().unwrap(), Choice::UseSource);
        assert_eq!("use-target".parse::<Choice>().unwrap(), Choice::UseTarget);
        assert_eq!("".parse::<Choice>().unwrap(), Choice::Skip);
        assert!("x".parse::<Choice>().is_err());
    }

    #[test]
    fn scripted_resolver_plays_back_then_falls_back() {
        let a = Skill::new("a", Platform::Cursor, Scope::User).with_content("1");
        let b = Skill::new("a", Platform::Cursor, Scope::User).with_content("2");
        let conflict = detect(&a, &b);
        let mut resolver = ScriptedResolver::new([Choice::Merge]);
        assert_eq!(resolver.resolve(&conflict), Choice::Merge);
        assert_eq!(resolver.resolve(&conflict), Choice::Skip);
        assert_eq!(resolver.seen(), ["a", "a"]);
    }
}
