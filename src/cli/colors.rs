//! Semantic colors for skillsync output.
//!
//! Every styled string goes through [`styled`] or [`with_color`] so that
//! `NO_COLOR`, piped output and `output.color: false` all yield plain text.

use std::io::IsTerminal;

use colored::{ColoredString, Colorize};

use crate::core::Scope;
use crate::diff::LineKind;
use crate::sync::SyncAction;

// ============================================================================
// Color Support Detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSupport {
    /// NO_COLOR set, TERM=dumb, piped output, or disabled in config
    None,
    Basic,
}

impl ColorSupport {
    /// Detect color support from environment and terminal capabilities.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_with(
            |key| std::env::var(key).ok(),
            std::io::stdout().is_terminal(),
        )
    }

    /// Detection with an injectable environment and TTY state.
    pub fn detect_with(env: impl Fn(&str) -> Option<String>, is_tty: bool) -> Self {
        // https://no-color.org/
        if env("NO_COLOR").is_some() {
            return Self::None;
        }
        if env("FORCE_COLOR").is_some() {
            return Self::Basic;
        }
        if !is_tty {
            return Self::None;
        }
        if env("TERM").is_some_and(|term| term == "dumb") {
            return Self::None;
        }
        Self::Basic
    }

    #[must_use]
    pub const fn has_color(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Make `colored` and `console` agree with this setting process-wide.
    pub fn apply(&self) {
        colored::control::set_override(self.has_color());
        console::set_colors_enabled(self.has_color());
    }
}

// ============================================================================
// Styles
// ============================================================================

pub struct SyncStyles;

impl SyncStyles {
    pub fn success<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().green()
    }

    pub fn error<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().red().bold()
    }

    pub fn warning<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().yellow()
    }

    pub fn muted<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().dimmed()
    }

    pub fn skill_name<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().bold()
    }

    pub fn path<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().underline()
    }

    pub fn scope<S: AsRef<str>>(text: S, scope: Scope) -> ColoredString {
        let text = text.as_ref();
        match scope {
            Scope::Repo => text.yellow(),
            Scope::User => text.magenta(),
            Scope::Admin | Scope::System => text.blue(),
            Scope::Plugin => text.cyan(),
            Scope::Builtin => text.dimmed(),
        }
    }

    pub fn action<S: AsRef<str>>(text: S, action: SyncAction) -> ColoredString {
        let text = text.as_ref();
        match action {
            SyncAction::Created => text.green(),
            SyncAction::Updated | SyncAction::Merged => text.cyan(),
            SyncAction::Deleted => text.red(),
            SyncAction::Conflict => text.yellow().bold(),
            SyncAction::Failed => text.red().bold(),
            SyncAction::Skipped => text.dimmed(),
        }
    }

    pub fn diff_line<S: AsRef<str>>(text: S, kind: LineKind) -> ColoredString {
        let text = text.as_ref();
        match kind {
            LineKind::Added => text.green(),
            LineKind::Removed => text.red(),
            LineKind::Context => text.normal(),
        }
    }

    pub fn hunk_header<S: AsRef<str>>(text: S) -> ColoredString {
        text.as_ref().cyan()
    }
}

/// Apply a style function only when colors are supported.
pub fn styled<S, F>(text: S, style_fn: F, support: ColorSupport) -> String
where
    S: AsRef<str>,
    F: FnOnce(&str) -> ColoredString,
{
    if support.has_color() {
        style_fn(text.as_ref()).to_string()
    } else {
        text.as_ref().to_string()
    }
}

/// Use `colored` when supported, `plain` otherwise.
pub fn with_color<S: AsRef<str>>(colored: ColoredString, plain: S, support: ColorSupport) -> String {
    if support.has_color() {
        colored.to_string()
    } else {
        plain.as_ref().to_string()
    }
}

// ============================================================================
// Formatting Helpers
// ============================================================================

pub fn format_action(action: SyncAction, support: ColorSupport) -> String {
    let label = format!("{:<8}", action.as_str());
    styled(&label, |s| SyncStyles::action(s, action), support)
}

pub fn format_scope(scope: Scope, support: ColorSupport) -> String {
    styled(scope.as_str(), |s| SyncStyles::scope(s, scope), support)
}

/// `✓` / `✗` / `!`
pub fn format_status(success: Option<bool>, support: ColorSupport) -> String {
    match success {
        Some(true) => with_color(SyncStyles::success("✓"), "✓", support),
        Some(false) => with_color(SyncStyles::error("✗"), "✗", support),
        None => with_color(SyncStyles::warning("!"), "!", support),
    }
}
