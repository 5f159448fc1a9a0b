//! Terminal prompts: conflict choices and confirmation.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::cli::colors::{ColorSupport, SyncStyles, styled};
use crate::diff::{LineKind, render_unified};
use crate::error::Result;
use crate::sync::{Choice, Conflict, ConflictResolver};

const MAX_ATTEMPTS: usize = 3;

/// Asks about each conflict on a terminal; unreadable or exhausted input
/// answers `skip`.
pub struct TerminalResolver<'a> {
    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
    colors: ColorSupport,
}

impl TerminalResolver<'static> {
    #[must_use]
    pub fn stdio(colors: ColorSupport) -> Self {
        Self::new(io::stdin().lock(), io::stderr(), colors)
    }
}

impl<'a> TerminalResolver<'a> {
    pub fn new(input: impl BufRead + 'a, output: impl Write + 'a, colors: ColorSupport) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            colors,
        }
    }

    fn show(&mut self, conflict: &Conflict) -> io::Result<()> {
        let name = styled(&conflict.name, |s| SyncStyles::skill_name(s), self.colors);
        writeln!(self.output, "\nConflict in {name} ({})", conflict.kind)?;
        for line in render_unified(&conflict.hunks).lines() {
            let line = if line.starts_with("@@") {
                styled(line, |s| SyncStyles::hunk_header(s), self.colors)
            } else if line.starts_with('+') {
                styled(line, |s| SyncStyles::diff_line(s, LineKind::Added), self.colors)
            } else if line.starts_with('-') {
                styled(line, |s| SyncStyles::diff_line(s, LineKind::Removed), self.colors)
            } else {
                line.to_string()
            };
            writeln!(self.output, "{line}")?;
        }
        Ok(())
    }

    fn ask(&mut self) -> io::Result<Option<Choice>> {
        for _ in 0..MAX_ATTEMPTS {
            write!(
                self.output,
                "[s]ource / [t]arget / [m]erge / s[k]ip (default skip): "
            )?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match line.parse::<Choice>() {
                Ok(choice) => return Ok(Some(choice)),
                Err(err) => writeln!(self.output, "{err}")?,
            }
        }
        Ok(None)
    }
}

impl ConflictResolver for TerminalResolver<'_> {
    fn resolve(&mut self, conflict: &Conflict) -> Choice {
        let answer = self.show(conflict).and_then(|()| self.ask());
        match answer {
            Ok(Some(choice)) => choice,
            Ok(None) => Choice::Skip,
            Err(err) => {
                tracing::warn!(error = %err, "conflict prompt failed, skipping");
                Choice::Skip
            }
        }
    }
}

/// Ask a yes/no question when stdin is a terminal; otherwise proceed.
pub fn confirm(question: &str) -> Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Ok(true);
    }
    confirm_with(question, stdin.lock(), io::stderr())
}

pub fn confirm_with(question: &str, mut input: impl BufRead, mut output: impl Write) -> Result<bool> {
    write!(output, "{question} [y/N]: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}
