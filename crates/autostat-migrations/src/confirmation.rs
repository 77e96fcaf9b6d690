//! Operator confirmation gate for rollbacks

use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::sync::Mutex;

use crate::MigrationError;

/// Decides whether a rollback of `environment` may proceed
pub trait RollbackConfirmation: Send + Sync {
    fn confirm(&self, environment: &str) -> Result<bool, MigrationError>;
}

/// Phrase the operator must type to roll back `environment`
pub fn confirmation_phrase(environment: &str) -> String {
    format!("MIGRATE-DOWN-{}", environment.to_uppercase())
}

/// Gate for scheduled jobs and other unattended contexts: always proceeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl RollbackConfirmation for NonInteractive {
    fn confirm(&self, _environment: &str) -> Result<bool, MigrationError> {
        Ok(true)
    }
}

/// Prompts on `output` and reads one line from `input`.
/// Only the exact confirmation phrase proceeds.
pub struct InteractiveConfirmation<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R, W> InteractiveConfirmation<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    pub fn into_output(self) -> W {
        self.output
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl InteractiveConfirmation<BufReader<Stdin>, Stdout> {
    /// Prompt on the process terminal
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> RollbackConfirmation for InteractiveConfirmation<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn confirm(&self, environment: &str) -> Result<bool, MigrationError> {
        let phrase = confirmation_phrase(environment);

        {
            let mut out = self
                .output
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            writeln!(
                out,
                "\nWARNING: You are about to roll back all migrations in the {} environment!",
                environment
            )?;
            writeln!(out, "This will:")?;
            writeln!(out, "1. Drop all tables")?;
            writeln!(out, "2. Delete all data")?;
            writeln!(out, "3. Drop the migrations table")?;
            writeln!(out, "\nThis action cannot be undone!\n")?;
            write!(
                out,
                "Are you sure you want to proceed? Type \"{}\" to confirm: ",
                phrase
            )?;
            out.flush()?;
        }

        let mut answer = String::new();
        self.input
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .read_line(&mut answer)?;

        Ok(answer.trim_end_matches(['\r', '\n']) == phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(environment: &str, typed: &str) -> (bool, String) {
        let gate = InteractiveConfirmation::new(Cursor::new(typed.to_string()), Vec::new());
        let confirmed = gate.confirm(environment).unwrap();
        let prompt = String::from_utf8(gate.into_output()).unwrap();
        (confirmed, prompt)
    }

    #[test]
    fn test_phrase_embeds_upper_cased_environment() {
        assert_eq!(confirmation_phrase("dev"), "MIGRATE-DOWN-DEV");
        assert_eq!(confirmation_phrase("local"), "MIGRATE-DOWN-LOCAL");
    }

    #[test]
    fn test_exact_phrase_confirms() {
        let (confirmed, prompt) = ask("dev", "MIGRATE-DOWN-DEV\n");
        assert!(confirmed);
        assert!(prompt.contains("dev environment"));
        assert!(prompt.contains("MIGRATE-DOWN-DEV"));
    }

    #[test]
    fn test_windows_line_ending_confirms() {
        let (confirmed, _) = ask("dev", "MIGRATE-DOWN-DEV\r\n");
        assert!(confirmed);
    }

    #[test]
    fn test_other_answers_abort() {
        for typed in ["", "\n", "y\n", "MIGRATE-DOWN-dev\n", " MIGRATE-DOWN-DEV\n", "MIGRATE-DOWN-LOCAL\n"] {
            let (confirmed, _) = ask("dev", typed);
            assert!(!confirmed, "{:?} must not confirm", typed);
        }
    }

    #[test]
    fn test_non_interactive_always_confirms() {
        assert!(NonInteractive.confirm("dev").unwrap());
    }
}
