pub mod job;
pub mod migrate;
pub mod status;

pub use job::JobCommand;
pub use migrate::MigrateCommand;
pub use status::StatusCommand;

/// Whether a rollback has to be confirmed at the prompt.
///
/// The prompt may only be skipped when stdin is not a terminal, so an operator
/// sitting at a shell always types the confirmation phrase.
pub fn rollback_needs_prompt(
    non_interactive: bool,
    stdin_is_terminal: bool,
) -> anyhow::Result<bool> {
    match (non_interactive, stdin_is_terminal) {
        (true, true) => Err(anyhow::anyhow!(
            "--non-interactive is only accepted when stdin is not a terminal"
        )),
        (true, false) => Ok(false),
        (false, _) => Ok(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_cannot_skip_rollback_prompt() {
        assert!(rollback_needs_prompt(true, true).is_err());
        assert!(rollback_needs_prompt(false, true).unwrap());
    }

    #[test]
    fn test_unattended_run_may_skip_rollback_prompt() {
        assert!(!rollback_needs_prompt(true, false).unwrap());
        assert!(rollback_needs_prompt(false, false).unwrap());
    }
}
