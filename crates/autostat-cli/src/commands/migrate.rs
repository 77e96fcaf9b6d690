use std::io::IsTerminal;
use std::path::PathBuf;

use autostat_database::EnvironmentConnectionProvider;
use autostat_migrations::{
    Direction, InteractiveConfirmation, MigrationError, MigrationRunner, MigrationSummary,
};
use clap::Args;
use colored::Colorize;
use tracing::debug;

#[derive(Args)]
pub struct MigrateCommand {
    /// Migration direction: up or down
    #[arg(value_parser = parse_direction)]
    pub direction: Direction,

    /// Target environment; selects `<config-dir>/<environment>.env.json`
    #[arg(default_value = "local")]
    pub environment: String,

    /// Directory holding the environment configuration files
    #[arg(long, env = "AUTOSTAT_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Skip the rollback confirmation prompt; refused when stdin is a terminal
    #[arg(long, env = "AUTOSTAT_NON_INTERACTIVE")]
    pub non_interactive: bool,
}

fn parse_direction(value: &str) -> Result<Direction, String> {
    value.parse().map_err(|e: MigrationError| e.to_string())
}

impl MigrateCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        println!(
            "{} {} {} {}",
            "Running migrations".bright_white().bold(),
            self.direction.to_string().bright_cyan().bold(),
            "in".bright_white(),
            self.environment.bright_cyan().bold()
        );

        debug!("Using configuration directory {}", self.config_dir.display());
        let provider = EnvironmentConnectionProvider::new(&self.config_dir);
        let mut runner = MigrationRunner::new(provider);
        let stdin_is_terminal = std::io::stdin().is_terminal();
        if self.direction == Direction::Down
            && super::rollback_needs_prompt(self.non_interactive, stdin_is_terminal)?
        {
            runner = runner.with_confirmation(InteractiveConfirmation::stdio());
        }

        let rt = tokio::runtime::Runtime::new()?;
        match rt.block_on(runner.run(self.direction, &self.environment)) {
            Ok(summary) => {
                print_summary(&summary);
                Ok(())
            }
            Err(e) => {
                eprintln!();
                eprintln!("{} {}", "✗ Migration failed:".bright_red().bold(), e);
                if let Some(unit) = e.failed_unit() {
                    eprintln!("{} {}", "  Failing unit:".bright_white(), unit.bright_yellow());
                }
                eprintln!(
                    "{}",
                    "  No partial change was committed.".bright_white()
                );
                Err(e.into())
            }
        }
    }
}

fn print_summary(summary: &MigrationSummary) {
    println!();
    if summary.is_cancelled() {
        println!(
            "{}",
            "Rollback cancelled. Nothing was changed.".bright_yellow().bold()
        );
        return;
    }

    let verb = match summary.direction {
        Direction::Up => "Applied",
        Direction::Down => "Rolled back",
    };
    for name in &summary.applied {
        println!("  {} {} {}", "✓".bright_green(), verb, name);
    }
    for name in &summary.skipped {
        println!("  {} Skipped {}", "-".bright_black(), name.bright_black());
    }
    for name in &summary.orphaned {
        println!(
            "  {} Ledger entry {} has no matching unit",
            "!".bright_yellow(),
            name.bright_yellow()
        );
    }
    if summary.ledger_dropped {
        println!("  {} Dropped the migrations ledger", "✓".bright_green());
    }

    println!();
    println!(
        "{} {} {} {}",
        "✅ Migrations".bright_green().bold(),
        summary.direction.to_string().bright_green().bold(),
        "completed for".bright_green(),
        summary.environment.bright_cyan().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        migrate: MigrateCommand,
    }

    #[test]
    fn test_defaults_to_local_environment() {
        let harness = Harness::try_parse_from(["autostat", "up"]).unwrap();
        assert_eq!(harness.migrate.direction, Direction::Up);
        assert_eq!(harness.migrate.environment, "local");
    }

    #[test]
    fn test_direction_is_case_insensitive() {
        let harness = Harness::try_parse_from(["autostat", "DOWN", "staging"]).unwrap();
        assert_eq!(harness.migrate.direction, Direction::Down);
        assert_eq!(harness.migrate.environment, "staging");
    }

    #[test]
    fn test_rejects_unknown_direction() {
        assert!(Harness::try_parse_from(["autostat", "sideways"]).is_err());
    }
}
