use std::path::PathBuf;

use autostat_database::EnvironmentConnectionProvider;
use autostat_migrations::MigrationRunner;
use clap::Args;
use colored::Colorize;

#[derive(Args)]
pub struct StatusCommand {
    /// Target environment
    #[arg(default_value = "local")]
    pub environment: String,

    /// Directory holding the environment configuration files
    #[arg(long, env = "AUTOSTAT_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,

    /// Print the status as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let runner = MigrationRunner::new(EnvironmentConnectionProvider::new(&self.config_dir));

        let rt = tokio::runtime::Runtime::new()?;
        let units = rt.block_on(runner.status(&self.environment))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&units)?);
            return Ok(());
        }

        println!(
            "{} {}",
            "Migration status for".bright_white().bold(),
            self.environment.bright_cyan().bold()
        );
        println!();
        for unit in &units {
            match unit.applied_at {
                Some(applied_at) => println!(
                    "  {} {} {}",
                    "✓".bright_green(),
                    unit.name,
                    format!("(applied {})", applied_at.to_rfc3339()).bright_black()
                ),
                None => println!(
                    "  {} {} {}",
                    "○".bright_yellow(),
                    unit.name,
                    "(pending)".bright_yellow()
                ),
            }
        }

        let pending = units.iter().filter(|unit| !unit.is_applied()).count();
        println!();
        println!(
            "{} applied, {} pending",
            (units.len() - pending).to_string().bright_green().bold(),
            pending.to_string().bright_yellow().bold()
        );
        Ok(())
    }
}
