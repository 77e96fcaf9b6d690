use std::io::{IsTerminal, Read};
use std::path::PathBuf;

use autostat_database::EnvironmentConnectionProvider;
use autostat_migrations::job::{self, MigrationEvent};
use autostat_migrations::{InteractiveConfirmation, MigrationRunner};
use clap::Args;

/// Run a migration from a JSON event, the way a scheduled job does
#[derive(Args)]
pub struct JobCommand {
    /// Event payload such as `{"direction":"up","environment":"prod"}`; read from stdin when omitted
    #[arg(long)]
    pub event: Option<String>,

    /// Directory holding the environment configuration files
    #[arg(long, env = "AUTOSTAT_CONFIG_DIR", default_value = "config")]
    pub config_dir: PathBuf,
}

impl JobCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let payload = match self.event {
            Some(payload) => payload,
            None => {
                let mut payload = String::new();
                std::io::stdin().read_to_string(&mut payload)?;
                payload
            }
        };
        let event: MigrationEvent = if payload.trim().is_empty() {
            MigrationEvent::default()
        } else {
            serde_json::from_str(&payload)?
        };

        let mut runner = MigrationRunner::new(EnvironmentConnectionProvider::new(&self.config_dir));
        // A rollback started from a shell still asks for the phrase
        if std::io::stdin().is_terminal() {
            runner = runner.with_confirmation(InteractiveConfirmation::stdio());
        }
        let rt = tokio::runtime::Runtime::new()?;
        let response = rt.block_on(job::handle(&runner, event));

        println!("{}", serde_json::to_string(&response)?);
        if response.is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Migration job failed with status {}",
                response.status_code
            ))
        }
    }
}
