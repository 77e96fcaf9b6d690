//! Entry point for unattended invocations (scheduled jobs, serverless handlers)

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::provider::ConnectionProvider;
use crate::runner::{Direction, MigrationRunner};

pub const DEFAULT_DIRECTION: &str = "up";
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Job payload; missing fields fall back to `up` / `dev`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationEvent {
    pub direction: Option<String>,
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResponse {
    pub status_code: u16,
    pub body: String,
}

impl MigrationResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Run the requested migration and shape the outcome as a response.
///
/// Unattended callers cannot answer a prompt, so `runner` should keep the
/// default non-interactive rollback gate.
pub async fn handle<P: ConnectionProvider>(
    runner: &MigrationRunner<P>,
    event: MigrationEvent,
) -> MigrationResponse {
    let environment = event
        .environment
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
    let direction = match event
        .direction
        .as_deref()
        .unwrap_or(DEFAULT_DIRECTION)
        .parse::<Direction>()
    {
        Ok(direction) => direction,
        Err(e) => {
            return MigrationResponse {
                status_code: 400,
                body: json!({ "message": "Invalid migration request", "error": e.to_string() })
                    .to_string(),
            }
        }
    };

    match runner.run(direction, &environment).await {
        Ok(summary) => MigrationResponse {
            status_code: 200,
            body: json!({
                "message": format!("Migration {} completed successfully", direction),
                "environment": environment,
                "summary": summary,
            })
            .to_string(),
        },
        Err(e) => {
            error!("Scheduled migration {} failed: {}", direction, e);
            MigrationResponse {
                status_code: 500,
                body: json!({ "message": "Migration failed", "error": e.to_string() })
                    .to_string(),
            }
        }
    }
}
