//! Execution engine: run one script and classify the outcome.

use crate::manifest::DeploymentUnit;
use crate::session::Session;
use crate::types::DeployStatus;

/// Execute `script` for `unit`. Never propagates an error: a failing script
/// yields [`DeployStatus::Failed`] so the rest of the run is unaffected.
pub fn execute(unit: &DeploymentUnit, script: &str, session: &mut dyn Session) -> DeployStatus {
    tracing::info!("Executing SQL from {}...", unit.name);
    match session.execute_script(script) {
        Ok(results) => {
            let rendered = serde_json::to_string(&results).unwrap_or_default();
            tracing::info!("Execution results: {rendered}");
            tracing::info!("Successfully deployed {}", unit.name);
            DeployStatus::Deployed
        }
        Err(e) => {
            tracing::error!("Execution failed for {}: {e}", unit.name);
            DeployStatus::Failed
        }
    }
}
