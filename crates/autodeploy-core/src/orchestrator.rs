//! Deployment orchestrator.
//!
//! Walks the manifest in stored order and deploys every leaf whose status is
//! the pending sentinel. Each pending leaf ends the run as `deployed` or
//! `failed`; every other leaf is left exactly as loaded, which is what makes
//! repeated runs incremental. A failed object never stops or rolls back the
//! others.

use crate::engine;
use crate::manifest::{DeploymentUnit, Manifest};
use crate::script;
use crate::session::Session;
use crate::types::DeployStatus;
use std::path::Path;

// ---------------------------------------------------------------------------
// DeploymentReport
// ---------------------------------------------------------------------------

/// What one run did, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentReport {
    pub deployed: Vec<DeploymentUnit>,
    /// Scripts that ran and failed.
    pub failed: Vec<DeploymentUnit>,
    /// Scripts that were missing, empty or unreadable.
    pub missing_script: Vec<DeploymentUnit>,
    /// Leaves that were not pending.
    pub untouched: usize,
}

impl DeploymentReport {
    pub fn processed(&self) -> usize {
        self.deployed.len() + self.failed.len() + self.missing_script.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.missing_script.is_empty()
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn run(manifest: &mut Manifest, root: &Path, session: &mut dyn Session) -> DeploymentReport {
    let mut report = DeploymentReport::default();

    for schema in &mut manifest.schemas {
        for object_type in &mut schema.object_types {
            for object in &mut object_type.objects {
                if !object.status.is_pending() {
                    report.untouched += 1;
                    continue;
                }
                let unit = DeploymentUnit::new(&schema.name, &object_type.name, &object.name);
                object.status = deploy_unit(&unit, root, session, &mut report);
            }
        }
    }

    report
}

fn deploy_unit(
    unit: &DeploymentUnit,
    root: &Path,
    session: &mut dyn Session,
    report: &mut DeploymentReport,
) -> DeployStatus {
    let path = script::resolve(root, unit);
    tracing::info!(
        "Processing {}/{}/{}.sql - {}",
        unit.schema,
        unit.object_type,
        unit.name,
        DeployStatus::Pending
    );

    let sql = match script::read(&path) {
        Ok(Some(sql)) => sql,
        Ok(None) => {
            tracing::warn!("No SQL to deploy for {unit}; marking as failed");
            report.missing_script.push(unit.clone());
            return DeployStatus::Failed;
        }
        Err(e) => {
            tracing::error!("Cannot read {}: {e}", path.display());
            report.missing_script.push(unit.clone());
            return DeployStatus::Failed;
        }
    };

    let status = engine::execute(unit, &sql, session);
    match status {
        DeployStatus::Deployed => report.deployed.push(unit.clone()),
        _ => report.failed.push(unit.clone()),
    }
    status
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
