use crate::output::print_report;
use anyhow::Context;
use autodeploy_core::{
    branch,
    config::ConnectionsConfig,
    manifest::Manifest,
    orchestrator::{self, DeploymentReport},
    paths, session,
    types::Environment,
};
use std::path::Path;

/// Gate, connect, deploy, save.
///
/// Invalid arguments and an unreadable manifest are errors (exit 1). Anything
/// that goes wrong once deployment starts is logged and the run still exits
/// cleanly; per-object failures are recorded in the manifest.
pub fn run(root: &Path, branch_name: &str, environment: &str, log_path: &Path) -> anyhow::Result<()> {
    branch::gate(root, branch_name)?;
    let environment = session::resolve_environment(environment)?;

    let manifest_path = paths::manifest_path(root);
    let mut manifest = Manifest::load(&manifest_path)
        .inspect_err(|e| tracing::error!("{e}"))
        .context("failed to load manifest")?;
    tracing::info!("{} object(s) marked for deployment.", manifest.pending_count());

    match deploy(root, environment, &mut manifest, &manifest_path) {
        Ok(report) => {
            tracing::info!("Deployment process completed.");
            print_report(&report, log_path);
        }
        Err(e) => {
            tracing::error!("Deployment failed: {e}");
            eprintln!("deployment failed: {e}");
            eprintln!("Log: {}", log_path.display());
        }
    }
    Ok(())
}

fn deploy(
    root: &Path,
    environment: Environment,
    manifest: &mut Manifest,
    manifest_path: &Path,
) -> autodeploy_core::Result<DeploymentReport> {
    let config = ConnectionsConfig::load_default()?;
    let mut session = session::open_session(environment, &config)?;
    let report = orchestrator::run(manifest, root, &mut session);
    session.close();

    manifest.save(manifest_path)?;
    Ok(report)
}
