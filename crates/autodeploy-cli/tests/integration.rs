#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn autodeploy(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("autodeploy").unwrap();
    cmd.current_dir(dir.path())
        .env("AUTODEPLOY_CONNECTIONS", dir.path().join("connections.yaml"))
        .env_remove("RUST_LOG");
    cmd
}

/// Create a target database for `DEV_DB` and register it.
fn init_target(dir: &TempDir) {
    let conn = rusqlite::Connection::open(dir.path().join("dev.sqlite")).unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    std::fs::write(
        dir.path().join("connections.yaml"),
        "connections:\n  DEV_DB:\n    path: dev.sqlite\n",
    )
    .unwrap();
}

fn write_manifest(dir: &TempDir, content: &str) {
    std::fs::write(dir.path().join("configuration.yaml"), content).unwrap();
}

fn read_manifest(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("configuration.yaml")).unwrap()
}

fn write_script(dir: &TempDir, relative: &str, body: &str) {
    let path = dir.path().join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn log_files(dir: &Path) -> Vec<String> {
    let logs = dir.join("deployment_logs");
    if !logs.is_dir() {
        return Vec::new();
    }
    let mut names: Vec<String> = std::fs::read_dir(logs)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn read_log(dir: &TempDir) -> String {
    log_files(dir.path())
        .iter()
        .map(|name| {
            std::fs::read_to_string(dir.path().join("deployment_logs").join(name)).unwrap()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[test]
fn deploys_pending_view_end_to_end() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;\n");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sales/views/v_orders"))
        .stdout(predicate::str::contains("1 deployed, 0 failed"))
        .stdout(predicate::str::contains("not retried").not());

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_orders: deployed\n");
    let log = read_log(&dir);
    assert!(log.contains("INFO - Successfully deployed v_orders"));
    assert!(log.contains("INFO - 1 object(s) marked for deployment."));
    assert!(log.contains("INFO - Deployment process completed."));
    assert!(log.contains("INFO - Database connection closed."));
}

#[test]
fn script_effects_reach_target_database() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  tables:\n    orders: deploy\n");
    write_script(
        &dir,
        "sales/tables/orders.sql",
        "CREATE TABLE orders (id INTEGER PRIMARY KEY);\nINSERT INTO orders VALUES (1), (2);\nSELECT count(*) FROM orders;\n",
    );

    autodeploy(&dir)
        .args(["--branch", "develop", "--environment", "dev"])
        .assert()
        .success();

    let conn = rusqlite::Connection::open(dir.path().join("dev.sqlite")).unwrap();
    let count: i64 = conn
        .query_row("SELECT count(*) FROM orders", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
    assert!(read_log(&dir).contains("Execution results: [null,null,\"2\"]"));
}

#[test]
fn comments_and_quotes_survive_the_run() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    let manifest = "\
# release 4.2
sales:
  views:
    v_orders: \"deploy\"  # reviewed
    v_customers: deployed
";
    write_manifest(&dir, manifest);
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "release-4.2", "--environment", "dev"])
        .assert()
        .success();

    assert_eq!(
        read_manifest(&dir),
        "\
# release 4.2
sales:
  views:
    v_orders: \"deployed\"  # reviewed
    v_customers: deployed
"
    );
}

#[test]
fn environment_is_case_insensitive() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "DEV"])
        .assert()
        .success();

    assert!(read_manifest(&dir).contains("v_orders: deployed"));
    let names = log_files(dir.path());
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("deployment_log_dev_"));
    assert!(names[0].ends_with(".log"));
}

#[test]
fn failed_objects_do_not_change_exit_code() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(
        &dir,
        "app:\n  views:\n    v_bad: deploy\n    v_good: deploy\n    v_empty: deploy\n    v_gone: deploy\n",
    );
    write_script(&dir, "app/views/v_bad.sql", "SELECT * FROM no_such_table;");
    write_script(&dir, "app/views/v_good.sql", "CREATE VIEW v_good AS SELECT 1 AS x;");
    write_script(&dir, "app/views/v_empty.sql", "  \n");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 deployed, 1 failed, 2 without script"))
        .stdout(predicate::str::contains("Failed objects are not retried"));

    assert_eq!(
        read_manifest(&dir),
        "app:\n  views:\n    v_bad: failed\n    v_good: deployed\n    v_empty: failed\n    v_gone: failed\n"
    );
    let log = read_log(&dir);
    assert!(log.contains("ERROR - Execution failed for v_bad"));
    assert!(log.contains("WARNING - Skipping"));
    assert!(log.contains("ERROR - File not found"));
}

#[test]
fn comment_only_script_is_recorded_as_failed() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_draft: deploy\n");
    write_script(&dir, "sales/views/v_draft.sql", "-- write the view here\n");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 deployed, 1 failed"));

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_draft: failed\n");
    assert!(read_log(&dir).contains("no statements to execute"));
}

#[test]
fn rerun_only_attempts_newly_pending_objects() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "app:\n  tables:\n    t_once: deploy\n");
    write_script(&dir, "app/tables/t_once.sql", "CREATE TABLE t_once (x);");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success();
    // A second CREATE would fail if the script ran again.
    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to deploy."));

    assert_eq!(read_manifest(&dir), "app:\n  tables:\n    t_once: deployed\n");
}

#[test]
fn checkout_failure_does_not_stop_deployment() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "release-2.1", "--environment", "dev"])
        .assert()
        .success();

    assert!(read_manifest(&dir).contains("v_orders: deployed"));
    assert!(read_log(&dir).contains("ERROR - Error switching to branch release-2.1"));
}

// ---------------------------------------------------------------------------
// Fatal validation
// ---------------------------------------------------------------------------

#[test]
fn invalid_environment_exits_1_without_deploying() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "staging"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid environment 'staging'"));

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_orders: deploy\n");
    let log = read_log(&dir);
    assert!(log.contains("ERROR - Invalid environment argument: staging."));
    assert!(!log.contains("Successfully connected"));
    assert!(!log.contains("Database connection closed."));
    assert!(log_files(dir.path())[0].starts_with("deployment_log_staging_"));
}

#[test]
fn invalid_branch_exits_1_before_deploying() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "main", "--environment", "dev"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid branch 'main'"));

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_orders: deploy\n");
    let log = read_log(&dir);
    assert!(log.contains("ERROR - Invalid branch argument: main."));
    assert!(!log.contains("Processing"));
}

#[test]
fn missing_manifest_exits_1() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load manifest"));

    assert!(!read_log(&dir).contains("Successfully connected"));
}

#[test]
fn malformed_manifest_exits_1() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales: [views\n");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .code(1);
}

#[test]
fn both_flags_are_required() {
    let dir = TempDir::new().unwrap();
    autodeploy(&dir).args(["--branch", "dev"]).assert().failure();
    autodeploy(&dir).args(["--environment", "dev"]).assert().failure();
}

// ---------------------------------------------------------------------------
// Contained failures
// ---------------------------------------------------------------------------

#[test]
fn connection_failure_is_logged_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");
    write_script(&dir, "sales/views/v_orders.sql", "SELECT 1;");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "dev"])
        .assert()
        .success()
        .stderr(predicate::str::contains("deployment failed"));

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_orders: deploy\n");
    assert!(read_log(&dir).contains("ERROR - Deployment failed: connection failed"));
}

#[test]
fn unknown_target_is_a_connection_failure() {
    let dir = TempDir::new().unwrap();
    init_target(&dir);
    write_manifest(&dir, "sales:\n  views:\n    v_orders: deploy\n");

    autodeploy(&dir)
        .args(["--branch", "dev", "--environment", "prd"])
        .assert()
        .success();

    assert_eq!(read_manifest(&dir), "sales:\n  views:\n    v_orders: deploy\n");
    assert!(read_log(&dir).contains("unknown connection 'PRD_DB'"));
}
