use autodeploy_core::orchestrator::DeploymentReport;
use std::path::Path;

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

pub fn print_report(report: &DeploymentReport, log_path: &Path) {
    if report.processed() == 0 {
        println!("Nothing to deploy.");
    } else {
        let mut rows = Vec::with_capacity(report.processed());
        rows.extend(
            report
                .deployed
                .iter()
                .map(|u| vec![u.to_string(), "deployed".to_string()]),
        );
        rows.extend(
            report
                .failed
                .iter()
                .map(|u| vec![u.to_string(), "failed".to_string()]),
        );
        rows.extend(
            report
                .missing_script
                .iter()
                .map(|u| vec![u.to_string(), "failed (no script)".to_string()]),
        );
        print_table(&["OBJECT", "STATUS"], rows);
        println!();
    }

    println!(
        "{} deployed, {} failed, {} without script, {} unchanged",
        report.deployed.len(),
        report.failed.len(),
        report.missing_script.len(),
        report.untouched
    );
    if !report.is_success() {
        println!("Failed objects are not retried; set them back to 'deploy' to rerun.");
    }
    println!("Log: {}", log_path.display());
}
