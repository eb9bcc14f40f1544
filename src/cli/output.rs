//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{ConnectionSummary, ConnectionView, TestReport};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of connection summaries.
pub fn print_connections_table(rows: &[ConnectionSummary]) {
    if rows.is_empty() {
        info("No connections saved yet.");
        tip("Run `connvault save <PROJECT> --host ... --type ...` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Project",
        "Connection",
        "Type",
        "Host",
        "Database",
        "Read-only",
        "Created",
    ]);

    for row in rows {
        table.add_row(vec![
            row.project_name.clone(),
            row.connection_name.clone(),
            row.connection_type.to_string(),
            format!("{}:{}", row.host, row.port),
            row.database_name.clone(),
            yes_no(row.is_readonly).to_string(),
            row.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ]);
    }

    println!("{table}");
}

/// Print one connection as a two-column field/value table.
pub fn print_connection(view: &ConnectionView) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    table.add_row(vec!["Project".to_string(), view.project_name.clone()]);
    table.add_row(vec!["Connection".to_string(), view.connection_name.clone()]);
    table.add_row(vec!["Type".to_string(), view.connection_type.to_string()]);
    table.add_row(vec!["Host".to_string(), view.host.clone()]);
    table.add_row(vec!["Port".to_string(), view.port.to_string()]);
    table.add_row(vec!["Database".to_string(), view.database_name.clone()]);
    table.add_row(vec!["Username".to_string(), view.username.clone()]);
    if let Some(ref password) = view.password {
        table.add_row(vec!["Password".to_string(), password.clone()]);
    }
    table.add_row(vec!["SSL".to_string(), yes_no(view.ssl_enabled).to_string()]);
    table.add_row(vec!["Read-only".to_string(), yes_no(view.is_readonly).to_string()]);
    for (name, value) in &view.additional_params {
        table.add_row(vec![format!("param: {name}"), value.to_string()]);
    }
    table.add_row(vec![
        "Created".to_string(),
        view.created_at.format(TIMESTAMP_FORMAT).to_string(),
    ]);
    table.add_row(vec![
        "Updated".to_string(),
        view.updated_at.format(TIMESTAMP_FORMAT).to_string(),
    ]);

    println!("{table}");
}

/// Print the outcome of a structural connection test.
pub fn print_test_report(report: &TestReport) {
    let target = format!(
        "{}/{} ({} at {}:{}, database {})",
        report.project_name,
        report.connection_name,
        report.connection_type,
        report.host,
        report.port,
        report.database_name
    );

    if report.well_formed {
        success(&format!("{target} looks well formed"));
    } else {
        warning(&format!("{target} has {} issue(s):", report.issues.len()));
        for issue in &report.issues {
            eprintln!("    - {issue}");
        }
    }

    tip(&report.note);
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
