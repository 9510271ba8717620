//! Terminal output for the nask-epp CLI.
//!
//! Colored, grouped result listings for humans and pretty JSON for scripts.
//! Uses only the `console` crate for styling.

use console::{pad_str, style, Alignment};
use nask_epp_lib::{Availability, CheckReport, CheckResult, ContactAvailability, OperationOutcome};

const NAME_WIDTH: usize = 30;

// ── Availability checks ──────────────────────────────────────────────────────

/// Print a check report grouped by availability, or as a JSON list.
pub fn print_check_report(report: &CheckReport, json: bool) -> Result<(), serde_json::Error> {
    if json {
        let entries: Vec<&CheckResult> = report.entries().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for availability in [
        Availability::Available,
        Availability::Registered,
        Availability::UnsupportedTld,
        Availability::Error,
    ] {
        let group: Vec<&CheckResult> = report
            .entries()
            .filter(|r| r.availability == availability)
            .collect();
        if group.is_empty() {
            continue;
        }

        println!("  {}", section_title(availability, group.len()));
        for result in group {
            print_check_line(result);
        }
        println!();
    }

    print_summary(report);
    Ok(())
}

fn section_title(availability: Availability, count: usize) -> String {
    let title = format!("── {} ({}) ", availability, count);
    match availability {
        Availability::Available => style(title).green().bold().to_string(),
        Availability::Registered => style(title).red().bold().to_string(),
        Availability::UnsupportedTld => style(title).dim().bold().to_string(),
        Availability::Error => style(title).yellow().bold().to_string(),
    }
}

fn print_check_line(result: &CheckResult) {
    let padded = pad_str(&result.key, NAME_WIDTH, Alignment::Left, Some(".."));
    let detail = match (&result.error_message, result.registry_reason_code) {
        (Some(message), Some(code)) => format!("{} ({})", message, code),
        (Some(message), None) => message.clone(),
        (None, Some(code)) => format!("reason {}", code),
        (None, None) => String::new(),
    };
    println!("    {}  {}", style(padded).white(), style(detail).dim());
}

fn print_summary(report: &CheckReport) {
    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    println!(
        "  {} name{}  {}  {}  {}  {}  {}  {}",
        style(report.len()).bold(),
        if report.len() == 1 { "" } else { "s" },
        style("|").dim(),
        style(format!("{} available", report.count(Availability::Available))).green(),
        style("|").dim(),
        style(format!("{} registered", report.count(Availability::Registered))).red(),
        style("|").dim(),
        style(format!(
            "{} not checked",
            report.count(Availability::UnsupportedTld) + report.count(Availability::Error)
        ))
        .yellow(),
    );
}

// ── Contacts and mutations ───────────────────────────────────────────────────

pub fn print_contact_availability(
    id: &str,
    availability: &ContactAvailability,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        let value = serde_json::json!({ "id": id, "availability": availability });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let padded = pad_str(id, NAME_WIDTH, Alignment::Left, Some(".."));
    match availability {
        ContactAvailability::Available => {
            println!("  {}  {}", style(padded).white(), style("AVAILABLE").green().bold())
        }
        ContactAvailability::Taken => {
            println!("  {}  {}", style(padded).white(), style("TAKEN").red().bold())
        }
        ContactAvailability::Unknown { reason } => println!(
            "  {}  {}  {}",
            style(padded).white(),
            style("UNKNOWN").yellow(),
            style(reason).dim()
        ),
    }
    Ok(())
}

/// Print the outcome of a create operation on `subject`.
pub fn print_outcome(
    subject: &str,
    outcome: &OperationOutcome,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    match outcome {
        OperationOutcome::Success { .. } => {
            println!("  {} {} created", style("✓").green().bold(), subject)
        }
        OperationOutcome::Error { error, code } => {
            let code = code.map(|c| format!(" [{}]", c)).unwrap_or_default();
            println!(
                "  {} {} failed: {}{}",
                style("✗").red().bold(),
                subject,
                error,
                style(code).dim()
            );
        }
    }
    Ok(())
}

pub fn print_contact_id(id: &str, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "id": id }))?);
    } else {
        println!("{}", id);
    }
    Ok(())
}
