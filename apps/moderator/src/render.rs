//! Plain-text rendering of workflow views for the terminal.

use std::collections::BTreeMap;

use approval_core::{BucketCounts, ErrorKind, Projection, WorkflowError};
use shared::domain::{Registration, RegistrationStatus};

pub fn tab_bar(counts: &BucketCounts, active: RegistrationStatus) -> String {
    RegistrationStatus::ALL
        .iter()
        .map(|status| {
            let label = format!("{} ({})", title(*status), counts.get(*status));
            if *status == active {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn projection(view: &Projection) -> String {
    let mut lines = vec![tab_bar(&view.counts, view.tab)];
    if view.stale {
        lines.push("(view is out of date, run `list` again to refresh)".to_string());
    }
    if view.items.is_empty() {
        lines.push(format!("No {} registrations.", view.tab));
    }
    for registration in &view.items {
        let mut row = format!(
            "{}  {}  {}  submitted {}",
            registration.id,
            registration.name,
            registration.phone,
            registration.submitted_at.format("%Y-%m-%d")
        );
        if let Some(reason) = &registration.rejection_reason {
            row.push_str(&format!("  reason: {reason}"));
        }
        lines.push(row);
    }
    lines.join("\n")
}

pub fn detail(registration: &Registration) -> String {
    let mut lines = vec![
        format!("{} ({})", registration.name, registration.id),
        format!("  status:           {}", registration.status),
        format!("  phone:            {}", registration.phone),
        format!("  GST:              {}", registration.gst),
        format!("  Aadhar:           {}", registration.aadhar),
        format!("  address:          {}", registration.address),
        format!("  business address: {}", registration.business_address),
        format!(
            "  submitted:        {}",
            registration.submitted_at.format("%Y-%m-%d %H:%M UTC")
        ),
    ];
    if let Some(reason) = &registration.rejection_reason {
        lines.push(format!("  rejection reason: {reason}"));
    }
    lines.join("\n")
}

pub fn bucket_failures(failed: &BTreeMap<RegistrationStatus, WorkflowError>) -> Vec<String> {
    failed
        .iter()
        .map(|(status, err)| format!("Could not load {status} registrations: {err}"))
        .collect()
}

pub fn committed(name: &str, status: RegistrationStatus) -> String {
    match status {
        RegistrationStatus::Approved => format!("Hotel {name} approved successfully!"),
        other => format!("Hotel {name} {other}."),
    }
}

/// Rule violations read differently from network or server failures.
pub fn failure(err: &WorkflowError) -> String {
    match err.kind() {
        ErrorKind::InvalidTransition => format!("Not allowed: {err}"),
        ErrorKind::NotFound => format!("{err}. The list has been refreshed."),
        _ if err.is_retryable() => {
            format!("Failed to update status: {err}. Please try again.")
        }
        _ => format!("Failed to update status: {err}"),
    }
}

fn title(status: RegistrationStatus) -> &'static str {
    match status {
        RegistrationStatus::Pending => "Pending",
        RegistrationStatus::Approved => "Approved",
        RegistrationStatus::Rejected => "Rejected",
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
