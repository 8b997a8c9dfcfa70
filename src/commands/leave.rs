use chrono::Local;
use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{DateSelect, Text};
use tracing::info;

use super::{pick, print_table, Choice, Desk};
use crate::api::NewLeave;
use crate::errors::Result;
use crate::model::{LeaveRequest, LeaveStatus, Role};
use crate::search::filter_records;
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum LeaveCmd {
    /// Apply for leave
    Apply,
    /// Approve or reject a pending request
    Review,
    /// List leave requests (all for the owner, your own otherwise)
    List {
        /// Case-insensitive filter on employee, subject or status
        #[arg(short, long)]
        search: Option<String>,
        /// Only pending requests
        #[arg(short, long)]
        pending: bool,
    },
}

pub fn run(desk: &Desk, cmd: LeaveCmd) -> Result<()> {
    match cmd {
        LeaveCmd::Apply => apply(desk),
        LeaveCmd::Review => review(desk),
        LeaveCmd::List { search, pending } => list(desk, search.as_deref().unwrap_or(""), pending),
    }
}

fn leave_table(requests: &[&LeaveRequest]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Employee"),
        Cell::new("Subject"),
        Cell::new("From"),
        Cell::new("To"),
        Cell::new("Days"),
        Cell::new("Status"),
    ]);
    for r in requests {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(employee_label(r)),
            Cell::new(&r.subject),
            Cell::new(r.start_date),
            Cell::new(r.end_date),
            Cell::new(r.days()),
            Cell::new(r.status.as_str()),
        ]);
    }
    table
}

fn employee_label(request: &LeaveRequest) -> String {
    request
        .employee_name
        .clone()
        .unwrap_or_else(|| format!("Employee #{}", request.employee_id))
}

/// Pending first, then newest start date.
fn sort_for_review(requests: &mut [LeaveRequest]) {
    requests.sort_by(|a, b| {
        let a_pending = a.status == LeaveStatus::Pending;
        let b_pending = b.status == LeaveStatus::Pending;
        b_pending.cmp(&a_pending).then(b.start_date.cmp(&a.start_date))
    });
}

fn apply(desk: &Desk) -> Result<()> {
    let session = desk.guard(Route::LeaveApply)?;
    let today = Local::now().date_naive();

    println!("\n--- Leave Application ---");
    let subject = Text::new("Subject:").prompt()?;
    let content = Text::new("Reason:").prompt()?;
    let start_date = DateSelect::new("From:").with_default(today).prompt()?;
    let end_date = DateSelect::new("To:").with_default(start_date).with_min_date(start_date).prompt()?;

    Validator::require(&[("Subject", subject.as_str()), ("Reason", content.as_str())])?;
    Validator::validate_date_range(start_date, end_date)?;

    let leave = NewLeave {
        employee_id: session.employee_id(),
        subject: subject.trim().to_string(),
        content: content.trim().to_string(),
        start_date,
        end_date,
    };
    let message = desk.api.submit_leave(&leave)?;
    info!(employee_id = leave.employee_id, %start_date, %end_date, "leave submitted");
    println!("✅ {}", message);
    Ok(())
}

fn review(desk: &Desk) -> Result<()> {
    desk.guard(Route::LeaveReview)?;
    let requests = desk.api.leave_requests(None)?;
    let pending: Vec<Choice<u64>> = requests
        .iter()
        .filter(|r| r.status == LeaveStatus::Pending)
        .map(|r| Choice {
            label: format!(
                "{} | {} | {} to {} ({} days)",
                employee_label(r),
                r.subject,
                r.start_date,
                r.end_date,
                r.days()
            ),
            value: r.id,
        })
        .collect();
    let id = pick("Select Leave Request:", pending)?;

    if let Some(request) = requests.iter().find(|r| r.id == id) {
        if !request.content.is_empty() {
            println!("Reason: {}", request.content);
        }
    }

    let decision = pick(
        "Decision:",
        vec![
            Choice { label: "Approve".to_string(), value: LeaveStatus::Approved },
            Choice { label: "Reject".to_string(), value: LeaveStatus::Rejected },
        ],
    )?;
    let message = desk.api.update_leave_status(id, decision)?;
    info!(id, status = decision.as_str(), "leave reviewed");
    println!("✅ {}", message);
    Ok(())
}

fn list(desk: &Desk, query: &str, pending_only: bool) -> Result<()> {
    let session = desk
        .guard(Route::LeaveReview)
        .or_else(|_| desk.guard(Route::LeaveApply))?;
    let employee_filter = match session.role {
        Role::Employee => Some(session.employee_id()),
        _ => None,
    };

    let mut requests = desk.api.leave_requests(employee_filter)?;
    if let Some(own) = employee_filter {
        requests.retain(|r| r.employee_id == own);
    }
    if pending_only {
        requests.retain(|r| r.status == LeaveStatus::Pending);
    }
    sort_for_review(&mut requests);

    let hits = filter_records(&requests, query);
    print_table("Leave Requests", leave_table(&hits), hits.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn request(id: u64, start: u32, status: LeaveStatus) -> LeaveRequest {
        LeaveRequest {
            id,
            employee_id: 4,
            employee_name: None,
            subject: "Leave".into(),
            content: String::new(),
            start_date: NaiveDate::from_ymd_opt(2024, 3, start).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, start + 1).unwrap(),
            status,
        }
    }

    #[test]
    fn pending_requests_sort_first() {
        let mut requests = vec![
            request(1, 2, LeaveStatus::Approved),
            request(2, 5, LeaveStatus::Pending),
            request(3, 9, LeaveStatus::Rejected),
            request(4, 7, LeaveStatus::Pending),
        ];
        sort_for_review(&mut requests);
        let ids: Vec<u64> = requests.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn unnamed_employee_falls_back_to_id() {
        let r = request(1, 2, LeaveStatus::Pending);
        assert_eq!(employee_label(&r), "Employee #4");
    }
}
