use chrono::Local;
use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{Confirm, CustomType, DateSelect, Select, Text};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

use super::clients::client_name;
use super::employees::employee_choices;
use super::projects::{project_choices, project_name};
use super::{pick, print_table, Choice, Desk};
use crate::api::ProgressReport;
use crate::document::{self, Asset, DocumentKind, ReportView};
use crate::errors::{AppError, Result};
use crate::model::{Assignment, TrackRecord};
use crate::search::{filter_records, find_by_id};
use crate::session::Route;
use crate::validation::Validator;

const REPORT_STATUSES: [&str; 4] = ["In Progress", "Completed", "On Hold", "Delayed"];

#[derive(Subcommand)]
pub enum WorkCmd {
    /// Assign a project to an employee
    Assign,
    /// List assignments (all of them for the owner)
    List {
        /// Case-insensitive filter on project or employee
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show the projects assigned to you
    Mine,
    /// Show progress reports of a project
    Track {
        /// Project id; asks when omitted
        #[arg(short, long)]
        project: Option<u64>,
    },
    /// Submit a progress report with photos
    Report,
    /// Generate the progress report PDF of a project
    ReportPdf {
        /// Project id; asks when omitted
        #[arg(short, long)]
        project: Option<u64>,
    },
}

pub fn run(desk: &Desk, cmd: WorkCmd) -> Result<()> {
    match cmd {
        WorkCmd::Assign => assign(desk),
        WorkCmd::List { search } => list(desk, search.as_deref().unwrap_or("")),
        WorkCmd::Mine => mine(desk),
        WorkCmd::Track { project } => track(desk, project),
        WorkCmd::Report => report(desk),
        WorkCmd::ReportPdf { project } => report_pdf(desk, project),
    }
}

fn assignment_table(assignments: &[&Assignment]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Project"),
        Cell::new("Employee"),
        Cell::new("Assigned"),
        Cell::new("Deadline"),
    ]);
    for a in assignments {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(a.project_name.clone().unwrap_or_else(|| format!("Project #{}", a.project_id))),
            Cell::new(a.employee_name.clone().unwrap_or_else(|| format!("Employee #{}", a.employee_id))),
            Cell::new(a.assigned_at.as_deref().unwrap_or("-")),
            Cell::new(a.deadline.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
        ]);
    }
    table
}

fn track_table(records: &[TrackRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Period"),
        Cell::new("Status"),
        Cell::new("Progress"),
        Cell::new("Challenges"),
        Cell::new("Photos"),
    ]);
    for r in records {
        let period = match (r.start_date, r.end_date) {
            (Some(s), Some(e)) => format!("{} to {}", s, e),
            _ => r.created_at.clone().unwrap_or_else(|| "-".into()),
        };
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(period),
            Cell::new(&r.status),
            Cell::new(format!("{}%", r.progress_percentage)),
            Cell::new(&r.challenges),
            Cell::new(r.images.len()),
        ]);
    }
    table
}

/// `uploads/site/IMG 01.jpg` for record 7 -> `7-1-IMG 01.jpg`
fn image_asset_name(record_id: u64, index: usize, path: &str) -> String {
    let file = path
        .rsplit(['/', '\\'])
        .find(|p| !p.is_empty())
        .unwrap_or("image");
    let file = file.split(['?', '#']).next().unwrap_or(file);
    format!("{}-{}-{}", record_id, index + 1, file)
}

/// The backend may ignore the filter and answer with everyone's work.
fn keep_own(mut assignments: Vec<Assignment>, employee_id: u64) -> Vec<Assignment> {
    assignments.retain(|a| a.employee_id == employee_id);
    assignments
}

fn own_assignments(desk: &Desk, employee_id: u64) -> Result<Vec<Assignment>> {
    Ok(keep_own(desk.api.assigned_work(Some(employee_id))?, employee_id))
}

fn assign(desk: &Desk) -> Result<()> {
    desk.guard(Route::AssignWork)?;
    let projects = desk.api.projects(None)?;
    let employees = desk.api.employees()?;

    let project_id = pick("Select Project:", project_choices(&projects))?;
    let employee_id = pick("Assign to:", employee_choices(&employees))?;
    let deadline = if Confirm::new("Set a deadline?").with_default(true).prompt()? {
        Some(DateSelect::new("Deadline:").with_min_date(Local::now().date_naive()).prompt()?)
    } else {
        None
    };

    let message = desk.api.assign_project(project_id, employee_id, deadline)?;
    info!(project_id, employee_id, "project assigned");
    println!("✅ {}", message);
    Ok(())
}

fn list(desk: &Desk, query: &str) -> Result<()> {
    desk.guard(Route::AssignWork)?;
    let assignments = desk.api.assigned_work(None)?;
    let hits = filter_records(&assignments, query);
    print_table("Assigned Work", assignment_table(&hits), hits.len());
    Ok(())
}

fn mine(desk: &Desk) -> Result<()> {
    let session = desk.guard(Route::MyWork)?;
    let mut assignments = own_assignments(desk, session.employee_id())?;
    assignments.sort_by_key(|a| (a.deadline.is_none(), a.deadline));

    let rows: Vec<&Assignment> = assignments.iter().collect();
    print_table("My Work", assignment_table(&rows), rows.len());

    let today = Local::now().date_naive();
    let overdue = assignments.iter().filter(|a| a.deadline.is_some_and(|d| d < today)).count();
    if overdue > 0 {
        println!("⚠️  {} assignment(s) past deadline", overdue);
    }
    Ok(())
}

fn choose_project(desk: &Desk, project: Option<u64>) -> Result<u64> {
    match project {
        Some(id) => Ok(id),
        None => pick("Select Project:", project_choices(&desk.api.projects(None)?)),
    }
}

fn track(desk: &Desk, project: Option<u64>) -> Result<()> {
    desk.guard(Route::TrackRecords)?;
    let project_id = choose_project(desk, project)?;
    let mut records = desk.api.track_records(project_id)?;
    records.sort_by_key(|r| (r.start_date, r.id));
    print_table(&format!("Track Records (project #{})", project_id), track_table(&records), records.len());
    Ok(())
}

fn pick_images() -> Result<Vec<PathBuf>> {
    if !Confirm::new("Attach photos?").with_default(true).prompt()? {
        return Ok(Vec::new());
    }

    println!("📂 Opening file picker...");
    let picked = rfd::FileDialog::new()
        .set_title("Select Site Photos")
        .add_filter("Images", &["jpg", "jpeg", "png", "webp"])
        .pick_files();

    let paths = match picked {
        Some(paths) => paths,
        None => {
            println!("❌ No files selected. Falling back to manual input.");
            let typed = Text::new("Image paths (comma separated):").prompt()?;
            typed
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect()
        }
    };

    for path in &paths {
        if !path.is_file() {
            return Err(AppError::Validation(format!("Image not found: {}", path.display())));
        }
    }
    Ok(paths)
}

fn report(desk: &Desk) -> Result<()> {
    let session = desk.guard(Route::SubmitReport)?;
    let assignments = own_assignments(desk, session.employee_id())?;
    let choices: Vec<Choice<u64>> = assignments
        .iter()
        .map(|a| Choice {
            label: a.project_name.clone().unwrap_or_else(|| format!("Project #{}", a.project_id)),
            value: a.project_id,
        })
        .collect();
    let project_id = pick("Report on project:", choices)?;

    println!("\n--- Progress Report ---");
    let status = Select::new("Status:", REPORT_STATUSES.to_vec()).prompt()?;
    let progress_percentage = CustomType::<u64>::new("Progress (%):")
        .with_error_message("Please type a whole number")
        .prompt()?;
    Validator::validate_percentage(progress_percentage)?;
    let challenges = Text::new("Challenges faced:").prompt()?;
    let today = Local::now().date_naive();
    let start_date = DateSelect::new("Work period from:").with_default(today).prompt()?;
    let end_date = DateSelect::new("Work period to:").with_default(today).with_min_date(start_date).prompt()?;
    Validator::validate_date_range(start_date, end_date)?;
    let images = pick_images()?;

    let report = ProgressReport {
        project_id,
        employee_id: session.employee_id(),
        status: status.to_string(),
        progress_percentage,
        challenges: challenges.trim().to_string(),
        start_date,
        end_date,
        images,
    };
    let message = desk.api.submit_project_report(&report)?;
    info!(project_id, progress = progress_percentage, images = report.images.len(), "report submitted");
    println!("✅ {}", message);
    Ok(())
}

fn report_pdf(desk: &Desk, project: Option<u64>) -> Result<()> {
    desk.guard(Route::TrackRecords)?;
    let projects = desk.api.projects(None)?;
    let project_id = match project {
        Some(id) => id,
        None => pick("Select Project:", project_choices(&projects))?,
    };
    let project = find_by_id(&projects, project_id)
        .ok_or_else(|| AppError::Validation(format!("No such project: {}", project_name(&projects, project_id))))?;
    let clients = desk.api.clients()?;
    let mut records = desk.api.track_records(project_id)?;
    records.sort_by_key(|r| (r.start_date, r.id));

    let mut assets = Vec::new();
    let mut image_names: HashMap<u64, Vec<String>> = HashMap::new();
    for record in &records {
        for (n, image) in record.images.iter().enumerate() {
            println!("⬇️  Downloading {}", image);
            let bytes = desk.api.download(image).inspect_err(|e| {
                warn!(record = record.id, %image, error = %e, "image download failed");
            })?;
            let file_name = image_asset_name(record.id, n, image);
            image_names.entry(record.id).or_default().push(file_name.clone());
            assets.push(Asset { file_name, bytes });
        }
    }

    let today = Local::now().date_naive();
    let renderer = desk.renderer()?;
    let view = ReportView::new(
        renderer.company(),
        project,
        &client_name(&clients, project.client_id),
        &records,
        &image_names,
        today,
    );
    let pdf = renderer.produce(
        DocumentKind::Report,
        &document::report_stem(project.id, today),
        document::current_year(),
        &view,
        &assets,
    )?;
    println!("✅ PDF Generated: {:?}", pdf);
    document::open_and_reveal(&pdf);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::session::Session;

    #[test]
    fn asset_names_keep_the_file_name() {
        assert_eq!(image_asset_name(7, 0, "uploads/site/IMG 01.jpg"), "7-1-IMG 01.jpg");
        assert_eq!(image_asset_name(7, 2, "http://factory.local/uploads/b.png?v=3"), "7-3-b.png");
        assert_eq!(image_asset_name(2, 0, "C:\\photos\\weld.jpeg"), "2-1-weld.jpeg");
    }

    fn assignment(id: u64, employee_id: u64) -> Assignment {
        Assignment {
            id,
            project_id: 10 + id,
            employee_id,
            project_name: None,
            employee_name: None,
            assigned_at: None,
            deadline: None,
        }
    }

    #[test]
    fn own_work_is_matched_on_the_employee_id() {
        let session = Session { user_id: 12, username: "ravi".into(), role: Role::Employee, employee_id: Some(3) };
        let all = vec![assignment(1, 3), assignment(2, 12), assignment(3, 3)];
        let mine: Vec<u64> = keep_own(all, session.employee_id()).iter().map(|a| a.id).collect();
        assert_eq!(mine, vec![1, 3]);
    }

    #[test]
    fn asset_names_survive_odd_paths() {
        assert_eq!(image_asset_name(1, 0, "uploads/"), "1-1-uploads");
        assert_eq!(image_asset_name(1, 0, ""), "1-1-image");
    }
}
