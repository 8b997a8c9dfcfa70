use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{Confirm, Text};
use tracing::info;

use super::clients::{client_choices, client_name};
use super::{pick, print_table, Choice, Desk};
use crate::api::NewProject;
use crate::errors::Result;
use crate::model::{Client, Project};
use crate::search::{filter_records, find_by_id, remove_by_id};
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum ProjectCmd {
    /// List projects
    List {
        /// Only projects of this client id
        #[arg(short, long)]
        client: Option<u64>,
        /// Case-insensitive name/description filter
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a project to a client
    Add,
    /// Edit a project's name or description
    Edit,
    /// Delete a project
    Delete,
}

pub fn run(desk: &Desk, cmd: ProjectCmd) -> Result<()> {
    desk.guard(Route::Projects)?;
    match cmd {
        ProjectCmd::List { client, search } => list(desk, client, search.as_deref().unwrap_or("")),
        ProjectCmd::Add => add(desk),
        ProjectCmd::Edit => edit(desk),
        ProjectCmd::Delete => delete(desk),
    }
}

pub fn project_table(projects: &[&Project], clients: &[Client]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("Client"),
        Cell::new("Name"),
        Cell::new("Description"),
        Cell::new("Created"),
    ]);
    for p in projects {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(client_name(clients, p.client_id)),
            Cell::new(&p.name),
            Cell::new(&p.description),
            Cell::new(p.created_at.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

pub fn project_choices(projects: &[Project]) -> Vec<Choice<u64>> {
    projects
        .iter()
        .map(|p| Choice { label: format!("{} (#{})", p.name, p.id), value: p.id })
        .collect()
}

pub fn project_name(projects: &[Project], id: u64) -> String {
    find_by_id(projects, id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("Project #{}", id))
}

fn list(desk: &Desk, client: Option<u64>, query: &str) -> Result<()> {
    let clients = desk.api.clients()?;
    let projects = desk.api.projects(client)?;
    let hits = filter_records(&projects, query);
    print_table("Projects", project_table(&hits, &clients), hits.len());
    Ok(())
}

fn add(desk: &Desk) -> Result<()> {
    let clients = desk.api.clients()?;
    let client_id = pick("Select Client:", client_choices(&clients))?;

    println!("\n--- Adding New Project ---");
    let name = Text::new("Project Name:").prompt()?;
    let description = Text::new("Description:").prompt()?;
    Validator::require(&[("Project name", name.as_str()), ("Description", description.as_str())])?;

    let project = NewProject {
        client_id,
        name: name.trim().to_string(),
        description: description.trim().to_string(),
    };
    let message = desk.api.add_project(&project)?;
    info!(client_id, project = %project.name, "project added");
    println!("✅ {}", message);
    Ok(())
}

fn edit(desk: &Desk) -> Result<()> {
    let projects = desk.api.projects(None)?;
    let id = pick("Select Project to edit:", project_choices(&projects))?;
    let Some(current) = find_by_id(&projects, id) else {
        return Ok(());
    };

    let name = Text::new("Project Name:").with_default(&current.name).prompt()?;
    let description = Text::new("Description:").with_default(&current.description).prompt()?;
    Validator::require(&[("Project name", name.as_str()), ("Description", description.as_str())])?;

    let updated = Project {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        ..current.clone()
    };
    let message = desk.api.update_project(&updated)?;
    println!("✅ {}", message);
    Ok(())
}

fn delete(desk: &Desk) -> Result<()> {
    let clients = desk.api.clients()?;
    let mut projects = desk.api.projects(None)?;
    let id = pick("Select Project to DELETE:", project_choices(&projects))?;

    if !Confirm::new("Delete this project?").with_default(false).prompt()? {
        println!("Cancelled");
        return Ok(());
    }

    let message = desk.api.delete_project(id)?;
    remove_by_id(&mut projects, id);
    println!("✅ {}", message);

    let remaining: Vec<&Project> = projects.iter().collect();
    print_table("Projects", project_table(&remaining, &clients), remaining.len());
    Ok(())
}
