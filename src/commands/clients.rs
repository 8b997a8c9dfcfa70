use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{Confirm, Text};
use tracing::info;

use super::{pick, print_table, Choice, Desk};
use crate::errors::Result;
use crate::model::Client;
use crate::search::{filter_records, remove_by_id};
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum ClientCmd {
    /// List clients (optionally filtered)
    List {
        /// Case-insensitive name filter
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Add a new client
    Add,
    /// Delete a client
    Delete,
}

pub fn run(desk: &Desk, cmd: ClientCmd) -> Result<()> {
    desk.guard(Route::Clients)?;
    match cmd {
        ClientCmd::List { search } => list(desk, search.as_deref().unwrap_or("")),
        ClientCmd::Add => add(desk),
        ClientCmd::Delete => delete(desk),
    }
}

pub fn client_table(clients: &[&Client]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("ID"), Cell::new("Name"), Cell::new("Created")]);
    for c in clients {
        table.add_row(vec![
            Cell::new(c.id),
            Cell::new(&c.name),
            Cell::new(c.created_at.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

pub fn client_choices(clients: &[Client]) -> Vec<Choice<u64>> {
    clients
        .iter()
        .map(|c| Choice { label: format!("{} (#{})", c.name, c.id), value: c.id })
        .collect()
}

/// Client name for documents; falls back to the id when the client was deleted.
pub fn client_name(clients: &[Client], id: u64) -> String {
    clients
        .iter()
        .find(|c| c.id == id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| format!("Client #{}", id))
}

fn list(desk: &Desk, query: &str) -> Result<()> {
    let clients = desk.api.clients()?;
    let hits = filter_records(&clients, query);
    print_table("Clients", client_table(&hits), hits.len());
    Ok(())
}

fn add(desk: &Desk) -> Result<()> {
    println!("\n--- Creating New Client ---");
    let name = Text::new("Client / Company Name:").prompt()?;
    Validator::require(&[("Client name", name.as_str())])?;

    let message = desk.api.add_client(name.trim())?;
    info!(client = name.trim(), "client added");
    println!("✅ {}", message);
    Ok(())
}

fn delete(desk: &Desk) -> Result<()> {
    let mut clients = desk.api.clients()?;
    let id = pick("Select Client to DELETE:", client_choices(&clients))?;

    let confirmed = Confirm::new("Delete this client? Its projects may be removed by the backend too.")
        .with_default(false)
        .prompt()?;
    if !confirmed {
        println!("Cancelled");
        return Ok(());
    }

    let message = desk.api.delete_client(id)?;
    remove_by_id(&mut clients, id);
    println!("✅ {}", message);

    let remaining: Vec<&Client> = clients.iter().collect();
    print_table("Clients", client_table(&remaining), remaining.len());
    Ok(())
}
