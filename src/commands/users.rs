use clap::Subcommand;
use comfy_table::{Cell, Table};
use inquire::{Confirm, Password, Text};
use tracing::info;

use super::{pick, print_table, Choice, Desk};
use crate::errors::{AppError, Result};
use crate::model::{NewUser, Role, User};
use crate::search::{filter_records, remove_by_id};
use crate::session::Route;
use crate::validation::Validator;

#[derive(Subcommand)]
pub enum UserCmd {
    /// List login accounts
    List {
        /// Case-insensitive filter on username or role
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Create a login account
    Add,
    /// Delete a login account
    Delete,
}

pub fn run(desk: &Desk, cmd: UserCmd) -> Result<()> {
    desk.guard(Route::Users)?;
    match cmd {
        UserCmd::List { search } => list(desk, search.as_deref().unwrap_or("")),
        UserCmd::Add => add(desk),
        UserCmd::Delete => delete(desk),
    }
}

fn user_table(users: &[&User]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![Cell::new("ID"), Cell::new("Username"), Cell::new("Role")]);
    for u in users {
        table.add_row(vec![Cell::new(u.id), Cell::new(&u.username), Cell::new(u.role)]);
    }
    table
}

fn list(desk: &Desk, query: &str) -> Result<()> {
    let users = desk.api.users()?;
    let hits = filter_records(&users, query);
    print_table("Users", user_table(&hits), hits.len());
    Ok(())
}

fn add(desk: &Desk) -> Result<()> {
    println!("\n--- New Login ---");
    let username = Text::new("Username:").prompt()?;
    Validator::require(&[("Username", username.as_str())])?;
    let password = Password::new("Password:")
        .with_custom_confirmation_message("Confirm password:")
        .prompt()?;
    Validator::validate_password(&password)?;
    let role = pick(
        "Role:",
        Role::ALL.into_iter().map(|r| Choice { label: r.to_string(), value: r }).collect(),
    )?;

    let user = NewUser {
        username: username.trim().to_string(),
        password,
        role,
    };
    let message = desk.api.add_user(&user)?;
    info!(username = %user.username, role = %user.role, "user added");
    println!("✅ {}", message);
    Ok(())
}

fn delete(desk: &Desk) -> Result<()> {
    let mut users = desk.api.users()?;
    let choices = users
        .iter()
        .map(|u| Choice { label: format!("{} ({})", u.username, u.role), value: u.id })
        .collect();
    let id = pick("Select User to DELETE:", choices)?;

    if desk.session.as_ref().is_some_and(|s| s.user_id == id) {
        return Err(AppError::Validation("You cannot delete the account you are signed in with".to_string()));
    }
    if !Confirm::new("Delete this user?").with_default(false).prompt()? {
        println!("Cancelled");
        return Ok(());
    }

    let message = desk.api.delete_user(id)?;
    remove_by_id(&mut users, id);
    println!("✅ {}", message);

    let remaining: Vec<&User> = users.iter().collect();
    print_table("Users", user_table(&remaining), remaining.len());
    Ok(())
}
