mod api;
mod billing;
mod commands;
mod config;
mod document;
mod errors;
mod model;
mod revenue;
mod search;
mod session;
mod validation;

use clap::{CommandFactory, Parser, Subcommand};
use comfy_table::{Cell, Table};
use inquire::{Password, Select, Text};
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::clients::ClientCmd;
use crate::commands::employees::EmployeeCmd;
use crate::commands::leave::LeaveCmd;
use crate::commands::projects::ProjectCmd;
use crate::commands::quotations::QuotationCmd;
use crate::commands::users::UserCmd;
use crate::commands::work::WorkCmd;
use crate::commands::Desk;
use crate::errors::{AppError, Result};
use crate::session::Session;

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "factory-desk", version, about = "Office console for the factory backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login,
    /// Forget the stored session
    Logout,
    /// Show who is signed in and which views they can open
    Whoami,
    /// Configure data directory and backend
    Config,
    /// Open the generated documents folder
    Open,
    /// Manage clients
    #[command(subcommand)]
    Client(ClientCmd),
    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCmd),
    /// Quotations and bills
    #[command(subcommand)]
    Quotation(QuotationCmd),
    /// Employees and salary
    #[command(subcommand)]
    Employee(EmployeeCmd),
    /// Leave applications
    #[command(subcommand)]
    Leave(LeaveCmd),
    /// Assigned work and progress reports
    #[command(subcommand)]
    Work(WorkCmd),
    /// Login accounts
    #[command(subcommand)]
    User(UserCmd),
    /// Revenue charts
    Revenue {
        /// Year to chart (all years when omitted)
        year: Option<i32>,
    },
}

// ==========================================
// Main Function
// ==========================================

const DEFAULT_LOG_FILTER: &str = "warn";

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FACTORY_DESK_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("❌ {}", e);
        }
        return;
    };

    match run(command) {
        Ok(()) => {}
        Err(AppError::Cancelled) => println!("Cancelled"),
        Err(e) => {
            debug!(error = ?e, "command failed");
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> Result<()> {
    // `config` must work even when the stored settings are broken.
    if let Commands::Config = command {
        let current = config::load_settings_from(&config::settings_path()).ok().flatten();
        config::setup_config_wizard(current.as_ref())?;
        return Ok(());
    }

    let settings = match config::load_settings_from(&config::settings_path())? {
        Some(settings) => settings,
        None => config::setup_config_wizard(None)?,
    };
    let mut desk = Desk::open(settings)?;

    match command {
        Commands::Config => Ok(()),
        Commands::Login => login(&mut desk),
        Commands::Logout => logout(&mut desk),
        Commands::Whoami => whoami(&desk),
        Commands::Open => open_folder_wizard(desk.data_root()),
        Commands::Client(cmd) => commands::clients::run(&desk, cmd),
        Commands::Project(cmd) => commands::projects::run(&desk, cmd),
        Commands::Quotation(cmd) => commands::quotations::run(&desk, cmd),
        Commands::Employee(cmd) => commands::employees::run(&desk, cmd),
        Commands::Leave(cmd) => commands::leave::run(&desk, cmd),
        Commands::Work(cmd) => commands::work::run(&desk, cmd),
        Commands::User(cmd) => commands::users::run(&desk, cmd),
        Commands::Revenue { year } => commands::revenue::run(&desk, year),
    }
}

// ==========================================
// Session
// ==========================================

fn login(desk: &mut Desk) -> Result<()> {
    let username = Text::new("Username:").prompt()?;
    let password = Password::new("Password:").without_confirmation().prompt()?;
    if username.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation("Username and password are required".to_string()));
    }

    let user = desk.api.login(username.trim(), &password)?;
    let session = Session::from(user);
    session.save_to(&desk.session_path)?;
    info!(user = %session.username, role = %session.role, "signed in");

    println!("✅ Welcome, {} ({})", session.username, session.role);
    println!("Dashboard: {}", session.role.dashboard());
    desk.session = Some(session);
    Ok(())
}

fn logout(desk: &mut Desk) -> Result<()> {
    if Session::clear(&desk.session_path)? {
        println!("👋 Signed out.");
    } else {
        println!("Not signed in.");
    }
    desk.session = None;
    Ok(())
}

fn whoami(desk: &Desk) -> Result<()> {
    let Some(session) = &desk.session else {
        println!("Not signed in. Run `factory-desk login`.");
        return Ok(());
    };

    println!("👤 {} ({}), dashboard {}", session.username, session.role, session.role.dashboard());
    let mut table = Table::new();
    table.set_header(vec![Cell::new("View"), Cell::new("Path")]);
    for route in session.role.routes() {
        table.add_row(vec![Cell::new(route.title()), Cell::new(route.path_for(session.role))]);
    }
    println!("{table}");
    Ok(())
}

// ==========================================
// Output folders
// ==========================================

fn open_folder_wizard(root: &Path) -> Result<()> {
    let output_root = root.join("output");
    fs::create_dir_all(&output_root)?;

    let root_opt = "📂 Open Root Output Directory".to_string();
    let mut folders = Vec::new();
    for kind_entry in fs::read_dir(&output_root)?.flatten() {
        if !kind_entry.path().is_dir() {
            continue;
        }
        let kind_name = kind_entry.file_name().to_string_lossy().to_string();
        if let Ok(years) = fs::read_dir(kind_entry.path()) {
            for year_entry in years.flatten() {
                if year_entry.path().is_dir() {
                    let year_name = year_entry.file_name().to_string_lossy().to_string();
                    folders.push(format!("{} / {}", kind_name, year_name));
                }
            }
        }
    }
    folders.sort();
    folders.reverse();

    let mut options = vec![root_opt.clone()];
    options.extend(folders);

    let choice = Select::new("Select Folder to Open:", options).prompt()?;
    let target_path = match choice.split_once(" / ") {
        Some((kind, year)) if choice != root_opt => output_root.join(kind).join(year),
        _ => output_root,
    };
    println!("🚀 Opening: {:?}", target_path);
    document::open_folder(&target_path);
    Ok(())
}
