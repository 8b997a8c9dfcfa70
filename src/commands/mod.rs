pub mod clients;
pub mod employees;
pub mod leave;
pub mod projects;
pub mod quotations;
pub mod revenue;
pub mod users;
pub mod work;

use comfy_table::Table;
use inquire::Select;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::ApiClient;
use crate::config::{self, AppSettings, CompanyProfile};
use crate::document::Renderer;
use crate::errors::{AppError, Result};
use crate::session::{self, Route, Session};

/// Everything a command needs: settings, backend, letterhead and who is signed in.
pub struct Desk {
    pub settings: AppSettings,
    pub root: PathBuf,
    pub api: ApiClient,
    pub session: Option<Session>,
    pub session_path: PathBuf,
}

impl Desk {
    pub fn open(settings: AppSettings) -> Result<Self> {
        let root = settings.data_root_path();
        std::fs::create_dir_all(&root)?;
        let api = ApiClient::new(
            &settings.effective_backend_url(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        let session_path = Session::default_path();
        let session = Session::load_from(&session_path)?;
        Ok(Self { settings, root, api, session, session_path })
    }

    pub fn guard(&self, route: Route) -> Result<&Session> {
        session::guard(self.session.as_ref(), route)
    }

    pub fn company(&self) -> Result<CompanyProfile> {
        config::load_company_profile(&self.root)
    }

    pub fn renderer(&self) -> Result<Renderer> {
        Renderer::new(&self.root, &self.settings.typst_bin, self.company()?)
    }

    pub fn data_root(&self) -> &Path {
        &self.root
    }
}

/// A labelled choice for `inquire::Select` that remembers which record it stands for.
pub struct Choice<T> {
    pub label: String,
    pub value: T,
}

impl<T> Display for Choice<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

pub fn pick<T>(prompt: &str, choices: Vec<Choice<T>>) -> Result<T> {
    if choices.is_empty() {
        return Err(AppError::Validation(format!("Nothing to choose from ({})", prompt.trim_end_matches(':'))));
    }
    let choice = Select::new(prompt, choices).with_page_size(12).prompt()?;
    Ok(choice.value)
}

pub fn print_table(title: &str, table: Table, count: usize) {
    println!("\n--- {} ---", title);
    if count == 0 {
        println!("(None found)");
    } else {
        println!("{table}");
    }
}

/// Trimmed input, or `None` when left blank.
pub fn optional(input: String) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}
