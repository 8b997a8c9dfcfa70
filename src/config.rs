use directories::{BaseDirs, ProjectDirs};
use inquire::{CustomType, Text};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::errors::{AppError, Result};

const DEFAULT_COMPANY_TEMPLATE: &str = include_str!("../company.toml");
const BACKEND_ENV: &str = "FACTORY_DESK_BACKEND_URL";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    pub data_root: String,
    pub backend_url: String,
    #[serde(default = "default_typst_bin")]
    pub typst_bin: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

fn default_typst_bin() -> String {
    "typst".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl AppSettings {
    pub fn data_root_path(&self) -> PathBuf {
        PathBuf::from(expand_home_dir(&self.data_root))
    }

    /// The environment wins over the saved URL.
    pub fn effective_backend_url(&self) -> String {
        std::env::var(BACKEND_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.backend_url.clone())
    }
}

/// Letterhead printed on every generated document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompanyProfile {
    pub name: String,
    pub address1: String,
    pub address2: String,
    pub phone: String,
    pub email: String,
    pub gstin: String,
    pub bank_info: String,
    /// Header image, relative to the data root.
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub quotation_terms: Vec<String>,
}

pub fn config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "factory-desk", "app") {
        let config_dir = proj_dirs.config_dir();
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).ok();
        }
        return config_dir.to_path_buf();
    }
    PathBuf::from(".")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.toml")
}

pub fn load_settings_from(path: &Path) -> Result<Option<AppSettings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> Result<()> {
    let toml_str = toml::to_string_pretty(settings)?;
    fs::write(path, toml_str)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

pub fn load_company_profile(root: &Path) -> Result<CompanyProfile> {
    let path = root.join("company.toml");
    if path.exists() {
        let content = fs::read_to_string(&path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))
    } else {
        info!(path = %path.display(), "initializing default company profile");
        fs::create_dir_all(root)?;
        fs::write(&path, DEFAULT_COMPANY_TEMPLATE)?;
        Ok(toml::from_str(DEFAULT_COMPANY_TEMPLATE)?)
    }
}

pub fn setup_config_wizard(current: Option<&AppSettings>) -> Result<AppSettings> {
    println!("\n⚙️  --- Configuration Setup ---");
    let default_root = current
        .map(|s| s.data_root.clone())
        .unwrap_or_else(|| "~/Documents/FactoryDesk".to_string());
    let default_url = current
        .map(|s| s.backend_url.clone())
        .unwrap_or_else(|| "http://localhost/backend".to_string());

    println!("📂 Opening folder picker...");
    let picked_path = rfd::FileDialog::new()
        .set_title("Select Data Directory")
        .pick_folder();

    let data_root = match picked_path {
        Some(path) => path.to_string_lossy().to_string(),
        None => {
            println!("❌ No folder selected. Falling back to manual input.");
            Text::new("Data Directory:").with_default(&default_root).prompt()?
        }
    };

    let backend_url = Text::new("Backend URL:").with_default(&default_url).prompt()?;
    let request_timeout_secs = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(current.map(|s| s.request_timeout_secs).unwrap_or_else(default_timeout))
        .prompt()?;

    let settings = AppSettings {
        data_root,
        backend_url: backend_url.trim().trim_end_matches('/').to_string(),
        typst_bin: current.map(|s| s.typst_bin.clone()).unwrap_or_else(default_typst_bin),
        request_timeout_secs,
    };

    save_settings_to(&settings_path(), &settings)?;
    println!("✅ Settings saved.");
    Ok(settings)
}

pub fn expand_home_dir(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(base_dirs) = BaseDirs::new() {
            let home = base_dirs.home_dir().to_string_lossy();
            return path.replacen('~', &home, 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AppSettings {
        AppSettings {
            data_root: "/tmp/desk".to_string(),
            backend_url: "http://factory.local/api".to_string(),
            typst_bin: "typst".to_string(),
            request_timeout_secs: 15,
        }
    }

    #[test]
    fn missing_settings_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_settings_from(&dir.path().join("settings.toml")).unwrap(), None);
    }

    #[test]
    fn settings_survive_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        save_settings_to(&path, &settings()).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), Some(settings()));
    }

    #[test]
    fn older_settings_get_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "data_root = \"/srv\"\nbackend_url = \"http://x\"\n").unwrap();
        let loaded = load_settings_from(&path).unwrap().unwrap();
        assert_eq!(loaded.typst_bin, "typst");
        assert_eq!(loaded.request_timeout_secs, 30);
    }

    #[test]
    fn company_profile_is_initialized_once() {
        let dir = tempfile::tempdir().unwrap();
        let profile = load_company_profile(dir.path()).unwrap();
        assert!(dir.path().join("company.toml").exists());
        assert!(!profile.name.is_empty());

        fs::write(
            dir.path().join("company.toml"),
            DEFAULT_COMPANY_TEMPLATE.replace(&profile.name, "Changed Works"),
        )
        .unwrap();
        assert_eq!(load_company_profile(dir.path()).unwrap().name, "Changed Works");
    }

    #[test]
    fn home_is_expanded() {
        let expanded = expand_home_dir("~/desk");
        assert!(!expanded.starts_with('~') || BaseDirs::new().is_none());
        assert_eq!(expand_home_dir("/abs/desk"), "/abs/desk");
    }
}
