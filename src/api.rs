//! Typed client for the PHP backend.
//!
//! Every script answers `200` with a JSON object carrying a `success` flag, an
//! optional `message`, and the payload under an endpoint-specific key. Some
//! list scripts answer with a bare array instead.

use chrono::NaiveDate;
use reqwest::blocking::{multipart, Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{AppError, Result};
use crate::model::{
    Assignment, Client, Employee, LeaveRequest, LeaveStatus, NewUser, Project, Quotation, QuotationItem,
    RevenuePoint, TrackRecord, User,
};

// ==========================================
// Request bodies
// ==========================================

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct IdOnly {
    id: u64,
}

#[derive(Debug, Serialize)]
struct NewClient<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewProject {
    pub client_id: u64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewQuotation {
    pub reference_no: String,
    pub address: String,
    pub name: String,
    pub subject: String,
    pub client_id: u64,
    pub project_id: u64,
    pub date: NaiveDate,
    pub items: Vec<QuotationItem>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NewLeave {
    pub employee_id: u64,
    pub subject: String,
    pub content: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct LeaveDecision {
    id: u64,
    status: LeaveStatus,
}

#[derive(Debug, Serialize)]
struct AssignProject {
    project_id: u64,
    employee_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub project_id: u64,
    pub employee_id: u64,
    pub status: String,
    pub progress_percentage: u64,
    pub challenges: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub images: Vec<PathBuf>,
}

// ==========================================
// Envelope
// ==========================================

#[derive(Debug)]
pub struct Envelope {
    endpoint: String,
    success: bool,
    message: Option<String>,
    body: Value,
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().map(|n| n != 0).unwrap_or(false),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "success"),
        _ => false,
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > 200 {
        format!("{}…", trimmed.chars().take(200).collect::<String>())
    } else {
        trimmed.to_string()
    }
}

impl Envelope {
    pub fn parse(endpoint: &str, text: &str) -> Result<Self> {
        let body: Value = serde_json::from_str(text.trim_start_matches('\u{feff}')).map_err(|e| {
            AppError::Serialization(format!("{} returned non-JSON ({}): {}", endpoint, e, snippet(text)))
        })?;

        let (success, message) = match &body {
            Value::Array(_) => (true, None),
            Value::Object(map) => {
                let message = map
                    .get("message")
                    .or_else(|| map.get("error"))
                    .and_then(|m| m.as_str())
                    .map(String::from);
                let success = match map.get("success") {
                    Some(flag) => truthy(flag),
                    None => !map.contains_key("error"),
                };
                (success, message)
            }
            other => {
                return Err(AppError::Serialization(format!(
                    "{} returned unexpected JSON: {}",
                    endpoint,
                    snippet(&other.to_string())
                )));
            }
        };

        Ok(Self {
            endpoint: endpoint.to_string(),
            success,
            message,
            body,
        })
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Turns a `success: false` answer into an error carrying the backend's message.
    pub fn check(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let message = self
            .message
            .unwrap_or_else(|| format!("{} reported failure", self.endpoint));
        warn!(endpoint = %self.endpoint, %message, "backend rejected request");
        Err(AppError::Backend(message))
    }

    /// Payload under `key` (falling back to `data`), or the whole body for bare arrays.
    pub fn payload<T: DeserializeOwned>(self, key: &str) -> Result<T> {
        let Envelope { endpoint, body, .. } = self.check()?;
        let value = match body {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => match map.remove(key).or_else(|| map.remove("data")) {
                Some(v) => v,
                None => {
                    return Err(AppError::Backend(format!("{}: response has no `{}`", endpoint, key)));
                }
            },
            other => {
                return Err(AppError::Serialization(format!(
                    "{}: unexpected body {}",
                    endpoint,
                    snippet(&other.to_string())
                )));
            }
        };
        serde_json::from_value(value).map_err(|e| AppError::Serialization(format!("{}: {}", endpoint, e)))
    }

    /// Lists come back as `null` or `false` when empty on some scripts.
    pub fn list<T: DeserializeOwned>(self, key: &str) -> Result<Vec<T>> {
        let envelope = self.check()?;
        if let Value::Object(map) = &envelope.body {
            let value = map.get(key).or_else(|| map.get("data"));
            if matches!(value, None | Some(Value::Null) | Some(Value::Bool(false))) {
                return Ok(Vec::new());
            }
        }
        envelope.payload(key)
    }
}

// ==========================================
// Client
// ==========================================

pub struct ApiClient {
    base_url: String,
    http: HttpClient,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return endpoint.to_string();
        }
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn read(endpoint: &str, response: Response) -> Result<Envelope> {
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(AppError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: snippet(&text),
            });
        }
        Envelope::parse(endpoint, &text)
    }

    fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Envelope> {
        debug!(endpoint, ?query, "GET");
        let response = self.http.get(self.endpoint_url(endpoint)).query(query).send()?;
        Self::read(endpoint, response)
    }

    fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Envelope> {
        debug!(endpoint, "POST");
        let response = self.http.post(self.endpoint_url(endpoint)).json(body).send()?;
        Self::read(endpoint, response)
    }

    /// POST for scripts that only report success and a message.
    fn mutate<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<String> {
        let envelope = self.post(endpoint, body)?.check()?;
        Ok(envelope.message().unwrap_or("Saved").to_string())
    }

    // ---- auth ----

    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        self.post("login.php", &Credentials { username, password })?.payload("user")
    }

    // ---- clients ----

    pub fn clients(&self) -> Result<Vec<Client>> {
        self.get("get_clients.php", &[])?.list("clients")
    }

    pub fn add_client(&self, name: &str) -> Result<String> {
        self.mutate("add_client.php", &NewClient { name })
    }

    pub fn delete_client(&self, id: u64) -> Result<String> {
        self.mutate("delete_client.php", &IdOnly { id })
    }

    // ---- projects ----

    pub fn projects(&self, client_id: Option<u64>) -> Result<Vec<Project>> {
        let query: Vec<(&str, String)> = client_id.map(|id| ("client_id", id.to_string())).into_iter().collect();
        self.get("get_projects.php", &query)?.list("projects")
    }

    pub fn add_project(&self, project: &NewProject) -> Result<String> {
        self.mutate("add_project.php", project)
    }

    pub fn update_project(&self, project: &Project) -> Result<String> {
        self.mutate("update_project.php", project)
    }

    pub fn delete_project(&self, id: u64) -> Result<String> {
        self.mutate("delete_project.php", &IdOnly { id })
    }

    // ---- quotations ----

    pub fn quotations(&self) -> Result<Vec<Quotation>> {
        self.get("get_quotations.php", &[])?.list("quotations")
    }

    pub fn add_quotation(&self, quotation: &NewQuotation) -> Result<String> {
        self.mutate("add_quotation.php", quotation)
    }

    // ---- employees ----

    pub fn employees(&self) -> Result<Vec<Employee>> {
        self.get("get_employees.php", &[])?.list("employees")
    }

    /// The backend assigns the id; whatever `employee.id` holds is ignored.
    pub fn add_employee(&self, employee: &Employee) -> Result<String> {
        self.mutate("Owner-management/add_employee.php", employee)
    }

    pub fn update_employee(&self, employee: &Employee) -> Result<String> {
        self.mutate("Owner-management/update_employee.php", employee)
    }

    pub fn delete_employee(&self, id: u64) -> Result<String> {
        self.mutate("Owner-management/delete_employee.php", &IdOnly { id })
    }

    // ---- leave ----

    pub fn leave_requests(&self, employee_id: Option<u64>) -> Result<Vec<LeaveRequest>> {
        let query: Vec<(&str, String)> = employee_id.map(|id| ("employee_id", id.to_string())).into_iter().collect();
        self.get("get_leave_requests.php", &query)?.list("leave_requests")
    }

    pub fn submit_leave(&self, leave: &NewLeave) -> Result<String> {
        self.mutate("submit_leave_request.php", leave)
    }

    pub fn update_leave_status(&self, id: u64, status: LeaveStatus) -> Result<String> {
        self.mutate("update_leave_status.php", &LeaveDecision { id, status })
    }

    // ---- work ----

    pub fn assign_project(&self, project_id: u64, employee_id: u64, deadline: Option<NaiveDate>) -> Result<String> {
        self.mutate("assign_project.php", &AssignProject { project_id, employee_id, deadline })
    }

    pub fn assigned_work(&self, employee_id: Option<u64>) -> Result<Vec<Assignment>> {
        let query: Vec<(&str, String)> = employee_id.map(|id| ("employee_id", id.to_string())).into_iter().collect();
        self.get("get_assigned_work.php", &query)?.list("assignments")
    }

    pub fn track_records(&self, project_id: u64) -> Result<Vec<TrackRecord>> {
        self.get("get_track_records.php", &[("project_id", project_id.to_string())])?
            .list("track_records")
    }

    pub fn submit_project_report(&self, report: &ProgressReport) -> Result<String> {
        let endpoint = "submit_project_report.php";
        let mut form = multipart::Form::new()
            .text("project_id", report.project_id.to_string())
            .text("employee_id", report.employee_id.to_string())
            .text("status", report.status.clone())
            .text("progress_percentage", report.progress_percentage.to_string())
            .text("challenges", report.challenges.clone())
            .text("start_date", report.start_date.to_string())
            .text("end_date", report.end_date.to_string());
        for image in &report.images {
            form = form.file("images[]", image)?;
        }

        debug!(endpoint, images = report.images.len(), "POST multipart");
        let response = self.http.post(self.endpoint_url(endpoint)).multipart(form).send()?;
        let envelope = Self::read(endpoint, response)?.check()?;
        Ok(envelope.message().unwrap_or("Report submitted").to_string())
    }

    // ---- users ----

    pub fn users(&self) -> Result<Vec<User>> {
        self.get("Owner-management/get_users.php", &[])?.list("users")
    }

    pub fn add_user(&self, user: &NewUser) -> Result<String> {
        self.mutate("Owner-management/add_user.php", user)
    }

    pub fn delete_user(&self, id: u64) -> Result<String> {
        self.mutate("Owner-management/delete_user.php", &IdOnly { id })
    }

    // ---- revenue ----

    pub fn revenue(&self, year: Option<i32>) -> Result<Vec<RevenuePoint>> {
        let query: Vec<(&str, String)> = year.map(|y| ("year", y.to_string())).into_iter().collect();
        self.get("get_revenue.php", &query)?.list("revenue")
    }

    // ---- files ----

    /// Raw bytes of an uploaded file, addressed by absolute URL or a path under the backend root.
    pub fn download(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.endpoint_url(path);
        debug!(%url, "download");
        let response = self.http.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Http {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body: String::new(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
