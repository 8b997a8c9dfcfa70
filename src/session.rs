//! Who is signed in, and which views their role may open.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config;
use crate::errors::{AppError, Result};
use crate::model::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Clients,
    Projects,
    Quotations,
    Bills,
    Employees,
    Salary,
    LeaveApply,
    LeaveReview,
    AssignWork,
    MyWork,
    TrackRecords,
    SubmitReport,
    Users,
    Revenue,
}

impl Route {
    pub const ALL: [Route; 14] = [
        Route::Clients,
        Route::Projects,
        Route::Quotations,
        Route::Bills,
        Route::Employees,
        Route::Salary,
        Route::LeaveApply,
        Route::LeaveReview,
        Route::AssignWork,
        Route::MyWork,
        Route::TrackRecords,
        Route::SubmitReport,
        Route::Users,
        Route::Revenue,
    ];

    fn slug(&self) -> &'static str {
        match self {
            Route::Clients => "clients",
            Route::Projects => "projects",
            Route::Quotations => "quotations",
            Route::Bills => "bills",
            Route::Employees => "employees",
            Route::Salary => "salary",
            Route::LeaveApply => "apply-leave",
            Route::LeaveReview => "leave-requests",
            Route::AssignWork => "assign-work",
            Route::MyWork => "assigned-work",
            Route::TrackRecords => "track-records",
            Route::SubmitReport => "submit-report",
            Route::Users => "users",
            Route::Revenue => "revenue",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Clients => "Clients",
            Route::Projects => "Projects",
            Route::Quotations => "Quotations",
            Route::Bills => "Bills",
            Route::Employees => "Employees",
            Route::Salary => "Salary",
            Route::LeaveApply => "Apply for Leave",
            Route::LeaveReview => "Leave Requests",
            Route::AssignWork => "Assign Work",
            Route::MyWork => "Assigned Work",
            Route::TrackRecords => "Track Records",
            Route::SubmitReport => "Submit Report",
            Route::Users => "Users",
            Route::Revenue => "Revenue",
        }
    }

    /// Path of this view under the given role's dashboard, e.g. `/owner/clients`.
    pub fn path_for(&self, role: Role) -> String {
        format!("{}{}", role.dashboard(), self.path())
    }

    pub fn path(&self) -> String {
        format!("/{}", self.slug())
    }
}

impl Role {
    pub fn dashboard(&self) -> &'static str {
        match self {
            Role::Owner => "/owner",
            Role::Clerk => "/clerk",
            Role::Employee => "/employee",
        }
    }

    pub fn allows(&self, route: Route) -> bool {
        use Route::*;
        match self {
            Role::Owner => matches!(
                route,
                Clients | Projects | Quotations | Bills | Employees | Salary | LeaveReview | AssignWork
                    | TrackRecords | Users | Revenue
            ),
            Role::Clerk => matches!(route, Clients | Projects | Quotations | Bills | TrackRecords),
            Role::Employee => matches!(route, LeaveApply | MyWork | SubmitReport),
        }
    }

    pub fn routes(&self) -> Vec<Route> {
        Route::ALL.into_iter().filter(|r| self.allows(*r)).collect()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Session {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<u64>,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            role: user.role,
            employee_id: user.employee_id,
        }
    }
}

impl Session {
    /// Id to send wherever the backend expects an employee; the login id when no record is linked.
    pub fn employee_id(&self) -> u64 {
        self.employee_id.unwrap_or(self.user_id)
    }

    pub fn default_path() -> PathBuf {
        config::config_dir().join("session.toml")
    }

    pub fn load_from(path: &Path) -> Result<Option<Session>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&content)?))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        fs::write(path, toml::to_string_pretty(self)?)?;
        debug!(user = %self.username, role = %self.role, "session saved");
        Ok(())
    }

    pub fn clear(path: &Path) -> Result<bool> {
        if path.exists() {
            fs::remove_file(path)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn require(&self, route: Route) -> Result<()> {
        if self.role.allows(route) {
            Ok(())
        } else {
            Err(AppError::Unauthorized(format!(
                "{} ({}) cannot open {}",
                self.username,
                self.role,
                route.title()
            )))
        }
    }
}

/// Gate for every routed command: a session must exist and its role must reach `route`.
pub fn guard(session: Option<&Session>, route: Route) -> Result<&Session> {
    let session = session.ok_or_else(|| {
        AppError::Unauthorized("not signed in, run `factory-desk login` first".to_string())
    })?;
    session.require(route)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session { user_id: 5, username: "asha".to_string(), role, employee_id: None }
    }

    #[test]
    fn owner_routes() {
        let routes = Role::Owner.routes();
        assert_eq!(routes.len(), 11);
        assert!(routes.contains(&Route::Users));
        assert!(!routes.contains(&Route::LeaveApply));
    }

    #[test]
    fn clerk_routes() {
        assert_eq!(
            Role::Clerk.routes(),
            vec![Route::Clients, Route::Projects, Route::Quotations, Route::Bills, Route::TrackRecords]
        );
    }

    #[test]
    fn employee_routes() {
        assert_eq!(
            Role::Employee.routes(),
            vec![Route::LeaveApply, Route::MyWork, Route::SubmitReport]
        );
    }

    #[test]
    fn every_route_is_reachable_by_someone() {
        for route in Route::ALL {
            assert!(Role::ALL.iter().any(|r| r.allows(route)), "{:?} unreachable", route);
        }
    }

    #[test]
    fn paths_live_under_dashboards() {
        assert_eq!(Route::Clients.path_for(Role::Clerk), "/clerk/clients");
        assert_eq!(Route::MyWork.path_for(Role::Employee), "/employee/assigned-work");
        assert_eq!(Route::LeaveApply.path(), "/apply-leave");
    }

    #[test]
    fn guard_needs_session() {
        let err = guard(None, Route::Clients).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn guard_checks_role() {
        let clerk = session(Role::Clerk);
        assert!(guard(Some(&clerk), Route::Quotations).is_ok());
        assert!(guard(Some(&clerk), Route::Revenue).is_err());
    }

    #[test]
    fn employee_id_falls_back_to_login_id() {
        let unlinked = session(Role::Employee);
        assert_eq!(unlinked.employee_id(), 5);

        let user: User =
            serde_json::from_str(r#"{"id":12,"username":"ravi","role":"employee","employee_id":3}"#).unwrap();
        let linked = Session::from(user);
        assert_eq!(linked.user_id, 12);
        assert_eq!(linked.employee_id(), 3);
    }

    #[test]
    fn linked_employee_survives_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        let linked = Session { employee_id: Some(3), ..session(Role::Employee) };
        linked.save_to(&path).unwrap();
        assert_eq!(Session::load_from(&path).unwrap(), Some(linked));

        fs::write(&path, "user_id = 5\nusername = \"asha\"\nrole = \"employee\"\n").unwrap();
        assert_eq!(Session::load_from(&path).unwrap().map(|s| s.employee_id()), Some(5));
    }

    #[test]
    fn session_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        assert_eq!(Session::load_from(&path).unwrap(), None);

        let owner = session(Role::Owner);
        owner.save_to(&path).unwrap();
        assert_eq!(Session::load_from(&path).unwrap(), Some(owner));

        assert!(Session::clear(&path).unwrap());
        assert!(!Session::clear(&path).unwrap());
    }
}
