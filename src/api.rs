use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    AttendanceDraft, AttendanceRecord, Department, DepartmentDraft, Employee, EmployeeDraft,
    LeaveDraft, LeaveRequest, PayrollDraft, PayrollRecord, Report, ReportDraft,
};
use crate::validate::Validate;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}")]
    Status { status: u16, message: Option<String> },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text shown to the user: the backend's own message when it sent one,
    /// otherwise the error itself.
    pub fn user_message(&self) -> String {
        if let ApiError::Status {
            message: Some(message),
            ..
        } = self
        {
            if !message.trim().is_empty() {
                return message.clone();
            }
        }
        let text = self.to_string();
        if text.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            text
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

// --- Resources ---

/// A backend collection and the payload used to write to it.
pub trait Resource: DeserializeOwned {
    const PATH: &'static str;
    const LABEL: &'static str;
    const PLURAL: &'static str;

    type Draft: Serialize + Validate;
}

impl Resource for Employee {
    const PATH: &'static str = "employees";
    const LABEL: &'static str = "Employee";
    const PLURAL: &'static str = "employees";
    type Draft = EmployeeDraft;
}

impl Resource for Department {
    const PATH: &'static str = "departments";
    const LABEL: &'static str = "Department";
    const PLURAL: &'static str = "departments";
    type Draft = DepartmentDraft;
}

impl Resource for AttendanceRecord {
    const PATH: &'static str = "attendance";
    const LABEL: &'static str = "Attendance record";
    const PLURAL: &'static str = "attendance records";
    type Draft = AttendanceDraft;
}

impl Resource for LeaveRequest {
    const PATH: &'static str = "leave";
    const LABEL: &'static str = "Leave request";
    const PLURAL: &'static str = "leave requests";
    type Draft = LeaveDraft;
}

impl Resource for PayrollRecord {
    const PATH: &'static str = "payroll";
    const LABEL: &'static str = "Payroll record";
    const PLURAL: &'static str = "payroll records";
    type Draft = PayrollDraft;
}

impl Resource for Report {
    const PATH: &'static str = "reports";
    const LABEL: &'static str = "Report";
    const PLURAL: &'static str = "reports";
    type Draft = ReportDraft;
}

/// Which slice of a collection to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Employee(i64),
}

impl Scope {
    pub fn path(&self, resource: &str) -> String {
        match self {
            Scope::All => resource.to_string(),
            Scope::Employee(id) => format!("{}/employee/{}", resource, id),
        }
    }
}

// --- Seams used by the view ---

pub trait RecordSource<R> {
    fn fetch(&self) -> Result<Vec<R>, ApiError>;
}

/// A list already in hand; fetching it never fails.
impl<R: Clone> RecordSource<R> for Vec<R> {
    fn fetch(&self) -> Result<Vec<R>, ApiError> {
        Ok(self.clone())
    }
}

pub trait MutationGateway<R: Resource> {
    fn create(&self, draft: &R::Draft) -> Result<(), ApiError>;
    fn update(&self, id: i64, draft: &R::Draft) -> Result<(), ApiError>;
    fn delete(&self, id: i64) -> Result<(), ApiError>;
}

// --- Auth payloads ---

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
    pub user_type: String, // "employee" or "admin"
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub employee_id: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

// --- HTTP backend ---

pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        // None turns off the blocking client's 30s default
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, ApiError> {
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        let message = parse_error_message(&body);
        warn!(status = status.as_u16(), ?message, "backend request failed");
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.send(self.client.get(&url))?;
        response
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn list<R: Resource>(&self, scope: Scope) -> Result<Vec<R>, ApiError> {
        self.get_json(&scope.path(R::PATH))
    }

    pub fn get<R: Resource>(&self, id: i64) -> Result<R, ApiError> {
        self.get_json(&format!("{}/{}", R::PATH, id))
    }

    pub fn create<R: Resource>(&self, draft: &R::Draft) -> Result<(), ApiError> {
        let url = self.url(R::PATH);
        debug!(%url, "POST");
        self.send(self.client.post(&url).json(draft))?;
        Ok(())
    }

    pub fn update<R: Resource>(&self, id: i64, draft: &R::Draft) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/{}", R::PATH, id));
        debug!(%url, "PUT");
        self.send(self.client.put(&url).json(draft))?;
        Ok(())
    }

    pub fn delete<R: Resource>(&self, id: i64) -> Result<(), ApiError> {
        let url = self.url(&format!("{}/{}", R::PATH, id));
        debug!(%url, "DELETE");
        self.send(self.client.delete(&url))?;
        Ok(())
    }

    pub fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let url = self.url("login");
        debug!(%url, email = %request.email, "POST");
        self.send(self.client.post(&url).json(request))?
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn signup(&self, form: &SignupForm) -> Result<AuthResponse, ApiError> {
        let url = self.url("signup");
        debug!(%url, email = %form.email, "POST");
        self.send(self.client.post(&url).json(form))?
            .json()
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn scoped(&self, scope: Scope) -> Scoped<'_> {
        Scoped {
            backend: self,
            scope,
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// The backend narrowed to one scope, as handed to a view.
pub struct Scoped<'a> {
    backend: &'a HttpBackend,
    scope: Scope,
}

impl<R: Resource> RecordSource<R> for Scoped<'_> {
    fn fetch(&self) -> Result<Vec<R>, ApiError> {
        self.backend.list(self.scope)
    }
}

impl<R: Resource> MutationGateway<R> for Scoped<'_> {
    fn create(&self, draft: &R::Draft) -> Result<(), ApiError> {
        self.backend.create::<R>(draft)
    }

    fn update(&self, id: i64, draft: &R::Draft) -> Result<(), ApiError> {
        self.backend.update::<R>(id, draft)
    }

    fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.backend.delete::<R>(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_paths() {
        assert_eq!(Scope::All.path(LeaveRequest::PATH), "leave");
        assert_eq!(
            Scope::Employee(12).path(PayrollRecord::PATH),
            "payroll/employee/12"
        );
    }

    #[test]
    fn test_join_url_handles_slashes() {
        assert_eq!(
            join_url("http://localhost:8081/api/", "/employees"),
            "http://localhost:8081/api/employees"
        );
        assert_eq!(join_url("http://h/api", "leave/3"), "http://h/api/leave/3");
    }

    #[test]
    fn test_backend_message_is_preferred() {
        let err = ApiError::Status {
            status: 400,
            message: Some("Email already exists".to_string()),
        };
        assert_eq!(err.user_message(), "Email already exists");
    }

    #[test]
    fn test_status_without_message_falls_back_to_error_text() {
        let err = ApiError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.user_message(), "request failed with status 500");
    }

    #[test]
    fn test_blank_backend_message_falls_back_to_error_text() {
        assert_eq!(
            ApiError::Status { status: 500, message: Some("  ".to_string()) }.user_message(),
            "request failed with status 500"
        );
    }

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            parse_error_message(r#"{"message":"Invalid credentials"}"#),
            Some("Invalid credentials".to_string())
        );
        assert_eq!(parse_error_message(r#"{"error":"x"}"#), None);
        assert_eq!(parse_error_message("<html>oops</html>"), None);
        assert_eq!(parse_error_message(r#"{"message":""}"#), None);
    }

    #[test]
    fn test_signup_form_does_not_send_confirmation() {
        let form = SignupForm {
            name: "Asha".to_string(),
            email: "asha@corp.io".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
            user_type: "employee".to_string(),
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["userType"], "employee");
        assert!(value.get("confirmPassword").is_none());
    }

    #[test]
    fn test_auth_response_tolerates_error_shape() {
        let response: AuthResponse =
            serde_json::from_str(r#"{"message":"Invalid email or password"}"#).unwrap();
        assert_eq!(response.employee_id, None);
        assert_eq!(response.message.as_deref(), Some("Invalid email or password"));
    }
}
