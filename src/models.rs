use std::borrow::Cow;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::query::Queryable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 3] = [Self::Present, Self::Late, Self::Absent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Present => "Present",
            Self::Late => "Late",
            Self::Absent => "Absent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    pub const ALL: [LeaveStatus; 3] = [Self::Pending, Self::Approved, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(AttendanceStatus, LeaveStatus);

// --- Records as the backend returns them ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub department_name: Option<String>, // denormalized by the backend
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
    #[serde(default)]
    pub date_of_joining: Option<NaiveDate>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub employee_id: i64,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: i64,
    pub employee_id: i64,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: LeaveStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollRecord {
    pub id: i64,
    pub employee_id: i64,
    #[serde(default)]
    pub employee_name: Option<String>,
    pub month: String,
    #[serde(default)]
    pub basic_salary: Option<f64>,
    #[serde(default)]
    pub bonus: Option<f64>,
    #[serde(default)]
    pub deductions: Option<f64>,
    /// Taken as sent by the backend; never recomputed from the other amounts.
    #[serde(default)]
    pub net_salary: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub report_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_date: Option<NaiveDate>,
    #[serde(default)]
    pub employee_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Announcement {
    pub id: i64,
    pub title: String,
    pub date: NaiveDate,
    pub message: String,
    pub priority: String, // "high", "medium", "low"
    pub category: String,
}

/// Company announcements. There is no backend resource for these; the list
/// ships with the client.
pub fn announcements() -> Vec<Announcement> {
    let entries = [
        (
            1,
            "Company Holiday - Diwali",
            "2025-10-20",
            "The office will be closed for Diwali celebration on October 25-27, 2025.",
            "high",
            "Holiday",
        ),
        (
            2,
            "New Health Insurance Policy",
            "2025-10-15",
            "We are pleased to announce enhanced health insurance coverage for all employees starting November 1st.",
            "medium",
            "Benefits",
        ),
        (
            3,
            "Performance Review Cycle",
            "2025-10-10",
            "The annual performance review cycle will begin on November 1st. Please ensure your self-assessments are completed by October 31st.",
            "high",
            "HR",
        ),
        (
            4,
            "Team Building Event",
            "2025-10-05",
            "Join us for a fun team building event on November 15th at the company retreat center. RSVP by November 1st.",
            "low",
            "Event",
        ),
        (
            5,
            "New Parking Policy",
            "2025-09-28",
            "Updated parking guidelines are now in effect. Please review the employee handbook for details.",
            "medium",
            "Facilities",
        ),
    ];

    entries
        .into_iter()
        .filter_map(|(id, title, date, message, priority, category)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            Some(Announcement {
                id,
                title: title.to_string(),
                date,
                message: message.to_string(),
                priority: priority.to_string(),
                category: category.to_string(),
            })
        })
        .collect()
}

// --- Write payloads (records minus the id) ---

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub department_id: Option<i64>,
    pub role: Option<String>,
    pub salary: Option<f64>,
    pub date_of_joining: Option<NaiveDate>,
}

impl From<&Employee> for EmployeeDraft {
    fn from(e: &Employee) -> Self {
        Self {
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            email: e.email.clone(),
            department_id: e.department_id,
            role: e.role.clone(),
            salary: e.salary,
            date_of_joining: e.date_of_joining,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentDraft {
    pub name: String,
    pub description: Option<String>,
    pub head: Option<String>,
}

impl From<&Department> for DepartmentDraft {
    fn from(d: &Department) -> Self {
        Self {
            name: d.name.clone(),
            description: d.description.clone(),
            head: d.head.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceDraft {
    pub employee_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveDraft {
    pub employee_id: Option<i64>,
    pub leave_type: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: LeaveStatus,
}

impl LeaveDraft {
    /// The same request with a new status, as sent by approve/reject.
    pub fn with_status(leave: &LeaveRequest, status: LeaveStatus) -> Self {
        Self {
            employee_id: Some(leave.employee_id),
            leave_type: leave.leave_type.clone(),
            start_date: Some(leave.start_date),
            end_date: Some(leave.end_date),
            status,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayrollDraft {
    pub employee_id: Option<i64>,
    pub month: String,
    pub basic_salary: f64,
    pub bonus: f64,
    pub deductions: f64,
    pub net_salary: f64,
}

impl From<&PayrollRecord> for PayrollDraft {
    fn from(p: &PayrollRecord) -> Self {
        Self {
            employee_id: Some(p.employee_id),
            month: p.month.clone(),
            basic_salary: p.basic_salary.unwrap_or(0.0),
            bonus: p.bonus.unwrap_or(0.0),
            deductions: p.deductions.unwrap_or(0.0),
            net_salary: p.net_salary.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDraft {
    pub report_type: String,
    pub description: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub employee_id: Option<i64>,
}

impl From<&Report> for ReportDraft {
    fn from(r: &Report) -> Self {
        Self {
            report_type: r.report_type.clone(),
            description: r.description.clone(),
            created_date: r.created_date,
            employee_id: r.employee_id,
        }
    }
}

// --- Query configuration per record type ---

fn opt(value: &Option<String>) -> Cow<'_, str> {
    Cow::Borrowed(value.as_deref().unwrap_or(""))
}

impl Queryable for Employee {
    const CATEGORIES: &'static [&'static str] = &["department", "role"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(&self.first_name),
            Cow::Borrowed(&self.last_name),
            Cow::Borrowed(&self.email),
            opt(&self.role),
            opt(&self.department_name),
        ]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "department" => self.department_name.as_deref(),
            "role" => self.role.as_deref(),
            _ => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date_of_joining
    }
}

impl Queryable for Department {
    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(&self.name),
            opt(&self.description),
            opt(&self.head),
        ]
    }
}

impl Queryable for AttendanceRecord {
    const CATEGORIES: &'static [&'static str] = &["status"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Owned(self.employee_id.to_string()),
            opt(&self.employee_name),
        ]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "status" => Some(self.status.as_str()),
            _ => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Queryable for LeaveRequest {
    const CATEGORIES: &'static [&'static str] = &["status", "type"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Owned(self.employee_id.to_string()),
            Cow::Borrowed(&self.leave_type),
            opt(&self.employee_name),
        ]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "status" => Some(self.status.as_str()),
            "type" => Some(&self.leave_type),
            _ => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.start_date)
    }
}

impl Queryable for PayrollRecord {
    const CATEGORIES: &'static [&'static str] = &["month"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Owned(self.employee_id.to_string()),
            opt(&self.employee_name),
        ]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "month" => Some(&self.month),
            _ => None,
        }
    }
}

impl Queryable for Report {
    const CATEGORIES: &'static [&'static str] = &["type"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![Cow::Borrowed(&self.report_type), opt(&self.description)]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "type" => Some(&self.report_type),
            _ => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        self.created_date
    }
}

impl Queryable for Announcement {
    const CATEGORIES: &'static [&'static str] = &["category", "priority"];

    fn id(&self) -> i64 {
        self.id
    }

    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        vec![
            Cow::Borrowed(&self.title),
            Cow::Borrowed(&self.message),
            Cow::Borrowed(&self.category),
        ]
    }

    fn category(&self, field: &str) -> Option<&str> {
        match field {
            "category" => Some(&self.category),
            "priority" => Some(&self.priority),
            _ => None,
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}
