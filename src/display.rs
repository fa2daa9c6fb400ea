use std::fmt::Write;

use anyhow::{Result, bail};

use crate::models::{
    Announcement, AttendanceRecord, Department, Employee, LeaveRequest, PayrollRecord, Report,
};
use crate::query::Queryable;
use crate::stats::{Aggregate, leave_days, money};
use crate::view::{QueryView, ViewState};

const WRAP: usize = 70;

pub trait Render {
    /// Plural noun used in listing summaries.
    const NOUN: &'static str;

    fn header() -> String;
    fn row(&self) -> String;

    /// One-line entry for the browser list.
    fn label(&self) -> String;

    fn detail(&self) -> Vec<String>;
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn amount(value: Option<f64>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

fn who(name: &Option<String>, employee_id: i64) -> String {
    match name {
        Some(name) if !name.is_empty() => name.clone(),
        _ => format!("#{}", employee_id),
    }
}

fn wrapped(label: &str, text: &str) -> Vec<String> {
    let mut lines = vec![format!("{}:", label)];
    lines.extend(textwrap::wrap(text, WRAP).into_iter().map(|l| format!("  {}", l)));
    lines
}

impl Render for Employee {
    const NOUN: &'static str = "employees";

    fn header() -> String {
        format!(
            "{:<6} {:<24} {:<28} {:<16} {:<16} {:>14}",
            "ID", "NAME", "EMAIL", "DEPARTMENT", "ROLE", "SALARY"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<24} {:<28} {:<16} {:<16} {:>14}",
            self.id,
            truncate(&self.full_name(), 22),
            truncate(&self.email, 26),
            truncate(or_dash(self.department_name.as_deref()), 14),
            truncate(or_dash(self.role.as_deref()), 14),
            amount(self.salary)
        )
    }

    fn label(&self) -> String {
        format!("#{:<4} {}", self.id, self.full_name())
    }

    fn detail(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Employee #{}", self.id),
            format!("Name: {}", self.full_name()),
            format!("Email: {}", self.email),
            format!("Department: {}", or_dash(self.department_name.as_deref())),
            format!("Role: {}", or_dash(self.role.as_deref())),
            format!("Salary: {}", amount(self.salary)),
        ];
        if let Some(joined) = self.date_of_joining {
            lines.push(format!("Joined: {}", joined));
        }
        lines
    }
}

impl Render for Department {
    const NOUN: &'static str = "departments";

    fn header() -> String {
        format!("{:<6} {:<24} {:<20} {:<40}", "ID", "NAME", "HEAD", "DESCRIPTION")
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<24} {:<20} {:<40}",
            self.id,
            truncate(&self.name, 22),
            truncate(or_dash(self.head.as_deref()), 18),
            truncate(or_dash(self.description.as_deref()), 40)
        )
    }

    fn label(&self) -> String {
        format!("#{:<4} {}", self.id, self.name)
    }

    fn detail(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Department #{}", self.id),
            format!("Name: {}", self.name),
            format!("Head: {}", or_dash(self.head.as_deref())),
        ];
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(String::new());
            lines.extend(wrapped("Description", description));
        }
        lines
    }
}

impl Render for AttendanceRecord {
    const NOUN: &'static str = "attendance records";

    fn header() -> String {
        format!("{:<6} {:<24} {:<12} {:<10}", "ID", "EMPLOYEE", "DATE", "STATUS")
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<24} {:<12} {:<10}",
            self.id,
            truncate(&who(&self.employee_name, self.employee_id), 22),
            self.date.to_string(),
            self.status.as_str()
        )
    }

    fn label(&self) -> String {
        format!("{} {:<8} {}", self.date, self.status.as_str(), who(&self.employee_name, self.employee_id))
    }

    fn detail(&self) -> Vec<String> {
        vec![
            format!("Attendance #{}", self.id),
            format!("Employee: {} (ID {})", who(&self.employee_name, self.employee_id), self.employee_id),
            format!("Date: {}", self.date),
            format!("Status: {}", self.status),
        ]
    }
}

impl Render for LeaveRequest {
    const NOUN: &'static str = "leave requests";

    fn header() -> String {
        format!(
            "{:<6} {:<22} {:<12} {:<12} {:<12} {:>5} {:<10}",
            "ID", "EMPLOYEE", "TYPE", "FROM", "TO", "DAYS", "STATUS"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<22} {:<12} {:<12} {:<12} {:>5} {:<10}",
            self.id,
            truncate(&who(&self.employee_name, self.employee_id), 20),
            truncate(&self.leave_type, 12),
            self.start_date.to_string(),
            self.end_date.to_string(),
            leave_days(self.start_date, self.end_date),
            self.status.as_str()
        )
    }

    fn label(&self) -> String {
        format!("#{:<4} {:<8} {} {}", self.id, self.status.as_str(), self.leave_type, self.start_date)
    }

    fn detail(&self) -> Vec<String> {
        vec![
            format!("Leave request #{}", self.id),
            format!("Employee: {} (ID {})", who(&self.employee_name, self.employee_id), self.employee_id),
            format!("Type: {}", self.leave_type),
            format!(
                "Dates: {} to {} ({} days)",
                self.start_date,
                self.end_date,
                leave_days(self.start_date, self.end_date)
            ),
            format!("Status: {}", self.status),
        ]
    }
}

impl Render for PayrollRecord {
    const NOUN: &'static str = "payroll records";

    fn header() -> String {
        format!(
            "{:<6} {:<20} {:<14} {:>13} {:>11} {:>11} {:>13}",
            "ID", "EMPLOYEE", "MONTH", "BASIC", "BONUS", "DEDUCTIONS", "NET"
        )
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<20} {:<14} {:>13} {:>11} {:>11} {:>13}",
            self.id,
            truncate(&who(&self.employee_name, self.employee_id), 18),
            truncate(&self.month, 14),
            amount(self.basic_salary),
            amount(self.bonus),
            amount(self.deductions),
            amount(self.net_salary)
        )
    }

    fn label(&self) -> String {
        format!("#{:<4} {} {}", self.id, self.month, who(&self.employee_name, self.employee_id))
    }

    fn detail(&self) -> Vec<String> {
        vec![
            format!("Payroll #{}", self.id),
            format!("Employee: {} (ID {})", who(&self.employee_name, self.employee_id), self.employee_id),
            format!("Month: {}", self.month),
            format!("Basic salary: {}", amount(self.basic_salary)),
            format!("Bonus:        {}", amount(self.bonus)),
            format!("Deductions:   {}", amount(self.deductions)),
            format!("Net salary:   {}", amount(self.net_salary)),
        ]
    }
}

impl Render for Report {
    const NOUN: &'static str = "reports";

    fn header() -> String {
        format!("{:<6} {:<20} {:<12} {:<10} {:<36}", "ID", "TYPE", "CREATED", "EMPLOYEE", "DESCRIPTION")
    }

    fn row(&self) -> String {
        format!(
            "{:<6} {:<20} {:<12} {:<10} {:<36}",
            self.id,
            truncate(&self.report_type, 18),
            self.created_date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            self.employee_id.map(|id| format!("#{}", id)).unwrap_or_else(|| "-".to_string()),
            truncate(or_dash(self.description.as_deref()), 36)
        )
    }

    fn label(&self) -> String {
        format!("#{:<4} {}", self.id, self.report_type)
    }

    fn detail(&self) -> Vec<String> {
        let mut lines = vec![format!("Report #{}", self.id), format!("Type: {}", self.report_type)];
        if let Some(created) = self.created_date {
            lines.push(format!("Created: {}", created));
        }
        if let Some(employee_id) = self.employee_id {
            lines.push(format!("Employee ID: {}", employee_id));
        }
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            lines.push(String::new());
            lines.extend(wrapped("Description", description));
        }
        lines
    }
}

impl Render for Announcement {
    const NOUN: &'static str = "announcements";

    fn header() -> String {
        format!("{:<4} {:<12} {:<8} {:<12} {:<40}", "ID", "DATE", "PRIORITY", "CATEGORY", "TITLE")
    }

    fn row(&self) -> String {
        format!(
            "{:<4} {:<12} {:<8} {:<12} {:<40}",
            self.id,
            self.date.to_string(),
            self.priority,
            truncate(&self.category, 12),
            truncate(&self.title, 40)
        )
    }

    fn label(&self) -> String {
        format!("{} {}", self.date, self.title)
    }

    fn detail(&self) -> Vec<String> {
        let mut lines = vec![
            self.title.clone(),
            format!("{} | {} | priority {}", self.date, self.category, self.priority),
            String::new(),
        ];
        lines.extend(textwrap::wrap(&self.message, WRAP).into_iter().map(|l| l.into_owned()));
        lines
    }
}

/// Category choices as one line per field, the selected value in brackets.
pub fn choices_block<R: Queryable + Aggregate>(view: &QueryView<R>) -> String {
    let mut out = String::new();
    for field in R::CATEGORIES {
        let selected = view.criteria().selected(field);
        let choices: Vec<String> = view
            .choices(field)
            .into_iter()
            .map(|c| if c == selected { format!("[{}]", c) } else { c })
            .collect();
        let _ = writeln!(out, "{}: {}", field, choices.join(" "));
    }
    out
}

/// Everything a `list` command prints: statistics, the visible count,
/// filter choices and the table. A failed load is an error.
pub fn listing<R: Render + Queryable + Aggregate>(view: &QueryView<R>) -> Result<String> {
    if let ViewState::Failed(message) = view.state() {
        bail!("Failed to load {}: {}", R::NOUN, message);
    }

    let visible = view.visible();
    let total = view.records().len();
    let mut out = String::new();

    let _ = writeln!(out, "{}", view.stats());
    let _ = writeln!(out);
    let _ = writeln!(out, "Showing {} of {} {}", visible.len(), total, R::NOUN);
    out.push_str(&choices_block(view));
    let _ = writeln!(out);

    if total == 0 {
        let _ = writeln!(out, "No {} found.", R::NOUN);
    } else if visible.is_empty() {
        let _ = writeln!(out, "No {} match the current filters.", R::NOUN);
    } else {
        let header = R::header();
        let _ = writeln!(out, "{}", header);
        let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
        for record in visible {
            let _ = writeln!(out, "{}", record.row());
        }
    }
    Ok(out)
}
