use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::api::{LoginRequest, SignupForm};
use crate::models::{
    AttendanceDraft, DepartmentDraft, EmployeeDraft, LeaveDraft, PayrollDraft, ReportDraft,
};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"));

/// Field name → message, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}: {}", field, message)?;
        }
        Ok(())
    }
}

pub trait Validate {
    fn validate(&self) -> FieldErrors;
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

fn name(errors: &mut FieldErrors, field: &'static str, value: &str, required: &str, short: &str) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, required);
    } else if trimmed.chars().count() < 2 {
        errors.add(field, short);
    }
}

fn non_negative(errors: &mut FieldErrors, field: &'static str, value: Option<f64>, message: &str) {
    if value.is_some_and(|v| v < 0.0) {
        errors.add(field, message);
    }
}

impl Validate for DepartmentDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        name(
            &mut errors,
            "name",
            &self.name,
            "Department name is required",
            "Name must be at least 2 characters",
        );
        errors
    }
}

impl Validate for EmployeeDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        name(
            &mut errors,
            "firstName",
            &self.first_name,
            "First name is required",
            "First name must be at least 2 characters",
        );
        name(
            &mut errors,
            "lastName",
            &self.last_name,
            "Last name is required",
            "Last name must be at least 2 characters",
        );
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Email is invalid");
        }
        non_negative(&mut errors, "salary", self.salary, "Salary cannot be negative");
        errors
    }
}

impl Validate for AttendanceDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.employee_id.is_none() {
            errors.add("employeeId", "Employee is required");
        }
        if self.date.is_none() {
            errors.add("date", "Date is required");
        }
        errors
    }
}

impl Validate for LeaveDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.leave_type.trim().is_empty() {
            errors.add("leaveType", "Leave type is required");
        }
        if self.start_date.is_none() {
            errors.add("startDate", "Start date is required");
        }
        if self.end_date.is_none() {
            errors.add("endDate", "End date is required");
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.add("endDate", "End date must be after start date");
            }
        }
        errors
    }
}

impl Validate for PayrollDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.employee_id.is_none() {
            errors.add("employeeId", "Employee is required");
        }
        if self.month.trim().is_empty() {
            errors.add("month", "Month is required");
        }
        non_negative(&mut errors, "basicSalary", Some(self.basic_salary), "Basic salary cannot be negative");
        non_negative(&mut errors, "bonus", Some(self.bonus), "Bonus cannot be negative");
        non_negative(&mut errors, "deductions", Some(self.deductions), "Deductions cannot be negative");
        errors
    }
}

impl Validate for ReportDraft {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.report_type.trim().is_empty() {
            errors.add("reportType", "Report type is required");
        }
        errors
    }
}

impl Validate for SignupForm {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.name.trim().chars().count() < 2 {
            errors.add("name", "Name must be at least 2 characters");
        }
        if !is_valid_email(&self.email) {
            errors.add("email", "Please enter a valid email address");
        }
        if self.password.chars().count() < 6 {
            errors.add("password", "Password must be at least 6 characters");
        }
        if self.confirm_password != self.password {
            errors.add("confirmPassword", "Passwords do not match");
        }
        errors
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        if self.email.trim().is_empty() {
            errors.add("email", "Email is required");
        } else if !is_valid_email(&self.email) {
            errors.add("email", "Email is invalid");
        }
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < 6 {
            errors.add("password", "Password must be at least 6 characters");
        }
        errors
    }
}
