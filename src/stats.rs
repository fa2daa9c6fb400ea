use std::fmt;

use chrono::NaiveDate;

use crate::models::{
    Announcement, AttendanceRecord, AttendanceStatus, Department, Employee, LeaveRequest,
    LeaveStatus, PayrollRecord, Report,
};
use crate::query::Queryable;

/// Statistics a record type reports for a filtered subset.
pub trait Aggregate: Sized {
    type Stats: fmt::Display;

    fn aggregate(subset: &[&Self]) -> Self::Stats;
}

/// `count / total` as a percentage; 0 for an empty total.
pub fn rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn format_rate(rate: f64) -> String {
    format!("{:.1}", rate)
}

pub fn average(sum: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { sum / count as f64 }
}

/// Sum of an optional numeric field; absent values count as 0.
pub fn sum_by<R>(subset: &[&R], field: impl Fn(&R) -> Option<f64>) -> f64 {
    subset.iter().map(|r| field(*r).unwrap_or(0.0)).sum()
}

/// Calendar days covered by a leave, both ends inclusive.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs() + 1
}

/// Occurrences of each value of a category field, in first-seen order.
pub fn count_by<R: Queryable>(subset: &[&R], field: &str) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in subset {
        let Some(value) = record.category(field) else { continue };
        match counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value.to_string(), 1)),
        }
    }
    counts
}

/// Currency amount with thousands separators and two decimals.
pub fn money(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{}${}.{:02}", if negative { "-" } else { "" }, grouped, cents % 100)
}

fn write_counts(f: &mut fmt::Formatter<'_>, label: &str, counts: &[(String, usize)]) -> fmt::Result {
    if counts.is_empty() {
        return Ok(());
    }
    let parts: Vec<String> = counts.iter().map(|(v, n)| format!("{} {}", v, n)).collect();
    write!(f, "\n{}: {}", label, parts.join(", "))
}

// --- Attendance ---

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceStats {
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub present_rate: f64,
}

impl AttendanceStats {
    pub fn present_rate_label(&self) -> String {
        format_rate(self.present_rate)
    }
}

impl Aggregate for AttendanceRecord {
    type Stats = AttendanceStats;

    fn aggregate(subset: &[&Self]) -> AttendanceStats {
        let count = |status| subset.iter().filter(|r| r.status == status).count();
        let total = subset.len();
        let present = count(AttendanceStatus::Present);
        AttendanceStats {
            total,
            present,
            late: count(AttendanceStatus::Late),
            absent: count(AttendanceStatus::Absent),
            present_rate: rate(present, total),
        }
    }
}

impl fmt::Display for AttendanceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}  Present: {}  Late: {}  Absent: {}  Present rate: {}%",
            self.total,
            self.present,
            self.late,
            self.absent,
            self.present_rate_label()
        )
    }
}

// --- Payroll ---

#[derive(Debug, Clone, PartialEq)]
pub struct PayrollStats {
    pub records: usize,
    pub total_basic: f64,
    pub total_bonus: f64,
    pub total_deductions: f64,
    pub total_net: f64,
    pub avg_salary: f64,
    /// Net salary of the first visible record (the backend lists newest first).
    pub latest_net: f64,
}

impl Aggregate for PayrollRecord {
    type Stats = PayrollStats;

    fn aggregate(subset: &[&Self]) -> PayrollStats {
        let total_net = sum_by(subset, |p| p.net_salary);
        PayrollStats {
            records: subset.len(),
            total_basic: sum_by(subset, |p| p.basic_salary),
            total_bonus: sum_by(subset, |p| p.bonus),
            total_deductions: sum_by(subset, |p| p.deductions),
            total_net,
            avg_salary: average(total_net, subset.len()),
            latest_net: subset.first().and_then(|p| p.net_salary).unwrap_or(0.0),
        }
    }
}

impl fmt::Display for PayrollStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Records: {}  Basic: {}  Bonus: {}  Deductions: {}\nNet: {}  Average: {}  Latest: {}",
            self.records,
            money(self.total_basic),
            money(self.total_bonus),
            money(self.total_deductions),
            money(self.total_net),
            money(self.avg_salary),
            money(self.latest_net)
        )
    }
}

// --- Leave ---

#[derive(Debug, Clone, PartialEq)]
pub struct LeaveStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub total_days: i64,
}

impl Aggregate for LeaveRequest {
    type Stats = LeaveStats;

    fn aggregate(subset: &[&Self]) -> LeaveStats {
        let count = |status| subset.iter().filter(|l| l.status == status).count();
        LeaveStats {
            total: subset.len(),
            pending: count(LeaveStatus::Pending),
            approved: count(LeaveStatus::Approved),
            rejected: count(LeaveStatus::Rejected),
            total_days: subset
                .iter()
                .filter(|l| l.status == LeaveStatus::Approved)
                .map(|l| leave_days(l.start_date, l.end_date))
                .sum(),
        }
    }
}

impl fmt::Display for LeaveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}  Pending: {}  Approved: {}  Rejected: {}  Days: {}",
            self.total, self.pending, self.approved, self.rejected, self.total_days
        )
    }
}

// --- Employees ---

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeStats {
    pub total: usize,
    pub total_salary: f64,
    pub avg_salary: f64,
    pub by_department: Vec<(String, usize)>,
}

impl Aggregate for Employee {
    type Stats = EmployeeStats;

    fn aggregate(subset: &[&Self]) -> EmployeeStats {
        let total_salary = sum_by(subset, |e| e.salary);
        EmployeeStats {
            total: subset.len(),
            total_salary,
            avg_salary: average(total_salary, subset.len()),
            by_department: count_by(subset, "department"),
        }
    }
}

impl fmt::Display for EmployeeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Employees: {}  Payroll: {}  Average salary: {}",
            self.total,
            money(self.total_salary),
            money(self.avg_salary)
        )?;
        write_counts(f, "By department", &self.by_department)
    }
}

// --- Departments ---

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentStats {
    pub total: usize,
}

impl Aggregate for Department {
    type Stats = DepartmentStats;

    fn aggregate(subset: &[&Self]) -> DepartmentStats {
        DepartmentStats { total: subset.len() }
    }
}

impl fmt::Display for DepartmentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Departments: {}", self.total)
    }
}

// --- Reports ---

#[derive(Debug, Clone, PartialEq)]
pub struct ReportStats {
    pub total: usize,
    pub by_type: Vec<(String, usize)>,
}

impl Aggregate for Report {
    type Stats = ReportStats;

    fn aggregate(subset: &[&Self]) -> ReportStats {
        ReportStats {
            total: subset.len(),
            by_type: count_by(subset, "type"),
        }
    }
}

impl fmt::Display for ReportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reports: {}", self.total)?;
        write_counts(f, "By type", &self.by_type)
    }
}

// --- Announcements ---

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementStats {
    pub total: usize,
    pub by_priority: Vec<(String, usize)>,
}

impl Aggregate for Announcement {
    type Stats = AnnouncementStats;

    fn aggregate(subset: &[&Self]) -> AnnouncementStats {
        AnnouncementStats {
            total: subset.len(),
            by_priority: count_by(subset, "priority"),
        }
    }
}

impl fmt::Display for AnnouncementStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Announcements: {}", self.total)?;
        write_counts(f, "By priority", &self.by_priority)
    }
}

// --- Admin dashboard ---

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardStats {
    pub total_employees: usize,
    pub total_departments: usize,
    pub pending_leaves: usize,
    pub attendance_rate: f64,
}

impl DashboardStats {
    pub fn compute(
        employees: &[Employee],
        departments: &[Department],
        leaves: &[LeaveRequest],
        attendance: &[AttendanceRecord],
    ) -> Self {
        let present = attendance
            .iter()
            .filter(|a| a.status == AttendanceStatus::Present)
            .count();
        Self {
            total_employees: employees.len(),
            total_departments: departments.len(),
            pending_leaves: leaves
                .iter()
                .filter(|l| l.status == LeaveStatus::Pending)
                .count(),
            attendance_rate: rate(present, attendance.len()),
        }
    }
}

impl fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Employees:       {}", self.total_employees)?;
        writeln!(f, "Departments:     {}", self.total_departments)?;
        writeln!(f, "Pending leaves:  {}", self.pending_leaves)?;
        write!(f, "Attendance rate: {:.0}%", self.attendance_rate.round())
    }
}
