mod api;
mod config;
mod display;
mod models;
mod query;
mod session;
mod stats;
mod tui;
mod validate;
mod view;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::{ApiError, HttpBackend, LoginRequest, Resource, Scope, SignupForm};
use config::Config;
use display::Render;
use models::{
    AttendanceDraft, AttendanceRecord, AttendanceStatus, Department, DepartmentDraft, Employee,
    EmployeeDraft, LeaveDraft, LeaveRequest, LeaveStatus, PayrollDraft, PayrollRecord, Report,
    ReportDraft,
};
use query::{Criteria, Queryable};
use session::{scope_for, session_employee, Session, SessionContext, SessionStore};
use stats::{Aggregate, DashboardStats};
use validate::Validate;
use view::{Confirm, Outcome, QueryView, ViewState};

#[derive(Parser)]
#[command(name = "ems")]
#[command(about = "Employee management - people, attendance, leave and payroll from the terminal")]
struct Cli {
    /// Backend base URL (overrides EMS_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        email: String,

        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        name: String,
        email: String,

        /// Password (prompted for when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Register as an administrator instead of an employee
        #[arg(long)]
        admin: bool,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Summary numbers for the logged-in user
    Dashboard,

    /// The logged-in employee's own record
    Profile,

    /// Manage employees
    Employees {
        #[command(subcommand)]
        command: EmployeeCommands,
    },

    /// Manage departments
    Departments {
        #[command(subcommand)]
        command: DepartmentCommands,
    },

    /// Attendance records
    Attendance {
        #[command(subcommand)]
        command: AttendanceCommands,
    },

    /// Leave requests
    Leaves {
        #[command(subcommand)]
        command: LeaveCommands,
    },

    /// Payroll records
    Payroll {
        #[command(subcommand)]
        command: PayrollCommands,
    },

    /// Reports
    Reports {
        #[command(subcommand)]
        command: ReportCommands,
    },

    /// Company announcements
    Announcements {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// high, medium or low
        #[arg(long)]
        priority: Option<String>,

        /// Print each announcement in full
        #[arg(long)]
        full: bool,
    },

    /// Interactive list/detail browser
    Browse {
        resource: BrowseTarget,

        /// Only the logged-in employee's own records
        #[arg(long)]
        mine: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BrowseTarget {
    Employees,
    Departments,
    Attendance,
    Leaves,
    Payroll,
    Reports,
}

#[derive(Subcommand)]
enum EmployeeCommands {
    /// List employees
    List {
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by department name
        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        role: Option<String>,

        /// Filter by joining date (YYYY-MM-DD)
        #[arg(long)]
        joined: Option<NaiveDate>,
    },

    /// Show one employee
    Show { id: i64 },

    /// Add an employee
    Add {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        /// Department name or ID
        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        salary: Option<f64>,

        #[arg(long)]
        joined: Option<NaiveDate>,
    },

    /// Change an employee; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        /// Department name or ID
        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        role: Option<String>,

        #[arg(long)]
        salary: Option<f64>,

        #[arg(long)]
        joined: Option<NaiveDate>,
    },

    /// Delete an employee
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum DepartmentCommands {
    /// List departments
    List {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show one department
    Show { id: i64 },

    /// Add a department
    Add {
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        head: Option<String>,
    },

    /// Change a department; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        head: Option<String>,
    },

    /// Delete a department
    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AttendanceCommands {
    /// List attendance records
    List {
        /// Match on employee ID or name
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, value_parser = attendance_status)]
        status: Option<AttendanceStatus>,

        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        mine: bool,
    },

    /// Show one record
    Show { id: i64 },

    /// Mark attendance
    Add {
        /// Employee ID (defaults to the logged-in employee)
        #[arg(long)]
        employee: Option<i64>,

        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long, value_parser = attendance_status, default_value = "Present")]
        status: AttendanceStatus,
    },

    /// Correct a record
    Update {
        id: i64,

        #[arg(long, value_parser = attendance_status)]
        status: Option<AttendanceStatus>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a record
    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum LeaveCommands {
    /// List leave requests
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, value_parser = leave_status)]
        status: Option<LeaveStatus>,

        #[arg(long = "type")]
        leave_type: Option<String>,

        #[arg(long)]
        mine: bool,
    },

    /// Show one request
    Show { id: i64 },

    /// Apply for leave
    Apply {
        #[arg(long = "type")]
        leave_type: String,

        #[arg(long)]
        from: NaiveDate,

        #[arg(long)]
        to: NaiveDate,

        /// Employee ID (defaults to the logged-in employee)
        #[arg(long)]
        employee: Option<i64>,
    },

    /// Approve a pending request
    Approve { id: i64 },

    /// Reject a pending request
    Reject { id: i64 },

    /// Delete a request
    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PayrollCommands {
    /// List payroll records
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        mine: bool,
    },

    /// Show one payslip
    Show { id: i64 },

    /// Add a payroll record
    Add {
        #[arg(long)]
        employee: i64,

        /// e.g. "October 2025"
        #[arg(long)]
        month: String,

        #[arg(long)]
        basic: f64,

        #[arg(long, default_value = "0")]
        bonus: f64,

        #[arg(long, default_value = "0")]
        deductions: f64,

        /// Net amount as it should be recorded
        #[arg(long)]
        net: f64,
    },

    /// Correct a payroll record; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        basic: Option<f64>,

        #[arg(long)]
        bonus: Option<f64>,

        #[arg(long)]
        deductions: Option<f64>,

        #[arg(long)]
        net: Option<f64>,
    },

    /// Delete a payroll record
    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// List reports
    List {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long = "type")]
        report_type: Option<String>,

        #[arg(long)]
        mine: bool,
    },

    /// Show one report
    Show { id: i64 },

    /// File a report
    Add {
        #[arg(long = "type")]
        report_type: String,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        employee: Option<i64>,

        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Change a report; omitted fields keep their value
    Update {
        id: i64,

        #[arg(long = "type")]
        report_type: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a report
    Delete {
        id: i64,

        #[arg(long)]
        yes: bool,
    },
}

fn attendance_status(value: &str) -> Result<AttendanceStatus, String> {
    AttendanceStatus::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| "expected Present, Late or Absent".to_string())
}

fn leave_status(value: &str) -> Result<LeaveStatus, String> {
    LeaveStatus::ALL
        .into_iter()
        .find(|s| s.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| "expected Pending, Approved or Rejected".to_string())
}

fn init_tracing(filter: &str) -> Result<()> {
    let env_filter = EnvFilter::try_new(filter)
        .with_context(|| format!("invalid log filter: {}", filter))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn api_error(err: ApiError) -> anyhow::Error {
    anyhow!(err.user_message())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn read_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn ask(prompt: &str) -> bool {
    match read_line(&format!("{} [y/N] ", prompt)) {
        Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn always(_: &str) -> bool {
    true
}

fn check<T: Validate>(form: &T) -> Result<()> {
    let errors = form.validate();
    if !errors.is_empty() {
        bail!("Please fix the form errors:\n{}", errors);
    }
    Ok(())
}

// --- Generic resource commands ---

fn criteria(
    search: Option<String>,
    categories: &[(&str, Option<String>)],
    date: Option<NaiveDate>,
) -> Criteria {
    let mut criteria = Criteria::default()
        .search(search.unwrap_or_default())
        .on(date);
    for (field, value) in categories {
        if let Some(value) = value {
            criteria = criteria.category(field, value.clone());
        }
    }
    criteria
}

fn list<R>(
    backend: &HttpBackend,
    scope: Scope,
    search: Option<String>,
    categories: &[(&str, Option<String>)],
    date: Option<NaiveDate>,
) -> Result<()>
where
    R: Resource + Render + Queryable + Aggregate,
{
    let mut view: QueryView<R> = QueryView::open(&backend.scoped(scope));
    view.set_criteria(criteria(search, categories, date));
    print!("{}", display::listing(&view)?);
    view.close();
    Ok(())
}

fn show<R: Resource + Render>(backend: &HttpBackend, id: i64) -> Result<()> {
    let record: R = backend
        .get(id)
        .map_err(api_error)
        .with_context(|| format!("Failed to load {} #{}", R::LABEL.to_lowercase(), id))?;
    for line in record.detail() {
        println!("{}", line);
    }
    Ok(())
}

fn create<R>(backend: &HttpBackend, scope: Scope, draft: R::Draft) -> Result<()>
where
    R: Resource + Queryable + Aggregate,
{
    check(&draft)?;
    let gateway = backend.scoped(scope);
    let mut view: QueryView<R> = QueryView::open(&gateway);
    let outcome = view.create(&gateway, &draft);
    finish(&mut view, outcome)
}

fn update<R>(
    backend: &HttpBackend,
    scope: Scope,
    id: i64,
    done: &str,
    edit: impl FnOnce(&R) -> R::Draft,
) -> Result<()>
where
    R: Resource + Queryable + Aggregate,
{
    let gateway = backend.scoped(scope);
    let mut view: QueryView<R> = QueryView::open(&gateway);
    if let ViewState::Failed(message) = view.state() {
        bail!("Failed to load {}: {}", R::PLURAL, message);
    }
    let draft = view
        .find(id)
        .map(edit)
        .ok_or_else(|| anyhow!("{} #{} not found", R::LABEL, id))?;
    view.begin_edit(id);
    let outcome = view.update_as(&gateway, id, &draft, done);
    finish(&mut view, outcome)
}

fn delete<R>(backend: &HttpBackend, id: i64, yes: bool) -> Result<()>
where
    R: Resource + Queryable + Aggregate,
{
    let gateway = backend.scoped(Scope::All);
    let mut view: QueryView<R> = QueryView::open(&gateway);
    if view.state() == &ViewState::Ready && view.find(id).is_none() {
        bail!("{} #{} not found", R::LABEL, id);
    }
    let confirm: &dyn Confirm = if yes { &always } else { &ask };
    let outcome = view.delete(&gateway, id, confirm);
    finish(&mut view, outcome)
}

/// Report a mutation outcome the way the screens do: the toast on success,
/// an error otherwise.
fn finish<R: Queryable + Aggregate>(view: &mut QueryView<R>, outcome: Outcome) -> Result<()> {
    let toast = view.toast(Instant::now()).map(|t| t.message.clone());
    view.close();
    debug!(?outcome, editing = ?view.editing(), "mutation finished");

    match outcome {
        Outcome::Saved => {
            if let Some(message) = toast {
                println!("{}", message);
            }
            if let ViewState::Failed(message) = view.state() {
                eprintln!("Warning: could not refresh the list: {}", message);
            }
            Ok(())
        }
        Outcome::Invalid(_) => bail!("Please fix the form errors:\n{}", view.field_errors()),
        Outcome::Declined => {
            println!("Cancelled.");
            Ok(())
        }
        Outcome::Failed(message) => bail!(message),
        Outcome::NotReady => match view.state() {
            ViewState::Failed(message) => bail!("Failed to load data: {}", message),
            state => bail!("Not ready to save ({:?})", state),
        },
        Outcome::Discarded => bail!("Request was cancelled"),
    }
}

fn resolve_department(backend: &HttpBackend, name_or_id: &str) -> Result<i64> {
    if let Ok(id) = name_or_id.trim().parse::<i64>() {
        return Ok(id);
    }
    let departments: Vec<Department> = backend.list(Scope::All).map_err(api_error)?;
    departments
        .iter()
        .find(|d| d.name.eq_ignore_ascii_case(name_or_id.trim()))
        .map(|d| d.id)
        .ok_or_else(|| anyhow!("Department '{}' not found", name_or_id))
}

fn print_dashboard(backend: &HttpBackend, session: Option<&Session>) -> Result<()> {
    match session {
        Some(session) if session.is_employee() => {
            let employee_id = session
                .employee_id
                .ok_or_else(|| anyhow!(session::MISSING_EMPLOYEE))?;
            let scope = Scope::Employee(employee_id);
            let attendance: Vec<AttendanceRecord> = backend.list(scope).map_err(api_error)?;
            let leaves: Vec<LeaveRequest> = backend.list(scope).map_err(api_error)?;
            let payroll: Vec<PayrollRecord> = backend.list(scope).map_err(api_error)?;

            println!("Welcome, {}", session.name.as_deref().unwrap_or("employee"));
            println!();
            println!("{}", AttendanceRecord::aggregate(&attendance.iter().collect::<Vec<_>>()));
            println!();
            println!("{}", LeaveRequest::aggregate(&leaves.iter().collect::<Vec<_>>()));
            println!();
            println!("{}", PayrollRecord::aggregate(&payroll.iter().collect::<Vec<_>>()));
        }
        _ => {
            let employees: Vec<Employee> = backend.list(Scope::All).map_err(api_error)?;
            let departments: Vec<Department> = backend.list(Scope::All).map_err(api_error)?;
            let leaves: Vec<LeaveRequest> = backend.list(Scope::All).map_err(api_error)?;
            let attendance: Vec<AttendanceRecord> = backend.list(Scope::All).map_err(api_error)?;
            println!("{}", DashboardStats::compute(&employees, &departments, &leaves, &attendance));
        }
    }

    println!();
    println!("Recent announcements:");
    for announcement in models::announcements().iter().take(3) {
        println!(
            "  {}  {}",
            announcement.date,
            display::truncate(&announcement.title, 60)
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    init_tracing(&config.log_filter)?;
    debug!(api_url = %config.api_url, "starting");

    let store = SessionStore::open_at(&config.db_path())?;
    let backend = HttpBackend::new(&config)?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_line("Password: ")?,
            };
            let request = LoginRequest { email, password };
            check(&request)?;
            let auth = backend.login(&request).map_err(api_error)?;
            let session = Session::from_auth(&auth);
            store.set(&session)?;
            info!(user_type = %session.user_type, "logged in");
            println!(
                "Logged in as {} ({}).",
                session.name.as_deref().or(session.email.as_deref()).unwrap_or("user"),
                session.user_type
            );
            if let Some(message) = auth.message.filter(|m| !m.trim().is_empty()) {
                println!("{}", message);
            }
        }

        Commands::Signup {
            name,
            email,
            password,
            admin,
        } => {
            let (password, confirm_password) = match password {
                Some(p) => (p.clone(), p),
                None => (read_line("Password: ")?, read_line("Confirm password: ")?),
            };
            let form = SignupForm {
                name,
                email,
                password,
                confirm_password,
                user_type: if admin { "admin" } else { "employee" }.to_string(),
            };
            check(&form)?;
            let auth = backend.signup(&form).map_err(api_error)?;
            let session = Session::from_auth(&auth);
            store.set(&session)?;
            println!("Account created. Logged in as {} ({}).", form.email, session.user_type);
        }

        Commands::Logout => {
            store.clear()?;
            println!("Logged out.");
        }

        Commands::Whoami => match store.current()? {
            Some(session) => {
                println!("Name: {}", session.name.as_deref().unwrap_or("-"));
                println!("Email: {}", session.email.as_deref().unwrap_or("-"));
                println!("Role: {}", session.user_type);
                if let Some(id) = session.employee_id {
                    println!("Employee ID: {}", id);
                }
                println!("Since: {}", session.logged_in_at);
                println!("Session store: {}", store.path().display());
            }
            None => println!("Not logged in."),
        },

        Commands::Dashboard => {
            let session = store.current()?;
            print_dashboard(&backend, session.as_ref())?;
        }

        Commands::Profile => show::<Employee>(&backend, session_employee(&store)?)?,

        Commands::Employees { command } => match command {
            EmployeeCommands::List {
                search,
                department,
                role,
                joined,
            } => list::<Employee>(
                &backend,
                Scope::All,
                search,
                &[("department", department), ("role", role)],
                joined,
            )?,

            EmployeeCommands::Show { id } => show::<Employee>(&backend, id)?,

            EmployeeCommands::Add {
                first_name,
                last_name,
                email,
                department,
                role,
                salary,
                joined,
            } => {
                let department_id = department
                    .map(|d| resolve_department(&backend, &d))
                    .transpose()?;
                let draft = EmployeeDraft {
                    first_name,
                    last_name,
                    email,
                    department_id,
                    role,
                    salary,
                    date_of_joining: joined,
                };
                create::<Employee>(&backend, Scope::All, draft)?;
            }

            EmployeeCommands::Update {
                id,
                first_name,
                last_name,
                email,
                department,
                role,
                salary,
                joined,
            } => {
                let department_id = department
                    .map(|d| resolve_department(&backend, &d))
                    .transpose()?;
                update::<Employee>(&backend, Scope::All, id, "updated", |employee| {
                    let mut draft = EmployeeDraft::from(employee);
                    if let Some(v) = first_name {
                        draft.first_name = v;
                    }
                    if let Some(v) = last_name {
                        draft.last_name = v;
                    }
                    if let Some(v) = email {
                        draft.email = v;
                    }
                    if department_id.is_some() {
                        draft.department_id = department_id;
                    }
                    if role.is_some() {
                        draft.role = role;
                    }
                    if salary.is_some() {
                        draft.salary = salary;
                    }
                    if joined.is_some() {
                        draft.date_of_joining = joined;
                    }
                    draft
                })?;
            }

            EmployeeCommands::Delete { id, yes } => delete::<Employee>(&backend, id, yes)?,
        },

        Commands::Departments { command } => match command {
            DepartmentCommands::List { search } => {
                list::<Department>(&backend, Scope::All, search, &[], None)?
            }

            DepartmentCommands::Show { id } => show::<Department>(&backend, id)?,

            DepartmentCommands::Add {
                name,
                description,
                head,
            } => {
                let draft = DepartmentDraft {
                    name,
                    description,
                    head,
                };
                create::<Department>(&backend, Scope::All, draft)?;
            }

            DepartmentCommands::Update {
                id,
                name,
                description,
                head,
            } => update::<Department>(&backend, Scope::All, id, "updated", |department| {
                let mut draft = DepartmentDraft::from(department);
                if let Some(v) = name {
                    draft.name = v;
                }
                if description.is_some() {
                    draft.description = description;
                }
                if head.is_some() {
                    draft.head = head;
                }
                draft
            })?,

            DepartmentCommands::Delete { id, yes } => delete::<Department>(&backend, id, yes)?,
        },

        Commands::Attendance { command } => match command {
            AttendanceCommands::List {
                search,
                status,
                date,
                mine,
            } => list::<AttendanceRecord>(
                &backend,
                scope_for(&store, mine)?,
                search,
                &[("status", status.map(|s| s.as_str().to_string()))],
                date,
            )?,

            AttendanceCommands::Show { id } => show::<AttendanceRecord>(&backend, id)?,

            AttendanceCommands::Add {
                employee,
                date,
                status,
            } => {
                let employee_id = match employee {
                    Some(id) => id,
                    None => session_employee(&store)?,
                };
                let draft = AttendanceDraft {
                    employee_id: Some(employee_id),
                    date: Some(date.unwrap_or_else(today)),
                    status,
                };
                create::<AttendanceRecord>(&backend, Scope::Employee(employee_id), draft)?;
            }

            AttendanceCommands::Update { id, status, date } => {
                update::<AttendanceRecord>(&backend, Scope::All, id, "updated", |record| {
                    AttendanceDraft {
                        employee_id: Some(record.employee_id),
                        date: Some(date.unwrap_or(record.date)),
                        status: status.unwrap_or(record.status),
                    }
                })?
            }

            AttendanceCommands::Delete { id, yes } => {
                delete::<AttendanceRecord>(&backend, id, yes)?
            }
        },

        Commands::Leaves { command } => match command {
            LeaveCommands::List {
                search,
                status,
                leave_type,
                mine,
            } => list::<LeaveRequest>(
                &backend,
                scope_for(&store, mine)?,
                search,
                &[
                    ("status", status.map(|s| s.as_str().to_string())),
                    ("type", leave_type),
                ],
                None,
            )?,

            LeaveCommands::Show { id } => show::<LeaveRequest>(&backend, id)?,

            LeaveCommands::Apply {
                leave_type,
                from,
                to,
                employee,
            } => {
                let employee_id = match employee {
                    Some(id) => id,
                    None => session_employee(&store)?,
                };
                let draft = LeaveDraft {
                    employee_id: Some(employee_id),
                    leave_type,
                    start_date: Some(from),
                    end_date: Some(to),
                    status: LeaveStatus::Pending,
                };
                create::<LeaveRequest>(&backend, Scope::Employee(employee_id), draft)?;
            }

            LeaveCommands::Approve { id } => {
                update::<LeaveRequest>(&backend, Scope::All, id, "approved", |leave| {
                    LeaveDraft::with_status(leave, LeaveStatus::Approved)
                })?
            }

            LeaveCommands::Reject { id } => {
                update::<LeaveRequest>(&backend, Scope::All, id, "rejected", |leave| {
                    LeaveDraft::with_status(leave, LeaveStatus::Rejected)
                })?
            }

            LeaveCommands::Delete { id, yes } => delete::<LeaveRequest>(&backend, id, yes)?,
        },

        Commands::Payroll { command } => match command {
            PayrollCommands::List {
                search,
                month,
                mine,
            } => list::<PayrollRecord>(
                &backend,
                scope_for(&store, mine)?,
                search,
                &[("month", month)],
                None,
            )?,

            PayrollCommands::Show { id } => show::<PayrollRecord>(&backend, id)?,

            PayrollCommands::Add {
                employee,
                month,
                basic,
                bonus,
                deductions,
                net,
            } => {
                let draft = PayrollDraft {
                    employee_id: Some(employee),
                    month,
                    basic_salary: basic,
                    bonus,
                    deductions,
                    net_salary: net,
                };
                create::<PayrollRecord>(&backend, Scope::All, draft)?;
            }

            PayrollCommands::Update {
                id,
                month,
                basic,
                bonus,
                deductions,
                net,
            } => update::<PayrollRecord>(&backend, Scope::All, id, "updated", |record| {
                let mut draft = PayrollDraft::from(record);
                if let Some(v) = month {
                    draft.month = v;
                }
                if let Some(v) = basic {
                    draft.basic_salary = v;
                }
                if let Some(v) = bonus {
                    draft.bonus = v;
                }
                if let Some(v) = deductions {
                    draft.deductions = v;
                }
                if let Some(v) = net {
                    draft.net_salary = v;
                }
                draft
            })?,

            PayrollCommands::Delete { id, yes } => delete::<PayrollRecord>(&backend, id, yes)?,
        },

        Commands::Reports { command } => match command {
            ReportCommands::List {
                search,
                report_type,
                mine,
            } => list::<Report>(
                &backend,
                scope_for(&store, mine)?,
                search,
                &[("type", report_type)],
                None,
            )?,

            ReportCommands::Show { id } => show::<Report>(&backend, id)?,

            ReportCommands::Add {
                report_type,
                description,
                employee,
                date,
            } => {
                let draft = ReportDraft {
                    report_type,
                    description,
                    created_date: Some(date.unwrap_or_else(today)),
                    employee_id: employee,
                };
                create::<Report>(&backend, Scope::All, draft)?;
            }

            ReportCommands::Update {
                id,
                report_type,
                description,
                date,
            } => update::<Report>(&backend, Scope::All, id, "updated", |report| {
                let mut draft = ReportDraft::from(report);
                if let Some(v) = report_type {
                    draft.report_type = v;
                }
                if description.is_some() {
                    draft.description = description;
                }
                if date.is_some() {
                    draft.created_date = date;
                }
                draft
            })?,

            ReportCommands::Delete { id, yes } => delete::<Report>(&backend, id, yes)?,
        },

        Commands::Announcements {
            search,
            category,
            priority,
            full,
        } => {
            let source = models::announcements();
            let mut view: QueryView<models::Announcement> = QueryView::open(&source);
            view.set_criteria(criteria(
                search,
                &[("category", category), ("priority", priority)],
                None,
            ));
            print!("{}", display::listing(&view)?);
            if full {
                for announcement in view.visible() {
                    println!();
                    for line in announcement.detail() {
                        println!("{}", line);
                    }
                }
            }
        }

        Commands::Browse { resource, mine } => {
            if mine && matches!(resource, BrowseTarget::Employees | BrowseTarget::Departments) {
                bail!("--mine applies to attendance, leaves, payroll and reports");
            }
            let gateway = backend.scoped(scope_for(&store, mine)?);
            match resource {
                BrowseTarget::Employees => tui::run_browse::<Employee, _>(&gateway)?,
                BrowseTarget::Departments => tui::run_browse::<Department, _>(&gateway)?,
                BrowseTarget::Attendance => tui::run_browse::<AttendanceRecord, _>(&gateway)?,
                BrowseTarget::Leaves => tui::run_browse::<LeaveRequest, _>(&gateway)?,
                BrowseTarget::Payroll => tui::run_browse::<PayrollRecord, _>(&gateway)?,
                BrowseTarget::Reports => tui::run_browse::<Report, _>(&gateway)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_backend() -> HttpBackend {
        let config = Config::from_lookup(|key| {
            (key == "EMS_API_URL").then(|| "http://127.0.0.1:9/api".to_string())
        })
        .unwrap();
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn test_create_rejects_invalid_draft_before_fetching() {
        let backend = unreachable_backend();
        let draft = DepartmentDraft {
            name: "A".to_string(),
            ..Default::default()
        };
        let err = create::<Department>(&backend, Scope::All, draft).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Name must be at least 2 characters"));
        assert!(!message.contains("Failed to load"));
    }

    #[test]
    fn test_status_parsers_ignore_case() {
        assert_eq!(leave_status("approved"), Ok(LeaveStatus::Approved));
        assert_eq!(attendance_status("LATE"), Ok(AttendanceStatus::Late));
        assert!(leave_status("maybe").is_err());
    }

    #[test]
    fn test_update_commands_parse_partial_fields() {
        let cli = Cli::try_parse_from(["ems", "payroll", "update", "4", "--bonus", "250"]).unwrap();
        let Commands::Payroll {
            command: PayrollCommands::Update { id, bonus, net, .. },
        } = cli.command
        else {
            panic!("expected payroll update");
        };
        assert_eq!((id, bonus, net), (4, Some(250.0), None));

        let cli = Cli::try_parse_from(["ems", "reports", "update", "9", "--type", "Incident"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Reports {
                command: ReportCommands::Update { id: 9, .. }
            }
        ));

        let cli = Cli::try_parse_from(["ems", "profile"]).unwrap();
        assert!(matches!(cli.command, Commands::Profile));
    }
}
