use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::{AuthResponse, Scope};

pub const MISSING_EMPLOYEE: &str = "Employee ID not found. Please login again.";

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub user_type: String, // "employee" or "admin"
    pub employee_id: Option<i64>,
    pub logged_in_at: String,
}

impl Session {
    pub fn from_auth(auth: &AuthResponse) -> Self {
        Self {
            user_id: auth.id,
            name: auth.name.clone(),
            email: auth.email.clone(),
            user_type: auth.user_type.clone().unwrap_or_else(|| "admin".to_string()),
            employee_id: auth.employee_id,
            logged_in_at: String::new(),
        }
    }

    pub fn is_employee(&self) -> bool {
        self.user_type.eq_ignore_ascii_case("employee")
    }
}

/// Read/write access to the logged-in user, passed explicitly to whatever
/// needs it.
pub trait SessionContext {
    fn current(&self) -> Result<Option<Session>>;
    fn set(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Scope for a listing: everything, or only the logged-in employee's own
/// records when `mine` is set.
pub fn scope_for(ctx: &dyn SessionContext, mine: bool) -> Result<Scope> {
    if !mine {
        return Ok(Scope::All);
    }
    Ok(Scope::Employee(session_employee(ctx)?))
}

/// Employee id of the logged-in user.
pub fn session_employee(ctx: &dyn SessionContext) -> Result<i64> {
    ctx.current()?
        .and_then(|s| s.employee_id)
        .ok_or_else(|| anyhow!(MISSING_EMPLOYEE))
}

pub struct SessionStore {
    conn: Connection,
    path: PathBuf,
}

impl SessionStore {
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open session store at {}", path.display()))?;
        let store = Self {
            conn,
            path: path.to_path_buf(),
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                user_id INTEGER,
                name TEXT,
                email TEXT,
                user_type TEXT NOT NULL,
                employee_id INTEGER,
                logged_in_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            user_id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            user_type: row.get(3)?,
            employee_id: row.get(4)?,
            logged_in_at: row.get(5)?,
        })
    }
}

impl SessionContext for SessionStore {
    fn current(&self) -> Result<Option<Session>> {
        let result = self.conn.query_row(
            "SELECT user_id, name, email, user_type, employee_id, logged_in_at
             FROM session WHERE id = 1",
            [],
            Self::row_to_session,
        );
        match result {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, session: &Session) -> Result<()> {
        debug!(user_type = %session.user_type, employee_id = ?session.employee_id, "storing session");
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, user_id, name, email, user_type, employee_id)
             VALUES (1, ?1, ?2, ?3, ?4, ?5)",
            params![
                session.user_id,
                session.name,
                session.email,
                session.user_type,
                session.employee_id
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM session", [])?;
        Ok(())
    }
}

#[cfg(test)]
pub struct MemorySession(pub std::cell::RefCell<Option<Session>>);

#[cfg(test)]
impl SessionContext for MemorySession {
    fn current(&self) -> Result<Option<Session>> {
        Ok(self.0.borrow().clone())
    }

    fn set(&self, session: &Session) -> Result<()> {
        *self.0.borrow_mut() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.0.borrow_mut() = None;
        Ok(())
    }
}
