//! User persistence session contract and SQLite implementation.
//!
//! # Responsibility
//! - Stage user inserts in a unit of work and apply them on `commit`.
//! - Provide primary-key point lookups over the `users` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Pending rows are written in one transaction; a failed commit writes
//!   nothing.
//! - A duplicate primary key surfaces as `RepoError::Conflict`, whether it is
//!   detected at `insert` time or by the store during `commit`.
//! - Dropping a session discards pending rows.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::user_entity::UserEntity;
use log::{debug, error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const USERS_DEFAULT_LIMIT: u32 = 50;
const USERS_LIMIT_MAX: u32 = 500;
const USERS_REQUIRED_COLUMNS: [&str; 3] = ["pid", "first_name", "last_name"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Session error for user persistence operations.
#[derive(Debug)]
pub enum RepoError {
    /// Driver or bootstrap failure.
    Db(DbError),
    /// A row with this primary key already exists.
    Conflict(i64),
    /// Connection schema is older than this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(pid) => write!(f, "user already exists: {pid}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence session consumed by the registration service.
///
/// A session owns one unit of work: `insert` stages rows, `commit` applies
/// them, `rollback` discards them.
pub trait UserSession {
    /// Stages a new row. Fails with `Conflict` when the key is taken.
    fn insert(&mut self, entity: UserEntity) -> RepoResult<()>;
    /// Point lookup by primary key. Staged rows are visible to this session.
    fn get_by_key(&self, pid: i64) -> RepoResult<Option<UserEntity>>;
    /// Applies all staged rows atomically.
    fn commit(&mut self) -> RepoResult<()>;
    /// Discards all staged rows.
    fn rollback(&mut self);
    /// Number of staged, uncommitted rows.
    fn pending_count(&self) -> usize;
}

/// SQLite-backed user session.
///
/// Holds the connection mutably for its whole lifetime, so at most one
/// session is active per connection.
pub struct SqliteUserSession<'conn> {
    conn: &'conn mut Connection,
    pending: Vec<UserEntity>,
}

impl<'conn> SqliteUserSession<'conn> {
    /// Starts a session on a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema is
    ///   not the one `users` expects.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            pending: Vec::new(),
        })
    }

    /// Lists committed users ordered by `pid ASC`.
    ///
    /// `limit` defaults to 50 and is clamped to 500.
    pub fn list_users(&self, limit: Option<u32>, offset: u32) -> RepoResult<Vec<UserEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT pid, first_name, last_name
             FROM users
             ORDER BY pid ASC
             LIMIT ?1 OFFSET ?2;",
        )?;
        let mut rows = stmt.query(params![
            i64::from(normalize_users_limit(limit)),
            i64::from(offset)
        ])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(UserEntity {
                pid: row.get("pid")?,
                first_name: row.get("first_name")?,
                last_name: row.get("last_name")?,
            });
        }
        Ok(users)
    }
}

impl UserSession for SqliteUserSession<'_> {
    fn insert(&mut self, entity: UserEntity) -> RepoResult<()> {
        let staged = self.pending.iter().any(|pending| pending.pid == entity.pid);
        if staged || load_user(self.conn, entity.pid)?.is_some() {
            return Err(RepoError::Conflict(entity.pid));
        }
        self.pending.push(entity);
        Ok(())
    }

    fn get_by_key(&self, pid: i64) -> RepoResult<Option<UserEntity>> {
        if let Some(staged) = self.pending.iter().find(|pending| pending.pid == pid) {
            return Ok(Some(staged.clone()));
        }
        load_user(self.conn, pid)
    }

    fn commit(&mut self) -> RepoResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        match flush_pending(tx, &self.pending) {
            Ok(()) => {
                info!(
                    "event=session_commit module=repo status=ok rows={} duration_ms={}",
                    self.pending.len(),
                    started_at.elapsed().as_millis()
                );
                self.pending.clear();
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=session_commit module=repo status=error rows={} duration_ms={} error={}",
                    self.pending.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn rollback(&mut self) {
        if !self.pending.is_empty() {
            debug!(
                "event=session_rollback module=repo status=ok rows={}",
                self.pending.len()
            );
        }
        self.pending.clear();
    }

    fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for SqliteUserSession<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "event=session_release module=repo status=discarded rows={}",
                self.pending.len()
            );
        }
    }
}

/// Normalizes list limit according to the users listing contract.
pub fn normalize_users_limit(limit: Option<u32>) -> u32 {
    match limit {
        Some(0) | None => USERS_DEFAULT_LIMIT,
        Some(value) => value.min(USERS_LIMIT_MAX),
    }
}

// Dropping `tx` on the error path rolls the transaction back.
fn flush_pending(tx: Transaction<'_>, pending: &[UserEntity]) -> RepoResult<()> {
    for entity in pending {
        let inserted = tx.execute(
            "INSERT INTO users (pid, first_name, last_name) VALUES (?1, ?2, ?3);",
            params![
                entity.pid,
                entity.first_name.as_str(),
                entity.last_name.as_str()
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_primary_key_violation(&err) => {
                return Err(RepoError::Conflict(entity.pid));
            }
            Err(err) => return Err(err.into()),
        }
    }
    tx.commit()?;
    Ok(())
}

fn load_user(conn: &Connection, pid: i64) -> RepoResult<Option<UserEntity>> {
    let entity = conn
        .query_row(
            "SELECT pid, first_name, last_name
             FROM users
             WHERE pid = ?1;",
            [pid],
            |row| {
                Ok(UserEntity {
                    pid: row.get("pid")?,
                    first_name: row.get("first_name")?,
                    last_name: row.get("last_name")?,
                })
            },
        )
        .optional()?;
    Ok(entity)
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "users")? {
        return Err(RepoError::MissingRequiredTable("users"));
    }
    for column in USERS_REQUIRED_COLUMNS {
        if !table_has_column(conn, "users", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "users",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
