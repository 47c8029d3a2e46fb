use anyhow::{Context, Result, bail};
use placement_types::models::{DocumentKind, Role, StudentSnapshot, StudentSummary};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::enum_column;
use crate::Database;
use crate::filter::StudentFilter;
use crate::models::{AcademicUpdate, NewStudentAccount, UserRow};

const USER_COLUMNS: &str = "id, email, password_hash, role, is_active, is_blocked";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        role: enum_column(row, 3)?,
        is_active: row.get(4)?,
        is_blocked: row.get(5)?,
    })
}

// -- Users --

pub fn insert_user(conn: &Connection, email: &str, password_hash: &str, role: Role) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (email, password_hash, role) VALUES (?1, ?2, ?3)",
        params![email, password_hash, role.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
    Ok(conn.query_row(&sql, [email], user_from_row).optional()?)
}

pub fn user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], user_from_row).optional()?)
}

pub fn set_password(conn: &Connection, email: &str, password_hash: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE email = ?2",
        params![password_hash, email],
    )?;
    Ok(changed > 0)
}

pub fn set_blocked(conn: &Connection, id: i64, blocked: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE users SET is_blocked = ?1 WHERE id = ?2",
        params![blocked, id],
    )?;
    Ok(changed > 0)
}

pub fn touch_last_login(conn: &Connection, id: i64) -> Result<()> {
    conn.execute("UPDATE users SET last_login = datetime('now') WHERE id = ?1", [id])?;
    Ok(())
}

// -- Profiles --

/// The academic facts eligibility is decided on, or `None` if `student_id`
/// is not a student with a profile.
pub fn snapshot(conn: &Connection, student_id: i64) -> Result<Option<StudentSnapshot>> {
    let snapshot = conn
        .query_row(
            "SELECT sp.user_id, sp.department, sp.batch_year, sp.cgpa, sp.current_backlogs
             FROM student_profiles sp
             JOIN users u ON u.id = sp.user_id
             WHERE sp.user_id = ?1 AND u.role = 'student'",
            [student_id],
            |row| {
                Ok(StudentSnapshot {
                    student_id: row.get(0)?,
                    department: row.get(1)?,
                    batch_year: row.get(2)?,
                    cgpa: row.get(3)?,
                    current_backlogs: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(snapshot)
}

/// Create every account and its profile, or none of them.
pub fn insert_accounts(conn: &mut Connection, accounts: &[NewStudentAccount]) -> Result<Vec<i64>> {
    let tx = conn.transaction()?;
    let mut ids = Vec::with_capacity(accounts.len());

    for (i, account) in accounts.iter().enumerate() {
        let id = insert_user(&tx, &account.email, &account.password_hash, Role::Student)
            .with_context(|| format!("account {} ({})", i + 1, account.email))?;
        tx.execute(
            "INSERT INTO student_profiles (user_id, full_name, register_number, department, batch_year)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                account.full_name,
                account.register_number,
                account.department,
                account.batch_year
            ],
        )
        .with_context(|| format!("account {} ({})", i + 1, account.register_number))?;
        ids.push(id);
    }

    tx.commit()?;
    Ok(ids)
}

pub fn update_academics(conn: &Connection, student_id: i64, update: &AcademicUpdate) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE student_profiles
         SET mobile_number = COALESCE(?1, mobile_number), cgpa = ?2,
             current_backlogs = ?3, history_backlogs = ?4, updated_at = datetime('now')
         WHERE user_id = ?5",
        params![
            update.mobile_number,
            update.cgpa,
            update.current_backlogs,
            update.history_backlogs,
            student_id
        ],
    )?;
    Ok(changed > 0)
}

pub fn register_number(conn: &Connection, student_id: i64) -> Result<Option<String>> {
    let number = conn
        .query_row(
            "SELECT register_number FROM student_profiles WHERE user_id = ?1",
            [student_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(number)
}

fn document_column(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Resume => "resume_url",
        DocumentKind::Aadhar => "aadhar_url",
        DocumentKind::Pan => "pan_url",
        DocumentKind::ProfilePic => "profile_photo_url",
    }
}

pub fn set_document_url(conn: &Connection, student_id: i64, kind: DocumentKind, url: &str) -> Result<()> {
    let column = document_column(kind);
    let sql = format!(
        "INSERT INTO student_documents (user_id, {column}) VALUES (?1, ?2)
         ON CONFLICT (user_id) DO UPDATE SET {column} = excluded.{column}"
    );
    conn.execute(&sql, params![student_id, url])?;
    Ok(())
}

// -- Admin listing --

pub fn list(conn: &Connection, filter: &StudentFilter) -> Result<Vec<StudentSummary>> {
    let predicates = filter.to_predicates();
    let sql = format!(
        "SELECT u.id, u.email, sp.full_name, sp.register_number, sp.department,
                sp.batch_year, sp.mobile_number, u.is_blocked
         FROM users u
         JOIN student_profiles sp ON sp.user_id = u.id
         WHERE u.role = 'student'{}
         ORDER BY sp.register_number ASC",
        predicates.and_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(predicates.params().as_slice(), |row| {
            Ok(StudentSummary {
                id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                register_number: row.get(3)?,
                department: row.get(4)?,
                batch_year: row.get(5)?,
                mobile_number: row.get(6)?,
                is_blocked: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Only accounts with the student role can be removed this way.
pub fn delete(conn: &Connection, student_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM users WHERE id = ?1 AND role = 'student'",
        [student_id],
    )?;
    Ok(changed > 0)
}

/// Delete every student matching `filter`. An empty filter is refused.
pub fn bulk_delete(conn: &Connection, filter: &StudentFilter) -> Result<usize> {
    let predicates = filter.to_predicates();
    if predicates.is_empty() {
        bail!("refusing to bulk delete without a filter");
    }
    let sql = format!(
        "DELETE FROM users
         WHERE role = 'student'
           AND id IN (SELECT sp.user_id FROM student_profiles sp{})",
        predicates.where_clause()
    );
    Ok(conn.execute(&sql, predicates.params().as_slice())?)
}

impl Database {
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_email(conn, email))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| user_by_id(conn, id))
    }

    pub fn student_snapshot(&self, student_id: i64) -> Result<Option<StudentSnapshot>> {
        self.with_conn(|conn| snapshot(conn, student_id))
    }

    pub fn list_students(&self, filter: &StudentFilter) -> Result<Vec<StudentSummary>> {
        self.with_conn(|conn| list(conn, filter))
    }
}
