//! Account and profile operations: registration, password reset codes,
//! bulk student creation and admin housekeeping.

use chrono::Duration;
use placement_db::models::{AcademicUpdate, NewStudentAccount};
use placement_db::queries::{credentials, students};
use placement_db::{Database, StudentFilter};
use placement_types::models::{DocumentKind, Role};
use rand::Rng;
use tracing::info;

use crate::{EngineError, Result};

/// Emails are matched case-insensitively; store and look them up in this form.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn register_user(db: &Database, email: &str, password_hash: &str, role: Role) -> Result<i64> {
    let email = normalize_email(email);
    if !email.contains('@') {
        return Err(EngineError::validation("a valid email is required"));
    }
    let id = db
        .with_conn(|conn| students::insert_user(conn, &email, password_hash, role))
        .map_err(|e| match EngineError::from_write(e) {
            EngineError::Conflict(_) => EngineError::conflict("email already registered"),
            other => other,
        })?;
    info!(user_id = id, role = role.as_str(), "User registered");
    Ok(id)
}

/// Six decimal digits, zero padded.
pub fn generate_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Issue a fresh reset code for `email`, replacing any earlier one. The
/// expiry is measured from the database clock.
pub fn issue_reset_code(db: &Database, email: &str, ttl: Duration) -> Result<String> {
    let email = normalize_email(email);
    let code = generate_code();
    db.with_conn(|conn| {
        if students::user_by_email(conn, &email)?.is_none() {
            return Ok(false);
        }
        let expires_at = placement_db::current_time(conn)? + ttl;
        credentials::save(conn, &email, &code, expires_at)?;
        Ok(true)
    })?
    .then_some(code)
    .ok_or_else(|| EngineError::not_found("user"))
}

/// Consume a reset code and set the new password hash.
pub fn reset_password(db: &Database, email: &str, code: &str, password_hash: &str) -> Result<()> {
    let email = normalize_email(email);
    let code = code.trim();
    if !db.with_conn_mut(|conn| credentials::reset_password(conn, &email, code, password_hash))? {
        return Err(EngineError::validation("invalid or expired code"));
    }
    info!(email = %email, "Password reset");
    Ok(())
}

/// Create every account or none. Duplicate emails or register numbers are
/// reported as conflicts naming the offending account.
pub fn create_students(db: &Database, accounts: &[NewStudentAccount]) -> Result<usize> {
    if accounts.is_empty() {
        return Err(EngineError::validation("no students to create"));
    }
    let ids = db
        .with_conn_mut(|conn| students::insert_accounts(conn, accounts))
        .map_err(EngineError::from_write)?;
    info!(count = ids.len(), "Bulk created student accounts");
    Ok(ids.len())
}

pub fn update_profile(db: &Database, student_id: i64, update: &AcademicUpdate) -> Result<()> {
    if !(0.0..=10.0).contains(&update.cgpa) {
        return Err(EngineError::validation("cgpa must be between 0 and 10"));
    }
    if !db.with_conn(|conn| students::update_academics(conn, student_id, update))? {
        return Err(EngineError::not_found("student profile"));
    }
    Ok(())
}

/// The key a student's documents are stored under: their register number.
pub fn document_owner_key(db: &Database, student_id: i64) -> Result<String> {
    db.with_conn(|conn| students::register_number(conn, student_id))?
        .filter(|number| !number.trim().is_empty())
        .ok_or_else(|| EngineError::validation("register number is required before uploading documents"))
}

pub fn record_document(db: &Database, student_id: i64, kind: DocumentKind, url: &str) -> Result<()> {
    db.with_conn(|conn| students::set_document_url(conn, student_id, kind, url))?;
    info!(student_id, kind = kind.as_str(), "Document recorded");
    Ok(())
}

pub fn delete_student(db: &Database, student_id: i64) -> Result<()> {
    if !db.with_conn(|conn| students::delete(conn, student_id))? {
        return Err(EngineError::not_found("student"));
    }
    info!(student_id, "Student deleted");
    Ok(())
}

/// Delete every student in a department and/or batch. Refuses an unscoped filter.
pub fn bulk_delete_students(db: &Database, filter: &StudentFilter) -> Result<usize> {
    if filter.to_predicates().is_empty() {
        return Err(EngineError::conflict(
            "bulk delete requires a department or batch filter",
        ));
    }
    let count = db.with_conn(|conn| students::bulk_delete(conn, filter))?;
    info!(count, ?filter, "Bulk deleted students");
    Ok(count)
}

pub fn set_blocked(db: &Database, user_id: i64, blocked: bool) -> Result<()> {
    if !db.with_conn(|conn| students::set_blocked(conn, user_id, blocked))? {
        return Err(EngineError::not_found("user"));
    }
    info!(user_id, blocked, "User block flag changed");
    Ok(())
}
