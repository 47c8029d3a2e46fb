use anyhow::Result;
use placement_types::models::{Application, ApplicationStatus, StudentApplication};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::{enum_column, placeholders, timestamp_column};
use crate::Database;
use crate::models::GuardedWrite;

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        drive_id: row.get(0)?,
        student_id: row.get(1)?,
        status: enum_column(row, 2)?,
        applied_at: timestamp_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}

/// Insert an `opted_in` row unless one already exists for the pair.
/// Returns true if this call created it.
pub fn insert_if_absent(conn: &Connection, drive_id: i64, student_id: i64) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO drive_applications (drive_id, student_id, status)
         VALUES (?1, ?2, 'opted_in')
         ON CONFLICT (drive_id, student_id) DO NOTHING",
        params![drive_id, student_id],
    )?;
    Ok(inserted > 0)
}

/// Admin override: create the row, or reset an existing one back to `opted_in`.
pub fn force_register(conn: &Connection, drive_id: i64, student_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO drive_applications (drive_id, student_id, status)
         VALUES (?1, ?2, 'opted_in')
         ON CONFLICT (drive_id, student_id)
         DO UPDATE SET status = 'opted_in', updated_at = datetime('now')",
        params![drive_id, student_id],
    )?;
    Ok(())
}

pub fn get(conn: &Connection, drive_id: i64, student_id: i64) -> Result<Option<Application>> {
    let application = conn
        .query_row(
            "SELECT drive_id, student_id, status, applied_at, updated_at
             FROM drive_applications WHERE drive_id = ?1 AND student_id = ?2",
            params![drive_id, student_id],
            application_from_row,
        )
        .optional()?;
    Ok(application)
}

/// Move an application to `target` only from one of `allowed_from`, in one statement.
pub fn transition_status(
    conn: &Connection,
    drive_id: i64,
    student_id: i64,
    target: ApplicationStatus,
    allowed_from: &[ApplicationStatus],
) -> Result<GuardedWrite<ApplicationStatus>> {
    let sql = format!(
        "UPDATE drive_applications SET status = ?1, updated_at = datetime('now')
         WHERE drive_id = ?2 AND student_id = ?3 AND status IN ({})",
        placeholders(4, allowed_from.len())
    );
    let mut values: Vec<Value> = vec![
        target.as_str().to_string().into(),
        drive_id.into(),
        student_id.into(),
    ];
    values.extend(allowed_from.iter().map(|s| Value::from(s.as_str().to_string())));

    if conn.execute(&sql, params_from_iter(values))? > 0 {
        return Ok(GuardedWrite::Applied);
    }

    Ok(match get(conn, drive_id, student_id)? {
        Some(existing) => GuardedWrite::Rejected {
            current: existing.status,
        },
        None => GuardedWrite::Missing,
    })
}

/// A student's applications, newest first.
pub fn for_student(conn: &Connection, student_id: i64) -> Result<Vec<StudentApplication>> {
    let mut stmt = conn.prepare(
        "SELECT a.drive_id, d.company_name, d.job_role, a.status, a.applied_at
         FROM drive_applications a
         JOIN drives d ON d.id = a.drive_id
         WHERE a.student_id = ?1
         ORDER BY a.applied_at DESC, a.drive_id DESC",
    )?;
    let rows = stmt
        .query_map([student_id], |row| {
            Ok(StudentApplication {
                drive_id: row.get(0)?,
                company_name: row.get(1)?,
                job_role: row.get(2)?,
                status: enum_column(row, 3)?,
                applied_at: timestamp_column(row, 4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn for_drive(conn: &Connection, drive_id: i64) -> Result<Vec<Application>> {
    let mut stmt = conn.prepare(
        "SELECT drive_id, student_id, status, applied_at, updated_at
         FROM drive_applications
         WHERE drive_id = ?1
         ORDER BY applied_at ASC, student_id ASC",
    )?;
    let rows = stmt
        .query_map([drive_id], application_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl Database {
    pub fn get_application(&self, drive_id: i64, student_id: i64) -> Result<Option<Application>> {
        self.with_conn(|conn| get(conn, drive_id, student_id))
    }

    pub fn student_applications(&self, student_id: i64) -> Result<Vec<StudentApplication>> {
        self.with_conn(|conn| for_student(conn, student_id))
    }

    pub fn drive_applications(&self, drive_id: i64) -> Result<Vec<Application>> {
        self.with_conn(|conn| for_drive(conn, drive_id))
    }
}
