use anyhow::Result;
use placement_types::models::{Drive, DriveStatus};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use rusqlite::types::Value;

use super::{DATE_FORMAT, date_column, enum_column, json_set_column, json_set_value, placeholders, timestamp_column};
use crate::filter::DriveFilter;
use crate::models::{DriveFields, GuardedWrite};
use crate::{Database, format_timestamp};

const DRIVE_COLUMNS: &str = "id, posted_by, company_name, job_role, job_description, location,
    drive_type, company_category, ctc_min, ctc_max, ctc_display, min_cgpa,
    max_backlogs_allowed, eligible_departments, eligible_batch_years,
    drive_date, deadline_date, status, created_at";

fn drive_from_row(row: &Row<'_>) -> rusqlite::Result<Drive> {
    Ok(Drive {
        id: row.get(0)?,
        posted_by: row.get(1)?,
        company_name: row.get(2)?,
        job_role: row.get(3)?,
        job_description: row.get(4)?,
        location: row.get(5)?,
        drive_type: row.get(6)?,
        company_category: row.get(7)?,
        ctc_min: row.get(8)?,
        ctc_max: row.get(9)?,
        ctc_display: row.get(10)?,
        min_cgpa: row.get(11)?,
        max_backlogs_allowed: row.get(12)?,
        eligible_departments: json_set_column(row, 13)?,
        eligible_batch_years: json_set_column(row, 14)?,
        drive_date: date_column(row, 15)?,
        deadline_date: timestamp_column(row, 16)?,
        status: enum_column(row, 17)?,
        created_at: timestamp_column(row, 18)?,
    })
}

fn query_drives(conn: &Connection, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Drive>> {
    let mut stmt = conn.prepare(sql)?;
    let drives = stmt
        .query_map(params, drive_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(drives)
}

pub fn insert(conn: &Connection, posted_by: i64, fields: &DriveFields) -> Result<i64> {
    conn.execute(
        "INSERT INTO drives (
            posted_by, company_name, job_role, job_description, location,
            drive_type, company_category, ctc_min, ctc_max, ctc_display,
            min_cgpa, max_backlogs_allowed, eligible_departments, eligible_batch_years,
            drive_date, deadline_date, status
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, 'open')",
        params![
            posted_by,
            fields.company_name,
            fields.job_role,
            fields.job_description,
            fields.location,
            fields.drive_type,
            fields.company_category,
            fields.ctc_min,
            fields.ctc_max,
            fields.ctc_display,
            fields.min_cgpa,
            fields.max_backlogs_allowed,
            json_set_value(&fields.eligible_departments)?,
            json_set_value(&fields.eligible_batch_years)?,
            fields.drive_date.format(DATE_FORMAT).to_string(),
            format_timestamp(fields.deadline_date),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the admin-editable columns. Never touches `status`, `posted_by`
/// or `created_at`. Returns false when the drive does not exist.
pub fn update_fields(conn: &Connection, id: i64, fields: &DriveFields) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE drives
         SET company_name = ?1, job_role = ?2, job_description = ?3, location = ?4,
             drive_type = ?5, company_category = ?6, ctc_min = ?7, ctc_max = ?8,
             ctc_display = ?9, min_cgpa = ?10, max_backlogs_allowed = ?11,
             eligible_departments = ?12, eligible_batch_years = ?13,
             drive_date = ?14, deadline_date = ?15
         WHERE id = ?16",
        params![
            fields.company_name,
            fields.job_role,
            fields.job_description,
            fields.location,
            fields.drive_type,
            fields.company_category,
            fields.ctc_min,
            fields.ctc_max,
            fields.ctc_display,
            fields.min_cgpa,
            fields.max_backlogs_allowed,
            json_set_value(&fields.eligible_departments)?,
            json_set_value(&fields.eligible_batch_years)?,
            fields.drive_date.format(DATE_FORMAT).to_string(),
            format_timestamp(fields.deadline_date),
            id,
        ],
    )?;
    Ok(changed > 0)
}

pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM drives WHERE id = ?1", [id])?;
    Ok(changed > 0)
}

pub fn by_id(conn: &Connection, id: i64) -> Result<Option<Drive>> {
    let sql = format!("SELECT {DRIVE_COLUMNS} FROM drives WHERE id = ?1");
    let drive = conn.query_row(&sql, [id], drive_from_row).optional()?;
    Ok(drive)
}

pub fn status_of(conn: &Connection, id: i64) -> Result<Option<DriveStatus>> {
    let status = conn
        .query_row("SELECT status FROM drives WHERE id = ?1", [id], |row| {
            enum_column(row, 0)
        })
        .optional()?;
    Ok(status)
}

/// Set `status = target` only if the row is currently in one of `allowed_from`.
/// The check and the write are one statement.
pub fn transition_status(
    conn: &Connection,
    id: i64,
    target: DriveStatus,
    allowed_from: &[DriveStatus],
) -> Result<GuardedWrite<DriveStatus>> {
    let sql = format!(
        "UPDATE drives SET status = ?1 WHERE id = ?2 AND status IN ({})",
        placeholders(3, allowed_from.len())
    );
    let mut values: Vec<Value> = vec![target.as_str().to_string().into(), id.into()];
    values.extend(allowed_from.iter().map(|s| Value::from(s.as_str().to_string())));

    if conn.execute(&sql, params_from_iter(values))? > 0 {
        return Ok(GuardedWrite::Applied);
    }

    Ok(match status_of(conn, id)? {
        Some(current) => GuardedWrite::Rejected { current },
        None => GuardedWrite::Missing,
    })
}

/// Admin listing: filtered, soonest deadline first.
pub fn list(conn: &Connection, filter: &DriveFilter) -> Result<Vec<Drive>> {
    let predicates = filter.to_predicates();
    let sql = format!(
        "SELECT {DRIVE_COLUMNS} FROM drives{} ORDER BY deadline_date ASC, id ASC",
        predicates.where_clause()
    );
    query_drives(conn, &sql, &predicates.params())
}

pub fn with_status(conn: &Connection, status: DriveStatus) -> Result<Vec<Drive>> {
    let sql = format!(
        "SELECT {DRIVE_COLUMNS} FROM drives WHERE status = ?1 ORDER BY deadline_date ASC, id ASC"
    );
    query_drives(conn, &sql, &[&status.as_str()])
}

/// Everything except cancelled drives, for the home page.
pub fn visible(conn: &Connection) -> Result<Vec<Drive>> {
    let sql = format!(
        "SELECT {DRIVE_COLUMNS} FROM drives WHERE status != 'cancelled' ORDER BY deadline_date ASC, id ASC"
    );
    query_drives(conn, &sql, &[])
}

/// Close every open drive whose deadline is behind the database clock.
/// Rows already moved out of `open` are left alone.
pub fn close_expired(conn: &Connection) -> Result<usize> {
    let closed = conn.execute(
        "UPDATE drives SET status = 'closed'
         WHERE status = 'open' AND deadline_date < datetime('now')",
        [],
    )?;
    Ok(closed)
}

impl Database {
    pub fn create_drive(&self, posted_by: i64, fields: &DriveFields) -> Result<i64> {
        self.with_conn(|conn| insert(conn, posted_by, fields))
    }

    pub fn get_drive(&self, id: i64) -> Result<Option<Drive>> {
        self.with_conn(|conn| by_id(conn, id))
    }

    pub fn delete_drive(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| delete(conn, id))
    }

    pub fn list_drives(&self, filter: &DriveFilter) -> Result<Vec<Drive>> {
        self.with_conn(|conn| list(conn, filter))
    }

    pub fn close_expired_drives(&self) -> Result<usize> {
        self.with_conn(close_expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::students;
    use crate::test_support::open_temp;
    use chrono::{Duration, NaiveDate, Utc};
    use placement_types::models::Role;

    fn fields(deadline_in: Duration) -> DriveFields {
        DriveFields {
            company_name: "Acme".into(),
            job_role: "SDE".into(),
            job_description: String::new(),
            location: "Chennai".into(),
            drive_type: "Full-Time".into(),
            company_category: "IT".into(),
            ctc_min: 400_000,
            ctc_max: 600_000,
            ctc_display: "4L - 6L PA".into(),
            min_cgpa: 7.0,
            max_backlogs_allowed: 0,
            eligible_departments: Some(vec![]),
            eligible_batch_years: Some(vec![2026]),
            drive_date: NaiveDate::from_ymd_opt(2030, 5, 20).unwrap(),
            deadline_date: Utc::now() + deadline_in,
        }
    }

    fn admin(db: &Database) -> i64 {
        db.with_conn(|conn| students::insert_user(conn, "admin@kec.test", "hash", Role::Admin))
            .unwrap()
    }

    #[test]
    fn insert_and_read_back() {
        let (_dir, db) = open_temp();
        let admin = admin(&db);
        let id = db.create_drive(admin, &fields(Duration::days(2))).unwrap();
        let drive = db.get_drive(id).unwrap().unwrap();
        assert_eq!(drive.status, DriveStatus::Open);
        assert_eq!(drive.posted_by, admin);
        // empty set normalised to "no restriction"
        assert_eq!(drive.eligible_departments, None);
        assert_eq!(drive.eligible_batch_years, Some(vec![2026]));
    }

    #[test]
    fn inverted_ctc_range_is_a_constraint_violation() {
        let (_dir, db) = open_temp();
        let admin = admin(&db);
        let mut bad = fields(Duration::days(2));
        bad.ctc_min = 700_000;
        let err = db.create_drive(admin, &bad).unwrap_err();
        assert!(crate::is_constraint_violation(&err));
    }

    #[test]
    fn guarded_transition_reports_current_state() {
        let (_dir, db) = open_temp();
        let id = db.create_drive(admin(&db), &fields(Duration::days(2))).unwrap();

        let write = db
            .with_conn(|c| transition_status(c, id, DriveStatus::Cancelled, &[DriveStatus::Open]))
            .unwrap();
        assert_eq!(write, GuardedWrite::Applied);

        let write = db
            .with_conn(|c| transition_status(c, id, DriveStatus::OnHold, &[DriveStatus::Open]))
            .unwrap();
        assert_eq!(write, GuardedWrite::Rejected { current: DriveStatus::Cancelled });

        let write = db
            .with_conn(|c| transition_status(c, 999, DriveStatus::OnHold, &[DriveStatus::Open]))
            .unwrap();
        assert_eq!(write, GuardedWrite::Missing);
    }

    #[test]
    fn close_expired_only_touches_open_rows() {
        let (_dir, db) = open_temp();
        let admin = admin(&db);
        let expired = db.create_drive(admin, &fields(Duration::hours(-1))).unwrap();
        let held = db.create_drive(admin, &fields(Duration::hours(-1))).unwrap();
        let future = db.create_drive(admin, &fields(Duration::days(1))).unwrap();
        db.with_conn(|c| transition_status(c, held, DriveStatus::OnHold, &[DriveStatus::Open]))
            .unwrap();

        assert_eq!(db.close_expired_drives().unwrap(), 1);
        assert_eq!(db.close_expired_drives().unwrap(), 0);

        assert_eq!(db.get_drive(expired).unwrap().unwrap().status, DriveStatus::Closed);
        assert_eq!(db.get_drive(held).unwrap().unwrap().status, DriveStatus::OnHold);
        assert_eq!(db.get_drive(future).unwrap().unwrap().status, DriveStatus::Open);
    }

    #[test]
    fn list_applies_filters_and_orders_by_deadline() {
        let (_dir, db) = open_temp();
        let admin = admin(&db);
        let later = db.create_drive(admin, &fields(Duration::days(9))).unwrap();
        let sooner = db.create_drive(admin, &fields(Duration::days(3))).unwrap();
        let mut core = fields(Duration::days(1));
        core.company_category = "Core".into();
        core.ctc_max = 900_000;
        let core = db.create_drive(admin, &core).unwrap();

        let all: Vec<i64> = db
            .list_drives(&DriveFilter::default())
            .unwrap()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(all, vec![core, sooner, later]);

        let it = db
            .list_drives(&DriveFilter {
                category: Some("IT".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(it.iter().map(|d| d.id).collect::<Vec<_>>(), vec![sooner, later]);

        let rich = db
            .list_drives(&DriveFilter {
                min_salary: Some(800_000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(rich.len(), 1);
        assert_eq!(rich[0].id, core);
    }
}
