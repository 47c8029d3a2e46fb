//! Write-side row types. Read models shared with the API live in
//! `placement_types::models`.

use chrono::{DateTime, NaiveDate, Utc};
use placement_types::models::Role;

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub is_blocked: bool,
}

/// Every column of a drive that an admin may set.
#[derive(Debug, Clone)]
pub struct DriveFields {
    pub company_name: String,
    pub job_role: String,
    pub job_description: String,
    pub location: String,
    pub drive_type: String,
    pub company_category: String,
    pub ctc_min: i64,
    pub ctc_max: i64,
    pub ctc_display: String,
    pub min_cgpa: f64,
    pub max_backlogs_allowed: u32,
    pub eligible_departments: Option<Vec<String>>,
    pub eligible_batch_years: Option<Vec<i32>>,
    pub drive_date: NaiveDate,
    pub deadline_date: DateTime<Utc>,
}

/// One account created by the bulk importer. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewStudentAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub register_number: String,
    pub department: String,
    pub batch_year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcademicUpdate {
    pub mobile_number: Option<String>,
    pub cgpa: f64,
    pub current_backlogs: u32,
    pub history_backlogs: u32,
}

/// Result of a guarded status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedWrite<S> {
    /// The row existed in one of the allowed source states and was updated.
    Applied,
    /// The row exists but its current state is not an allowed source.
    Rejected { current: S },
    Missing,
}
