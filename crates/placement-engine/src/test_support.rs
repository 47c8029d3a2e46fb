use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use placement_db::Database;
use placement_db::models::{AcademicUpdate, DriveFields, NewStudentAccount};
use placement_db::queries::{drives, students};
use placement_types::models::Role;
use tempfile::TempDir;

pub struct Fixture {
    _dir: TempDir,
    pub db: Arc<Database>,
    pub admin: i64,
}

pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("engine.db")).unwrap();
    let admin = db
        .with_conn(|conn| students::insert_user(conn, "tpo@kec.test", "hash", Role::Admin))
        .unwrap();
    Fixture {
        _dir: dir,
        db: Arc::new(db),
        admin,
    }
}

impl Fixture {
    pub fn now(&self) -> DateTime<Utc> {
        self.db.now().unwrap()
    }

    /// An MCA 2026 student with the given grades.
    pub fn student(&self, register_number: &str, cgpa: f64, backlogs: u32) -> i64 {
        let account = NewStudentAccount {
            email: format!("{}@kec.test", register_number.to_lowercase()),
            password_hash: "hash".into(),
            full_name: format!("Student {register_number}"),
            register_number: register_number.into(),
            department: "MCA".into(),
            batch_year: 2026,
        };
        let id = self
            .db
            .with_conn_mut(|conn| students::insert_accounts(conn, &[account]))
            .unwrap()[0];
        self.db
            .with_conn(|conn| {
                students::update_academics(
                    conn,
                    id,
                    &AcademicUpdate {
                        mobile_number: None,
                        cgpa,
                        current_backlogs: backlogs,
                        history_backlogs: backlogs,
                    },
                )
            })
            .unwrap();
        id
    }

    pub fn drive(&self, fields: &DriveFields) -> i64 {
        self.db
            .with_conn(|conn| drives::insert(conn, self.admin, fields))
            .unwrap()
    }
}

/// Open to MCA 2026, min cgpa 7.5, one backlog allowed, closing `deadline_in` from now.
pub fn drive_fields(deadline_in: Duration) -> DriveFields {
    DriveFields {
        company_name: "Zoho".into(),
        job_role: "Member Technical Staff".into(),
        job_description: String::new(),
        location: "Chennai".into(),
        drive_type: "Full-Time".into(),
        company_category: "IT".into(),
        ctc_min: 600_000,
        ctc_max: 800_000,
        ctc_display: "6-8 LPA".into(),
        min_cgpa: 7.5,
        max_backlogs_allowed: 1,
        eligible_departments: Some(vec!["MCA".into()]),
        eligible_batch_years: Some(vec![2026]),
        drive_date: (Utc::now() + deadline_in + Duration::days(1)).date_naive(),
        deadline_date: Utc::now() + deadline_in,
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
