use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                role            TEXT NOT NULL CHECK (role IN ('student', 'admin')),
                is_active       INTEGER NOT NULL DEFAULT 1,
                is_blocked      INTEGER NOT NULL DEFAULT 0,
                last_login      TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE student_profiles (
                user_id          INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                full_name        TEXT NOT NULL,
                register_number  TEXT NOT NULL UNIQUE,
                department       TEXT NOT NULL,
                batch_year       INTEGER NOT NULL,
                mobile_number    TEXT,
                cgpa             REAL NOT NULL DEFAULT 0.0,
                current_backlogs INTEGER NOT NULL DEFAULT 0,
                history_backlogs INTEGER NOT NULL DEFAULT 0,
                updated_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_student_profiles_dept_batch
                ON student_profiles(department, batch_year);

            CREATE TABLE student_documents (
                user_id            INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                resume_url         TEXT,
                aadhar_url         TEXT,
                pan_url            TEXT,
                profile_photo_url  TEXT
            );

            CREATE TABLE drives (
                id                    INTEGER PRIMARY KEY AUTOINCREMENT,
                posted_by             INTEGER NOT NULL REFERENCES users(id),
                company_name          TEXT NOT NULL,
                job_role              TEXT NOT NULL,
                job_description       TEXT NOT NULL DEFAULT '',
                location              TEXT NOT NULL DEFAULT '',
                drive_type            TEXT NOT NULL DEFAULT '',
                company_category      TEXT NOT NULL DEFAULT '',
                ctc_min               INTEGER NOT NULL,
                ctc_max               INTEGER NOT NULL,
                ctc_display           TEXT NOT NULL DEFAULT '',
                min_cgpa              REAL NOT NULL,
                max_backlogs_allowed  INTEGER NOT NULL,
                eligible_departments  TEXT,
                eligible_batch_years  TEXT,
                drive_date            TEXT NOT NULL,
                deadline_date         TEXT NOT NULL,
                status                TEXT NOT NULL DEFAULT 'open'
                    CHECK (status IN ('open', 'closed', 'cancelled', 'on_hold', 'completed')),
                created_at            TEXT NOT NULL DEFAULT (datetime('now')),
                CHECK (ctc_min <= ctc_max)
            );

            CREATE INDEX idx_drives_status_deadline
                ON drives(status, deadline_date);

            CREATE TABLE drive_applications (
                drive_id    INTEGER NOT NULL REFERENCES drives(id) ON DELETE CASCADE,
                student_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                status      TEXT NOT NULL DEFAULT 'opted_in'
                    CHECK (status IN ('opted_in', 'shortlisted', 'placed', 'rejected', 'withdrawn')),
                applied_at  TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (drive_id, student_id)
            );

            CREATE INDEX idx_drive_applications_student
                ON drive_applications(student_id, applied_at);

            CREATE TABLE password_resets (
                email       TEXT PRIMARY KEY,
                otp_code    TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
