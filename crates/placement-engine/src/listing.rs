//! Read views over drives, applications and students.

use placement_db::queries::{applications, drives, students};
use placement_db::{Database, DriveFilter, StudentFilter};
use placement_types::models::{
    Application, Drive, DriveStatus, HomePageGroups, StudentApplication, StudentSummary,
};

use crate::eligibility::evaluate;
use crate::lifecycle::classify;
use crate::{EngineError, Result};

/// Admin listing, soonest deadline first.
pub fn list_drives(db: &Database, filter: &DriveFilter) -> Result<Vec<Drive>> {
    Ok(db.list_drives(filter)?)
}

/// Open drives `student_id` could apply to right now, soonest deadline first.
pub fn list_eligible_drives(db: &Database, student_id: i64) -> Result<Vec<Drive>> {
    let (student, now, open) = db.with_conn(|conn| {
        let student = students::snapshot(conn, student_id)?;
        let now = placement_db::current_time(conn)?;
        let open = drives::with_status(conn, DriveStatus::Open)?;
        Ok((student, now, open))
    })?;
    let student = student.ok_or_else(|| EngineError::not_found("student profile"))?;

    Ok(open
        .into_iter()
        .filter(|drive| evaluate(&student, drive, now).is_eligible())
        .collect())
}

/// Every non-cancelled drive, bucketed for the home page.
pub fn home_page_groups(db: &Database) -> Result<HomePageGroups> {
    let (now, visible) = db.with_conn(|conn| {
        Ok((placement_db::current_time(conn)?, drives::visible(conn)?))
    })?;

    let mut groups = HomePageGroups::default();
    for drive in visible {
        if let Some(group) = classify(&drive, now) {
            groups.push(group, drive);
        }
    }
    Ok(groups)
}

pub fn drive_applications(db: &Database, drive_id: i64) -> Result<Vec<Application>> {
    db.with_conn(|conn| {
        if drives::by_id(conn, drive_id)?.is_none() {
            return Ok(None);
        }
        applications::for_drive(conn, drive_id).map(Some)
    })?
    .ok_or_else(|| EngineError::not_found("drive"))
}

pub fn student_applications(db: &Database, student_id: i64) -> Result<Vec<StudentApplication>> {
    Ok(db.student_applications(student_id)?)
}

pub fn list_students(db: &Database, filter: &StudentFilter) -> Result<Vec<StudentSummary>> {
    Ok(db.list_students(filter)?)
}
