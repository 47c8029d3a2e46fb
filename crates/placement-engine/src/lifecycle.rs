//! Drive lifecycle: admin create/update/delete, status transitions and the
//! home-page display classification.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use placement_db::Database;
use placement_db::models::{DriveFields, GuardedWrite};
use placement_db::queries::drives;
use placement_db::rusqlite::{Connection, TransactionBehavior};
use placement_types::api::DriveInput;
use placement_types::models::{DisplayGroup, Drive, DriveStatus};
use tracing::info;

use crate::{EngineError, Result};

/// A drive whose date is further out than this is "upcoming" rather than "ongoing".
pub const UPCOMING_WINDOW_DAYS: i64 = 5;

/// Split a request body into storable fields and the optional status change.
pub fn drive_fields(input: DriveInput) -> (DriveFields, Option<DriveStatus>) {
    let fields = DriveFields {
        company_name: input.company_name.trim().to_string(),
        job_role: input.job_role.trim().to_string(),
        job_description: input.job_description,
        location: input.location.trim().to_string(),
        drive_type: input.drive_type.trim().to_string(),
        company_category: input.company_category.trim().to_string(),
        ctc_min: input.ctc_min,
        ctc_max: input.ctc_max,
        ctc_display: input.ctc_display,
        min_cgpa: input.min_cgpa,
        max_backlogs_allowed: input.max_backlogs_allowed,
        eligible_departments: input.eligible_departments,
        eligible_batch_years: input.eligible_batch_years,
        drive_date: input.drive_date,
        deadline_date: input.deadline_date,
    };
    (fields, input.status)
}

pub fn validate(fields: &DriveFields) -> Result<()> {
    if fields.company_name.is_empty() {
        return Err(EngineError::validation("company_name is required"));
    }
    if fields.job_role.is_empty() {
        return Err(EngineError::validation("job_role is required"));
    }
    if fields.ctc_min < 0 || fields.ctc_min > fields.ctc_max {
        return Err(EngineError::validation(
            "ctc_min must be non-negative and not exceed ctc_max",
        ));
    }
    if !(0.0..=10.0).contains(&fields.min_cgpa) {
        return Err(EngineError::validation("min_cgpa must be between 0 and 10"));
    }
    if fields.deadline_date.date_naive() > fields.drive_date {
        return Err(EngineError::validation(
            "deadline_date must not be after drive_date",
        ));
    }
    Ok(())
}

pub fn create_drive(db: &Database, posted_by: i64, input: DriveInput) -> Result<Drive> {
    let (fields, _) = drive_fields(input);
    validate(&fields)?;

    let id = db
        .with_conn(|conn| drives::insert(conn, posted_by, &fields))
        .map_err(EngineError::from_write)?;
    info!(drive_id = id, posted_by, company = %fields.company_name, "Drive created");

    db.get_drive(id)?.ok_or_else(|| EngineError::not_found("drive"))
}

/// Replace a drive's fields and, if requested, move its status. Both happen
/// in one transaction; an illegal status change leaves the fields untouched.
pub fn update_drive(db: &Database, id: i64, input: DriveInput) -> Result<Drive> {
    let (fields, status) = drive_fields(input);
    validate(&fields)?;

    db.with_conn_mut(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !drives::update_fields(&tx, id, &fields)? {
            return Ok(Err(EngineError::not_found("drive")));
        }
        if let Some(target) = status {
            if let Err(e) = transition(&tx, id, target)? {
                return Ok(Err(e));
            }
        }
        tx.commit()?;
        Ok(Ok(()))
    })
    .map_err(EngineError::from_write)??;

    info!(drive_id = id, "Drive updated");
    db.get_drive(id)?.ok_or_else(|| EngineError::not_found("drive"))
}

/// Remove a drive and, by cascade, every application to it.
pub fn delete_drive(db: &Database, id: i64) -> Result<()> {
    if !db.delete_drive(id)? {
        return Err(EngineError::not_found("drive"));
    }
    info!(drive_id = id, "Drive deleted");
    Ok(())
}

/// Admin status change, e.g. cancelling or pausing a drive.
pub fn set_status(db: &Database, id: i64, target: DriveStatus) -> Result<Drive> {
    db.with_conn(|conn| transition(conn, id, target))??;
    info!(drive_id = id, status = %target, "Drive status changed");
    db.get_drive(id)?.ok_or_else(|| EngineError::not_found("drive"))
}

/// States a drive may be moved to `target` from by an admin. Re-asserting the
/// current status is allowed. Reopening is not; the reconciler never reopens either.
fn allowed_sources(target: DriveStatus) -> &'static [DriveStatus] {
    use DriveStatus::*;
    match target {
        Open => &[Open],
        Closed => &[Open, Closed],
        Cancelled => &[Open, Cancelled],
        OnHold => &[Open, Closed, OnHold],
        Completed => &DriveStatus::ALL,
    }
}

fn transition(conn: &Connection, id: i64, target: DriveStatus) -> anyhow::Result<Result<()>> {
    Ok(match drives::transition_status(conn, id, target, allowed_sources(target))? {
        GuardedWrite::Applied => Ok(()),
        GuardedWrite::Rejected { current } => Err(EngineError::conflict(format!(
            "cannot move drive from {current} to {target}"
        ))),
        GuardedWrite::Missing => Err(EngineError::not_found("drive")),
    })
}

/// Home-page bucket for `drive` as of `now`. Cancelled drives are not shown.
pub fn classify(drive: &Drive, now: DateTime<Utc>) -> Option<DisplayGroup> {
    match drive.status {
        DriveStatus::Open => {
            let starts = drive.drive_date.and_time(NaiveTime::MIN).and_utc();
            if starts > now + Duration::days(UPCOMING_WINDOW_DAYS) {
                Some(DisplayGroup::Upcoming)
            } else {
                Some(DisplayGroup::Ongoing)
            }
        }
        DriveStatus::Closed | DriveStatus::Completed => Some(DisplayGroup::Completed),
        DriveStatus::OnHold => Some(DisplayGroup::OnHold),
        DriveStatus::Cancelled => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{date, fixture};
    use chrono::TimeZone;

    fn input(deadline: DateTime<Utc>) -> DriveInput {
        DriveInput {
            company_name: "  Infosys ".into(),
            job_role: "Systems Engineer".into(),
            job_description: "Campus hiring".into(),
            location: "Mysuru".into(),
            drive_type: "Full-Time".into(),
            company_category: "IT".into(),
            ctc_min: 360_000,
            ctc_max: 450_000,
            ctc_display: "3.6 LPA".into(),
            min_cgpa: 6.0,
            max_backlogs_allowed: 0,
            eligible_departments: Some(vec!["MCA".into()]),
            eligible_batch_years: None,
            drive_date: deadline.date_naive() + Duration::days(3),
            deadline_date: deadline,
            status: None,
        }
    }

    #[test]
    fn create_trims_and_opens() {
        let fx = fixture();
        let drive = create_drive(&fx.db, fx.admin, input(fx.now() + Duration::days(2))).unwrap();
        assert_eq!(drive.company_name, "Infosys");
        assert_eq!(drive.status, DriveStatus::Open);
        assert_eq!(drive.posted_by, fx.admin);
    }

    #[test]
    fn create_rejects_bad_input() {
        let fx = fixture();
        let deadline = fx.now() + Duration::days(2);

        let mut bad = input(deadline);
        bad.ctc_min = 900_000;
        assert!(matches!(
            create_drive(&fx.db, fx.admin, bad),
            Err(EngineError::Validation(_))
        ));

        let mut bad = input(deadline);
        bad.drive_date = deadline.date_naive() - Duration::days(1);
        assert!(matches!(
            create_drive(&fx.db, fx.admin, bad),
            Err(EngineError::Validation(_))
        ));

        let mut bad = input(deadline);
        bad.company_name = "   ".into();
        assert!(matches!(
            create_drive(&fx.db, fx.admin, bad),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn update_with_illegal_status_changes_nothing() {
        let fx = fixture();
        let drive = create_drive(&fx.db, fx.admin, input(fx.now() + Duration::days(2))).unwrap();
        set_status(&fx.db, drive.id, DriveStatus::Cancelled).unwrap();

        let mut edit = input(fx.now() + Duration::days(2));
        edit.company_name = "Wipro".into();
        edit.status = Some(DriveStatus::OnHold);
        let err = update_drive(&fx.db, drive.id, edit).unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));

        let stored = fx.db.get_drive(drive.id).unwrap().unwrap();
        assert_eq!(stored.company_name, "Infosys");
        assert_eq!(stored.status, DriveStatus::Cancelled);
    }

    #[test]
    fn update_can_put_drive_on_hold() {
        let fx = fixture();
        let drive = create_drive(&fx.db, fx.admin, input(fx.now() + Duration::days(2))).unwrap();
        let mut edit = input(fx.now() + Duration::days(4));
        edit.status = Some(DriveStatus::OnHold);
        let updated = update_drive(&fx.db, drive.id, edit).unwrap();
        assert_eq!(updated.status, DriveStatus::OnHold);
    }

    #[test]
    fn update_and_delete_missing_drive() {
        let fx = fixture();
        let err = update_drive(&fx.db, 77, input(fx.now() + Duration::days(1))).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        assert!(matches!(delete_drive(&fx.db, 77), Err(EngineError::NotFound(_))));
    }

    #[test]
    fn status_transition_table() {
        let fx = fixture();
        let drive = create_drive(&fx.db, fx.admin, input(fx.now() + Duration::days(2))).unwrap();

        // re-asserting is a no-op
        set_status(&fx.db, drive.id, DriveStatus::Open).unwrap();
        set_status(&fx.db, drive.id, DriveStatus::Closed).unwrap();
        set_status(&fx.db, drive.id, DriveStatus::OnHold).unwrap();
        assert!(matches!(
            set_status(&fx.db, drive.id, DriveStatus::Cancelled),
            Err(EngineError::Conflict(_))
        ));
        assert!(matches!(
            set_status(&fx.db, drive.id, DriveStatus::Open),
            Err(EngineError::Conflict(_))
        ));
        let done = set_status(&fx.db, drive.id, DriveStatus::Completed).unwrap();
        assert_eq!(done.status, DriveStatus::Completed);
        set_status(&fx.db, drive.id, DriveStatus::Completed).unwrap();
    }

    #[test]
    fn classification() {
        let now = Utc.with_ymd_and_hms(2030, 3, 1, 12, 0, 0).unwrap();
        let fx = fixture();
        let id = fx.drive(&crate::test_support::drive_fields(Duration::days(1)));
        let mut drive = fx.db.get_drive(id).unwrap().unwrap();

        drive.drive_date = date(2030, 3, 10);
        assert_eq!(classify(&drive, now), Some(DisplayGroup::Upcoming));
        drive.drive_date = date(2030, 3, 6);
        assert_eq!(classify(&drive, now), Some(DisplayGroup::Ongoing));
        drive.drive_date = date(2030, 2, 20);
        assert_eq!(classify(&drive, now), Some(DisplayGroup::Ongoing));

        drive.status = DriveStatus::Closed;
        assert_eq!(classify(&drive, now), Some(DisplayGroup::Completed));
        drive.status = DriveStatus::Completed;
        assert_eq!(classify(&drive, now), Some(DisplayGroup::Completed));
        drive.status = DriveStatus::OnHold;
        assert_eq!(classify(&drive, now), Some(DisplayGroup::OnHold));
        drive.status = DriveStatus::Cancelled;
        assert_eq!(classify(&drive, now), None);
    }
}
