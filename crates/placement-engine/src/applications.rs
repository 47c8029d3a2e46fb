//! Application state machine.
//!
//! ```text
//! none -> opted_in -> shortlisted -> placed
//!            |            |
//!            |            +-------> rejected
//!            +--------------------> rejected
//!            +--------------------> withdrawn
//! ```
//!
//! Every transition is a single guarded statement, so concurrent writers on
//! the same `(drive, student)` pair converge on one row.

use placement_db::Database;
use placement_db::models::GuardedWrite;
use placement_db::queries::{applications, drives, students};
use placement_db::rusqlite::TransactionBehavior;
use placement_types::models::{ApplicationStatus, Role};
use serde::Serialize;
use tracing::{debug, info};

use crate::eligibility::{Verdict, evaluate};
use crate::{EngineError, Result};

/// Result of a self-service apply. A refusal is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub accepted: bool,
    pub reason: String,
}

impl ApplyOutcome {
    fn accepted() -> Self {
        Self {
            accepted: true,
            reason: "applied".into(),
        }
    }

    fn refused(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Apply `student_id` to `drive_id` if the eligibility rules allow it.
///
/// The drive, the student's snapshot and the clock are all read inside one
/// immediate transaction with the insert, so the decision is made on the
/// state that is written against. Applying twice is a success both times.
pub fn apply(db: &Database, student_id: i64, drive_id: i64) -> Result<ApplyOutcome> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = placement_db::current_time(&tx)?;

        let Some(drive) = drives::by_id(&tx, drive_id)? else {
            return Ok(Err(EngineError::not_found("drive")));
        };
        let Some(student) = students::snapshot(&tx, student_id)? else {
            return Ok(Err(EngineError::not_found("student profile")));
        };

        if let Verdict::Ineligible(why) = evaluate(&student, &drive, now) {
            debug!(student_id, drive_id, reason = %why, "Apply refused");
            return Ok(Ok(ApplyOutcome::refused(why.reason())));
        }

        if !applications::insert_if_absent(&tx, drive_id, student_id)? {
            let existing = applications::get(&tx, drive_id, student_id)?;
            if matches!(existing.map(|a| a.status), Some(ApplicationStatus::Withdrawn)) {
                return Ok(Ok(ApplyOutcome::refused("application was withdrawn")));
            }
            debug!(student_id, drive_id, "Already applied");
        }

        tx.commit()?;
        Ok(Ok(ApplyOutcome::accepted()))
    })?
}

/// Admin override: register a student regardless of eligibility or deadline,
/// reactivating a withdrawn or rejected application.
pub fn force_register(db: &Database, drive_id: i64, student_id: i64) -> Result<()> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if drives::by_id(&tx, drive_id)?.is_none() {
            return Ok(Err(EngineError::not_found("drive")));
        }
        match students::user_by_id(&tx, student_id)? {
            Some(user) if user.role == Role::Student => {}
            _ => return Ok(Err(EngineError::not_found("student"))),
        }
        applications::force_register(&tx, drive_id, student_id)?;
        tx.commit()?;
        Ok(Ok(()))
    })??;

    info!(drive_id, student_id, "Student force-registered for drive");
    Ok(())
}

/// States an application may move to `target` from. Re-asserting the current
/// state is included so repeated updates succeed.
fn allowed_sources(target: ApplicationStatus) -> Option<&'static [ApplicationStatus]> {
    use ApplicationStatus::*;
    match target {
        Shortlisted => Some(&[OptedIn, Shortlisted]),
        Rejected => Some(&[OptedIn, Shortlisted, Rejected]),
        Placed => Some(&[Shortlisted, Placed]),
        OptedIn | Withdrawn => None,
    }
}

/// Admin status change. Only shortlisted, placed and rejected are accepted,
/// and only along forward edges of the state machine.
pub fn update_status(
    db: &Database,
    drive_id: i64,
    student_id: i64,
    status: ApplicationStatus,
) -> Result<()> {
    let Some(sources) = allowed_sources(status) else {
        return Err(EngineError::validation(format!(
            "status must be one of shortlisted, placed, rejected (got {status})"
        )));
    };

    let write = db.with_conn(|conn| {
        applications::transition_status(conn, drive_id, student_id, status, sources)
    })?;

    match write {
        GuardedWrite::Applied => {
            info!(drive_id, student_id, %status, "Application status updated");
            Ok(())
        }
        GuardedWrite::Rejected { current } => Err(EngineError::conflict(format!(
            "cannot move application from {current} to {status}"
        ))),
        GuardedWrite::Missing => Err(EngineError::not_found("application")),
    }
}

/// Student withdraws an application that has not been acted on yet.
pub fn withdraw(db: &Database, student_id: i64, drive_id: i64) -> Result<()> {
    use ApplicationStatus::{OptedIn, Withdrawn};

    let write = db.with_conn(|conn| {
        applications::transition_status(conn, drive_id, student_id, Withdrawn, &[OptedIn, Withdrawn])
    })?;

    match write {
        GuardedWrite::Applied => Ok(()),
        GuardedWrite::Rejected { current } => Err(EngineError::conflict(format!(
            "cannot withdraw an application that is {current}"
        ))),
        GuardedWrite::Missing => Err(EngineError::not_found("application")),
    }
}
