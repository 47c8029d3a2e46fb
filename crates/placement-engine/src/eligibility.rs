//! The single rule set deciding whether a student may apply to a drive.
//!
//! Both the apply path and the student's drive listing go through
//! [`evaluate`], so what a student sees is exactly what they can apply to.

use std::fmt;

use chrono::{DateTime, Utc};
use placement_types::models::{Drive, DriveStatus, StudentSnapshot};

/// The first rule a student failed, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    DriveNotOpen,
    DeadlinePassed,
    CgpaBelowMinimum,
    TooManyBacklogs,
    DepartmentNotEligible,
    BatchNotEligible,
}

impl Ineligibility {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DriveNotOpen => "drive is not open",
            Self::DeadlinePassed => "application deadline has passed",
            Self::CgpaBelowMinimum => "cgpa below minimum",
            Self::TooManyBacklogs => "too many backlogs",
            Self::DepartmentNotEligible => "department not eligible",
            Self::BatchNotEligible => "batch not eligible",
        }
    }
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Ineligible(Ineligibility),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Eligible => "eligible",
            Self::Ineligible(why) => why.reason(),
        }
    }
}

/// Evaluate `student` against `drive` as of `now`, which must come from the
/// database clock. Pure; the first failing rule wins.
pub fn evaluate(student: &StudentSnapshot, drive: &Drive, now: DateTime<Utc>) -> Verdict {
    match first_failure(student, drive, now) {
        Some(why) => Verdict::Ineligible(why),
        None => Verdict::Eligible,
    }
}

fn first_failure(student: &StudentSnapshot, drive: &Drive, now: DateTime<Utc>) -> Option<Ineligibility> {
    if drive.status != DriveStatus::Open {
        return Some(Ineligibility::DriveNotOpen);
    }
    if drive.deadline_date <= now {
        return Some(Ineligibility::DeadlinePassed);
    }
    if student.cgpa < drive.min_cgpa {
        return Some(Ineligibility::CgpaBelowMinimum);
    }
    if student.current_backlogs > drive.max_backlogs_allowed {
        return Some(Ineligibility::TooManyBacklogs);
    }
    if !allows(&drive.eligible_departments, &student.department) {
        return Some(Ineligibility::DepartmentNotEligible);
    }
    if !allows(&drive.eligible_batch_years, &student.batch_year) {
        return Some(Ineligibility::BatchNotEligible);
    }
    None
}

/// Unset and empty both mean "no restriction".
fn allows<T: PartialEq>(set: &Option<Vec<T>>, value: &T) -> bool {
    match set {
        Some(values) if !values.is_empty() => values.contains(value),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn drive(now: DateTime<Utc>) -> Drive {
        Drive {
            id: 1,
            posted_by: 1,
            company_name: "Acme".into(),
            job_role: "SDE".into(),
            job_description: String::new(),
            location: String::new(),
            drive_type: "Full-Time".into(),
            company_category: "IT".into(),
            ctc_min: 400_000,
            ctc_max: 600_000,
            ctc_display: String::new(),
            min_cgpa: 7.5,
            max_backlogs_allowed: 1,
            eligible_departments: Some(vec!["MCA".into(), "CSE".into()]),
            eligible_batch_years: Some(vec![2026]),
            drive_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            deadline_date: now + Duration::days(2),
            status: DriveStatus::Open,
            created_at: now,
        }
    }

    fn student(cgpa: f64) -> StudentSnapshot {
        StudentSnapshot {
            student_id: 7,
            department: "MCA".into(),
            batch_year: 2026,
            cgpa,
            current_backlogs: 0,
        }
    }

    #[test]
    fn strong_student_is_eligible() {
        let now = Utc::now();
        let verdict = evaluate(&student(8.0), &drive(now), now);
        assert!(verdict.is_eligible());
    }

    #[test]
    fn low_cgpa_reports_reason() {
        let now = Utc::now();
        let verdict = evaluate(&student(6.0), &drive(now), now);
        assert_eq!(verdict, Verdict::Ineligible(Ineligibility::CgpaBelowMinimum));
        assert_eq!(verdict.reason(), "cgpa below minimum");
    }

    #[test]
    fn rules_short_circuit_in_order() {
        let now = Utc::now();
        let mut d = drive(now);
        d.status = DriveStatus::OnHold;
        d.deadline_date = now - Duration::hours(1);
        let mut s = student(1.0);
        s.department = "Mech".into();
        assert_eq!(
            evaluate(&s, &d, now),
            Verdict::Ineligible(Ineligibility::DriveNotOpen)
        );

        d.status = DriveStatus::Open;
        assert_eq!(
            evaluate(&s, &d, now),
            Verdict::Ineligible(Ineligibility::DeadlinePassed)
        );

        d.deadline_date = now + Duration::hours(1);
        s.cgpa = 9.0;
        s.current_backlogs = 2;
        assert_eq!(
            evaluate(&s, &d, now),
            Verdict::Ineligible(Ineligibility::TooManyBacklogs)
        );

        s.current_backlogs = 1;
        assert_eq!(
            evaluate(&s, &d, now),
            Verdict::Ineligible(Ineligibility::DepartmentNotEligible)
        );

        s.department = "CSE".into();
        s.batch_year = 2025;
        assert_eq!(
            evaluate(&s, &d, now),
            Verdict::Ineligible(Ineligibility::BatchNotEligible)
        );
    }

    #[test]
    fn deadline_must_be_strictly_in_the_future() {
        let now = Utc::now();
        let mut d = drive(now);
        d.deadline_date = now;
        assert_eq!(
            evaluate(&student(9.0), &d, now),
            Verdict::Ineligible(Ineligibility::DeadlinePassed)
        );
    }

    #[test]
    fn empty_and_unset_sets_are_unrestricted() {
        let now = Utc::now();
        let mut s = student(9.0);
        s.department = "Civil".into();
        s.batch_year = 1999;

        let mut d = drive(now);
        d.eligible_departments = None;
        d.eligible_batch_years = None;
        assert!(evaluate(&s, &d, now).is_eligible());

        d.eligible_departments = Some(vec![]);
        d.eligible_batch_years = Some(vec![]);
        assert!(evaluate(&s, &d, now).is_eligible());
    }

    #[test]
    fn higher_cgpa_never_loses_eligibility() {
        let now = Utc::now();
        let d = drive(now);
        let grades: Vec<f64> = (0..=100).map(|g| g as f64 / 10.0).collect();
        for &lower in &grades {
            if !evaluate(&student(lower), &d, now).is_eligible() {
                continue;
            }
            for &higher in grades.iter().filter(|g| **g >= lower) {
                assert!(
                    evaluate(&student(higher), &d, now).is_eligible(),
                    "{higher} lost eligibility that {lower} had"
                );
            }
        }
    }
}
