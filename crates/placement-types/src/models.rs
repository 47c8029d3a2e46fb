use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// -- Roles --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "admin" => Ok(Self::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

// -- Drives --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStatus {
    Open,
    Closed,
    Cancelled,
    OnHold,
    Completed,
}

impl DriveStatus {
    pub const ALL: [DriveStatus; 5] = [
        Self::Open,
        Self::Closed,
        Self::Cancelled,
        Self::OnHold,
        Self::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for DriveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DriveStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("drive status", s))
    }
}

/// A posted job or internship opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drive {
    pub id: i64,
    pub posted_by: i64,
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
    /// `None` means every department may apply.
    pub eligible_departments: Option<Vec<String>>,
    /// `None` means every batch may apply.
    pub eligible_batch_years: Option<Vec<i32>>,
    pub drive_date: NaiveDate,
    pub deadline_date: DateTime<Utc>,
    pub status: DriveStatus,
    pub created_at: DateTime<Utc>,
}

/// Home-page bucket a drive is shown under. Derived at read time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayGroup {
    Upcoming,
    Ongoing,
    Completed,
    OnHold,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomePageGroups {
    pub upcoming: Vec<Drive>,
    pub ongoing: Vec<Drive>,
    pub completed: Vec<Drive>,
    pub on_hold: Vec<Drive>,
}

impl HomePageGroups {
    pub fn push(&mut self, group: DisplayGroup, drive: Drive) {
        match group {
            DisplayGroup::Upcoming => self.upcoming.push(drive),
            DisplayGroup::Ongoing => self.ongoing.push(drive),
            DisplayGroup::Completed => self.completed.push(drive),
            DisplayGroup::OnHold => self.on_hold.push(drive),
        }
    }
}

// -- Applications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    OptedIn,
    Shortlisted,
    Placed,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 5] = [
        Self::OptedIn,
        Self::Shortlisted,
        Self::Placed,
        Self::Rejected,
        Self::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OptedIn => "opted_in",
            Self::Shortlisted => "shortlisted",
            Self::Placed => "placed",
            Self::Rejected => "rejected",
            Self::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("application status", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub drive_id: i64,
    pub student_id: i64,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A student's own application joined with the drive it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentApplication {
    pub drive_id: i64,
    pub company_name: String,
    pub job_role: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

// -- Students --

/// The academic facts eligibility is decided on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSnapshot {
    pub student_id: i64,
    pub department: String,
    pub batch_year: i32,
    pub cgpa: f64,
    pub current_backlogs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub register_number: String,
    pub department: String,
    pub batch_year: i32,
    pub mobile_number: Option<String>,
    pub is_blocked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Resume,
    Aadhar,
    Pan,
    ProfilePic,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::Aadhar => "aadhar",
            Self::Pan => "pan",
            Self::ProfilePic => "profile_pic",
        }
    }
}

impl FromStr for DocumentKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resume" => Ok(Self::Resume),
            "aadhar" => Ok(Self::Aadhar),
            "pan" => Ok(Self::Pan),
            "profile_pic" => Ok(Self::ProfilePic),
            other => Err(ParseEnumError::new("document type", other)),
        }
    }
}
