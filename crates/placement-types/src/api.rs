use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ApplicationStatus, DocumentKind, DriveStatus, Role};

// -- JWT Claims --

/// Bearer token claims. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub role: Role,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

// -- Drives --

/// Body of create and update drive requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveInput {
    pub company_name: String,
    pub job_role: String,
    #[serde(default)]
    pub job_description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub drive_type: String,
    #[serde(default)]
    pub company_category: String,
    pub ctc_min: i64,
    pub ctc_max: i64,
    #[serde(default)]
    pub ctc_display: String,
    pub min_cgpa: f64,
    pub max_backlogs_allowed: u32,
    #[serde(default)]
    pub eligible_departments: Option<Vec<String>>,
    #[serde(default)]
    pub eligible_batch_years: Option<Vec<i32>>,
    pub drive_date: NaiveDate,
    pub deadline_date: DateTime<Utc>,
    /// Only honoured on update; routed through the drive lifecycle rules.
    #[serde(default)]
    pub status: Option<DriveStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDriveResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DriveListQuery {
    pub category: Option<String>,
    pub min_salary: Option<i64>,
    #[serde(rename = "type")]
    pub drive_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetDriveStatusRequest {
    pub status: DriveStatus,
}

// -- Applications --

/// `reason` is "applied" on success, otherwise the refusal reason.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub accepted: bool,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManualRegisterRequest {
    pub student_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateApplicationStatusRequest {
    pub drive_id: i64,
    pub student_id: i64,
    pub status: ApplicationStatus,
}

// -- Students --

#[derive(Debug, Default, Deserialize)]
pub struct StudentListQuery {
    pub dept: Option<String>,
    pub batch: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub batch_year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkDeleteResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkUploadResponse {
    pub message: String,
    pub students_added: usize,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockRequest {
    pub block: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub mobile_number: Option<String>,
    pub cgpa: f64,
    pub current_backlogs: u32,
    #[serde(default)]
    pub history_backlogs: u32,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub register_number: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    pub url: String,
}
