use axum::{
    Extension, Json,
    extract::{Path, State},
};

use placement_engine::{applications, listing};
use placement_types::api::{
    ApplyResponse, Claims, ManualRegisterRequest, MessageResponse, UpdateApplicationStatusRequest,
};
use placement_types::models::{Application, StudentApplication};

use crate::{ApiError, AppState};

/// POST /api/v1/drives/{id}/apply
///
/// A refusal is `200` with `accepted: false` and the reason; only a missing
/// drive or profile is an error.
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(drive_id): Path<i64>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let outcome = state
        .run(move |db| applications::apply(db, claims.sub, drive_id))
        .await?;

    Ok(Json(ApplyResponse {
        accepted: outcome.accepted,
        reason: outcome.reason,
    }))
}

/// POST /api/v1/drives/{id}/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(drive_id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .run(move |db| applications::withdraw(db, claims.sub, drive_id))
        .await?;
    Ok(Json(MessageResponse::new("Application withdrawn")))
}

/// GET /api/v1/student/applications
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<StudentApplication>>, ApiError> {
    Ok(Json(
        state
            .run(move |db| listing::student_applications(db, claims.sub))
            .await?,
    ))
}

/// GET /api/v1/admin/drives/{id}/applications
pub async fn drive_applications(
    State(state): State<AppState>,
    Path(drive_id): Path<i64>,
) -> Result<Json<Vec<Application>>, ApiError> {
    Ok(Json(
        state
            .run(move |db| listing::drive_applications(db, drive_id))
            .await?,
    ))
}

/// POST /api/v1/admin/drives/{id}/add-student
pub async fn add_student(
    State(state): State<AppState>,
    Path(drive_id): Path<i64>,
    Json(req): Json<ManualRegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .run(move |db| applications::force_register(db, drive_id, req.student_id))
        .await?;
    Ok(Json(MessageResponse::new("Student registered for drive")))
}

/// PUT /api/v1/admin/applications/status
pub async fn update_status(
    State(state): State<AppState>,
    Json(req): Json<UpdateApplicationStatusRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .run(move |db| applications::update_status(db, req.drive_id, req.student_id, req.status))
        .await?;
    Ok(Json(MessageResponse::new(format!(
        "Application marked {}",
        req.status
    ))))
}
