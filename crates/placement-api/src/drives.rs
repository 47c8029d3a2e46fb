use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use placement_db::DriveFilter;
use placement_engine::{lifecycle, listing};
use placement_types::api::{
    Claims, CreateDriveResponse, DriveInput, DriveListQuery, MessageResponse, SetDriveStatusRequest,
};
use placement_types::models::{Drive, HomePageGroups, Role};

use crate::{ApiError, AppState};

/// GET /api/v1/drives
///
/// Students get the open drives they are eligible for. Admins get every
/// drive, narrowed by `category`, `min_salary` and `type`.
pub async fn list_drives(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<DriveListQuery>,
) -> Result<Json<Vec<Drive>>, ApiError> {
    let drives = match claims.role {
        Role::Student => {
            state
                .run(move |db| listing::list_eligible_drives(db, claims.sub))
                .await?
        }
        Role::Admin => {
            let filter = DriveFilter {
                category: query.category,
                min_salary: query.min_salary,
                drive_type: query.drive_type,
            };
            state.run(move |db| listing::list_drives(db, &filter)).await?
        }
    };
    Ok(Json(drives))
}

/// GET /api/v1/drives/home
pub async fn home_page(State(state): State<AppState>) -> Result<Json<HomePageGroups>, ApiError> {
    Ok(Json(state.run(listing::home_page_groups).await?))
}

/// POST /api/v1/admin/drives
pub async fn create_drive(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(input): Json<DriveInput>,
) -> Result<impl IntoResponse, ApiError> {
    let drive = state
        .run(move |db| lifecycle::create_drive(db, claims.sub, input))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDriveResponse {
            message: "Drive created successfully".into(),
            id: drive.id,
        }),
    ))
}

/// PUT /api/v1/admin/drives/{id}
pub async fn update_drive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<DriveInput>,
) -> Result<Json<Drive>, ApiError> {
    Ok(Json(
        state.run(move |db| lifecycle::update_drive(db, id, input)).await?,
    ))
}

/// DELETE /api/v1/admin/drives/{id}
pub async fn delete_drive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.run(move |db| lifecycle::delete_drive(db, id)).await?;
    Ok(Json(MessageResponse::new("Drive deleted")))
}

/// PUT /api/v1/admin/drives/{id}/status
pub async fn set_drive_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<SetDriveStatusRequest>,
) -> Result<Json<Drive>, ApiError> {
    Ok(Json(
        state
            .run(move |db| lifecycle::set_status(db, id, req.status))
            .await?,
    ))
}
