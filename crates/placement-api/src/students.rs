use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

use placement_db::StudentFilter;
use placement_db::models::{AcademicUpdate, NewStudentAccount};
use placement_engine::{accounts, import, listing};
use placement_types::api::{
    BlockRequest, BulkDeleteRequest, BulkDeleteResponse, BulkUploadResponse, Claims,
    MessageResponse, StudentListQuery, UpdateProfileRequest,
};
use placement_types::models::StudentSummary;

use crate::auth::hash_password;
use crate::{ApiError, AppState};

/// PUT /api/v1/student/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let update = AcademicUpdate {
        mobile_number: req.mobile_number,
        cgpa: req.cgpa,
        current_backlogs: req.current_backlogs,
        history_backlogs: req.history_backlogs,
    };
    state
        .run(move |db| accounts::update_profile(db, claims.sub, &update))
        .await?;
    Ok(Json(MessageResponse::new("Profile updated")))
}

/// POST /api/v1/admin/students/bulk-upload
///
/// The body is a CSV file: a header row, then
/// `email,name,regNo,dept,batchYear,password`. Either every row is created
/// or none is.
pub async fn bulk_upload(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Parsing and hashing are CPU bound; keep them off the async workers.
    let accounts = tokio::task::spawn_blocking(move || prepare_accounts(&body))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })??;

    let added = state
        .run(move |db| accounts::create_students(db, &accounts))
        .await?;

    info!(added, "Bulk upload complete");
    Ok((
        StatusCode::CREATED,
        Json(BulkUploadResponse {
            message: "Students uploaded successfully".into(),
            students_added: added,
        }),
    ))
}

fn prepare_accounts(csv: &[u8]) -> Result<Vec<NewStudentAccount>, ApiError> {
    let rows = import::parse_student_rows(csv).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut accounts = Vec::with_capacity(rows.len());
    for row in rows {
        accounts.push(NewStudentAccount {
            password_hash: hash_password(&row.password)?,
            email: row.email,
            full_name: row.full_name,
            register_number: row.register_number,
            department: row.department,
            batch_year: row.batch_year,
        });
    }
    Ok(accounts)
}

/// GET /api/v1/admin/students?dept=&batch=&search=
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentListQuery>,
) -> Result<Json<Vec<StudentSummary>>, ApiError> {
    let filter = StudentFilter {
        department: query.dept,
        batch_year: query.batch,
        search: query.search,
    };
    Ok(Json(
        state.run(move |db| listing::list_students(db, &filter)).await?,
    ))
}

/// DELETE /api/v1/admin/students/bulk
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<Json<BulkDeleteResponse>, ApiError> {
    let filter = StudentFilter {
        department: req.department,
        batch_year: req.batch_year,
        search: None,
    };
    let count = state
        .run(move |db| accounts::bulk_delete_students(db, &filter))
        .await?;

    Ok(Json(BulkDeleteResponse {
        message: format!("Deleted {count} students"),
        count,
    }))
}

/// DELETE /api/v1/admin/students/{id}
pub async fn delete_student(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.run(move |db| accounts::delete_student(db, id)).await?;
    Ok(Json(MessageResponse::new("Student deleted")))
}

/// PUT /api/v1/admin/users/{id}/block
pub async fn set_blocked(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .run(move |db| accounts::set_blocked(db, id, req.block))
        .await?;
    let message = if req.block { "User blocked" } else { "User unblocked" };
    Ok(Json(MessageResponse::new(message)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use placement_types::models::Role;
    use serde_json::json;

    use crate::test_support::TestApp;

    const CSV: &str = "\
email,name,regNo,dept,batchYear,password
asha@kec.test,Asha R,23MCA001,MCA,2026,secret1
ravi@kec.test,Ravi K,23MCA002,MCA,2026,secret2
kavin@kec.test,Kavin S,22CSE014,CSE,2025,secret3
";

    async fn upload(t: &TestApp, token: &str, csv: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/admin/students/bulk-upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(csv.to_string()))
            .unwrap();
        t.raw(request).await
    }

    #[tokio::test]
    async fn bulk_upload_then_filter_and_delete() {
        let t = TestApp::new().await;
        let (_, admin) = t.user("tpo@kec.test", "secret1", Role::Admin);

        let (status, body) = upload(&t, &admin, CSV).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["students_added"], 3);

        let (status, _) = upload(&t, &admin, CSV).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = t
            .send("GET", "/api/v1/admin/students?dept=MCA&batch=2026", Some(&admin), None)
            .await;
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["register_number"], "23MCA001");

        let (_, body) = t
            .send("GET", "/api/v1/admin/students?search=kavin", Some(&admin), None)
            .await;
        assert_eq!(body[0]["email"], "kavin@kec.test");

        let (status, _) = t
            .send("DELETE", "/api/v1/admin/students/bulk", Some(&admin), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = t
            .send(
                "DELETE",
                "/api/v1/admin/students/bulk",
                Some(&admin),
                Some(json!({"department": "MCA"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);

        let (_, body) = t.send("GET", "/api/v1/admin/students", Some(&admin), None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_csv_names_the_line() {
        let t = TestApp::new().await;
        let (_, admin) = t.user("tpo@kec.test", "secret1", Role::Admin);

        let csv = "email,name,regNo,dept,batchYear,password\nasha@kec.test,Asha,23MCA001,MCA,soon,pw\n";
        let (status, body) = upload(&t, &admin, csv).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("line 2"));

        let (_, body) = t.send("GET", "/api/v1/admin/students", Some(&admin), None).await;
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_update_changes_eligibility_inputs() {
        let t = TestApp::new().await;
        let (id, student) = t.student("asha@kec.test", "23MCA001", 6.0);

        let (status, _) = t
            .send(
                "PUT",
                "/api/v1/student/profile",
                Some(&student),
                Some(json!({"cgpa": 11.0, "current_backlogs": 0})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = t
            .send(
                "PUT",
                "/api/v1/student/profile",
                Some(&student),
                Some(json!({"cgpa": 8.4, "current_backlogs": 1, "mobile_number": "9876543210"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let snapshot = t.state.db.student_snapshot(id).unwrap().unwrap();
        assert_eq!(snapshot.cgpa, 8.4);
        assert_eq!(snapshot.current_backlogs, 1);
    }

    #[tokio::test]
    async fn block_and_delete_student() {
        let t = TestApp::new().await;
        let (_, admin) = t.user("tpo@kec.test", "secret1", Role::Admin);
        let (id, _) = t.student("ravi@kec.test", "23MCA002", 7.0);

        let (status, body) = t
            .send(
                "PUT",
                &format!("/api/v1/admin/users/{id}/block"),
                Some(&admin),
                Some(json!({"block": true})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User blocked");

        let (_, body) = t.send("GET", "/api/v1/admin/students", Some(&admin), None).await;
        assert_eq!(body[0]["is_blocked"], true);

        let (status, _) = t
            .send("DELETE", &format!("/api/v1/admin/students/{id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = t
            .send("DELETE", &format!("/api/v1/admin/students/{id}"), Some(&admin), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
