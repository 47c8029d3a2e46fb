use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
};
use tracing::{error, info};

use placement_engine::accounts;
use placement_types::api::{Claims, UploadQuery, UploadResponse};

use crate::{ApiError, AppState, MAX_UPLOAD_BYTES};

/// POST /api/v1/student/upload?type=resume|aadhar|pan|profile_pic
///
/// The raw request body is the file. It is stored under the student's
/// register number and the resulting URL is recorded on their profile.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::bad_request("file is empty"));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }

    let kind = query.kind;
    let student_id = claims.sub;
    let owner_key = state
        .run(move |db| accounts::document_owner_key(db, student_id))
        .await?;

    let url = state.store.store(&owner_key, kind, &body).await.map_err(|e| {
        error!(student_id, kind = kind.as_str(), "Document store failed: {:#}", e);
        ApiError::Internal
    })?;

    let recorded = url.clone();
    state
        .run(move |db| accounts::record_document(db, student_id, kind, &recorded))
        .await?;

    info!(student_id, kind = kind.as_str(), size = body.len(), "Document uploaded");
    Ok(Json(UploadResponse {
        message: "File uploaded successfully".into(),
        register_number: owner_key,
        kind,
        url,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use placement_types::models::Role;

    use crate::test_support::TestApp;

    fn upload_request(token: &str, kind: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/student/upload?type={kind}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_records_url_under_register_number() {
        let t = TestApp::new().await;
        let (id, student) = t.student("asha@kec.test", "23MCA001", 8.0);

        let (status, body) = t.raw(upload_request(&student, "resume", b"%PDF-1.7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["register_number"], "23MCA001");
        assert_eq!(body["type"], "resume");
        assert_eq!(body["url"], "http://files.test/23MCA001/resume");

        let stored = t
            .state
            .db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT resume_url FROM student_documents WHERE user_id = ?1",
                    [id],
                    |row| row.get::<_, Option<String>>(0),
                )?)
            })
            .unwrap();
        assert_eq!(stored.as_deref(), Some("http://files.test/23MCA001/resume"));
    }

    #[tokio::test]
    async fn rejects_empty_files_and_unknown_kinds() {
        let t = TestApp::new().await;
        let (_, student) = t.student("ravi@kec.test", "23MCA002", 8.0);

        let (status, _) = t.raw(upload_request(&student, "pan", b"")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = t.raw(upload_request(&student, "selfie", b"jpeg")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admins_cannot_upload() {
        let t = TestApp::new().await;
        let (_, admin) = t.user("tpo@kec.test", "secret1", Role::Admin);
        let (status, _) = t.raw(upload_request(&admin, "resume", b"%PDF")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
