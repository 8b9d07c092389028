use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    create_folder, delete_file, get_file, get_file_url, list_files, move_file, search_files,
    update_file, upload_files,
};
use crate::features::files::services::FileService;

/// Create routes for the file catalog
///
/// `max_upload_body` caps the whole multipart body of a batch upload.
pub fn routes(file_service: Arc<FileService>, max_upload_body: usize) -> Router {
    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/files/search", get(search_files))
        .route("/api/files/folders", post(create_folder))
        .route(
            "/api/files/upload",
            post(upload_files).layer(DefaultBodyLimit::max(max_upload_body)),
        )
        .route(
            "/api/files/{id}",
            get(get_file).patch(update_file).delete(delete_file),
        )
        .route("/api/files/{id}/url", get(get_file_url))
        .route("/api/files/{id}/move", post(move_file))
        .with_state(file_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::TestContext;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;
    use serde_json::{json, Value};

    fn server(ctx: &TestContext) -> TestServer {
        TestServer::new(routes(ctx.files.clone(), 1024 * 1024)).unwrap()
    }

    fn form(files: &[(&str, &str, usize)]) -> MultipartForm {
        files
            .iter()
            .fold(MultipartForm::new(), |form, (name, mime, size)| {
                form.add_part(
                    "files",
                    Part::bytes(vec![1u8; *size])
                        .file_name(name.to_string())
                        .mime_type(mime.to_string()),
                )
            })
    }

    #[tokio::test]
    async fn test_upload_then_fetch() {
        let ctx = TestContext::new();
        let server = server(&ctx);

        let response = server
            .post("/api/files/upload")
            .multipart(form(&[("avatar.png", "image/png", 2048)]).add_text("path", "/img"))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        let file = &body["data"]["files"][0];
        assert_eq!(file["size"], 2048);
        assert_eq!(file["path"], "/img");
        assert!(file["url"].as_str().unwrap().starts_with("/uploads/img/avatar_"));

        let id = file["id"].as_str().unwrap();
        let fetched: Value = server.get(&format!("/api/files/{}", id)).await.json();
        assert_eq!(fetched["data"]["id"], id);

        let listing: Value = server.get("/api/files?path=/img").await.json();
        assert_eq!(listing["data"]["total"], 1);
        assert_eq!(listing["meta"]["has_more"], false);
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let ctx = TestContext::new();
        let server = server(&ctx);

        let response = server
            .post("/api/files/upload")
            .multipart(MultipartForm::new().add_text("path", "/"))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_reports_per_file_errors() {
        let ctx = TestContext::with_defaults(|d| d.max_file_size = 100);
        let server = server(&ctx);

        let response = server
            .post("/api/files/upload")
            .multipart(form(&[("big.bin", "application/octet-stream", 500)]))
            .await;
        response.assert_status_ok();

        let body: Value = response.json();
        assert_eq!(body["data"]["files"].as_array().unwrap().len(), 0);
        assert_eq!(body["data"]["errors"][0]["filename"], "big.bin");
    }

    #[tokio::test]
    async fn test_folder_lifecycle() {
        let ctx = TestContext::new();
        let server = server(&ctx);

        let created = server
            .post("/api/files/folders")
            .json(&json!({ "name": "docs", "path": "/" }))
            .await;
        created.assert_status(StatusCode::CREATED);
        let id = created.json::<Value>()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        server
            .post(&format!("/api/files/{}/move", id))
            .json(&json!({ "new_path": "/docs/inner" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let renamed: Value = server
            .patch(&format!("/api/files/{}", id))
            .json(&json!({ "name": "papers" }))
            .await
            .json();
        assert_eq!(renamed["data"]["name"], "papers");

        let deleted: Value = server.delete(&format!("/api/files/{}", id)).await.json();
        assert_eq!(deleted["data"]["deleted"], 1);

        server
            .delete(&format!("/api/files/{}", id))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_owner_header_scopes_mutations() {
        let ctx = TestContext::new();
        let server = server(&ctx);

        let created: Value = server
            .post("/api/files/folders")
            .add_header("x-owner-id", "alice")
            .json(&json!({ "name": "private" }))
            .await
            .json();
        assert_eq!(created["data"]["owner_id"], "alice");
        let id = created["data"]["id"].as_str().unwrap().to_string();

        server
            .delete(&format!("/api/files/{}", id))
            .add_header("x-owner-id", "mallory")
            .await
            .assert_status(StatusCode::FORBIDDEN);

        server
            .delete(&format!("/api/files/{}", id))
            .add_header("x-owner-id", "alice")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_search_requires_query_text() {
        let ctx = TestContext::new();
        let server = server(&ctx);

        server
            .get("/api/files/search?q=%20")
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        server
            .post("/api/files/folders")
            .json(&json!({ "name": "Invoices" }))
            .await
            .assert_status(StatusCode::CREATED);

        let found: Value = server.get("/api/files/search?q=invoice").await.json();
        assert_eq!(found["meta"]["total"], 1);
    }
}
