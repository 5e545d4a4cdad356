use crate::content::ContentEditView;
use crate::entity::category;
use crate::image_info::tests::encoded_image;
use crate::migration::DEFAULT_CATEGORY_ID;
use crate::{build_app, AppState};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::*;
use image::ImageFormat;
use mediadesk_shared::category::{Category, Extension, ExtensionBody};
use std::sync::{Arc, Once};
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

static INIT: Once = Once::new();

async fn setup_test_server() -> (TestServer, tempfile::TempDir) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                "mediadesk_backend=debug,tower_http=debug,debug",
            ))
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
    let scratch = tempfile::tempdir().expect("Failed to create temp dir");
    let appstate = AppState::test(scratch.path()).await;
    let shared_state = Arc::new(RwLock::new(appstate));
    let app = build_app(&shared_state);

    let config = TestServerConfig {
        expect_success_by_default: true,
        restrict_requests_with_http_schema: false,
        default_content_type: None,
        default_scheme: Some("http".into()),
        ..Default::default()
    };

    (TestServer::new_with_config(app, config).unwrap(), scratch)
}

async fn create_category(server: &TestServer, name: &str) -> category::Model {
    let res = server
        .post("/api/v1/category")
        .json(&serde_json::json!({ "name": name }))
        .await;
    res.assert_status_ok();
    res.json()
}

fn file_part(data: Vec<u8>, filename: &str, mime: &str) -> Part {
    Part::bytes(data).file_name(filename).mime_type(mime)
}

#[tokio::test]
async fn test_api_content_lifecycle() {
    let (server, _scratch) = setup_test_server().await;
    let animals = create_category(&server, "Animals").await;
    let plants = create_category(&server, "Plants").await;

    let form = MultipartForm::new()
        .add_text("name", "A cat")
        .add_text("alt_text", "A grey cat on a mat")
        .add_text("category", animals.id.to_string())
        .add_text("category", plants.id.to_string())
        .add_part(
            "file",
            file_part(
                encoded_image(400, 300, ImageFormat::Jpeg),
                "cat.jpg",
                "image/jpeg",
            ),
        );
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let created: ContentEditView = res.json();
    let id = created.content.id;
    info!("created content {}", id);

    assert!(!id.is_nil());
    assert!(created.warning.is_none());
    assert!(created.content.is_image);
    assert_eq!(created.content.width, Some(400));
    assert_eq!(created.content.height, Some(300));
    assert_eq!(created.content.name.as_deref(), Some("A cat"));
    assert_eq!(created.content_categories, vec![animals.id, plants.id]);

    let res = server.get(&format!("/api/v1/content/{}", id)).await;
    res.assert_status_ok();
    let loaded: ContentEditView = res.json();
    assert_eq!(loaded.content.filename, "cat.jpg");
    assert_eq!(loaded.content_categories, vec![animals.id, plants.id]);
    let selected: Vec<Uuid> = loaded
        .categories
        .iter()
        .filter(|c| c.selected)
        .map(|c| c.id)
        .collect();
    assert_eq!(selected, vec![animals.id, plants.id]);

    // update swaps the categories and the file
    let form = MultipartForm::new()
        .add_text("name", "")
        .add_text("category", plants.id.to_string())
        .add_part(
            "file",
            file_part(b"just some notes".to_vec(), "notes.txt", "text/plain"),
        );
    let res = server
        .put(&format!("/api/v1/content/{}", id))
        .multipart(form)
        .await;
    res.assert_status_ok();
    let updated: ContentEditView = res.json();
    assert_eq!(updated.content.id, id);
    assert!(!updated.content.is_image);
    assert_eq!(updated.content.width, None);
    assert_eq!(updated.content.name, None);
    assert_eq!(updated.content.alt_text.as_deref(), Some("A grey cat on a mat"));
    assert_eq!(updated.content_categories, vec![plants.id]);

    let res = server.get(&format!("/api/v1/content/{}/file", id)).await;
    res.assert_status_ok();
    assert_eq!(res.as_bytes().as_ref(), b"just some notes");
    let content_type = res.header(CONTENT_TYPE);
    assert!(content_type.to_str().unwrap().starts_with("text/plain"));
    let disposition = res.header(CONTENT_DISPOSITION);
    assert!(disposition.to_str().unwrap().contains("notes.txt"));

    let res = server.delete(&format!("/api/v1/content/{}", id)).await;
    res.assert_status_ok();
    let body: serde_json::Value = res.json();
    assert_eq!(body["deleted"], serde_json::json!(id));
    assert!(body.get("warning").is_none());

    let res = server
        .get(&format!("/api/v1/content/{}", id))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
    let res = server
        .get(&format!("/api/v1/content/{}/file", id))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
    let res = server
        .delete(&format!("/api/v1/content/{}", id))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn test_api_content_rejects_bad_forms() {
    let (server, _scratch) = setup_test_server().await;

    // nothing to store
    let form = MultipartForm::new().add_text("name", "empty");
    let res = server
        .post("/api/v1/content")
        .multipart(form)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);

    let form = MultipartForm::new()
        .add_text("category", "not-a-uuid")
        .add_part("file", file_part(b"x".to_vec(), "x.txt", "text/plain"));
    let res = server
        .post("/api/v1/content")
        .multipart(form)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);
    let body: serde_json::Value = res.json();
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));

    let form = MultipartForm::new().add_text("name", "ghost");
    let res = server
        .put(&format!("/api/v1/content/{}", Uuid::new_v4()))
        .multipart(form)
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn test_api_folder_without_file() {
    let (server, _scratch) = setup_test_server().await;

    let form = MultipartForm::new()
        .add_text("name", "Holiday photos")
        .add_text("is_folder", "on");
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let folder: ContentEditView = res.json();
    assert!(folder.content.is_folder);
    assert!(folder.content_categories.is_empty());

    let form = MultipartForm::new()
        .add_text("parent_id", folder.content.id.to_string())
        .add_part("file", file_part(b"day one".to_vec(), "day1.txt", "text/plain"));
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let child: ContentEditView = res.json();
    assert_eq!(child.content.parent_id, Some(folder.content.id));

    // the folder has no file to download
    let res = server
        .get(&format!("/api/v1/content/{}/file", folder.content.id))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 404);
}

#[tokio::test]
async fn test_api_thumbnail() {
    let (server, _scratch) = setup_test_server().await;

    let form = MultipartForm::new().add_part(
        "file",
        file_part(
            encoded_image(400, 300, ImageFormat::Png),
            "wide.png",
            "image/png",
        ),
    );
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let image: ContentEditView = res.json();

    for _ in 0..2 {
        let res = server
            .get(&format!("/api/v1/content/{}/thumbnail/100", image.content.id))
            .await;
        res.assert_status_ok();
        assert_eq!(res.header(CONTENT_TYPE).to_str().unwrap(), "image/jpeg");
        let thumb = image::load_from_memory(res.as_bytes().as_ref())
            .expect("Thumbnail should be an image");
        assert_eq!((thumb.width(), thumb.height()), (100, 75));
    }

    let form = MultipartForm::new()
        .add_part("file", file_part(b"plain".to_vec(), "plain.txt", "text/plain"));
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let text: ContentEditView = res.json();
    let res = server
        .get(&format!("/api/v1/content/{}/thumbnail/100", text.content.id))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);
}

#[tokio::test]
async fn test_api_categories() {
    let (server, _scratch) = setup_test_server().await;

    let res = server
        .post("/api/v1/category")
        .json(&serde_json::json!({
            "name": "Birds",
            "description": "Feathered",
            "extensions": [
                Extension {
                    name: "intro".to_string(),
                    body: ExtensionBody::RichText("<b>tweet</b>".to_string()),
                }
            ]
        }))
        .await;
    res.assert_status_ok();
    let birds: category::Model = res.json();
    assert_eq!(birds.permalink, "birds");

    let res = server
        .post("/api/v1/category")
        .json(&serde_json::json!({ "name": "   " }))
        .expect_failure()
        .await;
    assert_eq!(res.status_code(), 400);

    let res = server.get("/api/v1/categories").await;
    res.assert_status_ok();
    let categories: Vec<Category> = res.json();
    let ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![birds.id, DEFAULT_CATEGORY_ID]);
    assert_eq!(
        categories[0].extensions[0].body,
        ExtensionBody::RichText("<b>tweet</b>".to_string())
    );
}

#[tokio::test]
async fn test_api_openapi_json() {
    let (server, _scratch) = setup_test_server().await;
    let res = server.get("/api/v1/openapi.json").await;
    res.assert_status_ok();
    let doc: serde_json::Value = res.json();
    assert!(doc["paths"]["/api/v1/content/{id}"].is_object());
}

#[tokio::test]
async fn test_api_thumbnail_of_tall_image() {
    let (server, _scratch) = setup_test_server().await;

    let form = MultipartForm::new().add_part(
        "file",
        file_part(
            encoded_image(1, 20000, ImageFormat::Png),
            "strip.png",
            "image/png",
        ),
    );
    let res = server.post("/api/v1/content").multipart(form).await;
    res.assert_status_ok();
    let strip: ContentEditView = res.json();
    assert!(strip.content.is_image);
    assert_eq!(strip.content.height, Some(20000));

    let res = server
        .get(&format!("/api/v1/content/{}/thumbnail/2048", strip.content.id))
        .await;
    res.assert_status_ok();
    let thumb = image::load_from_memory(res.as_bytes().as_ref())
        .expect("Thumbnail should be an image");
    assert!(thumb.width() <= 2048);
    assert!(thumb.height() <= 2048);
}
