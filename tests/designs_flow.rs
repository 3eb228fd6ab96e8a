mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{body_to_vec, MultipartForm, TestApp};
use serde::{Deserialize, Serialize};
use tilefolio::models::{Catalog, DesignPatch};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDoc {
    brand_logo: Option<String>,
    size_icon: Option<String>,
    designs: Vec<DesignRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DesignRecord {
    id: String,
    #[serde(default)]
    position: Option<i64>,
}

#[derive(Deserialize)]
struct OrderResult {
    designs: Vec<DesignRecord>,
}

#[derive(Deserialize)]
struct DeleteResult {
    designs: Vec<DesignRecord>,
    removed: bool,
}

#[derive(Serialize)]
struct ReorderPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    theme: Option<&'a str>,
    order: &'a [&'a str],
}

async fn seed(app: &TestApp, records: &[(&str, Option<i64>, i64)]) -> Result<()> {
    let mut catalog = Catalog::default();
    for (id, position, created_at) in records {
        catalog.upsert(DesignPatch::new(*id, "default", *id), *created_at);
        if let Some(record) = catalog.designs.last_mut() {
            record.position = *position;
        }
    }
    app.state.catalog.save(&catalog).await?;
    Ok(())
}

async fn list_ids(app: &TestApp) -> Result<Vec<String>> {
    let response = app.get("/api/designs").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let catalog: CatalogDoc = serde_json::from_slice(&body)?;
    Ok(catalog.designs.into_iter().map(|d| d.id).collect())
}

#[tokio::test]
async fn branding_defaults_appear_on_an_empty_catalogue() -> Result<()> {
    let app = TestApp::new()?;

    let response = app.get("/api/designs").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let catalog: CatalogDoc = serde_json::from_slice(&body)?;

    assert_eq!(catalog.brand_logo.as_deref(), Some("assets/branding/brand-logo.png"));
    assert_eq!(catalog.size_icon.as_deref(), Some("assets/branding/size-icon.png"));
    assert!(catalog.designs.is_empty());

    // Reads never persist anything.
    assert!(!app.state.config.catalog_path().exists());
    Ok(())
}

#[tokio::test]
async fn listing_sorts_by_position_with_created_at_tiebreak() -> Result<()> {
    let app = TestApp::new()?;
    seed(
        &app,
        &[
            ("LATE", None, 30),
            ("PINNED", Some(1), 50),
            ("EARLY", None, 10),
        ],
    )
    .await?;

    assert_eq!(list_ids(&app).await?, ["PINNED", "EARLY", "LATE"]);
    Ok(())
}

#[tokio::test]
async fn reorders_the_whole_catalogue() -> Result<()> {
    let app = TestApp::new()?;
    seed(&app, &[("A", Some(1), 1), ("B", Some(2), 2), ("C", Some(3), 3)]).await?;

    let response = app
        .put_json(
            "/api/designs/order",
            &ReorderPayload {
                theme: None,
                order: &["C", "A", "B"],
            },
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let result: OrderResult = serde_json::from_slice(&body)?;

    let ids: Vec<&str> = result.designs.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["C", "A", "B"]);
    assert_eq!(result.designs[0].position, Some(1));
    assert_eq!(result.designs[2].position, Some(3));

    // The new order is persisted.
    assert_eq!(list_ids(&app).await?, ["C", "A", "B"]);
    Ok(())
}

#[tokio::test]
async fn rejects_malformed_full_permutations() -> Result<()> {
    let app = TestApp::new()?;
    seed(&app, &[("A", Some(1), 1), ("B", Some(2), 2)]).await?;

    for order in [
        vec!["A"],           // wrong count
        vec!["A", "A"],      // duplicate
        vec!["A", "GHOST"],  // unknown id
    ] {
        let response = app
            .put_json(
                "/api/designs/order",
                &ReorderPayload {
                    theme: None,
                    order: &order,
                },
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "order {order:?}");
    }

    assert_eq!(list_ids(&app).await?, ["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn theme_scope_reorders_a_subsequence_in_place() -> Result<()> {
    let app = TestApp::new()?;
    seed(
        &app,
        &[
            ("A", Some(1), 1),
            ("B", Some(2), 2),
            ("C", Some(3), 3),
            ("D", Some(4), 4),
        ],
    )
    .await?;

    let response = app
        .put_json(
            "/api/designs/order",
            &ReorderPayload {
                theme: Some("tiles"),
                order: &["D", "B"],
            },
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(list_ids(&app).await?, ["A", "D", "C", "B"]);
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_record_and_its_files() -> Result<()> {
    let app = TestApp::new()?;

    let form = MultipartForm::new()
        .text("id", "TILE1")
        .file("main", "front.png", b"m")
        .file("variants[]", "alt.webp", b"a")
        .file("video", "spin.mp4", b"v")
        .file("preview", "thumb.jpg", b"p");
    let response = app.post_multipart("/api/upload", form).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let tiles_dir = app.public_path("assets/tiles/TILE1");
    let video = app.public_path("assets/videos/TILE1.mp4");
    let preview = app.public_path("assets/previews/TILE1.jpg");
    assert!(tiles_dir.exists() && video.exists() && preview.exists());

    let response = app.delete("/api/designs/TILE1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let result: DeleteResult = serde_json::from_slice(&body)?;
    assert!(result.removed);
    assert!(result.designs.is_empty());

    assert!(!tiles_dir.exists());
    assert!(!video.exists());
    assert!(!preview.exists());

    // A second delete is a no-op.
    let response = app.delete("/api/designs/TILE1").await?;
    let body = body_to_vec(response.into_body()).await?;
    let result: DeleteResult = serde_json::from_slice(&body)?;
    assert!(!result.removed);
    Ok(())
}

#[tokio::test]
async fn delete_normalizes_the_path_id() -> Result<()> {
    let app = TestApp::new()?;
    seed(&app, &[("TILE1", None, 1)]).await?;

    let response = app.delete("/api/designs/tile1").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let result: DeleteResult = serde_json::from_slice(&body)?;
    assert!(result.removed);
    assert!(result.designs.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_of_an_unknown_id_reports_removed_false() -> Result<()> {
    let app = TestApp::new()?;
    seed(&app, &[("KEEP", None, 1)]).await?;

    let response = app.delete("/api/designs/GHOST").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    let result: DeleteResult = serde_json::from_slice(&body)?;
    assert!(!result.removed);
    assert_eq!(result.designs.len(), 1);
    assert_eq!(result.designs[0].id, "KEEP");
    Ok(())
}

#[tokio::test]
async fn uploaded_assets_are_served_under_the_assets_mount() -> Result<()> {
    let app = TestApp::new()?;

    let form = MultipartForm::new()
        .text("id", "TILE5")
        .file("main", "front.png", b"served bytes");
    let response = app.post_multipart("/api/upload", form).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/assets/tiles/TILE5/TILE5_R1.png").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    assert_eq!(body, b"served bytes");
    Ok(())
}

#[tokio::test]
async fn health_endpoint_responds_ok() -> Result<()> {
    let app = TestApp::new()?;
    let response = app.get("/api/health").await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_vec(response.into_body()).await?;
    assert_eq!(body, br#"{"status":"ok"}"#);
    Ok(())
}
