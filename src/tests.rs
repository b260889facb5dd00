use std::sync::Arc;
use poem::Route;
use poem::http::StatusCode;
use poem_openapi::OpenApiService;
use poem::test::TestClient;
use poem::web::headers;

use crate::config::RuntimeConfig;
use crate::controller::PhotoFacade;
use crate::routes::PhotoApi;

const MEMORY_CONFIG: &str = include_str!("../tests/configs/memory.yaml");
const TEST_PHOTO: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-a-png";

async fn setup_environment(cfg: &str) -> anyhow::Result<TestClient<Route>> {
    let cfg = RuntimeConfig::from_yaml(cfg).await?;
    let storage = cfg.backend.connect().await?;
    let facade = Arc::new(PhotoFacade::new(Arc::new(cfg.photos), storage));

    let app = OpenApiService::new(
        PhotoApi::new(facade),
        "Photoshelf API",
        env!("CARGO_PKG_VERSION"),
    );

    let app = Route::new().nest("/v1", app);
    Ok(TestClient::new(app))
}

async fn upload(app: &TestClient<Route>, category: &str, body: &'static [u8]) -> poem::test::TestResponse {
    app.post(format!("/v1/{}", category))
        .body(body)
        .content_type("application/octet-stream".to_string())
        .typed_header(headers::ContentLength(body.len() as u64))
        .query("file_name".to_string(), &"photo.png".to_string())
        .query("content_type".to_string(), &"image/png".to_string())
        .send()
        .await
}

#[tokio::test]
async fn test_upload_list_and_delete() -> anyhow::Result<()> {
    let app = setup_environment(MEMORY_CONFIG).await?;

    let res = upload(&app, "Shoes", TEST_PHOTO).await;
    res.assert_status(StatusCode::OK);
    let body = res.json().await;

    let info = body.value().object();
    let url = info.get("url").string().to_string();
    info.get("container").assert_string("shoes");
    info.get("container_created").assert_bool(true);
    assert!(url.starts_with("http://127.0.0.1:8000/photos/shoes/ProductPhoto"));
    assert!(url.ends_with(".png"));

    let res = app.get("/v1/shoes").send().await;
    res.assert_status(StatusCode::OK);
    let listing = res.json().await;
    let urls = listing.value().object().get("urls").array();
    urls.assert_len(1);
    urls.get(0).assert_string(&url);

    let res = app.delete("/v1/SHOES")
        .query("url".to_string(), &url)
        .send()
        .await;
    res.assert_status(StatusCode::OK);
    let deleted = res.json().await;
    deleted.value().object().get("deleted").assert_bool(true);
    deleted.value().object().get("nothing_to_delete").assert_bool(false);
    deleted.value().object().get("container_removed").assert_bool(true);

    Ok(())
}

#[tokio::test]
async fn test_empty_upload_is_rejected() -> anyhow::Result<()> {
    let app = setup_environment(MEMORY_CONFIG).await?;

    let res = upload(&app, "shoes", b"").await;
    res.assert_status(StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn test_delete_without_url() -> anyhow::Result<()> {
    let app = setup_environment(MEMORY_CONFIG).await?;

    let res = app.delete("/v1/shoes").send().await;
    res.assert_status(StatusCode::OK);
    let deleted = res.json().await;
    deleted.value().object().get("deleted").assert_bool(true);
    deleted.value().object().get("nothing_to_delete").assert_bool(true);
    deleted.value().object().get("container_removed").assert_bool(false);

    Ok(())
}

#[tokio::test]
async fn test_delete_missing_photo() -> anyhow::Result<()> {
    let app = setup_environment(MEMORY_CONFIG).await?;

    let res = app.delete("/v1/shoes")
        .query("url".to_string(), &"http://127.0.0.1:8000/photos/shoes/ProductPhotonope.png".to_string())
        .send()
        .await;
    res.assert_status(StatusCode::NOT_FOUND);

    Ok(())
}
