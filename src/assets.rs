use crate::state::AppState;
use crate::templates;

use askama::Template as _;
use axum::extract::State;
use axum::http::StatusCode;

pub(crate) async fn stylesheet() -> axum::response::Response {
    const CSS_CONTENT: &str = include_str!("../static/style.css");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "text/css")
        .header("cache-control", "public, max-age=3600")
        .body(CSS_CONTENT.into())
        .unwrap()
}

pub(crate) async fn notify_script() -> axum::response::Response {
    const NOTIFY_JS_CONTENT: &str = include_str!("../static/notify.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "public, max-age=3600")
        .body(NOTIFY_JS_CONTENT.into())
        .unwrap()
}

pub(crate) async fn storefront_script() -> axum::response::Response {
    const STOREFRONT_JS_CONTENT: &str = include_str!("../static/storefront.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "public, max-age=3600")
        .body(STOREFRONT_JS_CONTENT.into())
        .unwrap()
}

pub(crate) async fn admin_script() -> axum::response::Response {
    const ADMIN_JS_CONTENT: &str = include_str!("../static/admin.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "public, max-age=3600")
        .body(ADMIN_JS_CONTENT.into())
        .unwrap()
}

pub(crate) async fn service_worker() -> axum::response::Response {
    const SW_CONTENT: &str = include_str!("../static/sw.js");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/javascript")
        .header("cache-control", "no-cache")
        .body(SW_CONTENT.into())
        .unwrap()
}

pub(crate) async fn manifest(
    State(state): State<AppState>,
) -> Result<axum::response::Response, StatusCode> {
    let settings = state.settings.current();
    let rendered = templates::ManifestTemplate {
        company_name: &settings.company_name,
        app_icon: &settings.app_icon,
    }
    .render()
    .map_err(|err| {
        eprintln!("failed to render manifest: {err}");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(axum::response::Response::builder()
        .status(200)
        .header("content-type", "application/manifest+json")
        .header("cache-control", "public, max-age=3600")
        .body(rendered.into())
        .unwrap())
}

pub(crate) async fn icon_192() -> axum::response::Response {
    const ICON_192: &[u8] = include_bytes!("../static/icons/icon-192.png");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "image/png")
        .header("cache-control", "public, max-age=86400")
        .body(ICON_192.into())
        .unwrap()
}

pub(crate) async fn icon_512() -> axum::response::Response {
    const ICON_512: &[u8] = include_bytes!("../static/icons/icon-512.png");
    axum::response::Response::builder()
        .status(200)
        .header("content-type", "image/png")
        .header("cache-control", "public, max-age=86400")
        .body(ICON_512.into())
        .unwrap()
}
