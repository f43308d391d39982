use crate::assets;
use crate::auth as auth_service;
use crate::catalog::ProductStore;
use crate::config;
use crate::orders::OrderStore;
use crate::settings::SettingsStore;
use crate::state;
use crate::subscriptions::SubscriptionStore;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};

use std::sync::Arc;

mod admin;
mod auth;
mod orders;
mod push;
mod storefront;
mod uploads;

pub fn app(config: config::AppConfig) -> Router {
    let auth = auth_service::AdminAuth::from_config(&config)
        .unwrap_or_else(|err| panic!("invalid auth configuration: {err}"));
    let settings = match SettingsStore::open(&config.data_dir) {
        Ok(settings) => settings,
        Err(err) => {
            panic!("failed to load settings: {err}");
        }
    };
    let state = state::AppState {
        auth,
        settings: Arc::new(settings),
        subscriptions: Arc::new(SubscriptionStore::open(&config.data_dir)),
        products: Arc::new(ProductStore::open(&config.data_dir)),
        orders: Arc::new(OrderStore::open(&config.data_dir)),
        config,
    };

    Router::new()
        .route("/", get(storefront::home))
        .route("/product/{id}", get(storefront::product_page))
        .route("/login", get(auth::login_form).post(auth::login_submit))
        .route("/logout", post(auth::logout))
        .route("/admin", get(admin::dashboard))
        .route("/api/orders", post(orders::submit))
        .route("/api/push/public-key", get(push::public_key))
        .route("/api/push/subscribe", post(push::subscribe))
        .route("/api/push/unsubscribe", post(push::unsubscribe))
        .route("/api/admin/push/send", post(push::send_broadcast))
        .route("/api/admin/push/test", post(push::send_test))
        .route(
            "/api/admin/settings",
            get(admin::settings_get).post(admin::settings_update),
        )
        .route(
            "/api/admin/settings/test-webhook",
            post(admin::test_webhook),
        )
        .route("/api/admin/settings/reload", post(admin::settings_reload))
        .route("/api/admin/orders", get(admin::orders_list))
        .route(
            "/api/admin/products",
            get(admin::products_list).post(admin::product_upsert),
        )
        .route("/api/admin/products/{id}", delete(admin::product_delete))
        .route("/api/admin/upload", post(uploads::upload_image))
        .route("/uploads/{*path}", get(uploads::serve_upload))
        .route("/static/style.css", get(assets::stylesheet))
        .route("/static/notify.js", get(assets::notify_script))
        .route("/static/storefront.js", get(assets::storefront_script))
        .route("/static/admin.js", get(assets::admin_script))
        .route("/static/manifest.json", get(assets::manifest))
        .route("/static/icons/icon-192.png", get(assets::icon_192))
        .route("/static/icons/icon-512.png", get(assets::icon_512))
        .route("/sw.js", get(assets::service_worker))
        .route("/health", get(health))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(state, auth::admin_guard))
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
