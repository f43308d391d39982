use crate::adapters::HttpWebhookSender;
use crate::catalog::{Product, ProductError};
use crate::ports::WebhookSender as _;
use crate::ports::webhook::WebhookMessage;
use crate::settings::{PublicSettings, SettingsError, SettingsPatch};
use crate::state;
use crate::templates;

use axum::Json;
use axum::extract::{Path as AxumPath, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn dashboard(State(state): State<state::AppState>) -> templates::AdminTemplate {
    templates::AdminTemplate {
        company_name: state.settings.current().company_name,
    }
}

pub(crate) async fn settings_get(State(state): State<state::AppState>) -> Json<PublicSettings> {
    Json(PublicSettings::from(state.settings.current()))
}

pub(crate) async fn settings_update(
    State(state): State<state::AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<PublicSettings>, (StatusCode, Json<ErrorResponse>)> {
    let updated = state.settings.apply(patch).map_err(|err| match err {
        SettingsError::InvalidEmail => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid admin email.",
            }),
        ),
        SettingsError::InvalidWebhookUrl => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Webhook URL must start with http:// or https://.",
            }),
        ),
        SettingsError::PasswordHash | SettingsError::Store(_) => {
            eprintln!("failed to update settings: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to save settings.",
                }),
            )
        }
    })?;

    Ok(Json(PublicSettings::from(updated)))
}

/// Re-reads the settings document from disk, for deployments that edit the
/// file out-of-band.
pub(crate) async fn settings_reload(
    State(state): State<state::AppState>,
) -> Result<Json<PublicSettings>, (StatusCode, Json<ErrorResponse>)> {
    state.settings.reload().map_err(|err| {
        eprintln!("failed to reload settings: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to reload settings.",
            }),
        )
    })?;
    Ok(Json(PublicSettings::from(state.settings.current())))
}

pub(crate) async fn orders_list(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<crate::orders::Order>>, (StatusCode, Json<ErrorResponse>)> {
    let orders = state.orders.list_all().map_err(|err| {
        eprintln!("failed to list orders: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to list orders.",
            }),
        )
    })?;
    Ok(Json(orders))
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestWebhookRequest {
    pub(crate) webhook_url: Option<String>,
}

pub(crate) async fn test_webhook(
    State(state): State<state::AppState>,
    Json(request): Json<TestWebhookRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let settings = state.settings.current();
    let url = request
        .webhook_url
        .filter(|url| !url.trim().is_empty())
        .or(settings.webhook_url)
        .ok_or((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "No webhook URL configured.",
            }),
        ))?;

    let message = WebhookMessage::text(format!(
        "Webhook test - {}\n\nIf you can read this, the webhook is working.",
        settings.company_name
    ));

    if let Err(err) = HttpWebhookSender::new().deliver(&url, &message).await {
        eprintln!("webhook test failed: {err}");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: "Webhook test delivery failed.",
            }),
        ));
    }

    Ok(Json(StatusResponse { status: "sent" }))
}

pub(crate) async fn products_list(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<Product>>, (StatusCode, Json<ErrorResponse>)> {
    let products = state.products.list_all().map_err(|err| {
        eprintln!("failed to list products: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to list products.",
            }),
        )
    })?;
    Ok(Json(products))
}

pub(crate) async fn product_upsert(
    State(state): State<state::AppState>,
    Json(product): Json<Product>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    state.products.upsert(product).map_err(|err| match err {
        ProductError::InvalidId => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Product id must use lowercase letters, digits, and dashes.",
            }),
        ),
        ProductError::MissingName => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Product name is required.",
            }),
        ),
        ProductError::Store(err) => {
            eprintln!("failed to save product: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to save product.",
                }),
            )
        }
    })?;

    Ok(Json(StatusResponse { status: "saved" }))
}

pub(crate) async fn product_delete(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let removed = state.products.remove(&id).map_err(|err| {
        eprintln!("failed to delete product {id}: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to delete product.",
            }),
        )
    })?;

    if !removed {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Product not found.",
            }),
        ));
    }

    Ok(Json(StatusResponse { status: "deleted" }))
}
