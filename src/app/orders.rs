use crate::adapters::HttpWebhookSender;
use crate::orders as order_service;
use crate::orders::{OrderError, OrderRequest};
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct OrderResponse {
    pub(crate) status: &'static str,
    pub(crate) order_id: String,
}

#[derive(Serialize)]
pub(crate) struct OrderErrorResponse {
    pub(crate) error: String,
}

pub(crate) async fn submit(
    State(state): State<state::AppState>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), (StatusCode, Json<OrderErrorResponse>)> {
    let order = order_service::build_order(&state.products, request, OffsetDateTime::now_utc())
        .map_err(|err| match err {
            OrderError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                Json(OrderErrorResponse {
                    error: format!("Missing required field: {field}."),
                }),
            ),
            OrderError::UnknownProduct => (
                StatusCode::BAD_REQUEST,
                Json(OrderErrorResponse {
                    error: "Product not found or unavailable.".to_string(),
                }),
            ),
            OrderError::Store(err) => {
                eprintln!("failed to validate order: {err}");
                internal_error()
            }
        })?;

    if let Err(err) = state.orders.append(order.clone()) {
        eprintln!("failed to save order {}: {err}", order.id);
        return Err(internal_error());
    }

    // The order is already accepted; the webhook forward is best-effort.
    let settings = state.settings.current();
    if let Some(url) = settings.webhook_url.as_deref() {
        let message = order_service::order_message(&order, &settings);
        order_service::forward_order(HttpWebhookSender::new(), url, &message).await;
    }

    println!("order {} received for {}", order.id, order.product_name);

    Ok((
        StatusCode::CREATED,
        Json(OrderResponse {
            status: "received",
            order_id: order.id,
        }),
    ))
}

fn internal_error() -> (StatusCode, Json<OrderErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(OrderErrorResponse {
            error: "Internal error.".to_string(),
        }),
    )
}
