use crate::adapters::WebPushSender;
use crate::push as push_service;
use crate::push::vapid::{VapidConfig, VapidStatus};
use crate::push::{AudienceFilter, DispatchError, DispatchSummary};
use crate::state;
use crate::subscriptions::{Audience, SubscriptionKeys, SubscriptionRecord};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

fn push_unavailable() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Push notifications are not configured.",
        }),
    )
}

fn ready_vapid(state: &state::AppState) -> Result<VapidConfig, (StatusCode, Json<ErrorResponse>)> {
    match VapidConfig::load(&state.config) {
        VapidStatus::Ready(vapid) => Ok(vapid),
        VapidStatus::Incomplete => {
            eprintln!("push notifications disabled: incomplete VAPID configuration");
            Err(push_unavailable())
        }
        VapidStatus::Missing => Err(push_unavailable()),
    }
}

pub(crate) async fn public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = ready_vapid(&state)?;
    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) subscription: SubscriptionPayload,
    pub(crate) audience: Option<Audience>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionPayload {
    pub(crate) endpoint: String,
    pub(crate) keys: Option<SubscriptionKeys>,
}

pub(crate) async fn subscribe(
    State(state): State<state::AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let endpoint = request.subscription.endpoint.trim().to_string();
    let keys = request.subscription.keys.unwrap_or(SubscriptionKeys {
        p256dh: String::new(),
        auth: String::new(),
    });
    if endpoint.is_empty() || keys.p256dh.trim().is_empty() || keys.auth.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint, p256dh, and auth are required.",
            }),
        ));
    }

    let record = SubscriptionRecord {
        endpoint,
        keys,
        audience: request.audience.unwrap_or(Audience::Customer),
        subscribed_at: OffsetDateTime::now_utc(),
    };

    if let Err(err) = state.subscriptions.upsert(record) {
        eprintln!("failed to save push subscription: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to save subscription.",
            }),
        ));
    }

    Ok(Json(StatusResponse {
        status: "subscribed",
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    pub(crate) subscription: UnsubscribeSubscription,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeSubscription {
    pub(crate) endpoint: String,
}

pub(crate) async fn unsubscribe(
    State(state): State<state::AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let endpoint = request.subscription.endpoint.trim();
    if endpoint.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "endpoint is required.",
            }),
        ));
    }

    // Removing an endpoint that was never stored still succeeds; the device
    // is unsubscribed either way.
    if let Err(err) = state.subscriptions.remove(endpoint) {
        eprintln!("failed to remove push subscription: {err}");
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to remove subscription.",
            }),
        ));
    }

    Ok(Json(StatusResponse {
        status: "unsubscribed",
    }))
}

#[derive(Serialize)]
pub(crate) struct SendResponse {
    pub(crate) status: &'static str,
    pub(crate) total: usize,
    pub(crate) successful: usize,
    pub(crate) failed: usize,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SendRequest {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) audience: Option<AudienceFilter>,
    pub(crate) action_url: Option<String>,
    pub(crate) icon: Option<String>,
    pub(crate) badge: Option<String>,
}

pub(crate) async fn send_broadcast(
    State(state): State<state::AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = ready_vapid(&state)?;

    let payload = push_service::broadcast(
        push_service::BroadcastContent {
            title: request.title,
            body: request.body,
            action_url: request.action_url,
            icon: request.icon,
            badge: request.badge,
        },
        OffsetDateTime::now_utc(),
    )
    .map_err(|err| {
        let error = match err {
            push_service::ComposeError::EmptyTitle => "Title is required.",
            push_service::ComposeError::EmptyBody => "Message is required.",
        };
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
    })?;

    let filter = request.audience.unwrap_or(AudienceFilter::All);
    let summary = dispatch(&state, vapid, &payload, filter).await?;

    println!(
        "broadcast \"{}\" sent ({}/{} delivered)",
        payload.title, summary.successful, summary.total
    );

    Ok(Json(send_response(summary)))
}

pub(crate) async fn send_test(
    State(state): State<state::AppState>,
) -> Result<Json<SendResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = ready_vapid(&state)?;
    let company_name = state.settings.current().company_name;
    let payload = push_service::system_test(&company_name, OffsetDateTime::now_utc());
    let summary = dispatch(&state, vapid, &payload, AudienceFilter::All).await?;

    Ok(Json(send_response(summary)))
}

async fn dispatch(
    state: &state::AppState,
    vapid: VapidConfig,
    payload: &push_service::NotificationPayload,
    filter: AudienceFilter,
) -> Result<DispatchSummary, (StatusCode, Json<ErrorResponse>)> {
    let sender = WebPushSender::new(vapid).map_err(|err| {
        eprintln!("failed to init web-push: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Failed to initialize push sender.",
            }),
        )
    })?;

    push_service::Dispatcher::new(sender)
        .dispatch(&state.subscriptions, payload, filter)
        .await
        .map_err(|err| match err {
            DispatchError::NoSubscribers => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: "No subscriptions match the target audience.",
                }),
            ),
            DispatchError::Payload(err) => {
                eprintln!("failed to serialize push payload: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to send notification.",
                    }),
                )
            }
            DispatchError::Store(err) => {
                eprintln!("failed to read push subscriptions: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "Failed to read subscriptions.",
                    }),
                )
            }
        })
}

fn send_response(summary: DispatchSummary) -> SendResponse {
    SendResponse {
        status: "sent",
        total: summary.total,
        successful: summary.successful,
        failed: summary.failed,
    }
}
