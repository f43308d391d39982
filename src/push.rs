//! Notification composition and fan-out delivery.
//!
//! A composed payload is serialized once and delivered to every matching
//! subscription through the configured [`PushSender`]. Deliveries run
//! concurrently under a fixed cap with a per-delivery timeout so one slow
//! push service cannot stall the rest of the fan-out. Failures are logged and
//! counted, never retried; endpoints the push service reports as permanently
//! gone are removed from the store once the fan-out completes.

use crate::ports::push::{PushError, PushSender};
use crate::storage::StoreError;
use crate::subscriptions::{Audience, SubscriptionRecord, SubscriptionStore};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use std::sync::Arc;
use std::time::Duration;

pub mod vapid;

pub const DEFAULT_ICON: &str = "/static/icons/icon-192.png";
const DEFAULT_ACTION_URL: &str = "/";
const FANOUT_CONCURRENCY: usize = 8;
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub url: String,
    pub sent_at: String,
}

#[derive(Debug)]
pub enum ComposeError {
    EmptyTitle,
    EmptyBody,
}

impl std::fmt::Display for ComposeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComposeError::EmptyTitle => f.write_str("notification title is required"),
            ComposeError::EmptyBody => f.write_str("notification body is required"),
        }
    }
}

/// Admin-supplied fields for a broadcast notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastContent {
    pub title: String,
    pub body: String,
    pub action_url: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction {
            action: "view".to_string(),
            title: "View".to_string(),
        },
        NotificationAction {
            action: "dismiss".to_string(),
            title: "Dismiss".to_string(),
        },
    ]
}

fn rfc3339(now: OffsetDateTime) -> String {
    now.format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Fixed payload announcing a successful test delivery. The constant tag
/// means repeated tests collapse into a single platform notification.
pub fn system_test(company_name: &str, now: OffsetDateTime) -> NotificationPayload {
    NotificationPayload {
        title: format!("{company_name} test notification"),
        body: "Push notifications are working. This is only a test.".to_string(),
        icon: DEFAULT_ICON.to_string(),
        badge: DEFAULT_ICON.to_string(),
        tag: "test-notification".to_string(),
        require_interaction: true,
        actions: default_actions(),
        data: NotificationData {
            url: DEFAULT_ACTION_URL.to_string(),
            sent_at: rfc3339(now),
        },
    }
}

/// Builds an admin broadcast. The tag carries the send time in unix millis so
/// repeated broadcasts surface as separate notifications on the device.
pub fn broadcast(
    content: BroadcastContent,
    now: OffsetDateTime,
) -> Result<NotificationPayload, ComposeError> {
    let title = content.title.trim();
    if title.is_empty() {
        return Err(ComposeError::EmptyTitle);
    }
    let body = content.body.trim();
    if body.is_empty() {
        return Err(ComposeError::EmptyBody);
    }

    let millis = now.unix_timestamp_nanos() / 1_000_000;
    let action_url = content
        .action_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ACTION_URL.to_string());

    Ok(NotificationPayload {
        title: title.to_string(),
        body: body.to_string(),
        icon: content.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        badge: content.badge.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        tag: format!("broadcast-{millis}"),
        require_interaction: true,
        actions: default_actions(),
        data: NotificationData {
            url: action_url,
            sent_at: rfc3339(now),
        },
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceFilter {
    All,
    Customers,
    Admins,
}

impl AudienceFilter {
    pub fn matches(self, audience: Audience) -> bool {
        match self {
            AudienceFilter::All => true,
            AudienceFilter::Customers => audience == Audience::Customer,
            AudienceFilter::Admins => audience == Audience::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum DispatchError {
    NoSubscribers,
    Payload(serde_json::Error),
    Store(StoreError),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::NoSubscribers => {
                f.write_str("no subscriptions match the target audience")
            }
            DispatchError::Payload(err) => write!(f, "failed to serialize payload: {err}"),
            DispatchError::Store(err) => write!(f, "subscription store error: {err}"),
        }
    }
}

enum DeliveryOutcome {
    Delivered,
    Failed,
    Gone,
}

#[derive(Debug, Clone)]
pub struct Dispatcher<S> {
    sender: S,
    concurrency: usize,
    delivery_timeout: Duration,
}

impl<S: PushSender> Dispatcher<S> {
    pub fn new(sender: S) -> Self {
        Self {
            sender,
            concurrency: FANOUT_CONCURRENCY,
            delivery_timeout: DELIVERY_TIMEOUT,
        }
    }

    /// Delivers the payload to every stored subscription matching the filter
    /// and reports aggregate counts. Fails before any delivery attempt when
    /// the filter matches nothing.
    pub async fn dispatch(
        &self,
        store: &SubscriptionStore,
        payload: &NotificationPayload,
        filter: AudienceFilter,
    ) -> Result<DispatchSummary, DispatchError> {
        let targets: Vec<SubscriptionRecord> = store
            .list_all()
            .map_err(DispatchError::Store)?
            .into_iter()
            .filter(|record| filter.matches(record.audience))
            .collect();

        if targets.is_empty() {
            return Err(DispatchError::NoSubscribers);
        }

        let message: Arc<str> = serde_json::to_string(payload)
            .map_err(DispatchError::Payload)?
            .into();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut deliveries = JoinSet::new();

        for record in targets {
            let sender = self.sender.clone();
            let message = Arc::clone(&message);
            let permits = Arc::clone(&permits);
            let timeout = self.delivery_timeout;
            deliveries.spawn(async move {
                let _permit = permits.acquire().await.expect("fan-out semaphore");
                let outcome = match tokio::time::timeout(timeout, sender.send(&record, &message))
                    .await
                {
                    Ok(Ok(())) => DeliveryOutcome::Delivered,
                    Ok(Err(err)) if err.is_gone() => {
                        eprintln!("push delivery error: endpoint gone: {} ({err})", record.endpoint);
                        DeliveryOutcome::Gone
                    }
                    Ok(Err(err)) => {
                        eprintln!("push delivery error: {} ({err})", record.endpoint);
                        DeliveryOutcome::Failed
                    }
                    Err(_) => {
                        eprintln!("push delivery timed out: {}", record.endpoint);
                        DeliveryOutcome::Failed
                    }
                };
                (record.endpoint, outcome)
            });
        }

        let mut summary = DispatchSummary::default();
        let mut gone = Vec::new();
        while let Some(joined) = deliveries.join_next().await {
            summary.total += 1;
            match joined {
                Ok((_, DeliveryOutcome::Delivered)) => summary.successful += 1,
                Ok((_, DeliveryOutcome::Failed)) => summary.failed += 1,
                Ok((endpoint, DeliveryOutcome::Gone)) => {
                    summary.failed += 1;
                    gone.push(endpoint);
                }
                Err(err) => {
                    eprintln!("push delivery task failed: {err}");
                    summary.failed += 1;
                }
            }
        }

        if !gone.is_empty() {
            match store.remove_many(&gone) {
                Ok(removed) => eprintln!("removed {removed} dead push subscriptions"),
                Err(err) => eprintln!("failed to remove dead push subscriptions: {err}"),
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::subscriptions::SubscriptionKeys;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::sync::Mutex;
    use time::format_description::well_known::Rfc3339;

    fn test_now() -> OffsetDateTime {
        OffsetDateTime::parse("2025-06-01T08:00:00Z", &Rfc3339).expect("parse now")
    }

    fn record(endpoint: &str, audience: Audience) -> SubscriptionRecord {
        SubscriptionRecord {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
            audience,
            subscribed_at: test_now(),
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Behavior {
        Deliver,
        Fail,
        Gone,
    }

    #[derive(Debug)]
    struct FakeSendError {
        gone: bool,
    }

    impl std::fmt::Display for FakeSendError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            if self.gone {
                f.write_str("fake endpoint gone")
            } else {
                f.write_str("fake send error")
            }
        }
    }

    impl PushError for FakeSendError {
        fn is_gone(&self) -> bool {
            self.gone
        }
    }

    #[derive(Clone, Default)]
    struct FakeSender {
        behaviors: Arc<Mutex<HashMap<String, Behavior>>>,
        sent: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl FakeSender {
        fn behave(self, endpoint: &str, behavior: Behavior) -> Self {
            self.behaviors
                .lock()
                .expect("behaviors lock")
                .insert(endpoint.to_string(), behavior);
            self
        }

        fn attempts(&self) -> Vec<(String, String)> {
            self.sent.lock().expect("sent lock").clone()
        }
    }

    impl PushSender for FakeSender {
        type Error = FakeSendError;
        type Fut<'a>
            = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
        where
            Self: 'a;

        fn send<'a>(
            &'a self,
            subscription: &'a SubscriptionRecord,
            message: &'a str,
        ) -> Self::Fut<'a> {
            let endpoint = subscription.endpoint.clone();
            let message = message.to_string();
            Box::pin(async move {
                self.sent
                    .lock()
                    .expect("sent lock")
                    .push((endpoint.clone(), message));
                let behavior = self
                    .behaviors
                    .lock()
                    .expect("behaviors lock")
                    .get(&endpoint)
                    .copied()
                    .unwrap_or(Behavior::Deliver);
                match behavior {
                    Behavior::Deliver => Ok(()),
                    Behavior::Fail => Err(FakeSendError { gone: false }),
                    Behavior::Gone => Err(FakeSendError { gone: true }),
                }
            })
        }
    }

    #[test]
    fn broadcast__should_reject_empty_title() {
        // When
        let result = broadcast(
            BroadcastContent {
                title: "  ".to_string(),
                body: "Fresh sourdough today".to_string(),
                ..Default::default()
            },
            test_now(),
        );

        // Then
        assert!(matches!(result, Err(ComposeError::EmptyTitle)));
    }

    #[test]
    fn broadcast__should_reject_empty_body() {
        // When
        let result = broadcast(
            BroadcastContent {
                title: "New batch".to_string(),
                body: String::new(),
                ..Default::default()
            },
            test_now(),
        );

        // Then
        assert!(matches!(result, Err(ComposeError::EmptyBody)));
    }

    #[test]
    fn broadcast__should_apply_defaults() {
        // When
        let payload = broadcast(
            BroadcastContent {
                title: "New batch".to_string(),
                body: "Fresh sourdough today".to_string(),
                ..Default::default()
            },
            test_now(),
        )
        .expect("compose broadcast");

        // Then
        assert_eq!(payload.icon, DEFAULT_ICON);
        assert_eq!(payload.badge, DEFAULT_ICON);
        assert_eq!(payload.data.url, "/");
        assert!(payload.tag.starts_with("broadcast-"));
        assert_ne!(payload.tag, "broadcast-");
    }

    #[test]
    fn broadcast__should_tag_by_send_time() {
        // Given
        let first = test_now();
        let second = first + time::Duration::seconds(1);

        // When
        let content = BroadcastContent {
            title: "New batch".to_string(),
            body: "Fresh sourdough today".to_string(),
            ..Default::default()
        };
        let a = broadcast(content.clone(), first).expect("compose first");
        let b = broadcast(content, second).expect("compose second");

        // Then
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn system_test__should_use_fixed_tag() {
        // When
        let payload = system_test("Bakeshop", test_now());

        // Then
        assert_eq!(payload.tag, "test-notification");
        assert!(payload.title.contains("Bakeshop"));
        assert_eq!(payload.actions.len(), 2);
    }

    #[test]
    fn payload__should_serialize_with_platform_field_names() {
        // When
        let raw = serde_json::to_string(&system_test("Bakeshop", test_now())).expect("serialize");

        // Then
        assert!(raw.contains("\"requireInteraction\":true"));
        assert!(raw.contains("\"url\":\"/\""));
    }

    #[tokio::test]
    async fn dispatch__should_deliver_only_to_matching_audience() {
        // Given
        let root = create_temp_root("dispatch-filter");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/admin", Audience::Admin))
            .expect("upsert admin");
        store
            .upsert(record("https://push.example/customer", Audience::Customer))
            .expect("upsert customer");
        let sender = FakeSender::default();
        let payload = system_test("Bakeshop", test_now());

        // When
        let summary = Dispatcher::new(sender.clone())
            .dispatch(&store, &payload, AudienceFilter::Customers)
            .await
            .expect("dispatch");

        // Then
        assert_eq!(summary.total, 1);
        assert_eq!(summary.successful, 1);
        let attempts = sender.attempts();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].0, "https://push.example/customer");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn dispatch__should_fail_without_any_attempt_when_no_subscribers_match() {
        // Given
        let root = create_temp_root("dispatch-empty");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/admin", Audience::Admin))
            .expect("upsert admin");
        let sender = FakeSender::default();
        let payload = system_test("Bakeshop", test_now());

        // When
        let result = Dispatcher::new(sender.clone())
            .dispatch(&store, &payload, AudienceFilter::Customers)
            .await;

        // Then
        assert!(matches!(result, Err(DispatchError::NoSubscribers)));
        assert!(sender.attempts().is_empty());

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn dispatch__should_count_partial_failures() {
        // Given
        let root = create_temp_root("dispatch-partial");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/a", Audience::Admin))
            .expect("upsert a");
        store
            .upsert(record("https://push.example/b", Audience::Customer))
            .expect("upsert b");
        let sender = FakeSender::default().behave("https://push.example/b", Behavior::Fail);
        let payload = system_test("Bakeshop", test_now());

        // When
        let summary = Dispatcher::new(sender)
            .dispatch(&store, &payload, AudienceFilter::All)
            .await
            .expect("dispatch");

        // Then
        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        // A transient failure keeps the subscription around.
        assert_eq!(store.list_all().expect("list").len(), 2);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn dispatch__should_reap_endpoints_reported_gone() {
        // Given
        let root = create_temp_root("dispatch-gone");
        let store = SubscriptionStore::open(&root);
        store
            .upsert(record("https://push.example/live", Audience::Customer))
            .expect("upsert live");
        store
            .upsert(record("https://push.example/dead", Audience::Customer))
            .expect("upsert dead");
        let sender = FakeSender::default().behave("https://push.example/dead", Behavior::Gone);
        let payload = system_test("Bakeshop", test_now());

        // When
        let summary = Dispatcher::new(sender)
            .dispatch(&store, &payload, AudienceFilter::All)
            .await
            .expect("dispatch");

        // Then
        assert_eq!(summary.total, 2);
        assert_eq!(summary.successful, 1);
        assert_eq!(summary.failed, 1);
        let remaining = store.list_all().expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, "https://push.example/live");

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    fn create_temp_root(test_name: &str) -> PathBuf {
        let mut root = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        root.push(format!("bakeshop-{}-{}", test_name, nanos));
        std::fs::create_dir_all(&root).expect("create temp dir");
        root
    }
}
