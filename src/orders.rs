//! Order intake: validation, a file-backed order log, and the webhook
//! message forwarded to the store owner. The forward is best-effort; a
//! webhook failure is logged and never fails the order itself.

use crate::catalog::ProductStore;
use crate::ports::webhook::{WebhookMessage, WebhookSender};
use crate::settings::StoreSettings;
use crate::storage::{self, StoreError};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const ORDERS_FILE: &str = "orders.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Pix,
    Card,
}

impl PaymentMethod {
    fn label(self) -> &'static str {
        match self {
            PaymentMethod::Pix => "PIX",
            PaymentMethod::Card => "Card on delivery",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub product_id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_whatsapp: String,
    pub delivery_date: Option<String>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub product_id: String,
    pub product_name: String,
    pub price_cents: u32,
    pub product_image: Option<String>,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_whatsapp: String,
    pub delivery_date: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum OrderError {
    MissingField(&'static str),
    UnknownProduct,
    Store(StoreError),
}

impl std::fmt::Display for OrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderError::MissingField(field) => write!(f, "missing required field: {field}"),
            OrderError::UnknownProduct => f.write_str("product not found or unavailable"),
            OrderError::Store(err) => write!(f, "order store error: {err}"),
        }
    }
}

/// Validates the request against the catalog and builds the order record.
pub fn build_order(
    products: &ProductStore,
    request: OrderRequest,
    now: OffsetDateTime,
) -> Result<Order, OrderError> {
    let product_id = required(&request.product_id, "product_id")?;
    let customer_name = required(&request.customer_name, "customer_name")?;
    let customer_address = required(&request.customer_address, "customer_address")?;
    let customer_whatsapp = required(&request.customer_whatsapp, "customer_whatsapp")?;

    let product = products
        .get(&product_id)
        .map_err(OrderError::Store)?
        .filter(|product| product.available)
        .ok_or(OrderError::UnknownProduct)?;

    Ok(Order {
        id: new_order_id(now),
        product_id,
        product_name: product.name,
        price_cents: product.price_cents,
        product_image: product.image,
        customer_name,
        customer_address,
        customer_whatsapp,
        delivery_date: request
            .delivery_date
            .filter(|date| !date.trim().is_empty()),
        payment_method: request.payment_method.unwrap_or(PaymentMethod::Pix),
        created_at: now,
    })
}

fn required(value: &str, field: &'static str) -> Result<String, OrderError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(OrderError::MissingField(field));
    }
    Ok(value.to_string())
}

fn new_order_id(now: OffsetDateTime) -> String {
    let suffix: u16 = rand::random();
    format!(
        "ord-{:04}{:02}{:02}-{:04x}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        suffix
    )
}

/// The human-readable summary posted to the store owner's webhook.
pub fn order_message(order: &Order, settings: &StoreSettings) -> WebhookMessage {
    let mut text = format!("New order - {}\n\n", settings.company_name);
    let _ = writeln!(
        text,
        "Product: {} (R$ {},{:02})",
        order.product_name,
        order.price_cents / 100,
        order.price_cents % 100
    );
    let _ = writeln!(text, "Customer: {}", order.customer_name);
    let _ = writeln!(text, "WhatsApp: {}", order.customer_whatsapp);
    let _ = writeln!(text, "Address: {}", order.customer_address);
    if let Some(date) = order.delivery_date.as_deref() {
        let _ = writeln!(text, "Delivery date: {date}");
    }
    match order.payment_method {
        PaymentMethod::Pix if !settings.pix_key.is_empty() => {
            let _ = writeln!(text, "Payment: PIX (key: {})", settings.pix_key);
        }
        method => {
            let _ = writeln!(text, "Payment: {}", method.label());
        }
    }
    let _ = write!(
        text,
        "\nPlaced at {} ({})",
        order
            .created_at
            .format(&Rfc3339)
            .unwrap_or_default(),
        order.id
    );

    WebhookMessage {
        phone: Some(order.customer_whatsapp.clone()),
        message: text,
        image: order.product_image.clone(),
    }
}

/// Posts the order summary to the webhook. Failures are logged only; the
/// order has already been accepted at this point.
pub async fn forward_order<S: WebhookSender>(sender: S, url: &str, message: &WebhookMessage) {
    if let Err(err) = sender.deliver(url, message).await {
        eprintln!("order webhook delivery failed: {err}");
    }
}

pub struct OrderStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl OrderStore {
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(ORDERS_FILE),
            guard: Mutex::new(()),
        }
    }

    pub fn append(&self, order: Order) -> Result<(), StoreError> {
        let _guard = self.guard.lock().expect("order store lock");
        let mut orders: Vec<Order> = storage::load_or_default(&self.path)?;
        orders.push(order);
        storage::persist(&self.path, &orders)
    }

    pub fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let _guard = self.guard.lock().expect("order store lock");
        storage::load_or_default(&self.path)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::Arc;

    fn test_now() -> OffsetDateTime {
        OffsetDateTime::parse("2025-06-01T08:00:00Z", &Rfc3339).expect("parse now")
    }

    fn seeded_products(root: &Path) -> ProductStore {
        let store = ProductStore::open(root);
        store
            .upsert(crate::catalog::Product {
                id: "carrot-cake".to_string(),
                name: "Carrot Cake".to_string(),
                description: "With chocolate topping.".to_string(),
                price_cents: 4500,
                ..Default::default()
            })
            .expect("seed product");
        store
    }

    fn request(product_id: &str) -> OrderRequest {
        OrderRequest {
            product_id: product_id.to_string(),
            customer_name: "Ana".to_string(),
            customer_address: "Rua das Flores 12".to_string(),
            customer_whatsapp: "5511999990000".to_string(),
            delivery_date: Some("2025-06-03".to_string()),
            payment_method: None,
        }
    }

    #[derive(Debug)]
    struct FakeWebhookError;

    impl std::fmt::Display for FakeWebhookError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("fake webhook error")
        }
    }

    #[derive(Clone, Default)]
    struct FakeWebhook {
        fail: bool,
        delivered: Arc<std::sync::Mutex<Vec<(String, WebhookMessage)>>>,
    }

    impl WebhookSender for FakeWebhook {
        type Error = FakeWebhookError;
        type Fut<'a>
            = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
        where
            Self: 'a;

        fn deliver<'a>(&'a self, url: &'a str, message: &'a WebhookMessage) -> Self::Fut<'a> {
            Box::pin(async move {
                if self.fail {
                    return Err(FakeWebhookError);
                }
                self.delivered
                    .lock()
                    .expect("delivered lock")
                    .push((url.to_string(), message.clone()));
                Ok(())
            })
        }
    }

    #[test]
    fn build_order__should_reject_missing_customer_name() {
        // Given
        let root = create_temp_root("orders-missing-name");
        let products = seeded_products(&root);
        let mut request = request("carrot-cake");
        request.customer_name = "  ".to_string();

        // When
        let result = build_order(&products, request, test_now());

        // Then
        assert!(matches!(
            result,
            Err(OrderError::MissingField("customer_name"))
        ));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn build_order__should_reject_unknown_product() {
        // Given
        let root = create_temp_root("orders-unknown-product");
        let products = seeded_products(&root);

        // When
        let result = build_order(&products, request("croissant"), test_now());

        // Then
        assert!(matches!(result, Err(OrderError::UnknownProduct)));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn build_order__should_snapshot_product_details() {
        // Given
        let root = create_temp_root("orders-snapshot");
        let products = seeded_products(&root);

        // When
        let order = build_order(&products, request("carrot-cake"), test_now()).expect("order");

        // Then
        assert_eq!(order.product_name, "Carrot Cake");
        assert_eq!(order.price_cents, 4500);
        assert_eq!(order.payment_method, PaymentMethod::Pix);
        assert!(order.id.starts_with("ord-20250601-"));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn order_message__should_include_order_details() {
        // Given
        let root = create_temp_root("orders-message");
        let products = seeded_products(&root);
        let order = build_order(&products, request("carrot-cake"), test_now()).expect("order");
        let settings = StoreSettings {
            company_name: "Crumbtown".to_string(),
            pix_key: "11999990000".to_string(),
            ..Default::default()
        };

        // When
        let message = order_message(&order, &settings);

        // Then
        assert_eq!(message.phone.as_deref(), Some("5511999990000"));
        assert!(message.message.contains("New order - Crumbtown"));
        assert!(message.message.contains("Carrot Cake (R$ 45,00)"));
        assert!(message.message.contains("Delivery date: 2025-06-03"));
        assert!(message.message.contains("PIX (key: 11999990000)"));

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[tokio::test]
    async fn forward_order__should_post_to_the_configured_url() {
        // Given
        let sender = FakeWebhook::default();
        let message = WebhookMessage::text("New order");

        // When
        forward_order(sender.clone(), "https://hooks.example/orders", &message).await;

        // Then
        let delivered = sender.delivered.lock().expect("delivered lock").clone();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "https://hooks.example/orders");
        assert_eq!(delivered[0].1, message);
    }

    #[tokio::test]
    async fn forward_order__should_swallow_delivery_errors() {
        // Given
        let sender = FakeWebhook {
            fail: true,
            ..Default::default()
        };

        // When
        forward_order(sender, "https://hooks.example/orders", &WebhookMessage::text("x")).await;

        // Then: nothing to assert beyond not panicking; the error is logged.
    }

    #[test]
    fn order_store__should_append_and_list() {
        // Given
        let root = create_temp_root("orders-store");
        let products = seeded_products(&root);
        let store = OrderStore::open(&root);
        let order = build_order(&products, request("carrot-cake"), test_now()).expect("order");

        // When
        store.append(order.clone()).expect("append");

        // Then
        let orders = store.list_all().expect("list");
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].id, order.id);

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
