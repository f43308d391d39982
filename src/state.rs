use crate::auth::AdminAuth;
use crate::catalog::ProductStore;
use crate::config::AppConfig;
use crate::orders::OrderStore;
use crate::settings::SettingsStore;
use crate::subscriptions::SubscriptionStore;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub auth: Option<AdminAuth>,
    pub settings: Arc<SettingsStore>,
    pub subscriptions: Arc<SubscriptionStore>,
    pub products: Arc<ProductStore>,
    pub orders: Arc<OrderStore>,
}
