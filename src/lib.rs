pub mod adapters;
pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod ports;
pub mod push;
pub mod settings;
pub mod state;
pub mod storage;
pub mod subscriptions;

mod assets;
mod templates;
mod uploads;

use std::net::SocketAddr;

pub use auth::generate_auth_key;
pub use push::vapid::{VapidCredentials, generate_vapid_credentials};

pub async fn serve(addr: SocketAddr, config: config::AppConfig) {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app::app(config))
        .await
        .expect("server error");
}
