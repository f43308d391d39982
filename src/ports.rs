pub mod push;
pub mod webhook;

pub use self::push::{PushError, PushSender};
pub use self::webhook::{WebhookMessage, WebhookSender};
