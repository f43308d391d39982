use serde::Serialize;

/// Body posted to the configured webhook. Matches what the receiving
/// automation expects: a text message plus optional recipient and image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl WebhookMessage {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            phone: None,
            message: message.into(),
            image: None,
        }
    }
}

pub trait WebhookSender: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn deliver<'a>(&'a self, url: &'a str, message: &'a WebhookMessage) -> Self::Fut<'a>;
}
