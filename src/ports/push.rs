use crate::subscriptions::SubscriptionRecord;

/// Failure reported by a push transport. `is_gone` marks endpoints the push
/// service says are permanently invalid, as opposed to transient failures.
pub trait PushError: std::fmt::Display + Send + Sync + 'static {
    fn is_gone(&self) -> bool;
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: PushError;
    type Fut<'a>: Future<Output = Result<(), Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a SubscriptionRecord, message: &'a str) -> Self::Fut<'a>;
}
