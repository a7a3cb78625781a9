use async_trait::async_trait;
use orchard_shared::ActivityEvent;

/// Side-channel for activity events. Implementations log and swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: ActivityEvent);
}

/// Drops every event.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: ActivityEvent) {}
}
