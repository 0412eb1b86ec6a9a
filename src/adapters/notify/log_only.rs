//! Log-only notifier for dry runs and setups without a bot token

use async_trait::async_trait;

use crate::ports::notifier::{Notification, Notifier, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            target: "notifications",
            "-> {:?}: {}",
            notification.target(),
            notification.render().replace('\n', " | ")
        );
        Ok(())
    }
}
