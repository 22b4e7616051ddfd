//! Alert delivery with a single immediate retry.

use std::sync::Arc;

use crate::error::NotifyError;
use crate::models::{Alert, MessageFormat};
use crate::services::Notifier;

/// Wraps a notifier with the delivery policy: a transient failure is
/// retried once right away, anything else is returned to the caller.
#[derive(Clone)]
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    destination: String,
    format: MessageFormat,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, destination: impl Into<String>, format: MessageFormat) -> Self {
        Self {
            notifier,
            destination: destination.into(),
            format,
        }
    }

    /// Deliver an alert, retrying one transient failure.
    pub async fn deliver(&self, alert: &Alert) -> Result<(), NotifyError> {
        let text = alert.render(self.format);
        match self.send(&text).await {
            Err(NotifyError::Transient(reason)) => {
                log::warn!("Delivery failed ({}), retrying once", reason);
                self.send(&text).await
            }
            other => other,
        }
    }

    /// Deliver a status message without retrying; failures are only logged.
    pub async fn announce(&self, alert: &Alert) {
        if let Err(e) = self.send(&alert.render(self.format)).await {
            log::error!("Failed to send status message: {}", e);
        }
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        self.notifier.send(&self.destination, text, self.format).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedNotifier;

    fn alert() -> Alert {
        Alert::Delisting {
            title: "Binance Will Delist ABC".into(),
            link: "https://x/1".into(),
        }
    }

    #[tokio::test]
    async fn test_transient_then_success_delivers_once() {
        let notifier = Arc::new(ScriptedNotifier::new(vec![Err(NotifyError::Transient(
            "timeout".into(),
        ))]));
        let dispatcher = AlertDispatcher::new(notifier.clone(), "chat", MessageFormat::Plain);

        assert!(dispatcher.deliver(&alert()).await.is_ok());
        assert_eq!(notifier.attempts(), 2);
        assert_eq!(notifier.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_two_transient_failures_give_up() {
        let notifier = Arc::new(ScriptedNotifier::new(vec![
            Err(NotifyError::Transient("a".into())),
            Err(NotifyError::Transient("b".into())),
        ]));
        let dispatcher = AlertDispatcher::new(notifier.clone(), "chat", MessageFormat::Plain);

        assert!(dispatcher.deliver(&alert()).await.is_err());
        assert_eq!(notifier.attempts(), 2);
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let notifier = Arc::new(ScriptedNotifier::new(vec![Err(NotifyError::Permanent(
            "chat not found".into(),
        ))]));
        let dispatcher = AlertDispatcher::new(notifier.clone(), "chat", MessageFormat::Plain);

        assert!(dispatcher.deliver(&alert()).await.is_err());
        assert_eq!(notifier.attempts(), 1);
    }
}
