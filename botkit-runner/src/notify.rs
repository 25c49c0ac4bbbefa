//! Failure notifications
//!
//! A failed run sends a text alert and the run log to a chat. Delivery is
//! best effort: errors are logged and the run outcome stays the same.

use async_trait::async_trait;
use botkit_client::TelegramClient;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::NotificationDeliveryError;

/// Delivery channel for alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a text message
    ///
    /// # Arguments
    /// * `text` - Message body
    async fn send_message(&self, text: &str) -> Result<(), NotificationDeliveryError>;

    /// Uploads a file
    ///
    /// # Arguments
    /// * `path` - File to upload
    /// * `caption` - Caption shown with the file
    async fn send_document(&self, path: &Path, caption: &str)
    -> Result<(), NotificationDeliveryError>;
}

/// Notifier posting to a single Telegram chat
pub struct TelegramNotifier {
    client: TelegramClient,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient, chat_id: impl Into<String>) -> Self {
        let chat_id = chat_id.into();
        info!(
            "Telegram notifier initialized with token {} for chat {}",
            client.masked_token(),
            chat_id
        );
        Self { client, chat_id }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<(), NotificationDeliveryError> {
        self.client.send_message(&self.chat_id, text).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        path: &Path,
        caption: &str,
    ) -> Result<(), NotificationDeliveryError> {
        self.client
            .send_document(&self.chat_id, path, caption)
            .await?;
        Ok(())
    }
}

/// Sends the failure alert of a run, if a notifier is configured
#[derive(Clone)]
pub struct NotificationSink {
    notifier: Option<Arc<dyn Notifier>>,
    bot_name: String,
}

impl NotificationSink {
    pub fn new(notifier: Arc<dyn Notifier>, bot_name: impl Into<String>) -> Self {
        Self {
            notifier: Some(notifier),
            bot_name: bot_name.into(),
        }
    }

    /// A sink that drops every alert
    pub fn disabled(bot_name: impl Into<String>) -> Self {
        Self {
            notifier: None,
            bot_name: bot_name.into(),
        }
    }

    /// Attach a notifier after construction
    pub fn enable(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = Some(notifier);
    }

    pub fn is_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    /// Alert about a failed run and attach its log file
    ///
    /// Never fails; delivery errors are logged.
    pub async fn notify_failure(&self, error_message: &str, log_path: &Path) {
        let Some(notifier) = &self.notifier else {
            info!("No notifier configured, skipping failure alert");
            return;
        };

        let text = format!(
            "An error occurred during bot '{}' execution: {}",
            self.bot_name, error_message
        );

        if let Err(e) = notifier.send_message(&text).await {
            error!("Failed to send failure alert: {}", e);
        }

        if let Err(e) = notifier.send_document(log_path, &self.bot_name).await {
            error!("Failed to upload log file {}: {}", log_path.display(), e);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use botkit_client::ClientError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Notifier that records what it was asked to send
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub messages: Mutex<Vec<String>>,
        pub documents: Mutex<Vec<(PathBuf, String)>>,
        pub fail: bool,
    }

    impl RecordingNotifier {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn message_count(&self) -> usize {
            self.messages.lock().unwrap().len()
        }

        fn outcome(&self) -> Result<(), NotificationDeliveryError> {
            if self.fail {
                return Err(ClientError::api_error(502, "bad gateway").into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_message(&self, text: &str) -> Result<(), NotificationDeliveryError> {
            self.messages.lock().unwrap().push(text.to_string());
            self.outcome()
        }

        async fn send_document(
            &self,
            path: &Path,
            caption: &str,
        ) -> Result<(), NotificationDeliveryError> {
            self.documents
                .lock()
                .unwrap()
                .push((path.to_path_buf(), caption.to_string()));
            self.outcome()
        }
    }

    #[tokio::test]
    async fn test_notify_failure_sends_message_and_log() {
        let notifier = Arc::new(RecordingNotifier::default());
        let sink = NotificationSink::new(notifier.clone(), "invoice-bot");

        sink.notify_failure("boom", Path::new("logs/run.log")).await;

        let messages = notifier.messages.lock().unwrap();
        assert_eq!(
            messages.as_slice(),
            ["An error occurred during bot 'invoice-bot' execution: boom"]
        );
        let documents = notifier.documents.lock().unwrap();
        assert_eq!(
            documents.as_slice(),
            [(PathBuf::from("logs/run.log"), "invoice-bot".to_string())]
        );
    }

    #[tokio::test]
    async fn test_delivery_errors_are_swallowed() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let sink = NotificationSink::new(notifier.clone(), "bot");

        sink.notify_failure("boom", Path::new("run.log")).await;

        // The upload is still attempted after the message failed
        assert_eq!(notifier.message_count(), 1);
        assert_eq!(notifier.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_sink_is_a_no_op() {
        let mut sink = NotificationSink::disabled("bot");
        assert!(!sink.is_enabled());
        sink.notify_failure("boom", Path::new("run.log")).await;

        let notifier = Arc::new(RecordingNotifier::default());
        sink.enable(notifier.clone());
        assert!(sink.is_enabled());
        sink.notify_failure("boom", Path::new("run.log")).await;
        assert_eq!(notifier.message_count(), 1);
    }
}
