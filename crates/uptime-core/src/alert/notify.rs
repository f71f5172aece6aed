use std::sync::Arc;

use tracing::info;

use super::{AlertError, Delivery, Notification, NotificationChannel};
use crate::status::Status;

/// Notification channel bookkeeping for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyState {
    /// Last status the channel accepted.
    pub last_sent: Status,
    /// Whether the last accepted notification reported a bad status.
    pub armed: bool,
}

/// Level-triggered push notifications for one service.
///
/// Sends when the service crosses the good/bad boundary, or when the message
/// changes while it stays bad. Text changes while good never notify.
pub struct NotifyDriver {
    channel: Arc<dyn NotificationChannel>,
    topic: Option<String>,
    title: String,
}

impl NotifyDriver {
    /// `title` is shown as the notification subject (the service URL).
    pub fn new(
        channel: Arc<dyn NotificationChannel>,
        topic: Option<&str>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            channel,
            topic: topic.filter(|t| !t.is_empty()).map(str::to_string),
            title: title.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.topic.is_some()
    }

    pub fn plan(&self, status: &Status, state: &NotifyState) -> Option<Notification> {
        let topic = self.topic.as_ref()?;

        let crossed = status.bad != state.armed;
        let changed_while_bad = status.bad && status.message != state.last_sent.message;
        if !crossed && !changed_while_bad {
            return None;
        }

        Some(Notification {
            topic: topic.clone(),
            title: self.title.clone(),
            body: status.message.clone(),
        })
    }

    /// Sends the planned notification. `state` only changes when the channel accepts it.
    pub async fn deliver(
        &self,
        status: &Status,
        state: &mut NotifyState,
    ) -> Result<Delivery, AlertError> {
        let Some(notification) = self.plan(status, state) else {
            return Ok(Delivery::Skipped);
        };

        self.channel.submit(&notification).await?;

        state.armed = status.bad;
        state.last_sent = status.clone();

        info!(
            topic = %notification.topic,
            armed = state.armed,
            "Notification sent"
        );
        Ok(Delivery::Sent)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<Notification>>,
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn submit(&self, notification: &Notification) -> Result<(), AlertError> {
            if *self.fail.lock().unwrap() {
                return Err(AlertError::http("ntfy", 502, "bad gateway"));
            }
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn driver() -> (Arc<RecordingChannel>, NotifyDriver) {
        let channel = Arc::new(RecordingChannel::default());
        let driver = NotifyDriver::new(channel.clone(), Some("ops"), "https://example.com/");
        (channel, driver)
    }

    #[test]
    fn inactive_without_topic() {
        let driver = NotifyDriver::new(Arc::new(RecordingChannel::default()), Some(""), "u");
        assert!(!driver.is_active());
        assert!(driver
            .plan(&Status::bad("HTTP 500: boom"), &NotifyState::default())
            .is_none());
    }

    #[test]
    fn good_text_changes_never_notify() {
        let (_, driver) = driver();
        assert!(driver
            .plan(&Status::good("HTTP 200: ok"), &NotifyState::default())
            .is_none());
        let state = NotifyState {
            last_sent: Status::good("HTTP 200: ok"),
            armed: false,
        };
        assert!(driver.plan(&Status::good("HTTP 200: other"), &state).is_none());
    }

    #[tokio::test]
    async fn arms_and_disarms() {
        let (channel, driver) = driver();
        let mut state = NotifyState::default();

        let down = Status::bad("HTTP 500: boom");
        assert_eq!(driver.deliver(&down, &mut state).await.unwrap(), Delivery::Sent);
        assert!(state.armed);
        assert_eq!(driver.deliver(&down, &mut state).await.unwrap(), Delivery::Skipped);

        let other_down = Status::bad("Timed out after 10s");
        assert_eq!(
            driver.deliver(&other_down, &mut state).await.unwrap(),
            Delivery::Sent
        );

        let up = Status::good("HTTP 200: ok");
        assert_eq!(driver.deliver(&up, &mut state).await.unwrap(), Delivery::Sent);
        assert!(!state.armed);
        assert_eq!(state.last_sent, up);

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].topic, "ops");
        assert_eq!(sent[0].title, "https://example.com/");
        assert_eq!(sent[0].body, "HTTP 500: boom");
        assert_eq!(sent[1].body, "Timed out after 10s");
        assert_eq!(sent[2].body, "HTTP 200: ok");
    }

    #[tokio::test]
    async fn failure_keeps_condition_for_retry() {
        let (channel, driver) = driver();
        *channel.fail.lock().unwrap() = true;
        let mut state = NotifyState::default();

        let down = Status::bad("HTTP 500: boom");
        assert!(driver.deliver(&down, &mut state).await.is_err());
        assert_eq!(state, NotifyState::default());
        assert!(driver.plan(&down, &state).is_some());

        *channel.fail.lock().unwrap() = false;
        assert_eq!(driver.deliver(&down, &mut state).await.unwrap(), Delivery::Sent);
        assert!(state.armed);
    }
}
