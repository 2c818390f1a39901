//! Outbound notifications. The engine hands fully rendered payloads to a
//! [`NotificationSink`] and only logs what comes back.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dto::sse::{
        OnboardingEvent, PresenceEvent, ReportEvent, ServerEvent, StatusClosedEvent,
        StatusRefreshEvent, VoiceAlertEvent, WelcomeEvent,
    },
    state::SseHub,
};

/// Status card to post or edit.
pub const EVENT_STATUS_REFRESH: &str = "status.refresh";
/// Status card of a closed room.
pub const EVENT_STATUS_CLOSED: &str = "status.closed";
/// Scheduled leaderboard report.
pub const EVENT_REPORT: &str = "report";
/// Phase change cue for a voice channel.
pub const EVENT_VOICE_ALERT: &str = "voice.alert";
/// Greeting for a new member.
pub const EVENT_WELCOME: &str = "welcome";
/// Introduction sent to a newly joined guild.
pub const EVENT_ONBOARDING: &str = "onboarding";
/// Global presence line.
pub const EVENT_PRESENCE: &str = "presence";

/// Failure to hand a notification over to the platform side.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The payload could not be encoded.
    #[error("failed to serialize `{event}` notification")]
    Serialize {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// Nobody is listening, the notification is lost.
    #[error("no subscriber for `{event}` notification")]
    NoSubscribers { event: &'static str },
}

/// Outcome of one notification.
pub type NotifyResult = Result<(), NotifyError>;

/// Log the outcome of a best-effort notification and report whether it went out.
pub fn log_outcome(result: &NotifyResult, what: &'static str) -> bool {
    match result {
        Ok(()) => true,
        Err(err @ NotifyError::NoSubscribers { .. }) => {
            debug!(notification = what, error = %err, "notification dropped");
            false
        }
        Err(err) => {
            warn!(notification = what, error = %err, "notification failed");
            false
        }
    }
}

/// Human-facing side effects of the engine.
pub trait NotificationSink: Send + Sync {
    fn refresh_status(&self, event: StatusRefreshEvent) -> BoxFuture<'static, NotifyResult>;
    fn clear_status(&self, event: StatusClosedEvent) -> BoxFuture<'static, NotifyResult>;
    fn send_report(&self, event: ReportEvent) -> BoxFuture<'static, NotifyResult>;
    fn send_voice_alert(&self, event: VoiceAlertEvent) -> BoxFuture<'static, NotifyResult>;
    fn send_welcome(&self, event: WelcomeEvent) -> BoxFuture<'static, NotifyResult>;
    fn send_onboarding(&self, event: OnboardingEvent) -> BoxFuture<'static, NotifyResult>;
    fn update_presence(&self, event: PresenceEvent) -> BoxFuture<'static, NotifyResult>;
}

/// Sink publishing every notification as a named event on the SSE hub.
#[derive(Clone)]
pub struct SseNotifier {
    hub: Arc<SseHub>,
}

impl SseNotifier {
    /// Sink publishing on `hub`.
    pub fn new(hub: Arc<SseHub>) -> Self {
        Self { hub }
    }

    fn publish<T: Serialize>(&self, event: &'static str, payload: &T) -> BoxFuture<'static, NotifyResult> {
        let result = ServerEvent::json(Some(event.to_string()), payload)
            .map_err(|source| NotifyError::Serialize { event, source })
            .and_then(|server_event| match self.hub.broadcast(server_event) {
                0 => Err(NotifyError::NoSubscribers { event }),
                _ => Ok(()),
            });
        Box::pin(async move { result })
    }
}

impl NotificationSink for SseNotifier {
    fn refresh_status(&self, event: StatusRefreshEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_STATUS_REFRESH, &event)
    }

    fn clear_status(&self, event: StatusClosedEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_STATUS_CLOSED, &event)
    }

    fn send_report(&self, event: ReportEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_REPORT, &event)
    }

    fn send_voice_alert(&self, event: VoiceAlertEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_VOICE_ALERT, &event)
    }

    fn send_welcome(&self, event: WelcomeEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_WELCOME, &event)
    }

    fn send_onboarding(&self, event: OnboardingEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_ONBOARDING, &event)
    }

    fn update_presence(&self, event: PresenceEvent) -> BoxFuture<'static, NotifyResult> {
        self.publish(EVENT_PRESENCE, &event)
    }
}
