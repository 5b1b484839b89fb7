//! Completion alerts.
//!
//! On completion the dispatcher raises the foreground notification (when
//! enabled and permitted), posts a message for the host's background worker,
//! and starts the alarm loop when sound is on.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::alarm::AlarmLoop;
use super::host::{AlertHost, HostMessage, NotifyAction, NotifyOptions};
use super::tones::tone_for;
use crate::storage::Settings;

pub const COMPLETE_TITLE: &str = "Deep Work Timer Complete! 🎉";
pub const COMPLETE_TAG: &str = "timer-complete";
pub const BACKGROUND_TAG: &str = "timer-complete-bg";

/// Render planned minutes as `25m` or `1h 5m`.
pub fn format_duration(minutes: u32) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

fn completion_body(minutes: u32) -> String {
    format!(
        "Your {} deep work session has finished. Time to take a break!",
        format_duration(minutes)
    )
}

/// Turns timer completions into host side effects.
pub struct AlertDispatcher {
    host: Arc<dyn AlertHost>,
    alarm: AlarmLoop,
    messages: Option<mpsc::UnboundedSender<HostMessage>>,
}

impl AlertDispatcher {
    pub fn new(host: Arc<dyn AlertHost>, alarm_repeat: Duration) -> Self {
        let alarm = AlarmLoop::new(Arc::clone(&host), alarm_repeat);
        Self {
            host,
            alarm,
            messages: None,
        }
    }

    /// Also post completions to a background worker.
    pub fn with_messages(mut self, tx: mpsc::UnboundedSender<HostMessage>) -> Self {
        self.messages = Some(tx);
        self
    }

    pub fn request_permission(&self) -> bool {
        self.host.request_permission()
    }

    /// Fire every completion side effect the settings allow.
    pub fn on_complete(&mut self, duration_min: u32, settings: &Settings) {
        tracing::info!(duration_min, "countdown complete");

        if settings.notifications_enabled {
            if self.host.request_permission() {
                let options = NotifyOptions {
                    tag: COMPLETE_TAG.into(),
                    require_interaction: true,
                    ..NotifyOptions::default()
                };
                self.host
                    .notify(COMPLETE_TITLE, &completion_body(duration_min), &options);
            } else {
                tracing::debug!("notification permission denied");
            }
        }

        if let Some(tx) = &self.messages {
            if tx
                .send(HostMessage::TimerComplete {
                    duration: duration_min,
                })
                .is_err()
            {
                tracing::warn!("background worker is gone; completion message dropped");
            }
        }

        if settings.sound_enabled {
            self.alarm
                .start(tone_for(settings.sound_type, settings.volume));
        }
    }

    pub fn stop_alarm(&mut self) -> bool {
        self.alarm.stop()
    }

    pub fn is_alarm_active(&self) -> bool {
        self.alarm.is_active()
    }
}

/// Drain host messages, raising the background notification for each
/// completion. Returns when every sender is dropped.
pub async fn background_worker(
    mut rx: mpsc::UnboundedReceiver<HostMessage>,
    host: Arc<dyn AlertHost>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            HostMessage::TimerComplete { duration } => {
                let options = NotifyOptions {
                    tag: BACKGROUND_TAG.into(),
                    require_interaction: true,
                    actions: vec![
                        NotifyAction {
                            action: "open".into(),
                            title: "Open Timer".into(),
                        },
                        NotifyAction {
                            action: "dismiss".into(),
                            title: "Dismiss".into(),
                        },
                    ],
                    vibrate: vec![200, 100, 200, 100, 200],
                };
                host.notify(COMPLETE_TITLE, &completion_body(duration), &options);
            }
        }
    }
}
