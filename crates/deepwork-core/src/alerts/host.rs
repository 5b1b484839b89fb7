use serde::{Deserialize, Serialize};

use super::tones::ToneSpec;

/// Platform capabilities the dispatcher drives. Implemented by the host
/// (terminal, desktop shell, test recorder).
pub trait AlertHost: Send + Sync {
    /// Ask for permission to show notifications. Returns whether it is granted.
    fn request_permission(&self) -> bool;

    fn notify(&self, title: &str, body: &str, options: &NotifyOptions);

    fn play_tone(&self, tone: &ToneSpec);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyOptions {
    /// Notifications sharing a tag replace each other.
    pub tag: String,
    pub require_interaction: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotifyAction>,
    /// Vibration pattern in milliseconds.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vibrate: Vec<u32>,
}

/// Messages posted to the background worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostMessage {
    TimerComplete { duration: u32 },
}
