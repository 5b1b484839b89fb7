//! Completion alerts.
//!
//! The timer emits a completion event; [`AlertDispatcher`] turns it into a
//! notification, a message for the background worker and a repeating alarm,
//! all through the host-supplied [`AlertHost`] capabilities.

mod alarm;
mod dispatcher;
mod host;
mod tones;

pub use alarm::AlarmLoop;
pub use dispatcher::{
    background_worker, format_duration, AlertDispatcher, BACKGROUND_TAG, COMPLETE_TAG,
    COMPLETE_TITLE,
};
pub use host::{AlertHost, HostMessage, NotifyAction, NotifyOptions};
pub use tones::{tone_for, ToneSpec, Voice, Waveform};

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{AlertHost, NotifyOptions, ToneSpec};

    /// Records every call for assertions.
    pub struct RecordingHost {
        granted: bool,
        notifications: Mutex<Vec<(String, String, NotifyOptions)>>,
        tones: Mutex<Vec<ToneSpec>>,
    }

    impl Default for RecordingHost {
        fn default() -> Self {
            Self {
                granted: true,
                notifications: Mutex::default(),
                tones: Mutex::default(),
            }
        }
    }

    impl RecordingHost {
        pub fn denying() -> Self {
            Self {
                granted: false,
                ..Self::default()
            }
        }

        pub fn notifications(&self) -> Vec<(String, String, NotifyOptions)> {
            self.notifications.lock().unwrap().clone()
        }

        pub fn tones(&self) -> Vec<ToneSpec> {
            self.tones.lock().unwrap().clone()
        }
    }

    impl AlertHost for RecordingHost {
        fn request_permission(&self) -> bool {
            self.granted
        }

        fn notify(&self, title: &str, body: &str, options: &NotifyOptions) {
            self.notifications
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string(), options.clone()));
        }

        fn play_tone(&self, tone: &ToneSpec) {
            self.tones.lock().unwrap().push(tone.clone());
        }
    }
}
