//! Terminal implementation of the alert capabilities.

use std::io::Write;

use deepwork_core::alerts::{AlertHost, NotifyOptions, ToneSpec};

/// Rings the terminal bell and prints notifications to stderr.
pub struct TerminalHost;

impl AlertHost for TerminalHost {
    fn request_permission(&self) -> bool {
        true
    }

    fn notify(&self, title: &str, body: &str, options: &NotifyOptions) {
        eprintln!("\n[{}] {title}\n{body}", options.tag);
    }

    fn play_tone(&self, tone: &ToneSpec) {
        if tone.voices.iter().all(|v| v.gain == 0.0) {
            return;
        }
        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            tracing::debug!("could not ring terminal bell: {e}");
        }
    }
}
