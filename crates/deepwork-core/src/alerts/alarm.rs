//! Repeating completion alarm.
//!
//! The alarm plays its tone immediately and then on a fixed interval until
//! stopped. At most one loop is active: [`AlarmLoop::start`] cancels the
//! previous loop before spawning a new one. There is no timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::host::AlertHost;
use super::tones::ToneSpec;

/// `tokio::time::interval` rejects a zero period.
const MIN_REPEAT: Duration = Duration::from_millis(1);

struct ActiveAlarm {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct AlarmLoop {
    host: Arc<dyn AlertHost>,
    repeat_every: Duration,
    active: Option<ActiveAlarm>,
}

impl AlarmLoop {
    pub fn new(host: Arc<dyn AlertHost>, repeat_every: Duration) -> Self {
        Self {
            host,
            repeat_every: repeat_every.max(MIN_REPEAT),
            active: None,
        }
    }

    /// Start ringing `tone`, replacing any loop already running.
    ///
    /// Outside a Tokio runtime there is nothing to drive the repeats, so the
    /// tone plays once.
    pub fn start(&mut self, tone: ToneSpec) {
        self.stop();

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no async runtime; playing completion tone once");
            self.host.play_tone(&tone);
            return;
        };

        let cancel_token = CancellationToken::new();
        let handle = runtime.spawn(alarm_loop(
            Arc::clone(&self.host),
            tone,
            self.repeat_every,
            cancel_token.clone(),
        ));
        self.active = Some(ActiveAlarm {
            cancel_token,
            handle,
        });
        tracing::debug!("alarm loop started");
    }

    /// Cancel the running loop. Returns whether one was active.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(active) => {
                active.cancel_token.cancel();
                tracing::debug!("alarm loop stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.cancel_token.is_cancelled() && !a.handle.is_finished())
    }
}

impl Drop for AlarmLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn alarm_loop(
    host: Arc<dyn AlertHost>,
    tone: ToneSpec,
    repeat_every: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(repeat_every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => host.play_tone(&tone),
        }
    }
}
