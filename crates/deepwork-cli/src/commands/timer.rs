use std::error::Error;
use std::sync::Arc;

use clap::Subcommand;
use deepwork_core::alerts::{background_worker, AlertDispatcher, AlertHost, HostMessage};
use deepwork_core::{Config, Database, SystemClock, TimerController, TimerPhase};
use tokio::sync::mpsc;

use super::print_json;
use crate::host::TerminalHost;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a countdown (defaults to the configured default duration)
    Start {
        /// Minutes to focus
        minutes: Option<i64>,
        /// Additional hours
        #[arg(long)]
        hours: Option<i64>,
    },
    /// Pause the running countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Abandon the countdown without recording it
    Stop,
    /// Print current timer state as JSON
    Status,
    /// Record the finished countdown as a session
    Save {
        /// Focus rating, 1-5
        rating: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Discard the finished countdown
    Skip,
    /// Stay in the foreground, ticking until the countdown finishes
    Watch,
}

type Controller<'a> = TimerController<'a, &'a Database>;

fn open_controller<'a>(
    db: &'a Database,
    clock: &'a SystemClock,
    config: &Config,
    messages: Option<mpsc::UnboundedSender<HostMessage>>,
) -> Result<Controller<'a>, Box<dyn Error>> {
    let host: Arc<dyn AlertHost> = Arc::new(TerminalHost);
    let mut alerts = AlertDispatcher::new(host, config.alarm_repeat_interval());
    if let Some(tx) = messages {
        alerts = alerts.with_messages(tx);
    }
    let mut timer = TimerController::new(db, db, clock, alerts, config)?;
    if config.backup.auto {
        timer = timer.with_auto_backup(config.backup_dir()?);
    }
    Ok(timer)
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let db = Database::open()?;

    match action {
        TimerAction::Watch => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch(&db, &config))
        }
        action => run_once(&db, &config, action),
    }
}

fn run_once(db: &Database, config: &Config, action: TimerAction) -> Result<(), Box<dyn Error>> {
    let clock = SystemClock;
    let mut timer = open_controller(db, &clock, config, None)?;
    if let Some(missed) = timer.restore()? {
        print_json(&missed)?;
    }

    match action {
        TimerAction::Start { minutes, hours } => {
            let event = match (hours, minutes) {
                (None, None) => timer.start_default()?,
                (h, m) => timer.start(
                    h.unwrap_or(0)
                        .saturating_mul(60)
                        .saturating_add(m.unwrap_or(0)),
                )?,
            };
            print_json(&event)?;
        }
        TimerAction::Pause => print_json(&timer.pause()?)?,
        TimerAction::Resume => print_json(&timer.resume()?)?,
        TimerAction::Stop => print_json(&timer.stop()?)?,
        TimerAction::Status => {
            if let Some(event) = timer.tick() {
                print_json(&event)?;
            }
            print_json(&timer.status())?;
        }
        TimerAction::Save { rating, notes } => {
            timer.tick();
            let outcome = timer.save_session(rating, notes)?;
            print_json(&serde_json::json!({
                "event": outcome.event,
                "backup": outcome.backup,
            }))?;
        }
        TimerAction::Skip => {
            timer.tick();
            print_json(&timer.skip_session()?)?;
        }
        TimerAction::Watch => print_json(&timer.status())?,
    }
    Ok(())
}

fn clock_text(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

async fn watch(db: &Database, config: &Config) -> Result<(), Box<dyn Error>> {
    let clock = SystemClock;
    let (tx, rx) = mpsc::unbounded_channel();
    let worker_host: Arc<dyn AlertHost> = Arc::new(TerminalHost);
    let worker = tokio::spawn(background_worker(rx, worker_host));

    let mut timer = open_controller(db, &clock, config, Some(tx))?;
    if let Some(missed) = timer.restore()? {
        print_json(&missed)?;
    }
    match timer.phase() {
        TimerPhase::Idle => {
            return Err("no countdown in progress; run `deepwork timer start` first".into())
        }
        TimerPhase::Paused => {
            print_json(&timer.status())?;
            return Ok(());
        }
        TimerPhase::Running | TimerPhase::Completed => {}
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(config.tick_interval());
    let mut shown = None;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                if let Some(event) = timer.tick() {
                    print_json(&event)?;
                }
                let status = timer.status();
                match status.phase {
                    TimerPhase::Running if shown != Some(status.remaining_secs) => {
                        eprint!("\r{} remaining ", clock_text(status.remaining_secs));
                        shown = Some(status.remaining_secs);
                    }
                    TimerPhase::Completed if shown.is_some() => {
                        eprintln!("\nPress Ctrl-C to silence, then run `deepwork timer save <rating>`.");
                        shown = None;
                    }
                    _ => {}
                }
            }
        }
    }

    timer.stop_alarm();
    drop(timer);
    worker.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_text_formats() {
        assert_eq!(clock_text(0), "00:00");
        assert_eq!(clock_text(25 * 60), "25:00");
        assert_eq!(clock_text(3600 + 5 * 60 + 7), "1:05:07");
    }
}
