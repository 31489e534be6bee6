//! Main event loop: poll scheduling, button dispatch, shutdown.
//!
//! Threads and channels:
//! - **Main thread**: owns the `Dashboard` and the grid surface; waits on button
//!   events, poll outcomes and a short tick with `select!`.
//! - **Poller thread**: owns the `Source`; takes requests over a rendezvous
//!   channel so it only accepts work when idle.
//! - **MIDI input callback**: feeds button events into a bounded channel.
//! - **Logger thread**: writes the activity log.
//!
//! Only the main thread touches engine state, so each handler runs to
//! completion without locks.

#![allow(missing_docs)]

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select};

use crate::core::errors::{DashpadError, Result};
use crate::daemon::opener::LinkOpener;
use crate::daemon::schedule::PollSchedule;
use crate::daemon::signals::SignalHandler;
use crate::engine::{Action, Dashboard};
use crate::logger::{ActivityEvent, ActivityLoggerHandle};
use crate::protocol::{DashboardState, payload_digest};
use crate::source::Source;
use crate::surface::{ButtonEvent, GridSurface};

// ──────────────────── channel capacities ────────────────────

/// Main → poller: rendezvous. A request only goes through when the poller is
/// idle; otherwise the main loop retries on the next tick.
const POLL_REQUEST_CAP: usize = 0;
/// Poller → main: one outcome at a time.
const POLL_OUTCOME_CAP: usize = 1;
/// Driver → main. Presses arriving while this is full are dropped by the driver.
pub const BUTTON_EVENT_CAP: usize = 64;

/// Longest the loop sleeps before re-checking signals.
const TICK: Duration = Duration::from_millis(250);
/// Shortest wait, so a due-but-refused poll request is not retried in a spin.
const MIN_WAIT: Duration = Duration::from_millis(10);

// ──────────────────── inter-thread messages ────────────────────

#[derive(Debug, Clone, Copy)]
struct PollRequest;

/// Result of one poll cycle, as reported by the poller thread.
#[derive(Debug)]
pub struct PollOutcome {
    pub result: Result<DashboardState>,
    pub elapsed: Duration,
}

/// Bounded channel for driver → loop button events.
pub fn button_channel() -> (Sender<ButtonEvent>, Receiver<ButtonEvent>) {
    bounded(BUTTON_EVENT_CAP)
}

// ──────────────────── daemon configuration ────────────────────

#[derive(Debug, Clone)]
pub struct DaemonArgs {
    /// Delay between the end of one poll and the start of the next.
    pub interval: Duration,
    /// Report every applied state and button action on stderr.
    pub verbose: bool,
    /// Suppress informational stderr lines.
    pub quiet: bool,
    /// Recorded in the start event.
    pub config_hash: String,
}

impl Default for DaemonArgs {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            verbose: false,
            quiet: false,
            config_hash: String::new(),
        }
    }
}

/// Why `select!` returned.
enum Wake {
    Button(ButtonEvent),
    Outcome(PollOutcome),
    InputClosed,
    PollerClosed,
    Timeout,
}

/// What the loop should do after one iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Shutdown,
}

// ──────────────────── main daemon struct ────────────────────

pub struct DashpadDaemon<S: GridSurface, O: LinkOpener> {
    dashboard: Dashboard<S, O>,
    source_label: String,
    poll_tx: Option<Sender<PollRequest>>,
    outcome_rx: Receiver<PollOutcome>,
    events: Receiver<ButtonEvent>,
    schedule: PollSchedule,
    logger: ActivityLoggerHandle,
    signals: SignalHandler,
    args: DaemonArgs,
    poller_join: Option<thread::JoinHandle<()>>,
    start_time: Instant,
}

impl<S: GridSurface, O: LinkOpener> DashpadDaemon<S, O> {
    /// Spawn the poller thread and prepare the loop. The first poll is due
    /// immediately.
    pub fn init(
        dashboard: Dashboard<S, O>,
        source: Box<dyn Source>,
        events: Receiver<ButtonEvent>,
        logger: ActivityLoggerHandle,
        signals: SignalHandler,
        args: DaemonArgs,
    ) -> Result<Self> {
        let source_label = source.describe();
        let (poll_tx, poll_rx) = bounded::<PollRequest>(POLL_REQUEST_CAP);
        let (outcome_tx, outcome_rx) = bounded::<PollOutcome>(POLL_OUTCOME_CAP);

        let poller_join = thread::Builder::new()
            .name("dashpad-poller".to_string())
            .spawn(move || poller_thread_main(source, &poll_rx, &outcome_tx))
            .map_err(|e| DashpadError::Runtime {
                details: format!("failed to spawn poller thread: {e}"),
            })?;

        let start_time = Instant::now();
        Ok(Self {
            dashboard,
            source_label,
            poll_tx: Some(poll_tx),
            outcome_rx,
            events,
            schedule: PollSchedule::new(args.interval, start_time),
            logger,
            signals,
            args,
            poller_join: Some(poller_join),
            start_time,
        })
    }

    /// Run until a shutdown signal or a fatal channel failure, then blank the
    /// grid and stop the poller.
    pub fn run(&mut self) -> Result<()> {
        self.logger.send(ActivityEvent::DaemonStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            source: self.source_label.clone(),
            config_hash: self.args.config_hash.clone(),
        });
        if !self.args.quiet {
            eprintln!(
                "[DASHPAD-DAEMON] polling {} every {}s",
                self.source_label,
                self.args.interval.as_secs()
            );
        }

        let result = loop {
            match self.tick(TICK) {
                Ok(LoopControl::Continue) => {}
                Ok(LoopControl::Shutdown) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        let reason = match &result {
            Ok(()) => "signal".to_string(),
            Err(e) => e.to_string(),
        };
        self.shutdown(&reason);
        result
    }

    /// One loop iteration: check signals, start a due poll, then wait up to
    /// `max_wait` for a button event or poll outcome.
    pub fn tick(&mut self, max_wait: Duration) -> Result<LoopControl> {
        if self.signals.should_shutdown() {
            if !self.args.quiet {
                eprintln!("[DASHPAD-DAEMON] shutdown requested");
            }
            return Ok(LoopControl::Shutdown);
        }
        let now = Instant::now();
        if self.signals.should_refresh() {
            if !self.args.quiet {
                eprintln!("[DASHPAD-DAEMON] poll forced (SIGUSR1)");
            }
            self.schedule.force(now);
        }
        if self.schedule.is_due(now) {
            self.request_poll()?;
        }

        let wait = self
            .schedule
            .time_until_due(now)
            .map_or(max_wait, |d| d.min(max_wait))
            .max(MIN_WAIT);

        let woke = select! {
            recv(self.events) -> msg => msg.map_or(Wake::InputClosed, Wake::Button),
            recv(self.outcome_rx) -> msg => msg.map_or(Wake::PollerClosed, Wake::Outcome),
            default(wait) => Wake::Timeout,
        };
        match woke {
            Wake::Button(event) => self.handle_button(event),
            Wake::Outcome(outcome) => self.apply_poll_outcome(outcome),
            Wake::InputClosed => {
                return Err(DashpadError::ChannelClosed {
                    component: "button-input",
                });
            }
            Wake::PollerClosed => return Err(DashpadError::ChannelClosed { component: "poller" }),
            Wake::Timeout => {}
        }
        Ok(LoopControl::Continue)
    }

    /// Apply a finished poll: a good state replaces the dashboard, a failure
    /// is logged and leaves it alone. Either way the next poll is scheduled
    /// one interval from now.
    pub fn apply_poll_outcome(&mut self, outcome: PollOutcome) {
        self.schedule.complete(Instant::now());
        let duration_ms = u64::try_from(outcome.elapsed.as_millis()).unwrap_or(u64::MAX);

        match outcome.result {
            Ok(state) => {
                let tabs = state.tabs.len();
                let digest = payload_digest(&state);
                if self.args.verbose {
                    eprintln!("[DASHPAD-POLL] applied {tabs} tab(s) digest={digest} in {duration_ms}ms");
                }
                if let Err(e) = self.dashboard.set_state(state) {
                    self.report_device_error(&e);
                }
                self.logger.send(ActivityEvent::StateApplied {
                    tabs,
                    digest,
                    duration_ms,
                });
            }
            Err(e) => {
                eprintln!("[DASHPAD-POLL] {}", poll_failure_note(&e, self.args.interval));
                self.logger.send(ActivityEvent::PollFailed {
                    source: self.source_label.clone(),
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn handle_button(&mut self, event: ButtonEvent) {
        let before = self.dashboard.selected_tab();
        match self.dashboard.handle_event(event) {
            Ok(Some(Action::SelectTab { index })) => {
                let tab = self.dashboard.selected_tab().unwrap_or(index);
                self.log_tab_selected(tab);
            }
            Ok(Some(Action::OpenLink { link })) => {
                if self.args.verbose {
                    eprintln!("[DASHPAD-DAEMON] opening {link}");
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.report_device_error(&e);
                // The selection moves before the redraw, so a failed flush
                // still leaves a new tab selected.
                let after = self.dashboard.selected_tab();
                if let Some(tab) = after.filter(|_| after != before) {
                    self.log_tab_selected(tab);
                }
            }
        }
    }

    // ──────────────────── accessors ────────────────────

    pub fn dashboard(&self) -> &Dashboard<S, O> {
        &self.dashboard
    }

    pub fn dashboard_mut(&mut self) -> &mut Dashboard<S, O> {
        &mut self.dashboard
    }

    pub fn schedule(&self) -> &PollSchedule {
        &self.schedule
    }

    pub fn signals(&self) -> &SignalHandler {
        &self.signals
    }

    // ──────────────────── internals ────────────────────

    fn request_poll(&mut self) -> Result<()> {
        let Some(tx) = &self.poll_tx else {
            return Err(DashpadError::ChannelClosed { component: "poller" });
        };
        match tx.try_send(PollRequest) {
            Ok(()) => {
                self.schedule.start();
                Ok(())
            }
            // Poller not parked on recv yet; retry next tick.
            Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => {
                Err(DashpadError::ChannelClosed { component: "poller" })
            }
        }
    }

    fn log_tab_selected(&self, tab: usize) {
        if self.args.verbose {
            eprintln!("[DASHPAD-DAEMON] tab {tab} selected");
        }
        self.logger.send(ActivityEvent::TabSelected { tab });
    }

    fn report_device_error(&self, err: &DashpadError) {
        eprintln!("[DASHPAD-MIDI] {err}");
        self.logger.send(ActivityEvent::DeviceError {
            code: err.code().to_string(),
            message: err.to_string(),
        });
    }

    fn shutdown(&mut self, reason: &str) {
        let uptime_secs = self.start_time.elapsed().as_secs();

        if let Err(e) = self.dashboard.blank() {
            self.report_device_error(&e);
        }

        // Closing the request channel stops an idle poller. A poller stuck in
        // a slow source is abandoned rather than waited for.
        self.poll_tx = None;
        if let Some(join) = self.poller_join.take() {
            if self.schedule.in_flight() {
                drop(join);
            } else {
                let _ = join.join();
            }
        }

        self.logger.send(ActivityEvent::DaemonStopped {
            reason: reason.to_string(),
            uptime_secs,
        });
        if !self.args.quiet {
            eprintln!("[DASHPAD-DAEMON] shutdown complete (uptime={uptime_secs}s)");
        }
    }
}

/// Stderr line for a failed poll. Transient failures also say when the next
/// attempt happens.
fn poll_failure_note(err: &DashpadError, interval: Duration) -> String {
    if err.is_retryable() {
        format!("{err}; retrying in {}s", interval.as_secs())
    } else {
        err.to_string()
    }
}

// ──────────────────── poller thread ────────────────────

fn poller_thread_main(
    mut source: Box<dyn Source>,
    requests: &Receiver<PollRequest>,
    outcomes: &Sender<PollOutcome>,
) {
    while requests.recv().is_ok() {
        let started = Instant::now();
        let result = source.poll();
        let outcome = PollOutcome {
            result,
            elapsed: started.elapsed(),
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::daemon::opener::RecordingOpener;
    use crate::logger::jsonl::JsonlConfig;
    use crate::logger::{ActivityLoggerConfig, spawn_logger};
    use crate::protocol::{Button, Color, Tab, TabBody};
    use crate::surface::recording::RecordingSurface;
    use crate::surface::{GridPos, Layer};

    type Daemon = DashpadDaemon<RecordingSurface, RecordingOpener>;

    /// Source replaying canned results; counts polls.
    struct ScriptedSource {
        script: Arc<Mutex<VecDeque<Result<DashboardState>>>>,
        polls: Arc<Mutex<usize>>,
    }

    impl Source for ScriptedSource {
        fn poll(&mut self) -> Result<DashboardState> {
            *self.polls.lock() += 1;
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(DashboardState::default()))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn one_tab_state(link: &str) -> DashboardState {
        DashboardState {
            tabs: vec![Tab {
                color: Color::Solid { palette_color: 5 },
                selected_color: None,
                body: TabBody::List {
                    buttons: vec![Button {
                        color: Color::Solid { palette_color: 10 },
                        link: Some(link.to_string()),
                    }],
                },
            }],
        }
    }

    fn daemon_with(
        script: Vec<Result<DashboardState>>,
        interval: Duration,
    ) -> (Daemon, Sender<ButtonEvent>, RecordingOpener, Arc<Mutex<usize>>) {
        daemon_logging_to(script, interval, ActivityLoggerHandle::disabled())
    }

    fn daemon_logging_to(
        script: Vec<Result<DashboardState>>,
        interval: Duration,
        logger: ActivityLoggerHandle,
    ) -> (Daemon, Sender<ButtonEvent>, RecordingOpener, Arc<Mutex<usize>>) {
        let polls = Arc::new(Mutex::new(0));
        let source = ScriptedSource {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            polls: Arc::clone(&polls),
        };
        let opener = RecordingOpener::new();
        let dashboard = Dashboard::new(RecordingSurface::new(), opener.clone());
        let (tx, rx) = button_channel();
        let args = DaemonArgs {
            interval,
            quiet: true,
            ..DaemonArgs::default()
        };
        let daemon = DashpadDaemon::init(
            dashboard,
            Box::new(source),
            rx,
            logger,
            SignalHandler::unregistered(),
            args,
        )
        .unwrap();
        (daemon, tx, opener, polls)
    }

    /// Tick until `done` holds or a few seconds pass.
    fn tick_until(daemon: &mut Daemon, done: impl Fn(&Daemon) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(daemon) && Instant::now() < deadline {
            daemon.tick(Duration::from_millis(20)).unwrap();
        }
        assert!(done(daemon), "condition not reached before deadline");
    }

    fn pos(x: u8, y: u8) -> GridPos {
        GridPos::new(x, y).unwrap()
    }

    #[test]
    fn first_poll_applies_state() {
        let (mut daemon, _tx, _, polls) =
            daemon_with(vec![Ok(one_tab_state("http://x"))], Duration::from_secs(60));
        tick_until(&mut daemon, |d| d.dashboard().state().is_some());

        assert_eq!(*polls.lock(), 1);
        assert_eq!(daemon.dashboard().actions().len(), 2);
        assert!(!daemon.schedule().in_flight());
    }

    #[test]
    fn failed_poll_keeps_last_good_state_and_reschedules_once() {
        let (mut daemon, _tx, _, polls) = daemon_with(
            vec![
                Ok(one_tab_state("http://x")),
                Err(DashpadError::CommandFailed {
                    command: "false".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                }),
            ],
            Duration::from_millis(50),
        );
        tick_until(&mut daemon, |d| d.dashboard().state().is_some());
        let shown = daemon.dashboard().surface().lit(Layer::Content);

        tick_until(&mut daemon, |_| *polls.lock() >= 2);
        tick_until(&mut daemon, |d| !d.schedule().in_flight());

        assert_eq!(*polls.lock(), 2);
        assert_eq!(daemon.dashboard().surface().lit(Layer::Content), shown);
        assert_eq!(daemon.dashboard().selected_tab(), Some(0));
        assert!(daemon.schedule().next_due().is_some());
    }

    #[test]
    fn failure_outcome_schedules_next_poll_one_interval_out() {
        let interval = Duration::from_secs(60);
        let (mut daemon, _tx, _, _) = daemon_with(vec![], interval);
        let before = Instant::now();
        daemon.apply_poll_outcome(PollOutcome {
            result: Err(DashpadError::HttpStatus {
                url: "http://x".to_string(),
                status: 503,
            }),
            elapsed: Duration::from_millis(3),
        });
        let due = daemon.schedule().next_due().unwrap();
        assert!(due >= before + interval);
        assert!(daemon.dashboard().state().is_none());
    }

    #[test]
    fn button_events_reach_the_engine() {
        let (mut daemon, tx, opener, _) =
            daemon_with(vec![Ok(one_tab_state("http://x"))], Duration::from_secs(60));
        tick_until(&mut daemon, |d| d.dashboard().state().is_some());

        tx.send(ButtonEvent::Down(pos(0, 1))).unwrap();
        tx.send(ButtonEvent::Up(pos(0, 1))).unwrap();
        tick_until(&mut daemon, |_| !opener.opened().is_empty());
        assert_eq!(opener.opened(), vec!["http://x".to_string()]);
    }

    #[test]
    fn tab_switch_is_logged_even_when_redraw_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (logger, join) = spawn_logger(ActivityLoggerConfig {
            jsonl_config: JsonlConfig {
                path: dir.path().join("activity.jsonl"),
                fallback_path: None,
                max_size_bytes: 1024 * 1024,
                max_rotated_files: 1,
                fsync_interval_secs: 60,
            },
            channel_capacity: 64,
        })
        .unwrap();
        let (mut daemon, _tx, _, _) =
            daemon_logging_to(vec![], Duration::from_secs(3600), logger.clone());

        let mut state = one_tab_state("http://x");
        state.tabs.push(Tab {
            color: Color::Solid { palette_color: 7 },
            selected_color: None,
            body: TabBody::List { buttons: vec![] },
        });
        daemon.apply_poll_outcome(PollOutcome {
            result: Ok(state),
            elapsed: Duration::from_millis(1),
        });
        assert_eq!(daemon.dashboard().selected_tab(), Some(0));

        daemon.dashboard_mut().surface_mut().set_fail_flushes(true);
        // Re-selecting the current tab changes nothing.
        daemon.handle_button(ButtonEvent::Up(pos(0, 0)));
        assert_eq!(daemon.dashboard().selected_tab(), Some(0));
        daemon.handle_button(ButtonEvent::Up(pos(1, 0)));
        assert_eq!(daemon.dashboard().selected_tab(), Some(1));

        logger.shutdown();
        join.join().unwrap();
        let lines: Vec<serde_json::Value> =
            std::fs::read_to_string(dir.path().join("activity.jsonl"))
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect();
        assert!(lines.iter().any(|l| l["event"] == "device_error"));
        let selected: Vec<_> = lines
            .iter()
            .filter(|l| l["event"] == "tab_selected")
            .collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["tab"], 1);
    }

    #[test]
    fn poll_failure_note_mentions_retry_for_transient_errors() {
        let transient = DashpadError::HttpStatus {
            url: "http://x".to_string(),
            status: 503,
        };
        let note = poll_failure_note(&transient, Duration::from_secs(30));
        assert!(note.starts_with("[DP-2004]"), "{note}");
        assert!(note.ends_with("retrying in 30s"), "{note}");

        let fatal = DashpadError::DeviceNotFound {
            details: "no ports".to_string(),
        };
        let note = poll_failure_note(&fatal, Duration::from_secs(30));
        assert!(!note.contains("retrying"), "{note}");
    }

    #[test]
    fn shutdown_request_stops_loop_and_blanks_grid() {
        let (mut daemon, _tx, _, _) =
            daemon_with(vec![Ok(one_tab_state("http://x"))], Duration::from_secs(60));
        tick_until(&mut daemon, |d| d.dashboard().state().is_some());

        daemon.signals().request_shutdown();
        daemon.run().unwrap();
        assert!(daemon.dashboard().surface().lit(Layer::Content).is_empty());
    }

    #[test]
    fn dropped_input_channel_is_fatal() {
        let (mut daemon, tx, _, _) = daemon_with(vec![], Duration::from_secs(60));
        drop(tx);
        let err = daemon.run().unwrap_err();
        assert_eq!(err.code(), "DP-3003");
    }
}
