//! Lifecycle status state machine.
//!
//! [`StatusTracker`] is the single owner of the current status, the
//! "is active" flag, the idle poller and the activity log. Signals are applied
//! one at a time through [`StatusTracker::handle`]; every mutation for a
//! signal completes before the next one is looked at.
//!
//! The controller's own state is the source of truth for "active". Other
//! signals only log. Transitions into `active` are guarded on the previous
//! `is_active` value so overlapping signals (a controller change right after a
//! periodic poll already saw the controller) never log "Active" twice.

use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::display::{Counters, Labels, Locale};
use crate::event_log::EventLog;
use crate::poller::{IdlePoller, DEFAULT_IDLE_PERIOD};
use crate::signal::{Controller, Signal, WorkerMessage};
use crate::status::StatusKind;

/// Construction options for a [`StatusTracker`].
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub idle_period: Duration,
    pub idle_logging: bool,
    /// `None` keeps every entry.
    pub log_capacity: Option<usize>,
    pub locale: Locale,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            idle_period: DEFAULT_IDLE_PERIOD,
            idle_logging: true,
            log_capacity: None,
            locale: Locale::En,
        }
    }
}

/// Status half of the tracker state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    /// Last status applied; `None` until the first status-bearing signal.
    pub current_status: Option<StatusKind>,
    pub is_active: bool,
    pub status_text: String,
    /// Set once the host reports no worker support; no further signals apply.
    pub halted: bool,
}

pub struct StatusTracker {
    state: TrackerState,
    /// Set by the first signal applied; the capability check only counts before it.
    started: bool,
    poller: IdlePoller,
    log: EventLog,
    labels: &'static Labels,
}

impl StatusTracker {
    pub fn new(options: TrackerOptions, clock: Box<dyn Clock>) -> Self {
        let labels = Labels::for_locale(options.locale);
        Self {
            state: TrackerState::default(),
            started: false,
            poller: IdlePoller::new(options.idle_period, options.idle_logging, labels.idle),
            log: EventLog::new(options.log_capacity, clock),
            labels,
        }
    }

    /// Apply one lifecycle signal.
    pub fn handle(&mut self, signal: Signal, now: Instant) {
        if self.state.halted {
            tracing::warn!(signal = signal.label(), "tracker halted; signal dropped");
            return;
        }

        if self.started && signal == Signal::UnsupportedEnvironment {
            tracing::warn!("unsupported environment reported mid-session; ignored");
            return;
        }
        self.started = true;

        tracing::debug!(signal = signal.label(), "handling signal");

        match signal {
            Signal::RegistrationSucceeded { controller } => {
                self.log.append(self.labels.registered, StatusKind::Registered);
                self.set_status(StatusKind::Registered, self.labels.registered);
                if controller.is_some() {
                    self.confirm_active("registration");
                }
            }
            Signal::RegistrationFailed { reason } => {
                tracing::warn!(%reason, "worker registration failed");
                self.log
                    .append(self.labels.registration_error, StatusKind::Error);
                self.set_status(StatusKind::Error, self.labels.registration_error);
            }
            Signal::UpdateFound { installing } => {
                if installing {
                    self.log
                        .append(self.labels.installed_waiting, StatusKind::Installed);
                }
            }
            Signal::Message {
                message,
                controller,
            } => self.apply_message(message, controller),
            Signal::ControllerChange { controller } => {
                if controller.is_some() {
                    self.confirm_active("controller_change");
                }
            }
            Signal::PeriodicPoll { controller } => match (controller, self.state.is_active) {
                (None, true) => {
                    self.state.is_active = false;
                    self.poller.start(now, &mut self.log);
                    self.set_status(StatusKind::Idle, self.labels.idle);
                    tracing::info!("controller lost; worker idle");
                }
                (Some(_), false) => {
                    self.confirm_active("periodic_poll");
                }
                _ => {}
            },
            Signal::UnsupportedEnvironment => {
                self.log.append(self.labels.unsupported, StatusKind::Error);
                self.set_status(StatusKind::Error, self.labels.unsupported_status);
                self.state.is_active = false;
                self.state.halted = true;
                self.poller.stop();
                tracing::warn!("worker mechanism unsupported; tracking halted");
            }
        }
    }

    /// Drive time-based work (idle emission).
    pub fn tick(&mut self, now: Instant) {
        if self.state.halted {
            return;
        }
        self.poller.tick(now, &mut self.log);
    }

    /// Empty the activity log.
    pub fn clear_logs(&mut self) {
        self.log.clear();
        tracing::info!("activity log cleared");
    }

    /// Flip idle logging. Returns the new enabled state.
    pub fn toggle_idle_logging(&mut self, now: Instant) -> bool {
        if self.poller.is_enabled() {
            self.poller.disable();
        } else if self.state.halted {
            // Nothing to poll once the environment is known to be unsupported.
            self.poller.set_enabled(true);
        } else {
            self.poller.enable(now, self.state.is_active, &mut self.log);
        }
        let enabled = self.poller.is_enabled();
        tracing::info!(enabled, "idle logging toggled");
        enabled
    }

    fn apply_message(&mut self, message: WorkerMessage, controller: Option<Controller>) {
        if !message.is_log_event() {
            tracing::debug!(kind = %message.kind, "ignoring non log-event message");
            return;
        }
        let Some(raw_status) = message.status.as_deref() else {
            tracing::debug!("ignoring log-event message without status");
            return;
        };
        let status = match raw_status.parse::<StatusKind>() {
            Ok(status) => status,
            Err(err) => {
                tracing::debug!(%err, "ignoring log-event message");
                return;
            }
        };
        let name = message
            .name
            .clone()
            .unwrap_or_else(|| status.as_str().to_string());

        match status {
            StatusKind::Installed | StatusKind::Activating | StatusKind::Fetching => {
                self.log.append(name.clone(), status);
                self.set_status(status, &name);
                self.state.is_active = controller.is_some_and(|c| c.is_activated());
                self.poller.stop();
            }
            StatusKind::Registered => {
                self.log.append(name.clone(), status);
                self.set_status(status, &name);
            }
            other => {
                tracing::debug!(status = %other, "message status not tracked");
            }
        }
    }

    /// Mark the controller active, logging it only on the inactive edge.
    fn confirm_active(&mut self, source: &'static str) -> bool {
        if self.state.is_active {
            return false;
        }
        self.log.append(self.labels.active, StatusKind::Active);
        self.set_status(StatusKind::Active, self.labels.active);
        self.state.is_active = true;
        self.poller.stop();
        tracing::info!(source, "worker active");
        true
    }

    fn set_status(&mut self, status: StatusKind, text: &str) {
        self.state.current_status = Some(status);
        self.state.status_text = text.to_string();
        tracing::info!(status = %status, text, "status updated");
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn current_status(&self) -> Option<StatusKind> {
        self.state.current_status
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active
    }

    pub fn is_halted(&self) -> bool {
        self.state.halted
    }

    pub fn status_text(&self) -> &str {
        &self.state.status_text
    }

    /// The binary status indicator: on iff the current status is `active`.
    pub fn indicator_on(&self) -> bool {
        self.state.current_status.is_some_and(StatusKind::is_active)
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn poller(&self) -> &IdlePoller {
        &self.poller
    }

    pub fn labels(&self) -> &'static Labels {
        self.labels
    }

    pub fn counters(&self) -> Counters {
        Counters::from_log(&self.log, self.labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::display::events_label;
    use crate::signal::WorkerState;

    fn tracker() -> StatusTracker {
        StatusTracker::new(TrackerOptions::default(), Box::new(ManualClock::default()))
    }

    fn entries(t: &StatusTracker) -> Vec<(String, StatusKind)> {
        // Oldest first reads more naturally in assertions.
        let mut v: Vec<_> = t.log().entries().map(|e| (e.name.clone(), e.status)).collect();
        v.reverse();
        v
    }

    fn active() -> Option<Controller> {
        Some(Controller::activated())
    }

    fn msg(status: &str, name: &str, controller: Option<Controller>) -> Signal {
        Signal::Message {
            message: WorkerMessage::log_event(status, name),
            controller,
        }
    }

    #[test]
    fn registration_success_without_controller() {
        let mut t = tracker();
        t.handle(Signal::RegistrationSucceeded { controller: None }, Instant::now());
        assert_eq!(entries(&t), vec![("Registered".into(), StatusKind::Registered)]);
        assert_eq!(t.current_status(), Some(StatusKind::Registered));
        assert!(!t.is_active());
        assert!(!t.indicator_on());
    }

    #[test]
    fn scenario_b_registration_with_active_controller() {
        let mut t = tracker();
        t.handle(Signal::RegistrationSucceeded { controller: active() }, Instant::now());
        assert_eq!(
            entries(&t),
            vec![
                ("Registered".into(), StatusKind::Registered),
                ("Active".into(), StatusKind::Active),
            ]
        );
        assert!(t.is_active());
        assert!(t.indicator_on());
    }

    #[test]
    fn registration_failure_is_not_fatal() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(
            Signal::RegistrationFailed {
                reason: "SecurityError".into(),
            },
            now,
        );
        assert_eq!(t.current_status(), Some(StatusKind::Error));
        assert_eq!(t.status_text(), "Registration error");

        t.handle(Signal::ControllerChange { controller: active() }, now);
        assert_eq!(t.current_status(), Some(StatusKind::Active));
        assert_eq!(t.log().count(), 2);
    }

    #[test]
    fn update_found_logs_only_with_installing_worker() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(Signal::UpdateFound { installing: false }, now);
        assert_eq!(t.log().count(), 0);
        t.handle(Signal::UpdateFound { installing: true }, now);
        assert_eq!(entries(&t), vec![("Installed/waiting".into(), StatusKind::Installed)]);
        assert_eq!(t.current_status(), None);
    }

    #[test]
    fn scenario_c_installed_then_activating() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(msg("installed", "Installed", None), now);
        t.handle(msg("activating", "Activating", active()), now);

        assert_eq!(t.current_status(), Some(StatusKind::Activating));
        assert_eq!(t.status_text(), "Activating");
        assert!(t.is_active());
        assert!(!t.poller().is_running());
        assert_eq!(t.log().count(), 2);
    }

    #[test]
    fn message_with_non_activated_controller_is_inactive() {
        let mut t = tracker();
        let controller = Some(Controller::new(WorkerState::Activating));
        t.handle(msg("fetching", "GET /app.js", controller), Instant::now());
        assert_eq!(t.current_status(), Some(StatusKind::Fetching));
        assert!(!t.is_active());
    }

    #[test]
    fn message_stops_running_idle_poller() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, now);
        t.handle(Signal::PeriodicPoll { controller: None }, now);
        assert!(t.poller().is_running());

        t.handle(msg("fetching", "GET /", active()), now);
        assert!(!t.poller().is_running());
    }

    #[test]
    fn registered_message_updates_status_without_touching_active() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, now);
        t.handle(msg("registered", "SW registered", None), now);
        assert_eq!(t.current_status(), Some(StatusKind::Registered));
        assert!(t.is_active());
    }

    #[test]
    fn untracked_and_foreign_messages_are_ignored() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(msg("active", "Active", active()), now);
        t.handle(msg("idle", "Idle", None), now);
        t.handle(msg("bogus", "???", None), now);
        t.handle(
            Signal::Message {
                message: WorkerMessage {
                    kind: "PING".into(),
                    status: Some("installed".into()),
                    name: Some("x".into()),
                },
                controller: None,
            },
            now,
        );
        t.handle(
            Signal::Message {
                message: WorkerMessage {
                    kind: "LOG_EVENT".into(),
                    status: None,
                    name: Some("x".into()),
                },
                controller: None,
            },
            now,
        );
        assert_eq!(t.log().count(), 0);
        assert_eq!(t.current_status(), None);
    }

    #[test]
    fn message_without_name_falls_back_to_status() {
        let mut t = tracker();
        t.handle(
            Signal::Message {
                message: WorkerMessage {
                    kind: "LOG_EVENT".into(),
                    status: Some("installed".into()),
                    name: None,
                },
                controller: None,
            },
            Instant::now(),
        );
        assert_eq!(entries(&t), vec![("installed".into(), StatusKind::Installed)]);
    }

    #[test]
    fn no_duplicate_active_entries() {
        let mut t = tracker();
        let now = Instant::now();
        t.handle(Signal::PeriodicPoll { controller: active() }, now);
        t.handle(Signal::ControllerChange { controller: active() }, now);
        t.handle(Signal::PeriodicPoll { controller: active() }, now);
        t.handle(Signal::ControllerChange { controller: active() }, now);

        let actives = t
            .log()
            .entries()
            .filter(|e| e.status == StatusKind::Active)
            .count();
        assert_eq!(actives, 1);
    }

    #[test]
    fn controller_change_without_controller_is_noop() {
        let mut t = tracker();
        t.handle(Signal::ControllerChange { controller: None }, Instant::now());
        assert_eq!(t.log().count(), 0);
        assert!(!t.is_active());
    }

    #[test]
    fn scenario_a_no_idle_until_controller_lost() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::RegistrationSucceeded { controller: None }, t0);
        let after_registration = t.log().count();

        for i in 1..=3 {
            let now = t0 + Duration::from_millis(3000 * i);
            t.handle(Signal::PeriodicPoll { controller: None }, now);
            t.tick(now);
        }
        assert_eq!(t.log().count(), after_registration);
        assert!(!t.poller().is_running());

        // Once active and then lost, idle entries begin.
        let t1 = t0 + Duration::from_secs(12);
        t.handle(Signal::PeriodicPoll { controller: active() }, t1);
        t.handle(Signal::PeriodicPoll { controller: None }, t1 + Duration::from_secs(3));
        assert!(t.poller().is_running());
        assert_eq!(t.current_status(), Some(StatusKind::Idle));
        assert!(!t.is_active());
        assert_eq!(t.log().latest().map(|e| e.status), Some(StatusKind::Idle));
    }

    #[test]
    fn idle_entries_repeat_until_controller_returns() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, t0);
        t.handle(Signal::PeriodicPoll { controller: None }, t0);
        t.tick(t0 + Duration::from_millis(3000));
        t.tick(t0 + Duration::from_millis(6000));
        let idles = t.log().entries().filter(|e| e.status == StatusKind::Idle).count();
        assert_eq!(idles, 3);

        t.handle(Signal::PeriodicPoll { controller: active() }, t0 + Duration::from_millis(7000));
        assert!(!t.poller().is_running());
        let before = t.log().count();
        t.tick(t0 + Duration::from_millis(12000));
        assert_eq!(t.log().count(), before);
        assert_eq!(t.log().latest().map(|e| e.status), Some(StatusKind::Active));
    }

    #[test]
    fn scenario_d_unsupported_environment_halts() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::UnsupportedEnvironment, t0);
        assert_eq!(entries(&t), vec![("Browser not supported".into(), StatusKind::Error)]);
        assert!(!t.indicator_on());
        assert!(t.is_halted());

        t.handle(Signal::ControllerChange { controller: active() }, t0);
        t.handle(Signal::PeriodicPoll { controller: None }, t0);
        t.toggle_idle_logging(t0);
        t.toggle_idle_logging(t0);
        t.tick(t0 + Duration::from_secs(60));

        assert_eq!(t.log().count(), 1);
        assert!(!t.poller().is_running());
    }

    #[test]
    fn unsupported_after_startup_is_ignored() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::RegistrationSucceeded { controller: active() }, t0);
        t.handle(Signal::UnsupportedEnvironment, t0);

        assert!(!t.is_halted());
        assert_eq!(
            entries(&t),
            vec![
                ("Registered".into(), StatusKind::Registered),
                ("Active".into(), StatusKind::Active),
            ]
        );
        assert_eq!(t.current_status(), Some(StatusKind::Active));

        t.handle(Signal::PeriodicPoll { controller: None }, t0);
        assert!(t.poller().is_running());
    }

    #[test]
    fn scenario_e_toggle_off_stops_idle_entries() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, t0);
        t.handle(Signal::PeriodicPoll { controller: None }, t0);
        assert!(t.poller().is_running());
        let before = t.log().count();

        assert!(!t.toggle_idle_logging(t0 + Duration::from_millis(500)));
        assert!(!t.poller().is_running());
        t.tick(t0 + Duration::from_millis(3000));
        t.tick(t0 + Duration::from_millis(9000));
        assert_eq!(t.log().count(), before);
    }

    #[test]
    fn toggle_on_while_inactive_starts_immediately() {
        let mut t = tracker();
        let t0 = Instant::now();
        assert!(!t.toggle_idle_logging(t0));
        assert!(t.toggle_idle_logging(t0));
        assert!(t.poller().is_running());
        assert_eq!(entries(&t), vec![("Idle".into(), StatusKind::Idle)]);
    }

    #[test]
    fn toggle_on_while_active_does_not_start() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, t0);
        t.toggle_idle_logging(t0);
        t.toggle_idle_logging(t0);
        assert!(t.poller().is_enabled());
        assert!(!t.poller().is_running());
    }

    #[test]
    fn controller_lost_with_idle_disabled_logs_nothing() {
        let options = TrackerOptions {
            idle_logging: false,
            ..TrackerOptions::default()
        };
        let mut t = StatusTracker::new(options, Box::new(ManualClock::default()));
        let t0 = Instant::now();
        t.handle(Signal::ControllerChange { controller: active() }, t0);
        t.handle(Signal::PeriodicPoll { controller: None }, t0);
        assert_eq!(t.current_status(), Some(StatusKind::Idle));
        assert_eq!(t.log().count(), 1);
        assert!(!t.poller().is_running());
    }

    #[test]
    fn clear_logs_resets_counters() {
        let mut t = tracker();
        t.handle(Signal::RegistrationSucceeded { controller: active() }, Instant::now());
        t.clear_logs();
        let counters = t.counters();
        assert_eq!(t.log().count(), 0);
        assert_eq!(counters.total, 0);
        assert_eq!(counters.events_label, "0 events");
        // Status is not part of the log.
        assert_eq!(t.current_status(), Some(StatusKind::Active));
    }

    #[test]
    fn count_matches_appends_minus_clears() {
        let mut t = tracker();
        let t0 = Instant::now();
        let signals = vec![
            Signal::RegistrationSucceeded { controller: None },
            Signal::UpdateFound { installing: true },
            msg("installed", "Installed", None),
            msg("activating", "Activating", None),
            Signal::ControllerChange { controller: active() },
            Signal::ControllerChange { controller: active() },
            Signal::PeriodicPoll { controller: None },
        ];
        for s in signals {
            t.handle(s, t0);
        }
        // registered, installed/waiting, installed, activating, active, idle
        assert_eq!(t.log().count(), 6);
        assert_eq!(t.counters().events_label, events_label(6, t.labels()));

        t.clear_logs();
        t.handle(msg("fetching", "GET /", active()), t0);
        assert_eq!(t.log().count(), 1);
        assert_eq!(t.counters().events_label, "1 event");
    }

    #[test]
    fn update_found_and_installed_message_both_log() {
        let mut t = tracker();
        let t0 = Instant::now();
        t.handle(Signal::UpdateFound { installing: true }, t0);
        t.handle(msg("installed", "Installed", None), t0);
        let installed = t
            .log()
            .entries()
            .filter(|e| e.status == StatusKind::Installed)
            .count();
        assert_eq!(installed, 2);
    }

    #[test]
    fn running_poller_implies_enabled_and_inactive() {
        let mut t = tracker();
        let t0 = Instant::now();
        let steps = vec![
            Signal::ControllerChange { controller: active() },
            Signal::PeriodicPoll { controller: None },
            msg("installed", "Installed", None),
            Signal::PeriodicPoll { controller: active() },
            Signal::PeriodicPoll { controller: None },
            Signal::RegistrationSucceeded { controller: active() },
        ];
        for (i, s) in steps.into_iter().enumerate() {
            t.handle(s, t0 + Duration::from_millis(i as u64 * 1000));
            if t.poller().is_running() {
                assert!(t.poller().is_enabled());
                assert!(!t.is_active());
            }
        }
    }

    #[test]
    fn spanish_labels() {
        let options = TrackerOptions {
            locale: Locale::Es,
            ..TrackerOptions::default()
        };
        let mut t = StatusTracker::new(options, Box::new(ManualClock::default()));
        t.handle(Signal::RegistrationSucceeded { controller: active() }, Instant::now());
        assert_eq!(
            entries(&t),
            vec![
                ("Registrado".into(), StatusKind::Registered),
                ("Activo".into(), StatusKind::Active),
            ]
        );
        assert_eq!(t.counters().events_label, "2 eventos");
    }
}
