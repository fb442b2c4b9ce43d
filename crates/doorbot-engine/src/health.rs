//! Health monitoring.
//!
//! Every interval the monitor samples a [`HealthProbe`] and evaluates each
//! [`HealthCondition`]. Alerts are edge-triggered per condition:
//!
//! ```text
//!  status:    F ──► T ──► T ──► F ──► T
//!  announce:        ✓                 ✓
//! ```
//!
//! A false→true edge announces once. A failed announcement leaves the alert
//! un-notified, so the next tick retries. A true→false edge resets silently.
//!
//! The front panel status LED blinks the position of the first active
//! condition in [`HealthCondition::ALL`]: one blink for the error log, two
//! for stale records, then a pause.

#![allow(async_fn_in_trait)]

use crate::ports::Notifier;
use doorbot_core::constants::{
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_STALE_AFTER_SECS, STATUS_BLINK_PAUSE_STEPS,
};
use doorbot_hardware::Level;
use doorbot_storage::RecordStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Monitored conditions, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCondition {
    /// The external error log is non-empty.
    ErrorLog,
    /// The membership snapshot is older than the threshold, or missing.
    StaleRecords,
}

impl HealthCondition {
    /// All conditions, highest priority first.
    pub const ALL: [HealthCondition; 2] =
        [HealthCondition::ErrorLog, HealthCondition::StaleRecords];

    /// Position in [`ALL`](Self::ALL).
    pub fn ordinal(self) -> usize {
        match self {
            HealthCondition::ErrorLog => 0,
            HealthCondition::StaleRecords => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthCondition::ErrorLog => "error_log",
            HealthCondition::StaleRecords => "stale_records",
        }
    }
}

impl fmt::Display for HealthCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert state of one condition.
///
/// `notified` is only ever true while `status` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub status: bool,
    pub notified: bool,
}

impl AlertState {
    /// Apply a new status. Returns `true` if an announcement is due.
    fn update(&mut self, status: bool) -> bool {
        self.status = status;
        if !status {
            self.notified = false;
        }
        self.status && !self.notified
    }
}

/// Raw readings taken by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSample {
    /// Size of the error log in bytes; zero when absent.
    pub error_log_bytes: u64,
    /// Age of the record snapshot, `None` when it cannot be determined.
    pub records_age: Option<Duration>,
}

/// Source of health readings.
pub trait HealthProbe: Send + Sync {
    async fn sample(&self) -> HealthSample;
}

/// Probe over the error log file and the record store.
#[derive(Debug, Clone)]
pub struct FileHealthProbe<S> {
    error_log: PathBuf,
    store: S,
}

impl<S: RecordStore> FileHealthProbe<S> {
    pub fn new(error_log: impl Into<PathBuf>, store: S) -> Self {
        Self {
            error_log: error_log.into(),
            store,
        }
    }
}

impl<S: RecordStore> HealthProbe for FileHealthProbe<S> {
    async fn sample(&self) -> HealthSample {
        let error_log_bytes = tokio::fs::metadata(&self.error_log)
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let records_age = match self.store.age().await {
            Ok(age) => Some(age),
            Err(e) => {
                debug!(action = "HEALTH", "record snapshot age unavailable: {}", e);
                None
            }
        };
        HealthSample {
            error_log_bytes,
            records_age,
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    pub interval: Duration,
    pub stale_after: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_HEALTH_INTERVAL_SECS),
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
        }
    }
}

/// Active conditions after a tick, highest priority first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub active: Vec<HealthCondition>,
}

impl HealthReport {
    /// Highest-priority active condition.
    pub fn first(&self) -> Option<HealthCondition> {
        self.active.first().copied()
    }

    pub fn contains(&self, condition: HealthCondition) -> bool {
        self.active.contains(&condition)
    }
}

/// Edge-triggered alert state for every [`HealthCondition`].
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    alerts: [AlertState; 2],
    stale_after: Duration,
}

impl HealthMonitor {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            alerts: Default::default(),
            stale_after,
        }
    }

    /// Record the current status of `condition`. Returns `true` if an
    /// announcement is due.
    pub fn observe(&mut self, condition: HealthCondition, status: bool) -> bool {
        let alert = &mut self.alerts[condition.ordinal()];
        let was = alert.status;
        let due = alert.update(status);
        if was != status {
            info!(action = "HEALTH", %condition, active = status, "health condition changed");
        }
        due
    }

    /// Mark a successful announcement. Ignored if the condition cleared.
    pub fn mark_notified(&mut self, condition: HealthCondition) {
        let alert = &mut self.alerts[condition.ordinal()];
        if alert.status {
            alert.notified = true;
        }
    }

    pub fn alert(&self, condition: HealthCondition) -> AlertState {
        self.alerts[condition.ordinal()]
    }

    /// Active conditions, highest priority first.
    pub fn report(&self) -> HealthReport {
        HealthReport {
            active: HealthCondition::ALL
                .into_iter()
                .filter(|c| self.alerts[c.ordinal()].status)
                .collect(),
        }
    }

    /// Sample the probe, update every condition and announce new alerts.
    pub async fn tick<P, N>(&mut self, probe: &P, notifier: &N) -> HealthReport
    where
        P: HealthProbe,
        N: Notifier,
    {
        let sample = probe.sample().await;

        for condition in HealthCondition::ALL {
            let status = self.evaluate(condition, &sample);
            if !self.observe(condition, status) {
                continue;
            }
            let details = describe(condition, &sample);
            match notifier.announce_error(condition.as_str(), &details).await {
                Ok(()) => self.mark_notified(condition),
                Err(e) => warn!(
                    action = "HEALTH",
                    %condition,
                    "alert not delivered, retrying next tick: {}",
                    e
                ),
            }
        }

        self.report()
    }

    fn evaluate(&self, condition: HealthCondition, sample: &HealthSample) -> bool {
        match condition {
            HealthCondition::ErrorLog => sample.error_log_bytes > 0,
            HealthCondition::StaleRecords => sample
                .records_age
                .is_none_or(|age| age > self.stale_after),
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_STALE_AFTER_SECS))
    }
}

fn describe(condition: HealthCondition, sample: &HealthSample) -> String {
    match condition {
        HealthCondition::ErrorLog => format!(
            "Error log holds {} bytes. No further error alerts until it is cleared.",
            sample.error_log_bytes
        ),
        HealthCondition::StaleRecords => match sample.records_age {
            Some(age) => format!(
                "Member list was last updated {} minutes ago.",
                age.as_secs() / 60
            ),
            None => "Member list is missing or unreadable.".to_string(),
        },
    }
}

/// Run the monitor every `config.interval` and forward each report.
///
/// The first tick runs immediately. Returns once the report receiver is gone.
pub async fn run_health<P, N>(
    mut monitor: HealthMonitor,
    probe: &P,
    notifier: &N,
    config: HealthConfig,
    reports: mpsc::Sender<HealthReport>,
) where
    P: HealthProbe,
    N: Notifier,
{
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let report = monitor.tick(probe, notifier).await;
        if reports.send(report).await.is_err() {
            debug!("controller gone, health loop exiting");
            return;
        }
    }
}

/// Blink pattern for the status LED.
///
/// Advanced once per blink step by the controller. With `n` blinks the
/// pattern is `n` on/off pairs followed by a pause.
#[derive(Debug, Clone, Default)]
pub struct StatusIndicator {
    blinks: usize,
    position: usize,
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `condition`, or nothing. Restarts the pattern on change.
    pub fn show(&mut self, condition: Option<HealthCondition>) {
        let blinks = condition.map_or(0, |c| c.ordinal() + 1);
        if blinks != self.blinks {
            self.blinks = blinks;
            self.position = 0;
        }
    }

    pub fn blinks(&self) -> usize {
        self.blinks
    }

    /// Level for the current step, then advance.
    pub fn step(&mut self) -> Level {
        if self.blinks == 0 {
            return Level::Idle;
        }
        let period = self.blinks * 2 + STATUS_BLINK_PAUSE_STEPS;
        let level = Level::from(self.position < self.blinks * 2 && self.position % 2 == 0);
        self.position = (self.position + 1) % period;
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, Recorder};
    use std::sync::Mutex;

    /// Probe returning queued samples, repeating the last one.
    struct ScriptedProbe {
        samples: Mutex<Vec<HealthSample>>,
    }

    impl ScriptedProbe {
        fn new(mut samples: Vec<HealthSample>) -> Self {
            samples.reverse();
            Self {
                samples: Mutex::new(samples),
            }
        }
    }

    impl HealthProbe for ScriptedProbe {
        async fn sample(&self) -> HealthSample {
            let mut samples = self.samples.lock().unwrap();
            if samples.len() > 1 {
                samples.pop().unwrap()
            } else {
                samples[0]
            }
        }
    }

    fn sample(error_log_bytes: u64, age_secs: Option<u64>) -> HealthSample {
        HealthSample {
            error_log_bytes,
            records_age: age_secs.map(Duration::from_secs),
        }
    }

    fn healthy() -> HealthSample {
        sample(0, Some(60))
    }

    #[test]
    fn test_edge_sequence_announces_twice() {
        let mut monitor = HealthMonitor::default();
        let mut announcements = 0;

        for status in [false, true, true, false, true] {
            if monitor.observe(HealthCondition::ErrorLog, status) {
                announcements += 1;
                monitor.mark_notified(HealthCondition::ErrorLog);
            }
        }
        assert_eq!(announcements, 2);
    }

    #[test]
    fn test_clearing_resets_notified() {
        let mut monitor = HealthMonitor::default();

        monitor.observe(HealthCondition::StaleRecords, true);
        monitor.mark_notified(HealthCondition::StaleRecords);
        monitor.observe(HealthCondition::StaleRecords, false);

        assert_eq!(
            monitor.alert(HealthCondition::StaleRecords),
            AlertState {
                status: false,
                notified: false
            }
        );
        monitor.mark_notified(HealthCondition::StaleRecords);
        assert!(!monitor.alert(HealthCondition::StaleRecords).notified);
    }

    #[tokio::test]
    async fn test_tick_announces_on_rising_edge_only() {
        let recorder = Recorder::new();
        let probe = ScriptedProbe::new(vec![
            healthy(),
            sample(120, Some(60)),
            sample(240, Some(60)),
            healthy(),
            sample(80, Some(60)),
        ]);
        let mut monitor = HealthMonitor::default();

        for _ in 0..5 {
            monitor.tick(&probe, &recorder).await;
        }

        let errors = recorder.errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], Call::Error { kind, .. } if kind == "error_log"));
    }

    #[tokio::test]
    async fn test_failed_announcement_retries() {
        let recorder = Recorder::new();
        recorder.fail_all(true);
        let probe = ScriptedProbe::new(vec![sample(10, Some(60))]);
        let mut monitor = HealthMonitor::default();

        monitor.tick(&probe, &recorder).await;
        assert!(!monitor.alert(HealthCondition::ErrorLog).notified);

        recorder.fail_all(false);
        monitor.tick(&probe, &recorder).await;
        assert!(monitor.alert(HealthCondition::ErrorLog).notified);

        monitor.tick(&probe, &recorder).await;
        assert_eq!(recorder.errors().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_and_missing_records() {
        let recorder = Recorder::new();
        let mut monitor = HealthMonitor::new(Duration::from_secs(3600));

        let fresh = ScriptedProbe::new(vec![sample(0, Some(3600))]);
        assert!(monitor.tick(&fresh, &recorder).await.active.is_empty());

        let stale = ScriptedProbe::new(vec![sample(0, Some(3601))]);
        let report = monitor.tick(&stale, &recorder).await;
        assert_eq!(report.first(), Some(HealthCondition::StaleRecords));

        let mut monitor = HealthMonitor::default();
        let missing = ScriptedProbe::new(vec![sample(0, None)]);
        assert!(
            monitor
                .tick(&missing, &recorder)
                .await
                .contains(HealthCondition::StaleRecords)
        );
    }

    #[tokio::test]
    async fn test_report_priority_order() {
        let recorder = Recorder::new();
        let probe = ScriptedProbe::new(vec![sample(5, None)]);
        let mut monitor = HealthMonitor::default();

        let report = monitor.tick(&probe, &recorder).await;
        assert_eq!(
            report.active,
            vec![HealthCondition::ErrorLog, HealthCondition::StaleRecords]
        );
        assert_eq!(report.first(), Some(HealthCondition::ErrorLog));
    }

    #[tokio::test]
    async fn test_file_probe() {
        use doorbot_storage::MemoryRecordStore;

        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("access.log");
        let store = MemoryRecordStore::default();
        store.set_age(Duration::from_secs(42));
        let probe = FileHealthProbe::new(&log, store.clone());

        assert_eq!(probe.sample().await, sample(0, Some(42)));

        std::fs::write(&log, "boom\n").unwrap();
        store.set_failure(Some("gone"));
        assert_eq!(probe.sample().await, sample(5, None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_health_forwards_reports() {
        let recorder = Recorder::new();
        let probe = ScriptedProbe::new(vec![sample(1, Some(0))]);
        let (tx, mut rx) = mpsc::channel(4);
        let config = HealthConfig {
            interval: Duration::from_secs(300),
            ..HealthConfig::default()
        };

        let reader = async {
            let first = rx.recv().await.unwrap();
            let second = rx.recv().await.unwrap();
            drop(rx);
            (first, second)
        };
        let (_, (first, second)) = tokio::join!(
            run_health(HealthMonitor::default(), &probe, &recorder, config, tx),
            reader
        );

        assert!(first.contains(HealthCondition::ErrorLog));
        assert_eq!(first, second);
        assert_eq!(recorder.errors().len(), 1);
    }

    #[test]
    fn test_status_pattern() {
        let mut indicator = StatusIndicator::new();
        assert_eq!(indicator.step(), Level::Idle);

        indicator.show(Some(HealthCondition::StaleRecords));
        let pattern: Vec<bool> = (0..10).map(|_| indicator.step().is_active()).collect();
        assert_eq!(
            pattern,
            vec![true, false, true, false, false, false, false, false, false, false]
        );
        // Period restarts.
        assert!(indicator.step().is_active());

        indicator.show(Some(HealthCondition::ErrorLog));
        assert_eq!(indicator.blinks(), 1);
        let pattern: Vec<bool> = (0..9).map(|_| indicator.step().is_active()).collect();
        assert_eq!(
            pattern,
            vec![true, false, false, false, false, false, false, false, true]
        );
    }
}
