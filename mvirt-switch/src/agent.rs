//! Switch agent: fetches desired and actual state on a fixed cadence,
//! reconciles them and applies the resulting directives.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::clients::{ActualStateProvider, Actuator, DesiredStateProvider, LivenessReporter};
use crate::config::{Config, DEFAULT_POLL_INTERVAL, FetchErrorPolicy, POLL_STEP};
use crate::error::{ActuationError, ProviderError};
use crate::model::Directive;
use crate::reconciler::reconcile;

/// Loop behavior.
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub poll_interval: Duration,
    pub poll_step: Duration,
    pub on_fetch_error: FetchErrorPolicy,
    pub dry_run: bool,
    pub once: bool,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_step: POLL_STEP,
            on_fetch_error: FetchErrorPolicy::default(),
            dry_run: false,
            once: false,
        }
    }
}

impl From<&Config> for AgentOptions {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval,
            poll_step: config.poll_step,
            on_fetch_error: config.on_fetch_error,
            dry_run: config.dry_run,
            once: config.once,
        }
    }
}

/// Outcome of one cycle that got past both fetches.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub directives: Vec<Directive>,
    pub applied: usize,
    pub failures: Vec<ActuationError>,
}

impl CycleReport {
    /// Every directive was applied (or there was nothing to do).
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Agent driving one host's VMs from a desired-state source.
pub struct SwitchAgent<D, A, X> {
    desired: D,
    actual: A,
    actuator: X,
    liveness: Option<Box<dyn LivenessReporter>>,
    options: AgentOptions,
}

impl<D, A, X> SwitchAgent<D, A, X>
where
    D: DesiredStateProvider,
    A: ActualStateProvider,
    X: Actuator,
{
    pub fn new(desired: D, actual: A, actuator: X, options: AgentOptions) -> Self {
        Self {
            desired,
            actual,
            actuator,
            liveness: None,
            options,
        }
    }

    /// Report liveness after each successful cycle.
    pub fn with_liveness(mut self, reporter: impl LivenessReporter + 'static) -> Self {
        self.liveness = Some(Box::new(reporter));
        self
    }

    /// Run a single fetch → reconcile → apply pass.
    ///
    /// Fetch failures abort the cycle. Actuation failures are collected in
    /// the report and do not stop the remaining directives.
    pub async fn run_cycle(&self) -> Result<CycleReport, ProviderError> {
        let desired = self.desired.fetch().await?;
        let actual = self.actual.fetch().await?;
        debug!(?desired, ?actual, "Fetched state");

        let directives = reconcile(&desired, &actual);
        let mut report = CycleReport::default();

        for directive in &directives {
            if self.options.dry_run {
                info!("Dry run, not applying: {}", directive);
                continue;
            }
            match self.actuator.apply(directive).await {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    error!("Failed to {} VM {}: {}", e.action(), e.handle(), e);
                    report.failures.push(e);
                }
            }
        }

        if !directives.is_empty() {
            info!(
                "Cycle done: {} directives, {} applied, {} failed",
                directives.len(),
                report.applied,
                report.failures.len()
            );
        }

        report.directives = directives;
        Ok(report)
    }

    async fn report_liveness(&self) {
        if let Some(reporter) = &self.liveness {
            if let Err(e) = reporter.report().await {
                warn!("Liveness report failed: {:#}", e);
            }
        }
    }

    /// Main loop. Cycles start every `poll_interval` until `shutdown`
    /// resolves. Shutdown takes effect immediately, abandoning an in-flight
    /// cycle.
    pub async fn run<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, abandoning current cycle");
                    return Ok(());
                }
                outcome = self.run_cycle() => outcome,
            };

            match outcome {
                Ok(report) if report.is_clean() => self.report_liveness().await,
                Ok(report) => {
                    let handles: Vec<String> = report
                        .failures
                        .iter()
                        .map(|e| format!("{} {}", e.action(), e.handle()))
                        .collect();
                    warn!(
                        "{} of {} directives failed ({}), skipping liveness report",
                        report.failures.len(),
                        report.directives.len(),
                        handles.join(", ")
                    );
                }
                Err(e)
                    if self.options.once
                        || self.options.on_fetch_error == FetchErrorPolicy::Exit =>
                {
                    return Err(e.into());
                }
                Err(e) => warn!("Skipping cycle: {}", e),
            }

            if self.options.once {
                return Ok(());
            }

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping");
                    return Ok(());
                }
                _ = wait_for_next_cycle(started, self.options.poll_interval, self.options.poll_step) => {}
            }
        }
    }
}

/// Time left until `interval` has passed, never negative.
pub fn remaining(elapsed: Duration, interval: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

/// Sleep in `step` increments until `interval` has elapsed since `started`.
/// Returns immediately if the cycle already overran.
pub async fn wait_for_next_cycle(started: Instant, interval: Duration, step: Duration) {
    loop {
        let left = remaining(started.elapsed(), interval);
        if left.is_zero() {
            break;
        }
        let nap = if step.is_zero() { left } else { left.min(step) };
        sleep(nap).await;
    }
}
