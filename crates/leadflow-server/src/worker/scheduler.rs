//! Fixed-interval agent scheduler.
//!
//! Each configured agent runs on its own interval, first one full interval
//! after the scheduler starts. A failing run is logged and the next tick
//! proceeds as usual.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use leadflow_agents::{AgentKind, AgentRunner};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// Tracing target for scheduler operations.
const TRACING_TARGET: &str = "leadflow_server::worker::scheduler";

/// Longest accepted interval: one year.
const MAX_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// One scheduled agent, written as `agent:minutes` (e.g. `score:60`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub agent: AgentKind,
    pub interval: Duration,
}

impl ScheduleEntry {
    /// Creates an entry; the interval must be positive and at most a year.
    pub fn new(agent: AgentKind, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::config(format!(
                "interval of agent '{agent}' must be positive"
            )));
        }
        if interval > MAX_INTERVAL {
            return Err(Error::config(format!(
                "interval of agent '{agent}' must not exceed {} minutes",
                MAX_INTERVAL.as_secs() / 60
            )));
        }
        Ok(Self { agent, interval })
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agent, self.interval.as_secs() / 60)
    }
}

impl FromStr for ScheduleEntry {
    type Err = Error;

    fn from_str(entry: &str) -> Result<Self> {
        let (agent, minutes) = entry
            .split_once(':')
            .ok_or_else(|| Error::config(format!("schedule entry '{entry}' is not agent:minutes")))?;
        let minutes: u64 = minutes
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("schedule entry '{entry}' has no whole minutes")))?;
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| Error::config(format!("schedule entry '{entry}' is out of range")))?;
        Self::new(agent.parse()?, Duration::from_secs(secs))
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SchedulerConfig {
    /// Agents to run periodically, e.g. `score:60,offer:120`.
    #[cfg_attr(
        feature = "config",
        arg(long = "schedule", env = "AGENT_SCHEDULE", value_delimiter = ',')
    )]
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,

    /// Records processed per scheduled run.
    #[cfg_attr(feature = "config", arg(long = "schedule-limit", env = "AGENT_SCHEDULE_LIMIT"))]
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SchedulerConfig {
    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }
}

/// Runs agents at fixed intervals until cancelled.
#[derive(Debug, Clone)]
pub struct AgentScheduler {
    runner: AgentRunner,
    config: SchedulerConfig,
}

impl AgentScheduler {
    pub fn new(runner: AgentRunner, config: SchedulerConfig) -> Self {
        Self { runner, config }
    }

    /// Runs every scheduled agent until `cancel` fires.
    ///
    /// Cancellation also reaches a run in progress, which stops at its next
    /// record or record store request.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            target: TRACING_TARGET,
            jobs = self.config.schedule.len(),
            "Starting agent scheduler"
        );

        let mut jobs = JoinSet::new();
        for entry in self.config.schedule.iter().copied() {
            let runner = self.runner.clone();
            let cancel = cancel.clone();
            let limit = self.config.limit;
            jobs.spawn(async move { run_job(runner, entry, limit, cancel).await });
        }
        while jobs.join_next().await.is_some() {}

        tracing::info!(target: TRACING_TARGET, "Agent scheduler stopped");
    }
}

async fn run_job(
    runner: AgentRunner,
    entry: ScheduleEntry,
    limit: Option<usize>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + entry.interval, entry.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match runner.run_kind(entry.agent, limit, &cancel).await {
            Ok(summary) => tracing::info!(
                target: TRACING_TARGET,
                agent = %entry.agent,
                processed = summary.processed,
                success = summary.success,
                failed = summary.failed,
                "Scheduled run completed"
            ),
            Err(error) => tracing::error!(
                target: TRACING_TARGET,
                agent = %entry.agent,
                error = %error,
                "Scheduled run failed"
            ),
        }
    }
}
