//! Job lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};
use crate::store::Key;

/// Lifecycle state of a job. Every state but `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Running,
    Cancelled,
    Failed,
    Done,
}

impl JobState {
    #[inline]
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: JobState,
    ended: Option<Instant>,
}

/// A unit of work owned by one caller: a training run or a scoring call.
///
/// The job is the source of truth for its state and timing. Cancellation is
/// a request flag that workers poll; [`Job::cancel`] also moves the job to
/// `Cancelled` if it is still running.
#[derive(Debug)]
pub struct Job {
    key: Key,
    start_time: SystemTime,
    started: Instant,
    lifecycle: Mutex<Lifecycle>,
    cancel_requested: AtomicBool,
}

/// Read-only copy of a job's status at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub state: JobState,
    /// Start time in milliseconds since the Unix epoch.
    pub start_time_ms: u64,
    /// Run time so far, or total run time once terminal.
    pub duration_ms: u64,
}

impl Job {
    /// Start a new running job.
    pub fn start(key: impl Into<Key>) -> Self {
        Self {
            key: key.into(),
            start_time: SystemTime::now(),
            started: Instant::now(),
            lifecycle: Mutex::new(Lifecycle {
                state: JobState::Running,
                ended: None,
            }),
            cancel_requested: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn state(&self) -> JobState {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// Request cancellation. Returns `true` if the job was running.
    ///
    /// A job that already finished is left alone: its state stays put and
    /// the cancellation flag stays clear.
    pub fn cancel(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if lifecycle.state.is_terminal() {
            return false;
        }
        lifecycle.state = JobState::Cancelled;
        lifecycle.ended = Some(Instant::now());
        self.cancel_requested.store(true, Ordering::Release);
        true
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Mark the job as finished.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidTransition`] if the job already left `Running`.
    pub fn done(&self) -> Result<()> {
        self.transition(JobState::Done)
    }

    /// Mark the job as failed.
    ///
    /// # Errors
    ///
    /// [`ScoreError::InvalidTransition`] if the job already left `Running`.
    pub fn fail(&self) -> Result<()> {
        self.transition(JobState::Failed)
    }

    fn transition(&self, to: JobState) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if lifecycle.state.is_terminal() {
            return Err(ScoreError::InvalidTransition {
                job: self.key.clone(),
                from: lifecycle.state,
                to,
            });
        }
        lifecycle.state = to;
        lifecycle.ended = Some(Instant::now());
        Ok(())
    }

    /// Current status.
    pub fn snapshot(&self) -> JobSnapshot {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        let duration = lifecycle
            .ended
            .map_or_else(|| self.started.elapsed(), |end| end - self.started);
        JobSnapshot {
            state: lifecycle.state,
            start_time_ms: millis(
                self.start_time
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or(Duration::ZERO),
            ),
            duration_ms: millis(duration),
        }
    }
}

#[inline]
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
