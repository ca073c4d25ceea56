//! Response lifecycle tracking.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use http::StatusCode;

/// Lifecycle phases of a response sink.
///
/// `NotStarted -> HeadersPending -> Streaming -> Closed`, or `Errored` from
/// any non-closed phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePhase {
    /// Nothing has been set yet.
    NotStarted,
    /// Status and/or headers staged, nothing committed.
    HeadersPending,
    /// Status and headers committed, body chunks may follow.
    Streaming,
    /// Response completed.
    Closed,
    /// The output channel failed; further writes are dropped.
    Errored,
}

impl ResponsePhase {
    /// Check if headers have been committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Streaming | Self::Closed)
    }

    /// Check if the sink accepts no further operations.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

impl std::fmt::Display for ResponsePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::HeadersPending => "headers-pending",
            Self::Streaming => "streaming",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Status code outside the range a response can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid status code: {0}")]
pub struct InvalidStatus(pub u16);

/// Validate a numeric status code.
pub fn validate_status(code: u16) -> Result<StatusCode, InvalidStatus> {
    StatusCode::from_u16(code).map_err(|_| InvalidStatus(code))
}

/// Timing marks for one invocation.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<&'static str, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark. The first mark for a name is kept.
    pub fn mark(&mut self, name: &'static str) {
        self.marks.entry(name).or_insert_with(Instant::now);
    }

    /// Time from start to a mark.
    pub fn since_start(&self, name: &str) -> Option<Duration> {
        self.marks.get(name).map(|t| t.duration_since(self.start))
    }

    /// Get time to header commit.
    pub fn time_to_commit(&self) -> Option<Duration> {
        self.since_start("commit")
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}
