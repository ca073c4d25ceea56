//! Response delivery mode.

use serde::{Deserialize, Serialize};

/// Environment variable selecting streaming delivery.
pub const STREAMING_ENV: &str = "STREAMIFY";

/// How responses leave the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Collect the whole response and return one result object.
    #[default]
    Buffered,
    /// Flush bytes to an open output channel as they are written.
    Streaming,
}

impl ResponseMode {
    /// Read the mode from `STREAMIFY`. Call once at process start.
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var(STREAMING_ENV).ok().as_deref())
    }

    /// Interpret a flag value: `true`/`1` (any case) selects streaming.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v == "1" || v.eq_ignore_ascii_case("true") => Self::Streaming,
            _ => Self::Buffered,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}
