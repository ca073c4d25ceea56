//! Response state machine shared by both sink variants.

use adapter_cache::header_names;
use adapter_core::{validate_status, Headers, ResponsePhase};
use http::StatusCode;

use crate::error::SinkError;

/// Staged response for one invocation.
///
/// Phases move `NotStarted -> HeadersPending -> Streaming -> Closed`, or to
/// `Errored` when the output channel fails. Headers are frozen once the
/// phase is committed.
#[derive(Debug, Clone)]
pub struct ResponseState {
    status: Option<StatusCode>,
    headers: Headers,
    cookies: Vec<String>,
    phase: ResponsePhase,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseState {
    pub fn new() -> Self {
        Self {
            status: None,
            headers: Headers::new(),
            cookies: Vec::new(),
            phase: ResponsePhase::NotStarted,
        }
    }

    pub fn phase(&self) -> ResponsePhase {
        self.phase
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn cookies(&self) -> &[String] {
        &self.cookies
    }

    /// Assign the status code.
    pub fn set_status(&mut self, code: u16) -> Result<(), SinkError> {
        self.ensure_mutable()?;
        self.status = Some(validate_status(code)?);
        self.stage();
        Ok(())
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.ensure_mutable()?;
        if name.eq_ignore_ascii_case(header_names::SET_COOKIE) {
            self.cookies = vec![value.to_string()];
        } else {
            self.headers.insert(name, value);
        }
        self.stage();
        Ok(())
    }

    /// Append a header value. `set-cookie` values are kept separately;
    /// other headers are joined with `, `.
    pub fn append_header(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.ensure_mutable()?;
        if name.eq_ignore_ascii_case(header_names::SET_COOKIE) {
            self.cookies.push(value.to_string());
        } else {
            let joined = match self.headers.get(name) {
                Some(existing) => format!("{}, {}", existing, value),
                None => value.to_string(),
            };
            self.headers.insert(name, joined);
        }
        self.stage();
        Ok(())
    }

    /// Check that a body write is allowed and return the status to commit.
    pub fn begin_write(&self) -> Result<StatusCode, SinkError> {
        match self.phase {
            ResponsePhase::Closed => Err(SinkError::Closed),
            _ => self.status.ok_or(SinkError::StatusNotSet),
        }
    }

    /// Replace the staged headers with their rewritten form.
    pub fn replace_headers(&mut self, headers: Headers) {
        self.headers = headers;
    }

    /// Mark headers as committed.
    pub fn commit(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = ResponsePhase::Streaming;
        }
    }

    pub fn close(&mut self) {
        if self.phase != ResponsePhase::Errored {
            self.phase = ResponsePhase::Closed;
        }
    }

    pub fn fail(&mut self) {
        self.phase = ResponsePhase::Errored;
    }

    fn ensure_mutable(&self) -> Result<(), SinkError> {
        match self.phase {
            ResponsePhase::Closed => Err(SinkError::Closed),
            ResponsePhase::Streaming | ResponsePhase::Errored => Err(SinkError::HeadersCommitted),
            ResponsePhase::NotStarted | ResponsePhase::HeadersPending => Ok(()),
        }
    }

    fn stage(&mut self) {
        if self.phase == ResponsePhase::NotStarted {
            self.phase = ResponsePhase::HeadersPending;
        }
    }
}
