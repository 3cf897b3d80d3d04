//! Fetch-level result and error types shared by the source adapters.
//!
//! The build treats "no data" as a valid outcome, never an error: adapters
//! return [`FetchOutcome::Empty`] for well-formed empty responses and
//! reserve [`SourceError`] for transport, parse, and shape failures. The
//! orchestrator catches those, appends an [`ErrorRecord`] to the source's
//! sidecar list, and moves to the next dimension.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::http_client::HttpError;

/// Classification for per-dimension fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Network/HTTP failure after retries were exhausted.
    Transport,
    /// Response body was not valid JSON/CSV, or an archive member was missing.
    Parse,
    /// Response did not match the expected two-element or keyed-list shape.
    Shape,
    /// Local filesystem failure while persisting fetched data.
    Io,
}

/// Structured error recorded against one (indicator, country) or
/// (domain, country) or (messy item) dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Parse,
            message: message.into(),
        }
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Shape,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Io,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Transport => "fetch.transport",
            SourceErrorKind::Parse => "fetch.parse",
            SourceErrorKind::Shape => "fetch.shape",
            SourceErrorKind::Io => "fetch.io",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

impl From<HttpError> for SourceError {
    fn from(error: HttpError) -> Self {
        Self::transport(error.message())
    }
}

impl From<std::io::Error> for SourceError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

/// Distinguishes a valid empty result from rows, so empty collections are
/// never overloaded as an error sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Rows(T),
    Empty,
}

impl<T> FetchOutcome<T> {
    pub fn into_rows(self) -> Option<T> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Empty => None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// One entry in a source's `_errors.json` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorRecord {
    pub stage: String,
    #[serde(flatten)]
    pub keys: BTreeMap<String, String>,
    pub error: String,
}

impl ErrorRecord {
    pub fn new(stage: impl Into<String>, error: impl Display) -> Self {
        Self {
            stage: stage.into(),
            keys: BTreeMap::new(),
            error: error.to_string(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keys.insert(key.into(), value.into());
        self
    }
}

/// Where a normalized FAOSTAT row ultimately came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Api,
    Bulk,
    Hdx,
}

impl Provenance {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Bulk => "bulk",
            Self::Hdx => "hdx",
        }
    }
}
