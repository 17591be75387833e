//! Trace error types
//!
//! This module defines [`TraceError`], the single error type returned by a
//! trace. Every fault is terminal for the trace call: no partial step list
//! is returned.
//!
//! Internally the interpreter also raises [`TraceError::Execution`] for
//! ordinary runtime faults (`ZeroDivisionError`, `IndexError`, ...). In
//! lenient mode some of those are caught at the failing site and replaced by
//! a fallback value; resource and timeout faults are never caught.

use crate::parser::ParseError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which bounded resource was exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Steps,
    Memory,
    Output,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Steps => write!(f, "step"),
            ResourceKind::Memory => write!(f, "memory"),
            ResourceKind::Output => write!(f, "output"),
        }
    }
}

/// Errors produced by a trace.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "error_type", rename_all = "snake_case")]
pub enum TraceError {
    /// The source text is malformed or uses an unsupported construct.
    #[error("SyntaxError at line {line}, column {column}: {message}")]
    Parse {
        message: String,
        line: usize,
        column: usize,
        source_line: String,
    },

    /// A runtime fault not absorbed by leniency.
    #[error("{cause} at line {line}: {message}")]
    Execution {
        message: String,
        line: usize,
        cause: String,
        source_line: String,
    },

    /// A step, memory or output limit was exceeded.
    #[error("{resource} limit exceeded (limit {limit}): {message}")]
    Resource {
        resource: ResourceKind,
        limit: u64,
        message: String,
    },

    /// The wall-clock deadline passed or the trace was cancelled.
    #[error("execution timed out after {limit_seconds}s (line {line})")]
    Timeout { limit_seconds: f64, line: usize },

    /// Rejected input or configuration.
    #[error("validation failed: {message}")]
    Validation { message: String },
}

impl TraceError {
    /// Runtime fault with `cause` naming the error class, e.g. `IndexError`
    pub fn execution(cause: &str, message: impl Into<String>, line: usize) -> Self {
        TraceError::Execution {
            message: message.into(),
            line,
            cause: cause.to_string(),
            source_line: String::new(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TraceError::Validation {
            message: message.into(),
        }
    }

    /// Convert a parser error, attaching the offending source line
    pub fn from_parse(err: ParseError, source: &str) -> Self {
        let line = err.location.line;
        TraceError::Parse {
            message: err.message,
            line,
            column: err.location.column,
            source_line: excerpt(source, line),
        }
    }

    /// Whether a lenient evaluation site may absorb this fault
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TraceError::Execution { .. })
    }

    /// Error class name for execution faults
    pub fn cause(&self) -> Option<&str> {
        match self {
            TraceError::Execution { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            TraceError::Parse { line, .. }
            | TraceError::Execution { line, .. }
            | TraceError::Timeout { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// `Name: message` as written to captured stderr
    pub fn stderr_text(&self) -> String {
        match self {
            TraceError::Execution { cause, message, .. } => format!("{}: {}", cause, message),
            other => other.to_string(),
        }
    }

    /// Fill in the source excerpt of an execution fault if it is missing
    pub fn with_source(mut self, source: &str) -> Self {
        if let TraceError::Execution {
            line, source_line, ..
        } = &mut self
        {
            if source_line.is_empty() {
                *source_line = excerpt(source, *line);
            }
        }
        self
    }

    /// Structured report
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(map) = value.as_object_mut() {
            map.insert(
                "display".to_string(),
                serde_json::Value::String(self.to_string()),
            );
            map.insert(
                "recoverable".to_string(),
                serde_json::Value::Bool(self.is_recoverable()),
            );
        }
        value
    }
}

fn excerpt(source: &str, line: usize) -> String {
    line.checked_sub(1)
        .and_then(|i| source.lines().nth(i))
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::SourceLocation;

    #[test]
    fn test_parse_error_carries_source_line() {
        let err = ParseError {
            message: "invalid syntax".to_string(),
            location: SourceLocation::new(2, 5, 10),
        };
        let trace_err = TraceError::from_parse(err, "x = 1\ny = = 2\n");
        match &trace_err {
            TraceError::Parse {
                line, source_line, ..
            } => {
                assert_eq!(*line, 2);
                assert_eq!(source_line, "y = = 2");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!trace_err.is_recoverable());
    }

    #[test]
    fn test_json_report_is_tagged() {
        let err = TraceError::execution("IndexError", "list index out of range", 3)
            .with_source("a = []\nb = 1\nc = a[5]\n");
        let json = err.to_json();
        assert_eq!(json["error_type"], "execution");
        assert_eq!(json["cause"], "IndexError");
        assert_eq!(json["source_line"], "c = a[5]");
        assert_eq!(json["recoverable"], true);
    }

    #[test]
    fn test_resource_kind_serializes_lowercase() {
        let err = TraceError::Resource {
            resource: ResourceKind::Steps,
            limit: 10,
            message: "too many steps".to_string(),
        };
        assert_eq!(err.to_json()["resource"], "steps");
        assert_eq!(err.stderr_text(), err.to_string());
    }
}
