//! Tracer configuration
//!
//! [`TracerConfig`] carries every limit and capture toggle of a trace. It can
//! be built from a preset, deserialized from JSON (missing fields take their
//! defaults) or overridden from `ALGOTRACE_*` environment variables.

use super::errors::TraceError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How much detail a trace records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TracingMode {
    #[default]
    #[serde(alias = "full")]
    Full,
    #[serde(alias = "minimal")]
    Minimal,
    #[serde(alias = "performance")]
    Performance,
    #[serde(alias = "debug")]
    Debug,
}

impl TracingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TracingMode::Full => "FULL",
            TracingMode::Minimal => "MINIMAL",
            TracingMode::Performance => "PERFORMANCE",
            TracingMode::Debug => "DEBUG",
        }
    }
}

impl FromStr for TracingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FULL" => Ok(TracingMode::Full),
            "MINIMAL" => Ok(TracingMode::Minimal),
            "PERFORMANCE" => Ok(TracingMode::Performance),
            "DEBUG" => Ok(TracingMode::Debug),
            other => Err(format!("unknown tracing mode '{}'", other)),
        }
    }
}

/// Snapshot sharing level. `None` rebuilds every snapshot; `Basic` and
/// `Aggressive` reuse unchanged containers between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OptimizationLevel {
    #[serde(alias = "none")]
    None,
    #[default]
    #[serde(alias = "basic")]
    Basic,
    #[serde(alias = "aggressive")]
    Aggressive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    #[serde(alias = "tracing_mode")]
    pub mode: TracingMode,
    pub max_steps: usize,
    pub max_recursion_depth: usize,
    pub max_execution_time_seconds: f64,
    pub max_memory_mb: usize,
    pub max_output_size_mb: usize,
    pub capture_stdout: bool,
    pub capture_stderr: bool,
    pub capture_heap_state: bool,
    pub capture_call_stack: bool,
    pub capture_line_execution: bool,
    pub capture_expressions: bool,
    pub optimization_level: OptimizationLevel,
    pub ignored_variables: Vec<String>,
    pub allow_imports: bool,
    pub sandboxed: bool,
    /// Replace common runtime faults with fallback values instead of aborting
    pub lenient: bool,
    pub max_source_len: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            mode: TracingMode::Full,
            max_steps: 1_000_000,
            max_recursion_depth: 1000,
            max_execution_time_seconds: 60.0,
            max_memory_mb: 1024,
            max_output_size_mb: 100,
            capture_stdout: true,
            capture_stderr: true,
            capture_heap_state: true,
            capture_call_stack: true,
            capture_line_execution: true,
            capture_expressions: true,
            optimization_level: OptimizationLevel::Basic,
            ignored_variables: Vec::new(),
            allow_imports: true,
            sandboxed: true,
            lenient: true,
            max_source_len: 1_000_000,
        }
    }
}

impl TracerConfig {
    pub fn preset(mode: TracingMode) -> Self {
        match mode {
            TracingMode::Full => Self::default(),
            TracingMode::Minimal => Self::minimal(),
            TracingMode::Performance => Self::performance(),
            TracingMode::Debug => Self::debug(),
        }
    }

    pub fn minimal() -> Self {
        TracerConfig {
            mode: TracingMode::Minimal,
            capture_heap_state: false,
            capture_expressions: false,
            optimization_level: OptimizationLevel::Aggressive,
            ..Self::default()
        }
    }

    pub fn performance() -> Self {
        TracerConfig {
            mode: TracingMode::Performance,
            capture_expressions: false,
            optimization_level: OptimizationLevel::Aggressive,
            ..Self::default()
        }
    }

    pub fn debug() -> Self {
        TracerConfig {
            mode: TracingMode::Debug,
            optimization_level: OptimizationLevel::None,
            lenient: false,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        TracerConfig {
            max_execution_time_seconds: 30.0,
            max_memory_mb: 512,
            max_steps: 100_000,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TraceError> {
        serde_json::from_str(json)
            .map_err(|e| TraceError::validation(format!("invalid tracer config: {}", e)))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Defaults overridden from `ALGOTRACE_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `ALGOTRACE_*` overrides read through `lookup`. Invalid values
    /// are skipped with a warning.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup("ALGOTRACE_MODE") {
            match raw.parse::<TracingMode>() {
                Ok(mode) => {
                    let limits = self.clone();
                    self = TracerConfig {
                        max_steps: limits.max_steps,
                        max_execution_time_seconds: limits.max_execution_time_seconds,
                        max_memory_mb: limits.max_memory_mb,
                        ..Self::preset(mode)
                    };
                }
                Err(e) => tracing::warn!(value = %raw, "ignoring ALGOTRACE_MODE: {}", e),
            }
        }
        if let Some(raw) = lookup("ALGOTRACE_MAX_STEPS") {
            match raw.trim().parse::<usize>() {
                Ok(n) => self.max_steps = n,
                Err(e) => tracing::warn!(value = %raw, "ignoring ALGOTRACE_MAX_STEPS: {}", e),
            }
        }
        if let Some(raw) = lookup("ALGOTRACE_MAX_TIME") {
            match raw.trim().parse::<f64>() {
                Ok(secs) if secs.is_finite() => self.max_execution_time_seconds = secs,
                Ok(_) => tracing::warn!(value = %raw, "ignoring non-finite ALGOTRACE_MAX_TIME"),
                Err(e) => tracing::warn!(value = %raw, "ignoring ALGOTRACE_MAX_TIME: {}", e),
            }
        }
        if let Some(raw) = lookup("ALGOTRACE_MAX_MEMORY") {
            match raw.trim().parse::<usize>() {
                Ok(mb) => self.max_memory_mb = mb,
                Err(e) => tracing::warn!(value = %raw, "ignoring ALGOTRACE_MAX_MEMORY: {}", e),
            }
        }
        if let Some(raw) = lookup("ALGOTRACE_SANDBOXED") {
            match parse_flag(&raw) {
                Some(flag) => self.sandboxed = flag,
                None => tracing::warn!(value = %raw, "ignoring ALGOTRACE_SANDBOXED"),
            }
        }
        if let Some(raw) = lookup("ALGOTRACE_LENIENT") {
            match parse_flag(&raw) {
                Some(flag) => self.lenient = flag,
                None => tracing::warn!(value = %raw, "ignoring ALGOTRACE_LENIENT"),
            }
        }
        self
    }

    /// Settings that make tracing impossible
    pub fn hard_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.max_steps == 0 {
            errors.push("max_steps must be greater than zero".to_string());
        }
        if self.max_recursion_depth == 0 {
            errors.push("max_recursion_depth must be greater than zero".to_string());
        }
        if self.max_execution_time_seconds.is_nan() || self.max_execution_time_seconds <= 0.0 {
            errors.push("max_execution_time_seconds must be greater than zero".to_string());
        }
        if self.max_memory_mb == 0 {
            errors.push("max_memory_mb must be greater than zero".to_string());
        }
        if self.max_output_size_mb == 0 {
            errors.push("max_output_size_mb must be greater than zero".to_string());
        }
        if self.max_source_len == 0 {
            errors.push("max_source_len must be greater than zero".to_string());
        }
        errors
    }

    /// Hard errors followed by advisory warnings
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.hard_errors();
        if self.max_steps > 10_000_000 {
            issues.push(format!(
                "warning: max_steps of {} will need a lot of memory",
                self.max_steps
            ));
        }
        if self.max_memory_mb > 4096 {
            issues.push(format!(
                "warning: max_memory_mb of {} is unusually large",
                self.max_memory_mb
            ));
        }
        if self.max_execution_time_seconds > 300.0 {
            issues.push(format!(
                "warning: max_execution_time_seconds of {} exceeds five minutes",
                self.max_execution_time_seconds
            ));
        }
        if self.mode == TracingMode::Debug
            && self.optimization_level == OptimizationLevel::Aggressive
        {
            issues.push("warning: DEBUG mode with AGGRESSIVE optimization drops detail".to_string());
        }
        issues
    }

    pub fn sharing_enabled(&self) -> bool {
        self.optimization_level != OptimizationLevel::None
    }

    pub fn max_memory_bytes(&self) -> usize {
        self.max_memory_mb.saturating_mul(1024 * 1024)
    }

    pub fn max_output_bytes(&self) -> usize {
        self.max_output_size_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TracerConfig::default();
        assert_eq!(config.max_steps, 1_000_000);
        assert_eq!(config.max_recursion_depth, 1000);
        assert_eq!(config.optimization_level, OptimizationLevel::Basic);
        assert!(config.lenient);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_presets() {
        let minimal = TracerConfig::minimal();
        assert!(!minimal.capture_heap_state);
        assert!(!minimal.capture_expressions);
        assert_eq!(minimal.optimization_level, OptimizationLevel::Aggressive);

        let debug = TracerConfig::preset(TracingMode::Debug);
        assert!(!debug.lenient);
        assert_eq!(debug.optimization_level, OptimizationLevel::None);

        let production = TracerConfig::production();
        assert_eq!(production.max_steps, 100_000);
        assert_eq!(production.max_memory_mb, 512);
    }

    #[test]
    fn test_json_round_trip_with_partial_input() {
        let config = TracerConfig::from_json(r#"{"max_steps": 50, "mode": "minimal"}"#).unwrap();
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.mode, TracingMode::Minimal);
        assert_eq!(config.max_recursion_depth, 1000);

        let again = TracerConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_bad_json_is_validation_error() {
        let err = TracerConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, TraceError::Validation { .. }));
    }

    #[test]
    fn test_env_overrides_skip_invalid_values() {
        let env: HashMap<&str, &str> = [
            ("ALGOTRACE_MAX_STEPS", "500"),
            ("ALGOTRACE_MAX_TIME", "soon"),
            ("ALGOTRACE_LENIENT", "no"),
        ]
        .into_iter()
        .collect();
        let config =
            TracerConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.max_steps, 500);
        assert_eq!(config.max_execution_time_seconds, 60.0);
        assert!(!config.lenient);
    }

    #[test]
    fn test_validate_reports_errors_and_warnings() {
        let config = TracerConfig {
            max_steps: 0,
            max_memory_mb: 8192,
            ..TracerConfig::default()
        };
        assert_eq!(config.hard_errors().len(), 1);
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[1].starts_with("warning:"));
    }
}
