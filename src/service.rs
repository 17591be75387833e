//! One-call facade: validate, trace and animate a program
//!
//! [`Visualizer::execute`] sizes the tracer limits from the program length,
//! runs the trace, picks adapters and returns everything a frontend needs in
//! one serializable [`ExecutionReport`].

use crate::animation::diff::total_duration;
use crate::animation::{AdapterKind, AdapterRegistry, AnimationCommand};
use crate::interpreter::{trace, TraceError, TracerConfig, TracingMode};
use crate::snapshot::ExecutionStep;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// Longest accepted program, in lines
pub const MAX_CODE_LINES: usize = 5000;

/// Substrings that reject a program outright. Comment lines are not checked.
pub const BLOCKED_PATTERNS: [&str; 9] = [
    "__import__",
    "eval(",
    "exec(",
    "open(",
    "os.",
    "subprocess",
    "sys.",
    "import os",
    "import sys",
];

/// Animation pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedPreset {
    Slow,
    #[default]
    Normal,
    Fast,
    Blazing,
}

impl SpeedPreset {
    pub fn multiplier(self) -> f64 {
        match self {
            SpeedPreset::Slow => 2.0,
            SpeedPreset::Normal => 1.0,
            SpeedPreset::Fast => 0.5,
            SpeedPreset::Blazing => 0.25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedPreset::Slow => "slow",
            SpeedPreset::Normal => "normal",
            SpeedPreset::Fast => "fast",
            SpeedPreset::Blazing => "blazing",
        }
    }
}

impl FromStr for SpeedPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(SpeedPreset::Slow),
            "normal" => Ok(SpeedPreset::Normal),
            "fast" => Ok(SpeedPreset::Fast),
            "blazing" => Ok(SpeedPreset::Blazing),
            other => Err(format!("unknown speed preset '{}'", other)),
        }
    }
}

/// Program size bucket that picks tracer limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
    XLarge,
}

impl SizeCategory {
    pub fn of(code: &str) -> SizeCategory {
        match code.lines().count() {
            0..=50 => SizeCategory::Small,
            51..=200 => SizeCategory::Medium,
            201..=1000 => SizeCategory::Large,
            _ => SizeCategory::XLarge,
        }
    }

    pub fn step_limit(self) -> usize {
        match self {
            SizeCategory::Small => 100_000,
            SizeCategory::Medium => 500_000,
            SizeCategory::Large => 1_000_000,
            SizeCategory::XLarge => 5_000_000,
        }
    }

    pub fn mode(self) -> TracingMode {
        match self {
            SizeCategory::Small | SizeCategory::Medium => TracingMode::Full,
            SizeCategory::Large => TracingMode::Performance,
            SizeCategory::XLarge => TracingMode::Minimal,
        }
    }

    fn time_limit_seconds(self) -> f64 {
        match self {
            SizeCategory::Small | SizeCategory::Medium => 60.0,
            SizeCategory::Large | SizeCategory::XLarge => 300.0,
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `pattern` occurs in `line` not glued to a preceding identifier, so
/// `pos.x` does not match `os.`
fn contains_pattern(line: &str, pattern: &str) -> bool {
    line.match_indices(pattern).any(|(at, _)| {
        !pattern.starts_with(is_ident_char) || !line[..at].chars().next_back().is_some_and(is_ident_char)
    })
}

/// Screen a program before tracing. Returns advisory warnings, or a
/// validation fault for oversized programs and blocked patterns.
pub fn validate_code(code: &str) -> Result<Vec<String>, TraceError> {
    let lines: Vec<&str> = code.lines().collect();
    if lines.len() > MAX_CODE_LINES {
        return Err(TraceError::validation(format!(
            "code has {} lines, exceeding the maximum of {}",
            lines.len(),
            MAX_CODE_LINES
        )));
    }
    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.starts_with('#') {
            continue;
        }
        if let Some(pattern) = BLOCKED_PATTERNS.iter().find(|p| contains_pattern(stripped, p)) {
            return Err(TraceError::validation(format!(
                "line {}: blocked pattern '{}'",
                i + 1,
                pattern
            )));
        }
    }

    let mut warnings = Vec::new();
    if code.contains("while True") && !code.contains("break") {
        warnings.push(
            "'while True' without 'break': the trace will stop at the step or time limit".to_string(),
        );
    }
    Ok(warnings)
}

/// Per-call knobs of [`Visualizer::execute`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteOptions {
    /// Overrides the size-based step limit
    pub max_steps: Option<usize>,
    pub speed_preset: SpeedPreset,
    /// Adapter name or variable name
    pub adapter_hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionStats {
    pub total_steps: usize,
    pub lines_executed: usize,
    pub total_lines: usize,
    pub execution_time_ms: f64,
    pub tracing_mode: TracingMode,
    pub size_category: SizeCategory,
    pub total_commands: usize,
    pub estimated_duration_ms: u64,
    pub speed_preset: SpeedPreset,
    pub speed_multiplier: f64,
}

/// Everything produced by one [`Visualizer::execute`] call
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub steps: Vec<ExecutionStep>,
    /// Commands per adapter name, primary adapter first
    pub animations: IndexMap<String, Vec<AnimationCommand>>,
    pub primary_adapter: Option<&'static str>,
    /// Frontend component for the primary adapter
    pub component: Option<&'static str>,
    pub stats: ExecutionStats,
    pub warnings: Vec<String>,
}

impl ExecutionReport {
    /// Commands of the primary adapter
    pub fn primary_commands(&self) -> &[AnimationCommand] {
        self.animations
            .first()
            .map(|(_, cmds)| cmds.as_slice())
            .unwrap_or(&[])
    }
}

/// Validate, trace and animate with a fixed registry and optional base
/// tracer config.
#[derive(Debug, Clone, Default)]
pub struct Visualizer {
    registry: AdapterRegistry,
    /// When unset, limits and mode come from the program's size category
    config: Option<TracerConfig>,
}

impl Visualizer {
    pub fn new(registry: AdapterRegistry) -> Self {
        Visualizer {
            registry,
            config: None,
        }
    }

    pub fn with_config(mut self, config: TracerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Tracer config for `code` under `options`
    pub fn build_config(&self, code: &str, options: &ExecuteOptions) -> TracerConfig {
        let size = SizeCategory::of(code);
        let mut config = match &self.config {
            Some(base) => base.clone(),
            None => TracerConfig {
                max_steps: size.step_limit(),
                max_execution_time_seconds: size.time_limit_seconds(),
                ..TracerConfig::preset(size.mode())
            },
        };
        if let Some(max_steps) = options.max_steps {
            config.max_steps = max_steps;
        }
        config
    }

    pub fn execute(&self, code: &str, options: &ExecuteOptions) -> Result<ExecutionReport, TraceError> {
        let warnings = validate_code(code)?;
        for warning in &warnings {
            debug!(%warning, "code warning");
        }

        let config = self.build_config(code, options);
        let started = Instant::now();
        let steps = trace(code, &config)?;
        let execution_time_ms = (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;

        let multiplier = options.speed_preset.multiplier();
        let animations =
            self.registry
                .detect_and_animate(&steps, options.adapter_hint.as_deref(), multiplier);
        let primary = animations
            .first()
            .and_then(|(name, _)| AdapterKind::from_name(name));
        let primary_commands = animations.first().map(|(_, cmds)| cmds.as_slice()).unwrap_or(&[]);

        let lines_executed = steps
            .iter()
            .map(|s| s.line_number)
            .filter(|&line| line > 0)
            .collect::<BTreeSet<_>>()
            .len();
        let stats = ExecutionStats {
            total_steps: steps.len(),
            lines_executed,
            total_lines: code.lines().count(),
            execution_time_ms,
            tracing_mode: config.mode,
            size_category: SizeCategory::of(code),
            total_commands: primary_commands.len(),
            estimated_duration_ms: total_duration(primary_commands),
            speed_preset: options.speed_preset,
            speed_multiplier: multiplier,
        };
        info!(
            steps = stats.total_steps,
            adapter = primary.map_or("none", AdapterKind::name),
            commands = stats.total_commands,
            "visualization ready"
        );

        Ok(ExecutionReport {
            steps,
            primary_adapter: primary.map(AdapterKind::name),
            component: primary.map(AdapterKind::component),
            animations,
            stats,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_categories() {
        assert_eq!(SizeCategory::of("x = 1\n"), SizeCategory::Small);
        let medium = "x = 1\n".repeat(120);
        assert_eq!(SizeCategory::of(&medium), SizeCategory::Medium);
        assert_eq!(SizeCategory::of(&"x = 1\n".repeat(1001)), SizeCategory::XLarge);
        assert_eq!(SizeCategory::Large.mode(), TracingMode::Performance);
        assert_eq!(SizeCategory::XLarge.step_limit(), 5_000_000);
    }

    #[test]
    fn test_speed_presets() {
        assert_eq!("FAST".parse::<SpeedPreset>(), Ok(SpeedPreset::Fast));
        assert_eq!(SpeedPreset::Blazing.multiplier(), 0.25);
        assert!("warp".parse::<SpeedPreset>().is_err());
    }

    #[test]
    fn test_validate_code_blocks_patterns() {
        let err = validate_code("x = 1\nimport os\n").unwrap_err();
        assert!(matches!(err, TraceError::Validation { ref message } if message.contains("line 2")));
        assert!(validate_code("# eval(x) in a comment\npos.x = 1").is_ok());
        assert!(validate_code("y = eval('1')").is_err());
    }

    #[test]
    fn test_validate_code_warnings_and_size() {
        let warnings = validate_code("while True:\n    x = 1\n").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(validate_code("while True:\n    break\n").unwrap().is_empty());
        let huge = "x = 1\n".repeat(MAX_CODE_LINES + 1);
        assert!(validate_code(&huge).is_err());
    }

    #[test]
    fn test_build_config_uses_size_and_override() {
        let visualizer = Visualizer::default();
        let config = visualizer.build_config("x = 1", &ExecuteOptions::default());
        assert_eq!(config.max_steps, 100_000);
        let options = ExecuteOptions {
            max_steps: Some(42),
            ..ExecuteOptions::default()
        };
        assert_eq!(visualizer.build_config("x = 1", &options).max_steps, 42);
    }
}
