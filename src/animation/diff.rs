//! Shared snapshot-diffing helpers used by every adapter

use super::command::AnimationCommand;
use crate::snapshot::{Data, ExecutionStep, StepType};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::cmp::Ordering;

/// Cap on list items rendered into a command payload
pub const MAX_JSON_ITEMS: usize = 100;
/// Cap on dict entries rendered into a command payload
pub const MAX_JSON_ENTRIES: usize = 50;
/// Cap on string characters rendered into a command payload
pub const MAX_JSON_CHARS: usize = 200;

/// Bindings that differ between two steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableChanges {
    pub new_variables: Vec<String>,
    pub modified_variables: Vec<String>,
    pub deleted_variables: Vec<String>,
    /// Old and new value of each modified variable
    pub value_changes: IndexMap<String, (Data, Data)>,
}

impl VariableChanges {
    pub fn is_empty(&self) -> bool {
        self.new_variables.is_empty()
            && self.modified_variables.is_empty()
            && self.deleted_variables.is_empty()
    }
}

/// Compare the bindings of `curr` against `prev`. Without a previous step
/// every binding counts as new.
pub fn detect_variable_changes(prev: Option<&ExecutionStep>, curr: &ExecutionStep) -> VariableChanges {
    let mut changes = VariableChanges::default();
    let Some(prev) = prev else {
        changes.new_variables = curr.variables_state.keys().cloned().collect();
        return changes;
    };

    for (name, value) in &curr.variables_state {
        match prev.variables_state.get(name) {
            None => changes.new_variables.push(name.clone()),
            Some(old) if !old.ptr_eq(value) && old != value => {
                changes.modified_variables.push(name.clone());
                changes
                    .value_changes
                    .insert(name.clone(), (old.clone(), value.clone()));
            }
            Some(_) => {}
        }
    }
    changes.deleted_variables = prev
        .variables_state
        .keys()
        .filter(|name| !curr.variables_state.contains_key(*name))
        .cloned()
        .collect();
    changes
}

/// Coarse shape of a traced program
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodePattern {
    pub has_loops: bool,
    pub has_recursion: bool,
    /// Container type names seen in any binding, in first-seen order
    pub data_structures: Vec<&'static str>,
}

pub fn analyze_code_pattern(steps: &[ExecutionStep]) -> CodePattern {
    let mut pattern = CodePattern::default();
    for step in steps {
        if matches!(step.step_type, StepType::LoopStart | StepType::LoopIteration) {
            pattern.has_loops = true;
        }
        if !pattern.has_recursion && step.call_stack.len() > 1 {
            let mut names: Vec<&str> = step
                .call_stack
                .iter()
                .map(|frame| frame.function_name.as_str())
                .collect();
            names.sort_unstable();
            names.dedup();
            pattern.has_recursion = names.len() != step.call_stack.len();
        }
        for value in step.variables_state.values() {
            let kind = match value {
                Data::List(_) => "list",
                Data::Dict(_) => "dict",
                Data::Set(_) => "set",
                _ => continue,
            };
            if !pattern.data_structures.contains(&kind) {
                pattern.data_structures.push(kind);
            }
        }
    }
    pattern
}

/// First binding, in step order, that satisfies `predicate`
pub fn find_variable<F>(steps: &[ExecutionStep], mut predicate: F) -> Option<String>
where
    F: FnMut(&str, &Data) -> bool,
{
    steps.iter().find_map(|step| {
        step.variables_state
            .iter()
            .find(|(name, value)| predicate(name, value))
            .map(|(name, _)| name.clone())
    })
}

/// Location of a flat heap index in its binary-tree drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreePosition {
    pub depth: u32,
    pub position: usize,
    pub total_in_level: usize,
}

impl TreePosition {
    pub fn to_json(self) -> Json {
        serde_json::json!({
            "depth": self.depth,
            "position": self.position,
            "total_in_level": self.total_in_level,
        })
    }
}

pub fn tree_position(index: usize) -> TreePosition {
    // depth = floor(log2(index + 1))
    let depth = (index + 1).ilog2();
    let level_start = (1usize << depth) - 1;
    TreePosition {
        depth,
        position: index - level_start,
        total_in_level: 1usize << depth,
    }
}

/// Ordering of two scalar snapshots. Numbers compare numerically and
/// strings lexically; anything else is unordered.
pub fn compare_data(a: &Data, b: &Data) -> Option<Ordering> {
    match (a, b) {
        (Data::Str(x), Data::Str(y)) => Some(x.cmp(y)),
        (Data::Int(x), Data::Int(y)) => Some(x.cmp(y)),
        _ => a.as_float()?.partial_cmp(&b.as_float()?),
    }
}

/// Non-decreasing order over comparable values. Empty and single-item
/// sequences count as sorted.
pub fn is_sorted(values: &[Data]) -> bool {
    values
        .windows(2)
        .all(|pair| matches!(compare_data(&pair[0], &pair[1]), Some(Ordering::Less | Ordering::Equal)))
}

/// JSON rendering of a snapshot with size caps on containers and strings
pub fn json_value(value: &Data) -> Json {
    match value {
        Data::None => Json::Null,
        Data::Bool(b) => Json::Bool(*b),
        Data::Int(n) => Json::from(*n),
        Data::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(value.to_string())),
        Data::Str(s) | Data::Repr(s) => Json::String(s.chars().take(MAX_JSON_CHARS).collect()),
        Data::List(items) | Data::Tuple(items) => {
            Json::Array(items.iter().take(MAX_JSON_ITEMS).map(json_value).collect())
        }
        Data::Set(items) => Json::Array(items.iter().take(MAX_JSON_ENTRIES).map(json_value).collect()),
        Data::Dict(pairs) => Json::Object(
            pairs
                .iter()
                .take(MAX_JSON_ENTRIES)
                .map(|(k, v)| (k.key_text(), json_value(v)))
                .collect::<Map<String, Json>>(),
        ),
    }
}

/// Lengths of the common prefix and of the common suffix of two
/// sequences. The suffix never overlaps the prefix.
pub fn common_affixes<T: PartialEq>(old: &[T], new: &[T]) -> (usize, usize) {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let room = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(room)
        .take_while(|(a, b)| a == b)
        .count();
    (prefix, suffix)
}

fn mergeable(a: &AnimationCommand, b: &AnimationCommand) -> bool {
    a.command_type == b.command_type
        && a.target_indices == b.target_indices
        && a.target_ids == b.target_ids
}

fn merged_count(cmd: &AnimationCommand) -> u64 {
    cmd.metadata.get("merged").and_then(Json::as_u64).unwrap_or(1)
}

/// Fold runs of adjacent commands with the same type and targets into one
/// command whose duration is the sum of the run.
///
/// The kept command records the run length in `metadata.merged` and the last
/// covered step in `metadata.step_end`. Output never holds two adjacent
/// mergeable commands, so a second pass is a no-op.
pub fn optimize(commands: Vec<AnimationCommand>) -> Vec<AnimationCommand> {
    let mut out: Vec<AnimationCommand> = Vec::with_capacity(commands.len());
    for cmd in commands {
        match out.last_mut() {
            Some(last) if mergeable(last, &cmd) => {
                let count = merged_count(last) + merged_count(&cmd);
                last.duration_ms = last.duration_ms.saturating_add(cmd.duration_ms);
                last.metadata.insert("merged".to_string(), Json::from(count));
                if let Some(end) = cmd.step_end() {
                    last.metadata.insert("step_end".to_string(), Json::from(end));
                }
            }
            _ => out.push(cmd),
        }
    }
    out
}

/// Scale every duration by `multiplier`, keeping non-zero durations at 1 ms
/// or more.
pub fn scale_durations(commands: &mut [AnimationCommand], multiplier: f64) {
    if !multiplier.is_finite() || multiplier <= 0.0 || multiplier == 1.0 {
        return;
    }
    for cmd in commands {
        if cmd.duration_ms > 0 {
            let scaled = (cmd.duration_ms as f64 * multiplier).round();
            cmd.duration_ms = if scaled < 1.0 { 1 } else { scaled as u64 };
        }
    }
}

/// Sum of duration and delay over a sequence
pub fn total_duration(commands: &[AnimationCommand]) -> u64 {
    commands.iter().map(AnimationCommand::total_ms).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::command::CommandType;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn step(n: usize, vars: Vec<(&str, Data)>) -> ExecutionStep {
        ExecutionStep {
            step_number: n,
            timestamp_ns: 0,
            line_number: n,
            column_number: 1,
            step_type: StepType::Assignment,
            source_code: String::new(),
            variables_state: vars.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            stdout_snapshot: Arc::from(""),
            stderr_snapshot: Arc::from(""),
            call_stack: Vec::new(),
            heap_state: BTreeMap::new(),
            expression_value: None,
            condition_result: None,
            memory_usage: 0,
            cpu_time_ns: 0,
        }
    }

    #[test]
    fn test_variable_changes() {
        let a = step(1, vec![("x", Data::Int(1)), ("y", Data::Int(2))]);
        let b = step(2, vec![("x", Data::Int(5)), ("z", Data::Int(0))]);
        let changes = detect_variable_changes(Some(&a), &b);
        assert_eq!(changes.new_variables, vec!["z"]);
        assert_eq!(changes.modified_variables, vec!["x"]);
        assert_eq!(changes.deleted_variables, vec!["y"]);
        assert_eq!(changes.value_changes["x"], (Data::Int(1), Data::Int(5)));

        let first = detect_variable_changes(None, &a);
        assert_eq!(first.new_variables, vec!["x", "y"]);
    }

    #[test]
    fn test_tree_position() {
        assert_eq!(
            tree_position(0),
            TreePosition { depth: 0, position: 0, total_in_level: 1 }
        );
        assert_eq!(
            tree_position(2),
            TreePosition { depth: 1, position: 1, total_in_level: 2 }
        );
        assert_eq!(
            tree_position(6),
            TreePosition { depth: 2, position: 3, total_in_level: 4 }
        );
        assert_eq!(tree_position(7).depth, 3);
    }

    #[test]
    fn test_is_sorted() {
        assert!(is_sorted(&[]));
        assert!(is_sorted(&[Data::Int(1), Data::Float(1.0), Data::Int(2)]));
        assert!(!is_sorted(&[Data::Int(2), Data::Int(1)]));
        assert!(!is_sorted(&[Data::Int(1), Data::str("a")]));
        assert!(is_sorted(&[Data::str("a"), Data::str("b")]));
    }

    #[test]
    fn test_json_value_caps() {
        let long = Data::list((0..150).map(Data::Int).collect());
        assert_eq!(json_value(&long).as_array().map(Vec::len), Some(MAX_JSON_ITEMS));
        let text = Data::str(&"x".repeat(300));
        assert_eq!(json_value(&text).as_str().map(str::len), Some(MAX_JSON_CHARS));
        assert_eq!(json_value(&Data::Float(f64::NAN)), Json::String("nan".into()));
    }

    #[test]
    fn test_optimize_merges_runs() {
        let cmds = vec![
            AnimationCommand::new(CommandType::Pause).duration(100).at_step(1),
            AnimationCommand::new(CommandType::Pause).duration(100).at_step(2),
            AnimationCommand::new(CommandType::Pause).duration(100).at_step(3),
            AnimationCommand::new(CommandType::Swap).indices([0, 1]).at_step(4),
            AnimationCommand::new(CommandType::Pause).duration(100).at_step(5),
        ];
        let out = optimize(cmds);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].duration_ms, 300);
        assert_eq!(out[0].metadata["merged"], 3);
        assert_eq!(out[0].metadata["step_end"], 3);
        assert!(out[0].covers_step(2));
        assert_eq!(optimize(out.clone()), out);
    }

    #[test]
    fn test_common_affixes() {
        assert_eq!(common_affixes(&[1, 2, 3], &[1, 9, 3]), (1, 1));
        assert_eq!(common_affixes(&[1, 1], &[1, 1, 1]), (2, 0));
        assert_eq!(common_affixes::<i32>(&[], &[4]), (0, 0));
    }

    #[test]
    fn test_scale_durations() {
        let mut cmds = vec![
            AnimationCommand::new(CommandType::Pause).duration(3),
            AnimationCommand::new(CommandType::Pause).duration(0),
        ];
        scale_durations(&mut cmds, 0.25);
        assert_eq!(cmds[0].duration_ms, 1);
        assert_eq!(cmds[1].duration_ms, 0);
    }
}
