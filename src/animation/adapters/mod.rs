//! Data-structure adapters
//!
//! Each adapter probes a trace for one variable shape (a flat list, a heap,
//! an adjacency dict, ...) and turns the successive snapshots of that
//! variable into [`AnimationCommand`]s. Adapters are plain structs that hold
//! the tracked variable name and whatever sub-kind they detected; shared
//! logic lives in [`crate::animation::diff`] and in the helpers below.

mod array;
mod generic;
mod graph;
mod hashmap;
mod heap;
mod linked_list;
mod matrix;
mod queue;
mod set;
mod stack;
mod string;
mod tree;

pub use array::ArrayAdapter;
pub use generic::GenericAdapter;
pub use graph::GraphAdapter;
pub use hashmap::HashMapAdapter;
pub use heap::HeapAdapter;
pub use linked_list::LinkedListAdapter;
pub use matrix::MatrixAdapter;
pub use queue::QueueAdapter;
pub use set::SetAdapter;
pub use stack::StackAdapter;
pub use string::StringAdapter;
pub use tree::TreeAdapter;

use super::command::AnimationCommand;
use super::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};
use thiserror::Error;

/// Adapter failures. Never fatal to the registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("{adapter}: no variable is being tracked")]
    NotTracking { adapter: &'static str },

    #[error("{adapter}: `{variable}` never holds a {expected}")]
    ShapeMismatch {
        adapter: &'static str,
        variable: String,
        expected: &'static str,
    },

    #[error("{adapter} panicked: {message}")]
    Panicked { adapter: String, message: String },
}

/// Turns a step sequence into a command sequence for one data shape
pub trait VisualizationAdapter: Send {
    fn kind(&self) -> AdapterKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Variable whose snapshots drive the animation, once detected
    fn tracked_variable(&self) -> Option<&str>;

    /// Cheap structural probe. Records the tracked variable on success.
    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool;

    fn generate_animations(
        &mut self,
        steps: &[ExecutionStep],
    ) -> Result<Vec<AnimationCommand>, AdapterError>;
}

/// Tracked variable state shared by the single-variable adapters.
///
/// A pinned variable comes from the caller: probes only look at that
/// binding and skip the naming heuristics.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tracking {
    name: Option<String>,
    pinned: bool,
}

impl Tracking {
    pub(crate) fn new(variable: Option<String>) -> Self {
        Tracking {
            pinned: variable.is_some(),
            name: variable,
        }
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub(crate) fn set(&mut self, name: String) {
        if !self.pinned {
            self.name = Some(name);
        }
    }

    pub(crate) fn require(&self, adapter: &'static str) -> Result<&str, AdapterError> {
        self.name().ok_or(AdapterError::NotTracking { adapter })
    }

    /// Whether `name` may be considered by a probe
    pub(crate) fn admits(&self, name: &str) -> bool {
        !self.pinned || self.name() == Some(name)
    }

    /// Probe the steps for a binding accepted by `accept`, preferring one
    /// whose name contains a keyword. Records and reports the match.
    pub(crate) fn probe<F>(&mut self, steps: &[ExecutionStep], keywords: &[&str], accept: F) -> bool
    where
        F: Fn(&str, &Data) -> bool,
    {
        let named = |name: &str, value: &Data| {
            self.admits(name) && accept(name, value) && (self.pinned || name_matches(name, keywords))
        };
        let found = super::diff::find_variable(steps, named)
            .or_else(|| super::diff::find_variable(steps, |n, v| self.admits(n) && accept(n, v)));
        match found {
            Some(name) => {
                self.set(name);
                true
            }
            None => false,
        }
    }
}

/// Case-insensitive substring match against any keyword
pub(crate) fn name_matches(name: &str, keywords: &[&str]) -> bool {
    let lower = name.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw))
}

/// Whether any step's source line contains `needle`
pub(crate) fn sources_contain(steps: &[ExecutionStep], needle: &str) -> bool {
    steps.iter().any(|step| step.source_code.contains(needle))
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Identifier directly before each occurrence of `suffix`, e.g. the
/// receiver `stack` in `stack.pop()`
pub(crate) fn receivers<'a>(steps: &'a [ExecutionStep], suffix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    steps.iter().flat_map(move |step| {
        let source = step.source_code.as_str();
        source.match_indices(suffix).filter_map(move |(at, _)| {
            let head = &source[..at];
            let start = head
                .char_indices()
                .rev()
                .take_while(|(_, c)| is_ident_char(*c))
                .last()
                .map(|(i, _)| i)?;
            Some(&head[start..])
        })
    })
}

/// First identifier passed to a call like `heappush(heap, x)`
pub(crate) fn first_argument<'a>(source: &'a str, callee: &str) -> Option<&'a str> {
    let pattern = format!("{}(", callee);
    let at = source.find(&pattern)? + pattern.len();
    let rest = source[at..].trim_start();
    let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
    (end > 0).then(|| &rest[..end])
}

/// Whether `name` appears in `source` as a whole identifier
pub(crate) fn mentions(source: &str, name: &str) -> bool {
    source.match_indices(name).any(|(at, _)| {
        let before = source[..at].chars().next_back();
        let after = source[at + name.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Indices used to subscript `name` in the step's source line, resolved
/// against the step's integer variables. Unresolvable or out-of-range
/// subscripts are skipped; duplicates are dropped.
pub(crate) fn subscript_indices(step: &ExecutionStep, name: &str, len: usize) -> Vec<usize> {
    let source = step.source_code.as_str();
    let pattern = format!("{}[", name);
    let mut found = Vec::new();
    for (at, _) in source.match_indices(&pattern) {
        if source[..at].chars().next_back().is_some_and(is_ident_char) {
            continue;
        }
        let inner_start = at + pattern.len();
        let mut depth = 1;
        let mut inner_end = None;
        for (i, c) in source[inner_start..].char_indices() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        inner_end = Some(inner_start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(end) = inner_end else { continue };
        let Some(index) = eval_index(&source[inner_start..end], step) else {
            continue;
        };
        let index = if index < 0 { index + len as i64 } else { index };
        if let Ok(index) = usize::try_from(index) {
            if index < len && !found.contains(&index) {
                found.push(index);
            }
        }
    }
    found
}

/// Evaluate `+`, `-` and `*` over integer literals and integer variables
fn eval_index(expr: &str, step: &ExecutionStep) -> Option<i64> {
    let mut total: i64 = 0;
    let mut sign = 1;
    let mut term = String::new();
    let flush = |term: &str, sign: i64, total: &mut i64| -> Option<()> {
        let mut product: i64 = 1;
        for factor in term.split('*') {
            let factor = factor.trim();
            let value = match factor.parse::<i64>() {
                Ok(n) => n,
                Err(_) => step.variable(factor)?.as_int()?,
            };
            product = product.checked_mul(value)?;
        }
        *total = total.checked_add(sign * product)?;
        Some(())
    };
    for c in expr.chars() {
        match c {
            '+' | '-' if !term.trim().is_empty() => {
                flush(&term, sign, &mut total)?;
                term.clear();
                sign = if c == '-' { -1 } else { 1 };
            }
            '-' => sign = -sign,
            '+' => {}
            c if is_ident_char(c) || c == '*' || c.is_whitespace() => term.push(c),
            _ => return None,
        }
    }
    if term.trim().is_empty() {
        return None;
    }
    flush(&term, sign, &mut total)?;
    Some(total)
}

/// Remove one equal item from `pool` for each item of `take`; the rest of
/// `from` that found no partner is returned
pub(crate) fn multiset_difference(from: &[Data], take: &[Data]) -> Vec<Data> {
    let mut pool: Vec<&Data> = take.iter().collect();
    let mut extra = Vec::new();
    for item in from {
        match pool.iter().position(|candidate| *candidate == item) {
            Some(i) => {
                pool.swap_remove(i);
            }
            None => extra.push(item.clone()),
        }
    }
    extra
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::snapshot::{Data, ExecutionStep, StepType};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Hand-built step for adapter unit tests
    pub fn step(n: usize, step_type: StepType, source: &str, vars: Vec<(&str, Data)>) -> ExecutionStep {
        ExecutionStep {
            step_number: n,
            timestamp_ns: n as u64,
            line_number: n,
            column_number: 1,
            step_type,
            source_code: source.to_string(),
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

    pub fn ints(values: &[i64]) -> Data {
        Data::list(values.iter().copied().map(Data::Int).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{ints, step};
    use super::*;
    use crate::snapshot::StepType;

    #[test]
    fn test_subscript_indices() {
        let s = step(
            1,
            StepType::Condition,
            "if arr[j] > arr[j + 1]:",
            vec![("arr", ints(&[3, 1, 2])), ("j", Data::Int(0))],
        );
        assert_eq!(subscript_indices(&s, "arr", 3), vec![0, 1]);
        assert_eq!(subscript_indices(&s, "ar", 3), Vec::<usize>::new());

        let s = step(
            2,
            StepType::Condition,
            "if arr[n - i - 1] < arr[-1]:",
            vec![("n", Data::Int(3)), ("i", Data::Int(0))],
        );
        assert_eq!(subscript_indices(&s, "arr", 3), vec![2]);

        let s = step(3, StepType::Condition, "if arr[k] > 0:", vec![]);
        assert!(subscript_indices(&s, "arr", 3).is_empty());
    }

    #[test]
    fn test_receivers_and_arguments() {
        let steps = vec![step(1, StepType::Expression, "node = stack.pop()", vec![])];
        assert_eq!(receivers(&steps, ".pop()").collect::<Vec<_>>(), vec!["stack"]);
        assert_eq!(first_argument("heapq.heappush(pq, 3)", "heappush"), Some("pq"));
        assert!(mentions("a | b", "a"));
        assert!(!mentions("abc | b", "a"));
    }

    #[test]
    fn test_multiset_difference() {
        let extra = multiset_difference(
            &[Data::Int(1), Data::Int(5), Data::Int(1)],
            &[Data::Int(5), Data::Int(1)],
        );
        assert_eq!(extra, vec![Data::Int(1)]);
    }
}
