//! Adapter selection and isolated generation

use super::adapters::{
    AdapterError, ArrayAdapter, GenericAdapter, GraphAdapter, HashMapAdapter, HeapAdapter,
    LinkedListAdapter, MatrixAdapter, QueueAdapter, SetAdapter, StackAdapter, StringAdapter,
    TreeAdapter, VisualizationAdapter,
};
use super::command::AnimationCommand;
use super::diff::scale_durations;
use crate::snapshot::ExecutionStep;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Every adapter the registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AdapterKind {
    Heap,
    Tree,
    Matrix,
    HashMap,
    Graph,
    LinkedList,
    Stack,
    Queue,
    Array,
    Set,
    String,
    Generic,
}

impl AdapterKind {
    /// Default probing order. Specific shapes come before the catch-alls.
    pub const PRIORITY: [AdapterKind; 12] = [
        AdapterKind::Heap,
        AdapterKind::Tree,
        AdapterKind::Matrix,
        AdapterKind::HashMap,
        AdapterKind::Graph,
        AdapterKind::LinkedList,
        AdapterKind::Stack,
        AdapterKind::Queue,
        AdapterKind::Array,
        AdapterKind::Set,
        AdapterKind::String,
        AdapterKind::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AdapterKind::Heap => "HeapAdapter",
            AdapterKind::Tree => "TreeAdapter",
            AdapterKind::Matrix => "MatrixAdapter",
            AdapterKind::HashMap => "HashMapAdapter",
            AdapterKind::Graph => "GraphAdapter",
            AdapterKind::LinkedList => "LinkedListAdapter",
            AdapterKind::Stack => "StackAdapter",
            AdapterKind::Queue => "QueueAdapter",
            AdapterKind::Array => "ArrayAdapter",
            AdapterKind::Set => "SetAdapter",
            AdapterKind::String => "StringAdapter",
            AdapterKind::Generic => "GenericAdapter",
        }
    }

    /// Hint spelling, e.g. `linked_list`
    pub fn short_name(self) -> &'static str {
        match self {
            AdapterKind::Heap => "heap",
            AdapterKind::Tree => "tree",
            AdapterKind::Matrix => "matrix",
            AdapterKind::HashMap => "hashmap",
            AdapterKind::Graph => "graph",
            AdapterKind::LinkedList => "linked_list",
            AdapterKind::Stack => "stack",
            AdapterKind::Queue => "queue",
            AdapterKind::Array => "array",
            AdapterKind::Set => "set",
            AdapterKind::String => "string",
            AdapterKind::Generic => "generic",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AdapterKind::Heap => "Binary heaps and heapq priority queues with sift-up paths",
            AdapterKind::Tree => "Nested dict trees with left/right or children links",
            AdapterKind::Matrix => "2D grids and dynamic-programming tables",
            AdapterKind::HashMap => "Dicts with scalar keys, bucketed by hash",
            AdapterKind::Graph => "Adjacency dicts with BFS, DFS and shortest-path tracking",
            AdapterKind::LinkedList => "Dict nodes chained through next pointers",
            AdapterKind::Stack => "Lists used as LIFO stacks",
            AdapterKind::Queue => "Lists and deques used as FIFO queues",
            AdapterKind::Array => "Flat lists, sorting and in-place swaps",
            AdapterKind::Set => "Set membership and set algebra",
            AdapterKind::String => "Character-level string edits and searches",
            AdapterKind::Generic => "Variable changes and control flow for any program",
        }
    }

    /// Name of the front-end component that renders this adapter's commands
    pub fn component(self) -> &'static str {
        match self {
            AdapterKind::Heap => "AnimatedHeap",
            AdapterKind::Tree => "AnimatedTree",
            AdapterKind::Matrix => "AnimatedMatrix",
            AdapterKind::HashMap => "AnimatedHashMap",
            AdapterKind::Graph => "AnimatedGraph",
            AdapterKind::LinkedList => "AnimatedLinkedList",
            AdapterKind::Stack => "AnimatedStack",
            AdapterKind::Queue => "AnimatedQueue",
            AdapterKind::Array => "AnimatedArray",
            AdapterKind::Set => "AnimatedSet",
            AdapterKind::String => "AnimatedString",
            AdapterKind::Generic => "AnimatedGeneric",
        }
    }

    /// Resolve `heap`, `HeapAdapter`, `linked-list`, ... case-insensitively
    pub fn from_hint(hint: &str) -> Option<Self> {
        let normalized: String = hint
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        let normalized = normalized.strip_suffix("adapter").unwrap_or(&normalized);
        Self::PRIORITY
            .into_iter()
            .find(|kind| kind.short_name().replace('_', "") == normalized)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|kind| kind.name() == name)
    }

    /// Fresh adapter, optionally pinned to one variable
    pub fn instantiate(self, variable: Option<String>) -> Box<dyn VisualizationAdapter> {
        match self {
            AdapterKind::Heap => Box::new(HeapAdapter::new(variable)),
            AdapterKind::Tree => Box::new(TreeAdapter::new(variable)),
            AdapterKind::Matrix => Box::new(MatrixAdapter::new(variable)),
            AdapterKind::HashMap => Box::new(HashMapAdapter::new(variable)),
            AdapterKind::Graph => Box::new(GraphAdapter::new(variable)),
            AdapterKind::LinkedList => Box::new(LinkedListAdapter::new(variable)),
            AdapterKind::Stack => Box::new(StackAdapter::new(variable)),
            AdapterKind::Queue => Box::new(QueueAdapter::new(variable)),
            AdapterKind::Array => Box::new(ArrayAdapter::new(variable)),
            AdapterKind::Set => Box::new(SetAdapter::new(variable)),
            AdapterKind::String => Box::new(StringAdapter::new(variable)),
            AdapterKind::Generic => Box::new(GenericAdapter::new()),
        }
    }
}

/// Registry listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterInfo {
    pub name: &'static str,
    pub priority: usize,
    pub description: &'static str,
    pub component: &'static str,
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one adapter's generation, turning a panic into an [`AdapterError`]
pub fn run_adapter(
    adapter: &mut dyn VisualizationAdapter,
    steps: &[ExecutionStep],
) -> Result<Vec<AnimationCommand>, AdapterError> {
    let name = adapter.name();
    panic::catch_unwind(AssertUnwindSafe(|| adapter.generate_animations(steps))).unwrap_or_else(
        |payload| {
            Err(AdapterError::Panicked {
                adapter: name.to_string(),
                message: panic_message(payload),
            })
        },
    )
}

/// Ordered set of adapter kinds to probe.
///
/// The registry is an ordinary value; build one per caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRegistry {
    order: Vec<AdapterKind>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        AdapterRegistry::new(AdapterKind::PRIORITY.to_vec())
    }
}

impl AdapterRegistry {
    pub fn new(order: Vec<AdapterKind>) -> Self {
        AdapterRegistry { order }
    }

    pub fn order(&self) -> &[AdapterKind] {
        &self.order
    }

    fn probe(
        &self,
        kind: AdapterKind,
        steps: &[ExecutionStep],
        variable: Option<&str>,
    ) -> Option<Box<dyn VisualizationAdapter>> {
        let mut adapter = kind.instantiate(variable.map(str::to_string));
        match panic::catch_unwind(AssertUnwindSafe(|| adapter.can_handle(steps))) {
            Ok(true) => {
                debug!(
                    adapter = kind.name(),
                    variable = adapter.tracked_variable().unwrap_or("-"),
                    "adapter matched"
                );
                Some(adapter)
            }
            Ok(false) => None,
            Err(payload) => {
                warn!(
                    adapter = kind.name(),
                    error = %panic_message(payload),
                    "adapter detection panicked"
                );
                None
            }
        }
    }

    /// Every adapter that can handle the trace, in priority order
    pub fn detect_adapters(&self, steps: &[ExecutionStep]) -> Vec<Box<dyn VisualizationAdapter>> {
        if steps.is_empty() {
            return Vec::new();
        }
        self.order
            .iter()
            .filter_map(|kind| self.probe(*kind, steps, None))
            .collect()
    }

    pub fn get_primary_adapter(&self, steps: &[ExecutionStep]) -> Option<Box<dyn VisualizationAdapter>> {
        if steps.is_empty() {
            return None;
        }
        self.order
            .iter()
            .find_map(|kind| self.probe(*kind, steps, None))
    }

    /// Commands from every matching adapter, keyed by adapter name. A
    /// failing adapter contributes an empty list.
    pub fn generate_all_animations(
        &self,
        steps: &[ExecutionStep],
    ) -> IndexMap<String, Vec<AnimationCommand>> {
        self.detect_adapters(steps)
            .into_iter()
            .map(|mut adapter| {
                let commands = run_adapter(adapter.as_mut(), steps).unwrap_or_else(|err| {
                    warn!(adapter = adapter.name(), error = %err, "adapter failed");
                    Vec::new()
                });
                (adapter.name().to_string(), commands)
            })
            .collect()
    }

    fn generic_fallback(&self, steps: &[ExecutionStep]) -> Vec<AnimationCommand> {
        let mut generic = GenericAdapter::new();
        run_adapter(&mut generic, steps).unwrap_or_else(|err| {
            warn!(error = %err, "generic fallback failed");
            Vec::new()
        })
    }

    /// Commands of the primary adapter, or the generic fallback when it fails
    pub fn generate_combined_animations(&self, steps: &[ExecutionStep]) -> Vec<AnimationCommand> {
        let Some(mut primary) = self.get_primary_adapter(steps) else {
            return Vec::new();
        };
        match run_adapter(primary.as_mut(), steps) {
            Ok(commands) => commands,
            Err(err) => {
                warn!(adapter = primary.name(), error = %err, "primary adapter failed, using generic");
                self.generic_fallback(steps)
            }
        }
    }

    pub fn adapter_info(&self) -> Vec<AdapterInfo> {
        self.order
            .iter()
            .enumerate()
            .map(|(priority, kind)| AdapterInfo {
                name: kind.name(),
                priority,
                description: kind.description(),
                component: kind.component(),
            })
            .collect()
    }

    /// Pick adapters for a trace and generate their commands.
    ///
    /// A hint naming an adapter forces it (generic on failure). A hint naming
    /// a variable pins every matching adapter to that variable. Without a
    /// hint all detected adapters run. Durations are then scaled by
    /// `speed_multiplier`.
    pub fn detect_and_animate(
        &self,
        steps: &[ExecutionStep],
        variable_hint: Option<&str>,
        speed_multiplier: f64,
    ) -> IndexMap<String, Vec<AnimationCommand>> {
        let mut result = IndexMap::new();
        if steps.is_empty() {
            return result;
        }

        let hint = variable_hint.map(str::trim).filter(|h| !h.is_empty());
        let names_variable = |h: &str| steps.iter().any(|s| s.variables_state.contains_key(h));

        if let Some(kind) = hint.and_then(AdapterKind::from_hint) {
            let forced = self
                .probe(kind, steps, None)
                .map(|mut adapter| run_adapter(adapter.as_mut(), steps));
            match forced {
                Some(Ok(commands)) => {
                    result.insert(kind.name().to_string(), commands);
                }
                other => {
                    if let Some(Err(err)) = other {
                        warn!(adapter = kind.name(), error = %err, "forced adapter failed");
                    } else {
                        debug!(adapter = kind.name(), "forced adapter cannot handle trace");
                    }
                    result.insert(
                        AdapterKind::Generic.name().to_string(),
                        self.generic_fallback(steps),
                    );
                }
            }
        } else if let Some(variable) = hint.filter(|&h| names_variable(h)) {
            for kind in &self.order {
                let Some(mut adapter) = self.probe(*kind, steps, Some(variable)) else {
                    continue;
                };
                match run_adapter(adapter.as_mut(), steps) {
                    Ok(commands) => {
                        result.insert(kind.name().to_string(), commands);
                    }
                    Err(err) => warn!(adapter = kind.name(), error = %err, "adapter failed"),
                }
            }
            if result.is_empty() {
                result.insert(
                    AdapterKind::Generic.name().to_string(),
                    self.generic_fallback(steps),
                );
            }
        } else {
            if let Some(h) = hint {
                debug!(hint = h, "hint names neither an adapter nor a variable");
            }
            result = self.generate_all_animations(steps);
        }

        for commands in result.values_mut() {
            scale_durations(commands, speed_multiplier);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_resolution() {
        assert_eq!(AdapterKind::from_hint("heap"), Some(AdapterKind::Heap));
        assert_eq!(AdapterKind::from_hint("HeapAdapter"), Some(AdapterKind::Heap));
        assert_eq!(AdapterKind::from_hint("linked-list"), Some(AdapterKind::LinkedList));
        assert_eq!(AdapterKind::from_hint("LINKEDLISTADAPTER"), Some(AdapterKind::LinkedList));
        assert_eq!(AdapterKind::from_hint("arr"), None);
    }

    #[test]
    fn test_default_order_and_info() {
        let registry = AdapterRegistry::default();
        let info = registry.adapter_info();
        assert_eq!(info.len(), 12);
        assert_eq!(info[0].name, "HeapAdapter");
        assert_eq!(info[11].name, "GenericAdapter");
        assert_eq!(info[8].component, "AnimatedArray");
    }

    #[test]
    fn test_empty_trace_has_no_adapters() {
        let registry = AdapterRegistry::default();
        assert!(registry.detect_adapters(&[]).is_empty());
        assert!(registry.get_primary_adapter(&[]).is_none());
        assert!(registry.detect_and_animate(&[], None, 1.0).is_empty());
    }
}
