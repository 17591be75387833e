//! Binary heaps kept in flat lists, usually through `heapq`

use super::{first_argument, multiset_difference, name_matches, Tracking, VisualizationAdapter};
use super::AdapterError;
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{compare_data, json_value, optimize, tree_position};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};
use serde_json::Value as Json;
use std::cmp::Ordering;

const NAME: &str = "HeapAdapter";
const KEYWORDS: [&str; 6] = ["heap", "pq", "priority", "heapq", "min_heap", "max_heap"];
const HEAPQ_CALLS: [&str; 5] = ["heappush", "heappop", "heapify", "heappushpop", "heapreplace"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapOrder {
    #[default]
    Min,
    Max,
}

impl HeapOrder {
    /// Sample up to ten parent/child pairs. Ambiguous samples default to min.
    pub fn detect(items: &[Data]) -> Self {
        let pairs = || (1..items.len().min(10)).map(|i| compare_data(&items[(i - 1) / 2], &items[i]));
        let is_min = pairs().all(|o| matches!(o, Some(Ordering::Less | Ordering::Equal)));
        let is_max = pairs().all(|o| matches!(o, Some(Ordering::Greater | Ordering::Equal)));
        if !is_min && is_max {
            HeapOrder::Max
        } else {
            HeapOrder::Min
        }
    }

    /// Whether `child` must move above `parent`
    fn violates(self, child: &Data, parent: &Data) -> bool {
        match (self, compare_data(child, parent)) {
            (HeapOrder::Min, Some(Ordering::Less)) => true,
            (HeapOrder::Max, Some(Ordering::Greater)) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeapOrder::Min => "min",
            HeapOrder::Max => "max",
        }
    }
}

/// Child/parent index pairs swapped while sifting the last item up
pub fn sift_up_path(heap: &[Data], order: HeapOrder) -> Vec<(usize, usize)> {
    let mut items = heap.to_vec();
    let mut path = Vec::new();
    let mut idx = items.len().saturating_sub(1);
    while idx > 0 {
        let parent = (idx - 1) / 2;
        if !order.violates(&items[idx], &items[parent]) {
            break;
        }
        items.swap(idx, parent);
        path.push((idx, parent));
        idx = parent;
    }
    path
}

fn positions(indices: &[usize]) -> Json {
    Json::Array(indices.iter().map(|&i| tree_position(i).to_json()).collect())
}

#[derive(Debug, Clone, Default)]
pub struct HeapAdapter {
    tracking: Tracking,
    order: Option<HeapOrder>,
}

impl HeapAdapter {
    pub fn new(variable: Option<String>) -> Self {
        HeapAdapter {
            tracking: Tracking::new(variable),
            order: None,
        }
    }

    pub fn order(&self) -> HeapOrder {
        self.order.unwrap_or_default()
    }

    fn insertion(&self, old: &[Data], new: &[Data], n: usize, out: &mut Vec<AnimationCommand>) {
        let inserted = multiset_difference(new, old)
            .into_iter()
            .next()
            .or_else(|| new.last().cloned())
            .unwrap_or_default();
        let mut pre_sift = old.to_vec();
        pre_sift.push(inserted.clone());
        let tail = pre_sift.len() - 1;

        out.push(
            AnimationCommand::new(CommandType::Create)
                .indices([tail])
                .duration(400)
                .value("value", json_value(&inserted))
                .value("animation", "heap_insert")
                .value("tree_position", tree_position(tail).to_json())
                .at_step(n),
        );
        for (k, (child, parent)) in sift_up_path(&pre_sift, self.order()).into_iter().enumerate() {
            out.push(
                AnimationCommand::new(CommandType::Swap)
                    .indices([child, parent])
                    .duration(500)
                    .delay(k as u64 * 200)
                    .value("animation", "sift_up")
                    .value("step", k)
                    .value("tree_positions", positions(&[child, parent]))
                    .at_step(n),
            );
        }
    }

    fn exchanges(old: &[Data], new: &[Data], n: usize, out: &mut Vec<AnimationCommand>) {
        let len = old.len().min(new.len());
        let mut used = vec![false; len];
        for i in 0..len {
            if used[i] || old[i] == new[i] {
                continue;
            }
            let partner = (i + 1..len).find(|&j| !used[j] && old[i] == new[j] && old[j] == new[i]);
            if let Some(j) = partner {
                used[i] = true;
                used[j] = true;
                out.push(
                    AnimationCommand::new(CommandType::Swap)
                        .indices([i, j])
                        .duration(450)
                        .value("animation", "heap_swap")
                        .value("tree_positions", positions(&[i, j]))
                        .at_step(n),
                );
            }
        }
    }

    fn layout(items: &[Data], n: usize, order: HeapOrder) -> AnimationCommand {
        let indices: Vec<usize> = (0..items.len()).collect();
        AnimationCommand::new(CommandType::Create)
            .indices(indices.iter().copied())
            .duration(400)
            .value("values", json_value(&Data::list(items.to_vec())))
            .value("heap_type", order.as_str())
            .value("tree_positions", positions(&indices))
            .meta("view", "dual")
            .at_step(n)
    }
}

impl VisualizationAdapter for HeapAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Heap
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let is_list = |value: &Data| value.as_list().is_some();
        if self.tracking.is_pinned() {
            return self.tracking.probe(steps, &[], |_, v| is_list(v));
        }
        if self.tracking.probe(steps, &KEYWORDS, |name, v| {
            name_matches(name, &KEYWORDS) && v.as_list().is_some_and(|items| !items.is_empty())
        }) {
            return true;
        }
        // heapq calls name the heap as their first argument
        for step in steps {
            for call in HEAPQ_CALLS {
                let Some(arg) = first_argument(&step.source_code, call) else {
                    continue;
                };
                if steps.iter().any(|s| s.variable(arg).is_some_and(is_list)) {
                    self.tracking.set(arg.to_string());
                    return true;
                }
            }
        }
        false
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?.to_string();
        let mut out = Vec::new();
        let mut previous: Option<&[Data]> = None;

        for step in steps {
            let Some(current) = step.variable(&name).and_then(Data::as_list) else {
                continue;
            };
            if self.order.is_none() && current.len() >= 2 {
                self.order = Some(HeapOrder::detect(current));
            }
            let n = step.step_number;
            match previous {
                None => out.push(Self::layout(current, n, self.order())),
                Some(old) if current.len() == old.len() + 1 => {
                    self.insertion(old, current, n, &mut out)
                }
                Some(old) if current.len() + 1 == old.len() => out.push(
                    AnimationCommand::new(CommandType::Pop)
                        .indices([0])
                        .duration(500)
                        .value("value", json_value(&old[0]))
                        .value("animation", "heap_extract")
                        .value("tree_position", tree_position(0).to_json())
                        .at_step(n),
                ),
                Some(old) if current.len() == old.len() => Self::exchanges(old, current, n, &mut out),
                // Rebuilt or reassigned
                Some(_) => out.push(Self::layout(current, n, self.order())),
            }
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name,
                expected: "list",
            });
        }
        Ok(optimize(out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ints, step};
    use super::*;
    use crate::snapshot::StepType;

    #[test]
    fn test_order_detection() {
        let min = [1, 3, 2, 7].map(Data::Int);
        let max = [9, 3, 8, 1].map(Data::Int);
        assert_eq!(HeapOrder::detect(&min), HeapOrder::Min);
        assert_eq!(HeapOrder::detect(&max), HeapOrder::Max);
        assert_eq!(HeapOrder::detect(&[Data::Int(1)]), HeapOrder::Min);
    }

    #[test]
    fn test_sift_up_restores_heap() {
        let pre = [1, 5, 0].map(Data::Int);
        let path = sift_up_path(&pre, HeapOrder::Min);
        assert_eq!(path, vec![(2, 0)]);

        let pre = [1, 3, 2, 7, 8, 9, 4, 0].map(Data::Int);
        let path = sift_up_path(&pre, HeapOrder::Min);
        assert_eq!(path, vec![(7, 3), (3, 1), (1, 0)]);
    }

    #[test]
    fn test_heappush_generates_insert_and_sift() {
        let steps = vec![
            step(1, StepType::Assignment, "heap = [1, 5]", vec![("heap", ints(&[1, 5]))]),
            step(
                2,
                StepType::Expression,
                "heapq.heappush(heap, 0)",
                vec![("heap", ints(&[0, 5, 1]))],
            ),
            step(3, StepType::Assignment, "x = heapq.heappop(heap)", vec![("heap", ints(&[1, 5]))]),
        ];
        let mut adapter = HeapAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.tracked_variable(), Some("heap"));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let kinds: Vec<_> = cmds.iter().map(|c| c.command_type).collect();
        assert_eq!(
            kinds,
            vec![CommandType::Create, CommandType::Create, CommandType::Swap, CommandType::Pop]
        );
        assert_eq!(cmds[1].target_indices, vec![2]);
        assert_eq!(cmds[2].target_indices, vec![2, 0]);
        assert_eq!(cmds[1].values["tree_position"]["depth"], 1);
    }

    #[test]
    fn test_detects_heapq_argument() {
        let steps = vec![
            step(1, StepType::Assignment, "data = [4, 2]", vec![("data", ints(&[4, 2]))]),
            step(2, StepType::Expression, "heapq.heapify(data)", vec![("data", ints(&[2, 4]))]),
        ];
        let mut adapter = HeapAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.tracked_variable(), Some("data"));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(cmds[1].command_type, CommandType::Swap);
    }
}
