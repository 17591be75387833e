//! Flat lists: sorting, swaps and element edits

use super::{subscript_indices, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{compare_data, find_variable, is_sorted, json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep, StepType};
use std::cmp::Ordering;

const NAME: &str = "ArrayAdapter";

#[derive(Debug, Clone, Default)]
pub struct ArrayAdapter {
    tracking: Tracking,
}

impl ArrayAdapter {
    pub fn new(variable: Option<String>) -> Self {
        ArrayAdapter {
            tracking: Tracking::new(variable),
        }
    }

    /// Commands for a same-variable transition `old → new`
    fn diff(&self, old: &[Data], new: &[Data], step: &ExecutionStep, out: &mut Vec<AnimationCommand>) {
        let n = step.step_number;
        if new.len() > old.len() {
            for (i, value) in new.iter().enumerate().skip(old.len()) {
                out.push(
                    AnimationCommand::new(CommandType::Create)
                        .indices([i])
                        .value("value", json_value(value))
                        .at_step(n),
                );
            }
            return;
        }
        if new.len() < old.len() {
            for i in (new.len()..old.len()).rev() {
                out.push(
                    AnimationCommand::new(CommandType::Delete)
                        .indices([i])
                        .value("value", json_value(&old[i]))
                        .at_step(n),
                );
            }
            return;
        }

        let changed: Vec<usize> = (0..new.len()).filter(|&i| old[i] != new[i]).collect();
        match changed.as_slice() {
            [] => {}
            &[a, b] => {
                if old[a] == new[b] && old[b] == new[a] {
                    out.push(
                        AnimationCommand::new(CommandType::Compare)
                            .indices([a, b])
                            .duration(200)
                            .value(
                                "comparison_result",
                                compare_data(&old[a], &old[b]) == Some(Ordering::Greater),
                            )
                            .at_step(n),
                    );
                }
                out.push(
                    AnimationCommand::new(CommandType::Swap)
                        .indices([a, b])
                        .duration(500)
                        .meta("swap_type", "position")
                        .at_step(n),
                );
            }
            indices => {
                for &i in indices {
                    out.push(
                        AnimationCommand::new(CommandType::SetValue)
                            .indices([i])
                            .duration(400)
                            .value("old_value", json_value(&old[i]))
                            .value("new_value", json_value(&new[i]))
                            .at_step(n),
                    );
                }
            }
        }
    }

    /// Marker for a step that left the array untouched
    fn marker(&self, name: &str, current: &[Data], step: &ExecutionStep) -> AnimationCommand {
        let n = step.step_number;
        if step.step_type == StepType::Condition {
            let indices = subscript_indices(step, name, current.len());
            match indices.as_slice() {
                [a, b, ..] => {
                    return AnimationCommand::new(CommandType::Compare)
                        .indices([*a, *b])
                        .duration(200)
                        .value("comparison_result", step.condition_result.unwrap_or(false))
                        .value("left", json_value(&current[*a]))
                        .value("right", json_value(&current[*b]))
                        .at_step(n);
                }
                [a] => {
                    return AnimationCommand::new(CommandType::Highlight)
                        .indices([*a])
                        .value("color", "#FFD700")
                        .at_step(n);
                }
                [] => {}
            }
        }
        AnimationCommand::new(CommandType::Pause).duration(100).at_step(n)
    }
}

impl VisualizationAdapter for ArrayAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Array
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        // Prefer lists of scalars over nested lists
        let flat = find_variable(steps, |name, value| {
            self.tracking.admits(name)
                && value
                    .as_list()
                    .is_some_and(|items| items.iter().all(Data::is_primitive))
        });
        let found = flat.or_else(|| {
            find_variable(steps, |name, value| {
                self.tracking.admits(name) && value.as_list().is_some()
            })
        });
        match found {
            Some(name) => {
                self.tracking.set(name);
                true
            }
            None => false,
        }
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<&[Data]> = None;

        for step in steps {
            let Some(current) = step.variable(name).and_then(Data::as_list) else {
                continue;
            };
            match previous {
                None => out.push(
                    AnimationCommand::new(CommandType::Create)
                        .indices(0..current.len())
                        .value("values", json_value(&Data::list(current.to_vec())))
                        .value("variable", name)
                        .duration(400)
                        .at_step(step.step_number),
                ),
                Some(old) => {
                    let before = out.len();
                    self.diff(old, current, step, &mut out);
                    if out.len() == before {
                        out.push(self.marker(name, current, step));
                    }
                }
            }
            previous = Some(current);
        }

        let Some(last) = previous else {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "list",
            });
        };

        let mut out = optimize(out);
        let final_step = steps.last().map_or(0, |s| s.step_number);
        if !last.is_empty() && is_sorted(last) {
            for i in 0..last.len() {
                out.push(
                    AnimationCommand::new(CommandType::Highlight)
                        .indices([i])
                        .duration(100)
                        .delay(i as u64 * 50)
                        .value("color", "#00FF00")
                        .value("animation", "sorted_celebration")
                        .at_step(final_step),
                );
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ints, step};
    use super::*;

    fn kinds(cmds: &[AnimationCommand]) -> Vec<CommandType> {
        cmds.iter().map(|c| c.command_type).collect()
    }

    #[test]
    fn test_swap_emits_compare_then_swap() {
        let steps = vec![
            step(1, StepType::Assignment, "arr = [2, 1]", vec![("arr", ints(&[2, 1]))]),
            step(
                2,
                StepType::Assignment,
                "arr[0], arr[1] = arr[1], arr[0]",
                vec![("arr", ints(&[1, 2]))],
            ),
        ];
        let mut adapter = ArrayAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(
            &kinds(&cmds)[..3],
            &[CommandType::Create, CommandType::Compare, CommandType::Swap]
        );
        assert_eq!(cmds[1].target_indices, vec![0, 1]);
        assert_eq!(cmds[2].target_indices, vec![0, 1]);
    }

    #[test]
    fn test_condition_marker_resolves_indices() {
        let mut cond = step(
            2,
            StepType::Condition,
            "if arr[j] > arr[j + 1]:",
            vec![("arr", ints(&[3, 1])), ("j", Data::Int(0))],
        );
        cond.condition_result = Some(true);
        let steps = vec![
            step(1, StepType::Assignment, "arr = [3, 1]", vec![("arr", ints(&[3, 1]))]),
            cond,
            step(3, StepType::Expression, "pass", vec![("arr", ints(&[3, 1]))]),
        ];
        let mut adapter = ArrayAdapter::new(Some("arr".into()));
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(cmds[1].command_type, CommandType::Compare);
        assert_eq!(cmds[1].values["comparison_result"], true);
        assert_eq!(cmds[2].command_type, CommandType::Pause);
        assert_eq!(cmds[2].step(), Some(3));
    }

    #[test]
    fn test_length_changes_and_edits() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("a", ints(&[5]))]),
            step(2, StepType::Expression, "", vec![("a", ints(&[5, 6, 7]))]),
            step(3, StepType::Expression, "", vec![("a", ints(&[5]))]),
            step(4, StepType::Assignment, "", vec![("a", ints(&[9]))]),
        ];
        let mut adapter = ArrayAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let deletes: Vec<_> = cmds
            .iter()
            .filter(|c| c.command_type == CommandType::Delete)
            .map(|c| c.target_indices[0])
            .collect();
        assert_eq!(deletes, vec![2, 1]);
        let set = cmds.iter().find(|c| c.command_type == CommandType::SetValue).unwrap();
        assert_eq!(set.values["old_value"], 5);
        assert_eq!(set.values["new_value"], 9);
    }

    #[test]
    fn test_sorted_final_state_celebrates() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("a", ints(&[2, 1, 3]))]),
            step(2, StepType::Assignment, "", vec![("a", ints(&[1, 2, 3]))]),
        ];
        let mut adapter = ArrayAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let tail = &cmds[cmds.len() - 3..];
        assert!(tail.iter().all(|c| c.command_type == CommandType::Highlight));
        assert_eq!(tail.iter().map(|c| c.delay_ms).collect::<Vec<_>>(), vec![0, 50, 100]);
    }
}
