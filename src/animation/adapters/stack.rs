//! Lists used as LIFO stacks

use super::{receivers, sources_contain, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};

const NAME: &str = "StackAdapter";
const KEYWORDS: [&str; 5] = ["stack", "stk", "call_stack", "undo", "history"];

#[derive(Debug, Clone, Default)]
pub struct StackAdapter {
    tracking: Tracking,
    max_size: usize,
}

impl StackAdapter {
    pub fn new(variable: Option<String>) -> Self {
        StackAdapter {
            tracking: Tracking::new(variable),
            max_size: 0,
        }
    }

    /// Largest size observed by the last generation
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn push(index: usize, value: &Data, size: usize, n: usize) -> AnimationCommand {
        AnimationCommand::new(CommandType::Push)
            .indices([index])
            .duration(450)
            .value("value", json_value(value))
            .value("animation", "drop_in")
            .value("stack_size", size)
            .meta("physics", "spring_bounce")
            .at_step(n)
    }

    fn pop(index: usize, value: &Data, size: usize, n: usize) -> AnimationCommand {
        AnimationCommand::new(CommandType::Pop)
            .indices([index])
            .duration(400)
            .value("value", json_value(value))
            .value("animation", "fly_out")
            .value("stack_size", size)
            .meta("physics", "spring_release")
            .at_step(n)
    }
}

impl VisualizationAdapter for StackAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Stack
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let is_list = |_: &str, value: &Data| value.as_list().is_some();
        if self.tracking.is_pinned() {
            return self.tracking.probe(steps, &[], is_list);
        }
        let named = self.tracking.probe(steps, &KEYWORDS, |name, value| {
            super::name_matches(name, &KEYWORDS) && is_list(name, value)
        });
        if named {
            return true;
        }
        if !(sources_contain(steps, ".append(") && sources_contain(steps, ".pop()")) {
            return false;
        }
        // The receiver of `.pop()` is the stack
        let receiver = receivers(steps, ".pop()")
            .find(|name| steps.iter().any(|s| s.variable(name).is_some_and(|v| v.as_list().is_some())))
            .map(str::to_string);
        match receiver {
            Some(name) => {
                self.tracking.set(name);
                true
            }
            None => self.tracking.probe(steps, &[], is_list),
        }
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?.to_string();
        let mut out = Vec::new();
        let mut previous: Option<&[Data]> = None;
        self.max_size = 0;

        for step in steps {
            let Some(current) = step.variable(&name).and_then(Data::as_list) else {
                continue;
            };
            self.max_size = self.max_size.max(current.len());
            let n = step.step_number;
            match previous {
                None if !current.is_empty() => out.push(
                    AnimationCommand::new(CommandType::Create)
                        .indices(0..current.len())
                        .value("values", json_value(&Data::list(current.to_vec())))
                        .at_step(n),
                ),
                None => {}
                Some(old) if current.len() > old.len() => {
                    for (i, value) in current.iter().enumerate().skip(old.len()) {
                        out.push(Self::push(i, value, i + 1, n));
                    }
                }
                Some(old) if current.len() < old.len() => {
                    for i in (current.len()..old.len()).rev() {
                        out.push(Self::pop(i, &old[i], i, n));
                    }
                }
                Some(_) => {}
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
    fn test_detects_by_source_pattern() {
        let steps = vec![
            step(1, StepType::Expression, "s.append(1)", vec![("s", ints(&[1]))]),
            step(2, StepType::Assignment, "top = s.pop()", vec![("s", ints(&[]))]),
        ];
        let mut adapter = StackAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.tracked_variable(), Some("s"));
    }

    #[test]
    fn test_push_and_pop() {
        let steps = vec![
            step(1, StepType::Assignment, "stack = []", vec![("stack", ints(&[]))]),
            step(2, StepType::Expression, "", vec![("stack", ints(&[1]))]),
            step(3, StepType::Expression, "", vec![("stack", ints(&[1, 2]))]),
            step(4, StepType::Expression, "", vec![("stack", ints(&[1]))]),
        ];
        let mut adapter = StackAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let kinds: Vec<_> = cmds.iter().map(|c| c.command_type).collect();
        assert_eq!(kinds, vec![CommandType::Push, CommandType::Push, CommandType::Pop]);
        assert_eq!(cmds[2].target_indices, vec![1]);
        assert_eq!(cmds[2].values["value"], 2);
        assert_eq!(adapter.max_size(), 2);
    }
}
