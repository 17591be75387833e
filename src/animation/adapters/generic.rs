//! Fallback adapter: variable changes and control flow of any program

use super::{AdapterError, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{detect_variable_changes, json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{ExecutionStep, StepType};

#[derive(Debug, Clone, Default)]
pub struct GenericAdapter;

impl GenericAdapter {
    pub fn new() -> Self {
        GenericAdapter
    }

    fn control_flow(step: &ExecutionStep) -> Option<AnimationCommand> {
        let line = step.line_number;
        let cmd = match step.step_type {
            StepType::Condition => {
                let taken = step.condition_result.unwrap_or(false);
                AnimationCommand::new(CommandType::Highlight)
                    .id(format!("line_{}", line))
                    .duration(400)
                    .value("condition_result", taken)
                    .value("color", if taken { "#4ECDC4" } else { "#FF6B6B" })
            }
            StepType::LoopStart => AnimationCommand::new(CommandType::Mark)
                .id(format!("loop_{}", line))
                .duration(300)
                .value("animation", "loop_enter"),
            StepType::LoopEnd => AnimationCommand::new(CommandType::Unmark)
                .id(format!("loop_{}", line))
                .duration(200),
            StepType::FunctionCall => {
                let function = step
                    .call_stack
                    .last()
                    .map_or("<module>", |frame| frame.function_name.as_str());
                AnimationCommand::new(CommandType::Mark)
                    .id(format!("func_{}", function))
                    .duration(400)
                    .value("function", function)
                    .value("depth", step.call_stack.len())
            }
            StepType::FunctionReturn => AnimationCommand::new(CommandType::Unmark)
                .id("func_return")
                .duration(350)
                .value(
                    "return_value",
                    step.expression_value.as_ref().map_or(serde_json::Value::Null, json_value),
                ),
            StepType::Print => AnimationCommand::new(CommandType::Label)
                .id("console")
                .duration(300)
                .value("output", step.stdout_snapshot.lines().last().unwrap_or("")),
            _ => return None,
        };
        Some(cmd.value("line", line).at_step(step.step_number))
    }
}

impl VisualizationAdapter for GenericAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Generic
    }

    fn tracked_variable(&self) -> Option<&str> {
        None
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        !steps.is_empty()
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let mut out = Vec::new();
        let mut previous: Option<&ExecutionStep> = None;

        for step in steps {
            let n = step.step_number;
            let changes = detect_variable_changes(previous, step);
            for name in &changes.new_variables {
                if let Some(value) = step.variable(name) {
                    out.push(
                        AnimationCommand::new(CommandType::Create)
                            .id(name.as_str())
                            .duration(350)
                            .value("value", json_value(value))
                            .value("type", value.type_name())
                            .at_step(n),
                    );
                }
            }
            for (name, (old, new)) in &changes.value_changes {
                out.push(
                    AnimationCommand::new(CommandType::SetValue)
                        .id(name.as_str())
                        .duration(300)
                        .value("old_value", json_value(old))
                        .value("new_value", json_value(new))
                        .at_step(n),
                );
            }
            for name in &changes.deleted_variables {
                out.push(
                    AnimationCommand::new(CommandType::Delete)
                        .id(name.as_str())
                        .duration(300)
                        .at_step(n),
                );
            }
            out.extend(Self::control_flow(step));
            previous = Some(step);
        }
        Ok(optimize(out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::step;
    use super::*;
    use crate::snapshot::Data;

    #[test]
    fn test_empty_trace_is_not_handled() {
        assert!(!GenericAdapter::new().can_handle(&[]));
    }

    #[test]
    fn test_variables_and_conditions() {
        let mut cond = step(2, StepType::Condition, "if x > 1:", vec![("x", Data::Int(2))]);
        cond.condition_result = Some(true);
        let steps = vec![
            step(1, StepType::Assignment, "x = 1", vec![("x", Data::Int(1))]),
            step(2, StepType::Assignment, "x = 2", vec![("x", Data::Int(2))]),
            cond,
            step(4, StepType::Assignment, "del x", vec![]),
        ];
        let mut adapter = GenericAdapter::new();
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let summary: Vec<_> = cmds
            .iter()
            .map(|c| (c.command_type, c.target_ids[0].as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CommandType::Create, "x"),
                (CommandType::SetValue, "x"),
                (CommandType::Highlight, "line_2"),
                (CommandType::Delete, "x"),
            ]
        );
        assert_eq!(cmds[2].values["color"], "#4ECDC4");
    }
}
