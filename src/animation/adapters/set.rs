//! Set membership and set algebra

use super::{mentions, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};
use indexmap::IndexMap;

const NAME: &str = "SetAdapter";

/// Set operation spelled on a source line, by method name or operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    Union,
    Intersection,
    Difference,
}

impl SetOperation {
    pub fn detect(source: &str) -> Option<SetOperation> {
        if source.contains("union") || source.contains(" | ") || source.contains("|=") {
            Some(SetOperation::Union)
        } else if source.contains("intersection") || source.contains(" & ") || source.contains("&=") {
            Some(SetOperation::Intersection)
        } else if source.contains("difference") || source.contains(" - ") || source.contains("-=") {
            Some(SetOperation::Difference)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperation::Union => "union",
            SetOperation::Intersection => "intersection",
            SetOperation::Difference => "difference",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            SetOperation::Union => "#4ECDC4",
            SetOperation::Intersection => "#FFD93D",
            SetOperation::Difference => "#FF6B6B",
        }
    }
}

fn element_id(set: &str, element: &Data) -> String {
    format!("{}::{}", set, element.key_text())
}

#[derive(Debug, Clone, Default)]
pub struct SetAdapter {
    tracking: Tracking,
    /// Every set-valued variable, in first-seen order
    sets: Vec<String>,
}

impl SetAdapter {
    pub fn new(variable: Option<String>) -> Self {
        SetAdapter {
            tracking: Tracking::new(variable),
            sets: Vec::new(),
        }
    }

    pub fn sets(&self) -> &[String] {
        &self.sets
    }

    fn diff(set: &str, old: &[Data], new: &[Data], n: usize, out: &mut Vec<AnimationCommand>) {
        for element in new.iter().filter(|e| !old.contains(e)) {
            out.push(
                AnimationCommand::new(CommandType::Create)
                    .id(element_id(set, element))
                    .duration(400)
                    .value("element", json_value(element))
                    .value("set_name", set)
                    .value("set_size", new.len())
                    .value("animation", "bubble_in")
                    .at_step(n),
            );
        }
        for element in old.iter().filter(|e| !new.contains(e)) {
            out.push(
                AnimationCommand::new(CommandType::Delete)
                    .id(element_id(set, element))
                    .duration(350)
                    .value("element", json_value(element))
                    .value("set_name", set)
                    .value("animation", "bubble_out")
                    .at_step(n),
            );
        }
    }

    fn venn(&self, step: &ExecutionStep) -> Option<AnimationCommand> {
        let involved: Vec<&str> = self
            .sets
            .iter()
            .map(String::as_str)
            .filter(|name| mentions(&step.source_code, name))
            .collect();
        let [a, b, ..] = involved.as_slice() else {
            return None;
        };
        let operation = SetOperation::detect(&step.source_code)?;
        Some(
            AnimationCommand::new(CommandType::Highlight)
                .id(format!("venn::{}::{}", a, b))
                .duration(600)
                .value("operation", operation.as_str())
                .value("sets", involved.clone())
                .value("color", operation.color())
                .value("animation", "venn_pulse")
                .at_step(step.step_number),
        )
    }
}

impl VisualizationAdapter for SetAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Set
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        if !self.tracking.probe(steps, &[], |_, value| value.as_set().is_some()) {
            return false;
        }
        self.sets.clear();
        for step in steps {
            for (name, value) in &step.variables_state {
                if value.as_set().is_some() && self.tracking.admits(name) && !self.sets.contains(name) {
                    self.sets.push(name.clone());
                }
            }
        }
        true
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        if self.sets.is_empty() {
            self.sets.push(name.to_string());
        }
        let mut out = Vec::new();
        let mut previous: IndexMap<&str, &[Data]> = IndexMap::new();

        for step in steps {
            for set in &self.sets {
                let Some(current) = step.variable(set).and_then(Data::as_set) else {
                    continue;
                };
                let old = previous.get(set.as_str()).copied().unwrap_or(&[]);
                Self::diff(set, old, current, step.step_number, &mut out);
                previous.insert(set.as_str(), current);
            }
            if let Some(cmd) = self.venn(step) {
                out.push(cmd);
            }
        }

        if previous.is_empty() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "set",
            });
        }
        Ok(optimize(out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::step;
    use super::*;
    use crate::snapshot::StepType;
    use std::sync::Arc;

    fn set(values: &[i64]) -> Data {
        Data::Set(Arc::new(values.iter().copied().map(Data::Int).collect()))
    }

    #[test]
    fn test_detect_operation() {
        assert_eq!(SetOperation::detect("c = a | b"), Some(SetOperation::Union));
        assert_eq!(SetOperation::detect("c = a.intersection(b)"), Some(SetOperation::Intersection));
        assert_eq!(SetOperation::detect("a -= b"), Some(SetOperation::Difference));
        assert_eq!(SetOperation::detect("a.add(3)"), None);
    }

    #[test]
    fn test_membership_and_venn() {
        let steps = vec![
            step(1, StepType::Assignment, "a = {1, 2}", vec![("a", set(&[1, 2]))]),
            step(2, StepType::Assignment, "b = {2, 3}", vec![("a", set(&[1, 2])), ("b", set(&[2, 3]))]),
            step(
                3,
                StepType::Assignment,
                "a = a & b",
                vec![("a", set(&[2])), ("b", set(&[2, 3]))],
            ),
        ];
        let mut adapter = SetAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.sets(), &["a".to_string(), "b".to_string()]);
        let cmds = adapter.generate_animations(&steps).unwrap();

        let ids: Vec<_> = cmds
            .iter()
            .map(|c| (c.command_type, c.target_ids[0].as_str()))
            .collect();
        assert_eq!(
            ids,
            vec![
                (CommandType::Create, "a::1"),
                (CommandType::Create, "a::2"),
                (CommandType::Create, "b::2"),
                (CommandType::Create, "b::3"),
                (CommandType::Delete, "a::1"),
                (CommandType::Highlight, "venn::a::b"),
            ]
        );
        assert_eq!(cmds[5].values["operation"], "intersection");
    }

    #[test]
    fn test_no_set_is_rejected() {
        let steps = vec![step(1, StepType::Assignment, "x = 1", vec![("x", Data::Int(1))])];
        assert!(!SetAdapter::new(None).can_handle(&steps));
    }
}
