//! Dict nodes chained through `next` links

use super::tree::node_value;
use super::{AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{common_affixes, json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};

const NAME: &str = "LinkedListAdapter";
const KEYWORDS: [&str; 4] = ["head", "linked", "node", "ll"];
const MAX_NODES: usize = 1000;

fn is_list_node(value: &Data) -> bool {
    value.get("next").is_some() || value.get("prev").is_some()
}

/// Values along the `next` chain starting at `head`
pub fn chain(head: &Data) -> Vec<Data> {
    let mut values = Vec::new();
    let mut cursor = Some(head);
    while let Some(node) = cursor.filter(|n| n.as_dict().is_some()) {
        if values.len() >= MAX_NODES {
            break;
        }
        values.push(node_value(node));
        cursor = node.get("next");
    }
    values
}

fn node_id(position: usize) -> String {
    format!("node_{}", position)
}

#[derive(Debug, Clone, Default)]
pub struct LinkedListAdapter {
    tracking: Tracking,
}

impl LinkedListAdapter {
    pub fn new(variable: Option<String>) -> Self {
        LinkedListAdapter {
            tracking: Tracking::new(variable),
        }
    }

    fn insert(position: usize, value: &Data, n: usize, out: &mut Vec<AnimationCommand>) {
        out.push(
            AnimationCommand::new(CommandType::Create)
                .id(node_id(position))
                .duration(500)
                .value("value", json_value(value))
                .value("position", position)
                .value("animation", "spring_in")
                .value("linked_list", true)
                .at_step(n),
        );
        if position > 0 {
            out.push(
                AnimationCommand::new(CommandType::Traverse)
                    .id(format!("{}->{}", node_id(position - 1), node_id(position)))
                    .value("animation", "draw_arrow")
                    .value("color", "#4ECDC4")
                    .at_step(n),
            );
        }
    }

    fn diff(old: &[Data], new: &[Data], n: usize, out: &mut Vec<AnimationCommand>) {
        let (prefix, suffix) = common_affixes(old, new);
        let old_mid = prefix..old.len() - suffix;
        let new_mid = prefix..new.len() - suffix;
        let paired = old_mid.len().min(new_mid.len());

        for k in 0..paired {
            let i = prefix + k;
            out.push(
                AnimationCommand::new(CommandType::SetValue)
                    .id(node_id(i))
                    .duration(400)
                    .value("old_value", json_value(&old[i]))
                    .value("new_value", json_value(&new[i]))
                    .at_step(n),
            );
        }
        for i in new_mid.clone().skip(paired) {
            Self::insert(i, &new[i], n, out);
        }
        for i in old_mid.skip(paired).rev() {
            out.push(
                AnimationCommand::new(CommandType::Delete)
                    .id(node_id(i))
                    .duration(450)
                    .value("value", json_value(&old[i]))
                    .value("animation", "fade_shrink")
                    .at_step(n),
            );
        }
    }
}

impl VisualizationAdapter for LinkedListAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::LinkedList
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        self.tracking.probe(steps, &KEYWORDS, |_, value| is_list_node(value))
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<Vec<Data>> = None;

        for step in steps {
            let Some(head) = step.variable(name) else {
                continue;
            };
            // `head = None` empties the list
            let current = if *head == Data::None { Vec::new() } else { chain(head) };
            if current.is_empty() && previous.is_none() && *head != Data::None {
                continue;
            }
            Self::diff(previous.as_deref().unwrap_or(&[]), &current, step.step_number, &mut out);
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "linked node dict",
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

    fn list(values: &[i64]) -> Data {
        values.iter().rev().fold(Data::None, |next, v| {
            Data::dict(vec![(Data::str("val"), Data::Int(*v)), (Data::str("next"), next)])
        })
    }

    #[test]
    fn test_chain_follows_next() {
        assert_eq!(chain(&list(&[1, 2, 3])), vec![Data::Int(1), Data::Int(2), Data::Int(3)]);
        assert!(chain(&Data::None).is_empty());
    }

    #[test]
    fn test_append_and_remove() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("head", list(&[1]))]),
            step(2, StepType::Assignment, "", vec![("head", list(&[1, 2]))]),
            step(3, StepType::Assignment, "", vec![("head", list(&[2]))]),
        ];
        let mut adapter = LinkedListAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let summary: Vec<_> = cmds
            .iter()
            .map(|c| (c.command_type, c.target_ids[0].clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (CommandType::Create, "node_0".to_string()),
                (CommandType::Create, "node_1".to_string()),
                (CommandType::Traverse, "node_0->node_1".to_string()),
                (CommandType::Delete, "node_0".to_string()),
            ]
        );
    }
}
