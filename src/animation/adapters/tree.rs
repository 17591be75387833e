//! Nested dict trees: binary (`left`/`right`) and n-ary (`children`)

use super::{AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};
use indexmap::IndexMap;

const NAME: &str = "TreeAdapter";
const KEYWORDS: [&str; 4] = ["root", "tree", "bst", "avl"];
const VALUE_KEYS: [&str; 4] = ["val", "value", "data", "key"];
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    Binary,
    Nary,
}

/// One node of a flattened tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub value: Data,
    pub depth: usize,
    pub parent: Option<String>,
    pub side: &'static str,
}

/// Node value under the first conventional payload key
pub(crate) fn node_value(node: &Data) -> Data {
    VALUE_KEYS
        .iter()
        .find_map(|key| node.get(key))
        .cloned()
        .unwrap_or_else(|| Data::str("?"))
}

pub fn tree_shape(value: &Data) -> Option<TreeShape> {
    if value.get("left").is_some() && value.get("right").is_some() {
        Some(TreeShape::Binary)
    } else if value.get("children").is_some() {
        Some(TreeShape::Nary)
    } else {
        None
    }
}

/// Flatten a nested tree into nodes keyed by path id (`root`, `root_L`,
/// `root_R`, `root_C0`, ...)
pub fn flatten(root: &Data) -> IndexMap<String, TreeNode> {
    let mut nodes = IndexMap::new();
    visit(root, "root".to_string(), 0, None, "root", &mut nodes);
    nodes
}

fn visit(
    node: &Data,
    id: String,
    depth: usize,
    parent: Option<String>,
    side: &'static str,
    nodes: &mut IndexMap<String, TreeNode>,
) {
    if node.as_dict().is_none() || depth > MAX_DEPTH {
        return;
    }
    nodes.insert(
        id.clone(),
        TreeNode {
            value: node_value(node),
            depth,
            parent,
            side,
        },
    );
    for (key, suffix, side) in [("left", "_L", "left"), ("right", "_R", "right")] {
        if let Some(child) = node.get(key) {
            visit(child, format!("{}{}", id, suffix), depth + 1, Some(id.clone()), side, nodes);
        }
    }
    if let Some(children) = node.get("children").and_then(Data::as_sequence) {
        for (i, child) in children.iter().enumerate() {
            visit(child, format!("{}_C{}", id, i), depth + 1, Some(id.clone()), "child", nodes);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeAdapter {
    tracking: Tracking,
    shape: Option<TreeShape>,
}

impl TreeAdapter {
    pub fn new(variable: Option<String>) -> Self {
        TreeAdapter {
            tracking: Tracking::new(variable),
            shape: None,
        }
    }

    pub fn shape(&self) -> Option<TreeShape> {
        self.shape
    }

    fn diff(
        &self,
        old: &IndexMap<String, TreeNode>,
        new: &IndexMap<String, TreeNode>,
        n: usize,
        out: &mut Vec<AnimationCommand>,
    ) {
        let tree_type = match self.shape {
            Some(TreeShape::Nary) => "nary",
            _ => "binary",
        };
        for (id, node) in new {
            match old.get(id) {
                None => {
                    out.push(
                        AnimationCommand::new(CommandType::Create)
                            .id(id.as_str())
                            .duration(550)
                            .value("value", json_value(&node.value))
                            .value("depth", node.depth)
                            .value("parent", node.parent.clone())
                            .value("side", node.side)
                            .value("animation", "tree_insert")
                            .value("tree_type", tree_type)
                            .meta("layout", "hierarchical")
                            .at_step(n),
                    );
                    if let Some(parent) = &node.parent {
                        out.push(
                            AnimationCommand::new(CommandType::Traverse)
                                .id(format!("{}->{}", parent, id))
                                .duration(250)
                                .value("animation", "draw_edge")
                                .value("color", "#667eea")
                                .value("side", node.side)
                                .at_step(n),
                        );
                    }
                }
                Some(before) if before.value != node.value => out.push(
                    AnimationCommand::new(CommandType::SetValue)
                        .id(id.as_str())
                        .duration(400)
                        .value("old_value", json_value(&before.value))
                        .value("new_value", json_value(&node.value))
                        .at_step(n),
                ),
                Some(_) => {}
            }
        }
        for (id, node) in old {
            if !new.contains_key(id) {
                out.push(
                    AnimationCommand::new(CommandType::Delete)
                        .id(id.as_str())
                        .duration(500)
                        .value("value", json_value(&node.value))
                        .value("animation", "tree_remove")
                        .at_step(n),
                );
            }
        }
    }
}

impl VisualizationAdapter for TreeAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Tree
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let found = self
            .tracking
            .probe(steps, &KEYWORDS, |_, value| tree_shape(value).is_some());
        if found {
            self.shape = self
                .tracking
                .name()
                .and_then(|name| steps.iter().find_map(|s| s.variable(name).and_then(tree_shape)));
        }
        found
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<IndexMap<String, TreeNode>> = None;

        for step in steps {
            let Some(value) = step.variable(name) else {
                continue;
            };
            if tree_shape(value).is_none() {
                continue;
            }
            let current = flatten(value);
            self.diff(previous.as_ref().unwrap_or(&IndexMap::new()), &current, step.step_number, &mut out);
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "tree node dict",
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

    fn node(val: i64, left: Data, right: Data) -> Data {
        Data::dict(vec![
            (Data::str("val"), Data::Int(val)),
            (Data::str("left"), left),
            (Data::str("right"), right),
        ])
    }

    #[test]
    fn test_flatten_ids() {
        let tree = node(5, node(3, Data::None, Data::None), Data::None);
        let nodes = flatten(&tree);
        assert_eq!(nodes.keys().collect::<Vec<_>>(), vec!["root", "root_L"]);
        assert_eq!(nodes["root_L"].parent.as_deref(), Some("root"));
        assert_eq!(nodes["root_L"].depth, 1);
        assert_eq!(nodes["root_L"].value, Data::Int(3));
    }

    #[test]
    fn test_insert_emits_create_and_edge() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("root", node(5, Data::None, Data::None))]),
            step(
                2,
                StepType::Assignment,
                "",
                vec![("root", node(5, Data::None, node(8, Data::None, Data::None)))],
            ),
        ];
        let mut adapter = TreeAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.shape(), Some(TreeShape::Binary));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let last_two: Vec<_> = cmds[cmds.len() - 2..]
            .iter()
            .map(|c| (c.command_type, c.target_ids[0].clone()))
            .collect();
        assert_eq!(
            last_two,
            vec![
                (CommandType::Create, "root_R".to_string()),
                (CommandType::Traverse, "root->root_R".to_string())
            ]
        );
    }
}
