//! Adjacency dicts and the traversal state around them

use super::{name_matches, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{analyze_code_pattern, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep, StepType};
use serde::Serialize;
use serde_json::Value as Json;

const NAME: &str = "GraphAdapter";
const KEYWORDS: [&str; 5] = ["graph", "adj", "edges", "nodes", "vertices"];

/// Traversal strategy inferred from companion variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphAlgorithm {
    Bfs,
    Dfs,
    DfsRecursive,
    ShortestPath,
    Unknown,
}

/// Names of the variables a traversal keeps next to the graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Companions {
    pub visited: Option<String>,
    pub queue: Option<String>,
    pub stack: Option<String>,
    pub distances: Option<String>,
}

impl Companions {
    pub fn find(steps: &[ExecutionStep]) -> Self {
        let mut found = Companions::default();
        for step in steps {
            for (name, value) in &step.variables_state {
                let lower = name.to_lowercase();
                let slot = match value {
                    Data::Set(_) | Data::List(_) if lower.contains("visit") || lower.contains("seen") => {
                        &mut found.visited
                    }
                    Data::List(_) if lower.contains("queue") || lower.contains("frontier") => &mut found.queue,
                    Data::List(_) if lower.contains("stack") => &mut found.stack,
                    Data::Dict(_) if lower.contains("dist") => &mut found.distances,
                    _ => continue,
                };
                slot.get_or_insert_with(|| name.clone());
            }
        }
        found
    }

    pub fn algorithm(&self, recursive: bool) -> GraphAlgorithm {
        match self {
            Companions { queue: Some(_), visited: Some(_), .. } => GraphAlgorithm::Bfs,
            Companions { stack: Some(_), visited: Some(_), .. } => GraphAlgorithm::Dfs,
            Companions { visited: Some(_), .. } if recursive => GraphAlgorithm::DfsRecursive,
            Companions { distances: Some(_), .. } => GraphAlgorithm::ShortestPath,
            _ => GraphAlgorithm::Unknown,
        }
    }
}

fn is_adjacency(value: &Data) -> bool {
    value.as_dict().is_some_and(|pairs| {
        !pairs.is_empty()
            && pairs
                .iter()
                .all(|(_, v)| matches!(v, Data::List(_) | Data::Set(_)))
    })
}

fn members(value: Option<&Data>) -> &[Data] {
    value.and_then(Data::as_sequence).unwrap_or(&[])
}

/// `for v in graph[u]:` → (`v`, `u`). Tuple targets keep their first name.
fn neighbor_loop<'a>(source: &'a str, graph: &str) -> Option<(&'a str, &'a str)> {
    let rest = source.trim_start().strip_prefix("for ")?;
    let (target, iterable) = rest.split_once(" in ")?;
    let target = target.trim().trim_start_matches('(').split(',').next()?.trim();
    let iterable = iterable.trim().trim_end_matches(':').trim();
    let key = iterable
        .strip_prefix(graph)?
        .trim_start()
        .strip_prefix('[')?
        .strip_suffix(']')?
        .trim();
    Some((target, key))
}

#[derive(Debug, Clone, Default)]
pub struct GraphAdapter {
    tracking: Tracking,
    algorithm: Option<GraphAlgorithm>,
}

impl GraphAdapter {
    pub fn new(variable: Option<String>) -> Self {
        GraphAdapter {
            tracking: Tracking::new(variable),
            algorithm: None,
        }
    }

    /// Algorithm detected by the last generation
    pub fn algorithm(&self) -> GraphAlgorithm {
        self.algorithm.unwrap_or(GraphAlgorithm::Unknown)
    }

    fn layout(graph: &Data, n: usize) -> AnimationCommand {
        let pairs = graph.as_dict().unwrap_or(&[]);
        let nodes: Vec<String> = pairs.iter().map(|(k, _)| k.key_text()).collect();
        let edges: Vec<Json> = pairs
            .iter()
            .flat_map(|(u, targets)| {
                members(Some(targets)).iter().map(move |v| {
                    // Weighted edges are stored as (node, weight) tuples
                    let target = match v {
                        Data::Tuple(items) if !items.is_empty() => items[0].key_text(),
                        other => other.key_text(),
                    };
                    serde_json::json!([u.key_text(), target])
                })
            })
            .collect();
        AnimationCommand::new(CommandType::Create)
            .ids(nodes)
            .duration(400)
            .value("edges", Json::Array(edges))
            .value("animation", "graph_layout")
            .at_step(n)
    }

    fn completion(algorithm: GraphAlgorithm) -> AnimationCommand {
        match algorithm {
            GraphAlgorithm::Bfs => AnimationCommand::new(CommandType::ColorChange)
                .id("all_visited")
                .duration(1000)
                .value("color", "#2ECC71")
                .value("pulse", true),
            GraphAlgorithm::ShortestPath => AnimationCommand::new(CommandType::Highlight)
                .id("shortest_path")
                .duration(1000)
                .value("color", "#E74C3C")
                .value("width", 3),
            _ => AnimationCommand::new(CommandType::Clear)
                .duration(500)
                .value("reset_colors", true),
        }
    }
}

impl VisualizationAdapter for GraphAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Graph
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        if self.tracking.is_pinned() {
            return self.tracking.probe(steps, &[], |_, v| v.as_dict().is_some());
        }
        self.tracking.probe(steps, &KEYWORDS, |name, value| {
            is_adjacency(value) || (name_matches(name, &KEYWORDS) && value.as_dict().is_some())
        })
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let graph = self.tracking.require(NAME)?.to_string();
        let companions = Companions::find(steps);
        let algorithm = companions.algorithm(analyze_code_pattern(steps).has_recursion);
        self.algorithm = Some(algorithm);

        let mut out = Vec::new();
        let mut previous: Option<&ExecutionStep> = None;
        let mut laid_out = false;
        let mut visit_order = 0usize;

        for step in steps {
            let n = step.step_number;
            if !laid_out {
                if let Some(value) = step.variable(&graph) {
                    out.push(Self::layout(value, n));
                    laid_out = true;
                }
            }

            if let Some(prev) = previous {
                if let Some(visited) = &companions.visited {
                    let before = members(prev.variable(visited));
                    for node in members(step.variable(visited)) {
                        if !before.contains(node) {
                            out.push(
                                AnimationCommand::new(CommandType::Visit)
                                    .id(node.key_text())
                                    .duration(400)
                                    .value("visited", true)
                                    .value("color", "#FF6B6B")
                                    .value("order", visit_order)
                                    .at_step(n),
                            );
                            visit_order += 1;
                        }
                    }
                }

                if let Some(frontier) = companions.queue.as_ref().or(companions.stack.as_ref()) {
                    let before = members(prev.variable(frontier));
                    let after = members(step.variable(frontier));
                    let mark = |node: &Data, status: &str, color: &str| {
                        AnimationCommand::new(CommandType::Mark)
                            .id(node.key_text())
                            .value("status", status)
                            .value("color", color)
                            .at_step(n)
                    };
                    if after.len() > before.len() {
                        for node in after.iter().filter(|node| !before.contains(node)) {
                            out.push(mark(node, "frontier", "#FFD93D"));
                        }
                    } else if after.len() < before.len() {
                        for node in before.iter().filter(|node| !after.contains(node)) {
                            out.push(mark(node, "processing", "#6BCF7F"));
                        }
                    }
                }

                if let Some(distances) = &companions.distances {
                    let before = prev.variable(distances).and_then(Data::as_dict).unwrap_or(&[]);
                    let after = step.variable(distances).and_then(Data::as_dict).unwrap_or(&[]);
                    for (node, dist) in after {
                        let unchanged = before.iter().any(|(k, v)| k == node && v == dist);
                        if !unchanged {
                            out.push(
                                AnimationCommand::new(CommandType::Label)
                                    .id(node.key_text())
                                    .value("label", dist.to_string())
                                    .value("label_type", "distance")
                                    .at_step(n),
                            );
                        }
                    }
                }
            }

            if step.step_type == StepType::LoopIteration {
                let edge = neighbor_loop(&step.source_code, &graph).and_then(|(target, key)| {
                    Some((step.variable(key)?.key_text(), step.variable(target)?))
                });
                if let Some((from, to)) = edge {
                    let to = match to {
                        Data::Tuple(items) if !items.is_empty() => items[0].key_text(),
                        other => other.key_text(),
                    };
                    out.push(
                        AnimationCommand::new(CommandType::Traverse)
                            .id(format!("{}->{}", from, to))
                            .duration(350)
                            .value("traversed", true)
                            .value("color", "#4ECDC4")
                            .value("from", from)
                            .value("to", to)
                            .at_step(n),
                    );
                }
            }

            if matches!(step.step_type, StepType::LoopIteration | StepType::FunctionReturn) {
                out.push(AnimationCommand::new(CommandType::Pause).duration(150).at_step(n));
            }
            previous = Some(step);
        }

        if !laid_out {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: graph,
                expected: "dict",
            });
        }
        out.push(
            Self::completion(algorithm)
                .value("algorithm", serde_json::to_value(algorithm).unwrap_or(Json::Null))
                .at_step(steps.last().map_or(0, |s| s.step_number)),
        );
        Ok(optimize(out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::step;
    use super::*;

    fn strs(items: &[&str]) -> Data {
        Data::list(items.iter().map(|s| Data::str(s)).collect())
    }

    fn graph() -> Data {
        Data::dict(vec![
            (Data::str("A"), strs(&["B"])),
            (Data::str("B"), strs(&[])),
        ])
    }

    #[test]
    fn test_neighbor_loop_parsing() {
        assert_eq!(neighbor_loop("for nxt in graph[node]:", "graph"), Some(("nxt", "node")));
        assert_eq!(neighbor_loop("for v, w in graph[u]:", "graph"), Some(("v", "u")));
        assert_eq!(neighbor_loop("for x in items:", "graph"), None);
    }

    #[test]
    fn test_bfs_visits_and_completion() {
        let visited = |items: &[&str]| Data::Set(std::sync::Arc::new(items.iter().map(|s| Data::str(s)).collect()));
        let iter = step(
            3,
            StepType::LoopIteration,
            "for nxt in graph[node]:",
            vec![
                ("graph", graph()),
                ("visited", visited(&["A"])),
                ("queue", strs(&[])),
                ("node", Data::str("A")),
                ("nxt", Data::str("B")),
            ],
        );
        let steps = vec![
            step(
                1,
                StepType::Assignment,
                "queue = ['A']",
                vec![("graph", graph()), ("visited", visited(&[])), ("queue", strs(&["A"]))],
            ),
            step(
                2,
                StepType::Assignment,
                "node = queue.pop(0)",
                vec![("graph", graph()), ("visited", visited(&["A"])), ("queue", strs(&[]))],
            ),
            iter,
        ];
        let mut adapter = GraphAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(adapter.algorithm(), GraphAlgorithm::Bfs);
        assert_eq!(cmds[0].command_type, CommandType::Create);
        assert_eq!(cmds[0].values["edges"], serde_json::json!([["A", "B"]]));
        assert!(cmds
            .iter()
            .any(|c| c.command_type == CommandType::Visit && c.target_ids == vec!["A"]));
        assert!(cmds
            .iter()
            .any(|c| c.command_type == CommandType::Traverse && c.target_ids == vec!["A->B"]));
        assert_eq!(cmds.last().map(|c| c.command_type), Some(CommandType::ColorChange));
    }
}
