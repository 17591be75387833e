//! 2-D lists: DP tables, grids and boards

use super::{name_matches, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep, StepType};
use serde::Serialize;

const NAME: &str = "MatrixAdapter";
const KEYWORDS: [&str; 9] = [
    "matrix", "grid", "board", "dp", "memo", "table", "maze", "mat", "cells",
];
const DEFAULT_COLOR: &str = "#667eea";
const LOW: (f64, f64, f64) = (102.0, 126.0, 234.0);
const HIGH: (f64, f64, f64) = (240.0, 147.0, 251.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    DpTable,
    Pathfinding,
    GameBoard,
    Generic,
}

impl GridType {
    pub fn from_name(name: &str) -> GridType {
        if name_matches(name, &["dp", "memo", "table"]) {
            GridType::DpTable
        } else if name_matches(name, &["grid", "maze", "path"]) {
            GridType::Pathfinding
        } else if name_matches(name, &["board", "game"]) {
            GridType::GameBoard
        } else {
            GridType::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GridType::DpTable => "dp_table",
            GridType::Pathfinding => "pathfinding",
            GridType::GameBoard => "game_board",
            GridType::Generic => "generic",
        }
    }
}

fn is_matrix(value: &Data) -> bool {
    value
        .as_list()
        .and_then(|rows| rows.first())
        .is_some_and(|row| row.as_list().is_some())
}

/// Rows of a matrix snapshot; non-list rows read as empty
fn rows_of(value: &Data) -> Vec<&[Data]> {
    value
        .as_list()
        .unwrap_or(&[])
        .iter()
        .map(|row| row.as_list().unwrap_or(&[]))
        .collect()
}

fn shape(rows: &[&[Data]]) -> (usize, usize) {
    (rows.len(), rows.first().map_or(0, |row| row.len()))
}

/// Heatmap color of a cell relative to the numeric range of its grid
pub fn heat_color(value: &Data, range: Option<(f64, f64)>) -> String {
    match value {
        Data::Bool(true) => return "#4ECDC4".to_string(),
        Data::Bool(false) => return "#2C3E50".to_string(),
        _ => {}
    }
    let (Some(v), Some((lo, hi))) = (value.as_float(), range) else {
        return DEFAULT_COLOR.to_string();
    };
    let t = if hi > lo { ((v - lo) / (hi - lo)).clamp(0.0, 1.0) } else { 0.5 };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        mix(LOW.0, HIGH.0),
        mix(LOW.1, HIGH.1),
        mix(LOW.2, HIGH.2)
    )
}

fn numeric_range(rows: &[&[Data]]) -> Option<(f64, f64)> {
    rows.iter()
        .flat_map(|row| row.iter())
        .filter(|cell| !matches!(cell, Data::Bool(_)))
        .filter_map(Data::as_float)
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

#[derive(Debug, Clone, Default)]
pub struct MatrixAdapter {
    tracking: Tracking,
    grid_type: Option<GridType>,
}

impl MatrixAdapter {
    pub fn new(variable: Option<String>) -> Self {
        MatrixAdapter {
            tracking: Tracking::new(variable),
            grid_type: None,
        }
    }

    pub fn grid_type(&self) -> Option<GridType> {
        self.grid_type
    }

    fn layout(&self, rows: &[&[Data]], value: &Data, n: usize, reshape: bool) -> AnimationCommand {
        let (height, width) = shape(rows);
        AnimationCommand::new(CommandType::Create)
            .indices(0..height * width)
            .duration(400)
            .value("values", json_value(value))
            .value("rows", height)
            .value("cols", width)
            .value("grid_type", self.grid_type.unwrap_or(GridType::Generic).as_str())
            .value("animation", if reshape { "grid_reshape" } else { "grid_build" })
            .meta("grid_size", format!("{}x{}", height, width))
            .at_step(n)
    }

    fn diff(&self, old: &[&[Data]], new: &[&[Data]], n: usize, out: &mut Vec<AnimationCommand>) {
        let (height, width) = shape(new);
        let range = numeric_range(new);
        for (r, (before, after)) in old.iter().zip(new).enumerate() {
            let changed: Vec<usize> = (0..width)
                .filter(|&c| before.get(c) != after.get(c))
                .collect();
            for &c in &changed {
                let Some(cell) = after.get(c) else { continue };
                out.push(
                    AnimationCommand::new(CommandType::SetValue)
                        .indices([r * width + c])
                        .duration(300)
                        .value("row", r)
                        .value("col", c)
                        .value("old_value", before.get(c).map_or(serde_json::Value::Null, json_value))
                        .value("new_value", json_value(cell))
                        .value("color", heat_color(cell, range))
                        .meta("grid_size", format!("{}x{}", height, width))
                        .at_step(n),
                );
            }
            if width > 3 && changed.len() > width / 2 {
                out.push(
                    AnimationCommand::new(CommandType::Highlight)
                        .indices(r * width..(r + 1) * width)
                        .duration(400)
                        .value("row", r)
                        .value("color", "#FFD93D")
                        .value("animation", "row_sweep")
                        .at_step(n),
                );
            }
        }
    }

    /// Cursor at `(i, j)` on a loop iteration
    fn cursor(step: &ExecutionStep, height: usize, width: usize) -> Option<AnimationCommand> {
        let i = usize::try_from(step.variable("i")?.as_int()?).ok()?;
        let j = usize::try_from(step.variable("j")?.as_int()?).ok()?;
        (i < height && j < width).then(|| {
            AnimationCommand::new(CommandType::Mark)
                .indices([i * width + j])
                .duration(200)
                .value("row", i)
                .value("col", j)
                .value("color", "#f093fb")
                .value("animation", "cursor")
                .at_step(step.step_number)
        })
    }
}

impl VisualizationAdapter for MatrixAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Matrix
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let found = self.tracking.probe(steps, &KEYWORDS, |_, value| is_matrix(value));
        if found {
            self.grid_type = self.tracking.name().map(GridType::from_name);
        }
        found
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<Vec<&[Data]>> = None;

        for step in steps {
            let Some(value) = step.variable(name).filter(|v| is_matrix(v)) else {
                continue;
            };
            let current = rows_of(value);
            match &previous {
                None => out.push(self.layout(&current, value, step.step_number, false)),
                Some(old) if shape(old) != shape(&current) => {
                    out.push(self.layout(&current, value, step.step_number, true))
                }
                Some(old) => self.diff(old, &current, step.step_number, &mut out),
            }
            if step.step_type == StepType::LoopIteration {
                let (height, width) = shape(&current);
                if let Some(cmd) = Self::cursor(step, height, width) {
                    out.push(cmd);
                }
            }
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "list of lists",
            });
        }
        Ok(optimize(out))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ints, step};
    use super::*;

    fn grid(rows: &[&[i64]]) -> Data {
        Data::list(rows.iter().map(|r| ints(r)).collect())
    }

    #[test]
    fn test_grid_type_from_name() {
        assert_eq!(GridType::from_name("dp"), GridType::DpTable);
        assert_eq!(GridType::from_name("maze"), GridType::Pathfinding);
        assert_eq!(GridType::from_name("board"), GridType::GameBoard);
        assert_eq!(GridType::from_name("m"), GridType::Generic);
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(&Data::Int(0), Some((0.0, 10.0))), "#667eea");
        assert_eq!(heat_color(&Data::Int(10), Some((0.0, 10.0))), "#f093fb");
        assert_eq!(heat_color(&Data::Bool(true), None), "#4ECDC4");
        assert_eq!(heat_color(&Data::str("x"), Some((0.0, 1.0))), DEFAULT_COLOR);
    }

    #[test]
    fn test_cell_update_and_cursor() {
        let iteration = step(
            2,
            StepType::LoopIteration,
            "for j in range(2):",
            vec![("dp", grid(&[&[0, 0], &[0, 1]])), ("i", Data::Int(1)), ("j", Data::Int(1))],
        );
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("dp", grid(&[&[0, 0], &[0, 0]]))]),
            iteration,
        ];
        let mut adapter = MatrixAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.grid_type(), Some(GridType::DpTable));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let kinds: Vec<_> = cmds.iter().map(|c| c.command_type).collect();
        assert_eq!(kinds, vec![CommandType::Create, CommandType::SetValue, CommandType::Mark]);
        assert_eq!(cmds[1].target_indices, vec![3]);
        assert_eq!(cmds[2].target_indices, vec![3]);
        assert_eq!(cmds[0].metadata["grid_size"], "2x2");
    }

    #[test]
    fn test_wide_row_change_highlights_row() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("grid", grid(&[&[0, 0, 0, 0]]))]),
            step(2, StepType::Assignment, "", vec![("grid", grid(&[&[1, 1, 1, 0]]))]),
        ];
        let mut adapter = MatrixAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let row = cmds.iter().find(|c| c.command_type == CommandType::Highlight).unwrap();
        assert_eq!(row.target_indices, vec![0, 1, 2, 3]);
    }
}
