//! Strings as rows of character cells

use super::{mentions, name_matches, subscript_indices, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{common_affixes, find_variable, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{ExecutionStep, StepType};

const NAME: &str = "StringAdapter";
const KEYWORDS: [&str; 6] = ["text", "string", "str", "word", "sentence", "pattern"];
/// Largest LCS table filled before falling back to a block replace
const MAX_LCS_CELLS: usize = 250_000;

/// One edit region, as in a classic sequence matcher: `old[i1..i2]`
/// becomes `new[j1..j2]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Equal { i1: usize, i2: usize, j1: usize, j2: usize },
    Insert { i: usize, j1: usize, j2: usize },
    Delete { i1: usize, i2: usize, j: usize },
    Replace { i1: usize, i2: usize, j1: usize, j2: usize },
}

#[derive(Clone, Copy, PartialEq)]
enum Edit {
    Keep,
    Insert,
    Delete,
}

/// Edit script between two character sequences via longest common
/// subsequence. Adjacent deletes and inserts fold into a replace.
pub fn opcodes(old: &[char], new: &[char]) -> Vec<Opcode> {
    let (prefix, suffix) = common_affixes(old, new);
    let a = &old[prefix..old.len() - suffix];
    let b = &new[prefix..new.len() - suffix];

    let mut edits = vec![Edit::Keep; prefix];
    if a.len() * b.len() <= MAX_LCS_CELLS {
        edits.extend(lcs_edits(a, b));
    } else {
        edits.extend(std::iter::repeat(Edit::Delete).take(a.len()));
        edits.extend(std::iter::repeat(Edit::Insert).take(b.len()));
    }
    edits.extend(std::iter::repeat(Edit::Keep).take(suffix));
    group(&edits)
}

fn lcs_edits(a: &[char], b: &[char]) -> Vec<Edit> {
    let (m, n) = (a.len(), b.len());
    // table[i][j] = LCS length of a[i..] and b[j..]
    let mut table = vec![vec![0u32; n + 1]; m + 1];
    for i in (0..m).rev() {
        for j in (0..n).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }
    let mut edits = Vec::with_capacity(m + n);
    let (mut i, mut j) = (0, 0);
    while i < m && j < n {
        if a[i] == b[j] {
            edits.push(Edit::Keep);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            edits.push(Edit::Delete);
            i += 1;
        } else {
            edits.push(Edit::Insert);
            j += 1;
        }
    }
    edits.extend(std::iter::repeat(Edit::Delete).take(m - i));
    edits.extend(std::iter::repeat(Edit::Insert).take(n - j));
    edits
}

fn group(edits: &[Edit]) -> Vec<Opcode> {
    let mut ops = Vec::new();
    let (mut i, mut j, mut k) = (0, 0, 0);
    while k < edits.len() {
        let (i1, j1) = (i, j);
        if edits[k] == Edit::Keep {
            while k < edits.len() && edits[k] == Edit::Keep {
                i += 1;
                j += 1;
                k += 1;
            }
            ops.push(Opcode::Equal { i1, i2: i, j1, j2: j });
            continue;
        }
        while k < edits.len() && edits[k] != Edit::Keep {
            match edits[k] {
                Edit::Delete => i += 1,
                _ => j += 1,
            }
            k += 1;
        }
        ops.push(match (i > i1, j > j1) {
            (true, true) => Opcode::Replace { i1, i2: i, j1, j2: j },
            (true, false) => Opcode::Delete { i1, i2: i, j: j1 },
            _ => Opcode::Insert { i: i1, j1, j2: j },
        });
    }
    ops
}

fn is_palindrome(chars: &[char]) -> bool {
    chars.iter().eq(chars.iter().rev())
}

#[derive(Debug, Clone, Default)]
pub struct StringAdapter {
    tracking: Tracking,
}

impl StringAdapter {
    pub fn new(variable: Option<String>) -> Self {
        StringAdapter {
            tracking: Tracking::new(variable),
        }
    }

    fn insert(new: &[char], j1: usize, j2: usize, n: usize, out: &mut Vec<AnimationCommand>) {
        for j in j1..j2 {
            out.push(
                AnimationCommand::new(CommandType::Create)
                    .indices([j])
                    .duration(300)
                    .delay((j - j1) as u64 * 50)
                    .value("char", new[j].to_string())
                    .value("animation", "type_in")
                    .at_step(n),
            );
        }
    }

    fn delete(old: &[char], i1: usize, i2: usize, n: usize, out: &mut Vec<AnimationCommand>) {
        for i in (i1..i2).rev() {
            out.push(
                AnimationCommand::new(CommandType::Delete)
                    .indices([i])
                    .duration(300)
                    .value("char", old[i].to_string())
                    .value("animation", "fade_out")
                    .at_step(n),
            );
        }
    }

    fn diff(old: &[char], new: &[char], n: usize, out: &mut Vec<AnimationCommand>) {
        let len = new.len();
        if len > 1 && old.len() == len && old.iter().eq(new.iter().rev()) {
            for i in 0..len / 2 {
                out.push(
                    AnimationCommand::new(CommandType::Swap)
                        .indices([i, len - 1 - i])
                        .duration(400)
                        .delay(i as u64 * 100)
                        .meta("swap_type", "reverse")
                        .at_step(n),
                );
            }
            return;
        }
        let lowered = |chars: &[char]| chars.iter().flat_map(|c| c.to_lowercase()).collect::<String>();
        if old.len() == len && lowered(old) == lowered(new) {
            let changed: Vec<usize> = (0..len).filter(|&i| old[i] != new[i]).collect();
            out.push(
                AnimationCommand::new(CommandType::ColorChange)
                    .indices(changed)
                    .duration(300)
                    .value("animation", "case_flip")
                    .value("new_value", new.iter().collect::<String>())
                    .at_step(n),
            );
            return;
        }

        for op in opcodes(old, new) {
            match op {
                Opcode::Equal { .. } => {}
                Opcode::Insert { j1, j2, .. } => Self::insert(new, j1, j2, n, out),
                Opcode::Delete { i1, i2, .. } => Self::delete(old, i1, i2, n, out),
                Opcode::Replace { i1, i2, j1, j2 } => {
                    let paired = (i2 - i1).min(j2 - j1);
                    for k in 0..paired {
                        out.push(
                            AnimationCommand::new(CommandType::SetValue)
                                .indices([j1 + k])
                                .duration(400)
                                .value("old_value", old[i1 + k].to_string())
                                .value("new_value", new[j1 + k].to_string())
                                .at_step(n),
                        );
                    }
                    Self::insert(new, j1 + paired, j2, n, out);
                    Self::delete(old, i1 + paired, i2, n, out);
                }
            }
        }
    }

    /// Character comparison on a condition that reads the string
    fn compare(name: &str, chars: &[char], step: &ExecutionStep) -> Option<AnimationCommand> {
        if step.step_type != StepType::Condition || !mentions(&step.source_code, name) {
            return None;
        }
        let mut indices = subscript_indices(step, name, chars.len());
        if indices.is_empty() {
            indices = (0..chars.len()).collect();
        }
        Some(
            AnimationCommand::new(CommandType::Compare)
                .indices(indices)
                .duration(250)
                .value("comparison_result", step.condition_result.unwrap_or(false))
                .at_step(step.step_number),
        )
    }
}

impl VisualizationAdapter for StringAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::String
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let pinned = self.tracking.is_pinned();
        let named = find_variable(steps, |name, value| {
            self.tracking.admits(name)
                && (pinned || name == "s" || name_matches(name, &KEYWORDS))
                && value.as_str().is_some_and(|s| s.chars().count() > 1)
        });
        let found = named.or_else(|| {
            find_variable(steps, |name, value| {
                self.tracking.admits(name) && value.as_str().is_some_and(|s| s.chars().count() > 5)
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
        let mut previous: Option<Vec<char>> = None;

        for step in steps {
            let Some(text) = step.variable(name).and_then(|v| v.as_str()) else {
                continue;
            };
            let current: Vec<char> = text.chars().collect();
            match &previous {
                None => out.push(
                    AnimationCommand::new(CommandType::Create)
                        .indices(0..current.len())
                        .duration(400)
                        .value("values", current.iter().map(char::to_string).collect::<Vec<_>>())
                        .value("variable", name)
                        .at_step(step.step_number),
                ),
                Some(old) if *old != current => Self::diff(old, &current, step.step_number, &mut out),
                Some(_) => out.extend(Self::compare(name, &current, step)),
            }
            previous = Some(current);
        }

        let Some(last) = previous else {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "str",
            });
        };
        let mut out = optimize(out);
        if last.len() > 1 && is_palindrome(&last) {
            out.push(
                AnimationCommand::new(CommandType::Highlight)
                    .indices(0..last.len())
                    .duration(800)
                    .value("color", "#00FF00")
                    .value("animation", "palindrome_glow")
                    .at_step(steps.last().map_or(0, |s| s.step_number)),
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::step;
    use super::*;
    use crate::snapshot::Data;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn kinds(cmds: &[AnimationCommand]) -> Vec<CommandType> {
        cmds.iter().map(|c| c.command_type).collect()
    }

    #[test]
    fn test_opcodes_cover_both_sides() {
        let ops = opcodes(&chars("kitten"), &chars("sitting"));
        assert_eq!(ops.first(), Some(&Opcode::Replace { i1: 0, i2: 1, j1: 0, j2: 1 }));
        assert_eq!(ops.last(), Some(&Opcode::Insert { i: 6, j1: 6, j2: 7 }));
        let ops = opcodes(&chars("abc"), &chars("ac"));
        assert_eq!(
            ops,
            vec![
                Opcode::Equal { i1: 0, i2: 1, j1: 0, j2: 1 },
                Opcode::Delete { i1: 1, i2: 2, j: 1 },
                Opcode::Equal { i1: 2, i2: 3, j1: 1, j2: 2 },
            ]
        );
    }

    #[test]
    fn test_reversal_swaps_outside_in() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("s", Data::str("abcd"))]),
            step(2, StepType::Assignment, "s = s[::-1]", vec![("s", Data::str("dcba"))]),
        ];
        let mut adapter = StringAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(kinds(&cmds), vec![CommandType::Create, CommandType::Swap, CommandType::Swap]);
        assert_eq!(cmds[1].target_indices, vec![0, 3]);
        assert_eq!(cmds[2].target_indices, vec![1, 2]);
    }

    #[test]
    fn test_case_change_and_append() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("word", Data::str("ab"))]),
            step(2, StepType::Assignment, "", vec![("word", Data::str("AB"))]),
            step(3, StepType::Assignment, "", vec![("word", Data::str("ABC"))]),
        ];
        let mut adapter = StringAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(
            kinds(&cmds),
            vec![CommandType::Create, CommandType::ColorChange, CommandType::Create]
        );
        assert_eq!(cmds[2].target_indices, vec![2]);
    }

    #[test]
    fn test_palindrome_finale_and_compare() {
        let mut check = step(
            2,
            StepType::Condition,
            "if text[i] != text[-1 - i]:",
            vec![("text", Data::str("level")), ("i", Data::Int(0))],
        );
        check.condition_result = Some(false);
        let steps = vec![step(1, StepType::Assignment, "", vec![("text", Data::str("level"))]), check];
        let mut adapter = StringAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(
            kinds(&cmds),
            vec![CommandType::Create, CommandType::Compare, CommandType::Highlight]
        );
        assert_eq!(cmds[1].target_indices, vec![0, 4]);
        assert_eq!(cmds[2].target_indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_short_unnamed_string_is_ignored() {
        let steps = vec![step(1, StepType::Assignment, "", vec![("x", Data::str("hi"))])];
        assert!(!StringAdapter::new(None).can_handle(&steps));
    }
}
