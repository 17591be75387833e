//! Dicts with scalar keys, drawn as a bucketed hash table

use super::{AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};
use rustc_hash::FxHasher;
use std::hash::Hasher;

const NAME: &str = "HashMapAdapter";
const KEYWORDS: [&str; 11] = [
    "hash", "map", "dict", "table", "cache", "memo", "counter", "freq", "count", "lookup",
    "index_map",
];
/// Buckets drawn by the renderer
pub const BUCKET_COUNT: u64 = 8;

/// Deterministic hash of a key snapshot. Integral numbers hash to
/// themselves so small int keys spread over consecutive buckets.
pub fn stable_hash(key: &Data) -> u64 {
    match key {
        Data::Int(n) => *n as u64,
        Data::Bool(b) => *b as u64,
        Data::Float(x) if x.fract() == 0.0 && x.is_finite() => *x as i64 as u64,
        other => {
            let mut hasher = FxHasher::default();
            hasher.write(other.key_text().as_bytes());
            hasher.finish()
        }
    }
}

pub fn bucket_of(key: &Data) -> u64 {
    stable_hash(key) % BUCKET_COUNT
}

/// Dicts whose values are all lists or sets are adjacency maps, not tables
fn is_table(value: &Data) -> bool {
    let Some(pairs) = value.as_dict() else {
        return false;
    };
    !pairs.is_empty()
        && pairs[0].0.is_primitive()
        && !pairs
            .iter()
            .all(|(_, v)| matches!(v, Data::List(_) | Data::Set(_)))
}

#[derive(Debug, Clone, Default)]
pub struct HashMapAdapter {
    tracking: Tracking,
}

impl HashMapAdapter {
    pub fn new(variable: Option<String>) -> Self {
        HashMapAdapter {
            tracking: Tracking::new(variable),
        }
    }

    fn diff(old: &[(Data, Data)], new: &[(Data, Data)], n: usize, out: &mut Vec<AnimationCommand>) {
        let lookup = |pairs: &[(Data, Data)], key: &Data| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        };
        for (key, value) in new {
            if lookup(old, key).is_none() {
                out.push(
                    AnimationCommand::new(CommandType::Create)
                        .id(key.key_text())
                        .duration(500)
                        .value("key", json_value(key))
                        .value("value", json_value(value))
                        .value("bucket", bucket_of(key))
                        .value("hash_value", stable_hash(key))
                        .value("animation", "hash_insert")
                        .meta("bucket_count", BUCKET_COUNT)
                        .at_step(n),
                );
            }
        }
        for (key, value) in old {
            if lookup(new, key).is_none() {
                out.push(
                    AnimationCommand::new(CommandType::Delete)
                        .id(key.key_text())
                        .duration(400)
                        .value("key", json_value(key))
                        .value("value", json_value(value))
                        .value("bucket", bucket_of(key))
                        .value("animation", "hash_remove")
                        .at_step(n),
                );
            }
        }
        for (key, old_value) in old {
            match lookup(new, key) {
                Some(new_value) if new_value != *old_value => out.push(
                    AnimationCommand::new(CommandType::SetValue)
                        .id(key.key_text())
                        .duration(400)
                        .value("key", json_value(key))
                        .value("old_value", json_value(old_value))
                        .value("new_value", json_value(&new_value))
                        .value("bucket", bucket_of(key))
                        .value("animation", "value_flash")
                        .at_step(n),
                ),
                _ => {}
            }
        }
        // Growth past 1.5x reads as a table resize
        if old.len() > 4 && new.len() * 2 > old.len() * 3 {
            out.push(
                AnimationCommand::new(CommandType::Clear)
                    .duration(800)
                    .value("animation", "rehash")
                    .value("old_size", old.len())
                    .value("new_size", new.len())
                    .at_step(n),
            );
        }
    }
}

impl VisualizationAdapter for HashMapAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::HashMap
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        self.tracking.probe(steps, &KEYWORDS, |_, value| is_table(value))
    }

    fn generate_animations(&mut self, steps: &[ExecutionStep]) -> Result<Vec<AnimationCommand>, AdapterError> {
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<&[(Data, Data)]> = None;

        for step in steps {
            let Some(current) = step.variable(name).and_then(Data::as_dict) else {
                continue;
            };
            Self::diff(previous.unwrap_or(&[]), current, step.step_number, &mut out);
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
                expected: "dict",
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

    fn dict(pairs: &[(&str, i64)]) -> Data {
        Data::dict(pairs.iter().map(|(k, v)| (Data::str(k), Data::Int(*v))).collect())
    }

    #[test]
    fn test_adjacency_dict_is_not_a_table() {
        let graph = Data::dict(vec![(Data::str("a"), ints(&[1])), (Data::str("b"), ints(&[]))]);
        let steps = vec![step(1, StepType::Assignment, "", vec![("graph", graph)])];
        let mut adapter = HashMapAdapter::new(None);
        assert!(!adapter.can_handle(&steps));
    }

    #[test]
    fn test_insert_update_delete() {
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("freq", dict(&[("a", 1)]))]),
            step(2, StepType::Assignment, "", vec![("freq", dict(&[("a", 2), ("b", 1)]))]),
            step(3, StepType::Expression, "", vec![("freq", dict(&[("b", 1)]))]),
        ];
        let mut adapter = HashMapAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let kinds: Vec<_> = cmds.iter().map(|c| c.command_type).collect();
        assert_eq!(
            kinds,
            vec![
                CommandType::Create,
                CommandType::Create,
                CommandType::SetValue,
                CommandType::Delete
            ]
        );
        assert_eq!(cmds[1].target_ids, vec!["b"]);
        assert_eq!(cmds[2].values["new_value"], 2);
    }

    #[test]
    fn test_int_keys_bucket_by_value() {
        assert_eq!(bucket_of(&Data::Int(10)), 2);
        assert_eq!(bucket_of(&Data::str("k")), bucket_of(&Data::str("k")));
    }

    #[test]
    fn test_growth_triggers_rehash() {
        let small: Vec<(String, i64)> = (0..5).map(|i| (format!("k{}", i), i)).collect();
        let large: Vec<(String, i64)> = (0..8).map(|i| (format!("k{}", i), i)).collect();
        let as_dict = |items: &[(String, i64)]| {
            Data::dict(items.iter().map(|(k, v)| (Data::str(k), Data::Int(*v))).collect())
        };
        let steps = vec![
            step(1, StepType::Assignment, "", vec![("m", as_dict(&small))]),
            step(2, StepType::Assignment, "", vec![("m", as_dict(&large))]),
        ];
        let mut adapter = HashMapAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        assert_eq!(cmds.last().map(|c| c.command_type), Some(CommandType::Clear));
    }
}
