//! Lists and deques used as FIFO queues

use super::{name_matches, receivers, sources_contain, AdapterError, Tracking, VisualizationAdapter};
use crate::animation::command::{AnimationCommand, CommandType};
use crate::animation::diff::{json_value, optimize};
use crate::animation::registry::AdapterKind;
use crate::snapshot::{Data, ExecutionStep};

const NAME: &str = "QueueAdapter";
const KEYWORDS: [&str; 4] = ["queue", "fifo", "frontier", "deque"];

#[derive(Debug, Clone, Default)]
pub struct QueueAdapter {
    tracking: Tracking,
}

impl QueueAdapter {
    pub fn new(variable: Option<String>) -> Self {
        QueueAdapter {
            tracking: Tracking::new(variable),
        }
    }

    fn enqueue(index: usize, value: &Data, size: usize, n: usize) -> AnimationCommand {
        AnimationCommand::new(CommandType::Enqueue)
            .indices([index])
            .duration(400)
            .value("value", json_value(value))
            .value("animation", "slide_in_right")
            .value("queue_size", size)
            .at_step(n)
    }

    /// Front removal followed by the remaining items sliding left
    fn dequeue(value: &Data, remaining: usize, n: usize, out: &mut Vec<AnimationCommand>) {
        out.push(
            AnimationCommand::new(CommandType::Dequeue)
                .indices([0])
                .duration(400)
                .value("value", json_value(value))
                .value("animation", "slide_out_left")
                .value("queue_size", remaining)
                .at_step(n),
        );
        for i in 0..remaining {
            out.push(
                AnimationCommand::new(CommandType::Move)
                    .indices([i])
                    .duration(200)
                    .delay(i as u64 * 50)
                    .value("animation", "shift_left")
                    .value("positions", 1)
                    .at_step(n),
            );
        }
    }
}

impl VisualizationAdapter for QueueAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Queue
    }

    fn tracked_variable(&self) -> Option<&str> {
        self.tracking.name()
    }

    fn can_handle(&mut self, steps: &[ExecutionStep]) -> bool {
        let is_list = |_: &str, value: &Data| value.as_list().is_some();
        if self.tracking.is_pinned() {
            return self.tracking.probe(steps, &[], is_list);
        }
        if self
            .tracking
            .probe(steps, &KEYWORDS, |name, value| name_matches(name, &KEYWORDS) && is_list(name, value))
        {
            return true;
        }
        let front_removal = sources_contain(steps, ".pop(0)") || sources_contain(steps, "popleft");
        if !front_removal && !sources_contain(steps, "deque") {
            return false;
        }
        let receiver = receivers(steps, ".popleft()")
            .chain(receivers(steps, ".pop(0)"))
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
        let name = self.tracking.require(NAME)?;
        let mut out = Vec::new();
        let mut previous: Option<&[Data]> = None;

        for step in steps {
            let Some(current) = step.variable(name).and_then(Data::as_list) else {
                continue;
            };
            let n = step.step_number;
            let Some(old) = previous else {
                if !current.is_empty() {
                    out.push(
                        AnimationCommand::new(CommandType::Create)
                            .indices(0..current.len())
                            .value("values", json_value(&Data::list(current.to_vec())))
                            .at_step(n),
                    );
                }
                previous = Some(current);
                continue;
            };

            if current.len() + 1 == old.len() && current == &old[1..] {
                Self::dequeue(&old[0], current.len(), n, &mut out);
            } else if current.len() == old.len() + 1 && &current[..old.len()] == old {
                out.push(Self::enqueue(old.len(), &current[old.len()], current.len(), n));
            } else if !old.is_empty() && current.len() == old.len() && current[..old.len() - 1] == old[1..] {
                // popleft + append in one statement
                Self::dequeue(&old[0], old.len() - 1, n, &mut out);
                let tail = current.len() - 1;
                out.push(Self::enqueue(tail, &current[tail], current.len(), n));
            } else if current.len() > old.len() {
                for i in old.len()..current.len() {
                    out.push(Self::enqueue(i, &current[i], i + 1, n));
                }
            } else if current.len() < old.len() {
                let removed = old.len() - current.len();
                for (k, value) in old.iter().take(removed).enumerate() {
                    Self::dequeue(value, old.len() - k - 1, n, &mut out);
                }
            }
            previous = Some(current);
        }

        if previous.is_none() {
            return Err(AdapterError::ShapeMismatch {
                adapter: NAME,
                variable: name.to_string(),
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
    fn test_enqueue_dequeue_and_shift() {
        let steps = vec![
            step(1, StepType::Assignment, "queue = deque([1])", vec![("queue", ints(&[1]))]),
            step(2, StepType::Expression, "queue.append(2)", vec![("queue", ints(&[1, 2]))]),
            step(3, StepType::Assignment, "x = queue.popleft()", vec![("queue", ints(&[2]))]),
        ];
        let mut adapter = QueueAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        let cmds = adapter.generate_animations(&steps).unwrap();
        let kinds: Vec<_> = cmds.iter().map(|c| c.command_type).collect();
        assert_eq!(
            kinds,
            vec![
                CommandType::Create,
                CommandType::Enqueue,
                CommandType::Dequeue,
                CommandType::Move
            ]
        );
        assert_eq!(cmds[2].values["value"], 1);
    }

    #[test]
    fn test_detects_popleft_receiver() {
        let steps = vec![step(
            1,
            StepType::Assignment,
            "node = todo.popleft()",
            vec![("todo", ints(&[3]))],
        )];
        let mut adapter = QueueAdapter::new(None);
        assert!(adapter.can_handle(&steps));
        assert_eq!(adapter.tracked_variable(), Some("todo"));
    }
}
