//! Animation command model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use std::fmt;

/// Default playback duration of a command
pub const DEFAULT_DURATION_MS: u64 = 300;

/// What a renderer should do with the targeted elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Highlight,
    Swap,
    Move,
    Compare,
    SetValue,
    Visit,
    Traverse,
    Mark,
    Unmark,
    Create,
    Delete,
    Push,
    Pop,
    Enqueue,
    Dequeue,
    ColorChange,
    Pause,
    Label,
    Clear,
}

impl CommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Highlight => "HIGHLIGHT",
            CommandType::Swap => "SWAP",
            CommandType::Move => "MOVE",
            CommandType::Compare => "COMPARE",
            CommandType::SetValue => "SET_VALUE",
            CommandType::Visit => "VISIT",
            CommandType::Traverse => "TRAVERSE",
            CommandType::Mark => "MARK",
            CommandType::Unmark => "UNMARK",
            CommandType::Create => "CREATE",
            CommandType::Delete => "DELETE",
            CommandType::Push => "PUSH",
            CommandType::Pop => "POP",
            CommandType::Enqueue => "ENQUEUE",
            CommandType::Dequeue => "DEQUEUE",
            CommandType::ColorChange => "COLOR_CHANGE",
            CommandType::Pause => "PAUSE",
            CommandType::Label => "LABEL",
            CommandType::Clear => "CLEAR",
        }
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playback instruction. Commands are played in sequence order.
///
/// Built with chained setters:
///
/// ```
/// use algotrace::animation::{AnimationCommand, CommandType};
///
/// let cmd = AnimationCommand::new(CommandType::Swap)
///     .indices([0, 1])
///     .duration(500)
///     .value("reason", "exchange");
/// assert_eq!(cmd.target_indices, vec![0, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationCommand {
    #[serde(rename = "type")]
    pub command_type: CommandType,
    #[serde(rename = "indices", default)]
    pub target_indices: Vec<usize>,
    #[serde(rename = "ids", default)]
    pub target_ids: Vec<String>,
    #[serde(default)]
    pub values: Map<String, Json>,
    #[serde(rename = "duration", default = "default_duration")]
    pub duration_ms: u64,
    #[serde(rename = "delay", default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub metadata: Map<String, Json>,
}

fn default_duration() -> u64 {
    DEFAULT_DURATION_MS
}

impl AnimationCommand {
    pub fn new(command_type: CommandType) -> Self {
        AnimationCommand {
            command_type,
            target_indices: Vec::new(),
            target_ids: Vec::new(),
            values: Map::new(),
            duration_ms: DEFAULT_DURATION_MS,
            delay_ms: 0,
            metadata: Map::new(),
        }
    }

    pub fn indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.target_indices = indices.into_iter().collect();
        self
    }

    pub fn ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.target_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.ids([id.into()])
    }

    pub fn value(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }

    pub fn delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Tag the command with the number of the step that produced it
    pub fn at_step(self, step_number: usize) -> Self {
        self.meta("step", step_number)
    }

    /// Originating step number, if tagged
    pub fn step(&self) -> Option<usize> {
        self.metadata
            .get("step")
            .and_then(Json::as_u64)
            .and_then(|n| usize::try_from(n).ok())
    }

    /// Last step covered by this command (after merging)
    pub fn step_end(&self) -> Option<usize> {
        self.metadata
            .get("step_end")
            .and_then(Json::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .or_else(|| self.step())
    }

    /// Whether the command covers `step_number`
    pub fn covers_step(&self, step_number: usize) -> bool {
        match (self.step(), self.step_end()) {
            (Some(start), Some(end)) => (start..=end).contains(&step_number),
            _ => false,
        }
    }

    /// Wall time taken by the command in a sequential playback
    pub fn total_ms(&self) -> u64 {
        self.duration_ms.saturating_add(self.delay_ms)
    }

    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

/// One-line summary used by the trace player
impl fmt::Display for AnimationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command_type)?;
        if !self.target_indices.is_empty() {
            write!(f, " {:?}", self.target_indices)?;
        }
        if !self.target_ids.is_empty() {
            write!(f, " {}", self.target_ids.join(","))?;
        }
        write!(f, " {}ms", self.duration_ms)?;
        if self.delay_ms > 0 {
            write!(f, " +{}ms", self.delay_ms)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_keys() {
        let cmd = AnimationCommand::new(CommandType::SetValue)
            .indices([2])
            .value("old_value", 3)
            .at_step(7);
        let json = cmd.to_json();
        assert_eq!(json["type"], "SET_VALUE");
        assert_eq!(json["indices"], json!([2]));
        assert_eq!(json["ids"], json!([]));
        assert_eq!(json["duration"], 300);
        assert_eq!(json["delay"], 0);
        assert_eq!(json["values"]["old_value"], 3);
        assert_eq!(json["metadata"]["step"], 7);
    }

    #[test]
    fn test_deserialize_defaults() {
        let cmd: AnimationCommand = serde_json::from_value(json!({"type": "PAUSE"})).unwrap();
        assert_eq!(cmd.command_type, CommandType::Pause);
        assert_eq!(cmd.duration_ms, DEFAULT_DURATION_MS);
        assert!(cmd.values.is_empty());
    }

    #[test]
    fn test_step_coverage() {
        let cmd = AnimationCommand::new(CommandType::Pause)
            .at_step(3)
            .meta("step_end", 5);
        assert!(cmd.covers_step(4));
        assert!(!cmd.covers_step(6));
        assert_eq!(cmd.to_string(), "PAUSE 300ms");
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnimationCommand>();
    }
}
