// Integration tests for adapter selection and command generation

use algotrace::animation::diff::{optimize, total_duration};
use algotrace::animation::{
    AdapterKind, AdapterRegistry, AnimationCommand, CommandType, VisualizationAdapter,
};
use algotrace::interpreter::{TraceError, TracerConfig};
use algotrace::service::{ExecuteOptions, SpeedPreset, Visualizer};
use algotrace::snapshot::ExecutionStep;
use algotrace::{detect_and_animate, trace};
use proptest::prelude::*;

fn traced(source: &str) -> Vec<ExecutionStep> {
    trace(source, &TracerConfig::default()).expect("trace failed")
}

fn kinds(cmds: &[AnimationCommand]) -> Vec<CommandType> {
    cmds.iter().map(|c| c.command_type).collect()
}

fn primary(steps: &[ExecutionStep]) -> AdapterKind {
    AdapterRegistry::default()
        .get_primary_adapter(steps)
        .expect("no adapter matched")
        .kind()
}

const BUBBLE_SORT: &str = r#"
arr = [3, 1, 2]
n = len(arr)
for i in range(n):
    for j in range(n - i - 1):
        if arr[j] > arr[j + 1]:
            arr[j], arr[j + 1] = arr[j + 1], arr[j]
"#;

#[test]
fn test_array_swap_emits_compare_then_swap() {
    let steps = traced("arr = [2, 1]\narr[0], arr[1] = arr[1], arr[0]\n");
    let animations = detect_and_animate(&steps, None, 1.0);
    let cmds = &animations["ArrayAdapter"];
    let swap_at = cmds
        .iter()
        .position(|c| c.command_type == CommandType::Swap)
        .expect("no SWAP");
    assert!(swap_at > 0);
    let compare = &cmds[swap_at - 1];
    assert_eq!(compare.command_type, CommandType::Compare);
    assert_eq!(compare.target_indices, vec![0, 1]);
    assert_eq!(cmds[swap_at].target_indices, vec![0, 1]);
    assert_eq!(cmds[swap_at].step(), Some(2));
}

#[test]
fn test_bubble_sort_ends_with_celebration() {
    let steps = traced(BUBBLE_SORT);
    let animations = detect_and_animate(&steps, None, 1.0);
    assert_eq!(animations.keys().next().map(String::as_str), Some("ArrayAdapter"));
    let cmds = &animations["ArrayAdapter"];
    assert!(cmds.len() > 3);
    let tail = &cmds[cmds.len() - 3..];
    assert!(tail.iter().all(|c| c.command_type == CommandType::Highlight));
    let indices: Vec<usize> = tail.iter().map(|c| c.target_indices[0]).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert!(tail.windows(2).all(|w| w[0].delay_ms < w[1].delay_ms));
    assert!(kinds(cmds).contains(&CommandType::Swap));
}

#[test]
fn test_every_command_is_tagged_with_a_step() {
    let steps = traced(BUBBLE_SORT);
    let last = steps.len();
    let animations = detect_and_animate(&steps, None, 1.0);
    for (adapter, cmds) in &animations {
        for cmd in cmds {
            let step = cmd.step().unwrap_or_else(|| panic!("{}: untagged {}", adapter, cmd));
            assert!((1..=last).contains(&step), "{}: step {} out of range", adapter, step);
        }
    }
}

#[test]
fn test_heappush_sift_up_restores_heap() {
    let source = "import heapq\nheap = [1, 5]\nheapq.heappush(heap, 0)\n";
    let steps = traced(source);
    assert_eq!(primary(&steps), AdapterKind::Heap);
    let animations = detect_and_animate(&steps, None, 1.0);
    let swaps: Vec<&AnimationCommand> = animations["HeapAdapter"]
        .iter()
        .filter(|c| c.command_type == CommandType::Swap)
        .collect();
    assert_eq!(swaps.len(), 1);
    let mut items = vec![1, 5, 0];
    for swap in swaps {
        items.swap(swap.target_indices[0], swap.target_indices[1]);
    }
    assert_eq!(items, vec![0, 5, 1]);
}

#[test]
fn test_registry_covers_any_nonempty_trace() {
    for source in ["x = 1\n", "print('hi')\n", "s = 'abc'\nt = s.upper()\n", "d = {}\n"] {
        let steps = traced(source);
        assert!(!steps.is_empty());
        let animations = detect_and_animate(&steps, None, 1.0);
        assert!(!animations.is_empty(), "no adapter for {:?}", source);
    }
}

#[test]
fn test_adjacency_dict_is_a_graph_not_a_hashmap() {
    let source = r#"
graph = {"A": ["B", "C"], "B": ["C"], "C": []}
visited = set()
queue = ["A"]
while queue:
    node = queue.pop(0)
    if node not in visited:
        visited.add(node)
        for nb in graph[node]:
            queue.append(nb)
"#;
    let steps = traced(source);
    assert_eq!(primary(&steps), AdapterKind::Graph);
    let animations = detect_and_animate(&steps, None, 1.0);
    assert!(!animations.contains_key("HashMapAdapter"));
}

#[test]
fn test_left_right_dict_is_a_tree() {
    let source = r#"
root = {"val": 2, "left": None, "right": None}
root["left"] = {"val": 1, "left": None, "right": None}
"#;
    let steps = traced(source);
    assert_eq!(primary(&steps), AdapterKind::Tree);
}

#[test]
fn test_scalar_dict_is_a_hashmap() {
    let steps = traced("counts = {}\ncounts['a'] = 1\ncounts['b'] = 2\n");
    assert_eq!(primary(&steps), AdapterKind::HashMap);
}

#[test]
fn test_adapter_hint_forces_adapter() {
    let steps = traced("s = []\ns.append(1)\ns.append(2)\ns.pop()\n");
    let animations = detect_and_animate(&steps, Some("stack"), 1.0);
    assert_eq!(animations.len(), 1);
    let cmds = &animations["StackAdapter"];
    assert!(kinds(cmds).contains(&CommandType::Push));
    assert!(kinds(cmds).contains(&CommandType::Pop));
}

#[test]
fn test_forced_adapter_falls_back_to_generic() {
    let steps = traced("x = 1\nx = 2\n");
    let animations = detect_and_animate(&steps, Some("heap"), 1.0);
    assert_eq!(animations.keys().collect::<Vec<_>>(), vec!["GenericAdapter"]);
    assert!(!animations["GenericAdapter"].is_empty());
}

#[test]
fn test_variable_hint_pins_adapters() {
    let steps = traced("a = [1, 2]\nb = [9, 8, 7]\nb[0], b[2] = b[2], b[0]\n");
    let animations = detect_and_animate(&steps, Some("b"), 1.0);
    let cmds = &animations["ArrayAdapter"];
    assert_eq!(cmds[0].command_type, CommandType::Create);
    assert_eq!(cmds[0].target_indices, vec![0, 1, 2]);
}

#[test]
fn test_speed_scales_durations_only() {
    let steps = traced(BUBBLE_SORT);
    let normal = detect_and_animate(&steps, Some("array"), 1.0);
    let slow = detect_and_animate(&steps, Some("array"), 2.0);
    let (normal, slow) = (&normal["ArrayAdapter"], &slow["ArrayAdapter"]);
    assert_eq!(normal.len(), slow.len());
    for (a, b) in normal.iter().zip(slow) {
        assert_eq!(b.duration_ms, a.duration_ms * 2);
        assert_eq!(b.delay_ms, a.delay_ms);
        assert_eq!(b.command_type, a.command_type);
    }
}

#[test]
fn test_visualizer_report() {
    let options = ExecuteOptions {
        speed_preset: SpeedPreset::Fast,
        ..ExecuteOptions::default()
    };
    let report = Visualizer::default()
        .execute(BUBBLE_SORT, &options)
        .expect("execute failed");
    assert_eq!(report.primary_adapter, Some("ArrayAdapter"));
    assert_eq!(report.component, Some("AnimatedArray"));
    assert_eq!(report.stats.total_steps, report.steps.len());
    assert_eq!(report.stats.total_commands, report.primary_commands().len());
    assert_eq!(
        report.stats.estimated_duration_ms,
        total_duration(report.primary_commands())
    );

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stats"]["speed_preset"], "fast");
    assert_eq!(json["stats"]["size_category"], "small");
    assert!(json["steps"][0]["variables_state"].is_object());
}

#[test]
fn test_visualizer_rejects_blocked_code() {
    let err = Visualizer::default()
        .execute("import os\nprint(1)\n", &ExecuteOptions::default())
        .unwrap_err();
    assert!(matches!(err, TraceError::Validation { .. }));
}

fn command_strategy() -> impl Strategy<Value = AnimationCommand> {
    let kind = prop_oneof![
        Just(CommandType::Highlight),
        Just(CommandType::Pause),
        Just(CommandType::Swap),
        Just(CommandType::SetValue),
    ];
    (kind, 0usize..3, 1u64..500, 1usize..20).prop_map(|(kind, index, duration, step)| {
        AnimationCommand::new(kind)
            .indices([index])
            .duration(duration)
            .at_step(step)
    })
}

proptest! {
    #[test]
    fn prop_optimize_is_idempotent(cmds in prop::collection::vec(command_strategy(), 0..40)) {
        let once = optimize(cmds.clone());
        let twice = optimize(once.clone());
        prop_assert_eq!(&once, &twice);
        let before: u64 = cmds.iter().map(|c| c.duration_ms).sum();
        let after: u64 = once.iter().map(|c| c.duration_ms).sum();
        prop_assert_eq!(before, after);
        let no_adjacent_duplicates = once.windows(2).all(|w| {
            w[0].command_type != w[1].command_type || w[0].target_indices != w[1].target_indices
        });
        prop_assert!(no_adjacent_duplicates);
    }

    #[test]
    fn prop_heappush_sift_up_is_minimal(
        existing in prop::collection::vec(0i64..50, 1..8),
        pushed in 0i64..50,
    ) {
        // A sorted list is a valid min-heap
        let mut existing = existing;
        existing.sort_unstable();
        let literal = existing.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        let source = format!("import heapq\nheap = [{}]\nheapq.heappush(heap, {})\n", literal, pushed);
        let steps = traced(&source);
        let animations = AdapterRegistry::default().detect_and_animate(&steps, Some("heap"), 1.0);
        let cmds = &animations["HeapAdapter"];

        let mut items = existing.clone();
        items.push(pushed);
        let mut swaps = 0;
        for cmd in cmds.iter().filter(|c| c.command_type == CommandType::Swap) {
            items.swap(cmd.target_indices[0], cmd.target_indices[1]);
            swaps += 1;
        }
        prop_assert!((1..items.len()).all(|i| items[(i - 1) / 2] <= items[i]));

        let mut violations = 0;
        let mut idx = existing.len();
        while idx > 0 {
            idx = (idx - 1) / 2;
            if existing[idx] > pushed {
                violations += 1;
            }
        }
        prop_assert_eq!(swaps, violations);
    }
}
