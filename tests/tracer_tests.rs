// Integration tests for the tracer

use algotrace::interpreter::{
    trace_with_cancellation, ResourceKind, TraceError, TracerConfig, TracingMode, Watchdog,
};
use algotrace::snapshot::{Data, ExecutionStep, StepType};
use algotrace::trace;
use proptest::prelude::*;
use std::time::Duration;

fn strict() -> TracerConfig {
    TracerConfig {
        lenient: false,
        ..TracerConfig::default()
    }
}

fn final_value<'a>(steps: &'a [ExecutionStep], name: &str) -> Option<&'a Data> {
    steps.iter().rev().find_map(|s| s.variable(name))
}

fn ints(values: &[i64]) -> Data {
    Data::list(values.iter().copied().map(Data::Int).collect())
}

/// Step JSON without the wall-clock fields
fn comparable(steps: &[ExecutionStep]) -> Vec<serde_json::Value> {
    steps
        .iter()
        .map(|step| {
            let mut value = serde_json::to_value(step).unwrap();
            let map = value.as_object_mut().unwrap();
            map.remove("timestamp_ns");
            map.remove("cpu_time_ns");
            value
        })
        .collect()
}

const BUBBLE_SORT: &str = r#"
arr = [3, 1, 2]
n = len(arr)
for i in range(n):
    for j in range(n - i - 1):
        if arr[j] > arr[j + 1]:
            arr[j], arr[j + 1] = arr[j + 1], arr[j]
print(arr)
"#;

#[test]
fn test_trace_is_deterministic() {
    let config = TracerConfig::default();
    let first = trace(BUBBLE_SORT, &config).expect("trace failed");
    let second = trace(BUBBLE_SORT, &config).expect("trace failed");
    assert_eq!(first.len(), second.len());
    assert_eq!(comparable(&first), comparable(&second));
}

#[test]
fn test_step_numbers_are_sequential() {
    let steps = trace(BUBBLE_SORT, &TracerConfig::default()).unwrap();
    for (i, step) in steps.iter().enumerate() {
        assert_eq!(step.step_number, i + 1);
    }
}

#[test]
fn test_array_swap_round_trip() {
    let source = "arr = [2, 1]\narr[0], arr[1] = arr[1], arr[0]\n";
    let steps = trace(source, &TracerConfig::default()).unwrap();
    assert_eq!(final_value(&steps, "arr"), Some(&ints(&[1, 2])));
    // The first snapshot is never rewritten by the later swap
    assert_eq!(steps[0].variable("arr"), Some(&ints(&[2, 1])));
}

#[test]
fn test_bubble_sort_final_state_and_output() {
    let steps = trace(BUBBLE_SORT, &TracerConfig::default()).unwrap();
    assert_eq!(final_value(&steps, "arr"), Some(&ints(&[1, 2, 3])));
    let last = steps.last().unwrap();
    assert_eq!(&*last.stdout_snapshot, "[1, 2, 3]\n");
    assert_eq!(last.step_type, StepType::Print);

    let conditions = steps
        .iter()
        .filter(|s| s.step_type == StepType::Condition)
        .count();
    assert_eq!(conditions, 3);
    assert!(steps
        .iter()
        .filter(|s| s.step_type == StepType::Condition)
        .all(|s| s.condition_result.is_some()));
}

#[test]
fn test_loop_events_bracket_iterations() {
    let source = "total = 0\nfor i in range(3):\n    total += i\n";
    let steps = trace(source, &TracerConfig::default()).unwrap();
    let kinds: Vec<StepType> = steps.iter().map(|s| s.step_type).collect();
    let start = kinds.iter().position(|k| *k == StepType::LoopStart).unwrap();
    let end = kinds.iter().rposition(|k| *k == StepType::LoopEnd).unwrap();
    assert!(start < end);
    let iterations = kinds.iter().filter(|k| **k == StepType::LoopIteration).count();
    assert_eq!(iterations, 3);
    assert_eq!(final_value(&steps, "total"), Some(&Data::Int(3)));
}

#[test]
fn test_print_uses_sep_and_end() {
    let source = "print('a', 1, None, sep='-', end='!')\nprint(True)\n";
    let steps = trace(source, &TracerConfig::default()).unwrap();
    let prints: Vec<&ExecutionStep> = steps
        .iter()
        .filter(|s| s.step_type == StepType::Print)
        .collect();
    assert_eq!(prints.len(), 2);
    assert_eq!(prints[0].expression_value, Some(Data::str("a-1-None")));
    assert_eq!(&*prints[1].stdout_snapshot, "a-1-None!True\n");
    // A bare print statement does not add an EXPRESSION step
    assert!(steps.iter().all(|s| s.step_type != StepType::Expression));
}

#[test]
fn test_function_calls_and_returns() {
    let source = r#"
def fact(n):
    if n <= 1:
        return 1
    return n * fact(n - 1)
result = fact(4)
"#;
    let steps = trace(source, &TracerConfig::default()).unwrap();
    let calls: Vec<&ExecutionStep> = steps
        .iter()
        .filter(|s| s.step_type == StepType::FunctionCall)
        .collect();
    let returns = steps
        .iter()
        .filter(|s| s.step_type == StepType::FunctionReturn)
        .count();
    assert_eq!(calls.len(), 4);
    assert_eq!(returns, 4);
    assert!(calls.iter().all(|s| s.source_code == "fact"));
    let deepest = calls.iter().map(|s| s.call_stack.len()).max().unwrap();
    assert_eq!(deepest, 4);
    assert_eq!(final_value(&steps, "result"), Some(&Data::Int(24)));
}

#[test]
fn test_recursion_limit_is_a_fault() {
    let source = "def f(n):\n    return f(n + 1)\nf(0)\n";
    let config = TracerConfig {
        max_recursion_depth: 20,
        ..strict()
    };
    let err = trace(source, &config).unwrap_err();
    assert_eq!(err.cause(), Some("RecursionError"));
}

#[test]
fn test_lenient_division_records_exception() {
    let steps = trace("x = 1 / 0\ny = 7 // 0\n", &TracerConfig::default()).unwrap();
    assert_eq!(final_value(&steps, "x"), Some(&Data::Float(0.0)));
    assert_eq!(final_value(&steps, "y"), Some(&Data::Int(0)));
    let exception = steps
        .iter()
        .find(|s| s.step_type == StepType::Exception)
        .expect("no EXCEPTION step");
    let text = exception.expression_value.as_ref().and_then(Data::as_str).unwrap();
    assert!(text.starts_with("ZeroDivisionError: "));
    assert!(steps.last().unwrap().stderr_snapshot.contains("ZeroDivisionError"));
}

#[test]
fn test_strict_fault_serializes_to_json() {
    let err = trace("x = 1\ny = x / 0\n", &strict()).unwrap_err();
    assert_eq!(err.cause(), Some("ZeroDivisionError"));
    assert_eq!(err.line(), Some(2));
    let json = err.to_json();
    assert_eq!(json["error_type"], "execution");
    assert_eq!(json["cause"], "ZeroDivisionError");
    assert_eq!(json["line"], 2);
    assert_eq!(json["source_line"], "y = x / 0");
    assert_eq!(json["recoverable"], true);
}

#[test]
fn test_parse_error_reports_location() {
    let err = trace("x = (1,\n", &TracerConfig::default()).unwrap_err();
    assert!(matches!(err, TraceError::Parse { .. }));
    assert_eq!(err.to_json()["error_type"], "parse");
}

#[test]
fn test_empty_source_is_rejected() {
    let err = trace("   \n", &TracerConfig::default()).unwrap_err();
    assert!(matches!(err, TraceError::Validation { .. }));
}

#[test]
fn test_infinite_loop_hits_step_budget() {
    let config = TracerConfig {
        max_steps: 200,
        ..TracerConfig::preset(TracingMode::Full)
    };
    let err = trace("x = 0\nwhile True:\n    x += 1\n", &config).unwrap_err();
    assert!(matches!(
        err,
        TraceError::Resource {
            resource: ResourceKind::Steps,
            limit: 200,
            ..
        }
    ));
}

#[test]
fn test_watchdog_cancels_runaway_loop() {
    let config = TracerConfig {
        max_steps: 10_000_000,
        ..TracerConfig::default()
    };
    let watchdog = Watchdog::start(Duration::from_millis(50));
    let err = trace_with_cancellation("while True:\n    pass\n", &config, Some(watchdog.flag()))
        .unwrap_err();
    assert!(matches!(err, TraceError::Timeout { .. }));
    assert!(watchdog.fired());
}

#[test]
fn test_deadline_alone_times_out_runaway_loop() {
    let config = TracerConfig {
        max_steps: 10_000_000,
        max_execution_time_seconds: 0.2,
        ..TracerConfig::default()
    };
    let err = trace("while True:\n    pass\n", &config).unwrap_err();
    assert!(matches!(err, TraceError::Timeout { limit_seconds, .. } if limit_seconds == 0.2));
}

#[test]
fn test_huge_range_consumers_fail_with_memory_fault() {
    let config = TracerConfig {
        max_execution_time_seconds: 5.0,
        ..TracerConfig::default()
    };
    for source in [
        "t = sum(range(10**12))\n",
        "xs = [i for i in range(10**12)]\n",
        "xs = list(range(10**12))\n",
        "xs = range(10**12)[::2]\n",
    ] {
        let err = trace(source, &config).unwrap_err();
        assert!(
            matches!(err, TraceError::Resource { resource: ResourceKind::Memory, .. }),
            "{:?}: unexpected fault {}",
            source,
            err
        );
    }
    // Small ranges still materialise
    let steps = trace("t = sum(range(5))\n", &config).unwrap();
    assert_eq!(final_value(&steps, "t"), Some(&Data::Int(10)));
}

#[test]
fn test_oversized_format_width_is_a_memory_fault() {
    let err = trace("x = 1\ny = f'{x:>99999999999}'\n", &TracerConfig::default()).unwrap_err();
    assert!(matches!(err, TraceError::Resource { resource: ResourceKind::Memory, .. }));
    let err = trace("y = '{:>99999999999}'.format(1)\n", &TracerConfig::default()).unwrap_err();
    assert!(matches!(err, TraceError::Resource { resource: ResourceKind::Memory, .. }));

    let steps = trace("x = 7\ny = f'{x:>4}'\n", &TracerConfig::default()).unwrap();
    assert_eq!(final_value(&steps, "y"), Some(&Data::str("   7")));
}

#[test]
fn test_heapq_module_keeps_heap_order() {
    let source = "import heapq\nheap = [1, 5]\nheapq.heappush(heap, 0)\nsmallest = heapq.heappop(heap)\n";
    let steps = trace(source, &TracerConfig::default()).unwrap();
    assert_eq!(steps[0].step_type, StepType::Import);
    assert_eq!(final_value(&steps, "smallest"), Some(&Data::Int(0)));
    assert_eq!(final_value(&steps, "heap"), Some(&ints(&[1, 5])));
}

proptest! {
    #[test]
    fn prop_trace_never_exceeds_step_budget(max_steps in 1usize..120) {
        let source = "total = 0\nfor i in range(25):\n    total += i\n";
        let config = TracerConfig { max_steps, ..TracerConfig::default() };
        match trace(source, &config) {
            Ok(steps) => prop_assert!(steps.len() <= max_steps),
            Err(err) => prop_assert!(
                matches!(err, TraceError::Resource { resource: ResourceKind::Steps, .. }),
                "unexpected fault: {}", err
            ),
        }
    }
}
