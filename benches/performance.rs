use agentrie::{BlockDelta, ContentBlockStub, ProviderEvent, ResponseAccumulator, Usage};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Builds the event sequence for one text-only turn split into `chunk_count`
/// deltas of `chunk_size` characters each.
fn text_turn_events(chunk_count: usize, chunk_size: usize) -> Vec<ProviderEvent> {
    let chunk = "a".repeat(chunk_size);
    let mut events = vec![
        ProviderEvent::MessageStart {
            id: "r1".to_string(),
            model: "bench-model".to_string(),
        },
        ProviderEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStub::Text,
        },
    ];
    for _ in 0..chunk_count {
        events.push(ProviderEvent::ContentBlockDelta {
            index: 0,
            delta: BlockDelta::Text(chunk.clone()),
        });
    }
    events.push(ProviderEvent::ContentBlockStop { index: 0 });
    events.push(ProviderEvent::MessageDelta {
        usage: Some(Usage {
            input_tokens: 100,
            output_tokens: (chunk_count * chunk_size) as u64,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
        }),
    });
    events.push(ProviderEvent::MessageStop);
    events
}

/// Builds the event sequence for a turn with `tool_count` tool calls, each
/// with a JSON input streamed in `deltas_per_call` pieces.
fn tool_call_turn_events(tool_count: usize, deltas_per_call: usize) -> Vec<ProviderEvent> {
    tool_call_turn_events_from(0, tool_count, deltas_per_call)
}

/// Same as [`tool_call_turn_events`], but the content block indices start at
/// `start_index` so the sequence can be appended after other open blocks.
fn tool_call_turn_events_from(
    start_index: usize,
    tool_count: usize,
    deltas_per_call: usize,
) -> Vec<ProviderEvent> {
    let mut events = vec![ProviderEvent::MessageStart {
        id: "r1".to_string(),
        model: "bench-model".to_string(),
    }];

    for offset in 0..tool_count {
        let i = start_index + offset;
        events.push(ProviderEvent::ContentBlockStart {
            index: i,
            block: ContentBlockStub::ToolUse {
                id: format!("call_{i}"),
                name: "calculator".to_string(),
            },
        });
        events.push(ProviderEvent::ContentBlockDelta {
            index: i,
            delta: BlockDelta::ToolInputJson("{\"operation\":\"add\",".to_string()),
        });
        for _ in 1..deltas_per_call {
            events.push(ProviderEvent::ContentBlockDelta {
                index: i,
                delta: BlockDelta::ToolInputJson("\"a\":2,".to_string()),
            });
        }
        events.push(ProviderEvent::ContentBlockDelta {
            index: i,
            delta: BlockDelta::ToolInputJson("\"b\":2}".to_string()),
        });
        events.push(ProviderEvent::ContentBlockStop { index: i });
    }

    events.push(ProviderEvent::MessageDelta {
        usage: Some(Usage {
            input_tokens: 50,
            output_tokens: 20,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
        }),
    });
    events.push(ProviderEvent::MessageStop);
    events
}

fn fold_all(events: &[ProviderEvent]) -> ResponseAccumulator {
    let mut acc = ResponseAccumulator::new();
    for event in events {
        acc.fold(event.clone()).expect("well-formed event sequence folds cleanly");
    }
    acc
}

// Benchmark: folding a text-only turn with varying delta counts
fn bench_fold_text_by_delta_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_text_by_delta_count");

    for count in [1, 10, 50, 200, 1000].iter() {
        let events = text_turn_events(*count, 16);
        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| fold_all(black_box(events)));
        });
    }

    group.finish();
}

// Benchmark: folding a text-only turn with varying delta sizes
fn bench_fold_text_by_delta_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_text_by_delta_size");

    for size in [8, 64, 512, 4096].iter() {
        let events = text_turn_events(20, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| fold_all(black_box(events)));
        });
    }

    group.finish();
}

// Benchmark: folding a turn with many parallel tool calls
fn bench_fold_tool_calls_by_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_tool_calls_by_count");

    for count in [1, 5, 20, 50].iter() {
        let events = tool_call_turn_events(*count, 3);
        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| fold_all(black_box(events)));
        });
    }

    group.finish();
}

// Benchmark: folding one tool call's JSON input split across many deltas
fn bench_fold_tool_call_by_delta_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_tool_call_by_delta_count");

    for deltas in [1, 5, 25, 100].iter() {
        let events = tool_call_turn_events(1, *deltas);
        group.bench_with_input(BenchmarkId::from_parameter(deltas), &events, |b, events| {
            b.iter(|| fold_all(black_box(events)));
        });
    }

    group.finish();
}

// Benchmark: realistic mixed turn, folded end to end into a sealed Response
fn bench_fold_and_seal_mixed_turn(c: &mut Criterion) {
    let mut group = c.benchmark_group("fold_and_seal_mixed_turn");

    let text_events = text_turn_events(30, 40);
    let mut events = text_events;
    events.truncate(events.len() - 1); // drop MessageStop so we can append tool calls first
    let tool_events = tool_call_turn_events_from(1, 3, 4);
    events.extend(tool_events.into_iter().skip(1)); // skip the duplicate MessageStart

    group.bench_function("fold_then_into_response", |b| {
        b.iter(|| {
            let acc = fold_all(black_box(&events));
            acc.into_response().expect("sealed turn yields a response")
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_fold_text_by_delta_count,
    bench_fold_text_by_delta_size,
    bench_fold_tool_calls_by_count,
    bench_fold_tool_call_by_delta_count,
    bench_fold_and_seal_mixed_turn,
);
criterion_main!(benches);
