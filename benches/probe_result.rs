//! 探测结果基准测试
//!
//! 测试结果构建、序列化和内容匹配的开销

use criterion::{criterion_group, criterion_main, Criterion};
use page_probe::probe::{ProbeFailure, ProbeKind, ProbeResult};
use std::hint::black_box;
use std::time::Duration;

fn probe_result_benchmark(c: &mut Criterion) {
    let body = "<html>".to_string() + &"lorem ipsum ".repeat(2048) + "\"fullStateName\"</html>";

    c.bench_function("probe_result_creation", |b| {
        b.iter(|| {
            let result = ProbeResult::new("https://example.com", ProbeKind::PageLoad, true)
                .with_status_code(200)
                .with_body(black_box(body.clone()))
                .with_elapsed(Duration::from_millis(150));
            black_box(result)
        });
    });

    c.bench_function("probe_failure_creation", |b| {
        b.iter(|| {
            let result = ProbeResult::failed(
                "https://slow.example.com",
                ProbeKind::Deadline,
                ProbeFailure::timeout(),
            )
            .with_timeout(Duration::from_millis(100));
            black_box(result)
        });
    });

    c.bench_function("content_match", |b| {
        b.iter(|| black_box(body.as_str()).contains(black_box("\"fullStateName\"")));
    });
}

fn probe_result_serialization_benchmark(c: &mut Criterion) {
    let result = ProbeResult::new("https://example.com", ProbeKind::ContentMatch, true)
        .with_status_code(200)
        .with_content_match("Example Domain", true)
        .with_elapsed(Duration::from_millis(150));

    c.bench_function("probe_result_serialization", |b| {
        b.iter(|| {
            let json = serde_json::to_string(black_box(&result)).unwrap();
            black_box(json)
        });
    });

    let json = serde_json::to_string(&result).unwrap();
    c.bench_function("probe_result_deserialization", |b| {
        b.iter(|| {
            let parsed = ProbeResult::from_json(black_box(&json)).unwrap();
            black_box(parsed)
        });
    });
}

criterion_group!(
    benches,
    probe_result_benchmark,
    probe_result_serialization_benchmark
);
criterion_main!(benches);
