//! Benchmarks for status paragraph serialize/parse, the status database's
//! per-load and per-append hot path (`spec.md` §4.4).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portsmith_core::{PackageSpec, Paragraph, Triplet, Version};
use portsmith_status::{BinaryParagraph, StatusParagraph};

fn paragraphs(count: usize) -> Vec<StatusParagraph> {
    (0..count)
        .map(|i| {
            StatusParagraph::installed(BinaryParagraph {
                spec: PackageSpec::new(format!("port{i}"), Triplet::new("x64-linux")),
                version: Version::new("1.0", 0),
                feature: "core".to_string(),
                dependencies: (0..i % 5).map(|d| format!("port{d}:x64-linux")).collect(),
                abi_tag: Some(format!("{i:0>16x}")),
            })
        })
        .collect()
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_paragraph_serialize");
    for count in &[10usize, 200, 2000] {
        let records = paragraphs(*count);
        group.bench_with_input(BenchmarkId::new("count", count), count, |b, _| {
            b.iter(|| {
                let mut text = String::new();
                for p in &records {
                    text.push_str(&p.to_paragraph().to_text());
                }
                black_box(text)
            });
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_paragraph_parse");
    for count in &[10usize, 200, 2000] {
        let mut text = String::new();
        for p in paragraphs(*count) {
            text.push_str(&p.to_paragraph().to_text());
        }
        group.bench_with_input(BenchmarkId::new("count", count), &text, |b, text| {
            b.iter(|| black_box(Paragraph::parse_all(text).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_serialize, bench_parse);
criterion_main!(benches);
