//! Benchmarks for the port-directory hashing input (`spec.md` §4.2.1
//! input #2), the engine's most file-heavy step.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use portsmith_abi::port_directory_entries;
use tempfile::TempDir;

fn port_dir_with_files(count: usize) -> TempDir {
    let dir = TempDir::new().unwrap();
    for i in 0..count {
        std::fs::write(dir.path().join(format!("file{i}.txt")), format!("contents of file {i}\n").repeat(32)).unwrap();
    }
    dir
}

fn bench_port_directory_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("port_directory_entries");
    for count in &[10usize, 100, 500] {
        let dir = port_dir_with_files(*count);
        group.bench_with_input(BenchmarkId::new("files", count), count, |b, _| {
            b.iter(|| black_box(port_directory_entries(dir.path()).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_port_directory_entries);
criterion_main!(benches);
