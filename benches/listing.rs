//! Benchmarks for classification and directory listing
//!
//! Listing runs against a temp directory with an in-memory prober so only
//! the filesystem walk and classification are measured.

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::path::Path;
use stromboli::classify::{classify_extension, decide_with_codec};
use stromboli::library::{list_directory, Sandbox};
use stromboli::probe::{parse_codec_output, AudioProber};

struct StaticProber;

#[async_trait]
impl AudioProber for StaticProber {
    async fn audio_codec(&self, _path: &Path) -> stromboli_av::Result<Option<String>> {
        Ok(Some("aac".to_string()))
    }
}

const EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "txt", "jpg", "mov", "ogg"];

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("classification");

    group.bench_function("classify_extension", |b| {
        b.iter(|| {
            for ext in EXTENSIONS {
                black_box(classify_extension(black_box(ext)));
            }
        })
    });

    group.bench_function("parse_and_decide", |b| {
        b.iter(|| {
            let codec = parse_codec_output(black_box("AAC\n"));
            let probed: Result<_, ()> = Ok(codec);
            black_box(decide_with_codec(classify_extension("mp4"), &probed))
        })
    });

    group.finish();
}

fn bench_listing(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("list_directory");

    for count in [50usize, 500] {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..count {
            let ext = EXTENSIONS[i % EXTENSIONS.len()];
            std::fs::write(dir.path().join(format!("file{i:04}.{ext}")), b"").unwrap();
        }
        let sandbox = Sandbox::new(dir.path()).unwrap();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &sandbox, |b, sandbox| {
            b.iter(|| {
                rt.block_on(async {
                    black_box(list_directory(sandbox, "", &StaticProber).await.unwrap())
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classification, bench_listing);
criterion_main!(benches);
