// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! Criterion benchmarks for the segment codec's write/read pipeline (§4.1).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use blacklab_core::codec::reader::SegmentCodecReader;
use blacklab_core::codec::writer::SegmentCodecWriter;
use blacklab_core::codec::SegmentFiles;
use blacklab_core::MockPostingsSource;

const FIELD: &str = "contents%word@s";
const VOCAB: [&str; 8] = ["the", "big", "brown", "fox", "jumps", "over", "lazy", "dog"];

fn make_docs(n_docs: usize, tokens_per_doc: usize) -> MockPostingsSource {
    let docs: Vec<Vec<String>> = (0..n_docs)
        .map(|d| (0..tokens_per_doc).map(|t| VOCAB[(d + t) % VOCAB.len()].to_string()).collect())
        .collect();
    MockPostingsSource::from_primary_tokens(vec![(FIELD.to_string(), docs)])
}

fn bench_write_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_segment");
    for &n_docs in &[10usize, 100, 1000] {
        let source = make_docs(n_docs, 50);
        group.bench_with_input(BenchmarkId::from_parameter(n_docs), &source, |b, source| {
            b.iter(|| SegmentCodecWriter::new("_0", "bench-delegate").write_segment(black_box(source), |_| true));
        });
    }
    group.finish();
}

fn bench_open_reader(c: &mut Criterion) {
    let source = make_docs(1000, 50);
    let files: SegmentFiles = SegmentCodecWriter::new("_0", "bench-delegate").write_segment(&source, |_| true);

    c.bench_function("open_reader_1000_docs", |b| {
        b.iter(|| SegmentCodecReader::open(black_box(&files)).unwrap());
    });
}

fn bench_doc_tokens(c: &mut Criterion) {
    let source = make_docs(1000, 50);
    let files = SegmentCodecWriter::new("_0", "bench-delegate").write_segment(&source, |_| true);
    let reader = SegmentCodecReader::open(&files).unwrap();

    c.bench_function("doc_tokens_full_scan_1000_docs", |b| {
        b.iter(|| {
            for doc in 0..1000 {
                black_box(reader.doc_tokens(FIELD, doc, 0, 50).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_write_segment, bench_open_reader, bench_doc_tokens);
criterion_main!(benches);
