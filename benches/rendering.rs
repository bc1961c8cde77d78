//! Benchmarks for markdown rendering.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mdflex::document::MarkdownRenderer;
use mdflex::highlight::PlainHighlighter;
use std::sync::Arc;

fn bench_render_simple(c: &mut Criterion) {
    let renderer = MarkdownRenderer::default();
    let md = "# Hello\n\nWorld";
    c.bench_function("render_simple", |b| {
        b.iter(|| renderer.render(black_box(md)))
    });
}

fn bench_render_sample(c: &mut Criterion) {
    let renderer = MarkdownRenderer::default();
    let md = include_str!("../tests/fixtures/sample.md");
    c.bench_function("render_sample", |b| {
        b.iter(|| renderer.render(black_box(md)))
    });
}

fn bench_render_sample_unhighlighted(c: &mut Criterion) {
    let renderer = MarkdownRenderer::new(Arc::new(PlainHighlighter));
    let md = include_str!("../tests/fixtures/sample.md");
    c.bench_function("render_sample_plain", |b| {
        b.iter(|| renderer.render(black_box(md)))
    });
}

criterion_group!(
    benches,
    bench_render_simple,
    bench_render_sample,
    bench_render_sample_unhighlighted
);
criterion_main!(benches);
