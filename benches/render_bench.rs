//! Benchmarks for conclog rendering.

use conclog::cells::cell_len;
use conclog::config::LoggerConfiguration;
use conclog::highlight::{KeywordTable, highlight};
use conclog::message::RawMessage;
use conclog::output::{CaptureBuffer, OutputSink};
use conclog::renderer::{RenderContext, Renderer};
use conclog::style::TextStyle;
use conclog::theme::Theme;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SAMPLE: &str = "x0 = [1.5, 2.0] * (y11 + z) >= {a: 3, b: true} @ 0x1f ^ inf";

fn renderer(theme: Theme) -> (Renderer, CaptureBuffer) {
    let buffer = CaptureBuffer::new();
    let mut renderer = Renderer::new(
        LoggerConfiguration::default()
            .with_verbosity(5)
            .with_theme(theme),
    );
    renderer.replace_sink(OutputSink::Capture(buffer.clone()));
    renderer.set_window_columns(Some(80));
    (renderer, buffer)
}

fn benchmark_highlight(c: &mut Criterion) {
    let keywords = KeywordTable::new();
    c.bench_function("highlight_none", |b| {
        b.iter(|| black_box(highlight(black_box(SAMPLE), &Theme::none(), &keywords)));
    });

    c.bench_function("highlight_dark", |b| {
        b.iter(|| black_box(highlight(black_box(SAMPLE), &Theme::dark(), &keywords)));
    });

    let mut custom = KeywordTable::new();
    custom.insert("Real", TextStyle::fg(27));
    custom.insert("Interval", TextStyle::fg(33).bold());
    c.bench_function("highlight_dark_custom_keywords", |b| {
        b.iter(|| {
            black_box(highlight(
                black_box("Interval<Real> x = Real(1.0) + Interval(0, 1)"),
                &Theme::dark(),
                &custom,
            ))
        });
    });
}

fn benchmark_style_parse(c: &mut Criterion) {
    c.bench_function("style_parse_simple", |b| {
        b.iter(|| black_box(TextStyle::parse("bold red")));
    });

    c.bench_function("style_parse_complex", |b| {
        b.iter(|| black_box(TextStyle::parse("bold underline color(208) on bright_black")));
    });
}

fn benchmark_render(c: &mut Criterion) {
    let (mut plain, plain_out) = renderer(Theme::none());
    let line = RawMessage::println("main", 2, SAMPLE);
    c.bench_function("render_println_plain", |b| {
        b.iter(|| {
            plain.submit(black_box(&line), RenderContext::named(4));
            plain_out.clear();
        });
    });

    let (mut themed, themed_out) = renderer(Theme::dark());
    let long = RawMessage::println("main", 2, SAMPLE.repeat(4));
    c.bench_function("render_println_wrapped_dark", |b| {
        b.iter(|| {
            themed.submit(black_box(&long), RenderContext::named(4));
            themed_out.clear();
        });
    });
}

fn benchmark_cells(c: &mut Criterion) {
    c.bench_function("cell_len_ascii", |b| {
        b.iter(|| black_box(cell_len(black_box(SAMPLE))));
    });

    c.bench_function("cell_len_cjk", |b| {
        b.iter(|| black_box(cell_len(black_box("日本語のテキストと混在 text"))));
    });
}

criterion_group!(
    benches,
    benchmark_highlight,
    benchmark_style_parse,
    benchmark_render,
    benchmark_cells
);
criterion_main!(benches);
