//! Benchmarks for the streaming conversion pipeline.
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use docstream::export::{Dispatcher, Format};
use docstream::model::{
    Document, InlineObject, Metadata, Paragraph, StructuralElement, Table, TextRun,
};
use docstream::stream::{CancelToken, StreamOptions, stream};
use docstream::{Event, convert};

/// A synthetic report with `sections` sections of mixed content.
fn sample_document(sections: usize) -> Document {
    let mut body: Vec<StructuralElement> = vec![Paragraph::heading(1, "Contents").into()];
    for i in 0..sections {
        body.push(Paragraph::heading((1 + i % 3) as u8, format!("Section {i}")).into());
        for j in 0..8 {
            body.push(
                Paragraph::default()
                    .with_run(TextRun::new(format!("Paragraph {j} of section {i}. ")))
                    .with_run(TextRun::new("Bold words ").bold())
                    .with_run(TextRun::new("and a link").italic().link("https://example.com"))
                    .with_run(TextRun::new(". ".repeat(40)))
                    .into(),
            );
        }
        body.push(Paragraph::bullet("First point").into());
        body.push(Paragraph::bullet("Second point").into());
        body.push(Table::from_rows([["Name", "Value"], ["alpha", "1"], ["beta", "2"]]).into());
        body.push(Paragraph::default().with_image("figure").into());
    }

    Document::new("Benchmark report")
        .with_metadata(Metadata::new("Benchmark report").with_date("2024-01-01"))
        .with_inline_object("figure", InlineObject::new("https://example.com/f.png"))
        .with_body(body)
}

fn bench_stream(c: &mut Criterion) {
    let doc = sample_document(50);
    let options = StreamOptions::default();

    c.bench_function("stream_events", |b| {
        b.iter(|| {
            let cancel = CancelToken::new();
            let count = stream(black_box(&doc), &options, &cancel).count();
            black_box(count)
        });
    });
}

fn bench_stream_small_chunks(c: &mut Criterion) {
    let doc = sample_document(50);
    let options = StreamOptions::default().with_chunk_size(16);

    c.bench_function("stream_events_chunk_16", |b| {
        b.iter(|| {
            let cancel = CancelToken::new();
            let bytes: usize = stream(black_box(&doc), &options, &cancel)
                .filter_map(|event| match event {
                    Event::Text(text) => Some(text.len()),
                    _ => None,
                })
                .sum();
            black_box(bytes)
        });
    });
}

fn bench_formats(c: &mut Criterion) {
    let doc = sample_document(50);
    let options = StreamOptions::default();

    let mut group = c.benchmark_group("render");
    for format in Format::ALL {
        group.bench_function(format.name(), |b| {
            b.iter(|| {
                let cancel = CancelToken::new();
                let mut dispatcher = Dispatcher::new().with_format(format);
                dispatcher
                    .run(stream(black_box(&doc), &options, &cancel), &cancel)
                    .expect("render")
            });
        });
    }
    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let doc = sample_document(50);
    let options = StreamOptions::default();

    c.bench_function("convert_all_formats", |b| {
        b.iter(|| convert(black_box(&doc), &Format::ALL, &options).expect("convert"));
    });
}

criterion_group!(
    benches,
    bench_stream,
    bench_stream_small_chunks,
    bench_formats,
    bench_fan_out,
);
criterion_main!(benches);
