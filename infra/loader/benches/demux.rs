use chrono::Utc;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use parley_domain::models::{Comment, CommentBatch, LoadKey};
use parley_loader::demultiplex;
use std::hint::black_box;

fn flat_batch(groups: i64, per_group: i64) -> (Vec<LoadKey>, Vec<Comment>) {
    let keys = (0..groups).map(|parent| LoadKey::parent(parent, 100)).collect();
    let now = Utc::now();
    let rows = (0..groups)
        .flat_map(|parent| {
            (0..per_group).rev().map(move |n| Comment {
                id: parent * per_group + n,
                text: String::new(),
                article_id: 1,
                parent_id: Some(parent),
                created_at: now,
            })
        })
        .collect();
    (keys, rows)
}

fn bench_demux(c: &mut Criterion) {
    let mut group = c.benchmark_group("demultiplex");
    for (groups, per_group) in [(10, 11), (100, 11), (100, 101)] {
        let (keys, rows) = flat_batch(groups, per_group);
        group.throughput(Throughput::Elements(rows.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("flat", format!("{groups}x{per_group}")),
            &(keys, rows),
            |b, (keys, rows)| {
                b.iter(|| demultiplex(black_box(keys), CommentBatch::flat(rows.clone())));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_demux);
criterion_main!(benches);
