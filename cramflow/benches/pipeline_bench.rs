//! Benchmarks for checkpoint encoding and job log classification.

use cramflow::checkpoint::StageCheckpoint;
use cramflow::core::{WorkCollection, WorkItem};
use cramflow::monitor::JobMarkers;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn lane_collection(size: usize) -> WorkCollection {
    let items = (0..size)
        .map(|i| {
            let mut item =
                WorkItem::discovered(format!("35000_2#{i}.cram"), "/seq/35000", "2", false);
            item.exists_remote = true;
            item.local_path = Some(format!("1_archive_downloads/{}", item.id).into());
            item.download_success = true;
            item.metadata_parsed = true;
            item.category = Some("GnT scRNA".into());
            item.label = Some(format!("PD{i:05}a"));
            item
        })
        .collect();
    WorkCollection::from_items(items).unwrap_or_default()
}

fn checkpoint_benchmark(c: &mut Criterion) {
    let items = lane_collection(384);
    let encoded = StageCheckpoint::new(2, items.clone())
        .and_then(|cp| cp.to_json())
        .unwrap_or_default();

    c.bench_function("checkpoint_encode_384", |b| {
        b.iter(|| {
            StageCheckpoint::new(2, black_box(items.clone()))
                .and_then(|cp| cp.to_json())
                .map(|bytes| bytes.len())
        });
    });

    c.bench_function("checkpoint_decode_384", |b| {
        b.iter(|| StageCheckpoint::from_json(2, black_box(&encoded)).map(|cp| cp.items.len()));
    });
}

fn marker_benchmark(c: &mut Criterion) {
    let markers = JobMarkers::default();
    let running = "Sender: LSF System\nJob was submitted from host\nStarted at Fri Oct 16\n"
        .repeat(20);
    let finished = format!("{running}Successfully completed.\nTerminated at Fri Oct 16\n");

    c.bench_function("classify_running_log", |b| {
        b.iter(|| markers.classify(black_box(&running)));
    });
    c.bench_function("classify_finished_log", |b| {
        b.iter(|| markers.classify(black_box(&finished)));
    });
}

criterion_group!(benches, checkpoint_benchmark, marker_benchmark);
criterion_main!(benches);
