//! Performance benchmarks for fieldsync-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fieldsync_engine::{
    compute_delta, group_by_account, NewMeterDraft, NewMeterRecord, OldMeterDraft,
    OldMeterRecord, SerialDirectoryResponse, UploadStatus,
};
use std::collections::BTreeSet;

fn serial_set(start: usize, count: usize) -> BTreeSet<String> {
    (start..start + count).map(|i| format!("SN{:08}", i)).collect()
}

fn bench_serial_delta(c: &mut Criterion) {
    let mut group = c.benchmark_group("serial_delta");

    for size in [100usize, 1_000, 10_000] {
        // 10% churn on each side
        let local = serial_set(0, size);
        let remote = serial_set(size / 10, size);

        group.bench_with_input(BenchmarkId::new("compute_delta", size), &size, |b, _| {
            b.iter(|| compute_delta(black_box(&remote), black_box(&local)))
        });
    }

    let csv: Vec<String> = (0..5_000).map(|i| format!("SN{:08}", i)).collect();
    let body = serde_json::json!({
        "status": true,
        "user_information": [
            { "id": 1, "box_id": "B1", "unused_meter_serial_no": csv.join(", ") }
        ],
    })
    .to_string();
    group.bench_function("parse_and_flatten_5000", |b| {
        b.iter(|| {
            SerialDirectoryResponse::parse(black_box(&body))
                .map(|r| r.flatten())
                .ok()
        })
    });

    group.finish();
}

fn bench_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("grouping");

    for accounts in [10usize, 100, 1_000] {
        let old: Vec<_> = (0..accounts * 2)
            .map(|i| OldMeterRecord {
                id: i as i64,
                draft: OldMeterDraft {
                    created_at: format!("2024-01-01T00:00:{:02}Z", i % 60),
                    ..OldMeterDraft::new(format!("ACC-{}", i % accounts))
                },
                status: UploadStatus::default(),
            })
            .collect();
        let new: Vec<_> = (0..accounts)
            .map(|i| NewMeterRecord {
                id: (accounts * 2 + i) as i64,
                draft: NewMeterDraft::new(format!("ACC-{}", i)),
                status: UploadStatus::default(),
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("group_by_account", accounts),
            &accounts,
            |b, _| b.iter(|| group_by_account(black_box(old.clone()), black_box(new.clone()))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_serial_delta, bench_grouping);
criterion_main!(benches);
