use criterion::{Criterion, black_box, criterion_group, criterion_main};
use skyfence::geofence::{Zone, categorize, classify};
use skyfence::ingest::{RawTelemetry, ingest_batch};
use skyfence::{select_for_display, summarize};
use std::time::Duration;

fn sample_zones(count: usize) -> Vec<Zone> {
    (0..count)
        .map(|i| {
            let name = format!("Zone {i} Airport");
            Zone {
                category: categorize(&name),
                name,
                latitude: 25.0 + (i as f64) * 1.1,
                longitude: -120.0 + (i as f64) * 2.3,
                radius_km: 8.0,
            }
        })
        .collect()
}

fn sample_batch(count: usize) -> Vec<RawTelemetry> {
    (0..count)
        .map(|i| RawTelemetry {
            callsign: Some(format!("UAV-{i:04}")),
            latitude: Some(25.0 + (i % 25) as f64),
            longitude: Some(-120.0 + (i % 50) as f64),
            altitude: Some(120.0 + i as f64),
            velocity: Some(60.0 + (i % 40) as f64),
            ..Default::default()
        })
        .collect()
}

fn bench_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("geofence");

    let zones = sample_zones(20);

    group.bench_function("classify_single_point_20_zones", |b| {
        b.iter(|| classify(black_box(38.5), black_box(-98.2), black_box(&zones)));
    });

    group.bench_function("ingest_batch_500_records", |b| {
        let batch = sample_batch(500);
        b.iter(|| ingest_batch(black_box(&batch), black_box(&zones)));
    });

    group.finish();
}

fn bench_derived_views(c: &mut Criterion) {
    let mut group = c.benchmark_group("derived_views");

    let zones = sample_zones(20);
    let records = ingest_batch(&sample_batch(2000), &zones);

    group.bench_function("select_for_display_2000_records", |b| {
        b.iter(|| select_for_display(black_box(&records), black_box(100)));
    });

    group.bench_function("summarize_2000_records", |b| {
        b.iter(|| summarize(black_box(&records)));
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_classification, bench_derived_views
}
criterion_main!(benches);
