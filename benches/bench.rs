use chrono::{TimeDelta, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};

use track_viz::kde::DensityGrid;
use track_viz::movements::compute_movements;
use track_viz::track::TrackPoint;

// an hour at one point per second, with a pause every ten minutes
fn one_hour_run() -> Vec<TrackPoint> {
    let start = Utc.with_ymd_and_hms(2021, 6, 12, 10, 0, 0).unwrap();
    let mut time = start;
    (0..3600)
        .map(|i| {
            time += TimeDelta::seconds(if i % 600 == 599 { 30 } else { 1 });
            let alt = 100.0 + (i as f64 / 60.0).sin() * 5.0;
            TrackPoint::new(time, 48.2 + i as f64 * 0.00003, 16.37, Some(alt))
        })
        .collect()
}

fn movements(c: &mut Criterion) {
    let points = one_hour_run();
    c.bench_function("compute_movements", |b| {
        b.iter(|| std::hint::black_box(compute_movements(&points)));
    });
}

fn density(c: &mut Criterion) {
    let points: Vec<(f64, f64)> = (0..3600)
        .map(|i| (400.0 + (i as f64 / 100.0).cos() * 200.0, i as f64 / 6.0))
        .collect();
    c.bench_function("density_grid", |b| {
        b.iter(|| std::hint::black_box(DensityGrid::from_points(&points, 1024, 768, 4.0)));
    });
}

criterion_group!(benches, movements, density);
criterion_main!(benches);
