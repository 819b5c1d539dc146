// Benchmarks for leveling and streak calculations
// Measures curve settlement, rank lookup and streak derivation

use std::hint::black_box;

use chrono::{Duration, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use repit_gamification::{ExponentialCurve, RankTable, streak_from_activity};

fn bench_settle_level(c: &mut Criterion) {
    let curve = ExponentialCurve::default();
    let mut group = c.benchmark_group("settle_level");

    for xp in [500_i64, 50_000, 5_000_000, i64::MAX / 2] {
        group.bench_with_input(BenchmarkId::from_parameter(xp), &xp, |b, &xp| {
            b.iter(|| curve.settle(black_box(1), black_box(xp)))
        });
    }

    group.finish();
}

fn bench_level_info(c: &mut Criterion) {
    let curve = ExponentialCurve::default();

    c.bench_function("level_info", |b| {
        b.iter(|| curve.level_info(black_box(12), black_box(250_000)))
    });
}

fn bench_rank_progress(c: &mut Criterion) {
    let ranks = RankTable;

    c.bench_function("next_rank_progress", |b| {
        b.iter(|| ranks.next_rank_progress(black_box(7_300)))
    });
}

fn bench_streak_from_activity(c: &mut Criterion) {
    let today = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
    // Two entries a day over the last month
    let activity: Vec<_> = (0..60).map(|i| today - Duration::hours(i * 12)).collect();

    c.bench_function("streak_from_activity_30_days", |b| {
        b.iter(|| streak_from_activity(black_box(activity.iter().copied()), today.date_naive()))
    });
}

criterion_group!(
    benches,
    bench_settle_level,
    bench_level_info,
    bench_rank_progress,
    bench_streak_from_activity,
);

criterion_main!(benches);
