// Criterion benchmarks for Tile Match

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tile_match::core::{fold_latest_decisions, unanimous_tiles};
use tile_match::models::{Decision, Session, SwipeResult};

fn create_sessions(count: usize) -> Vec<Session> {
    (0..count)
        .map(|i| Session {
            id: format!("session-{}", i),
            tile_set_id: "ts".to_string(),
            participant_id: format!("participant-{}", i),
            participant_name: None,
            started_date: Utc::now(),
            completed_date: Some(Utc::now()),
            is_complete: i % 10 != 9,
        })
        .collect()
}

/// Every session votes on every tile; one in seven tiles gets a "No"
fn create_swipes(sessions: &[Session], tiles: usize) -> Vec<SwipeResult> {
    let now = Utc::now();
    let mut swipes = Vec::with_capacity(sessions.len() * tiles);
    for (s, session) in sessions.iter().enumerate() {
        for t in 0..tiles {
            let decision = if (s + t) % 7 == 0 { Decision::No } else { Decision::Yes };
            swipes.push(SwipeResult {
                id: format!("swipe-{}-{}", s, t),
                session_id: session.id.clone(),
                tile_id: format!("tile-{}", t),
                decision,
                timestamp: now + Duration::milliseconds((s * tiles + t) as i64),
            });
        }
    }
    swipes
}

fn bench_unanimous_tiles(c: &mut Criterion) {
    let mut group = c.benchmark_group("unanimous_tiles");

    for (participants, tiles) in [(2, 20), (10, 50), (50, 200)] {
        let sessions = create_sessions(participants);
        let swipes = create_swipes(&sessions, tiles);

        group.bench_with_input(
            BenchmarkId::new("participants_tiles", format!("{}x{}", participants, tiles)),
            &(sessions, swipes),
            |b, (sessions, swipes)| {
                b.iter(|| unanimous_tiles(black_box(sessions), black_box(swipes), 2))
            },
        );
    }

    group.finish();
}

fn bench_fold(c: &mut Criterion) {
    let sessions = create_sessions(20);
    let mut swipes = create_swipes(&sessions, 100);
    // Legacy duplicates for half the decisions
    let duplicates: Vec<SwipeResult> = swipes
        .iter()
        .step_by(2)
        .map(|s| SwipeResult {
            id: format!("{}-dup", s.id),
            timestamp: s.timestamp + Duration::seconds(1),
            ..s.clone()
        })
        .collect();
    swipes.extend(duplicates);

    c.bench_function("fold_latest_decisions", |b| {
        b.iter(|| fold_latest_decisions(black_box(&swipes)).len())
    });
}

criterion_group!(benches, bench_unanimous_tiles, bench_fold);
criterion_main!(benches);
