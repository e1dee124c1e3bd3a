//! Benchmarks for the client-side derivations: adjacency index, connection
//! sets and explanation formatting.
//!
//! Run with: `cargo bench --bench derive_perf`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

use feedview::connections::{ConnectionInputs, ConnectionSets};
use feedview::explain::format_explanation;
use feedview::graph::{MemoizedIndex, build_index};
use feedview::model::{Explanation, Graph, GraphEdge, GraphNode, User};

fn make_graph(nodes: usize, fanout: usize) -> Graph {
    let ids: Vec<i64> = (1..=i64::try_from(nodes).unwrap_or(i64::MAX)).collect();
    let nodes: Vec<GraphNode> = ids
        .iter()
        .map(|id| GraphNode {
            id: *id,
            handle: format!("u{id}"),
            persona_type: "casual".to_string(),
        })
        .collect();
    let n = ids.len();
    let edges = (0..n)
        .flat_map(|s| {
            let ids = &ids;
            (1..=fanout).map(move |k| GraphEdge {
                source: ids[s],
                target: ids[(s * 7 + k * 13) % n],
            })
        })
        .collect();
    Graph { nodes, edges }
}

fn make_users(count: i64) -> Vec<User> {
    (1..=count)
        .map(|id| User {
            id,
            handle: format!("u{id}"),
            display_name: format!("User {id}"),
            bio: String::new(),
            avatar_url: String::new(),
            persona_type: "casual".to_string(),
        })
        .collect()
}

fn bench_build_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");
    group.measurement_time(Duration::from_secs(5));

    for nodes in [100usize, 1_000, 10_000] {
        let graph = make_graph(nodes, 8);
        group.throughput(Throughput::Elements((nodes * 9) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| black_box(build_index(graph)).len());
        });
    }

    let graph = Arc::new(make_graph(10_000, 8));
    let mut memo = MemoizedIndex::new();
    memo.get(&graph);
    group.bench_function("memoized_hit", |b| {
        b.iter(|| black_box(memo.get(&graph)).len());
    });

    group.finish();
}

fn bench_connection_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("connection_sets");

    for total in [100i64, 5_000] {
        let all = make_users(total);
        let following: Vec<User> = all.iter().step_by(3).cloned().collect();
        let viewer_following: Vec<User> = all.iter().step_by(5).cloned().collect();
        group.bench_with_input(BenchmarkId::new("resolve", total), &total, |b, _| {
            b.iter(|| {
                let sets = ConnectionSets::resolve(ConnectionInputs {
                    subject_id: 2,
                    viewer_id: 1,
                    subject_following: &following,
                    all_users: &all,
                    viewer_following: &viewer_following,
                });
                black_box(sets.not_following().len())
            });
        });
    }

    group.finish();
}

fn bench_format_explanation(c: &mut Criterion) {
    let components: IndexMap<String, f64> = [
        ("recency", 0.42),
        ("popularity", 0.71),
        ("topic_match", 0.33),
        ("in_network", 1.0),
        ("niche", 0.1),
        ("viral", 0.9),
        ("diversity", 0.5),
        ("experimental", 0.25),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let explanation = Explanation {
        score: 0.8765,
        components,
        notes: vec!["fresh".to_string(), "in network".to_string()],
        stage_log: ["hydration", "sources", "filters", "scorers", "selection"]
            .into_iter()
            .map(String::from)
            .collect(),
        action_probs: [("like", 0.3), ("reply", 0.05), ("repost", 0.02), ("click", 0.4)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    };

    c.bench_function("format_explanation", |b| {
        b.iter(|| black_box(format_explanation(black_box(&explanation))));
    });
}

criterion_group!(
    benches,
    bench_build_index,
    bench_connection_sets,
    bench_format_explanation
);
criterion_main!(benches);
