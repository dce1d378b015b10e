//! Performance benchmarks for ingestion and feature extraction.
//!
//! Run with: `cargo bench --bench features`
//!
//! ## Workload
//!
//! Synthetic timelines of `n` script-driven image slots: each slot inserts a
//! container and an image under the body and fetches one pixel, so the graph
//! has roughly `3n` nodes and `5n` edges.

use criterion::{
    black_box, criterion_group, criterion_main,
    BenchmarkId, Criterion, Throughput,
};

use adgraph_kernel::{
    build_graph, FeatureConfig, FeatureExtractor, KatzParams, NetworkRequest, NetworkResource,
    PageTimeline, TimelineEvent,
};
use adgraph_kernel::types::event::{NodeInsertion, ScriptCompilation};

fn insertion(node: String, parent: &str, actor: Option<&str>, tag: &str) -> TimelineEvent {
    TimelineEvent::NodeInsertion(NodeInsertion {
        node_id: node,
        node_parent_id: parent.to_string(),
        actor_id: actor.map(str::to_string),
        tag_name: Some(tag.to_string()),
        node_type: Some(1),
        node_previous_sibling_id: "0".to_string(),
        node_attributes: Vec::new(),
    })
}

/// Create a synthetic page with `slots` image slots.
fn make_timeline(slots: usize) -> PageTimeline {
    let mut events = vec![
        insertion("2".into(), "1", None, "body"),
        insertion("3".into(), "2", None, "script"),
        TimelineEvent::ScriptCompilation(ScriptCompilation {
            node_id: "3".into(),
            script_id: "100".into(),
            script_text: "for (const s of slots) render(s);".into(),
        }),
    ];
    for i in 0..slots {
        let container = format!("c{i}");
        let image = format!("i{i}");
        events.push(insertion(container.clone(), "2", Some("100"), "div"));
        events.push(insertion(image.clone(), &container, Some("100"), "img"));
        events.push(TimelineEvent::network(
            NetworkResource::Image,
            NetworkRequest {
                actor_id: Some("100".into()),
                request_url: format!("https://px.adnet.test/imp?slot={i}&sz=300x250"),
                requestor_id: image,
            },
        ));
    }
    PageTimeline {
        url: "https://www.news.example/".into(),
        events,
    }
}

/// Benchmark graph construction.
fn bench_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingestion");

    for slots in [10, 100, 500] {
        let timeline = make_timeline(slots);

        group.throughput(Throughput::Elements(timeline.events.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("slots", slots),
            &timeline,
            |b, timeline| {
                b.iter(|| {
                    let (graph, report) = build_graph(black_box(timeline)).unwrap();
                    assert!(report.unresolved.is_empty());
                    graph
                })
            },
        );
    }

    group.finish();
}

/// Benchmark one Katz solve.
fn bench_katz(c: &mut Criterion) {
    let mut group = c.benchmark_group("katz");
    let params = KatzParams::default();

    for slots in [10, 100, 500] {
        let (graph, _) = build_graph(&make_timeline(slots)).unwrap();

        group.throughput(Throughput::Elements(graph.node_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("slots", slots),
            &graph,
            |b, graph| {
                b.iter_batched(
                    || graph.clone(),
                    |mut graph| {
                        let outcome = graph.update_katz_centrality(black_box(&params));
                        assert!(outcome.converged());
                        graph
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

/// Benchmark record assembly for every request node.
fn bench_extract_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_all");
    let extractor = FeatureExtractor::new(FeatureConfig::default());

    for slots in [10, 100] {
        let (graph, _) = build_graph(&make_timeline(slots)).unwrap();

        group.throughput(Throughput::Elements(slots as u64));
        group.bench_with_input(
            BenchmarkId::new("slots", slots),
            &graph,
            |b, graph| {
                b.iter_batched(
                    || graph.clone(),
                    |mut graph| {
                        let records = extractor.extract_all(&mut graph).unwrap();
                        assert_eq!(records.len(), slots);
                        records
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_ingestion,
    bench_katz,
    bench_extract_all,
);

criterion_main!(benches);
