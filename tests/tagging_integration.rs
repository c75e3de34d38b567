/// Tagging and retrieval behaviour with a deterministic embedder
mod common;

use burrow::engine::EngineSettings;
use burrow::graph::{KnowledgeGraph, Tag, TagGraph, TagId};
use burrow::BurrowError;
use common::*;
use std::collections::HashSet;
use std::time::Duration;

fn graph_with(tags: Vec<Tag>) -> KnowledgeGraph {
    let mut graph = KnowledgeGraph::new();
    let mut tag_graph = TagGraph::new();
    for tag in tags {
        assert!(tag_graph.insert(tag));
    }
    graph.tags = tag_graph;
    graph
}

#[tokio::test]
async fn test_first_tag_creation() {
    let engine = stub_engine();

    let post = engine.ingest(CATS.0, CATS.1).await.unwrap();

    let graph = engine.snapshot().await;
    assert_eq!(graph.tags.len(), 1);
    assert_eq!(post.tag_ids.len(), 1);

    let tag = graph.tags.get(&post.tag_ids[0]).unwrap();
    assert_eq!(tag.name, "cats");
    assert_eq!(tag.vector, post.vector);
    assert!(tag.connections.is_empty());
}

#[tokio::test]
async fn test_similar_post_attaches_to_existing_tag() {
    let engine = stub_engine();
    let first = engine.ingest(CATS.0, CATS.1).await.unwrap();

    let second = engine.ingest(CUTE.0, CUTE.1).await.unwrap();

    assert_eq!(engine.stats().await.tags, 1);
    assert_eq!(second.tag_ids, first.tag_ids);
}

#[tokio::test]
async fn test_disjoint_topic_mints_unconnected_tag() {
    let engine = stub_engine();
    engine.ingest(CATS.0, CATS.1).await.unwrap();
    engine.ingest(CUTE.0, CUTE.1).await.unwrap();

    let rockets = engine.ingest(ROCKETS.0, ROCKETS.1).await.unwrap();

    let graph = engine.snapshot().await;
    assert_eq!(graph.tags.len(), 2);
    assert_eq!(rockets.tag_ids.len(), 1);
    let tag = graph.tags.get(&rockets.tag_ids[0]).unwrap();
    assert_eq!(tag.name, "rocket science");
    assert!(tag.connections.is_empty());
    assert_eq!(graph.tags.edge_count(), 0);
}

#[tokio::test]
async fn test_search_below_threshold_is_empty() {
    let engine = stub_engine();
    engine.ingest(CATS.0, CATS.1).await.unwrap();
    engine.ingest(ROCKETS.0, ROCKETS.1).await.unwrap();

    let results = engine.search("pets?").await.unwrap();

    assert!(results.tags.is_empty());
    assert!(results.posts.is_empty());
}

#[tokio::test]
async fn test_search_returns_tags_and_their_posts() {
    let engine = stub_engine();
    let cats = engine.ingest(CATS.0, CATS.1).await.unwrap();
    let cute = engine.ingest(CUTE.0, CUTE.1).await.unwrap();
    engine.ingest(ROCKETS.0, ROCKETS.1).await.unwrap();

    let results = engine.search("cats").await.unwrap();

    assert_eq!(results.tags.len(), 1);
    assert_eq!(results.tags[0].name, "cats");
    let ids: Vec<_> = results.posts.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec![cats.id, cute.id]);
}

#[tokio::test]
async fn test_search_and_ingest_thresholds_differ() {
    // cos 0.82 to the cats vector: above 0.80, below 0.85
    let kittens = [0.82, 0.572_363_5, 0.0];
    let embedder = StubEmbedder::new()
        .with("kittens", kittens)
        .with("Kittens Kittens", kittens);
    let engine = engine_with(embedder, EngineSettings::default());
    let cats = engine.ingest(CATS.0, CATS.1).await.unwrap();

    let results = engine.search("kittens").await.unwrap();
    assert_eq!(results.tags.len(), 1);
    assert_eq!(results.tags[0].id, cats.tag_ids[0]);

    let post = engine.ingest("Kittens", "Kittens").await.unwrap();
    assert_eq!(engine.stats().await.tags, 2);
    assert_ne!(post.tag_ids, cats.tag_ids);
    let graph = engine.snapshot().await;
    assert_eq!(graph.tags.get(&post.tag_ids[0]).unwrap().name, "kittens");
}

#[tokio::test]
async fn test_search_threshold_is_strict() {
    let settings = EngineSettings {
        search_threshold: 1.0,
        ..EngineSettings::default()
    };
    let engine = engine_with(StubEmbedder::new(), settings);
    engine.ingest(CATS.0, CATS.1).await.unwrap();

    // Identical unit vectors score exactly 1.0
    assert!(engine.search("cats").await.unwrap().is_empty());

    let settings = EngineSettings {
        search_threshold: 0.999,
        ..EngineSettings::default()
    };
    let engine = engine_with(StubEmbedder::new(), settings);
    engine.ingest(CATS.0, CATS.1).await.unwrap();
    assert_eq!(engine.search("cats").await.unwrap().tags.len(), 1);
}

#[tokio::test]
async fn test_search_ranks_by_score_and_caps() {
    let scores = [0.91, 0.99, 0.87, 0.95, 0.89, 0.97, 0.93];
    let tags = scores
        .iter()
        .map(|&c: &f32| {
            Tag::new(
                TagId::from(format!("t{}", (c * 100.0).round())),
                format!("tag {}", c),
                vec![c, (1.0 - c * c).sqrt(), 0.0],
            )
        })
        .collect();
    let engine = stub_engine().with_graph(graph_with(tags));

    let results = engine.search("cats").await.unwrap();

    let ids: Vec<&str> = results.tags.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t99", "t97", "t95", "t93", "t91"]);
}

#[tokio::test]
async fn test_co_occurrence_edge() {
    let a = Tag::new(TagId::from("a"), "a", vec![1.0, 0.0, 0.0]);
    let b = Tag::new(TagId::from("b"), "b", vec![0.8, 0.6, 0.0]);
    let c = Tag::new(TagId::from("c"), "c", vec![0.0, 0.0, 1.0]);
    // ~0.95 to both a and b, 0 to c
    let embedder = StubEmbedder::new().with("Mixed both", [1.8, 0.6, 0.0]);
    let engine =
        engine_with(embedder, EngineSettings::default()).with_graph(graph_with(vec![a, b, c]));

    let post = engine.ingest("Mixed", "both").await.unwrap();

    let attached: HashSet<_> = post.tag_ids.iter().cloned().collect();
    let expected: HashSet<_> = [TagId::from("a"), TagId::from("b")].into_iter().collect();
    assert_eq!(attached, expected);

    let graph = engine.snapshot().await;
    assert_eq!(graph.tags.len(), 3);
    assert_eq!(graph.tags.edge_count(), 1);
    assert!(graph.tags.get(&TagId::from("a")).unwrap().connections.contains(&TagId::from("b")));
    assert!(graph.tags.get(&TagId::from("b")).unwrap().connections.contains(&TagId::from("a")));
    assert!(graph.tags.get(&TagId::from("c")).unwrap().connections.is_empty());
}

#[tokio::test]
async fn test_ties_keep_insertion_order_and_cap() {
    let tags = (0..7)
        .map(|i| Tag::new(TagId::from(format!("t{}", i)), format!("tag {}", i), vec![1.0, 0.0, 0.0]))
        .collect();
    let engine = stub_engine().with_graph(graph_with(tags));

    let post = engine.ingest(CATS.0, CATS.1).await.unwrap();

    let expected: Vec<TagId> = (0..5).map(|i| TagId::from(format!("t{}", i))).collect();
    assert_eq!(post.tag_ids, expected);

    let graph = engine.snapshot().await;
    assert_eq!(graph.tags.edge_count(), 10);
    assert!(graph.tags.get(&TagId::from("t5")).unwrap().connections.is_empty());
    assert!(graph.tags.get(&TagId::from("t6")).unwrap().connections.is_empty());
}

#[tokio::test]
async fn test_threshold_monotonicity() {
    let sequence = [CATS, CUTE, ROCKETS];

    let mut runs = Vec::new();
    for threshold in [0.5, 0.95] {
        let settings = EngineSettings {
            attach_threshold: threshold,
            ..EngineSettings::default()
        };
        let engine = engine_with(StubEmbedder::new(), settings);
        let mut attached = Vec::new();
        for (title, content) in sequence {
            attached.push(engine.ingest(title, content).await.unwrap().tag_ids.len());
        }
        runs.push((attached, engine.stats().await.tags));
    }

    let (low_attached, low_minted) = &runs[0];
    let (high_attached, high_minted) = &runs[1];
    assert!(high_minted >= low_minted);
    for (high, low) in high_attached.iter().zip(low_attached) {
        assert!(high <= low);
    }
    assert_eq!((*low_minted, *high_minted), (2, 3));
}

#[tokio::test]
async fn test_determinism_with_stub_embedder() {
    let engine = stub_engine();

    let first = engine.ingest(CATS.0, CATS.1).await.unwrap();
    let second = engine.ingest(CATS.0, CATS.1).await.unwrap();

    assert_ne!(first.id, second.id);
    assert_eq!(first.vector, second.vector);
    assert_eq!(first.tag_ids, second.tag_ids);

    // Two fresh engines make the same decisions
    let names = |graph: KnowledgeGraph| -> Vec<String> {
        graph.tags.iter().map(|t| t.name.clone()).collect()
    };
    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let engine = stub_engine();
        for (title, content) in [CATS, CUTE, ROCKETS] {
            engine.ingest(title, content).await.unwrap();
        }
        outcomes.push(names(engine.snapshot().await));
    }
    assert_eq!(outcomes[0], outcomes[1]);
}

#[tokio::test]
async fn test_graph_stays_symmetric() {
    let a = Tag::new(TagId::from("a"), "a", vec![1.0, 0.0, 0.0]);
    let b = Tag::new(TagId::from("b"), "b", vec![0.8, 0.6, 0.0]);
    let embedder = StubEmbedder::new().with("Mixed both", [1.8, 0.6, 0.0]);
    let engine =
        engine_with(embedder, EngineSettings::default()).with_graph(graph_with(vec![a, b]));

    for (title, content) in [CATS, ("Mixed", "both"), CUTE, ROCKETS, ("Mixed", "both")] {
        engine.ingest(title, content).await.unwrap();
    }

    let graph = engine.snapshot().await;
    assert!(graph.tags.is_consistent());
    for tag in graph.tags.iter() {
        assert!(!tag.connections.contains(&tag.id));
    }
    // The repeated a-b pair is still one edge
    assert_eq!(graph.tags.edge_count(), 1);
}

#[tokio::test]
async fn test_empty_title_gets_placeholder_name() {
    let embedder = StubEmbedder::new().with(" nameless", [0.0, 1.0, 0.0]);
    let engine = engine_with(embedder, EngineSettings::default());

    let post = engine.ingest("", "nameless").await.unwrap();

    let graph = engine.snapshot().await;
    let tag = graph.tags.get(&post.tag_ids[0]).unwrap();
    assert!(tag.name.starts_with("untitled-"));
}

#[tokio::test]
async fn test_embedding_failure_leaves_state_unchanged() {
    let seeded = stub_engine();
    seeded.ingest(CATS.0, CATS.1).await.unwrap();
    let before = seeded.snapshot().await;

    let engine = engine_with(FailingEmbedder, EngineSettings::default()).with_graph(before.clone());

    let err = engine.ingest(ROCKETS.0, ROCKETS.1).await.unwrap_err();
    assert!(matches!(err, BurrowError::EmbeddingUnavailable(_)));
    assert_eq!(engine.snapshot().await.stats(), before.stats());

    let err = engine.search("cats").await.unwrap_err();
    assert!(matches!(err, BurrowError::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn test_embedding_timeout() {
    let settings = EngineSettings {
        embed_timeout: Duration::from_millis(50),
        ..EngineSettings::default()
    };
    let engine = engine_with(SlowEmbedder, settings);

    let err = engine.ingest(CATS.0, CATS.1).await.unwrap_err();

    assert!(matches!(err, BurrowError::EmbeddingUnavailable(_)));
    assert!(engine.snapshot().await.is_empty());
}

#[tokio::test]
async fn test_related_tags_and_graph_view() {
    let a = Tag::new(TagId::from("a"), "a", vec![1.0, 0.0, 0.0]);
    let b = Tag::new(TagId::from("b"), "b", vec![0.8, 0.6, 0.0]);
    let embedder = StubEmbedder::new().with("Mixed both", [1.8, 0.6, 0.0]);
    let engine =
        engine_with(embedder, EngineSettings::default()).with_graph(graph_with(vec![a, b]));
    engine.ingest("Mixed", "both").await.unwrap();

    let related = engine.related_tags(&TagId::from("a")).await.unwrap();
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, TagId::from("b"));
    assert!(engine.related_tags(&TagId::from("zzz")).await.is_none());

    let view = engine.graph_view(10).await;
    assert_eq!(view.links.len(), 1);
    assert_eq!(view.nodes.len(), 2);
}
