/// Persistence of the knowledge graph in SQLite
mod common;

use burrow::engine::EngineSettings;
use burrow::seed::parse_seed;
use burrow::storage::Database;
use common::*;
use tempfile::TempDir;

#[tokio::test]
async fn test_graph_survives_reload() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("store/burrow.sqlite");

    let embedder = StubEmbedder::new()
        .with("Mixed both", [1.8, 0.6, 0.0])
        .with("rust", [0.0, 1.0, 0.0]);
    let engine = engine_with(embedder, EngineSettings::default());
    engine
        .import_seed(
            parse_seed(
                r#"{
                    "keywords": [{"name": "rust"}],
                    "tags": [
                        {"id": "a", "name": "a", "vector": [1.0, 0.0, 0.0]},
                        {"id": "b", "name": "b", "vector": [0.8, 0.6, 0.0]}
                    ],
                    "relations": [{"from": "p0", "to": "rust", "type": "TAGGED_WITH"}]
                }"#,
            )
            .unwrap(),
        )
        .await
        .unwrap();
    engine.ingest("Mixed", "both").await.unwrap();
    engine.ingest(ROCKETS.0, ROCKETS.1).await.unwrap();
    let before = engine.snapshot().await;

    let db = Database::new(&db_path).unwrap();
    db.save_graph(&before).unwrap();
    // Saving twice must not duplicate anything
    db.save_graph(&before).unwrap();
    drop(db);

    let db = Database::new(&db_path).unwrap();
    let after = db.load_graph().unwrap();

    assert_eq!(after.stats(), before.stats());
    assert!(after.tags.is_consistent());

    let tags_before: Vec<_> = before.tags.iter().collect();
    let tags_after: Vec<_> = after.tags.iter().collect();
    assert_eq!(tags_before, tags_after);

    let posts_before: Vec<_> = before.posts.iter().collect();
    let posts_after: Vec<_> = after.posts.iter().collect();
    assert_eq!(posts_before, posts_after);

    assert_eq!(after.keywords[0].name, "rust");
    assert!(after.keywords[0].connections.contains("p0"));
    assert_eq!(after.relations[0].kind, "TAGGED_WITH");

    let stats = db.stats().unwrap();
    assert_eq!(stats.tag_count, 3);
    assert_eq!(stats.post_count, 2);
    assert_eq!(stats.edge_count, 1);
}

#[tokio::test]
async fn test_reloaded_engine_keeps_tagging() {
    let temp = TempDir::new().unwrap();
    let db = Database::new(&temp.path().join("burrow.sqlite")).unwrap();

    let engine = stub_engine();
    engine.ingest(CATS.0, CATS.1).await.unwrap();
    db.save_graph(&engine.snapshot().await).unwrap();

    let reloaded = stub_engine().with_graph(db.load_graph().unwrap());
    let post = reloaded.ingest(CUTE.0, CUTE.1).await.unwrap();

    // Attaches to the persisted tag rather than minting
    assert_eq!(reloaded.stats().await.tags, 1);
    assert_eq!(post.tag_ids.len(), 1);
}
