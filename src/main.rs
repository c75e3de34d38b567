use burrow::cli::{Cli, Commands, ConfigAction};
use burrow::config::{expand_path, Config, ConfigValidator};
use burrow::embedding::provider_from_config;
use burrow::engine::{Engine, EngineSettings, HitKind};
use burrow::error::{BurrowError, Result};
use burrow::graph::TagId;
use burrow::seed::{read_seed, write_seed};
use burrow::storage::{self, Database};
use burrow::vector::store_from_config;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Config { action } => cmd_config(cli.config, action),
        command => run(cli.config, command).await,
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "burrow=debug" } else { "burrow=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(config_path: Option<PathBuf>, command: Commands) -> Result<()> {
    let mutates = command.mutates_graph();
    let config = load_config(config_path.clone())?;
    let db = storage::open(&config)?;
    let engine = build_engine(&config, &db).await?;

    // The memory backend starts empty on every run
    if config.vector_store.backend == "memory" && command.reads_vector_store(&config) {
        engine.restore_store().await?;
    }

    match command {
        Commands::Ingest {
            title,
            content,
            json,
        } => cmd_ingest(&engine, &title, &content, json).await?,
        Commands::Search { query, json } => cmd_search(&engine, &query, json).await?,
        Commands::Similar { query, limit } => cmd_similar(&engine, &query, limit).await?,
        Commands::Sync => {
            let report = engine.sync_to_store().await?;
            println!(
                "✓ Synced {} tags and {} posts in {}ms",
                report.tags, report.posts, report.duration_ms
            );
        }
        Commands::Import { file } => {
            let report = engine.import_seed(read_seed(&file)?).await?;
            println!(
                "✓ Imported {} tags, {} posts, {} topics, {} keywords, {} relations",
                report.tags, report.posts, report.topics, report.keywords, report.relations
            );
        }
        Commands::Export { output } => {
            write_seed(&output, &engine.export_seed().await)?;
            println!("✓ Exported graph to {}", output.display());
        }
        Commands::Tags { limit } => {
            for tag in engine.tags(limit).await {
                println!("{}  {} ({} related)", tag.id, tag.name, tag.connections.len());
            }
        }
        Commands::Related { tag_id } => {
            let related = engine
                .related_tags(&TagId::from(tag_id.as_str()))
                .await
                .ok_or_else(|| BurrowError::TagNotFound(tag_id.clone()))?;
            if related.is_empty() {
                println!("No co-occurring tags");
            }
            for tag in related {
                println!("{}  {}", tag.id, tag.name);
            }
        }
        Commands::Graph { limit } => print_json(&engine.graph_view(limit).await)?,
        Commands::Stats => cmd_stats(&engine, &config, &db).await?,
        Commands::Config { action } => cmd_config(config_path, action)?,
    }

    if mutates {
        db.save_graph(&engine.snapshot().await)?;
    }

    Ok(())
}

/// Wire providers, load the persisted graph and apply the seed on first run
async fn build_engine(config: &Config, db: &Database) -> Result<Engine> {
    let embedder = provider_from_config(&config.embedding)?;
    let mut engine =
        Engine::new(embedder, EngineSettings::from_config(config)).with_graph(db.load_graph()?);

    if let Some(store) = store_from_config(&config.vector_store)? {
        tracing::debug!("Using {} vector store", store.backend_name());
        engine = engine.with_vector_store(store);
    }

    if let Some(seed_path) = &config.seed.path {
        if engine.stats().await.tags == 0 && db.is_empty()? {
            let path = expand_path(seed_path)?;
            tracing::info!("Empty graph, loading seed from {}", path.display());
            engine.import_seed(read_seed(&path)?).await?;
            db.save_graph(&engine.snapshot().await)?;
        }
    }

    Ok(engine)
}

async fn cmd_ingest(engine: &Engine, title: &str, content: &str, json: bool) -> Result<()> {
    let post = engine.ingest(title, content).await?;

    if json {
        return print_json(&post);
    }

    let graph = engine.snapshot().await;
    println!("✓ Stored post {}", post.id);
    for tag_id in &post.tag_ids {
        let name = graph.tags.get(tag_id).map(|t| t.name.as_str()).unwrap_or("?");
        println!("  #{} ({})", name, tag_id);
    }
    Ok(())
}

async fn cmd_search(engine: &Engine, query: &str, json: bool) -> Result<()> {
    let results = engine.search(query).await?;

    if json {
        return print_json(&results);
    }

    if results.is_empty() {
        println!("No matching tags");
        return Ok(());
    }

    println!("Tags:");
    for tag in &results.tags {
        println!("  #{} ({})", tag.name, tag.id);
    }
    println!("\nPosts:");
    for post in &results.posts {
        println!("  {}  {}", post.id, post.title);
    }
    Ok(())
}

async fn cmd_similar(engine: &Engine, query: &str, limit: Option<usize>) -> Result<()> {
    let hits = engine.store_search(query, limit).await?;

    if hits.is_empty() {
        println!("No hits");
    }
    for hit in hits {
        let label = match hit.kind {
            HitKind::Tag => hit.tag.map(|t| format!("tag  #{}", t.name)),
            HitKind::Post => hit.post.map(|p| format!("post {}", p.title)),
            HitKind::Unknown => None,
        }
        .unwrap_or_else(|| "unknown".to_string());
        println!("{:.3}  {}  {}", hit.score, hit.id, label);
    }
    Ok(())
}

async fn cmd_stats(engine: &Engine, config: &Config, db: &Database) -> Result<()> {
    let stats = engine.stats().await;
    let db_stats = db.stats()?;
    let db_path = config.database_path()?;

    println!("Burrow Stats");
    println!("============");
    println!("Tags:      {}", stats.tags);
    println!("Posts:     {}", stats.posts);
    println!("Edges:     {}", stats.edges);
    println!("Topics:    {}", stats.topics);
    println!("Keywords:  {}", stats.keywords);
    println!("Relations: {}", stats.relations);
    println!(
        "\nDatabase: {} ({}, {} tags / {} posts stored)",
        db_path.display(),
        storage::format_size(storage::database_size(&db_path)?),
        db_stats.tag_count,
        db_stats.post_count
    );
    println!(
        "Embedding: {} ({}, {} dims)",
        config.embedding.provider, config.embedding.model, config.embedding.dimension
    );
    println!("Vector store: {}", config.vector_store.backend);
    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            print_json(&config)?;
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'burrow config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    Config::load(&path)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| BurrowError::Json {
        source: e,
        context: "Failed to serialize output".to_string(),
    })?;
    println!("{}", json);
    Ok(())
}
