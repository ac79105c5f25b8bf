//! FridgeChef CLI Entry Point
//!
//! Command line front end for the retrieval core. Configuration comes
//! from FRIDGECHEF_* environment variables, with a few flags layered
//! on top; logs go to stderr so stdout stays clean for piping.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fridgechef_retrieval::embedding::prepare_recipe_text;
use fridgechef_retrieval::recipe::parse_ingredient_list;
use fridgechef_retrieval::{
    EmbeddingEngine, RecipeStore, Retrieval, RetrievalConfig, RetrievalEngine, TextEncoder,
    VectorIndex,
};

#[derive(Parser)]
#[command(name = "fridgechef")]
#[command(about = "Hybrid recipe retrieval over a local corpus")]
#[command(version)]
struct Args {
    /// Recipe corpus JSON file (overrides FRIDGECHEF_DATA_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Vector index file (overrides FRIDGECHEF_INDEX_PATH)
    #[arg(long, global = true)]
    index: Option<PathBuf>,

    /// Embedding model name (overrides FRIDGECHEF_EMBEDDING_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode the corpus and build the vector index
    BuildIndex,

    /// Recommend recipes for a set of on-hand ingredients
    Recommend {
        /// Comma-separated ingredient list
        #[arg(long, value_delimiter = ',', required = true)]
        ingredients: Vec<String>,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        top_k: usize,

        /// Skip vector search and use string matching directly
        #[arg(long)]
        no_vector: bool,
    },

    /// Free-text search over the corpus
    Search {
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Show a single recipe by exact title
    Show { title: String },

    /// List recipe titles in corpus order
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Report corpus and index status
    Info,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fridgechef=info,fridgechef_retrieval=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = RetrievalConfig::from_env();
    if let Some(data) = args.data {
        config.data_path = data;
    }
    if let Some(index) = args.index {
        config.index_path = index;
    }
    if let Some(model) = args.model {
        config.model_name = model;
    }

    let engine = RetrievalEngine::from_config(&config);

    match args.command {
        Command::BuildIndex => build_index(&config),
        Command::Recommend {
            ingredients,
            top_k,
            no_vector,
        } => {
            let retrieval = engine.recommend(&ingredients, !no_vector, top_k)?;
            print_results(&retrieval, args.json)
        }
        Command::Search { query, top_k } => {
            let retrieval = engine.search(&query, top_k)?;
            print_results(&retrieval, args.json)
        }
        Command::Show { title } => show(&engine, &title, args.json),
        Command::List { limit, offset } => list(&engine, limit, offset, args.json),
        Command::Info => info(&engine, &config, args.json),
    }
}

/// Encode every recipe and persist the index and its sidecars
fn build_index(config: &RetrievalConfig) -> anyhow::Result<()> {
    let store = RecipeStore::new(config.data_path.clone());
    let recipes = store.recipes();
    if recipes.is_empty() {
        bail!("No recipes loaded from {}", config.data_path.display());
    }

    tracing::info!("Preparing {} recipe texts", recipes.len());
    let texts: Vec<String> = recipes.iter().map(prepare_recipe_text).collect();

    let encoder = EmbeddingEngine::new(config);
    let started = Instant::now();
    let embeddings = encoder.encode_batch(&texts)?;
    tracing::info!(
        "Encoded {} texts in {:.1}s",
        texts.len(),
        started.elapsed().as_secs_f32()
    );

    let index = VectorIndex::new(config);
    index.build(&embeddings, recipes)?;

    println!(
        "Indexed {} recipes into {}",
        recipes.len(),
        config.index_path.display()
    );
    Ok(())
}

fn print_results(retrieval: &Retrieval, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(retrieval)?);
        return Ok(());
    }

    if retrieval.results.is_empty() {
        println!("No matching recipes found.");
        return Ok(());
    }
    for (i, matched) in retrieval.results.iter().enumerate() {
        if matched.matching_count > 0 {
            println!(
                "{:>3}. {} [{} matching: {}]",
                i + 1,
                matched.recipe.title,
                matched.matching_count,
                matched.matching_ingredients.join(", ")
            );
        } else {
            println!("{:>3}. {}", i + 1, matched.recipe.title);
        }
    }
    println!("(method: {})", retrieval.method);
    Ok(())
}

fn show(engine: &RetrievalEngine, title: &str, json: bool) -> anyhow::Result<()> {
    let recipe = engine
        .store()
        .get_by_title(title)
        .with_context(|| format!("No recipe titled {:?}", title))?;

    if json {
        println!("{}", serde_json::to_string_pretty(recipe)?);
        return Ok(());
    }

    println!("{}", recipe.title);
    for ingredient in parse_ingredient_list(&recipe.cleaned_ingredients) {
        println!("  - {}", ingredient);
    }
    if let Some(instructions) = &recipe.instructions {
        println!();
        println!("{}", instructions);
    }
    Ok(())
}

fn list(engine: &RetrievalEngine, limit: usize, offset: usize, json: bool) -> anyhow::Result<()> {
    let page = engine.store().page(limit, offset);

    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    for (i, recipe) in page.iter().enumerate() {
        println!("{:>5}  {}", offset + i, recipe.title);
    }
    println!("({} of {} recipes)", page.len(), engine.store().count());
    Ok(())
}

fn info(engine: &RetrievalEngine, config: &RetrievalConfig, json: bool) -> anyhow::Result<()> {
    let store = engine.store();
    let ready = engine.index().load();
    let index_info = engine.index().info();

    if json {
        let payload = serde_json::json!({
            "recipes": store.count(),
            "skipped": store.skipped(),
            "model": config.model_name,
            "dimension": config.dimension,
            "index": index_info,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "Recipes loaded: {} ({} skipped)",
        store.count(),
        store.skipped()
    );
    println!("Model: {} ({}-dimensional)", config.model_name, config.dimension);
    println!("Index: {}", if ready { "ready" } else { "not loaded" });
    println!("  type:      {} ({})", index_info.index_type, index_info.metric);
    println!("  dimension: {}", index_info.dimension);
    println!("  vectors:   {}", index_info.vector_count);
    println!("  path:      {}", index_info.index_path.display());
    if let Some(metadata) = engine.index().metadata() {
        println!("  built at:  {}", metadata.built_at);
    }
    Ok(())
}
