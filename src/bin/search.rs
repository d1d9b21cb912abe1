use std::path::PathBuf;

use clap::Parser;

use threadseek::search::{
    EmbeddingClient, EmbeddingConfig, SearchConfig, SearchEngine, SearchMode,
};

#[derive(Parser, Debug)]
#[command(name = "search", about = "Search through chat messages")]
struct Args {
    /// The search query.
    query: String,

    /// Maximum number of threads to surface.
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Relevance index variant (`lexical` or `semantic`).
    #[arg(long)]
    mode: Option<SearchMode>,

    /// Path to the chat export JSON file.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Directory holding the serialized index artifacts.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut config = SearchConfig::from_env();
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(path) = args.export {
        config.export_path = path;
    }
    if let Some(dir) = args.cache_dir {
        config.cache_dir = dir;
    }
    let k = args.top_k.unwrap_or(config.top_k);

    let embedding_client = match config.mode {
        SearchMode::Semantic => Some(EmbeddingClient::new(EmbeddingConfig::from_env())?),
        SearchMode::Lexical => None,
    };

    let engine = SearchEngine::open_or_build(&config, embedding_client).await?;
    let results = engine.search(&args.query, k).await?;

    println!("\nQuery: {}", args.query);
    if results.is_empty() {
        println!("No results found.");
    } else {
        for hit in results {
            println!(
                "Answer: Based on message {} → \"{}\"",
                hit.message_id, hit.text
            );
        }
    }

    Ok(())
}
