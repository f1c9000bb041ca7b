use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use minisearch_core::loader::{corpus_stats, load_dataset, Dataset};
use minisearch_core::persist::{save_ranks, try_load_ranks, DataPaths, MetaFile};
use minisearch_core::rank::{RankParams, RankVector, Strategy, DEFAULT_DAMPING, DEFAULT_ITERATIONS};
use minisearch_core::retrieval::{SearchOptions, SearchResult, DEFAULT_ALPHA};
use minisearch_core::store::{CorpusSink, GraphSource, SledStore};
use minisearch_core::SearchEngine;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Load a corpus, rank it by links, build the term index and query it", long_about = None)]
struct Cli {
    /// Data directory holding the database and the last rank vector
    #[arg(long, global = true, default_value = "./data")]
    data: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum RankChoice {
    Batch,
    Step,
    /// Run both strategies, report their deviation, keep the batch result
    Both,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeChoice {
    Intersect,
    Union,
    /// Run both modes and compare them
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset JSON file (article key -> {url, title, content, links})
    Load {
        #[arg(long)]
        input: String,
        /// Keep existing documents instead of clearing the corpus first
        #[arg(long, default_value_t = false)]
        append: bool,
    },
    /// Print document/link counts and the most linked documents
    Stats {
        #[arg(long, default_value_t = 5)]
        top: usize,
    },
    /// Compute authority scores and store them next to the database
    Rank {
        #[arg(long, value_enum, default_value_t = RankChoice::Batch)]
        strategy: RankChoice,
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,
        #[arg(long, default_value_t = DEFAULT_DAMPING)]
        damping: f64,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Rebuild the inverted index from the stored documents
    Build,
    /// Query the index
    Search {
        #[arg(long)]
        query: String,
        #[arg(long, value_enum, default_value_t = ModeChoice::Both)]
        mode: ModeChoice,
        #[arg(long, default_value_t = DEFAULT_ALPHA)]
        alpha: f64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Ignore the stored rank vector
        #[arg(long, default_value_t = false)]
        no_authority: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = DataPaths::new(&cli.data);
    let store = Arc::new(SledStore::open(paths.db())?);
    let engine = SearchEngine::new(store.clone());

    match cli.command {
        Commands::Load { input, append } => {
            let dataset = Dataset::from_path(&input)?;
            if !append {
                store.clear_corpus()?;
            }
            let report = load_dataset(store.as_ref(), &dataset)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Stats { top } => {
            let stats = corpus_stats(store.as_ref(), top)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Rank { strategy, iterations, damping, top } => {
            let params = RankParams::new(iterations, damping)?;
            let (ranks, used) = match strategy {
                RankChoice::Batch => (engine.compute_rank_batch(params)?, Strategy::Batch),
                RankChoice::Step => (engine.compute_rank_step(params)?, Strategy::Step),
                RankChoice::Both => {
                    let batch = engine.compute_rank_batch(params)?;
                    let step = engine.compute_rank_step(params)?;
                    println!("max deviation between strategies: {:.3e}", batch.max_deviation(&step));
                    (batch, Strategy::Batch)
                }
            };
            if ranks.is_empty() {
                println!("no documents; load a dataset first");
                return Ok(());
            }
            save_ranks(&paths, &ranks, &MetaFile::new(ranks.len() as u32, used, params))?;
            print_top_ranks(&engine, &ranks, top)?;
        }
        Commands::Build => {
            let report = engine.build_index()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Search { query, mode, alpha, limit, no_authority } => {
            let authority = if no_authority { None } else { try_load_ranks(&paths)? };
            if authority.is_some() {
                tracing::info!(alpha, "blending stored authority scores");
            }
            let opts = SearchOptions { alpha, limit: None };
            opts.validate()?;
            let authority = authority.as_ref();
            match mode {
                ModeChoice::Intersect => {
                    let r = engine.search_intersect(&query, authority, opts)?;
                    print_results(&engine, "intersect", &query, &r, limit)?;
                }
                ModeChoice::Union => {
                    let r = engine.search_union(&query, authority, opts)?;
                    print_results(&engine, "union", &query, &r, limit)?;
                }
                ModeChoice::Both => {
                    let and = engine.search_intersect(&query, authority, opts)?;
                    let or = engine.search_union(&query, authority, opts)?;
                    print_results(&engine, "intersect", &query, &and, limit)?;
                    print_results(&engine, "union", &query, &or, limit)?;
                    println!(
                        "intersect: {} documents, union: {} documents, shared in top 5: {}",
                        and.len(),
                        or.len(),
                        and.top_overlap(&or, 5)
                    );
                }
            }
        }
    }

    store.flush()?;
    Ok(())
}

fn print_top_ranks(engine: &SearchEngine, ranks: &RankVector, top: usize) -> Result<()> {
    for (i, (doc_id, score)) in ranks.ranked().into_iter().take(top).enumerate() {
        match engine.store().fetch_document(doc_id)? {
            Some(doc) => println!("{:2}. [{score:.6}] {}", i + 1, doc.title),
            None => println!("{:2}. [{score:.6}] doc_id={doc_id}", i + 1),
        }
    }
    Ok(())
}

fn print_results(engine: &SearchEngine, label: &str, query: &str, result: &SearchResult, limit: usize) -> Result<()> {
    println!("{label}: {} documents", result.len());
    for hit in engine.hydrate(result, query, limit)? {
        println!("[{:.2}] {} ({})", hit.score, hit.title, hit.url.unwrap_or_default());
    }
    Ok(())
}
