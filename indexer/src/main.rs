use anyhow::{anyhow, Result};
use cinesearch_core::builder::IndexBuilder;
use cinesearch_core::evaluate::{build_ground_truth, default_scenarios, save_ground_truth, EvaluationReport, Evaluator};
use cinesearch_core::persist::IndexPaths;
use cinesearch_core::service::SearchService;
use cinesearch_core::store::{RecordStore, SledStore};
use cinesearch_core::{Field, FieldWeights, LexicalRanker, Normalizer, NormalizerConfig, SearchConfig, VectorRanker};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Import movie records, build the TF-IDF index, search and evaluate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Record store directory
    #[arg(long, env = "CINE_DB", default_value = "./data/movies.db")]
    db: PathBuf,
}

#[derive(Args)]
struct IndexArgs {
    /// Index snapshot directory
    #[arg(long, env = "CINE_INDEX", default_value = "./data/index")]
    index: PathBuf,
    /// Extra stopwords, one per line
    #[arg(long, env = "CINE_STOPWORDS")]
    stopwords: Option<PathBuf>,
    /// Multi-word units for the segmenter, one per line
    #[arg(long, env = "CINE_COMPOUNDS")]
    compounds: Option<PathBuf>,
    #[arg(long, default_value_t = 2)]
    min_word_length: usize,
    #[arg(long, default_value_t = 50)]
    max_word_length: usize,
}

impl IndexArgs {
    fn builder(&self) -> IndexBuilder {
        let config = NormalizerConfig {
            min_word_length: self.min_word_length,
            max_word_length: self.max_word_length,
            stopwords_path: self.stopwords.clone(),
            compounds_path: self.compounds.clone(),
        };
        IndexBuilder::new(Normalizer::new(&config), FieldWeights::default(), IndexPaths::new(&self.index))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RankerKind {
    Lexical,
    Vector,
}

#[derive(Subcommand)]
enum Commands {
    /// Load records from JSON/JSONL files or a directory into the store
    Import {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Build the index snapshot (reuses a valid snapshot unless --force)
    Build {
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rank by TF-IDF cosine similarity
    Query {
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Lexical search, as served to users
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Title suggestions
    Suggest {
        prefix: String,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Best rated movies
    Popular {
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Movies whose field contains a value
    ByField {
        field: String,
        value: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        store: StoreArgs,
    },
    /// Precision/recall/MAP against ground truth derived from the store
    Evaluate {
        #[arg(long)]
        k: Option<usize>,
        #[arg(long, value_enum, default_value_t = RankerKind::Lexical)]
        ranker: RankerKind,
        /// Where to write the ground truth used for the run
        #[arg(long, default_value = "./data/ground_truth.json")]
        ground_truth: PathBuf,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
        #[command(flatten)]
        store: StoreArgs,
        #[command(flatten)]
        index: IndexArgs,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Import { input, store } => import(&input, &store.db),
        Commands::Build { store, index, force } => {
            let db = SledStore::open(&store.db)?;
            let builder = index.builder();
            let built = if force { builder.rebuild(&db)? } else { builder.load_or_build(&db)?.0 };
            println!("{} documents, {} terms", built.num_docs(), built.vocabulary_len());
            Ok(())
        }
        Commands::Query { query, k, store, index } => {
            let db = SledStore::open(&store.db)?;
            let builder = index.builder();
            let (built, _) = builder.load_or_build(&db)?;
            for (doc_id, score) in built.search(builder.normalizer(), &query, k) {
                let title = db_title(&db, doc_id);
                println!("{score:.4}\t{doc_id}\t{title}");
            }
            Ok(())
        }
        Commands::Search { query, page, store } => {
            let svc = SearchService::new(SledStore::open(&store.db)?, SearchConfig::default());
            let results = svc.search(&query, page);
            println!("{} results (page {page})", results.total);
            for r in results.items {
                println!("{:.0}\t{}\t{}\t{}", r.relevance_score, r.document.id, r.document.year.unwrap_or_default(), r.document.title);
            }
            Ok(())
        }
        Commands::Suggest { prefix, limit, store } => {
            let svc = SearchService::new(SledStore::open(&store.db)?, SearchConfig::default());
            let limit = limit.unwrap_or(svc.config().suggestion_limit);
            for title in svc.suggest(&prefix, limit) {
                println!("{title}");
            }
            Ok(())
        }
        Commands::Popular { limit, store } => {
            let svc = SearchService::new(SledStore::open(&store.db)?, SearchConfig::default());
            let limit = limit.unwrap_or(svc.config().popular_limit);
            for d in svc.popular(limit) {
                println!("{:.1}\t{}\t{}", d.rating.unwrap_or_default(), d.id, d.title);
            }
            Ok(())
        }
        Commands::ByField { field, value, limit, store } => {
            let field = Field::parse(&field).ok_or_else(|| anyhow!("unknown field {field:?}"))?;
            let svc = SearchService::new(SledStore::open(&store.db)?, SearchConfig::default());
            for d in svc.by_field(field, &value, limit) {
                println!("{}\t{}", d.id, d.title);
            }
            Ok(())
        }
        Commands::Evaluate { k, ranker, ground_truth, json, store, index } => {
            let k = k.unwrap_or(SearchConfig::default().evaluation_k);
            let db = SledStore::open(&store.db)?;
            let truth = build_ground_truth(&db, &default_scenarios())?;
            if truth.is_empty() {
                return Err(anyhow!("record store has no documents matching any evaluation query; run `indexer import` first"));
            }
            save_ground_truth(&ground_truth, &truth)?;
            let report = match ranker {
                RankerKind::Lexical => Evaluator::new(LexicalRanker::new(&db), truth).evaluate(k)?,
                RankerKind::Vector => {
                    let builder = index.builder();
                    let (built, _) = builder.load_or_build(&db)?;
                    let ranker = VectorRanker::new(built, builder.normalizer().clone());
                    Evaluator::new(ranker, truth).evaluate(k)?
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
    }
}

fn import(input: &str, db: &Path) -> Result<()> {
    let input_path = Path::new(input);
    let store = SledStore::open(db)?;

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        return Err(anyhow!("input {input} does not exist"));
    }

    let mut total = 0;
    for file in files {
        let n = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            store.import_jsonl(&file)?
        } else {
            store.import_json(&file)?
        };
        tracing::info!(file = %file.display(), records = n, "imported");
        total += n;
    }
    store.flush()?;
    tracing::info!(total, stored = store.len(), "import complete");
    Ok(())
}

fn db_title(db: &SledStore, doc_id: u32) -> String {
    match db.get(doc_id) {
        Ok(Some(doc)) => doc.title,
        Ok(None) => String::new(),
        Err(e) => {
            tracing::warn!(doc_id, error = %e, "record lookup failed");
            String::new()
        }
    }
}

fn print_report(report: &EvaluationReport) {
    let rule = "=".repeat(85);
    println!("{rule}");
    println!("SEARCH EVALUATION ({} ranker, top-k = {})", report.ranker, report.k);
    println!("{rule}");
    println!("{:<20} | {:<8} | {:<8} | {:<8} | retrieved/relevant", "query", "P@k", "R@k", "AP");
    println!("{}", "-".repeat(85));
    for q in &report.queries {
        let m = &q.metrics;
        println!(
            "{:<20} | {:<8.2} | {:<8.2} | {:<8.2} | {}/{} docs",
            q.query, m.precision, m.recall, m.average_precision, m.retrieved_count, m.relevant_count
        );
    }
    println!("{}", "-".repeat(85));
    println!("mean average precision: {:.4}", report.mean_average_precision);
    println!("verdict: {}", report.verdict);
}
