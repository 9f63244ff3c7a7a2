use citenet::analyzer::Analyzer;
use citenet::community::AnalysisExport;
use citenet::config::{load_config, Config};
use citenet::graph::SeedPolicy;
use citenet::logger::{self, StdoutLogger};
use citenet::stability::{analyze_stability, load_name_map};
use citenet::store::{load_database, JsonFileStore, RecordStore};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "citenet")]
#[command(about = "Citation network community analysis engine", long_about = None)]
struct Cli {
    /// Directory holding the exported store collections (overrides config)
    #[arg(long)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full community analysis
    Analyze {
        /// Explicit partition seed (reproducible run)
        #[arg(long, conflicts_with = "randomize")]
        seed: Option<u64>,
        /// Randomize the partition; the drawn seed is reported
        #[arg(long)]
        randomize: bool,
        /// Write the structured JSON export to this path
        #[arg(long)]
        json_output: Option<PathBuf>,
        /// Also write author/community graph CSV files with this prefix
        #[arg(long)]
        export_graph: Option<String>,
    },
    /// Print database statistics without partitioning
    Stats,
    /// Maintenance sweep: report duplicate articles and dangling references
    Dedupe,
    /// Cross-run stability analysis over exported JSON files
    Stability {
        /// The curated "community name,canonical index" CSV map
        #[arg(long)]
        name_map: PathBuf,
        /// Exported analysis runs (two or more)
        #[arg(required = true, num_args = 2..)]
        runs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init_logger(StdoutLogger);

    let cli = Cli::parse();

    let mut config = load_config().unwrap_or_else(|err| {
        logger::warn(&format!("config.json not loaded ({}); using defaults", err));
        Config::default()
    });
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }

    match cli.command {
        Commands::Analyze {
            seed,
            randomize,
            json_output,
            export_graph,
        } => {
            let seed_policy = match (seed, randomize) {
                (Some(seed), _) => SeedPolicy::Seed(seed),
                (None, true) => SeedPolicy::Random,
                (None, false) => SeedPolicy::Default,
            };
            let analyzer = initialize_with_interrupt(config, seed_policy).await?;
            analyzer.report();
            if let Some(path) = json_output {
                let export = analyzer.export();
                export.write_to(&path)?;
                logger::info(&format!("Wrote analysis export to {}", path.display()));
            }
            if let Some(prefix) = export_graph {
                analyzer.export_graph_csv(&prefix)?;
                logger::info(&format!("Wrote graph CSV files with prefix '{}'", prefix));
            }
        }
        Commands::Stats => {
            let analyzer = initialize_with_interrupt(config, SeedPolicy::Default).await?;
            let stats = analyzer.global_statistics();
            logger::info(&format!(
                "{} articles, {} authors, {} keywords, {} citation links",
                stats.articles, stats.authors, stats.keywords, stats.citation_links
            ));
            for (year, count) in &stats.annual_counts {
                logger::info(&format!("{}: {} articles", year, count));
            }
            for (name, articles) in &stats.top_authors_by_articles {
                logger::info(&format!("{}: {} articles", name, articles));
            }
        }
        Commands::Dedupe => {
            let store: Arc<dyn RecordStore> =
                Arc::new(JsonFileStore::new(config.store.data_dir.clone()));
            let mut db = load_database(store, &config).await?;
            db.update_author_article_records();
            db.update_article_citation_records();
            let merges = db.identify_description_duplicates();
            db.prune_dangling_references();
            logger::info(&format!(
                "Dedupe sweep merged {} duplicate article(s); {} articles remain",
                merges,
                db.articles.len()
            ));
        }
        Commands::Stability { name_map, runs } => {
            let map = load_name_map(&name_map)?;
            let mut exports = Vec::with_capacity(runs.len());
            for path in &runs {
                exports.push(AnalysisExport::read_from(path)?);
            }
            let report = analyze_stability(&exports, &map);
            for (community, mean) in report.per_community.iter().enumerate() {
                logger::info(&format!(
                    "Community #{} intersection/union = {:.4}",
                    community, mean
                ));
            }
            logger::info(&format!(
                "Maximum modularity {:.4} on run(s) {:?} of {}",
                report.max_modularity, report.best_runs, report.run_count
            ));
        }
    }

    Ok(())
}

/// Runs the load-and-analyze pipeline while listening for Ctrl-C. The loader
/// is the only interruptible stage: on interrupt the user decides whether to
/// abandon the run or let it continue. A partition in flight always runs to
/// completion.
async fn initialize_with_interrupt(
    config: Config,
    seed_policy: SeedPolicy,
) -> Result<Analyzer, Box<dyn std::error::Error>> {
    let store: Arc<dyn RecordStore> = Arc::new(JsonFileStore::new(config.store.data_dir.clone()));
    let initialize = Analyzer::initialize(store, config, seed_policy);
    tokio::pin!(initialize);
    loop {
        tokio::select! {
            result = &mut initialize => return Ok(result?),
            _ = tokio::signal::ctrl_c() => {
                if confirm("Interrupt received. Abandon the analysis? [y/n] ")? {
                    logger::info("Analysis abandoned before completion.");
                    std::process::exit(130);
                }
                logger::info("Continuing.");
            }
        }
    }
}

fn confirm(prompt: &str) -> Result<bool, std::io::Error> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
