//! FIRMS CLI — fuzzy information retrieval for musical scores.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use firms_engine::corpus::{CORPUS_ROOT_ENV, KNOWN_COMPOSERS, composer_paths, corpus_paths};
use firms_engine::evaluate::{EvalConfig, run as run_evaluation};
use firms_engine::{Engine, QueryInput};
use firms_notation::NotationRegistry;
use firms_store::{IndexStore, SqliteStore};

mod output;

/// FIRMS: Fuzzy Information Retrieval for Musical Scores
///
/// Index symbolic scores and rank them against short melodic queries.
#[derive(Parser, Debug)]
#[command(name = "firms")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the index database.
    #[arg(long, global = true, default_value = "./firms.sqlite.db")]
    path: PathBuf,

    /// Verbose logging (repeat for more detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wipe and (re)create the index database.
    Create,

    /// Ingest pieces into the index.
    #[command(subcommand)]
    Add(AddCommand),

    /// Rank indexed pieces against a query.
    #[command(subcommand)]
    Query(QueryCommand),

    /// Inspect the index.
    #[command(subcommand)]
    Info(InfoCommand),

    /// Print the known composer tags.
    Composers,

    /// Run the synthetic-error evaluation harness.
    Evaluate(EvaluateArgs),

    /// Re-parse and display indexed pieces whose path contains a substring.
    Show {
        #[arg(long)]
        piece_path: String,
    },
}

#[derive(Subcommand, Debug)]
enum AddCommand {
    /// Ingest a single score file.
    Piece {
        #[arg(long)]
        piecepath: PathBuf,
        /// Unroll repeat barlines into played order (best-effort).
        #[arg(long)]
        explicit_repeats: bool,
    },
    /// Ingest every score of one composer from the corpus tree.
    Composer {
        #[arg(long)]
        composer: String,
        /// Restrict to one file extension.
        #[arg(long)]
        filetype: Option<String>,
        /// Corpus root (defaults to $FIRMS_CORPUS, then ./corpus).
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Ingest the full enumerated corpus, skipping unreadable files.
    Corpus {
        /// Corpus root (defaults to $FIRMS_CORPUS, then ./corpus).
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Query with terse textual notation.
    Tiny {
        #[arg(long)]
        query: String,
        /// Also write the full result set as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Query with a score file.
    Piece {
        #[arg(long)]
        file: PathBuf,
        /// Also write the full result set as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum InfoCommand {
    /// Row counts per relation.
    General,
    /// List indexed pieces.
    Pieces,
    /// One piece and its parts.
    Piece {
        #[arg(long)]
        id: i64,
    },
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Number of samples.
    #[arg(long, default_value_t = 10)]
    n: usize,

    /// Probability that a sample receives one synthetic error.
    #[arg(long, default_value_t = 0.0)]
    erate: f64,

    /// Minimum measures per sampled fragment.
    #[arg(long, default_value_t = 3)]
    minsize: u32,

    /// Maximum measures per sampled fragment.
    #[arg(long, default_value_t = 7)]
    maxsize: u32,

    /// Relative weight of the add-note error.
    #[arg(long = "add_note_error", default_value_t = 1.0)]
    add_note_error: f64,

    /// Relative weight of the remove-note error.
    #[arg(long = "remove_note_error", default_value_t = 1.0)]
    remove_note_error: f64,

    /// Relative weight of the replace-note error.
    #[arg(long = "replace_note_error", default_value_t = 1.0)]
    replace_note_error: f64,

    /// Relative weight of the transposition error.
    #[arg(long = "transposition_error", default_value_t = 1.0)]
    transposition_error: f64,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Also write the full report as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

/// All compiled-in score readers.
fn build_registry() -> NotationRegistry {
    let mut registry = NotationRegistry::new();
    registry.register(Box::new(firms_tiny::TinyFormat));
    registry.register(Box::new(firms_musicxml::MusicXmlFormat));
    registry.register(Box::new(firms_midi::MidiFormat));
    registry
}

fn corpus_root(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CORPUS_ROOT_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./corpus"))
}

fn open_engine(path: &Path) -> Result<Engine<SqliteStore>> {
    let store = SqliteStore::open(path)
        .with_context(|| format!("Failed to open index at {}", path.display()))?;
    Ok(Engine::new(store, build_registry()))
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write output file {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Command::Create => {
            SqliteStore::create(&cli.path)
                .with_context(|| format!("Failed to create index at {}", cli.path.display()))?;
            println!("Created index at {}", cli.path.display());
        }

        Command::Add(add) => run_add(&cli.path, add)?,

        Command::Query(query) => run_query(&cli.path, query)?,

        Command::Info(info) => run_info(&cli.path, info)?,

        Command::Composers => {
            for composer in KNOWN_COMPOSERS {
                println!("{composer}");
            }
        }

        Command::Evaluate(args) => run_evaluate(&cli.path, args)?,

        Command::Show { piece_path } => run_show(&cli.path, &piece_path)?,
    }
    Ok(())
}

fn run_add(db_path: &Path, command: AddCommand) -> Result<()> {
    let mut engine = open_engine(db_path)?;
    match command {
        AddCommand::Piece {
            piecepath,
            explicit_repeats,
        } => {
            let id = engine
                .add_piece_file(&piecepath, explicit_repeats)
                .with_context(|| format!("Failed to ingest {}", piecepath.display()))?;
            println!("Added {} as piece {id}", piecepath.display());
        }
        AddCommand::Composer {
            composer,
            filetype,
            corpus,
        } => {
            let root = corpus_root(corpus);
            let extensions = engine.notation().known_extensions();
            let paths = composer_paths(&root, &composer, filetype.as_deref(), &extensions);
            if paths.is_empty() {
                bail!(
                    "No scores for composer '{composer}' under {}",
                    root.display()
                );
            }
            ingest_with_progress(&mut engine, &paths)?;
        }
        AddCommand::Corpus { corpus } => {
            let root = corpus_root(corpus);
            let extensions = engine.notation().known_extensions();
            let paths = corpus_paths(&root, &extensions);
            if paths.is_empty() {
                bail!("No scores found under {}", root.display());
            }
            ingest_with_progress(&mut engine, &paths)?;
        }
    }
    Ok(())
}

fn ingest_with_progress(engine: &mut Engine<SqliteStore>, paths: &[PathBuf]) -> Result<()> {
    let bar = ProgressBar::new(paths.len() as u64);
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {msg}",
    )?);
    let report = engine.add_piece_files(paths, false, |path, _ok| {
        bar.set_message(
            path.file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        bar.inc(1);
    });
    bar.finish_and_clear();
    println!(
        "Ingested {} pieces ({} skipped)",
        report.ingested, report.skipped
    );
    Ok(())
}

fn run_query(db_path: &Path, command: QueryCommand) -> Result<()> {
    let mut engine = open_engine(db_path)?;
    let (input, output) = match command {
        QueryCommand::Tiny { query, output } => (QueryInput::Tiny(query), output),
        QueryCommand::Piece { file, output } => {
            let score = engine
                .notation()
                .read_path(&file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            (QueryInput::Score(score), output)
        }
    };
    let grades = engine.query(input).context("Query failed")?;
    print!("{}", output::render_grades(engine.store(), &grades)?);
    if let Some(path) = output {
        write_json(&path, &grades)?;
        println!("Full results written to {}", path.display());
    }
    Ok(())
}

fn run_info(db_path: &Path, command: InfoCommand) -> Result<()> {
    let engine = open_engine(db_path)?;
    let store = engine.store();
    match command {
        InfoCommand::General => {
            let stats = store.stats()?;
            let rows = vec![
                vec!["pieces".to_string(), stats.pieces.to_string()],
                vec!["parts".to_string(), stats.parts.to_string()],
                vec!["snippets".to_string(), stats.snippets.to_string()],
                vec!["stemmers".to_string(), stats.stemmers.to_string()],
                vec!["stems".to_string(), stats.stems.to_string()],
                vec!["entries".to_string(), stats.entries.to_string()],
            ];
            print!("{}", output::render_table(&["Relation", "Rows"], &rows));
        }
        InfoCommand::Pieces => {
            let rows: Vec<Vec<String>> = store
                .pieces()?
                .into_iter()
                .map(|p| vec![p.id.to_string(), p.name, p.path])
                .collect();
            print!("{}", output::render_table(&["Id", "Name", "Path"], &rows));
        }
        InfoCommand::Piece { id } => {
            let Some(piece) = store.piece(id)? else {
                bail!("No piece with id {id}");
            };
            println!("{} — {} ({})", piece.id, piece.name, piece.path);
            let rows: Vec<Vec<String>> = store
                .parts_of(id)?
                .into_iter()
                .map(|p| vec![p.id.to_string(), p.name])
                .collect();
            print!("{}", output::render_table(&["Part Id", "Name"], &rows));
        }
    }
    Ok(())
}

fn run_evaluate(db_path: &Path, args: EvaluateArgs) -> Result<()> {
    let mut engine = open_engine(db_path)?;
    let config = EvalConfig {
        n: args.n,
        seed: args.seed,
        error_rate: args.erate,
        min_measures: args.minsize,
        max_measures: args.maxsize,
        add_note_weight: args.add_note_error,
        remove_note_weight: args.remove_note_error,
        replace_note_weight: args.replace_note_error,
        transposition_weight: args.transposition_error,
    };
    let report = run_evaluation(&mut engine, &config).context("Evaluation failed")?;

    let rows: Vec<Vec<String>> = report
        .summary
        .iter()
        .map(|(grader, summary)| {
            vec![
                grader.clone(),
                format!("{:.3}", summary.mean),
                format!("{:.3}", summary.variance),
                format!("{}/{}", summary.ranked, summary.total),
            ]
        })
        .collect();
    print!(
        "{}",
        output::render_table(&["Grader", "Mean Rank", "Variance", "Ranked"], &rows)
    );
    if let Some(path) = args.output {
        write_json(&path, &report)?;
        println!("Full report written to {}", path.display());
    }
    Ok(())
}

fn run_show(db_path: &Path, needle: &str) -> Result<()> {
    let engine = open_engine(db_path)?;
    let paths = engine.store().paths_matching(needle)?;
    if paths.is_empty() {
        bail!("No indexed piece path contains '{needle}'");
    }
    for path in paths {
        let score = engine
            .notation()
            .read_path(Path::new(&path))
            .with_context(|| format!("Failed to re-parse {path}"))?;
        println!("{} — {}", path, score.display_title());
        for (index, part) in score.parts.iter().enumerate() {
            let head = firms_model::Snippet::new(
                &part.events[..part.events.len().min(16)],
                0,
            );
            println!(
                "  {} ({} events): {}",
                part.display_name(index),
                part.events.len(),
                head.describe()
            );
        }
    }
    Ok(())
}
