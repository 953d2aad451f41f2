use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use bloomset_core::{
    snapshot::{read_snapshot, write_snapshot},
    utils::key_lines,
    Filter, FilterKind, Membership,
};

mod trial;

#[derive(Parser)]
#[command(name = "bf", about = "Bloom filter build / query driver")]
struct Cli {
    /// Default log level debug instead of info (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(ValueEnum, Clone, Copy)]
enum CliFilterKind {
    Basic,
    Blocked,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a filter from a key file and write its snapshot
    Build {
        /// Key file, one key per line
        #[arg(short = 'k', long = "keys")]
        keys: PathBuf,
        /// Target false-positive rate, in (0, 1)
        #[arg(short = 'f', long = "fpr")]
        fpr: f64,
        /// Expected number of distinct keys
        #[arg(short = 'n', long = "count")]
        n: u64,
        #[arg(short = 'o', long = "out", default_value = "bf.out")]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = CliFilterKind::Blocked)]
        kind: CliFilterKind,
        /// Seed for hash-seed generation; random when omitted
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print `<query>:<Y|N>` for every line of a query file
    Query {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        #[arg(short = 'q', long = "queries")]
        queries: PathBuf,
    },

    /// Describe a snapshot as JSON
    Info {
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
    },

    /// Randomized basic vs blocked trials, CSV on stdout
    Trial {
        #[arg(long, default_value_t = 20)]
        trials: usize,
        #[arg(long, default_value_t = 1000)]
        min_n: usize,
        #[arg(long, default_value_t = 20_000)]
        max_n: usize,
        #[arg(long, default_value_t = 0.01)]
        min_fpr: f64,
        #[arg(long, default_value_t = 0.25)]
        max_fpr: f64,
        /// Unseen keys probed per trial
        #[arg(long, default_value_t = 20_000)]
        queries: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries query answers and CSV
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    }
}

fn open_lines(path: &Path, what: &str) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("cannot open {what} {}", path.display()))?;
    Ok(BufReader::new(f))
}

fn load(path: &Path) -> Result<Filter> {
    read_snapshot(path).with_context(|| format!("cannot load snapshot {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Cmd::Build { keys, fpr, n, out, kind, seed } => {
            let kind = match kind {
                CliFilterKind::Basic => FilterKind::Basic,
                CliFilterKind::Blocked => FilterKind::Blocked,
            };
            let mut rng = seeded_rng(seed);
            let mut filter = Filter::build(kind, n, fpr, &mut rng)
                .with_context(|| format!("cannot size a filter for n={n}, fpr={fpr}"))?;

            let mut inserted = 0u64;
            for key in key_lines(open_lines(&keys, "key file")?) {
                let key = key.with_context(|| format!("reading {}", keys.display()))?;
                filter.insert(&key);
                inserted += 1;
            }
            if inserted > n {
                tracing::warn!(inserted, n, "more keys than the filter was sized for");
            }

            write_snapshot(&out, &filter)
                .with_context(|| format!("cannot write snapshot {}", out.display()))?;
            tracing::info!(
                kind = %filter.kind(),
                k = filter.k(),
                bits = filter.total_bits(),
                inserted,
                out = %out.display(),
                "build: snapshot written"
            );
        }
        Cmd::Query { input, queries } => {
            let filter = load(&input)?;
            let stdout = std::io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            let mut hits = 0u64;
            let mut total = 0u64;
            for q in key_lines(open_lines(&queries, "query file")?) {
                let q = q.with_context(|| format!("reading {}", queries.display()))?;
                let found = filter.query(&q);
                w.write_all(&q)?;
                w.write_all(if found { b":Y\n" } else { b":N\n" })?;
                hits += found as u64;
                total += 1;
            }
            w.flush()?;
            tracing::debug!(total, hits, "query: done");
        }
        Cmd::Info { input } => {
            let filter = load(&input)?;
            println!("{}", serde_json::to_string_pretty(&filter.info())?);
        }
        Cmd::Trial { trials, min_n, max_n, min_fpr, max_fpr, queries, seed } => {
            let cfg = trial::TrialConfig { trials, min_n, max_n, min_fpr, max_fpr, queries };
            let mut rng = seeded_rng(seed);
            let stdout = std::io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            trial::run(&cfg, &mut rng, &mut w)?;
            w.flush()?;
        }
    }
    Ok(())
}
