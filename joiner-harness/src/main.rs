//! Join engine binary speaking the line protocol on stdin/stdout.

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use joiner::catalog::Catalog;
use joiner::config::ExecutionConfig;
use joiner::context::ExecutionContext;
use joiner_harness::dump::{dump_sql, store_relation_csv};
use joiner_harness::protocol::{load_catalog, run_batches};
use joiner_harness::stats::catalog_stats;

/// Answers join query batches over binary relation files.
#[derive(Parser, Debug)]
#[command(name = "joiner")]
#[command(version = "0.1.0")]
struct Args {
    /// YAML file with execution settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound of workers per operator and size of the query pool
    #[arg(long)]
    threads: Option<usize>,

    /// Print column statistics to stderr after loading
    #[arg(long)]
    stats: bool,

    /// Write `.tbl` and `.sql` dumps of every loaded relation into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<ExecutionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            serde_yaml::from_reader(file)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        }
        None => ExecutionConfig::default(),
    };
    if let Some(threads) = args.threads {
        config.join.max_workers = threads;
        config.self_join.max_workers = threads;
        config.filter_scan.max_workers = threads;
        config.batch_workers = Some(threads);
    }
    Ok(config)
}

fn dump_catalog(catalog: &Catalog, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create dump directory: {:?}", dir))?;
    for (relation_id, relation) in catalog.relations().iter().enumerate() {
        let path = dir.join(format!("r{}", relation_id));
        store_relation_csv(relation, &path)
            .and_then(|_| dump_sql(relation, &path, relation_id))
            .with_context(|| format!("Failed to dump relation {}", relation_id))?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let catalog = load_catalog(&mut input, config.histogram_buckets)?;
    if args.stats {
        eprintln!("{}", catalog_stats(&catalog));
    }
    if let Some(dir) = &args.dump_dir {
        dump_catalog(&catalog, dir)?;
    }

    let context = Arc::new(ExecutionContext::new(Arc::new(catalog), config));
    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    run_batches(input, &mut output, context)
}
