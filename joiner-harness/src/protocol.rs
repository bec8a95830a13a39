//! Line protocol on top of the engine.
//!
//! Input starts with relation file paths, one per line, terminated by `Done`. Every following
//! line is a query, or `F` closing the current batch. On `F` the answers of the batch are written
//! in submission order, one line per query.

use anyhow::Context;
use log::{error, info, warn};
use std::io::{BufRead, Write};
use std::sync::Arc;

use joiner::catalog::Catalog;
use joiner::context::ExecutionContext;
use joiner::error::JoinerResult;
use joiner::operator::QueryOutput;
use joiner::scheduler::BatchScheduler;

use crate::loader::load_relation;
use crate::parser::parse_query;

pub const END_OF_RELATIONS: &str = "Done";
pub const END_OF_BATCH: &str = "F";

/// Loads every relation listed before `Done`.
pub fn load_catalog<R: BufRead>(input: &mut R, histogram_buckets: usize) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::new();
    for line in input.lines() {
        let line = line.context("Failed to read relation path")?;
        let path = line.trim();
        if path == END_OF_RELATIONS {
            break;
        }
        if path.is_empty() {
            continue;
        }
        let relation = load_relation(path, histogram_buckets)
            .with_context(|| format!("Failed to load relation from {}", path))?;
        catalog.add_relation(relation);
    }
    info!("Loaded {} relations", catalog.len());
    Ok(catalog)
}

/// Answers query batches until the input ends.
pub fn run_batches<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    context: Arc<ExecutionContext>,
) -> anyhow::Result<()> {
    let mut scheduler = BatchScheduler::new(context).context("Failed to start query workers")?;
    for line in input.lines() {
        let line = line.context("Failed to read query")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == END_OF_BATCH {
            for (idx, result) in scheduler.flush().into_iter().enumerate() {
                write_result(output, idx, result)?;
            }
            output.flush()?;
            continue;
        }

        match parse_query(line) {
            Ok(query) => scheduler.submit(query),
            Err(e) => scheduler.reject(e),
        };
    }

    if scheduler.pending() > 0 {
        let dropped = scheduler.flush().len();
        warn!(
            "Input ended without {}, dropped {} queries",
            END_OF_BATCH, dropped
        );
    }
    Ok(())
}

/// Full protocol: relations, then batches.
pub fn run_protocol<R: BufRead, W: Write>(
    mut input: R,
    output: &mut W,
    context: ExecutionContext,
) -> anyhow::Result<()> {
    let catalog = load_catalog(&mut input, context.config.histogram_buckets)?;
    let context = ExecutionContext::new(Arc::new(catalog), context.config);
    run_batches(input, output, Arc::new(context))
}

fn write_result<W: Write>(
    output: &mut W,
    idx: usize,
    result: JoinerResult<QueryOutput>,
) -> std::io::Result<()> {
    match result {
        Ok(answer) => writeln!(output, "{}", answer),
        Err(e) => {
            error!("Query {} of batch failed: {}", idx, e);
            writeln!(output)
        }
    }
}
