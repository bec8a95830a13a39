//! Text dumps of relations for loading them into another database.

use itertools::Itertools;
use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use joiner::catalog::{Relation, RelationId};

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Writes `<path>.tbl`, one row per line with every value followed by `|`.
pub fn store_relation_csv<P: AsRef<Path>>(relation: &Relation, path: P) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(with_suffix(path.as_ref(), ".tbl"))?);
    for row in 0..relation.size() {
        for column in relation.columns() {
            write!(out, "{}|", column[row])?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// Writes `<path>.sql` creating table `r<relation_id>` and loading it from `r<relation_id>.tbl`.
pub fn dump_sql<P: AsRef<Path>>(
    relation: &Relation,
    path: P,
    relation_id: RelationId,
) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(with_suffix(path.as_ref(), ".sql"))?);
    writeln!(
        out,
        "CREATE TABLE r{} ({});",
        relation_id,
        (0..relation.num_columns())
            .map(|c| format!("c{} bigint", c))
            .join(",")
    )?;
    writeln!(
        out,
        "copy r{} from 'r{}.tbl' delimiter '|';",
        relation_id, relation_id
    )?;
    out.flush()
}
