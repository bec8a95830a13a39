//! Binary relation files: a little endian `u64` row count and `u64` column count, followed by
//! every column as `rows` little endian `u64` values.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

use joiner::catalog::Relation;
use joiner::error::{JoinerError, JoinerResult};

const HEADER_SIZE: usize = 16;

pub fn load_relation<P: AsRef<Path>>(path: P, histogram_buckets: usize) -> JoinerResult<Relation> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let relation = parse_relation(&bytes, &path.display().to_string(), histogram_buckets)?;
    info!(
        "Loaded relation {} with {} rows and {} columns",
        path.display(),
        relation.size(),
        relation.num_columns()
    );
    Ok(relation)
}

/// Decodes a relation from the bytes of a relation file, `path` is only used in errors.
pub fn parse_relation(bytes: &[u8], path: &str, histogram_buckets: usize) -> JoinerResult<Relation> {
    let malformed = |reason: String| JoinerError::MalformedRelationFile {
        path: path.to_string(),
        reason,
    };
    if bytes.len() < HEADER_SIZE {
        return Err(malformed(format!(
            "file has {} bytes, header needs {}",
            bytes.len(),
            HEADER_SIZE
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let rows = cursor.read_u64::<LittleEndian>()?;
    let columns = cursor.read_u64::<LittleEndian>()?;
    let expected = rows
        .checked_mul(columns)
        .and_then(|values| values.checked_mul(8))
        .and_then(|len| len.checked_add(HEADER_SIZE as u64))
        .ok_or_else(|| malformed(format!("{} rows x {} columns overflows", rows, columns)))?;
    if (bytes.len() as u64) < expected {
        return Err(malformed(format!(
            "{} rows x {} columns need {} bytes, file has {}",
            rows,
            columns,
            expected,
            bytes.len()
        )));
    }

    let data = (0..columns)
        .map(|_| {
            let mut column = vec![0u64; rows as usize];
            cursor.read_u64_into::<LittleEndian>(&mut column)?;
            Ok(column)
        })
        .collect::<JoinerResult<Vec<_>>>()?;
    Relation::new(data, histogram_buckets)
}

/// Writes `relation` in the binary relation format.
pub fn store_relation<P: AsRef<Path>>(relation: &Relation, path: P) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    out.write_u64::<LittleEndian>(relation.size() as u64)?;
    out.write_u64::<LittleEndian>(relation.num_columns() as u64)?;
    for column in relation.columns() {
        for value in column {
            out.write_u64::<LittleEndian>(*value)?;
        }
    }
    out.flush()
}
