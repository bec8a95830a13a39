use prettytable::{row, Table};

use joiner::catalog::Catalog;

/// One row per column of every relation, summarizing its histogram.
pub fn catalog_stats(catalog: &Catalog) -> Table {
    let mut table = Table::new();
    table.add_row(row![
        "Relation", "Column", "Rows", "Min", "Max", "Bucket Width", "Fullest Bucket"
    ]);
    for (relation_id, relation) in catalog.relations().iter().enumerate() {
        for (column_id, histogram) in relation.histograms().iter().enumerate() {
            table.add_row(row![
                relation_id,
                column_id,
                histogram.n_tups(),
                histogram.min_val(),
                histogram.max_val(),
                histogram.bucket_width(),
                histogram.buckets().iter().max().copied().unwrap_or_default()
            ]);
        }
    }
    table
}
