use rayon::prelude::*;

/// Keeps the rows in `0..num_rows` for which `keep` holds.
///
/// The rows are cut into `workers` contiguous ranges, each filtered by its own worker. The
/// returned lists are in range order, so concatenating them yields the kept rows in their
/// original order.
pub fn filter_rows<F>(num_rows: usize, workers: usize, keep: F) -> Vec<Vec<usize>>
where
    F: Fn(usize) -> bool + Sync + Send,
{
    if workers <= 1 || num_rows <= 1 {
        return vec![(0..num_rows).filter(|row| keep(*row)).collect()];
    }

    let range_size = (num_rows + workers - 1) / workers;
    (0..workers)
        .into_par_iter()
        .map(|worker| {
            let start = (worker * range_size).min(num_rows);
            let end = (start + range_size).min(num_rows);
            (start..end).filter(|row| keep(*row)).collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use crate::parallel::filter_rows;

    #[test]
    fn test_filter_rows() {
        let values = (0..103u64).collect_vec();
        let expected = values
            .iter()
            .positions(|v| v % 3 == 0)
            .collect_vec();

        for workers in [1, 2, 8, 200] {
            let kept = filter_rows(values.len(), workers, |row| values[row] % 3 == 0);
            assert_eq!(expected, kept.concat(), "workers: {}", workers);
        }
    }

    #[test]
    fn test_filter_no_rows() {
        assert_eq!(vec![Vec::<usize>::new()], filter_rows(0, 4, |_| true));
    }
}
