//! Trial-order randomization: balanced Latin squares and order files.
//!
//! A randomized page group is presented to each participant in a
//! counterbalanced order. Orders come from one of two sources:
//!
//! - [`balanced_latin_square`]: a deterministic combinatorial construction,
//!   cached per size for the process lifetime;
//! - [`order_from_file`]: externally authored orders, one comma-separated
//!   permutation per line, validated strictly at session start.
//!
//! A corrupted trial order threatens the validity of the whole study, so
//! order-file problems are fatal before any page is shown.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use thiserror::Error;

/// One presentation order: a permutation of `1..=n`.
pub type OrderRow = Vec<u32>;

/// The full set of counterbalanced orders for one group size.
pub type OrderSet = Vec<OrderRow>;

/// Errors raised while loading an externally authored order file.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The file could not be read at all.
    #[error("failed to read order file '{path}': {source}")]
    Io {
        /// Path as configured.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file content does not form a consistent set of permutations.
    #[error("invalid order file '{path}': {reason}")]
    InvalidOrderFile {
        /// Path as configured.
        path: String,
        /// What exactly was wrong, for the experimenter.
        reason: String,
    },
}

/// Process-lifetime cache of computed squares, keyed by size.
static SQUARE_CACHE: OnceLock<Mutex<HashMap<usize, Arc<OrderSet>>>> = OnceLock::new();

fn square_cache() -> &'static Mutex<HashMap<usize, Arc<OrderSet>>> {
    SQUARE_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Computes the balanced Latin square set for group size `n`.
///
/// Row `i`, column `j` (0-based) is
/// `((if j is even { n - j/2 } else { j/2 + 1 }) + i) % n + 1` with floor
/// division. For odd `n` every row is appended again reversed, doubling the
/// row count so first-order carry-over stays balanced. Downstream
/// participant indexing depends on this exact row ordering and count, so the
/// construction must not be swapped for a different balanced design.
///
/// Results are cached per `n` for the process lifetime.
///
/// # Panics
///
/// Group sizes below 2 have nothing to counterbalance and are a
/// programming error.
#[must_use]
pub fn balanced_latin_square(n: usize) -> Arc<OrderSet> {
    assert!(n >= 2, "a randomized group needs at least two members");

    if let Some(cached) = square_cache().lock().get(&n) {
        return Arc::clone(cached);
    }

    let mut rows: OrderSet = Vec::with_capacity(if n % 2 == 0 { n } else { 2 * n });
    for i in 0..n {
        let mut row = Vec::with_capacity(n);
        for j in 0..n {
            let base = if j % 2 == 0 { n - j / 2 } else { j / 2 + 1 };
            row.push(((base + i) % n + 1) as u32);
        }
        rows.push(row);
    }

    if n % 2 != 0 {
        let mirrored: Vec<OrderRow> = rows
            .iter()
            .map(|row| row.iter().rev().copied().collect())
            .collect();
        rows.extend(mirrored);
    }

    let rows = Arc::new(rows);
    square_cache().lock().insert(n, Arc::clone(&rows));
    rows
}

/// Loads a set of orders from a plain-text file.
///
/// One order per line, comma-separated 1-based integers. Every line must
/// have the same length (> 1) and be a permutation of the same integer set.
///
/// # Errors
///
/// [`OrderError::Io`] when the file is unreadable,
/// [`OrderError::InvalidOrderFile`] on any structural problem.
pub fn order_from_file(path: impl AsRef<Path>) -> Result<OrderSet, OrderError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let content = std::fs::read_to_string(path).map_err(|source| OrderError::Io {
        path: display.clone(),
        source,
    })?;

    parse_orders(&content).map_err(|reason| OrderError::InvalidOrderFile {
        path: display,
        reason,
    })
}

/// Parses and validates order-file content.
fn parse_orders(content: &str) -> Result<OrderSet, String> {
    let mut orders: OrderSet = Vec::new();

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row: OrderRow = Vec::new();
        for field in line.split(',') {
            let value: u32 = field
                .trim()
                .parse()
                .map_err(|_| format!("line {}: '{}' is not an integer", line_no + 1, field.trim()))?;
            if value == 0 {
                return Err(format!("line {}: orders are 1-based, found 0", line_no + 1));
            }
            row.push(value);
        }
        orders.push(row);
    }

    let Some(first) = orders.first() else {
        return Err("file contains no orders".to_string());
    };
    if first.len() < 2 {
        return Err("orders must list at least two positions".to_string());
    }

    let mut reference: OrderRow = first.clone();
    reference.sort_unstable();
    if reference.windows(2).any(|w| w[0] == w[1]) {
        return Err("line 1 repeats a position".to_string());
    }

    for (idx, row) in orders.iter().enumerate() {
        if row.len() != first.len() {
            return Err(format!(
                "line {} has {} entries, expected {}",
                idx + 1,
                row.len(),
                first.len()
            ));
        }
        let mut sorted = row.clone();
        sorted.sort_unstable();
        if sorted != reference {
            return Err(format!(
                "line {} is not a permutation of the same positions as line 1",
                idx + 1
            ));
        }
    }

    Ok(orders)
}

/// Picks the order for a 1-based participant number.
///
/// Selection wraps around the available orders rather than erroring, so
/// designs are reused across repeated cohorts when there are more
/// participants than rows. Returns `None` for participant 0 (participant
/// numbers are 1-based) or an empty set.
#[must_use]
pub fn order_for_participant(orders: &[OrderRow], participant: u32) -> Option<&OrderRow> {
    if participant == 0 || orders.is_empty() {
        return None;
    }
    orders.get((participant as usize - 1) % orders.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    /// Counts, for every ordered pair (a,b) with a != b, how many rows have
    /// b immediately following a. Pairs that never occur count as zero.
    fn successor_counts(n: u32, rows: &[OrderRow]) -> HashMap<(u32, u32), usize> {
        let mut counts = HashMap::new();
        for a in 1..=n {
            for b in 1..=n {
                if a != b {
                    counts.insert((a, b), 0);
                }
            }
        }
        for row in rows {
            for pair in row.windows(2) {
                *counts.entry((pair[0], pair[1])).or_insert(0) += 1;
            }
        }
        counts
    }

    #[test]
    fn golden_rows_for_n4() {
        let rows = balanced_latin_square(4);
        assert_eq!(rows[0], vec![1, 2, 4, 3]);
        assert_eq!(rows[1], vec![2, 3, 1, 4]);
        assert_eq!(rows[2], vec![3, 4, 2, 1]);
        assert_eq!(rows[3], vec![4, 1, 3, 2]);
    }

    #[test]
    fn even_sizes_have_n_rows_odd_sizes_double() {
        assert_eq!(balanced_latin_square(4).len(), 4);
        assert_eq!(balanced_latin_square(6).len(), 6);
        assert_eq!(balanced_latin_square(3).len(), 6);
        assert_eq!(balanced_latin_square(5).len(), 10);
    }

    #[test]
    fn every_row_is_a_permutation() {
        for n in 2..=8 {
            for row in balanced_latin_square(n).iter() {
                let mut sorted = row.clone();
                sorted.sort_unstable();
                assert_eq!(sorted, (1..=n as u32).collect::<Vec<_>>(), "n={}", n);
            }
        }
    }

    #[test]
    fn successor_pairs_are_balanced_within_one() {
        for n in 2..=8 {
            let rows = balanced_latin_square(n);
            let counts = successor_counts(n as u32, &rows);
            let min = *counts.values().min().unwrap();
            let max = *counts.values().max().unwrap();
            assert!(
                max - min <= 1,
                "n={}: successor counts spread {}..{}",
                n,
                min,
                max
            );
        }
    }

    #[test]
    fn squares_are_cached_per_size() {
        let first = balanced_latin_square(4);
        let second = balanced_latin_square(4);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn order_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n2,3,1\n3,1,2").unwrap();

        let orders = order_from_file(file.path()).unwrap();
        assert_eq!(orders, vec![vec![1, 2, 3], vec![2, 3, 1], vec![3, 1, 2]]);
    }

    #[test]
    fn order_file_tolerates_whitespace_and_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1, 2, 3\n\n 3,2,1 \n").unwrap();

        let orders = order_from_file(file.path()).unwrap();
        assert_eq!(orders, vec![vec![1, 2, 3], vec![3, 2, 1]]);
    }

    #[test]
    fn order_file_rejects_mismatched_lengths() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n1,2").unwrap();

        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));
    }

    #[test]
    fn order_file_rejects_non_permutation_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n1,1,3").unwrap();

        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));
    }

    #[test]
    fn order_file_rejects_different_value_sets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,2,3\n2,3,4").unwrap();

        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));
    }

    #[test]
    fn order_file_rejects_garbage_and_zero() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1,two,3").unwrap();
        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "0,1,2").unwrap();
        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));
    }

    #[test]
    fn order_file_rejects_single_position_orders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "1\n1").unwrap();
        assert!(matches!(
            order_from_file(file.path()),
            Err(OrderError::InvalidOrderFile { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            order_from_file("/definitely/not/here.txt"),
            Err(OrderError::Io { .. })
        ));
    }

    #[test]
    fn participant_selection_wraps_around() {
        let orders = vec![vec![1, 2, 3], vec![2, 3, 1], vec![3, 1, 2]];
        assert_eq!(order_for_participant(&orders, 1), Some(&orders[0]));
        assert_eq!(order_for_participant(&orders, 3), Some(&orders[2]));
        // More participants than rows: reuse row (5-1) % 3 == 1
        assert_eq!(order_for_participant(&orders, 5), Some(&orders[1]));
    }

    #[test]
    fn participant_zero_gets_nothing() {
        let orders = vec![vec![1, 2]];
        assert_eq!(order_for_participant(&orders, 0), None);
        assert_eq!(order_for_participant(&[], 1), None);
    }
}
