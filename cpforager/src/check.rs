//! Data-quality checks on the timestamp axis. Failures are warnings, not errors.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use tracing::warn;

/// Number of rows not at their sorted position.
pub fn unsorted_count(times: &[NaiveDateTime]) -> usize {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    order.iter().enumerate().filter(|&(pos, &i)| pos != i).count()
}

/// Number of rows sharing their timestamp with another row, first
/// occurrences included.
pub fn duplicate_count(times: &[NaiveDateTime]) -> usize {
    let mut counts: HashMap<NaiveDateTime, usize> = HashMap::with_capacity(times.len());
    for t in times {
        *counts.entry(*t).or_default() += 1;
    }
    counts.values().filter(|&&n| n > 1).sum()
}

pub fn check_order(times: &[NaiveDateTime]) -> bool {
    let unsorted = unsorted_count(times);
    if unsorted > 0 {
        warn!("the datetime column has {unsorted} unsorted rows");
    }
    unsorted == 0
}

pub fn check_duplicates(times: &[NaiveDateTime]) -> bool {
    let duplicates = duplicate_count(times);
    if duplicates > 0 {
        warn!("the datetime column has {duplicates} duplicated rows");
    }
    duplicates == 0
}

/// Runs every check so that all problems are reported.
pub fn check_full(times: &[NaiveDateTime]) -> bool {
    let ordered = check_order(times);
    let unique = check_duplicates(times);
    ordered && unique
}
