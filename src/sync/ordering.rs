//! Deterministic ordering of polled records by creation time.

use crate::api::{Page, Task};

/// Records that carry a creation timestamp string.
pub trait Created {
    fn created_time(&self) -> &str;
}

impl Created for Page {
    fn created_time(&self) -> &str {
        &self.created_time
    }
}

impl Created for Task {
    fn created_time(&self) -> &str {
        &self.created_at
    }
}

/// Exchange sort: repeated passes swapping adjacent pairs for which
/// `out_of_order(a, b)` holds, until a pass makes no swap.
///
/// Only strictly out-of-order pairs move, so equal elements keep their
/// relative order. Returns the total number of swaps performed.
pub fn exchange_sort_by<T, F>(items: &mut [T], mut out_of_order: F) -> usize
where
    F: FnMut(&T, &T) -> bool,
{
    let mut total = 0;
    loop {
        let mut swaps = 0;
        for i in 1..items.len() {
            if out_of_order(&items[i - 1], &items[i]) {
                items.swap(i - 1, i);
                swaps += 1;
            }
        }
        total += swaps;
        if swaps == 0 {
            return total;
        }
    }
}

/// Sort records ascending by their creation timestamp string, in place.
/// Returns the number of swaps; zero means the input was already sorted.
pub fn sort_by_creation_time<R: Created>(records: &mut [R]) -> usize {
    exchange_sort_by(records, |a, b| a.created_time() > b.created_time())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::page;

    #[test]
    fn test_sorts_unordered_pages() {
        let mut pages = vec![
            page("c", "2025-01-03T00:00:00.000Z", "C"),
            page("a", "2025-01-01T00:00:00.000Z", "A"),
            page("b", "2025-01-02T00:00:00.000Z", "B"),
        ];
        let swaps = sort_by_creation_time(&mut pages);
        assert!(swaps > 0);
        let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_sorted_input_makes_no_swaps() {
        let mut pages = vec![
            page("a", "2025-01-01T00:00:00.000Z", "A"),
            page("b", "2025-01-02T00:00:00.000Z", "B"),
        ];
        let before = pages.clone();
        assert_eq!(sort_by_creation_time(&mut pages), 0);
        assert_eq!(pages, before);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut pages = vec![
            page("b", "2025-01-02T00:00:00.000Z", "B"),
            page("a", "2025-01-01T00:00:00.000Z", "A"),
        ];
        sort_by_creation_time(&mut pages);
        let once = pages.clone();
        assert_eq!(sort_by_creation_time(&mut pages), 0);
        assert_eq!(pages, once);
    }

    #[test]
    fn test_equal_timestamps_keep_order() {
        let mut pages = vec![
            page("x", "2025-01-01T00:00:00.000Z", "X"),
            page("y", "2025-01-01T00:00:00.000Z", "Y"),
            page("w", "2024-12-31T00:00:00.000Z", "W"),
        ];
        sort_by_creation_time(&mut pages);
        let ids: Vec<&str> = pages.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["w", "x", "y"]);
    }

    #[test]
    fn test_empty_and_single() {
        let mut none: Vec<Page> = vec![];
        assert_eq!(sort_by_creation_time(&mut none), 0);
        let mut one = vec![page("a", "2025-01-01T00:00:00.000Z", "A")];
        assert_eq!(sort_by_creation_time(&mut one), 0);
    }

    #[test]
    fn test_exchange_sort_by_counts_swaps() {
        let mut xs = vec![3, 2, 1];
        assert_eq!(exchange_sort_by(&mut xs, |a, b| a > b), 3);
        assert_eq!(xs, vec![1, 2, 3]);
    }
}
