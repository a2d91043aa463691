//! Dedup & truncate

use std::collections::HashSet;
use std::hash::Hash;

/// Drop repeated items, keeping first occurrences in order, then keep at most `count`
pub fn dedup_and_truncate<T>(items: impl IntoIterator<Item = T>, count: usize) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_first_occurrence_order() {
        assert_eq!(
            dedup_and_truncate(["a", "b", "a", "c"], 10),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_truncates_after_dedup() {
        assert_eq!(
            dedup_and_truncate(["x", "x", "y", "x", "z", "w"], 3),
            vec!["x", "y", "z"]
        );
    }

    #[test]
    fn test_shortfall_is_not_padded() {
        assert_eq!(dedup_and_truncate(["a", "a", "b"], 5), vec!["a", "b"]);
        assert!(dedup_and_truncate(Vec::<&str>::new(), 5).is_empty());
        assert!(dedup_and_truncate(["a"], 0).is_empty());
    }

    #[test]
    fn test_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["a", "b", "a", "c"],
            vec!["q", "q", "q"],
            vec!["m", "n", "o", "p", "m", "n"],
        ];

        for input in inputs {
            for count in 0..6 {
                let once = dedup_and_truncate(input.clone(), count);
                let twice = dedup_and_truncate(once.clone(), count);
                assert_eq!(once, twice);
            }
        }
    }
}
