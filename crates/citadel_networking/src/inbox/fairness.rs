//! Per-client cap applied to a drained batch.

use std::collections::HashMap;
use std::hash::Hash;

/// Splits `batch` into what runs this tick and what waits.
///
/// On return `batch` holds the admitted entries grouped by client, clients
/// ordered by first appearance, each client's entries in arrival order and
/// at most `limit` of them. The returned vector holds the excess in arrival
/// order.
pub fn apply_fairness<T, K>(batch: &mut Vec<T>, limit: usize, client_of: impl Fn(&T) -> K) -> Vec<T>
where
    K: Eq + Hash,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut deferred = Vec::new();

    for entry in batch.drain(..) {
        let slot = *slots.entry(client_of(&entry)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if group.len() < limit {
            group.push(entry);
        } else {
            deferred.push(entry);
        }
    }

    batch.extend(groups.into_iter().flatten());
    deferred
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_limit_keeps_everything() {
        let mut batch = vec![(1, 'a'), (2, 'b'), (1, 'c')];
        let deferred = apply_fairness(&mut batch, 5, |e| e.0);
        assert!(deferred.is_empty());
        assert_eq!(batch, vec![(1, 'a'), (1, 'c'), (2, 'b')]);
    }

    #[test]
    fn test_cap_defers_in_order() {
        let mut batch = vec![(1, 1), (2, 1), (1, 2), (1, 3), (2, 2), (1, 4), (2, 3)];
        let deferred = apply_fairness(&mut batch, 2, |e| e.0);
        assert_eq!(batch, vec![(1, 1), (1, 2), (2, 1), (2, 2)]);
        assert_eq!(deferred, vec![(1, 3), (1, 4), (2, 3)]);
    }

    #[test]
    fn test_empty_batch() {
        let mut batch: Vec<(u8, u8)> = Vec::new();
        assert!(apply_fairness(&mut batch, 1, |e| e.0).is_empty());
        assert!(batch.is_empty());
    }
}
