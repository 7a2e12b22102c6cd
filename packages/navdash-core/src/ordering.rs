/// Ordering engine: turns a drag gesture into a new sequence and derives
/// the contiguous order indices that get persisted.
///
/// Everything here is pure. Gestures that cannot be resolved against the
/// current sequence (stale ids after a reload, out-of-range indices) leave
/// the sequence untouched instead of failing.
use crate::types::{Identified, OrderEntry};

/// Remove the element at `from` and reinsert it at `to`, shifting the
/// elements in between by one. Out-of-range indices or `from == to`
/// return the input unchanged.
pub fn array_move<T>(mut items: Vec<T>, from: usize, to: usize) -> Vec<T> {
    if from == to || from >= items.len() || to >= items.len() {
        return items;
    }
    let item = items.remove(from);
    items.insert(to, item);
    items
}

/// Move the item identified by `active` to the position currently held by
/// the item identified by `over`. Unknown ids are a no-op.
pub fn move_by_id<T: Identified>(items: Vec<T>, active: i64, over: i64) -> Vec<T> {
    if active == over {
        return items;
    }
    let from = items.iter().position(|item| item.ident() == Some(active));
    let to = items.iter().position(|item| item.ident() == Some(over));
    match (from, to) {
        (Some(from), Some(to)) => array_move(items, from, to),
        _ => {
            log::debug!(
                target: "navdash.ordering",
                "Ignoring move of {} over {}: id not in current sequence",
                active,
                over
            );
            items
        }
    }
}

/// Derive persisted order indices from the visual order: the n-th item with
/// an identity gets `order_num = n`. Prior `order_num` values are ignored.
pub fn order_entries<T: Identified>(items: &[T]) -> Vec<OrderEntry> {
    items
        .iter()
        .filter_map(Identified::ident)
        .enumerate()
        .map(|(index, id)| OrderEntry {
            id,
            order_num: index as i64,
        })
        .collect()
}

/// True when the given order indices are a permutation of `0..n`.
pub fn is_contiguous(order_nums: impl IntoIterator<Item = i64>) -> bool {
    let mut sorted: Vec<i64> = order_nums.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, value)| *value == index as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_move_forward() {
        assert_eq!(array_move(vec!['a', 'b', 'c', 'd'], 0, 2), vec!['b', 'c', 'a', 'd']);
    }

    #[test]
    fn test_array_move_backward() {
        assert_eq!(array_move(vec!['a', 'b', 'c', 'd'], 3, 1), vec!['a', 'd', 'b', 'c']);
    }

    #[test]
    fn test_array_move_is_not_a_swap() {
        let moved = array_move(vec![1, 2, 3, 4, 5], 0, 4);
        assert_eq!(moved, vec![2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_array_move_same_index_is_noop() {
        let items = vec![10, 20, 30];
        for i in 0..items.len() {
            assert_eq!(array_move(items.clone(), i, i), items);
        }
    }

    #[test]
    fn test_array_move_out_of_bounds_is_noop() {
        let items = vec![10, 20, 30];
        assert_eq!(array_move(items.clone(), 3, 0), items);
        assert_eq!(array_move(items.clone(), 0, 7), items);
        assert_eq!(array_move(Vec::<i32>::new(), 0, 0), Vec::<i32>::new());
    }

    #[test]
    fn test_move_by_id_unknown_id_is_noop() {
        let items: Vec<i64> = vec![1, 2, 3];
        assert_eq!(move_by_id(items.clone(), 9, 2), items);
        assert_eq!(move_by_id(items.clone(), 1, 9), items);
    }

    #[test]
    fn test_move_by_id() {
        let items: Vec<i64> = vec![1, 2, 3, 4];
        assert_eq!(move_by_id(items, 4, 2), vec![1, 4, 2, 3]);
    }

    #[test]
    fn test_every_move_yields_contiguous_permutation() {
        let items: Vec<i64> = vec![100, 200, 300, 400, 500, 600];
        for from in 0..items.len() {
            for to in 0..items.len() {
                let moved = array_move(items.clone(), from, to);
                let entries = order_entries(&moved);
                assert!(is_contiguous(entries.iter().map(|e| e.order_num)));
                assert_eq!(entries.len(), items.len());
                // moved element lands at `to`, the rest keep their relative order
                assert_eq!(moved[to], items[from]);
                let rest_before: Vec<i64> =
                    items.iter().copied().filter(|v| *v != items[from]).collect();
                let rest_after: Vec<i64> =
                    moved.iter().copied().filter(|v| *v != items[from]).collect();
                assert_eq!(rest_before, rest_after);
            }
        }
    }

    #[test]
    fn test_order_entries_ignore_stale_order_nums() {
        #[derive(Clone)]
        struct Row {
            id: i64,
        }
        impl Identified for Row {
            fn ident(&self) -> Option<i64> {
                Some(self.id)
            }
        }
        let rows = vec![Row { id: 7 }, Row { id: 3 }, Row { id: 5 }];
        let entries = order_entries(&rows);
        assert_eq!(
            entries,
            vec![
                OrderEntry { id: 7, order_num: 0 },
                OrderEntry { id: 3, order_num: 1 },
                OrderEntry { id: 5, order_num: 2 },
            ]
        );
    }

    #[test]
    fn test_order_entries_skip_entities_without_id() {
        let sites = vec![
            crate::types::Site {
                id: None,
                group_id: 1,
                name: "draft".into(),
                url: "https://draft".into(),
                icon: String::new(),
                description: String::new(),
                notes: String::new(),
                order_num: 0,
            },
            crate::types::Site {
                id: Some(4),
                group_id: 1,
                name: "saved".into(),
                url: "https://saved".into(),
                icon: String::new(),
                description: String::new(),
                notes: String::new(),
                order_num: 9,
            },
        ];
        assert_eq!(order_entries(&sites), vec![OrderEntry { id: 4, order_num: 0 }]);
    }

    #[test]
    fn test_resaving_is_idempotent() {
        let ids: Vec<i64> = vec![8, 2, 6];
        let first = order_entries(&ids);
        let second = order_entries(&ids);
        assert_eq!(first, second);
    }

    #[test]
    fn test_is_contiguous() {
        assert!(is_contiguous(vec![2, 0, 1]));
        assert!(is_contiguous(Vec::<i64>::new()));
        assert!(!is_contiguous(vec![0, 2]));
        assert!(!is_contiguous(vec![0, 0, 1]));
    }
}
