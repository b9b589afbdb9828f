pub mod fixtures;

use fixtures::comment;
use parley_domain::models::{Comment, CommentBatch, LoadKey};
use parley_loader::{demultiplex, paginate};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Reply groups keyed by parent id, each a set of unique comment ids.
fn reply_groups() -> impl Strategy<Value = BTreeMap<i64, Vec<i64>>> {
    prop::collection::btree_map(1..50i64, prop::collection::btree_set(1..10_000i64, 0..8), 1..12)
        .prop_map(|groups| {
            let mut seen = std::collections::BTreeSet::new();
            groups
                .into_iter()
                .map(|(parent, ids)| {
                    let mut ids: Vec<i64> = ids.into_iter().filter(|id| seen.insert(*id)).collect();
                    ids.sort_unstable_by(|a, b| b.cmp(a));
                    (parent, ids)
                })
                .collect()
        })
}

proptest! {
    #[test]
    fn demultiplexed_slices_partition_the_batch(groups in reply_groups(), extra in 50..60i64) {
        let mut keys: Vec<LoadKey> = groups.keys().map(|parent| LoadKey::parent(*parent, 10)).collect();
        keys.push(LoadKey::parent(extra, 10));

        let rows: Vec<Comment> = groups
            .iter()
            .flat_map(|(parent, ids)| ids.iter().map(move |id| comment(*id, 1, Some(*parent))))
            .collect();
        let total = rows.len();

        let slots = demultiplex(&keys, CommentBatch::flat(rows)).unwrap();
        prop_assert_eq!(slots.len(), keys.len());

        let mut delivered = 0;
        for (key, slot) in keys.iter().zip(&slots) {
            let expected = groups.get(&key.target.id()).cloned().unwrap_or_default();
            match slot {
                Ok(items) => {
                    prop_assert!(!items.is_empty());
                    for item in items {
                        prop_assert_eq!(item.group(key.discriminant()), Some(key.target));
                    }
                    let ids: Vec<i64> = items.iter().map(|c| c.id).collect();
                    prop_assert_eq!(ids, expected);
                    delivered += items.len();
                },
                Err(err) => {
                    prop_assert!(err.is_not_found());
                    prop_assert!(expected.is_empty());
                },
            }
        }
        prop_assert_eq!(delivered, total);
    }

    #[test]
    fn pages_never_exceed_first(len in 0..40usize, first in 0..20u32) {
        let items: Vec<Comment> = (0..len as i64).rev().map(|id| comment(id, 1, None)).collect();

        match paginate(items, first) {
            Some(page) => {
                prop_assert!(page.len() <= first as usize);
                prop_assert_eq!(page.page_info.has_next_page, len > first as usize);
                let cursors = page.cursors();
                prop_assert_eq!(page.page_info.start_cursor, cursors[0]);
                prop_assert_eq!(Some(&page.page_info.end_cursor), cursors.last());
            },
            None => prop_assert!(len == 0 || first == 0),
        }
    }
}
