use crate::contract::{ContractError, KeyFetchError};
use crate::error::LoaderError;
use fxhash::FxHashMap;
use parley_domain::models::{BatchRows, Comment, CommentBatch, CommentGroup, LoadKey, LoadTarget};

/// What one key of a batch resolves to.
pub type Slot = Result<Vec<Comment>, LoaderError>;

/// Splits `batch` into one slot per entry of `keys`, in the same order.
///
/// Grouped rows are routed by their tag. Flat rows are scanned once: a change
/// of group value closes the previous group, the last group is closed after the
/// scan. Every item lands in exactly one slot. Keys without items resolve to
/// [`LoaderError::NotFound`], keys listed in `batch.failures` to
/// [`LoaderError::Fetch`].
///
/// # Errors
/// A [`ContractError`] when the batch holds a group that was not requested, a
/// group that is split or repeated, or a row without a group value. The caller
/// fails the whole batch in that case.
pub fn demultiplex(keys: &[LoadKey], batch: CommentBatch) -> Result<Vec<Slot>, ContractError> {
    let mut router = Router::new(keys)?;

    match batch.rows {
        BatchRows::Grouped(groups) => {
            for CommentGroup { target, items } in groups {
                let discriminant = target.discriminant();
                if let Some(stray) = items.iter().find(|c| c.group(discriminant) != Some(target)) {
                    return Err(ContractError::Ungrouped {
                        id: stray.id,
                        discriminant,
                        context: Some(format!("tagged as {target}").into()),
                    });
                }
                router.close(target, items)?;
            }
        },
        BatchRows::Flat(rows) => router.scan(keys, rows)?,
    }

    let mut failures: FxHashMap<LoadTarget, KeyFetchError> = FxHashMap::default();
    for failure in batch.failures {
        router.index_of(failure.target)?;
        failures.insert(failure.target, KeyFetchError { target: failure.target, reason: failure.reason });
    }

    Ok(keys
        .iter()
        .zip(router.slots)
        .map(|(key, items)| {
            if let Some(failure) = failures.remove(&key.target) {
                return Err(LoaderError::fetch(failure));
            }
            match items {
                Some(items) if !items.is_empty() => Ok(items),
                _ => Err(LoaderError::NotFound { target: key.target, context: None }),
            }
        })
        .collect())
}

struct Router {
    index: FxHashMap<LoadTarget, usize>,
    slots: Vec<Option<Vec<Comment>>>,
}

impl Router {
    fn new(keys: &[LoadKey]) -> Result<Self, ContractError> {
        let mut index = FxHashMap::default();
        index.reserve(keys.len());
        for (position, key) in keys.iter().enumerate() {
            if index.insert(key.target, position).is_some() {
                return Err(ContractError::DuplicateKey { target: key.target, context: None });
            }
        }
        Ok(Self { index, slots: vec![None; keys.len()] })
    }

    fn index_of(&self, target: LoadTarget) -> Result<usize, ContractError> {
        self.index
            .get(&target)
            .copied()
            .ok_or(ContractError::UnknownGroup { target, context: None })
    }

    fn close(&mut self, target: LoadTarget, items: Vec<Comment>) -> Result<(), ContractError> {
        let position = self.index_of(target)?;
        let slot = &mut self.slots[position];
        if slot.is_some() {
            return Err(ContractError::SplitGroup { target, context: None });
        }
        *slot = Some(items);
        Ok(())
    }

    fn scan(&mut self, keys: &[LoadKey], rows: Vec<Comment>) -> Result<(), ContractError> {
        let Some(discriminant) = keys.first().map(LoadKey::discriminant) else {
            return match rows.first() {
                Some(row) => Err(ContractError::UnknownGroup {
                    target: row.parent_id.map_or(LoadTarget::Article(row.article_id), LoadTarget::Parent),
                    context: Some("empty request".into()),
                }),
                None => Ok(()),
            };
        };

        let mut current: Option<(LoadTarget, Vec<Comment>)> = None;
        for row in rows {
            let group = row.group(discriminant).ok_or(ContractError::Ungrouped {
                id: row.id,
                discriminant,
                context: None,
            })?;
            match &mut current {
                Some((target, items)) if *target == group => items.push(row),
                _ => {
                    if let Some((target, items)) = current.take() {
                        self.close(target, items)?;
                    }
                    current = Some((group, vec![row]));
                },
            }
        }
        if let Some((target, items)) = current {
            self.close(target, items)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(id: i64, article_id: i64, parent_id: Option<i64>) -> Comment {
        Comment { id, text: format!("c{id}"), article_id, parent_id, created_at: Utc::now() }
    }

    fn ids(slot: &Slot) -> Vec<i64> {
        slot.as_ref().map(|items| items.iter().map(|c| c.id).collect()).unwrap_or_default()
    }

    #[test]
    fn flat_rows_split_at_group_changes() {
        let keys = [LoadKey::parent(1, 5), LoadKey::parent(2, 5), LoadKey::parent(3, 5)];
        let rows = vec![
            comment(30, 9, Some(2)),
            comment(20, 9, Some(2)),
            comment(15, 9, Some(1)),
            comment(12, 9, Some(3)),
        ];

        let slots = demultiplex(&keys, CommentBatch::flat(rows)).unwrap();
        assert_eq!(ids(&slots[0]), vec![15]);
        assert_eq!(ids(&slots[1]), vec![30, 20]);
        // The final group is closed after the scan.
        assert_eq!(ids(&slots[2]), vec![12]);
    }

    #[test]
    fn single_item_groups_are_found() {
        let keys = [LoadKey::parent(101, 2)];
        let slots = demultiplex(&keys, CommentBatch::flat(vec![comment(104, 10, Some(101))])).unwrap();
        assert_eq!(ids(&slots[0]), vec![104]);
    }

    #[test]
    fn empty_group_is_not_found() {
        let keys = [LoadKey::article(1, 5), LoadKey::article(2, 5)];
        let slots = demultiplex(&keys, CommentBatch::flat(vec![comment(7, 2, None)])).unwrap();
        assert!(matches!(&slots[0], Err(LoaderError::NotFound { target: LoadTarget::Article(1), .. })));
        assert_eq!(ids(&slots[1]), vec![7]);
    }

    #[test]
    fn grouped_rows_route_by_tag() {
        let keys = [LoadKey::article(1, 5), LoadKey::article(2, 5)];
        let batch = CommentBatch::grouped(vec![
            CommentGroup { target: LoadTarget::Article(2), items: vec![comment(9, 2, None)] },
            CommentGroup { target: LoadTarget::Article(1), items: vec![comment(8, 1, None)] },
        ]);

        let slots = demultiplex(&keys, batch).unwrap();
        assert_eq!(ids(&slots[0]), vec![8]);
        assert_eq!(ids(&slots[1]), vec![9]);
    }

    #[test]
    fn non_contiguous_group_is_rejected() {
        let keys = [LoadKey::parent(1, 5), LoadKey::parent(2, 5)];
        let rows = vec![comment(9, 1, Some(1)), comment(8, 1, Some(2)), comment(7, 1, Some(1))];

        let err = demultiplex(&keys, CommentBatch::flat(rows)).unwrap_err();
        assert!(matches!(err, ContractError::SplitGroup { target: LoadTarget::Parent(1), .. }));
    }

    #[test]
    fn unrequested_group_is_rejected() {
        let keys = [LoadKey::parent(1, 5)];
        let err =
            demultiplex(&keys, CommentBatch::flat(vec![comment(5, 1, Some(4))])).unwrap_err();
        assert!(matches!(err, ContractError::UnknownGroup { target: LoadTarget::Parent(4), .. }));
    }

    #[test]
    fn reply_under_article_key_is_rejected() {
        let keys = [LoadKey::article(1, 5)];
        let err =
            demultiplex(&keys, CommentBatch::flat(vec![comment(5, 1, Some(4))])).unwrap_err();
        assert!(matches!(err, ContractError::Ungrouped { id: 5, .. }));
    }

    #[test]
    fn key_failure_only_affects_its_slot() {
        let keys = [LoadKey::parent(1, 5), LoadKey::parent(2, 5)];
        let batch = CommentBatch::flat(vec![comment(3, 1, Some(1))])
            .with_failure(LoadTarget::Parent(2), "statement timed out");

        let slots = demultiplex(&keys, batch).unwrap();
        assert_eq!(ids(&slots[0]), vec![3]);
        let Err(LoaderError::Fetch { source, .. }) = &slots[1] else {
            panic!("expected a fetch failure, got {:?}", slots[1]);
        };
        assert!(source.to_string().contains("statement timed out"));
    }

    #[test]
    fn duplicate_targets_are_rejected() {
        let keys = [LoadKey::parent(1, 5), LoadKey::parent(1, 2)];
        let err = demultiplex(&keys, CommentBatch::flat(Vec::new())).unwrap_err();
        assert!(matches!(err, ContractError::DuplicateKey { .. }));
    }
}
