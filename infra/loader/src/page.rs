use parley_domain::models::{Cursor, Edge, Page, PageInfo};

/// Trims an overfetched, id-descending slice to `first` items.
///
/// `has_next_page` is set iff the slice held more than `first` items. Returns
/// `None` for an empty slice or `first == 0`; callers surface that as not found.
pub fn paginate<T: Cursor>(mut items: Vec<T>, first: u32) -> Option<Page<T>> {
    let first = usize::try_from(first).ok().filter(|&n| n > 0)?;
    let has_next_page = items.len() > first;
    items.truncate(first);

    let start_cursor = items.first()?.cursor();
    let end_cursor = items.last()?.cursor();
    let edges = items.into_iter().map(|node| Edge { cursor: node.cursor(), node }).collect();

    Some(Page { edges, page_info: PageInfo { start_cursor, end_cursor, has_next_page } })
}
