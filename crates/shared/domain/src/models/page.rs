use serde::{Deserialize, Serialize};

/// Items that can be used as a keyset cursor.
pub trait Cursor {
    fn cursor(&self) -> i64;
}

/// One page of a keyset-paginated listing, ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Edge<T> {
    pub node: T,
    pub cursor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub start_cursor: i64,
    pub end_cursor: i64,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|edge| &edge.node)
    }

    pub fn cursors(&self) -> Vec<i64> {
        self.edges.iter().map(|edge| edge.cursor).collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Maps every node while keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            edges: self
                .edges
                .into_iter()
                .map(|Edge { node, cursor }| Edge { node: f(node), cursor })
                .collect(),
            page_info: self.page_info,
        }
    }
}
