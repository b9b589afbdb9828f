//! Entities, load keys and the shapes exchanged between the loader and storage.

mod batch;
mod comment;
mod load;
mod page;
mod post;

pub use batch::{
    BatchRequest, BatchRows, CommentBatch, CommentGroup, KeyFailure, uniform_discriminant,
};
pub use comment::{Comment, CommentId, CommentsQuery, NewComment};
pub use load::{Discriminant, LoadKey, LoadTarget};
pub use page::{Cursor, Edge, Page, PageInfo};
pub use post::{NewPost, Post, PostId, PostsQuery};
