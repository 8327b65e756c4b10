pub mod loader;
pub mod models;
pub mod views;

pub use loader::UserLoader;
pub use models::{
    Category, Comment, NewComment, NewPost, NewUser, Post, PostCursor, PostEdit, User, VoteDirection,
    VoteOutcome,
};
pub use views::{CommentView, PostView};
