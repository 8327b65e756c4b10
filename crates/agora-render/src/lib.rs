//! Presentation helpers shared by the model types: markdown rendering for
//! post and comment bodies, and human-relative timestamps.

pub mod markdown;
pub mod pretty;

pub use markdown::markdown_to_html;
pub use pretty::pretty_date;
