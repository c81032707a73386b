//! Build pipeline, read API and search over a journal source.

pub mod build;
pub mod query;
pub mod session;

pub use build::{build, build_from_path, LogIndex, LogIndexBuilder};
pub use query::IndexStats;
pub use session::IndexSession;
